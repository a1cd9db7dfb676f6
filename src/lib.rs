#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub(crate) mod api;
pub mod app;
pub mod classification;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod observability;
pub mod service;
pub mod training;
