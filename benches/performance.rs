/// 1k 記事規模の特徴抽出・推論ベンチマーク。
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fake_news_detector::classification::{
    FittedPipeline, Label, SolverConfig, TfidfExtractor, VocabularyConfig,
};

const FAKE_WORDS: [&str; 6] = ["shocking", "hoax", "miracle", "secret", "exposed", "viral"];
const REAL_WORDS: [&str; 6] = ["official", "report", "ministry", "confirmed", "budget", "court"];
const SHARED_WORDS: [&str; 8] = ["the", "news", "today", "city", "people", "said", "week", "state"];

fn synthetic_corpus(documents: usize, words: usize) -> (Vec<String>, Vec<Label>) {
    (0..documents)
        .map(|doc| {
            let (cue, label) = if doc % 2 == 0 {
                (&FAKE_WORDS, Label::Fake)
            } else {
                (&REAL_WORDS, Label::Real)
            };
            let text = (0..words)
                .map(|w| {
                    if (doc + w) % 3 == 0 {
                        cue[(doc * 7 + w) % cue.len()]
                    } else {
                        SHARED_WORDS[(doc * 3 + w) % SHARED_WORDS.len()]
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            (text, label)
        })
        .unzip()
}

fn bench_fit_transform(c: &mut Criterion) {
    let (texts, _) = synthetic_corpus(1024, 120);
    c.bench_function("tfidf_fit_transform_1k", |b| {
        b.iter(|| {
            let mut extractor = TfidfExtractor::new(VocabularyConfig::default());
            let features = extractor.fit_transform(&texts).expect("fit_transform");
            black_box(features.len());
        });
    });
}

fn bench_predict(c: &mut Criterion) {
    let (texts, labels) = synthetic_corpus(1024, 120);
    let pipeline = FittedPipeline::fit(
        &texts,
        &labels,
        VocabularyConfig::default(),
        SolverConfig::default(),
    )
    .expect("fit");
    let (queries, _) = synthetic_corpus(256, 80);

    c.bench_function("pipeline_predict_proba_256", |b| {
        b.iter(|| {
            let probabilities = pipeline.predict_proba(&queries).expect("predict");
            black_box(probabilities.len());
        });
    });
}

criterion_group!(benches, bench_fit_transform, bench_predict);
criterion_main!(benches);
