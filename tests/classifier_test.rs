use fake_news_detector::classification::{
    ClassifierError, FittedPipeline, Label, LogisticRegression, PipelineError, SolverConfig,
    TfidfExtractor, VocabularyConfig,
};

fn labelled_corpus() -> (Vec<String>, Vec<Label>) {
    let mut texts = Vec::new();
    let mut labels = Vec::new();
    for i in 0..15 {
        texts.push(format!("shocking hoax exposed story{i} readers share"));
        labels.push(Label::Fake);
        texts.push(format!("official report confirmed story{i} readers share"));
        labels.push(Label::Real);
    }
    (texts, labels)
}

#[test]
fn test_single_class_training_set_is_rejected() {
    let texts = ["alpha beta", "alpha gamma", "alpha delta", "alpha beta"];
    let labels = [Label::Real; 4];
    let error = FittedPipeline::fit(
        &texts,
        &labels,
        VocabularyConfig::default(),
        SolverConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        error,
        PipelineError::Classifier(ClassifierError::DegenerateTrainingSet {
            present: Label::Real
        })
    );
}

#[test]
fn test_empty_vocabulary_is_rejected() {
    let texts = ["alpha", "beta", "gamma", "delta"];
    let labels = [Label::Fake, Label::Real, Label::Fake, Label::Real];
    let error = FittedPipeline::fit(
        &texts,
        &labels,
        VocabularyConfig::default(),
        SolverConfig::default(),
    )
    .unwrap_err();
    assert_eq!(
        error,
        PipelineError::Classifier(ClassifierError::EmptyVocabulary)
    );
}

#[test]
fn test_probabilities_are_complementary_and_match_labels() {
    let (texts, labels) = labelled_corpus();
    let pipeline = FittedPipeline::fit(
        &texts,
        &labels,
        VocabularyConfig::default(),
        SolverConfig::default(),
    )
    .expect("fit");

    let queries = [
        "shocking hoax",
        "official report",
        "readers share a story",
        "nothing known here",
        "",
    ];
    let probabilities = pipeline.predict_proba(&queries).expect("predict_proba");
    let predicted = pipeline.predict(&queries).expect("predict");
    assert_eq!(probabilities.len(), queries.len());

    for (probs, label) in probabilities.iter().zip(&predicted) {
        assert!((probs.fake + probs.real - 1.0).abs() < 1e-6);
        assert_eq!(*label == Label::Real, probs.real >= 0.5);
    }
    assert_eq!(predicted[0], Label::Fake);
    assert_eq!(predicted[1], Label::Real);
}

#[test]
fn test_training_is_deterministic() {
    let (texts, labels) = labelled_corpus();
    let fit = || {
        FittedPipeline::fit(
            &texts,
            &labels,
            VocabularyConfig::default(),
            SolverConfig::default(),
        )
        .expect("fit")
        .to_artifact()
        .expect("artifact")
    };
    assert_eq!(fit(), fit());
}

#[test]
fn test_classifier_rejects_mismatched_dimensions() {
    let (texts, labels) = labelled_corpus();
    let mut extractor = TfidfExtractor::default();
    let features = extractor.fit_transform(&texts).expect("features");
    let mut classifier = LogisticRegression::new(SolverConfig::default());
    classifier.fit(&features, &labels).expect("fit");

    let mut other = TfidfExtractor::new(VocabularyConfig {
        min_df: 1,
        max_df: 1.0,
        ..VocabularyConfig::default()
    });
    let foreign = other.fit_transform(&["some other corpus"]).expect("features");
    assert!(matches!(
        classifier.predict(&foreign),
        Err(ClassifierError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_unfitted_classifier_refuses_to_predict() {
    let classifier = LogisticRegression::default();
    assert_eq!(
        classifier.predict_proba(&[]).unwrap_err(),
        ClassifierError::NotFitted
    );
}
