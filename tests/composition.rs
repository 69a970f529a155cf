// Composition tests: verifying that the pipeline stages chain together.
//
// These tests exercise the data flow between modules:
//   load -> score -> rank -> export -> reload
// with a vocabulary embedder standing in for the ONNX model. No network or
// model files are needed; exports are written to a temp directory.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use creator_match::dataset::load_dataset;
use creator_match::embedding::{LazyEmbedder, TextEmbedder};
use creator_match::output::export;
use creator_match::scoring::{score, MatchFilter, ScoredCreator, SCORE_COLUMN};
use creator_match::session::MatchSession;
use creator_match::MatchError;

use common::{VocabEmbedder, CREATORS_CSV};

fn names<'a>(ranked: impl IntoIterator<Item = &'a ScoredCreator>) -> Vec<&'a str> {
    ranked.into_iter().map(|c| c.record.name.as_str()).collect()
}

// ============================================================
// Chain: load -> score
// ============================================================

#[tokio::test]
async fn every_creator_gets_one_bounded_score_in_input_order() {
    let dataset = load_dataset(CREATORS_CSV.as_bytes(), "creators.csv").unwrap();
    let embedder = VocabEmbedder::default();

    let scored = score(&dataset, "sustainable fashion", &embedder).await.unwrap();

    assert_eq!(scored.len(), dataset.len());
    for (creator, record) in scored.creators().iter().zip(dataset.records()) {
        assert_eq!(&creator.record, record);
        assert!(
            (-1.0..=1.0).contains(&creator.similarity_score),
            "score out of range: {}",
            creator.similarity_score
        );
    }
    // bios in one batch, then the brief
    assert_eq!(embedder.batch_count(), 2);
}

#[tokio::test]
async fn scoring_is_idempotent() {
    let dataset = load_dataset(CREATORS_CSV.as_bytes(), "creators.csv").unwrap();
    let embedder = VocabEmbedder::default();

    let first = score(&dataset, "sustainable fashion", &embedder).await.unwrap();
    let second = score(&dataset, "  sustainable fashion  ", &embedder).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn blank_brief_never_reaches_the_model() {
    let dataset = load_dataset(CREATORS_CSV.as_bytes(), "creators.csv").unwrap();
    let embedder = VocabEmbedder::default();

    let err = score(&dataset, " \t\n", &embedder).await.unwrap_err();
    assert!(matches!(err, MatchError::EmptyBrief));
    assert_eq!(embedder.batch_count(), 0);
}

// ============================================================
// Chain: score -> rank
// ============================================================

#[tokio::test]
async fn matching_bios_rank_first_and_ties_keep_input_order() {
    let dataset = load_dataset(CREATORS_CSV.as_bytes(), "creators.csv").unwrap();
    let scored = score(&dataset, "sustainable fashion", &VocabEmbedder::default())
        .await
        .unwrap();

    let ranked = scored.select(&MatchFilter::default());
    // Ben, Dev and Eli share no words with the brief and tie at zero.
    assert_eq!(
        names(ranked.iter().copied()),
        vec!["Ana Ruiz", "Chioma Obi", "Ben Cole", "Dev Patel", "Eli Moss"]
    );
    assert!(ranked[0].similarity_score > ranked[1].similarity_score);
    assert!(ranked[1].similarity_score > 0.0);
    assert_eq!(ranked[2].similarity_score, 0.0);
}

#[tokio::test]
async fn niche_and_location_filters_combine() {
    let dataset = load_dataset(CREATORS_CSV.as_bytes(), "creators.csv").unwrap();
    let scored = score(&dataset, "coding gadgets", &VocabEmbedder::default())
        .await
        .unwrap();

    let fashion = MatchFilter {
        niche: MatchFilter::selection("fashion"),
        ..MatchFilter::default()
    };
    assert_eq!(
        names(scored.select(&fashion)),
        vec!["Ana Ruiz", "Chioma Obi"]
    );

    let tech_in_india = MatchFilter {
        niche: MatchFilter::selection("tech"),
        location: MatchFilter::selection("India"),
        ..MatchFilter::default()
    };
    assert_eq!(names(scored.select(&tech_in_india)), vec!["Dev Patel"]);

    let everything = MatchFilter {
        niche: MatchFilter::selection("All"),
        location: MatchFilter::selection("All"),
        ..MatchFilter::default()
    };
    assert_eq!(scored.select(&everything).len(), 5);

    let nowhere = MatchFilter {
        location: MatchFilter::selection("Atlantis"),
        ..MatchFilter::default()
    };
    assert!(scored.select(&nowhere).is_empty());
}

#[tokio::test]
async fn top_count_truncates_after_sorting() {
    let dataset = load_dataset(CREATORS_CSV.as_bytes(), "creators.csv").unwrap();
    let scored = score(&dataset, "sustainable fashion", &VocabEmbedder::default())
        .await
        .unwrap();

    let top_two = MatchFilter {
        top: 2,
        ..MatchFilter::default()
    };
    assert_eq!(names(scored.select(&top_two)), vec!["Ana Ruiz", "Chioma Obi"]);
}

// ============================================================
// Chain: rank -> export -> reload
// ============================================================

#[tokio::test]
async fn exported_csv_reloads_with_records_and_scores() {
    let dataset = load_dataset(CREATORS_CSV.as_bytes(), "creators.csv").unwrap();
    let scored = score(&dataset, "sustainable fashion", &VocabEmbedder::default())
        .await
        .unwrap();
    let ranked = scored.select(&MatchFilter::default());

    let csv = export::to_csv(scored.schema(), &ranked).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(export::DEFAULT_EXPORT_FILE);
    std::fs::write(&path, &csv).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let reloaded = load_dataset(&bytes, export::DEFAULT_EXPORT_FILE).unwrap();

    let mut expected_columns: Vec<String> = dataset.columns().to_vec();
    expected_columns.push(SCORE_COLUMN.to_string());
    assert_eq!(reloaded.columns(), expected_columns.as_slice());
    assert_eq!(reloaded.len(), ranked.len());

    for (row, creator) in reloaded.records().iter().zip(&ranked) {
        assert_eq!(row.name, creator.record.name);
        assert_eq!(row.bio, creator.record.bio);
        assert_eq!(row.niche, creator.record.niche);
        assert_eq!(row.location, creator.record.location);
        assert_eq!(row.audience_size, creator.record.audience_size);

        // handle, verified, then the appended score
        assert_eq!(&row.extra[..2], creator.record.extra.as_slice());
        let exported: f32 = row.extra[2].to_string().parse().unwrap();
        assert_eq!(exported, creator.similarity_score);
    }
}

#[tokio::test]
async fn rescoring_an_export_replaces_the_old_score_column() {
    let dataset = load_dataset(CREATORS_CSV.as_bytes(), "creators.csv").unwrap();
    let embedder = VocabEmbedder::default();
    let scored = score(&dataset, "sustainable fashion", &embedder).await.unwrap();
    let csv = export::to_csv(scored.schema(), &scored.select(&MatchFilter::default())).unwrap();

    let reloaded = load_dataset(csv.as_bytes(), "top_creators.csv").unwrap();
    let rescored = score(&reloaded, "gadgets", &embedder).await.unwrap();
    let again = export::to_csv(rescored.schema(), &rescored.select(&MatchFilter::default())).unwrap();

    let header = again.lines().next().unwrap();
    assert_eq!(header.matches(SCORE_COLUMN).count(), 1);
    assert!(header.ends_with(SCORE_COLUMN));
}

#[tokio::test]
async fn json_export_follows_source_column_order() {
    let dataset = load_dataset(CREATORS_CSV.as_bytes(), "creators.csv").unwrap();
    let scored = score(&dataset, "sustainable fashion", &VocabEmbedder::default())
        .await
        .unwrap();
    let top = MatchFilter {
        top: 1,
        ..MatchFilter::default()
    };

    let value = export::to_json(scored.schema(), &scored.select(&top));
    let first = value[0].as_object().unwrap();
    let keys: Vec<&str> = first.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["handle", "name", "bio", "niche", "location", "audience_size", "verified", SCORE_COLUMN]
    );
    assert_eq!(first["audience_size"], serde_json::json!(120000.0));
    assert_eq!(first["verified"], serde_json::json!(true));
}

// ============================================================
// Chain: session -> lazy model -> cache
// ============================================================

#[tokio::test]
async fn session_loads_the_model_once_and_caches_results() {
    let loads = Arc::new(AtomicUsize::new(0));
    let vocab = Arc::new(VocabEmbedder::default());

    let lazy = {
        let loads = loads.clone();
        let vocab = vocab.clone();
        LazyEmbedder::new(move || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(vocab.clone() as Arc<dyn TextEmbedder>)
        })
    };
    let mut session = MatchSession::new(Arc::new(lazy));
    assert_eq!(loads.load(Ordering::SeqCst), 0);

    session.upload(CREATORS_CSV.as_bytes(), "creators.csv").unwrap();
    assert!(!session.evaluate("sustainable fashion", false).await.unwrap().cached);
    assert!(session.evaluate("sustainable fashion", false).await.unwrap().cached);
    assert!(!session.evaluate("gadgets", false).await.unwrap().cached);
    assert!(!session.evaluate("gadgets", true).await.unwrap().cached);

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(vocab.batch_count(), 6);

    session.filter.niche = MatchFilter::selection("tech");
    let (_, ranked) = session.ranked().unwrap();
    assert_eq!(ranked[0].record.name, "Ben Cole");
}

#[tokio::test]
async fn empty_dataset_scores_without_the_model() {
    let csv = format!("{}\n", common::REQUIRED_HEADER);
    let dataset = load_dataset(csv.as_bytes(), "empty.csv").unwrap();
    let embedder = VocabEmbedder::default();

    let scored = score(&dataset, "anything", &embedder).await.unwrap();
    assert!(scored.is_empty());
    assert_eq!(embedder.batch_count(), 0);

    let csv = export::to_csv(scored.schema(), &[]).unwrap();
    assert_eq!(
        csv.lines().collect::<Vec<_>>(),
        vec!["name,bio,niche,location,audience_size,similarity_score"]
    );
}
