use reeldb_core::error::Error;
use reeldb_core::store::{FsArtifactStore, INDEX_ARTIFACT};
use reeldb_core::traits::ArtifactStore;
use reeldb_core::types::Movie;
use reeldb_index::{Bm25Params, InvertedIndex};

fn movie(id: u32, title: &str, description: &str) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        description: description.to_string(),
        cast: vec![],
        genres: vec![],
    }
}

fn bear_corpus() -> Vec<Movie> {
    vec![
        movie(1, "Paddington", "A bear in London"),
        movie(2, "Ted", "A bear comes to life"),
    ]
}

#[test]
fn build_rejects_empty_corpus() {
    let mut index = InvertedIndex::new();
    assert!(matches!(index.build(&[]), Err(Error::EmptyCorpus)));
}

#[test]
fn rebuild_over_same_corpus_is_idempotent() {
    let movies = bear_corpus();
    let mut index = InvertedIndex::new();
    index.build(&movies).expect("build");
    let first = index.bm25_search("bear", 10);
    index.build(&movies).expect("rebuild");
    let second = index.bm25_search("bear", 10);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.id, b.id);
        assert!((a.score - b.score).abs() < 1e-6);
    }
}

#[test]
fn bm25_search_finds_both_bear_movies() {
    let mut index = InvertedIndex::new();
    index.build(&bear_corpus()).expect("build");
    let results = index.bm25_search("bear", 2);
    assert_eq!(results.len(), 2);
    let ids: Vec<u32> = results.iter().map(|r| r.id).collect();
    assert!(ids.contains(&1) && ids.contains(&2));
    for r in &results {
        assert!(r.score > 0.0, "score for {} must be positive", r.title);
    }
}

#[test]
fn bm25_is_non_negative_and_idf_monotone_in_df() {
    let movies = vec![
        movie(1, "Common", "alpha beta gamma"),
        movie(2, "Rare", "alpha delta"),
        movie(3, "Other", "alpha"),
    ];
    let mut index = InvertedIndex::new();
    index.build(&movies).expect("build");

    // "alpha" appears in 3 docs, "delta" in 1: higher df means lower idf.
    let idf_common = index.bm25_idf("alpha").expect("idf");
    let idf_rare = index.bm25_idf("delta").expect("idf");
    assert!(idf_rare > idf_common);

    for id in [1, 2, 3] {
        for term in ["alpha", "delta", "zeta"] {
            let score = index.bm25(id, term).expect("bm25");
            assert!(score >= 0.0, "bm25({id}, {term}) = {score}");
        }
    }
}

#[test]
fn multi_token_term_is_invalid_argument() {
    let mut index = InvertedIndex::new();
    index.build(&bear_corpus()).expect("build");
    assert!(matches!(
        index.term_frequency(1, "grizzly bear"),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        index.inverse_document_frequency("grizzly bear"),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn smoothed_idf_is_non_negative_even_for_ubiquitous_terms() {
    let mut index = InvertedIndex::new();
    index.build(&bear_corpus()).expect("build");
    // "bear" is in every document; ln((N+1)/(df+1)) = ln(1) = 0.
    let idf = index.inverse_document_frequency("bear").expect("idf");
    assert!(idf >= 0.0);
}

#[test]
fn caller_can_override_bm25_params() {
    let mut index = InvertedIndex::new();
    index.build(&bear_corpus()).expect("build");
    let default = index.bm25(1, "london").expect("bm25");
    let tuned = index
        .bm25_with(1, "london", Bm25Params { k1: 0.1, b: 0.0 })
        .expect("bm25");
    assert!(default > 0.0 && tuned > 0.0);
    assert!((default - tuned).abs() > 1e-6);
}

#[test]
fn ties_keep_original_document_order() {
    // Identical documents score identically; order must match the corpus.
    let movies = vec![
        movie(7, "Twin", "same words here"),
        movie(3, "Twin", "same words here"),
        movie(5, "Twin", "same words here"),
    ];
    let mut index = InvertedIndex::new();
    index.build(&movies).expect("build");
    let results = index.bm25_search("words", 3);
    let ids: Vec<u32> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![7, 3, 5]);
}

#[test]
fn unranked_search_returns_any_token_matches() {
    let mut index = InvertedIndex::new();
    index.build(&bear_corpus()).expect("build");
    let results = index.search("bear spaceship", 10);
    assert_eq!(results.len(), 2);
    let one = index.search("bear", 1);
    assert_eq!(one.len(), 1);
}

#[test]
fn save_load_roundtrip_preserves_scores() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let store = FsArtifactStore::new(tmp.path()).expect("store");
    let mut index = InvertedIndex::new();
    index.build(&bear_corpus()).expect("build");
    index.save(&store).expect("save");

    let restored = InvertedIndex::load(&store).expect("load");
    assert_eq!(restored.doc_count(), 2);
    let a = index.bm25_search("london", 5);
    let b = restored.bm25_search("london", 5);
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b.iter()) {
        assert_eq!(x.id, y.id);
        assert!((x.score - y.score).abs() < 1e-6);
    }
}

#[test]
fn load_distinguishes_missing_from_corrupt() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let store = FsArtifactStore::new(tmp.path()).expect("store");
    assert!(matches!(
        InvertedIndex::load(&store),
        Err(Error::MissingArtifact(_))
    ));

    store.put(INDEX_ARTIFACT, b"not json at all").expect("put");
    assert!(matches!(
        InvertedIndex::load(&store),
        Err(Error::CorruptArtifact { .. })
    ));
}

#[test]
fn load_or_build_rebuilds_on_count_mismatch() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let store = FsArtifactStore::new(tmp.path()).expect("store");
    let two = bear_corpus();
    InvertedIndex::load_or_build(&store, &two).expect("first build");

    let mut three = bear_corpus();
    three.push(movie(3, "Brave", "A bear and a princess"));
    let index = InvertedIndex::load_or_build(&store, &three).expect("rebuild");
    assert_eq!(index.doc_count(), 3);
}
