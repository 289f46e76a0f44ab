use std::sync::Arc;

use reeldb_core::error::Error;
use reeldb_core::store::{FsArtifactStore, CHUNK_STORE_ARTIFACT};
use reeldb_core::traits::ArtifactStore;
use reeldb_core::types::Movie;
use reeldb_semantic::{ChunkSemanticSearch, DocSemanticSearch, HashEmbedder};

fn movie(id: u32, title: &str, description: &str) -> Movie {
    Movie {
        id,
        title: title.to_string(),
        description: description.to_string(),
        cast: vec![],
        genres: vec![],
    }
}

fn corpus() -> Arc<Vec<Movie>> {
    Arc::new(vec![
        movie(
            1,
            "Paddington",
            "A young bear travels to London. He searches for a home. \
             Marmalade sandwiches feature heavily. The city is kind to him.",
        ),
        movie(2, "Ted", "A teddy bear comes to life and never grows up."),
        movie(3, "Heat", "A heist crew and a detective circle each other."),
        movie(4, "Empty", ""),
    ])
}

#[tokio::test]
async fn build_skips_empty_descriptions_and_persists() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let store = FsArtifactStore::new(tmp.path()).expect("store");
    let mut search = ChunkSemanticSearch::new(corpus(), Arc::new(HashEmbedder::new(32)));
    search.build(&store).await.expect("build");
    assert!(search.is_built());
    assert!(store.exists(CHUNK_STORE_ARTIFACT));
}

#[tokio::test]
async fn search_before_build_fails() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let _store = FsArtifactStore::new(tmp.path()).expect("store");
    let search = ChunkSemanticSearch::new(corpus(), Arc::new(HashEmbedder::new(32)));
    assert!(search.search_chunks("bear", 3).await.is_err());
}

#[tokio::test]
async fn search_dedups_to_one_result_per_movie() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let store = FsArtifactStore::new(tmp.path()).expect("store");
    let mut search = ChunkSemanticSearch::new(corpus(), Arc::new(HashEmbedder::new(64)));
    search.build(&store).await.expect("build");

    let results = search.search_chunks("bear", 10).await.expect("search");
    let mut ids: Vec<u32> = results.iter().map(|r| r.id).collect();
    let before = ids.len();
    ids.dedup();
    assert_eq!(before, ids.len(), "each movie appears at most once");
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score, "sorted by score");
    }
}

#[tokio::test]
async fn chunk_store_is_not_invalidated_by_corpus_growth() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let store = FsArtifactStore::new(tmp.path()).expect("store");
    let mut search = ChunkSemanticSearch::new(corpus(), Arc::new(HashEmbedder::new(32)));
    search.build(&store).await.expect("build");
    let persisted = store.get(CHUNK_STORE_ARTIFACT).expect("blob");

    // Same store, larger corpus: load_or_build must reuse the stale cache.
    let mut grown = (*corpus()).clone();
    grown.push(movie(5, "New", "A brand new release."));
    let mut search2 =
        ChunkSemanticSearch::new(Arc::new(grown), Arc::new(HashEmbedder::new(32)));
    search2.load_or_build(&store).await.expect("load");
    assert_eq!(store.get(CHUNK_STORE_ARTIFACT).expect("blob"), persisted);
}

#[tokio::test]
async fn truncated_chunk_store_is_rejected_at_load_time() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let store = FsArtifactStore::new(tmp.path()).expect("store");
    // Two records, one vector: parseable JSON, inconsistent contents.
    let blob = r#"{"dim":2,"records":[{"movie_idx":0,"chunk_idx":0,"total_chunks":1},{"movie_idx":1,"chunk_idx":0,"total_chunks":1}],"embeddings":[[0.5,0.5]]}"#;
    store
        .put(CHUNK_STORE_ARTIFACT, blob.as_bytes())
        .expect("put");

    let mut search = ChunkSemanticSearch::new(corpus(), Arc::new(HashEmbedder::new(2)));
    let err = search.load_or_build(&store).await.expect_err("corrupt");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::CorruptArtifact { .. })
    ));
    assert!(!search.is_built());
}

#[tokio::test]
async fn wrong_width_chunk_vectors_are_rejected_at_load_time() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let store = FsArtifactStore::new(tmp.path()).expect("store");
    let blob = r#"{"dim":4,"records":[{"movie_idx":0,"chunk_idx":0,"total_chunks":1}],"embeddings":[[0.5,0.5]]}"#;
    store
        .put(CHUNK_STORE_ARTIFACT, blob.as_bytes())
        .expect("put");

    let mut search = ChunkSemanticSearch::new(corpus(), Arc::new(HashEmbedder::new(4)));
    let err = search.load_or_build(&store).await.expect_err("corrupt");
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::CorruptArtifact { .. })
    ));
}

#[tokio::test]
async fn doc_search_rebuilds_on_count_mismatch() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let store = FsArtifactStore::new(tmp.path()).expect("store");
    let mut search = DocSemanticSearch::new(corpus(), Arc::new(HashEmbedder::new(32)));
    search.load_or_build(&store).await.expect("build");

    let mut grown = (*corpus()).clone();
    grown.push(movie(5, "New", "A brand new release."));
    let grown = Arc::new(grown);
    let mut search2 = DocSemanticSearch::new(Arc::clone(&grown), Arc::new(HashEmbedder::new(32)));
    search2.load_or_build(&store).await.expect("rebuild");
    let results = search2.search("brand new release", 5).await.expect("search");
    assert_eq!(results.len(), 5);
}

#[tokio::test]
async fn doc_search_ranks_lexical_overlap_higher_with_hash_embedder() {
    let tmp = tempfile::TempDir::new().expect("tempdir");
    let store = FsArtifactStore::new(tmp.path()).expect("store");
    let mut search = DocSemanticSearch::new(corpus(), Arc::new(HashEmbedder::new(64)));
    search.load_or_build(&store).await.expect("build");
    let results = search
        .search("teddy bear comes to life", 2)
        .await
        .expect("search");
    assert_eq!(results[0].id, 2);
}
