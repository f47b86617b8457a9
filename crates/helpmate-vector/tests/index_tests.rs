use helpmate_core::traits::{ChunkSink, VectorIndex};
use helpmate_core::types::Chunk;
use helpmate_vector::{open_db, ChunkWriter, LanceVectorIndex};
use tempfile::TempDir;

fn seed_chunks() -> (Vec<Chunk>, Vec<Vec<f32>>) {
    let chunks = vec![
        Chunk::new("chunk_0", "Member life insurance schedule.").with_meta("page", "3"),
        Chunk::new("chunk_1", "Notice of claim within 20 days.").with_meta("page", "7"),
        Chunk::new("chunk_2", "Scheduled benefit of $10,000.").with_meta("page", "12"),
    ];
    let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
    (chunks, vectors)
}

#[tokio::test]
async fn nearest_returns_closest_first_with_metadata() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let conn = open_db(&tmp.path().to_string_lossy()).await?;
    let writer = ChunkWriter::open(&conn, "policy_chunks", 3).await?;
    let (chunks, vectors) = seed_chunks();
    assert_eq!(writer.upsert(&chunks, &vectors).await?, 3);

    let index = LanceVectorIndex::open(&conn, "policy_chunks", 3).await?;
    assert_eq!(index.len().await?, 3);
    let hits = index.nearest(&[0.1, 0.2, 0.9], 3).await?;
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].id(), "chunk_2");
    assert_eq!(hits[0].chunk.page(), Some("12"));
    for (i, hit) in hits.iter().enumerate() { assert_eq!(hit.rank, i); }
    let d: Vec<f32> = hits.iter().map(|h| h.distance.expect("distance")).collect();
    assert!(d.windows(2).all(|w| w[0] <= w[1]), "distances ascend: {d:?}");

    let two = index.nearest(&[0.1, 0.2, 0.9], 2).await?;
    assert_eq!(two.len(), 2, "never more than k");
    Ok(())
}

#[tokio::test]
async fn empty_index_returns_nothing() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let conn = open_db(&tmp.path().to_string_lossy()).await?;
    let index = LanceVectorIndex::open(&conn, "policy_chunks", 3).await?;
    assert!(index.nearest(&[1.0, 0.0, 0.0], 10).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn upsert_is_idempotent_on_id() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let conn = open_db(&tmp.path().to_string_lossy()).await?;
    let writer = ChunkWriter::open(&conn, "policy_chunks", 3).await?;
    let (chunks, vectors) = seed_chunks();
    writer.upsert(&chunks, &vectors).await?;
    let revised = vec![Chunk::new("chunk_2", "Scheduled benefit of $20,000.")];
    writer.upsert(&revised, &[vec![0.0, 0.0, 1.0]]).await?;

    let index = LanceVectorIndex::open(&conn, "policy_chunks", 3).await?;
    assert_eq!(index.len().await?, 3);
    let hits = index.nearest(&[0.0, 0.0, 1.0], 1).await?;
    assert_eq!(hits[0].text(), "Scheduled benefit of $20,000.");
    Ok(())
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let conn = open_db(&tmp.path().to_string_lossy()).await?;
    LanceVectorIndex::open(&conn, "policy_chunks", 3).await?;
    assert!(LanceVectorIndex::open(&conn, "policy_chunks", 4).await.is_err());

    let writer = ChunkWriter::open(&conn, "policy_chunks", 3).await?;
    let bad = writer.upsert(&[Chunk::new("x", "y")], &[vec![1.0, 0.0]]).await;
    assert!(bad.is_err(), "wrong embedding width must not be written");
    let mismatched = writer.upsert(&[Chunk::new("x", "y")], &[]).await;
    assert!(mismatched.is_err());
    Ok(())
}
