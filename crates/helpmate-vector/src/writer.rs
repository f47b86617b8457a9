use anyhow::{bail, Result};
use arrow_array::{types::Float32Type, FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray};
use async_trait::async_trait;
use lancedb::{Connection, Table};
use std::sync::Arc;
use tracing::info;

use helpmate_core::traits::ChunkSink;
use helpmate_core::types::Chunk;

use crate::index::open_chunk_table;
use crate::schema::build_chunk_schema;

/// Ingest-side handle on the chunk table. Rows are upserted on `id`.
pub struct ChunkWriter { table: Table, table_name: String, dim: usize }

impl ChunkWriter {
	pub async fn open(conn: &Connection, table_name: &str, dim: usize) -> Result<Self> {
		let table = open_chunk_table(conn, table_name, dim).await?;
		Ok(Self { table, table_name: table_name.to_string(), dim })
	}

	fn to_record_batch(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<RecordBatch> {
		let dim = i32::try_from(self.dim)?;
		let mut ids = Vec::with_capacity(chunks.len()); let mut texts = Vec::with_capacity(chunks.len()); let mut metas = Vec::with_capacity(chunks.len()); let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
		for (chunk, embedding) in chunks.iter().zip(embeddings) {
			if embedding.len() != self.dim { bail!("chunk '{}': embedding has {} dims, expected {}", chunk.id, embedding.len(), self.dim); }
			ids.push(chunk.id.clone()); texts.push(chunk.text.clone()); metas.push(serde_json::to_string(&chunk.metadata)?); vectors.push(Some(embedding.iter().map(|&x| Some(x)).collect()));
		}
		Ok(RecordBatch::try_new(build_chunk_schema(dim), vec![
			Arc::new(StringArray::from(ids)),
			Arc::new(StringArray::from(texts)),
			Arc::new(StringArray::from(metas)),
			Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors.into_iter(), dim)),
		])?)
	}
}

#[async_trait]
impl ChunkSink for ChunkWriter {
	async fn upsert(&self, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<usize> {
		if chunks.len() != embeddings.len() { bail!("{} chunks but {} embeddings", chunks.len(), embeddings.len()); }
		if chunks.is_empty() { return Ok(0); }
		let batch = self.to_record_batch(chunks, embeddings)?;
		let schema = batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
		let mut mi = self.table.merge_insert(&["id"]);
		mi.when_matched_update_all(None).when_not_matched_insert_all();
		mi.execute(reader).await?;
		info!(table = %self.table_name, rows = chunks.len(), "upserted chunks");
		Ok(chunks.len())
	}
}
