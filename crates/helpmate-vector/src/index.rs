use anyhow::{anyhow, bail, Context, Result};
use arrow_array::{Array, Float32Array, RecordBatch};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tracing::debug;

use helpmate_core::traits::VectorIndex;
use helpmate_core::types::{CandidateItem, Chunk, Meta};

use crate::schema::{build_chunk_schema, vector_dim};
use crate::table::{ensure_table, string_col};

/// Open (creating if absent) a chunk table and check its vector dimension.
pub(crate) async fn open_chunk_table(conn: &Connection, name: &str, dim: usize) -> Result<Table> {
    let dim_i32 = i32::try_from(dim).map_err(|_| anyhow!("dimension {} out of range", dim))?;
    ensure_table(conn, name, build_chunk_schema(dim_i32)).await?;
    let table = conn.open_table(name).execute().await?;
    let schema = table.schema().await?;
    match vector_dim(&schema) {
        Some(d) if d == dim => Ok(table),
        Some(d) => bail!("table '{}' stores {}-d vectors but the embedder produces {}-d", name, d, dim),
        None => bail!("table '{}' has no fixed-size 'vector' column", name),
    }
}

/// Cosine nearest-neighbour search over a Lance chunk table.
pub struct LanceVectorIndex { table: Table, dim: usize }

impl LanceVectorIndex {
    pub async fn open(conn: &Connection, table_name: &str, dim: usize) -> Result<Self> {
        let table = open_chunk_table(conn, table_name, dim).await?;
        Ok(Self { table, dim })
    }

    pub async fn len(&self) -> Result<usize> {
        Ok(self.table.count_rows(None).await?)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    fn dim(&self) -> usize { self.dim }

    async fn nearest(&self, vector: &[f32], k: usize) -> Result<Vec<CandidateItem>> {
        if k == 0 || self.is_empty().await? { return Ok(Vec::new()); }
        let mut stream = self.table
            .vector_search(vector.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await?;
        let mut items = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            push_candidates(&batch, &mut items)?;
        }
        items.truncate(k);
        debug!(k, returned = items.len(), "vector search");
        Ok(items)
    }
}

fn push_candidates(batch: &RecordBatch, out: &mut Vec<CandidateItem>) -> Result<()> {
    let ids = string_col(batch, "id")?;
    let texts = string_col(batch, "text")?;
    let metas = string_col(batch, "metadata")?;
    let distances = batch.column_by_name("_distance").and_then(|c| c.as_any().downcast_ref::<Float32Array>());
    for i in 0..batch.num_rows() {
        let metadata: Meta = serde_json::from_str(metas.value(i))
            .with_context(|| format!("bad metadata for chunk '{}'", ids.value(i)))?;
        let distance = distances.filter(|d| d.is_valid(i)).map(|d| d.value(i));
        out.push(CandidateItem {
            chunk: Chunk { id: ids.value(i).to_string(), text: texts.value(i).to_string(), metadata },
            rank: out.len(),
            distance,
        });
    }
    Ok(())
}
