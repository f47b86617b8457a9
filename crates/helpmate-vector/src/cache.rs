//! Lance-backed fingerprint cache of raw retrieval results.
//!
//! Keys are BLAKE3 fingerprints of the caller's key string, so the same text
//! maps to the same row across restarts. Entries never expire; `set` replaces
//! any previous value for the key. The table handle is held for the lifetime
//! of the cache and writes from one process are serialized. Several processes
//! sharing one cache directory are not coordinated: the last writer wins.

use anyhow::{Context, Result};
use arrow_array::{RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, Table};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use helpmate_core::traits::CandidateCache;
use helpmate_core::types::CandidateItem;

use crate::schema::build_cache_schema;
use crate::table::{ensure_table, open_db, string_col};

/// 64 hex chars; pure function of `text`.
pub fn fingerprint(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

pub struct LanceCandidateCache { table: Table, write_lock: Mutex<()> }

impl LanceCandidateCache {
    /// Open the cache under `dir`, creating the directory and table if needed.
    pub async fn open(dir: &Path, table_name: &str) -> Result<Self> {
        std::fs::create_dir_all(dir).with_context(|| format!("cannot create cache dir {}", dir.display()))?;
        let conn = open_db(&dir.to_string_lossy()).await?;
        Self::with_connection(&conn, table_name).await
    }

    pub async fn with_connection(conn: &Connection, table_name: &str) -> Result<Self> {
        ensure_table(conn, table_name, build_cache_schema()).await?;
        let table = conn.open_table(table_name).execute().await?;
        Ok(Self { table, write_lock: Mutex::new(()) })
    }
}

#[async_trait]
impl CandidateCache for LanceCandidateCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<CandidateItem>>> {
        let fp = fingerprint(key);
        let mut stream = self.table.query().only_if(format!("key = '{}'", fp)).limit(1).execute().await?;
        while let Some(batch) = stream.try_next().await? {
            if batch.num_rows() == 0 { continue; }
            let payload = string_col(&batch, "payload")?.value(0);
            let items: Vec<CandidateItem> = serde_json::from_str(payload)
                .with_context(|| format!("corrupt cache entry {}", fp))?;
            debug!(key = %&fp[..12], items = items.len(), "cache hit");
            return Ok(Some(items));
        }
        debug!(key = %&fp[..12], "cache miss");
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[CandidateItem]) -> Result<()> {
        let fp = fingerprint(key);
        let payload = serde_json::to_string(value)?;
        let rb = RecordBatch::try_new(
            build_cache_schema(),
            vec![
                Arc::new(StringArray::from(vec![fp.clone()])),
                Arc::new(StringArray::from(vec![payload])),
                Arc::new(TimestampMillisecondArray::from(vec![Utc::now().timestamp_millis()])),
            ],
        )?;
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(rb)].into_iter(), build_cache_schema()));
        let _guard = self.write_lock.lock().await;
        // Upsert behavior via merge_insert: key is unique
        let mut mi = self.table.merge_insert(&["key"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await?;
        debug!(key = %&fp[..12], items = value.len(), "cache store");
        Ok(())
    }
}
