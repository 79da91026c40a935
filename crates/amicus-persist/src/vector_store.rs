//! Chunk index with brute-force cosine search
//!
//! Rows are keyed by `(source_url, chunk_id)`. Re-upserting a chunk whose
//! text is unchanged is a no-op; changed text replaces the row in place.
//! Search scans every row in the requested categories, which is plenty for
//! a few thousand official-source chunks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use amicus_core::Hash;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("{chunks} chunks but {embeddings} embeddings")]
    LengthMismatch { chunks: usize, embeddings: usize },
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Database error: {0}")]
    Database(String),
}

/// The page a batch of chunks came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub category: String,
    pub url: String,
    pub title: String,
    pub last_updated: Option<String>,
    /// Content hash of the whole fetched page
    pub raw_hash: String,
}

/// A chunk waiting to be indexed
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChunk {
    pub chunk_id: String,
    pub text: String,
}

/// A stored chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub category: String,
    pub source_url: String,
    pub source_title: String,
    pub chunk_id: String,
    pub text: String,
    /// Always carries `raw_hash`, `content_hash` and `index`
    pub metadata: serde_json::Value,
    pub source_last_updated: Option<String>,
    pub embedding: Vec<f32>,
}

impl ChunkRecord {
    fn content_hash(&self) -> Option<&str> {
        self.metadata.get("content_hash").and_then(|v| v.as_str())
    }
}

/// A search result; lower distance is closer
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkHit {
    pub distance: f32,
    pub chunk: ChunkRecord,
}

/// Generic trait for chunk indexes
#[async_trait]
pub trait VectorIndex: Send + Sync + std::fmt::Debug {
    fn dimension(&self) -> usize;

    /// Insert or update chunks from one source
    ///
    /// Returns the number of rows inserted or changed. Either every row of
    /// the batch is written or none is.
    async fn upsert(
        &self,
        source: &SourceInfo,
        chunks: &[PendingChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, VectorError>;

    /// Nearest chunks by cosine distance, ascending, ties in insertion order
    ///
    /// `None` or an empty category list searches everything.
    async fn query(
        &self,
        vector: &[f32],
        categories: Option<&[String]>,
        top_k: usize,
    ) -> Result<Vec<ChunkHit>, VectorError>;

    /// Total number of stored chunks
    async fn count(&self) -> Result<usize, VectorError>;

    /// Delete rows of a source whose chunk id is not in `keep`
    async fn prune_source(&self, source_url: &str, keep: &[String]) -> Result<usize, VectorError>;

    /// Make `chunks` the complete content of `source`
    ///
    /// Upserts the batch and deletes the source's other rows as one write, so
    /// two ingestions of the same page can not interleave between the steps.
    /// Returns `(upserted, pruned)`.
    async fn replace_source(
        &self,
        source: &SourceInfo,
        chunks: &[PendingChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(usize, usize), VectorError>;
}

fn content_hash(text: &str) -> String {
    Hash::of_text(text).to_hex()
}

/// Cosine distance (`1 - cosine`); a zero vector is maximally distant
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a * norm_b)
}

fn check_batch(
    dimension: usize,
    chunks: &[PendingChunk],
    embeddings: &[Vec<f32>],
) -> Result<(), VectorError> {
    if chunks.len() != embeddings.len() {
        return Err(VectorError::LengthMismatch {
            chunks: chunks.len(),
            embeddings: embeddings.len(),
        });
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
        return Err(VectorError::DimensionMismatch {
            expected: dimension,
            got: bad.len(),
        });
    }
    Ok(())
}

fn build_record(
    source: &SourceInfo,
    index: usize,
    chunk: &PendingChunk,
    embedding: &[f32],
) -> ChunkRecord {
    ChunkRecord {
        category: source.category.clone(),
        source_url: source.url.clone(),
        source_title: source.title.clone(),
        chunk_id: chunk.chunk_id.clone(),
        text: chunk.text.clone(),
        metadata: serde_json::json!({
            "raw_hash": source.raw_hash,
            "content_hash": content_hash(&chunk.text),
            "index": index,
        }),
        source_last_updated: source.last_updated.clone(),
        embedding: embedding.to_vec(),
    }
}

fn wants(categories: Option<&[String]>, category: &str) -> bool {
    match categories {
        Some(list) if !list.is_empty() => list.iter().any(|c| c == category),
        _ => true,
    }
}

fn upsert_rows(
    rows: &mut Vec<ChunkRecord>,
    source: &SourceInfo,
    chunks: &[PendingChunk],
    embeddings: &[Vec<f32>],
) -> usize {
    let mut written = 0;
    for (index, (chunk, embedding)) in chunks.iter().zip(embeddings).enumerate() {
        let record = build_record(source, index, chunk, embedding);
        match rows
            .iter_mut()
            .find(|r| r.source_url == source.url && r.chunk_id == chunk.chunk_id)
        {
            Some(existing) if existing.content_hash() == record.content_hash() => {}
            Some(existing) => {
                *existing = record;
                written += 1;
            }
            None => {
                rows.push(record);
                written += 1;
            }
        }
    }
    written
}

fn prune_rows(rows: &mut Vec<ChunkRecord>, source_url: &str, keep: &[String]) -> usize {
    let before = rows.len();
    rows.retain(|r| r.source_url != source_url || keep.contains(&r.chunk_id));
    before - rows.len()
}

fn rank(mut hits: Vec<ChunkHit>, top_k: usize) -> Vec<ChunkHit> {
    // sort_by is stable: equal distances keep insertion order
    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits.truncate(top_k);
    hits
}

/// In-memory index (tests and one-shot runs)
#[derive(Debug)]
pub struct MemoryVectorIndex {
    dimension: usize,
    rows: RwLock<Vec<ChunkRecord>>,
}

impl MemoryVectorIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of all rows in insertion order
    pub async fn rows(&self) -> Vec<ChunkRecord> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(
        &self,
        source: &SourceInfo,
        chunks: &[PendingChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, VectorError> {
        check_batch(self.dimension, chunks, embeddings)?;

        let mut rows = self.rows.write().await;
        let mut written = 0;
        for (index, (chunk, embedding)) in chunks.iter().zip(embeddings).enumerate() {
            let record = build_record(source, index, chunk, embedding);
            match rows
                .iter_mut()
                .find(|r| r.source_url == source.url && r.chunk_id == chunk.chunk_id)
            {
                Some(existing) if existing.content_hash() == record.content_hash() => {}
                Some(existing) => {
                    *existing = record;
                    written += 1;
                }
                None => {
                    rows.push(record);
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    async fn query(
        &self,
        vector: &[f32],
        categories: Option<&[String]>,
        top_k: usize,
    ) -> Result<Vec<ChunkHit>, VectorError> {
        if vector.len() != self.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }

        let rows = self.rows.read().await;
        let hits = rows
            .iter()
            .filter(|r| wants(categories, &r.category))
            .map(|r| ChunkHit {
                distance: cosine_distance(vector, &r.embedding),
                chunk: r.clone(),
            })
            .collect();
        Ok(rank(hits, top_k))
    }

    async fn count(&self) -> Result<usize, VectorError> {
        Ok(self.rows.read().await.len())
    }

    async fn prune_source(&self, source_url: &str, keep: &[String]) -> Result<usize, VectorError> {
        let mut rows = self.rows.write().await;
        Ok(prune_rows(&mut rows, source_url, keep))
    }

    async fn replace_source(
        &self,
        source: &SourceInfo,
        chunks: &[PendingChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(usize, usize), VectorError> {
        check_batch(self.dimension, chunks, embeddings)?;
        let keep: Vec<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();

        let mut rows = self.rows.write().await;
        let upserted = upsert_rows(&mut rows, source, chunks, embeddings);
        let pruned = prune_rows(&mut rows, &source.url, &keep);
        Ok((upserted, pruned))
    }
}

#[cfg(feature = "sqlite")]
pub use self::sqlite_index::SqliteVectorIndex;

#[cfg(feature = "sqlite")]
mod sqlite_index {
    use super::*;
    use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};

    /// SQLite-backed persistent index over the `rag_chunks` table
    #[derive(Debug, Clone)]
    pub struct SqliteVectorIndex {
        dimension: usize,
        pool: SqlitePool,
    }

    impl SqliteVectorIndex {
        pub fn new(dimension: usize, pool: SqlitePool) -> Self {
            Self { dimension, pool }
        }
    }

    fn to_bytes(vector: &[f32]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(vector.len() * 4);
        for &val in vector {
            bytes.extend_from_slice(&val.to_le_bytes());
        }
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn db_err(e: sqlx::Error) -> VectorError {
        VectorError::Database(e.to_string())
    }

    /// Insert new rows and rewrite changed ones; unchanged rows are skipped
    async fn write_batch(
        conn: &mut SqliteConnection,
        source: &SourceInfo,
        chunks: &[PendingChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<usize, VectorError> {
        let now = chrono::Utc::now().timestamp();
        let mut written = 0;

        for (index, (chunk, embedding)) in chunks.iter().zip(embeddings).enumerate() {
            let record = build_record(source, index, chunk, embedding);
            let metadata = serde_json::to_string(&record.metadata)
                .map_err(|e| VectorError::Serialization(e.to_string()))?;

            let existing = sqlx::query(
                "SELECT id, metadata FROM rag_chunks WHERE source_url = ? AND chunk_id = ?",
            )
            .bind(&record.source_url)
            .bind(&record.chunk_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_err)?;

            match existing {
                Some(row) => {
                    let stored: String = row.try_get("metadata").map_err(db_err)?;
                    let stored: serde_json::Value = serde_json::from_str(&stored)
                        .unwrap_or(serde_json::Value::Null);
                    if stored.get("content_hash").and_then(|v| v.as_str())
                        == record.content_hash()
                    {
                        continue;
                    }
                    let id: i64 = row.try_get("id").map_err(db_err)?;
                    sqlx::query(
                        "UPDATE rag_chunks SET category = ?, source_title = ?, text = ?, \
                         metadata = ?, source_last_updated = ?, embedding = ?, updated_at = ? \
                         WHERE id = ?",
                    )
                    .bind(&record.category)
                    .bind(&record.source_title)
                    .bind(&record.text)
                    .bind(&metadata)
                    .bind(&record.source_last_updated)
                    .bind(to_bytes(&record.embedding))
                    .bind(now)
                    .bind(id)
                    .execute(&mut *conn)
                    .await
                    .map_err(db_err)?;
                }
                None => {
                    sqlx::query(
                        "INSERT INTO rag_chunks (category, source_url, source_title, chunk_id, \
                         text, metadata, source_last_updated, embedding, created_at, updated_at) \
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(&record.category)
                    .bind(&record.source_url)
                    .bind(&record.source_title)
                    .bind(&record.chunk_id)
                    .bind(&record.text)
                    .bind(&metadata)
                    .bind(&record.source_last_updated)
                    .bind(to_bytes(&record.embedding))
                    .bind(now)
                    .bind(now)
                    .execute(&mut *conn)
                    .await
                    .map_err(db_err)?;
                }
            }
            written += 1;
        }
        Ok(written)
    }

    async fn delete_stale(
        conn: &mut SqliteConnection,
        source_url: &str,
        keep: &[String],
    ) -> Result<usize, VectorError> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("DELETE FROM rag_chunks WHERE source_url = ");
        qb.push_bind(source_url.to_string());
        if !keep.is_empty() {
            qb.push(" AND chunk_id NOT IN (");
            let mut separated = qb.separated(", ");
            for id in keep {
                separated.push_bind(id.clone());
            }
            separated.push_unseparated(")");
        }
        let result = qb.build().execute(&mut *conn).await.map_err(db_err)?;
        Ok(result.rows_affected() as usize)
    }

    #[async_trait]
    impl VectorIndex for SqliteVectorIndex {
        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn upsert(
            &self,
            source: &SourceInfo,
            chunks: &[PendingChunk],
            embeddings: &[Vec<f32>],
        ) -> Result<usize, VectorError> {
            check_batch(self.dimension, chunks, embeddings)?;

            let mut tx = self.pool.begin().await.map_err(db_err)?;
            let written = write_batch(&mut *tx, source, chunks, embeddings).await?;
            tx.commit().await.map_err(db_err)?;
            Ok(written)
        }

        async fn query(
            &self,
            vector: &[f32],
            categories: Option<&[String]>,
            top_k: usize,
        ) -> Result<Vec<ChunkHit>, VectorError> {
            if vector.len() != self.dimension {
                return Err(VectorError::DimensionMismatch {
                    expected: self.dimension,
                    got: vector.len(),
                });
            }

            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT category, source_url, source_title, chunk_id, text, metadata, \
                 source_last_updated, embedding FROM rag_chunks",
            );
            if let Some(list) = categories.filter(|l| !l.is_empty()) {
                qb.push(" WHERE category IN (");
                let mut separated = qb.separated(", ");
                for category in list {
                    separated.push_bind(category.clone());
                }
                separated.push_unseparated(")");
            }
            qb.push(" ORDER BY id");

            let rows = qb.build().fetch_all(&self.pool).await.map_err(db_err)?;

            let mut hits = Vec::with_capacity(rows.len());
            for row in rows {
                let chunk_id: String = row.try_get("chunk_id").map_err(db_err)?;
                let bytes: Vec<u8> = row.try_get("embedding").map_err(db_err)?;
                if bytes.len() != self.dimension * 4 {
                    return Err(VectorError::Serialization(format!(
                        "embedding of chunk {} is {} bytes, expected {}",
                        chunk_id,
                        bytes.len(),
                        self.dimension * 4
                    )));
                }
                let embedding = from_bytes(&bytes);
                let metadata: String = row.try_get("metadata").map_err(db_err)?;

                let chunk = ChunkRecord {
                    category: row.try_get("category").map_err(db_err)?,
                    source_url: row.try_get("source_url").map_err(db_err)?,
                    source_title: row.try_get("source_title").map_err(db_err)?,
                    chunk_id,
                    text: row.try_get("text").map_err(db_err)?,
                    metadata: serde_json::from_str(&metadata)
                        .map_err(|e| VectorError::Serialization(e.to_string()))?,
                    source_last_updated: row.try_get("source_last_updated").map_err(db_err)?,
                    embedding,
                };
                hits.push(ChunkHit {
                    distance: cosine_distance(vector, &chunk.embedding),
                    chunk,
                });
            }

            Ok(rank(hits, top_k))
        }

        async fn count(&self) -> Result<usize, VectorError> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks")
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
            Ok(count as usize)
        }

        async fn prune_source(
            &self,
            source_url: &str,
            keep: &[String],
        ) -> Result<usize, VectorError> {
            let mut conn = self.pool.acquire().await.map_err(db_err)?;
            delete_stale(&mut *conn, source_url, keep).await
        }

        async fn replace_source(
            &self,
            source: &SourceInfo,
            chunks: &[PendingChunk],
            embeddings: &[Vec<f32>],
        ) -> Result<(usize, usize), VectorError> {
            check_batch(self.dimension, chunks, embeddings)?;
            let keep: Vec<String> = chunks.iter().map(|c| c.chunk_id.clone()).collect();

            let mut tx = self.pool.begin().await.map_err(db_err)?;
            let upserted = write_batch(&mut *tx, source, chunks, embeddings).await?;
            let pruned = delete_stale(&mut *tx, &source.url, &keep).await?;
            tx.commit().await.map_err(db_err)?;
            Ok((upserted, pruned))
        }
    }
}
