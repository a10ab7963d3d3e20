//! LanceDB 청크 인덱스 - 벡터 최근접 이웃 검색
//!
//! ANN (Approximate Nearest Neighbor) 검색으로 대용량 청크에서도
//! 빠른 검색을 지원합니다. 배치 삽입은 단일 커밋으로 처리됩니다.
//! ref: https://lancedb.github.io/lancedb/

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::DistanceType;

use super::vector::{score_from_distance, ChunkIndex, ChunkRecord, Metadata, ScoredChunk};

/// 청크 테이블 이름
const TABLE_NAME: &str = "chunks";

// ============================================================================
// LanceChunkIndex
// ============================================================================

/// LanceDB 청크 인덱스 구현
///
/// LanceDB는 고성능 벡터 검색을 위한 columnar 데이터베이스입니다.
/// Apache Arrow 기반으로 빠른 읽기/쓰기를 제공합니다.
pub struct LanceChunkIndex {
    db: Connection,
    dimension: i32,
}

impl LanceChunkIndex {
    /// LanceDB 인덱스 열기
    ///
    /// # Arguments
    /// * `path` - .lance 디렉토리 경로
    /// * `dimension` - 임베딩 벡터 차원
    pub async fn open(path: &Path, dimension: usize) -> Result<Self> {
        // 부모 디렉토리 생성
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create LanceDB directory")?;
            }
        }

        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?;

        let db = lancedb::connect(path_str)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        Ok(Self {
            db,
            dimension: dimension as i32,
        })
    }

    /// 청크 테이블 스키마 생성
    fn create_schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("chunk_id", DataType::Utf8, false),
            Field::new("doc_id", DataType::Utf8, false),
            Field::new("chunk_index", DataType::Int32, false),
            Field::new("text", DataType::Utf8, false),
            Field::new("metadata", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimension,
                ),
                false,
            ),
        ])
    }

    /// 레코드들을 Arrow RecordBatch로 변환
    fn records_to_batch(&self, records: &[ChunkRecord]) -> Result<RecordBatch> {
        if records.is_empty() {
            anyhow::bail!("Cannot create batch from empty records");
        }

        let chunk_ids: Vec<&str> = records.iter().map(|r| r.chunk_id.as_str()).collect();
        let doc_ids: Vec<&str> = records.iter().map(|r| r.doc_id.as_str()).collect();
        let chunk_indices: Vec<i32> = records.iter().map(|r| r.chunk_index).collect();
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();

        // 메타데이터는 JSON 문자열 컬럼으로 저장
        let metadata_json: Vec<String> = records
            .iter()
            .map(|r| serde_json::to_string(&r.metadata).context("Failed to serialize metadata"))
            .collect::<Result<_>>()?;
        let metadata_refs: Vec<&str> = metadata_json.iter().map(|s| s.as_str()).collect();

        // 임베딩을 FixedSizeList로 변환
        let embeddings_flat: Vec<f32> = records
            .iter()
            .flat_map(|r| r.embedding.iter().copied())
            .collect();

        let values = Float32Array::from(embeddings_flat);
        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings_list = FixedSizeListArray::try_new(
            field,
            self.dimension,
            Arc::new(values) as Arc<dyn Array>,
            None,
        )
        .context("Failed to create embedding array")?;

        let batch = RecordBatch::try_new(
            Arc::new(self.create_schema()),
            vec![
                Arc::new(StringArray::from(chunk_ids)),
                Arc::new(StringArray::from(doc_ids)),
                Arc::new(Int32Array::from(chunk_indices)),
                Arc::new(StringArray::from(texts)),
                Arc::new(StringArray::from(metadata_refs)),
                Arc::new(embeddings_list),
            ],
        )
        .context("Failed to create RecordBatch")?;

        Ok(batch)
    }

    /// 테이블 존재 여부 확인
    async fn table_exists(&self) -> bool {
        self.db
            .table_names()
            .execute()
            .await
            .map(|names| names.contains(&TABLE_NAME.to_string()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ChunkIndex for LanceChunkIndex {
    async fn insert_batch(&self, records: &[ChunkRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let batch = self.records_to_batch(records)?;
        let schema = batch.schema();
        let batches = RecordBatchIterator::new(vec![Ok(batch)], schema);

        if self.table_exists().await {
            // 기존 테이블에 단일 커밋으로 추가
            let table = self
                .db
                .open_table(TABLE_NAME)
                .execute()
                .await
                .context("Failed to open table")?;

            table
                .add(batches)
                .execute()
                .await
                .context("Failed to add chunks to table")?;
        } else {
            // 새 테이블 생성
            self.db
                .create_table(TABLE_NAME, batches)
                .execute()
                .await
                .context("Failed to create table")?;
        }

        Ok(records.len())
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        if limit == 0 || !self.table_exists().await {
            return Ok(vec![]);
        }

        let table = self
            .db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open table for search")?;

        // 코사인 거리 기반 벡터 검색
        let results = table
            .vector_search(query_embedding.to_vec())
            .context("Failed to create vector search")?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .context("Failed to execute vector search")?;

        let batches: Vec<RecordBatch> = results.try_collect().await?;
        let mut chunks = Vec::new();

        for batch in batches {
            let chunk_ids = batch
                .column_by_name("chunk_id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing chunk_id column"))?;

            let doc_ids = batch
                .column_by_name("doc_id")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing doc_id column"))?;

            let texts = batch
                .column_by_name("text")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing text column"))?;

            let metadata_json = batch
                .column_by_name("metadata")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing metadata column"))?;

            // _distance 컬럼 (LanceDB가 자동 추가)
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>());

            for i in 0..batch.num_rows() {
                // 거리 값이 없거나 null이면 스코어는 0.0
                let distance = distances.and_then(|d| {
                    if d.is_null(i) {
                        None
                    } else {
                        Some(d.value(i))
                    }
                });

                let metadata: Metadata =
                    serde_json::from_str(metadata_json.value(i)).unwrap_or_default();

                chunks.push(ScoredChunk {
                    chunk_id: chunk_ids.value(i).to_string(),
                    doc_id: doc_ids.value(i).to_string(),
                    text: texts.value(i).to_string(),
                    metadata,
                    score: score_from_distance(distance),
                });
            }
        }

        Ok(chunks)
    }

    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<usize> {
        if !self.table_exists().await {
            return Ok(0);
        }

        let table = self
            .db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open table for delete")?;

        let before_count = self.count().await?;

        // doc_id에 포함될 수 있는 따옴표 이스케이프
        let filter = format!("doc_id = '{}'", doc_id.replace('\'', "''"));
        table
            .delete(&filter)
            .await
            .context("Failed to delete chunks")?;

        let after_count = self.count().await?;
        Ok(before_count.saturating_sub(after_count))
    }

    async fn count(&self) -> Result<usize> {
        if !self.table_exists().await {
            return Ok(0);
        }

        let table = self
            .db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open table for count")?;

        let count = table.count_rows(None).await.context("Failed to count rows")?;
        Ok(count)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIM: usize = 8;

    fn test_record(doc_id: &str, chunk_index: i32, embedding: Vec<f32>) -> ChunkRecord {
        let mut metadata = Metadata::new();
        metadata.insert(
            "doc_id".to_string(),
            serde_json::Value::String(doc_id.to_string()),
        );

        ChunkRecord {
            chunk_id: format!("{}_{}", doc_id, chunk_index),
            doc_id: doc_id.to_string(),
            chunk_index,
            text: format!("chunk {} of {}", chunk_index, doc_id),
            metadata,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let dir = TempDir::new().unwrap();
        let index = LanceChunkIndex::open(&dir.path().join("chunks.lance"), DIM)
            .await
            .unwrap();

        assert_eq!(index.count().await.unwrap(), 0);

        let records = vec![
            test_record("doc_a", 0, vec![0.1; DIM]),
            test_record("doc_a", 1, vec![0.2; DIM]),
        ];
        let inserted = index.insert_batch(&records).await.unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(index.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_search_empty_index() {
        let dir = TempDir::new().unwrap();
        let index = LanceChunkIndex::open(&dir.path().join("chunks.lance"), DIM)
            .await
            .unwrap();

        let results = index.search(&vec![0.5; DIM], 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_returns_fields_and_metadata() {
        let dir = TempDir::new().unwrap();
        let index = LanceChunkIndex::open(&dir.path().join("chunks.lance"), DIM)
            .await
            .unwrap();

        let mut embedding = vec![0.0; DIM];
        embedding[0] = 1.0;
        index
            .insert_batch(&[test_record("doc_a", 0, embedding.clone())])
            .await
            .unwrap();

        let results = index.search(&embedding, 3).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk_id, "doc_a_0");
        assert_eq!(results[0].doc_id, "doc_a");
        assert_eq!(
            results[0].metadata.get("doc_id"),
            Some(&serde_json::Value::String("doc_a".to_string()))
        );
        // 동일 벡터이므로 코사인 거리 0, 스코어 1에 근접
        assert!(results[0].score > 0.99);
    }

    #[tokio::test]
    async fn test_search_clamps_to_available() {
        let dir = TempDir::new().unwrap();
        let index = LanceChunkIndex::open(&dir.path().join("chunks.lance"), DIM)
            .await
            .unwrap();

        let records = vec![
            test_record("doc_a", 0, vec![0.3; DIM]),
            test_record("doc_b", 0, vec![0.7; DIM]),
        ];
        index.insert_batch(&records).await.unwrap();

        let results = index.search(&vec![0.5; DIM], 10).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_by_doc_id() {
        let dir = TempDir::new().unwrap();
        let index = LanceChunkIndex::open(&dir.path().join("chunks.lance"), DIM)
            .await
            .unwrap();

        let records = vec![
            test_record("doc_a", 0, vec![0.1; DIM]),
            test_record("doc_a", 1, vec![0.2; DIM]),
            test_record("doc_b", 0, vec![0.3; DIM]),
        ];
        index.insert_batch(&records).await.unwrap();

        let deleted = index.delete_by_doc_id("doc_a").await.unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(index.count().await.unwrap(), 1);
    }
}
