//! 문서 저장소 모듈 - 영속 청크 컬렉션
//!
//! - SQLite 카탈로그: 문서 단위 메타 (이름, 청크 수, 다이제스트)
//! - LanceDB 인덱스: 청크 본문 + 임베딩, 최근접 이웃 검색
//! - 임베딩 프로바이더는 생성 시 주입됩니다
//!
//! 저장소 핸들은 명시적으로 열고 (open), Drop 시 연결이 닫힙니다.
//! 전역 싱글턴은 없습니다.

pub mod catalog;
pub mod chunker;
pub mod lance;
pub mod vector;

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

pub use catalog::{DocumentCatalog, DocumentInfo};
pub use chunker::{chunk_pages, default_chunker, word_chunker, ChunkConfig, Chunker, WordChunker, DEFAULT_MAX_WORDS};
pub use lance::LanceChunkIndex;
pub use vector::{cosine_similarity, score_from_distance, ChunkIndex, ChunkRecord, Metadata, ScoredChunk};

// ============================================================================
// Data Directory
// ============================================================================

/// 데이터 디렉토리 경로 (~/.ragmod/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".ragmod")
}

// ============================================================================
// Types
// ============================================================================

/// 저장소 통계
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// 등록된 문서 수
    pub document_count: usize,
    /// 저장된 청크 수
    pub chunk_count: usize,
    /// 데이터 디렉토리
    pub data_dir: PathBuf,
}

// ============================================================================
// DocumentStore
// ============================================================================

/// 문서 저장소 - 영속 청크 컬렉션 핸들
///
/// 배치 삽입은 all-or-nothing입니다: 임베딩을 전부 계산한 뒤에만
/// 쓰기를 시작하고, 카탈로그 등록이 실패하면 방금 쓴 청크를
/// 되돌립니다.
pub struct DocumentStore {
    catalog: DocumentCatalog,
    index: Box<dyn ChunkIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    data_dir: PathBuf,
}

impl DocumentStore {
    /// 지정한 디렉토리에서 저장소 열기
    ///
    /// 카탈로그는 `<data_dir>/catalog.db`, 청크 인덱스는
    /// `<data_dir>/chunks.lance`에 놓입니다.
    pub async fn open(data_dir: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let catalog = DocumentCatalog::open(&data_dir.join("catalog.db"))
            .map_err(|source| RagError::Store { source })?;

        let index = LanceChunkIndex::open(&data_dir.join("chunks.lance"), embedder.dimension())
            .await
            .map_err(|source| RagError::Store { source })?;

        tracing::debug!("Document store opened at {:?}", data_dir);

        Ok(Self {
            catalog,
            index: Box::new(index),
            embedder,
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// 기본 위치에서 열기 (~/.ragmod/)
    pub async fn open_default(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let data_dir = get_data_dir();
        Self::open(&data_dir, embedder).await
    }

    /// 데이터 디렉토리 반환
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 새 문서 ID 생성 ("doc_" + 12자리 소문자 16진수)
    fn generate_doc_id() -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("doc_{}", &hex[..12])
    }

    /// 청크 텍스트들의 SHA-256 다이제스트 (문서의 콘텐츠 주소)
    fn content_digest(chunks: &[String]) -> String {
        let mut hasher = Sha256::new();
        for chunk in chunks {
            hasher.update(chunk.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// 청크 배치 삽입
    ///
    /// 새 문서 ID를 생성하고, 청크마다 임베딩을 계산한 뒤 전부
    /// 기록합니다. 생성된 문서 ID를 반환합니다.
    pub async fn insert(&self, chunks: &[String], metadata: &Metadata) -> Result<String> {
        self.insert_named(chunks, metadata, None).await
    }

    /// 소스 이름 힌트와 함께 청크 배치 삽입
    pub async fn insert_named(
        &self,
        chunks: &[String],
        metadata: &Metadata,
        name: Option<String>,
    ) -> Result<String> {
        let doc_id = Self::generate_doc_id();

        // ID 충돌은 치명적 무결성 오류
        let exists = self
            .catalog
            .contains(&doc_id)
            .map_err(|source| RagError::Store { source })?;
        if exists {
            return Err(RagError::Store {
                source: anyhow::anyhow!("Document id collision: {}", doc_id),
            });
        }

        // 쓰기 전에 임베딩을 전부 계산 (실패 시 아무것도 남지 않음)
        if !chunks.is_empty() {
            let embeddings = self
                .embedder
                .embed_batch(chunks)
                .await
                .map_err(|source| RagError::Embedding {
                    provider: self.embedder.name().to_string(),
                    source,
                })?;

            // 청크 메타데이터 = 호출자 메타데이터 ∪ {doc_id}
            let mut chunk_metadata = metadata.clone();
            chunk_metadata.insert(
                "doc_id".to_string(),
                serde_json::Value::String(doc_id.clone()),
            );

            let records: Vec<ChunkRecord> = chunks
                .iter()
                .zip(embeddings)
                .enumerate()
                .map(|(i, (text, embedding))| ChunkRecord {
                    chunk_id: format!("{}_{}", doc_id, i),
                    doc_id: doc_id.clone(),
                    chunk_index: i as i32,
                    text: text.clone(),
                    metadata: chunk_metadata.clone(),
                    embedding,
                })
                .collect();

            // 단일 커밋 배치 쓰기
            self.index
                .insert_batch(&records)
                .await
                .map_err(|source| RagError::Store { source })?;
        } else {
            tracing::warn!("Registering document {} with zero chunks", doc_id);
        }

        let info = DocumentInfo {
            doc_id: doc_id.clone(),
            name,
            chunk_count: chunks.len(),
            metadata: metadata.clone(),
            content_sha256: Self::content_digest(chunks),
            created_at: Utc::now(),
        };

        // 카탈로그 등록 실패 시 방금 쓴 청크를 되돌림
        if let Err(source) = self.catalog.insert_document(&info) {
            if !chunks.is_empty() {
                if let Err(e) = self.index.delete_by_doc_id(&doc_id).await {
                    tracing::warn!("Failed to roll back chunks for {}: {}", doc_id, e);
                }
            }
            return Err(RagError::Store { source });
        }

        tracing::info!("Inserted document {} ({} chunks)", doc_id, chunks.len());
        Ok(doc_id)
    }

    /// 최근접 이웃 검색
    ///
    /// 쿼리 텍스트를 임베딩하여 상위 `top_k` 청크를 스코어 내림차순으로
    /// 반환합니다. 백엔드의 정렬을 신뢰하지 않고 반환 전에 명시적으로
    /// 재정렬합니다.
    pub async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Ok(vec![]);
        }

        let query_embedding =
            self.embedder
                .embed_query(query_text)
                .await
                .map_err(|source| RagError::Embedding {
                    provider: self.embedder.name().to_string(),
                    source,
                })?;

        let mut results = self
            .index
            .search(&query_embedding, top_k)
            .await
            .map_err(|source| RagError::Store { source })?;

        // 백엔드의 정렬 주장과 무관하게 스코어 내림차순 재정렬
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(top_k);

        tracing::debug!("Query returned {} chunks (top_k={})", results.len(), top_k);
        Ok(results)
    }

    /// ID로 문서 조회
    pub fn get_document(&self, doc_id: &str) -> Result<Option<DocumentInfo>> {
        self.catalog
            .get_document(doc_id)
            .map_err(|source| RagError::Store { source })
    }

    /// 문서 목록 조회 (최신순)
    pub fn list_documents(&self, limit: usize) -> Result<Vec<DocumentInfo>> {
        self.catalog
            .list_documents(limit)
            .map_err(|source| RagError::Store { source })
    }

    /// 저장소 통계
    pub async fn stats(&self) -> Result<StoreStats> {
        let document_count = self
            .catalog
            .document_count()
            .map_err(|source| RagError::Store { source })?;

        let chunk_count = self
            .index
            .count()
            .await
            .map_err(|source| RagError::Store { source })?;

        Ok(StoreStats {
            document_count,
            chunk_count,
            data_dir: self.data_dir.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
