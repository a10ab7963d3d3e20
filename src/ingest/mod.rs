//! 수집 파이프라인 모듈
//!
//! 파일 경로를 받아 텍스트를 추출하고, 청킹한 뒤 문서 저장소에
//! 기록합니다. 경로 해석 → 형식 판별 → 추출 → 청킹 → 삽입 순서로
//! 진행되며, 각 단계의 실패는 타입이 있는 에러로 전파됩니다.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{RagError, Result};
use crate::extractor;
use crate::store::{chunk_pages, ChunkConfig, DocumentStore, Metadata};

// ============================================================================
// Types
// ============================================================================

/// 수집 결과
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    /// 생성된 문서 ID
    pub document_id: String,
    /// 실제 저장된 청크 수
    pub chunks_stored: usize,
}

// ============================================================================
// IngestPipeline
// ============================================================================

/// 수집 파이프라인
///
/// 저장소 핸들을 공유로 받아 쓰기 경로를 담당합니다.
pub struct IngestPipeline {
    store: Arc<DocumentStore>,
    chunk_config: ChunkConfig,
}

impl IngestPipeline {
    /// 기본 청킹 설정 (500 단어, 중첩 없음)으로 생성
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self::with_chunk_config(store, ChunkConfig::default())
    }

    /// 청킹 설정을 지정하여 생성
    pub fn with_chunk_config(store: Arc<DocumentStore>, chunk_config: ChunkConfig) -> Self {
        Self {
            store,
            chunk_config,
        }
    }

    /// 파일 수집
    ///
    /// 경로를 해석하고, 지원 형식이면 텍스트를 추출해 청킹한 뒤
    /// 저장소에 기록합니다. 생성된 문서 ID와 실제 저장된 청크 수를
    /// 반환합니다.
    pub async fn ingest(&self, file_path: &str, metadata: &Metadata) -> Result<IngestReceipt> {
        let path = resolve_path(file_path);

        // 존재 확인이 확장자 검사보다 먼저
        if !path.exists() {
            return Err(RagError::NotFound { path });
        }

        let kind = extractor::detect_kind(&path).ok_or_else(|| RagError::UnsupportedType {
            extension: extractor::extension_label(&path),
        })?;

        let pages = extractor::extract_pages(&path, kind)
            .await
            .map_err(|source| RagError::Extraction {
                path: path.clone(),
                source,
            })?;

        let chunks = chunk_pages(&pages, &self.chunk_config);

        if chunks.is_empty() {
            tracing::warn!("No text extracted from {:?}, storing empty document", path);
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.to_string());

        let document_id = self.store.insert_named(&chunks, metadata, name).await?;

        tracing::info!(
            "Ingested {:?} as {} ({} chunks)",
            path,
            document_id,
            chunks.len()
        );

        Ok(IngestReceipt {
            document_id,
            chunks_stored: chunks.len(),
        })
    }
}

// ============================================================================
// Path Resolution
// ============================================================================

/// 파일 경로 해석
///
/// 선행 `~`는 홈 디렉토리로 확장하고, 상대 경로는 현재 작업
/// 디렉토리를 기준으로 절대화합니다.
fn resolve_path(file_path: &str) -> PathBuf {
    let expanded = if file_path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(file_path))
    } else if let Some(rest) = file_path.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(file_path),
        }
    } else {
        PathBuf::from(file_path)
    };

    if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    }
}

// ============================================================================
// Tests
// ============================================================================
