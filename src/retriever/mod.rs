//! 검색 모듈 - 저장소 위의 안정적 검색 심
//!
//! 생성기와 전송 계층이 저장소 내부 구조에 의존하지 않도록
//! "쿼리 문자열 → (doc_id, 스코어, 텍스트) 목록" 계약만 노출합니다.
//! 재정렬이나 재랭킹 없이 저장소 결과를 그대로 전달합니다.

use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::store::DocumentStore;

/// 기본 검색 결과 수
pub const DEFAULT_TOP_K: usize = 3;

// ============================================================================
// Types
// ============================================================================

/// 검색된 청크
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    /// 소속 문서 ID
    pub doc_id: String,
    /// 유사도 스코어 (높을수록 유사)
    pub score: f32,
    /// 청크 텍스트
    pub text: String,
}

// ============================================================================
// Retriever
// ============================================================================

/// 검색기 - 저장소 query의 패스스루
pub struct Retriever {
    store: Arc<DocumentStore>,
}

impl Retriever {
    /// 저장소 핸들로 생성
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// 상위 top_k 청크 검색
    ///
    /// 결과는 스코어 내림차순입니다 (정렬은 저장소가 보장).
    pub async fn retrieve_top_k(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        let results = self.store.query(query, top_k).await?;

        Ok(results
            .into_iter()
            .map(|chunk| RetrievedChunk {
                doc_id: chunk.doc_id,
                score: chunk.score,
                text: chunk.text,
            })
            .collect())
    }

    /// 기본 top_k(3)로 검색
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        self.retrieve_top_k(query, DEFAULT_TOP_K).await
    }
}

// ============================================================================
// Tests
// ============================================================================
