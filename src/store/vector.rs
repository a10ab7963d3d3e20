//! 벡터 인덱스 트레이트 및 유틸리티
//!
//! LanceDB ANN (Approximate Nearest Neighbor) 검색을 사용합니다.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

/// 청크 메타데이터 (문자열 키 -> JSON 값)
pub type Metadata = HashMap<String, serde_json::Value>;

// ============================================================================
// Types
// ============================================================================

/// 저장용 청크 레코드
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// 청크 ID ({doc_id}_{index})
    pub chunk_id: String,
    /// 소속 문서 ID
    pub doc_id: String,
    /// 청크 인덱스 (0-based)
    pub chunk_index: i32,
    /// 청크 텍스트
    pub text: String,
    /// 청크 메타데이터 (호출자 메타데이터 + doc_id)
    pub metadata: Metadata,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과 청크
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// 청크 ID
    pub chunk_id: String,
    /// 소속 문서 ID
    pub doc_id: String,
    /// 청크 텍스트
    pub text: String,
    /// 청크 메타데이터
    pub metadata: Metadata,
    /// 유사도 스코어 (1 - 코사인 거리, 높을수록 유사)
    pub score: f32,
}

// ============================================================================
// ChunkIndex Trait
// ============================================================================

/// 청크 인덱스 트레이트 (async)
///
/// 벡터 인덱스 백엔드의 공통 인터페이스입니다.
#[async_trait]
pub trait ChunkIndex: Send + Sync {
    /// 청크 배치 삽입 (단일 커밋)
    async fn insert_batch(&self, records: &[ChunkRecord]) -> Result<usize>;

    /// 최근접 이웃 검색
    ///
    /// 코사인 거리를 스코어로 변환해 반환합니다. 반환 순서는
    /// 백엔드에 따라 다를 수 있으므로 호출자가 재정렬합니다.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<ScoredChunk>>;

    /// doc_id로 청크 삭제
    async fn delete_by_doc_id(&self, doc_id: &str) -> Result<usize>;

    /// 저장된 청크 개수
    async fn count(&self) -> Result<usize>;
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 거리를 유사도 스코어로 변환
///
/// score = 1 - distance. 거리가 없거나 유한하지 않으면 0.0입니다.
pub fn score_from_distance(distance: Option<f32>) -> f32 {
    match distance {
        Some(d) if d.is_finite() => 1.0 - d,
        _ => 0.0,
    }
}

/// 코사인 유사도 계산
///
/// 두 벡터 간의 코사인 유사도를 계산합니다.
/// 결과는 -1.0 ~ 1.0 범위입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Tests
// ============================================================================
