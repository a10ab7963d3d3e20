//! 에러 모듈 - RAG 코어 공통 에러 타입
//!
//! 전송 계층이 실패 종류를 문자열 매칭 없이 구분할 수 있도록
//! 변형별로 안정적인 kind 문자열을 제공합니다.

use std::path::PathBuf;

use thiserror::Error;

/// RAG 코어 공통 Result 타입
pub type Result<T> = std::result::Result<T, RagError>;

// ============================================================================
// RagError
// ============================================================================

/// RAG 코어 에러
///
/// 내부 계층은 anyhow로 컨텍스트를 쌓고, 코어 표면에서
/// 이 타입으로 변환합니다.
#[derive(Debug, Error)]
pub enum RagError {
    /// 수집 대상 파일이 존재하지 않음
    #[error("File not found: {}", .path.display())]
    NotFound { path: PathBuf },

    /// 지원하지 않는 파일 확장자
    #[error("Unsupported file type: {extension}")]
    UnsupportedType { extension: String },

    /// 텍스트 추출 실패
    #[error("Failed to extract text from {}", .path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// 임베딩 프로바이더 호출 실패
    #[error("Embedding failed ({provider})")]
    Embedding {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    /// 언어 모델 호출 실패
    #[error("Generation failed ({model})")]
    Generation {
        model: String,
        #[source]
        source: anyhow::Error,
    },

    /// 저장소 무결성 또는 영속화 실패
    #[error("Store operation failed")]
    Store {
        #[source]
        source: anyhow::Error,
    },
}

impl RagError {
    /// 실패 종류의 안정적 식별자
    pub fn kind(&self) -> &'static str {
        match self {
            RagError::NotFound { .. } => "not_found",
            RagError::UnsupportedType { .. } => "unsupported_type",
            RagError::Extraction { .. } => "extraction_failed",
            RagError::Embedding { .. } => "embedding_failed",
            RagError::Generation { .. } => "generation_failed",
            RagError::Store { .. } => "store_failed",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_type_names_extension() {
        let err = RagError::UnsupportedType {
            extension: ".docx".to_string(),
        };
        assert!(err.to_string().contains(".docx"));
        assert_eq!(err.kind(), "unsupported_type");
    }

    #[test]
    fn test_not_found_names_path() {
        let err = RagError::NotFound {
            path: PathBuf::from("/no/such/file.txt"),
        };
        assert!(err.to_string().contains("/no/such/file.txt"));
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_kinds_are_distinct() {
        let errors = vec![
            RagError::NotFound {
                path: PathBuf::from("x"),
            },
            RagError::UnsupportedType {
                extension: ".x".to_string(),
            },
            RagError::Extraction {
                path: PathBuf::from("x"),
                source: anyhow::anyhow!("boom"),
            },
            RagError::Embedding {
                provider: "p".to_string(),
                source: anyhow::anyhow!("boom"),
            },
            RagError::Generation {
                model: "m".to_string(),
                source: anyhow::anyhow!("boom"),
            },
            RagError::Store {
                source: anyhow::anyhow!("boom"),
            },
        ];

        let mut kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), 6);
    }

    #[test]
    fn test_source_is_preserved() {
        let err = RagError::Store {
            source: anyhow::anyhow!("disk full"),
        };
        let source = std::error::Error::source(&err);
        assert!(source.is_some());
        assert!(source
            .map(|s| s.to_string().contains("disk full"))
            .unwrap_or(false));
    }
}
