//! 콘텐츠 추출 모듈
//!
//! 지원하는 파일 형식에서 페이지 단위 텍스트를 추출합니다.
//! - 텍스트 파일: UTF-8 lossy 읽기 (단일 페이지)
//! - PDF 파일: pdf-extract로 페이지별 텍스트 추출

pub mod pdf;

use std::path::Path;

use anyhow::{Context, Result};

// ============================================================================
// File Kind
// ============================================================================

/// 지원하는 파일 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// 일반 텍스트 (.txt)
    Text,
    /// PDF 문서 (.pdf)
    Pdf,
}

/// 확장자로 파일 종류 판별 (ASCII 대소문자 무시)
///
/// 지원하지 않는 확장자는 None입니다.
pub fn detect_kind(path: &Path) -> Option<FileKind> {
    let ext = path.extension().and_then(|e| e.to_str())?;

    match ext.to_ascii_lowercase().as_str() {
        "txt" => Some(FileKind::Text),
        "pdf" => Some(FileKind::Pdf),
        _ => None,
    }
}

/// 경로의 확장자를 표시용 문자열로 반환 (".docx" 형태)
///
/// 확장자가 없으면 "(none)"입니다. 미지원 형식 에러 메시지에
/// 확장자를 그대로 담기 위해 사용합니다.
pub fn extension_label(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_else(|| "(none)".to_string())
}

// ============================================================================
// Text Extraction
// ============================================================================

/// 텍스트 파일을 UTF-8로 읽기 (잘못된 바이트는 대체 문자로)
pub async fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read text file: {:?}", path))?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// 파일에서 페이지 텍스트 목록 추출
///
/// 텍스트 파일은 전체가 1 페이지, PDF는 추출 가능한 페이지당
/// 하나씩입니다. PDF 추출은 CPU 바운드라 blocking 태스크에서
/// 수행합니다.
pub async fn extract_pages(path: &Path, kind: FileKind) -> Result<Vec<String>> {
    match kind {
        FileKind::Text => {
            let text = read_text_lossy(path).await?;
            Ok(vec![text])
        }
        FileKind::Pdf => {
            let path = path.to_path_buf();
            tokio::task::spawn_blocking(move || pdf::extract_pdf_pages(&path))
                .await
                .context("PDF extraction task failed")?
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
