//! 문서 카탈로그 - rusqlite 기반 문서 메타 저장소
//!
//! 문서 단위 메타(이름, 청크 수, 메타데이터, 콘텐츠 다이제스트)를
//! 저장합니다. 청크 본문과 임베딩은 벡터 인덱스가 담당합니다.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;

use super::vector::Metadata;

// ============================================================================
// Types
// ============================================================================

/// 카탈로그에 등록된 문서 정보
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    /// 문서 ID
    pub doc_id: String,
    /// 소스 파일 이름 힌트
    pub name: Option<String>,
    /// 실제 저장된 청크 수
    pub chunk_count: usize,
    /// 수집 시 전달된 메타데이터
    pub metadata: Metadata,
    /// 청크 텍스트의 SHA-256 다이제스트
    pub content_sha256: String,
    /// 등록 시각 (UTC)
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// DocumentCatalog
// ============================================================================

/// 문서 카탈로그 - 동기 메타 저장소
///
/// 문서는 write-once입니다. 같은 doc_id로 두 번 등록하면 에러가
/// 되며, 호출자는 이를 무결성 오류로 다룹니다.
pub struct DocumentCatalog {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl DocumentCatalog {
    /// 카탈로그 열기 (없으면 생성)
    pub fn open(path: &Path) -> Result<Self> {
        // 부모 디렉토리 생성
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open SQLite database")?;

        let catalog = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.to_path_buf(),
        };

        catalog.initialize()?;
        Ok(catalog)
    }

    /// DB 경로 반환
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// 스키마 초기화
    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                doc_id TEXT PRIMARY KEY,
                name TEXT,
                chunk_count INTEGER NOT NULL,
                metadata TEXT NOT NULL,
                content_sha256 TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create documents table")?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at)",
            [],
        )
        .context("Failed to create created_at index")?;

        tracing::debug!("Document catalog initialized at {:?}", self.db_path);
        Ok(())
    }

    /// 문서 등록
    ///
    /// doc_id가 이미 존재하면 에러입니다 (PRIMARY KEY 충돌).
    pub fn insert_document(&self, info: &DocumentInfo) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let metadata_json =
            serde_json::to_string(&info.metadata).context("Failed to serialize metadata")?;

        conn.execute(
            "INSERT INTO documents (doc_id, name, chunk_count, metadata, content_sha256, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                info.doc_id,
                info.name,
                info.chunk_count as i64,
                metadata_json,
                info.content_sha256,
                info.created_at.to_rfc3339(),
            ],
        )
        .context("Failed to insert document")?;

        tracing::debug!(
            "Registered document {} ({} chunks)",
            info.doc_id,
            info.chunk_count
        );
        Ok(())
    }

    /// doc_id 존재 여부 확인
    pub fn contains(&self, doc_id: &str) -> Result<bool> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let row: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM documents WHERE doc_id = ?1",
                params![doc_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to check document id")?;

        Ok(row.is_some())
    }

    /// ID로 문서 조회
    pub fn get_document(&self, doc_id: &str) -> Result<Option<DocumentInfo>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT doc_id, name, chunk_count, metadata, content_sha256, created_at
             FROM documents WHERE doc_id = ?1",
        )?;

        let doc = stmt
            .query_row(params![doc_id], row_to_document)
            .optional()
            .context("Failed to query document")?;

        Ok(doc)
    }

    /// 문서 목록 조회 (최신순)
    pub fn list_documents(&self, limit: usize) -> Result<Vec<DocumentInfo>> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT doc_id, name, chunk_count, metadata, content_sha256, created_at
             FROM documents
             ORDER BY created_at DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], row_to_document)?;
        let docs = rows.filter_map(|r| r.ok()).collect();

        Ok(docs)
    }

    /// 등록된 문서 수
    pub fn document_count(&self) -> Result<usize> {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))
            .context("Failed to count documents")?;

        Ok(count as usize)
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// SQLite row를 DocumentInfo로 변환
fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<DocumentInfo> {
    let metadata_json: String = row.get(3)?;
    let created_at: String = row.get(5)?;

    Ok(DocumentInfo {
        doc_id: row.get(0)?,
        name: row.get(1)?,
        chunk_count: row.get::<_, i64>(2)? as usize,
        metadata: serde_json::from_str(&metadata_json).unwrap_or_default(),
        content_sha256: row.get(4)?,
        created_at: parse_datetime(created_at),
    })
}

/// RFC3339 문자열을 DateTime<Utc>로 파싱
fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_catalog() -> (TempDir, DocumentCatalog) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("catalog.db");
        let catalog = DocumentCatalog::open(&db_path).unwrap();
        (dir, catalog)
    }

    fn sample_info(doc_id: &str) -> DocumentInfo {
        let mut metadata = Metadata::new();
        metadata.insert(
            "category".to_string(),
            serde_json::Value::String("recipes".to_string()),
        );
        metadata.insert(
            "tags".to_string(),
            serde_json::Value::Array(vec![
                serde_json::Value::String("food".to_string()),
                serde_json::Value::String("pets".to_string()),
            ]),
        );

        DocumentInfo {
            doc_id: doc_id.to_string(),
            name: Some("notes.txt".to_string()),
            chunk_count: 2,
            metadata,
            content_sha256: "ab".repeat(32),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_and_get_document() {
        let (_dir, catalog) = create_test_catalog();

        let info = sample_info("doc_0123456789ab");
        catalog.insert_document(&info).unwrap();

        let retrieved = catalog.get_document("doc_0123456789ab").unwrap();
        assert!(retrieved.is_some());

        let retrieved = retrieved.unwrap();
        assert_eq!(retrieved.doc_id, "doc_0123456789ab");
        assert_eq!(retrieved.name, Some("notes.txt".to_string()));
        assert_eq!(retrieved.chunk_count, 2);
        assert_eq!(retrieved.content_sha256, info.content_sha256);
        assert_eq!(
            retrieved.metadata.get("category"),
            Some(&serde_json::Value::String("recipes".to_string()))
        );

        // 문자열 리스트 값도 JSON 라운드트립을 거쳐 보존됨
        let tags = retrieved.metadata.get("tags").and_then(|v| v.as_array());
        assert_eq!(tags.map(|t| t.len()), Some(2));

        // 타임스탬프는 RFC3339 라운드트립
        let delta = (retrieved.created_at - info.created_at).num_seconds().abs();
        assert!(delta < 2);
    }

    #[test]
    fn test_get_missing_document() {
        let (_dir, catalog) = create_test_catalog();
        let doc = catalog.get_document("doc_missing00000").unwrap();
        assert!(doc.is_none());
    }

    #[test]
    fn test_duplicate_id_is_error() {
        let (_dir, catalog) = create_test_catalog();

        let info = sample_info("doc_aaaaaaaaaaaa");
        catalog.insert_document(&info).unwrap();

        let result = catalog.insert_document(&info);
        assert!(result.is_err());
    }

    #[test]
    fn test_contains() {
        let (_dir, catalog) = create_test_catalog();

        assert!(!catalog.contains("doc_bbbbbbbbbbbb").unwrap());

        catalog
            .insert_document(&sample_info("doc_bbbbbbbbbbbb"))
            .unwrap();

        assert!(catalog.contains("doc_bbbbbbbbbbbb").unwrap());
    }

    #[test]
    fn test_list_documents_limit_and_count() {
        let (_dir, catalog) = create_test_catalog();

        for i in 0..5 {
            let mut info = sample_info(&format!("doc_{:012}", i));
            info.name = Some(format!("doc{}.txt", i));
            catalog.insert_document(&info).unwrap();
        }

        let all = catalog.list_documents(10).unwrap();
        assert_eq!(all.len(), 5);

        let limited = catalog.list_documents(3).unwrap();
        assert_eq!(limited.len(), 3);

        assert_eq!(catalog.document_count().unwrap(), 5);
    }

    #[test]
    fn test_catalog_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("catalog.db");

        {
            let catalog = DocumentCatalog::open(&db_path).unwrap();
            catalog
                .insert_document(&sample_info("doc_cccccccccccc"))
                .unwrap();
        }

        let catalog = DocumentCatalog::open(&db_path).unwrap();
        assert!(catalog.contains("doc_cccccccccccc").unwrap());
        assert_eq!(catalog.document_count().unwrap(), 1);
    }

    #[test]
    fn test_parse_datetime() {
        let dt = parse_datetime("2026-01-01T00:00:00+00:00".to_string());
        assert_eq!(dt.to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }
}
