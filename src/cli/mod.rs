//! CLI 모듈
//!
//! ragmod CLI 명령어 정의 및 구현. 코어 위의 얇은 전송 계층으로,
//! 인자 파싱 이상의 검증 로직은 없습니다.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::embedding::{create_embedder, has_api_key};
use crate::generator::{Generator, DEFAULT_TEMPERATURE};
use crate::ingest::IngestPipeline;
use crate::llm::{GeminiLlm, DEFAULT_MODEL_ID};
use crate::retriever::{Retriever, DEFAULT_TOP_K};
use crate::store::{get_data_dir, DocumentStore, Metadata};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "ragmod")]
#[command(version, about = "검색 증강 생성(RAG) 백엔드 코어", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 파일을 문서 저장소에 수집 (.txt, .pdf)
    Ingest {
        /// 수집할 파일 경로
        file: PathBuf,

        /// 문서 메타데이터 (key=value, 반복 가능)
        #[arg(short, long)]
        meta: Vec<String>,
    },

    /// 저장소 검색 (검색만, 생성 없음)
    Query {
        /// 검색 쿼리
        query: String,

        /// 결과 개수 제한
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
    },

    /// 검색 후 답변 생성
    Ask {
        /// 질문
        query: String,

        /// 검색할 컨텍스트 개수
        #[arg(short, long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// 언어 모델 ID
        #[arg(short, long, default_value = DEFAULT_MODEL_ID)]
        model: String,

        /// 생성 온도
        #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
        temperature: f32,
    },

    /// 저장된 문서 목록
    List {
        /// 결과 개수 제한
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ingest { file, meta } => cmd_ingest(file, meta).await,
        Commands::Query { query, top_k } => cmd_query(&query, top_k).await,
        Commands::Ask {
            query,
            top_k,
            model,
            temperature,
        } => cmd_ask(&query, top_k, &model, temperature).await,
        Commands::List { limit } => cmd_list(limit).await,
        Commands::Status => cmd_status().await,
    }
}

/// 기본 위치의 저장소 열기 (API 키 필요)
async fn open_store() -> Result<Arc<DocumentStore>> {
    if !has_api_key() {
        bail!(
            "API 키가 설정되지 않았습니다.\n\n\
             설정 방법:\n  \
             export GEMINI_API_KEY=your-api-key\n  \
             또는\n  \
             export GOOGLE_AI_API_KEY=your-api-key\n\n\
             API 키 발급: https://aistudio.google.com/app/apikey"
        );
    }

    let embedder = Arc::new(create_embedder()?);
    let store = DocumentStore::open_default(embedder)
        .await
        .context("문서 저장소 열기 실패")?;

    Ok(Arc::new(store))
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 수집 명령어 (ingest)
async fn cmd_ingest(file: PathBuf, meta: Vec<String>) -> Result<()> {
    let metadata = parse_metadata(&meta)?;
    let store = open_store().await?;
    let pipeline = IngestPipeline::new(store);

    println!("[*] 수집 중: {}", file.display());

    let receipt = pipeline
        .ingest(&file.to_string_lossy(), &metadata)
        .await
        .context("문서 수집 실패")?;

    println!("[OK] 문서가 추가되었습니다");
    println!("     ID: {}", receipt.document_id);
    println!("     청크: {} 개", receipt.chunks_stored);

    Ok(())
}

/// 검색 명령어 (query)
async fn cmd_query(query: &str, top_k: usize) -> Result<()> {
    println!("[*] 검색 중: \"{}\"", query);

    let store = open_store().await?;
    let retriever = Retriever::new(store);

    let results = retriever
        .retrieve_top_k(query, top_k)
        .await
        .context("검색 실패")?;

    if results.is_empty() {
        println!("\n[!] 검색 결과가 없습니다.");
        return Ok(());
    }

    println!("\n[OK] 검색 결과 ({} 건):\n", results.len());

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [점수: {:.4}] {}",
            i + 1,
            result.score,
            result.doc_id
        );
        println!("   내용: {}", truncate_text(&result.text, 200));
        println!();
    }

    Ok(())
}

/// 질문 명령어 (ask) - 검색 후 생성
async fn cmd_ask(query: &str, top_k: usize, model: &str, temperature: f32) -> Result<()> {
    println!("[*] 검색 중: \"{}\"", query);

    let store = open_store().await?;
    let retriever = Retriever::new(store);

    let retrieved = retriever
        .retrieve_top_k(query, top_k)
        .await
        .context("검색 실패")?;

    if retrieved.is_empty() {
        println!("[!] 컨텍스트 없이 답변을 생성합니다.");
    } else {
        println!("[*] 컨텍스트 {} 건으로 답변 생성 중...", retrieved.len());
    }

    let llm = Arc::new(GeminiLlm::from_env()?);
    let generator = Generator::with_temperature(llm, temperature);

    let answer = generator
        .generate(query, &retrieved, model)
        .await
        .context("답변 생성 실패")?;

    println!("\n[OK] 답변:\n");
    println!("{}", answer);

    if !retrieved.is_empty() {
        println!("\n[*] 사용된 컨텍스트:");
        for result in &retrieved {
            println!("  - {} (점수: {:.4})", result.doc_id, result.score);
        }
    }

    Ok(())
}

/// 목록 명령어 (list)
async fn cmd_list(limit: usize) -> Result<()> {
    let store = open_store().await?;

    let docs = store.list_documents(limit).context("문서 목록 조회 실패")?;

    if docs.is_empty() {
        println!("[!] 저장된 문서가 없습니다.");
        return Ok(());
    }

    println!("[OK] 저장된 문서 ({} 건):\n", docs.len());

    for doc in docs {
        let name = doc.name.as_deref().unwrap_or("-");
        println!("  {} [{}]", doc.doc_id, name);
        println!(
            "        {} | {} 청크 | sha256:{}",
            doc.created_at.format("%Y-%m-%d %H:%M"),
            doc.chunk_count,
            &doc.content_sha256[..12.min(doc.content_sha256.len())]
        );
        println!();
    }

    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status() -> Result<()> {
    println!("ragmod v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // 데이터 디렉토리
    let data_dir = get_data_dir();
    println!("[*] 데이터 디렉토리: {}", data_dir.display());

    // API 키 상태
    if has_api_key() {
        println!("[OK] API 키: 설정됨");
    } else {
        println!("[!] API 키: 미설정");
        println!("    설정: export GEMINI_API_KEY=your-key");
        return Ok(());
    }

    // 저장소 통계
    match open_store().await {
        Ok(store) => match store.stats().await {
            Ok(stats) => {
                println!("[OK] 저장된 문서: {} 건", stats.document_count);
                println!("     저장된 청크: {} 개", stats.chunk_count);
            }
            Err(e) => {
                println!("[!] 통계 조회 실패: {}", e);
            }
        },
        Err(e) => {
            println!("[!] 저장소 열기 실패: {}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// key=value 목록을 메타데이터로 파싱
fn parse_metadata(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();

    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("잘못된 메타데이터 형식: '{}' (key=value 필요)", pair))?;
        metadata.insert(
            key.to_string(),
            serde_json::Value::String(value.to_string()),
        );
    }

    Ok(metadata)
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================
