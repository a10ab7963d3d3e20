//! ragmod - 검색 증강 생성(RAG) 백엔드 코어
//!
//! 문서를 수집해 청크로 나누어 영속 벡터 인덱스에 저장하고,
//! 쿼리 시 가장 유사한 청크를 검색해 언어 모델에 전달하여
//! 답변을 합성합니다.
//!
//! - 쓰기 경로: IngestPipeline → Chunker → DocumentStore
//! - 읽기 경로: Retriever → Generator
//! - 임베딩/언어 모델은 주입된 프로바이더 트레이트로 추상화

pub mod cli;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod ingest;
pub mod llm;
pub mod retriever;
pub mod store;

// Re-exports
pub use embedding::{get_api_key, has_api_key, EmbeddingProvider, GeminiEmbedding, MockEmbedding};
pub use error::{RagError, Result};
pub use generator::{Generator, DEFAULT_TEMPERATURE};
pub use ingest::{IngestPipeline, IngestReceipt};
pub use llm::{GeminiLlm, LlmProvider, MockLlm, DEFAULT_MODEL_ID};
pub use retriever::{RetrievedChunk, Retriever, DEFAULT_TOP_K};
pub use store::{
    chunk_pages, default_chunker, get_data_dir, ChunkConfig, ChunkIndex, ChunkRecord, Chunker,
    DocumentCatalog, DocumentInfo, DocumentStore, LanceChunkIndex, Metadata, ScoredChunk,
    StoreStats, WordChunker, DEFAULT_MAX_WORDS,
};
