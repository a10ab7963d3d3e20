//! 생성 모듈 - 검색 결과와 쿼리로 답변 합성
//!
//! 검색은 하지 않습니다. 호출자가 먼저 검색한 결과를 넘겨야 하며,
//! 생성 실패 시 이미 계산된 검색 결과는 호출자 쪽에 남아 있으므로
//! 재검색 없이 생성만 재시도할 수 있습니다.

use std::sync::Arc;

use crate::error::{RagError, Result};
use crate::llm::LlmProvider;
use crate::retriever::RetrievedChunk;

/// 기본 생성 온도
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

// ============================================================================
// Generator
// ============================================================================

/// 답변 생성기
///
/// 쿼리와 검색된 컨텍스트를 프롬프트로 조립하여 주입된 언어 모델을
/// 호출합니다. 세 입력(쿼리, 컨텍스트, 모델 ID)의 순수 함수이며
/// 비결정성은 모델 자체에서만 옵니다.
pub struct Generator {
    llm: Arc<dyn LlmProvider>,
    temperature: f32,
}

impl Generator {
    /// 기본 온도(0.2)로 생성
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self::with_temperature(llm, DEFAULT_TEMPERATURE)
    }

    /// 온도를 지정하여 생성
    pub fn with_temperature(llm: Arc<dyn LlmProvider>, temperature: f32) -> Self {
        Self { llm, temperature }
    }

    /// 답변 생성
    ///
    /// 컨텍스트가 비어 있으면 실패하는 대신 "컨텍스트 없음"
    /// 프롬프트로 쿼리만으로 답합니다.
    pub async fn generate(
        &self,
        query: &str,
        retrieved: &[RetrievedChunk],
        model_id: &str,
    ) -> Result<String> {
        let prompt = build_prompt(query, retrieved);

        tracing::debug!(
            "Generating answer with {} ({} context chunks)",
            model_id,
            retrieved.len()
        );

        self.llm
            .generate(&prompt, model_id, self.temperature)
            .await
            .map_err(|source| RagError::Generation {
                model: model_id.to_string(),
                source,
            })
    }
}

// ============================================================================
// Prompt Assembly
// ============================================================================

/// 쿼리와 검색 컨텍스트로 프롬프트 조립
///
/// 청크는 입력 순서 그대로 번호를 붙여 나열합니다.
fn build_prompt(query: &str, retrieved: &[RetrievedChunk]) -> String {
    let mut prompt = String::from(
        "You are a helpful assistant. Answer the question using the provided context.\n\n",
    );

    if retrieved.is_empty() {
        prompt.push_str(
            "No context was retrieved for this question. \
             Answer from general knowledge and say so explicitly.\n\n",
        );
    } else {
        prompt.push_str("Context:\n");
        for (i, chunk) in retrieved.iter().enumerate() {
            prompt.push_str(&format!("[{}] {}\n", i + 1, chunk.text));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!("Question: {}\nAnswer:", query));
    prompt
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;
    use async_trait::async_trait;

    /// 항상 실패하는 언어 모델 (에러 전파 검증용)
    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        async fn generate(
            &self,
            _prompt: &str,
            _model_id: &str,
            _temperature: f32,
        ) -> anyhow::Result<String> {
            anyhow::bail!("model backend down")
        }

        fn name(&self) -> &str {
            "failing-llm"
        }
    }

    fn chunk(doc_id: &str, score: f32, text: &str) -> RetrievedChunk {
        RetrievedChunk {
            doc_id: doc_id.to_string(),
            score,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_prompt_contains_query_and_chunks_in_order() {
        let retrieved = vec![
            chunk("doc_a", 0.9, "cats eat cat food"),
            chunk("doc_b", 0.5, "dogs eat dog food"),
        ];

        let prompt = build_prompt("what do cats eat?", &retrieved);

        assert!(prompt.contains("what do cats eat?"));
        assert!(prompt.contains("[1] cats eat cat food"));
        assert!(prompt.contains("[2] dogs eat dog food"));

        let first = prompt.find("cats eat cat food").unwrap();
        let second = prompt.find("dogs eat dog food").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_prompt_with_empty_context_is_explicit() {
        let prompt = build_prompt("what do cats eat?", &[]);

        assert!(prompt.contains("No context was retrieved"));
        assert!(prompt.contains("what do cats eat?"));
        assert!(!prompt.contains("Context:\n"));
    }

    #[tokio::test]
    async fn test_generate_passes_prompt_to_llm() {
        let generator = Generator::new(Arc::new(MockLlm));

        let retrieved = vec![chunk("doc_a", 0.9, "cats eat cat food")];
        let answer = generator
            .generate("what do cats eat?", &retrieved, "test-model")
            .await
            .unwrap();

        // MockLlm은 프롬프트를 그대로 반환
        assert!(answer.contains("cats eat cat food"));
        assert!(answer.contains("what do cats eat?"));
    }

    #[tokio::test]
    async fn test_generate_tolerates_empty_context() {
        let generator = Generator::new(Arc::new(MockLlm));

        let answer = generator
            .generate("what do cats eat?", &[], "test-model")
            .await
            .unwrap();

        assert!(answer.contains("No context was retrieved"));
    }

    #[tokio::test]
    async fn test_generate_failure_maps_to_generation_error() {
        let generator = Generator::new(Arc::new(FailingLlm));

        let result = generator.generate("query", &[], "test-model").await;

        let err = result.err().expect("generate should fail");
        assert_eq!(err.kind(), "generation_failed");
        assert!(err.to_string().contains("test-model"));
    }
}
