//! 언어 모델 모듈 - Gemini generateContent API
//!
//! 프롬프트를 받아 텍스트를 생성하는 언어 모델 프로바이더입니다.
//! 모델 내부는 불투명하게 다루며, 호출당 HTTP 왕복 한 번입니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::get_api_key;

// ============================================================================
// LlmProvider Trait
// ============================================================================

/// 언어 모델 프로바이더 트레이트
///
/// 프롬프트를 텍스트 응답으로 변환하는 인터페이스입니다.
/// 생성기에 주입되어 테스트에서는 모의 구현으로 대체할 수 있습니다.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// 프롬프트로 텍스트 생성
    async fn generate(&self, prompt: &str, model_id: &str, temperature: f32) -> Result<String>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Google Gemini LLM
// ============================================================================

/// Gemini generateContent API 베이스 URL
const GEMINI_GENERATE_BASE_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models";

/// 기본 모델 ID
pub const DEFAULT_MODEL_ID: &str = "gemini-2.0-flash";

/// Google Gemini 언어 모델 구현체
#[derive(Debug)]
pub struct GeminiLlm {
    api_key: String,
    client: reqwest::Client,
}

impl GeminiLlm {
    /// 새 Gemini LLM 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - Google AI API 키
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { api_key, client })
    }

    /// 환경변수에서 API 키를 읽어 생성
    ///
    /// 우선순위: GEMINI_API_KEY > GOOGLE_AI_API_KEY
    pub fn from_env() -> Result<Self> {
        let api_key = get_api_key()?;
        Self::new(api_key)
    }
}

/// Gemini generateContent 요청 본문
#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GenerateContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerateContent {
    parts: Vec<GeneratePart>,
}

#[derive(Debug, Serialize)]
struct GeneratePart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

/// Gemini generateContent 응답
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: String,
}

#[async_trait]
impl LlmProvider for GeminiLlm {
    async fn generate(&self, prompt: &str, model_id: &str, temperature: f32) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent",
            GEMINI_GENERATE_BASE_URL, model_id
        );

        let request = GenerateRequest {
            contents: vec![GenerateContent {
                parts: vec![GeneratePart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig { temperature },
        };

        // API 호출 (API 키는 URL이 아닌 헤더로 전송)
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send generation request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            anyhow::bail!("Gemini API error ({}): {}", status, body);
        }

        let generate_response: GenerateResponse =
            serde_json::from_str(&body).context("Failed to parse generation response")?;

        // 첫 candidate의 파트들을 이어 붙여 반환
        let answer: String = generate_response
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if answer.is_empty() {
            anyhow::bail!("Gemini returned no candidates for model {}", model_id);
        }

        Ok(answer)
    }

    fn name(&self) -> &str {
        "gemini-generate"
    }
}

// ============================================================================
// Mock LLM
// ============================================================================

/// 모의 언어 모델
///
/// 받은 프롬프트를 그대로 되돌려줍니다. 프롬프트 조립을
/// 네트워크 없이 검증할 때 사용합니다.
#[derive(Debug, Default)]
pub struct MockLlm;

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(&self, prompt: &str, _model_id: &str, _temperature: f32) -> Result<String> {
        Ok(prompt.to_string())
    }

    fn name(&self) -> &str {
        "mock-llm"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_llm_echoes_prompt() {
        let llm = MockLlm;
        let answer = llm.generate("hello", DEFAULT_MODEL_ID, 0.2).await.unwrap();
        assert_eq!(answer, "hello");
    }

    #[test]
    fn test_generate_response_parsing() {
        let body = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "An "}, {"text": "answer"}]}}
            ]
        }"#;

        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates.len(), 1);
        assert_eq!(parsed.candidates[0].content.parts.len(), 2);
    }

    #[test]
    fn test_generate_response_without_candidates() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
