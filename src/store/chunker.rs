//! 텍스트 청킹 모듈
//!
//! 추출된 텍스트를 단어 수 기준으로 분할합니다.
//! 청크를 공백으로 다시 이으면 원본 단어 순서가 그대로 재현됩니다.

// ============================================================================
// Chunk Configuration
// ============================================================================

/// 기본 청크 크기 (단어 수)
pub const DEFAULT_MAX_WORDS: usize = 500;

/// 청킹 설정
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// 청크 당 최대 단어 수
    pub max_words: usize,
    /// 청크 간 중첩 단어 수 (기본 0, 명시적으로 요청할 때만 사용)
    pub overlap_words: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
            overlap_words: 0,
        }
    }
}

// ============================================================================
// Chunker Trait
// ============================================================================

/// 텍스트 청킹 전략 트레이트
pub trait Chunker: Send + Sync {
    /// 텍스트를 청크로 분할
    fn chunk(&self, text: &str) -> Vec<String>;

    /// 청커 이름
    fn name(&self) -> &'static str;
}

// ============================================================================
// WordChunker
// ============================================================================

/// 단어 수 기준 청커
///
/// 텍스트를 공백으로 쪼갠 뒤 연속된 단어를 `max_words` 개 이하의
/// 그룹으로 묶고, 단일 공백으로 다시 잇습니다.
pub struct WordChunker {
    config: ChunkConfig,
}

impl WordChunker {
    /// 설정으로 생성
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// 기본 설정으로 생성 (500 단어, 중첩 없음)
    pub fn with_defaults() -> Self {
        Self::new(ChunkConfig::default())
    }
}

impl Chunker for WordChunker {
    fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return vec![];
        }

        // max_words 0은 1로, 중첩은 max_words - 1 이하로 보정
        let max_words = self.config.max_words.max(1);
        let overlap = self.config.overlap_words.min(max_words - 1);

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < words.len() {
            let end = (start + max_words).min(words.len());
            chunks.push(words[start..end].join(" "));

            if end >= words.len() {
                break;
            }

            start += max_words - overlap;
        }

        chunks
    }

    fn name(&self) -> &'static str {
        "WordChunker"
    }
}

// ============================================================================
// Page Chunking
// ============================================================================

/// 페이지 텍스트 목록을 순서대로 청킹
///
/// 페이지 j의 모든 청크는 페이지 j+1의 청크보다 앞에 옵니다.
pub fn chunk_pages(texts: &[String], config: &ChunkConfig) -> Vec<String> {
    let chunker = WordChunker::new(config.clone());
    texts.iter().flat_map(|text| chunker.chunk(text)).collect()
}

// ============================================================================
// Factory Functions
// ============================================================================

/// 기본 청커 생성
pub fn default_chunker() -> Box<dyn Chunker> {
    Box::new(WordChunker::with_defaults())
}

/// 단어 청커 생성 (설정 지정)
pub fn word_chunker(config: ChunkConfig) -> Box<dyn Chunker> {
    Box::new(WordChunker::new(config))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max_words: usize, overlap_words: usize) -> WordChunker {
        WordChunker::new(ChunkConfig {
            max_words,
            overlap_words,
        })
    }

    #[test]
    fn test_chunk_groups_words() {
        let chunks = chunker(2, 0).chunk("a b c d e");
        assert_eq!(chunks, vec!["a b", "c d", "e"]);
    }

    #[test]
    fn test_chunk_empty() {
        assert!(chunker(2, 0).chunk("").is_empty());
        assert!(chunker(2, 0).chunk("   \n\t  ").is_empty());
    }

    #[test]
    fn test_chunk_boundary_at_max_words() {
        let words: Vec<String> = (1..=501).map(|i| format!("w{}", i)).collect();
        let text = words.join(" ");

        let chunks = chunker(500, 0).chunk(&text);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].split_whitespace().count(), 500);
        assert_eq!(chunks[1], "w501");
    }

    #[test]
    fn test_chunk_exact_multiple() {
        let chunks = chunker(2, 0).chunk("a b c d");
        assert_eq!(chunks, vec!["a b", "c d"]);
    }

    #[test]
    fn test_rejoin_reproduces_word_sequence() {
        let text = "one\ttwo  three\nfour five six seven";
        let chunks = chunker(3, 0).chunk(text);

        let rejoined = chunks.join(" ");
        let original: Vec<&str> = text.split_whitespace().collect();
        let restored: Vec<&str> = rejoined.split_whitespace().collect();

        assert_eq!(original, restored);
    }

    #[test]
    fn test_chunk_normalizes_whitespace() {
        let chunks = chunker(10, 0).chunk("hello\n  world");
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn test_overlap_opt_in() {
        let chunks = chunker(2, 1).chunk("a b c d e");
        assert_eq!(chunks, vec!["a b", "b c", "c d", "d e"]);
    }

    #[test]
    fn test_overlap_clamped_below_max() {
        // 중첩이 max_words 이상이면 max_words - 1로 보정되어 전진이 보장됨
        let chunks = chunker(2, 5).chunk("a b c d");
        assert_eq!(chunks, vec!["a b", "b c", "c d"]);
    }

    #[test]
    fn test_zero_max_words_treated_as_one() {
        let chunks = chunker(0, 0).chunk("a b c");
        assert_eq!(chunks, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_chunk_pages_preserves_page_order() {
        let pages = vec!["a b c".to_string(), "d e".to_string()];
        let config = ChunkConfig {
            max_words: 2,
            overlap_words: 0,
        };

        let chunks = chunk_pages(&pages, &config);
        assert_eq!(chunks, vec!["a b", "c", "d e"]);
    }

    #[test]
    fn test_chunk_pages_skips_blank_pages() {
        let pages = vec!["a b".to_string(), "   ".to_string(), "c".to_string()];
        let chunks = chunk_pages(&pages, &ChunkConfig::default());
        assert_eq!(chunks, vec!["a b", "c"]);
    }

    #[test]
    fn test_default_config() {
        let config = ChunkConfig::default();
        assert_eq!(config.max_words, 500);
        assert_eq!(config.overlap_words, 0);
    }

    #[test]
    fn test_factory_names() {
        assert_eq!(default_chunker().name(), "WordChunker");
        assert_eq!(
            word_chunker(ChunkConfig::default()).name(),
            "WordChunker"
        );
    }
}
