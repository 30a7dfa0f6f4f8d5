//! Language handling: detection heuristics and per-language sentinel text.
//!
//! The transcription provider reports a detected language code; PDF text has
//! no such signal, so a codepoint scan decides. Sentinels cover every place
//! the engine must fill a field the model left empty, so downstream code
//! never renders a blank title or summary.

use serde::{Deserialize, Serialize};

/// Languages the analysis prompts and sentinels are tuned for. Everything
/// outside the known set falls back to English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh")]
    Chinese,
}

impl Language {
    /// Map a BCP-47-ish code from the transcription provider ("en", "en_us",
    /// "zh", "zh-CN", ...) onto a supported language.
    pub fn from_code(code: &str) -> Self {
        if code.trim().to_ascii_lowercase().starts_with("zh") {
            Language::Chinese
        } else {
            Language::English
        }
    }

    /// Heuristic detection for raw text (PDF imports): any CJK unified
    /// ideograph flips to Chinese.
    pub fn detect(text: &str) -> Self {
        let has_cjk = text
            .chars()
            .any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c) || ('\u{3400}'..='\u{4dbf}').contains(&c));
        if has_cjk {
            Language::Chinese
        } else {
            Language::English
        }
    }

    /// Code string used in prompts and request bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Chinese => "zh",
        }
    }

    /// Title used when analysis degraded or came back without one.
    pub fn fallback_title(&self) -> &'static str {
        match self {
            Language::English => "Voice note",
            Language::Chinese => "语音笔记",
        }
    }

    /// Summary placeholder for a missing summary.
    pub fn fallback_summary(&self) -> &'static str {
        match self {
            Language::English => "(no summary)",
            Language::Chinese => "（无摘要）",
        }
    }

    /// Tags applied when the model supplied none or analysis degraded.
    pub fn default_tags(&self) -> Vec<String> {
        let tags: &[&str] = match self {
            Language::English => &["voice", "note"],
            Language::Chinese => &["语音", "笔记"],
        };
        tags.iter().map(|t| t.to_string()).collect()
    }

    /// User-visible apology appended when chat completion fails.
    pub fn apology(&self) -> &'static str {
        match self {
            Language::English => {
                "Sorry, something went wrong while generating a response. Please try again."
            }
            Language::Chinese => "抱歉，生成回复时出了问题，请再试一次。",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code_variants() {
        assert_eq!(Language::from_code("en"), Language::English);
        assert_eq!(Language::from_code("en_us"), Language::English);
        assert_eq!(Language::from_code("zh"), Language::Chinese);
        assert_eq!(Language::from_code("zh-CN"), Language::Chinese);
        assert_eq!(Language::from_code("ZH"), Language::Chinese);
        assert_eq!(Language::from_code("fr"), Language::English);
        assert_eq!(Language::from_code(""), Language::English);
    }

    #[test]
    fn test_detect_cjk() {
        assert_eq!(Language::detect("pick up groceries"), Language::English);
        assert_eq!(Language::detect("买 牛奶"), Language::Chinese);
        assert_eq!(Language::detect("mixed 笔记 text"), Language::Chinese);
    }

    #[test]
    fn test_default_tags_per_language() {
        assert_eq!(Language::English.default_tags(), vec!["voice", "note"]);
        assert_eq!(Language::Chinese.default_tags(), vec!["语音", "笔记"]);
    }

    #[test]
    fn test_wire_codes() {
        assert_eq!(serde_json::to_string(&Language::English).unwrap(), "\"en\"");
        assert_eq!(
            serde_json::from_str::<Language>("\"zh\"").unwrap(),
            Language::Chinese
        );
    }
}
