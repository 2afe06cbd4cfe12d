use crate::utils::error::{RelayError, Result};
use regex::{NoExpand, Regex, RegexBuilder};

pub const DEFAULT_BANNED_KEYWORDS: [&str; 5] = ["kill", "hack", "bomb", "terror", "attack"];
pub const DEFAULT_PLACEHOLDER: &str = "[REDACTED]";

/// Fixed keyword list used to moderate both prompts and model output.
///
/// Matching is plain case-insensitive substring search with no word
/// boundaries, so "hacker" is caught by "hack".
#[derive(Debug, Clone)]
pub struct Denylist {
    keywords: Vec<String>,
    lowered: Vec<String>,
    patterns: Vec<Regex>,
    placeholder: String,
}

impl Denylist {
    pub fn new<I, S>(keywords: I, placeholder: impl Into<String>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords.into_iter().map(Into::into).collect();
        let lowered = keywords.iter().map(|k| k.to_lowercase()).collect();

        let patterns = keywords
            .iter()
            .map(|keyword| {
                RegexBuilder::new(&regex::escape(keyword))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| RelayError::InvalidConfigValueError {
                        field: "moderation.banned_keywords".to_string(),
                        value: keyword.clone(),
                        reason: format!("Cannot build pattern: {}", e),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            keywords,
            lowered,
            patterns,
            placeholder: placeholder.into(),
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn contains_banned_words(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.lowered.iter().any(|word| lower.contains(word.as_str()))
    }

    /// Replaces every occurrence of each keyword, one keyword at a time, in
    /// list order.
    pub fn redact_banned_words(&self, text: &str) -> String {
        let mut result = text.to_string();
        for pattern in &self.patterns {
            result = pattern
                .replace_all(&result, NoExpand(&self.placeholder))
                .into_owned();
        }
        result
    }
}
