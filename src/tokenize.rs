//! Text analysis shared by index builds and queries.
//!
//! A token is a run of two or more word characters (alphanumeric or
//! underscore), lowercased. English stop-word removal is optional. Each
//! setting maps to a named tantivy analyzer; the name is recorded in the
//! index schema, so a loaded index always tokenizes queries the way it
//! tokenized its corpus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tantivy::tokenizer::{LowerCaser, RegexTokenizer, StopWordFilter, TextAnalyzer};

/// Lucene's default English stop set.
const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

const TOKEN_PATTERN: &str = r"\w\w+";

const PLAIN_ANALYZER: &str = "lexical";
const ENGLISH_ANALYZER: &str = "lexical_en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stopwords {
    #[default]
    None,
    #[serde(rename = "en")]
    English,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown stopword list '{0}': expected 'none' or 'en'")]
pub struct UnknownStopwords(String);

impl FromStr for Stopwords {
    type Err = UnknownStopwords;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "en" | "english" => Ok(Self::English),
            other => Err(UnknownStopwords(other.to_string())),
        }
    }
}

impl fmt::Display for Stopwords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::English => f.write_str("en"),
        }
    }
}

impl Stopwords {
    /// Name the analyzer is registered under in an index.
    pub fn analyzer_name(self) -> &'static str {
        match self {
            Self::None => PLAIN_ANALYZER,
            Self::English => ENGLISH_ANALYZER,
        }
    }

    /// Inverse of [`analyzer_name`](Self::analyzer_name).
    pub fn from_analyzer_name(name: &str) -> Option<Self> {
        match name {
            PLAIN_ANALYZER => Some(Self::None),
            ENGLISH_ANALYZER => Some(Self::English),
            _ => None,
        }
    }

    fn words(self) -> Vec<String> {
        match self {
            Self::None => Vec::new(),
            Self::English => ENGLISH_STOPWORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

/// Build the analyzer for `stopwords`.
pub fn analyzer(stopwords: Stopwords) -> tantivy::Result<TextAnalyzer> {
    Ok(TextAnalyzer::builder(RegexTokenizer::new(TOKEN_PATTERN)?)
        .filter(LowerCaser)
        .filter(StopWordFilter::remove(stopwords.words()))
        .build())
}

/// Run `text` through `analyzer`, returning tokens in order of appearance.
pub fn collect_tokens(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while let Some(token) = stream.next() {
        tokens.push(token.text.clone());
    }
    tokens
}
