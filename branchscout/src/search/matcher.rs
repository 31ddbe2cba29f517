use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use crate::config::ScanConfig;
use crate::errors::{ScanError, ScanResult};

/// How a raw search term becomes a regular expression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// Wrap the term in word-boundary anchors
    pub whole_word: bool,
    /// Match case exactly; when false the whole pattern gets `(?i)`
    pub case_sensitive: bool,
    /// Escape regex metacharacters in the term first
    pub literal: bool,
}

impl PatternOptions {
    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            whole_word: config.match_word,
            case_sensitive: config.search_case_sensitive,
            literal: config.literal_terms,
        }
    }
}

/// Builds the pattern source for `term`.
///
/// Word boundaries are applied before the case modifier so that a
/// case-insensitive whole-word search keeps its anchors.
pub fn pattern_source(term: &str, options: PatternOptions) -> String {
    let body = if options.literal {
        regex::escape(term)
    } else {
        term.to_string()
    };
    let bounded = if options.whole_word {
        format!(r"\b(?:{})\b", body)
    } else {
        body
    };
    if options.case_sensitive {
        bounded
    } else {
        format!("(?i){}", bounded)
    }
}

/// Compiles `term` into a matcher, reporting an invalid expression as a
/// configuration error for the whole run
pub fn build_pattern(term: &str, options: PatternOptions) -> ScanResult<Regex> {
    let source = pattern_source(term, options);
    debug!("Compiling pattern for term '{}': {}", term, source);
    Regex::new(&source).map_err(|e| ScanError::invalid_pattern(term, e.to_string()))
}

/// A search term together with its compiled pattern
#[derive(Debug, Clone)]
pub struct CompiledTerm {
    pub term: String,
    pub pattern: Regex,
}

/// Compiles every configured term up front; the first invalid term aborts
pub fn compile_terms(config: &ScanConfig) -> ScanResult<Arc<[CompiledTerm]>> {
    let options = PatternOptions::from_config(config);
    config
        .search_terms
        .iter()
        .map(|term| {
            Ok(CompiledTerm {
                term: term.clone(),
                pattern: build_pattern(term, options)?,
            })
        })
        .collect()
}
