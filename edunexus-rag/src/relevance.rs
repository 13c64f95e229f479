//! Relevance filtering of retrieved chunks.
//!
//! Nearest-neighbour search always returns the closest chunks it has, even
//! when none of them has anything to do with the question. A
//! [`RelevanceFilter`] drops such chunks before they reach the prompt.

use crate::document::SearchResult;

/// Decides which retrieved chunks are plausibly relevant to a question.
///
/// Filters never reorder: survivors keep the nearest-first order they came in.
pub trait RelevanceFilter: Send + Sync {
    /// Return the subset of `results` worth showing to the language model.
    fn filter(&self, question: &str, results: Vec<SearchResult>) -> Vec<SearchResult>;
}

/// Keeps a chunk iff its lowercased text contains at least one question
/// token as a substring.
///
/// Tokens are the question's whitespace-separated words, lowercased, with
/// trailing `?` removed. No stemming and no stopword removal, so common
/// words such as "is" match almost anything: this is a cheap sanity guard
/// against wholly unrelated text, not a ranking step.
///
/// # Example
///
/// ```rust,ignore
/// use edunexus_rag::{KeywordFilter, RelevanceFilter};
///
/// let kept = KeywordFilter.filter("What is photosynthesis?", results);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordFilter;

impl KeywordFilter {
    /// Split a question into lowercase match tokens.
    pub fn tokenize(question: &str) -> Vec<String> {
        question
            .to_lowercase()
            .split_whitespace()
            .map(|word| word.trim_end_matches('?'))
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Whether `text` contains any of `tokens` (which must already be lowercase).
    pub fn matches(tokens: &[String], text: &str) -> bool {
        let text = text.to_lowercase();
        tokens.iter().any(|token| text.contains(token.as_str()))
    }
}

impl RelevanceFilter for KeywordFilter {
    fn filter(&self, question: &str, results: Vec<SearchResult>) -> Vec<SearchResult> {
        let tokens = Self::tokenize(question);
        results.into_iter().filter(|r| Self::matches(&tokens, &r.chunk.text)).collect()
    }
}

/// A filter that keeps every retrieved chunk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughFilter;

impl RelevanceFilter for PassThroughFilter {
    fn filter(&self, _question: &str, results: Vec<SearchResult>) -> Vec<SearchResult> {
        results
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::document::Chunk;

    fn result(text: &str) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: text.to_string(),
                text: text.to_string(),
                embedding: Vec::new(),
                metadata: HashMap::new(),
                document_id: "doc".to_string(),
            },
            score: 0.5,
        }
    }

    #[test]
    fn tokenizes_on_whitespace_and_lowercases() {
        assert_eq!(
            KeywordFilter::tokenize("What is Newton's second law?"),
            vec!["what", "is", "newton's", "second", "law"]
        );
    }

    #[test]
    fn lone_question_marks_are_not_tokens() {
        assert_eq!(KeywordFilter::tokenize("  ?  Atoms ? "), vec!["atoms"]);
        assert!(KeywordFilter::tokenize("").is_empty());
    }

    #[test]
    fn keeps_chunks_sharing_a_word() {
        let kept = KeywordFilter.filter(
            "What is Newton's second law?",
            vec![result("Newton's second law states force equals mass times acceleration.")],
        );
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn drops_unrelated_chunks() {
        let kept = KeywordFilter.filter(
            "Capital of France?",
            vec![result("Mitochondria are the powerhouse of the cell.")],
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let kept = KeywordFilter.filter("PHOTO", vec![result("Photosynthesis happens in leaves")]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn preserves_input_order() {
        let kept = KeywordFilter.filter(
            "cell",
            vec![result("b cell"), result("nothing"), result("a cell"), result("cells")],
        );
        let texts: Vec<&str> = kept.iter().map(SearchResult::text).collect();
        assert_eq!(texts, vec!["b cell", "a cell", "cells"]);
    }

    #[test]
    fn empty_question_keeps_nothing() {
        assert!(KeywordFilter.filter("", vec![result("anything")]).is_empty());
    }

    #[test]
    fn pass_through_keeps_everything() {
        let kept = PassThroughFilter.filter("x", vec![result("a"), result("b")]);
        assert_eq!(kept.len(), 2);
    }
}
