//! Free-text query parsing
//!
//! Queries are a list of alternatives separated by the bare upper-case `OR`
//! keyword. Each alternative is a list of terms that must all match; a term
//! is a bare word or a double-quoted phrase. Matching is case-insensitive
//! substring containment.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};

/// One term of an alternative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
    Word(String),
    Phrase(String),
}

impl Term {
    /// Lower-cased text of the term
    pub fn text(&self) -> &str {
        match self {
            Term::Word(w) => w,
            Term::Phrase(p) => p,
        }
    }

    fn matches(&self, fields: &[&str]) -> bool {
        let needle = self.text();
        fields
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Phrase(String),
    Or,
}

/// Parsed free-text query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuery {
    alternatives: Vec<Vec<Term>>,
}

impl TextQuery {
    /// Query matching everything
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Parse a query string
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;

        let mut alternatives = Vec::new();
        let mut current = Vec::new();
        for token in tokens {
            match token {
                Token::Or => {
                    if !current.is_empty() {
                        alternatives.push(std::mem::take(&mut current));
                    }
                }
                Token::Word(w) => current.push(Term::Word(w.to_lowercase())),
                Token::Phrase(p) => current.push(Term::Phrase(p.to_lowercase())),
            }
        }
        if !current.is_empty() {
            alternatives.push(current);
        }

        Ok(Self { alternatives })
    }

    /// Parse an optional query, treating `None` as match-all
    pub fn parse_opt(input: Option<&str>) -> Result<Self> {
        match input {
            Some(text) => Self::parse(text),
            None => Ok(Self::match_all()),
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.alternatives.is_empty()
    }

    pub fn alternatives(&self) -> &[Vec<Term>] {
        &self.alternatives
    }

    /// True when any alternative has all of its terms contained in some field
    pub fn matches(&self, fields: &[&str]) -> bool {
        if self.is_match_all() {
            return true;
        }
        self.alternatives
            .iter()
            .any(|terms| terms.iter().all(|term| term.matches(fields)))
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' {
            chars.next();
            let mut phrase = String::new();
            let mut closed = false;
            for (_, c) in chars.by_ref() {
                if c == '"' {
                    closed = true;
                    break;
                }
                phrase.push(c);
            }
            if !closed {
                return Err(ProviderError::InvalidQuery(format!(
                    "unterminated quote starting at offset {}",
                    start
                )));
            }
            let phrase = phrase.trim();
            if !phrase.is_empty() {
                tokens.push(Token::Phrase(phrase.to_string()));
            }
            continue;
        }

        let mut word = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() || c == '"' {
                break;
            }
            word.push(c);
            chars.next();
        }

        if word == "OR" {
            tokens.push(Token::Or);
        } else {
            tokens.push(Token::Word(word));
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_matches_everything() {
        let q = TextQuery::parse("   ").unwrap();
        assert!(q.is_match_all());
        assert!(q.matches(&["anything"]));
        assert!(q.matches(&[]));
    }

    #[test]
    fn test_terms_are_anded() {
        let q = TextQuery::parse("checkout latency").unwrap();
        assert!(q.matches(&["Checkout p99 latency regression"]));
        assert!(!q.matches(&["Checkout errors"]));
    }

    #[test]
    fn test_terms_can_match_across_fields() {
        let q = TextQuery::parse("payments timeout").unwrap();
        assert!(q.matches(&["payments", "upstream timeout talking to bank"]));
    }

    #[test]
    fn test_or_operator() {
        let q = TextQuery::parse("disk OR memory").unwrap();
        assert_eq!(q.alternatives().len(), 2);
        assert!(q.matches(&["Memory pressure on node"]));
        assert!(q.matches(&["disk full"]));
        assert!(!q.matches(&["cpu throttling"]));
    }

    #[test]
    fn test_lowercase_or_is_a_word() {
        let q = TextQuery::parse("this or that").unwrap();
        assert_eq!(q.alternatives().len(), 1);
        assert_eq!(q.alternatives()[0].len(), 3);
    }

    #[test]
    fn test_quoted_phrase() {
        let q = TextQuery::parse("\"connection pool\"").unwrap();
        assert!(q.matches(&["Connection pool exhausted"]));
        assert!(!q.matches(&["pool of connection objects"]));
    }

    #[test]
    fn test_phrase_may_contain_or() {
        let q = TextQuery::parse("\"read OR write\"").unwrap();
        assert_eq!(q.alternatives().len(), 1);
        assert_eq!(
            q.alternatives()[0],
            vec![Term::Phrase("read or write".to_string())]
        );
    }

    #[test]
    fn test_phrase_and_words_with_or() {
        let q = TextQuery::parse("\"disk full\" db OR oom").unwrap();
        assert!(q.matches(&["Disk full on db-3"]));
        assert!(!q.matches(&["disk full on cache"]));
        assert!(q.matches(&["OOM killed"]));
    }

    #[test]
    fn test_dangling_or_is_ignored() {
        let q = TextQuery::parse("OR a OR OR b OR").unwrap();
        assert_eq!(q.alternatives().len(), 2);
    }

    #[test]
    fn test_unterminated_quote() {
        let err = TextQuery::parse("\"half open").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_QUERY");
    }

    #[test]
    fn test_case_insensitive_phrase_and_word() {
        let q = TextQuery::parse("Error OR \"Bad Gateway\"").unwrap();
        assert!(q.matches(&["upstream returned BAD GATEWAY"]));
        assert!(q.matches(&["ERROR: timeout"]));
        assert!(!q.matches(&["bad request from gateway"]));
    }
}
