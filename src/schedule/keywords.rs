//! Keyword scanning over lookup tables
//!
//! One automaton per table; a pattern's id is its index in the table, so
//! "first in table order" is simply the smallest matching id.

use aho_corasick::{AhoCorasick, MatchKind};

use crate::error::{Error, Result};

/// Substring scanner for an ordered keyword table
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    automaton: AhoCorasick,
    len: usize,
}

impl KeywordMatcher {
    /// Build a matcher; empty keywords are rejected since they match anywhere
    pub fn new<'a, I>(keywords: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let keywords: Vec<&str> = keywords.into_iter().collect();
        if let Some(i) = keywords.iter().position(|k| k.is_empty()) {
            return Err(Error::Tables(format!("keyword #{} is empty", i + 1)));
        }

        // overlapping search requires standard semantics
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&keywords)
            .map_err(|e| Error::Tables(e.to_string()))?;

        Ok(KeywordMatcher {
            automaton,
            len: keywords.len(),
        })
    }

    /// Index of the first table entry that occurs anywhere in `haystack`
    ///
    /// # Examples
    ///
    /// ```
    /// use timetable::schedule::KeywordMatcher;
    ///
    /// let matcher = KeywordMatcher::new(["ХИМИЯ", "ГЕОЛОГИЯ"]).unwrap();
    /// assert_eq!(matcher.first_in_table_order("ГЕОЛОГИЯ, ХИМИЯ"), Some(0));
    /// assert_eq!(matcher.first_in_table_order("ФИЗИКА"), None);
    /// ```
    pub fn first_in_table_order(&self, haystack: &str) -> Option<usize> {
        self.automaton
            .find_overlapping_iter(haystack)
            .map(|m| m.pattern().as_usize())
            .min()
    }

    /// Indexes of every table entry present in `haystack`, in table order
    pub fn all_present(&self, haystack: &str) -> Vec<usize> {
        let mut present = vec![false; self.len];
        for m in self.automaton.find_overlapping_iter(haystack) {
            present[m.pattern().as_usize()] = true;
        }
        present
            .iter()
            .enumerate()
            .filter_map(|(i, &hit)| hit.then_some(i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
