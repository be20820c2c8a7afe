use crate::error::{ExtractError, Result};
use crate::pdf::PageSource;
use crate::types::MatchSet;

/// Finds the pages that mention one employee.
///
/// Matching is literal, case-sensitive substring containment on the
/// extracted page text. No normalisation is applied.
#[derive(Debug, Clone)]
pub struct PageMatcher {
    name: String,
}

impl PageMatcher {
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(ExtractError::EmptyEmployeeName);
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn find_matches<S: PageSource + ?Sized>(&self, source: &S) -> MatchSet {
        let mut matches = MatchSet::default();
        for index in 0..source.page_count() {
            // Unextractable pages simply don't match
            if let Some(text) = source.page_text(index) {
                if text.contains(&self.name) {
                    matches.push(index);
                }
            }
        }
        matches
    }
}
