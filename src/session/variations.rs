//! Candidate sources awaiting a choice.

use super::state::SessionError;

/// Two or more candidate sources with exactly one selected.
///
/// A single candidate is committed directly and never forms a set, so the
/// constructor refuses fewer than two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationSet {
    variations: Vec<String>,
    selected: usize,
}

impl VariationSet {
    /// Build a set with the first candidate selected. `None` when fewer than
    /// two candidates are given.
    #[must_use]
    pub fn from_candidates(variations: Vec<String>) -> Option<Self> {
        if variations.len() < 2 {
            return None;
        }
        Some(Self { variations, selected: 0 })
    }

    #[must_use]
    pub fn variations(&self) -> &[String] {
        &self.variations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.variations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variations.is_empty()
    }

    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub fn selected_source(&self) -> &str {
        &self.variations[self.selected]
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.variations.get(index).map(String::as_str)
    }

    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSelection`] when `index` is out of range;
    /// the current selection is kept.
    pub fn select(&mut self, index: usize) -> Result<(), SessionError> {
        if index >= self.variations.len() {
            return Err(SessionError::InvalidSelection { index, len: self.variations.len() });
        }
        self.selected = index;
        Ok(())
    }

    /// Consume the set, yielding the selected source.
    #[must_use]
    pub fn into_selected(mut self) -> String {
        self.variations.swap_remove(self.selected)
    }
}

#[cfg(test)]
#[path = "variations_test.rs"]
mod tests;
