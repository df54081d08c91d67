//! Exclusion filter
//!
//! Patterns use shell wildcards (`*`, `?`, `[...]`, `[!...]`) and are
//! matched against the *full path* produced by the walk (source root joined
//! with the relative path), not against the logical key. A `*` also matches
//! the path separator, so `*.tmp` excludes temporary files at any depth.
//! Matching is case-sensitive.

use std::path::Path;

use glob::{MatchOptions, Pattern};
use thiserror::Error;

/// Errors raised while compiling exclude patterns
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExcludeError {
    /// The pattern is not valid glob syntax
    #[error("Invalid exclude pattern '{pattern}': {message}")]
    InvalidPattern {
        /// Pattern as supplied by the user
        pattern: String,
        /// Parser diagnostic
        message: String,
    },
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Compiled set of exclude patterns
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    patterns: Vec<Pattern>,
}

impl ExclusionFilter {
    /// Compiles `patterns`
    ///
    /// # Errors
    /// Returns [`ExcludeError::InvalidPattern`] for the first pattern that
    /// does not compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, ExcludeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                Pattern::new(p).map_err(|e| ExcludeError::InvalidPattern {
                    pattern: p.to_string(),
                    message: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// A filter that excludes nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the first pattern matching `path`, if any
    pub fn matching_pattern(&self, path: &Path) -> Option<&str> {
        let candidate = path.to_string_lossy();
        self.patterns
            .iter()
            .find(|p| p.matches_with(&candidate, MATCH_OPTIONS))
            .map(Pattern::as_str)
    }
}
