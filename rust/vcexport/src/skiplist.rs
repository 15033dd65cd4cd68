//! VM name skip rules.
//!
//! A skip list is an ordered set of case-sensitive regular expressions. Any
//! pattern matching anywhere in a VM name excludes that VM from the export.
//! Rules are independent of each other, so permuting the list never changes
//! a match result.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{Error, Result};

/// Rules that always apply, ahead of any user-maintained rule file.
/// vCLS agent VMs are vSphere-internal and never belong in a report.
pub const BUILTIN_PATTERNS: &[&str] = &["^vCLS"];

/// Compiled skip rules for one export run. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct SkipList {
    rules: Vec<Regex>,
}

impl SkipList {
    /// Compile the built-in rules plus the given user patterns.
    ///
    /// A malformed pattern fails the run here rather than silently
    /// under-filtering later.
    pub fn compile<I, S>(user_patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for pattern in BUILTIN_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .chain(user_patterns.into_iter().map(|p| p.as_ref().to_string()))
        {
            let rule = Regex::new(&pattern).map_err(|source| Error::SkipPattern {
                pattern: pattern.clone(),
                source,
            })?;
            rules.push(rule);
        }
        Ok(Self { rules })
    }

    /// Load user patterns from a rule file and compile them together with
    /// the built-ins. Blank lines and `#` comments are ignored. A missing
    /// file is not an error; the built-ins still apply.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no skip list file, using built-in rules only");
            return Self::compile(std::iter::empty::<&str>());
        }

        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;

        let patterns: Vec<&str> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        tracing::info!(path = %path.display(), count = patterns.len(), "loaded skip list");
        Self::compile(patterns)
    }

    /// True if any rule matches anywhere within the name.
    pub fn matches(&self, name: &str) -> bool {
        self.rules.iter().any(|rule| rule.is_match(name))
    }

    /// Number of compiled rules, built-ins included.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
