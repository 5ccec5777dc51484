use std::fmt;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// A single gitignore-style path pattern from an ownership rule.
///
/// Supports `*`, `?`, bracket classes, leading `/` for root anchoring,
/// trailing `/` for directory patterns, and `!` negation.
#[derive(Clone)]
pub struct RulePattern {
    source: String,
    matcher: Gitignore,
}

impl RulePattern {
    pub fn new(pattern: &str) -> Result<Self, ignore::Error> {
        let mut builder = GitignoreBuilder::new("");
        builder.add_line(None, pattern)?;
        Ok(Self {
            source: pattern.to_string(),
            matcher: builder.build()?,
        })
    }

    /// Whether the pattern matches `path` treated as a file.
    ///
    /// Directory patterns (`build/`) match files anywhere below the
    /// directory. A negated pattern counts as a match whenever its text
    /// matches: a rule's owners apply to every path the pattern names,
    /// and the negation flag is never consulted.
    pub fn matches_file(&self, path: &str) -> bool {
        let rel = path.strip_prefix('/').unwrap_or(path);
        !self.matcher.matched_path_or_any_parents(rel, false).is_none()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for RulePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RulePattern").field(&self.source).finish()
    }
}
