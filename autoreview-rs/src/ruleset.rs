use std::collections::HashSet;
use std::fmt;

use crate::pattern::RulePattern;

/// An owner token from an ownership rule, classified by its syntax.
///
/// Tokens keep their literal spelling: no case folding or other
/// normalization happens, and `Display` reconstructs the source text, so
/// set-uniqueness is by literal string value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Owner {
    /// `@handle`
    User(String),
    /// `@org/slug`
    Team { org: String, slug: String },
    /// A bare email address.
    Email(String),
}

impl Owner {
    pub fn parse(token: &str) -> Owner {
        match token.strip_prefix('@') {
            Some(rest) => match rest.split_once('/') {
                Some((org, slug)) => Owner::Team {
                    org: org.to_string(),
                    slug: slug.to_string(),
                },
                None => Owner::User(rest.to_string()),
            },
            None => Owner::Email(token.to_string()),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::User(handle) => write!(f, "@{handle}"),
            Owner::Team { org, slug } => write!(f, "@{org}/{slug}"),
            Owner::Email(address) => f.write_str(address),
        }
    }
}

/// One ownership rule: a path pattern and the owners responsible for the
/// paths it matches.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: RulePattern,
    pub owners: HashSet<Owner>,
}

impl Rule {
    pub fn new(pattern: RulePattern, owners: HashSet<Owner>) -> Rule {
        Rule { pattern, owners }
    }
}

/// A parsed ownership file: the ordered rules plus the process-wide
/// directives encoded in its comments.
#[derive(Debug, Clone)]
pub struct Config {
    pub rules: Vec<Rule>,
    pub reviewer_count: usize,
    pub use_git_history: bool,
}

impl Config {
    /// The union of owner sets over every rule whose pattern matches `path`.
    ///
    /// Every rule is evaluated; there is no override or early exit. Rules are
    /// matched in file mode only, since code reviews deal with files rather
    /// than directories.
    pub fn owners_for(&self, path: &str) -> HashSet<&Owner> {
        let mut owners = HashSet::new();
        for rule in &self.rules {
            if rule.pattern.matches_file(path) {
                owners.extend(rule.owners.iter());
            }
        }
        owners
    }
}
