//! Deterministic code reviewer assignment from CODEOWNERS-style rules.
//!
//! A change's touched paths are matched against an ownership file to collect
//! owner tokens; tokens resolve to review-system accounts through a memoizing
//! resolver (with an optional recent-commit-author fallback); the surviving
//! candidates are placed on a consistent hash ring and the change's stable
//! key picks the reviewers. The same change, owner file and cache state
//! always produce the same selection.

pub mod assign;
pub mod parser;
pub mod pattern;
pub mod repo;
pub mod resolver;
pub mod ring;
pub mod ruleset;

mod api;
mod error;

use std::{io, path::Path};

pub use api::{AccountId, ReviewApi};
pub use assign::{Assigner, Change, OWNERS_FILE_PATHS};
pub use error::Error;
pub use repo::{GitRepo, RepoAccess};
pub use resolver::{IdentityResolver, TeamDirectory, TeamResolution, UserProfile};
pub use ring::HashRing;
pub use ruleset::{Config, Owner, Rule};

/// Parse an ownership file from disk.
pub fn config_from_path(path: impl AsRef<Path>) -> io::Result<Config> {
    parser::parse_file(path.as_ref())
}
