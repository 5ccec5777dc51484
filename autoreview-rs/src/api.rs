use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::error::Error;

/// Opaque identifier of a reviewer account in the review system.
///
/// Ids round-trip through their string form when they travel across the
/// hash ring, so `Display` and `FromStr` must stay inverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub i32);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for AccountId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(AccountId)
    }
}

/// Surface of the code review system the assigner talks to.
pub trait ReviewApi: Send + Sync {
    /// Run an account query (`username:<x>` or `email:<x>`) and return the
    /// first matching account, if any.
    fn query_account(&self, query: &str) -> Result<Option<AccountId>, Error>;

    /// Add reviewers to a change in a single call. No retry, no rollback.
    fn add_reviewers(&self, change_key: &str, reviewers: &[AccountId]) -> Result<(), Error>;
}
