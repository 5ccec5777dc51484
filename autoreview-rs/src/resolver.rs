use std::sync::Arc;

use dashmap::DashMap;
use tracing::{error, warn};

use crate::api::{AccountId, ReviewApi};
use crate::error::Error;
use crate::ruleset::Owner;

/// A directory profile for a user referenced by an ownership rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub login: String,
    pub email: Option<String>,
}

/// Outcome of expanding an `@org/slug` reference against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamResolution {
    Members(Vec<UserProfile>),
    UnknownOrg,
    UnknownTeam,
    /// Membership cannot be safely enumerated (e.g. a secret team).
    Restricted,
}

/// Directory service holding user profiles and team rosters.
pub trait TeamDirectory: Send + Sync {
    fn user(&self, login: &str) -> Result<Option<UserProfile>, Error>;
    fn team(&self, org: &str, slug: &str) -> Result<TeamResolution, Error>;
}

/// Maps owner tokens to review-system account ids.
///
/// Every lookup goes through a process-lifetime cache keyed by the account
/// query string (`username:<x>`, `email:<x>`). Only successful lookups are
/// memoized; an unresolved query is retried on the next request for the same
/// key. The cache tolerates concurrent resolvers racing on a missing key:
/// both may query, and the converging writes are idempotent.
pub struct IdentityResolver {
    api: Arc<dyn ReviewApi>,
    directory: Arc<dyn TeamDirectory>,
    cache: DashMap<String, AccountId>,
}

impl IdentityResolver {
    pub fn new(api: Arc<dyn ReviewApi>, directory: Arc<dyn TeamDirectory>) -> IdentityResolver {
        IdentityResolver {
            api,
            directory,
            cache: DashMap::new(),
        }
    }

    /// Resolve one owner token to zero or more account ids.
    ///
    /// Unresolvable tokens yield an empty result; resolution never fails for
    /// an individual token.
    pub fn resolve(&self, owner: &Owner) -> Vec<AccountId> {
        match owner {
            Owner::Team { org, slug } => self.resolve_team(org, slug),
            Owner::User(handle) => self.find_by_username(handle).into_iter().collect(),
            Owner::Email(address) => self.find_by_email(address).into_iter().collect(),
        }
    }

    pub fn find_by_email(&self, email: &str) -> Option<AccountId> {
        self.lookup(&format!("email:{email}"))
    }

    /// Resolve a handle, falling back to the directory profile's email when
    /// the review system does not know the handle itself.
    pub fn find_by_username(&self, username: &str) -> Option<AccountId> {
        if let Some(id) = self.lookup(&format!("username:{username}")) {
            return Some(id);
        }

        let profile = match self.directory.user(username) {
            Ok(Some(profile)) => profile,
            Ok(None) => return None,
            Err(err) => {
                warn!(username, %err, "directory profile lookup failed");
                return None;
            }
        };

        profile
            .email
            .as_deref()
            .and_then(|email| self.find_by_email(email))
    }

    fn resolve_team(&self, org: &str, slug: &str) -> Vec<AccountId> {
        let mut members = match self.directory.team(org, slug) {
            Ok(TeamResolution::Members(members)) => members,
            Ok(TeamResolution::UnknownOrg) => {
                warn!(org, "organization not found");
                return Vec::new();
            }
            Ok(TeamResolution::UnknownTeam) => {
                warn!(org, slug, "team not found");
                return Vec::new();
            }
            Ok(TeamResolution::Restricted) => {
                warn!(org, slug, "team membership is not enumerable");
                return Vec::new();
            }
            Err(err) => {
                warn!(org, slug, %err, "team lookup failed");
                return Vec::new();
            }
        };

        // deterministic traversal order only; selection happens on the ring
        members.sort_by(|a, b| a.login.cmp(&b.login));
        members
            .iter()
            .filter_map(|member| self.find_member(member))
            .collect()
    }

    // Member resolution tries the handle first, then the known profile email.
    fn find_member(&self, member: &UserProfile) -> Option<AccountId> {
        if let Some(id) = self.lookup(&format!("username:{}", member.login)) {
            return Some(id);
        }

        member
            .email
            .as_deref()
            .and_then(|email| self.find_by_email(email))
    }

    fn lookup(&self, key: &str) -> Option<AccountId> {
        if let Some(id) = self.cache.get(key) {
            return Some(*id);
        }

        match self.api.query_account(key) {
            Ok(Some(id)) => {
                self.cache.insert(key.to_string(), id);
                Some(id)
            }
            Ok(None) => None,
            Err(err) => {
                error!(key, %err, "failed to query account");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MockApi {
        accounts: HashMap<String, AccountId>,
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    impl MockApi {
        fn with_accounts(entries: &[(&str, i32)]) -> MockApi {
            MockApi {
                accounts: entries
                    .iter()
                    .map(|(query, id)| (query.to_string(), AccountId(*id)))
                    .collect(),
                ..Default::default()
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl ReviewApi for MockApi {
        fn query_account(&self, query: &str) -> Result<Option<AccountId>, Error> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(Error::Api("boom".to_string()));
            }
            Ok(self.accounts.get(query).copied())
        }

        fn add_reviewers(&self, _change_key: &str, _reviewers: &[AccountId]) -> Result<(), Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDirectory {
        users: HashMap<String, UserProfile>,
        teams: HashMap<(String, String), TeamResolution>,
    }

    impl TeamDirectory for MockDirectory {
        fn user(&self, login: &str) -> Result<Option<UserProfile>, Error> {
            Ok(self.users.get(login).cloned())
        }

        fn team(&self, org: &str, slug: &str) -> Result<TeamResolution, Error> {
            Ok(self
                .teams
                .get(&(org.to_string(), slug.to_string()))
                .cloned()
                .unwrap_or(TeamResolution::UnknownOrg))
        }
    }

    fn profile(login: &str, email: Option<&str>) -> UserProfile {
        UserProfile {
            login: login.to_string(),
            email: email.map(str::to_string),
        }
    }

    fn resolver(api: Arc<MockApi>, directory: MockDirectory) -> IdentityResolver {
        IdentityResolver::new(api, Arc::new(directory))
    }

    #[test]
    fn email_token_resolves_via_email_lookup_only() {
        let api = Arc::new(MockApi::with_accounts(&[("email:user@example.com", 7)]));
        let r = resolver(Arc::clone(&api), MockDirectory::default());

        let ids = r.resolve(&Owner::parse("user@example.com"));
        assert_eq!(ids, vec![AccountId(7)]);
        assert_eq!(api.queries(), vec!["email:user@example.com"]);
    }

    #[test]
    fn username_token_resolves_by_handle_first() {
        let api = Arc::new(MockApi::with_accounts(&[("username:bob", 5)]));
        let r = resolver(Arc::clone(&api), MockDirectory::default());

        assert_eq!(r.resolve(&Owner::parse("@bob")), vec![AccountId(5)]);
        assert_eq!(api.queries(), vec!["username:bob"]);
    }

    #[test]
    fn username_token_falls_back_to_profile_email() {
        let api = Arc::new(MockApi::with_accounts(&[("email:alice@example.com", 3)]));
        let directory = MockDirectory {
            users: HashMap::from([(
                "alice".to_string(),
                profile("alice", Some("alice@example.com")),
            )]),
            ..Default::default()
        };
        let r = resolver(Arc::clone(&api), directory);

        assert_eq!(r.resolve(&Owner::parse("@alice")), vec![AccountId(3)]);
        assert_eq!(api.queries(), vec!["username:alice", "email:alice@example.com"]);
    }

    #[test]
    fn unknown_handle_without_profile_is_dropped() {
        let api = Arc::new(MockApi::default());
        let r = resolver(Arc::clone(&api), MockDirectory::default());

        assert!(r.resolve(&Owner::parse("@ghost")).is_empty());
    }

    #[test]
    fn team_members_resolved_in_login_order() {
        let api = Arc::new(MockApi::with_accounts(&[
            ("username:alice", 1),
            ("username:bob", 2),
            ("username:carol", 3),
        ]));
        let directory = MockDirectory {
            teams: HashMap::from([(
                ("acme".to_string(), "platform".to_string()),
                TeamResolution::Members(vec![
                    profile("carol", None),
                    profile("alice", None),
                    profile("bob", None),
                ]),
            )]),
            ..Default::default()
        };
        let r = resolver(Arc::clone(&api), directory);

        let ids = r.resolve(&Owner::parse("@acme/platform"));
        assert_eq!(ids, vec![AccountId(1), AccountId(2), AccountId(3)]);
        assert_eq!(
            api.queries(),
            vec!["username:alice", "username:bob", "username:carol"]
        );
    }

    #[test]
    fn team_member_falls_back_to_known_email() {
        let api = Arc::new(MockApi::with_accounts(&[("email:dora@example.com", 9)]));
        let directory = MockDirectory {
            teams: HashMap::from([(
                ("acme".to_string(), "platform".to_string()),
                TeamResolution::Members(vec![profile("dora", Some("dora@example.com"))]),
            )]),
            ..Default::default()
        };
        let r = resolver(Arc::clone(&api), directory);

        assert_eq!(r.resolve(&Owner::parse("@acme/platform")), vec![AccountId(9)]);
    }

    #[test]
    fn unknown_org_team_and_restricted_team_are_skipped() {
        let api = Arc::new(MockApi::with_accounts(&[("username:alice", 1)]));
        let directory = MockDirectory {
            teams: HashMap::from([
                (
                    ("acme".to_string(), "hidden".to_string()),
                    TeamResolution::Restricted,
                ),
                (
                    ("acme".to_string(), "gone".to_string()),
                    TeamResolution::UnknownTeam,
                ),
            ]),
            ..Default::default()
        };
        let r = resolver(Arc::clone(&api), directory);

        assert!(r.resolve(&Owner::parse("@acme/hidden")).is_empty());
        assert!(r.resolve(&Owner::parse("@acme/gone")).is_empty());
        assert!(r.resolve(&Owner::parse("@nowhere/anything")).is_empty());
        // other tokens still resolve afterwards
        assert_eq!(r.resolve(&Owner::parse("@alice")), vec![AccountId(1)]);
    }

    #[test]
    fn successful_lookup_is_cached() {
        let api = Arc::new(MockApi::with_accounts(&[("username:bob", 5)]));
        let r = resolver(Arc::clone(&api), MockDirectory::default());

        r.resolve(&Owner::parse("@bob"));
        r.resolve(&Owner::parse("@bob"));
        assert_eq!(api.queries().len(), 1);
    }

    #[test]
    fn unresolved_lookup_is_retried() {
        let api = Arc::new(MockApi::default());
        let r = resolver(Arc::clone(&api), MockDirectory::default());

        r.find_by_email("nobody@example.com");
        r.find_by_email("nobody@example.com");
        assert_eq!(api.queries().len(), 2);
    }

    #[test]
    fn query_error_drops_token_and_is_retried() {
        let api = Arc::new(MockApi {
            fail: true,
            ..Default::default()
        });
        let r = resolver(Arc::clone(&api), MockDirectory::default());

        assert!(r.resolve(&Owner::parse("someone@example.com")).is_empty());
        assert!(r.resolve(&Owner::parse("someone@example.com")).is_empty());
        assert_eq!(api.queries().len(), 2);
    }
}
