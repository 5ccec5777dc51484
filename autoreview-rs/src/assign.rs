use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info};

use crate::api::{AccountId, ReviewApi};
use crate::error::Error;
use crate::parser;
use crate::repo::RepoAccess;
use crate::resolver::{IdentityResolver, TeamDirectory};
use crate::ring::{self, HashRing};
use crate::ruleset::Config;

/// Ownership file locations consulted in order, resolved against the
/// change's target branch tip.
pub const OWNERS_FILE_PATHS: [&str; 3] = ["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];

/// The review unit handed in by the host.
#[derive(Debug, Clone)]
pub struct Change {
    /// Stable identifier for the change; the sole input to reviewer
    /// selection, so retries pick the same reviewers.
    pub key: String,
    /// Target branch, without the `refs/heads/` prefix.
    pub branch: String,
    /// The change's author. Authors never review their own change.
    pub owner: AccountId,
    /// Reviewers already on the change.
    pub existing_reviewers: usize,
    /// Paths touched by the change.
    pub changed_paths: Vec<String>,
}

/// Orchestrates rule matching, identity resolution, the commit-history
/// fallback and the final ring selection, one change at a time.
///
/// The resolver cache is shared across every change this assigner sees;
/// configs and rings are built fresh per change.
pub struct Assigner {
    api: Arc<dyn ReviewApi>,
    resolver: IdentityResolver,
}

impl Assigner {
    pub fn new(api: Arc<dyn ReviewApi>, directory: Arc<dyn TeamDirectory>) -> Assigner {
        Assigner {
            resolver: IdentityResolver::new(Arc::clone(&api), directory),
            api,
        }
    }

    /// Candidate reviewers from the ownership rules alone: the owner union
    /// over every changed path, resolved to account ids.
    pub fn from_code_owners(&self, config: &Config, changed_paths: &[String]) -> HashSet<AccountId> {
        let mut owners = HashSet::new();
        for path in changed_paths {
            owners.extend(config.owners_for(path));
        }

        let mut accounts = HashSet::new();
        for owner in owners {
            accounts.extend(self.resolver.resolve(owner));
        }
        accounts
    }

    /// Supplement `accounts` with recent authors of the changed paths until
    /// `target` candidates are reached or history runs out.
    pub fn from_history(
        &self,
        repo: &dyn RepoAccess,
        exclude: AccountId,
        mut accounts: HashSet<AccountId>,
        changed_paths: &[String],
        target: usize,
    ) -> Result<HashSet<AccountId>, Error> {
        if accounts.len() >= target {
            return Ok(accounts);
        }

        repo.walk_author_emails(changed_paths, &mut |email| {
            if let Some(id) = self.resolver.find_by_email(email) {
                if id != exclude {
                    accounts.insert(id);
                }
            }
            accounts.len() < target
        })?;

        Ok(accounts)
    }

    /// Run the full assignment for one change.
    ///
    /// A repository without an ownership file is a no-op. Re-running on an
    /// unchanged change picks the same reviewers: selection depends only on
    /// the candidate set and the change key.
    pub fn assign(&self, repo: &dyn RepoAccess, change: &Change) -> Result<(), Error> {
        let Some(config) = self.load_owners_config(repo, &change.branch) else {
            return Ok(());
        };

        let mut reviewers = self.from_code_owners(&config, &change.changed_paths);
        reviewers.remove(&change.owner);

        let missing = config.reviewer_count.saturating_sub(change.existing_reviewers);

        if reviewers.len() < config.reviewer_count && config.use_git_history {
            reviewers =
                self.from_history(repo, change.owner, reviewers, &change.changed_paths, missing)?;
        }

        let to_assign = reviewers.len().min(missing);
        if to_assign == 0 {
            return Ok(());
        }

        let ring = HashRing::from_elements(ring::md5_hex, reviewers.iter().map(AccountId::to_string));
        let chosen: Vec<AccountId> = ring
            .get_nodes(&change.key, to_assign)
            .iter()
            .filter_map(|node| node.parse().ok())
            .collect();
        info!(
            change = %change.key,
            candidates = reviewers.len(),
            chosen = ?chosen,
            "assigning reviewers"
        );

        if let Err(err) = self.api.add_reviewers(&change.key, &chosen) {
            error!(change = %change.key, %err, "failed to set reviewers");
        }

        Ok(())
    }

    fn load_owners_config(&self, repo: &dyn RepoAccess, branch: &str) -> Option<Config> {
        let reference = format!("refs/heads/{branch}");
        let data = OWNERS_FILE_PATHS
            .iter()
            .find_map(|path| repo.read_file(&reference, path))?;
        Some(parser::parse(&String::from_utf8_lossy(&data)))
    }
}
