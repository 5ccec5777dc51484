use std::path::Path;

use git2::{ObjectType, Repository, Sort};
use tracing::{debug, error};

use crate::error::Error;

/// Tree entry modes treated as readable files (regular and executable).
const FILE_MODES: [i32; 2] = [0o100644, 0o100755];

/// Read-only access to the repository a change targets.
pub trait RepoAccess {
    /// Contents of the file at `path` as of `reference`, or `None` when the
    /// ref does not resolve or the path is not a regular file there.
    fn read_file(&self, reference: &str, path: &str) -> Option<Vec<u8>>;

    /// Walk commit author emails newest-first, restricted to commits that
    /// touch any of `paths` (every commit when `paths` is empty). `visit`
    /// returns `false` to stop the walk early.
    fn walk_author_emails(
        &self,
        paths: &[String],
        visit: &mut dyn FnMut(&str) -> bool,
    ) -> Result<(), Error>;
}

/// `RepoAccess` over an on-disk git repository.
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    pub fn open(path: impl AsRef<Path>) -> Result<GitRepo, Error> {
        Ok(GitRepo {
            repo: Repository::open(path)?,
        })
    }

    fn touches_paths(
        &self,
        commit: &git2::Commit<'_>,
        paths: &[String],
    ) -> Result<bool, git2::Error> {
        if paths.is_empty() {
            return Ok(true);
        }

        let tree = commit.tree()?;
        // first-parent diff; root commits diff against the empty tree
        let parent_tree = match commit.parent(0) {
            Ok(parent) => Some(parent.tree()?),
            Err(_) => None,
        };

        let mut opts = git2::DiffOptions::new();
        for path in paths {
            opts.pathspec(path);
        }
        let diff =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;
        Ok(diff.deltas().next().is_some())
    }
}

impl RepoAccess for GitRepo {
    fn read_file(&self, reference: &str, path: &str) -> Option<Vec<u8>> {
        let commit = match self
            .repo
            .revparse_single(reference)
            .and_then(|object| object.peel_to_commit())
        {
            Ok(commit) => commit,
            Err(err) => {
                debug!(reference, %err, "failed to resolve revision");
                return None;
            }
        };

        let tree = match commit.tree() {
            Ok(tree) => tree,
            Err(err) => {
                error!(reference, %err, "failed to read commit tree");
                return None;
            }
        };

        let entry = tree.get_path(Path::new(path)).ok()?;
        if entry.kind() != Some(ObjectType::Blob) || !FILE_MODES.contains(&entry.filemode()) {
            return None;
        }

        match self.repo.find_blob(entry.id()) {
            Ok(blob) => Some(blob.content().to_vec()),
            Err(err) => {
                error!(reference, path, %err, "failed to read git object");
                None
            }
        }
    }

    fn walk_author_emails(
        &self,
        paths: &[String],
        visit: &mut dyn FnMut(&str) -> bool,
    ) -> Result<(), Error> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push_head()?;

        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            if !self.touches_paths(&commit, paths)? {
                continue;
            }

            let author = commit.author();
            let Some(email) = author.email() else {
                continue;
            };
            if !visit(email) {
                break;
            }
        }

        Ok(())
    }
}
