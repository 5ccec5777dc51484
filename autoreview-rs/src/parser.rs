use std::{fs, io, path::Path};

use memchr::memrchr;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::pattern::RulePattern;
use crate::ruleset::{Config, Owner, Rule};

/// Reviewers requested per change when the file carries no directive.
pub const DEFAULT_REVIEWER_COUNT: usize = 2;

static REVIEWER_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\s*gerrit-codeowners\.reviewer-count:\s*(\d+)").unwrap());

static USE_GIT_HISTORY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\s*gerrit-codeowners\.use-git-history: true").unwrap());

/// Parse an ownership file from a string.
///
/// Parsing never fails: lines that produce no usable rule are skipped, and
/// directives found in comments update the config as they are encountered,
/// later occurrences overwriting earlier ones.
pub fn parse(source: &str) -> Config {
    let mut rules = Vec::new();
    let mut reviewer_count = DEFAULT_REVIEWER_COUNT;
    let mut use_git_history = false;

    for mut line in source.lines() {
        // The rightmost `#` starts a trailing comment unless it is escaped
        // with a backslash. An escaped rightmost `#` keeps the entire line,
        // earlier `#` characters included.
        if let Some(comment_start) = memrchr(b'#', line.as_bytes()) {
            if comment_start == 0 || line.as_bytes()[comment_start - 1] != b'\\' {
                let comment = &line[comment_start..];
                if let Some(caps) = REVIEWER_COUNT.captures(comment) {
                    if let Ok(count) = caps[1].parse() {
                        reviewer_count = count;
                    }
                }
                if USE_GIT_HISTORY.is_match(comment) {
                    use_git_history = true;
                }
                line = &line[..comment_start];
            }
        }

        if line.is_empty() {
            continue;
        }

        // Split on single spaces. A token ending in a backslash had an
        // escaped space: the space is re-inserted, the backslash kept.
        let mut tokens = line.split(' ').filter(|part| !part.is_empty()).map(|part| {
            if part.ends_with('\\') {
                format!("{part} ")
            } else {
                part.to_string()
            }
        });

        let Some(pattern) = tokens.next() else {
            continue;
        };
        let owners = tokens.map(|token| Owner::parse(&token)).collect();

        match RulePattern::new(&pattern) {
            Ok(pattern) => rules.push(Rule::new(pattern, owners)),
            Err(err) => warn!(pattern = %pattern, %err, "skipping rule with unusable pattern"),
        }
    }

    Config {
        rules,
        reviewer_count,
        use_git_history,
    }
}

/// Parse an ownership file from disk.
pub fn parse_file(path: &Path) -> io::Result<Config> {
    let source = fs::read_to_string(path)?;
    Ok(parse(&source))
}
