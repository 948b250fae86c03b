//! Result types produced by searches and the records written by the dump.

use std::collections::HashMap;

use serde::Serialize;

/// Longest commit message written to the dump before truncation kicks in.
const MAX_MESSAGE_CHARS: usize = 200;

/// A repository found by repository search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repo {
    /// Full name, e.g. `rust-lang/rust`. Identity of the repo.
    pub name: String,
    pub url: String,
}

/// A commit found by commit search, enriched with its changed files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Full name of the owning repository.
    pub repo: String,
    pub msg: String,
    pub url: String,
    /// Filenames changed by the commit, in API order.
    pub files: Vec<String>,
}

/// Optional filter over found repositories. `None` accepts everything.
pub type RepoFilter<'a> = Option<&'a (dyn Fn(&Repo) -> bool + Send + Sync)>;

/// Optional filter over raw commit messages, applied before detail fetches.
pub type MessageFilter<'a> = Option<&'a (dyn Fn(&str) -> bool + Send + Sync)>;

/// Optional filter over a commit's changed-file list.
pub type FilesFilter<'a> = Option<&'a (dyn Fn(&[String]) -> bool + Send + Sync)>;

/// One commit entry in the dump output.
#[derive(Debug, Serialize)]
pub struct CommitRecord {
    pub msg: String,
    pub url: String,
}

/// All dumped commits of one repository.
#[derive(Debug, Serialize)]
pub struct RepoCommits {
    pub repo: String,
    pub commits: Vec<CommitRecord>,
}

impl CommitRecord {
    pub fn from_commit(commit: &Commit) -> Self {
        CommitRecord {
            msg: truncate_message(&commit.msg),
            url: commit.url.clone(),
        }
    }
}

/// Group commits by owning repository, preserving the order repositories
/// first appear and the relative order of each repository's commits.
/// Interleaved repositories still end up with a single entry each.
pub fn group_by_repo(commits: &[Commit]) -> Vec<RepoCommits> {
    let mut grouped: Vec<RepoCommits> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for commit in commits {
        let at = match positions.get(&commit.repo) {
            Some(&at) => at,
            None => {
                grouped.push(RepoCommits {
                    repo: commit.repo.clone(),
                    commits: Vec::new(),
                });
                positions.insert(commit.repo.clone(), grouped.len() - 1);
                grouped.len() - 1
            }
        };
        grouped[at].commits.push(CommitRecord::from_commit(commit));
    }
    grouped
}

/// Cap a commit message at 200 characters, marking the cut with an ellipsis.
/// Counts characters, not bytes, so multi-byte messages never split a code
/// point.
pub fn truncate_message(msg: &str) -> String {
    if msg.chars().count() <= MAX_MESSAGE_CHARS {
        return msg.to_string();
    }
    let truncated: String = msg.chars().take(MAX_MESSAGE_CHARS).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_message_is_cut_at_200_chars_with_ellipsis() {
        let msg = "a".repeat(250);
        let out = truncate_message(&msg);
        assert_eq!(out.chars().count(), 203);
        assert_eq!(&out[..200], "a".repeat(200));
        assert!(out.ends_with("..."));
    }

    #[test]
    fn short_message_is_unchanged() {
        let msg = "b".repeat(150);
        assert_eq!(truncate_message(&msg), msg);
    }

    #[test]
    fn exactly_200_chars_is_unchanged() {
        let msg = "c".repeat(200);
        assert_eq!(truncate_message(&msg), msg);
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let msg = "é".repeat(201);
        let out = truncate_message(&msg);
        assert_eq!(out.chars().count(), 203);
        assert!(out.ends_with("..."));
    }

    fn commit(repo: &str, msg: &str) -> Commit {
        Commit {
            repo: repo.to_string(),
            msg: msg.to_string(),
            url: format!("https://github.com/{}/commit/{}", repo, msg),
            files: vec![],
        }
    }

    #[test]
    fn grouping_preserves_first_seen_repo_order() {
        let commits = vec![commit("a/a", "1"), commit("b/b", "1"), commit("a/a", "2")];
        let grouped = group_by_repo(&commits);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].repo, "a/a");
        assert_eq!(
            grouped[0]
                .commits
                .iter()
                .map(|c| c.msg.as_str())
                .collect::<Vec<_>>(),
            ["1", "2"]
        );
        assert_eq!(grouped[1].repo, "b/b");
        assert_eq!(grouped[1].commits.len(), 1);
        assert_eq!(grouped[1].commits[0].msg, "1");
    }

    #[test]
    fn grouping_empty_input_produces_no_entries() {
        assert!(group_by_repo(&[]).is_empty());
    }

    #[test]
    fn grouped_records_serialize_to_the_documented_shape() {
        let grouped = group_by_repo(&[commit("a/a", "fix")]);
        let json = serde_json::to_value(&grouped).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "repo": "a/a",
                "commits": [{
                    "msg": "fix",
                    "url": "https://github.com/a/a/commit/fix",
                }],
            }])
        );
    }

    #[test]
    fn commit_record_serializes_to_msg_and_url() {
        let record = CommitRecord {
            msg: "fix overflow".to_string(),
            url: "https://github.com/a/b/commit/c".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "msg": "fix overflow",
                "url": "https://github.com/a/b/commit/c",
            })
        );
    }
}
