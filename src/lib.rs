//! # GitHub Commit Searching
//!
//! A Rust library for searching repositories and commits on GitHub with
//! multi-token rate-limit rotation, bounded timeout retries, and grouped
//! JSON output of matched commits.
//!
//! ## Main Components
//!
//! - [`GitHubSearcher`]: the client holding the token set and active token,
//!   performing quota-checked paginated searches and the commit dump
//! - [`Args`]: command line argument structure for configuring a run
//! - [`Repo`] / [`Commit`]: results produced by the searches
//!
//! ## Example
//!
//! ```no_run
//! use github_commit_searching_lib::{dump_commits, GitHubSearcher, SearchOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut searcher = GitHubSearcher::new(vec!["ghp_token".to_string()]).await?;
//!
//!     let mut commits = Vec::new();
//!     searcher
//!         .search_commits(
//!             "fix overflow",
//!             Some("rust-lang/rust"),
//!             &SearchOptions::default(),
//!             None,
//!             None,
//!             &mut commits,
//!         )
//!         .await?;
//!
//!     dump_commits(&commits, "commits.json").await?;
//!     Ok(())
//! }
//! ```

mod args;
mod error;
mod github_searcher;
mod models;
mod query;

// Re-export main components for documentation and external use
pub use crate::args::Args;
pub use crate::error::SearchError;
pub use crate::github_searcher::{
    dump_commits, ApiTransport, GitHubSearcher, HttpTransport, RateCategory, RepoQuery,
    SearchOptions,
};
pub use crate::models::{
    Commit, CommitRecord, FilesFilter, MessageFilter, Repo, RepoCommits, RepoFilter,
};
pub use crate::query::build_query;
