use clap::Parser;

/// GitHub commit search CLI for finding repositories and commits that match
/// textual and structural criteria, rotating across several API tokens to
/// ride out per-token rate limits.
#[derive(Parser)]
#[clap(
    author,
    version,
    about,
    long_about = "Search GitHub for commits matching a keyword, optionally discovering candidate repositories first, and dump the matches grouped by repository to a JSON file. Multiple API tokens are rotated automatically when a token's rate limit runs low."
)]
pub struct Args {
    /// Keyword to search commit messages for.
    #[clap(short, long, default_value = "")]
    pub keyword: String,

    /// Repositories (owner/name) to search commits in. When omitted,
    /// repositories are discovered first via the repository qualifiers below.
    #[clap(short, long, num_args = 1..)]
    pub repos: Vec<String>,

    /// Repository discovery qualifier: primary language (e.g. "rust").
    #[clap(long)]
    pub language: Option<String>,

    /// Repository discovery qualifier: star count (e.g. ">100").
    #[clap(long)]
    pub stars: Option<String>,

    /// Repository discovery qualifier: repository size in KB (e.g. ">=5000").
    #[clap(long)]
    pub size: Option<String>,

    /// Sort field passed through to the search API.
    #[clap(long)]
    pub sort: Option<String>,

    /// Sort order passed through to the search API ("asc" or "desc").
    #[clap(long)]
    pub order: Option<String>,

    /// Output file path for matched commits in JSON format.
    #[clap(short, long, default_value = "commits.json")]
    pub output: String,

    /// GitHub API tokens. Falls back to the GITHUB_TOKENS environment
    /// variable (comma-separated) when not given.
    #[clap(short, long, num_args = 1..)]
    pub tokens: Vec<String>,
}
