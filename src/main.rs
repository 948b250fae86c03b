use std::env;

use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};

use github_commit_searching_lib::{dump_commits, Args, GitHubSearcher, RepoQuery, SearchOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize the tracing logger
    tracing_subscriber::fmt::init();

    dotenv().ok();

    let args = Args::parse();

    // Tokens from arguments, falling back to GITHUB_TOKENS (comma-separated).
    let tokens: Vec<String> = if !args.tokens.is_empty() {
        args.tokens.clone()
    } else {
        env::var("GITHUB_TOKENS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    };
    if tokens.is_empty() {
        error!("No GitHub tokens provided or found in environment");
        anyhow::bail!("at least one GitHub token is required (--tokens or GITHUB_TOKENS)");
    }

    let mut searcher = GitHubSearcher::new(tokens)
        .await
        .context("failed to initialize the GitHub client")?;

    let options = SearchOptions {
        sort: args.sort.as_deref(),
        order: args.order.as_deref(),
    };

    let mut commits = Vec::new();
    if !args.repos.is_empty() {
        // Search commits in each explicitly named repository.
        for repo in &args.repos {
            info!("Searching commits in '{}'", repo);
            searcher
                .search_commits(
                    &args.keyword,
                    Some(repo.as_str()),
                    &options,
                    None,
                    None,
                    &mut commits,
                )
                .await?;
        }
    } else if args.language.is_some() || args.stars.is_some() || args.size.is_some() {
        // Discover repositories first, then search their commits.
        let query = RepoQuery {
            language: args.language.as_deref(),
            size: args.size.as_deref(),
            stars: args.stars.as_deref(),
            sort: args.sort.as_deref(),
            order: args.order.as_deref(),
        };
        let repos = searcher.search_repos(&query, None).await?;
        info!("Discovered {} repositories", repos.len());
        searcher
            .search_commits_in(&args.keyword, &repos, &options, None, None, &mut commits)
            .await?;
    } else {
        // Unrestricted commit search.
        searcher
            .search_commits(&args.keyword, None, &options, None, None, &mut commits)
            .await?;
    }

    searcher.finish();

    dump_commits(&commits, &args.output)
        .await
        .with_context(|| format!("failed to write '{}'", args.output))?;

    info!("Dumped {} commits to '{}'", commits.len(), args.output);
    Ok(())
}
