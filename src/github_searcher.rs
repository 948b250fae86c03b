use std::future::Future;
use std::sync::Arc;
use std::thread;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::error::SearchError;
use crate::models::{group_by_repo, Commit, FilesFilter, MessageFilter, Repo, RepoFilter};
use crate::query::{build_query, build_url};

const USER_URL: &str = "https://api.github.com/user";
const RATE_LIMIT_URL: &str = "https://api.github.com/rate_limit";
const REPO_SEARCH_URL: &str = "https://api.github.com/search/repositories";
const COMMIT_SEARCH_URL: &str = "https://api.github.com/search/commits";

/// Results per search page.
const PER_PAGE: u32 = 100;
/// Pages fetched per search; the API stops serving results past 1000 anyway.
const MAX_PAGE: u32 = 10;
/// Quota units kept in reserve on top of the demanded amount.
const SAFETY_MARGIN: u64 = 1;
/// Attempts before a request is declared timed out.
const MAX_ATTEMPTS: u32 = 5;
/// Pause between timed-out attempts.
const RETRY_PAUSE: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// A rate-limit bucket on the API. Searches and detail fetches draw from
/// independent quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateCategory {
    Search,
    Core,
}

impl RateCategory {
    fn as_str(self) -> &'static str {
        match self {
            RateCategory::Search => "search",
            RateCategory::Core => "core",
        }
    }
}

/// Live quota of one token in one category. Fetched fresh on every check.
#[derive(Debug, Clone, Copy)]
struct RateStatus {
    remaining: u64,
    /// Epoch second at which the quota resets.
    reset: i64,
}

/// Outcome of a quota check across the token set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuotaPlan {
    /// The active token already has headroom.
    Ready,
    /// Switch to this token; it has enough quota right now.
    Switch(usize),
    /// No token has enough quota. Switch to this one and wait out its reset.
    WaitThenUse { index: usize, wait: Duration },
}

/// Decide how to satisfy a quota demand. Probes the active token first and
/// returns early on headroom; otherwise scans all tokens in fixed order,
/// stopping at the first one with enough remaining quota. When none
/// qualifies, the token with the soonest reset wins, with a wait of
/// `max(0, reset - now)` so an already-passed reset never sleeps.
async fn plan_quota<F, Fut>(
    token_count: usize,
    active: usize,
    demand: u64,
    now: i64,
    mut probe: F,
) -> Result<QuotaPlan, SearchError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<RateStatus, SearchError>>,
{
    let demand = demand + SAFETY_MARGIN;
    let status = probe(active).await?;
    if status.remaining >= demand {
        return Ok(QuotaPlan::Ready);
    }
    let mut min_wait = status.reset - now;
    let mut fallback = active;
    for index in 0..token_count {
        let status = probe(index).await?;
        if status.remaining >= demand {
            return Ok(QuotaPlan::Switch(index));
        }
        let wait = status.reset - now;
        if wait < min_wait {
            min_wait = wait;
            fallback = index;
        }
    }
    let wait = Duration::from_secs(min_wait.max(0) as u64);
    Ok(QuotaPlan::WaitThenUse {
        index: fallback,
        wait,
    })
}

/// A single authorized GET against the API. The HTTP implementation talks
/// to api.github.com; tests substitute canned responses.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// One request attempt: GET `url` authorized as `token`, returning the
    /// parsed JSON body. A non-OK status becomes an API error carrying the
    /// message from the error body.
    async fn get_json(&self, url: &str, token: &str) -> Result<Value, SearchError>;
}

/// The reqwest-backed transport used by [`GitHubSearcher::new`].
pub struct HttpTransport {
    client: Client,
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn get_json(&self, url: &str, token: &str) -> Result<Value, SearchError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", token))
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().to_string();
        let body: Value = response.json().await?;

        if !status.is_success() {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown API error")
                .to_string();
            return Err(SearchError::Api {
                message,
                url: final_url,
            });
        }
        Ok(body)
    }
}

/// Sort and order options passed through to the search API.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions<'a> {
    pub sort: Option<&'a str>,
    pub order: Option<&'a str>,
}

/// Structural qualifiers for repository discovery. Absent qualifiers are
/// omitted from the query entirely.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepoQuery<'a> {
    pub language: Option<&'a str>,
    pub size: Option<&'a str>,
    pub stars: Option<&'a str>,
    pub sort: Option<&'a str>,
    pub order: Option<&'a str>,
}

pub struct GitHubSearcher<T = HttpTransport> {
    transport: T,
    tokens: Vec<String>,
    /// Index of the token used for outgoing requests. Mutated only when the
    /// quota check switches tokens.
    active: usize,
    progress: ProgressBar,
}

impl GitHubSearcher<HttpTransport> {
    /// Create a searcher over one or more API tokens, talking HTTP to
    /// api.github.com, and announce the identity of the first token.
    pub async fn new(tokens: Vec<String>) -> Result<Self, SearchError> {
        let client = Client::builder()
            .user_agent("Rust GitHub API Client")
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()?;

        let searcher = GitHubSearcher::with_transport(HttpTransport { client }, tokens)?;
        let login = searcher.identity(searcher.active).await?;
        info!("Authenticated as '{}'", login);

        Ok(searcher)
    }
}

impl<T: ApiTransport> GitHubSearcher<T> {
    /// Create a searcher over an arbitrary transport. The first token
    /// starts out active.
    pub fn with_transport(transport: T, tokens: Vec<String>) -> Result<Self, SearchError> {
        if tokens.is_empty() {
            return Err(SearchError::NoTokens);
        }

        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        Ok(GitHubSearcher {
            transport,
            tokens,
            active: 0,
            progress,
        })
    }

    /// Look up the login of the identity behind one token.
    async fn identity(&self, index: usize) -> Result<String, SearchError> {
        let result = self.get_as(index, USER_URL).await?;
        Ok(result
            .get("login")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string())
    }

    /// Make `index` the active token and announce the switch.
    async fn switch_to(&mut self, index: usize) -> Result<(), SearchError> {
        self.active = index;
        let login = self.identity(index).await?;
        info!("Switched to token of '{}'", login);
        Ok(())
    }

    /// Fetch the live rate-limit status of one token in one category.
    async fn fetch_rate_status(
        &self,
        index: usize,
        category: RateCategory,
    ) -> Result<RateStatus, SearchError> {
        let result = self.get_as(index, RATE_LIMIT_URL).await?;
        let bucket = &result["resources"][category.as_str()];
        Ok(RateStatus {
            remaining: bucket["remaining"].as_u64().unwrap_or(0),
            reset: bucket["reset"].as_i64().unwrap_or(0),
        })
    }

    /// Guarantee the active token has at least `demand` (plus a safety
    /// margin) remaining quota in `category`, switching tokens or waiting
    /// for the soonest reset when needed.
    pub async fn ensure_quota(
        &mut self,
        category: RateCategory,
        demand: u64,
    ) -> Result<(), SearchError> {
        let now = Utc::now().timestamp();
        let plan = {
            let this = &*self;
            plan_quota(this.tokens.len(), this.active, demand, now, |index| {
                this.fetch_rate_status(index, category)
            })
            .await?
        };

        match plan {
            QuotaPlan::Ready => Ok(()),
            QuotaPlan::Switch(index) => self.switch_to(index).await,
            QuotaPlan::WaitThenUse { index, wait } => {
                self.switch_to(index).await?;
                if !wait.is_zero() {
                    warn!(
                        "All tokens below '{}' quota, waiting {} seconds for reset",
                        category.as_str(),
                        wait.as_secs()
                    );
                    sleep(wait).await;
                }
                Ok(())
            }
        }
    }

    /// GET `url` with the active token and return the parsed JSON body.
    pub async fn get(&self, url: &str) -> Result<Value, SearchError> {
        self.get_as(self.active, url).await
    }

    /// GET `url` authorized as a specific token. Timeouts are retried on a
    /// bounded attempt budget with a pause in between; other transport
    /// failures and API-level errors are final.
    async fn get_as(&self, index: usize, url: &str) -> Result<Value, SearchError> {
        for attempt in 1..=MAX_ATTEMPTS {
            match self.transport.get_json(url, &self.tokens[index]).await {
                Err(SearchError::Transport(e)) if e.is_timeout() => {
                    debug!("Attempt {}/{} timed out: {}", attempt, MAX_ATTEMPTS, url);
                    if attempt < MAX_ATTEMPTS {
                        sleep(RETRY_PAUSE).await;
                    }
                }
                other => return other,
            }
        }
        Err(SearchError::TimedOut {
            url: url.to_string(),
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Search repositories by structural qualifiers, paging until the first
    /// empty page or the page cap. The optional predicate decides inclusion;
    /// no predicate accepts everything.
    pub async fn search_repos(
        &mut self,
        query: &RepoQuery<'_>,
        accept: RepoFilter<'_>,
    ) -> Result<Vec<Repo>, SearchError> {
        let q = build_query(
            "",
            &[
                ("size", query.size),
                ("language", query.language),
                ("stars", query.stars),
            ],
        );

        let mut repos = Vec::new();
        for page in 1..=MAX_PAGE {
            let url = build_url(
                REPO_SEARCH_URL,
                &[
                    ("q", Some(q.clone())),
                    ("sort", query.sort.map(str::to_string)),
                    ("order", query.order.map(str::to_string)),
                    ("page", Some(page.to_string())),
                    ("per_page", Some(PER_PAGE.to_string())),
                ],
            );
            self.progress.set_message(format!("repositories - page {}", page));

            self.ensure_quota(RateCategory::Search, 1).await?;
            let result = self.get(&url).await?;
            let items = match result.get("items").and_then(Value::as_array) {
                Some(items) if !items.is_empty() => items,
                _ => break,
            };

            let mut newly_accepted = 0;
            for item in items {
                let repo = Repo {
                    name: item
                        .get("full_name")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                    url: item
                        .get("html_url")
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string(),
                };
                if accept.map_or(true, |accept| accept(&repo)) {
                    newly_accepted += 1;
                    repos.push(repo);
                }
            }
            if newly_accepted > 0 {
                info!(
                    "Repositories: {} total after page {} ({} new)",
                    repos.len(),
                    page,
                    newly_accepted
                );
            }
            self.progress.tick();
        }
        Ok(repos)
    }

    /// Search commits matching `keyword`, optionally restricted to one
    /// repository, appending accepted commits to `commits`.
    ///
    /// Items passing the message predicate are enriched with their changed
    /// files through concurrent detail fetches. A failing detail fetch
    /// aborts the page and propagates: nothing from the failing page ends
    /// up in `commits`, while commits appended for earlier pages stay
    /// untouched. The file-list predicate decides final inclusion.
    pub async fn search_commits(
        &mut self,
        keyword: &str,
        repo: Option<&str>,
        options: &SearchOptions<'_>,
        accept_msg: MessageFilter<'_>,
        accept_files: FilesFilter<'_>,
        commits: &mut Vec<Commit>,
    ) -> Result<(), SearchError> {
        let q = build_query(keyword, &[("repo", repo)]);
        let scope = repo.unwrap_or("all repositories");
        let parallelism = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);

        for page in 1..=MAX_PAGE {
            let url = build_url(
                COMMIT_SEARCH_URL,
                &[
                    ("q", Some(q.clone())),
                    ("sort", options.sort.map(str::to_string)),
                    ("order", options.order.map(str::to_string)),
                    ("page", Some(page.to_string())),
                    ("per_page", Some(PER_PAGE.to_string())),
                ],
            );
            self.progress
                .set_message(format!("commits in {} - page {}", scope, page));

            self.ensure_quota(RateCategory::Search, 1).await?;
            let result = self.get(&url).await?;
            let items = match result.get("items").and_then(Value::as_array) {
                Some(items) if !items.is_empty() => items,
                _ => break,
            };

            // Filter on the message before paying core quota for details.
            let accepted: Vec<&Value> = items
                .iter()
                .filter(|item| {
                    let msg = item
                        .pointer("/commit/message")
                        .and_then(Value::as_str)
                        .unwrap_or("");
                    accept_msg.map_or(true, |accept| accept(msg))
                })
                .collect();

            // The page's commits are staged locally and only appended once
            // the whole detail batch succeeded, so an aborted page never
            // contributes partial results.
            let mut page_commits = Vec::new();
            if !accepted.is_empty() {
                self.ensure_quota(RateCategory::Core, accepted.len() as u64)
                    .await?;

                let semaphore = Arc::new(Semaphore::new(parallelism));
                let this = &*self;
                let fetches = accepted.iter().map(|item| {
                    let semaphore = Arc::clone(&semaphore);
                    async move {
                        let _permit = semaphore.acquire().await.unwrap();
                        this.build_commit(item).await
                    }
                });

                for built in join_all(fetches).await {
                    let commit = built?;
                    if accept_files.map_or(true, |accept| accept(&commit.files)) {
                        page_commits.push(commit);
                    }
                }
            }

            let newly_accepted = page_commits.len();
            commits.extend(page_commits);
            if newly_accepted > 0 {
                info!(
                    "Commits [{}]: {} total after page {} ({} new)",
                    scope,
                    commits.len(),
                    page,
                    newly_accepted
                );
            }
            self.progress.tick();
        }
        Ok(())
    }

    /// Run one independent paginated commit search per repository,
    /// appending all accepted commits to `commits`.
    pub async fn search_commits_in(
        &mut self,
        keyword: &str,
        repos: &[Repo],
        options: &SearchOptions<'_>,
        accept_msg: MessageFilter<'_>,
        accept_files: FilesFilter<'_>,
        commits: &mut Vec<Commit>,
    ) -> Result<(), SearchError> {
        for repo in repos {
            self.search_commits(
                keyword,
                Some(&repo.name),
                options,
                accept_msg,
                accept_files,
                commits,
            )
            .await?;
        }
        Ok(())
    }

    /// Fetch one commit's detail and assemble the full record.
    async fn build_commit(&self, item: &Value) -> Result<Commit, SearchError> {
        let detail_url = item.get("url").and_then(Value::as_str).unwrap_or("");
        let detail = self.get(detail_url).await?;
        let files = detail
            .get("files")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(|file| file.get("filename").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Commit {
            repo: item
                .pointer("/repository/full_name")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            msg: item
                .pointer("/commit/message")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            url: item
                .get("html_url")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            files,
        })
    }

    /// Clear the progress spinner, typically once all searches are done.
    pub fn finish(&self) {
        self.progress.finish_and_clear();
    }
}

/// Group `commits` by repository (first-seen order) and write them as
/// pretty-printed JSON to `output`, overwriting any existing file.
pub async fn dump_commits(commits: &[Commit], output: &str) -> Result<(), SearchError> {
    let grouped = group_by_repo(commits);
    let text = serde_json::to_string_pretty(&grouped)?;
    tokio::fs::write(output, text).await?;
    Ok(())
}
