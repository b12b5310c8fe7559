use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use log::{debug, warn};
use reqwest::Client;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::comp_ref::{alternate_page_url, CompetitionRef};
use crate::decode::normalize_category;
use crate::output::{output_file_name, write_csv};
use crate::parse::parse_page;
use crate::reconcile::{reconcile, Reconciled};
use crate::report::{dedup_rows, duplicate_names, print_duplicate_report, DuplicateName};
use crate::request::{build_client, fetch_page, Api, Competition};
use crate::{info_time, status, Error, Result, ResultRow, RunConfig, Strategy, FALLBACK_TITLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    /// Fetched fine but nobody is listed.
    Empty,
    /// No competition id in the url.
    Skipped,
    /// Gave up after retries.
    Failed,
}

/// What one worker hands back for one configured url.
#[derive(Debug, Clone)]
pub struct CompetitionResult {
    /// Position of the url in the configured list.
    pub index: usize,
    pub url: String,
    pub outcome: Outcome,
    /// Title without its category suffix, empty when unknown.
    pub title: String,
    /// Rank order for the API, page order for pages.
    pub rows: Vec<ResultRow>,
}

impl CompetitionResult {
    fn without_rows(index: usize, url: String, outcome: Outcome) -> Self {
        Self {
            index,
            url,
            outcome,
            title: String::new(),
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub removed_duplicates: usize,
    pub duplicates: Vec<DuplicateName>,
    /// Urls that still failed at the end of the run.
    pub failed: Vec<String>,
}

struct Scraped {
    title: String,
    category: String,
    rows: Vec<ResultRow>,
    missing: usize,
}

/// Scrapes every configured competition and writes the CSV.
/// Returns `None` without touching the filesystem when there is nothing to scrape.
pub async fn run(config: RunConfig) -> Result<Option<RunSummary>> {
    if config.urls.is_empty() {
        println!("No competition urls configured. Pass them as arguments or list them in the config file.");
        return Ok(None);
    }
    config.validate()?;

    let start_time = Local::now();
    let client = build_client()?;
    let config = Arc::new(config);

    let mut results = scrape_all(config.clone(), client.clone()).await?;
    info_time!(start_time, "Finished scraping {} competitions", results.len());

    if config.rerun_failed {
        rerun_failed(&config, &client, &mut results).await;
    }

    let title = canonical_title(&results);
    let mut rows = collect_rows(&results);

    let mut removed_duplicates = 0;
    if config.dedup {
        let (kept, removed) = dedup_rows(rows);
        rows = kept;
        removed_duplicates = removed;
        println!("Removed {removed} duplicate rows");
    }

    let duplicates = if config.report_duplicates {
        let dups = duplicate_names(&rows);
        print_duplicate_report(&dups);
        dups
    } else {
        Vec::new()
    };

    let path = match &config.output {
        Some(path) => path.clone(),
        None => config.out_dir.join(output_file_name(&title)),
    };
    let write_time = Local::now();
    write_csv(&path, &rows).await?;
    info_time!(write_time, "Wrote the results to file: {}", path.display());
    println!("\nSaved -> {} with {} rows", path.display(), rows.len());

    let failed: Vec<String> = results
        .iter()
        .filter(|r| r.outcome == Outcome::Failed)
        .map(|r| r.url.clone())
        .collect();
    if !failed.is_empty() {
        println!("Still failed:");
        for url in &failed {
            println!(" - {url}");
        }
    }

    Ok(Some(RunSummary {
        path,
        rows: rows.len(),
        removed_duplicates,
        duplicates,
        failed,
    }))
}

/// Runs one task per url on a pool of `config.workers()` slots. Results come back in
/// completion order, each tagged with its submission index.
pub async fn scrape_all(config: Arc<RunConfig>, client: Client) -> Result<Vec<CompetitionResult>> {
    let (res_tx, res_rx) = mpsc::channel(config.urls.len().max(1));
    let collect_handle = tokio::spawn(async move { collect_results(res_rx).await });

    let pool = Arc::new(Semaphore::new(config.workers()));
    let mut task_set = JoinSet::new();
    for (index, url) in config.urls.iter().cloned().enumerate() {
        task_set.spawn({
            // Client and config are behind Arcs, cloning is cheap.
            let config = config.clone();
            let client = client.clone();
            let pool = pool.clone();
            let res_tx = res_tx.clone();

            async move {
                let _slot = pool.acquire_owned().await?;
                let result = scrape_one(&config, &client, index, url).await;
                res_tx.send(result).await?;
                Ok::<_, Error>(())
            }
        });
    }
    drop(res_tx);

    while let Some(task) = task_set.join_next().await {
        task??;
    }
    Ok(collect_handle.await?)
}

async fn collect_results(mut res_rx: mpsc::Receiver<CompetitionResult>) -> Vec<CompetitionResult> {
    let mut col = Vec::new();
    while let Some(result) = res_rx.recv().await {
        debug!(
            "Received #{} ({:?}): {} rows",
            result.index,
            result.outcome,
            result.rows.len()
        );
        col.push(result);
    }
    col
}

/// Scrapes one url. Never fails: problems are reported and turned into an outcome without rows.
pub async fn scrape_one(
    config: &RunConfig,
    client: &Client,
    index: usize,
    url: String,
) -> CompetitionResult {
    let id = match CompetitionRef::parse(&url) {
        Ok(id) => id,
        Err(e) => {
            status!(SKIP, "{url} -> {e}");
            return CompetitionResult::without_rows(index, url, Outcome::Skipped);
        }
    };

    let scraped = match config.strategy {
        Strategy::Api => scrape_api(config, client, &id).await,
        Strategy::Page => scrape_page(config, client, &url).await,
    };

    match scraped {
        Ok(scraped) if scraped.rows.is_empty() => {
            status!(EMPTY, "compId={id} -> no competitors");
            CompetitionResult {
                title: scraped.title,
                ..CompetitionResult::without_rows(index, url, Outcome::Empty)
            }
        }
        Ok(Scraped {
            title,
            category,
            rows,
            missing,
        }) => {
            status!(
                OK,
                "compId={id} -> {} athletes, missing_names={missing}, category='{category}'",
                rows.len()
            );
            CompetitionResult {
                index,
                url,
                outcome: Outcome::Ok,
                title,
                rows,
            }
        }
        Err(e) => {
            status!(ERR, "compId={id} -> {e}");
            CompetitionResult::without_rows(index, url, Outcome::Failed)
        }
    }
}

async fn scrape_api(config: &RunConfig, client: &Client, id: &CompetitionRef) -> Result<Scraped> {
    let policy = config.retry_policy();
    let api = Api {
        client,
        base: config.api_base(),
        policy: &policy,
    };
    let Competition {
        meta,
        roster,
        protocol,
    } = api.competition(id, &config.empty_category_label).await?;

    let Reconciled { rows, missing } = reconcile(&protocol, &roster, &meta.category);
    if missing > 0 {
        warn!(
            "compId={id}: {missing} of {} ranked athletes are not on the roster",
            rows.len()
        );
    }
    Ok(Scraped {
        title: meta.title,
        category: meta.category,
        rows,
        missing,
    })
}

async fn scrape_page(config: &RunConfig, client: &Client, url: &str) -> Result<Scraped> {
    let policy = config.retry_policy();
    let mut page = parse_page(fetch_page(client, url, &policy).await?).await?;

    if page.names.is_empty() {
        if let Some(alt_url) = alternate_page_url(url) {
            debug!("No names at {url}, trying {alt_url}");
            let alt_page = parse_page(fetch_page(client, &alt_url, &policy).await?).await?;
            if !alt_page.raw_title.is_empty() {
                page.raw_title = alt_page.raw_title;
            }
            page.names = alt_page.names;
        }
    }

    let category = normalize_category(page.category().to_owned(), &config.empty_category_label);
    let rows = page
        .names
        .iter()
        .map(|name| ResultRow::new(name.as_str(), category.as_str()))
        .collect();
    Ok(Scraped {
        title: page.title().to_owned(),
        category,
        rows,
        missing: 0,
    })
}

/// Gives every failed competition one more sequential go, keeping its submission index.
/// Rerun results complete last, so they move to the end of the completion order.
async fn rerun_failed(
    config: &RunConfig,
    client: &Client,
    results: &mut Vec<CompetitionResult>,
) {
    let (failed, done): (Vec<_>, Vec<_>) = std::mem::take(results)
        .into_iter()
        .partition(|r| r.outcome == Outcome::Failed);
    *results = done;
    for result in failed {
        debug!("Rerunning #{} {}", result.index, result.url);
        results.push(scrape_one(config, client, result.index, result.url).await);
    }
}

/// Title of the earliest submitted competition that has one.
pub fn canonical_title(results: &[CompetitionResult]) -> String {
    results
        .iter()
        .filter(|r| !r.title.is_empty())
        .min_by_key(|r| r.index)
        .map(|r| r.title.clone())
        .unwrap_or_else(|| FALLBACK_TITLE.to_owned())
}

/// All rows in the order the competitions finished.
pub fn collect_rows(results: &[CompetitionResult]) -> Vec<ResultRow> {
    results
        .iter()
        .flat_map(|r| r.rows.iter().cloned())
        .collect()
}
