use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use comp_scrape::{info_time, process::run, Result, RunConfig, Strategy};

/// Scrapes competition protocols into one CSV of athletes and their categories.
#[derive(Parser)]
#[command(version, about)]
struct Opts {
    /// Competition urls (`...compId=<id>...` or `.../competitions/<id>`), appended to the ones
    /// from the config file.
    urls: Vec<String>,

    /// JSON run configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, value_enum)]
    strategy: Option<Strategy>,

    /// Number of competitions scraped at the same time.
    #[arg(short, long)]
    workers: Option<usize>,

    #[arg(long)]
    api_base: Option<String>,

    /// Label used when the backend reports the category as `Empty`.
    #[arg(long)]
    empty_category_label: Option<String>,

    /// Drop repeated (name, category) rows.
    #[arg(long)]
    dedup: bool,

    /// List athletes that appear under more than one category.
    #[arg(long)]
    report_duplicates: bool,

    /// Retry failed competitions one by one after the pool is done.
    #[arg(long)]
    rerun_failed: bool,

    /// Directory the CSV is written to.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Exact output file, overrides the name derived from the competition title.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Opts {
    fn into_config(self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        config.urls.extend(self.urls);
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        if let Some(api_base) = self.api_base {
            config.api_base = api_base;
        }
        if let Some(label) = self.empty_category_label {
            config.empty_category_label = label;
        }
        config.dedup |= self.dedup;
        config.report_duplicates |= self.report_duplicates;
        config.rerun_failed |= self.rerun_failed;
        if let Some(out_dir) = self.out_dir {
            config.out_dir = out_dir;
        }
        if self.output.is_some() {
            config.output = self.output;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let start_time = Local::now();
    let config = Opts::parse().into_config()?;
    run(config).await?;
    info_time!(start_time, "Full program time");

    Ok(())
}
