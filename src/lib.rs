//! Competition protocol scraper.
//! Collects every athlete of the configured competitions together with the competition's
//! weight category and writes them into a single CSV file per run.

mod macros;

pub mod comp_ref;
pub mod config;
pub mod decode;
pub mod error;
pub mod output;
pub mod parse;
pub mod process;
pub mod reconcile;
pub mod report;
pub mod request;

pub use config::{Backoff, RetryPolicy, RunConfig, Strategy};
pub use error::{Error, Result};
pub use reconcile::ResultRow;

pub const DEFAULT_API_BASE: &str = "https://apitrenvet.allstrongman.com/api";
/// Used for the file name when no competition yielded a title.
pub const FALLBACK_TITLE: &str = "competition";
/// Category short-codes that may trail a competition title.
pub const CATEGORY_CODES: [&str; 13] = [
    "w1", "n2.2", "n2", "n1.1", "w0", "r1", "r2", "n1", "s1", "n0", "r0", "h2", "h1",
];
/// Category value the backend sends when a competition has none.
const EMPTY_CATEGORY_SENTINEL: &str = "Empty";
