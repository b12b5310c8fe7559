use std::future::Future;
use std::time::Duration;

use log::debug;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;

use crate::comp_ref::CompetitionRef;
use crate::config::RetryPolicy;
use crate::decode::{self, CompetitionMeta, ProtocolEntry, Roster};
use crate::parse::is_challenge_page;
use crate::{status, Error, Result};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub fn build_client() -> Result<Client> {
    Ok(Client::builder().user_agent(USER_AGENT).build()?)
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or `policy.max_attempts`
/// is used up. The last error is returned on exhaustion.
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        let jitter = policy.start_jitter();
        if !jitter.is_zero() {
            tokio::time::sleep(jitter).await;
        }

        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!("{label} succeeded on attempt {attempt}");
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let delay = policy.backoff.delay(attempt);
                status!(
                    RETRY,
                    "{label} attempt {attempt} failed: {e}. sleeping {:.2}s",
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn get_text(client: &Client, url: &str, accept: &str, timeout: Duration) -> Result<String> {
    debug!("GET {url}");
    let text = client
        .get(url)
        .header(ACCEPT, accept)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}

/// GET `url` and parse the body as JSON. Non-2xx statuses, transport errors and unparsable
/// bodies all count as failed attempts.
pub async fn fetch_json(client: &Client, url: &str, policy: &RetryPolicy) -> Result<Value> {
    with_retry(policy, url, || async {
        let body = get_text(client, url, "application/json", policy.timeout()).await?;
        let value: Value = serde_json::from_str(&body)?;
        Ok::<_, Error>(value)
    })
    .await
}

/// GET a rendered page. A browser-check interstitial counts as a failed attempt.
pub async fn fetch_page(client: &Client, url: &str, policy: &RetryPolicy) -> Result<String> {
    with_retry(policy, url, || async {
        let html = get_text(client, url, "text/html", policy.timeout()).await?;
        if is_challenge_page(&html) {
            return Err(Error::Challenge(url.to_owned()));
        }
        Ok::<_, Error>(html)
    })
    .await
}

/// Everything the backend knows about one competition.
#[derive(Debug, Clone, Default)]
pub struct Competition {
    pub meta: CompetitionMeta,
    pub roster: Roster,
    pub protocol: Vec<ProtocolEntry>,
}

/// Client for the three competition endpoints under one API base.
#[derive(Debug, Clone)]
pub struct Api<'a> {
    pub client: &'a Client,
    pub base: &'a str,
    pub policy: &'a RetryPolicy,
}

impl Api<'_> {
    fn url(&self, id: &CompetitionRef, tail: &str) -> String {
        format!("{}/competitions/{id}{tail}", self.base)
    }

    pub async fn meta(&self, id: &CompetitionRef, empty_label: &str) -> Result<CompetitionMeta> {
        let body = fetch_json(self.client, &self.url(id, ""), self.policy).await?;
        Ok(decode::competition_meta(&body, empty_label))
    }

    pub async fn roster(&self, id: &CompetitionRef) -> Result<Roster> {
        let body = fetch_json(self.client, &self.url(id, "/athletes"), self.policy).await?;
        Ok(decode::roster(&body))
    }

    pub async fn protocol(&self, id: &CompetitionRef) -> Result<Vec<ProtocolEntry>> {
        let body = fetch_json(self.client, &self.url(id, "/protocol"), self.policy).await?;
        Ok(decode::protocol(&body))
    }

    /// Metadata first, so a competition that can't even be described yields nothing; roster and
    /// protocol are then fetched side by side, each with its own retries.
    pub async fn competition(&self, id: &CompetitionRef, empty_label: &str) -> Result<Competition> {
        let meta = self.meta(id, empty_label).await?;
        let (roster, protocol) = tokio::try_join!(self.roster(id), self.protocol(id))?;
        Ok(Competition {
            meta,
            roster,
            protocol,
        })
    }
}
