use thiserror::Error;
use tokio::sync::mpsc;

use crate::process::CompetitionResult;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No competition id found in url: {0}")]
    MissingCompId(String),

    #[error("Page is still showing a browser check: {0}")]
    Challenge(String),

    #[error("The selector you are trying to scrape for is invalid. Selector: {0}")]
    ParseSelector(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Io Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tokio Join Error, couldn't await a task! {0}")]
    RuntimeJoin(#[from] tokio::task::JoinError),
    #[error("Couldn't send a competition result through a channel.")]
    RuntimeSendError,
    #[error("Worker pool was closed before every competition got a slot.")]
    PoolClosed(#[from] tokio::sync::AcquireError),

    #[error("Reqwest Error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Csv Error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Reqwest(_) | Error::Json(_) | Error::Challenge(_) | Error::Io(_) => true,
            Error::MissingCompId(_)
            | Error::ParseSelector(_)
            | Error::Config(_)
            | Error::RuntimeJoin(_)
            | Error::RuntimeSendError
            | Error::PoolClosed(_)
            | Error::Csv(_) => false,
        }
    }
}

impl From<mpsc::error::SendError<CompetitionResult>> for Error {
    fn from(_value: mpsc::error::SendError<CompetitionResult>) -> Self {
        Error::RuntimeSendError
    }
}
