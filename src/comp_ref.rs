use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Error, Result};

static COMP_ID_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"compId=([a-f0-9]+)").expect("valid compId pattern"));
static COMP_ID_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/competitions/([a-f0-9]+)(?:/|$)").expect("valid path pattern"));

const COMP_PAGE: &str = "comp-page";
const PROTOCOL_PAGE: &str = "protocol-page";

/// Opaque competition identifier (`compId`) pulled out of a page or API url.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompetitionRef(String);

impl CompetitionRef {
    /// Accepts either a page url carrying `compId=<hex>` or an API url containing
    /// `/competitions/<hex>`. The query-style parameter wins when both are present.
    pub fn from_url(url: &str) -> Option<Self> {
        COMP_ID_PARAM
            .captures(url)
            .or_else(|| COMP_ID_PATH.captures(url))
            .and_then(|caps| caps.get(1))
            .map(|m| CompetitionRef(m.as_str().to_owned()))
    }

    pub fn parse(url: &str) -> Result<Self> {
        Self::from_url(url).ok_or_else(|| Error::MissingCompId(url.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompetitionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The same competition rendered by the other page kind: `comp-page` <-> `protocol-page`.
/// Returns `None` for urls that are neither.
pub fn alternate_page_url(url: &str) -> Option<String> {
    CompetitionRef::from_url(url)?;
    if url.contains(COMP_PAGE) {
        Some(url.replacen(COMP_PAGE, PROTOCOL_PAGE, 1))
    } else if url.contains(PROTOCOL_PAGE) {
        Some(url.replacen(PROTOCOL_PAGE, COMP_PAGE, 1))
    } else {
        None
    }
}
