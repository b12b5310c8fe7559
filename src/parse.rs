use scraper::{ElementRef, Html, Selector};
use tokio::task::spawn_blocking;

use crate::decode::{category_from_title, competition_title_only};
use crate::{Error, Result};

const CHALLENGE_MARKERS: [&str; 2] = ["just a moment", "checking your browser"];

/// What a rendered competition or protocol page shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    /// Full title as displayed, whitespace collapsed.
    pub raw_title: String,
    /// Athlete names in page order.
    pub names: Vec<String>,
}

impl PageSnapshot {
    pub fn title(&self) -> &str {
        competition_title_only(&self.raw_title)
    }

    /// Pages carry the category only as the title suffix.
    pub fn category(&self) -> &str {
        category_from_title(&self.raw_title)
    }
}

/// True for anti-bot interstitials served instead of the page.
pub fn is_challenge_page(html: &str) -> bool {
    let lower = html.to_lowercase();
    CHALLENGE_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Parses the page off the async runtime.
pub async fn parse_page(html: String) -> Result<PageSnapshot> {
    spawn_blocking(move || parse_document(&html)).await?
}

/// Extracts the title and the competitor names from a page.
pub fn parse_document(html: &str) -> Result<PageSnapshot> {
    let doc = Html::parse_document(html);

    let title_selector = create_selector("div.competition-title")?;
    let doc_title_selector = create_selector("title")?;
    let block_selector = create_selector("div.competitor-name")?;
    let part_selector = create_selector("div.first-last-name")?;

    let raw_title = doc
        .select(&title_selector)
        .next()
        .map(collapsed_text)
        .filter(|t| !t.is_empty())
        .or_else(|| doc.select(&doc_title_selector).next().map(collapsed_text))
        .unwrap_or_default();

    // Grouped layout: one block per competitor holding first and last name parts.
    let mut names: Vec<String> = doc
        .select(&block_selector)
        .filter_map(|block| {
            let parts: Vec<String> = block
                .select(&part_selector)
                .map(collapsed_text)
                .filter(|p| !p.is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        })
        .collect();

    if names.is_empty() {
        // Flat layout: first and last name follow each other.
        let parts: Vec<String> = doc
            .select(&part_selector)
            .map(collapsed_text)
            .filter(|p| !p.is_empty())
            .collect();
        names = parts.chunks(2).map(|pair| pair.join(" ")).collect();
    }

    Ok(PageSnapshot { raw_title, names })
}

fn collapsed_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::ParseSelector(sel_str.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUPED: &str = r#"
        <html><head><title>Trenvet</title></head><body>
        <app-protocol-page>
          <div class="competition-title">  City Open
             - h1 </div>
          <div class="competitor-name">
            <div class="first-last-name">Ann</div><div class="first-last-name">Lee</div>
          </div>
          <div class="competitor-name">
            <div class="first-last-name">Bob</div><div class="first-last-name">Ray</div>
          </div>
          <div class="competitor-name"></div>
        </app-protocol-page>
        </body></html>"#;

    const FLAT: &str = r#"
        <html><head><title>Kyiv Cup</title></head><body>
          <div class="first-last-name">Ann</div><div class="first-last-name">Lee</div>
          <div class="first-last-name">Bob</div><div class="first-last-name"> </div>
          <div class="first-last-name">Solo</div>
        </body></html>"#;

    #[test]
    fn grouped_names_and_title_category() {
        let page = parse_document(GROUPED).unwrap();
        assert_eq!(page.raw_title, "City Open - h1");
        assert_eq!(page.title(), "City Open");
        assert_eq!(page.category(), "h1");
        assert_eq!(page.names, ["Ann Lee", "Bob Ray"]);
    }

    #[test]
    fn flat_names_are_paired() {
        let page = parse_document(FLAT).unwrap();
        assert_eq!(page.raw_title, "Kyiv Cup");
        assert_eq!(page.category(), "");
        assert_eq!(page.names, ["Ann Lee", "Bob Solo"]);
    }

    #[test]
    fn empty_page_has_no_names() {
        let page = parse_document("<html><body><div>loading</div></body></html>").unwrap();
        assert_eq!(page, PageSnapshot::default());
    }

    #[test]
    fn detects_challenge_pages() {
        assert!(is_challenge_page("<title>Just a moment...</title>"));
        assert!(is_challenge_page("<p>Checking your browser before accessing</p>"));
        assert!(!is_challenge_page(GROUPED));
    }

    #[tokio::test]
    async fn parses_off_runtime() {
        let page = parse_page(GROUPED.to_owned()).await.unwrap();
        assert_eq!(page.names.len(), 2);
    }
}
