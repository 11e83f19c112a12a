//! Wait-times page scraper.
//!
//! The page lists one table row per attraction: a link whose text is the
//! attraction name, and a cell whose `title` reads `"<N> Minute Wait"`.
//! Rows with Lightning Lane also link to `/lightning-lane/dlr` with the next
//! return time as link text.

use crate::history::AttractionId;
use crate::lightning::LaneStatus;
use crate::source::{LightningLaneSource, LiveReadingSource, SourceError, reading_from_minutes};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_URL: &str = "https://www.thrill-data.com/waits/park/dlr/disneyland/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

static LINK_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<a\b[^>]*\btitle=[^>]*>\s*(.*?)\s*</a>").expect("link regex is valid")
});
static WAIT_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"title="\s*(\d+)\s+Minute Wait\s*""#).expect("wait regex is valid")
});
static LANE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a\b[^>]*\bhref="/lightning-lane/dlr"[^>]*>(.*?)</a>"#)
        .expect("lane regex is valid")
});
static INNER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex is valid"));

/// A listed attraction with fewer cells than this is closed.
const MIN_OPEN_CELLS: usize = 4;

#[derive(Debug, Clone)]
pub struct ThrillPageSource {
    client: reqwest::Client,
    url: String,
}

impl ThrillPageSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn fetch_page(&self) -> Result<String, SourceError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl LiveReadingSource for ThrillPageSource {
    async fn current_wait(&self, attraction_id: &AttractionId) -> Result<Option<u32>, SourceError> {
        let page = self.fetch_page().await?;
        let reading = extract_wait(&page, attraction_id.as_str());
        debug!(attraction = %attraction_id, reading = ?reading, "Live wait read");
        Ok(reading)
    }
}

#[async_trait]
impl LightningLaneSource for ThrillPageSource {
    async fn lane_status(&self, attraction_id: &AttractionId) -> Result<Option<LaneStatus>, SourceError> {
        let page = self.fetch_page().await?;
        let status = extract_lane(&page, attraction_id.as_str());
        debug!(attraction = %attraction_id, status = ?status, "Lightning Lane read");
        Ok(status)
    }
}

fn find_row<'a>(page: &'a str, name: &str) -> Option<&'a str> {
    page.split("<tr").skip(1).find(|row| {
        LINK_TEXT
            .captures_iter(row)
            .any(|caps| element_text(&caps[1]) == name)
    })
}

/// Find the posted wait for `name` in a wait-times page.
pub fn extract_wait(page: &str, name: &str) -> Option<u32> {
    find_row(page, name)
        .and_then(|row| WAIT_TITLE.captures(row))
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .and_then(reading_from_minutes)
}

/// Find the Lightning Lane status for `name`, or `None` if it is not listed.
pub fn extract_lane(page: &str, name: &str) -> Option<LaneStatus> {
    let row = find_row(page, name)?;
    if row.matches("<td").count() < MIN_OPEN_CELLS {
        return Some(LaneStatus::Closed);
    }
    let status = match LANE_LINK.captures(row) {
        Some(caps) => LaneStatus::from_text(&element_text(&caps[1])),
        None => LaneStatus::SoldOut,
    };
    Some(status)
}

/// Visible text of an element's inner HTML: nested tags dropped, entities decoded.
fn element_text(inner: &str) -> String {
    decode_entities(INNER_TAG.replace_all(inner, "").trim())
}

fn decode_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
