use crate::error::AnalyticsError;
use crate::request::DIRECT_REFERRER;
use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::{Timestamp, ToSpan};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use url::Url;

use hoplink_core::{Link, LinkStore, ShortCode};

const TOP_BROWSERS: usize = 5;
const TOP_REFERRERS: usize = 5;
const TOP_COUNTRIES: usize = 10;
const TOP_LINKS: usize = 10;

const MIN_WINDOW_DAYS: i64 = 1;
const MAX_WINDOW_DAYS: i64 = 365;

/// Referrers that fail to parse as a URL are pooled under this label.
const OTHER_REFERRER: &str = "Other";

/// Click count for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayCount {
    pub date: Date,
    pub count: u64,
}

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEntry {
    pub name: String,
    pub count: u64,
}

/// Rolling statistics for one link over a trailing window.
#[derive(Debug, Clone, Serialize)]
pub struct ClickSummary {
    pub code: String,
    pub destination: String,
    /// Clicks inside the window; equals the sum of `clicks_by_day`.
    pub total_clicks: u64,
    /// Lifetime counter from the link record.
    pub lifetime_clicks: u64,
    /// One entry per day in the window, oldest first, zero-filled.
    pub clicks_by_day: Vec<DayCount>,
    pub top_browsers: Vec<TableEntry>,
    pub top_referrers: Vec<TableEntry>,
    pub top_countries: Vec<TableEntry>,
    /// All devices seen, most clicked first.
    pub devices: Vec<TableEntry>,
    pub created_at: Timestamp,
    pub last_accessed_at: Option<Timestamp>,
}

/// Frequency table that remembers first-seen order, so sorting by
/// count leaves ties in encounter order.
#[derive(Default)]
struct FrequencyTable {
    entries: Vec<TableEntry>,
    index: HashMap<String, usize>,
}

impl FrequencyTable {
    fn bump(&mut self, name: &str) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].count += 1,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(TableEntry {
                    name: name.to_string(),
                    count: 1,
                });
            }
        }
    }

    /// Descending by count; stable sort keeps first-seen order on ties.
    fn into_top(mut self, limit: usize) -> Vec<TableEntry> {
        self.entries.sort_by(|a, b| b.count.cmp(&a.count));
        self.entries.truncate(limit);
        self.entries
    }
}

/// Groups a referrer by hostname. `"Direct"` never reaches this;
/// anything that does not parse as a URL with a host pools into
/// `"Other"`.
fn referrer_host(referrer: &str) -> String {
    Url::parse(referrer)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| OTHER_REFERRER.to_string())
}

/// Computes per-day counts and top-N tables for one link's clicks in
/// the trailing `window_days` calendar days (UTC).
pub async fn summarize<S: LinkStore>(
    store: &S,
    code: &ShortCode,
    window_days: i64,
) -> Result<ClickSummary, AnalyticsError> {
    if !(MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&window_days) {
        return Err(AnalyticsError::InvalidWindow(window_days));
    }

    let link = store
        .find_by_code(code)
        .await?
        .ok_or_else(|| AnalyticsError::NotFound(code.to_string()))?;

    let now = Timestamp::now();
    let today = now.to_zoned(TimeZone::UTC).date();
    let start_day = today
        .checked_sub((window_days - 1).days())
        .map_err(|_| AnalyticsError::InvalidWindow(window_days))?;
    let since = start_day
        .to_zoned(TimeZone::UTC)
        .map_err(|_| AnalyticsError::InvalidWindow(window_days))?
        .timestamp();

    let events = store.list_click_events(code, since).await?;

    let mut by_day: BTreeMap<Date, u64> = BTreeMap::new();
    let mut day = start_day;
    while day <= today {
        by_day.insert(day, 0);
        day = day
            .checked_add(1.days())
            .map_err(|_| AnalyticsError::InvalidWindow(window_days))?;
    }

    let mut browsers = FrequencyTable::default();
    let mut referrers = FrequencyTable::default();
    let mut countries = FrequencyTable::default();
    let mut devices = FrequencyTable::default();
    let mut total = 0u64;

    for event in &events {
        let date = event.timestamp.to_zoned(TimeZone::UTC).date();
        let Some(count) = by_day.get_mut(&date) else {
            // Clock skew can push an event past `today`; it stays out
            // of this window's series.
            continue;
        };
        *count += 1;
        total += 1;

        browsers.bump(&event.browser);
        devices.bump(&event.device);
        if event.referrer != DIRECT_REFERRER {
            referrers.bump(&referrer_host(&event.referrer));
        }
        if let Some(country) = &event.country {
            countries.bump(country);
        }
    }

    let clicks_by_day = by_day
        .into_iter()
        .map(|(date, count)| DayCount { date, count })
        .collect();

    Ok(ClickSummary {
        code: link.code.as_str().to_string(),
        destination: link.destination,
        total_clicks: total,
        lifetime_clicks: link.clicks,
        clicks_by_day,
        top_browsers: browsers.into_top(TOP_BROWSERS),
        top_referrers: referrers.into_top(TOP_REFERRERS),
        top_countries: countries.into_top(TOP_COUNTRIES),
        devices: devices.into_top(usize::MAX),
        created_at: link.created_at,
        last_accessed_at: link.last_accessed_at,
    })
}

/// Condensed link row for overview listings.
#[derive(Debug, Clone, Serialize)]
pub struct LinkDigest {
    pub code: String,
    pub destination: String,
    pub clicks: u64,
    pub created_at: Timestamp,
}

impl From<&Link> for LinkDigest {
    fn from(link: &Link) -> Self {
        Self {
            code: link.code.as_str().to_string(),
            destination: link.destination.clone(),
            clicks: link.clicks,
            created_at: link.created_at,
        }
    }
}

/// Dashboard totals across a set of links.
#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub total_links: u64,
    pub total_clicks: u64,
    pub average_clicks_per_link: f64,
    pub top_by_clicks: Vec<LinkDigest>,
    pub recently_created: Vec<LinkDigest>,
}

/// Computes dashboard totals over the given (typically active) links.
///
/// Both top-10 lists break ties on the code so repeated calls over the
/// same data produce identical orderings.
pub fn overview(links: &[Link]) -> Overview {
    let total_links = links.len() as u64;
    let total_clicks: u64 = links.iter().map(|l| l.clicks).sum();
    let average_clicks_per_link = if total_links == 0 {
        0.0
    } else {
        total_clicks as f64 / total_links as f64
    };

    let mut by_clicks: Vec<&Link> = links.iter().collect();
    by_clicks.sort_by(|a, b| {
        b.clicks
            .cmp(&a.clicks)
            .then_with(|| a.code.as_str().cmp(b.code.as_str()))
    });

    let mut by_created: Vec<&Link> = links.iter().collect();
    by_created.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.code.as_str().cmp(b.code.as_str()))
    });

    Overview {
        total_links,
        total_clicks,
        average_clicks_per_link,
        top_by_clicks: by_clicks.iter().take(TOP_LINKS).map(|l| (*l).into()).collect(),
        recently_created: by_created.iter().take(TOP_LINKS).map(|l| (*l).into()).collect(),
    }
}
