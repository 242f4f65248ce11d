//! Daily closing prices from stooq
//!
//! The CSV endpoint returns `Date,Open,High,Low,Close,Volume` rows, oldest
//! first. Only the most recent closes are kept.

use alloc::format;
use alloc::string::String;

use heapless::Vec;

use super::http::HttpClient;
use super::{DataSource, FetchError};

/// Closes kept per reading
pub const MAX_CLOSES: usize = 16;

const CLOSE_COLUMN: usize = 4;

/// Recent daily closes, oldest first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StockData {
    pub closes: Vec<f32, MAX_CLOSES>,
}

impl StockData {
    /// Most recent close
    pub fn last(&self) -> Option<f32> {
        self.closes.last().copied()
    }

    /// Lowest and highest close, for chart scaling
    pub fn range(&self) -> Option<(f32, f32)> {
        let first = *self.closes.first()?;
        Some(
            self.closes
                .iter()
                .fold((first, first), |(lo, hi), &c| (lo.min(c), hi.max(c))),
        )
    }
}

/// Normalize a ticker: lower case, `.us` when no market is given
pub fn normalize_symbol(symbol: &str) -> String {
    let mut symbol = symbol.trim().to_lowercase();
    if !symbol.contains('.') {
        symbol.push_str(".us");
    }
    symbol
}

/// Parse closes from the CSV body, keeping the last [`MAX_CLOSES`]
/// positive values
pub fn parse_closes(csv: &str) -> Result<StockData, FetchError> {
    let mut data = StockData::default();
    for line in csv.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with("Date") {
            continue;
        }
        let Some(close) = line
            .split(',')
            .nth(CLOSE_COLUMN)
            .and_then(|field| field.trim().parse::<f32>().ok())
        else {
            continue;
        };
        if close <= 0.0 {
            continue;
        }
        if data.closes.is_full() {
            data.closes.remove(0);
        }
        // room was made above
        let _ = data.closes.push(close);
    }

    if data.closes.is_empty() {
        return Err(FetchError::NoData);
    }
    Ok(data)
}

/// Stock source over an HTTP client
pub struct StockSource<H> {
    http: H,
    symbol: String,
}

impl<H: HttpClient> StockSource<H> {
    pub fn new(http: H, symbol: &str) -> Self {
        Self {
            http,
            symbol: normalize_symbol(symbol),
        }
    }

    /// Normalized ticker
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn url(&self) -> String {
        format!("https://stooq.com/q/d/l/?s={}&i=d", self.symbol)
    }

    pub fn http_mut(&mut self) -> &mut H {
        &mut self.http
    }
}

impl<H: HttpClient> DataSource for StockSource<H> {
    type Output = StockData;
    const DEFAULT_INTERVAL_MINUTES: u16 = 60;

    fn name(&self) -> &'static str {
        "stock"
    }

    fn fetch(&mut self) -> Result<StockData, FetchError> {
        let url = self.url();
        let body = self.http.get(&url)?.into_ok_body()?;
        parse_closes(&body)
    }
}
