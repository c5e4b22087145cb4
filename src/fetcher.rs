//! Cached, paginated retrieval of API queries.
//!
//! A query is fetched page by page: each page is looked up in the cache by its
//! [`CacheKey`], downloaded on a miss, parsed, and its rows appended until the
//! last page has been seen.
//!
//! Typical usage:
//! ```no_run
//! # use wbdata::{Fetcher, MemoryCache, HttpTransport, Params};
//! let mut fetcher = Fetcher::new(MemoryCache::new(), HttpTransport::with_defaults()?);
//! let result = fetcher.fetch(
//!     "https://api.worldbank.org/v2/sources",
//!     &Params::new(),
//!     false,
//! )?;
//! println!("{} sources, updated {:?}", result.len(), result.last_updated);
//! # Ok::<(), wbdata::Error>(())
//! ```

use crate::cache::ResponseCache;
use crate::error::{Error, Result};
use crate::models::{CacheKey, FetchResult, Page, Params, Row};
use crate::parse::parse_page;
use crate::transport::Transport;
use chrono::NaiveDate;
use serde_json::Value;

/// Rows requested per page.
pub const PER_PAGE: u32 = 1000;

/// Safety cap to avoid pathological jobs.
pub const MAX_PAGES: u32 = 1000;

/// Drives cache, transport and parser for one query at a time.
#[derive(Debug)]
pub struct Fetcher<C, T> {
    cache: C,
    transport: T,
}

impl<C: ResponseCache, T: Transport> Fetcher<C, T> {
    pub fn new(cache: C, transport: T) -> Self {
        Self { cache, transport }
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Raw body for one request, from the cache unless `skip_cache` is set.
    /// Downloaded bodies are always written back, so a forced refresh also
    /// updates the cache.
    pub fn get_body(&mut self, url: &str, params: &Params, skip_cache: bool) -> Result<String> {
        let key = CacheKey::new(url, params);
        if !skip_cache && let Some(body) = self.cache.get(&key) {
            log::debug!("cache hit for {key}");
            return Ok(body);
        }
        log::debug!("GET {key}");
        let body = self.transport.get(url, &key.params)?;
        self.cache.set(key, body.clone());
        Ok(body)
    }

    /// One parsed page.
    pub fn get_page(&mut self, url: &str, params: &Params, skip_cache: bool) -> Result<Page> {
        let body = self.get_body(url, params, skip_cache)?;
        parse_page(&body)
    }

    /// Fetch every page of a query.
    ///
    /// `format=json` and `per_page` are added to `params`. Rows are returned in
    /// page order with string `id` fields trimmed; `last_updated` is the latest
    /// non-null `lastupdated` reported by any page.
    ///
    /// ### Errors
    /// Any transport or envelope error aborts the fetch; rows from earlier
    /// pages are discarded.
    pub fn fetch(&mut self, url: &str, params: &Params, skip_cache: bool) -> Result<FetchResult> {
        let mut params = params.clone();
        params.insert("format", "json");
        params.insert("per_page", PER_PAGE);

        let mut rows: Vec<Row> = Vec::new();
        let mut last_updated: Option<String> = None;
        let mut requests = 0u32;
        loop {
            requests += 1;
            if requests > MAX_PAGES {
                return Err(Error::PageLimit(MAX_PAGES));
            }
            let page = self.get_page(url, &params, skip_cache)?;
            log::debug!("Processed page {} of {}", page.page, page.pages);
            rows.extend(page.rows);
            if page.last_updated.is_some() {
                last_updated = page.last_updated;
            }
            if page.page >= page.pages {
                break;
            }
            params.insert("page", page.page + 1);
        }

        for row in &mut rows {
            strip_id(row);
        }
        let last_updated = last_updated
            .map(|s| {
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map_err(|source| Error::LastUpdated { value: s, source })
            })
            .transpose()?;
        Ok(FetchResult { rows, last_updated })
    }
}

/// Some identifier fields come back padded with whitespace.
fn strip_id(row: &mut Row) {
    if let Some(Value::String(id)) = row.get_mut("id") {
        let trimmed = id.trim();
        if trimmed.len() != id.len() {
            *id = trimmed.to_string();
        }
    }
}
