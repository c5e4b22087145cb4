//! Synchronous client for the **World Bank Indicators API (v2)**.
//!
//! The client only builds endpoint urls and query parameters; pagination,
//! caching and envelope parsing live in [`crate::fetcher::Fetcher`].
//!
//! ### Notes
//! - Responses are cached on disk (see [`crate::config::CacheConfig`]); pass
//!   `skip_cache` to force a download. A forced download still refreshes the
//!   cache.
//! - There is no global default client: build one and keep it around.
//!
//! Typical usage:
//! ```no_run
//! # use wbdata::{Client, DataQuery, Frequency};
//! let mut client = Client::from_env()?;
//! let data = client.get_data(
//!     &DataQuery::new("SP.POP.TOTL")
//!         .countries(["DEU", "USA"])
//!         .date(("2010", "2020"))
//!         .freq(Frequency::Year),
//! )?;
//! println!("{} rows, last updated {:?}", data.len(), data.last_updated);
//! # Ok::<(), wbdata::Error>(())
//! ```
use crate::cache::{FileCache, ResponseCache};
use crate::config::{CacheConfig, TransportConfig};
use crate::dates::{Dates, Frequency, format_dates, parse_row_dates};
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::models::{FetchResult, ParamValue, Params};
use crate::transport::{HttpTransport, Transport};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};

pub const BASE_URL: &str = "https://api.worldbank.org/v2";

/// Parameters of an indicator data request.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQuery {
    pub indicator: String,
    /// Country or aggregate codes; empty means `all`.
    pub countries: Vec<String>,
    pub date: Option<Dates>,
    pub freq: Frequency,
    /// Source id(s), e.g. `2` for WDI.
    pub source: Option<ParamValue>,
    /// Rewrite `date` fields as ISO dates (see [`parse_row_dates`]).
    pub parse_dates: bool,
    pub skip_cache: bool,
}

impl DataQuery {
    pub fn new(indicator: impl Into<String>) -> Self {
        Self {
            indicator: indicator.into(),
            countries: Vec::new(),
            date: None,
            freq: Frequency::Year,
            source: None,
            parse_dates: false,
            skip_cache: false,
        }
    }

    pub fn countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    pub fn date(mut self, date: impl Into<Dates>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn freq(mut self, freq: Frequency) -> Self {
        self.freq = freq;
        self
    }

    pub fn source(mut self, source: impl Into<ParamValue>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn parse_dates(mut self, yes: bool) -> Self {
        self.parse_dates = yes;
        self
    }

    pub fn skip_cache(mut self, yes: bool) -> Self {
        self.skip_cache = yes;
        self
    }
}

// Allow -, _, . unescaped in codes (common for indicator ids)
const SAFE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

fn enc_join<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(|s| percent_encoding::utf8_percent_encode(s.trim(), SAFE).to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Items may already be `;`-joined lists; the separators are kept.
fn enc_list(items: &[String]) -> String {
    enc_join(items.iter().flat_map(|s| s.split(';')))
}

#[derive(Debug)]
pub struct Client<C = FileCache, T = HttpTransport> {
    pub base_url: String,
    fetcher: Fetcher<C, T>,
}

impl Client {
    /// Client with the cache configured from `WBDATA_CACHE_*` variables.
    pub fn from_env() -> Result<Self> {
        Self::with_config(&CacheConfig::from_env(), TransportConfig::default())
    }

    pub fn with_config(cache: &CacheConfig, transport: TransportConfig) -> Result<Self> {
        let transport = HttpTransport::new(transport)?;
        Ok(Self::with_parts(FileCache::open(cache), transport))
    }
}

impl<C: ResponseCache, T: Transport> Client<C, T> {
    /// Client over any cache and transport.
    pub fn with_parts(cache: C, transport: T) -> Self {
        Self {
            base_url: BASE_URL.into(),
            fetcher: Fetcher::new(cache, transport),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn fetcher(&self) -> &Fetcher<C, T> {
        &self.fetcher
    }

    pub fn fetcher_mut(&mut self) -> &mut Fetcher<C, T> {
        &mut self.fetcher
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for s in segments {
            url.push('/');
            url.push_str(s);
        }
        url
    }

    /// Observations of one indicator.
    ///
    /// ### Errors
    /// - Invalid `date` or unknown frequency
    /// - Network error or API error payload
    pub fn get_data(&mut self, query: &DataQuery) -> Result<FetchResult> {
        let countries = if query.countries.is_empty() {
            "all".to_string()
        } else {
            enc_list(&query.countries)
        };
        let indicator = enc_join(query.indicator.split(';'));
        let url = self.endpoint(&["countries", countries.as_str(), "indicators", indicator.as_str()]);

        let mut params = Params::new();
        if let Some(date) = &query.date {
            params.insert("date", format_dates(date.clone(), query.freq)?);
        }
        if let Some(source) = &query.source {
            params.insert("source", source.clone());
        }
        let mut data = self.fetcher.fetch(&url, &params, query.skip_cache)?;
        if query.parse_dates {
            parse_row_dates(&mut data.rows)?;
        }
        Ok(data)
    }

    /// `GET {base}/{collection}[/{ids}]`.
    fn id_only_query(&mut self, collection: &str, ids: &[String], skip_cache: bool) -> Result<FetchResult> {
        let url = if ids.is_empty() {
            self.endpoint(&[collection])
        } else {
            self.endpoint(&[collection, enc_list(ids).as_str()])
        };
        self.fetcher.fetch(&url, &Params::new(), skip_cache)
    }

    /// Data sources; empty `ids` returns all of them.
    pub fn get_sources(&mut self, ids: &[String], skip_cache: bool) -> Result<FetchResult> {
        self.id_only_query("sources", ids, skip_cache)
    }

    pub fn get_topics(&mut self, ids: &[String], skip_cache: bool) -> Result<FetchResult> {
        self.id_only_query("topics", ids, skip_cache)
    }

    pub fn get_incomelevels(&mut self, ids: &[String], skip_cache: bool) -> Result<FetchResult> {
        self.id_only_query("incomeLevels", ids, skip_cache)
    }

    pub fn get_lendingtypes(&mut self, ids: &[String], skip_cache: bool) -> Result<FetchResult> {
        self.id_only_query("lendingTypes", ids, skip_cache)
    }

    /// Countries and aggregates, either by id or filtered by income level
    /// and/or lending type. Ids can't be combined with filters.
    pub fn get_countries(
        &mut self,
        ids: &[String],
        incomelevel: &[String],
        lendingtype: &[String],
        skip_cache: bool,
    ) -> Result<FetchResult> {
        if !ids.is_empty() {
            if !incomelevel.is_empty() || !lendingtype.is_empty() {
                return Err(Error::InvalidQuery(
                    "can't specify country ids and aggregates".into(),
                ));
            }
            return self.id_only_query("countries", ids, skip_cache);
        }
        let mut params = Params::new();
        if !incomelevel.is_empty() {
            params.insert("incomeLevel", incomelevel.to_vec());
        }
        if !lendingtype.is_empty() {
            params.insert("lendingType", lendingtype.to_vec());
        }
        let url = self.endpoint(&["countries"]);
        self.fetcher.fetch(&url, &params, skip_cache)
    }

    /// Indicator metadata: by id, by source, by topic, or all indicators.
    /// At most one of the three selectors may be non-empty.
    pub fn get_indicators(
        &mut self,
        indicators: &[String],
        source: &[String],
        topic: &[String],
        skip_cache: bool,
    ) -> Result<FetchResult> {
        let selected = [indicators, source, topic]
            .iter()
            .filter(|s| !s.is_empty())
            .count();
        if selected > 1 {
            return Err(Error::InvalidQuery(
                "can't specify more than one of indicator, source, and topic".into(),
            ));
        }
        let url = if !indicators.is_empty() {
            self.endpoint(&["indicators", enc_list(indicators).as_str()])
        } else if !source.is_empty() {
            self.endpoint(&["sources", enc_list(source).as_str(), "indicators"])
        } else if !topic.is_empty() {
            self.endpoint(&["topics", enc_list(topic).as_str(), "indicators"])
        } else {
            self.endpoint(&["indicators"])
        };
        self.fetcher.fetch(&url, &Params::new(), skip_cache)
    }
}
