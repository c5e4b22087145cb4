//! wbdata
//!
//! A Rust library for retrieving data from the World Bank API (v2), with an
//! on-disk response cache and helpers for the API's period encodings. Pairs
//! with the `wbdata` CLI.
//!
//! ### Features
//! - Fetch every page of a query, caching raw responses across runs
//! - Surface API error payloads (sent with HTTP 200) as typed errors
//! - Convert `2003`, `2003M05`, `2003Q2` to and from calendar dates
//! - Save results as JSON
//!
//! ### Example
//! ```no_run
//! use wbdata::{Client, DataQuery, Frequency};
//!
//! let mut client = Client::from_env()?;
//! let data = client.get_data(
//!     &DataQuery::new("NY.GDP.MKTP.CD")
//!         .countries(["DEU", "USA"])
//!         .date(("2019Q1", "2021Q4"))
//!         .freq(Frequency::Quarter)
//!         .parse_dates(true),
//! )?;
//! wbdata::storage::save_json(&data, "gdp.json")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod dates;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod parse;
pub mod storage;
pub mod transport;

pub use api::{Client, DataQuery};
pub use cache::{FileCache, MemoryCache, ResponseCache};
pub use config::{CacheConfig, TransportConfig};
pub use dates::{DateInput, Dates, Frequency, format_dates, parse_row_dates};
pub use error::{DateError, Error, Result, TransportError};
pub use fetcher::Fetcher;
pub use models::{CacheKey, FetchResult, Page, ParamValue, Params, Row};
pub use transport::{HttpTransport, Transport};
