//! Blocking HTTP transport with retries for connection failures.
//!
//! Only connect and timeout errors are retried. Any response that arrives,
//! whatever its status, is handed back as text: the API reports most errors
//! inside an HTTP 200 body, and the envelope parser decides what they mean.

use crate::config::TransportConfig;
use crate::error::TransportError;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use std::time::Duration;

/// Performs one GET and returns the response body.
pub trait Transport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<String, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<String, TransportError> {
        (**self).get(url, params)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<String, TransportError> {
        (**self).get(url, params)
    }
}

/// [`Transport`] backed by `reqwest`'s blocking client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let http = HttpClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::limited(5))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(TransportError::Build)?;
        Ok(Self { http, config })
    }

    pub fn with_defaults() -> Result<Self, TransportError> {
        Self::new(TransportConfig::default())
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn get_once(&self, url: &str, params: &[(String, String)]) -> reqwest::Result<String> {
        let resp = self.http.get(url).query(params).send()?;
        if !resp.status().is_success() {
            log::debug!("GET {url} returned HTTP {}", resp.status());
        }
        resp.text()
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<String, TransportError> {
        let max_tries = self.config.max_tries.max(1);
        let mut attempt = 1;
        loop {
            match self.get_once(url, params) {
                Ok(body) => return Ok(body),
                Err(e) if is_transient(&e) && attempt < max_tries => {
                    let delay = backoff_delay(self.config.base_delay, attempt);
                    log::debug!("GET {url} failed ({e}), retrying in {delay:?}");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) if is_transient(&e) => {
                    return Err(TransportError::Transient {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => return Err(TransportError::Request(e)),
            }
        }
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}

/// `base * 2^(attempt - 1)`: the wait after the given failed attempt.
pub(crate) fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
}
