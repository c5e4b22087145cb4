//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use wbdata::{Transport, TransportError};

/// One recorded `Transport::get` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Replays canned bodies in order and records every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    bodies: RefCell<VecDeque<String>>,
    pub calls: RefCell<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bodies: RefCell::new(bodies.into_iter().map(Into::into).collect()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &str, params: &[(String, String)]) -> Result<String, TransportError> {
        self.calls.borrow_mut().push(Call {
            url: url.to_string(),
            params: params.to_vec(),
        });
        Ok(self
            .bodies
            .borrow_mut()
            .pop_front()
            .expect("transport called more often than scripted"))
    }
}

/// An envelope body for one page.
pub fn page(page: u32, pages: u32, last_updated: Option<&str>, rows: serde_json::Value) -> String {
    let mut meta = serde_json::json!({
        "page": page.to_string(),
        "pages": pages.to_string(),
        "per_page": "1000",
        "total": 0,
    });
    if let Some(d) = last_updated {
        meta["lastupdated"] = d.into();
    }
    serde_json::json!([meta, rows]).to_string()
}
