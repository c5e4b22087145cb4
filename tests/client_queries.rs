mod common;

use chrono::NaiveDate;
use common::{ScriptedTransport, page};
use serde_json::json;
use wbdata::{Client, DataQuery, Error, Frequency, MemoryCache};

fn client(bodies: Vec<String>) -> Client<MemoryCache, ScriptedTransport> {
    Client::with_parts(MemoryCache::new(), ScriptedTransport::new(bodies))
        .with_base_url("http://wb.test/v2/")
}

fn one_page() -> String {
    page(1, 1, None, json!([]))
}

fn ids(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

#[test]
fn data_query_url_and_params() {
    let mut c = client(vec![one_page()]);
    let q = DataQuery::new("SP.POP.TOTL")
        .countries(["DEU", "USA"])
        .date((
            NaiveDate::from_ymd_opt(2006, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2008, 10, 1).unwrap(),
        ))
        .freq(Frequency::Quarter)
        .source(2u32);
    c.get_data(&q).unwrap();

    let calls = c.fetcher().transport().calls();
    assert_eq!(
        calls[0].url,
        "http://wb.test/v2/countries/DEU;USA/indicators/SP.POP.TOTL"
    );
    assert_eq!(calls[0].param("date"), Some("2006Q1:2008Q4"));
    assert_eq!(calls[0].param("source"), Some("2"));
}

#[test]
fn semicolon_lists_stay_unescaped() {
    let mut c = client(vec![one_page()]);
    c.get_data(&DataQuery::new("SP.POP.TOTL;NY.GDP.MKTP.CD").countries(["DEU;FRA", "USA"]))
        .unwrap();
    let call = &c.fetcher().transport().calls()[0];
    assert_eq!(
        call.url,
        "http://wb.test/v2/countries/DEU;FRA;USA/indicators/SP.POP.TOTL;NY.GDP.MKTP.CD"
    );
}

#[test]
fn other_reserved_characters_are_escaped() {
    let mut c = client(vec![one_page()]);
    c.get_data(&DataQuery::new("A/B C")).unwrap();
    let call = &c.fetcher().transport().calls()[0];
    assert_eq!(call.url, "http://wb.test/v2/countries/all/indicators/A%2FB%20C");
}

#[test]
fn data_query_defaults_to_all_countries() {
    let mut c = client(vec![one_page()]);
    c.get_data(&DataQuery::new("NY.GDP.MKTP.CD")).unwrap();
    let call = &c.fetcher().transport().calls()[0];
    assert_eq!(call.url, "http://wb.test/v2/countries/all/indicators/NY.GDP.MKTP.CD");
    assert_eq!(call.param("date"), None);
    assert_eq!(call.param("source"), None);
}

#[test]
fn data_query_parses_row_dates() {
    let body = page(
        1,
        1,
        Some("2024-12-16"),
        json!([{"date": "2020M02", "value": 1.5}, {"date": "2020M01", "value": null}]),
    );
    let mut c = client(vec![body]);
    let got = c
        .get_data(&DataQuery::new("X").parse_dates(true))
        .unwrap();
    assert_eq!(got.rows[0]["date"], "2020-02-01");
    assert_eq!(got.rows[1]["date"], "2020-01-01");
    assert_eq!(got.last_updated, NaiveDate::from_ymd_opt(2024, 12, 16));
}

#[test]
fn bad_date_fails_before_any_request() {
    let mut c = client(vec![]);
    let err = c
        .get_data(&DataQuery::new("X").date("Gobbledygook"))
        .unwrap_err();
    assert!(matches!(err, Error::Date(_)));
    assert_eq!(c.fetcher().transport().call_count(), 0);
}

#[test]
fn id_only_queries() {
    let mut c = client(vec![one_page(), one_page(), one_page(), one_page()]);
    c.get_sources(&[], false).unwrap();
    c.get_topics(&ids(&["1", "2"]), false).unwrap();
    c.get_incomelevels(&ids(&["HIC"]), false).unwrap();
    c.get_lendingtypes(&[], false).unwrap();
    let urls: Vec<String> = c
        .fetcher()
        .transport()
        .calls()
        .into_iter()
        .map(|c| c.url)
        .collect();
    assert_eq!(
        urls,
        vec![
            "http://wb.test/v2/sources",
            "http://wb.test/v2/topics/1;2",
            "http://wb.test/v2/incomeLevels/HIC",
            "http://wb.test/v2/lendingTypes",
        ]
    );
}

#[test]
fn countries_with_filters() {
    let mut c = client(vec![one_page()]);
    c.get_countries(&[], &ids(&["HIC", "UMC"]), &ids(&["IBD"]), false)
        .unwrap();
    let call = &c.fetcher().transport().calls()[0];
    assert_eq!(call.url, "http://wb.test/v2/countries");
    assert_eq!(call.param("incomeLevel"), Some("HIC;UMC"));
    assert_eq!(call.param("lendingType"), Some("IBD"));
}

#[test]
fn countries_ids_and_filters_conflict() {
    let mut c = client(vec![]);
    let err = c
        .get_countries(&ids(&["DEU"]), &ids(&["HIC"]), &[], false)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn indicator_selectors() {
    let mut c = client(vec![one_page(), one_page(), one_page()]);
    c.get_indicators(&[], &ids(&["2"]), &[], false).unwrap();
    c.get_indicators(&[], &[], &ids(&["8"]), false).unwrap();
    c.get_indicators(&[], &[], &[], false).unwrap();
    let urls: Vec<String> = c
        .fetcher()
        .transport()
        .calls()
        .into_iter()
        .map(|c| c.url)
        .collect();
    assert_eq!(
        urls,
        vec![
            "http://wb.test/v2/sources/2/indicators",
            "http://wb.test/v2/topics/8/indicators",
            "http://wb.test/v2/indicators",
        ]
    );

    let err = c
        .get_indicators(&ids(&["SP.POP.TOTL"]), &ids(&["2"]), &[], false)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}
