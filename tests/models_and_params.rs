use wbdata::{CacheKey, ParamValue, Params};

#[test]
fn param_values_serialize_for_the_wire() {
    assert_eq!(ParamValue::from("2").to_query_value(), "2");
    assert_eq!(ParamValue::from(2u32).to_query_value(), "2");
    let many: &[&str] = &["HIC", "UMC"];
    assert_eq!(ParamValue::from(many).to_query_value(), "HIC;UMC");
    assert_eq!(
        ParamValue::from(vec!["DEU".to_string(), "USA".to_string()]).to_string(),
        "DEU;USA"
    );
}

#[test]
fn params_pairs_are_sorted() {
    let p = Params::new()
        .with("per_page", 1000u32)
        .with("format", "json")
        .with("date", "2010:2020");
    assert_eq!(
        p.pairs(),
        vec![
            ("date".to_string(), "2010:2020".to_string()),
            ("format".to_string(), "json".to_string()),
            ("per_page".to_string(), "1000".to_string()),
        ]
    );
}

#[test]
fn cache_key_ignores_insertion_order() {
    let a: Params = [("b", "2"), ("a", "1")].into_iter().collect();
    let b: Params = [("a", "1"), ("b", "2")].into_iter().collect();
    assert_eq!(CacheKey::new("http://x", &a), CacheKey::new("http://x", &b));
    assert_ne!(CacheKey::new("http://x", &a), CacheKey::new("http://y", &a));
    assert_eq!(CacheKey::new("http://x", &a).to_string(), "http://x?a=1&b=2");
}

#[test]
fn cache_key_round_trips_through_json() {
    let key = CacheKey::new("http://x", &Params::new().with("page", 2u32));
    let text = serde_json::to_string(&key).unwrap();
    let back: CacheKey = serde_json::from_str(&text).unwrap();
    assert_eq!(back, key);
}

#[test]
fn param_value_json_is_untagged() {
    let p = Params::new()
        .with("source", "2")
        .with("country", vec!["DEU".to_string(), "USA".to_string()]);
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(v, serde_json::json!({"country": ["DEU", "USA"], "source": "2"}));
}
