//! Reverse URL building: endpoints and values back to concrete URLs.

mod common;
use common::*;

use oxide_urls::{Map, Params, Rule, Value};

#[test]
fn build_static_rules() {
    let map = sample_map();
    let urls = map.bind("example.org");

    assert_eq!(urls.build("index", Params::new(), None, false).unwrap(), "/");
    assert_eq!(urls.build("foo", Params::new(), None, false).unwrap(), "/foo");
    assert_eq!(urls.build("bar", Params::new(), None, false).unwrap(), "/bar/");
}

#[test]
fn build_converter_rules() {
    let map = sample_map();
    let urls = map.bind("example.org");

    assert_eq!(
        urls.build("any", one("name", "value"), None, false).unwrap(),
        "/any/value"
    );
    assert_eq!(
        urls.build("string", one("name", "data"), None, false).unwrap(),
        "/string/data"
    );
    assert_eq!(
        urls.build("integer", one("name", 1), None, false).unwrap(),
        "/integer/1"
    );
    assert_eq!(
        urls.build("float", one("name", 3.14), None, false).unwrap(),
        "/float/3.14"
    );
}

#[test]
fn build_float_without_fraction_keeps_decimal_point() {
    let map = sample_map();
    let urls = map.bind("example.org");
    assert_eq!(
        urls.build("float", one("name", Value::Float(3.0)), None, false)
            .unwrap(),
        "/float/3.0"
    );
}

#[test]
fn build_external_urls() {
    let map = sample_map();
    let urls = map.bind("example.org");

    assert_eq!(
        urls.build("index", Params::new(), None, true).unwrap(),
        "http://example.org/"
    );
    assert_eq!(
        urls.build("foo", Params::new(), None, true).unwrap(),
        "http://example.org/foo"
    );
}

#[test]
fn build_external_with_scheme_and_subdomain() {
    let mut map = Map::new();
    map.add(Rule::new("/", "home").subdomain("www")).unwrap();
    let urls = map.bind("example.org").url_scheme("https");

    assert_eq!(
        urls.build("home", Params::new(), None, false).unwrap(),
        "https://www.example.org/"
    );
}

#[test]
fn build_unknown_endpoint_fails() {
    let map = sample_map();
    let urls = map.bind("example.org");
    let err = urls.build("missing", Params::new(), None, false).unwrap_err();
    assert_eq!(err.endpoint, "missing");
}

#[test]
fn build_with_missing_values_fails() {
    let map = sample_map();
    let urls = map.bind("example.org");
    let err = urls.build("any", Params::new(), None, false).unwrap_err();
    assert_eq!(err.endpoint, "any");
    assert!(err.values.is_empty());
}

#[test]
fn build_with_rejected_values_fails() {
    let mut map = Map::new();
    map.add(Rule::new("/item/<int(min=1, max=10):id>", "item")).unwrap();
    let urls = map.bind("example.org");
    assert!(urls.build("item", one("id", 99), None, false).is_err());
}

#[test]
fn build_respects_method_restrictions() {
    let mut map = Map::new();
    map.add(Rule::new("/submit", "submit").methods(&["POST"])).unwrap();
    let urls = map.bind("example.org");

    assert!(urls.build("submit", Params::new(), None, false).is_err());
    assert_eq!(
        urls.build("submit", Params::new(), Some("POST"), false).unwrap(),
        "/submit"
    );
}

#[test]
fn build_appends_extra_values_as_query_string() {
    let map = sample_map();
    let urls = map.bind("example.org");

    let mut values = Params::new();
    values.insert("name", "value");
    values.insert("page", 2);
    values.insert("q", "New York");
    assert_eq!(
        urls.build("any", values, None, false).unwrap(),
        "/any/value?page=2&q=New+York"
    );
}

#[test]
fn build_drops_absent_optional_values() {
    let map = sample_map();
    let urls = map.bind("example.org");

    let mut values = Params::new();
    values.insert("name", "value");
    values.insert_opt("page", None::<i64>);
    assert_eq!(urls.build("any", values, None, false).unwrap(), "/any/value");
}

#[test]
fn build_percent_encodes_segments() {
    let map = sample_map();
    let urls = map.bind("example.org");
    assert_eq!(
        urls.build("any", one("name", "hello world"), None, false).unwrap(),
        "/any/hello%20world"
    );
}

#[test]
fn build_only_rules_participate_in_building() {
    let mut map = Map::new();
    map.add(Rule::new("/legacy", "legacy").build_only()).unwrap();
    let urls = map.bind("example.org");

    assert_eq!(
        urls.build("legacy", Params::new(), None, false).unwrap(),
        "/legacy"
    );
    assert!(urls.match_path("/legacy", None).is_err());
}

#[test]
fn build_under_script_prefix() {
    let map = sample_map();
    let urls = map.bind("example.org").script_name("/app/");
    assert_eq!(
        urls.build("foo", Params::new(), None, false).unwrap(),
        "/app/foo"
    );
    assert_eq!(urls.build("index", Params::new(), None, false).unwrap(), "/app/");
}
