#![allow(dead_code)]

use oxide_urls::{Map, Params, Rule, Value};

/// Builds the shared fixture map: one rule per converter plus the
/// slash-policy variants.
pub fn sample_map() -> Map {
    let mut map = Map::new();
    map.add(Rule::new("/", "index")).unwrap();
    map.add(Rule::new("/foo", "foo")).unwrap();
    map.add(Rule::new("/bar/", "bar")).unwrap();
    map.add(Rule::new("/any/<name>", "any")).unwrap();
    map.add(Rule::new("/string/<string:name>", "string")).unwrap();
    map.add(Rule::new("/integer/<int:name>", "integer")).unwrap();
    map.add(Rule::new("/float/<float:name>", "float")).unwrap();
    map
}

/// Single-binding params.
pub fn one(key: &str, value: impl Into<Value>) -> Params {
    let mut params = Params::new();
    params.insert(key, value);
    params
}

/// Asserts that matching a path and rebuilding it reproduces the path.
pub fn round_trip(map: &Map, path: &str) {
    let urls = map.bind("example.org");
    let (endpoint, values) = urls
        .match_path(path, None)
        .unwrap_or_else(|e| panic!("expected {path} to match: {e}"));
    let built = urls
        .build(&endpoint, values, None, false)
        .unwrap_or_else(|e| panic!("expected {path} to rebuild: {e}"));
    assert_eq!(built, path, "round trip failed for {path}");
}
