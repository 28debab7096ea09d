//! Rule priority: disambiguation when several templates could match.

mod common;
use common::*;

use oxide_urls::{Map, Params, Rule};

#[test]
fn static_rules_beat_parametrized_rules() {
    let mut map = Map::new();
    map.add(Rule::new("/<name>", "dynamic")).unwrap();
    map.add(Rule::new("/foo", "static")).unwrap();
    let urls = map.bind("example.org");

    assert_eq!(urls.match_path("/foo", None).unwrap().0, "static");
    assert_eq!(urls.match_path("/other", None).unwrap().0, "dynamic");
}

#[test]
fn narrow_rules_beat_greedy_rules() {
    let mut map = Map::new();
    map.add(Rule::new("/files/<path:name>", "tree")).unwrap();
    map.add(Rule::new("/files/<name>", "flat")).unwrap();
    let urls = map.bind("example.org");

    assert_eq!(urls.match_path("/files/readme", None).unwrap().0, "flat");
    assert_eq!(urls.match_path("/files/docs/readme", None).unwrap().0, "tree");
}

#[test]
fn more_variables_rank_as_more_specific() {
    let mut map = Map::new();
    map.add(Rule::new("/<a>/edit", "one")).unwrap();
    map.add(Rule::new("/<a>/<b>", "two")).unwrap();
    let urls = map.bind("example.org");

    // Both rules could take "/x/edit"; the two-variable rule is tried
    // first and wins.
    assert_eq!(urls.match_path("/x/edit", None).unwrap().0, "two");
    assert_eq!(urls.match_path("/x/y", None).unwrap().0, "two");
}

#[test]
fn insertion_order_breaks_remaining_ties() {
    let mut map = Map::new();
    map.add(Rule::new("/a/<x>", "first")).unwrap();
    map.add(Rule::new("/<y>/b", "second")).unwrap();
    let urls = map.bind("example.org");

    // Same variable count and greediness; the earlier rule wins.
    assert_eq!(urls.match_path("/a/b", None).unwrap().0, "first");
}

#[test]
fn building_prefers_parametrized_rules_for_shared_endpoints() {
    let mut map = Map::new();
    map.add(Rule::new("/posts", "posts")).unwrap();
    map.add(Rule::new("/posts/<int:page>", "posts")).unwrap();
    let urls = map.bind("example.org");

    assert_eq!(
        urls.build("posts", one("page", 3), None, false).unwrap(),
        "/posts/3"
    );
    // Without the value, the parametrized rule is unsuitable and the
    // static one takes over.
    assert_eq!(
        urls.build("posts", Params::new(), None, false).unwrap(),
        "/posts"
    );
}

#[test]
fn building_prefers_greedier_rules_for_shared_endpoints() {
    let mut map = Map::new();
    map.add(Rule::new("/docs/<name>", "docs")).unwrap();
    map.add(Rule::new("/docs/<path:name>", "docs")).unwrap();
    let urls = map.bind("example.org");

    assert_eq!(
        urls.build("docs", one("name", "a/b"), None, false).unwrap(),
        "/docs/a/b"
    );
}

#[test]
fn rules_added_late_are_reprioritized() {
    let mut map = Map::new();
    map.add(Rule::new("/<name>", "dynamic")).unwrap();
    let urls = map.bind("example.org");
    assert_eq!(urls.match_path("/foo", None).unwrap().0, "dynamic");
    drop(urls);

    map.add(Rule::new("/foo", "static")).unwrap();
    let urls = map.bind("example.org");
    assert_eq!(urls.match_path("/foo", None).unwrap().0, "static");
}

#[test]
fn end_to_end_example() {
    let mut map = Map::new();
    map.add(Rule::new("/", "index")).unwrap();
    map.add(Rule::new("/any/<name>", "any")).unwrap();
    map.add(Rule::new("/integer/<int:name>", "integer")).unwrap();
    let urls = map.bind("example.org");

    let (endpoint, values) = urls.match_path("/", None).unwrap();
    assert_eq!((endpoint.as_str(), values.len()), ("index", 0));

    let (endpoint, values) = urls.match_path("/any/value", None).unwrap();
    assert_eq!(endpoint, "any");
    assert_eq!(values.get_str("name"), Some("value"));

    assert!(urls.match_path("/integer/3.14", None).is_err());

    assert_eq!(
        urls.build("integer", one("name", 1), None, false).unwrap(),
        "/integer/1"
    );
    assert_eq!(
        urls.build("index", Params::new(), None, true).unwrap(),
        "http://example.org/"
    );
}
