//! # oxide-urls
//!
//! Declarative URL rules with typed converters, matching and reverse
//! building.
//!
//! This crate provides:
//! - URL templates with typed variables (`/users/<int:id>`)
//! - A rule map with subdomain, method, and trailing-slash policies
//! - Priority ordering so static rules beat parametrized ones
//! - Reverse building: endpoint + values back to a concrete URL
//! - An extensible converter table per map
//!
//! ## Quick Start
//!
//! ```
//! use oxide_urls::{Map, Params, Rule};
//!
//! let mut map = Map::new();
//! map.add(Rule::new("/", "index"))?;
//! map.add(Rule::new("/any/<name>", "any"))?;
//! map.add(Rule::new("/integer/<int:id>", "integer"))?;
//!
//! let urls = map.bind("example.org");
//!
//! // Match a request path to an endpoint and typed bindings.
//! let (endpoint, values) = urls.match_path("/any/value", None)?;
//! assert_eq!(endpoint, "any");
//! assert_eq!(values.get_str("name"), Some("value"));
//!
//! // Build a URL back from an endpoint and values.
//! let mut values = Params::new();
//! values.insert("id", 1);
//! assert_eq!(urls.build("integer", values, None, false)?, "/integer/1");
//!
//! // Force an external URL.
//! assert_eq!(
//!     urls.build("index", Params::new(), None, true)?,
//!     "http://example.org/"
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Templates
//!
//! A template starts with `/` and mixes literal text with variable
//! tokens. A variable names an optional converter and optional
//! constructor arguments:
//!
//! ```text
//! /archive/<int(4):year>/<month>
//! /files/<path:name>
//! /tag/<string(maxlength=20):slug>
//! ```
//!
//! Built-in converters: `default`/`string` (length constraints),
//! `path` (consumes separators), `int` (`fixed_digits`, `min`, `max`),
//! `float` (`min`, `max`). Additional converters register through
//! [`Map::converter`].
//!
//! ## Trailing slashes
//!
//! A template ending in `/` behaves like a folder: with strict slashes
//! (the default), requesting it without the trailing slash yields a
//! [`MatchError::RequestRedirect`] carrying the canonical URL. A
//! template without a trailing slash is a leaf and does not accept a
//! slashed form.
//!
//! ## Dispatch
//!
//! [`MapAdapter::dispatch`] wraps matching for transports: it invokes a
//! view function on success and hands back the redirect target without
//! invoking it otherwise:
//!
//! ```
//! use oxide_urls::{Dispatch, Map, Rule};
//!
//! let mut map = Map::new();
//! map.add(Rule::new("/bar/", "bar"))?;
//! let urls = map.bind("example.org");
//!
//! let outcome = urls.dispatch(|endpoint, _values| endpoint.to_string(), "/bar", None)?;
//! assert_eq!(outcome, Dispatch::Redirect("http://example.org/bar/".to_string()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod converters;
mod encoding;
mod error;
mod map;
mod params;
mod rule;
mod template;

pub use converters::{
    ArgValue, Converter, ConverterArgs, ConverterFactory, ConverterSet, FloatConverter,
    IntegerConverter, PathConverter, StringConverter,
};
pub use error::{BuildError, MapError, MatchError, Result, ValidationError};
pub use map::{Dispatch, Map, MapAdapter};
pub use params::{Params, Value};
pub use rule::{Rule, RuleFactory};
