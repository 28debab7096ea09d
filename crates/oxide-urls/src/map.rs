//! The URL map and its per-request adapter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, trace};

use crate::converters::{Converter, ConverterArgs, ConverterSet};
use crate::error::{BuildError, MapError, MatchError};
use crate::params::Params;
use crate::rule::{Rule, RuleFactory, RuleMatch};

/// Rule storage shared between the match scan and the endpoint index.
#[derive(Debug, Default)]
struct RuleIndex {
    /// All rules, kept in match priority order once sorted.
    rules: Vec<Arc<Rule>>,
    /// Rules per endpoint, kept in build priority order once sorted.
    by_endpoint: HashMap<String, Vec<Arc<Rule>>>,
}

/// An ordered collection of URL rules with shared settings.
///
/// Rules are added during a setup phase and compiled against the map's
/// settings as they arrive. Matching and building happen through a
/// [`MapAdapter`] obtained from [`Map::bind`].
///
/// ```
/// use oxide_urls::{Map, Rule};
///
/// let mut map = Map::new().strict_slashes(true);
/// map.add(Rule::new("/", "index"))?;
/// map.add(Rule::new("/users/<int:id>", "user_detail"))?;
///
/// let urls = map.bind("example.org");
/// let (endpoint, values) = urls.match_path("/users/42", None)?;
/// assert_eq!(endpoint, "user_detail");
/// assert_eq!(values.get_int("id"), Some(42));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Map {
    index: RwLock<RuleIndex>,
    /// Set on every `add`; cleared by the next ordering pass.
    remap: AtomicBool,
    pub(crate) default_subdomain: String,
    pub(crate) charset: String,
    pub(crate) strict_slashes: bool,
    pub(crate) converters: ConverterSet,
}

impl Default for Map {
    fn default() -> Self {
        Self {
            index: RwLock::new(RuleIndex::default()),
            remap: AtomicBool::new(false),
            default_subdomain: String::new(),
            charset: "utf-8".to_string(),
            strict_slashes: true,
            converters: ConverterSet::default(),
        }
    }
}

impl Map {
    /// Creates an empty map with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subdomain used by rules without their own.
    #[must_use]
    pub fn default_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.default_subdomain = subdomain.into();
        self
    }

    /// Sets the character encoding name carried by this map.
    ///
    /// Encoding always operates on UTF-8 bytes; the name is carried for
    /// configuration parity and diagnostics.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Enables or disables trailing-slash enforcement map-wide.
    #[must_use]
    pub const fn strict_slashes(mut self, strict: bool) -> Self {
        self.strict_slashes = strict;
        self
    }

    /// Registers (or overrides) a converter for use in templates.
    #[must_use]
    pub fn converter(
        mut self,
        name: impl Into<String>,
        factory: impl Fn(&ConverterArgs) -> Result<Box<dyn Converter>, MapError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.converters.register(name, factory);
        self
    }

    /// Adds the rules from a factory, binding and compiling each
    /// against this map. A plain [`Rule`] is its own factory.
    ///
    /// # Errors
    ///
    /// Returns [`MapError`] when a template is malformed, a variable
    /// name repeats, a converter is unknown, or its arguments are
    /// invalid. Errors surface here, never at match or build time.
    /// Rules registered before the failing one stay registered.
    pub fn add(&mut self, factory: impl RuleFactory) -> Result<(), MapError> {
        for rule in factory.into_rules() {
            self.add_rule(rule)?;
        }
        Ok(())
    }

    fn add_rule(&mut self, mut rule: Rule) -> Result<(), MapError> {
        rule.bind(self)?;
        debug!(template = rule.template(), endpoint = rule.endpoint(), "added url rule");
        let rule = Arc::new(rule);
        let index = self.index.get_mut().unwrap_or_else(PoisonError::into_inner);
        index.rules.push(Arc::clone(&rule));
        index
            .by_endpoint
            .entry(rule.endpoint().to_string())
            .or_default()
            .push(rule);
        self.remap.store(true, Ordering::Release);
        Ok(())
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_index().rules.len()
    }

    /// Returns `true` when no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_index().rules.is_empty()
    }

    /// Returns the rules in match priority order.
    #[must_use]
    pub fn rules(&self) -> Vec<Arc<Rule>> {
        self.ensure_sorted();
        self.read_index().rules.clone()
    }

    /// Returns the rules registered under an endpoint, in build
    /// priority order.
    #[must_use]
    pub fn rules_for(&self, endpoint: &str) -> Vec<Arc<Rule>> {
        self.ensure_sorted();
        self.read_index()
            .by_endpoint
            .get(endpoint)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether any rule under the endpoint expects all given arguments.
    ///
    /// Useful for wrapping a URL builder that injects a value (say, a
    /// language code) only for the endpoints that want it.
    #[must_use]
    pub fn is_endpoint_expecting(&self, endpoint: &str, arguments: &[&str]) -> bool {
        self.ensure_sorted();
        self.read_index()
            .by_endpoint
            .get(endpoint)
            .is_some_and(|rules| {
                rules
                    .iter()
                    .any(|rule| arguments.iter().all(|name| rule.has_argument(name)))
            })
    }

    /// Binds the map to a server name, yielding an adapter.
    ///
    /// The adapter starts with the map's default subdomain, a `/`
    /// script prefix, the `http` scheme, and `GET` as default method;
    /// each can be adjusted fluently.
    #[must_use]
    pub fn bind(&self, server_name: impl Into<String>) -> MapAdapter<'_> {
        MapAdapter {
            map: self,
            server_name: server_name.into(),
            script_name: "/".to_string(),
            subdomain: self.default_subdomain.clone(),
            url_scheme: "http".to_string(),
            default_method: "GET".to_string(),
        }
    }

    /// Re-sorts the rule order if rules were added since the last pass.
    ///
    /// Runs before every match and build; the dirty flag makes it a
    /// cheap no-op on the hot path. Concurrent `add` racing this is out
    /// of contract; `add` takes `&mut self`.
    fn ensure_sorted(&self) {
        if !self.remap.load(Ordering::Acquire) {
            return;
        }
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);
        if !self.remap.swap(false, Ordering::AcqRel) {
            return;
        }
        index.rules.sort_by_key(|rule| rule.match_order_key());
        for rules in index.by_endpoint.values_mut() {
            rules.sort_by_key(|rule| rule.build_order_key());
        }
        trace!(rules = index.rules.len(), "re-sorted rule priority order");
    }

    fn read_index(&self) -> RwLockReadGuard<'_, RuleIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of dispatching a request through a view function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<T> {
    /// The view ran; carries its result.
    Handled(T),
    /// The path needs a trailing-slash redirect; the view did not run.
    Redirect(String),
}

/// A map bound to one request context.
///
/// Cheap to create and discard; borrows the map's compiled rules.
#[derive(Debug, Clone)]
pub struct MapAdapter<'a> {
    map: &'a Map,
    server_name: String,
    script_name: String,
    subdomain: String,
    url_scheme: String,
    default_method: String,
}

impl MapAdapter<'_> {
    /// Sets the script prefix, normalized to end with `/`.
    #[must_use]
    pub fn script_name(mut self, script_name: impl Into<String>) -> Self {
        let mut script_name = script_name.into();
        if !script_name.ends_with('/') {
            script_name.push('/');
        }
        self.script_name = script_name;
        self
    }

    /// Sets the subdomain this adapter matches and builds for.
    #[must_use]
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = subdomain.into();
        self
    }

    /// Sets the URL scheme used for external URLs.
    #[must_use]
    pub fn url_scheme(mut self, url_scheme: impl Into<String>) -> Self {
        self.url_scheme = url_scheme.into();
        self
    }

    /// Sets the method assumed when a request supplies none.
    #[must_use]
    pub fn default_method(mut self, method: impl Into<String>) -> Self {
        self.default_method = method.into().to_uppercase();
        self
    }

    /// Matches a request path, returning the endpoint and its bindings.
    ///
    /// Rules are scanned in match priority order; the first match wins.
    ///
    /// # Errors
    ///
    /// [`MatchError::NotFound`] when nothing matches;
    /// [`MatchError::RequestRedirect`] when a folder-like rule matched
    /// without its trailing slash — the carried URL is the absolute
    /// redirect target.
    pub fn match_path(
        &self,
        path_info: &str,
        method: Option<&str>,
    ) -> Result<(String, Params), MatchError> {
        self.map.ensure_sorted();
        let method = method.unwrap_or(&self.default_method).to_uppercase();
        let key = format!(
            "{}|/{}({})",
            self.subdomain,
            path_info.trim_start_matches('/'),
            method
        );
        trace!(key = %key, "matching request path");
        let index = self.map.read_index();
        for rule in &index.rules {
            match rule.match_key(&key) {
                RuleMatch::Matched(values) => {
                    return Ok((rule.endpoint().to_string(), values));
                }
                RuleMatch::RedirectRequired => {
                    let target = self.redirect_target(path_info);
                    debug!(target = %target, "redirecting to canonical slash form");
                    return Err(MatchError::RequestRedirect(target));
                }
                RuleMatch::NotMatched => {}
            }
        }
        Err(MatchError::NotFound)
    }

    /// Matches a byte path, skipping undecodable bytes.
    ///
    /// # Errors
    ///
    /// Same as [`match_path`](Self::match_path).
    pub fn match_bytes(
        &self,
        path_info: &[u8],
        method: Option<&str>,
    ) -> Result<(String, Params), MatchError> {
        trace!(charset = %self.map.charset, "decoding byte path");
        let path: String = path_info.utf8_chunks().map(|chunk| chunk.valid()).collect();
        self.match_path(&path, method)
    }

    /// Matches a path and invokes the view on success.
    ///
    /// A required redirect is returned as [`Dispatch::Redirect`]
    /// without invoking the view.
    ///
    /// # Errors
    ///
    /// [`MatchError::NotFound`] propagates; a redirect does not.
    pub fn dispatch<T>(
        &self,
        view: impl FnOnce(&str, Params) -> T,
        path_info: &str,
        method: Option<&str>,
    ) -> Result<Dispatch<T>, MatchError> {
        match self.match_path(path_info, method) {
            Ok((endpoint, values)) => Ok(Dispatch::Handled(view(&endpoint, values))),
            Err(MatchError::RequestRedirect(target)) => Ok(Dispatch::Redirect(target)),
            Err(err) => Err(err),
        }
    }

    /// Builds a URL for an endpoint from the given values.
    ///
    /// The endpoint's rules are tried in build priority order; the
    /// first rule that accepts the values and method and renders
    /// successfully wins. Values not consumed by the rule's template
    /// become the query string. The result is relative to the script
    /// prefix unless the rule's subdomain differs from this adapter's
    /// or `force_external` is set.
    ///
    /// # Errors
    ///
    /// [`BuildError`] when no rule under the endpoint can build.
    pub fn build(
        &self,
        endpoint: &str,
        values: Params,
        method: Option<&str>,
        force_external: bool,
    ) -> Result<String, BuildError> {
        self.map.ensure_sorted();
        let method = method.unwrap_or(&self.default_method).to_uppercase();
        let index = self.map.read_index();
        for rule in index.by_endpoint.get(endpoint).into_iter().flatten() {
            if !rule.suitable_for(&values, &method) {
                continue;
            }
            if let Some((subdomain, path)) = rule.build(&values) {
                if !force_external && subdomain == self.subdomain {
                    return Ok(format!(
                        "{}{}",
                        self.script_name,
                        path.trim_start_matches('/')
                    ));
                }
                return Ok(self.external_url(&subdomain, &path));
            }
        }
        debug!(endpoint, "no rule could build the requested url");
        Err(BuildError {
            endpoint: endpoint.to_string(),
            values,
        })
    }

    /// Renders the absolute redirect target for a slashless request.
    fn redirect_target(&self, path_info: &str) -> String {
        let path = format!("{}/", path_info.trim_start_matches('/'));
        self.external_url(&self.subdomain, &path)
    }

    /// Renders a fully-qualified URL for the given subdomain and path.
    fn external_url(&self, subdomain: &str, path: &str) -> String {
        let script = self.script_name.trim_end_matches('/');
        if subdomain.is_empty() {
            format!(
                "{}://{}{}/{}",
                self.url_scheme,
                self.server_name,
                script,
                path.trim_start_matches('/')
            )
        } else {
            format!(
                "{}://{}.{}{}/{}",
                self.url_scheme,
                subdomain,
                self.server_name,
                script,
                path.trim_start_matches('/')
            )
        }
    }
}
