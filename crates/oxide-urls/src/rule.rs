//! Compiled URL rules.
//!
//! A rule is constructed unbound from a template and an endpoint, then
//! compiled once when added to a [`Map`]: the template is parsed, each
//! variable resolves to a converter instance, and a single anchored
//! regex over the canonical match key is assembled together with the
//! build plan used for reverse URL construction.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use regex::Regex;

use crate::converters::Converter;
use crate::encoding::url_encode;
use crate::error::MapError;
use crate::map::Map;
use crate::params::{Params, Value};
use crate::template::{parse_template, Segment};

/// One step of the build plan replayed by [`Rule::build`].
#[derive(Debug, Clone, PartialEq)]
enum PlanStep {
    Literal(String),
    Variable(String),
}

/// Outcome of matching one rule against a canonical match key.
#[derive(Debug)]
pub(crate) enum RuleMatch {
    /// The rule matched; carries the converted variable bindings.
    Matched(Params),
    /// The rule does not apply to this key.
    NotMatched,
    /// The key matched a folder-like rule except for its trailing
    /// slash; the caller must redirect to the slashed form.
    RedirectRequired,
}

/// A source of rules for [`Map::add`].
///
/// A [`Rule`] yields itself; composite sources (prefixed collections,
/// mounted sub-maps) can yield several rules at once.
pub trait RuleFactory {
    /// The rules to register, in registration order.
    fn into_rules(self) -> Vec<Rule>;
}

impl RuleFactory for Rule {
    fn into_rules(self) -> Vec<Rule> {
        vec![self]
    }
}

impl RuleFactory for Vec<Rule> {
    fn into_rules(self) -> Vec<Rule> {
        self
    }
}

/// One URL pattern bound to an endpoint.
///
/// Built fluently and handed to [`Map::add`], which compiles it:
///
/// ```
/// use oxide_urls::{Map, Rule};
///
/// let mut map = Map::new();
/// map.add(Rule::new("/users/<int:id>", "user_detail").methods(&["GET"]))?;
/// # Ok::<(), oxide_urls::MapError>(())
/// ```
#[derive(Debug)]
pub struct Rule {
    template: String,
    endpoint: String,
    subdomain: Option<String>,
    methods: Option<BTreeSet<String>>,
    strict_slashes: Option<bool>,
    build_only: bool,
    is_leaf: bool,
    bound: bool,
    plan: Vec<PlanStep>,
    arguments: HashSet<String>,
    converters: HashMap<String, Box<dyn Converter>>,
    greediness: usize,
    greedy_tail: Option<String>,
    has_suffix: bool,
    regex: Option<Regex>,
}

impl Rule {
    /// Creates an unbound rule for the given template and endpoint.
    ///
    /// The endpoint is opaque and need not be unique; several rules may
    /// share one endpoint and compete during building. Template
    /// validation happens when the rule is added to a map.
    pub fn new(template: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let template = template.into();
        let is_leaf = !template.ends_with('/');
        Self {
            template,
            endpoint: endpoint.into(),
            subdomain: None,
            methods: None,
            strict_slashes: None,
            build_only: false,
            is_leaf,
            bound: false,
            plan: Vec::new(),
            arguments: HashSet::new(),
            converters: HashMap::new(),
            greediness: 0,
            greedy_tail: None,
            has_suffix: false,
            regex: None,
        }
    }

    /// Restricts the rule to a subdomain instead of the map default.
    #[must_use]
    pub fn subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Restricts the rule to the given HTTP methods (uppercased).
    #[must_use]
    pub fn methods(mut self, methods: &[&str]) -> Self {
        self.methods = Some(methods.iter().map(|m| m.to_uppercase()).collect());
        self
    }

    /// Overrides the map's strict-slash policy for this rule.
    #[must_use]
    pub const fn strict_slashes(mut self, strict: bool) -> Self {
        self.strict_slashes = Some(strict);
        self
    }

    /// Excludes the rule from matching; it only participates in builds.
    #[must_use]
    pub const fn build_only(mut self) -> Self {
        self.build_only = true;
        self
    }

    /// The raw template string.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The endpoint this rule resolves to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `true` when the template does not end with `/`.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    /// `true` when the rule is excluded from matching.
    #[must_use]
    pub const fn is_build_only(&self) -> bool {
        self.build_only
    }

    /// The number of greedy (separator-consuming) variables.
    #[must_use]
    pub const fn greediness(&self) -> usize {
        self.greediness
    }

    /// Iterates over the rule's variable names.
    pub fn arguments(&self) -> impl Iterator<Item = &str> {
        self.arguments.iter().map(String::as_str)
    }

    /// Returns `true` if the rule has a variable with the given name.
    #[must_use]
    pub fn has_argument(&self, name: &str) -> bool {
        self.arguments.contains(name)
    }

    /// Compiles the rule against the map's settings.
    ///
    /// Resolves the subdomain and strict-slash policy, parses the
    /// template, instantiates converters, and assembles the pattern
    /// over the match key `"{subdomain}|{path}({METHOD})"`.
    pub(crate) fn bind(&mut self, map: &Map) -> Result<(), MapError> {
        if self.bound {
            return Err(MapError::AlreadyBound {
                template: self.template.clone(),
            });
        }
        if !self.template.starts_with('/') {
            return Err(MapError::MissingLeadingSlash {
                template: self.template.clone(),
            });
        }
        let strict = *self.strict_slashes.get_or_insert(map.strict_slashes);
        let subdomain = self
            .subdomain
            .get_or_insert_with(|| map.default_subdomain.clone())
            .clone();

        let path = if self.is_leaf {
            self.template.as_str()
        } else {
            self.template.trim_end_matches('/')
        };
        let joined = format!("{subdomain}|{path}");
        let segments = parse_template(&joined).map_err(|err| match err {
            MapError::MalformedTemplate { .. } => MapError::MalformedTemplate {
                template: self.template.clone(),
            },
            other => other,
        })?;

        let mut pattern = String::from("^");
        let mut greedy_tail = None;
        for segment in segments {
            match segment {
                Segment::Literal(text) => {
                    pattern.push_str(&regex::escape(&text));
                    greedy_tail = None;
                    self.plan.push(PlanStep::Literal(text));
                }
                Segment::Variable {
                    name,
                    converter,
                    args,
                } => {
                    let converter = map.converters.make(&converter, &args)?;
                    pattern.push_str(&format!("(?P<{name}>{})", converter.pattern()));
                    if converter.is_greedy() {
                        self.greediness += 1;
                        greedy_tail = Some(name.clone());
                    } else {
                        greedy_tail = None;
                    }
                    self.arguments.insert(name.clone());
                    self.converters.insert(name.clone(), converter);
                    self.plan.push(PlanStep::Variable(name));
                }
            }
        }
        self.greedy_tail = greedy_tail;
        if !self.is_leaf {
            self.plan.push(PlanStep::Literal("/".to_string()));
        }

        if !self.build_only {
            self.has_suffix = !self.is_leaf || !strict;
            if self.has_suffix {
                pattern.push_str("(?P<__suffix__>/?)");
            }
            match &self.methods {
                Some(methods) => {
                    let alternation = methods
                        .iter()
                        .map(|method| regex::escape(method))
                        .collect::<Vec<_>>()
                        .join("|");
                    pattern.push_str(&format!(r"\((?:{alternation})\)$"));
                }
                None => pattern.push_str(r"\([^)]*\)$"),
            }
            self.regex = Some(Regex::new(&pattern).map_err(|source| {
                MapError::InvalidPattern {
                    template: self.template.clone(),
                    source,
                }
            })?);
        }
        self.bound = true;
        Ok(())
    }

    /// Matches the rule against a canonical match key.
    ///
    /// The trailing-slash check runs before value conversion: a
    /// folder-like rule under strict slashes signals a redirect even
    /// when a converter would later reject a captured value.
    pub(crate) fn match_key(&self, key: &str) -> RuleMatch {
        let Some(regex) = &self.regex else {
            return RuleMatch::NotMatched;
        };
        let Some(caps) = regex.captures(key) else {
            return RuleMatch::NotMatched;
        };

        let mut suffix = self
            .has_suffix
            .then(|| caps.name("__suffix__"))
            .flatten()
            .is_some_and(|m| !m.as_str().is_empty());

        // The pattern has no look-behind, so a greedy final capture
        // swallows the slash the suffix group should take. Re-attribute
        // exactly one trailing slash; more than one cannot be valid.
        let mut trim_tail = false;
        if self.has_suffix && !suffix {
            if let Some(name) = &self.greedy_tail {
                if let Some(capture) = caps.name(name) {
                    if let Some(trimmed) = capture.as_str().strip_suffix('/') {
                        if trimmed.ends_with('/') {
                            return RuleMatch::NotMatched;
                        }
                        suffix = true;
                        trim_tail = true;
                    }
                }
            }
        }

        let strict = self.strict_slashes.unwrap_or(true);
        if strict && !self.is_leaf && !suffix {
            return RuleMatch::RedirectRequired;
        }

        let mut values = Params::new();
        for name in &self.arguments {
            let Some(capture) = caps.name(name) else {
                return RuleMatch::NotMatched;
            };
            let mut text = capture.as_str();
            if trim_tail && Some(name) == self.greedy_tail.as_ref() {
                text = &text[..text.len() - 1];
            }
            let Some(converter) = self.converters.get(name) else {
                return RuleMatch::NotMatched;
            };
            match converter.to_value(text) {
                Ok(value) => values.insert(name.clone(), value),
                Err(_) => return RuleMatch::NotMatched,
            }
        }
        RuleMatch::Matched(values)
    }

    /// Assembles the subdomain and relative URL for the given values.
    ///
    /// Returns `None` when a required value is missing or a converter
    /// rejects one; the map then tries the next rule for the endpoint.
    /// Values not consumed by the template become the query string.
    pub(crate) fn build(&self, values: &Params) -> Option<(String, String)> {
        let mut rendered = String::new();
        for step in &self.plan {
            match step {
                PlanStep::Literal(text) => rendered.push_str(text),
                PlanStep::Variable(name) => {
                    let value = values.get(name)?;
                    let segment = self.converters.get(name)?.to_segment(value).ok()?;
                    rendered.push_str(&segment);
                }
            }
        }
        let (subdomain, path) = rendered.split_once('|')?;

        let mut url = path.to_string();
        let extra: BTreeMap<&str, &Value> = values
            .iter()
            .filter(|(name, _)| !self.arguments.contains(*name))
            .collect();
        if !extra.is_empty() {
            url.push('?');
            url.push_str(&url_encode(&extra));
        }
        Some((subdomain.to_string(), url))
    }

    /// Whether the rule can build a URL for the values and method.
    pub(crate) fn suitable_for(&self, values: &Params, method: &str) -> bool {
        if self
            .methods
            .as_ref()
            .is_some_and(|methods| !methods.contains(method))
        {
            return false;
        }
        self.arguments.iter().all(|name| values.contains(name))
    }

    /// Sort key for matching: static rules first, then narrower
    /// (less greedy) rules, then rules binding more variables.
    pub(crate) fn match_order_key(&self) -> (bool, usize, Reverse<usize>) {
        (
            !self.arguments.is_empty(),
            self.greediness,
            Reverse(self.arguments.len()),
        )
    }

    /// Sort key for building: parametrized rules first, then greedier
    /// rules, then rules binding more variables.
    pub(crate) fn build_order_key(&self) -> (bool, Reverse<usize>, Reverse<usize>) {
        (
            self.arguments.is_empty(),
            Reverse(self.greediness),
            Reverse(self.arguments.len()),
        )
    }
}

impl PartialEq for Rule {
    /// Two rules are equal when their compiled build plans are; unbound
    /// rules compare by raw template.
    fn eq(&self, other: &Self) -> bool {
        if self.plan.is_empty() && other.plan.is_empty() {
            return self.template == other.template;
        }
        self.plan == other.plan
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rendered = String::new();
        if self.plan.is_empty() {
            rendered.push_str(&self.template);
        } else {
            for step in &self.plan {
                match step {
                    PlanStep::Literal(text) => rendered.push_str(text),
                    PlanStep::Variable(name) => {
                        rendered.push('<');
                        rendered.push_str(name);
                        rendered.push('>');
                    }
                }
            }
        }
        let rendered = rendered.strip_prefix('|').unwrap_or(&rendered);
        write!(f, "{rendered}")?;
        if let Some(methods) = &self.methods {
            let methods: Vec<&str> = methods.iter().map(String::as_str).collect();
            write!(f, " ({})", methods.join(", "))?;
        }
        write!(f, " -> {}", self.endpoint)
    }
}
