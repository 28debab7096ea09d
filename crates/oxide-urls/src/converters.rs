//! Typed codecs between path segment text and semantic values.
//!
//! Each converter defines the regex fragment its variable accepts, a
//! greediness flag (whether the fragment may consume `/`), and the two
//! conversion directions used by matching and building. Converters are
//! instantiated once per variable occurrence when a rule binds, from the
//! owning map's [`ConverterSet`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::encoding::quote;
use crate::error::{MapError, ValidationError};
use crate::params::{format_float, Value};

/// A typed codec for one URL variable.
///
/// `to_value` runs during matching on already-decoded segment text;
/// `to_segment` runs during building and returns percent-encoded text.
/// Both fail with [`ValidationError`], which the map treats as "this
/// rule does not apply" rather than surfacing it.
pub trait Converter: fmt::Debug + Send + Sync {
    /// The regex fragment accepted for this variable's segment.
    fn pattern(&self) -> &str;

    /// Whether the fragment may consume path separators.
    fn is_greedy(&self) -> bool {
        false
    }

    /// Converts decoded segment text into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the text violates the
    /// converter's type or range constraints.
    fn to_value(&self, segment: &str) -> Result<Value, ValidationError>;

    /// Renders a value as percent-encoded segment text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the value cannot be expressed
    /// by this converter (wrong type, out of range).
    fn to_segment(&self, value: &Value) -> Result<String, ValidationError>;
}

impl Converter for Box<dyn Converter> {
    fn pattern(&self) -> &str {
        (**self).pattern()
    }

    fn is_greedy(&self) -> bool {
        (**self).is_greedy()
    }

    fn to_value(&self, segment: &str) -> Result<Value, ValidationError> {
        (**self).to_value(segment)
    }

    fn to_segment(&self, value: &Value) -> Result<String, ValidationError> {
        (**self).to_segment(value)
    }
}

/// The default converter: one segment of non-separator characters.
///
/// Optional length constraints narrow the accepted repetition range.
#[derive(Debug, Clone)]
pub struct StringConverter {
    pattern: String,
}

impl StringConverter {
    /// Creates a string converter with the given length constraints.
    ///
    /// An exact `length` takes precedence over the `minlength`/
    /// `maxlength` range.
    #[must_use]
    pub fn new(minlength: usize, maxlength: Option<usize>, length: Option<usize>) -> Self {
        let pattern = length.map_or_else(
            || {
                maxlength.map_or_else(
                    || format!("[^/]{{{minlength},}}"),
                    |max| format!("[^/]{{{minlength},{max}}}"),
                )
            },
            |len| format!("[^/]{{{len}}}"),
        );
        Self { pattern }
    }
}

impl Default for StringConverter {
    fn default() -> Self {
        Self::new(1, None, None)
    }
}

impl Converter for StringConverter {
    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn to_value(&self, segment: &str) -> Result<Value, ValidationError> {
        Ok(Value::String(segment.to_string()))
    }

    fn to_segment(&self, value: &Value) -> Result<String, ValidationError> {
        Ok(quote(&value.to_string()))
    }
}

/// Matches a whole path remainder, separators included.
#[derive(Debug, Clone, Default)]
pub struct PathConverter;

impl Converter for PathConverter {
    fn pattern(&self) -> &str {
        "[^/].*"
    }

    fn is_greedy(&self) -> bool {
        true
    }

    fn to_value(&self, segment: &str) -> Result<Value, ValidationError> {
        Ok(Value::String(segment.to_string()))
    }

    fn to_segment(&self, value: &Value) -> Result<String, ValidationError> {
        Ok(quote(&value.to_string()))
    }
}

/// Accepts decimal integers, with optional width and range constraints.
#[derive(Debug, Clone, Default)]
pub struct IntegerConverter {
    fixed_digits: Option<usize>,
    min: Option<i64>,
    max: Option<i64>,
}

impl IntegerConverter {
    /// Creates an integer converter.
    ///
    /// `fixed_digits` requires exactly that many digits on match and
    /// zero-pads on build; `min`/`max` bound the parsed value.
    #[must_use]
    pub const fn new(fixed_digits: Option<usize>, min: Option<i64>, max: Option<i64>) -> Self {
        Self {
            fixed_digits,
            min,
            max,
        }
    }

    fn check_range(&self, value: i64) -> Result<i64, ValidationError> {
        if self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max) {
            return Err(ValidationError::new("integer out of range"));
        }
        Ok(value)
    }

    fn coerce(value: &Value) -> Result<i64, ValidationError> {
        match value {
            Value::Integer(n) => Ok(*n),
            Value::String(s) => s
                .parse()
                .map_err(|_| ValidationError::new("not an integer")),
            #[allow(clippy::cast_possible_truncation)]
            Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            Value::Float(_) => Err(ValidationError::new("not an integer")),
        }
    }
}

impl Converter for IntegerConverter {
    fn pattern(&self) -> &str {
        r"\d+"
    }

    fn to_value(&self, segment: &str) -> Result<Value, ValidationError> {
        if self.fixed_digits.is_some_and(|digits| segment.len() != digits) {
            return Err(ValidationError::new("wrong number of digits"));
        }
        let value: i64 = segment
            .parse()
            .map_err(|_| ValidationError::new("not an integer"))?;
        Ok(Value::Integer(self.check_range(value)?))
    }

    fn to_segment(&self, value: &Value) -> Result<String, ValidationError> {
        let value = self.check_range(Self::coerce(value)?)?;
        let text = self.fixed_digits.map_or_else(
            || value.to_string(),
            |digits| format!("{value:0digits$}"),
        );
        Ok(text)
    }
}

/// Accepts floats written with a decimal point and digits on both sides.
///
/// Plain integers such as `"3"` do not match; built output always
/// carries a fractional part so it re-matches this pattern.
#[derive(Debug, Clone, Default)]
pub struct FloatConverter {
    min: Option<f64>,
    max: Option<f64>,
}

impl FloatConverter {
    /// Creates a float converter with an optional value range.
    #[must_use]
    pub const fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    fn check_range(&self, value: f64) -> Result<f64, ValidationError> {
        if self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max) {
            return Err(ValidationError::new("float out of range"));
        }
        Ok(value)
    }

    #[allow(clippy::cast_precision_loss)]
    fn coerce(value: &Value) -> Result<f64, ValidationError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(n) => Ok(*n as f64),
            Value::String(s) => s.parse().map_err(|_| ValidationError::new("not a float")),
        }
    }
}

impl Converter for FloatConverter {
    fn pattern(&self) -> &str {
        r"\d+\.\d+"
    }

    fn to_value(&self, segment: &str) -> Result<Value, ValidationError> {
        let value: f64 = segment
            .parse()
            .map_err(|_| ValidationError::new("not a float"))?;
        Ok(Value::Float(self.check_range(value)?))
    }

    fn to_segment(&self, value: &Value) -> Result<String, ValidationError> {
        let value = self.check_range(Self::coerce(value)?)?;
        Ok(quote(&format_float(value)))
    }
}

/// One literal argument from a template's converter argument list.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// An integer literal.
    Int(i64),
    /// A float literal.
    Float(f64),
    /// A quoted string literal.
    Str(String),
}

impl ArgValue {
    /// Returns the value as an integer, if it is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a number; integers coerce.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(n) => Some(*n as f64),
            Self::Str(_) => None,
        }
    }

    /// Returns the value as text, if it is a string literal.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Parsed converter arguments: positional literals plus keyword forms.
///
/// The syntax is a literal comma-separated argument list — numbers,
/// quoted strings, and `name=value` pairs. It is parsed with a small
/// explicit scanner; nothing is ever evaluated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConverterArgs {
    positional: Vec<ArgValue>,
    keyword: Vec<(String, ArgValue)>,
}

impl ConverterArgs {
    /// Parses the text between the parentheses of a variable token.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidConverterArgs`] on anything but
    /// literals and `name=value` pairs.
    pub fn parse(converter: &str, text: &str) -> Result<Self, MapError> {
        ArgScanner::new(converter, text).parse()
    }

    /// Returns `true` when no arguments were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Rejects keyword names outside `names` and excess positionals.
    ///
    /// Factories call this first with their full parameter list.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidConverterArgs`] on a violation.
    pub fn expect_params(&self, converter: &str, names: &[&str]) -> Result<(), MapError> {
        if self.positional.len() > names.len() {
            return Err(MapError::invalid_args(
                converter,
                format!("takes at most {} arguments", names.len()),
            ));
        }
        for (name, _) in &self.keyword {
            if !names.contains(&name.as_str()) {
                return Err(MapError::invalid_args(
                    converter,
                    format!("unexpected keyword argument {name:?}"),
                ));
            }
        }
        Ok(())
    }

    /// Looks up the parameter at `position`, also reachable as `name=`.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidConverterArgs`] when the parameter
    /// was supplied both positionally and by keyword.
    pub fn lookup(&self, converter: &str, position: usize, name: &str) -> Result<Option<&ArgValue>, MapError> {
        let positional = self.positional.get(position);
        let keyword = self
            .keyword
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value);
        match (positional, keyword) {
            (Some(_), Some(_)) => Err(MapError::invalid_args(
                converter,
                format!("multiple values for parameter {name:?}"),
            )),
            (value, None) | (None, value) => Ok(value),
        }
    }

    /// Reads the parameter as a non-negative integer.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidConverterArgs`] on a type mismatch.
    pub fn get_usize(&self, converter: &str, position: usize, name: &str) -> Result<Option<usize>, MapError> {
        self.lookup(converter, position, name)?
            .map(|value| {
                value
                    .as_i64()
                    .and_then(|n| usize::try_from(n).ok())
                    .ok_or_else(|| {
                        MapError::invalid_args(
                            converter,
                            format!("parameter {name:?} must be a non-negative integer"),
                        )
                    })
            })
            .transpose()
    }

    /// Reads the parameter as an integer.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidConverterArgs`] on a type mismatch.
    pub fn get_i64(&self, converter: &str, position: usize, name: &str) -> Result<Option<i64>, MapError> {
        self.lookup(converter, position, name)?
            .map(|value| {
                value.as_i64().ok_or_else(|| {
                    MapError::invalid_args(converter, format!("parameter {name:?} must be an integer"))
                })
            })
            .transpose()
    }

    /// Reads the parameter as a number.
    ///
    /// # Errors
    ///
    /// Returns [`MapError::InvalidConverterArgs`] on a type mismatch.
    pub fn get_f64(&self, converter: &str, position: usize, name: &str) -> Result<Option<f64>, MapError> {
        self.lookup(converter, position, name)?
            .map(|value| {
                value.as_f64().ok_or_else(|| {
                    MapError::invalid_args(converter, format!("parameter {name:?} must be a number"))
                })
            })
            .transpose()
    }
}

/// Scanner for the literal argument-list syntax.
struct ArgScanner<'a> {
    converter: &'a str,
    input: &'a str,
    pos: usize,
}

impl<'a> ArgScanner<'a> {
    const fn new(converter: &'a str, input: &'a str) -> Self {
        Self {
            converter,
            input,
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> MapError {
        MapError::invalid_args(self.converter, reason)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn parse(mut self) -> Result<ConverterArgs, MapError> {
        let mut args = ConverterArgs::default();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                break;
            }
            self.scan_item(&mut args)?;
            self.skip_whitespace();
            match self.advance() {
                Some(',') => {}
                None => break,
                Some(c) => return Err(self.error(format!("unexpected character {c:?}"))),
            }
        }
        Ok(args)
    }

    fn scan_item(&mut self, args: &mut ConverterArgs) -> Result<(), MapError> {
        let c = self.peek().ok_or_else(|| self.error("expected an argument"))?;
        if c.is_ascii_alphabetic() || c == '_' {
            let name = self.scan_ident();
            self.skip_whitespace();
            if self.advance() != Some('=') {
                return Err(self.error(format!("expected `=` after parameter name {name:?}")));
            }
            self.skip_whitespace();
            let value = self.scan_literal()?;
            if args.keyword.iter().any(|(key, _)| *key == name) {
                return Err(self.error(format!("duplicate parameter {name:?}")));
            }
            args.keyword.push((name, value));
        } else {
            if !args.keyword.is_empty() {
                return Err(self.error("positional argument after keyword argument"));
            }
            let value = self.scan_literal()?;
            args.positional.push(value);
        }
        Ok(())
    }

    fn scan_ident(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }

    fn scan_literal(&mut self) -> Result<ArgValue, MapError> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.advance();
                let start = self.pos;
                while self.peek().is_some_and(|c| c != quote) {
                    self.advance();
                }
                let text = self.input[start..self.pos].to_string();
                if self.advance().is_none() {
                    return Err(self.error("unterminated string literal"));
                }
                Ok(ArgValue::Str(text))
            }
            Some(c) if c.is_ascii_digit() || c == '-' || c == '.' => self.scan_number(),
            Some(c) => Err(self.error(format!("expected a literal, found {c:?}"))),
            None => Err(self.error("expected a literal")),
        }
    }

    fn scan_number(&mut self) -> Result<ArgValue, MapError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.advance();
        }
        let mut saw_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else if c == '.' && !saw_dot {
                saw_dot = true;
                self.advance();
            } else {
                break;
            }
        }
        let text = &self.input[start..self.pos];
        if saw_dot {
            text.parse()
                .map(ArgValue::Float)
                .map_err(|_| self.error(format!("invalid number literal {text:?}")))
        } else {
            text.parse()
                .map(ArgValue::Int)
                .map_err(|_| self.error(format!("invalid number literal {text:?}")))
        }
    }
}

/// Factory producing a converter instance from parsed arguments.
pub type ConverterFactory =
    Arc<dyn Fn(&ConverterArgs) -> Result<Box<dyn Converter>, MapError> + Send + Sync>;

fn make_string(args: &ConverterArgs) -> Result<Box<dyn Converter>, MapError> {
    args.expect_params("string", &["minlength", "maxlength", "length"])?;
    let minlength = args.get_usize("string", 0, "minlength")?.unwrap_or(1);
    let maxlength = args.get_usize("string", 1, "maxlength")?;
    let length = args.get_usize("string", 2, "length")?;
    Ok(Box::new(StringConverter::new(minlength, maxlength, length)))
}

fn make_path(args: &ConverterArgs) -> Result<Box<dyn Converter>, MapError> {
    args.expect_params("path", &[])?;
    Ok(Box::new(PathConverter))
}

fn make_int(args: &ConverterArgs) -> Result<Box<dyn Converter>, MapError> {
    args.expect_params("int", &["fixed_digits", "min", "max"])?;
    let fixed_digits = args.get_usize("int", 0, "fixed_digits")?.filter(|&d| d > 0);
    let min = args.get_i64("int", 1, "min")?;
    let max = args.get_i64("int", 2, "max")?;
    Ok(Box::new(IntegerConverter::new(fixed_digits, min, max)))
}

fn make_float(args: &ConverterArgs) -> Result<Box<dyn Converter>, MapError> {
    args.expect_params("float", &["min", "max"])?;
    let min = args.get_f64("float", 0, "min")?;
    let max = args.get_f64("float", 1, "max")?;
    Ok(Box::new(FloatConverter::new(min, max)))
}

/// The converter table owned by a map: name to factory.
///
/// Seeded with the built-in converters; additional converters (or
/// overrides of the built-in names) are registered before rules are
/// added. There is no process-global table.
#[derive(Clone)]
pub struct ConverterSet {
    factories: HashMap<String, ConverterFactory>,
}

impl Default for ConverterSet {
    fn default() -> Self {
        let mut set = Self {
            factories: HashMap::new(),
        };
        set.register("default", make_string);
        set.register("string", make_string);
        set.register("path", make_path);
        set.register("int", make_int);
        set.register("float", make_float);
        set
    }
}

impl ConverterSet {
    /// Registers a converter factory, replacing any previous entry.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn(&ConverterArgs) -> Result<Box<dyn Converter>, MapError> + Send + Sync + 'static,
    ) {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Returns `true` if a converter is registered under the name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Instantiates the named converter with the given arguments.
    pub(crate) fn make(
        &self,
        name: &str,
        args: &ConverterArgs,
    ) -> Result<Box<dyn Converter>, MapError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| MapError::UnknownConverter {
                name: name.to_string(),
            })?;
        factory(args)
    }
}

impl fmt::Debug for ConverterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ConverterSet").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_args() -> ConverterArgs {
        ConverterArgs::default()
    }

    #[test]
    fn test_string_pattern_constraints() {
        assert_eq!(StringConverter::default().pattern(), "[^/]{1,}");
        assert_eq!(StringConverter::new(2, Some(5), None).pattern(), "[^/]{2,5}");
        assert_eq!(StringConverter::new(1, None, Some(4)).pattern(), "[^/]{4}");
    }

    #[test]
    fn test_integer_to_value() {
        let conv = IntegerConverter::default();
        assert_eq!(conv.to_value("42").unwrap(), Value::Integer(42));
        assert!(conv.to_value("3.14").is_err());
        assert!(conv.to_value("value").is_err());
        // Overflowing digits fail like any other validation error.
        assert!(conv.to_value("99999999999999999999999").is_err());
    }

    #[test]
    fn test_integer_range_and_digits() {
        let conv = IntegerConverter::new(Some(4), Some(1), Some(2000));
        assert_eq!(conv.to_value("0042").unwrap(), Value::Integer(42));
        assert!(conv.to_value("42").is_err());
        assert!(conv.to_value("9999").is_err());
        assert_eq!(conv.to_segment(&Value::Integer(42)).unwrap(), "0042");
        assert!(conv.to_segment(&Value::Integer(9999)).is_err());
    }

    #[test]
    fn test_integer_round_trip() {
        let conv = IntegerConverter::default();
        for n in [0_i64, 1, 42, 100_000] {
            let segment = conv.to_segment(&Value::Integer(n)).unwrap();
            assert_eq!(conv.to_value(&segment).unwrap(), Value::Integer(n));
        }
    }

    #[test]
    fn test_float_requires_fraction() {
        let conv = FloatConverter::default();
        assert_eq!(conv.to_value("3.14").unwrap(), Value::Float(3.14));
        assert!(conv.to_value("value").is_err());
        // "3" is rejected by the pattern; the segment never reaches
        // to_value through a rule, but parsing it still succeeds, so the
        // pattern is what enforces the decimal point.
        assert_eq!(conv.pattern(), r"\d+\.\d+");
    }

    #[test]
    fn test_float_round_trip_and_range() {
        let conv = FloatConverter::new(Some(0.5), Some(10.0));
        let segment = conv.to_segment(&Value::Float(3.0)).unwrap();
        assert_eq!(segment, "3.0");
        assert_eq!(conv.to_value(&segment).unwrap(), Value::Float(3.0));
        assert!(conv.to_value("0.1").is_err());
        assert!(conv.to_segment(&Value::Float(11.0)).is_err());
    }

    #[test]
    fn test_path_is_greedy() {
        assert!(PathConverter.is_greedy());
        assert!(!StringConverter::default().is_greedy());
    }

    #[test]
    fn test_segment_output_is_encoded() {
        let conv = StringConverter::default();
        assert_eq!(
            conv.to_segment(&Value::from("hello world")).unwrap(),
            "hello%20world"
        );
    }

    #[test]
    fn test_args_positional_and_keyword() {
        let args = ConverterArgs::parse("int", "4, min=1, max=10").unwrap();
        assert_eq!(args.get_usize("int", 0, "fixed_digits").unwrap(), Some(4));
        assert_eq!(args.get_i64("int", 1, "min").unwrap(), Some(1));
        assert_eq!(args.get_i64("int", 2, "max").unwrap(), Some(10));
    }

    #[test]
    fn test_args_string_literals() {
        let args = ConverterArgs::parse("custom", "'a,b', name=\"x\"").unwrap();
        assert_eq!(args.positional, vec![ArgValue::Str("a,b".to_string())]);
        assert_eq!(
            args.keyword,
            vec![("name".to_string(), ArgValue::Str("x".to_string()))]
        );
    }

    #[test]
    fn test_args_reject_expressions() {
        assert!(ConverterArgs::parse("int", "1 + 2").is_err());
        assert!(ConverterArgs::parse("int", "min=[1]").is_err());
        assert!(ConverterArgs::parse("int", "min=1, min=2").is_err());
        assert!(ConverterArgs::parse("int", "min=1, 2").is_err());
    }

    #[test]
    fn test_factories_validate_parameters() {
        let set = ConverterSet::default();
        let args = ConverterArgs::parse("int", "bogus=1").unwrap();
        assert!(matches!(
            set.make("int", &args),
            Err(MapError::InvalidConverterArgs { .. })
        ));
        assert!(matches!(
            set.make("missing", &no_args()),
            Err(MapError::UnknownConverter { .. })
        ));
    }

    #[test]
    fn test_set_override() {
        let mut set = ConverterSet::default();
        set.register("default", |args| {
            args.expect_params("default", &[])?;
            Ok(Box::new(PathConverter))
        });
        let conv = set.make("default", &no_args()).unwrap();
        assert!(conv.is_greedy());
    }
}
