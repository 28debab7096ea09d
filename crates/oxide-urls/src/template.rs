//! Template parsing.
//!
//! A template is a run of literal text interleaved with variable tokens
//! of the form `<converter(args):name>`, where the converter and its
//! argument list are optional. The parser emits the ordered segment
//! list that rules compile into a pattern and replay as a build plan.

use std::collections::HashSet;

use crate::converters::ConverterArgs;
use crate::error::MapError;

/// One parsed piece of a template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    /// Literal text emitted verbatim.
    Literal(String),
    /// A variable captured through a converter.
    Variable {
        /// The variable name (unique within one template).
        name: String,
        /// The converter name, `"default"` when none was written.
        converter: String,
        /// Parsed converter arguments.
        args: ConverterArgs,
    },
}

/// Parses a template into its ordered segments.
///
/// Variable names must be unique; a trailing fragment containing an
/// unmatched `<` or `>` is malformed. The input here is the full text a
/// rule compiles, so the subdomain part may also carry variables.
pub(crate) fn parse_template(input: &str) -> Result<Vec<Segment>, MapError> {
    TemplateScanner::new(input).parse()
}

struct TemplateScanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> TemplateScanner<'a> {
    const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn malformed(&self) -> MapError {
        MapError::MalformedTemplate {
            template: self.input.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consumes and returns text up to (excluding) the next `stop` char.
    fn scan_until(&mut self, stop: char) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c != stop) {
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }

    /// Consumes an identifier: `[a-zA-Z_][a-zA-Z0-9_]*`, possibly empty.
    fn scan_ident(&mut self) -> String {
        let start = self.pos;
        if self
            .peek()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        {
            self.advance();
            while self
                .peek()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                self.advance();
            }
        }
        self.input[start..self.pos].to_string()
    }

    /// Consumes a raw argument list through its closing `)`.
    ///
    /// Quoted strings may contain `)` and `,` without ending the list.
    fn scan_args_raw(&mut self) -> Result<String, MapError> {
        let start = self.pos;
        loop {
            match self.advance() {
                Some(')') => {
                    return Ok(self.input[start..self.pos - 1].to_string());
                }
                Some(quote @ ('\'' | '"')) => {
                    while self.peek().is_some_and(|c| c != quote) {
                        self.advance();
                    }
                    if self.advance().is_none() {
                        return Err(self.malformed());
                    }
                }
                Some(_) => {}
                None => return Err(self.malformed()),
            }
        }
    }

    fn parse(mut self) -> Result<Vec<Segment>, MapError> {
        let mut segments = Vec::new();
        let mut used = HashSet::new();
        loop {
            let literal = self.scan_until('<');
            if self.peek().is_none() {
                // Trailing remainder: a stray bracket means the template
                // was cut off or never opened a variable properly.
                if literal.contains('>') {
                    return Err(self.malformed());
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(literal));
                }
                return Ok(segments);
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(literal));
            }
            self.advance(); // consume '<'
            segments.push(self.scan_variable(&mut used)?);
        }
    }

    fn scan_variable(&mut self, used: &mut HashSet<String>) -> Result<Segment, MapError> {
        let first = self.scan_ident();
        if first.is_empty() {
            return Err(self.malformed());
        }
        let (converter, args, name) = match self.peek() {
            Some('>') => (None, ConverterArgs::default(), first),
            Some(':') => {
                self.advance();
                (Some(first), ConverterArgs::default(), self.scan_ident())
            }
            Some('(') => {
                self.advance();
                let raw = self.scan_args_raw()?;
                if self.advance() != Some(':') {
                    return Err(self.malformed());
                }
                let name = self.scan_ident();
                let args = ConverterArgs::parse(&first, &raw)?;
                (Some(first), args, name)
            }
            _ => return Err(self.malformed()),
        };
        if self.advance() != Some('>') {
            return Err(self.malformed());
        }
        if !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
            return Err(self.malformed());
        }
        if !used.insert(name.clone()) {
            return Err(MapError::DuplicateVariable { name });
        }
        Ok(Segment::Variable {
            name,
            converter: converter.unwrap_or_else(|| "default".to_string()),
            args,
        })
    }
}
