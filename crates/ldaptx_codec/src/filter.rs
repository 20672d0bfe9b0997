//! Search filters.
//!
//! A [`Filter`] is a boolean expression tree: interior nodes join children
//! with AND or OR and may be negated; leaves are attribute assertions.
//! [`translate`] turns a tree into the RFC 4515 wire string after checking
//! every attribute against a [`FieldSet`]. [`Filter::parse`] goes the other
//! way, and [`Filter::matches`] evaluates a tree against an in-memory entry.

use crate::attrs::AttributeSet;
use crate::error::{CodecError, CodecResult};
use crate::escape::{escape_filter_value, hex_val};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::str::FromStr;

/// How the children of a filter node are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connector {
    /// All children must match.
    And,
    /// At least one child must match.
    Or,
}

impl Connector {
    fn symbol(self) -> char {
        match self {
            Self::And => '&',
            Self::Or => '|',
        }
    }
}

/// The optional match kind of a leaf term. Defaults to [`MatchKind::Exact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchKind {
    /// Equality.
    #[default]
    Exact,
    /// Value occurs anywhere.
    Contains,
    /// Value is a prefix.
    StartsWith,
    /// Value is a suffix.
    EndsWith,
    /// Ordering, greater or equal.
    GreaterOrEqual,
    /// Ordering, less or equal.
    LessOrEqual,
    /// Approximate match.
    Approx,
    /// Attribute has any value; the term value is ignored.
    Present,
}

impl FromStr for MatchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" | "eq" => Ok(Self::Exact),
            "contains" => Ok(Self::Contains),
            "startswith" => Ok(Self::StartsWith),
            "endswith" => Ok(Self::EndsWith),
            "gte" => Ok(Self::GreaterOrEqual),
            "lte" => Ok(Self::LessOrEqual),
            "approx" => Ok(Self::Approx),
            "present" => Ok(Self::Present),
            other => Err(format!("unknown match kind: {other}")),
        }
    }
}

/// The assertion a leaf term makes about its attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assertion {
    /// `attr=value`
    Equal(String),
    /// `attr~=value`
    Approx(String),
    /// `attr>=value`
    GreaterOrEqual(String),
    /// `attr<=value`
    LessOrEqual(String),
    /// `attr=*`
    Present,
    /// `attr=initial*any*...*final`
    Substrings {
        /// Required prefix.
        initial: Option<String>,
        /// Required inner fragments, in order.
        any: Vec<String>,
        /// Required suffix.
        final_value: Option<String>,
    },
}

/// A leaf of the filter tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Attribute (or field) name.
    pub attribute: String,
    /// What is asserted about it.
    pub assertion: Assertion,
}

impl Term {
    /// Builds a term from a match kind and a value.
    pub fn new(attribute: impl Into<String>, kind: MatchKind, value: impl Into<String>) -> Self {
        let value = value.into();
        let assertion = match kind {
            MatchKind::Exact => Assertion::Equal(value),
            MatchKind::Approx => Assertion::Approx(value),
            MatchKind::GreaterOrEqual => Assertion::GreaterOrEqual(value),
            MatchKind::LessOrEqual => Assertion::LessOrEqual(value),
            MatchKind::Present => Assertion::Present,
            MatchKind::Contains => Assertion::Substrings {
                initial: None,
                any: vec![value],
                final_value: None,
            },
            MatchKind::StartsWith => Assertion::Substrings {
                initial: Some(value),
                any: Vec::new(),
                final_value: None,
            },
            MatchKind::EndsWith => Assertion::Substrings {
                initial: None,
                any: Vec::new(),
                final_value: Some(value),
            },
        };
        Self {
            attribute: attribute.into(),
            assertion,
        }
    }

    fn render(&self, out: &mut String) {
        out.push('(');
        out.push_str(&self.attribute);
        match &self.assertion {
            Assertion::Equal(v) => {
                out.push('=');
                out.push_str(&escape_filter_value(v));
            }
            Assertion::Approx(v) => {
                out.push_str("~=");
                out.push_str(&escape_filter_value(v));
            }
            Assertion::GreaterOrEqual(v) => {
                out.push_str(">=");
                out.push_str(&escape_filter_value(v));
            }
            Assertion::LessOrEqual(v) => {
                out.push_str("<=");
                out.push_str(&escape_filter_value(v));
            }
            Assertion::Present => out.push_str("=*"),
            Assertion::Substrings {
                initial,
                any,
                final_value,
            } => {
                out.push('=');
                if let Some(initial) = initial {
                    out.push_str(&escape_filter_value(initial));
                }
                out.push('*');
                for fragment in any {
                    out.push_str(&escape_filter_value(fragment));
                    out.push('*');
                }
                if let Some(final_value) = final_value {
                    out.push_str(&escape_filter_value(final_value));
                }
            }
        }
        out.push(')');
    }

    fn matches(&self, attrs: &AttributeSet) -> bool {
        let Some(values) = attrs.get(&self.attribute) else {
            return false;
        };
        match &self.assertion {
            Assertion::Present => !values.is_empty(),
            Assertion::Equal(v) | Assertion::Approx(v) => {
                values.iter().any(|x| x.eq_ignore_ascii_case(v.as_bytes()))
            }
            Assertion::GreaterOrEqual(v) => values
                .iter()
                .any(|x| compare_values(x, v.as_bytes()) != Ordering::Less),
            Assertion::LessOrEqual(v) => values
                .iter()
                .any(|x| compare_values(x, v.as_bytes()) != Ordering::Greater),
            Assertion::Substrings {
                initial,
                any,
                final_value,
            } => values.iter().any(|x| {
                substrings_match(
                    &x.to_ascii_lowercase(),
                    initial.as_deref(),
                    any,
                    final_value.as_deref(),
                )
            }),
        }
    }
}

/// Orders two values numerically when both are integers, otherwise
/// case-insensitively byte by byte.
fn compare_values(lhs: &[u8], rhs: &[u8]) -> Ordering {
    let as_int = |v: &[u8]| std::str::from_utf8(v).ok()?.trim().parse::<i64>().ok();
    match (as_int(lhs), as_int(rhs)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => lhs.to_ascii_lowercase().cmp(&rhs.to_ascii_lowercase()),
    }
}

fn substrings_match(
    value: &[u8],
    initial: Option<&str>,
    any: &[String],
    final_value: Option<&str>,
) -> bool {
    let mut rest = value;
    if let Some(initial) = initial {
        let initial = initial.to_ascii_lowercase();
        if !rest.starts_with(initial.as_bytes()) {
            return false;
        }
        rest = &rest[initial.len()..];
    }
    if let Some(final_value) = final_value {
        let final_value = final_value.to_ascii_lowercase();
        if !rest.ends_with(final_value.as_bytes()) {
            return false;
        }
        rest = &rest[..rest.len() - final_value.len()];
    }
    for fragment in any {
        let fragment = fragment.to_ascii_lowercase();
        let needle = fragment.as_bytes();
        if needle.is_empty() {
            continue;
        }
        match rest.windows(needle.len()).position(|w| w == needle) {
            Some(at) => rest = &rest[at + needle.len()..],
            None => return false,
        }
    }
    true
}

/// A boolean filter expression.
///
/// ```
/// use ldaptx_codec::Filter;
///
/// let filter = Filter::eq("uid", "tux") & (Filter::eq("uid", "tuz") | Filter::eq("uid", "meow"));
/// assert_eq!(filter.to_wire(), "(&(uid=tux)(|(uid=tuz)(uid=meow)))");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// A single assertion.
    Term(Term),
    /// A boolean combination of sub-filters.
    Node {
        /// How the children are joined.
        connector: Connector,
        /// Whether the whole node is negated.
        negated: bool,
        /// Sub-filters.
        children: Vec<Filter>,
    },
}

impl Filter {
    /// `attribute=value`
    pub fn eq(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Term(Term::new(attribute, MatchKind::Exact, value))
    }

    /// A term with an explicit match kind.
    pub fn matching(
        attribute: impl Into<String>,
        kind: MatchKind,
        value: impl Into<String>,
    ) -> Self {
        Self::Term(Term::new(attribute, kind, value))
    }

    /// `attribute=*`
    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Term(Term::new(attribute, MatchKind::Present, ""))
    }

    /// Matches every entry (`objectClass=*`).
    #[must_use]
    pub fn everything() -> Self {
        Self::present("objectClass")
    }

    /// All children must match.
    #[must_use]
    pub fn and(children: Vec<Filter>) -> Self {
        Self::Node {
            connector: Connector::And,
            negated: false,
            children,
        }
    }

    /// Any child must match.
    #[must_use]
    pub fn or(children: Vec<Filter>) -> Self {
        Self::Node {
            connector: Connector::Or,
            negated: false,
            children,
        }
    }

    /// Negation of a filter.
    #[must_use]
    pub fn negate(filter: Filter) -> Self {
        match filter {
            Self::Node {
                connector,
                negated,
                children,
            } => Self::Node {
                connector,
                negated: !negated,
                children,
            },
            term => Self::Node {
                connector: Connector::And,
                negated: true,
                children: vec![term],
            },
        }
    }

    fn combine(self, other: Filter, connector: Connector) -> Self {
        match self {
            Self::Node {
                connector: existing,
                negated: false,
                mut children,
            } if existing == connector => {
                children.push(other);
                Self::Node {
                    connector,
                    negated: false,
                    children,
                }
            }
            lhs => Self::Node {
                connector,
                negated: false,
                children: vec![lhs, other],
            },
        }
    }

    /// Maps every term's attribute through `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownAttribute`] for the first attribute the
    /// field set does not know.
    pub fn resolve(&self, fields: &FieldSet) -> CodecResult<Filter> {
        match self {
            Self::Term(term) => {
                let wire = fields
                    .resolve(&term.attribute)
                    .ok_or_else(|| CodecError::unknown_attribute(&term.attribute))?;
                Ok(Self::Term(Term {
                    attribute: wire.to_string(),
                    assertion: term.assertion.clone(),
                }))
            }
            Self::Node {
                connector,
                negated,
                children,
            } => Ok(Self::Node {
                connector: *connector,
                negated: *negated,
                children: children
                    .iter()
                    .map(|child| child.resolve(fields))
                    .collect::<CodecResult<_>>()?,
            }),
        }
    }

    /// Renders the RFC 4515 wire string.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }

    fn render(&self, out: &mut String) {
        match self {
            Self::Term(term) => term.render(out),
            Self::Node {
                connector,
                negated,
                children,
            } => {
                if let [only] = children.as_slice() {
                    if *negated {
                        out.push_str("(!");
                        only.render(out);
                        out.push(')');
                    } else {
                        only.render(out);
                    }
                    return;
                }
                if *negated {
                    out.push_str("(!");
                }
                out.push('(');
                out.push(connector.symbol());
                for child in children {
                    child.render(out);
                }
                out.push(')');
                if *negated {
                    out.push(')');
                }
            }
        }
    }

    /// Evaluates the filter against an entry's attributes.
    #[must_use]
    pub fn matches(&self, attrs: &AttributeSet) -> bool {
        match self {
            Self::Term(term) => term.matches(attrs),
            Self::Node {
                connector,
                negated,
                children,
            } => {
                let result = match connector {
                    Connector::And => children.iter().all(|c| c.matches(attrs)),
                    Connector::Or => children.iter().any(|c| c.matches(attrs)),
                };
                result != *negated
            }
        }
    }

    /// Attribute names referenced by the filter, in order of appearance.
    #[must_use]
    pub fn attributes(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_attributes(&mut names);
        names
    }

    fn collect_attributes<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Term(term) => names.push(&term.attribute),
            Self::Node { children, .. } => {
                for child in children {
                    child.collect_attributes(names);
                }
            }
        }
    }

    /// Parses an RFC 4515 filter string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Parse`] with the offending offset for unbalanced
    /// parentheses, bad escapes, empty attribute names, extensible matches
    /// and trailing input.
    pub fn parse(text: &str) -> CodecResult<Filter> {
        let mut parser = FilterParser::new(text);
        parser.skip_spaces();
        let filter = parser.parse_filter()?;
        parser.skip_spaces();
        if parser.pos != parser.input.len() {
            return Err(parser.error("unexpected input after filter"));
        }
        Ok(filter)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for Filter {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl BitAnd for Filter {
    type Output = Filter;

    fn bitand(self, rhs: Filter) -> Filter {
        self.combine(rhs, Connector::And)
    }
}

impl BitOr for Filter {
    type Output = Filter;

    fn bitor(self, rhs: Filter) -> Filter {
        self.combine(rhs, Connector::Or)
    }
}

impl Not for Filter {
    type Output = Filter;

    fn not(self) -> Filter {
        Filter::negate(self)
    }
}

/// The attributes a filter may reference, keyed by field name.
///
/// Lookup is case-insensitive. A field may be an alias for a differently
/// named wire attribute.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: BTreeMap<String, String>,
}

impl FieldSet {
    /// An empty field set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field whose wire name equals its field name.
    #[must_use]
    pub fn field(self, name: &str) -> Self {
        self.alias(name, name)
    }

    /// Adds a field that maps to a different wire attribute.
    #[must_use]
    pub fn alias(mut self, field: &str, wire: &str) -> Self {
        self.fields
            .insert(field.to_ascii_lowercase(), wire.to_string());
        self
    }

    /// The wire attribute for a field name.
    #[must_use]
    pub fn resolve(&self, field: &str) -> Option<&str> {
        self.fields
            .get(&field.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no fields are known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for FieldSet {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        iter.into_iter().fold(Self::new(), FieldSet::field)
    }
}

/// Translates a filter tree into the wire filter string.
///
/// # Errors
///
/// Returns [`CodecError::UnknownAttribute`] if a term names an attribute that
/// is not in `fields`, rather than producing a broader query.
pub fn translate(filter: &Filter, fields: &FieldSet) -> CodecResult<String> {
    Ok(filter.resolve(fields)?.to_wire())
}

struct FilterParser<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> FilterParser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> CodecError {
        CodecError::parse(self.pos, message)
    }

    fn expect(&mut self, byte: u8) -> CodecResult<()> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn parse_filter(&mut self) -> CodecResult<Filter> {
        self.expect(b'(')?;
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::and(self.parse_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::or(self.parse_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Filter::Node {
                    connector: Connector::And,
                    negated: true,
                    children: vec![self.parse_filter()?],
                }
            }
            Some(_) => Filter::Term(self.parse_item()?),
            None => return Err(self.error("unexpected end of filter")),
        };
        self.expect(b')')?;
        Ok(filter)
    }

    fn parse_list(&mut self) -> CodecResult<Vec<Filter>> {
        let mut children = Vec::new();
        while self.peek() == Some(b'(') {
            children.push(self.parse_filter()?);
        }
        Ok(children)
    }

    fn parse_item(&mut self) -> CodecResult<Term> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'-' || b == b'.' || b == b';')
        {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected attribute description"));
        }
        let attribute = self.text[start..self.pos].to_string();

        let op = match (self.peek(), self.input.get(self.pos + 1).copied()) {
            (Some(b'='), _) => {
                self.pos += 1;
                b'='
            }
            (Some(op @ (b'~' | b'>' | b'<')), Some(b'=')) => {
                self.pos += 2;
                op
            }
            (Some(b':'), _) => return Err(self.error("extensible match is not supported")),
            _ => return Err(self.error("expected filter operator")),
        };

        let value_start = self.pos;
        let segments = self.parse_value_segments()?;
        let assertion = if op == b'=' {
            equality_or_substrings(segments, value_start)?
        } else {
            let [value] = <[String; 1]>::try_from(segments)
                .map_err(|_| CodecError::parse(value_start, "unexpected '*' in value"))?;
            match op {
                b'~' => Assertion::Approx(value),
                b'>' => Assertion::GreaterOrEqual(value),
                _ => Assertion::LessOrEqual(value),
            }
        };
        Ok(Term {
            attribute,
            assertion,
        })
    }

    /// Reads an assertion value up to the closing parenthesis, splitting it
    /// on unescaped `*`.
    fn parse_value_segments(&mut self) -> CodecResult<Vec<String>> {
        let mut segments = Vec::new();
        let mut current = Vec::new();
        let mut segment_start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated filter value")),
                Some(b')') => break,
                Some(b'(') => return Err(self.error("unescaped '(' in value")),
                Some(b'*') => {
                    segments.push(utf8_segment(std::mem::take(&mut current), segment_start)?);
                    self.pos += 1;
                    segment_start = self.pos;
                }
                Some(b'\\') => {
                    let hi = self.input.get(self.pos + 1).copied().and_then(hex_val);
                    let lo = self.input.get(self.pos + 2).copied().and_then(hex_val);
                    match (hi, lo) {
                        (Some(hi), Some(lo)) => {
                            current.push((hi << 4) | lo);
                            self.pos += 3;
                        }
                        _ => return Err(self.error("invalid escape in filter value")),
                    }
                }
                Some(b) => {
                    current.push(b);
                    self.pos += 1;
                }
            }
        }
        segments.push(utf8_segment(current, segment_start)?);
        Ok(segments)
    }
}

fn utf8_segment(bytes: Vec<u8>, at: usize) -> CodecResult<String> {
    String::from_utf8(bytes).map_err(|_| CodecError::parse(at, "filter value is not valid UTF-8"))
}

fn equality_or_substrings(mut segments: Vec<String>, at: usize) -> CodecResult<Assertion> {
    if segments.len() == 1 {
        return Ok(Assertion::Equal(segments.remove(0)));
    }
    if segments.len() == 2 && segments.iter().all(String::is_empty) {
        return Ok(Assertion::Present);
    }
    let final_value = segments.pop().filter(|s| !s.is_empty());
    let initial = Some(segments.remove(0)).filter(|s| !s.is_empty());
    if segments.iter().any(String::is_empty) {
        return Err(CodecError::parse(at, "empty substring between '*'"));
    }
    Ok(Assertion::Substrings {
        initial,
        any: segments,
        final_value,
    })
}
