//! Distinguished names.
//!
//! A [`Dn`] is an ordered sequence of relative names ([`Rdn`]), leaf first.
//! Each relative name is a non-empty set of attribute type/value pairs
//! ([`Ava`]); more than one pair means a multi-valued (`+`-joined) component.
//!
//! Parsing is a recursive-descent implementation of the RFC 4514 grammar:
//!
//! ```text
//! dn    = [ rdn *( "," rdn ) ]
//! rdn   = ava *( "+" ava )
//! ava   = type "=" value
//! type  = ALPHA *( ALPHA / DIGIT / "-" ) / number 1*( "." number )
//! value = "#" 1*hexpair / DQUOTE *( char / pair ) DQUOTE / *( stringchar / pair )
//! pair  = "\" ( special / " " / hexpair )
//! ```
//!
//! Whitespace around `,`, `+` and `=` is accepted on input and never emitted.
//! Unescaped leading and trailing spaces of an unquoted value are dropped.

use crate::error::{CodecError, CodecResult};
use crate::escape::{encode_hex, escape_value, hex_val};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Characters that may follow a backslash literally.
const ESCAPABLE: &[u8] = b" \"#+,;<=>\\";

/// The value half of an attribute type/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AvaValue {
    /// A UTF-8 string value.
    Text(String),
    /// A BER-encoded value written as `#` followed by hex pairs.
    Binary(Vec<u8>),
}

impl AvaValue {
    /// Returns the raw bytes of the value.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Returns the value as text, if it is a string value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }
}

impl fmt::Display for AvaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(&escape_value(text)),
            Self::Binary(bytes) => write!(f, "#{}", encode_hex(bytes)),
        }
    }
}

/// One attribute type/value pair of a relative name.
#[derive(Debug, Clone)]
pub struct Ava {
    attr_type: String,
    value: AvaValue,
}

impl Ava {
    /// Creates a pair with a string value.
    pub fn new(attr_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attr_type: attr_type.into(),
            value: AvaValue::Text(value.into()),
        }
    }

    /// Creates a pair with a binary value.
    pub fn binary(attr_type: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            attr_type: attr_type.into(),
            value: AvaValue::Binary(value.into()),
        }
    }

    /// Attribute type as written.
    #[must_use]
    pub fn attr_type(&self) -> &str {
        &self.attr_type
    }

    /// The value.
    #[must_use]
    pub fn value(&self) -> &AvaValue {
        &self.value
    }

    /// The value as text, if it is a string value.
    #[must_use]
    pub fn text_value(&self) -> Option<&str> {
        self.value.as_text()
    }

    fn normalized(&self) -> String {
        format!("{}={}", self.attr_type.to_ascii_lowercase(), self.value)
    }
}

impl PartialEq for Ava {
    fn eq(&self, other: &Self) -> bool {
        self.attr_type.eq_ignore_ascii_case(&other.attr_type) && self.value == other.value
    }
}

impl Eq for Ava {}

impl fmt::Display for Ava {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attr_type, self.value)
    }
}

/// A relative distinguished name: one component of a [`Dn`].
#[derive(Debug, Clone)]
pub struct Rdn {
    avas: Vec<Ava>,
}

impl Rdn {
    /// Creates a single-valued relative name.
    pub fn new(attr_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            avas: vec![Ava::new(attr_type, value)],
        }
    }

    /// Creates a relative name from its pairs. Returns `None` if `avas` is empty.
    #[must_use]
    pub fn from_avas(avas: Vec<Ava>) -> Option<Self> {
        if avas.is_empty() {
            None
        } else {
            Some(Self { avas })
        }
    }

    /// Parses text holding exactly one relative name component.
    ///
    /// # Errors
    ///
    /// Returns a parse error for malformed input and
    /// [`CodecError::NotASingleRdn`] if the text holds zero or several
    /// components.
    pub fn parse(text: &str) -> CodecResult<Self> {
        let mut dn = Dn::parse(text)?;
        if dn.rdns.len() != 1 {
            return Err(CodecError::NotASingleRdn {
                count: dn.rdns.len(),
            });
        }
        Ok(dn.rdns.remove(0))
    }

    /// The attribute type/value pairs, in written order.
    #[must_use]
    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// Whether the component holds more than one pair.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        self.avas.len() > 1
    }

    /// Normalized form: lower-cased types, pairs sorted.
    #[must_use]
    pub fn normalized(&self) -> String {
        let mut parts: Vec<String> = self.avas.iter().map(Ava::normalized).collect();
        parts.sort();
        parts.join("+")
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.avas.len() == other.avas.len() && self.normalized() == other.normalized()
    }
}

impl Eq for Rdn {}

impl Hash for Rdn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ava) in self.avas.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{ava}")?;
        }
        Ok(())
    }
}

impl FromStr for Rdn {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A distinguished name.
///
/// Two names are equal when their normalized forms match: attribute types
/// compare case-insensitively, pairs within a component compare as a set,
/// and values compare exactly.
///
/// ```
/// use ldaptx_codec::Dn;
///
/// let dn = Dn::parse("OU=Sales+CN=J. Smith,O=Widget Inc.,C=US").unwrap();
/// assert_eq!(dn.len(), 3);
/// assert_eq!(dn.rdns()[0].avas().len(), 2);
/// assert_eq!(dn.to_string(), "OU=Sales+CN=J. Smith,O=Widget Inc.,C=US");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// The empty name (root of the tree).
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parses a distinguished name.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Parse`] naming the offending byte offset for an
    /// unterminated quote, an invalid hex pair or escape, a missing `=`, a
    /// dangling separator, trailing garbage or a value that is not UTF-8.
    pub fn parse(text: &str) -> CodecResult<Self> {
        Parser::new(text).parse_dn()
    }

    /// Builds a name from components, leaf first.
    #[must_use]
    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        Self { rdns }
    }

    /// Components, leaf first.
    #[must_use]
    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    /// Whether this is the empty (root) name.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// The leaf component.
    #[must_use]
    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }

    /// The name of the parent entry, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            None
        } else {
            Some(Self {
                rdns: self.rdns[1..].to_vec(),
            })
        }
    }

    /// The name of a child entry directly below this one.
    #[must_use]
    pub fn child(&self, rdn: Rdn) -> Dn {
        let mut rdns = Vec::with_capacity(self.rdns.len() + 1);
        rdns.push(rdn);
        rdns.extend(self.rdns.iter().cloned());
        Self { rdns }
    }

    /// This name with its leaf component replaced, or `None` for the root.
    #[must_use]
    pub fn with_rdn(&self, rdn: Rdn) -> Option<Dn> {
        self.parent().map(|parent| parent.child(rdn))
    }

    /// How many components this name sits below `base`, or `None` if it is
    /// not `base` itself or one of its descendants.
    #[must_use]
    pub fn depth_below(&self, base: &Dn) -> Option<usize> {
        let depth = self.rdns.len().checked_sub(base.rdns.len())?;
        if self.rdns[depth..] == base.rdns[..] {
            Some(depth)
        } else {
            None
        }
    }

    /// Whether this name is `base` or lies below it.
    #[must_use]
    pub fn is_descendant_of(&self, base: &Dn) -> bool {
        self.depth_below(base).is_some()
    }

    /// This name re-rooted: the `old_base` suffix replaced by `new_base`.
    /// Returns `None` if the name does not lie below `old_base`.
    #[must_use]
    pub fn rebase(&self, old_base: &Dn, new_base: &Dn) -> Option<Dn> {
        let depth = self.depth_below(old_base)?;
        let mut rdns = self.rdns[..depth].to_vec();
        rdns.extend(new_base.rdns.iter().cloned());
        Some(Self { rdns })
    }

    /// Normalized string form used for equality, hashing and cache keys.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.rdns
            .iter()
            .map(Rdn::normalized)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.rdns == other.rdns
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

impl FromStr for Dn {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Recursive-descent parser over the bytes of a name.
struct Parser<'a> {
    text: &'a str,
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            input: text.as_bytes(),
            pos: 0,
        }
    }

    #[inline]
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.input.get(self.pos + ahead).copied()
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> CodecError {
        CodecError::parse(self.pos, message)
    }

    fn parse_dn(&mut self) -> CodecResult<Dn> {
        self.skip_spaces();
        if self.peek().is_none() {
            return Ok(Dn::root());
        }

        let mut rdns = Vec::new();
        loop {
            rdns.push(self.parse_rdn()?);
            self.skip_spaces();
            match self.peek() {
                None => break,
                Some(b',') => {
                    self.pos += 1;
                    self.skip_spaces();
                    if self.peek().is_none() {
                        return Err(self.error("expected relative name after ','"));
                    }
                }
                Some(_) => return Err(self.error("unexpected character after value")),
            }
        }
        Ok(Dn { rdns })
    }

    fn parse_rdn(&mut self) -> CodecResult<Rdn> {
        let mut avas = vec![self.parse_ava()?];
        loop {
            self.skip_spaces();
            if self.peek() != Some(b'+') {
                break;
            }
            self.pos += 1;
            self.skip_spaces();
            avas.push(self.parse_ava()?);
        }
        Ok(Rdn { avas })
    }

    fn parse_ava(&mut self) -> CodecResult<Ava> {
        let attr_type = self.parse_attr_type()?;
        self.skip_spaces();
        if self.peek() != Some(b'=') {
            return Err(self.error("expected '=' after attribute type"));
        }
        self.pos += 1;
        self.skip_spaces();
        let value = self.parse_value()?;
        Ok(Ava { attr_type, value })
    }

    fn parse_attr_type(&mut self) -> CodecResult<String> {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() => {
                while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'-') {
                    self.pos += 1;
                }
            }
            Some(b) if b.is_ascii_digit() => loop {
                let part = self.pos;
                while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                    self.pos += 1;
                }
                if self.pos == part {
                    return Err(self.error("empty component in numeric OID"));
                }
                if self.peek() != Some(b'.') {
                    break;
                }
                self.pos += 1;
            },
            _ => return Err(self.error("expected attribute type")),
        }
        // The accepted bytes are all ASCII, so the slice is on char boundaries.
        Ok(self.text[start..self.pos].to_string())
    }

    fn parse_value(&mut self) -> CodecResult<AvaValue> {
        match self.peek() {
            Some(b'#') => self.parse_hex_value(),
            Some(b'"') => self.parse_quoted_value(),
            _ => self.parse_string_value(),
        }
    }

    fn parse_hex_value(&mut self) -> CodecResult<AvaValue> {
        self.pos += 1;
        let mut bytes = Vec::new();
        while let Some(hi) = self.peek().and_then(hex_val) {
            let lo = self
                .peek_at(1)
                .and_then(hex_val)
                .ok_or_else(|| self.error("invalid hex pair"))?;
            bytes.push((hi << 4) | lo);
            self.pos += 2;
        }
        if bytes.is_empty() {
            return Err(self.error("expected hex pairs after '#'"));
        }
        match self.peek() {
            None | Some(b',' | b'+' | b' ') => Ok(AvaValue::Binary(bytes)),
            Some(_) => Err(self.error("invalid hex pair")),
        }
    }

    fn parse_quoted_value(&mut self) -> CodecResult<AvaValue> {
        let start = self.pos;
        self.pos += 1;
        let mut buf = Vec::new();
        loop {
            match self.peek() {
                None => return Err(CodecError::parse(start, "unterminated quoted value")),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => self.parse_escape(&mut buf)?,
                Some(b) => {
                    buf.push(b);
                    self.pos += 1;
                }
            }
        }
        text_value(buf, start)
    }

    fn parse_string_value(&mut self) -> CodecResult<AvaValue> {
        let start = self.pos;
        let mut buf = Vec::new();
        // Length of `buf` up to the last byte that is not an unescaped space.
        let mut significant = 0;
        loop {
            match self.peek() {
                None | Some(b',' | b'+') => break,
                Some(b'\\') => {
                    self.parse_escape(&mut buf)?;
                    significant = buf.len();
                }
                Some(b' ') => {
                    buf.push(b' ');
                    self.pos += 1;
                }
                Some(b'"' | b';' | b'<' | b'>' | 0) => {
                    return Err(self.error("unescaped special character in value"));
                }
                Some(b) => {
                    buf.push(b);
                    self.pos += 1;
                    significant = buf.len();
                }
            }
        }
        buf.truncate(significant);
        text_value(buf, start)
    }

    fn parse_escape(&mut self, buf: &mut Vec<u8>) -> CodecResult<()> {
        let at = self.pos;
        self.pos += 1;
        match self.peek() {
            Some(b) if ESCAPABLE.contains(&b) => {
                buf.push(b);
                self.pos += 1;
                Ok(())
            }
            Some(b) => {
                let hi = hex_val(b).ok_or_else(|| CodecError::parse(at, "invalid escape sequence"))?;
                let lo = self
                    .peek_at(1)
                    .and_then(hex_val)
                    .ok_or_else(|| CodecError::parse(at, "invalid hex pair"))?;
                buf.push((hi << 4) | lo);
                self.pos += 2;
                Ok(())
            }
            None => Err(CodecError::parse(at, "dangling escape at end of input")),
        }
    }
}

fn text_value(buf: Vec<u8>, start: usize) -> CodecResult<AvaValue> {
    String::from_utf8(buf)
        .map(AvaValue::Text)
        .map_err(|_| CodecError::parse(start, "value is not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(text: &str) -> String {
        Dn::parse(text).unwrap().to_string()
    }

    #[test]
    fn parses_multi_valued_component() {
        let dn = Dn::parse("OU=Sales+CN=J. Smith,O=Widget Inc.,C=US").unwrap();
        assert_eq!(dn.len(), 3);
        let first = &dn.rdns()[0];
        assert!(first.is_multi_valued());
        assert_eq!(first.avas()[0].attr_type(), "OU");
        assert_eq!(first.avas()[0].text_value(), Some("Sales"));
        assert_eq!(first.avas()[1].attr_type(), "CN");
        assert_eq!(first.avas()[1].text_value(), Some("J. Smith"));
        assert_eq!(dn.to_string(), "OU=Sales+CN=J. Smith,O=Widget Inc.,C=US");
    }

    #[test]
    fn empty_text_is_root() {
        let dn = Dn::parse("").unwrap();
        assert!(dn.is_empty());
        assert_eq!(dn.to_string(), "");
        assert_eq!(Dn::parse("   ").unwrap(), Dn::root());
    }

    #[test]
    fn tolerates_spaces_around_separators() {
        let dn = Dn::parse("uid=tux , ou=People ,dc=example,  dc=org").unwrap();
        assert_eq!(dn.to_string(), "uid=tux,ou=People,dc=example,dc=org");
        let dn = Dn::parse("cn = a + sn = b,dc=org").unwrap();
        assert_eq!(dn.to_string(), "cn=a+sn=b,dc=org");
    }

    #[test]
    fn unescapes_specials_and_hex() {
        let dn = Dn::parse(r"cn=Smith\, John,o=Acme").unwrap();
        assert_eq!(dn.rdns()[0].avas()[0].text_value(), Some("Smith, John"));

        let dn = Dn::parse(r"cn=Lu\C4\8Di\C4\87").unwrap();
        assert_eq!(dn.rdns()[0].avas()[0].text_value(), Some("Lučić"));

        let dn = Dn::parse(r"cn=\#hash\+plus\=eq").unwrap();
        assert_eq!(dn.rdns()[0].avas()[0].text_value(), Some("#hash+plus=eq"));
    }

    #[test]
    fn keeps_escaped_edge_spaces() {
        let dn = Dn::parse(r"cn=\ padded\ ,dc=org").unwrap();
        assert_eq!(dn.rdns()[0].avas()[0].text_value(), Some(" padded "));
        assert_eq!(dn.to_string(), r"cn=\ padded\ ,dc=org");
    }

    #[test]
    fn drops_unescaped_trailing_spaces() {
        let dn = Dn::parse("cn=foo   ,dc=org").unwrap();
        assert_eq!(dn.rdns()[0].avas()[0].text_value(), Some("foo"));
    }

    #[test]
    fn quoted_values() {
        let dn = Dn::parse(r#"cn="Smith, John",o="a\"b""#).unwrap();
        assert_eq!(dn.rdns()[0].avas()[0].text_value(), Some("Smith, John"));
        assert_eq!(dn.rdns()[1].avas()[0].text_value(), Some("a\"b"));
        assert_eq!(dn.to_string(), r#"cn=Smith\, John,o=a\"b"#);
    }

    #[test]
    fn hex_values_stay_binary() {
        let dn = Dn::parse("1.3.6.1.4.1.1466.0=#04024869,dc=org").unwrap();
        let ava = &dn.rdns()[0].avas()[0];
        assert_eq!(ava.attr_type(), "1.3.6.1.4.1.1466.0");
        assert_eq!(ava.value(), &AvaValue::Binary(vec![0x04, 0x02, 0x48, 0x69]));
        assert_eq!(dn.to_string(), "1.3.6.1.4.1.1466.0=#04024869,dc=org");
    }

    #[test]
    fn formats_with_escaping() {
        let dn = Dn::root()
            .child(Rdn::new("o", "Widget, Inc."))
            .child(Rdn::new("cn", " lead"));
        assert_eq!(dn.to_string(), r"cn=\ lead,o=Widget\, Inc.");
        assert_eq!(Dn::parse(&dn.to_string()).unwrap(), dn);
    }

    #[test]
    fn unterminated_quote_reports_offset() {
        let err = Dn::parse(r#"cn=ok,o="never closed"#).unwrap_err();
        assert_eq!(err.offset(), Some(8));
    }

    #[test]
    fn invalid_hex_pair() {
        assert!(matches!(
            Dn::parse("cn=#0g"),
            Err(CodecError::Parse { offset: 4, .. })
        ));
        assert!(matches!(
            Dn::parse("cn=#123"),
            Err(CodecError::Parse { .. })
        ));
        assert!(matches!(
            Dn::parse(r"cn=a\4"),
            Err(CodecError::Parse { offset: 4, .. })
        ));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(Dn::parse(r#"cn="x"y"#).is_err());
        assert!(Dn::parse("cn=x,").is_err());
        assert!(Dn::parse("cn=x;o=y").is_err());
        assert!(Dn::parse("=x").is_err());
        assert!(Dn::parse("cn").is_err());
        assert!(Dn::parse("1..2=x").is_err());
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = Dn::parse(r"cn=\ff\fe").unwrap_err();
        assert_eq!(err.offset(), Some(3));
    }

    #[test]
    fn empty_value_is_allowed() {
        let dn = Dn::parse("cn=,dc=org").unwrap();
        assert_eq!(dn.rdns()[0].avas()[0].text_value(), Some(""));
        assert_eq!(dn.to_string(), "cn=,dc=org");
    }

    #[test]
    fn equality_ignores_type_case_only() {
        let a = Dn::parse("UID=tux,OU=People,DC=example,DC=org").unwrap();
        let b = Dn::parse("uid=tux,ou=People,dc=example,dc=org").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.normalized(), b.normalized());

        let c = Dn::parse("uid=TUX,ou=People,dc=example,dc=org").unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn multi_valued_equality_is_order_insensitive() {
        let a = Dn::parse("cn=a+sn=b,dc=org").unwrap();
        let b = Dn::parse("sn=b+cn=a,dc=org").unwrap();
        assert_eq!(a, b);
        assert_eq!(roundtrip("sn=b+cn=a,dc=org"), "sn=b+cn=a,dc=org");
    }

    #[test]
    fn hierarchy_helpers() {
        let base = Dn::parse("dc=example,dc=org").unwrap();
        let people = Dn::parse("ou=People,dc=example,dc=org").unwrap();
        let tux = Dn::parse("uid=tux,ou=People,dc=example,dc=org").unwrap();

        assert_eq!(tux.parent().unwrap(), people);
        assert_eq!(people.child(Rdn::new("uid", "tux")), tux);
        assert_eq!(tux.depth_below(&base), Some(2));
        assert_eq!(base.depth_below(&base), Some(0));
        assert_eq!(base.depth_below(&tux), None);
        assert!(tux.is_descendant_of(&Dn::root()));

        let other = Dn::parse("uid=tux,ou=Other,dc=example,dc=org").unwrap();
        assert_eq!(other.depth_below(&people), None);

        let renamed = tux.with_rdn(Rdn::new("uid", "tuz")).unwrap();
        assert_eq!(renamed.to_string(), "uid=tuz,ou=People,dc=example,dc=org");

        let moved = tux
            .rebase(&people, &Dn::parse("ou=Staff,dc=example,dc=org").unwrap())
            .unwrap();
        assert_eq!(moved.to_string(), "uid=tux,ou=Staff,dc=example,dc=org");
    }

    #[test]
    fn rdn_parse_requires_single_component() {
        assert_eq!(Rdn::parse("uid=tuz").unwrap(), Rdn::new("UID", "tuz"));
        assert!(matches!(
            Rdn::parse("uid=a,dc=org"),
            Err(CodecError::NotASingleRdn { count: 2 })
        ));
        assert!(matches!(
            Rdn::parse(""),
            Err(CodecError::NotASingleRdn { count: 0 })
        ));
    }

    #[test]
    fn reparse_is_stable() {
        for text in [
            r"cn=Smith\, John+uid=js,ou=People,dc=example,dc=org",
            r"cn=\#1\ ,o=a\;b",
            "cn=Müller,o=Straße",
            r#"cn="q\"uoted""#,
        ] {
            let once = roundtrip(text);
            assert_eq!(roundtrip(&once), once);
            assert_eq!(Dn::parse(&once).unwrap(), Dn::parse(text).unwrap());
        }
    }
}
