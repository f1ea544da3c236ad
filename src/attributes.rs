//! # Shape Attributes
//!
//! The `# key=value ...` segment that follows a shape, and the `global` line.
//! Well-known keys land in named fields; anything else is kept in
//! [`Attributes::other`] so that nothing the file says is lost.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{char as nom_char, multispace1},
    combinator::{all_consuming, eof, map, opt, peek, recognize, verify},
    error::{context, ContextError, ErrorKind, ParseError as NomParseErrorTrait},
    multi::{separated_list0, separated_list1},
    number::complete::double,
    sequence::{delimited, pair, terminated, tuple},
    Finish,
};

use crate::semantic_parsers::{ws, Input, NomVerboseError, ParserResult};

pub const DEFAULT_COLOR: &str = "green";
pub const DEFAULT_FONT: &str = "helvetica 10 normal roman";
pub const DEFAULT_WIDTH: f64 = 1.0;

/// Keys that may appear without a value, meaning "on".
const VALUELESS_FLAGS: &[&str] = &[
    "source", "background", "include", "dash", "fixed", "edit", "move", "rotate", "delete", "select",
    "highlite", "fill", "textrotate",
];
const FLAG_KEYS: &[&str] = &[
    "select", "highlite", "dash", "fixed", "edit", "move", "rotate", "delete", "include", "source",
    "background", "fill", "textrotate",
];
const NUMBER_KEYS: &[&str] = &[
    "width", "lw", "lwidth", "radius", "major", "minor", "angle", "alpha", "size", "textangle",
];
const STRING_KEYS: &[&str] = &["font", "text", "label", "tag", "format", "ruler"];

#[derive(Debug, PartialEq, Clone)]
pub enum AttributeValue {
    String(String),
    Number(f64),
    NumberList(Vec<f64>),
    Flag(bool),
}

impl AttributeValue {
    fn to_ds9_value(&self) -> String {
        match self {
            AttributeValue::String(s) if s.is_empty() || s.contains(char::is_whitespace) => format!("{{{s}}}"),
            AttributeValue::String(s) => s.clone(),
            AttributeValue::Number(n) => n.to_string(),
            AttributeValue::NumberList(list) => {
                list.iter().map(f64::to_string).collect::<Vec<_>>().join(" ")
            }
            AttributeValue::Flag(b) => u8::from(*b).to_string(),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SourceKind {
    Source,
    Background,
}

/// Attributes attached to a region (or declared globally).
///
/// Unset fields fall back to the DS9 defaults through the accessor methods.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Attributes {
    pub color: Option<String>,
    pub tags: Vec<String>,
    pub text: Option<String>,
    pub fixed: Option<bool>,
    pub width: Option<f64>,
    pub font: Option<String>,
    pub source: Option<SourceKind>,
    pub other: BTreeMap<String, AttributeValue>,
}

impl Attributes {
    pub fn color(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_COLOR)
    }

    pub fn font(&self) -> &str {
        self.font.as_deref().unwrap_or(DEFAULT_FONT)
    }

    pub fn width(&self) -> f64 {
        self.width.unwrap_or(DEFAULT_WIDTH)
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed.unwrap_or(false)
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.unwrap_or(SourceKind::Source)
    }

    pub fn is_empty(&self) -> bool {
        *self == Attributes::default()
    }

    /// Stores one parsed `key=value` pair in the matching field.
    pub fn set(&mut self, key: &str, value: AttributeValue) {
        let key_lc = key.to_ascii_lowercase();
        match (key_lc.as_str(), value) {
            ("color", AttributeValue::String(s)) => self.color = Some(s),
            ("tag", AttributeValue::String(s)) => self.tags.push(s),
            ("text", AttributeValue::String(s)) => self.text = Some(s),
            ("font", AttributeValue::String(s)) => self.font = Some(s),
            ("fixed", AttributeValue::Flag(b)) => self.fixed = Some(b),
            ("width", AttributeValue::Number(n)) => self.width = Some(n),
            ("source", AttributeValue::Flag(b)) => {
                self.source = Some(if b { SourceKind::Source } else { SourceKind::Background })
            }
            ("background", AttributeValue::Flag(b)) => {
                self.source = Some(if b { SourceKind::Background } else { SourceKind::Source })
            }
            (_, value) => {
                self.other.insert(key_lc, value);
            }
        }
    }

    /// `self` layered over `base`: fields set here win, tags accumulate.
    pub fn merged_over(&self, base: &Attributes) -> Attributes {
        let mut merged = base.clone();
        if self.color.is_some() {
            merged.color = self.color.clone();
        }
        if self.text.is_some() {
            merged.text = self.text.clone();
        }
        if self.fixed.is_some() {
            merged.fixed = self.fixed;
        }
        if self.width.is_some() {
            merged.width = self.width;
        }
        if self.font.is_some() {
            merged.font = self.font.clone();
        }
        if self.source.is_some() {
            merged.source = self.source;
        }
        for tag in &self.tags {
            if !merged.tags.contains(tag) {
                merged.tags.push(tag.clone());
            }
        }
        for (k, v) in &self.other {
            merged.other.insert(k.clone(), v.clone());
        }
        merged
    }

    /// Explicitly set attributes in DS9 syntax, without the leading `#`.
    pub fn to_ds9_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(color) = &self.color {
            parts.push(format!("color={color}"));
        }
        if let Some(width) = self.width {
            parts.push(format!("width={width}"));
        }
        if let Some(font) = &self.font {
            parts.push(format!("font=\"{font}\""));
        }
        if let Some(text) = &self.text {
            parts.push(format!("text={{{text}}}"));
        }
        for tag in &self.tags {
            parts.push(format!("tag={{{tag}}}"));
        }
        if let Some(fixed) = self.fixed {
            parts.push(format!("fixed={}", u8::from(fixed)));
        }
        match self.source {
            Some(SourceKind::Background) => parts.push("background".to_string()),
            Some(SourceKind::Source) => parts.push("source".to_string()),
            None => {}
        }
        let mut out = parts.join(" ");
        for (k, v) in &self.other {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = write!(out, "{}={}", k, v.to_ds9_value());
        }
        out
    }
}

// --- Attribute Parsers ---

fn parse_delimited_string_value<'a>(input: Input<'a>) -> ParserResult<'a, String> {
    context(
        "delimited string value",
        alt((
            map(delimited(nom_char('"'), take_till(|c: char| c == '"'), nom_char('"')), |s: &str| s.to_string()),
            map(delimited(nom_char('\''), take_till(|c: char| c == '\''), nom_char('\'')), |s: &str| s.to_string()),
            map(delimited(nom_char('{'), take_till(|c: char| c == '}'), nom_char('}')), |s: &str| s.to_string()),
        )),
    )(input)
}

fn parse_simple_word<'a>(input: Input<'a>) -> ParserResult<'a, &'a str> {
    take_while1(|c: char| !c.is_whitespace() && c != '=')(input)
}

fn parse_string_value<'a>(input: Input<'a>) -> ParserResult<'a, String> {
    alt((
        parse_delimited_string_value,
        map(verify(parse_simple_word, |s: &str| !s.starts_with(['"', '\'', '{'])), str::to_string),
    ))(input)
}

fn parse_dashlist_value<'a>(input: Input<'a>) -> ParserResult<'a, Vec<f64>> {
    context("number list value", separated_list1(multispace1, double))(input)
}

fn parse_flag_value<'a>(input: Input<'a>) -> ParserResult<'a, bool> {
    context(
        "flag value (0 or 1)",
        terminated(
            alt((map(nom_char('1'), |_| true), map(nom_char('0'), |_| false))),
            peek(alt((multispace1, eof))),
        ),
    )(input)
}

/// A number that is a whole token, so that `12abc` is not split into `12` and `abc`.
fn parse_standalone_number<'a>(input: Input<'a>) -> ParserResult<'a, f64> {
    terminated(double, peek(alt((multispace1, eof))))(input)
}

/// `point=circle 6`: a point style, optionally followed by its size.
fn parse_point_style_value<'a>(input: Input<'a>) -> ParserResult<'a, String> {
    map(
        recognize(pair(parse_simple_word, opt(pair(multispace1, parse_standalone_number)))),
        str::to_string,
    )(input)
}

fn parse_value_for_key<'a>(key_lc: &str, input: Input<'a>) -> ParserResult<'a, AttributeValue> {
    if key_lc == "dashlist" || key_lc == "line" {
        map(parse_dashlist_value, AttributeValue::NumberList)(input)
    } else if key_lc == "point" {
        map(parse_point_style_value, AttributeValue::String)(input)
    } else if key_lc == "color" {
        map(parse_string_value, AttributeValue::String)(input)
    } else if STRING_KEYS.contains(&key_lc) {
        map(parse_string_value, AttributeValue::String)(input)
    } else if NUMBER_KEYS.contains(&key_lc) {
        map(double, AttributeValue::Number)(input)
    } else if FLAG_KEYS.contains(&key_lc) {
        map(parse_flag_value, AttributeValue::Flag)(input)
    } else {
        alt((
            map(parse_standalone_number, AttributeValue::Number),
            map(parse_string_value, AttributeValue::String),
        ))(input)
    }
}

fn parse_attribute_key<'a>(input: Input<'a>) -> ParserResult<'a, &'a str> {
    context("attribute key", take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'))(input)
}

/// Parses a single attribute pair (key=value) or a valueless flag key.
fn parse_attribute_pair<'a>(input: Input<'a>) -> ParserResult<'a, (String, AttributeValue)> {
    let (i, key) = parse_attribute_key(input)?;
    let key_lc = key.to_ascii_lowercase();
    let (i, has_value) = opt(tuple((ws, nom_char('='), ws)))(i)?;
    if has_value.is_some() {
        let (i, value) = context("attribute value", |v| parse_value_for_key(&key_lc, v))(i)?;
        return Ok((i, (key_lc, value)));
    }
    if VALUELESS_FLAGS.contains(&key_lc.as_str()) {
        Ok((i, (key_lc, AttributeValue::Flag(true))))
    } else {
        Err(nom::Err::Error(NomVerboseError::add_context(
            input,
            "expected value for attribute or known valueless flag",
            <NomVerboseError as NomParseErrorTrait<Input>>::from_error_kind(input, ErrorKind::Tag),
        )))
    }
}

fn parse_attribute_pairs<'a>(input: Input<'a>) -> ParserResult<'a, Vec<(String, AttributeValue)>> {
    delimited(ws, separated_list0(multispace1, parse_attribute_pair), ws)(input)
}

/// Parses the whole attribute text of a shape or `global` line.
pub fn parse_attribute_text(text: &str) -> Result<Attributes, String> {
    match all_consuming(parse_attribute_pairs)(text).finish() {
        Ok((_, pairs)) => {
            let mut attrs = Attributes::default();
            for (key, value) in pairs {
                attrs.set(&key, value);
            }
            Ok(attrs)
        }
        Err(e) => Err(nom::error::convert_error(text, e)),
    }
}

/// Splits `text` into the attribute-like prefix accepted by [`parse_attribute_text`]
/// and whatever free text follows it. Used for trailing comments such as
/// `# color=red my favourite source`.
pub fn parse_attribute_prefix(text: &str) -> (Attributes, &str) {
    let mut attrs = Attributes::default();
    let mut rest = text;
    loop {
        let trimmed = rest.trim_start();
        match terminated(parse_attribute_pair, peek(alt((multispace1, eof))))(trimmed) {
            Ok((after, (key, value))) => {
                attrs.set(&key, value);
                rest = after;
            }
            Err(_) => return (attrs, trimmed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_attrs {
        ($input:expr, |$a:ident| $check:expr) => {
            match parse_attribute_text($input) {
                Ok($a) => assert!($check, "attribute check failed for '{}': {:?}", $input, $a),
                Err(e) => panic!("attribute parsing failed for '{}':\n{}", $input, e),
            }
        };
    }

    #[test]
    fn test_parse_global_style_attributes() {
        let line = r#"color=green dashlist=8 3 width=1 font="helvetica 10 normal" select=1 highlite=0"#;
        assert_attrs!(line, |a| a.color.as_deref() == Some("green"));
        assert_attrs!(line, |a| a.other.get("dashlist") == Some(&AttributeValue::NumberList(vec![8.0, 3.0])));
        assert_attrs!(line, |a| a.width == Some(1.0));
        assert_attrs!(line, |a| a.font.as_deref() == Some("helvetica 10 normal"));
        assert_attrs!(line, |a| a.other.get("select") == Some(&AttributeValue::Flag(true)));
        assert_attrs!(line, |a| a.other.get("highlite") == Some(&AttributeValue::Flag(false)));
    }

    #[test]
    fn test_tags_accumulate() {
        assert_attrs!("tag={Group 1} tag={Group 2}", |a| a.tags == vec!["Group 1".to_string(), "Group 2".to_string()]);
    }

    #[test]
    fn test_text_with_both_quote_kinds() {
        let line = r#"text={This message has both a " and ' in it}"#;
        assert_attrs!(line, |a| a.text.as_deref() == Some(r#"This message has both a " and ' in it"#));
    }

    #[test]
    fn test_source_and_background_flags() {
        assert_attrs!("source", |a| a.source_kind() == SourceKind::Source);
        assert_attrs!("edit=1 background", |a| a.source_kind() == SourceKind::Background);
        assert_attrs!("source=0", |a| a.source_kind() == SourceKind::Background);
    }

    #[test]
    fn test_hex_color_and_point_style() {
        assert_attrs!("color=#ff0000 point=box 6", |a| a.color.as_deref() == Some("#ff0000"));
        assert_attrs!("color=#ff0000 point=box 6", |a| a.other.get("point")
            == Some(&AttributeValue::String("box 6".to_string())));
        assert_attrs!("point=cross color=red", |a| a.other.get("point")
            == Some(&AttributeValue::String("cross".to_string())));
    }

    #[test]
    fn test_unknown_keys_keep_their_value() {
        assert_attrs!("property=value composite=1 answer=42", |a| {
            a.other.get("property") == Some(&AttributeValue::String("value".into()))
                && a.other.get("composite") == Some(&AttributeValue::Number(1.0))
                && a.other.get("answer") == Some(&AttributeValue::Number(42.0))
        });
    }

    #[test]
    fn test_invalid_attributes() {
        assert!(parse_attribute_text("color").is_err());
        assert!(parse_attribute_text("text={unterminated").is_err());
    }

    #[test]
    fn test_defaults() {
        let a = Attributes::default();
        assert_eq!(a.color(), "green");
        assert_eq!(a.font(), "helvetica 10 normal roman");
        assert_eq!(a.width(), 1.0);
        assert!(!a.is_fixed());
        assert_eq!(a.source_kind(), SourceKind::Source);
        assert!(a.is_empty());
    }

    #[test]
    fn test_merge_overrides_and_unions_tags() {
        let global = parse_attribute_text("color=green width=2 tag={all}").unwrap();
        let local = parse_attribute_text("color=red tag={mine}").unwrap();
        let merged = local.merged_over(&global);
        assert_eq!(merged.color(), "red");
        assert_eq!(merged.width(), 2.0);
        assert_eq!(merged.tags, vec!["all".to_string(), "mine".to_string()]);
    }

    #[test]
    fn test_attribute_prefix_stops_at_free_text() {
        let (attrs, rest) = parse_attribute_prefix("color=red my favourite source");
        assert_eq!(attrs.color(), "red");
        assert_eq!(rest, "my favourite source");
    }

    #[test]
    fn test_serialization_reparses() {
        let text = r#"color=red width=2 text={Hello world} tag={a} fixed=1 background dashlist=8 3"#;
        let attrs = parse_attribute_text(text).unwrap();
        let serialized = attrs.to_ds9_string();
        assert_eq!(parse_attribute_text(&serialized).unwrap(), attrs);
    }
}
