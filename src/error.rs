//! # Errors
//!
//! One error type per failure kind. Lexing, parsing, unsupported syntax and
//! invalid geometry are collected as [`Diagnostic`]s while a file is parsed;
//! [`ConversionError`] is reported separately by the resolver because it depends
//! on image metadata rather than on the region text.

use std::fmt;

use thiserror::Error;

/// Malformed token stream. Fatal for the rest of the line only.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: {reason}")]
pub struct LexError {
    pub line: usize,
    pub reason: String,
}

impl LexError {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self { line, reason: reason.into() }
    }
}

/// Number of parameters a shape accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// `fixed` parameters plus at least `min_repeats` groups of `unit` parameters.
    Repeating { fixed: usize, unit: usize, min_repeats: usize },
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::Repeating { fixed, unit, min_repeats } => write!(
                f,
                "{} + a multiple of {unit} (at least {})",
                fixed,
                fixed + unit * min_repeats
            ),
        }
    }
}

/// A shape statement that could not be turned into a region.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("line {line}: {shape} expects {expected} parameters, got {got}")]
    Arity { line: usize, shape: &'static str, expected: Arity, got: usize },

    #[error("line {line}: unknown shape '{keyword}'")]
    UnknownShape { line: usize, keyword: String },

    #[error("line {line}: parameter {index} ('{text}') is invalid: {reason}")]
    InvalidParameter { line: usize, index: usize, text: String, reason: String },

    #[error("line {line}: coordinate pair mixes angular and pixel units")]
    InconsistentUnits { line: usize },

    #[error("line {line}: cannot parse attributes '{text}'")]
    InvalidAttribute { line: usize, text: String },
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::Arity { line, .. }
            | ParseError::UnknownShape { line, .. }
            | ParseError::InvalidParameter { line, .. }
            | ParseError::InconsistentUnits { line }
            | ParseError::InvalidAttribute { line, .. } => *line,
        }
    }
}

/// Syntax this crate recognizes but deliberately does not model
/// (composite, template, mosaic tiles, multi-WCS selectors).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: unsupported feature '{feature_name}', statement skipped")]
pub struct UnsupportedFeature {
    pub line: usize,
    pub feature_name: String,
}

impl UnsupportedFeature {
    pub fn new(line: usize, feature_name: impl Into<String>) -> Self {
        Self { line, feature_name: feature_name.into() }
    }
}

/// Degenerate or non-finite shape parameters.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("line {line}: invalid geometry: {reason}")]
pub struct InvalidGeometry {
    pub line: usize,
    pub reason: String,
}

impl InvalidGeometry {
    pub fn new(line: usize, reason: impl Into<String>) -> Self {
        Self { line, reason: reason.into() }
    }
}

/// The WCS collaborator could not map a region to pixel space.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("coordinate conversion failed: {reason}")]
pub struct ConversionError {
    pub reason: String,
}

impl ConversionError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Rasterization was cancelled through the caller's flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rasterization cancelled")]
pub struct Cancelled;

/// A problem found while parsing one statement. Parsing continues past all of them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Unsupported(#[from] UnsupportedFeature),
    #[error(transparent)]
    Geometry(#[from] InvalidGeometry),
}

impl Diagnostic {
    pub fn line(&self) -> usize {
        match self {
            Diagnostic::Lex(e) => e.line,
            Diagnostic::Parse(e) => e.line(),
            Diagnostic::Unsupported(e) => e.line,
            Diagnostic::Geometry(e) => e.line,
        }
    }

    /// Everything except unsupported-feature notices means text was rejected.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Diagnostic::Unsupported(_))
    }
}

/// Umbrella error for callers that propagate with `?`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegionError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Unsupported(#[from] UnsupportedFeature),
    #[error(transparent)]
    Geometry(#[from] InvalidGeometry),
    #[error("line {line}: {source}")]
    Conversion { line: usize, source: ConversionError },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl From<Diagnostic> for RegionError {
    fn from(d: Diagnostic) -> Self {
        match d {
            Diagnostic::Lex(e) => RegionError::Lex(e),
            Diagnostic::Parse(e) => RegionError::Parse(e),
            Diagnostic::Unsupported(e) => RegionError::Unsupported(e),
            Diagnostic::Geometry(e) => RegionError::Geometry(e),
        }
    }
}
