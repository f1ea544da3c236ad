//! # Shape Grammar Parser
//!
//! Turns lexed statements into [`Region`]s. The coordinate system and global
//! attributes declared so far live in a [`ParseContext`] that belongs to one parse
//! call, so separate parses never see each other's defaults.
//!
//! A bad statement never aborts the parse: it becomes a [`Diagnostic`] and the
//! parser moves on to the next statement.

use log::{debug, trace, warn};
use nom::{
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::satisfy,
    combinator::{all_consuming, map, recognize, value},
    error::context,
    sequence::pair,
    Finish,
};

use crate::attributes::{parse_attribute_prefix, parse_attribute_text, Attributes};
use crate::error::{Diagnostic, ParseError, RegionError, UnsupportedFeature};
use crate::lexer::{LineRecord, Lexer, ShapeTokens, Statement};
use crate::region::{CoordSystemTag, Param, Region, RegionList, SkyFrame};
use crate::semantic_parsers::{parse_param, ParserResult};
use crate::shape_defs::{SemanticCoordType, ShapeKind};

const COMPOSITE: &str = "composite";
const MOSAIC_TILE: &str = "mosaic tile";
const MULTI_WCS: &str = "multi-WCS";
const MOSAIC_DETECTOR: &str = "mosaic detector";

/// Per-call parse configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ParseOptions {
    /// System in effect before the file declares one. DS9 assumes `physical`.
    pub default_coord_system: CoordSystemTag,
}

/// Regions that parsed, plus everything that was skipped, in file order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseOutput {
    pub regions: RegionList,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    /// True when some statement was rejected rather than merely unsupported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    /// Treats any diagnostic, including an unsupported feature, as an error.
    pub fn strict(self) -> Result<RegionList, RegionError> {
        match self.diagnostics.into_iter().next() {
            Some(first) => Err(first.into()),
            None => Ok(self.regions),
        }
    }
}

/// Result of reading a coordinate-system keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordSystemDecl {
    Supported(CoordSystemTag),
    Unsupported(&'static str),
}

fn parse_coord_system_command<'a>(input: &'a str) -> ParserResult<'a, CoordSystemDecl> {
    use CoordSystemDecl::{Supported, Unsupported};
    context(
        "coordinate system command",
        alt((
            // wcsa..wcsz must be tried before plain `wcs`.
            value(Unsupported(MULTI_WCS), recognize(pair(tag_no_case("wcs"), satisfy(|c| c.is_ascii_alphabetic())))),
            value(Supported(CoordSystemTag::Physical), tag_no_case("physical")),
            value(Supported(CoordSystemTag::Image), tag_no_case("image")),
            value(Supported(CoordSystemTag::Sky(SkyFrame::Fk4)), alt((tag_no_case("fk4"), tag_no_case("b1950")))),
            value(Supported(CoordSystemTag::Sky(SkyFrame::Fk5)), alt((tag_no_case("fk5"), tag_no_case("j2000")))),
            value(Supported(CoordSystemTag::Sky(SkyFrame::Icrs)), tag_no_case("icrs")),
            value(Supported(CoordSystemTag::Sky(SkyFrame::Galactic)), tag_no_case("galactic")),
            value(Supported(CoordSystemTag::Sky(SkyFrame::Ecliptic)), tag_no_case("ecliptic")),
            value(Supported(CoordSystemTag::Sky(SkyFrame::Linear)), tag_no_case("linear")),
            value(Supported(CoordSystemTag::Sky(SkyFrame::Native)), tag_no_case("wcs")),
            map(alt((tag_no_case("amplifier"), tag_no_case("detector"))), |_| Unsupported(MOSAIC_DETECTOR)),
        )),
    )(input)
}

/// Classifies a directive keyword as a coordinate-system declaration, if it is one.
pub fn parse_coord_system_keyword(keyword: &str) -> Option<CoordSystemDecl> {
    all_consuming(parse_coord_system_command)(keyword).finish().ok().map(|(_, decl)| decl)
}

#[derive(Debug, Clone, PartialEq)]
enum SystemState {
    Active(CoordSystemTag),
    /// An unsupported system was declared; shapes are skipped until a supported one follows.
    Unsupported { feature_name: &'static str, last_supported: CoordSystemTag },
}

/// Defaults accumulated while parsing one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseContext {
    system: SystemState,
    global: Attributes,
    in_composite: bool,
}

impl ParseContext {
    pub fn new(options: &ParseOptions) -> Self {
        Self {
            system: SystemState::Active(options.default_coord_system),
            global: Attributes::default(),
            in_composite: false,
        }
    }

    /// The coordinate system in effect, or `None` while an unsupported one is active.
    pub fn coord_system(&self) -> Option<CoordSystemTag> {
        match self.system {
            SystemState::Active(tag) => Some(tag),
            SystemState::Unsupported { .. } => None,
        }
    }

    pub fn global_attributes(&self) -> &Attributes {
        &self.global
    }

    /// Applies every statement of one lexed line, then records its lex error, if any.
    pub fn feed(&mut self, record: &LineRecord<'_>, out: &mut ParseOutput) {
        for statement in &record.statements {
            let result = match statement {
                Statement::Directive { keyword, args } => self.directive(record.line, keyword, args),
                Statement::Shape(shape) => self.shape(record.line, shape).map(|region| {
                    trace!("line {}: {} in {}", record.line, region, region.coord_system());
                    out.regions.push(region);
                }),
            };
            if let Err(diagnostic) = result {
                warn!("skipping statement: {diagnostic}");
                out.diagnostics.push(diagnostic);
            }
        }
        if let Some(error) = &record.error {
            warn!("skipping rest of line: {error}");
            out.diagnostics.push(error.clone().into());
        }
    }

    fn finish(self, out: &mut ParseOutput) {
        let system = match self.system {
            SystemState::Active(tag) => tag,
            SystemState::Unsupported { last_supported, .. } => last_supported,
        };
        out.regions.set_defaults(system, self.global);
    }

    fn directive(&mut self, line: usize, keyword: &str, args: &str) -> Result<(), Diagnostic> {
        if keyword.eq_ignore_ascii_case("global") {
            let attrs = parse_attribute_text(args)
                .map_err(|_| ParseError::InvalidAttribute { line, text: args.to_string() })?;
            self.global = attrs.merged_over(&self.global);
            return Ok(());
        }
        if keyword.eq_ignore_ascii_case("tile") {
            return Err(UnsupportedFeature::new(line, MOSAIC_TILE).into());
        }
        if let Some(decl) = parse_coord_system_keyword(keyword) {
            if !args.is_empty() {
                return Err(ParseError::InvalidParameter {
                    line,
                    index: 1,
                    text: args.to_string(),
                    reason: format!("'{keyword}' takes no arguments"),
                }
                .into());
            }
            return match decl {
                CoordSystemDecl::Supported(tag) => {
                    self.system = SystemState::Active(tag);
                    Ok(())
                }
                CoordSystemDecl::Unsupported(feature_name) => {
                    let last_supported = match self.system {
                        SystemState::Active(tag) => tag,
                        SystemState::Unsupported { last_supported, .. } => last_supported,
                    };
                    self.system = SystemState::Unsupported { feature_name, last_supported };
                    Err(UnsupportedFeature::new(line, feature_name).into())
                }
            };
        }
        if ShapeKind::from_keyword(keyword).is_some() {
            return Err(ParseError::InvalidParameter {
                line,
                index: 1,
                text: args.to_string(),
                reason: "shape parameters must be enclosed in parentheses".to_string(),
            }
            .into());
        }
        Err(UnsupportedFeature::new(line, keyword.to_ascii_lowercase()).into())
    }

    fn shape(&mut self, line: usize, tokens: &ShapeTokens<'_>) -> Result<Region, Diagnostic> {
        let kind = ShapeKind::from_keyword(tokens.keyword);

        // Composite headers and members are skipped up to the first statement without `||`.
        let in_group = self.in_composite || tokens.continued || kind == Some(ShapeKind::Composite);
        self.in_composite = tokens.continued;
        if in_group {
            return Err(UnsupportedFeature::new(line, COMPOSITE).into());
        }

        let Some(kind) = kind else {
            if tokens.keyword.eq_ignore_ascii_case("template") {
                return Err(UnsupportedFeature::new(line, "template").into());
            }
            return Err(ParseError::UnknownShape { line, keyword: tokens.keyword.to_string() }.into());
        };
        let system = match self.system {
            SystemState::Active(tag) => tag,
            SystemState::Unsupported { feature_name, .. } => {
                return Err(UnsupportedFeature::new(line, feature_name).into())
            }
        };
        let Some(signature) = kind.signature() else {
            return Err(UnsupportedFeature::new(line, kind.name()).into());
        };

        let raw = split_params(line, tokens.params)?;
        let Some(roles) = signature.layout(raw.len()) else {
            return Err(ParseError::Arity {
                line,
                shape: signature.name,
                expected: signature.arity(),
                got: raw.len(),
            }
            .into());
        };
        let params = roles
            .iter()
            .zip(&raw)
            .enumerate()
            .map(|(idx, (role, token))| {
                parse_param(*role, system, token).map_err(|trace_text| {
                    trace!("line {line}: nom trace for '{token}':\n{trace_text}");
                    ParseError::InvalidParameter {
                        line,
                        index: idx + 1,
                        text: token.to_string(),
                        reason: format!("not a valid {}", role_description(*role)),
                    }
                })
            })
            .collect::<Result<Vec<Param>, ParseError>>()?;

        let local = match tokens.attributes {
            Some(segment) => shape_attributes(line, segment)?,
            None => Attributes::default(),
        };
        let attributes = local.merged_over(&self.global);

        Region::new(kind, params, system, tokens.sign, attributes, line)
    }
}

fn role_description(role: SemanticCoordType) -> &'static str {
    match role {
        SemanticCoordType::CoordOdd => "longitude-like coordinate",
        SemanticCoordType::CoordEven => "latitude-like coordinate",
        SemanticCoordType::Distance => "distance",
        SemanticCoordType::Angle => "angle",
        SemanticCoordType::Integer => "integer",
    }
}

/// Splits on commas when there are any, otherwise on whitespace.
fn split_params(line: usize, params: &str) -> Result<Vec<&str>, ParseError> {
    let params = params.trim();
    if params.is_empty() {
        return Ok(Vec::new());
    }
    if !params.contains(',') {
        return Ok(params.split_whitespace().collect());
    }
    params
        .split(',')
        .map(str::trim)
        .enumerate()
        .map(|(idx, token)| {
            if token.is_empty() {
                Err(ParseError::InvalidParameter {
                    line,
                    index: idx + 1,
                    text: String::new(),
                    reason: "empty parameter".to_string(),
                })
            } else {
                Ok(token)
            }
        })
        .collect()
}

/// Attributes after a shape. Trailing free text is tolerated; a broken
/// `key=value` pair is not.
fn shape_attributes(line: usize, segment: &str) -> Result<Attributes, ParseError> {
    if let Ok(attrs) = parse_attribute_text(segment) {
        return Ok(attrs);
    }
    let (attrs, rest) = parse_attribute_prefix(segment);
    let first_word = rest.split_whitespace().next().unwrap_or("");
    if first_word.contains('=') {
        return Err(ParseError::InvalidAttribute { line, text: segment.to_string() });
    }
    trace!("line {line}: treating '{rest}' as free comment text");
    Ok(attrs)
}

/// Parses a whole region file with DS9 defaults.
pub fn parse_regions(text: &str) -> ParseOutput {
    parse_regions_with(text, &ParseOptions::default())
}

pub fn parse_regions_with(text: &str, options: &ParseOptions) -> ParseOutput {
    let mut ctx = ParseContext::new(options);
    let mut out = ParseOutput::default();
    for record in Lexer::new(text).records() {
        ctx.feed(&record, &mut out);
    }
    ctx.finish(&mut out);
    debug!(
        "parsed {} regions with {} diagnostics ({} fatal)",
        out.regions.len(),
        out.diagnostics.len(),
        out.diagnostics.iter().filter(|d| d.is_fatal()).count()
    );
    out
}
