//! # Semantic Value Parsers
//!
//! One nom grammar per parameter role (see [`SemanticCoordType`]). Every parser
//! produces a [`Param`] that keeps the unit the value was written in; sexagesimal
//! forms are folded into decimal degrees here, since that is pure arithmetic.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::{char as nom_char, multispace0},
    combinator::{all_consuming, map, opt, verify},
    error::{context, convert_error, VerboseError},
    number::complete::double,
    sequence::{pair, preceded, terminated, tuple},
    Finish, IResult,
};

use crate::region::{CoordSystemTag, Param, Unit};
use crate::shape_defs::SemanticCoordType;

pub(crate) type Input<'a> = &'a str;
pub(crate) type NomVerboseError<'a> = VerboseError<&'a str>;
pub(crate) type ParserResult<'a, O> = IResult<Input<'a>, O, NomVerboseError<'a>>;

pub(crate) fn ws<'a>(input: Input<'a>) -> ParserResult<'a, &'a str> {
    multispace0(input)
}

// --- Helper Parsers for Numbers ---

fn parse_optional_sign<'a>(input: Input<'a>) -> ParserResult<'a, Option<char>> {
    opt(alt((nom_char('+'), nom_char('-'))))(input)
}

/// A signed decimal with optional surrounding whitespace.
fn parse_simple_signed_f64_ws<'a>(input: Input<'a>) -> ParserResult<'a, f64> {
    context("simple signed f64", preceded(ws, terminated(double, ws)))(input)
}

/// A number with no fractional part, e.g. the sector count of a panda.
fn parse_integer_value_as_f64_ws<'a>(input: Input<'a>) -> ParserResult<'a, f64> {
    context(
        "integer as f64",
        preceded(ws, terminated(verify(double, |val: &f64| val.fract() == 0.0), ws)),
    )(input)
}

// --- Sexagesimal and Unit-suffixed Forms ---

/// `HHh[MMm[SSs]]` or `DDd[MMm[SSs]]`, scaled by `scale` (15 for hours).
fn parse_sexagesimal_units_format<'a>(
    primary_unit_static_tag: &'static str,
    scale: f64,
    ctx_label: &'static str,
) -> impl FnMut(Input<'a>) -> ParserResult<'a, f64> {
    move |i: Input<'a>| {
        context(
            ctx_label,
            map(
                tuple((
                    parse_optional_sign,
                    double,
                    tag_no_case(primary_unit_static_tag),
                    opt(preceded(
                        multispace0,
                        tuple((
                            double,
                            tag_no_case("m"),
                            opt(preceded(multispace0, pair(double, tag_no_case("s")))),
                        )),
                    )),
                )),
                |(sign_opt, v1, _, minutes_seconds_opt)| {
                    let mut total_value = v1;
                    if let Some((v2, _, seconds_opt)) = minutes_seconds_opt {
                        total_value += v2 / 60.0;
                        if let Some((v3, _)) = seconds_opt {
                            total_value += v3 / 3600.0;
                        }
                    }
                    let signed = if sign_opt == Some('-') { -total_value } else { total_value };
                    signed * scale
                },
            ),
        )(i)
    }
}

/// `V1:V2[:V3]`, scaled by `scale`.
fn parse_colon_sexagesimal_format<'a>(
    scale: f64,
    ctx_label: &'static str,
) -> impl FnMut(Input<'a>) -> ParserResult<'a, f64> {
    move |i: Input<'a>| {
        context(
            ctx_label,
            map(
                tuple((
                    parse_optional_sign,
                    double,
                    nom_char(':'),
                    double,
                    opt(preceded(nom_char(':'), double)),
                )),
                |(sign_opt, v1, _, v2, v3_opt)| {
                    let mut total_value = v1 + v2 / 60.0;
                    if let Some(v3) = v3_opt {
                        total_value += v3 / 3600.0;
                    }
                    let signed = if sign_opt == Some('-') { -total_value } else { total_value };
                    signed * scale
                },
            ),
        )(i)
    }
}

fn parse_unit_suffix<'a>(input: Input<'a>) -> ParserResult<'a, Unit> {
    alt((
        map(tag_no_case("d"), |_| Unit::Degree),
        map(tag_no_case("r"), |_| Unit::Radian),
        map(tag("\""), |_| Unit::Arcsec),
        map(tag("'"), |_| Unit::Arcmin),
        map(alt((tag_no_case("p"), tag_no_case("i"))), |_| Unit::Pixel),
    ))(input)
}

/// A number followed by one of `d r ' " p i`. The unit is kept, not applied.
fn parse_value_with_unit<'a>(input: Input<'a>) -> ParserResult<'a, Param> {
    context(
        "value with unit",
        map(pair(double, parse_unit_suffix), |(value, unit)| Param::new(value, unit)),
    )(input)
}

fn parse_bare<'a>(input: Input<'a>) -> ParserResult<'a, Param> {
    map(double, Param::bare)(input)
}

// --- Semantic Coordinate Parsers ---

/// Colon forms on the longitude of an equatorial frame are hours.
fn colon_scale_for_odd(system: CoordSystemTag) -> f64 {
    match system {
        CoordSystemTag::Sky(frame) if frame.is_equatorial() => 15.0,
        _ => 1.0,
    }
}

pub(crate) fn parse_coord_odd<'a>(system: CoordSystemTag, input: Input<'a>) -> ParserResult<'a, Param> {
    let colon_scale = colon_scale_for_odd(system);
    context(
        "CoordOdd (RA-like)",
        preceded(
            ws,
            terminated(
                alt((
                    map(parse_sexagesimal_units_format("h", 15.0, "HMS format (e.g., 10h20m30s)"), |v| {
                        Param::new(v, Unit::Degree)
                    }),
                    map(parse_sexagesimal_units_format("d", 1.0, "DMS format (e.g., 10d20m30s)"), |v| {
                        Param::new(v, Unit::Degree)
                    }),
                    map(parse_colon_sexagesimal_format(colon_scale, "Colon-separated sexagesimal"), |v| {
                        Param::new(v, Unit::Degree)
                    }),
                    parse_value_with_unit,
                    parse_bare,
                )),
                ws,
            ),
        ),
    )(input)
}

pub(crate) fn parse_coord_even<'a>(input: Input<'a>) -> ParserResult<'a, Param> {
    context(
        "CoordEven (Dec-like)",
        preceded(
            ws,
            terminated(
                alt((
                    map(parse_sexagesimal_units_format("d", 1.0, "DMS format (e.g., +10d20m30s)"), |v| {
                        Param::new(v, Unit::Degree)
                    }),
                    map(parse_colon_sexagesimal_format(1.0, "Colon-separated DMS"), |v| {
                        Param::new(v, Unit::Degree)
                    }),
                    parse_value_with_unit,
                    parse_bare,
                )),
                ws,
            ),
        ),
    )(input)
}

pub(crate) fn parse_distance<'a>(input: Input<'a>) -> ParserResult<'a, Param> {
    context("Distance", preceded(ws, terminated(alt((parse_value_with_unit, parse_bare)), ws)))(input)
}

pub(crate) fn parse_angle<'a>(input: Input<'a>) -> ParserResult<'a, Param> {
    context(
        "Angle",
        alt((
            preceded(
                ws,
                terminated(
                    map(
                        pair(
                            double,
                            alt((map(tag_no_case("d"), |_| Unit::Degree), map(tag_no_case("r"), |_| Unit::Radian))),
                        ),
                        |(value, unit)| Param::new(value, unit),
                    ),
                    ws,
                ),
            ),
            map(parse_simple_signed_f64_ws, Param::bare),
        )),
    )(input)
}

pub(crate) fn parse_integer<'a>(input: Input<'a>) -> ParserResult<'a, Param> {
    map(parse_integer_value_as_f64_ws, Param::bare)(input)
}

/// Picks the value grammar for `role` under the coordinate system in effect.
pub(crate) fn dispatch_semantic_parser<'a>(
    role: SemanticCoordType,
    system: CoordSystemTag,
) -> impl FnMut(Input<'a>) -> ParserResult<'a, Param> {
    move |i: Input<'a>| match role {
        SemanticCoordType::CoordOdd => parse_coord_odd(system, i),
        SemanticCoordType::CoordEven => parse_coord_even(i),
        SemanticCoordType::Distance => parse_distance(i),
        SemanticCoordType::Angle => parse_angle(i),
        SemanticCoordType::Integer => parse_integer(i),
    }
}

/// Parses one whole parameter token. The error is nom's rendered trace.
pub fn parse_param(role: SemanticCoordType, system: CoordSystemTag, token: &str) -> Result<Param, String> {
    match all_consuming(dispatch_semantic_parser(role, system))(token).finish() {
        Ok((_, param)) => Ok(param),
        Err(e) => Err(convert_error(token, e)),
    }
}
