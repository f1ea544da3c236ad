//! # Region Model
//!
//! Parsed regions as they appear in the file: every parameter keeps the unit
//! it was written with, and every region remembers the coordinate system that
//! was in effect for it. Conversion to pixel space happens in [`crate::resolve`].

use std::fmt;
use std::ops::Index;

use crate::attributes::Attributes;
use crate::error::{Diagnostic, InvalidGeometry, ParseError, UnsupportedFeature};
use crate::shape_defs::{SemanticCoordType, ShapeKind};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Unit {
    Pixel,
    Degree,
    Arcmin,
    Arcsec,
    Radian,
    /// Written without a suffix; meaning depends on the coordinate system.
    None,
}

impl Unit {
    pub fn is_angular(self) -> bool {
        matches!(self, Unit::Degree | Unit::Arcmin | Unit::Arcsec | Unit::Radian)
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Pixel => "p",
            Unit::Degree => "d",
            Unit::Arcmin => "'",
            Unit::Arcsec => "\"",
            Unit::Radian => "r",
            Unit::None => "",
        }
    }
}

/// One numeric parameter with the unit it was written in.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Param {
    pub value: f64,
    pub unit: Unit,
}

impl Param {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn bare(value: f64) -> Self {
        Self { value, unit: Unit::None }
    }

    /// The value in degrees, if the unit is angular.
    pub fn degrees(&self) -> Option<f64> {
        match self.unit {
            Unit::Degree => Some(self.value),
            Unit::Arcmin => Some(self.value / 60.0),
            Unit::Arcsec => Some(self.value / 3600.0),
            Unit::Radian => Some(self.value.to_degrees()),
            Unit::Pixel | Unit::None => None,
        }
    }

    /// Whether the value is an angle once bare numbers are interpreted for `system`.
    pub fn is_angular_in(&self, system: &CoordSystemTag) -> bool {
        self.unit.is_angular() || (self.unit == Unit::None && system.is_sky())
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub enum Sign {
    #[default]
    Include,
    Exclude,
}

/// Astronomical reference frames. Only the WCS collaborator interprets them.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum SkyFrame {
    Fk4,
    Fk5,
    Icrs,
    Galactic,
    Ecliptic,
    Linear,
    /// `wcs`: whatever frame the image's own WCS is expressed in.
    Native,
}

impl SkyFrame {
    pub fn name(self) -> &'static str {
        match self {
            SkyFrame::Fk4 => "fk4",
            SkyFrame::Fk5 => "fk5",
            SkyFrame::Icrs => "icrs",
            SkyFrame::Galactic => "galactic",
            SkyFrame::Ecliptic => "ecliptic",
            SkyFrame::Linear => "linear",
            SkyFrame::Native => "wcs",
        }
    }

    /// Frames whose longitude is conventionally written in hours.
    pub fn is_equatorial(self) -> bool {
        matches!(self, SkyFrame::Fk4 | SkyFrame::Fk5 | SkyFrame::Icrs | SkyFrame::Native)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
pub enum CoordSystemTag {
    Image,
    #[default]
    Physical,
    Sky(SkyFrame),
}

impl CoordSystemTag {
    pub fn is_sky(&self) -> bool {
        matches!(self, CoordSystemTag::Sky(_))
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            CoordSystemTag::Image => "image",
            CoordSystemTag::Physical => "physical",
            CoordSystemTag::Sky(frame) => frame.name(),
        }
    }
}

impl fmt::Display for CoordSystemTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A single shape statement. Fields are fixed at construction; [`Region::new`]
/// guarantees the parameter count matches the kind and that the geometry is usable.
#[derive(Debug, PartialEq, Clone)]
pub struct Region {
    kind: ShapeKind,
    params: Vec<Param>,
    coord_system: CoordSystemTag,
    sign: Sign,
    attributes: Attributes,
    source_line: usize,
}

impl Region {
    pub fn new(
        kind: ShapeKind,
        params: Vec<Param>,
        coord_system: CoordSystemTag,
        sign: Sign,
        attributes: Attributes,
        source_line: usize,
    ) -> Result<Self, Diagnostic> {
        let Some(signature) = kind.signature() else {
            return Err(UnsupportedFeature::new(source_line, kind.name()).into());
        };
        let Some(roles) = signature.layout(params.len()) else {
            return Err(ParseError::Arity {
                line: source_line,
                shape: signature.name,
                expected: signature.arity(),
                got: params.len(),
            }
            .into());
        };
        check_position_units(&roles, &params, &coord_system, source_line)?;
        check_geometry(kind, &params, &coord_system, source_line)?;
        Ok(Self { kind, params, coord_system, sign, attributes, source_line })
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn coord_system(&self) -> CoordSystemTag {
        self.coord_system
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn is_excluded(&self) -> bool {
        self.sign == Sign::Exclude
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn source_line(&self) -> usize {
        self.source_line
    }

    /// Parameter roles, one per entry of [`Region::params`].
    pub fn roles(&self) -> Vec<SemanticCoordType> {
        // Arity was checked in `new`.
        self.kind
            .signature()
            .and_then(|sig| sig.layout(self.params.len()))
            .unwrap_or_default()
    }
}

/// Statement text without the coordinate system, e.g. `-circle(1,2,3") # color=red`.
impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_excluded() {
            f.write_str("-")?;
        }
        write!(f, "{}(", self.kind.name())?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")?;
        let attrs = self.attributes.to_ds9_string();
        if !attrs.is_empty() {
            write!(f, " # {attrs}")?;
        }
        Ok(())
    }
}

fn check_position_units(
    roles: &[SemanticCoordType],
    params: &[Param],
    system: &CoordSystemTag,
    line: usize,
) -> Result<(), Diagnostic> {
    let mut pending_odd: Option<&Param> = None;
    for (role, param) in roles.iter().zip(params) {
        match role {
            SemanticCoordType::CoordOdd => pending_odd = Some(param),
            SemanticCoordType::CoordEven => {
                if let Some(odd) = pending_odd.take() {
                    if odd.is_angular_in(system) != param.is_angular_in(system) {
                        return Err(ParseError::InconsistentUnits { line }.into());
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_geometry(kind: ShapeKind, params: &[Param], system: &CoordSystemTag, line: usize) -> Result<(), Diagnostic> {
    let invalid = |reason: &str| -> Result<(), Diagnostic> { Err(InvalidGeometry::new(line, reason).into()) };
    if params.iter().any(|p| !p.value.is_finite()) {
        return invalid("non-finite parameter");
    }
    let v: Vec<f64> = params.iter().map(|p| p.value).collect();
    match kind {
        ShapeKind::Circle if v[2] <= 0.0 => invalid("circle radius must be positive"),
        ShapeKind::Annulus => {
            // Radii may come in any order; the shape spans the smallest to the largest.
            let radii = &v[2..];
            if radii.iter().any(|r| *r < 0.0) {
                return invalid("annulus radii must not be negative");
            }
            if radii.iter().all(|r| *r <= 0.0) {
                return invalid("annulus outer radius must be positive");
            }
            Ok(())
        }
        ShapeKind::Ellipse if v[2..v.len() - 1].iter().any(|r| *r <= 0.0) => {
            invalid("ellipse radii must be positive")
        }
        ShapeKind::Box | ShapeKind::RotBox if v[2..v.len() - 1].iter().any(|s| *s <= 0.0) => {
            invalid("box with zero or negative extent")
        }
        ShapeKind::Polygon => {
            let area2: f64 = (0..v.len() / 2)
                .map(|i| {
                    let j = (i + 1) % (v.len() / 2);
                    v[2 * i] * v[2 * j + 1] - v[2 * j] * v[2 * i + 1]
                })
                .sum();
            if area2 == 0.0 {
                invalid("polygon has zero area")
            } else {
                Ok(())
            }
        }
        ShapeKind::Pie => check_radial_range(&params[2], &params[3], system, invalid),
        ShapeKind::Panda => {
            if v[4] < 1.0 || v[7] < 1.0 {
                return invalid("panda needs at least one angle and one radius");
            }
            check_radial_range(&params[5], &params[6], system, invalid)
        }
        ShapeKind::Epanda | ShapeKind::Bpanda => {
            if v[4] < 1.0 || v[9] < 1.0 {
                return invalid("panda needs at least one angle and one radius");
            }
            check_radial_range(&params[5], &params[7], system, &invalid)?;
            check_radial_range(&params[6], &params[8], system, &invalid)
        }
        _ => Ok(()),
    }
}

/// A length on a scale shared by every unit of its kind: degrees for angular
/// lengths, the written number for pixel lengths.
fn comparable_length(p: &Param, system: &CoordSystemTag) -> (bool, f64) {
    match p.degrees() {
        Some(d) => (true, d),
        None => (p.is_angular_in(system), p.value),
    }
}

/// Signs are checked as written. Order is only checked when both radii are the
/// same kind of length; mixed pixel and angular radii wait for resolution.
fn check_radial_range(
    inner: &Param,
    outer: &Param,
    system: &CoordSystemTag,
    invalid: impl Fn(&str) -> Result<(), Diagnostic>,
) -> Result<(), Diagnostic> {
    let (inner_angular, inner_len) = comparable_length(inner, system);
    let (outer_angular, outer_len) = comparable_length(outer, system);
    if inner.value < 0.0 {
        invalid("inner radius must not be negative")
    } else if outer.value <= 0.0 || (inner_angular == outer_angular && outer_len < inner_len) {
        invalid("outer radius must be positive and not smaller than the inner radius")
    } else {
        Ok(())
    }
}

/// Regions in file order, plus the defaults that were in effect when parsing ended.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct RegionList {
    regions: Vec<Region>,
    coord_system: CoordSystemTag,
    global: Attributes,
}

impl RegionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, region: Region) {
        self.regions.push(region);
    }

    pub(crate) fn set_defaults(&mut self, coord_system: CoordSystemTag, global: Attributes) {
        self.coord_system = coord_system;
        self.global = global;
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn as_slice(&self) -> &[Region] {
        &self.regions
    }

    /// Coordinate system in effect at the end of the file.
    pub fn final_coord_system(&self) -> CoordSystemTag {
        self.coord_system
    }

    /// Global attributes in effect at the end of the file.
    pub fn global_attributes(&self) -> &Attributes {
        &self.global
    }

    /// Serializes back to DS9 text, declaring the coordinate system whenever it changes.
    pub fn to_ds9_string(&self) -> String {
        let mut out = String::from("# Region file format: DS9 version 4.1\n");
        let mut current: Option<CoordSystemTag> = None;
        for region in &self.regions {
            if current != Some(region.coord_system) {
                out.push_str(region.coord_system.keyword());
                out.push('\n');
                current = Some(region.coord_system);
            }
            out.push_str(&region.to_string());
            out.push('\n');
        }
        out
    }
}

impl Index<usize> for RegionList {
    type Output = Region;

    fn index(&self, index: usize) -> &Region {
        &self.regions[index]
    }
}

impl<'a> IntoIterator for &'a RegionList {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}

impl IntoIterator for RegionList {
    type Item = Region;
    type IntoIter = std::vec::IntoIter<Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(values: &[f64]) -> Vec<Param> {
        values.iter().copied().map(Param::bare).collect()
    }

    fn build(kind: ShapeKind, values: &[f64]) -> Result<Region, Diagnostic> {
        Region::new(kind, bare(values), CoordSystemTag::Image, Sign::Include, Attributes::default(), 1)
    }

    #[test]
    fn test_param_degrees() {
        assert_eq!(Param::new(30.0, Unit::Arcmin).degrees(), Some(0.5));
        assert_eq!(Param::new(36.0, Unit::Arcsec).degrees(), Some(0.01));
        assert_eq!(Param::new(2.0, Unit::Degree).degrees(), Some(2.0));
        assert!((Param::new(1.0, Unit::Radian).degrees().unwrap() - 57.29577951308232).abs() < 1e-12);
        assert_eq!(Param::bare(4.0).degrees(), None);
        assert_eq!(Param::new(4.0, Unit::Pixel).degrees(), None);
    }

    #[test]
    fn test_bare_numbers_are_angular_only_in_sky_frames() {
        let p = Param::bare(1.0);
        assert!(!p.is_angular_in(&CoordSystemTag::Image));
        assert!(p.is_angular_in(&CoordSystemTag::Sky(SkyFrame::Fk5)));
    }

    #[test]
    fn test_region_new_checks_arity() {
        let err = build(ShapeKind::Circle, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            Diagnostic::Parse(ParseError::Arity { got: 2, expected: crate::error::Arity::Exact(3), .. })
        ));
    }

    #[test]
    fn test_region_new_rejects_composite() {
        let err = build(ShapeKind::Composite, &[1.0, 2.0, 0.0]).unwrap_err();
        assert!(matches!(err, Diagnostic::Unsupported(_)));
    }

    #[test]
    fn test_invalid_geometry_cases() {
        let cases: &[(ShapeKind, &[f64])] = &[
            (ShapeKind::Circle, &[1.0, 2.0, -3.0]),
            (ShapeKind::Circle, &[1.0, 2.0, 0.0]),
            (ShapeKind::Circle, &[1.0, f64::NAN, 3.0]),
            (ShapeKind::Box, &[1.0, 2.0, 0.0, 4.0, 0.0]),
            (ShapeKind::Ellipse, &[1.0, 2.0, 3.0, -1.0, 0.0]),
            (ShapeKind::Annulus, &[1.0, 2.0, 0.0, 0.0]),
            (ShapeKind::Annulus, &[1.0, 2.0, 3.0, -1.0]),
            (ShapeKind::Polygon, &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]),
            (ShapeKind::Panda, &[0.0, 0.0, 0.0, 90.0, 0.0, 1.0, 2.0, 1.0]),
            (ShapeKind::Pie, &[0.0, 0.0, 5.0, 2.0, 0.0, 90.0]),
        ];
        for (kind, values) in cases {
            let result = build(*kind, values);
            assert!(
                matches!(result, Err(Diagnostic::Geometry(_))),
                "{:?} {:?} should be invalid geometry, got {:?}",
                kind,
                values,
                result
            );
        }
    }

    #[test]
    fn test_radii_compare_across_angular_units() {
        let fk5 = CoordSystemTag::Sky(SkyFrame::Fk5);
        let sky = |kind: ShapeKind, params: Vec<Param>| {
            Region::new(kind, params, fk5, Sign::Include, Attributes::default(), 1)
        };
        let (arcsec, arcmin) = (Param::new(30.0, Unit::Arcsec), Param::new(1.0, Unit::Arcmin));
        let head = [Param::bare(202.5), Param::bare(47.2)];

        let pie = |inner: Param, outer: Param| {
            let mut p = head.to_vec();
            p.extend([inner, outer, Param::bare(0.0), Param::bare(90.0)]);
            sky(ShapeKind::Pie, p)
        };
        assert!(pie(arcsec, arcmin).is_ok());
        assert!(matches!(pie(arcmin, arcsec), Err(Diagnostic::Geometry(_))));
        assert!(pie(Param::bare(0.001), arcmin).is_ok());
        assert!(matches!(pie(Param::bare(0.1), arcmin), Err(Diagnostic::Geometry(_))));
        assert!(pie(Param::new(40.0, Unit::Pixel), arcmin).is_ok());

        let mut panda = head.to_vec();
        panda.extend([Param::bare(0.0), Param::bare(90.0), Param::bare(1.0), arcsec, arcmin, Param::bare(1.0)]);
        assert!(sky(ShapeKind::Panda, panda).is_ok());

        let mut annulus = head.to_vec();
        annulus.extend([arcmin, arcsec]);
        assert!(sky(ShapeKind::Annulus, annulus).is_ok());
    }

    #[test]
    fn test_inconsistent_pair_units() {
        let params = vec![Param::new(4.0, Unit::Degree), Param::bare(400.0), Param::bare(3.0)];
        let err = Region::new(ShapeKind::Circle, params, CoordSystemTag::Image, Sign::Include, Attributes::default(), 9)
            .unwrap_err();
        assert_eq!(err, Diagnostic::Parse(ParseError::InconsistentUnits { line: 9 }));
    }

    #[test]
    fn test_region_display() {
        let params =
            vec![Param::new(10.5, Unit::Degree), Param::new(-3.25, Unit::Degree), Param::new(4.0, Unit::Arcsec)];
        let region = Region::new(
            ShapeKind::Circle,
            params,
            CoordSystemTag::Sky(SkyFrame::Fk5),
            Sign::Exclude,
            Attributes::default(),
            1,
        )
        .unwrap();
        assert_eq!(region.to_string(), "-circle(10.5d,-3.25d,4\")");
    }

    #[test]
    fn test_region_list_serialization_declares_systems() {
        let mut list = RegionList::new();
        list.push(build(ShapeKind::Circle, &[1.0, 2.0, 3.0]).unwrap());
        list.push(build(ShapeKind::Point, &[4.0, 5.0]).unwrap());
        let text = list.to_ds9_string();
        assert_eq!(text, "# Region file format: DS9 version 4.1\nimage\ncircle(1,2,3)\npoint(4,5)\n");
    }
}
