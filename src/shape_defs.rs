//! # Shape Definitions
//!
//! The closed set of shape keywords and, for each one, the positional layout of
//! its parameters. Layouts are expressed as a fixed head, an optional repeated
//! unit, and a fixed tail, which covers both fixed-arity shapes (`circle`) and
//! variadic ones (`polygon`, `annulus`, the annulus forms of `ellipse`/`box`).

use crate::error::Arity;

/// Role of one positional parameter. Decides which value grammar applies
/// and how the resolver maps the value into pixel space.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum SemanticCoordType {
    /// Longitude-like position (x, RA, l).
    CoordOdd,
    /// Latitude-like position (y, Dec, b).
    CoordEven,
    Distance,
    Angle,
    Integer,
}

#[derive(Debug, Clone)]
pub struct ShapeSignature {
    pub name: &'static str,
    pub fixed_head: &'static [SemanticCoordType],
    pub repeat_unit: Option<&'static [SemanticCoordType]>,
    pub min_repeats: usize,
    pub max_repeats: Option<usize>,
    pub fixed_tail: &'static [SemanticCoordType],
}

impl ShapeSignature {
    pub fn arity(&self) -> Arity {
        let fixed = self.fixed_head.len() + self.fixed_tail.len();
        match self.repeat_unit {
            Some(unit) => Arity::Repeating { fixed, unit: unit.len(), min_repeats: self.min_repeats },
            None => Arity::Exact(fixed),
        }
    }

    /// Number of repeat units for `n` parameters, or `None` if `n` does not fit.
    pub fn repeats_for(&self, n: usize) -> Option<usize> {
        let fixed = self.fixed_head.len() + self.fixed_tail.len();
        match self.repeat_unit {
            None => (n == fixed).then_some(0),
            Some(unit) => {
                let rest = n.checked_sub(fixed)?;
                if unit.is_empty() || rest % unit.len() != 0 {
                    return None;
                }
                let repeats = rest / unit.len();
                let too_many = self.max_repeats.is_some_and(|max| repeats > max);
                (repeats >= self.min_repeats && !too_many).then_some(repeats)
            }
        }
    }

    /// Expands the signature into one role per parameter for a list of `n` parameters.
    pub fn layout(&self, n: usize) -> Option<Vec<SemanticCoordType>> {
        let repeats = self.repeats_for(n)?;
        let mut roles = Vec::with_capacity(n);
        roles.extend_from_slice(self.fixed_head);
        if let Some(unit) = self.repeat_unit {
            for _ in 0..repeats {
                roles.extend_from_slice(unit);
            }
        }
        roles.extend_from_slice(self.fixed_tail);
        Some(roles)
    }
}

/// Every shape keyword the grammar knows about.
///
/// `Composite` is recognized only so that it can be rejected by name; it never
/// reaches a [`Region`](crate::Region).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ShapeKind {
    Circle,
    Ellipse,
    Box,
    RotBox,
    Polygon,
    Annulus,
    Pie,
    Panda,
    Epanda,
    Bpanda,
    Point,
    Line,
    Vector,
    Text,
    Ruler,
    Composite,
}

impl ShapeKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let kind = match keyword.to_ascii_lowercase().as_str() {
            "circle" => ShapeKind::Circle,
            "ellipse" => ShapeKind::Ellipse,
            "box" => ShapeKind::Box,
            "rotbox" => ShapeKind::RotBox,
            "polygon" => ShapeKind::Polygon,
            "annulus" => ShapeKind::Annulus,
            "pie" => ShapeKind::Pie,
            "panda" => ShapeKind::Panda,
            "epanda" => ShapeKind::Epanda,
            "bpanda" => ShapeKind::Bpanda,
            "point" => ShapeKind::Point,
            "line" => ShapeKind::Line,
            "vector" => ShapeKind::Vector,
            "text" => ShapeKind::Text,
            "ruler" => ShapeKind::Ruler,
            "composite" => ShapeKind::Composite,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Circle => "circle",
            ShapeKind::Ellipse => "ellipse",
            ShapeKind::Box => "box",
            ShapeKind::RotBox => "rotbox",
            ShapeKind::Polygon => "polygon",
            ShapeKind::Annulus => "annulus",
            ShapeKind::Pie => "pie",
            ShapeKind::Panda => "panda",
            ShapeKind::Epanda => "epanda",
            ShapeKind::Bpanda => "bpanda",
            ShapeKind::Point => "point",
            ShapeKind::Line => "line",
            ShapeKind::Vector => "vector",
            ShapeKind::Text => "text",
            ShapeKind::Ruler => "ruler",
            ShapeKind::Composite => "composite",
        }
    }

    /// Zero-area shapes: drawn in overlays, never part of a mask.
    pub fn is_marker(self) -> bool {
        matches!(
            self,
            ShapeKind::Point | ShapeKind::Line | ShapeKind::Vector | ShapeKind::Text | ShapeKind::Ruler
        )
    }

    pub fn signature(self) -> Option<&'static ShapeSignature> {
        let sig = match self {
            ShapeKind::Circle => &CIRCLE_SIG,
            ShapeKind::Ellipse => &ELLIPSE_SIG,
            ShapeKind::Box => &BOX_SIG,
            ShapeKind::RotBox => &ROTBOX_SIG,
            ShapeKind::Polygon => &POLYGON_SIG,
            ShapeKind::Annulus => &ANNULUS_SIG,
            ShapeKind::Pie => &PIE_SIG,
            ShapeKind::Panda => &PANDA_SIG,
            ShapeKind::Epanda => &EPANDA_SIG,
            ShapeKind::Bpanda => &BPANDA_SIG,
            ShapeKind::Point => &POINT_SIG,
            ShapeKind::Line => &LINE_SIG,
            ShapeKind::Vector => &VECTOR_SIG,
            ShapeKind::Text => &TEXT_SIG,
            ShapeKind::Ruler => &RULER_SIG,
            ShapeKind::Composite => return None,
        };
        Some(sig)
    }
}

macro_rules! sct_slice { ($($x:expr),* $(,)?) => { &[$($x),*] } }
use SemanticCoordType::*;
#[rustfmt::skip]
static CIRCLE_SIG: ShapeSignature = ShapeSignature { name: "circle", fixed_head: sct_slice![CoordOdd, CoordEven, Distance], repeat_unit: None, min_repeats: 0, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static ELLIPSE_SIG: ShapeSignature = ShapeSignature { name: "ellipse", fixed_head: sct_slice![CoordOdd, CoordEven], repeat_unit: Some(sct_slice![Distance, Distance]), min_repeats: 1, max_repeats: None, fixed_tail: sct_slice![Angle] };
#[rustfmt::skip]
static BOX_SIG: ShapeSignature = ShapeSignature { name: "box", fixed_head: sct_slice![CoordOdd, CoordEven], repeat_unit: Some(sct_slice![Distance, Distance]), min_repeats: 1, max_repeats: None, fixed_tail: sct_slice![Angle] };
#[rustfmt::skip]
static ROTBOX_SIG: ShapeSignature = ShapeSignature { name: "rotbox", fixed_head: sct_slice![CoordOdd, CoordEven], repeat_unit: Some(sct_slice![Distance, Distance]), min_repeats: 1, max_repeats: Some(1), fixed_tail: sct_slice![Angle] };
#[rustfmt::skip]
static POLYGON_SIG: ShapeSignature = ShapeSignature { name: "polygon", fixed_head: sct_slice![], repeat_unit: Some(sct_slice![CoordOdd, CoordEven]), min_repeats: 3, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static ANNULUS_SIG: ShapeSignature = ShapeSignature { name: "annulus", fixed_head: sct_slice![CoordOdd, CoordEven], repeat_unit: Some(sct_slice![Distance]), min_repeats: 2, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static PIE_SIG: ShapeSignature = ShapeSignature { name: "pie", fixed_head: sct_slice![CoordOdd, CoordEven, Distance, Distance, Angle, Angle], repeat_unit: None, min_repeats: 0, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static PANDA_SIG: ShapeSignature = ShapeSignature { name: "panda", fixed_head: sct_slice![CoordOdd, CoordEven, Angle, Angle, Integer, Distance, Distance, Integer], repeat_unit: None, min_repeats: 0, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static EPANDA_SIG: ShapeSignature = ShapeSignature { name: "epanda", fixed_head: sct_slice![CoordOdd, CoordEven, Angle, Angle, Integer, Distance, Distance, Distance, Distance, Integer, Angle], repeat_unit: None, min_repeats: 0, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static BPANDA_SIG: ShapeSignature = ShapeSignature { name: "bpanda", fixed_head: sct_slice![CoordOdd, CoordEven, Angle, Angle, Integer, Distance, Distance, Distance, Distance, Integer, Angle], repeat_unit: None, min_repeats: 0, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static POINT_SIG: ShapeSignature = ShapeSignature { name: "point", fixed_head: sct_slice![CoordOdd, CoordEven], repeat_unit: None, min_repeats: 0, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static LINE_SIG: ShapeSignature = ShapeSignature { name: "line", fixed_head: sct_slice![CoordOdd, CoordEven, CoordOdd, CoordEven], repeat_unit: None, min_repeats: 0, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static VECTOR_SIG: ShapeSignature = ShapeSignature { name: "vector", fixed_head: sct_slice![CoordOdd, CoordEven, Distance, Angle], repeat_unit: None, min_repeats: 0, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static TEXT_SIG: ShapeSignature = ShapeSignature { name: "text", fixed_head: sct_slice![CoordOdd, CoordEven], repeat_unit: None, min_repeats: 0, max_repeats: None, fixed_tail: sct_slice![] };
#[rustfmt::skip]
static RULER_SIG: ShapeSignature = ShapeSignature { name: "ruler", fixed_head: sct_slice![CoordOdd, CoordEven, CoordOdd, CoordEven], repeat_unit: None, min_repeats: 0, max_repeats: None, fixed_tail: sct_slice![] };

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup_is_case_insensitive() {
        assert_eq!(ShapeKind::from_keyword("CIRCLE"), Some(ShapeKind::Circle));
        assert_eq!(ShapeKind::from_keyword("ePanda"), Some(ShapeKind::Epanda));
        assert_eq!(ShapeKind::from_keyword("fulcrum"), None);
        assert!(ShapeKind::Composite.signature().is_none());
    }

    #[test]
    fn test_fixed_signature_accepts_only_exact_count() {
        let sig = ShapeKind::Circle.signature().unwrap();
        assert_eq!(sig.arity(), Arity::Exact(3));
        assert_eq!(sig.repeats_for(3), Some(0));
        assert_eq!(sig.repeats_for(2), None);
        assert_eq!(sig.repeats_for(4), None);
    }

    #[test]
    fn test_polygon_layout() {
        let sig = ShapeKind::Polygon.signature().unwrap();
        assert_eq!(sig.repeats_for(4), None);
        assert_eq!(sig.repeats_for(7), None);
        let roles = sig.layout(8).unwrap();
        assert_eq!(roles.len(), 8);
        assert_eq!(roles[6], CoordOdd);
        assert_eq!(roles[7], CoordEven);
    }

    #[test]
    fn test_ellipse_annulus_layout() {
        let sig = ShapeKind::Ellipse.signature().unwrap();
        assert_eq!(sig.repeats_for(5), Some(1));
        assert_eq!(sig.repeats_for(7), Some(2));
        assert_eq!(sig.repeats_for(6), None);
        let roles = sig.layout(7).unwrap();
        assert_eq!(roles, vec![CoordOdd, CoordEven, Distance, Distance, Distance, Distance, Angle]);
    }

    #[test]
    fn test_rotbox_has_single_size_pair() {
        let sig = ShapeKind::RotBox.signature().unwrap();
        assert_eq!(sig.repeats_for(5), Some(1));
        assert_eq!(sig.repeats_for(7), None);
    }

    #[test]
    fn test_annulus_needs_two_radii() {
        let sig = ShapeKind::Annulus.signature().unwrap();
        assert_eq!(sig.repeats_for(3), None);
        assert_eq!(sig.repeats_for(4), Some(2));
        assert_eq!(sig.repeats_for(6), Some(4));
    }
}
