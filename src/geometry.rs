//! # Geometry Engine
//!
//! Containment predicates over pixel-space shapes. All angles are in degrees,
//! counter-clockwise from the +x axis. Points are image coordinates as
//! [`DVec2`]; the caller decides where pixel centres lie.

use glam::DVec2;

use crate::attributes::Attributes;
use crate::region::{Region, Sign};
use crate::shape_defs::ShapeKind;

/// Distance from a polygon edge within which a point counts as on the edge.
pub const EDGE_TOLERANCE: f64 = 1e-9;

/// Padding applied to bounding boxes so that the quick reject never
/// disagrees with the exact predicate.
const BOUNDS_PAD: f64 = 1e-7;

/// A shape in pixel space, ready for containment tests.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle { center: DVec2, radius: f64 },
    /// Between the smallest and largest radius of the statement, inclusive.
    Annulus { center: DVec2, inner: f64, outer: f64 },
    /// One or more `(semi_major, semi_minor)` pairs, innermost first.
    Ellipse { center: DVec2, radii: Vec<DVec2>, angle: f64 },
    /// One or more full `(width, height)` pairs, innermost first.
    Box { center: DVec2, sizes: Vec<DVec2>, angle: f64 },
    Polygon { vertices: Vec<DVec2> },
    Pie { center: DVec2, inner: f64, outer: f64, start: f64, stop: f64 },
    Panda { center: DVec2, start: f64, stop: f64, inner: f64, outer: f64 },
    /// Elliptical sector annulus. `inner`/`outer` are `(semi_major, semi_minor)`.
    Epanda { center: DVec2, start: f64, stop: f64, inner: DVec2, outer: DVec2, angle: f64 },
    /// Box sector annulus. `inner`/`outer` are full `(width, height)`.
    Bpanda { center: DVec2, start: f64, stop: f64, inner: DVec2, outer: DVec2, angle: f64 },
    /// Zero-area marker (point, line, vector, text, ruler). Contains nothing.
    Marker,
}

impl Shape {
    /// Builds a shape from parameters already in pixel space, in the order the
    /// statement lists them.
    pub fn from_pixel_params(kind: ShapeKind, p: &[f64]) -> Result<Self, String> {
        if let Some(bad) = p.iter().find(|v| !v.is_finite()) {
            return Err(format!("non-finite pixel parameter {bad}"));
        }
        let expect = |n: usize| -> Result<(), String> {
            if p.len() == n {
                Ok(())
            } else {
                Err(format!("{} needs {n} parameters, got {}", kind.name(), p.len()))
            }
        };
        let center = || DVec2::new(p[0], p[1]);

        let shape = match kind {
            ShapeKind::Circle => {
                expect(3)?;
                positive(p[2], "circle radius")?;
                Shape::Circle { center: center(), radius: p[2] }
            }
            ShapeKind::Annulus => {
                if p.len() < 4 {
                    return Err("annulus needs at least two radii".to_string());
                }
                let radii = &p[2..];
                let inner = radii.iter().copied().fold(f64::INFINITY, f64::min);
                let outer = radii.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                non_negative(inner, "annulus inner radius")?;
                positive(outer, "annulus outer radius")?;
                Shape::Annulus { center: center(), inner, outer }
            }
            ShapeKind::Ellipse | ShapeKind::Box | ShapeKind::RotBox => {
                if p.len() < 5 || (p.len() - 3) % 2 != 0 {
                    return Err(format!("{} has a malformed parameter list", kind.name()));
                }
                let pairs: Vec<DVec2> = p[2..p.len() - 1].chunks_exact(2).map(|c| DVec2::new(c[0], c[1])).collect();
                for pair in &pairs {
                    positive(pair.x.min(pair.y), "extent")?;
                }
                let angle = p[p.len() - 1];
                if kind == ShapeKind::Ellipse {
                    Shape::Ellipse { center: center(), radii: pairs, angle }
                } else {
                    Shape::Box { center: center(), sizes: pairs, angle }
                }
            }
            ShapeKind::Polygon => {
                if p.len() < 6 || p.len() % 2 != 0 {
                    return Err("polygon needs at least three vertices".to_string());
                }
                Shape::Polygon { vertices: p.chunks_exact(2).map(|c| DVec2::new(c[0], c[1])).collect() }
            }
            ShapeKind::Pie => {
                expect(6)?;
                radial_range(p[2], p[3])?;
                Shape::Pie { center: center(), inner: p[2], outer: p[3], start: p[4], stop: p[5] }
            }
            ShapeKind::Panda => {
                expect(8)?;
                radial_range(p[5], p[6])?;
                Shape::Panda { center: center(), start: p[2], stop: p[3], inner: p[5], outer: p[6] }
            }
            ShapeKind::Epanda | ShapeKind::Bpanda => {
                expect(11)?;
                radial_range(p[5], p[7])?;
                radial_range(p[6], p[8])?;
                let (start, stop) = (p[2], p[3]);
                let inner = DVec2::new(p[5], p[6]);
                let outer = DVec2::new(p[7], p[8]);
                let angle = p[10];
                if kind == ShapeKind::Epanda {
                    Shape::Epanda { center: center(), start, stop, inner, outer, angle }
                } else {
                    Shape::Bpanda { center: center(), start, stop, inner, outer, angle }
                }
            }
            ShapeKind::Point | ShapeKind::Line | ShapeKind::Vector | ShapeKind::Text | ShapeKind::Ruler => {
                Shape::Marker
            }
            ShapeKind::Composite => return Err("composite regions have no geometry".to_string()),
        };
        Ok(shape)
    }

    /// Axis-aligned box `(min, max)` enclosing every contained point.
    /// `None` for shapes that contain nothing.
    pub fn bounds(&self) -> Option<(DVec2, DVec2)> {
        let around = |center: DVec2, half: DVec2| {
            let half = half + DVec2::splat(BOUNDS_PAD);
            Some((center - half, center + half))
        };
        match self {
            Shape::Circle { center, radius } => around(*center, DVec2::splat(*radius)),
            Shape::Annulus { center, outer, .. }
            | Shape::Pie { center, outer, .. }
            | Shape::Panda { center, outer, .. } => around(*center, DVec2::splat(*outer)),
            Shape::Ellipse { center, radii, .. } => {
                let r = radii.iter().map(|r| r.max_element()).fold(0.0, f64::max);
                around(*center, DVec2::splat(r))
            }
            Shape::Box { center, sizes, .. } => {
                let r = sizes.iter().map(|s| (*s * 0.5).length()).fold(0.0, f64::max);
                around(*center, DVec2::splat(r))
            }
            Shape::Epanda { center, outer, .. } => around(*center, DVec2::splat(outer.max_element())),
            Shape::Bpanda { center, outer, .. } => around(*center, DVec2::splat((*outer * 0.5).length())),
            Shape::Polygon { vertices } => {
                let min = vertices.iter().copied().fold(DVec2::splat(f64::INFINITY), DVec2::min);
                let max = vertices.iter().copied().fold(DVec2::splat(f64::NEG_INFINITY), DVec2::max);
                let pad = DVec2::splat(BOUNDS_PAD);
                Some((min - pad, max + pad))
            }
            Shape::Marker => None,
        }
    }

    pub fn contains(&self, point: DVec2) -> bool {
        let Some((min, max)) = self.bounds() else {
            return false;
        };
        if point.cmplt(min).any() || point.cmpgt(max).any() {
            return false;
        }

        match self {
            Shape::Circle { center, radius } => point.distance(*center) <= *radius,
            Shape::Annulus { center, inner, outer } => {
                let d = point.distance(*center);
                *inner <= d && d <= *outer
            }
            Shape::Ellipse { center, radii, angle } => {
                let local = to_local(point, *center, *angle);
                let (Some(inner), Some(outer)) = (radii.first(), radii.last()) else {
                    return false;
                };
                let in_outer = ellipse_form(local, *outer) <= 1.0;
                if radii.len() == 1 {
                    in_outer
                } else {
                    in_outer && ellipse_form(local, *inner) >= 1.0
                }
            }
            Shape::Box { center, sizes, angle } => {
                let local = to_local(point, *center, *angle);
                let (Some(inner), Some(outer)) = (sizes.first(), sizes.last()) else {
                    return false;
                };
                let in_outer = box_contains(local, *outer);
                if sizes.len() == 1 {
                    in_outer
                } else {
                    in_outer && !box_strictly_contains(local, *inner)
                }
            }
            Shape::Polygon { vertices } => polygon_contains(vertices, point),
            Shape::Pie { center, inner, outer, start, stop }
            | Shape::Panda { center, inner, outer, start, stop } => {
                let offset = point - *center;
                let d = offset.length();
                *inner <= d && d <= *outer && in_angle_range(polar_angle(offset), *start, *stop)
            }
            Shape::Epanda { center, start, stop, inner, outer, angle } => {
                let local = to_local(point, *center, *angle);
                ellipse_form(local, *outer) <= 1.0
                    && (inner.min_element() <= 0.0 || ellipse_form(local, *inner) >= 1.0)
                    && in_angle_range(polar_angle(local), *start, *stop)
            }
            Shape::Bpanda { center, start, stop, inner, outer, angle } => {
                let local = to_local(point, *center, *angle);
                box_contains(local, *outer)
                    && !box_strictly_contains(local, *inner)
                    && in_angle_range(polar_angle(local), *start, *stop)
            }
            Shape::Marker => false,
        }
    }
}

fn positive(v: f64, what: &str) -> Result<(), String> {
    if v > 0.0 {
        Ok(())
    } else {
        Err(format!("{what} must be positive in pixel space, got {v}"))
    }
}

fn non_negative(v: f64, what: &str) -> Result<(), String> {
    if v >= 0.0 {
        Ok(())
    } else {
        Err(format!("{what} must not be negative in pixel space, got {v}"))
    }
}

fn radial_range(inner: f64, outer: f64) -> Result<(), String> {
    non_negative(inner, "inner radius")?;
    positive(outer, "outer radius")?;
    if outer < inner {
        return Err(format!("outer radius {outer} is smaller than inner radius {inner}"));
    }
    Ok(())
}

/// Rotates `point` into the frame of a shape centred at `center` and rotated by `angle`.
fn to_local(point: DVec2, center: DVec2, angle: f64) -> DVec2 {
    DVec2::from_angle(-angle.to_radians()).rotate(point - center)
}

fn ellipse_form(local: DVec2, radii: DVec2) -> f64 {
    (local / radii).length_squared()
}

fn box_contains(local: DVec2, size: DVec2) -> bool {
    let half = size * 0.5;
    local.abs().cmple(half).all()
}

fn box_strictly_contains(local: DVec2, size: DVec2) -> bool {
    let half = size * 0.5;
    local.abs().cmplt(half).all()
}

/// Polar angle of `v` in degrees, in `[0, 360)`.
fn polar_angle(v: DVec2) -> f64 {
    v.y.atan2(v.x).to_degrees().rem_euclid(360.0)
}

/// `theta` in `[start, stop)` modulo 360. Equal endpoints select nothing; any
/// other span that is a multiple of 360 selects the whole turn.
pub fn in_angle_range(theta: f64, start: f64, stop: f64) -> bool {
    if start == stop {
        return false;
    }
    let span = (stop - start).rem_euclid(360.0);
    if span == 0.0 {
        return true;
    }
    (theta - start).rem_euclid(360.0) < span
}

/// Orders an edge's endpoints so that both traversal directions give the same edge.
fn canonical_edge(a: DVec2, b: DVec2) -> (DVec2, DVec2) {
    if (b.y, b.x) < (a.y, a.x) {
        (b, a)
    } else {
        (a, b)
    }
}

fn on_segment(point: DVec2, a: DVec2, b: DVec2) -> bool {
    let ab = b - a;
    let len2 = ab.length_squared();
    let closest = if len2 == 0.0 {
        a
    } else {
        a + ab * ((point - a).dot(ab) / len2).clamp(0.0, 1.0)
    };
    point.distance(closest) <= EDGE_TOLERANCE
}

/// Crossing-number test. Points on an edge are inside; otherwise an edge
/// counts when `a.y <= y < b.y` with its endpoints in canonical order.
pub fn polygon_contains(vertices: &[DVec2], point: DVec2) -> bool {
    let n = vertices.len();
    let mut inside = false;
    for i in 0..n {
        let (a, b) = canonical_edge(vertices[i], vertices[(i + 1) % n]);
        if on_segment(point, a, b) {
            return true;
        }
        if a.y <= point.y && point.y < b.y {
            let t = (point.y - a.y) / (b.y - a.y);
            let x = a.x + t * (b.x - a.x);
            if point.x < x {
                inside = !inside;
            }
        }
    }
    inside
}

/// A region after coordinate resolution: every parameter is in image pixels.
/// This is also what overlay renderers consume.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelRegion {
    pub kind: ShapeKind,
    pub sign: Sign,
    /// Pixel-space parameters in statement order.
    pub params: Vec<f64>,
    pub shape: Shape,
    pub attributes: Attributes,
    pub source_line: usize,
}

impl PixelRegion {
    pub fn new(region: &Region, params: Vec<f64>) -> Result<Self, String> {
        let shape = Shape::from_pixel_params(region.kind(), &params)?;
        Ok(Self {
            kind: region.kind(),
            sign: region.sign(),
            params,
            shape,
            attributes: region.attributes().clone(),
            source_line: region.source_line(),
        })
    }

    pub fn contains(&self, point: DVec2) -> bool {
        self.shape.contains(point)
    }
}

/// Folds the regions in declaration order: an include ORs its shape into the
/// accumulator, an exclude removes its shape from what has been included so far.
pub fn contains_all(regions: &[PixelRegion], point: DVec2) -> bool {
    regions.iter().fold(false, |acc, region| match region.sign {
        Sign::Include => acc || region.contains(point),
        Sign::Exclude => acc && !region.contains(point),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn shape(kind: ShapeKind, params: &[f64]) -> Shape {
        Shape::from_pixel_params(kind, params).unwrap()
    }

    fn pixel_region(kind: ShapeKind, sign: Sign, params: &[f64]) -> PixelRegion {
        PixelRegion {
            kind,
            sign,
            params: params.to_vec(),
            shape: shape(kind, params),
            attributes: Attributes::default(),
            source_line: 1,
        }
    }

    macro_rules! assert_contains {
        ($shape:expr, [$(($x:expr, $y:expr) => $expected:expr),+ $(,)?]) => {
            $(
                assert_eq!(
                    $shape.contains(DVec2::new($x, $y)),
                    $expected,
                    "containment of ({}, {}) in {:?}",
                    $x,
                    $y,
                    $shape
                );
            )+
        };
    }

    #[test]
    fn test_circle_boundary_is_inclusive() {
        let c = shape(ShapeKind::Circle, &[5.0, 5.0, 3.0]);
        assert_contains!(c, [
            (5.0, 5.0) => true,
            (8.0, 5.0) => true,
            (5.0, 2.0) => true,
            (8.01, 5.0) => false,
            (7.2, 7.2) => false,
        ]);
    }

    #[test]
    fn test_annulus_uses_smallest_and_largest_radius() {
        let a = shape(ShapeKind::Annulus, &[0.0, 0.0, 1.0, 2.0, 4.0]);
        assert_contains!(a, [
            (0.0, 0.0) => false,
            (1.0, 0.0) => true,
            (3.0, 0.0) => true,
            (4.0, 0.0) => true,
            (4.5, 0.0) => false,
        ]);
    }

    #[test]
    fn test_rotated_ellipse() {
        let e = shape(ShapeKind::Ellipse, &[0.0, 0.0, 4.0, 1.0, 90.0]);
        assert_contains!(e, [(0.0, 4.0) => true, (0.0, -3.9) => true, (1.0, 0.0) => true, (2.0, 0.0) => false]);
    }

    #[test]
    fn test_ellipse_annulus() {
        let e = shape(ShapeKind::Ellipse, &[0.0, 0.0, 2.0, 1.0, 4.0, 2.0, 0.0]);
        assert_contains!(e, [
            (0.0, 0.0) => false,
            (2.0, 0.0) => true,
            (3.0, 0.0) => true,
            (4.0, 0.0) => true,
            (4.1, 0.0) => false,
        ]);
    }

    #[test]
    fn test_rotated_box() {
        let b = shape(ShapeKind::Box, &[0.0, 0.0, 4.0, 2.0, 0.0]);
        assert_contains!(b, [(2.0, 1.0) => true, (-2.0, -1.0) => true, (2.1, 0.0) => false, (0.0, 1.1) => false]);
        let r = shape(ShapeKind::RotBox, &[0.0, 0.0, 4.0, 2.0, 90.0]);
        assert_contains!(r, [(0.0, 2.0) => true, (1.0, 0.0) => true, (1.5, 0.0) => false]);
        let d = shape(ShapeKind::Box, &[0.0, 0.0, 2.0, 2.0, 45.0]);
        assert_contains!(d, [(1.4, 0.0) => true, (0.9, 0.9) => false]);
    }

    #[test]
    fn test_box_annulus() {
        let b = shape(ShapeKind::Box, &[0.0, 0.0, 2.0, 2.0, 6.0, 6.0, 0.0]);
        assert_contains!(b, [
            (0.0, 0.0) => false,
            (0.5, 0.5) => false,
            (1.0, 0.0) => true,
            (2.5, 2.5) => true,
            (3.5, 0.0) => false,
        ]);
    }

    #[test]
    fn test_angle_range() {
        assert!(in_angle_range(0.0, 0.0, 90.0));
        assert!(!in_angle_range(90.0, 0.0, 90.0));
        assert!(in_angle_range(350.0, 300.0, 30.0));
        assert!(in_angle_range(10.0, 300.0, 30.0));
        assert!(!in_angle_range(100.0, 300.0, 30.0));
        assert!(in_angle_range(123.0, 0.0, 360.0));
        assert!(in_angle_range(123.0, -90.0, 270.0));
        assert!(!in_angle_range(123.0, 45.0, 45.0));
    }

    #[test]
    fn test_pie_and_panda() {
        let pie = shape(ShapeKind::Pie, &[0.0, 0.0, 1.0, 3.0, 0.0, 90.0]);
        assert_contains!(pie, [
            (2.0, 0.0) => true,
            (1.5, 1.5) => true,
            (0.0, 2.0) => false,
            (-2.0, 0.0) => false,
            (0.5, 0.0) => false,
        ]);
        let panda = shape(ShapeKind::Panda, &[0.0, 0.0, 90.0, 180.0, 2.0, 0.0, 2.0, 1.0]);
        assert_contains!(panda, [(0.0, 1.0) => true, (-1.0, 1.0) => true, (1.0, 1.0) => false, (0.0, 2.5) => false]);
    }

    #[test]
    fn test_epanda_and_bpanda_rotate_with_the_shape() {
        let e = shape(ShapeKind::Epanda, &[0.0, 0.0, 0.0, 180.0, 1.0, 1.0, 0.5, 4.0, 2.0, 1.0, 90.0]);
        // The local +y half-plane is the world -x half-plane after a 90 degree rotation.
        assert_contains!(e, [(-1.5, 0.0) => true, (1.5, 0.0) => false, (0.0, 0.0) => false]);
        let b = shape(ShapeKind::Bpanda, &[0.0, 0.0, 0.0, 360.0, 1.0, 2.0, 2.0, 6.0, 6.0, 1.0, 0.0]);
        assert_contains!(b, [(2.0, 2.0) => true, (0.5, 0.0) => false, (3.0, 3.0) => true, (3.1, 0.0) => false]);
    }

    #[test]
    fn test_polygon_edges_and_vertices_are_inside() {
        let square = shape(ShapeKind::Polygon, &[0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 0.0, 4.0]);
        assert_contains!(square, [
            (2.0, 2.0) => true,
            (0.0, 0.0) => true,
            (4.0, 4.0) => true,
            (4.0, 2.0) => true,
            (2.0, 4.0) => true,
            (4.0 + 1e-6, 2.0) => false,
            (5.0, 2.0) => false,
        ]);
    }

    #[test]
    fn test_concave_polygon() {
        let u = shape(
            ShapeKind::Polygon,
            &[0.0, 0.0, 6.0, 0.0, 6.0, 6.0, 4.0, 6.0, 4.0, 2.0, 2.0, 2.0, 2.0, 6.0, 0.0, 6.0],
        );
        assert_contains!(u, [(1.0, 5.0) => true, (5.0, 5.0) => true, (3.0, 5.0) => false, (3.0, 1.0) => true]);
    }

    #[test]
    fn test_rays_through_vertices() {
        let diamond = [0.0, -2.0, 2.0, 0.0, 0.0, 2.0, -2.0, 0.0];
        let notched = [0.0, 0.0, 4.0, 0.0, 4.0, 4.0, 2.0, 2.0, 0.0, 4.0];
        let cases: &[(&[f64], (f64, f64), bool)] = &[
            (&diamond, (-1.0, 0.0), true),
            (&diamond, (0.0, 0.0), true),
            (&diamond, (-3.0, 0.0), false),
            (&diamond, (3.0, 0.0), false),
            (&diamond, (0.0, 2.0), true),
            (&notched, (1.0, 2.0), true),
            (&notched, (3.0, 2.0), true),
            (&notched, (2.0, 2.0), true),
            (&notched, (-1.0, 2.0), false),
            (&notched, (5.0, 2.0), false),
            (&notched, (2.0, 3.0), false),
            (&notched, (0.25, 3.5), true),
            (&notched, (-1.0, 4.0), false),
            (&notched, (0.0, 4.0), true),
        ];
        for (coords, (x, y), expected) in cases {
            let reversed: Vec<f64> = coords.chunks_exact(2).rev().flatten().copied().collect();
            for params in [coords.to_vec(), reversed] {
                let polygon = shape(ShapeKind::Polygon, &params);
                assert_eq!(polygon.contains(DVec2::new(*x, *y)), *expected, "({x}, {y}) in {params:?}");
            }
        }
    }

    #[test]
    fn test_markers_contain_nothing() {
        for (kind, params) in [
            (ShapeKind::Point, vec![1.0, 1.0]),
            (ShapeKind::Line, vec![0.0, 0.0, 2.0, 2.0]),
            (ShapeKind::Vector, vec![1.0, 1.0, 5.0, 0.0]),
            (ShapeKind::Text, vec![1.0, 1.0]),
        ] {
            let s = shape(kind, &params);
            assert!(!s.contains(DVec2::new(1.0, 1.0)));
            assert_eq!(s.bounds(), None);
        }
    }

    #[test]
    fn test_invalid_pixel_params() {
        assert!(Shape::from_pixel_params(ShapeKind::Circle, &[0.0, 0.0, -1.0]).is_err());
        assert!(Shape::from_pixel_params(ShapeKind::Circle, &[0.0, f64::NAN, 1.0]).is_err());
        assert!(Shape::from_pixel_params(ShapeKind::Composite, &[0.0, 0.0, 1.0]).is_err());
        assert!(Shape::from_pixel_params(ShapeKind::Pie, &[0.0, 0.0, 3.0, 1.0, 0.0, 90.0]).is_err());
    }

    #[test]
    fn test_fold_in_declaration_order() {
        let big = pixel_region(ShapeKind::Circle, Sign::Include, &[5.0, 5.0, 3.0]);
        let small = pixel_region(ShapeKind::Circle, Sign::Exclude, &[5.0, 5.0, 1.0]);
        let regions = vec![big.clone(), small.clone()];
        assert!(!contains_all(&regions, DVec2::new(5.0, 5.0)));
        assert!(contains_all(&regions, DVec2::new(7.0, 5.0)));

        // An exclude before any include removes nothing from what follows.
        let reversed = vec![small, big];
        assert!(contains_all(&reversed, DVec2::new(5.0, 5.0)));
        assert!(!contains_all(&[], DVec2::new(5.0, 5.0)));
    }

    proptest! {
        #[test]
        fn prop_polygon_reversal_invariant(
            vertices in prop::collection::vec((-20.0f64..20.0, -20.0f64..20.0), 3..8),
            x in -25.0f64..25.0,
            y in -25.0f64..25.0,
        ) {
            let forward: Vec<DVec2> = vertices.iter().map(|&(vx, vy)| DVec2::new(vx, vy)).collect();
            let mut backward = forward.clone();
            backward.reverse();
            let p = DVec2::new(x, y);
            prop_assert_eq!(polygon_contains(&forward, p), polygon_contains(&backward, p));
        }

        #[test]
        fn prop_shapes_contain_their_center(
            cx in -100.0f64..100.0,
            cy in -100.0f64..100.0,
            a in 0.1f64..50.0,
            b in 0.1f64..50.0,
            angle in -360.0f64..360.0,
        ) {
            let center = DVec2::new(cx, cy);
            prop_assert!(shape(ShapeKind::Circle, &[cx, cy, a]).contains(center));
            prop_assert!(shape(ShapeKind::Ellipse, &[cx, cy, a, b, angle]).contains(center));
            prop_assert!(shape(ShapeKind::Box, &[cx, cy, a, b, angle]).contains(center));
        }

        #[test]
        fn prop_circle_excludes_points_beyond_radius(
            r in 0.5f64..50.0,
            theta in 0.0f64..360.0,
            extra in 1e-3f64..10.0,
        ) {
            let c = shape(ShapeKind::Circle, &[0.0, 0.0, r]);
            let p = DVec2::from_angle(theta.to_radians()) * (r + extra);
            prop_assert!(!c.contains(p));
        }
    }
}
