//! # Coordinate/Unit Resolver
//!
//! Maps parsed regions to pixel space. Image and physical coordinates are handled
//! here (physical through the affine `LTM`/`LTV` header cards); anything on the
//! sky is packaged into a [`TransformRequest`] and handed to a [`WcsResolver`].
//! All requests of one call go out in a single batch.

use std::collections::BTreeMap;

use glam::{DMat2, DVec2};
use log::{debug, warn};

use crate::error::{ConversionError, InvalidGeometry, RegionError};
use crate::geometry::PixelRegion;
use crate::region::{CoordSystemTag, Param, Region, RegionList, Unit};
use crate::shape_defs::{SemanticCoordType, ShapeKind};

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Number(f64),
    Text(String),
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Number(v)
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Text(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Text(v)
    }
}

/// FITS-style header cards of the target image. Keys are case-insensitive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ImageHeader {
    cards: BTreeMap<String, HeaderValue>,
}

impl ImageHeader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<HeaderValue>) {
        self.cards.insert(key.trim().to_ascii_uppercase(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.cards.get(&key.trim().to_ascii_uppercase())
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            HeaderValue::Number(v) => Some(*v),
            HeaderValue::Text(t) => t.trim().parse().ok(),
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            HeaderValue::Text(t) => Some(t.trim()),
            HeaderValue::Number(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// `image = ltm * physical + ltv`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalTransform {
    pub ltm: DMat2,
    pub ltv: DVec2,
}

impl Default for PhysicalTransform {
    fn default() -> Self {
        Self { ltm: DMat2::IDENTITY, ltv: DVec2::ZERO }
    }
}

impl PhysicalTransform {
    /// Reads `LTM1_1..LTM2_2` and `LTV1/2`; absent cards mean identity and zero.
    pub fn from_header(header: &ImageHeader) -> Result<Self, ConversionError> {
        let card = |key: &str, default: f64| header.number(key).unwrap_or(default);
        let ltm = DMat2::from_cols(
            DVec2::new(card("LTM1_1", 1.0), card("LTM2_1", 0.0)),
            DVec2::new(card("LTM1_2", 0.0), card("LTM2_2", 1.0)),
        );
        let ltv = DVec2::new(card("LTV1", 0.0), card("LTV2", 0.0));
        let det = ltm.determinant();
        if !det.is_finite() || det == 0.0 {
            return Err(ConversionError::new("LTM matrix is singular"));
        }
        Ok(Self { ltm, ltv })
    }

    pub fn apply_point(&self, physical: DVec2) -> DVec2 {
        self.ltm * physical + self.ltv
    }

    pub fn scale_distance(&self, d: f64) -> f64 {
        d * self.ltm.determinant().abs().sqrt()
    }

    /// Rotation of the physical axes in image space, in degrees.
    pub fn rotation_degrees(&self) -> f64 {
        self.ltm.x_axis.y.atan2(self.ltm.x_axis.x).to_degrees()
    }

    /// Whether the map flips handedness (`det(LTM) < 0`).
    pub fn is_mirrored(&self) -> bool {
        self.ltm.determinant() < 0.0
    }

    /// Maps a counter-clockwise angle from the physical x axis to image space.
    pub fn map_angle(&self, degrees: f64) -> f64 {
        if self.is_mirrored() {
            self.rotation_degrees() - degrees
        } else {
            self.rotation_degrees() + degrees
        }
    }

    /// Maps a counter-clockwise sector `[start, stop)`. A mirror reverses the
    /// sweep, so the ends trade places.
    pub fn map_sector(&self, start: f64, stop: f64) -> (f64, f64) {
        if self.is_mirrored() {
            (self.map_angle(stop), self.map_angle(start))
        } else {
            (self.map_angle(start), self.map_angle(stop))
        }
    }

    /// Like [`PhysicalTransform::map_sector`] for angles measured in a shape's
    /// own frame: only a mirror changes them.
    pub fn map_local_sector(&self, start: f64, stop: f64) -> (f64, f64) {
        if self.is_mirrored() {
            (-stop, -start)
        } else {
            (start, stop)
        }
    }
}

/// One parameter handed to the WCS collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawValue {
    pub role: SemanticCoordType,
    pub param: Param,
}

/// Everything of one region that needs astrometry, in parameter order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest<'h> {
    pub system: CoordSystemTag,
    pub values: Vec<RawValue>,
    pub header: &'h ImageHeader,
}

/// External astrometry service. Must return one pixel value per requested value.
pub trait WcsResolver {
    fn resolve(&self, request: &TransformRequest<'_>) -> Result<Vec<f64>, ConversionError>;

    /// Resolves a whole batch; each result is independent of the others.
    fn resolve_batch(&self, requests: &[TransformRequest<'_>]) -> Vec<Result<Vec<f64>, ConversionError>> {
        requests.iter().map(|request| self.resolve(request)).collect()
    }
}

/// A region that could not be brought to pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedRegion {
    /// Position in the input [`RegionList`].
    pub index: usize,
    pub source_line: usize,
    pub error: RegionError,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    /// Resolved regions, in their original order.
    pub regions: Vec<PixelRegion>,
    pub errors: Vec<UnresolvedRegion>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn strict(self) -> Result<Vec<PixelRegion>, RegionError> {
        match self.errors.into_iter().next() {
            Some(first) => Err(first.error),
            None => Ok(self.regions),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Ready(f64),
    Pending,
}

struct Plan<'h> {
    slots: Vec<Slot>,
    request: Option<TransformRequest<'h>>,
}

fn angle_degrees(param: &Param) -> f64 {
    param.degrees().unwrap_or(param.value)
}

/// Sector angles of epanda and bpanda are measured from the shape's own axis.
fn has_local_sector(kind: ShapeKind) -> bool {
    matches!(kind, ShapeKind::Epanda | ShapeKind::Bpanda)
}

fn ready_value(slots: &[Slot], i: usize) -> f64 {
    match slots.get(i) {
        Some(Slot::Ready(v)) => *v,
        _ => f64::NAN,
    }
}

fn set_pair(slots: &mut [Slot], i: usize, (a, b): (f64, f64)) {
    slots[i] = Slot::Ready(a);
    slots[i + 1] = Slot::Ready(b);
}

/// Carries the angles of a physical region into image space.
fn orient_angles(kind: ShapeKind, roles: &[SemanticCoordType], slots: &mut [Slot], t: &PhysicalTransform) {
    match kind {
        ShapeKind::Pie | ShapeKind::Panda => {
            let i = if kind == ShapeKind::Pie { 4 } else { 2 };
            set_pair(slots, i, t.map_sector(ready_value(slots, i), ready_value(slots, i + 1)));
        }
        ShapeKind::Epanda | ShapeKind::Bpanda => {
            set_pair(slots, 2, t.map_local_sector(ready_value(slots, 2), ready_value(slots, 3)));
            slots[10] = Slot::Ready(t.map_angle(ready_value(slots, 10)));
        }
        _ => {
            for (role, slot) in roles.iter().zip(slots.iter_mut()) {
                if let (SemanticCoordType::Angle, Slot::Ready(a)) = (role, slot) {
                    *a = t.map_angle(*a);
                }
            }
        }
    }
}

fn plan_region<'h>(
    region: &Region,
    header: &'h ImageHeader,
    physical: &Result<PhysicalTransform, ConversionError>,
) -> Result<Plan<'h>, ConversionError> {
    let system = region.coord_system();
    let roles = region.roles();
    let params = region.params();
    let mut slots = Vec::with_capacity(params.len());
    let mut pending = Vec::new();

    let transform = match system {
        CoordSystemTag::Physical => Some(physical.clone()?),
        _ => None,
    };

    let mut odd: Option<f64> = None;
    for (i, (role, param)) in roles.iter().copied().zip(params).enumerate() {
        let mut defer = |param: Param, slots: &mut Vec<Slot>| {
            pending.push(RawValue { role, param });
            slots.push(Slot::Pending);
        };

        if role == SemanticCoordType::Integer {
            slots.push(Slot::Ready(param.value));
            continue;
        }
        if has_local_sector(region.kind()) && (i == 2 || i == 3) {
            slots.push(Slot::Ready(angle_degrees(param)));
            continue;
        }

        if let CoordSystemTag::Sky(_) = system {
            if param.unit == Unit::Pixel {
                slots.push(Slot::Ready(param.value));
            } else if param.unit == Unit::None {
                defer(Param::new(param.value, Unit::Degree), &mut slots);
            } else {
                defer(*param, &mut slots);
            }
            continue;
        }

        match role {
            SemanticCoordType::CoordOdd | SemanticCoordType::CoordEven => {
                if param.unit.is_angular() {
                    return Err(ConversionError::new(format!(
                        "angular position {param} in a {system} region"
                    )));
                }
                match (role, transform) {
                    (SemanticCoordType::CoordOdd, Some(_)) => {
                        odd = Some(param.value);
                        slots.push(Slot::Pending);
                    }
                    (SemanticCoordType::CoordEven, Some(t)) => {
                        let x = odd.take().unwrap_or_default();
                        let p = t.apply_point(DVec2::new(x, param.value));
                        if let Some(last) = slots.last_mut() {
                            *last = Slot::Ready(p.x);
                        }
                        slots.push(Slot::Ready(p.y));
                    }
                    _ => slots.push(Slot::Ready(param.value)),
                }
            }
            SemanticCoordType::Distance => {
                if param.unit.is_angular() {
                    defer(*param, &mut slots);
                } else {
                    let d = transform.map_or(param.value, |t| t.scale_distance(param.value));
                    slots.push(Slot::Ready(d));
                }
            }
            SemanticCoordType::Angle => slots.push(Slot::Ready(angle_degrees(param))),
            SemanticCoordType::Integer => slots.push(Slot::Ready(param.value)),
        }
    }

    if let Some(t) = &transform {
        orient_angles(region.kind(), &roles, &mut slots, t);
    }

    let request = if pending.is_empty() {
        None
    } else {
        Some(TransformRequest { system, values: pending, header })
    };
    Ok(Plan { slots, request })
}

fn fill(slots: &[Slot], resolved: &[f64]) -> Vec<f64> {
    let mut resolved = resolved.iter();
    slots
        .iter()
        .map(|slot| match slot {
            Slot::Ready(v) => *v,
            Slot::Pending => resolved.next().copied().unwrap_or(f64::NAN),
        })
        .collect()
}

/// Brings every region of `regions` to pixel space.
///
/// Regions in image or physical coordinates with only pixel sizes never touch
/// `wcs`. Everything else is sent to `wcs` in one [`WcsResolver::resolve_batch`]
/// call. A failure affects only the region it belongs to.
pub fn resolve_regions(regions: &RegionList, header: &ImageHeader, wcs: Option<&dyn WcsResolver>) -> Resolution {
    let physical = PhysicalTransform::from_header(header);
    let mut resolution = Resolution::default();

    let mut plans = Vec::with_capacity(regions.len());
    let mut requests = Vec::new();
    for (index, region) in regions.iter().enumerate() {
        match plan_region(region, header, &physical) {
            Ok(mut plan) => {
                let request_index = plan.request.take().map(|request| {
                    requests.push(request);
                    requests.len() - 1
                });
                plans.push((index, region, plan.slots, request_index));
            }
            Err(source) => resolution.errors.push(UnresolvedRegion {
                index,
                source_line: region.source_line(),
                error: RegionError::Conversion { line: region.source_line(), source },
            }),
        }
    }

    let results: Vec<Result<Vec<f64>, ConversionError>> = match wcs {
        _ if requests.is_empty() => Vec::new(),
        None => requests
            .iter()
            .map(|_| Err(ConversionError::new("sky coordinates need a WCS, but none was supplied")))
            .collect(),
        Some(wcs) => {
            let results = wcs.resolve_batch(&requests);
            if results.len() == requests.len() {
                results
            } else {
                let reason = format!("WCS returned {} results for {} requests", results.len(), requests.len());
                requests.iter().map(|_| Err(ConversionError::new(reason.clone()))).collect()
            }
        }
    };

    for (index, region, slots, request_index) in plans {
        let line = region.source_line();
        let params = match request_index {
            None => Ok(fill(&slots, &[])),
            Some(i) => match &results[i] {
                Ok(values) if values.len() == requests[i].values.len() => Ok(fill(&slots, values)),
                Ok(values) => Err(ConversionError::new(format!(
                    "WCS returned {} values for {} inputs",
                    values.len(),
                    requests[i].values.len()
                ))),
                Err(e) => Err(e.clone()),
            },
        };

        let resolved = params
            .map_err(|source| RegionError::Conversion { line, source })
            .and_then(|params| {
                PixelRegion::new(region, params).map_err(|reason| InvalidGeometry::new(line, reason).into())
            });
        match resolved {
            Ok(pixel_region) => resolution.regions.push(pixel_region),
            Err(error) => {
                warn!("line {line}: region dropped during coordinate resolution: {error}");
                resolution.errors.push(UnresolvedRegion { index, source_line: line, error });
            }
        }
    }

    resolution.errors.sort_by_key(|e| e.index);
    debug!(
        "resolved {} of {} regions ({} WCS requests)",
        resolution.regions.len(),
        regions.len(),
        requests.len()
    );
    resolution
}
