//! Reference [`WcsResolver`] for images with a simple celestial WCS.
//!
//! Supports the gnomonic (`-TAN`) projection and plain linear world axes, with the
//! linear part given either as a `CD` matrix or as `CDELT` plus `CROTA2`.
//! There is no sky-to-sky conversion: a request must be in the image's own frame,
//! or use `wcs`, which means "whatever the image uses".

use glam::{DMat2, DVec2};

use crate::error::ConversionError;
use crate::region::{CoordSystemTag, SkyFrame};
use crate::resolve::{ImageHeader, TransformRequest, WcsResolver};
use crate::shape_defs::SemanticCoordType;

/// Offset used to find the direction of north on the pixel grid, in degrees.
const NORTH_STEP_DEG: f64 = 1.0 / 3600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// Gnomonic (tangent plane).
    Tan,
    /// World coordinates are an affine function of pixel coordinates.
    Linear,
}

/// World coordinate system of one image.
///
/// `intermediate = cd * (pixel - crpix)`, in degrees, followed by the projection.
#[derive(Debug, Clone, PartialEq)]
pub struct TanWcs {
    /// Reference pixel (`CRPIX1`, `CRPIX2`), 1-based.
    pub crpix: DVec2,
    /// World coordinates of the reference pixel (`CRVAL1`, `CRVAL2`), degrees.
    pub crval: DVec2,
    /// Columns are `(CD1_1, CD2_1)` and `(CD1_2, CD2_2)`.
    pub cd: DMat2,
    pub frame: SkyFrame,
    pub projection: Projection,
}

impl TanWcs {
    pub fn new(crpix: DVec2, crval: DVec2, cd: DMat2, frame: SkyFrame) -> Result<Self, ConversionError> {
        let det = cd.determinant();
        if !det.is_finite() || det.abs() < 1e-15 {
            return Err(ConversionError::new(format!("CD matrix is singular (det = {det})")));
        }
        Ok(Self { crpix, crval, cd, frame, projection: Projection::Tan })
    }

    /// Builds a WCS from a pixel scale in arcsec/pixel and a position angle in degrees.
    /// `mirrored` flips the first axis, which is how most sky images are stored.
    pub fn from_scale_rotation(
        crpix: DVec2,
        crval: DVec2,
        pixel_scale_arcsec: f64,
        rotation: f64,
        mirrored: bool,
        frame: SkyFrame,
    ) -> Result<Self, ConversionError> {
        let scale = pixel_scale_arcsec / 3600.0;
        let (sin_r, cos_r) = rotation.to_radians().sin_cos();
        let sign = if mirrored { -1.0 } else { 1.0 };
        let cd = DMat2::from_cols(
            DVec2::new(sign * scale * cos_r, sign * scale * sin_r),
            DVec2::new(-scale * sin_r, scale * cos_r),
        );
        Self::new(crpix, crval, cd, frame)
    }

    pub fn from_header(header: &ImageHeader) -> Result<Self, ConversionError> {
        let required = |key: &str| {
            header
                .number(key)
                .ok_or_else(|| ConversionError::new(format!("image header has no {key} card")))
        };

        let ctype = header
            .text("CTYPE1")
            .ok_or_else(|| ConversionError::new("image header has no CTYPE1 card"))?
            .to_ascii_uppercase();
        let frame = frame_from_ctype(&ctype, header)?;
        let projection = if ctype.ends_with("-TAN") {
            Projection::Tan
        } else if frame == SkyFrame::Linear {
            Projection::Linear
        } else {
            return Err(ConversionError::new(format!("unsupported projection in CTYPE1 '{ctype}'")));
        };

        let crpix = DVec2::new(required("CRPIX1")?, required("CRPIX2")?);
        let crval = DVec2::new(required("CRVAL1")?, required("CRVAL2")?);

        let cd = if header.get("CD1_1").is_some() {
            let card = |key: &str| header.number(key).unwrap_or(0.0);
            DMat2::from_cols(
                DVec2::new(card("CD1_1"), card("CD2_1")),
                DVec2::new(card("CD1_2"), card("CD2_2")),
            )
        } else {
            let cdelt = DVec2::new(required("CDELT1")?, required("CDELT2")?);
            let (sin_r, cos_r) = header.number("CROTA2").unwrap_or(0.0).to_radians().sin_cos();
            DMat2::from_cols(
                DVec2::new(cdelt.x * cos_r, cdelt.x * sin_r),
                DVec2::new(-cdelt.y * sin_r, cdelt.y * cos_r),
            )
        };

        let mut wcs = Self::new(crpix, crval, cd, frame)?;
        wcs.projection = projection;
        Ok(wcs)
    }

    /// Projects world coordinates (degrees) to a pixel position.
    /// `None` when the point is on the far side of the tangent plane.
    pub fn sky_to_pixel(&self, world: DVec2) -> Option<DVec2> {
        let intermediate = match self.projection {
            Projection::Linear => world - self.crval,
            Projection::Tan => {
                let (sin_dec, cos_dec) = world.y.to_radians().sin_cos();
                let (sin_dec0, cos_dec0) = self.crval.y.to_radians().sin_cos();
                let (sin_dra, cos_dra) = (world.x - self.crval.x).to_radians().sin_cos();

                let d = sin_dec * sin_dec0 + cos_dec * cos_dec0 * cos_dra;
                if d <= 0.0 {
                    return None;
                }
                let xi = cos_dec * sin_dra / d;
                let eta = (sin_dec * cos_dec0 - cos_dec * sin_dec0 * cos_dra) / d;
                DVec2::new(xi.to_degrees(), eta.to_degrees())
            }
        };
        Some(self.crpix + self.cd.inverse() * intermediate)
    }

    pub fn pixel_to_sky(&self, pixel: DVec2) -> DVec2 {
        let intermediate = self.cd * (pixel - self.crpix);
        match self.projection {
            Projection::Linear => self.crval + intermediate,
            Projection::Tan => {
                let xi = intermediate.x.to_radians();
                let eta = intermediate.y.to_radians();
                let ra0 = self.crval.x.to_radians();
                let (sin_dec0, cos_dec0) = self.crval.y.to_radians().sin_cos();

                let denom = cos_dec0 - eta * sin_dec0;
                let ra = ra0 + xi.atan2(denom);
                let dec = (sin_dec0 + eta * cos_dec0).atan2(xi.hypot(denom));
                DVec2::new(ra.to_degrees().rem_euclid(360.0), dec.to_degrees())
            }
        }
    }

    /// Mean pixel scale, in degrees per pixel.
    pub fn pixel_scale(&self) -> f64 {
        (self.cd.x_axis.length() + self.cd.y_axis.length()) / 2.0
    }

    /// Direction of increasing latitude at `world`, as a pixel-space angle in degrees.
    pub fn north_angle(&self, world: DVec2) -> Option<f64> {
        let (step, sign) = if world.y + NORTH_STEP_DEG > 90.0 {
            (world - DVec2::new(0.0, NORTH_STEP_DEG), -1.0)
        } else {
            (world + DVec2::new(0.0, NORTH_STEP_DEG), 1.0)
        };
        let delta = (self.sky_to_pixel(step)? - self.sky_to_pixel(world)?) * sign;
        Some(delta.y.atan2(delta.x).to_degrees())
    }

    fn accepts(&self, system: CoordSystemTag) -> bool {
        match system {
            CoordSystemTag::Sky(SkyFrame::Native) => true,
            CoordSystemTag::Sky(frame) => frame == self.frame,
            CoordSystemTag::Image | CoordSystemTag::Physical => true,
        }
    }
}

fn frame_from_ctype(ctype: &str, header: &ImageHeader) -> Result<SkyFrame, ConversionError> {
    if ctype.starts_with("RA--") {
        let radesys = header.text("RADESYS").or_else(|| header.text("RADECSYS"));
        return match radesys.map(str::to_ascii_uppercase).as_deref() {
            Some("ICRS") => Ok(SkyFrame::Icrs),
            Some("FK5") => Ok(SkyFrame::Fk5),
            Some("FK4") | Some("FK4-NO-E") => Ok(SkyFrame::Fk4),
            Some(other) => Err(ConversionError::new(format!("unsupported RADESYS '{other}'"))),
            None => match header.number("EQUINOX").or_else(|| header.number("EPOCH")) {
                Some(equinox) if equinox < 1984.0 => Ok(SkyFrame::Fk4),
                Some(_) => Ok(SkyFrame::Fk5),
                None => Ok(SkyFrame::Icrs),
            },
        };
    }
    if ctype.starts_with("GLON") {
        return Ok(SkyFrame::Galactic);
    }
    if ctype.starts_with("ELON") {
        return Ok(SkyFrame::Ecliptic);
    }
    if ctype.starts_with("LINEAR") || !ctype.contains('-') {
        return Ok(SkyFrame::Linear);
    }
    Err(ConversionError::new(format!("unsupported CTYPE1 '{ctype}'")))
}

impl WcsResolver for TanWcs {
    fn resolve(&self, request: &TransformRequest<'_>) -> Result<Vec<f64>, ConversionError> {
        if !self.accepts(request.system) {
            return Err(ConversionError::new(format!(
                "region is in {} but the image WCS is {}",
                request.system,
                self.frame.name()
            )));
        }

        let degrees = |i: usize| {
            let p = request.values[i].param;
            p.degrees().unwrap_or(p.value)
        };

        // Angles are measured from the first position of the region.
        let reference = request
            .values
            .iter()
            .position(|v| v.role == SemanticCoordType::CoordOdd)
            .filter(|&i| i + 1 < request.values.len())
            .map_or(self.crval, |i| DVec2::new(degrees(i), degrees(i + 1)));

        let mut out = Vec::with_capacity(request.values.len());
        let mut odd = None;
        for (i, raw) in request.values.iter().enumerate() {
            match raw.role {
                SemanticCoordType::CoordOdd => odd = Some(degrees(i)),
                SemanticCoordType::CoordEven => {
                    let Some(lon) = odd.take() else {
                        return Err(ConversionError::new("latitude without a longitude"));
                    };
                    let world = DVec2::new(lon, degrees(i));
                    let pixel = self
                        .sky_to_pixel(world)
                        .ok_or_else(|| {
                            ConversionError::new(format!("({lon}, {}) is not on the image projection", world.y))
                        })?;
                    out.extend([pixel.x, pixel.y]);
                }
                SemanticCoordType::Distance => out.push(degrees(i) / self.pixel_scale()),
                SemanticCoordType::Angle => {
                    let north = self
                        .north_angle(reference)
                        .ok_or_else(|| ConversionError::new("no north direction at the region position"))?;
                    out.push(degrees(i) + north - 90.0);
                }
                SemanticCoordType::Integer => out.push(raw.param.value),
            }
        }
        if odd.is_some() {
            return Err(ConversionError::new("longitude without a latitude"));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_regions;
    use crate::resolve::{resolve_regions, RawValue};
    use crate::region::{Param, Unit};

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() <= tol, "{a} != {b} (tolerance {tol})");
    }

    fn fk5_wcs() -> TanWcs {
        TanWcs::from_scale_rotation(DVec2::new(50.0, 50.0), DVec2::new(150.0, 30.0), 1.0, 0.0, false, SkyFrame::Fk5)
            .unwrap()
    }

    #[test]
    fn test_sky_pixel_roundtrip() {
        let wcs = TanWcs::from_scale_rotation(
            DVec2::new(512.0, 384.0),
            DVec2::new(10.0, -45.0),
            2.5,
            33.0,
            true,
            SkyFrame::Icrs,
        )
        .unwrap();
        for pixel in [DVec2::new(512.0, 384.0), DVec2::new(1.0, 1.0), DVec2::new(1000.0, 20.0)] {
            let sky = wcs.pixel_to_sky(pixel);
            let back = wcs.sky_to_pixel(sky).unwrap();
            assert_close(back.x, pixel.x, 1e-6);
            assert_close(back.y, pixel.y, 1e-6);
        }
        assert_close(wcs.pixel_scale() * 3600.0, 2.5, 1e-12);
    }

    #[test]
    fn test_far_side_does_not_project() {
        assert_eq!(fk5_wcs().sky_to_pixel(DVec2::new(330.0, -30.0)), None);
    }

    #[test]
    fn test_from_header_cd_and_cdelt_agree() {
        let base = ImageHeader::new()
            .with("CTYPE1", "RA---TAN")
            .with("CTYPE2", "DEC--TAN")
            .with("CRPIX1", 100.0)
            .with("CRPIX2", 200.0)
            .with("CRVAL1", 83.6)
            .with("CRVAL2", 22.0)
            .with("RADESYS", "FK5");
        let cdelt = base.clone().with("CDELT1", -0.001).with("CDELT2", 0.001).with("CROTA2", 20.0);
        let (s, c) = 20f64.to_radians().sin_cos();
        let cd = base
            .with("CD1_1", -0.001 * c)
            .with("CD1_2", -0.001 * s)
            .with("CD2_1", -0.001 * s)
            .with("CD2_2", 0.001 * c);

        let a = TanWcs::from_header(&cdelt).unwrap();
        let b = TanWcs::from_header(&cd).unwrap();
        assert_eq!(a.frame, SkyFrame::Fk5);
        assert_eq!(a.projection, Projection::Tan);
        let p = a.sky_to_pixel(DVec2::new(83.65, 22.03)).unwrap();
        let q = b.sky_to_pixel(DVec2::new(83.65, 22.03)).unwrap();
        assert_close(p.x, q.x, 1e-9);
        assert_close(p.y, q.y, 1e-9);
    }

    #[test]
    fn test_header_errors_and_frames() {
        let missing = ImageHeader::new().with("CTYPE1", "RA---TAN").with("CRPIX1", 1.0);
        let err = TanWcs::from_header(&missing).unwrap_err();
        assert!(err.reason.contains("CRPIX2"), "{err}");
        assert!(TanWcs::from_header(&ImageHeader::new()).is_err());

        let header = |ctype: &str| {
            ImageHeader::new()
                .with("CTYPE1", ctype)
                .with("CRPIX1", 1.0)
                .with("CRPIX2", 1.0)
                .with("CRVAL1", 0.0)
                .with("CRVAL2", 0.0)
                .with("CDELT1", 1.0)
                .with("CDELT2", 1.0)
        };
        assert_eq!(TanWcs::from_header(&header("GLON-TAN")).unwrap().frame, SkyFrame::Galactic);
        assert_eq!(TanWcs::from_header(&header("ELON-TAN")).unwrap().frame, SkyFrame::Ecliptic);
        assert_eq!(TanWcs::from_header(&header("RA---TAN").with("EQUINOX", 1950.0)).unwrap().frame, SkyFrame::Fk4);
        assert_eq!(TanWcs::from_header(&header("RA---TAN")).unwrap().frame, SkyFrame::Icrs);
        assert_eq!(TanWcs::from_header(&header("LINEAR")).unwrap().projection, Projection::Linear);
        assert!(TanWcs::from_header(&header("RA---SIN")).is_err());
    }

    #[test]
    fn test_linear_axes() {
        let header = ImageHeader::new()
            .with("CTYPE1", "LINEAR")
            .with("CRPIX1", 1.0)
            .with("CRPIX2", 1.0)
            .with("CRVAL1", 10.0)
            .with("CRVAL2", 20.0)
            .with("CDELT1", 0.5)
            .with("CDELT2", 0.5);
        let wcs = TanWcs::from_header(&header).unwrap();
        let p = wcs.sky_to_pixel(DVec2::new(12.0, 21.0)).unwrap();
        assert_close(p.x, 5.0, 1e-12);
        assert_close(p.y, 3.0, 1e-12);
    }

    #[test]
    fn test_resolves_circle_at_reference_pixel() {
        let out = parse_regions("fk5\ncircle(10:00:00,+30:00:00,36\")");
        assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
        let wcs = fk5_wcs();
        let res = resolve_regions(&out.regions, &ImageHeader::new(), Some(&wcs));
        let p = &res.regions[0].params;
        assert_close(p[0], 50.0, 1e-9);
        assert_close(p[1], 50.0, 1e-9);
        assert_close(p[2], 36.0, 1e-9);
    }

    #[test]
    fn test_angles_follow_north() {
        let (crpix, crval) = (DVec2::new(50.0, 50.0), DVec2::new(150.0, 30.0));
        let wcs = TanWcs::from_scale_rotation(crpix, crval, 1.0, 30.0, false, SkyFrame::Fk5).unwrap();
        let header = ImageHeader::new();
        let request = TransformRequest {
            system: CoordSystemTag::Sky(SkyFrame::Native),
            values: vec![
                RawValue { role: SemanticCoordType::CoordOdd, param: Param::new(150.0, Unit::Degree) },
                RawValue { role: SemanticCoordType::CoordEven, param: Param::new(30.0, Unit::Degree) },
                RawValue { role: SemanticCoordType::Angle, param: Param::new(10.0, Unit::Degree) },
            ],
            header: &header,
        };
        let out = wcs.resolve(&request).unwrap();
        assert_close(out[2], -20.0, 1e-6);
    }

    #[test]
    fn test_frame_mismatch_is_rejected() {
        let header = ImageHeader::new();
        let request = TransformRequest {
            system: CoordSystemTag::Sky(SkyFrame::Galactic),
            values: vec![RawValue { role: SemanticCoordType::Distance, param: Param::new(1.0, Unit::Arcsec) }],
            header: &header,
        };
        let err = fk5_wcs().resolve(&request).unwrap_err();
        assert!(err.reason.contains("galactic"), "{err}");

        let image = TransformRequest { system: CoordSystemTag::Image, ..request };
        assert_close(fk5_wcs().resolve(&image).unwrap()[0], 1.0, 1e-9);
    }
}
