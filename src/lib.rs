//! # Rusty Region Filter
//!
//! Parses DS9/CIAO region files with nom and turns them into spatial filters.
//!
//! Text flows through the modules in order: [`lexer`] splits lines into
//! statements, [`parser`] builds a [`RegionList`], [`resolve`] maps every region
//! to image pixels (handing sky coordinates to a [`WcsResolver`]), [`geometry`]
//! answers containment questions and [`raster`] evaluates them over a pixel grid.
//!
//! Python bindings via PyO3 are available behind the `python` feature.

pub mod attributes;
pub mod error;
pub mod geometry;
pub mod lexer;
pub mod parser;
pub mod raster;
pub mod region;
pub mod resolve;
pub mod semantic_parsers;
pub mod shape_defs;
pub mod wcs;

#[cfg(feature = "python")]
mod python;

pub use attributes::{AttributeValue, Attributes, SourceKind};
pub use error::{
    Arity, Cancelled, ConversionError, Diagnostic, InvalidGeometry, LexError, ParseError, RegionError,
    UnsupportedFeature,
};
pub use geometry::{contains_all, PixelRegion, Shape};
pub use parser::{parse_regions, parse_regions_with, ParseContext, ParseOptions, ParseOutput};
pub use raster::{rasterize, rasterize_with, Mask, RasterOptions};
pub use region::{CoordSystemTag, Param, Region, RegionList, Sign, SkyFrame, Unit};
pub use resolve::{resolve_regions, ImageHeader, Resolution, TransformRequest, WcsResolver};
pub use shape_defs::ShapeKind;
pub use wcs::TanWcs;

/// Parses `text`, resolves it against `header` and rasterizes it over `shape`.
///
/// Statements using unsupported features are skipped; any rejected statement or
/// region that cannot be resolved is an error.
pub fn filter_mask(
    text: &str,
    header: &ImageHeader,
    wcs: Option<&dyn WcsResolver>,
    shape: (usize, usize),
) -> Result<Mask, RegionError> {
    let parsed = parse_regions(text);
    if let Some(fatal) = parsed.diagnostics.into_iter().find(Diagnostic::is_fatal) {
        return Err(fatal.into());
    }
    let regions = resolve_regions(&parsed.regions, header, wcs).strict()?;
    Ok(rasterize(&regions, shape))
}
