// --- Python bindings ---

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyTuple};

use crate::attributes::{AttributeValue, Attributes, SourceKind};
use crate::lexer::{lex_line, Statement};
use crate::parser::{
    parse_coord_system_keyword, parse_regions as parse_region_text, CoordSystemDecl, ParseContext, ParseOptions,
    ParseOutput,
};
use crate::raster::rasterize;
use crate::region::Region;
use crate::resolve::{resolve_regions, ImageHeader};

#[pyclass]
#[derive(Debug, Clone)]
pub struct Shape {
    #[pyo3(get)]
    shape_type: String,
    #[pyo3(get)]
    coordinates: Vec<f64>,
    #[pyo3(get)]
    coord_system: String,
    #[pyo3(get)]
    exclude: bool,
    #[pyo3(get)]
    line: usize,
    /// Unit suffix of each coordinate as written, `""` when there was none.
    #[pyo3(get)]
    units: Vec<String>,
    attributes_internal: Attributes,
    statement: String,
}

impl From<&Region> for Shape {
    fn from(region: &Region) -> Self {
        Shape {
            shape_type: region.kind().name().to_string(),
            coordinates: region.params().iter().map(|p| p.value).collect(),
            coord_system: region.coord_system().to_string(),
            exclude: region.is_excluded(),
            line: region.source_line(),
            units: region.params().iter().map(|p| p.unit.suffix().to_string()).collect(),
            attributes_internal: region.attributes().clone(),
            statement: region.to_string(),
        }
    }
}

#[pymethods]
impl Shape {
    #[getter]
    fn properties(&self, py: Python<'_>) -> PyResult<Py<PyDict>> {
        Ok(attributes_to_dict(py, &self.attributes_internal)?.into())
    }

    #[getter]
    fn tags(&self, py: Python<'_>) -> PyResult<Py<PyList>> {
        Ok(PyList::new_bound(py, &self.attributes_internal.tags).into())
    }

    fn __repr__(&self) -> String {
        format!("Shape({}; {})", self.coord_system, self.statement)
    }
}

fn attribute_to_py(py: Python<'_>, value: &AttributeValue) -> PyObject {
    match value {
        AttributeValue::String(s) => s.into_py(py),
        AttributeValue::Number(n) => n.into_py(py),
        AttributeValue::NumberList(nl) => nl.clone().into_py(py),
        AttributeValue::Flag(b) => b.into_py(py),
    }
}

fn attributes_to_dict<'py>(py: Python<'py>, attrs: &Attributes) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("color", attrs.color())?;
    dict.set_item("width", attrs.width())?;
    dict.set_item("font", attrs.font())?;
    dict.set_item("fixed", attrs.is_fixed())?;
    dict.set_item("source", attrs.source_kind() == SourceKind::Source)?;
    if let Some(text) = &attrs.text {
        dict.set_item("text", text)?;
    }
    for (k, v) in &attrs.other {
        dict.set_item(k, attribute_to_py(py, v))?;
    }
    Ok(dict)
}

fn first_error(out: &ParseOutput) -> Option<String> {
    out.diagnostics.iter().find(|d| d.is_fatal()).map(ToString::to_string)
}

/// Parses one line on its own: `(coord_system, shape, global_attributes, comment)`.
#[pyfunction]
fn parse_region_line(py: Python<'_>, line: &str) -> PyResult<PyObject> {
    let record = lex_line(1, line);
    let mut ctx = ParseContext::new(&ParseOptions::default());
    let mut out = ParseOutput::default();
    ctx.feed(&record, &mut out);
    if let Some(message) = first_error(&out) {
        return Err(PyValueError::new_err(message));
    }

    let mut declared = None;
    let mut has_global = false;
    for statement in &record.statements {
        if let Statement::Directive { keyword, .. } = statement {
            match parse_coord_system_keyword(keyword) {
                Some(CoordSystemDecl::Supported(tag)) => declared = Some(tag.to_string()),
                _ => has_global |= keyword.eq_ignore_ascii_case("global"),
            }
        }
    }

    let py_shape = match out.regions.get(0) {
        Some(region) => Py::new(py, Shape::from(region))?.into_py(py),
        None => py.None(),
    };
    let py_global = if has_global {
        attributes_to_dict(py, ctx.global_attributes())?.into_py(py)
    } else {
        py.None()
    };
    let result_elements: [PyObject; 4] =
        [declared.into_py(py), py_shape, py_global, record.comment.map(str::to_string).into_py(py)];
    Ok(PyTuple::new_bound(py, &result_elements).into_py(py))
}

/// Parses a whole file: `(shapes, diagnostics)`. Skipped statements only show up
/// in the diagnostics.
#[pyfunction]
fn parse_regions(text: &str) -> (Vec<Shape>, Vec<String>) {
    let out = parse_region_text(text);
    let shapes = out.regions.iter().map(Shape::from).collect();
    let diagnostics = out.diagnostics.iter().map(ToString::to_string).collect();
    (shapes, diagnostics)
}

/// Rasterizes an image/physical region file into rows of booleans.
#[pyfunction]
fn rasterize_regions(text: &str, height: usize, width: usize) -> PyResult<Vec<Vec<bool>>> {
    let out = parse_region_text(text);
    let regions = resolve_regions(&out.regions, &ImageHeader::new(), None)
        .strict()
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    let mask = rasterize(&regions, (height, width));
    Ok(mask.rows().map(<[bool]>::to_vec).collect())
}

#[pymodule]
fn rusty_region_filter(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(parse_region_line, m)?)?;
    m.add_function(wrap_pyfunction!(parse_regions, m)?)?;
    m.add_function(wrap_pyfunction!(rasterize_regions, m)?)?;
    m.add_class::<Shape>()?;
    Ok(())
}
