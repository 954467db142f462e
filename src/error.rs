use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CropError {
    #[error("XML parsing error: {0}")]
    XmlParse(#[from] quick_xml::Error),

    #[error("Invalid SVG: {0}")]
    InvalidSvg(String),

    #[error("Invalid path data: {0}")]
    InvalidPath(String),

    #[error("No clip-path geometry found; is this a single-page chart export?")]
    NoGeometry,

    #[error("No matrix(...) transform found; cannot locate the page edge")]
    MissingTransform,

    #[error("Transforms disagree on the page edge: first is {first}, found {found}")]
    InconsistentTransform { first: f64, found: f64 },

    #[error("Page conversion failed: {0}")]
    Conversion(String),

    #[error("Source document error: {0}")]
    Source(String),

    #[error("Invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
