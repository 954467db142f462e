//! chartcrop - export spreadsheet charts to tightly cropped SVG
//!
//! A chart exported through a PDF page and converted to SVG carries the whole
//! page around it. chartcrop measures the chart's clip geometry, shrinks the
//! `viewBox` to it and drops the fixed page size, so the image scales to its
//! content.

mod ast;
mod config;
mod error;
mod export;
mod parse;
mod path;
mod reduce;
mod resolve;

pub use ast::*;
pub use config::*;
pub use error::*;
pub use export::*;
pub use parse::*;
pub use path::{Command, Path as PathData, parse_path};
pub use reduce::*;
pub use resolve::*;

use serde::Deserialize;

/// How clip geometry and transforms are located in the markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Walk the parsed element tree
    #[default]
    Tree,
    /// Match the converter's line layout textually
    Pattern,
}

/// Reduction options.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Number of decimal places in the viewBox (default: 2)
    pub precision: u8,
    /// Scanning strategy
    pub scan: ScanMode,
    /// Require every `matrix(...)` transform to agree on the page edge
    pub check_transforms: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            precision: 2,
            scan: ScanMode::Tree,
            check_transforms: false,
        }
    }
}
