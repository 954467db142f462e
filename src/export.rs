//! Export orchestration: host page export, conversion, crop, write.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::Options;
use crate::error::CropError;
use crate::reduce::reduce_viewbox_with_options;
use crate::resolve::{
    Selection, SourceDocument, default_fallback_dir, resolve_output_path_in,
};

/// The host application holding the chart.
pub trait SourceProvider {
    /// Identity and location of the document being exported.
    fn document(&self) -> Result<SourceDocument, CropError>;

    /// The active selection: a chart, or a sheet whose range is printed.
    fn selection(&self) -> Result<Selection, CropError>;

    /// Export the active selection as a single-page PDF at `target`.
    fn export_page(&self, target: &Path) -> Result<(), CropError>;
}

/// Turns the first page of a PDF into SVG markup.
pub trait PageConverter {
    fn first_page_svg(&self, pdf: &Path) -> Result<String, CropError>;
}

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub reduce: Options,
    /// Leave the intermediate PDF next to the SVG
    pub keep_intermediate: bool,
    /// Directory for unsaved documents; the home directory when unset
    pub fallback_dir: Option<PathBuf>,
}

/// Export the active selection of `source` to a cropped SVG and return its path.
///
/// If anything fails after the page export, the intermediate PDF may be left
/// behind; no SVG is written unless the crop succeeded.
pub fn export_selection(
    source: &dyn SourceProvider,
    converter: &dyn PageConverter,
    options: &ExportOptions,
) -> Result<PathBuf, CropError> {
    let document = source.document()?;
    let selection = source.selection()?;

    let fallback = options
        .fallback_dir
        .clone()
        .unwrap_or_else(default_fallback_dir);
    let output = resolve_output_path_in(&document, &selection, &fallback);
    let pdf_path = output.with_extension("pdf");
    let svg_path = output.with_extension("svg");

    debug!(pdf = %pdf_path.display(), "exporting page");
    source.export_page(&pdf_path)?;

    let svg = converter.first_page_svg(&pdf_path)?;
    let svg = reduce_viewbox_with_options(&svg, &options.reduce)?;
    fs::write(&svg_path, svg)?;

    if !options.keep_intermediate {
        fs::remove_file(&pdf_path)?;
    }

    info!("svg produced: {}", svg_path.display());
    Ok(svg_path)
}

/// A document on disk whose page export the host has already written.
///
/// "Exporting" copies that PDF to the resolved location.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub document_path: PathBuf,
    pub page_pdf: PathBuf,
    pub selection: Selection,
}

impl SourceProvider for FileSource {
    fn document(&self) -> Result<SourceDocument, CropError> {
        SourceDocument::from_path(&self.document_path)
    }

    fn selection(&self) -> Result<Selection, CropError> {
        Ok(self.selection.clone())
    }

    fn export_page(&self, target: &Path) -> Result<(), CropError> {
        if !self.page_pdf.is_file() {
            return Err(CropError::Source(format!(
                "page export {} does not exist",
                self.page_pdf.display()
            )));
        }
        if target.exists() && fs::canonicalize(target)? == fs::canonicalize(&self.page_pdf)? {
            return Err(CropError::Source(format!(
                "page export {} is already at the output location and would be deleted",
                self.page_pdf.display()
            )));
        }
        fs::copy(&self.page_pdf, target)?;
        Ok(())
    }
}

/// Converts pages with MuPDF's `mutool draw`.
#[derive(Debug, Clone)]
pub struct MutoolConverter {
    pub program: String,
}

impl Default for MutoolConverter {
    fn default() -> Self {
        Self {
            program: "mutool".to_string(),
        }
    }
}

impl PageConverter for MutoolConverter {
    fn first_page_svg(&self, pdf: &Path) -> Result<String, CropError> {
        let scratch = tempfile::Builder::new()
            .prefix("chartcrop-")
            .suffix(".svg")
            .tempfile()?;

        let output = Command::new(&self.program)
            .args(["draw", "-q", "-F", "svg", "-o"])
            .arg(scratch.path())
            .arg(pdf)
            .arg("1")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| CropError::Conversion(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CropError::Conversion(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(fs::read_to_string(scratch.path())?)
    }
}
