//! Output path resolution.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::CropError;

/// The spreadsheet document a selection belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File name as the host reports it, e.g. `Book1.xlsx`
    pub name: String,
    /// Where the document is saved; `None` for a document never written to disk
    pub location: Option<PathBuf>,
}

impl SourceDocument {
    /// Describe a document by its path. Only an existing file counts as saved.
    pub fn from_path(path: &Path) -> Result<Self, CropError> {
        let name = path
            .file_name()
            .ok_or_else(|| CropError::Source(format!("{} has no file name", path.display())))?
            .to_string_lossy()
            .into_owned();
        let location = path.is_file().then(|| path.to_path_buf());
        Ok(Self { name, location })
    }
}

/// What is currently selected in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub sheet: String,
    /// Name of the active chart, if one is selected
    pub chart: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Chart,
    /// No chart was selected; the sheet's print range is exported instead
    Range,
}

/// A resolved output location, shared by the intermediate export and the final SVG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPath {
    pub dir: PathBuf,
    pub stem: String,
    pub kind: SelectionKind,
}

impl OutputPath {
    /// The concrete file path for an extension such as `pdf` or `svg`.
    pub fn with_extension(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", self.stem, ext))
    }
}

/// Resolve where an export of `selection` goes, falling back to the home directory.
pub fn resolve_output_path(document: &SourceDocument, selection: &Selection) -> OutputPath {
    resolve_output_path_in(document, selection, &default_fallback_dir())
}

/// Like [`resolve_output_path`], with an explicit directory for unsaved documents.
pub fn resolve_output_path_in(
    document: &SourceDocument,
    selection: &Selection,
    fallback_dir: &Path,
) -> OutputPath {
    let (name, kind) = match &selection.chart {
        Some(chart) => (chart.as_str(), SelectionKind::Chart),
        None => {
            warn!(
                sheet = %selection.sheet,
                "no chart is selected; exporting the range instead"
            );
            (selection.sheet.as_str(), SelectionKind::Range)
        }
    };

    let stem = format!("{} {}", document_stem(&document.name), name).replace(' ', "_");

    let dir = document
        .location
        .as_deref()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback_dir.to_path_buf());

    OutputPath { dir, stem, kind }
}

/// The current user's home directory, or the working directory if there is none.
pub fn default_fallback_dir() -> PathBuf {
    dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Everything before the first dot: `Book1.xlsx` -> `Book1`.
fn document_stem(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}
