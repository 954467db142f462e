//! Viewbox reduction: crop the page padding off an exported chart.
//!
//! A PDF page converted to SVG keeps the full page as its `viewBox`. The
//! chart itself sits inside clip paths (`cp0`, `cp1`, ...) whose rectangles
//! bound the plotted area, so the union of those rectangles is the content
//! extent. Clip geometry is measured in page space with the origin at the
//! bottom, hence the flip against the page edge taken from the first
//! `matrix(...)` transform.

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use tracing::{debug, warn};

use crate::error::CropError;
use crate::parse::parse_svg;
use crate::path::parse_path;
use crate::{Options, ScanMode};

/// Clip path ids written by the page converter start with this.
const CLIP_ID_PREFIX: &str = "cp";

static CLIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<clipPath id="cp.*?\n<path transform.*? d="(.*?)""#).unwrap());
static POINT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ML] (\S+) (\S+)").unwrap());
static MATRIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#""matrix\(.*,(.*)\)""#).unwrap());
static VIEWBOX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"viewBox=".*?""#).unwrap());
static SIZE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#" width=".*?" height=".*?""#).unwrap());

/// Tight bounds of the clip geometry plus the page edge used for the flip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub y_edge: f64,
}

impl BoundingBox {
    /// Format as a `viewBox` value: `min-x min-y width height`.
    pub fn view_box(&self, precision: u8) -> String {
        let p = precision as usize;
        format!(
            "{:.p$} {:.p$} {:.p$} {:.p$}",
            self.x_min,
            self.y_edge - self.y_max,
            self.x_max - self.x_min,
            self.y_max - self.y_min,
        )
    }
}

/// Running extents. Maxima start at zero, as page coordinates are never negative.
struct Extents {
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    points: usize,
}

impl Extents {
    fn new() -> Self {
        Self {
            x_min: f64::INFINITY,
            x_max: 0.0,
            y_min: f64::INFINITY,
            y_max: 0.0,
            points: 0,
        }
    }

    fn add(&mut self, x: f64, y: f64) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
        self.points += 1;
    }

    fn finish(self, y_edge: f64) -> Result<BoundingBox, CropError> {
        if self.points == 0 {
            return Err(CropError::NoGeometry);
        }
        Ok(BoundingBox {
            x_min: self.x_min,
            x_max: self.x_max,
            y_min: self.y_min,
            y_max: self.y_max,
            y_edge,
        })
    }
}

/// What a scan of the markup turned up.
struct Scan {
    extents: Extents,
    /// Raw `matrix(...)` transforms in document order
    transforms: Vec<String>,
}

/// Reduce the viewBox with default options.
pub fn reduce_viewbox(svg: &str) -> Result<String, CropError> {
    reduce_viewbox_with_options(svg, &Options::default())
}

/// Crop the page padding: measure the content, then rewrite the root attributes.
///
/// Nothing is returned unless the whole measurement succeeds.
pub fn reduce_viewbox_with_options(svg: &str, options: &Options) -> Result<String, CropError> {
    let bbox = measure(svg, options)?;
    let view_box = bbox.view_box(options.precision);
    debug!(?bbox, %view_box, "computed content bounds");
    Ok(rewrite_root(svg, &view_box))
}

/// Compute the content bounding box of a page export.
pub fn measure(svg: &str, options: &Options) -> Result<BoundingBox, CropError> {
    let scan = match options.scan {
        ScanMode::Tree => scan_tree(svg)?,
        ScanMode::Pattern => scan_pattern(svg)?,
    };
    debug!(
        points = scan.extents.points,
        transforms = scan.transforms.len(),
        mode = ?options.scan,
        "scanned page markup"
    );

    let first = scan.transforms.first().ok_or(CropError::MissingTransform)?;
    let y_edge = matrix_edge(first)?;

    if options.check_transforms {
        for transform in &scan.transforms[1..] {
            let found = matrix_edge(transform)?;
            if found != y_edge {
                return Err(CropError::InconsistentTransform {
                    first: y_edge,
                    found,
                });
            }
        }
    }

    scan.extents.finish(y_edge)
}

/// Replace the first `viewBox` and drop the first `width`/`height` pair.
///
/// Works on the original text so every other byte is left as it was.
pub fn rewrite_root(svg: &str, view_box: &str) -> String {
    if !VIEWBOX_RE.is_match(svg) {
        warn!("markup has no viewBox attribute; leaving it unset");
    }
    let replacement = format!(r#"viewBox="{}""#, view_box);
    let svg = VIEWBOX_RE.replacen(svg, 1, NoExpand(&replacement));
    SIZE_RE.replacen(&svg, 1, "").into_owned()
}

fn scan_tree(svg: &str) -> Result<Scan, CropError> {
    let doc = parse_svg(svg)?;

    let mut clip_data = Vec::new();
    let mut transforms = Vec::new();
    doc.for_each_element(|elem| {
        let is_clip_def = elem.is("clipPath")
            && elem
                .get_attr("id")
                .is_some_and(|id| id.starts_with(CLIP_ID_PREFIX));
        if is_clip_def {
            if let Some(d) = elem
                .child_elements()
                .find(|child| child.is("path"))
                .and_then(|path| path.get_attr("d"))
            {
                clip_data.push(d.to_string());
            }
        }

        // Any transform-like attribute counts (gradientTransform, patternTransform, ...)
        for attr in &elem.attributes {
            if attr.value.trim_start().starts_with("matrix(") {
                transforms.push(attr.value.clone());
            }
        }
    });

    let mut extents = Extents::new();
    for d in &clip_data {
        for (x, y) in parse_path(d)?.corners() {
            extents.add(x, y);
        }
    }

    Ok(Scan {
        extents,
        transforms,
    })
}

fn scan_pattern(svg: &str) -> Result<Scan, CropError> {
    let mut extents = Extents::new();
    for clip in CLIP_RE.captures_iter(svg) {
        let d = &clip[1];
        for point in POINT_RE.captures_iter(d) {
            let x = parse_operand(&point[1], d)?;
            let y = parse_operand(&point[2], d)?;
            extents.add(x, y);
        }
    }

    let transforms = MATRIX_RE
        .captures_iter(svg)
        .map(|m| format!("matrix(0,{})", &m[1]))
        .collect();

    Ok(Scan {
        extents,
        transforms,
    })
}

fn parse_operand(token: &str, d: &str) -> Result<f64, CropError> {
    token
        .parse()
        .map_err(|_| CropError::InvalidPath(format!("Invalid number {:?} in {:?}", token, d)))
}

/// The last component of `matrix(a,b,c,d,e,f)`: the vertical page edge.
fn matrix_edge(transform: &str) -> Result<f64, CropError> {
    let invalid = || CropError::InvalidSvg(format!("Invalid matrix transform: {}", transform));

    let args = transform
        .trim()
        .strip_prefix("matrix(")
        .and_then(|rest| rest.split(')').next())
        .ok_or_else(invalid)?;
    let last = args
        .split(|c: char| c == ',' || c.is_ascii_whitespace())
        .filter(|s| !s.is_empty())
        .last()
        .ok_or_else(invalid)?;
    last.trim().parse().map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="100" height="100" viewBox="0 0 100 100">
<defs>
<clipPath id="cp0">
<path transform="matrix(1,0,0,1,0,100)" d="M 10 20 L 50 20 L 50 80 L 10 80 "/>
</clipPath>
</defs>
<g clip-path="url(#cp0)">
<path transform="matrix(1,0,0,1,0,100)" d="M 12 22 L 48 78 "/>
</g>
</svg>
"#;

    fn pattern() -> Options {
        Options {
            scan: ScanMode::Pattern,
            ..Options::default()
        }
    }

    #[test]
    fn test_measure_clip_rectangle() {
        let bbox = measure(PAGE, &Options::default()).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                x_min: 10.0,
                x_max: 50.0,
                y_min: 20.0,
                y_max: 80.0,
                y_edge: 100.0,
            }
        );
        assert_eq!(bbox.view_box(2), "10.00 20.00 40.00 60.00");
    }

    #[test]
    fn test_both_scans_agree() {
        let tree = measure(PAGE, &Options::default()).unwrap();
        let pattern = measure(PAGE, &pattern()).unwrap();
        assert_eq!(tree, pattern);
    }

    #[test]
    fn test_reduce_rewrites_root() {
        let out = reduce_viewbox(PAGE).unwrap();
        assert!(out.contains(r#"viewBox="10.00 20.00 40.00 60.00""#));
        assert!(!out.contains(r#"width="100""#));
        assert!(!out.contains(r#"height="100""#));
        // clip reference untouched
        assert!(out.contains(r#"clip-path="url(#cp0)""#));
    }

    #[test]
    fn test_precision() {
        let bbox = measure(PAGE, &Options::default()).unwrap();
        assert_eq!(bbox.view_box(0), "10 20 40 60");
        assert_eq!(bbox.view_box(3), "10.000 20.000 40.000 60.000");
    }

    #[test]
    fn test_union_of_clip_paths() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 600 800">
<clipPath id="cp0">
<path transform="matrix(1,0,0,-1,0,800)" d="M 100 100 L 300 100 L 300 200 L 100 200 Z"/>
</clipPath>
<clipPath id="cp1">
<path transform="matrix(1,0,0,-1,0,800)" d="M 50 150 L 250 150 L 250 400 L 50 400 Z"/>
</clipPath>
</svg>"#;
        for options in [Options::default(), pattern()] {
            let bbox = measure(svg, &options).unwrap();
            assert_eq!(bbox.view_box(2), "50.00 400.00 250.00 300.00");
        }
    }

    #[test]
    fn test_ignores_other_clip_ids() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
<clipPath id="cp0"><path d="M 10 10 L 20 20"/></clipPath>
<clipPath id="mask0"><path d="M 0 0 L 90 90"/></clipPath>
<g transform="matrix(1,0,0,1,0,100)"/>
</svg>"#;
        let bbox = measure(svg, &Options::default()).unwrap();
        assert_eq!((bbox.x_min, bbox.x_max), (10.0, 20.0));
    }

    #[test]
    fn test_no_geometry_is_an_error() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
<g transform="matrix(1,0,0,1,0,100)"><rect width="5" height="5"/></g>
</svg>"#;
        for options in [Options::default(), pattern()] {
            assert!(matches!(
                reduce_viewbox_with_options(svg, &options),
                Err(CropError::NoGeometry)
            ));
        }
    }

    #[test]
    fn test_missing_transform_is_an_error() {
        let svg = PAGE.replace("matrix(1,0,0,1,0,100)", "translate(0,100)");
        for options in [Options::default(), pattern()] {
            assert!(matches!(
                reduce_viewbox_with_options(&svg, &options),
                Err(CropError::MissingTransform)
            ));
        }
    }

    #[test]
    fn test_bad_operand_is_fatal() {
        let svg = PAGE.replace("M 10 20 L 50 20", "M abc 20 L 50 20");
        for options in [Options::default(), pattern()] {
            assert!(matches!(
                reduce_viewbox_with_options(&svg, &options),
                Err(CropError::InvalidPath(_))
            ));
        }
    }

    #[test]
    fn test_close_path_with_trailing_numbers_is_fatal() {
        let svg = PAGE.replace("L 10 80 ", "L 10 80 Z 5 5 ");
        assert!(matches!(
            reduce_viewbox(&svg),
            Err(CropError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_gradient_transform_counts_as_first_matrix() {
        let svg = PAGE.replace(
            "<defs>\n",
            "<defs>\n<linearGradient id=\"g0\" gradientTransform=\"matrix(1,0,0,1,0,50)\"/>\n",
        );
        let tree = measure(&svg, &Options::default()).unwrap();
        let pattern = measure(&svg, &pattern()).unwrap();
        assert_eq!(tree.y_edge, 50.0);
        assert_eq!(tree, pattern);
    }

    #[test]
    fn test_first_transform_wins() {
        let svg = PAGE.replacen("matrix(1,0,0,1,0,100)", "matrix(1,0,0,1,0,90)", 1);
        let bbox = measure(&svg, &Options::default()).unwrap();
        assert_eq!(bbox.y_edge, 90.0);
    }

    #[test]
    fn test_check_transforms_rejects_mismatch() {
        let svg = PAGE.replacen("matrix(1,0,0,1,0,100)", "matrix(1,0,0,1,0,90)", 1);
        for scan in [ScanMode::Tree, ScanMode::Pattern] {
            let options = Options {
                scan,
                check_transforms: true,
                ..Options::default()
            };
            match measure(&svg, &options) {
                Err(CropError::InconsistentTransform { first, found }) => {
                    assert_eq!((first, found), (90.0, 100.0));
                }
                other => panic!("expected InconsistentTransform, got {:?}", other),
            }
        }

        let options = Options {
            check_transforms: true,
            ..Options::default()
        };
        assert!(measure(PAGE, &options).is_ok());
    }

    #[test]
    fn test_matrix_edge() {
        assert_eq!(matrix_edge("matrix(1,0,0,-1,0,792)").unwrap(), 792.0);
        assert_eq!(matrix_edge("matrix(1 0 0 -1 0 841.89)").unwrap(), 841.89);
        assert!(matrix_edge("matrix(1,0,0,-1,0,top)").is_err());
    }

    #[test]
    fn test_rewrite_only_first_viewbox() {
        let svg = r#"<svg viewBox="0 0 1 1"><svg viewBox="0 0 2 2"/></svg>"#;
        let out = rewrite_root(svg, "1 2 3 4");
        assert_eq!(out, r#"<svg viewBox="1 2 3 4"><svg viewBox="0 0 2 2"/></svg>"#);
    }

    #[test]
    fn test_rewrite_without_size_only_touches_viewbox() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 9 9"><rect x="1"/></svg>"#;
        let out = rewrite_root(svg, "1 1 2 2");
        assert_eq!(out, svg.replace(r#"viewBox="0 0 9 9""#, r#"viewBox="1 1 2 2""#));
    }
}
