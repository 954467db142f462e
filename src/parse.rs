//! SVG parsing from XML.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::ast::*;
use crate::error::CropError;

/// Parse an SVG string into a Document.
pub fn parse_svg(svg: &str) -> Result<Document, CropError> {
    let mut reader = Reader::from_str(svg);

    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                root = Some(parse_element(&mut reader, &start)?);
                break;
            }
            Event::Empty(start) => {
                root = Some(parse_element_start(&start)?);
                break;
            }
            Event::Eof => break,
            // Declaration, doctype, comments and whitespace before the root
            _ => {}
        }
    }

    let root = root.ok_or_else(|| CropError::InvalidSvg("No root element found".into()))?;
    if !root.is("svg") {
        return Err(CropError::InvalidSvg(format!(
            "Root element is <{}>, expected <svg>",
            root.name
        )));
    }

    Ok(Document { root })
}

fn parse_element(reader: &mut Reader<&[u8]>, start: &BytesStart) -> Result<Element, CropError> {
    let mut element = parse_element_start(start)?;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                element.children.push(parse_element(reader, &start)?);
            }
            Event::Empty(start) => {
                element.children.push(parse_element_start(&start)?);
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(CropError::InvalidSvg("Unexpected end of file".into()));
            }
            // Text, CDATA and comments do not affect the page geometry
            _ => {}
        }
    }

    Ok(element)
}

fn parse_element_start(start: &BytesStart) -> Result<Element, CropError> {
    let name_bytes = start.name();
    let name = std::str::from_utf8(name_bytes.as_ref())?;

    let mut element = Element {
        name: local_name(name).to_string(),
        attributes: Vec::new(),
        children: Vec::new(),
    };

    for attr in start.attributes() {
        let attr = attr.map_err(|e| CropError::InvalidSvg(format!("Invalid attribute: {}", e)))?;
        let key = std::str::from_utf8(attr.key.as_ref())?;
        let value = attr.unescape_value()?;
        element.attributes.push(Attribute {
            name: local_name(key).to_string(),
            value: value.into_owned(),
        });
    }

    Ok(element)
}
