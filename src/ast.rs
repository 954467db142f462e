//! Element tree for scanning exported page markup.
//!
//! Only element names, attributes and nesting are kept; text, comments and
//! namespace prefixes play no part in measuring a page.

/// A parsed SVG page.
#[derive(Debug, Clone)]
pub struct Document {
    /// The root SVG element
    pub root: Element,
}

/// An SVG/XML element.
#[derive(Debug, Clone)]
pub struct Element {
    /// Local name, without any namespace prefix (e.g., "svg", "clipPath")
    pub name: String,
    /// Attributes on this element, in source order
    pub attributes: Vec<Attribute>,
    /// Child elements
    pub children: Vec<Element>,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    /// Local name, without any namespace prefix
    pub name: String,
    pub value: String,
}

/// Strip a namespace prefix: `svg:clipPath` -> `clipPath`.
pub fn local_name(s: &str) -> &str {
    s.split_once(':').map_or(s, |(_, local)| local)
}

impl Element {
    /// Get an attribute value by local name.
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Check if this element has a specific local name.
    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter()
    }
}

impl Document {
    /// Visit all elements in document order.
    pub fn for_each_element(&self, mut f: impl FnMut(&Element)) {
        fn visit(elem: &Element, f: &mut impl FnMut(&Element)) {
            f(elem);
            for child in elem.child_elements() {
                visit(child, f);
            }
        }
        visit(&self.root, &mut f);
    }
}
