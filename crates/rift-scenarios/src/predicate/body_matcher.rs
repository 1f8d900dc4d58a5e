//! Structured body comparison: JSON equality, XML equality and XPath.

use serde_json::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use sxd_document::dom::{ChildOfElement, ChildOfRoot, Element};
use sxd_document::parser;
use sxd_xpath::{Context, Factory, Value as XPathValue, XPath};

const XMLNS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// Options for [`json_equals`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonComparison {
    /// Arrays match as multisets instead of sequences.
    pub ignore_array_order: bool,
    /// The actual document may carry object keys and array elements the
    /// expected one does not.
    pub ignore_extra_elements: bool,
}

/// Semantic JSON equality.
///
/// Object key order never matters. Numbers compare by value, so `1` equals `1.0`.
pub fn json_equals(actual: &Value, expected: &Value, options: JsonComparison) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => {
            if !options.ignore_extra_elements && actual.len() != expected.len() {
                return false;
            }
            expected.iter().all(|(key, expected_value)| {
                actual
                    .get(key)
                    .is_some_and(|actual_value| json_equals(actual_value, expected_value, options))
            })
        }
        (Value::Array(actual), Value::Array(expected)) => array_equals(actual, expected, options),
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

fn array_equals(actual: &[Value], expected: &[Value], options: JsonComparison) -> bool {
    if options.ignore_extra_elements {
        if actual.len() < expected.len() {
            return false;
        }
    } else if actual.len() != expected.len() {
        return false;
    }

    if !options.ignore_array_order {
        return expected
            .iter()
            .zip(actual)
            .all(|(e, a)| json_equals(a, e, options));
    }

    unordered_match(actual, expected, options)
}

/// Whether every expected element can be paired with a distinct actual one.
///
/// Pairwise comparisons are computed once, then pairs are found by
/// augmenting paths (Kuhn's algorithm), so repeated elements cost
/// O(n^3) at worst instead of trying every permutation.
fn unordered_match(actual: &[Value], expected: &[Value], options: JsonComparison) -> bool {
    let compatible: Vec<Vec<usize>> = expected
        .iter()
        .map(|e| {
            actual
                .iter()
                .enumerate()
                .filter(|(_, a)| json_equals(a, e, options))
                .map(|(i, _)| i)
                .collect()
        })
        .collect();

    if compatible.iter().any(Vec::is_empty) {
        return false;
    }

    // owner[i] = expected element currently paired with actual[i]
    let mut owner: Vec<Option<usize>> = vec![None; actual.len()];
    for e in 0..expected.len() {
        let mut visited = vec![false; actual.len()];
        if !augment(e, &compatible, &mut owner, &mut visited) {
            return false;
        }
    }
    true
}

fn augment(
    e: usize,
    compatible: &[Vec<usize>],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for &a in &compatible[e] {
        if visited[a] {
            continue;
        }
        visited[a] = true;
        let free = match owner[a] {
            None => true,
            Some(other) => augment(other, compatible, owner, visited),
        };
        if free {
            owner[a] = Some(e);
            return true;
        }
    }
    false
}

/// An XML document reduced to what structural equality compares.
///
/// Element names (namespace and local part), attributes and child elements
/// must agree. Attribute order, namespace prefixes, comments and
/// whitespace-only text are dropped; other text is kept trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlTree {
    root: XmlElement,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct XmlElement {
    name: (Option<String>, String),
    /// Sorted (namespace, local part, value) triples
    attributes: Vec<(Option<String>, String, String)>,
    children: Vec<XmlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlTree {
    /// Parse a document, failing on malformed XML or a missing root element.
    pub fn parse(text: &str) -> Result<Self, String> {
        let package = parser::parse(text).map_err(|e| e.to_string())?;
        let document = package.as_document();
        let root = root_element(&document).ok_or("document has no root element")?;
        Ok(XmlTree {
            root: XmlElement::from_dom(root),
        })
    }

    /// Whether `body` is structurally equal to this document.
    /// Unparseable bodies never match.
    pub fn matches(&self, body: &str) -> bool {
        XmlTree::parse(body).is_ok_and(|actual| actual == *self)
    }
}

fn root_element<'d>(document: &sxd_document::dom::Document<'d>) -> Option<Element<'d>> {
    document.root().children().into_iter().find_map(|child| match child {
        ChildOfRoot::Element(element) => Some(element),
        _ => None,
    })
}

impl XmlElement {
    fn from_dom(element: Element<'_>) -> Self {
        let name = element.name();
        XmlElement {
            name: (
                name.namespace_uri().map(str::to_string),
                name.local_part().to_string(),
            ),
            attributes: attributes(element),
            children: significant_children(element),
        }
    }
}

fn attributes(element: Element<'_>) -> Vec<(Option<String>, String, String)> {
    let mut attributes: Vec<_> = element
        .attributes()
        .into_iter()
        .filter(|attr| {
            let name = attr.name();
            name.local_part() != "xmlns" && name.namespace_uri() != Some(XMLNS_URI)
        })
        .map(|attr| {
            let name = attr.name();
            (
                name.namespace_uri().map(str::to_string),
                name.local_part().to_string(),
                attr.value().to_string(),
            )
        })
        .collect();
    attributes.sort();
    attributes
}

fn significant_children(element: Element<'_>) -> Vec<XmlNode> {
    let mut nodes = Vec::new();
    let mut text = String::new();

    for child in element.children() {
        match child {
            ChildOfElement::Element(e) => {
                flush_text(&mut text, &mut nodes);
                nodes.push(XmlNode::Element(XmlElement::from_dom(e)));
            }
            ChildOfElement::Text(t) => text.push_str(t.text()),
            _ => {}
        }
    }
    flush_text(&mut text, &mut nodes);
    nodes
}

fn flush_text(text: &mut String, nodes: &mut Vec<XmlNode>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        nodes.push(XmlNode::Text(trimmed.to_string()));
    }
    text.clear();
}

thread_local! {
    // sxd_xpath::XPath is neither Send nor Sync, so compiled expressions are
    // kept per worker thread instead of inside the shared mapping.
    static COMPILED_XPATHS: RefCell<HashMap<String, XPath>> = RefCell::new(HashMap::new());
}

/// An XPath predicate with its namespace bindings.
///
/// The expression is checked when the matcher is built and compiled at most
/// once per thread afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathMatcher {
    expression: String,
    namespaces: BTreeMap<String, String>,
}

impl XPathMatcher {
    pub fn new(expression: &str, namespaces: BTreeMap<String, String>) -> Result<Self, String> {
        let xpath = compile_xpath(expression)?;
        COMPILED_XPATHS.with(|cache| {
            cache.borrow_mut().insert(expression.to_string(), xpath);
        });
        Ok(XPathMatcher {
            expression: expression.to_string(),
            namespaces,
        })
    }

    /// Evaluate against an XML body.
    ///
    /// Node-sets match when non-empty, booleans by value, strings when
    /// non-empty and numbers when not NaN. Unparseable bodies never match.
    pub fn matches(&self, body: &str) -> bool {
        let Ok(package) = parser::parse(body) else {
            return false;
        };
        let document = package.as_document();

        let mut context = Context::new();
        for (prefix, uri) in &self.namespaces {
            context.set_namespace(prefix, uri);
        }

        COMPILED_XPATHS.with(|cache| {
            let mut cache = cache.borrow_mut();
            if !cache.contains_key(&self.expression) {
                match compile_xpath(&self.expression) {
                    Ok(xpath) => {
                        cache.insert(self.expression.clone(), xpath);
                    }
                    Err(_) => return false,
                }
            }
            let Some(xpath) = cache.get(&self.expression) else {
                return false;
            };

            match xpath.evaluate(&context, document.root()) {
                Ok(XPathValue::Nodeset(nodes)) => nodes.iter().next().is_some(),
                Ok(XPathValue::Boolean(b)) => b,
                Ok(XPathValue::String(s)) => !s.is_empty(),
                Ok(XPathValue::Number(n)) => !n.is_nan(),
                Err(_) => false,
            }
        })
    }
}

fn compile_xpath(expression: &str) -> Result<XPath, String> {
    match Factory::new().build(expression) {
        Ok(Some(xpath)) => Ok(xpath),
        Ok(None) => Err("empty expression".to_string()),
        Err(e) => Err(e.to_string()),
    }
}
