//! Value patterns used for URLs, headers, query parameters, cookies and bodies.
//!
//! A pattern is written as a JSON object carrying exactly one operator key,
//! optionally followed by modifiers for that operator:
//!
//! ```json
//! {"equalTo": "abc", "caseInsensitive": true}
//! {"equalToJson": "{\"a\": 1}", "ignoreArrayOrder": true}
//! {"matchesXPath": "//a:item", "xPathNamespaces": {"a": "urn:a"}}
//! ```
//!
//! The operator key is looked up in [`OPERATORS`], a table of
//! discriminant-key/builder pairs, so adding an operator means adding a row.

use super::body_matcher::{json_equals, JsonComparison, XPathMatcher, XmlTree};
use super::error::PatternError;
use super::matcher::compile_full_match;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use regex::Regex;
use serde_json::{Map, Value};
use serde_json_path::JsonPath;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Compiled value pattern.
#[derive(Debug, Clone)]
pub enum StringValuePattern {
    EqualTo {
        expected: String,
        case_insensitive: bool,
    },
    EqualToJson {
        expected: Value,
        comparison: JsonComparison,
    },
    MatchesJsonPath {
        expression: String,
        path: Arc<JsonPath>,
        /// Optional pattern applied to the selected node(s).
        sub: Option<Box<StringValuePattern>>,
    },
    EqualToXml(Arc<XmlTree>),
    MatchesXPath(XPathMatcher),
    Contains(String),
    Matches(Arc<Regex>),
    DoesNotMatch(Arc<Regex>),
    BinaryEqualTo(Vec<u8>),
    Anything,
    /// `true` requires the field to be missing, `false` requires it to be present.
    Absent(bool),
}

type PatternBuilder = fn(&Value, &Map<String, Value>) -> Result<StringValuePattern, PatternError>;

/// Operator keys in lookup order. The first key present in a pattern object wins.
const OPERATORS: &[(&str, PatternBuilder)] = &[
    ("equalTo", build_equal_to),
    ("equalToJson", build_equal_to_json),
    ("matchesJsonPath", build_matches_json_path),
    ("equalToXml", build_equal_to_xml),
    ("matchesXPath", build_matches_xpath),
    ("contains", build_contains),
    ("matches", build_matches),
    ("doesNotMatch", build_does_not_match),
    ("binaryEqualTo", build_binary_equal_to),
    ("anything", build_anything),
    ("absent", build_absent),
];

/// Operator keys accepted by [`StringValuePattern::from_value`].
pub fn operator_keys() -> impl Iterator<Item = &'static str> {
    OPERATORS.iter().map(|(key, _)| *key)
}

impl StringValuePattern {
    /// Build a pattern from its JSON form.
    pub fn from_value(value: &Value) -> Result<Self, PatternError> {
        let object = value
            .as_object()
            .ok_or_else(|| PatternError::NotAnObject(value.to_string()))?;

        for (key, builder) in OPERATORS {
            if let Some(operand) = object.get(*key) {
                return builder(operand, object);
            }
        }

        Err(PatternError::UnknownOperator {
            pattern: value.to_string(),
            expected: operator_keys().collect::<Vec<_>>().join(", "),
        })
    }

    /// Check a value against this pattern.
    ///
    /// `None` means the field does not exist on the request.
    pub fn matches(&self, value: Option<&str>) -> bool {
        match (self, value) {
            (StringValuePattern::Absent(absent), v) => *absent == v.is_none(),
            (StringValuePattern::Anything, _) => true,

            // Every other operator needs a value
            (_, None) => false,

            (
                StringValuePattern::EqualTo {
                    expected,
                    case_insensitive,
                },
                Some(v),
            ) => {
                if *case_insensitive {
                    expected.to_lowercase() == v.to_lowercase()
                } else {
                    expected == v
                }
            }
            (
                StringValuePattern::EqualToJson {
                    expected,
                    comparison,
                },
                Some(v),
            ) => match serde_json::from_str::<Value>(v) {
                Ok(actual) => json_equals(&actual, expected, *comparison),
                Err(_) => false,
            },
            (StringValuePattern::MatchesJsonPath { path, sub, .. }, Some(v)) => {
                let Ok(document) = serde_json::from_str::<Value>(v) else {
                    return false;
                };
                let nodes = path.query(&document);
                match sub {
                    None => !nodes.is_empty(),
                    Some(sub) => nodes.iter().any(|node| sub.matches_json_node(node)),
                }
            }
            (StringValuePattern::EqualToXml(expected), Some(v)) => expected.matches(v),
            (StringValuePattern::MatchesXPath(xpath), Some(v)) => xpath.matches(v),
            (StringValuePattern::Contains(needle), Some(v)) => v.contains(needle.as_str()),
            (StringValuePattern::Matches(regex), Some(v)) => regex.is_match(v),
            (StringValuePattern::DoesNotMatch(regex), Some(v)) => !regex.is_match(v),
            (StringValuePattern::BinaryEqualTo(expected), Some(v)) => {
                v.as_bytes() == expected.as_slice()
            }
        }
    }

    /// Check a raw body against this pattern.
    ///
    /// `binaryEqualTo` compares bytes directly; every other operator sees the
    /// body as (lossy) UTF-8 text.
    pub fn matches_bytes(&self, body: &[u8]) -> bool {
        match self {
            StringValuePattern::BinaryEqualTo(expected) => body == expected.as_slice(),
            _ => self.matches(Some(&String::from_utf8_lossy(body))),
        }
    }

    /// Apply a JSONPath sub-pattern to a selected node.
    ///
    /// Strings are compared by content, everything else by its JSON text, so
    /// `{"equalToJson": ...}` sees objects and `{"equalTo": "1"}` sees numbers.
    fn matches_json_node(&self, node: &Value) -> bool {
        match node {
            Value::String(s) => self.matches(Some(s)),
            other => self.matches(Some(&other.to_string())),
        }
    }
}

fn operand_str<'a>(operator: &'static str, operand: &'a Value) -> Result<&'a str, PatternError> {
    operand.as_str().ok_or(PatternError::InvalidOperand {
        operator,
        expected: "a string",
    })
}

fn flag(object: &Map<String, Value>, key: &str) -> bool {
    object.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn build_equal_to(
    operand: &Value,
    object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    Ok(StringValuePattern::EqualTo {
        expected: operand_str("equalTo", operand)?.to_string(),
        case_insensitive: flag(object, "caseInsensitive"),
    })
}

fn build_equal_to_json(
    operand: &Value,
    object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    // Accept both an embedded JSON document and a string holding one
    let expected = match operand {
        Value::String(text) => serde_json::from_str(text)
            .map_err(|e| PatternError::InvalidJson(e.to_string()))?,
        other => other.clone(),
    };
    Ok(StringValuePattern::EqualToJson {
        expected,
        comparison: JsonComparison {
            ignore_array_order: flag(object, "ignoreArrayOrder"),
            ignore_extra_elements: flag(object, "ignoreExtraElements"),
        },
    })
}

fn build_matches_json_path(
    operand: &Value,
    _object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    // Either "$.path" or {"expression": "$.path", "<operator>": ...}
    let (expression, sub) = match operand {
        Value::String(expression) => (expression.as_str(), None),
        Value::Object(inner) => {
            let expression = inner
                .get("expression")
                .and_then(Value::as_str)
                .ok_or(PatternError::InvalidOperand {
                    operator: "matchesJsonPath",
                    expected: "a string or an object with 'expression'",
                })?;
            let sub = if inner.keys().any(|k| operator_keys().any(|op| op == k)) {
                let sub = StringValuePattern::from_value(operand)
                    .map_err(|e| e.in_field("matchesJsonPath"))?;
                Some(Box::new(sub))
            } else {
                None
            };
            (expression, sub)
        }
        _ => {
            return Err(PatternError::InvalidOperand {
                operator: "matchesJsonPath",
                expected: "a string or an object with 'expression'",
            })
        }
    };

    let path = JsonPath::parse(expression).map_err(|e| PatternError::InvalidJsonPath {
        expression: expression.to_string(),
        message: e.to_string(),
    })?;

    Ok(StringValuePattern::MatchesJsonPath {
        expression: expression.to_string(),
        path: Arc::new(path),
        sub,
    })
}

fn build_equal_to_xml(
    operand: &Value,
    _object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    let expected = XmlTree::parse(operand_str("equalToXml", operand)?)
        .map_err(PatternError::InvalidXml)?;
    Ok(StringValuePattern::EqualToXml(Arc::new(expected)))
}

fn build_matches_xpath(
    operand: &Value,
    object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    let expression = operand_str("matchesXPath", operand)?;

    let namespaces = match object.get("xPathNamespaces") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(prefix, uri)| {
                uri.as_str()
                    .map(|uri| (prefix.clone(), uri.to_string()))
                    .ok_or(PatternError::InvalidOperand {
                        operator: "matchesXPath",
                        expected: "xPathNamespaces values to be strings",
                    })
            })
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(PatternError::InvalidOperand {
                operator: "matchesXPath",
                expected: "xPathNamespaces to be an object",
            })
        }
    };

    let xpath =
        XPathMatcher::new(expression, namespaces).map_err(|message| PatternError::InvalidXPath {
            expression: expression.to_string(),
            message,
        })?;
    Ok(StringValuePattern::MatchesXPath(xpath))
}

fn build_contains(
    operand: &Value,
    _object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    Ok(StringValuePattern::Contains(
        operand_str("contains", operand)?.to_string(),
    ))
}

fn build_matches(
    operand: &Value,
    _object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    let regex = compile_full_match(operand_str("matches", operand)?)?;
    Ok(StringValuePattern::Matches(Arc::new(regex)))
}

fn build_does_not_match(
    operand: &Value,
    _object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    let regex = compile_full_match(operand_str("doesNotMatch", operand)?)?;
    Ok(StringValuePattern::DoesNotMatch(Arc::new(regex)))
}

fn build_binary_equal_to(
    operand: &Value,
    _object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    let bytes = BASE64
        .decode(operand_str("binaryEqualTo", operand)?)
        .map_err(|e| PatternError::InvalidBase64(e.to_string()))?;
    Ok(StringValuePattern::BinaryEqualTo(bytes))
}

fn build_anything(
    _operand: &Value,
    _object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    Ok(StringValuePattern::Anything)
}

fn build_absent(
    operand: &Value,
    _object: &Map<String, Value>,
) -> Result<StringValuePattern, PatternError> {
    let absent = operand.as_bool().ok_or(PatternError::InvalidOperand {
        operator: "absent",
        expected: "a boolean",
    })?;
    Ok(StringValuePattern::Absent(absent))
}
