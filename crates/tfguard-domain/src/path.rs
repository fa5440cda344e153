//! Attribute path grammar and resolution.
//!
//! A path is a dot-separated list of segments. Each segment is a field name followed by zero or
//! more selectors: `[N]` picks one list element, `[*]` expands every element.
//!
//! ```text
//! server_side_encryption_configuration[0].rule[*].apply_server_side_encryption_by_default
//! ingress[*].cidr_blocks[*]
//! ```
//!
//! Resolution never fails. Anything that cannot be followed (missing key, field on a non-map,
//! index out of bounds, wildcard on a non-list, `null`) simply contributes no value.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selector {
    Index(usize),
    Wildcard,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub field: String,
    pub selectors: Vec<Selector>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrPath {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("attribute path is empty")]
    Empty,
    #[error("attribute path '{path}' has an empty segment at position {position}")]
    EmptySegment { path: String, position: usize },
    #[error(
        "attribute path '{path}': invalid selector '[{selector}]' (expected a non-negative index or '*')"
    )]
    InvalidSelector { path: String, selector: String },
    #[error("attribute path '{path}': unterminated '[' in segment '{segment}'")]
    Unterminated { path: String, segment: String },
    #[error("attribute path '{path}': unexpected '{ch}' in segment '{segment}'")]
    UnexpectedChar {
        path: String,
        segment: String,
        ch: char,
    },
}

impl AttrPath {
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let segments = raw
            .split('.')
            .enumerate()
            .map(|(position, seg)| parse_segment(raw, position, seg))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

fn parse_segment(path: &str, position: usize, seg: &str) -> Result<Segment, PathError> {
    let (field, mut rest) = match seg.find('[') {
        Some(i) => (&seg[..i], &seg[i..]),
        None => (seg, ""),
    };

    if field.is_empty() {
        return Err(PathError::EmptySegment {
            path: path.to_string(),
            position,
        });
    }
    if let Some(ch) = field.chars().find(|c| *c == ']') {
        return Err(PathError::UnexpectedChar {
            path: path.to_string(),
            segment: seg.to_string(),
            ch,
        });
    }

    let mut selectors = Vec::new();
    while !rest.is_empty() {
        let Some(body) = rest.strip_prefix('[') else {
            let ch = rest.chars().next().unwrap_or(']');
            return Err(PathError::UnexpectedChar {
                path: path.to_string(),
                segment: seg.to_string(),
                ch,
            });
        };
        let Some(end) = body.find(']') else {
            return Err(PathError::Unterminated {
                path: path.to_string(),
                segment: seg.to_string(),
            });
        };
        let inner = &body[..end];
        let selector = if inner == "*" {
            Selector::Wildcard
        } else if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
            inner
                .parse::<usize>()
                .map(Selector::Index)
                .map_err(|_| PathError::InvalidSelector {
                    path: path.to_string(),
                    selector: inner.to_string(),
                })?
        } else {
            return Err(PathError::InvalidSelector {
                path: path.to_string(),
                selector: inner.to_string(),
            });
        };
        selectors.push(selector);
        rest = &body[end + 1..];
    }

    Ok(Segment {
        field: field.to_string(),
        selectors,
    })
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for AttrPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AttrPath::parse(s)
    }
}

/// Outcome of a traced resolution.
#[derive(Debug)]
pub struct Resolution<'a> {
    /// Resolved values in document order.
    pub values: Vec<&'a Value>,
    /// Index of the first segment at which nothing was left to follow.
    pub stopped_at: Option<usize>,
}

impl Resolution<'_> {
    pub fn is_absent(&self) -> bool {
        self.values.is_empty()
    }
}

/// Resolve `path` against an attribute tree. An empty result means "absent".
pub fn resolve<'a>(attributes: &'a Value, path: &AttrPath) -> Vec<&'a Value> {
    resolve_traced(attributes, path).values
}

/// Like [`resolve`], but also reports where resolution ran dry.
pub fn resolve_traced<'a>(attributes: &'a Value, path: &AttrPath) -> Resolution<'a> {
    let mut frontier: Vec<&'a Value> = vec![attributes];

    for (idx, segment) in path.segments.iter().enumerate() {
        let mut next: Vec<&'a Value> = frontier
            .iter()
            .filter_map(|v| v.as_object().and_then(|m| m.get(&segment.field)))
            .collect();

        for selector in &segment.selectors {
            next = apply_selector(next, *selector);
        }
        next.retain(|v| !v.is_null());

        if next.is_empty() {
            return Resolution {
                values: Vec::new(),
                stopped_at: Some(idx),
            };
        }
        frontier = next;
    }

    Resolution {
        values: frontier,
        stopped_at: None,
    }
}

fn apply_selector(values: Vec<&Value>, selector: Selector) -> Vec<&Value> {
    match selector {
        Selector::Index(n) => values
            .into_iter()
            .filter_map(|v| v.as_array().and_then(|items| items.get(n)))
            .collect(),
        Selector::Wildcard => values
            .into_iter()
            .filter_map(|v| v.as_array())
            .flat_map(|items| items.iter())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(s: &str) -> AttrPath {
        AttrPath::parse(s).expect("valid path")
    }

    fn sg() -> Value {
        json!({
            "name": "web",
            "tags": null,
            "ingress": [
                { "from_port": 22, "cidr_blocks": ["10.0.0.0/8", "0.0.0.0/0"] },
                { "from_port": 443, "cidr_blocks": ["0.0.0.0/0"] },
                { "from_port": 80, "cidr_blocks": [] }
            ]
        })
    }

    #[test]
    fn parses_fields_indices_and_wildcards() {
        let p = path("ingress[*].cidr_blocks[0]");
        assert_eq!(p.segments().len(), 2);
        assert_eq!(p.segments()[0].field, "ingress");
        assert_eq!(p.segments()[0].selectors, vec![Selector::Wildcard]);
        assert_eq!(p.segments()[1].selectors, vec![Selector::Index(0)]);
        assert_eq!(
            path("a[1][*]").segments()[0].selectors,
            vec![Selector::Index(1), Selector::Wildcard]
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(AttrPath::parse("  "), Err(PathError::Empty));
        assert!(matches!(
            AttrPath::parse("a..b"),
            Err(PathError::EmptySegment { position: 1, .. })
        ));
        assert!(matches!(
            AttrPath::parse("[0].a"),
            Err(PathError::EmptySegment { position: 0, .. })
        ));
        assert!(matches!(
            AttrPath::parse("a[-1]"),
            Err(PathError::InvalidSelector { .. })
        ));
        assert!(matches!(
            AttrPath::parse("a[]"),
            Err(PathError::InvalidSelector { .. })
        ));
        assert!(matches!(
            AttrPath::parse("a[1"),
            Err(PathError::Unterminated { .. })
        ));
        assert!(matches!(
            AttrPath::parse("a[1]x"),
            Err(PathError::UnexpectedChar { ch: 'x', .. })
        ));
        assert!(matches!(
            AttrPath::parse("a]"),
            Err(PathError::UnexpectedChar { ch: ']', .. })
        ));
    }

    #[test]
    fn plain_path_resolves_to_at_most_one_value() {
        let attrs = sg();
        assert_eq!(resolve(&attrs, &path("name")), vec![&json!("web")]);
        assert_eq!(resolve(&attrs, &path("ingress[1].from_port")), vec![&json!(443)]);
    }

    #[test]
    fn wildcards_expand_in_document_order() {
        let attrs = sg();
        let ports: Vec<&Value> = resolve(&attrs, &path("ingress[*].from_port"));
        assert_eq!(ports, vec![&json!(22), &json!(443), &json!(80)]);

        let cidrs = resolve(&attrs, &path("ingress[*].cidr_blocks[*]"));
        assert_eq!(
            cidrs,
            vec![&json!("10.0.0.0/8"), &json!("0.0.0.0/0"), &json!("0.0.0.0/0")]
        );
    }

    #[test]
    fn absence_is_an_empty_result_not_an_error() {
        let attrs = sg();
        assert!(resolve(&attrs, &path("encryption")).is_empty());
        assert!(resolve(&attrs, &path("name.first")).is_empty());
        assert!(resolve(&attrs, &path("ingress[9].from_port")).is_empty());
        assert!(resolve(&attrs, &path("name[*]")).is_empty());
        assert!(resolve(&attrs, &path("tags")).is_empty());
    }

    #[test]
    fn traced_resolution_reports_stopping_segment() {
        let attrs = sg();
        let r = resolve_traced(&attrs, &path("ingress[*].missing.deeper"));
        assert!(r.is_absent());
        assert_eq!(r.stopped_at, Some(1));

        let ok = resolve_traced(&attrs, &path("ingress[0].from_port"));
        assert_eq!(ok.stopped_at, None);
    }

    #[test]
    fn display_round_trips_the_trimmed_source() {
        assert_eq!(path("  a.b[*] ").to_string(), "a.b[*]");
        assert_eq!("x[0]".parse::<AttrPath>().expect("parse").as_str(), "x[0]");
    }
}
