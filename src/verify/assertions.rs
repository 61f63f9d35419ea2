//! Pure assertion helpers: JSON paths, deep equality, status matching.

use serde_json::{json, Value};

use crate::strategy::{JsonAssertion, OneOrMany};

/// One step of a parsed JSON path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    Wildcard,
}

/// Splits `a.b[0].c` / `$.a.b[*]` into segments. `None` on malformed syntax.
fn parse_path(path: &str) -> Option<Vec<Segment>> {
    let path = path.strip_prefix('$').unwrap_or(path);
    let path = path.strip_prefix('.').unwrap_or(path);

    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut brackets) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !key.is_empty() {
            segments.push(Segment::Key(key.to_string()));
        } else if brackets.is_empty() {
            // Empty key between dots (`a..b`) or an empty path.
            return None;
        }
        while !brackets.is_empty() {
            let close = brackets.find(']')?;
            let inner = &brackets[1..close];
            if inner == "*" {
                segments.push(Segment::Wildcard);
            } else {
                segments.push(Segment::Index(inner.parse().ok()?));
            }
            brackets = &brackets[close + 1..];
            if !brackets.is_empty() && !brackets.starts_with('[') {
                return None;
            }
        }
    }
    Some(segments)
}

/// Resolves a JSON path against `value`.
///
/// Supports dotted keys, `[n]` indexing, and `[*]` which selects the whole
/// array at that point. Returns `None` ("undefined") when any step cannot be
/// resolved, including traversal into `null` or a primitive.
#[must_use]
pub fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in parse_path(path)? {
        current = match segment {
            Segment::Key(key) => current.as_object()?.get(&key)?,
            Segment::Index(index) => current.as_array()?.get(index)?,
            Segment::Wildcard => {
                current.as_array()?;
                current
            }
        };
    }
    Some(current)
}

/// Structural equality over JSON values.
///
/// Numbers compare by numeric value, so `1` equals `1.0`. Arrays must have the
/// same length and objects the same key set.
#[must_use]
pub fn deep_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (a.as_u64(), b.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            },
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, x)| b.get(key).is_some_and(|y| deep_equal(x, y)))
        }
        _ => left == right,
    }
}

/// Returns `true` if `status` is accepted. Any 2xx passes when nothing is expected.
#[must_use]
pub fn status_matches(expected: Option<&OneOrMany<u16>>, status: u16) -> bool {
    match expected {
        Some(expected) => expected.contains(&status),
        None => (200..300).contains(&status),
    }
}

/// Evaluates every assertion against `body`, returning one error object per
/// failed assertion (`{path, expected, actual}`; `actual` is `null` when the
/// path is undefined).
#[must_use]
pub fn failed_json_assertions(body: &Value, assertions: &[JsonAssertion]) -> Vec<Value> {
    assertions
        .iter()
        .filter_map(|assertion| {
            let actual = json_path(body, &assertion.path);
            let passed = actual.is_some_and(|actual| deep_equal(actual, &assertion.expected));
            (!passed).then(|| {
                json!({
                    "path": assertion.path,
                    "expected": assertion.expected,
                    "actual": actual.cloned(),
                    "resolved": actual.is_some(),
                })
            })
        })
        .collect()
}
