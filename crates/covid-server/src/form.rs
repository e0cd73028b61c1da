//! Form-encoded request bodies.
//!
//! `application/x-www-form-urlencoded` bodies are turned into the same JSON
//! shape a client would have posted directly. Bracketed keys nest:
//! `region[name]=Africa` becomes `{"region": {"name": "Africa"}}`, and
//! `tags[]=a&tags[]=b` (or a repeated plain key) becomes an array. Values
//! stay strings; the estimator accepts numeric strings where it needs numbers.

use serde_json::{Map, Value};

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Whether a `Content-Type` header value names a form body.
pub fn is_form(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

pub fn decode_form(body: &[u8]) -> Result<Value, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;

    let mut root = Value::Object(Map::new());
    for (key, value) in pairs {
        if key.is_empty() {
            continue;
        }
        insert(&mut root, &key_path(&key), value);
    }
    Ok(root)
}

/// Split `a[b][c]` into `["a", "b", "c"]`. Keys without a well-formed
/// bracket suffix are taken literally.
fn key_path(key: &str) -> Vec<&str> {
    match key.find('[') {
        Some(open) if open > 0 && key.ends_with(']') => {
            let mut path = vec![&key[..open]];
            path.extend(key[open + 1..key.len() - 1].split("]["));
            path
        }
        _ => vec![key],
    }
}

fn insert(target: &mut Value, path: &[&str], value: String) {
    let Some((head, rest)) = path.split_first() else {
        *target = Value::String(value);
        return;
    };

    // `key[]` appends a new item.
    if head.is_empty() {
        if !target.is_array() {
            *target = Value::Array(Vec::new());
        }
        if let Value::Array(items) = target {
            let mut item = Value::Null;
            insert(&mut item, rest, value);
            items.push(item);
        }
        return;
    }

    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(map) = target else {
        return;
    };

    let slot = map.entry(head.to_string()).or_insert(Value::Null);
    if !rest.is_empty() {
        insert(slot, rest, value);
        return;
    }

    // A repeated plain key collects its values.
    match slot {
        Value::Array(items) => items.push(Value::String(value)),
        Value::String(_) => {
            let first = slot.take();
            *slot = Value::Array(vec![first, Value::String(value)]);
        }
        _ => *slot = Value::String(value),
    }
}
