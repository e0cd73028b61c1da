//! Response encoders.
//!
//! One entry point per kind of payload, with the wire format as a parameter:
//! [`encode_value`] for estimator output and [`encode_records`] for the audit
//! report. Both are pure: they borrow their input and never panic.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use covid_audit::AuditRecord;
use covid_core::EncodingConfig;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

/// Root element of an encoded audit collection.
const RECORDS_ROOT: &str = "logs";
/// Element wrapping each record inside [`RECORDS_ROOT`].
const RECORD_ELEMENT: &str = "entry";
/// Element used for array items that have no key of their own.
const ITEM_ELEMENT: &str = "item";

/// Wire format of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Xml,
    Text,
}

impl Format {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Xml => "application/xml",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

/// Markup options for [`Format::Xml`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlOptions {
    /// Single element wrapping the whole document, if any.
    pub root: Option<String>,
    /// Emit an XML declaration with the UTF-8 encoding.
    pub declaration: bool,
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self::from_config(&EncodingConfig::default())
    }
}

impl XmlOptions {
    pub fn from_config(config: &EncodingConfig) -> Self {
        let root = config.xml_root.trim();
        Self {
            root: (!root.is_empty()).then(|| root.to_string()),
            declaration: config.xml_declaration,
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML encoding failed: {0}")]
    Xml(String),
}

/// Encoded body plus its content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl IntoResponse for Encoded {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

/// Encode a structured value.
pub fn encode_value(value: &Value, format: Format, xml: &XmlOptions) -> Result<Encoded, EncodeError> {
    let body = match format {
        Format::Json => serde_json::to_vec(value)?,
        Format::Xml => {
            let mut markup = MarkupWriter::new(xml.declaration)?;
            match xml.root.as_deref() {
                Some(root) => markup.element(&element_name(root), value)?,
                None => markup.children(value)?,
            }
            markup.finish()
        }
        Format::Text => {
            let mut out = String::new();
            flatten("", value, &mut out);
            out.into_bytes()
        }
    };

    Ok(Encoded {
        content_type: format.content_type(),
        body,
    })
}

/// Encode an audit collection, preserving store order.
///
/// [`Format::Text`] yields one [`AuditRecord::to_log_line`] per line.
pub fn encode_records(records: &[AuditRecord], format: Format) -> Result<Encoded, EncodeError> {
    let body = match format {
        Format::Json => serde_json::to_vec(records)?,
        Format::Xml => {
            let mut markup = MarkupWriter::new(true)?;
            markup.start(RECORDS_ROOT)?;
            for record in records {
                markup.element(RECORD_ELEMENT, &serde_json::to_value(record)?)?;
            }
            markup.end(RECORDS_ROOT)?;
            markup.finish()
        }
        Format::Text => records
            .iter()
            .map(|record| record.to_log_line() + "\n")
            .collect::<String>()
            .into_bytes(),
    };

    Ok(Encoded {
        content_type: format.content_type(),
        body,
    })
}

/// Recursive JSON to XML element writer.
struct MarkupWriter {
    writer: Writer<Vec<u8>>,
}

impl MarkupWriter {
    fn new(declaration: bool) -> Result<Self, EncodeError> {
        let mut markup = Self {
            writer: Writer::new(Vec::new()),
        };
        if declaration {
            markup.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        }
        Ok(markup)
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), EncodeError> {
        self.writer
            .write_event(event)
            .map_err(|e| EncodeError::Xml(e.to_string()))
    }

    fn start(&mut self, name: &str) -> Result<(), EncodeError> {
        self.write(Event::Start(BytesStart::new(name)))
    }

    fn end(&mut self, name: &str) -> Result<(), EncodeError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    /// Write `value` as element `name`.
    ///
    /// Arrays repeat the element per item; an empty array is one empty
    /// element. An array nested in an array becomes one element holding an
    /// [`ITEM_ELEMENT`] per item, so its grouping survives.
    fn element(&mut self, name: &str, value: &Value) -> Result<(), EncodeError> {
        match value {
            Value::Array(items) if items.is_empty() => self.write(Event::Empty(BytesStart::new(name))),
            Value::Array(items) => {
                for item in items {
                    self.array_item(name, item)?;
                }
                Ok(())
            }
            Value::Null => self.write(Event::Empty(BytesStart::new(name))),
            Value::Object(_) => {
                self.start(name)?;
                self.children(value)?;
                self.end(name)
            }
            scalar => {
                self.start(name)?;
                self.write(Event::Text(BytesText::new(&scalar_text(scalar))))?;
                self.end(name)
            }
        }
    }

    /// Write one array item as exactly one `name` element.
    fn array_item(&mut self, name: &str, item: &Value) -> Result<(), EncodeError> {
        if item.is_array() {
            self.start(name)?;
            self.children(item)?;
            self.end(name)
        } else {
            self.element(name, item)
        }
    }

    /// Write the content of `value` without an enclosing element.
    fn children(&mut self, value: &Value) -> Result<(), EncodeError> {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    self.element(&element_name(key), child)?;
                }
                Ok(())
            }
            Value::Array(items) => {
                for item in items {
                    self.array_item(ITEM_ELEMENT, item)?;
                }
                Ok(())
            }
            Value::Null => Ok(()),
            scalar => self.write(Event::Text(BytesText::new(&scalar_text(scalar)))),
        }
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Map an object key onto a valid XML element name.
fn element_name(key: &str) -> Cow<'_, str> {
    let valid_start = |c: char| c.is_ascii_alphabetic() || c == '_';
    let valid_rest = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.');

    let mut chars = key.chars();
    match chars.next() {
        Some(first) if valid_start(first) && chars.all(valid_rest) => Cow::Borrowed(key),
        _ => {
            let mut name: String = key
                .chars()
                .map(|c| if valid_rest(c) { c } else { '_' })
                .collect();
            if !name.starts_with(valid_start) {
                name.insert(0, '_');
            }
            Cow::Owned(name)
        }
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// One `dotted.path<TAB>value` line per leaf.
fn flatten(prefix: &str, value: &Value, out: &mut String) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                flatten(&join(key), child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(&join(&index.to_string()), child, out);
            }
        }
        scalar => {
            if !prefix.is_empty() {
                out.push_str(prefix);
                out.push('\t');
            }
            out.push_str(&scalar_text(scalar));
            out.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn xml_string(value: &Value, options: &XmlOptions) -> String {
        let encoded = encode_value(value, Format::Xml, options).unwrap();
        assert_eq!(encoded.content_type, "application/xml");
        String::from_utf8(encoded.body).unwrap()
    }

    fn record(path: &str, status: u16, ms: u64) -> AuditRecord {
        AuditRecord::builder(path)
            .method("POST")
            .status_code(status)
            .duration(Duration::from_millis(ms))
            .build()
    }

    #[test]
    fn test_json_is_faithful() {
        let value = json!({ "impact": { "currentlyInfected": 20 }, "ok": true });
        let encoded = encode_value(&value, Format::Json, &XmlOptions::default()).unwrap();
        assert_eq!(encoded.content_type, "application/json");
        let back: Value = serde_json::from_slice(&encoded.body).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_xml_nests_elements_under_root() {
        let value = json!({
            "a": 1,
            "b": { "c": "x<y & z" },
            "list": [1, 2],
            "n": null
        });

        let xml = xml_string(&value, &XmlOptions::default());
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <estimate><a>1</a><b><c>x&lt;y &amp; z</c></b>\
             <list>1</list><list>2</list><n/></estimate>"
        );
    }

    #[test]
    fn test_xml_keeps_empty_and_nested_arrays() {
        let options = XmlOptions {
            root: Some("estimate".to_string()),
            declaration: false,
        };
        let value = json!({
            "data": { "name": "x", "tags": [] },
            "m": [[1, 2], [3], []]
        });

        let xml = xml_string(&value, &options);
        assert_eq!(
            xml,
            "<estimate><data><name>x</name><tags/></data>\
             <m><item>1</item><item>2</item></m><m><item>3</item></m><m></m></estimate>"
        );
    }

    #[test]
    fn test_xml_without_root_or_declaration() {
        let options = XmlOptions {
            root: None,
            declaration: false,
        };
        let xml = xml_string(&json!({ "a": true, "b": 1.5 }), &options);
        assert_eq!(xml, "<a>true</a><b>1.5</b>");
    }

    #[test]
    fn test_xml_sanitizes_keys() {
        let options = XmlOptions {
            root: Some("root".to_string()),
            declaration: false,
        };
        let xml = xml_string(&json!({ "1st place": "x", "": "y" }), &options);
        assert!(xml.contains("<_1st_place>x</_1st_place>"));
        assert!(xml.contains("<_>y</_>"));
    }

    #[test]
    fn test_xml_options_from_config() {
        let options = XmlOptions::from_config(&EncodingConfig {
            xml_root: "  ".to_string(),
            xml_declaration: false,
        });
        assert_eq!(options.root, None);
        assert!(!options.declaration);
    }

    #[test]
    fn test_text_flattens_leaves() {
        let value = json!({ "a": { "b": 1 }, "c": ["x", "y"] });
        let encoded = encode_value(&value, Format::Text, &XmlOptions::default()).unwrap();
        assert_eq!(
            String::from_utf8(encoded.body).unwrap(),
            "a.b\t1\nc.0\tx\nc.1\ty\n"
        );
    }

    #[test]
    fn test_records_text_is_one_line_per_record_in_order() {
        let records = vec![
            record("/api/v1/on-covid-19/json", 200, 12),
            record("/api/v1/on-covid-19/xml", 500, 3),
        ];

        let encoded = encode_records(&records, Format::Text).unwrap();
        assert_eq!(encoded.content_type, "text/plain; charset=utf-8");
        assert_eq!(
            String::from_utf8(encoded.body).unwrap(),
            "POST\t\t/api/v1/on-covid-19/json\t\t200\t\t12 ms\n\
             POST\t\t/api/v1/on-covid-19/xml\t\t500\t\t3 ms\n"
        );
    }

    #[test]
    fn test_empty_collections_degrade_gracefully() {
        assert!(encode_records(&[], Format::Text).unwrap().body.is_empty());
        assert_eq!(encode_records(&[], Format::Json).unwrap().body, b"[]");

        let xml = String::from_utf8(encode_records(&[], Format::Xml).unwrap().body).unwrap();
        assert!(xml.ends_with("<logs></logs>"));
    }

    #[test]
    fn test_records_xml_wraps_entries() {
        let records = vec![record("/a", 200, 1), record("/b", 200, 2)];
        let xml = String::from_utf8(encode_records(&records, Format::Xml).unwrap().body).unwrap();
        assert_eq!(xml.matches("<entry>").count(), 2);
        assert!(xml.contains("<statusCode>200</statusCode>"));
    }

    #[test]
    fn test_encoding_does_not_mutate_input() {
        let value = json!({ "k": [1, { "z": null }] });
        let before = value.clone();
        for format in [Format::Json, Format::Xml, Format::Text] {
            encode_value(&value, format, &XmlOptions::default()).unwrap();
        }
        assert_eq!(value, before);
    }
}
