//! XML to JSON mapping.
//!
//! Converts a raw XML document into a `serde_json::Value` tree using the
//! conventions the downstream index expects: attributes become `@`-prefixed
//! keys, element text becomes the value itself (or a `#text` key when the
//! element also has children/attributes), and repeated sibling elements are
//! collected into arrays.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};

struct Frame {
    name: String,
    map: Map<String, Value>,
    text: String,
}

/// Parse `xml` into a JSON tree keyed by the root element name.
///
/// `path` is used only for error reporting.
pub fn xml_to_value(xml: &str, path: &Path) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Map<String, Value> = Map::new();

    loop {
        match reader.read_event() {
            Err(e) => return Err(PipelineError::parse(path, e.to_string())),
            Ok(Event::Start(e)) => {
                let mut frame = Frame {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    map: Map::new(),
                    text: String::new(),
                };
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| PipelineError::parse(path, e.to_string()))?;
                    let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
                    let value = attr
                        .unescape_value()
                        .map_err(|e| PipelineError::parse(path, e.to_string()))?
                        .into_owned();
                    frame.map.insert(key, Value::String(value));
                }
                stack.push(frame);
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let mut map = Map::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| PipelineError::parse(path, e.to_string()))?;
                    let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
                    let value = attr
                        .unescape_value()
                        .map_err(|e| PipelineError::parse(path, e.to_string()))?
                        .into_owned();
                    map.insert(key, Value::String(value));
                }
                let value = if map.is_empty() {
                    Value::Null
                } else {
                    Value::Object(map)
                };
                let parent = match stack.last_mut() {
                    Some(frame) => &mut frame.map,
                    None => &mut root,
                };
                insert_child(parent, name, value);
            }
            Ok(Event::Text(e)) => {
                if let Some(frame) = stack.last_mut() {
                    let text = e
                        .unescape()
                        .map_err(|e| PipelineError::parse(path, e.to_string()))?;
                    frame.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let frame = match stack.pop() {
                    Some(frame) => frame,
                    None => {
                        return Err(PipelineError::parse(path, "unbalanced closing tag"));
                    }
                };
                let value = finish_frame(frame.map, frame.text);
                let parent = match stack.last_mut() {
                    Some(parent) => &mut parent.map,
                    None => &mut root,
                };
                insert_child(parent, frame.name, value);
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, processing instructions, DOCTYPE
            Ok(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(PipelineError::parse(path, "unexpected end of document"));
    }

    Ok(Value::Object(root))
}

fn finish_frame(mut map: Map<String, Value>, text: String) -> Value {
    if map.is_empty() {
        if text.is_empty() {
            Value::Null
        } else {
            Value::String(text)
        }
    } else {
        if !text.is_empty() {
            map.insert("#text".to_string(), Value::String(text));
        }
        Value::Object(map)
    }
}

/// Insert a child value, promoting repeated siblings to an array.
fn insert_child(map: &mut Map<String, Value>, name: String, value: Value) {
    match map.get_mut(&name) {
        None => {
            map.insert(name, value);
        }
        Some(Value::Array(items)) => {
            items.push(value);
        }
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}
