//! Document conversion: XML unit (or PTAB batch file) to a sibling JSON file.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::doctype::DocType;
use crate::error::{PipelineError, Result};
use crate::fulltext;
use crate::normalize;
use crate::xml;

/// Outcome of converting one XML file.
#[derive(Debug)]
pub struct ConvertReport {
    pub json_path: PathBuf,
    /// The JSON output already existed; nothing was re-validated or written.
    pub already_existed: bool,
    pub records_converted: usize,
    /// Records dropped for data-quality failures while their siblings
    /// proceeded.
    pub records_dropped: usize,
}

/// Path of the JSON output beside an XML file.
pub fn json_sibling(xml_path: &Path) -> PathBuf {
    xml_path.with_extension("json")
}

/// Convert `xml_path` and write the JSON sibling, unless it already exists.
pub fn convert(xml_path: &Path, doc_type: DocType) -> Result<ConvertReport> {
    let json_path = json_sibling(xml_path);
    if json_path.exists() {
        info!("{} already exists, skipping conversion", json_path.display());
        return Ok(ConvertReport {
            json_path,
            already_existed: true,
            records_converted: 0,
            records_dropped: 0,
        });
    }

    let content = fs::read_to_string(xml_path).map_err(|e| PipelineError::io(xml_path, e))?;
    let mut tree = xml::xml_to_value(&content, xml_path)?;

    let (converted, dropped) = match doc_type {
        DocType::Grants | DocType::Pubs => {
            normalize_publication_unit(&mut tree, doc_type, xml_path)?;
            (1, 0)
        }
        DocType::Ptab => normalize_ptab_batch(&mut tree, xml_path)?,
    };

    let serialized =
        serde_json::to_string(&tree).map_err(|e| PipelineError::parse(xml_path, e.to_string()))?;
    fs::write(&json_path, serialized).map_err(|e| PipelineError::io(&json_path, e))?;
    info!(
        "converted {} ({} records, {} dropped)",
        xml_path.display(),
        converted,
        dropped
    );

    Ok(ConvertReport {
        json_path,
        already_existed: false,
        records_converted: converted,
        records_dropped: dropped,
    })
}

/// Normalize the single `document-id` record of a grant/publication unit.
fn normalize_publication_unit(
    tree: &mut Value,
    doc_type: DocType,
    xml_path: &Path,
) -> Result<()> {
    let doc_id = object_at(
        tree,
        &[
            doc_type.record_tag(),
            doc_type.bib_tag(),
            "publication-reference",
            "document-id",
        ],
        xml_path,
    )?;
    normalize::normalize_document_id(doc_id)
}

/// Normalize every record under `main/DATA_RECORD`, attaching extracted text
/// where available. A failing record is dropped; its siblings convert.
fn normalize_ptab_batch(tree: &mut Value, xml_path: &Path) -> Result<(usize, usize)> {
    let base_dir = xml_path.parent().unwrap_or_else(|| Path::new("."));

    let slot = tree
        .pointer_mut("/main/DATA_RECORD")
        .ok_or_else(|| PipelineError::parse(xml_path, "missing main/DATA_RECORD"))?;

    let (records, was_single) = match slot.take() {
        Value::Array(records) => (records, false),
        record @ Value::Object(_) => (vec![record], true),
        other => {
            return Err(PipelineError::parse(
                xml_path,
                format!("DATA_RECORD is not a record or list: {other}"),
            ));
        }
    };

    let mut survivors = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for mut record in records {
        let obj = match record.as_object_mut() {
            Some(obj) => obj,
            None => {
                warn!("skipping non-object DATA_RECORD entry in {}", xml_path.display());
                dropped += 1;
                continue;
            }
        };
        let key = match obj.get("DOCUMENT_IMAGE_ID").and_then(Value::as_str) {
            Some(key) => key.to_string(),
            None => {
                warn!(
                    "skipping DATA_RECORD without DOCUMENT_IMAGE_ID in {}",
                    xml_path.display()
                );
                dropped += 1;
                continue;
            }
        };
        if let Err(e) = normalize::normalize_ptab_record(obj) {
            warn!("skipping record {key}: {e}");
            dropped += 1;
            continue;
        }
        if let Some(text) = fulltext::resolve(base_dir, &key) {
            obj.insert("textdata".to_string(), Value::String(text));
        }
        survivors.push(record);
    }

    let converted = survivors.len();
    *slot = if was_single && converted == 1 {
        survivors.pop().unwrap_or(Value::Null)
    } else {
        Value::Array(survivors)
    };
    Ok((converted, dropped))
}

/// Walk `keys` through nested objects, returning the object at the end.
fn object_at<'a>(
    tree: &'a mut Value,
    keys: &[&str],
    xml_path: &Path,
) -> Result<&'a mut Map<String, Value>> {
    let mut current = tree;
    for key in keys {
        current = current
            .get_mut(key)
            .ok_or_else(|| PipelineError::parse(xml_path, format!("missing element <{key}>")))?;
    }
    current
        .as_object_mut()
        .ok_or_else(|| PipelineError::parse(xml_path, format!("<{}> is not an element", keys[keys.len() - 1])))
}
