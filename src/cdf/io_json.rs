use std::fs;

use cdf_merge::MergedRecord;
use log::{debug, warn};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use snafu::prelude::*;
use text_diff::print_diff;

use crate::cdf::{io_common::output_path, *};

/// The JSON document of a record: {variable: {label: value}}
pub fn record_to_json(record: &MergedRecord) -> JSValue {
    let mut js: JSMap<String, JSValue> = JSMap::new();
    for (name, values) in record.variables.iter() {
        let mut assessments: JSMap<String, JSValue> = JSMap::new();
        for (label, value) in values.iter() {
            assessments.insert(label.clone(), json!(value));
        }
        js.insert(name.clone(), JSValue::Object(assessments));
    }
    JSValue::Object(js)
}

/// Writes `<output_dir>/<participant_id>.cdf.json` and returns its path.
pub fn write_record(output_dir: &str, participant_id: &str, js: &JSValue) -> CdfResult<String> {
    let path = output_path(output_dir, participant_id);
    let contents = serde_json::to_string(js).context(SerializingJsonSnafu { participant_id })?;
    fs::write(&path, contents).context(WritingOutputSnafu { path: path.as_str() })?;
    debug!("write_record: {}", path);
    Ok(path)
}

/// Compares a generated document with the reference document of the same
/// participant. Prints a diff and returns false when they differ.
pub fn check_reference(reference_dir: &str, participant_id: &str, js: &JSValue) -> CdfResult<bool> {
    let path = output_path(reference_dir, participant_id);
    let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path: path.as_str() })?;
    let reference: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: path.as_str() })?;
    // Key order is not significant.
    if reference == *js {
        return Ok(true);
    }
    warn!("Found differences with the reference {}", path);
    let pretty_ref =
        serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu { participant_id })?;
    let pretty_js = serde_json::to_string_pretty(js).context(SerializingJsonSnafu { participant_id })?;
    print_diff(pretty_ref.as_str(), pretty_js.as_str(), "\n");
    Ok(false)
}
