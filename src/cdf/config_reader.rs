use std::fs;

use cdf_merge::{Assessment, CdfConfig, VariableSpec};
use log::debug;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::cdf::*;

/// Reads the transformation configuration:
///
/// ```text
/// { "var1": [{"1a": "file_a.csv"}, {"1b": "file_b.csv"}], ... }
/// ```
pub fn read_config(path: &str) -> CdfResult<CdfConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    let config = parse_config(&js)?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn parse_config(js: &JSValue) -> CdfResult<CdfConfig> {
    let obj = js.as_object().context(InvalidConfigSnafu {
        variable: "",
        reason: "the configuration must be a JSON object",
    })?;
    let mut variables: Vec<VariableSpec> = Vec::with_capacity(obj.len());
    for (name, entries) in obj.iter() {
        let entries = entries.as_array().context(InvalidConfigSnafu {
            variable: name.as_str(),
            reason: "expected a list of assessments",
        })?;
        let assessments = entries
            .iter()
            .map(|entry| read_assessment(name, entry))
            .collect::<CdfResult<Vec<Assessment>>>()?;
        variables.push(VariableSpec {
            name: name.clone(),
            assessments,
        });
    }
    CdfConfig::new(variables).context(ConfigValidationSnafu {})
}

// Each assessment is an object with a single entry: {label: file}
fn read_assessment(variable: &str, entry: &JSValue) -> CdfResult<Assessment> {
    let pairs: Option<Vec<(&String, &JSValue)>> = entry.as_object().map(|o| o.iter().collect());
    match pairs.as_deref() {
        Some([(label, JSValue::String(file))]) => Ok(Assessment {
            label: label.to_string(),
            file: file.clone(),
        }),
        _ => InvalidConfigSnafu {
            variable,
            reason: format!(
                "expected an object with a single label and a file path, found {}",
                entry
            ),
        }
        .fail(),
    }
}
