mod config;
mod table;

pub mod builder;
pub mod manual;

use log::{debug, error};

pub use crate::config::*;
pub use crate::table::*;

/// A value is usable when it is neither empty nor a missing-value code.
///
/// The same rule applies to single rows and to variant rows.
pub fn is_usable(value: &str) -> bool {
    !value.is_empty() && !value.starts_with(SENTINEL_MARKER)
}

/// Structural variables are repeated identically on every variant row.
pub fn is_structural(variable: &str) -> bool {
    STRUCTURAL_VARIABLES.contains(&variable)
}

fn usable_or_blank(value: &str) -> String {
    if is_usable(value) {
        value.to_string()
    } else {
        String::new()
    }
}

/// Resolves the value of a variable for a participant that has several rows
/// in the same file.
fn resolve_variants(
    participant_id: &str,
    variable: &str,
    file: &str,
    values: &[&str],
) -> Result<String, MergeErrors> {
    if is_structural(variable) {
        return Ok(values
            .first()
            .map(|v| usable_or_blank(v))
            .unwrap_or_default());
    }
    // Only one variant of the instrument is expected to have asked this variable.
    let usable: Vec<&str> = values.iter().copied().filter(|v| is_usable(v)).collect();
    match usable.as_slice() {
        [] => Ok(String::new()),
        [v] => Ok(v.to_string()),
        _ => {
            error!(
                "Variable {} has multiple non-empty values for the pseudo_id '{}' in the file {}: {:?}. Aborting.",
                variable, participant_id, file, usable
            );
            Err(MergeErrors::AmbiguousVariants {
                participant_id: participant_id.to_string(),
                variable: variable.to_string(),
                file: file.to_string(),
                values: usable.iter().map(|s| s.to_string()).collect(),
            })
        }
    }
}

/// Resolves one (variable, assessment) cell for a participant.
///
/// A missing row and a missing-value code both resolve to the empty string.
pub fn resolve_value(
    participant_id: &str,
    variable: &str,
    assessment: &Assessment,
    tables: &SourceTables,
) -> Result<String, MergeErrors> {
    let table = tables
        .get(&assessment.file)
        .ok_or_else(|| MergeErrors::MissingTable {
            file: assessment.file.clone(),
        })?;
    match table.lookup(participant_id, variable)? {
        Lookup::NotFound => {
            debug!(
                "resolve_value: missing row for participant [{}] in file [{}] when looking for variable {} (reported as missing data)",
                participant_id, assessment.file, variable
            );
            Ok(String::new())
        }
        Lookup::Found(v) => Ok(usable_or_blank(v)),
        Lookup::Variants(values) => {
            debug!(
                "resolve_value: processing {} rows for variable {} in file {}",
                values.len(),
                variable,
                assessment.file
            );
            resolve_variants(participant_id, variable, &assessment.file, &values)
        }
    }
}

/// Builds the merged record of one participant.
///
/// Arguments:
/// * `participant_id` the identifier, copied verbatim in the record
/// * `config` the variables to resolve and where to find them
/// * `tables` the loaded source tables, keyed by file identifier
///
/// The only error that depends on the data is
/// [`MergeErrors::AmbiguousVariants`]. It signals a broken data set and
/// should stop the whole batch.
pub fn merge_participant(
    participant_id: &str,
    config: &CdfConfig,
    tables: &SourceTables,
) -> Result<MergedRecord, MergeErrors> {
    let mut variables: Vec<(String, Vec<(String, String)>)> =
        Vec::with_capacity(config.variables().len() + 1);
    variables.push((
        RECORD_ID_VARIABLE.to_string(),
        vec![(config.first_label().to_string(), participant_id.to_string())],
    ));

    for v in config.variables() {
        let mut values: Vec<(String, String)> = Vec::with_capacity(v.assessments.len());
        for a in v.assessments.iter() {
            let value = resolve_value(participant_id, &v.name, a, tables)?;
            values.push((a.label.clone(), value));
        }
        // A configured identifier variable replaces the synthetic entry.
        match variables.iter_mut().find(|(name, _)| *name == v.name) {
            Some(entry) => entry.1 = values,
            None => variables.push((v.name.clone(), values)),
        }
    }

    Ok(MergedRecord {
        participant_id: participant_id.to_string(),
        variables,
    })
}
