// ********* Input data structures ***********

use std::collections::HashSet;
use std::error::Error;
use std::fmt::Display;

/// The identifier column that every source table is expected to carry.
pub const DEFAULT_ID_COLUMN: &str = "project_pseudo_id";

/// The name of the entry that repeats the participant id in every record.
pub const RECORD_ID_VARIABLE: &str = "project_pseudo_id";

/// The variables shared by every assessment instrument.
///
/// When a participant filled in several variants of the same questionnaire,
/// these are duplicated identically across the variant rows.
pub const STRUCTURAL_VARIABLES: [&str; 6] = [
    "project_pseudo_id",
    "variant_id",
    "date",
    "age",
    "gender",
    "zip_code",
];

/// Missing-value codes (`$4`, `$6`, ...) start with this marker.
pub const SENTINEL_MARKER: char = '$';

/// One source of a variable: the label under which the value is reported
/// and the file it is read from.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Assessment {
    pub label: String,
    pub file: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VariableSpec {
    pub name: String,
    pub assessments: Vec<Assessment>,
}

/// The validated transformation configuration.
///
/// Invariants checked at construction:
/// - there is at least one variable
/// - variable names are unique
/// - every variable has at least one assessment
/// - labels are unique within one variable
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CdfConfig {
    variables: Vec<VariableSpec>,
}

impl CdfConfig {
    pub fn new(variables: Vec<VariableSpec>) -> Result<CdfConfig, MergeErrors> {
        if variables.is_empty() {
            return Err(MergeErrors::EmptyConfig);
        }
        let mut seen_variables: HashSet<&str> = HashSet::new();
        for v in variables.iter() {
            if !seen_variables.insert(v.name.as_str()) {
                return Err(MergeErrors::DuplicateVariable {
                    variable: v.name.clone(),
                });
            }
            if v.assessments.is_empty() {
                return Err(MergeErrors::EmptyAssessments {
                    variable: v.name.clone(),
                });
            }
            let mut seen_labels: HashSet<&str> = HashSet::new();
            for a in v.assessments.iter() {
                if !seen_labels.insert(a.label.as_str()) {
                    return Err(MergeErrors::DuplicateLabel {
                        variable: v.name.clone(),
                        label: a.label.clone(),
                    });
                }
            }
        }
        Ok(CdfConfig { variables })
    }

    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    /// The label used for the synthetic identifier entry: the first label of
    /// the first variable.
    pub fn first_label(&self) -> &str {
        // Never empty after validation.
        self.variables[0].assessments[0].label.as_str()
    }

    /// For each distinct file, the variables that must be loaded from it.
    ///
    /// Variables are listed in configuration order, files in order of first
    /// appearance. The identifier column is not part of the list.
    pub fn required_columns(&self) -> Vec<(String, Vec<String>)> {
        let mut res: Vec<(String, Vec<String>)> = Vec::new();
        for v in self.variables.iter() {
            for a in v.assessments.iter() {
                let pos = match res.iter().position(|(f, _)| *f == a.file) {
                    Some(pos) => pos,
                    None => {
                        res.push((a.file.clone(), Vec::new()));
                        res.len() - 1
                    }
                };
                let cols = &mut res[pos].1;
                if !cols.contains(&v.name) {
                    cols.push(v.name.clone());
                }
            }
        }
        res
    }
}

// ******** Output data structures *********

/// The merged record of one participant.
///
/// Variables and labels are kept in configuration order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct MergedRecord {
    pub participant_id: String,
    pub variables: Vec<(String, Vec<(String, String)>)>,
}

impl MergedRecord {
    /// The resolved value of a variable for one assessment label.
    pub fn get(&self, variable: &str, label: &str) -> Option<&str> {
        self.variables
            .iter()
            .find(|(name, _)| name == variable)
            .and_then(|(_, values)| values.iter().find(|(l, _)| l == label))
            .map(|(_, value)| value.as_str())
    }
}

/// Errors that prevent a batch from completing.
///
/// All of them are fatal for the whole run. `AmbiguousVariants` is the only
/// one that depends on the data of a single participant.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum MergeErrors {
    /// Two or more variant rows carry a value for a variable that only one
    /// variant is supposed to ask.
    AmbiguousVariants {
        participant_id: String,
        variable: String,
        file: String,
        values: Vec<String>,
    },
    MissingTable {
        file: String,
    },
    UnknownColumn {
        file: String,
        column: String,
    },
    EmptyConfig,
    EmptyAssessments {
        variable: String,
    },
    DuplicateLabel {
        variable: String,
        label: String,
    },
    DuplicateVariable {
        variable: String,
    },
    DuplicateColumn {
        file: String,
        column: String,
    },
    RowLength {
        file: String,
        expected: usize,
        found: usize,
    },
}

impl MergeErrors {
    pub fn is_ambiguity(&self) -> bool {
        matches!(self, MergeErrors::AmbiguousVariants { .. })
    }
}

impl Error for MergeErrors {}

impl Display for MergeErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeErrors::AmbiguousVariants {
                participant_id,
                variable,
                file,
                values,
            } => write!(
                f,
                "variable {} has multiple non-empty values for the pseudo_id '{}' in the file {}: {:?}",
                variable, participant_id, file, values
            ),
            MergeErrors::MissingTable { file } => {
                write!(f, "no table loaded for file {}", file)
            }
            MergeErrors::UnknownColumn { file, column } => {
                write!(f, "column {} was not loaded from file {}", column, file)
            }
            MergeErrors::EmptyConfig => write!(f, "the configuration has no variable"),
            MergeErrors::EmptyAssessments { variable } => {
                write!(f, "variable {} has no assessment", variable)
            }
            MergeErrors::DuplicateLabel { variable, label } => write!(
                f,
                "label {} appears more than once for variable {}",
                label, variable
            ),
            MergeErrors::DuplicateVariable { variable } => {
                write!(f, "variable {} is configured more than once", variable)
            }
            MergeErrors::DuplicateColumn { file, column } => {
                write!(f, "column {} is declared twice for file {}", column, file)
            }
            MergeErrors::RowLength {
                file,
                expected,
                found,
            } => write!(
                f,
                "row of file {} has {} values, expected {}",
                file, found, expected
            ),
        }
    }
}
