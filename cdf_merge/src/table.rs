use std::collections::{BTreeMap, HashMap};

use crate::config::MergeErrors;

/// All the tables of a batch, keyed by the file identifier used in the
/// configuration.
pub type SourceTables = HashMap<String, SourceTable>;

/// The content of one source file, restricted to the loaded columns.
///
/// A participant may own zero, one or several rows. Several rows happen when
/// the same instrument was filled in more than once (questionnaire variants).
/// The rows of one participant keep the order in which they were added,
/// which is the order of the file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SourceTable {
    pub(crate) name: String,
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<Vec<String>>,
    // Sorted by participant id; row positions in insertion order.
    pub(crate) index: BTreeMap<String, Vec<usize>>,
}

/// The raw outcome of looking up one cell.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Lookup<'a> {
    /// No row for this participant.
    NotFound,
    /// Exactly one row.
    Found(&'a str),
    /// One value per variant row, in file order.
    Variants(Vec<&'a str>),
}

impl SourceTable {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The value columns (the identifier column is not part of it).
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_participants(&self) -> usize {
        self.index.len()
    }

    /// The participants present in this table, in sorted order.
    pub fn participant_ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(|s| s.as_str())
    }

    pub fn lookup(&self, participant_id: &str, column: &str) -> Result<Lookup<'_>, MergeErrors> {
        let col_idx = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| MergeErrors::UnknownColumn {
                file: self.name.clone(),
                column: column.to_string(),
            })?;
        let res = match self.index.get(participant_id).map(|v| v.as_slice()) {
            None | Some([]) => Lookup::NotFound,
            Some([row_idx]) => Lookup::Found(self.rows[*row_idx][col_idx].as_str()),
            Some(row_idxs) => Lookup::Variants(
                row_idxs
                    .iter()
                    .map(|row_idx| self.rows[*row_idx][col_idx].as_str())
                    .collect(),
            ),
        };
        Ok(res)
    }
}
