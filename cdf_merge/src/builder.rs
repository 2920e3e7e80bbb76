use std::collections::{BTreeMap, HashSet};

pub use crate::config::*;
pub use crate::table::*;

/// A builder for source tables.
///
/// The CSV loader feeds it one row at a time; tests use it to assemble
/// tables in memory.
///
/// ```
/// use cdf_merge::builder::TableBuilder;
/// use cdf_merge::{Lookup, MergeErrors};
///
/// let mut builder = TableBuilder::new("file_a", &["var1".to_string()])?;
/// builder.add_row_simple("participantA", &["1"])?;
/// builder.add_row_simple("participantA", &[""])?;
/// let table = builder.build();
///
/// assert_eq!(table.lookup("participantA", "var1")?, Lookup::Variants(vec!["1", ""]));
/// assert_eq!(table.lookup("participantB", "var1")?, Lookup::NotFound);
/// # Ok::<(), MergeErrors>(())
/// ```
pub struct TableBuilder {
    pub(crate) _name: String,
    pub(crate) _columns: Vec<String>,
    pub(crate) _rows: Vec<Vec<String>>,
    pub(crate) _index: BTreeMap<String, Vec<usize>>,
}

impl TableBuilder {
    /// Starts a table with the given value columns.
    ///
    /// The identifier column must not be part of `columns`.
    pub fn new(name: &str, columns: &[String]) -> Result<TableBuilder, MergeErrors> {
        let mut seen: HashSet<&str> = HashSet::new();
        for c in columns.iter() {
            if !seen.insert(c.as_str()) {
                return Err(MergeErrors::DuplicateColumn {
                    file: name.to_string(),
                    column: c.clone(),
                });
            }
        }
        Ok(TableBuilder {
            _name: name.to_string(),
            _columns: columns.to_vec(),
            _rows: Vec::new(),
            _index: BTreeMap::new(),
        })
    }

    /// Adds a row, with one value per column in declaration order.
    ///
    /// Values are stored as given: no trimming and no interpretation of
    /// missing-value codes.
    pub fn add_row(&mut self, participant_id: &str, values: Vec<String>) -> Result<(), MergeErrors> {
        if values.len() != self._columns.len() {
            return Err(MergeErrors::RowLength {
                file: self._name.clone(),
                expected: self._columns.len(),
                found: values.len(),
            });
        }
        let row_idx = self._rows.len();
        self._rows.push(values);
        self._index
            .entry(participant_id.to_string())
            .or_default()
            .push(row_idx);
        Ok(())
    }

    pub fn add_row_simple(&mut self, participant_id: &str, values: &[&str]) -> Result<(), MergeErrors> {
        self.add_row(participant_id, values.iter().map(|s| s.to_string()).collect())
    }

    pub fn build(self) -> SourceTable {
        SourceTable {
            name: self._name,
            columns: self._columns,
            rows: self._rows,
            index: self._index,
        }
    }
}
