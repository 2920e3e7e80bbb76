// Primitives for reading CSV files.

use std::fs::File;
use std::time::Instant;

use cdf_merge::builder::TableBuilder;
use cdf_merge::{CdfConfig, SourceTable, SourceTables, DEFAULT_ID_COLUMN};
use csv::StringRecord;
use log::{debug, info, warn};
use snafu::prelude::*;

use crate::cdf::{
    io_common::{resolve_path, same_column},
    *,
};

/// Loads every file referenced by the configuration, once, keeping only the
/// identifier column and the columns of the variables mapped to it.
pub fn load_tables(config: &CdfConfig, settings: &BatchSettings) -> CdfResult<SourceTables> {
    let mut tables = SourceTables::new();
    for (file, columns) in config.required_columns() {
        let start = Instant::now();
        let path = resolve_path(settings.data_dir.as_deref(), &file);
        info!("Loading and indexing {}. Columns: {:?}", path, columns);
        let table = read_source_table(&path, &file, &columns, &settings.id_column)?;
        info!(
            "{} loaded and indexed in {:.3} sec: {} rows, {} participants",
            file,
            start.elapsed().as_secs_f64(),
            table.num_rows(),
            table.num_participants()
        );
        tables.insert(file, table);
    }
    Ok(tables)
}

/// Reads one source file.
///
/// Values are kept as raw strings: no trimming, no type inference, and empty
/// cells stay empty strings. Rows of the same participant keep the file order.
pub fn read_source_table(
    path: &str,
    name: &str,
    columns: &[String],
    id_column: &str,
) -> CdfResult<SourceTable> {
    let (mut rdr, headers) = open_csv(path)?;

    let id_idx = headers
        .iter()
        .position(|h| same_column(h, id_column))
        .context(MissingIdColumnSnafu {
            column: id_column,
            path,
            available: headers.iter().map(|h| h.to_string()).collect::<Vec<String>>(),
        })?;

    let mut col_idxs: Vec<usize> = Vec::with_capacity(columns.len());
    for column in columns.iter() {
        let idx = match headers.iter().position(|h| h == column) {
            Some(idx) => idx,
            // A variable named after the identifier reads the identifier itself.
            None if same_column(column, id_column) => id_idx,
            None => {
                return MissingColumnSnafu {
                    column: column.as_str(),
                    path,
                }
                .fail()
            }
        };
        col_idxs.push(idx);
    }
    debug!(
        "read_source_table: {}: id at {}, columns at {:?}",
        path, id_idx, col_idxs
    );

    let mut builder = TableBuilder::new(name, columns).context(BuildingTableSnafu { path })?;
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = (idx + 2) as u64;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        let id = line.get(id_idx).context(CsvLineTooShortSnafu { path, lineno })?;
        let values = col_idxs
            .iter()
            .map(|col_idx| {
                line.get(*col_idx)
                    .map(|s| s.to_string())
                    .context(CsvLineTooShortSnafu { path, lineno })
            })
            .collect::<CdfResult<Vec<String>>>()?;
        builder
            .add_row(id, values)
            .context(BuildingTableSnafu { path })?;
    }
    Ok(builder.build())
}

/// Reads the list of participants: the first column of every row after the header.
pub fn read_ids(path: &str, id_column: &str) -> CdfResult<Vec<String>> {
    let (mut rdr, headers) = open_csv(path)?;
    match headers.get(0) {
        Some(h) if same_column(h, DEFAULT_ID_COLUMN) || same_column(h, id_column) => {}
        h => warn!(
            "read_ids: {}: unexpected header {:?}, reading the first column as identifiers",
            path, h
        ),
    }

    let mut ids: Vec<String> = Vec::new();
    for (idx, line_r) in rdr.records().enumerate() {
        let lineno = (idx + 2) as u64;
        let line = line_r.context(CsvLineParseSnafu { path, lineno })?;
        match line.get(0) {
            Some(id) if !id.is_empty() => ids.push(id.to_string()),
            _ => warn!("read_ids: {}: line {}: empty identifier skipped", path, lineno),
        }
    }
    info!("read_ids: {} participants read from {}", ids.len(), path);
    Ok(ids)
}

fn open_csv(path: &str) -> CdfResult<(csv::Reader<File>, StringRecord)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let headers = rdr.headers().context(CsvHeaderSnafu { path })?.clone();
    debug!("open_csv: {}: headers {:?}", path, headers);
    Ok((rdr, headers))
}
