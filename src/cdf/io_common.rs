use std::path::{Path, PathBuf};

/// Where a file of the configuration is read from.
///
/// Absolute paths are kept. Relative paths are resolved against the data
/// directory when one is given, else against the working directory.
pub fn resolve_path(data_dir: Option<&str>, file: &str) -> String {
    match data_dir {
        Some(dir) if !Path::new(file).is_absolute() => {
            let p: PathBuf = [dir, file].iter().collect();
            p.as_path().display().to_string()
        }
        _ => file.to_string(),
    }
}

pub fn output_path(output_dir: &str, participant_id: &str) -> String {
    let p: PathBuf = [output_dir, format!("{}.cdf.json", participant_id).as_str()]
        .iter()
        .collect();
    p.as_path().display().to_string()
}

/// Header comparison for the identifier column: case does not matter and a
/// leading byte order mark is ignored.
pub fn same_column(header: &str, column: &str) -> bool {
    header.trim_start_matches('\u{feff}').eq_ignore_ascii_case(column)
}
