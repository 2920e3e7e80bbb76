use log::{error, info};

use cdf_merge::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::args::Args;
use crate::cdf::config_reader::read_config;
use crate::cdf::io_csv::{load_tables, read_ids};
use crate::cdf::io_json::{check_reference, record_to_json, write_record};

pub mod config_reader;
pub mod io_common;
pub mod io_csv;
pub mod io_json;

#[derive(Debug, Snafu)]
pub enum CdfError {
    #[snafu(display("The specified file path '{path}' does not exist."))]
    MissingInput { path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Invalid configuration for variable '{variable}': {reason}"))]
    InvalidConfig { variable: String, reason: String },
    #[snafu(display("Invalid configuration"))]
    ConfigValidation { source: MergeErrors },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading the header of CSV file {path}"))]
    CsvHeader { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of CSV file {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: u64,
    },
    #[snafu(display("Line {lineno} of CSV file {path} is too short"))]
    CsvLineTooShort { path: String, lineno: u64 },
    #[snafu(display("ID column '{column}' not found in {path}. Available: {available:?}"))]
    MissingIdColumn {
        column: String,
        path: String,
        available: Vec<String>,
    },
    #[snafu(display("Column '{column}' required by the configuration not found in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Error indexing {path}"))]
    BuildingTable { source: MergeErrors, path: String },
    #[snafu(display("Error processing participant '{participant_id}'"))]
    Merge {
        source: MergeErrors,
        participant_id: String,
    },
    #[snafu(display("Error creating output folder {path}"))]
    CreatingOutputDir {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error serializing the document of participant '{participant_id}'"))]
    SerializingJson {
        source: serde_json::Error,
        participant_id: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CdfResult<T> = Result<T, CdfError>;

/// Everything a batch needs to know, as given on the command line.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BatchSettings {
    pub ids_path: String,
    pub config_path: String,
    pub output_dir: String,
    pub reference_dir: Option<String>,
    pub data_dir: Option<String>,
    pub id_column: String,
    pub progress_every: usize,
}

impl From<&Args> for BatchSettings {
    fn from(args: &Args) -> Self {
        BatchSettings {
            ids_path: args.ids_file.clone(),
            config_path: args.config_file.clone(),
            output_dir: args.output_folder.clone(),
            reference_dir: args.reference.clone(),
            data_dir: args.data_dir.clone(),
            id_column: args.id_column.clone(),
            progress_every: args.progress_every,
        }
    }
}

fn check_input(path: &str) -> CdfResult<()> {
    ensure!(Path::new(path).is_file(), MissingInputSnafu { path });
    Ok(())
}

/// Runs a whole batch: loads every source table once, then writes one
/// document per participant of the ids file.
///
/// Any error stops the batch. The documents written before the error are
/// left on disk. Returns the number of documents written.
pub fn run_batch(settings: &BatchSettings) -> CdfResult<usize> {
    check_input(&settings.ids_path)?;
    check_input(&settings.config_path)?;

    let load_start = Instant::now();
    let ids = read_ids(&settings.ids_path, &settings.id_column)?;
    let config = read_config(&settings.config_path)?;
    let tables = load_tables(&config, settings)?;
    info!(
        "{} CSV files loaded and indexed in {:.3} seconds.",
        tables.len(),
        load_start.elapsed().as_secs_f64()
    );

    fs::create_dir_all(&settings.output_dir).context(CreatingOutputDirSnafu {
        path: settings.output_dir.as_str(),
    })?;

    let process_start = Instant::now();
    let mut progress_count: usize = 0;
    let mut mismatches: Vec<String> = Vec::new();
    for id in ids.iter() {
        let record = match merge_participant(id, &config, &tables) {
            Ok(record) => record,
            Err(e) => {
                error!(
                    "An error occurred after processing {} rows. Time elapsed: {:.3} sec.",
                    progress_count,
                    process_start.elapsed().as_secs_f64()
                );
                return Err(e).context(MergeSnafu {
                    participant_id: id.as_str(),
                });
            }
        };
        let js = record_to_json(&record);
        write_record(&settings.output_dir, &record.participant_id, &js)?;
        progress_count += 1;

        if let Some(reference_dir) = &settings.reference_dir {
            if !check_reference(reference_dir, id, &js)? {
                mismatches.push(id.clone());
            }
        }

        if settings.progress_every > 0 && progress_count % settings.progress_every == 0 {
            let elapsed = process_start.elapsed().as_secs_f64();
            info!(
                "{} files processed. Elapsed time: {:.3} sec ({:.1} rows/s)",
                progress_count,
                elapsed,
                progress_count as f64 / elapsed.max(f64::EPSILON)
            );
        }
    }

    info!(
        "{} files created on {} in {:.3} sec.",
        progress_count,
        settings.output_dir,
        process_start.elapsed().as_secs_f64()
    );

    if !mismatches.is_empty() {
        whatever!(
            "Difference detected between {} generated documents and their reference: {:?}",
            mismatches.len(),
            mismatches
        )
    }
    Ok(progress_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serde_json::Value as JSValue;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const FILE_A: &str = "project_pseudo_id,var1,var2\n\
                          participantA,1,2\n\
                          participantB,5,5\n\
                          participantC,7,6\n";
    const FILE_B: &str = "project_pseudo_id,var1,var2,varN\n\
                          participantA,20,12,2001-1\n\
                          participantB,90,15,2001-2\n\
                          participantC,70,26,2001-3\n";
    const FILE_C: &str = "project_pseudo_id,var1,var2\n\
                          participantA,100,200\n\
                          participantB,500,500\n\
                          participantC,700,600\n";
    const CONFIG: &str = r#"{
        "var1": [{"1a": "file_a.csv"}, {"1b": "file_b.csv"}, {"1c": "file_c.csv"}],
        "var2": [{"3a": "file_a.csv"}, {"3b": "file_b.csv"}, {"3c": "file_c.csv"}],
        "varN": [{"general": "file_b.csv"}]
    }"#;
    const IDS: &str = "project_pseudo_id\nparticipantA\nparticipantB\nparticipantC\n";

    fn write(dir: &Path, name: &str, content: &str) -> String {
        let p: PathBuf = dir.join(name);
        fs::write(&p, content).unwrap();
        p.display().to_string()
    }

    fn setup(files: &[(&str, &str)], config: &str, ids: &str) -> (TempDir, BatchSettings) {
        let tmp = TempDir::new().unwrap();
        for (name, content) in files {
            write(tmp.path(), name, content);
        }
        let settings = BatchSettings {
            ids_path: write(tmp.path(), "ids.csv", ids),
            config_path: write(tmp.path(), "config.json", config),
            output_dir: tmp.path().join("out").display().to_string(),
            reference_dir: None,
            data_dir: Some(tmp.path().display().to_string()),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            progress_every: 2,
        };
        (tmp, settings)
    }

    fn read_output(settings: &BatchSettings, id: &str) -> JSValue {
        let p = io_common::output_path(&settings.output_dir, id);
        serde_json::from_str(&fs::read_to_string(p).unwrap()).unwrap()
    }

    fn output_exists(settings: &BatchSettings, id: &str) -> bool {
        Path::new(&io_common::output_path(&settings.output_dir, id)).exists()
    }

    fn three_files() -> Vec<(&'static str, &'static str)> {
        vec![
            ("file_a.csv", FILE_A),
            ("file_b.csv", FILE_B),
            ("file_c.csv", FILE_C),
        ]
    }

    #[test]
    fn batch_with_complete_data() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (_tmp, settings) = setup(&three_files(), CONFIG, IDS);
        assert_eq!(run_batch(&settings).unwrap(), 3);
        assert_eq!(
            read_output(&settings, "participantA"),
            json!({
                "project_pseudo_id": {"1a": "participantA"},
                "var1": {"1a": "1", "1b": "20", "1c": "100"},
                "var2": {"3a": "2", "3b": "12", "3c": "200"},
                "varN": {"general": "2001-1"}
            })
        );
        assert_eq!(
            read_output(&settings, "participantC"),
            json!({
                "project_pseudo_id": {"1a": "participantC"},
                "var1": {"1a": "7", "1b": "70", "1c": "700"},
                "var2": {"3a": "6", "3b": "26", "3c": "600"},
                "varN": {"general": "2001-3"}
            })
        );
    }

    #[test]
    fn one_document_per_identifier() {
        let ids = "PROJECT_PSEUDO_ID\nparticipantA\nparticipantZ\n Spaced Id \n";
        let (_tmp, settings) = setup(&three_files(), CONFIG, ids);
        assert_eq!(run_batch(&settings).unwrap(), 3);
        for id in ["participantA", "participantZ", " Spaced Id "] {
            let js = read_output(&settings, id);
            assert_eq!(js["project_pseudo_id"]["1a"], json!(id));
        }
        assert_eq!(
            read_output(&settings, "participantZ")["var1"],
            json!({"1a": "", "1b": "", "1c": ""})
        );
        let written = fs::read_dir(&settings.output_dir).unwrap().count();
        assert_eq!(written, 3);
    }

    #[test]
    fn values_are_kept_as_raw_strings() {
        let file_a = "project_pseudo_id,var1,var2\nparticipantA,007,1.50\nparticipantB,,$6\n";
        let config = r#"{"var1": [{"1a": "file_a.csv"}], "var2": [{"1a": "file_a.csv"}]}"#;
        let ids = "project_pseudo_id\nparticipantA\nparticipantB\n";
        let (_tmp, settings) = setup(&[("file_a.csv", file_a)], config, ids);
        run_batch(&settings).unwrap();
        assert_eq!(
            read_output(&settings, "participantA"),
            json!({"project_pseudo_id": {"1a": "participantA"}, "var1": {"1a": "007"}, "var2": {"1a": "1.50"}})
        );
        assert_eq!(
            read_output(&settings, "participantB"),
            json!({"project_pseudo_id": {"1a": "participantB"}, "var1": {"1a": ""}, "var2": {"1a": ""}})
        );
    }

    #[test]
    fn identifier_header_ignores_case() {
        let file_a = "PROJECT_PSEUDO_ID,var1,unused\nparticipantA,1,x\n";
        let config = r#"{"var1": [{"1a": "file_a.csv"}]}"#;
        let (_tmp, settings) = setup(&[("file_a.csv", file_a)], config, IDS);
        run_batch(&settings).unwrap();
        assert_eq!(read_output(&settings, "participantA")["var1"], json!({"1a": "1"}));
    }

    #[test]
    fn questionnaire_variants_across_files() {
        let file_a = "project_pseudo_id,variant_id,var1,var2\n\
                      participantA,vr1,,\n\
                      participantA,vr2,1,\n\
                      participantA,vr3,,2\n\
                      participantB,vr1,5,5\n\
                      participantC,vr1,7,6\n";
        let (_tmp, settings) = setup(
            &[("file_a.csv", file_a), ("file_b.csv", FILE_B), ("file_c.csv", FILE_C)],
            CONFIG,
            IDS,
        );
        run_batch(&settings).unwrap();
        let js = read_output(&settings, "participantA");
        assert_eq!(js["var1"], json!({"1a": "1", "1b": "20", "1c": "100"}));
        assert_eq!(js["var2"], json!({"3a": "2", "3b": "12", "3c": "200"}));
    }

    #[test]
    fn ambiguous_variants_halt_the_batch() {
        let file_a = "project_pseudo_id,var1,var2\n\
                      participantA,1,2\n\
                      participantB,5,\n\
                      participantB,6,\n\
                      participantC,7,6\n";
        let (_tmp, settings) = setup(
            &[("file_a.csv", file_a), ("file_b.csv", FILE_B), ("file_c.csv", FILE_C)],
            CONFIG,
            IDS,
        );
        match run_batch(&settings) {
            Err(CdfError::Merge {
                source,
                participant_id,
            }) => {
                assert!(source.is_ambiguity());
                assert_eq!(participant_id, "participantB");
            }
            x => panic!("unexpected result {:?}", x),
        }
        assert!(output_exists(&settings, "participantA"));
        assert!(!output_exists(&settings, "participantB"));
        assert!(!output_exists(&settings, "participantC"));
    }

    #[test]
    fn missing_identifier_column_is_fatal() {
        let file_a = "ergoid,var1\nparticipantA,1\n";
        let config = r#"{"var1": [{"1a": "file_a.csv"}]}"#;
        let (_tmp, settings) = setup(&[("file_a.csv", file_a)], config, IDS);
        match run_batch(&settings) {
            Err(CdfError::MissingIdColumn { column, .. }) => assert_eq!(column, "project_pseudo_id"),
            x => panic!("unexpected result {:?}", x),
        }
        assert!(!output_exists(&settings, "participantA"));
    }

    #[test]
    fn missing_configured_column_is_fatal() {
        let config = r#"{"var1": [{"1a": "file_a.csv"}], "var9": [{"9a": "file_c.csv"}]}"#;
        let (_tmp, settings) = setup(&three_files(), config, IDS);
        match run_batch(&settings) {
            Err(CdfError::MissingColumn { column, path }) => {
                assert_eq!(column, "var9");
                assert!(path.ends_with("file_c.csv"));
            }
            x => panic!("unexpected result {:?}", x),
        }
        assert!(!output_exists(&settings, "participantA"));
    }

    #[test]
    fn unreadable_source_is_fatal() {
        let config = r#"{"var1": [{"1a": "file_a.csv"}, {"1b": "nowhere.csv"}]}"#;
        let (_tmp, settings) = setup(&three_files(), config, IDS);
        assert!(matches!(run_batch(&settings), Err(CdfError::CsvOpen { .. })));
    }

    #[test]
    fn ragged_row_is_fatal() {
        let file_a = "project_pseudo_id,var1\nparticipantA,1\nparticipantB,2,3\n";
        let config = r#"{"var1": [{"1a": "file_a.csv"}]}"#;
        let (_tmp, settings) = setup(&[("file_a.csv", file_a)], config, IDS);
        match run_batch(&settings) {
            Err(CdfError::CsvLineParse { lineno, .. }) => assert_eq!(lineno, 3),
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn missing_inputs_are_reported() {
        let (_tmp, mut settings) = setup(&three_files(), CONFIG, IDS);
        settings.ids_path = "does/not/exist.csv".to_string();
        assert!(matches!(run_batch(&settings), Err(CdfError::MissingInput { .. })));
    }

    #[test]
    fn malformed_configurations() {
        let configs = [
            r#"["var1"]"#,
            r#"{"var1": {"1a": "file_a.csv"}}"#,
            r#"{"var1": [{"1a": "file_a.csv", "1b": "file_b.csv"}]}"#,
            r#"{"var1": [{"1a": 3}]}"#,
        ];
        for c in configs {
            let js: JSValue = serde_json::from_str(c).unwrap();
            assert!(
                matches!(config_reader::parse_config(&js), Err(CdfError::InvalidConfig { .. })),
                "{}",
                c
            );
        }
        let js = json!({"var1": []});
        assert!(matches!(
            config_reader::parse_config(&js),
            Err(CdfError::ConfigValidation {
                source: MergeErrors::EmptyAssessments { .. }
            })
        ));
        let js = json!({"var1": [{"1a": "file_a.csv"}, {"1a": "file_b.csv"}]});
        assert!(matches!(
            config_reader::parse_config(&js),
            Err(CdfError::ConfigValidation {
                source: MergeErrors::DuplicateLabel { .. }
            })
        ));
    }

    #[test]
    fn configuration_order_is_kept() {
        let js = json!({"zeta": [{"z": "f.csv"}], "alpha": [{"a": "f.csv"}]});
        let config = config_reader::parse_config(&js).unwrap();
        let names: Vec<&str> = config.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(config.first_label(), "z");
    }

    #[test]
    fn reference_comparison() {
        let (tmp, mut settings) = setup(&three_files(), CONFIG, IDS);
        run_batch(&settings).unwrap();

        // The first run is its own reference.
        settings.reference_dir = Some(settings.output_dir.clone());
        settings.output_dir = tmp.path().join("out2").display().to_string();
        assert_eq!(run_batch(&settings).unwrap(), 3);

        // Key order does not matter, values do.
        let ref_dir = tmp.path().join("ref");
        fs::create_dir_all(&ref_dir).unwrap();
        for id in ["participantA", "participantB", "participantC"] {
            let mut js = read_output(&settings, id);
            if id == "participantB" {
                js["var1"]["1b"] = json!("91");
            }
            write(&ref_dir, &format!("{}.cdf.json", id), &js.to_string());
        }
        settings.reference_dir = Some(ref_dir.display().to_string());
        assert!(matches!(run_batch(&settings), Err(CdfError::Whatever { .. })));
    }
}
