use clap::Parser;

/// Transforms the CSV files of a cohort into CDF (cohort data format) JSON documents, one per participant.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The CSV file with the list of participant ids. The first row is a header
    /// (project_pseudo_id), then one id per row.
    #[clap(value_parser)]
    pub ids_file: String,

    /// (file path) The JSON transformation configuration. For more information about the format,
    /// read the manual of the cdf_merge library.
    #[clap(value_parser)]
    pub config_file: String,

    /// (folder path) Where the <id>.cdf.json documents are written. Created if it does not exist.
    #[clap(value_parser)]
    pub output_folder: String,

    /// (default project_pseudo_id) The name of the identifier column in the source CSV files.
    /// The comparison with the headers ignores case.
    #[clap(long, value_parser, default_value = "project_pseudo_id")]
    pub id_column: String,

    /// (folder path, optional) If specified, the relative file paths of the configuration are read
    /// from this folder instead of the current directory.
    #[clap(long, value_parser)]
    pub data_dir: Option<String>,

    /// (folder path, optional) A folder with reference documents. If provided, every generated
    /// document is compared with the reference of the same name, and the run fails if any differs.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (default 100) Number of documents between two progress reports.
    #[clap(long, value_parser, default_value_t = 100)]
    pub progress_every: usize,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
