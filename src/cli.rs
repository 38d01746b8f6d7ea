use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::fmt;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[clap(long, value_parser, default_value_t = false)]
    pub verbose: bool,

    /// Write the log to this file instead of stderr
    #[clap(long, value_parser)]
    pub log: Option<PathBuf>,

    /// Configuration file to use instead of the discovered one
    #[clap(long, value_parser)]
    pub config: Option<PathBuf>,

    /// Print prometheus metrics after the command finishes
    #[clap(long, value_parser, default_value_t = false)]
    pub metrics: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search file contents under the given paths
    Search {
        pattern: String,

        #[clap(default_value = ".")]
        paths: Vec<PathBuf>,

        #[clap(long, value_parser)]
        max_results: Option<usize>,

        #[clap(long, value_parser)]
        max_columns: Option<usize>,

        /// Skip files larger than this, e.g. `512K` or `2M`
        #[clap(long, value_parser)]
        max_filesize: Option<String>,

        #[clap(long, value_parser, use_value_delimiter = true)]
        exclude: Vec<String>,

        #[clap(long, value_parser, use_value_delimiter = true)]
        include: Vec<String>,

        #[clap(long, value_parser, default_value_t = false)]
        hidden: bool,

        /// Never spawn ripgrep; use the in-process scanner
        #[clap(long, value_parser, default_value_t = false)]
        scan_only: bool,

        #[clap(long, value_parser, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print a highlighted file, optionally focused on a line
    Preview {
        file: PathBuf,

        /// One-based line to focus
        #[clap(long, value_parser)]
        line: Option<usize>,

        /// Rows of the preview window
        #[clap(long, value_parser, default_value_t = 40)]
        height: usize,
    },
    /// Browse results and previews in the terminal
    Interactive {
        pattern: String,

        #[clap(default_value = ".")]
        paths: Vec<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[clap(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
