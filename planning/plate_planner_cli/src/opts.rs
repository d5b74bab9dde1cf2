use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use cli::args::ReportFormatArg;
use util::source::FileSource;

#[derive(Parser)]
#[command(name = "plate_planner_cli")]
#[command(bin_name = "plate_planner_cli")]
#[command(version, about, long_about = None)]
pub struct Opts {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Trace log file
    #[arg(long, num_args = 0..=1, default_missing_value = "trace.log")]
    pub trace: Option<PathBuf>,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay a plan and write the plate report
    Run {
        /// Plan file
        #[arg(long, value_name = "FILE")]
        plan: FileSource,

        /// Output directory, defaults to the current directory
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Report formats
        #[arg(long, value_enum, num_args = 1.., value_delimiter = ',', default_values_t = [ReportFormatArg::Json, ReportFormatArg::Csv])]
        formats: Vec<ReportFormatArg>,
    },
    /// Replay a plan and print the issues, nothing is written
    Check {
        /// Plan file
        #[arg(long, value_name = "FILE")]
        plan: FileSource,
    },
}
