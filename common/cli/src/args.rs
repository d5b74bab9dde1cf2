use clap::ValueEnum;
use plate_planning::report::ReportFormat;

/// Args decouple of CLI arg handling requirements from the internal data structures

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[value(rename_all = "lower")]
pub enum ReportFormatArg {
    Json,
    Csv,
    Markdown,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(value: ReportFormatArg) -> Self {
        match value {
            ReportFormatArg::Json => Self::Json,
            ReportFormatArg::Csv => Self::Csv,
            ReportFormatArg::Markdown => Self::Markdown,
        }
    }
}
