use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use plate_planning::issue::ReportIssue;
use plate_planning::report::{generate_report, write_report, PlateReport, ReportFormat};
use tracing::info;
use util::source::FileSource;

use crate::opts::{Command, Opts};
use crate::plan::{load_plan, Workspace};

mod opts;
mod plan;

fn main() -> anyhow::Result<()> {
    let args = argfile::expand_args(argfile::parse_fromfile, argfile::PREFIX)?;

    let opts = Opts::parse_from(args);

    cli::tracing::configure_tracing(opts.trace.clone(), opts.verbose.clone())?;

    match opts.command {
        Some(Command::Run {
            plan,
            output,
            formats,
        }) => {
            let report = replay_plan(&plan)?;

            let directory = output.unwrap_or_else(|| PathBuf::from("."));
            std::fs::create_dir_all(&directory)
                .with_context(|| format!("Creating output directory. directory: {:?}", directory))?;

            let formats: Vec<ReportFormat> = formats
                .into_iter()
                .map(ReportFormat::from)
                .collect();

            let paths = write_report(&report, &directory, &formats)?;
            for path in paths {
                info!("Written. path: {:?}", path);
            }

            print_issues(&report.issues);
        }
        Some(Command::Check {
            plan,
        }) => {
            let report = replay_plan(&plan)?;

            for preparation in report.stock_preparations.iter() {
                println!("{}: {}", preparation.stock, preparation.instructions);
            }
            print_issues(&report.issues);
        }
        None => bail!("No command given, see '--help'."),
    }

    Ok(())
}

fn replay_plan(plan_source: &FileSource) -> anyhow::Result<PlateReport> {
    let plan = load_plan(plan_source)?;

    let mut workspace = Workspace::build(&plan).with_context(|| format!("Error building plan. name: '{}'", plan.name))?;
    workspace.replay(&plan.steps)?;

    let mut issue_set: BTreeSet<ReportIssue> = BTreeSet::new();
    let report = generate_report(&workspace.inventory, &workspace.plate, &mut issue_set);

    Ok(report)
}

fn print_issues(issues: &[ReportIssue]) {
    if issues.is_empty() {
        println!("No issues.");
        return;
    }

    println!("Issues: {}", issues.len());
    for issue in issues {
        println!("{:?}: {}", issue.severity, issue.message);
    }
}
