//! Access Log Grouping Tool
//!
//! Reads Apache-combined-like access logs, drops lines through include/exclude
//! regex filters, and counts the rest in a tree keyed by any combination of
//! extracted fields (ip, date, code, method, uri, protocol, request, ua, ref).
//! The tree is printed as an indented report with per-branch subtotals.

mod config;
mod error;
mod field;
mod filter;
mod logging;
mod record;
mod report;
mod runner;
mod tree;

use clap::{ArgAction, Parser};
use std::env;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use colored::*;
use tracing::{debug, warn};

use crate::config::{default_group, Config};
use crate::error::{Error, Result};
use crate::field::GroupField;
use crate::filter::{FilterConfig, FilterRule};
use crate::runner::{BatchRunner, Progress};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Group and count access log lines into an indented tree report",
    long_about = "Fields: ip, date, code, method, uri, protocol, request, ua, ref. \
                  A group spec is name[:format]; join several with ',' to build one composite column, \
                  e.g. -g date -g code,method,uri:100 -g ip:20."
)]
struct Args {
    /// Log files or glob patterns.
    files: Vec<String>,

    /// Group field for the next tree level; repeat for deeper trees.
    #[arg(short, long, value_name = "SPEC", action = ArgAction::Append)]
    group: Vec<String>,

    /// Group preset from the config file, by name or index.
    #[arg(short, long, value_name = "NAME", allow_hyphen_values = true)]
    preset: Option<String>,

    /// Keep only lines matching FIELD=REGEX (any of several).
    #[arg(short, long, value_name = "FIELD=REGEX", action = ArgAction::Append)]
    include: Vec<String>,

    /// Drop lines matching FIELD=REGEX (any of several).
    #[arg(short = 'x', long, value_name = "FIELD=REGEX", action = ArgAction::Append)]
    exclude: Vec<String>,

    /// Filter set from the config file to exclude; prefix with '!' to include instead.
    #[arg(short, long, value_name = "SET", action = ArgAction::Append, allow_hyphen_values = true)]
    select: Vec<String>,

    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Token separator used to split log lines.
    #[arg(long, default_value_t = ' ')]
    separator: char,

    /// Print only the tree report.
    #[arg(short, long)]
    quiet: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn has_glob_chars(arg: &str) -> bool {
    arg.contains(['*', '?', '['])
}

/// Expands glob patterns and keeps regular files only, in argument order.
fn expand_inputs(args: &[String]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for arg in args {
        if !has_glob_chars(arg) {
            let path = Path::new(arg);
            if path.is_file() {
                files.push(path.to_path_buf());
            } else {
                warn!(path = %arg, "skipping input: not a file");
            }
            continue;
        }
        match glob::glob(arg) {
            Ok(entries) => {
                let before = files.len();
                files.extend(entries.flatten().filter(|p| p.is_file()));
                if files.len() == before {
                    warn!(pattern = %arg, "pattern matched no files");
                }
            }
            Err(err) => warn!(pattern = %arg, error = %err, "skipping invalid pattern"),
        }
    }
    files
}

/// Command-line groups win over a preset, a preset over the config default.
fn resolve_group(args: &Args, config: &Config) -> Result<Vec<GroupField>> {
    if !args.group.is_empty() {
        return args.group.iter().map(|spec| spec.parse()).collect();
    }
    if let Some(preset) = &args.preset {
        return Ok(config.preset(preset)?.to_vec());
    }
    match &config.group {
        Some(group) => Ok(group.clone()),
        None => default_group(),
    }
}

fn resolve_filters(args: &Args, config: &Config) -> Result<FilterConfig> {
    let include = args
        .include
        .iter()
        .map(|rule| FilterRule::from_assignment(rule))
        .collect::<Result<Vec<_>>>()?;
    let exclude = args
        .exclude
        .iter()
        .map(|rule| FilterRule::from_assignment(rule))
        .collect::<Result<Vec<_>>>()?;
    config.filter_config(&args.select, include, exclude)
}

fn format_group(fields: &[GroupField]) -> String {
    let parts: Vec<String> = fields.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

fn main() -> ExitCode {
    match run_with_args(env::args_os()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run_with_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = Args::parse_from(args);
    logging::init_logging(args.verbose);
    run_cli(args)
}

fn run_cli(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let fields = resolve_group(&args, &config)?;
    let filters = resolve_filters(&args, &config)?;

    let stdout = io::stdout();
    if !args.quiet {
        let mut out = stdout.lock();
        writeln!(
            out,
            "{} {}",
            env!("CARGO_PKG_NAME").bright_cyan().bold(),
            format!("v{}", env!("CARGO_PKG_VERSION")).bright_yellow()
        )?;
        writeln!(
            out,
            "\n---------\n{} : {}\n---------\n",
            "Group by".bold(),
            format_group(&fields)
        )?;
        writeln!(
            out,
            "---------\n{} : {}\n---------\n",
            "Filters".bold(),
            filters
        )?;
        out.flush()?;
    }

    let files = expand_inputs(&args.files);
    if files.is_empty() {
        return Err(Error::NoInput);
    }
    debug!(files = files.len(), levels = fields.len(), "starting run");

    let outcome = BatchRunner::new(&fields, &filters)
        .separator(args.separator)
        .progress(Progress::stdout(!args.quiet))
        .run(&files)?;

    let report = report::render(&outcome.tree, &fields);
    debug!(total = report.total, kept = outcome.stats.kept(), "report rendered");
    let mut out = stdout.lock();
    out.write_all(report.text.as_bytes())?;
    out.flush()?;
    Ok(())
}
