//! textgrid - load delimited text files, shape the table from flags, print the rows.

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::BufWriter;
use std::ops::ControlFlow;
use std::path::PathBuf;
use textgrid::dedup::KeepPolicy;
use textgrid::export::{ExportData, ExportEncoder, TextEncoder};
use textgrid::{Editor, EngineConfig, FilterRule, MatchMode, ViewColumn};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let matches = Command::new("textgrid")
        .version(textgrid::VERSION)
        .about("Filter, sort, deduplicate and group delimited text tables")
        .long_about(
            "textgrid loads one or more delimited text files as a single table, \
             applies the requested filters and transforms, and prints the resulting rows. \
             Column numbers are 1-based; column 0 is the row identifier.",
        )
        .arg(
            Arg::new("files")
                .help("Files to load, concatenated in order")
                .required(true)
                .num_args(1..)
                .value_parser(clap::value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("delimiter")
                .short('d')
                .long("delimiter")
                .help("Field delimiter [default: from config, \"----\"]"),
        )
        .arg(
            Arg::new("filter")
                .short('f')
                .long("filter")
                .action(ArgAction::Append)
                .help("Filter rule COLUMN:MODE:VALUE, COLUMN '*' for any column (repeatable)"),
        )
        .arg(
            Arg::new("global")
                .short('g')
                .long("global")
                .help("Keep rows where any column contains this text"),
        )
        .arg(
            Arg::new("sort")
                .short('s')
                .long("sort")
                .value_parser(clap::value_parser!(usize))
                .help("Sort the output by this column"),
        )
        .arg(
            Arg::new("desc")
                .long("desc")
                .action(ArgAction::SetTrue)
                .help("Sort descending"),
        )
        .arg(
            Arg::new("dedup")
                .long("dedup")
                .help("Remove duplicate rows keyed on these comma-separated columns"),
        )
        .arg(
            Arg::new("keep-last")
                .long("keep-last")
                .action(ArgAction::SetTrue)
                .help("Keep the last duplicate instead of the first"),
        )
        .arg(
            Arg::new("group")
                .long("group")
                .help("Print occurrence counts per distinct value of these columns"),
        )
        .arg(
            Arg::new("columns")
                .short('c')
                .long("columns")
                .help("Output only these comma-separated columns, in this order"),
        )
        .get_matches();

    let files: Vec<PathBuf> = matches
        .get_many::<PathBuf>("files")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let mut editor = Editor::new(EngineConfig::load());
    if let Some(delimiter) = matches.get_one::<String>("delimiter") {
        editor.set_delimiter(delimiter.clone());
    }

    let report = editor
        .load_files(&files, |progress| {
            log::info!(
                "parsed {}/{} lines",
                progress.processed_lines,
                progress.total_lines
            );
            ControlFlow::Continue(())
        })
        .await?
        .context("loading was cancelled")?;
    for warning in &report.warnings {
        eprintln!("warning: {warning:?}");
    }

    configure_view(&mut editor, &matches)?;

    if let Some(keys) = matches.get_one::<String>("dedup") {
        let keys = parse_columns(keys)?;
        let policy = if matches.get_flag("keep-last") {
            KeepPolicy::Last
        } else {
            KeepPolicy::First
        };
        let removed = editor.remove_duplicates(&keys, policy)?;
        log::info!("removed {removed} duplicate rows");
    }

    let delimiter = editor.delimiter().to_string();
    let data = if let Some(keys) = matches.get_one::<String>("group") {
        let grouped = editor.group_view(&parse_columns(keys)?)?;
        ExportData {
            headers: grouped.headers,
            rows: grouped.rows,
        }
    } else {
        let columns = match matches.get_one::<String>("columns") {
            Some(list) => parse_columns(list)?,
            None => (0..editor.store().column_count()).collect(),
        };
        if columns.is_empty() {
            return Ok(());
        }
        editor.export(&columns, None)?
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    TextEncoder::new(delimiter).encode(&data, &mut out)?;

    editor.shutdown().await;
    Ok(())
}

fn configure_view(editor: &mut Editor, matches: &ArgMatches) -> Result<()> {
    if let Some(global) = matches.get_one::<String>("global") {
        editor.set_global_filter(global);
    }
    if let Some(rules) = matches.get_many::<String>("filter") {
        for rule in rules {
            editor.add_rule(parse_rule(rule)?);
        }
    }
    if let Some(&column) = matches.get_one::<usize>("sort") {
        editor.set_sort(ViewColumn::from_display_index(column), !matches.get_flag("desc"));
    }
    Ok(())
}

/// `COLUMN:MODE:VALUE`; the value may itself contain ':'
fn parse_rule(spec: &str) -> Result<FilterRule> {
    let mut parts = spec.splitn(3, ':');
    let (Some(column), Some(mode), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        bail!("filter '{spec}' is not COLUMN:MODE:VALUE");
    };
    let mode = MatchMode::from_label(mode).with_context(|| {
        format!(
            "unknown match mode '{mode}', expected one of: {}",
            MatchMode::ALL.map(MatchMode::label).join(", ")
        )
    })?;
    let column = match column.trim() {
        "*" => None,
        number => Some(data_column(number)?),
    };
    Ok(FilterRule::new(column, mode, value))
}

fn parse_columns(list: &str) -> Result<Vec<usize>> {
    list.split(',')
        .filter(|item| !item.trim().is_empty())
        .map(data_column)
        .collect()
}

/// 1-based column number to data index
fn data_column(text: &str) -> Result<usize> {
    let number: usize = text
        .trim()
        .parse()
        .with_context(|| format!("'{text}' is not a column number"))?;
    match ViewColumn::from_display_index(number) {
        ViewColumn::Data(index) => Ok(index),
        ViewColumn::RowId => bail!("column 0 is the row identifier; data columns start at 1"),
    }
}
