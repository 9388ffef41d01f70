//! quantbar — run a 200-bar SMA crossover backtest over one or more bar
//! files and report the result.

mod strategy;
mod summary;

use anyhow::{Context, Result};
use clap::Parser;
use quantbar_core::decimal::Decimal;
use quantbar_core::engine::backtest::BackTest;
use quantbar_core::io::bar_source::{parse_daily_bar, parse_intraday_bar, BarParser, BufReadSource};
use quantbar_core::io::equity_writer::{unique_path, write_eqvals};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use strategy::MaCrossoverStrategy;

#[derive(Parser)]
#[command(name = "quantbar", about = "Event-driven bar backtester")]
struct Cli {
    /// One or more bar files. Symbol is derived from the filename: split on
    /// '_', take the last field, strip the extension.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Starting equity.
    #[arg(long, default_value = "100000")]
    equity: Decimal,

    /// Base name for the equity curve CSV (written as `<base>-NN.csv`).
    /// If omitted, the equity curve is not written.
    #[arg(long)]
    eqvals_out: Option<String>,
}

fn symbol_from_path(path: &PathBuf) -> String {
    let filename = path.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_default();
    let last_field = filename.rsplit('_').next().unwrap_or(&filename);
    match last_field.find('.') {
        Some(idx) => last_field[..idx].to_string(),
        None => last_field.to_string(),
    }
}

/// Sniff the first line for a `Open,` header (the original's Yahoo-export
/// marker) to decide which parser applies to this file.
fn detect_parser(path: &PathBuf) -> Result<BarParser> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut first_line = String::new();
    reader.read_line(&mut first_line)?;
    if first_line.contains("Open,") {
        Ok(parse_daily_bar)
    } else {
        Ok(parse_intraday_bar)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut bt = BackTest::new(cli.equity, MaCrossoverStrategy);

    for path in &cli.inputs {
        let symbol = symbol_from_path(path);
        let parser = detect_parser(path)?;
        let has_header = parser == (parse_daily_bar as BarParser);

        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut reader = BufReader::new(file);
        if has_header {
            let mut discard = String::new();
            reader.read_line(&mut discard)?;
        }

        bt.add_input(symbol, Box::new(BufReadSource::new(reader)), parser);
    }

    bt.run().context("running backtest")?;

    println!(
        "{} open {} closed {} rewound",
        bt.poslist().open().len(),
        bt.poslist().closed().len(),
        bt.poslist().rewinded().len()
    );
    bt.poslist_mut().close_all(None);

    summary::print_summary(bt.poslist().closed(), bt.equity(), bt.max_equity(), bt.min_equity());

    if let Some(base) = cli.eqvals_out {
        let path = unique_path(&base, "csv");
        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        write_eqvals(file, bt.eqvals()).with_context(|| format!("writing {}", path.display()))?;
        println!("equity curve written to {}", path.display());
    }

    Ok(())
}
