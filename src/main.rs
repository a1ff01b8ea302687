use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use column_source::{ColumnDataSource, DataError, DEFAULT_DELIMITER};

const USAGE: &str = "usage: column-source <input> [output] [delimiter]";

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next().map(PathBuf::from) else {
        bail!(USAGE);
    };
    let output = args.next().map(PathBuf::from);
    let delimiter = match args.next() {
        Some(arg) => single_char(&arg)?,
        None => DEFAULT_DELIMITER,
    };

    let mut source = ColumnDataSource::open(&input)
        .with_context(|| format!("opening {}", input.display()))?;
    let columns = source
        .load()
        .with_context(|| format!("loading {}", input.display()))?;
    println!("{columns}");

    // Sources without x/y, or with zero weights, can still be exported.
    match source.weighted_mean() {
        Ok(mean) => println!("weighted mean: {mean}"),
        Err(e @ (DataError::MissingColumn { .. } | DataError::DivisionByZero { .. })) => {
            log::warn!("{e}")
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(output) = output {
        source
            .write_csv(&output, delimiter)
            .with_context(|| format!("exporting to {}", output.display()))?;
        println!("wrote {}", output.display());
    }
    Ok(())
}

fn single_char(arg: &str) -> Result<char> {
    let mut chars = arg.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => bail!("delimiter must be a single character, got {arg:?}\n{USAGE}"),
    }
}
