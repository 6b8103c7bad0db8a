use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result, bail};
use mython::interpreter;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mut input_path: Option<String> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                println!("Usage: mython [FILE]\n\nRuns the given Mython program, or reads one from stdin.");
                return Ok(());
            }
            _ => {
                input_path = Some(arg);
                if args.next().is_some() {
                    bail!("Only one input file is supported");
                }
                break;
            }
        }
    }

    let source = if let Some(path) = input_path {
        fs::read_to_string(&path).with_context(|| format!("Reading {path}"))?
    } else {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Reading stdin")?;
        buffer
    };

    let mut stdout = io::stdout().lock();
    interpreter::run_source(&source, &mut stdout)?;
    Ok(())
}
