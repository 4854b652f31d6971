//! Entrypoint for CLI
use std::{
    env,
    error::Error,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use jackc::prelude::*;
use log::{error, info};

static USAGE: &str = r#"
usage: jackc CMD PATH

commands:
    vm      Compile source into stack machine instructions
    tree    Emit the parse tree as markup
    tokens  Emit the classified token stream as markup

PATH is a single .jack file, or a directory whose .jack files are
each compiled into a sibling output file.

examples:
    jackc vm Main.jack
    jackc vm src/
    jackc tree Main.jack
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Stack machine instructions
    Vm,
    /// Parse tree markup
    Tree,
    /// Token stream markup
    Tokens,
}

impl Mode {
    /// Output file sitting next to the given source file.
    fn output_path(&self, source_path: &Path) -> PathBuf {
        let stem = source_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = match self {
            Mode::Vm => format!("{}.vm", stem),
            Mode::Tree => format!("{}.xml", stem),
            Mode::Tokens => format!("{}T.xml", stem),
        };
        source_path.with_file_name(file_name)
    }
}

/// Collect the units the path names: either one source file, or every
/// source file directly inside a directory.
fn discover_units(path: &Path) -> io::Result<Vec<PathBuf>> {
    if path.is_dir() {
        let mut units = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().map(|ext| ext == "jack").unwrap_or(false) {
                units.push(path);
            }
        }
        units.sort();
        Ok(units)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

/// Compile one unit to one output file.
///
/// The destination is owned for the duration of the unit and released
/// on every exit path. A failed unit leaves no output behind.
fn compile_unit(mode: Mode, source_path: &Path) -> Result<(), JackError> {
    let source = fs::read_to_string(source_path)?;
    let out_path = mode.output_path(source_path);

    let result = write_output(mode, &source, &out_path);

    if let Err(err) = result {
        // Never leave partial output lying around looking complete.
        let _ = fs::remove_file(&out_path);

        match err.span().map(|span| span.line_column(&source)) {
            Some((line, column)) => error!(
                "{}:{}:{}: {}",
                source_path.display(),
                line,
                column,
                err
            ),
            None => error!("{}: {}", source_path.display(), err),
        }
        return Err(err);
    }

    info!("wrote {}", out_path.display());
    Ok(())
}

fn write_output(mode: Mode, source: &str, out_path: &Path) -> Result<(), JackError> {
    let file = fs::File::create(out_path)?;
    let writer = io::BufWriter::new(file);

    let mut writer = match mode {
        Mode::Vm => jackc::compile_to_vm(source, writer)?,
        Mode::Tree => jackc::compile_to_tree(source, writer)?,
        Mode::Tokens => jackc::write_tokens(source, writer)?,
    };

    writer.flush()?;
    Ok(())
}

/// Compile every discovered unit, reporting per-unit outcomes.
///
/// A failing unit aborts only itself; the batch keeps going.
fn run_batch(mode: Mode, path: &str) -> Result<(), Box<dyn Error>> {
    let units = discover_units(Path::new(path))?;
    if units.is_empty() {
        return Err(format!("no source files found in {}", path).into());
    }

    let mut failed = 0_usize;
    for unit in &units {
        if compile_unit(mode, unit).is_err() {
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} units failed", failed, units.len()).into());
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    match parse_args() {
        Some(Cmd { mode, path }) => run_batch(mode, &path)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    let mode = match args.next()?.as_str() {
        "vm" => Mode::Vm,
        "tree" => Mode::Tree,
        "tokens" => Mode::Tokens,
        _ => return None,
    };
    let path = args.next()?;
    Some(Cmd { mode, path })
}

fn print_usage() {
    println!("{USAGE}");
}

struct Cmd {
    mode: Mode,
    path: String,
}
