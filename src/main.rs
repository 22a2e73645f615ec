mod debug_report;

use std::fs;
use std::io::{self, IsTerminal, Read};
use std::sync::Arc;

use hunt::api::Options;
use hunt::grid::Grid;
use hunt::{Outcome, run_with};

fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    let pattern_source = match read_patterns(&config.pattern_files) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    let grid_text = match read_grid(&config.grid_file) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };
    let grid = Grid::from_lines(grid_text.lines());

    let options = Options {
        strict_alignment: config.strict_alignment,
        spatial_cell_size: config.cell_size,
        generator: config.generator.clone(),
        cancel_token: Some(Arc::new(|| false)),
        ..Options::default()
    };

    let result = run_with(&pattern_source, &grid, &options);
    debug_report::print_run(&result, config.color);

    // spec.md §6: exit code 3 is reserved for a cancelled run, distinct
    // from the general pipeline-fatal case (Snare / unrecovered stage
    // error) even though both surface as `Outcome::Fatal`.
    let cancelled = result.diagnostics.iter().any(|d| d.kind == hunt::DiagnosticKind::Cancelled);
    std::process::exit(match (result.outcome, cancelled) {
        (Outcome::Ok, _) | (Outcome::Degraded, _) => 0,
        (Outcome::Fatal, true) => 3,
        (Outcome::Fatal, false) => 1,
    });
}

struct CliConfig {
    pattern_files: Vec<String>,
    grid_file: Option<String>,
    cell_size: i64,
    generator: Option<String>,
    strict_alignment: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut pattern_files = Vec::new();
    let mut grid_file = None;
    let mut cell_size = 6i64;
    let mut generator = None;
    let mut strict_alignment = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1).peekable();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("hunt {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--strict-alignment" => strict_alignment = true,
            "--cell-size" => {
                let value = args.next().ok_or_else(|| "error: --cell-size expects a value".to_string())?;
                cell_size = value.parse().map_err(|_| format!("error: invalid --cell-size '{value}'"))?;
            }
            "--generator" => {
                let value = args.next().ok_or_else(|| "error: --generator expects a value".to_string())?;
                generator = Some(value);
            }
            "--grid" | "-g" => {
                let value = args.next().ok_or_else(|| "error: --grid expects a value".to_string())?;
                grid_file = Some(value);
            }
            _ if arg.starts_with('-') => return Err(format!("error: unknown option '{arg}'")),
            _ => pattern_files.push(arg),
        }
    }

    if pattern_files.is_empty() {
        return Err(format!("error: no .hunt pattern files given\n\n{}", help_text()));
    }

    Ok(CliConfig { pattern_files, grid_file, cell_size, generator, strict_alignment, color })
}

fn read_patterns(files: &[String]) -> Result<String, String> {
    let mut combined = String::new();
    for path in files {
        let text = fs::read_to_string(path).map_err(|err| format!("failed to read {path}: {err}"))?;
        combined.push_str(&text);
        combined.push('\n');
    }
    Ok(combined)
}

fn read_grid(path: &Option<String>) -> Result<String, String> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|err| format!("failed to read {path}: {err}")),
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(|err| format!("failed to read stdin: {err}"))?;
            Ok(buffer)
        }
    }
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "hunt {version}

CBHS pattern recognizer: matches HUNT patterns against an ASCII-art grid.

Usage:
  hunt [OPTIONS] <pattern.hunt>...

Options:
  -g, --grid <file>          Grid text file. Reads stdin if omitted.
  --generator <name>         Code-generation back-end to invoke (e.g. 'demo').
  --cell-size <n>            Spatial index cell size (default 6).
  --strict-alignment         Report bracket misalignment at error severity.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Exit codes:
  0  Success (ok or degraded).
  1  Pipeline-fatal (Snare or unrecovered stage error).
  2  Bad input (unparsable patterns, missing grid, bad arguments).
",
        version = env!("CARGO_PKG_VERSION")
    )
}
