use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use beryl::ast::{Spanned, Target};
use beryl::bind::ArgBinder;
use beryl::diagnostic::{ansi::AnsiRenderer, json, registry, Diagnostic};
use beryl::expr::BasicExprCompiler;
use beryl::instr;
use beryl::machine::{Machine, Value};

/// Lower binding-target lists to stack-machine code.
#[derive(Parser)]
#[command(name = "beryl", version)]
struct Cli {
    /// JSON file holding an ordered list of binding targets
    input: Option<PathBuf>,

    /// Source file name recorded in emitted instructions and errors
    #[arg(long, default_value = "(anonymous)")]
    file: String,

    /// Treat the list as block parameters (a splat may re-bind a local)
    #[arg(long)]
    block: bool,

    /// Mark emitted stores as local-only
    #[arg(long)]
    local_only: bool,

    /// Run the lowered sequence against this JSON array of arguments
    /// and print the resulting bindings
    #[arg(long, value_name = "JSON")]
    bind: Option<String>,

    /// Keyword hash for --bind, as a JSON object
    #[arg(long, value_name = "JSON")]
    kwargs: Option<String>,

    /// Attach source text from this file for diagnostic snippets
    #[arg(long, value_name = "PATH")]
    source: Option<PathBuf>,

    /// Emit diagnostics as JSON
    #[arg(long)]
    json: bool,

    /// Disable ANSI colours in diagnostics
    #[arg(long)]
    no_color: bool,

    /// Print the long explanation for an error code and exit
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,

    /// List all error codes and exit
    #[arg(long)]
    list_errors: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.list_errors {
        for entry in registry::REGISTRY {
            println!("{}  {}", entry.code, entry.short);
        }
        return ExitCode::SUCCESS;
    }

    if let Some(code) = &cli.explain {
        return match registry::lookup(code) {
            Some(entry) => {
                print!("{}", entry.long);
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("unknown error code: {code}");
                ExitCode::FAILURE
            }
        };
    }

    let Some(input) = &cli.input else {
        eprintln!("usage: beryl <targets.json> [--bind JSON] [--kwargs JSON]");
        return ExitCode::FAILURE;
    };

    let source = match &cli.source {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                eprintln!("error reading {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    let targets = match read_targets(input) {
        Ok(targets) => targets,
        Err(message) => {
            emit(&cli, Diagnostic::error(message), source.as_deref());
            return ExitCode::FAILURE;
        }
    };

    let mut expr = BasicExprCompiler;
    let mut binder = ArgBinder::new(&mut expr, &cli.file, cli.local_only, cli.block);
    let instrs = match binder.compile(&targets) {
        Ok(instrs) => instrs,
        Err(e) => {
            emit(&cli, Diagnostic::from(&e), source.as_deref());
            return ExitCode::FAILURE;
        }
    };

    match &cli.bind {
        None => {
            print!("{}", instr::listing(&instrs));
            ExitCode::SUCCESS
        }
        Some(args_json) => {
            let (positional, keywords) = match read_arguments(args_json, cli.kwargs.as_deref()) {
                Ok(parsed) => parsed,
                Err(message) => {
                    emit(&cli, Diagnostic::error(message), source.as_deref());
                    return ExitCode::FAILURE;
                }
            };
            match Machine::bind(&instrs, positional, keywords) {
                Ok(machine) => {
                    print_bindings(&machine);
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    emit(&cli, Diagnostic::from(&e), source.as_deref());
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn read_targets(path: &PathBuf) -> Result<Vec<Spanned<Target>>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("error reading {}: {e}", path.display()))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid target list: {e}"))
}

fn read_arguments(
    args_json: &str,
    kwargs_json: Option<&str>,
) -> Result<(Vec<Value>, Option<Vec<(String, Value)>>), String> {
    let args: serde_json::Value =
        serde_json::from_str(args_json).map_err(|e| format!("invalid --bind value: {e}"))?;
    let serde_json::Value::Array(items) = args else {
        return Err("--bind expects a JSON array".to_string());
    };
    let positional = items.iter().map(Value::from_json).collect();

    let keywords = match kwargs_json {
        None => None,
        Some(text) => {
            let kwargs: serde_json::Value =
                serde_json::from_str(text).map_err(|e| format!("invalid --kwargs value: {e}"))?;
            let serde_json::Value::Object(entries) = kwargs else {
                return Err("--kwargs expects a JSON object".to_string());
            };
            Some(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            )
        }
    };

    Ok((positional, keywords))
}

fn print_bindings(machine: &Machine) {
    print_table(&machine.locals, "");
    print_table(&machine.ivars, "@");
    print_table(&machine.cvars, "@@");
    print_table(&machine.globals, "$");
    print_table(&machine.consts, "");
}

fn print_table(table: &HashMap<String, Value>, sigil: &str) {
    let mut names: Vec<&String> = table.keys().collect();
    names.sort();
    for name in names {
        println!("{sigil}{name} = {}", table[name.as_str()]);
    }
}

fn emit(cli: &Cli, mut diagnostic: Diagnostic, source: Option<&str>) {
    if let Some(source) = source {
        diagnostic = diagnostic.with_source(source);
    }
    if cli.json {
        eprintln!("{}", json::render(&diagnostic));
    } else {
        let renderer = AnsiRenderer { use_color: !cli.no_color };
        eprint!("{}", renderer.render(&diagnostic));
    }
}
