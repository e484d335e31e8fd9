mod builtins;
mod config;
mod context;
mod directives;
mod error;
mod expr;
mod include;
mod lexer;
mod macros;
mod orchestrator;
mod scope;
mod value;
mod walker;
mod xmlio;
mod xmltree;
mod yaml;

use clap::Parser;
use context::Verbosity;
use orchestrator::ProcessOptions;
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

/// Macro and expression processor for XML robot description documents
#[derive(Parser, Debug)]
#[command(name = "xacro")]
#[command(about = "Expands xacro:* macros and ${...}/$(...)  expressions in an XML document")]
struct CliArgs {
    /// Input file, or `-` to read from stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// NAME:=VALUE substitution-argument mappings
    #[arg(value_name = "MAPPINGS")]
    mappings: Vec<String>,

    /// Write the expanded document here instead of stdout
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Accepted for compatibility; has no effect
    #[arg(long = "inorder")]
    inorder: bool,

    /// Print the set of included files and exit, without emitting the document
    #[arg(long = "just-deps")]
    just_deps: bool,

    /// Alias for --just-deps
    #[arg(long = "deps")]
    deps: bool,

    /// Diagnostic verbosity level
    #[arg(long = "verbosity", value_name = "N", default_value = "1")]
    verbosity: u8,

    /// Prepend an autogeneration banner comment to the output
    #[arg(long = "banner")]
    banner: bool,

    /// Leave $(...) extensions unevaluated, for post-processing by a launch system
    #[arg(long = "launch")]
    launch: bool,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let _ = args.inorder; // accepted, intentionally ignored

    match run(args) {
        Ok(()) => ExitCode::from(0),
        Err(message) => {
            eprintln!("xacro: {message}");
            ExitCode::from(2)
        }
    }
}

fn run(args: CliArgs) -> Result<(), String> {
    let (source, label) = read_input(&args.input)?;
    let mappings = parse_mappings(&args.mappings)?;

    let options = ProcessOptions {
        mappings,
        verbosity: Verbosity(args.verbosity),
        launch_mode: args.launch,
        banner: args.banner,
    };

    let output = orchestrator::process(&source, &label, options).map_err(|e| e.to_string())?;

    for diagnostic in &output.diagnostics {
        eprintln!("{diagnostic}");
    }

    if args.just_deps || args.deps {
        let joined = output
            .includes
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(" ");
        println!("{joined}");
        return Ok(());
    }

    match args.output {
        Some(path) => std::fs::write(&path, output.xml)
            .map_err(|e| format!("cannot write {}: {e}", path.display())),
        None => {
            print!("{}", output.xml);
            Ok(())
        }
    }
}

fn read_input(input: &str) -> Result<(String, String), String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("cannot read stdin: {e}"))?;
        Ok((buf, "<stdin>".to_string()))
    } else {
        let contents = std::fs::read_to_string(input).map_err(|e| format!("cannot read {input}: {e}"))?;
        Ok((contents, input.to_string()))
    }
}

fn parse_mappings(raw: &[String]) -> Result<HashMap<String, String>, String> {
    let mut mappings = HashMap::new();
    for entry in raw {
        match entry.split_once(":=") {
            Some((name, value)) => {
                mappings.insert(name.to_string(), value.to_string());
            }
            None => return Err(format!("malformed substitution argument `{entry}` (expected NAME:=VALUE)")),
        }
    }
    Ok(mappings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mappings_parse_name_value_pairs() {
        let parsed = parse_mappings(&["a:=1".to_string(), "b:=two".to_string()]).unwrap();
        assert_eq!(parsed.get("a").map(String::as_str), Some("1"));
        assert_eq!(parsed.get("b").map(String::as_str), Some("two"));
    }

    #[test]
    fn malformed_mapping_is_rejected() {
        assert!(parse_mappings(&["nocolon".to_string()]).is_err());
    }
}
