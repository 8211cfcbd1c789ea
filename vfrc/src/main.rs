use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use log::warn;
use pcdexpr::{EvalMode, Evaluated, PcdDatumType, SymbolTable, evaluate, evaluate_typed};
use vfrcore::{CompileOptions, VfrResult};

mod logger;

#[derive(Parser, Debug)]
#[command(version, about = "VFR form compiler utilities")]
struct Cli {
    /// Raise log verbosity, may be repeated
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a PCD value expression
    Eval {
        expression: String,

        /// Symbol definition, `NAME=VALUE`
        #[arg(short = 'D', long = "define", value_parser = parse_define, action = clap::ArgAction::Append)]
        defines: Vec<(String, String)>,

        /// Print the value instead of its truth
        #[arg(long)]
        literal: bool,

        /// Convert to a PCD datum type (BOOLEAN, UINT8..UINT64, VOID*)
        #[arg(long, value_parser = parse_datum_type, conflicts_with = "literal")]
        datum_type: Option<PcdDatumType>,
    },
    /// Check a compile options file and show the files it would produce
    Config { file: PathBuf },
}

fn parse_define(text: &str) -> Result<(String, String), String> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected NAME=VALUE, got `{text}`")),
    }
}

fn parse_datum_type(text: &str) -> Result<PcdDatumType, String> {
    text.to_ascii_uppercase()
        .parse()
        .map_err(|_| format!("unknown datum type `{text}`"))
}

fn eval(
    expression: &str,
    defines: Vec<(String, String)>,
    literal: bool,
    datum_type: Option<PcdDatumType>,
) -> VfrResult<String> {
    let symbols: SymbolTable = defines.into_iter().collect();
    let evaluation = match datum_type {
        Some(datum) => evaluate_typed(expression, datum, &symbols)?,
        None if literal => evaluate(expression, &symbols, EvalMode::Literal)?,
        None => evaluate(expression, &symbols, EvalMode::Condition)?,
    };
    for warning in &evaluation.warnings {
        warn!("{warning}");
    }
    Ok(match evaluation.value {
        Evaluated::Bool(value) => if value { "TRUE" } else { "FALSE" }.to_string(),
        Evaluated::Literal(text) => text,
    })
}

fn config(file: &Path) -> VfrResult<String> {
    let options = CompileOptions::load(file)?;
    let lines: Vec<String> = options
        .artifact_paths()
        .into_iter()
        .map(|(artifact, path)| format!("{:<12} {}", artifact.name(), path.display()))
        .collect();
    Ok(lines.join("\n"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let result = match cli.command {
        Command::Eval {
            expression,
            defines,
            literal,
            datum_type,
        } => eval(&expression, defines, literal, datum_type),
        Command::Config { file } => config(&file),
    };

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defines(entries: &[&str]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|entry| parse_define(entry).expect("valid define"))
            .collect()
    }

    #[test]
    fn defines_split_on_the_first_equal_sign() {
        assert_eq!(
            parse_define("A=B=C").unwrap(),
            ("A".to_string(), "B=C".to_string())
        );
        assert!(parse_define("=1").is_err());
        assert!(parse_define("NOVALUE").is_err());
    }

    #[test]
    fn eval_modes() {
        let symbols = defines(&["gSpace.PcdSize=0x10", "ARCH=X64"]);
        assert_eq!(
            eval("gSpace.PcdSize * 2", symbols.clone(), true, None).unwrap(),
            "32"
        );
        assert_eq!(
            eval("$(ARCH) in \"IA32 X64\"", symbols.clone(), false, None).unwrap(),
            "TRUE"
        );
        assert_eq!(
            eval("gSpace.PcdSize", symbols, false, Some(PcdDatumType::Uint16)).unwrap(),
            "0x10"
        );
        assert!(eval("1 / 0", Vec::new(), true, None).is_err());
    }

    #[test]
    fn datum_types_parse_case_insensitively() {
        assert_eq!(parse_datum_type("uint8").unwrap(), PcdDatumType::Uint8);
        assert_eq!(parse_datum_type("VOID*").unwrap(), PcdDatumType::Void);
        assert!(parse_datum_type("float").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
