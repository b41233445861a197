use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use treelox as lox;

use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::session::{self, Repl};

#[derive(ClapParser, Debug)]
#[command(version, about = "Tree-walking Lox interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: Option<PathBuf> },

    /// Parses input from a file as a single expression and prints its AST
    Parse { filename: Option<PathBuf> },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive session with a persistent global environment
    Repl,
}

/// Reads the contents of a file into a Vec<u8>
fn read_file(filename: PathBuf) -> Result<Vec<u8>> {
    info!("Reading file: {:?}", filename);

    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Route records to file with module path (crate prefix stripped) and line
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("treelox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));

            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");

    Ok(())
}

/// Missing script path: distinct usage exit code.
fn usage_error(subcommand: &str) -> ! {
    eprintln!("Usage: treelox {} <script>", subcommand);

    std::process::exit(64);
}

/// Print every diagnostic and exit 70 for a runtime failure, 65 otherwise.
fn report_errors(errors: &[LoxError]) -> ! {
    for error in errors {
        eprintln!("{}", error);
    }

    let code = if errors.iter().any(LoxError::is_runtime) {
        70
    } else {
        65
    };

    debug!("Exiting with code {}", code);

    std::process::exit(code);
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match args.commands {
        Commands::Tokenize { filename } => {
            let Some(filename) = filename else {
                usage_error("tokenize");
            };

            let buf = read_file(filename)?;
            let (tokens, errors) = session::scan(&buf);

            for token in &tokens {
                println!("{}", token);
            }

            if !errors.is_empty() {
                report_errors(&errors);
            }

            info!("Tokenization completed successfully");
        }

        Commands::Parse { filename } => {
            let Some(filename) = filename else {
                usage_error("parse");
            };

            let buf = read_file(filename)?;
            let (tokens, errors) = session::scan(&buf);

            if !errors.is_empty() {
                report_errors(&errors);
            }

            let mut parser = Parser::new(&tokens);

            match parser.parse_expression() {
                Ok(expr) => {
                    let printed = AstPrinter.print(&expr);

                    debug!("AST: {}", printed);
                    println!("{}", printed);
                }

                Err(e) => report_errors(&[e]),
            }
        }

        Commands::Evaluate { filename } => {
            let Some(filename) = filename else {
                usage_error("evaluate");
            };

            let buf = read_file(filename)?;
            let (tokens, errors) = session::scan(&buf);

            if !errors.is_empty() {
                report_errors(&errors);
            }

            let mut parser = Parser::new(&tokens);

            match parser.parse_expression() {
                Ok(expr) => {
                    let mut interpreter = Interpreter::new(io::stdout());

                    match interpreter.evaluate(&expr) {
                        Ok(value) => println!("{}", value),
                        Err(e) => report_errors(&[e]),
                    }
                }

                Err(e) => report_errors(&[e]),
            }
        }

        Commands::Run { filename } => {
            let Some(filename) = filename else {
                usage_error("run");
            };

            let buf = read_file(filename)?;

            if let Err(errors) = session::run_source(&buf, io::stdout()) {
                report_errors(&errors);
            }

            info!("Program executed successfully");
        }

        Commands::Repl => {
            let mut repl = Repl::new(io::stdout());
            let stdin = io::stdin();

            loop {
                print!("> ");
                io::stdout().flush()?;

                let mut line = String::new();

                if stdin.read_line(&mut line)? == 0 {
                    break; // EOF ends the session
                }

                if line.trim().is_empty() {
                    continue;
                }

                // A failed line reports its diagnostics; the session's global
                // environment survives for the next line.
                if let Err(errors) = repl.run_line(line) {
                    for error in errors {
                        eprintln!("{}", error);
                    }
                }
            }

            info!("REPL session ended");
        }
    }

    Ok(())
}
