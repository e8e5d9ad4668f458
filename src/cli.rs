use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "codebox", about = "Stateful sandboxed code interpreter and helpers", version)]
pub struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the executor loop on stdin/stdout (one JSON request per line).
    Serve,

    /// Start an executor and submit code to it, in order.
    ///
    /// With no -c/-f, code is read from piped stdin as one unit, or from an
    /// interactive prompt where a blank line submits the block.
    Run {
        /// Code to submit; repeat for several units of work.
        #[arg(short = 'c', long = "code", action = clap::ArgAction::Append)]
        code: Vec<String>,

        /// Script file to submit as one unit; repeatable.
        #[arg(short = 'f', long = "file", action = clap::ArgAction::Append)]
        file: Vec<PathBuf>,

        /// Seconds to wait for each reply (overrides RESPONSE_TIMEOUT).
        #[arg(long)]
        timeout: Option<u64>,

        /// Command that starts the executor (overrides EXECUTOR_COMMAND).
        #[arg(long = "executor")]
        executor: Option<String>,
    },

    /// Check database connectivity by reading one table.
    #[command(name = "db-check")]
    DbCheck {
        /// Table to read (overrides SUPABASE_TABLE).
        #[arg(long)]
        table: Option<String>,
    },

    /// Ask the LLM a question about a context document.
    Analyze {
        /// The question to ask.
        #[arg(value_name = "QUERY", default_value = "Can you summarize what this code does?")]
        query: String,

        /// File used as context; piped stdin is used when omitted.
        #[arg(long)]
        context: Option<PathBuf>,

        /// Model to use (overrides DEFAULT_MODEL).
        #[arg(long)]
        model: Option<String>,

        /// Stream the raw completion instead of rendering Markdown.
        #[arg(long = "no-md")]
        no_md: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_collects_repeated_code() {
        let cli = Cli::try_parse_from(["codebox", "run", "-c", "let x = 1;", "-c", "print(x)"]).unwrap();
        match cli.command {
            Command::Run { code, file, timeout, .. } => {
                assert_eq!(code, vec!["let x = 1;", "print(x)"]);
                assert!(file.is_empty());
                assert!(timeout.is_none());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn analyze_has_a_default_query() {
        let cli = Cli::try_parse_from(["codebox", "-v", "analyze"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Analyze { query, .. } => assert_eq!(query, "Can you summarize what this code does?"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn db_check_name_is_kebab_case() {
        let cli = Cli::try_parse_from(["codebox", "db-check", "--table", "orders"]).unwrap();
        assert!(matches!(cli.command, Command::DbCheck { table: Some(ref t) } if t == "orders"));
    }
}
