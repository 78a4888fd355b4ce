mod commands;
mod helpers;

use clap::Parser;
use oracle_core::domain::OracleError;

const PROGRAM_NAME: &str = "mcnp-t4-oracle";

pub fn run_from_env() -> i32 {
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let oracle_error = error.as_oracle_error();
            eprintln!("{}", oracle_error.diagnostic_line());
            if let Some(summary_line) = oracle_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            oracle_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once(PROGRAM_NAME.to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();

    match Cli::try_parse_from(&full_args) {
        Ok(cli) => {
            helpers::init_tracing(cli.compare.verbose);
            commands::run_compare_command(cli.compare)
        }
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(
    name = "mcnp-t4-oracle",
    version,
    about = "Checks that a Tripoli-4 geometry matches its MCNP source \
             at the points of an MCNP particle trace"
)]
struct Cli {
    #[command(flatten)]
    compare: commands::CompareArgs,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_oracle_error(&self) -> OracleError {
        match self {
            Self::Usage(message) => {
                OracleError::input_validation("INPUT.CLI_USAGE", message.clone())
            }
            Self::Oracle(error) => error.clone(),
            Self::Internal(error) => OracleError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
