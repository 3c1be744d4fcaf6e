//! Command-line interface for wallet-session.
//!
//! Uses lexopt for minimal binary size overhead.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::sdk::Network;

/// Command-line arguments.
#[derive(Debug, Clone, Default)]
pub struct Args {
    /// Path to configuration file.
    pub config: Option<PathBuf>,
    /// SDK client id (overrides config file).
    pub client_id: Option<String>,
    /// SDK client secret (overrides config file).
    pub client_secret: Option<String>,
    /// Authentication network.
    pub network: Option<Network>,
    /// Recovery poll interval in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Recovery poll attempt cap.
    pub max_attempts: Option<u32>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Show version and exit.
    pub version: bool,
    /// Show help and exit.
    pub help: bool,
}

/// Parse command-line arguments.
pub fn parse_args() -> Result<Args, ArgsError> {
    parse_args_from(std::env::args_os())
}

/// Parse arguments from an iterator (for testing).
pub fn parse_args_from<I>(args: I) -> Result<Args, ArgsError>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = Args::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => {
                result.help = true;
            }
            Short('V') | Long("version") => {
                result.version = true;
            }
            Short('c') | Long("config") => {
                result.config = Some(parser.value()?.parse()?);
            }
            Short('i') | Long("client-id") => {
                result.client_id = Some(parser.value()?.parse()?);
            }
            Short('s') | Long("client-secret") => {
                result.client_secret = Some(parser.value()?.parse()?);
            }
            Short('n') | Long("network") => {
                let value: String = parser.value()?.parse()?;
                result.network = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("network", value))?,
                );
            }
            Long("poll-interval") => {
                let value: String = parser.value()?.parse()?;
                let ms: u64 = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidValue("poll-interval", value.clone()))?;
                if ms == 0 {
                    return Err(ArgsError::InvalidValue("poll-interval", value));
                }
                result.poll_interval_ms = Some(ms);
            }
            Long("max-attempts") => {
                let value: String = parser.value()?.parse()?;
                result.max_attempts = Some(
                    value
                        .parse()
                        .map_err(|_| ArgsError::InvalidValue("max-attempts", value))?,
                );
            }
            Short('l') | Long("log-level") => {
                result.log_level = Some(parser.value()?.parse()?);
            }
            Value(val) => {
                return Err(ArgsError::UnexpectedArgument(val.to_string_lossy().into()));
            }
            _ => return Err(arg.unexpected().into()),
        }
    }

    Ok(result)
}

/// Print help message.
pub fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        r#"wallet-session {version}
Social-login wallet session console

USAGE:
    wallet-session [OPTIONS]

OPTIONS:
    -c, --config <FILE>          Path to configuration file (JSON)
    -i, --client-id <ID>         SDK client id
    -s, --client-secret <SECRET> SDK client secret
    -n, --network <NET>          Auth network [default: sapphire_mainnet]
        --poll-interval <MS>     Address recovery poll interval [default: 1000]
        --max-attempts <N>       Give up address recovery after N retries
    -l, --log-level <LVL>        Log level (error, warn, info, debug, trace)
    -h, --help                   Print help
    -V, --version                Print version

ENVIRONMENT VARIABLES:
    WALLET_SESSION_CLIENT_ID      Client id (overrides config)
    WALLET_SESSION_CLIENT_SECRET  Client secret (overrides config)
    WALLET_SESSION_NETWORK        Auth network (overrides config)
    WALLET_SESSION_LOG_LEVEL      Log level (overrides config)
    RUST_LOG                      Alternative log level setting

COMMANDS (at the prompt):
    connect | disconnect | toggle | info | status | help | quit

EXAMPLES:
    # Start against the default network
    wallet-session -i my-client-id -s my-secret

    # Start with config file
    wallet-session -c ./wallet-session.json
"#
    );
}

/// Print version.
pub fn print_version() {
    println!("wallet-session {}", env!("CARGO_PKG_VERSION"));
}

/// Argument parsing errors.
#[derive(Debug)]
pub enum ArgsError {
    /// Lexopt parsing error.
    Lexopt(lexopt::Error),
    /// Invalid argument value.
    InvalidValue(&'static str, String),
    /// Unexpected positional argument.
    UnexpectedArgument(String),
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexopt(e) => write!(f, "{}", e),
            Self::InvalidValue(name, value) => {
                write!(f, "invalid value for --{}: '{}'", name, value)
            }
            Self::UnexpectedArgument(arg) => {
                write!(f, "unexpected argument: '{}'", arg)
            }
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<lexopt::Error> for ArgsError {
    fn from(e: lexopt::Error) -> Self {
        Self::Lexopt(e)
    }
}
