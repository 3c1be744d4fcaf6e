//! wallet-session binary entry point.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use wallet_session::cli::{self, Args};
use wallet_session::sdk::loopback::{LoopbackRpcFactory, LoopbackSdkFactory};
use wallet_session::shell::{self, ShellCommand};
use wallet_session::{logging, Config, SessionController};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("Try 'wallet-session --help' for more information.");
            return ExitCode::from(2);
        }
    };

    if args.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if args.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(&args)?;
    logging::init_with_filter(config.log_filter()).ok();

    info!("wallet-session v{}", env!("CARGO_PKG_VERSION"));

    let controller = SessionController::new(
        config.to_session_config()?,
        Arc::new(LoopbackSdkFactory::new(config.loopback_settings())),
        Arc::new(LoopbackRpcFactory),
    );
    info!(network = %controller.config().network, "session controller ready");

    let mut updates = controller.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", shell::render(&controller.snapshot()));
    println!("{}", shell::help());

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                println!("{}", shell::render(&snapshot));
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let Some(command) = ShellCommand::parse(&line) else {
                    println!("unknown command: {}", line.trim());
                    println!("{}", shell::help());
                    continue;
                };
                match command.resolve(&controller.snapshot()) {
                    ShellCommand::Connect => {
                        controller.connect().await;
                    }
                    ShellCommand::Disconnect => {
                        controller.disconnect().await;
                    }
                    ShellCommand::UserInfo => {
                        controller.get_user_info().await;
                    }
                    ShellCommand::Status | ShellCommand::Toggle => {
                        println!("{}", shell::render(&controller.snapshot()));
                    }
                    ShellCommand::Help => println!("{}", shell::help()),
                    ShellCommand::Quit => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    controller.shutdown();
    info!("wallet-session stopped");
    Ok(())
}
