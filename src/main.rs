use clap::Parser;
use monzo_receipts::args::{Args, Command, ReceiptSubcommand};
use monzo_receipts::{commands, Config, Mode, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // This allows for running the program without hitting the Monzo API. When
    // MONZO_RECEIPTS_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Test,
    // otherwise it will be Mode::Monzo.
    let mode = Mode::from_env();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.client_secret())
            .await?
            .print(),

        Command::Auth => commands::auth(&Config::load(home).await?, mode)
            .await?
            .print(),

        Command::Transactions => commands::transactions(&Config::load(home).await?, mode)
            .await?
            .print(),

        Command::Merchant(merchant_args) => {
            let config = Config::load(home).await?;
            commands::merchant(&config, mode, merchant_args)
                .await?
                .print()
        }

        Command::Receipt(receipt_args) => {
            let config = Config::load(home).await?;
            match receipt_args.action() {
                ReceiptSubcommand::Read(args) => commands::receipt_read(&config, mode, args)
                    .await?
                    .print(),
                ReceiptSubcommand::Add(args) => commands::receipt_add(&config, mode, args)
                    .await?
                    .print(),
                ReceiptSubcommand::Junk(args) => commands::receipt_junk(&config, mode, args)
                    .await?
                    .print(),
            }
        }

        Command::Demo => commands::demo(&Config::load(home).await?, mode)
            .await?
            .print(),
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only. The library and
            // the binary share the crate name.
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
