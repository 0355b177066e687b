//! These structs provide the CLI interface for the monzo-receipts CLI.

use crate::model::LineItem;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// monzo-receipts: attach receipts to the transactions of your Monzo account.
///
/// The program authenticates with Monzo through OAuth, selects your personal (non-joint) current
/// account, loads its transactions and reads or uploads receipts for them through the Monzo
/// transaction receipts API.
///
/// You will need an OAuth client from the Monzo developer portal with a redirect URL of
/// http://127.0.0.1:3030/callback. Every command other than init runs the OAuth flow, and Monzo
/// will also ask you to approve access in the app.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration files.
    ///
    /// Download or write a JSON file with the `client_id` and `client_secret` of your Monzo OAuth
    /// client and pass it as --client-secret. It is copied into $MONZO_RECEIPTS_HOME/.secrets.
    Init(InitArgs),
    /// Authenticate with Monzo and show the selected personal account.
    Auth,
    /// List the transactions of the personal account.
    Transactions,
    /// Show the merchant name of a transaction, or NONE.
    Merchant(MerchantArgs),
    /// Read or upload transaction receipts.
    Receipt(ReceiptArgs),
    /// Authenticate, list transactions, upload a junk receipt for the first transaction and read
    /// it back.
    Demo,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where configuration and secrets are held. Defaults to ~/monzo-receipts
    #[arg(long, env = "MONZO_RECEIPTS_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `monzo-receipts init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The path to the JSON file holding your OAuth client credentials.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(client_secret: impl Into<PathBuf>) -> Self {
        Self {
            client_secret: client_secret.into(),
        }
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// Args for the `monzo-receipts merchant` command.
#[derive(Debug, Parser, Clone)]
pub struct MerchantArgs {
    /// The id of the transaction, e.g. tx_00008zIcpb1TB4yeIFXMzx
    #[arg(long)]
    transaction_id: String,
}

impl MerchantArgs {
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }
}

/// Args for the `monzo-receipts receipt` command.
#[derive(Debug, Parser, Clone)]
pub struct ReceiptArgs {
    #[command(subcommand)]
    action: ReceiptSubcommand,
}

impl ReceiptArgs {
    pub fn new(action: ReceiptSubcommand) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &ReceiptSubcommand {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ReceiptSubcommand {
    /// Read the receipt stored under an external id.
    Read(ReadReceiptArgs),
    /// Upload a receipt for a transaction, replacing any earlier receipt for it.
    Add(AddReceiptArgs),
    /// Upload a receipt with a single placeholder item. For trying out the API only.
    Junk(JunkReceiptArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct ReadReceiptArgs {
    /// The external id the receipt was uploaded with.
    #[arg(long)]
    external_id: String,
}

impl ReadReceiptArgs {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
        }
    }

    pub fn external_id(&self) -> &str {
        &self.external_id
    }
}

#[derive(Debug, Parser, Clone)]
pub struct AddReceiptArgs {
    /// The id of the transaction the receipt belongs to.
    #[arg(long)]
    transaction_id: String,

    /// A priced item as DESCRIPTION:PRICE:QUANTITY with the price in minor units, e.g.
    /// "Flat white:325:1". Can be repeated.
    #[arg(long = "item")]
    items: Vec<LineItem>,

    /// An item that was part of the purchase but has no price of its own. Can be repeated.
    #[arg(long = "implied")]
    implied_items: Vec<String>,
}

impl AddReceiptArgs {
    pub fn new(
        transaction_id: impl Into<String>,
        items: Vec<LineItem>,
        implied_items: Vec<String>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            items,
            implied_items,
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn implied_items(&self) -> &[String] {
        &self.implied_items
    }
}

#[derive(Debug, Parser, Clone)]
pub struct JunkReceiptArgs {
    /// The id of the transaction the receipt belongs to.
    #[arg(long)]
    transaction_id: String,
}

impl JunkReceiptArgs {
    pub fn new(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("monzo-receipts"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or MONZO_RECEIPTS_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("monzo-receipts")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
