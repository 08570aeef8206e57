pub mod auth;
pub mod collection;
pub mod config;
pub mod item;
pub mod profile;
pub mod scan;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Command {
    /// Log in with email and password
    Login(auth::LoginArgs),
    /// Create an account and log in
    Register(auth::RegisterArgs),
    /// End the current session
    Logout,
    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        action: profile::ProfileAction,
    },
    /// Manage your collections
    Collection {
        #[command(subcommand)]
        action: collection::CollectionAction,
    },
    /// Manage items
    Item {
        #[command(subcommand)]
        action: item::ItemAction,
    },
    /// Scan a barcode or a picture into a draft item
    Scan {
        #[command(subcommand)]
        action: scan::ScanAction,
    },
    /// Initialize and show RetroDigital configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
}

pub async fn run(cmd: Command) -> anyhow::Result<()> {
    match cmd {
        Command::Login(args) => auth::login(args).await,
        Command::Register(args) => auth::register(args).await,
        Command::Logout => auth::logout(),
        Command::Profile { action } => profile::run(action).await,
        Command::Collection { action } => collection::run(action).await,
        Command::Item { action } => item::run(action).await,
        Command::Scan { action } => scan::run(action).await,
        Command::Config { action } => config::run(action),
    }
}
