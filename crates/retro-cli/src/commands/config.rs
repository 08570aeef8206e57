use clap::Subcommand;
use retro_core::config::RetroConfig;
use retro_db::SqliteCatalog;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Initialize ~/.retro/ with default config and the seeded catalog
    Init,
    /// Show current configuration
    Show,
}

pub fn run(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let home = RetroConfig::init()?;
            let db_path = RetroConfig::db_path()?;

            // Creates the schema and loads the seed on first open
            SqliteCatalog::open(&db_path)?;

            println!("Initialized retro at {}", home.display());
            println!("  config: {}", RetroConfig::config_path()?.display());
            println!("  catalog: {}", db_path.display());
            println!("  sessions: {}", RetroConfig::session_dir()?.display());
            Ok(())
        }
        ConfigAction::Show => {
            let config = RetroConfig::load()?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{toml_str}");
            Ok(())
        }
    }
}
