use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use shortcut_folders::commands;
use shortcut_folders::config::ConfigManager;
use shortcut_folders::filesystem::FileSystem;
use shortcut_folders::models::{AppRef, ApiResult};
use shortcut_folders::storage::FileStore;
use shortcut_folders::sync::{FileRemote, SyncService, UserSession};
use shortcut_folders::{init_logging, FolderStore};

#[derive(Parser)]
#[command(name = "shortcut-folders")]
#[command(about = "Organize app shortcuts into folders", long_about = None)]
#[command(version)]
struct Cli {
    /// Data directory (defaults to the platform data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every folder and its apps
    List,

    /// Create an empty folder
    Create { name: String },

    /// Delete a folder
    Delete { name: String },

    /// Rename a folder
    Rename { old_name: String, new_name: String },

    /// Save an app shortcut to a folder
    Add {
        folder: String,
        package_name: String,
        label: String,

        /// Base64 icon data
        #[arg(long, default_value = "")]
        icon: String,

        /// Create the folder if it does not exist
        #[arg(long)]
        create: bool,
    },

    /// Remove an app shortcut from a folder
    Remove { folder: String, package_name: String },

    /// Write every folder to a sync payload file
    Export { file: PathBuf },

    /// Merge folders from a sync payload file
    Import { file: PathBuf },

    /// Upload folders to the account
    Push {
        /// Account id (defaults to the configured one)
        #[arg(long)]
        user: Option<String>,

        #[arg(long, env = "SHORTCUT_FOLDERS_TOKEN")]
        token: String,
    },

    /// Download and merge folders from the account
    Pull {
        #[arg(long)]
        user: Option<String>,

        #[arg(long, env = "SHORTCUT_FOLDERS_TOKEN")]
        token: String,
    },
}

fn print_result(result: &ApiResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    if !result.success {
        bail!(result.error.clone().unwrap_or_else(|| "operation failed".to_string()));
    }
    Ok(())
}

fn resolve_session(config: &ConfigManager, user: Option<String>, token: String) -> Result<UserSession> {
    let user_id = user
        .or_else(|| config.remote_user_id())
        .context("No account configured; pass --user")?;
    Ok(UserSession::new(user_id, token))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let fs = match cli.data_dir {
        Some(dir) => FileSystem::new_with_base(&dir),
        None => FileSystem::new().map_err(anyhow::Error::msg)?,
    };
    fs.ensure_directories().map_err(anyhow::Error::msg)?;

    let config = ConfigManager::new(fs.config_file.clone())
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;
    init_logging(&config.get().log_level);

    let folders = FolderStore::new(FileStore::new(fs.store_file.clone()));

    let result = match cli.command {
        Commands::List => commands::list_folders(&folders).await,
        Commands::Create { name } => commands::create_folder(&folders, &name).await,
        Commands::Delete { name } => commands::delete_folder(&folders, &name).await,
        Commands::Rename { old_name, new_name } => {
            commands::rename_folder(&folders, &old_name, &new_name).await
        }
        Commands::Add {
            folder,
            package_name,
            label,
            icon,
            create,
        } => {
            let app = AppRef::new(package_name, label, icon);
            commands::save_app(&folders, &folder, app, create).await
        }
        Commands::Remove {
            folder,
            package_name,
        } => commands::remove_app(&folders, &folder, &package_name).await,
        Commands::Export { file } => {
            let payload = match commands::export_payload(&folders).await {
                Ok(payload) => payload,
                Err(result) => return print_result(&result),
            };
            std::fs::write(&file, payload)
                .with_context(|| format!("Failed to write: {}", file.display()))?;
            ApiResult::with_message(format!("Exported to {}", file.display()))
        }
        Commands::Import { file } => {
            let payload = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read: {}", file.display()))?;
            commands::import_payload(&folders, &payload).await
        }
        Commands::Push { user, token } => {
            let session = resolve_session(&config, user, token)?;
            let sync = SyncService::new(FileRemote::new(fs.remote_file.clone()), config.sync_timeout());
            let result = commands::sync_upload(&sync, &session, &folders).await;
            if result.success && config.remote_user_id().is_none() {
                config.set_remote_user_id(Some(session.user_id.clone()));
                config.save_sync().map_err(anyhow::Error::msg)?;
            }
            result
        }
        Commands::Pull { user, token } => {
            let session = resolve_session(&config, user, token)?;
            let sync = SyncService::new(FileRemote::new(fs.remote_file.clone()), config.sync_timeout());
            commands::sync_download(&sync, &session, &folders).await
        }
    };

    print_result(&result)
}
