//! Administrative CLI over `coursekeep_core`.
//!
//! # Responsibility
//! - Drive record CRUD and data-management operations from a shell.
//! - Print every result as pretty JSON on stdout; errors go to stderr.

use clap::{Parser, Subcommand};
use coursekeep_core::{
    core_version, flush_logs, init_logging, new_entity_id, CoreConfig, DataService, Entity,
};
use serde_json::Value;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "coursekeep", version, about = "CourseKeep data store administration")]
struct Cli {
    /// Overrides COURSEKEEP_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Overrides COURSEKEEP_BACKUP_DIR.
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,
    /// Absolute directory for rotating log files; logging is off when unset.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every record of a collection.
    List { collection: String },
    /// Show one record.
    Get { collection: String, id: String },
    /// Create or overwrite a record from a JSON object.
    Put {
        collection: String,
        json: String,
        /// Record id; generated when omitted and absent from the JSON.
        #[arg(long)]
        id: Option<String>,
    },
    /// Merge a JSON object into an existing record.
    Update {
        collection: String,
        id: String,
        json: String,
    },
    /// Delete one record.
    Remove { collection: String, id: String },
    /// Write a compressed snapshot and rotate old ones.
    Backup,
    /// Replace collections from a backup or export file.
    Restore { filename: String },
    /// List backup and export files, newest first.
    Backups,
    /// Delete one backup or export file.
    DeleteBackup { filename: String },
    /// Write an uncompressed JSON export.
    Export,
    /// Apply an uncompressed JSON snapshot from any path.
    Import { path: PathBuf },
    /// Show storage modes and scheduler state.
    Status,
    /// Back up now, then keep backing up on the configured interval.
    Watch {
        /// Overrides COURSEKEEP_BACKUP_INTERVAL_MS.
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = run(cli);
    flush_logs();
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = CoreConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = cli.backup_dir {
        config.backup_dir = dir;
    }
    if let Some(log_dir) = cli.log_dir.as_deref() {
        init_logging(config.log_level, log_dir)?;
        log::info!("event=cli_start module=cli status=ok version={}", core_version());
    }

    if let Command::Watch {
        interval_ms: Some(millis),
    } = cli.command
    {
        if millis > 0 {
            config.backup_interval = Duration::from_millis(millis);
        }
    }

    let service = DataService::open(&config);
    let output = match cli.command {
        Command::List { collection } => serde_json::to_value(service.list(&collection)?)?,
        Command::Get { collection, id } => service.get(&collection, &id)?.into_value(),
        Command::Put {
            collection,
            json,
            id,
        } => {
            let entity = parse_entity(&json)?;
            let id = id
                .or_else(|| entity.id().map(str::to_string))
                .unwrap_or_else(|| new_entity_id(id_prefix(&collection)));
            service.put(&collection, &id, entity)?.into_value()
        }
        Command::Update {
            collection,
            id,
            json,
        } => service
            .update(&collection, &id, &parse_entity(&json)?)?
            .into_value(),
        Command::Remove { collection, id } => {
            service.remove(&collection, &id)?;
            serde_json::json!({ "removed": id })
        }
        Command::Backup => serde_json::to_value(service.create_backup()?)?,
        Command::Restore { filename } => serde_json::to_value(service.restore_backup(&filename)?)?,
        Command::Backups => serde_json::to_value(service.list_backups()?)?,
        Command::DeleteBackup { filename } => {
            service.delete_backup(&filename)?;
            serde_json::json!({ "deleted": filename })
        }
        Command::Export => serde_json::to_value(service.export_snapshot()?)?,
        Command::Import { path } => serde_json::to_value(service.import_snapshot(&path)?)?,
        Command::Status => serde_json::json!({
            "storage": service.storage_status(),
            "auto_backup": service.auto_backup_status(),
        }),
        Command::Watch { .. } => return watch(&service),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn watch(service: &DataService) -> Result<(), Box<dyn Error>> {
    let status = service.start_auto_backup_with_initial();
    println!("{}", serde_json::to_string_pretty(&status)?);
    if !status.running {
        return Err("auto backup is disabled for this deployment".into());
    }
    loop {
        thread::park();
    }
}

fn parse_entity(json: &str) -> Result<Entity, Box<dyn Error>> {
    let value: Value = serde_json::from_str(json)?;
    Entity::from_value(value).ok_or_else(|| "record must be a JSON object".into())
}

/// `courses` -> `course`, matching the id style of the web front end.
fn id_prefix(collection: &str) -> &str {
    collection.strip_suffix('s').unwrap_or(collection)
}
