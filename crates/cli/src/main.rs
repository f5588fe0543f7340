//! ELOG command-line management tool.
//!
//! Provides subcommands for generating and checking configuration files,
//! validating and importing entry files, inspecting stored entries and
//! reader grants, issuing bearer tokens, and querying the directory.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use elog_core::config::AppConfig;
use elog_core::db::Database;
use elog_core::directory::Directory;
use elog_core::models::{EntryImportRequest, LogEntryView};
use elog_core::token::{IdentityClaims, TokenIssuer};
use elog_core::{import_entry, validate_request, LogMapper};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// ELOG command-line management tool.
#[derive(Parser, Debug)]
#[command(
    name = "elog",
    version,
    about = "Import, inspect and look up electronic logbook data"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "/etc/elog/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./elog.toml")]
        output: PathBuf,
    },

    /// Validate the configuration file.
    CheckConfig,

    /// Validate an entry import request file without storing it.
    Validate {
        /// JSON file holding an import request.
        file: PathBuf,
    },

    /// Import an entry from a JSON request file.
    Import {
        /// JSON file holding an import request.
        file: PathBuf,
    },

    /// Show a stored entry.
    Show {
        /// Entry ID.
        id: String,
    },

    /// List recent entries.
    List {
        /// Only entries filed in this logbook.
        #[arg(long)]
        logbook: Option<String>,

        /// Maximum number of entries to show.
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// List users holding a read grant on a logbook.
    Readers {
        /// Logbook name.
        logbook: String,
    },

    /// Issue a bearer token for an email address.
    IssueToken {
        #[arg(long)]
        email: String,

        /// Display name to embed in the token.
        #[arg(long)]
        name: Option<String>,
    },

    /// Search people by name prefix.
    People {
        prefix: String,
    },

    /// Search groups by name prefix.
    Groups {
        prefix: String,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    // Minimal logging for CLI
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => cmd_init(&output),
        Commands::CheckConfig => cmd_check_config(&cli.config),
        Commands::Validate { file } => cmd_validate(&file),
        command => {
            let config = load_config(&cli.config)?;
            match command {
                Commands::Import { file } => cmd_import(&open_database(&config)?, &file),
                Commands::Show { id } => cmd_show(&open_database(&config)?, &id),
                Commands::List { logbook, limit } => {
                    cmd_list(&open_database(&config)?, logbook.as_deref(), limit)
                }
                Commands::Readers { logbook } => cmd_readers(&open_database(&config)?, &logbook),
                Commands::IssueToken { email, name } => cmd_issue_token(&config, email, name),
                Commands::People { prefix } => cmd_people(&config, &prefix),
                Commands::Groups { prefix } => cmd_groups(&config, &prefix),
                Commands::Init { .. } | Commands::CheckConfig | Commands::Validate { .. } => {
                    unreachable!("handled above")
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &Path) -> Result<AppConfig> {
    AppConfig::load_and_resolve(path).context("failed to load configuration")
}

fn open_database(config: &AppConfig) -> Result<Database> {
    let db_path = config.server.database_path();
    let db = Database::new(&db_path).context("failed to open database")?;
    db.initialize().context("failed to initialize database")?;
    Ok(db)
}

fn read_request(file: &Path) -> Result<EntryImportRequest> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a valid import request", file.display()))
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# ELOG Configuration

[server]
listen = "127.0.0.1:8080"
log_level = "info"
data_dir = "/var/lib/elog"

[auth]
jwt_key_env = "ELOG_JWT_KEY"
token_ttl_secs = 3600

[directory]
# url = "ldap://ldap.example.com:389"
# base_dn = "dc=example,dc=com"
# bind_dn = "cn=reader,dc=example,dc=com"
# bind_password_env = "ELOG_LDAP_PASSWORD"
people_ou = "ou=people"
groups_ou = "ou=groups"
# static_file = "/etc/elog/directory.toml"

[cleanup]
enabled = false
interval_secs = 3600
unused_after_mins = 60
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file with your directory details");
    println!("  2. Set the referenced environment variables (ELOG_JWT_KEY, etc.)");
    println!("  3. Check with: elog check-config --config {}", output.display());
    println!("  4. Start the daemon: elog-daemon --config {}", output.display());

    Ok(())
}

fn cmd_check_config(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {}", config_path.display());
    println!();

    let mut config =
        AppConfig::load_from_file(config_path).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => println!("  [OK] All required fields are valid"),
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Web listen    : {}", config.server.listen);
    println!("  Data directory: {}", config.server.data_dir.display());
    println!(
        "  JWT key       : {}",
        if config.auth.jwt_key.is_some() { "set" } else { "NOT SET" }
    );
    println!("  Token lifetime: {}s", config.auth.token_ttl_secs);
    println!(
        "  Directory     : {}",
        config.directory.url.as_deref().unwrap_or("not configured")
    );
    println!(
        "  Cleanup       : {}",
        if config.cleanup.enabled { "enabled" } else { "disabled" }
    );
    println!();
    println!("Configuration is valid.");

    Ok(())
}

fn cmd_validate(file: &Path) -> Result<()> {
    let request = read_request(file)?;
    let command = validate_request(request).context("import request is invalid")?;

    println!("Import request is valid.");
    println!("  Title    : {}", command.entry.title);
    println!("  Logbooks : {}", command.entry.logbooks.join(", "));
    println!(
        "  Readers  : {}",
        if command.reader_user_ids.is_empty() {
            "none".to_string()
        } else {
            command
                .reader_user_ids
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        }
    );
    Ok(())
}

fn cmd_import(db: &Database, file: &Path) -> Result<()> {
    let request = read_request(file)?;
    let record = import_entry(db, request).context("import failed")?;

    println!("Imported entry {}", record.id);
    print_view(&LogMapper::to_view(&record));
    Ok(())
}

fn cmd_show(db: &Database, id: &str) -> Result<()> {
    let record = db
        .get_log(id)
        .context("database error")?
        .ok_or_else(|| anyhow::anyhow!("entry '{}' not found", id))?;

    print_view(&LogMapper::to_view(&record));
    Ok(())
}

fn cmd_list(db: &Database, logbook: Option<&str>, limit: u32) -> Result<()> {
    let records = match logbook {
        Some(logbook) => db.list_logs_in_logbook(logbook, limit),
        None => db.list_logs(limit),
    }
    .context("failed to list entries")?;

    if records.is_empty() {
        println!("No entries found.");
        return Ok(());
    }

    println!("{:<38} {:<22} {:<24} TITLE", "ID", "LOGGED AT", "AUTHOR");
    println!("{}", "-".repeat(100));

    for view in LogMapper::to_views(&records) {
        println!(
            "{:<38} {:<22} {:<24} {}",
            view.id,
            view.logged_at.format("%Y-%m-%d %H:%M:%S"),
            truncate(&view.author, 22),
            truncate(&view.title, 40),
        );
    }

    println!();
    println!("{} entries shown", records.len());
    Ok(())
}

fn cmd_readers(db: &Database, logbook: &str) -> Result<()> {
    let readers = db.readers_of(logbook).context("failed to list readers")?;
    if readers.is_empty() {
        println!("No readers granted on '{}'.", logbook);
        return Ok(());
    }
    for reader in &readers {
        println!("{}", reader);
    }
    Ok(())
}

fn cmd_issue_token(config: &AppConfig, email: String, name: Option<String>) -> Result<()> {
    let issuer = TokenIssuer::from_config(&config.auth)
        .with_context(|| format!("set {} to issue tokens", config.auth.jwt_key_env))?;
    let token = issuer
        .issue(&IdentityClaims { email, name })
        .context("failed to sign token")?;
    println!("{}", token);
    Ok(())
}

fn cmd_people(config: &AppConfig, prefix: &str) -> Result<()> {
    let directory =
        Directory::from_config(&config.directory).context("failed to set up directory")?;
    let people = directory
        .people
        .find_by_name_prefix(prefix)
        .context("person lookup failed")?;

    if people.is_empty() {
        println!("No people found.");
        return Ok(());
    }

    println!("{:<16} {:<30} MAIL", "UID", "NAME");
    println!("{}", "-".repeat(80));
    for person in &people {
        println!(
            "{:<16} {:<30} {}",
            person.uid,
            truncate(&person.common_name, 28),
            person.mail.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn cmd_groups(config: &AppConfig, prefix: &str) -> Result<()> {
    let directory =
        Directory::from_config(&config.directory).context("failed to set up directory")?;
    let groups = directory
        .groups
        .find_by_name_prefix(prefix)
        .context("group lookup failed")?;

    if groups.is_empty() {
        println!("No groups found.");
        return Ok(());
    }

    for group in &groups {
        println!("{} ({} members)", group.common_name, group.members.len());
        for member in &group.members {
            println!("  {}", member);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Utilities
// ---------------------------------------------------------------------------

fn print_view(view: &LogEntryView) {
    match serde_json::to_string_pretty(view) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to render entry: {}", e),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
