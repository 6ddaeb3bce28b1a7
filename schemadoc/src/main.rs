//! Database schema documentation tool.
//!
//! Connects to a MySQL-family or Postgres-family database, reads the tables
//! and columns of one schema from the catalog, and writes them to a Word
//! document as a data dictionary.
//!
//! # Security Guarantees
//! - Read-only catalog queries only
//! - Passwords never logged; URLs redacted in every message
//! - Passwords can be entered interactively instead of on the command line

use clap::{Args, Parser, Subcommand};
use schemadoc_core::{
    ExportConfig, PartialConfig, Result, SchemaDocError, export_schema, init_logging,
    models::Dialect, open_catalog,
};
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "schemadoc")]
#[command(about = "Export a database schema's tables and columns to a Word document")]
#[command(version)]
#[command(long_about = "
schemadoc - Database data dictionary generator

Reads table and column metadata from the database catalog and writes one
section per table to a .docx file: the table's display name, physical name
and purpose, followed by a grid of its columns (name, comment, type, ordinal
position, length, primary key).

SUPPORTED DATABASES:
- MySQL, MariaDB, Apache Doris (mysql://, jdbc:mysql://)
- PostgreSQL, Kingbase (postgres://, jdbc:kingbase8://)

CONFIGURATION PRECEDENCE:
  command-line flag > SCHEMADOC_* environment variable > positional argument
  > --config file > default

EXIT CODES:
  0 success, 1 configuration, 2 connection, 3 write, 4 catalog query

EXAMPLES:
  schemadoc jdbc:mysql://doris-fe:9030/dw reader secret dw dw.docx
  schemadoc --url mysql://doris-fe:9030/information_schema --user reader --ask-password --schema dw
  schemadoc --url jdbc:kingbase8://kb:54321/app --schema public --output app.docx
  schemadoc test --url postgres://localhost/app --schema public
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub export: ExportArgs,

    #[command(flatten)]
    pub positional: PositionalArgs,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Test the database connection and report whether the schema exists
    Test,
    /// List supported dialects and their URL schemes
    Dialects,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Database connection URL
    #[arg(
        long,
        global = true,
        env = "SCHEMADOC_URL",
        hide_env_values = true,
        help = "Database connection URL (credentials will be sanitized in logs)"
    )]
    pub url: Option<String>,

    /// Login user
    #[arg(long, global = true, env = "SCHEMADOC_USER")]
    pub user: Option<String>,

    /// Login password
    #[arg(
        long,
        global = true,
        env = "SCHEMADOC_PASSWORD",
        hide_env_values = true,
        conflicts_with = "ask_password"
    )]
    pub password: Option<String>,

    /// Prompt for the password on the terminal
    #[arg(long, global = true)]
    pub ask_password: bool,

    /// Schema to document
    #[arg(short, long, global = true, env = "SCHEMADOC_SCHEMA")]
    pub schema: Option<String>,

    /// Output file path
    #[arg(
        short,
        long,
        global = true,
        env = "SCHEMADOC_OUTPUT",
        help = "Output .docx path [default: output.docx]"
    )]
    pub output: Option<PathBuf>,

    /// Catalog dialect
    #[arg(
        long,
        global = true,
        env = "SCHEMADOC_DIALECT",
        help = "Catalog dialect: mysql or postgres [default: from URL scheme]"
    )]
    pub dialect: Option<Dialect>,

    /// Include views alongside base tables
    #[arg(long, global = true)]
    pub include_views: bool,

    /// Table comment delimiter
    #[arg(
        long,
        global = true,
        value_name = "DELIM",
        help = "Splits table comments into display name and purpose; empty disables [default: |]"
    )]
    pub comment_delimiter: Option<String>,

    /// Connect timeout
    #[arg(
        long,
        global = true,
        value_name = "SECS",
        help = "Seconds to wait for the connection [default: 30]"
    )]
    pub connect_timeout: Option<u64>,

    /// JSON config file
    #[arg(long, global = true, env = "SCHEMADOC_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Positional form `<URL> <USER> <PASSWORD> <SCHEMA> <OUTPUT>`, kept for
/// existing scripts. Any flag or environment variable wins over these.
#[derive(Args)]
pub struct PositionalArgs {
    /// Positional connection URL
    #[arg(id = "positional_url", value_name = "URL", help = "Connection URL (same as --url)")]
    pub url: Option<String>,

    /// Positional login user
    #[arg(id = "positional_user", value_name = "USER", help = "Login user (same as --user)")]
    pub user: Option<String>,

    /// Positional login password
    #[arg(
        id = "positional_password",
        value_name = "PASSWORD",
        help = "Login password (same as --password)"
    )]
    pub password: Option<String>,

    /// Positional schema
    #[arg(id = "positional_schema", value_name = "SCHEMA", help = "Schema (same as --schema)")]
    pub schema: Option<String>,

    /// Positional output path
    #[arg(
        id = "positional_output",
        value_name = "OUTPUT",
        help = "Output .docx path (same as --output)"
    )]
    pub output: Option<PathBuf>,
}

impl PositionalArgs {
    fn to_partial(&self) -> PartialConfig {
        PartialConfig {
            url: self.url.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            schema: self.schema.clone(),
            output: self.output.clone(),
            ..Default::default()
        }
    }
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

impl ExportArgs {
    /// The flag and environment layer. Unset flags stay `None` so lower
    /// layers can supply them.
    fn to_partial(&self) -> Result<PartialConfig> {
        let password = if self.ask_password {
            Some(read_password()?)
        } else {
            self.password.clone()
        };

        Ok(PartialConfig {
            url: self.url.clone(),
            user: self.user.clone(),
            password,
            schema: self.schema.clone(),
            output: self.output.clone(),
            dialect: self.dialect,
            include_views: self.include_views.then_some(true),
            comment_delimiter: self.comment_delimiter.clone(),
            connect_timeout_secs: self.connect_timeout,
        })
    }

}

impl Cli {
    /// Stacks flags and environment over positionals over the config file
    /// and resolves.
    fn resolve(&self) -> Result<ExportConfig> {
        let file_layer = match &self.export.config {
            Some(path) => {
                debug!("Loading config file {}", path.display());
                PartialConfig::from_file(path)?
            }
            None => PartialConfig::default(),
        };

        self.export
            .to_partial()?
            .layered_over(self.positional.to_partial())
            .layered_over(file_layer)
            .resolve()
    }
}

fn read_password() -> Result<String> {
    rpassword::prompt_password("Database password: ").map_err(|e| {
        SchemaDocError::configuration(format!("Failed to read password: {}", e))
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures.
            let code = u8::from(e.use_stderr());
            let _ = e.print();
            return std::process::ExitCode::from(code);
        }
    };

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("error: {}", e);
        return std::process::ExitCode::from(e.exit_code().code());
    }

    match run(&cli).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match cli.command {
        Some(Command::Dialects) => {
            list_dialects();
            Ok(())
        }
        Some(Command::Test) => test_connection(&cli.resolve()?, cli.global.quiet).await,
        None => export(&cli.resolve()?, cli.global.quiet).await,
    }
}

/// Prints the error and returns its exit code; the cause chain is logged.
fn report(err: &SchemaDocError) -> std::process::ExitCode {
    eprintln!("error: {}", err);

    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        debug!("caused by: {}", cause);
        source = cause.source();
    }

    std::process::ExitCode::from(err.exit_code().code())
}

/// Connect, read the schema, write the document, disconnect.
async fn export(config: &ExportConfig, quiet: bool) -> Result<()> {
    info!("Starting schema export...");
    info!("Target: {}", config.redacted_url());
    info!("Schema: {}", config.schema);
    info!("Output: {}", config.output.display());

    let mut reader = open_catalog(config).await?;
    let exported = async {
        let (document, summary) =
            export_schema(reader.as_mut(), &config.schema, config.comment_delimiter()).await?;
        document.save(&config.output)?;
        Ok::<_, SchemaDocError>(summary)
    }
    .await;

    if let Err(e) = reader.close().await {
        warn!("Failed to close connection cleanly: {}", e);
    }

    let summary = exported?;

    if !quiet {
        println!("Schema export completed successfully");
        println!("Output: {}", config.output.display());
        println!("Tables: {}", summary.tables);
        println!("Columns: {}", summary.columns);
    }
    Ok(())
}

/// Tests database connection without exporting.
async fn test_connection(config: &ExportConfig, quiet: bool) -> Result<()> {
    info!("Testing database connection...");

    let mut reader = open_catalog(config).await?;
    let dialect = reader.dialect();

    let checked = async {
        reader.test_connection().await?;
        reader.schema_exists(&config.schema).await
    }
    .await;

    if let Err(e) = reader.close().await {
        warn!("Failed to close connection cleanly: {}", e);
    }

    let schema_found = checked?;
    if !schema_found {
        warn!("Schema '{}' does not exist", config.schema);
    }

    if !quiet {
        println!("Connection to {} catalog successful", dialect);
        println!(
            "Schema '{}': {}",
            config.schema,
            if schema_found { "found" } else { "not found" }
        );
    }
    Ok(())
}

/// Lists supported dialects and their connection URL formats.
fn list_dialects() {
    println!("Supported Dialects:");
    println!();

    for dialect in Dialect::ALL {
        let compiled = match dialect {
            Dialect::MySql => cfg!(feature = "mysql"),
            Dialect::Postgres => cfg!(feature = "postgresql"),
        };
        let status = if compiled { "" } else { " (not compiled in)" };

        println!("{}{}:", dialect, status);
        println!("  Schemes:    {}", dialect.schemes().join(", "));
        match dialect {
            Dialect::MySql => {
                println!("  Example:    mysql://reader@doris-fe:9030/information_schema");
                println!("  Example:    jdbc:mysql://localhost:3306/app");
            }
            Dialect::Postgres => {
                println!("  Example:    postgres://reader@localhost:5432/app");
                println!("  Example:    jdbc:kingbase8://kb:54321/app");
            }
        }
        println!();
    }
}
