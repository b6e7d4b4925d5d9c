/*!
 * minion-keys CLI
 *
 * Connection settings are read from a TOML file (`--config`), then the
 * `SALTSTACK_*` environment variables, then command line flags; later
 * sources win. Passwords and tokens are only accepted from the file or the
 * environment.
 */

use clap::{Parser, Subcommand, ValueEnum};
use minion_keys::{
    config::{ClientSettings, ConnectionConfig, LogConfig, LogLevel},
    error::{Result, SaltError, EXIT_PARTIAL, EXIT_SUCCESS},
    logging, KeyPairManager, KeyPairResource, SaltClient, DEFAULT_KEY_SIZE,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "minion-keys")]
#[command(version, about = "Manage Salt minion key pairs through salt-api", long_about = None)]
struct Cli {
    /// Salt master hostname
    #[arg(long, global = true)]
    host: Option<String>,

    /// salt-api port (default: 8000)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Connection scheme, http or https (default: https)
    #[arg(long, global = true)]
    scheme: Option<String>,

    /// salt-api username
    #[arg(long, global = true)]
    username: Option<String>,

    /// External authentication backend: pam, file or sharedsecret (default: pam)
    #[arg(long, global = true)]
    eauth: Option<String>,

    /// Authenticate with SALTSTACK_TOKEN instead of username/password
    #[arg(long, global = true)]
    use_token: bool,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    ssl_skip_verify: bool,

    /// Debug mode: DEBUG logging and raw response tracing
    #[arg(long, global = true)]
    debug: bool,

    /// Path to a TOML settings file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevelArg,

    /// Path to log file (default: stderr)
    #[arg(long, value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and accept a key pair for a minion
    Create {
        minion_id: String,

        /// RSA key size; values below 2048 are rounded up by the master
        #[arg(long, default_value_t = DEFAULT_KEY_SIZE)]
        key_size: u32,
    },

    /// Show the accepted public key of a minion
    Read { minion_id: String },

    /// Delete a minion's key pair
    Delete { minion_id: String },

    /// Adopt an existing minion key pair by id
    Import { minion_id: String },

    /// Check that the configured credentials can log in
    Login,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

impl Cli {
    fn flag_settings(&self) -> ClientSettings {
        ClientSettings {
            host: self.host.clone(),
            port: self.port,
            scheme: self.scheme.clone(),
            username: self.username.clone(),
            eauth: self.eauth.clone(),
            use_token: self.use_token.then_some(true),
            ssl_skip_verify: self.ssl_skip_verify.then_some(true),
            debug: self.debug.then_some(true),
            ..Default::default()
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    let file_settings = match cli.config {
        Some(ref path) => ClientSettings::from_file(path)?,
        None => ClientSettings::default(),
    };
    let settings = file_settings
        .merge(ClientSettings::from_env()?)
        .merge(cli.flag_settings());

    logging::init_logging(&LogConfig {
        log_level: cli.log_level.into(),
        log_file: cli.log.clone(),
        debug: settings.debug.unwrap_or(false),
    })?;

    let client = Arc::new(SaltClient::new(ConnectionConfig::new(settings)?)?);
    let manager = KeyPairManager::new(client.clone());

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| SaltError::Config(format!("Failed to start async runtime: {}", e)))?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Create {
                minion_id,
                key_size,
            } => {
                let resource = manager.create(&minion_id, key_size).await?;
                print_resource(&resource)?;
                Ok(EXIT_SUCCESS)
            }
            Commands::Read { minion_id } => {
                let mut resource = KeyPairResource::existing(minion_id);
                match manager.read(&mut resource).await? {
                    minion_keys::ReadOutcome::Present => {
                        print_resource(&resource)?;
                        Ok(EXIT_SUCCESS)
                    }
                    minion_keys::ReadOutcome::Absent => {
                        eprintln!("No accepted key for minion {}", resource.minion_id);
                        Ok(EXIT_PARTIAL)
                    }
                }
            }
            Commands::Delete { minion_id } => {
                let mut resource = KeyPairResource::existing(minion_id);
                manager.delete(&mut resource).await?;
                eprintln!("Deleted key pair for minion {}", resource.minion_id);
                Ok(EXIT_SUCCESS)
            }
            Commands::Import { minion_id } => match manager.import(&minion_id).await? {
                Some(resource) => {
                    print_resource(&resource)?;
                    Ok(EXIT_SUCCESS)
                }
                None => {
                    eprintln!("Cannot import minion {}: no accepted key", minion_id);
                    Ok(EXIT_PARTIAL)
                }
            },
            Commands::Login => {
                client.login().await?;
                eprintln!("Logged in to {}", client.config().base_url());
                Ok(EXIT_SUCCESS)
            }
        }
    })
}

fn print_resource(resource: &KeyPairResource) -> Result<()> {
    let json = serde_json::to_string_pretty(resource).map_err(|e| SaltError::Io(e.into()))?;
    println!("{}", json);
    Ok(())
}
