//! ReportFill administration tool.
//!
//! Issues, verifies and inspects activation codes, and manages user
//! accounts in a ReportFill SQLite database.
//!
//! Usage:
//!   reportfill issue --days 30 --user ACME --bind-machine
//!   reportfill verify CODE
//!   reportfill user --db reportfill.db list
//!
//! The signing secret is read from `--secret` or `REPORTFILL_LICENSE_SECRET`;
//! `inspect` and `fingerprint` do not need it. New account passwords are read
//! from `REPORTFILL_USER_PASSWORD`, or from the first line of stdin.
//! Log filtering follows `RUST_LOG` when it is set.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use reportfill_auth::{AuthConfig, AuthenticationService, SqliteCredentialStore, DEFAULT_ROLE};
use reportfill_license::{
    HostAttributes, LicenseConfig, LicenseService, SigningSecret, UntrustedClaims,
    DEFAULT_LICENSE_VERSION, SECRET_ENV, VERSION_ENV,
};
use serde_json::json;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variable holding the password for `user create`.
const PASSWORD_ENV: &str = "REPORTFILL_USER_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "reportfill")]
#[command(about = "ReportFill activation codes and user accounts")]
struct Args {
    /// Signing secret shared with the application
    #[arg(long, env = SECRET_ENV, hide_env_values = true, global = true)]
    secret: Option<String>,

    /// Activation code format version
    #[arg(long, env = VERSION_ENV, default_value = DEFAULT_LICENSE_VERSION, global = true)]
    license_version: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue a new activation code
    Issue {
        /// Days until the code expires
        #[arg(short, long, default_value = "365")]
        days: u32,

        /// Label of the customer the code is issued to
        #[arg(short, long, default_value = "")]
        user: String,

        /// Bind the code to this machine
        #[arg(long)]
        bind_machine: bool,
    },

    /// Verify an activation code
    Verify {
        code: String,

        /// Accept machine-bound codes issued for another machine
        #[arg(long)]
        skip_machine_check: bool,
    },

    /// Show the claims of a code without verifying it
    Inspect { code: String },

    /// Print this machine's id
    Fingerprint,

    /// Manage user accounts
    User {
        /// Path to the ReportFill database
        #[arg(long, default_value = "reportfill.db")]
        db: PathBuf,

        #[command(subcommand)]
        action: UserCommand,
    },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create an account (password from REPORTFILL_USER_PASSWORD or stdin)
    Create {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = DEFAULT_ROLE)]
        role: String,
    },

    /// List accounts, newest first
    List,

    /// Enable a disabled account or disable an enabled one
    Toggle { id: i64 },
}

fn main() -> ExitCode {
    let args = Args::parse();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    FmtSubscriber::builder()
        .with_env_filter(log_filter(args.verbose, rust_log.as_deref()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Builds the log filter: `RUST_LOG` directives if given, else INFO, or
/// DEBUG with `--verbose`.
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .parse_lossy(rust_log.unwrap_or_default())
}

fn run(args: Args) -> Result<ExitCode> {
    match &args.command {
        Command::Issue {
            days,
            user,
            bind_machine,
        } => {
            let service = license_service(&args)?;
            let code = service
                .issue(*days, user, *bind_machine)
                .context("failed to issue activation code")?;
            if args.json {
                print_json(&json!({ "code": code }))?;
            } else {
                println!("{code}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Verify {
            code,
            skip_machine_check,
        } => {
            let service = license_service(&args)?;
            match service.verify(code, !skip_machine_check) {
                Ok(license) => {
                    if args.json {
                        print_json(&json!({ "valid": true, "license": license }))?;
                    } else {
                        println!("valid");
                        println!("  subject:  {}", license.subject_label);
                        println!("  expires:  {}", license.expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
                        println!("  days:     {}", license.validity_days);
                        println!("  machine:  {}", license.machine_id.as_deref().unwrap_or("any"));
                    }
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    if args.json {
                        print_json(&json!({ "valid": false, "kind": e.kind(), "error": e.to_string() }))?;
                    } else {
                        println!("invalid: {e}");
                    }
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Inspect { code } => {
            let Some(claims) = UntrustedClaims::read(code) else {
                if args.json {
                    print_json(&json!({ "readable": false }))?;
                } else {
                    println!("unreadable code");
                }
                return Ok(ExitCode::FAILURE);
            };
            if args.json {
                print_json(&json!({ "readable": true, "claims": claims }))?;
            } else {
                let raw = claims.claims();
                println!("unverified claims");
                println!("  version:  {}", raw.version);
                println!("  subject:  {}", raw.subject_label);
                println!("  expires:  {}", claims.expires_at().format("%Y-%m-%d %H:%M:%S UTC"));
                println!("  days:     {}", raw.validity_days);
                println!("  bound:    {}", raw.machine_bound);
                println!("  machine:  {}", raw.machine_id.as_deref().unwrap_or("-"));
                println!("  nonce:    {}", raw.nonce);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Fingerprint => {
            let id = HostAttributes::collect().machine_id();
            if args.json {
                print_json(&json!({ "machine_id": id }))?;
            } else {
                println!("{id}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::User { db, action } => run_user(db, action, args.json),
    }
}

fn run_user(db: &Path, action: &UserCommand, json: bool) -> Result<ExitCode> {
    let store = SqliteCredentialStore::open(db)
        .with_context(|| format!("failed to open database {}", db.display()))?;
    let service = AuthenticationService::new(Arc::new(store), AuthConfig::default());

    match action {
        UserCommand::Create {
            username,
            email,
            role,
        } => {
            let password = read_password(std::env::var(PASSWORD_ENV).ok(), &mut std::io::stdin().lock())?;
            let account = service
                .register(username, &password, email, role)
                .context("failed to create user")?;
            if json {
                print_json(&account)?;
            } else {
                println!("created user {} (id {})", account.username, account.id);
            }
        }
        UserCommand::List => {
            let users = service.list_users().context("failed to list users")?;
            if json {
                print_json(&users)?;
            } else {
                for user in users {
                    let last_login = user
                        .last_login
                        .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
                    println!(
                        "{:>4}  {:<20} {:<30} {:<8} {:<8} {}",
                        user.id,
                        user.username,
                        user.email,
                        user.role,
                        if user.active { "active" } else { "disabled" },
                        last_login
                    );
                }
            }
        }
        UserCommand::Toggle { id } => {
            let active = service.toggle_active(*id).context("failed to toggle user")?;
            if json {
                print_json(&json!({ "id": id, "active": active }))?;
            } else {
                println!("user {id} is now {}", if active { "active" } else { "disabled" });
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn license_service(args: &Args) -> Result<LicenseService> {
    let Some(secret) = args.secret.as_deref() else {
        bail!("no signing secret; pass --secret or set {SECRET_ENV}");
    };
    let mut config = LicenseConfig::new(SigningSecret::new(secret).context("invalid signing secret")?);
    config.version.clone_from(&args.license_version);
    debug!(version = %config.version, "license service configured");
    Ok(LicenseService::new(config))
}

/// Returns the password from the environment, or else the first line of `input`.
fn read_password(from_env: Option<String>, input: &mut impl BufRead) -> Result<String> {
    if let Some(password) = from_env.filter(|p| !p.is_empty()) {
        return Ok(password);
    }
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("no password; set {PASSWORD_ENV} or pass it on stdin");
    }
    Ok(password.to_string())
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
