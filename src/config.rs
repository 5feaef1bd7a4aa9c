//! Startup configuration.
//!
//! Parsed once from the command line (every flag also reads from the
//! environment, after `.env` is loaded) and passed down by value; nothing
//! mutates it afterwards.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::auth::AdminCredentials;

pub const DEFAULT_API_URL: &str = "https://cloudant.com/api";
pub const DEFAULT_MAX_CREATE_ATTEMPTS: u32 = 16;

#[derive(Parser, Debug, Clone)]
#[command(name = "db-keyserver")]
#[command(about = "Provisions per-user Cloudant databases and issues scoped API keys", long_about = None)]
pub struct Args {
    /// Administrator login of the Cloudant account
    #[arg(env = "KEYSERVER_LOGIN")]
    pub login: String,

    /// Administrator password of the Cloudant account
    #[arg(env = "KEYSERVER_PASSWORD", hide_env_values = true)]
    pub password: String,

    #[arg(long, env = "KEYSERVER_BIND", default_value = "0.0.0.0:5000")]
    pub bind: SocketAddr,

    /// Account origin; defaults to https://<login>.cloudant.com
    #[arg(long, env = "KEYSERVER_ACCOUNT_URL")]
    pub account_url: Option<String>,

    #[arg(long, env = "KEYSERVER_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Generated names tried per namespace request before giving up
    #[arg(
        long,
        env = "KEYSERVER_MAX_CREATE_ATTEMPTS",
        default_value_t = DEFAULT_MAX_CREATE_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_create_attempts: u32,

    /// Per-call timeout for outbound requests
    #[arg(
        long,
        env = "KEYSERVER_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    #[arg(long, env = "KEYSERVER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Also write daily-rotated log files here
    #[arg(long, env = "KEYSERVER_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub dir: Option<PathBuf>,
}

/// Where and how to reach the remote account
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub admin: AdminCredentials,
    pub account_url: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl RemoteConfig {
    /// Production origins for `admin`'s account
    pub fn for_account(admin: AdminCredentials) -> Self {
        let account_url = format!("https://{}.cloudant.com", admin.login());
        Self {
            admin,
            account_url,
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub remote: RemoteConfig,
    pub max_create_attempts: u32,
    pub log: LogConfig,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        let admin = AdminCredentials::new(args.login, args.password);
        let mut remote = RemoteConfig::for_account(admin);
        if let Some(account_url) = args.account_url {
            remote.account_url = account_url;
        }
        remote.account_url = trim_slash(remote.account_url);
        remote.api_url = trim_slash(args.api_url);
        remote.timeout = Duration::from_secs(args.timeout_secs);

        Self {
            bind: args.bind,
            remote,
            max_create_attempts: args.max_create_attempts,
            log: LogConfig {
                format: args.log_format,
                dir: args.log_dir,
            },
        }
    }
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
