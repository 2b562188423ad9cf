use clap::{Args, Parser, Subcommand, ValueEnum};
use qrlink_qr::{Color, ErrorCorrection};
use qrlink_shortener::ExpirationUnit;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const STORE_DIR_ENV: &str = "QRLINK_STORE_DIR";
pub const BASE_URL_ENV: &str = "QRLINK_BASE_URL";
pub const LOG_FORMAT_ENV: &str = "QRLINK_LOG_FORMAT";

pub const DEFAULT_STORE_DIR: &str = ".qrlink";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormatArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormatArg::Text => write!(f, "text"),
            LogFormatArg::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl From<UnitArg> for ExpirationUnit {
    fn from(value: UnitArg) -> Self {
        match value {
            UnitArg::Minutes => ExpirationUnit::Minutes,
            UnitArg::Hours => ExpirationUnit::Hours,
            UnitArg::Days => ExpirationUnit::Days,
            UnitArg::Weeks => ExpirationUnit::Weeks,
            UnitArg::Months => ExpirationUnit::Months,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "qrlink", about = "Shorten links and render QR codes, locally")]
pub struct CLI {
    /// Directory holding the link registry.
    #[arg(long, global = true, env = STORE_DIR_ENV, default_value = DEFAULT_STORE_DIR)]
    pub store_dir: PathBuf,

    /// Origin that short codes are appended to when printing links.
    #[arg(long, global = true, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        global = true,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormatArg::Text
    )]
    pub log_format: LogFormatArg,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct ExpirationArgs {
    /// Expire the link after this many units; 0 or absent never expires.
    #[arg(long)]
    pub expire_in: Option<u64>,

    #[arg(long, value_enum, default_value_t = UnitArg::Days, requires = "expire_in")]
    pub unit: UnitArg,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a short link in the local registry.
    Shorten {
        url: String,
        /// Custom alias ([A-Za-z0-9_-], at most 20 characters).
        #[arg(long)]
        alias: Option<String>,
        #[command(flatten)]
        expiration: ExpirationArgs,
    },
    /// Build a self-encoded link that works without the registry.
    Encode {
        url: String,
        #[command(flatten)]
        expiration: ExpirationArgs,
    },
    /// Resolve a short code or self-encoded token.
    Resolve {
        code: String,
        /// Wait the redirect delay, then print the destination (Ctrl-C cancels).
        #[arg(long)]
        follow: bool,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List stored links, newest first.
    List,
    /// Delete a stored link.
    Remove { code: String },
    /// Render text or a URL as a PNG QR code.
    Qr {
        text: String,
        #[arg(short, long, default_value = "qrcode.png")]
        output: PathBuf,
        #[arg(long, default_value_t = qrlink_qr::render::DEFAULT_SIZE)]
        size: u32,
        #[arg(long, default_value_t = ErrorCorrection::M)]
        ec_level: ErrorCorrection,
        #[arg(long, default_value_t = Color::BLACK)]
        fg: Color,
        #[arg(long, default_value_t = Color::WHITE)]
        bg: Color,
        /// Image drawn in the center of the code.
        #[arg(long)]
        logo: Option<PathBuf>,
    },
}
