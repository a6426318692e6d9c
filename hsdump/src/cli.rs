use std::{fmt, path::PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use crate::models::{QueryFilter, Status};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Help Scout application ID
    #[arg(long, env = "HELPSCOUT_APP_ID", global = true, hide_env_values = true)]
    pub app_id: Option<String>,

    /// Help Scout application secret
    #[arg(long, env = "HELPSCOUT_APP_SECRET", global = true, hide_env_values = true)]
    pub app_secret: Option<String>,

    /// Help Scout API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// OAuth2 token endpoint
    #[arg(long, global = true)]
    pub auth_url: Option<String>,

    /// Access token cache file
    #[arg(long, global = true, value_name = "FILE")]
    pub token_file: Option<PathBuf>,

    /// Give up after this many consecutive rate-limited responses, 0 retries forever
    #[arg(long, global = true, value_name = "COUNT")]
    pub max_retries: Option<u32>,

    /// Log verbosity
    #[arg(short, long, global = true, value_name = "LEVEL", default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Fetch and save conversations within the specified date range
    Fetch {
        #[command(flatten)]
        filter: FilterArgs,

        /// Directory to save conversation JSON files
        #[arg(long, value_name = "DIR", default_value = "conversations")]
        output_dir: PathBuf,
    },

    /// Fetch, save and summarize conversations to CSV in one step
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Parent directory of the timestamped export directories
        #[arg(long, value_name = "DIR", default_value = "exports")]
        exports_dir: PathBuf,
    },

    /// Build summary.csv from previously saved conversations
    Summarize {
        /// Directory holding conversation JSON files
        #[arg(value_name = "DIR", default_value = "conversations")]
        dir: PathBuf,
    },

    /// List all available tags
    ListTags,

    /// Print the current access token
    Token,
}

#[derive(clap::Args, Debug, Clone)]
pub struct FilterArgs {
    /// Conversations created on or after this date (YYYY-MM-DD)
    #[arg(long = "from", value_name = "DATE", value_parser = parse_date)]
    pub created_from: DateTime<Utc>,

    /// Conversations created before this date (YYYY-MM-DD)
    #[arg(long = "to", value_name = "DATE", value_parser = parse_date)]
    pub created_to: Option<DateTime<Utc>>,

    /// Filter by tag, can be repeated
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Conversation status
    #[arg(long, value_enum, ignore_case = true, default_value_t = Status::All)]
    pub status: Status,

    /// Download without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

impl FilterArgs {
    pub fn query_filter(&self) -> QueryFilter {
        let filter = QueryFilter::new(self.created_from)
            .with_tags(self.tags.clone())
            .with_status(self.status);

        match self.created_to {
            Some(created_to) => filter.with_created_to(created_to),
            None => filter,
        }
    }
}

/// Accepts a bare date, a naive date-time (taken as UTC) or RFC 3339.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(moment) = DateTime::parse_from_rfc3339(value) {
        return Ok(moment.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(moment) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(moment.and_utc());
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|moment| moment.and_utc())
        .ok_or_else(|| format!("invalid date '{}', expected YYYY-MM-DD", value))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&LevelFilter::from(*self).as_str().to_lowercase())
    }
}
