use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    sync::LazyLock,
};

use chrono::{DateTime, NaiveDateTime};
use log::{debug, info};
use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{ConversationDigest, Thread};

pub const SUMMARY_FILE_NAME: &str = "summary.csv";

pub const COLUMNS: [&str; 8] = [
    "conversation_id",
    "subject",
    "shop_name",
    "email",
    "tags",
    "created_at",
    "closed_at",
    "conversation_text",
];

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|</?[A-Za-z][^>]*>|<![^>]*>").expect("valid markup pattern"));

/// One CSV line per conversation, fields in `COLUMNS` order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub conversation_id: Option<u64>,
    pub subject: String,
    pub shop_name: String,
    pub email: String,
    pub tags: String,
    pub created_at: String,
    pub closed_at: String,
    pub conversation_text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryOutput {
    pub path: PathBuf,
    pub rows: usize,
}

impl From<ConversationDigest> for SummaryRow {
    fn from(digest: ConversationDigest) -> Self {
        let (shop_name, email) = match digest.primary_customer {
            Some(customer) => (customer.first, customer.email),
            None => (None, None),
        };

        let tags = digest
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|tag| tag.tag.unwrap_or_default())
            .collect::<Vec<_>>()
            .join(", ");

        let threads = digest
            .embedded
            .and_then(|embedded| embedded.threads)
            .unwrap_or_default();

        Self {
            conversation_id: digest.id,
            subject: digest.subject.unwrap_or_else(|| "No Subject".to_string()),
            shop_name: shop_name.unwrap_or_else(|| "Unknown Shop".to_string()),
            email: email.unwrap_or_else(|| "No Email".to_string()),
            tags,
            created_at: digest.created_at.unwrap_or_default(),
            closed_at: digest.closed_at.unwrap_or_default(),
            conversation_text: conversation_text(&threads),
        }
    }
}

/// Visible text of an HTML fragment with whitespace runs collapsed.
pub fn html_to_text(html: &str) -> String {
    let stripped = MARKUP.replace_all(html, "");
    let decoded = html_escape::decode_html_entities(&stripped);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn conversation_text(threads: &[Thread]) -> String {
    threads
        .iter()
        .filter(|thread| thread.is_conversational())
        .map(|thread| {
            let sender = if thread.is_from_customer() {
                "Customer"
            } else {
                "Support"
            };
            format!(
                "[{}] {}: {}",
                message_date(thread.created_at.as_deref()),
                sender,
                html_to_text(thread.body.as_deref().unwrap_or_default())
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn message_date(created_at: Option<&str>) -> String {
    let created_at = match created_at {
        Some(value) if !value.is_empty() => value,
        _ => return "Unknown date".to_string(),
    };

    if let Ok(moment) = DateTime::parse_from_rfc3339(created_at) {
        return moment.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(moment) = NaiveDateTime::parse_from_str(created_at, "%Y-%m-%dT%H:%M:%S%.f") {
        return moment.format("%Y-%m-%d %H:%M").to_string();
    }

    created_at.to_string()
}

/// Orders rows by their ISO-8601 creation time; rows without one come first.
pub fn sort_rows(rows: &mut [SummaryRow]) {
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
}

pub fn read_rows(dir: &Path) -> Result<Vec<SummaryRow>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut rows = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let digest: ConversationDigest =
            serde_json::from_str(&content).map_err(|source| Error::Decode {
                path: path.clone(),
                source,
            })?;
        debug!("summarized {}", path.display());
        rows.push(SummaryRow::from(digest));
    }

    Ok(rows)
}

pub fn write_csv(path: &Path, rows: &[SummaryRow]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

/// Reads every saved conversation in `dir` and writes `dir/summary.csv`.
pub fn build(dir: &Path) -> Result<SummaryOutput> {
    let mut rows = read_rows(dir)?;
    sort_rows(&mut rows);

    let path = dir.join(SUMMARY_FILE_NAME);
    write_csv(&path, &rows)?;
    info!("wrote {} rows to {}", rows.len(), path.display());

    Ok(SummaryOutput {
        path,
        rows: rows.len(),
    })
}
