pub mod helpscout;

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use helpscout::*;

/// Help Scout does not report a lifetime for client-credentials tokens, so
/// cached tokens are trusted for this many days.
pub const TOKEN_LIFETIME_DAYS: i64 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn issued(access_token: String, issued_at: DateTime<Utc>) -> Self {
        Self {
            access_token,
            expires_at: issued_at + Duration::days(TOKEN_LIFETIME_DAYS),
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Status {
    #[default]
    All,
    Active,
    Closed,
    Open,
    Pending,
    Spam,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::All => write!(f, "all"),
            Status::Active => write!(f, "active"),
            Status::Closed => write!(f, "closed"),
            Status::Open => write!(f, "open"),
            Status::Pending => write!(f, "pending"),
            Status::Spam => write!(f, "spam"),
        }
    }
}

/// Conversation search filter. Bounds are kept in UTC and only their date
/// part reaches the API.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub created_from: DateTime<Utc>,
    pub created_to: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub status: Status,
}

impl QueryFilter {
    pub fn new<Tz: TimeZone>(created_from: DateTime<Tz>) -> Self {
        Self {
            created_from: created_from.with_timezone(&Utc),
            created_to: None,
            tags: Vec::new(),
            status: Status::All,
        }
    }

    pub fn with_created_to<Tz: TimeZone>(mut self, created_to: DateTime<Tz>) -> Self {
        self.created_to = Some(created_to.with_timezone(&Utc));
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn search_query(&self) -> String {
        let to = self
            .created_to
            .as_ref()
            .map(utc_midnight)
            .unwrap_or_else(|| "*".to_string());
        format!("(createdAt:[{} TO {}])", utc_midnight(&self.created_from), to)
    }

    pub fn query_params(&self, page: u32) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("status", self.status.to_string()),
            ("embed", "threads".to_string()),
            ("page", page.to_string()),
            ("query", self.search_query()),
        ];
        if !self.tags.is_empty() {
            params.push(("tag", self.tags.join(",")));
        }
        params
    }
}

fn utc_midnight(moment: &DateTime<Utc>) -> String {
    moment.format("%Y-%m-%dT00:00:00Z").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_search_query_open_ended() {
        let from = Utc.with_ymd_and_hms(2024, 3, 5, 17, 45, 12).unwrap();
        let filter = QueryFilter::new(from);

        assert_eq!(
            filter.search_query(),
            "(createdAt:[2024-03-05T00:00:00Z TO *])"
        );
    }

    #[test]
    fn test_search_query_normalizes_other_timezones_to_utc_midnight() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let from = tokyo.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let to = tokyo.with_ymd_and_hms(2024, 2, 1, 10, 30, 0).unwrap();

        let filter = QueryFilter::new(from).with_created_to(to);

        // 08:00 in Tokyo is still the previous day in UTC
        assert_eq!(
            filter.search_query(),
            "(createdAt:[2023-12-31T00:00:00Z TO 2024-02-01T00:00:00Z])"
        );
    }

    #[test]
    fn test_query_params_include_tags_only_when_present() {
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let filter = QueryFilter::new(from).with_status(Status::Open);

        let params = filter.query_params(3);
        assert!(params.iter().all(|(key, _)| *key != "tag"));
        assert!(params.contains(&("status", "open".to_string())));
        assert!(params.contains(&("page", "3".to_string())));
        assert!(params.contains(&("embed", "threads".to_string())));

        let filter = filter.with_tags(vec!["billing".to_string(), "vip customer".to_string()]);
        let params = filter.query_params(1);
        assert!(params.contains(&("tag", "billing,vip customer".to_string())));
    }

    #[test]
    fn test_token_validity_boundary() {
        let issued_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let token = Token::issued("abc".to_string(), issued_at);

        assert_eq!(
            token.expires_at,
            Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap()
        );
        assert!(token.is_valid_at(issued_at));
        assert!(!token.is_valid_at(token.expires_at));
    }
}
