//! Shared helpers for tests that talk to a mocked Help Scout API
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Duration as TimeDelta, Utc};
use hsdump::api::helpscout::{http_client, HelpScoutClient, RetryPolicy};
use hsdump::auth::{Authenticator, Credentials};
use hsdump::error::Result;
use hsdump::models::Token;
use hsdump::store::TokenStore;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/v2/oauth2/token";

pub fn token_file(dir: &Path) -> PathBuf {
    dir.join("token.json")
}

pub fn fresh_token(access_token: &str) -> Token {
    Token::issued(access_token.to_string(), Utc::now())
}

pub fn expired_token(access_token: &str) -> Token {
    Token::issued(access_token.to_string(), Utc::now() - TimeDelta::days(3))
}

pub fn fast_retry(max_rate_limit_retries: Option<u32>) -> RetryPolicy {
    RetryPolicy {
        max_rate_limit_retries,
        default_retry_after: Duration::ZERO,
    }
}

/// Opens a session against `server`, seeding the token cache with `cached`.
pub async fn connect(
    server: &MockServer,
    token_dir: &Path,
    cached: Option<Token>,
    retry: RetryPolicy,
) -> Result<HelpScoutClient> {
    let store = TokenStore::new(token_file(token_dir));
    if let Some(token) = cached {
        store.save(&token)?;
    }

    let http = http_client()?;
    let auth = Authenticator::new(
        http.clone(),
        format!("{}{}", server.uri(), TOKEN_PATH),
        Credentials {
            app_id: "app-id".to_string(),
            app_secret: "app-secret".to_string(),
        },
        store,
    );

    HelpScoutClient::connect(http, format!("{}/v2", server.uri()), auth, retry).await
}

pub async fn mount_token_endpoint(server: &MockServer, access_token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "bearer",
            "access_token": access_token,
            "expires_in": 172800
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub fn conversation(id: u64, created_at: &str, tag: &str) -> Value {
    json!({
        "id": id,
        "number": id + 1000,
        "subject": format!("Question #{}", id),
        "status": "open",
        "primaryCustomer": {"id": 77, "first": "Boutique Émile", "email": "emile@example.com"},
        "tags": [{"id": 5, "color": "#929499", "tag": tag}],
        "createdAt": created_at,
        "closedAt": null,
        "_embedded": {
            "threads": [
                {
                    "id": id * 10,
                    "type": "customer",
                    "createdAt": created_at,
                    "createdBy": {"id": 77, "type": "customer"},
                    "body": "<p>My invoice&nbsp;is <b>wrong</b></p>"
                },
                {
                    "id": id * 10 + 1,
                    "type": "note",
                    "createdAt": created_at,
                    "createdBy": {"id": 3, "type": "user"},
                    "body": "check stripe"
                }
            ]
        }
    })
}

pub fn conversation_page(
    ids: &[u64],
    number: u32,
    total_pages: u32,
    total_elements: u64,
) -> Value {
    let stubs: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
    json!({
        "_embedded": {"conversations": stubs},
        "page": {
            "size": 50,
            "totalElements": total_elements,
            "totalPages": total_pages,
            "number": number
        }
    })
}
