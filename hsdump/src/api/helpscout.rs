use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{
    header::{self, HeaderMap},
    Client, StatusCode,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::auth::Authenticator;
use crate::error::{Error, Result};
use crate::models::{Conversation, ConversationList, Page, QueryFilter, TagList, Token};

pub const DEFAULT_API_URL: &str = "https://api.helpscout.net/v2";
pub const DEFAULT_AUTH_URL: &str = "https://api.helpscout.net/v2/oauth2/token";

const DEFAULT_MAX_RATE_LIMIT_RETRIES: u32 = 10;
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive 429 responses tolerated for one request, `None` for no limit.
    pub max_rate_limit_retries: Option<u32>,
    /// Wait used when the server sends no usable `Retry-After`.
    pub default_retry_after: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_rate_limit_retries: Some(DEFAULT_MAX_RATE_LIMIT_RETRIES),
            default_retry_after: DEFAULT_RETRY_AFTER,
        }
    }
}

#[async_trait]
pub trait HelpScoutApi {
    async fn list_conversations(
        &mut self,
        filter: &QueryFilter,
        page: u32,
    ) -> Result<Page<ConversationList>>;
    async fn get_conversation_details(&mut self, conversation_id: u64) -> Result<Conversation>;
    async fn list_tags(&mut self, page: u32) -> Result<Page<TagList>>;
}

pub fn http_client() -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Per-invocation session: one HTTP client, one token, one retry policy.
#[derive(Debug)]
pub struct HelpScoutClient {
    client: Client,
    base_url: String,
    auth: Authenticator,
    token: Token,
    retry: RetryPolicy,
}

impl HelpScoutClient {
    pub async fn connect(
        client: Client,
        base_url: String,
        auth: Authenticator,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let token = auth.ensure_token().await?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            token,
            retry,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.token.access_token
    }

    async fn get_json<T: DeserializeOwned>(
        &mut self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut rate_limited = 0;
        let mut reauthenticated = false;

        loop {
            debug!("GET {} {:?}", url, query);

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token.access_token)
                .query(query)
                .send()
                .await?;

            match response.status() {
                StatusCode::TOO_MANY_REQUESTS => {
                    if let Some(max) = self.retry.max_rate_limit_retries
                        && rate_limited >= max
                    {
                        return Err(Error::RateLimited {
                            url,
                            attempts: rate_limited,
                        });
                    }
                    rate_limited += 1;

                    let delay = retry_after(response.headers())
                        .unwrap_or(self.retry.default_retry_after);
                    warn!(
                        "rate limited on {}, retrying in {}s",
                        url,
                        delay.as_secs()
                    );
                    tokio::time::sleep(delay).await;
                }
                StatusCode::UNAUTHORIZED if !reauthenticated => {
                    warn!("access token rejected, re-authenticating");
                    self.token = self.auth.authenticate().await?;
                    reauthenticated = true;
                }
                status if status.is_success() => {
                    return Ok(response.json().await?);
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::Api { url, status, body });
                }
            }
        }
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl HelpScoutApi for HelpScoutClient {
    async fn list_conversations(
        &mut self,
        filter: &QueryFilter,
        page: u32,
    ) -> Result<Page<ConversationList>> {
        self.get_json("/conversations", &filter.query_params(page))
            .await
    }

    async fn get_conversation_details(&mut self, conversation_id: u64) -> Result<Conversation> {
        self.get_json(
            &format!("/conversations/{}", conversation_id),
            &[("embed", "threads".to_string())],
        )
        .await
    }

    async fn list_tags(&mut self, page: u32) -> Result<Page<TagList>> {
        self.get_json("/tags", &[("page", page.to_string())]).await
    }
}
