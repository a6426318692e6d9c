use chrono::Utc;
use log::{debug, info};
use reqwest::{Client, StatusCode};

use crate::error::{Error, Result};
use crate::models::{Token, TokenResponse};
use crate::store::TokenStore;

#[derive(Clone)]
pub struct Credentials {
    pub app_id: String,
    pub app_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .finish()
    }
}

/// Exchanges application credentials for an access token (OAuth2 client
/// credentials grant) and keeps the result in the token cache.
#[derive(Debug)]
pub struct Authenticator {
    client: Client,
    token_url: String,
    credentials: Credentials,
    store: TokenStore,
}

impl Authenticator {
    pub fn new(client: Client, token_url: String, credentials: Credentials, store: TokenStore) -> Self {
        Self {
            client,
            token_url,
            credentials,
            store,
        }
    }

    pub async fn authenticate(&self) -> Result<Token> {
        info!("requesting a new access token");

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.credentials.app_id.as_str()),
                ("client_secret", self.credentials.app_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Auth { status, body });
        }

        let body: TokenResponse = response.json().await?;
        let token = Token::issued(body.access_token, Utc::now());
        self.store.save(&token)?;

        Ok(token)
    }

    /// Cached token when it is still valid, a fresh one otherwise.
    pub async fn ensure_token(&self) -> Result<Token> {
        if let Some(token) = self.store.load()
            && token.is_valid_at(Utc::now())
        {
            debug!("using cached token valid until {}", token.expires_at);
            return Ok(token);
        }

        self.authenticate().await
    }
}
