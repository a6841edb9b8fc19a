//! Service-account token exchange against the dashboard API.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{ExchangeError, ExchangeResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "serviceAccounts", default)]
    service_accounts: Vec<ServiceAccount>,
}

#[derive(Debug, Deserialize)]
struct ServiceAccount {
    id: i64,
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateAccountRequest<'a> {
    name: &'a str,
    role: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateTokenRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateTokenResponse {
    key: String,
}

/// Exchanges the bootstrap password for a service-account API token.
pub struct TokenExchanger {
    client: Client,
    base_url: String,
    username: String,
    password: Zeroizing<String>,
}

impl TokenExchanger {
    /// Create an exchanger against the dashboard at `base_url`.
    ///
    /// The ingress serves a self-signed certificate, so server
    /// verification is disabled for this client.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ExchangeResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: Zeroizing::new(password.into()),
        })
    }

    /// Look up or create the named service account and mint a token for it.
    ///
    /// Lookup is by stable name, so re-running never duplicates the
    /// identity; only the minted token is new per call.
    pub async fn exchange(&self, account_name: &str, token_name: &str) -> ExchangeResult<String> {
        let account = match self.find_service_account(account_name).await? {
            Some(account) => {
                debug!(account = %account.name, id = account.id, "service account exists");
                account
            }
            None => self.create_service_account(account_name).await?,
        };

        let token = self.mint_token(account.id, token_name).await?;
        info!(account = account_name, "minted service-account token");
        Ok(token)
    }

    async fn find_service_account(&self, name: &str) -> ExchangeResult<Option<ServiceAccount>> {
        let url = format!("{}/api/serviceaccounts/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(self.password.as_str()))
            .query(&[("query", name)])
            .send()
            .await?;

        let body: SearchResponse = Self::check(response).await?.json().await?;
        Ok(body.service_accounts.into_iter().find(|a| a.name == name))
    }

    async fn create_service_account(&self, name: &str) -> ExchangeResult<ServiceAccount> {
        let url = format!("{}/api/serviceaccounts", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(self.password.as_str()))
            .json(&CreateAccountRequest {
                name,
                role: "Admin",
            })
            .send()
            .await?;

        let account: ServiceAccount = Self::check(response).await?.json().await?;
        info!(account = %account.name, id = account.id, "created service account");
        Ok(account)
    }

    async fn mint_token(&self, account_id: i64, token_name: &str) -> ExchangeResult<String> {
        let url = format!("{}/api/serviceaccounts/{}/tokens", self.base_url, account_id);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(self.password.as_str()))
            .json(&CreateTokenRequest { name: token_name })
            .send()
            .await?;

        let token: CreateTokenResponse = Self::check(response).await?.json().await?;
        Ok(token.key)
    }

    async fn check(response: Response) -> ExchangeResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ExchangeError::Unauthorized);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ExchangeError::ApiStatus {
            status: status.as_u16(),
            body,
        })
    }
}
