use crate::error::IdentityError;
use crate::identity::{AuthBroadcaster, AuthEventStream, Identity, IdentityProvider};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Identity provider backed by an OAuth 2.0 token endpoint.
///
/// Holds a long-lived refresh token and performs a `refresh_token` grant for every
/// bearer token it hands out, so nothing short-lived is kept between requests.
pub struct OAuthRefreshProvider {
    profile: Identity,
    token_endpoint: String,
    client_id: Option<String>,
    refresh_token: String,
    client: Client,
    events: AuthBroadcaster,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthRefreshProvider {
    pub fn new(
        profile: Identity,
        token_endpoint: impl Into<String>,
        client_id: Option<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            profile,
            token_endpoint: token_endpoint.into(),
            client_id,
            refresh_token: refresh_token.into(),
            client,
            events: AuthBroadcaster::default(),
        }
    }

    async fn exchange(&self) -> Result<String, IdentityError> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", self.refresh_token.as_str()),
        ];
        if let Some(client_id) = &self.client_id {
            form.push(("client_id", client_id.as_str()));
        }

        let response = self
            .client
            .post(&self.token_endpoint)
            .form(&form)
            .send()
            .await
            .map_err(|err| IdentityError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: TokenErrorResponse = response.json().await.unwrap_or_default();
            let message = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| format!("token endpoint returned {status}"));
            return Err(IdentityError::Rejected(message));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|err| IdentityError::Network(err.to_string()))?;
        debug!("refresh token exchanged");
        body.id_token
            .or(body.access_token)
            .ok_or_else(|| IdentityError::Rejected("token endpoint returned no token".to_string()))
    }
}

#[async_trait]
impl IdentityProvider for OAuthRefreshProvider {
    fn observe(&self) -> AuthEventStream {
        self.events.register()
    }

    fn current_identity(&self) -> Option<Identity> {
        self.events.current()
    }

    async fn sign_in_interactive(&self) -> Result<(), IdentityError> {
        self.exchange().await?;
        info!(uid = %self.profile.uid, "signed in with refresh token");
        self.events.set(Some(self.profile.clone()));
        Ok(())
    }

    async fn sign_out_current(&self) -> Result<(), IdentityError> {
        self.events.set(None);
        Ok(())
    }

    async fn fresh_token(&self, identity: &Identity) -> Result<String, IdentityError> {
        if !self.events.is_current(&identity.uid) {
            return Err(IdentityError::NotSignedIn);
        }
        self.exchange().await
    }
}
