use crate::config::ApiSettings;
use crate::error::ApiError;
use crate::identity::IdentityProvider;
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// A stage run on every outbound request after it is built and before it is sent.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, request: &mut Request);
}

/// Attaches `Authorization: Bearer <token>` for the provider's current identity.
///
/// A token is requested for every request. If none can be obtained the request
/// goes out without the header and the backend decides what to do with it.
pub struct BearerAuth {
    provider: Arc<dyn IdentityProvider>,
}

impl BearerAuth {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl RequestInterceptor for BearerAuth {
    async fn intercept(&self, request: &mut Request) {
        let Some(identity) = self.provider.current_identity() else {
            return;
        };
        let token = match self.provider.fresh_token(&identity).await {
            Ok(token) => token,
            Err(err) => {
                warn!(
                    uid = %identity.uid,
                    error = %err,
                    "failed to obtain bearer token, sending request unauthenticated"
                );
                return;
            }
        };
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
            }
            Err(err) => {
                warn!(uid = %identity.uid, error = %err, "bearer token is not a valid header value");
            }
        }
    }
}

/// The shared HTTP client for the finance backend.
#[derive(Clone)]
pub struct ApiGateway {
    client: Client,
    base_url: Url,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl ApiGateway {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(settings.base_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(format!(
                "{} cannot be used as a base url",
                settings.base_url
            )));
        }
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| ApiError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url,
            interceptors: Vec::new(),
        })
    }

    /// Gateway that authenticates every request with the provider's current identity.
    pub fn with_session(
        settings: &ApiSettings,
        provider: Arc<dyn IdentityProvider>,
    ) -> Result<Self, ApiError> {
        Ok(Self::new(settings)?.with_interceptor(BearerAuth::new(provider)))
    }

    /// Append an interceptor. Interceptors run in registration order.
    pub fn with_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve path segments under the base url. Segments are percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        Ok(self.client.request(method, self.endpoint(segments)?))
    }

    /// Build the request and run every interceptor over it, without sending it.
    pub async fn prepare(&self, builder: RequestBuilder) -> Result<Request, ApiError> {
        let mut request = builder.build()?;
        for interceptor in &self.interceptors {
            interceptor.intercept(&mut request).await;
        }
        Ok(request)
    }

    /// Send a request and turn non-success statuses into `ApiError::Status`.
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = self.prepare(builder).await?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        let response = self.client.execute(request).await?;
        debug!(%method, %path, status = response.status().as_u16(), "api response");
        ensure_success(response).await
    }

    pub async fn get_json<T>(&self, segments: &[&str]) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(self.request(Method::GET, segments)?).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn get_json_with<T, Q>(&self, segments: &[&str], query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, segments)?.query(query);
        let response = self.execute(builder).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, segments)?.json(body);
        let response = self.execute(builder).await?;
        Ok(response.json::<T>().await?)
    }

    pub async fn delete(&self, segments: &[&str]) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, segments)?)
            .await?;
        Ok(())
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_string()
    });
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|field| field.as_str()))
        .map(str::to_string)
}
