use reqwest::StatusCode;

/// Failures raised by an identity provider during sign-in, sign-out or token retrieval.
///
/// The `Display` text is what ends up in `SessionState::error`, so it is written
/// for the person in front of the screen.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("sign-in was cancelled")]
    Cancelled,
    #[error("{0}")]
    Rejected(String),
    #[error("identity provider unreachable: {0}")]
    Network(String),
    #[error("no user is signed in")]
    NotSignedIn,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session store is already subscribed to its identity provider")]
    AlreadySubscribed,
}

/// Errors surfaced by the API gateway and every resource service.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("invalid API url: {0}")]
    InvalidUrl(String),
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded with {status}: {message}")]
    Status { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => StatusCode::from_u16(*status).ok(),
            _ => None,
        }
    }

    /// Short inline text for a view that offers a manual retry.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUrl(_) => "The API address is misconfigured.".to_string(),
            Self::Timeout => "The server took too long to answer. Try again.".to_string(),
            Self::Network(_) => "Could not reach the server. Try again.".to_string(),
            Self::Status { status, message } if *status == 401 || *status == 403 => {
                format!("Not authorized: {message}")
            }
            Self::Status { message, .. } => message.clone(),
            Self::Decode(_) => "The server sent an unexpected response.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            }
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}
