use crate::support::FakeBackend;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use pocketbook_core::services::list_categories;
use pocketbook_core::{
    ApiGateway, Identity, IdentityError, IdentityProvider, OAuthRefreshProvider, SessionStore,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

const VALID_REFRESH: &str = "refresh-ok";

struct TokenEndpoint {
    url: String,
    exchanges: Arc<AtomicUsize>,
}

async fn exchange(
    State(exchanges): State<Arc<AtomicUsize>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    exchanges.fetch_add(1, Ordering::SeqCst);
    let grant = form.get("grant_type").map(String::as_str);
    let refresh = form.get("refresh_token").map(String::as_str);
    if grant != Some("refresh_token") || refresh != Some(VALID_REFRESH) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Token has been revoked" })),
        )
            .into_response();
    }
    Json(json!({ "id_token": "id-123", "access_token": "access-456", "expires_in": 3600 }))
        .into_response()
}

async fn token_endpoint() -> TokenEndpoint {
    let exchanges = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/token", post(exchange))
        .with_state(exchanges.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    TokenEndpoint {
        url: format!("http://{addr}/token"),
        exchanges,
    }
}

fn ana() -> Identity {
    Identity::new("uid-ana").with_email("ana@example.com")
}

#[tokio::test]
async fn sign_in_exchanges_the_refresh_token() {
    let endpoint = token_endpoint().await;
    let provider = OAuthRefreshProvider::new(ana(), &endpoint.url, Some("cli".into()), VALID_REFRESH);

    provider.sign_in_interactive().await.expect("signed in");
    assert_eq!(provider.current_identity(), Some(ana()));
    assert_eq!(provider.fresh_token(&ana()).await.as_deref(), Ok("id-123"));
    assert_eq!(endpoint.exchanges.load(Ordering::SeqCst), 2);

    provider.sign_out_current().await.expect("signed out");
    assert_eq!(
        provider.fresh_token(&ana()).await,
        Err(IdentityError::NotSignedIn)
    );
}

#[tokio::test]
async fn revoked_refresh_token_surfaces_in_the_session() {
    let endpoint = token_endpoint().await;
    let provider = Arc::new(OAuthRefreshProvider::new(ana(), &endpoint.url, None, "revoked"));
    let store = SessionStore::new(provider);
    let _subscription = store.subscribe().expect("subscribe");

    store.sign_in().await;
    let state = store.settled().await;
    assert_eq!(state.error.as_deref(), Some("Token has been revoked"));
    assert_eq!(state.identity, None);
}

#[tokio::test]
async fn backend_receives_the_exchanged_id_token() {
    let endpoint = token_endpoint().await;
    let backend = FakeBackend::start().await;
    backend.require_token("id-123");

    let provider = Arc::new(OAuthRefreshProvider::new(ana(), &endpoint.url, None, VALID_REFRESH));
    let store = SessionStore::new(provider.clone());
    let _subscription = store.subscribe().expect("subscribe");
    store.sign_in().await;
    let mut changes = store.changes();
    changes
        .wait_for(|state| state.identity.is_some())
        .await
        .expect("signed in");

    let gateway = ApiGateway::with_session(&backend.settings(), provider).expect("gateway");
    list_categories(&gateway).await.expect("authorized");
    assert_eq!(
        backend.requests()[0].authorization.as_deref(),
        Some("Bearer id-123")
    );
}
