use pocketbook_core::identity::testing::ScriptedProvider;
use pocketbook_core::{
    AuthEvent, Identity, IdentityError, SessionError, SessionPhase, SessionState, SessionStore,
};
use std::sync::Arc;

fn ana() -> Identity {
    Identity::new("uid-ana")
        .with_display_name("Ana")
        .with_email("ana@example.com")
}

async fn wait_until(store: &SessionStore, done: impl Fn(&SessionState) -> bool) -> SessionState {
    let mut changes = store.changes();
    let state = changes.wait_for(|state| done(state)).await.expect("store alive");
    state.clone()
}

#[tokio::test]
async fn sign_in_is_reported_through_the_subscription() {
    let provider = Arc::new(ScriptedProvider::new(ana()));
    let store = SessionStore::new(provider.clone());
    let _subscription = store.subscribe().expect("subscribe");

    let attempt = store.sign_in();
    assert_eq!(store.phase(), SessionPhase::Authenticating);
    attempt.await;

    let state = wait_until(&store, |state| state.identity.is_some()).await;
    assert_eq!(state.identity, Some(ana()));
    assert_eq!(state.error, None);
    assert!(!state.loading);
    assert_eq!(provider.sign_in_calls(), 1);
}

#[tokio::test]
async fn closed_popup_lands_in_error() {
    let provider = Arc::new(ScriptedProvider::new(ana()));
    provider.hold_sign_in_notifications();
    let store = SessionStore::new(provider.clone());
    let _subscription = store.subscribe().expect("subscribe");
    wait_until(&store, |state| !state.loading).await;

    let attempt = store.sign_in();
    assert!(store.snapshot().loading);
    attempt.await;
    provider.emit(AuthEvent::Failed("popup closed".into()));

    let state = wait_until(&store, |state| state.error.is_some()).await;
    assert_eq!(state.phase(), SessionPhase::Errored);
    assert_eq!(state.error.as_deref(), Some("popup closed"));
    assert_eq!(state.identity, None);
    assert!(!state.loading);
}

#[tokio::test]
async fn rejected_sign_in_then_success_clears_the_error() {
    let provider = Arc::new(ScriptedProvider::new(ana()));
    provider.fail_next_sign_in(IdentityError::Cancelled);
    let store = SessionStore::new(provider.clone());
    let _subscription = store.subscribe().expect("subscribe");

    store.sign_in().await;
    let failed = store.settled().await;
    assert_eq!(failed.error.as_deref(), Some("sign-in was cancelled"));
    assert_eq!(failed.identity, None);

    store.sign_in().await;
    let state = wait_until(&store, |state| state.identity.is_some()).await;
    assert_eq!(state.error, None);
    assert_eq!(state.phase(), SessionPhase::Authenticated);
}

#[tokio::test]
async fn sign_out_clears_identity_via_notification() {
    let provider = Arc::new(ScriptedProvider::signed_in(ana()));
    let store = SessionStore::new(provider.clone());
    let _subscription = store.subscribe().expect("subscribe");
    wait_until(&store, |state| state.identity.is_some()).await;

    store.sign_out().await;
    let state = wait_until(&store, |state| state.identity.is_none()).await;
    assert_eq!(state.phase(), SessionPhase::Anonymous);
}

#[tokio::test]
async fn notifications_apply_in_order_and_last_wins() {
    let provider = Arc::new(ScriptedProvider::new(ana()));
    let store = SessionStore::new(provider.clone());
    let _subscription = store.subscribe().expect("subscribe");

    let bruno = Identity::new("uid-bruno").with_display_name("Bruno");
    provider.emit(AuthEvent::Changed(Some(ana())));
    provider.emit(AuthEvent::Failed("token revoked".into()));
    provider.emit(AuthEvent::Changed(Some(bruno.clone())));

    let state = wait_until(&store, |state| state.identity.as_ref() == Some(&bruno)).await;
    assert_eq!(state.error, None);
    assert!(!state.loading);
}

#[tokio::test]
async fn dropping_the_subscription_stops_updates_and_allows_resubscribe() {
    let provider = Arc::new(ScriptedProvider::new(ana()));
    let store = SessionStore::new(provider.clone());

    let subscription = store.subscribe().expect("subscribe");
    assert!(matches!(store.subscribe(), Err(SessionError::AlreadySubscribed)));
    assert_eq!(provider.observers(), 1);

    subscription.unsubscribe();
    for _ in 0..10 {
        if provider.observers() == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(provider.observers(), 0);

    provider.emit(AuthEvent::Changed(Some(ana())));
    tokio::task::yield_now().await;
    assert_eq!(store.identity(), None);

    let _again = store.subscribe().expect("resubscribe");
    let state = wait_until(&store, |state| state.identity.is_some()).await;
    assert_eq!(state.identity, Some(ana()));
}

#[tokio::test]
async fn a_second_sign_in_restarts_the_attempt() {
    let provider = Arc::new(ScriptedProvider::new(ana()));
    let store = SessionStore::new(provider.clone());
    let _subscription = store.subscribe().expect("subscribe");

    let first = store.sign_in();
    let second = store.sign_in();
    assert!(store.snapshot().loading);
    assert_eq!(store.snapshot().error, None);
    tokio::join!(first, second);

    assert_eq!(provider.sign_in_calls(), 2);
    let state = wait_until(&store, |state| state.identity.is_some() && !state.loading).await;
    assert_eq!(state.phase(), SessionPhase::Authenticated);
    assert_eq!(state.error, None);
}
