use crate::error::IdentityError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// Profile of the authenticated user as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name to greet the user with, falling back to the email and then the uid.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// A notification delivered by the provider's change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    Changed(Option<Identity>),
    Failed(String),
}

/// Receiving half of a provider subscription. Dropping it unsubscribes.
pub type AuthEventStream = UnboundedReceiver<AuthEvent>;

/// Capabilities the session store and the gateway need from an OAuth/OpenID provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register for change notifications. The current identity is delivered first.
    fn observe(&self) -> AuthEventStream;

    fn current_identity(&self) -> Option<Identity>;

    async fn sign_in_interactive(&self) -> Result<(), IdentityError>;

    async fn sign_out_current(&self) -> Result<(), IdentityError>;

    /// Issue a short-lived bearer credential for `identity`.
    async fn fresh_token(&self, identity: &Identity) -> Result<String, IdentityError>;
}

/// Current identity plus the observers that track it.
///
/// Both live under one lock, so a new observer's first event and every later
/// change are delivered in the same order the changes were made.
#[derive(Default)]
pub(crate) struct AuthBroadcaster {
    shared: Mutex<Broadcast>,
}

#[derive(Default)]
struct Broadcast {
    current: Option<Identity>,
    subscribers: Vec<UnboundedSender<AuthEvent>>,
}

impl AuthBroadcaster {
    pub(crate) fn current(&self) -> Option<Identity> {
        self.shared.lock().current.clone()
    }

    pub(crate) fn is_current(&self, uid: &str) -> bool {
        self.shared
            .lock()
            .current
            .as_ref()
            .is_some_and(|current| current.uid == uid)
    }

    /// Register an observer; it first receives the current identity.
    pub(crate) fn register(&self) -> AuthEventStream {
        let mut shared = self.shared.lock();
        let (tx, rx) = unbounded_channel();
        tx.send(AuthEvent::Changed(shared.current.clone())).ok();
        shared.subscribers.push(tx);
        rx
    }

    /// Replace the current identity and notify every live observer.
    pub(crate) fn set(&self, identity: Option<Identity>) {
        self.deliver(identity.clone(), AuthEvent::Changed(identity));
    }

    /// Drop the current identity and report `message` to every live observer.
    pub(crate) fn fail(&self, message: String) {
        self.deliver(None, AuthEvent::Failed(message));
    }

    fn deliver(&self, identity: Option<Identity>, event: AuthEvent) {
        let mut shared = self.shared.lock();
        shared.current = identity;
        shared
            .subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub(crate) fn live(&self) -> usize {
        let mut shared = self.shared.lock();
        shared.subscribers.retain(|tx| !tx.is_closed());
        shared.subscribers.len()
    }
}

/// In-process provider that signs in as a configured profile.
///
/// Useful against development backends that accept a fixed token, or that accept
/// any token at all (tokens are minted per request when none is configured).
pub struct LocalIdentityProvider {
    profile: Identity,
    token: Option<String>,
    events: AuthBroadcaster,
}

impl LocalIdentityProvider {
    pub fn new(profile: Identity, token: Option<String>) -> Self {
        Self {
            profile,
            token,
            events: AuthBroadcaster::default(),
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn observe(&self) -> AuthEventStream {
        self.events.register()
    }

    fn current_identity(&self) -> Option<Identity> {
        self.events.current()
    }

    async fn sign_in_interactive(&self) -> Result<(), IdentityError> {
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
        Ok(self
            .token
            .clone()
            .unwrap_or_else(|| format!("local-{}", Uuid::new_v4().simple())))
    }
}

/// Controllable provider for tests and offline smoke checks.
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    pub struct ScriptedProvider {
        profile: Identity,
        events: AuthBroadcaster,
        sign_in_failure: Mutex<Option<IdentityError>>,
        sign_out_failure: Mutex<Option<IdentityError>>,
        token: Mutex<Result<String, IdentityError>>,
        silent_sign_in: AtomicBool,
        sign_in_calls: AtomicUsize,
        token_requests: AtomicUsize,
    }

    impl ScriptedProvider {
        pub fn new(profile: Identity) -> Self {
            Self {
                profile,
                events: AuthBroadcaster::default(),
                sign_in_failure: Mutex::new(None),
                sign_out_failure: Mutex::new(None),
                token: Mutex::new(Ok("scripted-token".to_string())),
                silent_sign_in: AtomicBool::new(false),
                sign_in_calls: AtomicUsize::new(0),
                token_requests: AtomicUsize::new(0),
            }
        }

        pub fn signed_in(profile: Identity) -> Self {
            let provider = Self::new(profile.clone());
            provider.events.set(Some(profile));
            provider
        }

        /// Deliver a notification as if the provider's own event stream produced it.
        pub fn emit(&self, event: AuthEvent) {
            match event {
                AuthEvent::Changed(identity) => self.events.set(identity),
                AuthEvent::Failed(message) => self.events.fail(message),
            }
        }

        pub fn fail_next_sign_in(&self, err: IdentityError) {
            *self.sign_in_failure.lock() = Some(err);
        }

        pub fn fail_next_sign_out(&self, err: IdentityError) {
            *self.sign_out_failure.lock() = Some(err);
        }

        /// Accept sign-in requests without notifying; the test decides what arrives later.
        pub fn hold_sign_in_notifications(&self) {
            self.silent_sign_in.store(true, Ordering::SeqCst);
        }

        pub fn set_token(&self, token: impl Into<String>) {
            *self.token.lock() = Ok(token.into());
        }

        pub fn fail_tokens(&self, err: IdentityError) {
            *self.token.lock() = Err(err);
        }

        pub fn sign_in_calls(&self) -> usize {
            self.sign_in_calls.load(Ordering::SeqCst)
        }

        pub fn token_requests(&self) -> usize {
            self.token_requests.load(Ordering::SeqCst)
        }

        pub fn observers(&self) -> usize {
            self.events.live()
        }
    }

    #[async_trait]
    impl IdentityProvider for ScriptedProvider {
        fn observe(&self) -> AuthEventStream {
            self.events.register()
        }

        fn current_identity(&self) -> Option<Identity> {
            self.events.current()
        }

        async fn sign_in_interactive(&self) -> Result<(), IdentityError> {
            self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if let Some(err) = self.sign_in_failure.lock().take() {
                return Err(err);
            }
            if !self.silent_sign_in.load(Ordering::SeqCst) {
                self.emit(AuthEvent::Changed(Some(self.profile.clone())));
            }
            Ok(())
        }

        async fn sign_out_current(&self) -> Result<(), IdentityError> {
            tokio::task::yield_now().await;
            if let Some(err) = self.sign_out_failure.lock().take() {
                return Err(err);
            }
            self.emit(AuthEvent::Changed(None));
            Ok(())
        }

        async fn fresh_token(&self, _identity: &Identity) -> Result<String, IdentityError> {
            self.token_requests.fetch_add(1, Ordering::SeqCst);
            self.token.lock().clone()
        }
    }
}
