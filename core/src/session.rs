use crate::error::SessionError;
use crate::identity::{AuthEvent, Identity, IdentityProvider};
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Snapshot of "who is logged in". Consumers only ever see clones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub identity: Option<Identity>,
    pub error: Option<String>,
    pub loading: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Anonymous,
    Authenticating,
    Authenticated,
    Errored,
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Authenticating
        } else if self.error.is_some() {
            SessionPhase::Errored
        } else if self.identity.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }
}

/// Single owner of the session state, fed by the identity provider's change stream.
///
/// Cloning the store shares the same state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    provider: Arc<dyn IdentityProvider>,
    state: watch::Sender<SessionState>,
    subscribed: AtomicBool,
}

impl StoreInner {
    fn apply(&self, event: AuthEvent) {
        let next = match event {
            AuthEvent::Changed(identity) => SessionState {
                identity,
                error: None,
                loading: false,
            },
            AuthEvent::Failed(message) => SessionState {
                identity: None,
                error: Some(message),
                loading: false,
            },
        };
        debug!(phase = ?next.phase(), "session state changed");
        self.state.send_replace(next);
    }

    fn record_failure(&self, message: String) {
        self.state.send_modify(|state| {
            state.loading = false;
            state.error = Some(message);
        });
    }
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(StoreInner {
                provider,
                state,
                subscribed: AtomicBool::new(false),
            }),
        }
    }

    pub fn provider(&self) -> Arc<dyn IdentityProvider> {
        self.inner.provider.clone()
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity.clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.inner.state.borrow().phase()
    }

    /// Receiver that is marked changed on every state transition.
    pub fn changes(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Register with the provider's change stream.
    ///
    /// Only one subscription may be live per store; the returned handle releases it
    /// when dropped. Must be called from within a tokio runtime.
    pub fn subscribe(&self) -> Result<SessionSubscription, SessionError> {
        if self.inner.subscribed.swap(true, Ordering::AcqRel) {
            return Err(SessionError::AlreadySubscribed);
        }
        let mut events = self.inner.provider.observe();
        let weak = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.apply(event);
            }
        });
        Ok(SessionSubscription {
            task,
            store: Arc::downgrade(&self.inner),
        })
    }

    /// Provider change callback. Replaces the whole state with the notification's payload.
    pub fn apply(&self, event: AuthEvent) {
        self.inner.apply(event);
    }

    /// Start an interactive sign-in.
    ///
    /// `loading` is raised and `error` cleared before this returns, so the state is
    /// observable before the returned future is first polled. Success is reported by
    /// the provider's notification; failures land in `error`.
    pub fn sign_in(&self) -> BoxFuture<'static, ()> {
        self.inner.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        let inner = self.inner.clone();
        async move {
            if let Err(err) = inner.provider.sign_in_interactive().await {
                warn!(error = %err, "sign-in failed");
                inner.record_failure(err.to_string());
            }
        }
        .boxed()
    }

    /// Ask the provider to end the session. The identity is only cleared by the
    /// provider's own notification.
    pub async fn sign_out(&self) {
        if let Err(err) = self.inner.provider.sign_out_current().await {
            warn!(error = %err, "sign-out failed");
            self.inner.record_failure(err.to_string());
        }
    }

    /// Wait until no sign-in attempt is in flight and return the settled state.
    pub async fn settled(&self) -> SessionState {
        let mut changes = self.changes();
        let settled = match changes.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        settled
    }
}

/// Live registration with the provider. Dropping it unsubscribes.
pub struct SessionSubscription {
    task: JoinHandle<()>,
    store: Weak<StoreInner>,
}

impl SessionSubscription {
    pub fn unsubscribe(self) {}
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        self.task.abort();
        if let Some(inner) = self.store.upgrade() {
            inner.subscribed.store(false, Ordering::Release);
        }
    }
}
