//! Identity lookup.
//!
//! The caller's identity is never ambient: every operation receives a
//! [`RequestContext`] and resolves it through an [`IdentityProvider`].

use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use store::{Store, StoreError};

use crate::error::DomainError;

/// Per-request context carrying whatever credentials the caller presented.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    session_token: Option<String>,
}

impl RequestContext {
    /// A context with no credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A context carrying a session token.
    pub fn with_session(token: impl Into<String>) -> Self {
        Self {
            session_token: Some(token.into()),
        }
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

/// Resolves the user behind a request.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns the authenticated user, or `None` if there is none.
    async fn current_user(&self, ctx: &RequestContext) -> Result<Option<UserId>, StoreError>;
}

/// Resolves session tokens against the store's session table.
#[derive(Clone)]
pub struct SessionIdentity<S: Store> {
    store: S,
}

impl<S: Store> SessionIdentity<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Store> IdentityProvider for SessionIdentity<S> {
    async fn current_user(&self, ctx: &RequestContext) -> Result<Option<UserId>, StoreError> {
        match ctx.session_token() {
            Some(token) => self.store.resolve_session(token).await,
            None => Ok(None),
        }
    }
}

/// Shared handle to an identity provider.
pub type SharedIdentity = Arc<dyn IdentityProvider>;

/// Resolves the caller or fails with `NotSignedIn`.
///
/// A failed lookup counts as no identity.
pub(crate) async fn require_user(
    identity: &dyn IdentityProvider,
    ctx: &RequestContext,
    action: &'static str,
) -> Result<UserId, DomainError> {
    optional_user(identity, ctx)
        .await
        .ok_or(DomainError::NotSignedIn { action })
}

/// Resolves the caller, treating lookup failures as anonymous.
pub(crate) async fn optional_user(
    identity: &dyn IdentityProvider,
    ctx: &RequestContext,
) -> Option<UserId> {
    match identity.current_user(ctx).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(error = %e, "identity lookup failed");
            None
        }
    }
}
