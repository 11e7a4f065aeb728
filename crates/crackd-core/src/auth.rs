//! Bearer credential supply.
//!
//! Controllers never read credentials from globals; they are handed an
//! [`AuthTokenProvider`] at construction and ask it for the current token right before
//! they need one.

use async_trait::async_trait;
use tokio::sync::RwLock;

#[async_trait]
pub trait AuthTokenProvider: Send + Sync {
    /// Current bearer token, or `None` when nobody is signed in.
    async fn access_token(&self) -> Option<String>;
}

/// Token holder scoped to one UI session. Sign-in and sign-out swap the token in place.
#[derive(Debug, Default)]
pub struct SessionToken {
    token: RwLock<Option<String>>,
}

impl SessionToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub async fn sign_in(&self, token: impl Into<String>) {
        let token = token.into();
        *self.token.write().await = Some(token).filter(|t| !t.is_empty());
    }

    pub async fn sign_out(&self) {
        *self.token.write().await = None;
    }
}

#[async_trait]
impl AuthTokenProvider for SessionToken {
    async fn access_token(&self) -> Option<String> {
        self.token.read().await.clone()
    }
}
