use std::fmt;
use std::sync::Arc;

/// Supplies the bearer credential. Read on every connect and REST call, so a
/// refreshed token is picked up without re-initialising the client.
pub trait CredentialSource: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// Fixed token
#[derive(Clone)]
pub struct StaticToken(pub String);

impl CredentialSource for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Authenticated user the client is bound to between `init` and `shutdown`
#[derive(Clone)]
pub struct Session {
    user_id: String,
    credentials: Arc<dyn CredentialSource>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            user_id: user_id.into(),
            credentials,
        }
    }

    pub fn with_token(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::new(user_id, Arc::new(StaticToken(token.into())))
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Current credential, `None` when missing or empty
    pub fn token(&self) -> Option<String> {
        self.credentials.token().filter(|token| !token.is_empty())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .finish()
    }
}
