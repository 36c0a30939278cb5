//! Host authentication hook.
//!
//! The only gate in front of the relay is a shared secret for the host
//! role. Players are never challenged. The check sits behind the
//! [`Authenticator`] trait so a deployment can swap in its own policy,
//! and tests can use [`OpenAuthenticator`].

use std::future::Future;

use crate::SessionError;

/// Decides whether a connection may claim the host role.
///
/// # Example
///
/// ```rust
/// use tavern_session::{Authenticator, SessionError};
///
/// /// Only lets the host in on weekends.
/// struct WeekendOnly;
///
/// impl Authenticator for WeekendOnly {
///     async fn authorize_host(
///         &self,
///         _secret: Option<&str>,
///     ) -> Result<(), SessionError> {
///         Err(SessionError::AuthFailed("come back saturday".into()))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Checks the secret presented with a host `join_game`.
    ///
    /// # Errors
    /// [`SessionError::AuthFailed`] to refuse the join.
    ///
    /// Implementations may simply write `async fn`; the returned future
    /// must be `Send` because it runs inside a connection task.
    fn authorize_host(
        &self,
        secret: Option<&str>,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Lets anyone join as host. For local games and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAuthenticator;

impl Authenticator for OpenAuthenticator {
    async fn authorize_host(&self, _secret: Option<&str>) -> Result<(), SessionError> {
        Ok(())
    }
}

/// Requires the host to present a configured shared secret.
#[derive(Debug, Clone)]
pub struct SharedSecretAuthenticator {
    secret: String,
}

impl SharedSecretAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

impl Authenticator for SharedSecretAuthenticator {
    async fn authorize_host(&self, secret: Option<&str>) -> Result<(), SessionError> {
        match secret {
            Some(given) if given == self.secret => Ok(()),
            Some(_) => Err(SessionError::AuthFailed("wrong host secret".into())),
            None => Err(SessionError::AuthFailed("host secret required".into())),
        }
    }
}
