//! Session tokens attached to outgoing requests.

use std::fmt;
use std::sync::{Arc, RwLock};

/// Supplies the bearer token of the current session, if any.
pub trait TokenProvider: Send + Sync {
    /// Current token, `None` when signed out.
    fn token(&self) -> Option<String>;
}

impl<T: TokenProvider + ?Sized> TokenProvider for Arc<T> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }
}

impl<T: TokenProvider + ?Sized> TokenProvider for Box<T> {
    fn token(&self) -> Option<String> {
        (**self).token()
    }
}

/// No session: requests go out without `Authorization`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

/// Fixed token, typically a service credential.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wraps `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Token of the signed-in user, replaced on sign-in and cleared on sign-out.
///
/// Clones share the same slot.
///
/// ```
/// use valdora_reqwest::{SessionToken, TokenProvider};
///
/// let session = SessionToken::default();
/// let middleware_view = session.clone();
/// assert_eq!(middleware_view.token(), None);
///
/// session.set("abc");
/// assert_eq!(middleware_view.token().as_deref(), Some("abc"));
///
/// session.clear();
/// assert_eq!(middleware_view.token(), None);
/// ```
#[derive(Clone, Default)]
pub struct SessionToken {
    slot: Arc<RwLock<Option<String>>>,
}

impl SessionToken {
    /// Stores the token of a new session.
    pub fn set(&self, token: impl Into<String>) {
        let token = token.into();
        match self.slot.write() {
            Ok(mut slot) => *slot = Some(token),
            Err(poisoned) => *poisoned.into_inner() = Some(token),
        }
    }

    /// Forgets the token.
    pub fn clear(&self) {
        match self.slot.write() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("signed_in", &self.token().is_some())
            .finish()
    }
}

impl TokenProvider for SessionToken {
    fn token(&self) -> Option<String> {
        match self.slot.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
