//! Credential/session provider seam.

use url::Url;

/// An authenticated session: where the server lives and how to talk to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub base_url: Url,
    pub token: String,
}

impl Session {
    pub fn new(base_url: Url, token: impl Into<String>) -> Self {
        Self {
            base_url,
            token: token.into(),
        }
    }
}

/// Supplies the current session. `None` means nobody is signed in; the
/// pipeline reports that as `NoClientAvailable` and never signs in itself.
pub trait SessionProvider: Send + Sync + 'static {
    fn session(&self) -> Option<Session>;
}

/// A session obtained elsewhere and held for the lifetime of the provider.
pub struct StaticSession(Session);

impl StaticSession {
    pub fn new(session: Session) -> Self {
        Self(session)
    }
}

impl SessionProvider for StaticSession {
    fn session(&self) -> Option<Session> {
        Some(self.0.clone())
    }
}

/// Signed out.
pub struct NoSession;

impl SessionProvider for NoSession {
    fn session(&self) -> Option<Session> {
        None
    }
}
