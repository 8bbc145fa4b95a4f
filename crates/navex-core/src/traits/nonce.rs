//! Request token verification

/// Checks the anti-forgery token attached to a handler request
pub trait NonceVerifier: Send + Sync {
    fn verify(&self, nonce: &str, action: &str) -> bool;
}

/// Accepts exactly one token for every action
///
/// Used by the daemon's manual triggers and by tests.
#[derive(Clone)]
pub struct FixedNonce {
    token: String,
}

impl FixedNonce {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for FixedNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedNonce").field("token", &"<REDACTED>").finish()
    }
}

impl NonceVerifier for FixedNonce {
    fn verify(&self, nonce: &str, _action: &str) -> bool {
        !self.token.is_empty() && nonce == self.token
    }
}
