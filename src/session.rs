use std::fmt;

use subtle::ConstantTimeEq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationLevel {
    Unauthenticated,
    Authorized,
}

impl AuthorizationLevel {
    pub fn label(self) -> &'static str {
        match self {
            AuthorizationLevel::Unauthenticated => "UNAUTHENTICATED",
            AuthorizationLevel::Authorized => "AUTHORIZED",
        }
    }
}

impl fmt::Display for AuthorizationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Authorization state for one interactive run. Only ever upgrades.
#[derive(Debug, Default)]
pub struct Session {
    authorized: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authorized(&self) -> bool {
        self.authorized
    }

    pub fn authorize(&mut self) {
        self.authorized = true;
    }

    pub fn authorization_level(&self) -> AuthorizationLevel {
        if self.authorized {
            AuthorizationLevel::Authorized
        } else {
            AuthorizationLevel::Unauthenticated
        }
    }
}

/// The login secret. Compared in one place, never printed.
#[derive(Clone)]
pub struct SharedSecret(String);

impl SharedSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn verify(&self, candidate: &str) -> bool {
        bool::from(self.0.as_bytes().ct_eq(candidate.as_bytes()))
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}
