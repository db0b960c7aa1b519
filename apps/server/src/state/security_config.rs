//! Token-signing configuration, passed by handle rather than read from the
//! environment at call sites.

use std::time::Duration;

#[derive(Clone)]
pub struct SecurityConfig {
    secret: Vec<u8>,
    token_ttl: Duration,
}

impl SecurityConfig {
    pub fn new(secret: &[u8], token_ttl: Duration) -> Self {
        Self {
            secret: secret.to_vec(),
            token_ttl,
        }
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The secret stays out of logs.
        f.debug_struct("SecurityConfig")
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}
