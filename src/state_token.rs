use rand::distr::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, TryRngCore};
use std::sync::Arc;
use tracing::{debug, info};

use crate::store::{KeyValueStore, STATE_TOKEN_KEY};
use crate::FocusError;

/// Generate a fresh alphanumeric token of `len` characters from the OS entropy source.
pub fn generate_token(len: usize) -> String {
    let mut rng = OsRng.unwrap_err();
    (0..len)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

/// Owns the anti-forgery token sent as `state` on the login redirect.
///
/// The token is minted once per profile and persisted; every later call returns the
/// stored value unchanged.
pub struct StateTokenManager {
    store: Arc<dyn KeyValueStore>,
    token_length: usize,
}

impl StateTokenManager {
    /// `token_length` is clamped to at least one character.
    pub fn new(store: Arc<dyn KeyValueStore>, token_length: usize) -> Self {
        Self {
            store,
            token_length: token_length.max(1),
        }
    }

    /// The persisted token, if one was ever created.
    pub fn current(&self) -> Option<String> {
        self.store.get(STATE_TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn get_or_create_token(&self) -> Result<String, FocusError> {
        if let Some(token) = self.current() {
            debug!("Reusing persisted state token");
            return Ok(token);
        }
        let token = generate_token(self.token_length);
        self.store.set(STATE_TOKEN_KEY, &token)?;
        info!(len = token.len(), "Generated and persisted new state token");
        Ok(token)
    }
}
