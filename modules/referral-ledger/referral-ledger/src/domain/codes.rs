//! Random token generation and collision-retrying allocation.
//!
//! Referral codes and invite codes are opaque random tokens whose uniqueness is
//! enforced by the store. Allocation generates a token, attempts the insert and,
//! on a uniqueness conflict for the token column, retries with a fresh token.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use rand::Rng;
use tracing::{debug, warn};

use super::error::DomainError;

/// Unambiguous uppercase alphabet: no `0`/`O` or `1`/`I`.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Source of candidate tokens.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// Thread-local CSPRNG over [`CODE_ALPHABET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokens;

impl TokenGenerator for RandomTokens {
    fn generate(&self, length: usize) -> String {
        let mut rng = rand::rng();
        (0..length)
            .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
            .collect()
    }
}

/// Yields queued tokens first, then falls back to random ones.
///
/// Lets callers force collisions deterministically.
#[derive(Debug, Default)]
pub struct ScriptedTokens {
    queue: Mutex<VecDeque<String>>,
}

impl ScriptedTokens {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: Mutex::new(tokens.into_iter().map(Into::into).collect()),
        }
    }
}

impl TokenGenerator for ScriptedTokens {
    fn generate(&self, length: usize) -> String {
        let next = match self.queue.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or_else(|| RandomTokens.generate(length))
    }
}

/// Run `insert` with fresh tokens until it stops colliding on `column`.
///
/// Any error other than a uniqueness conflict on `column` is returned as is.
///
/// # Errors
///
/// `DomainError::CodeAllocationExhausted` after `max_attempts` collisions.
pub async fn allocate_unique<T, F, Fut>(
    tokens: &dyn TokenGenerator,
    length: usize,
    max_attempts: u32,
    column: &str,
    mut insert: F,
) -> Result<T, DomainError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    for attempt in 1..=max_attempts {
        let token = tokens.generate(length);
        match insert(token).await {
            Err(e) if e.is_unique_violation_on(column) => {
                debug!(attempt, column, "Token collision, retrying with a fresh token");
            }
            other => return other,
        }
    }

    warn!(attempts = max_attempts, column, "Token allocation exhausted");
    Err(DomainError::CodeAllocationExhausted {
        attempts: max_attempts,
    })
}
