//! # Public identifier generation
//!
//! Registrations carry two randomly generated identifiers:
//! * the registration number, unique across every registration ever issued, and
//! * the display code, unique within one competition year, shown on public leaderboards.
//!
//! Candidates are drawn from alphabets large enough that collisions are vanishingly rare
//! (36^12 and 32^6 respectively), so a collision is handled by drawing again. The retry budget is
//! deliberately small: if ten consecutive candidates collide, the alphabet has been misconfigured
//! or the scope already holds an enormous collision set, and that must surface as an error rather
//! than a spin.
//!
//! Uniqueness is additionally enforced by database constraints. An insert that trips the
//! constraint despite a clean existence check (two allocators drew the same candidate
//! concurrently) is treated as a collision and retried, not as a fatal error.

use log::*;
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;

/// How many candidates to try before declaring the code space exhausted.
pub const MAX_CODE_ATTEMPTS: u32 = 10;

const REGISTRATION_NUMBER_PREFIX: &str = "REG-";
const REGISTRATION_NUMBER_LEN: usize = 12;

/// Display codes avoid `0/O` and `1/I`, since they are read aloud and retyped by entrants.
pub const DISPLAY_CODE_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
const DISPLAY_CODE_LEN: usize = 6;

#[derive(Debug, Clone, Error)]
pub enum CodeGenerationError {
    #[error("Could not find a free {scope} code after {attempts} attempts")]
    Exhausted { scope: String, attempts: u32 },
    #[error("Existence check failed: {0}")]
    LookupFailed(String),
}

/// A scope within which candidate codes are drawn and checked for collisions.
///
/// `exists` takes `&mut self` so implementations can borrow a live database connection (or
/// transaction) for the duration of the allocation.
#[allow(async_fn_in_trait)]
pub trait CodeSpace {
    /// Human-readable scope name, used in logs and in the exhaustion error.
    fn scope(&self) -> String;

    /// Draws a fresh random candidate.
    fn candidate(&self) -> String;

    async fn exists(&mut self, code: &str) -> Result<bool, CodeGenerationError>;
}

/// Draws candidates from `space` until one passes the existence check, up to `max_attempts`.
pub async fn generate_unique_code<S: CodeSpace>(space: &mut S, max_attempts: u32) -> Result<String, CodeGenerationError> {
    let scope = space.scope();
    for attempt in 1..=max_attempts {
        let candidate = space.candidate();
        if !space.exists(&candidate).await? {
            return Ok(candidate);
        }
        warn!("🎲️ Code collision in {scope} on attempt {attempt}: {candidate}");
    }
    error!("🎲️ Code space {scope} exhausted after {max_attempts} attempts. This indicates a configuration problem.");
    Err(CodeGenerationError::Exhausted { scope, attempts: max_attempts })
}

pub fn registration_number_candidate() -> String {
    let suffix: String =
        rand::thread_rng().sample_iter(&Alphanumeric).take(REGISTRATION_NUMBER_LEN).map(|c| (c as char).to_ascii_uppercase()).collect();
    format!("{REGISTRATION_NUMBER_PREFIX}{suffix}")
}

pub fn display_code_candidate() -> String {
    let mut rng = rand::thread_rng();
    (0..DISPLAY_CODE_LEN).map(|_| DISPLAY_CODE_ALPHABET[rng.gen_range(0..DISPLAY_CODE_ALPHABET.len())] as char).collect()
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    struct InMemorySpace {
        name: &'static str,
        taken: HashSet<String>,
    }

    impl CodeSpace for InMemorySpace {
        fn scope(&self) -> String {
            self.name.to_string()
        }

        fn candidate(&self) -> String {
            display_code_candidate()
        }

        async fn exists(&mut self, code: &str) -> Result<bool, CodeGenerationError> {
            Ok(self.taken.contains(code))
        }
    }

    /// Every candidate collides, so the generator must give up rather than spin.
    struct SaturatedSpace;

    impl CodeSpace for SaturatedSpace {
        fn scope(&self) -> String {
            "saturated".to_string()
        }

        fn candidate(&self) -> String {
            "AAAAAA".to_string()
        }

        async fn exists(&mut self, _code: &str) -> Result<bool, CodeGenerationError> {
            Ok(true)
        }
    }

    #[test]
    fn candidate_formats() {
        let reg = registration_number_candidate();
        assert!(reg.starts_with("REG-"));
        assert_eq!(reg.len(), 4 + 12);
        assert!(reg[4..].bytes().all(|b| b.is_ascii_digit() || b.is_ascii_uppercase()));

        let code = display_code_candidate();
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| DISPLAY_CODE_ALPHABET.contains(&b)));
    }

    #[tokio::test]
    async fn ten_thousand_codes_in_one_scope_are_unique() {
        let mut space = InMemorySpace { name: "load", taken: HashSet::new() };
        for _ in 0..10_000 {
            let code = generate_unique_code(&mut space, MAX_CODE_ATTEMPTS).await.expect("code space far from full");
            assert!(space.taken.insert(code), "generator returned a code that already existed");
        }
        assert_eq!(space.taken.len(), 10_000);
    }

    #[tokio::test]
    async fn exhaustion_is_surfaced_not_looped() {
        let err = generate_unique_code(&mut SaturatedSpace, MAX_CODE_ATTEMPTS).await.unwrap_err();
        match err {
            CodeGenerationError::Exhausted { scope, attempts } => {
                assert_eq!(scope, "saturated");
                assert_eq!(attempts, MAX_CODE_ATTEMPTS);
            },
            e => panic!("Expected exhaustion, got {e}"),
        }
    }

    #[tokio::test]
    async fn collisions_are_retried() {
        let mut space = InMemorySpace { name: "retry", taken: HashSet::new() };
        // Pre-occupy a big slice of the space; the generator should still find free codes.
        for i in 0..500 {
            space.taken.insert(format!("X{i:05}"));
        }
        let code = generate_unique_code(&mut space, MAX_CODE_ATTEMPTS).await.unwrap();
        assert!(!space.taken.contains(&code));
    }
}
