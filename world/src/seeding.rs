use mazecrawl_core::SessionId;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

/// Random source shared by generation and runtime mutations.
pub(crate) type WorldRng = ChaCha8Rng;

/// Derives the 64-bit RNG seed for a world. Text seeds are hashed so that any
/// string reproduces the same map; missing seeds draw from the OS.
pub(crate) fn world_seed(seed: Option<&str>) -> u64 {
    match seed {
        Some(text) => {
            let mut hasher = Sha256::new();
            hasher.update(b"mazecrawl.world");
            hasher.update(text.as_bytes());
            finalize(hasher)
        }
        None => rand::random(),
    }
}

pub(crate) fn rng_from_seed(seed: u64) -> WorldRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Stable hash of a session identifier, used for fallback spawn slots.
pub(crate) fn session_hash(session: &SessionId) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(b"mazecrawl.session");
    hasher.update(session.as_str().as_bytes());
    finalize(hasher)
}

fn finalize(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_seeds_are_stable() {
        assert_eq!(world_seed(Some("test1")), world_seed(Some("test1")));
        assert_ne!(world_seed(Some("test1")), world_seed(Some("test2")));
    }

    #[test]
    fn session_hash_depends_only_on_the_id() {
        let first = session_hash(&SessionId::new("alpha"));
        let second = session_hash(&SessionId::new("alpha"));
        assert_eq!(first, second);
        assert_ne!(first, session_hash(&SessionId::new("beta")));
    }
}
