//! Entry id generation.

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub const ID_LENGTH: usize = 12;

/// Random `[A-Za-z0-9_-]{12}` id. Not cryptographically strong.
pub fn random_id() -> String {
    (0..ID_LENGTH)
        .map(|_| ALPHABET[fastrand::usize(..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_id_shape() {
        for _ in 0..100 {
            let id = random_id();
            assert_eq!(id.len(), ID_LENGTH);
            assert!(id.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(random_id(), random_id());
    }
}
