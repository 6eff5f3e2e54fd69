//! Random identifiers from the operating system's CSPRNG.

use rand::rngs::OsRng;
use rand::RngCore;

const ALPHANUMERIC: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Generate a random (version 4) UUID in canonical 8-4-4-4-12 form.
pub fn new_uuid() -> Result<String, rand::Error> {
    let mut bytes = [0u8; 16];
    OsRng.try_fill_bytes(&mut bytes)?;

    // Builder forces the RFC 4122 variant bits and version nibble.
    let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
    Ok(uuid.hyphenated().to_string())
}

/// Generate a string of `len` characters drawn from `[0-9A-Za-z]`.
///
/// Each random byte is reduced modulo 62, so the first 8 symbols are very
/// slightly more likely than the rest. Not for secrets that need uniformity.
pub fn new_random_string(len: usize) -> Result<String, rand::Error> {
    let mut bytes = vec![0u8; len];
    OsRng.try_fill_bytes(&mut bytes)?;

    Ok(bytes
        .into_iter()
        .map(|b| ALPHANUMERIC[b as usize % ALPHANUMERIC.len()] as char)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_shape() {
        for _ in 0..10_000 {
            let id = new_uuid().unwrap();
            assert_eq!(id.len(), 36);

            let parts: Vec<&str> = id.split('-').collect();
            let lengths: Vec<usize> = parts.iter().map(|p| p.len()).collect();
            assert_eq!(lengths, vec![8, 4, 4, 4, 12]);
            assert!(id
                .chars()
                .all(|c| c == '-' || c.is_ascii_digit() || ('a'..='f').contains(&c)));

            // version nibble
            assert_eq!(&parts[2][..1], "4");
            // variant 10xx
            assert!(matches!(&parts[3][..1], "8" | "9" | "a" | "b"), "{}", id);
        }
    }

    #[test]
    fn test_uuids_differ() {
        assert_ne!(new_uuid().unwrap(), new_uuid().unwrap());
    }

    #[test]
    fn test_random_string_length_and_alphabet() {
        for len in [0, 1, 16, 62, 257] {
            let s = new_random_string(len).unwrap();
            assert_eq!(s.len(), len);
            assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_random_string_covers_alphabet() {
        // Modulo mapping is biased toward '0'..='7' (256 % 62 == 8) but
        // every symbol is still reachable.
        let s = new_random_string(20_000).unwrap();
        for &symbol in ALPHANUMERIC.iter() {
            assert!(s.as_bytes().contains(&symbol), "missing {}", symbol as char);
        }
    }
}
