//! Password hashing with bcrypt.
//!
//! Hashes are stored as modular-crypt strings (`$2b$<cost>$...`), so the
//! cost can be raised later without invalidating existing hashes.

/// Work factor for new hashes.
#[cfg(not(test))]
pub const PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

/// Lowest cost bcrypt accepts.
#[cfg(test)]
pub const PASSWORD_COST: u32 = 4;

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, PASSWORD_COST)
}

/// Check a password against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match bcrypt::verify(password, stored) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!("Unreadable password hash: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$2b$04$"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("correct horsE", &hash));
    }

    #[test]
    fn test_salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_stored_cost_is_respected() {
        let hash = bcrypt::hash("pw", 5).unwrap();
        assert!(hash.starts_with("$2b$05$"));
        assert!(verify_password("pw", &hash));
    }

    #[test]
    fn test_malformed_hashes_fail() {
        for stored in [
            "",
            "plain",
            "sha256$10000$00$00",
            "$2b$xx$abcdefghijklmnopqrstuv",
            "$2b$04$tooshort",
        ] {
            assert!(!verify_password("pw", stored), "{stored}");
        }
    }
}
