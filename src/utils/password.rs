use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2_sha256";
const SALT_LENGTH: usize = 16;
const KEY_LENGTH: usize = 32;

/// Hash un mot de passe avec PBKDF2-HMAC-SHA256 et un salt aléatoire.
/// Format: `pbkdf2_sha256$iterations$salt$hash` (base64 URL-safe sans padding)
pub fn hash_password(password: &str, iterations: u32) -> Result<String, String> {
    if iterations == 0 {
        return Err("Iteration count must be positive".to_string());
    }

    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill(&mut salt);

    let mut key = [0u8; KEY_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut key);

    Ok(format!(
        "{}${}${}${}",
        SCHEME,
        iterations,
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(key)
    ))
}

/// Vérifie un mot de passe contre un hash produit par `hash_password`.
/// Les itérations sont lues depuis le hash stocké.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, String> {
    let parts: Vec<&str> = stored_hash.split('$').collect();
    let [scheme, iterations, salt, hash] = parts.as_slice() else {
        return Err("Invalid hash format".to_string());
    };

    if *scheme != SCHEME {
        return Err(format!("Unsupported hash scheme: {}", scheme));
    }

    let iterations = iterations
        .parse::<u32>()
        .map_err(|_| "Invalid iterations".to_string())?;
    let salt = URL_SAFE_NO_PAD
        .decode(salt)
        .map_err(|_| "Invalid salt encoding".to_string())?;
    let expected = URL_SAFE_NO_PAD
        .decode(hash)
        .map_err(|_| "Invalid hash encoding".to_string())?;

    let mut computed = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut computed);

    // Comparaison en temps constant
    Ok(computed.as_slice().ct_eq(expected.as_slice()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn test_hash_is_not_plaintext_and_verifies() {
        let hash = hash_password("hunter22", FAST).unwrap();

        assert_ne!(hash, "hunter22");
        assert!(!hash.contains("hunter22"));
        assert!(hash.starts_with("pbkdf2_sha256$1000$"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let a = hash_password("same-password", FAST).unwrap();
        let b = hash_password("same-password", FAST).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-hash").is_err());
        assert!(verify_password("x", "md5$1$abc$def").is_err());
        assert!(verify_password("x", "pbkdf2_sha256$many$abc$def").is_err());
    }

    #[test]
    fn test_tampered_hash_does_not_verify() {
        let hash = hash_password("hunter22", FAST).unwrap();
        let (prefix, key) = hash.rsplit_once('$').unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(key).unwrap();
        bytes[0] ^= 0x01;
        let tampered = format!("{}${}", prefix, URL_SAFE_NO_PAD.encode(&bytes));
        assert!(!verify_password("hunter22", &tampered).unwrap());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        assert!(hash_password("x", 0).is_err());
    }
}
