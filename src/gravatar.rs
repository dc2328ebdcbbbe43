use sha2::{Digest, Sha256};

const GRAVATAR_BASE: &str = "https://www.gravatar.com/avatar/";

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// SHA-256 of the trimmed, lower-cased email.
pub fn email_digest(email: &str) -> [u8; 32] {
    let digest = Sha256::digest(normalize(email).as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    bytes
}

/// External avatar URL of `email`, `size` pixels wide.
pub fn url(email: &str, size: u32) -> String {
    let hash = hex::encode(email_digest(email));
    format!("{GRAVATAR_BASE}{hash}?s={size}&d=identicon")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_uses_hex_sha256_of_normalized_email() {
        let url = url(" Ada@Example.COM ", 256);
        assert_eq!(
            url,
            format!(
                "https://www.gravatar.com/avatar/{}?s=256&d=identicon",
                hex::encode(Sha256::digest(b"ada@example.com"))
            )
        );
    }

    #[test]
    fn known_digest() {
        // sha256("") is a well known constant
        assert_eq!(
            hex::encode(email_digest("   ")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
