//! Chunk encryption for data at rest

use crate::VaultError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};

/// Stateless per-chunk codec. Uses AES-256-GCM for authenticated encryption;
/// each chunk gets a fresh random nonce, prepended to the ciphertext so a
/// chunk is self-contained on disk.
#[derive(Clone)]
pub struct ChunkCipher {
    cipher: Aes256Gcm,
}

impl ChunkCipher {
    /// Create a codec from raw 32-byte key (e.g. for tests; avoids env mutation).
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, VaultError> {
        if key_bytes.len() != 32 {
            return Err(VaultError::Crypto(
                "Encryption key must be 32 bytes (256 bits)".to_string(),
            ));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Create a codec from a base64-encoded 32-byte key, as supplied by
    /// configuration (`ENCRYPTION_KEY`).
    pub fn from_base64_key(key_str: &str) -> Result<Self, VaultError> {
        let key_bytes = general_purpose::STANDARD
            .decode(key_str)
            .map_err(|e| VaultError::Crypto(format!("Failed to decode encryption key: {}", e)))?;

        Self::from_key_bytes(&key_bytes)
    }

    /// Encrypt one chunk. Output layout is nonce (12 bytes) followed by the
    /// GCM ciphertext and tag.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| VaultError::Crypto(format!("Encryption failed: {}", e)))?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(combined)
    }

    /// Decrypt one chunk produced by [`encrypt`](Self::encrypt). Fails on
    /// truncated input or GCM authentication mismatch; no partial recovery.
    pub fn decrypt(&self, combined: &[u8]) -> Result<Vec<u8>, VaultError> {
        if combined.len() < 12 {
            return Err(VaultError::Crypto("Encrypted chunk too short".to_string()));
        }

        // Extract nonce (first 12 bytes) and ciphertext (rest)
        let nonce = Nonce::from_slice(&combined[..12]);
        let ciphertext = &combined[12..];

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| VaultError::Crypto(format!("Decryption failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> ChunkCipher {
        let test_key = b"01234567890123456789012345678901";
        ChunkCipher::from_key_bytes(test_key).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let cipher = test_cipher();
        let plaintext = b"chunk payload 12345";

        let encrypted = cipher.encrypt(plaintext).unwrap();
        assert_ne!(encrypted.as_slice(), plaintext.as_slice());

        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_empty_block_round_trip() {
        let cipher = test_cipher();

        let encrypted = cipher.encrypt(b"").unwrap();
        // Still carries nonce + GCM tag
        assert!(encrypted.len() >= 12 + 16);

        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_chunk_sized_block_round_trip() {
        let cipher = test_cipher();
        let plaintext = vec![0xabu8; 1024 * 1024];

        let encrypted = cipher.encrypt(&plaintext).unwrap();
        let decrypted = cipher.decrypt(&encrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_nonce_makes_ciphertext_unique() {
        let cipher = test_cipher();
        let a = cipher.encrypt(b"same bytes").unwrap();
        let b = cipher.encrypt(b"same bytes").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_decrypt_rejects_short_input() {
        let cipher = test_cipher();
        let err = cipher.decrypt(&[0u8; 5]).unwrap_err();
        assert!(matches!(err, VaultError::Crypto(_)));
    }

    #[test]
    fn test_decrypt_rejects_tampered_ciphertext() {
        let cipher = test_cipher();
        let mut encrypted = cipher.encrypt(b"authentic data").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0xff;

        assert!(matches!(
            cipher.decrypt(&encrypted),
            Err(VaultError::Crypto(_))
        ));
    }

    #[test]
    fn test_decrypt_with_wrong_key_fails() {
        let cipher = test_cipher();
        let other = ChunkCipher::from_key_bytes(b"10987654321098765432109876543210").unwrap();

        let encrypted = cipher.encrypt(b"secret").unwrap();
        assert!(matches!(other.decrypt(&encrypted), Err(VaultError::Crypto(_))));
    }

    #[test]
    fn test_rejects_wrong_key_length() {
        assert!(matches!(
            ChunkCipher::from_key_bytes(b"too short"),
            Err(VaultError::Crypto(_))
        ));
    }

    #[test]
    fn test_from_base64_key() {
        // "MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI=" decodes to 32 ASCII digits
        let cipher =
            ChunkCipher::from_base64_key("MTIzNDU2Nzg5MDEyMzQ1Njc4OTAxMjM0NTY3ODkwMTI=").unwrap();
        let encrypted = cipher.encrypt(b"via env key").unwrap();
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), b"via env key");

        assert!(ChunkCipher::from_base64_key("not-base64!!!").is_err());
    }
}
