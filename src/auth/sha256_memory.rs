use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::error::Result;

use super::{AuthMechanism, Authenticator};

fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn xor(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = a[i] ^ b[i];
    }
    out
}

/// `SHA256_MEMORY`: the same nonce-scramble shape as `MYSQL41`
/// but over the server's cached SHA256 digest, letting a server that already
/// holds `SHA256(SHA256(password))` in memory skip a disk round-trip.
pub struct Sha256MemoryAuthenticator {
    schema: String,
    user: String,
    password: String,
}

impl Sha256MemoryAuthenticator {
    pub fn new(user: &str, password: &str, schema: Option<&str>) -> Self {
        Self {
            schema: schema.unwrap_or_default().to_string(),
            user: user.to_string(),
            password: password.to_string(),
        }
    }
}

impl Authenticator for Sha256MemoryAuthenticator {
    fn mechanism(&self) -> AuthMechanism {
        AuthMechanism::Sha256Memory
    }

    fn initial_response(&self) -> Bytes {
        Bytes::new()
    }

    fn handle_challenge(&self, challenge: &[u8]) -> Result<Bytes> {
        let stage1 = sha256(self.password.as_bytes());
        let stage2 = sha256(&stage1);
        let stage3 = sha256(&stage2);
        let mut nonced = Vec::with_capacity(stage3.len() + challenge.len());
        nonced.extend_from_slice(&stage3);
        nonced.extend_from_slice(challenge);
        let stage4 = sha256(&nonced);
        let digest = xor(&stage1, &stage4);

        let mut out = Vec::with_capacity(self.schema.len() + self.user.len() + 67);
        out.extend_from_slice(self.schema.as_bytes());
        out.push(0);
        out.extend_from_slice(self.user.as_bytes());
        out.push(0);
        out.push(b'*');
        for byte in digest {
            out.extend_from_slice(format!("{byte:02X}").as_bytes());
        }
        Ok(Bytes::from(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_response_is_deterministic_for_the_same_nonce() {
        let auth = Sha256MemoryAuthenticator::new("root", "secret", Some("test"));
        let nonce = b"abcdefghij0123456789";
        let first = auth.handle_challenge(nonce).unwrap();
        let second = auth.handle_challenge(nonce).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(b"test\0root\0*"));
        assert_eq!(first.len(), "test\0root\0*".len() + 64);
    }

    #[test]
    fn different_passwords_produce_different_digests() {
        let a = Sha256MemoryAuthenticator::new("root", "secret", Some("test"));
        let b = Sha256MemoryAuthenticator::new("root", "other", Some("test"));
        let nonce = b"abcdefghij0123456789";
        assert_ne!(a.handle_challenge(nonce).unwrap(), b.handle_challenge(nonce).unwrap());
    }
}
