use bytes::Bytes;
use sha1::{Digest, Sha1};

use crate::error::Result;

use super::{AuthMechanism, Authenticator};

fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn xor(a: &[u8; 20], b: &[u8; 20]) -> [u8; 20] {
    let mut out = [0u8; 20];
    for i in 0..20 {
        out[i] = a[i] ^ b[i];
    }
    out
}

/// `MYSQL41`: the native-password scramble, computed once the
/// server's nonce arrives via `AuthenticateContinueReply`. No data is sent
/// with `AuthenticateStart` — the scramble cannot be computed before the
/// server challenges with its nonce.
pub struct Mysql41Authenticator {
    schema: String,
    user: String,
    password: String,
}

impl Mysql41Authenticator {
    pub fn new(user: &str, password: &str, schema: Option<&str>) -> Self {
        Self {
            schema: schema.unwrap_or_default().to_string(),
            user: user.to_string(),
            password: password.to_string(),
        }
    }
}

impl Authenticator for Mysql41Authenticator {
    fn mechanism(&self) -> AuthMechanism {
        AuthMechanism::Mysql41
    }

    fn initial_response(&self) -> Bytes {
        Bytes::new()
    }

    fn handle_challenge(&self, challenge: &[u8]) -> Result<Bytes> {
        let stage1 = sha1(self.password.as_bytes());
        let stage2 = sha1(&stage1);
        let mut nonced = Vec::with_capacity(challenge.len() + stage2.len());
        nonced.extend_from_slice(challenge);
        nonced.extend_from_slice(&stage2);
        let stage3 = sha1(&nonced);
        let digest = xor(&stage1, &stage3);

        let mut out = Vec::with_capacity(self.schema.len() + self.user.len() + 43);
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
        let auth = Mysql41Authenticator::new("root", "secret", Some("test"));
        let nonce = b"01234567890123456789";
        let first = auth.handle_challenge(nonce).unwrap();
        let second = auth.handle_challenge(nonce).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(b"test\0root\0*"));
        assert_eq!(first.len(), "test\0root\0*".len() + 40);
    }

    #[test]
    fn different_nonces_produce_different_digests() {
        let auth = Mysql41Authenticator::new("root", "secret", Some("test"));
        let first = auth.handle_challenge(b"00000000000000000000").unwrap();
        let second = auth.handle_challenge(b"11111111111111111111").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn initial_response_is_empty() {
        let auth = Mysql41Authenticator::new("root", "secret", None);
        assert!(auth.initial_response().is_empty());
    }
}
