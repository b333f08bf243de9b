use bytes::Bytes;

use crate::error::{Error, Result};

use super::{AuthMechanism, Authenticator};

/// `PLAIN`: a single `\0`-joined `schema\0user\0password` frame, never
/// challenged by the server.
pub struct PlainAuthenticator {
    schema: String,
    user: String,
    password: String,
}

impl PlainAuthenticator {
    pub fn new(user: &str, password: &str, schema: Option<&str>) -> Self {
        Self {
            schema: schema.unwrap_or_default().to_string(),
            user: user.to_string(),
            password: password.to_string(),
        }
    }
}

impl Authenticator for PlainAuthenticator {
    fn mechanism(&self) -> AuthMechanism {
        AuthMechanism::Plain
    }

    fn initial_response(&self) -> Bytes {
        let mut out = Vec::with_capacity(self.schema.len() + self.user.len() + self.password.len() + 2);
        out.extend_from_slice(self.schema.as_bytes());
        out.push(0);
        out.extend_from_slice(self.user.as_bytes());
        out.push(0);
        out.extend_from_slice(self.password.as_bytes());
        Bytes::from(out)
    }

    fn handle_challenge(&self, _challenge: &[u8]) -> Result<Bytes> {
        Err(Error::ProtocolError(
            "PLAIN does not expect a server challenge".to_string(),
        ))
    }
}
