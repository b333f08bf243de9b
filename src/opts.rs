//! Connection configuration: `Endpoint` and `SessionProperties`.
//!
//! Modeled after the reference stack's `Opts`: a plain `Default`-able struct
//! plus a validating builder, rather than a URI parser — URI parsing is an
//! explicit external collaborator.

use std::sync::Arc;

use crate::auth::AuthMechanism;
use crate::error::{Error, Result};
use crate::socket::{SocketFactory, TcpSocketFactory};

/// One candidate server address with an optional explicit priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub socket_path: Option<String>,
    pub priority: Option<u8>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            socket_path: None,
            priority: None,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// TLS parameters passed through to the TLS layer verbatim; the core never
/// interprets their contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SslOptions {
    pub ca_file: Option<String>,
    pub verify_server_cert: bool,
}

/// Full connection configuration consumed by the Router.
#[derive(Clone)]
pub struct SessionProperties {
    pub user: String,
    pub password: String,
    pub schema: Option<String>,
    pub ssl_enabled: bool,
    pub ssl_options: SslOptions,
    pub endpoints: Vec<Endpoint>,
    pub auth_mechanism_preference: Vec<AuthMechanism>,
    pub socket_factory: Arc<dyn SocketFactory>,
}

impl std::fmt::Debug for SessionProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProperties")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("schema", &self.schema)
            .field("ssl_enabled", &self.ssl_enabled)
            .field("ssl_options", &self.ssl_options)
            .field("endpoints", &self.endpoints)
            .field("auth_mechanism_preference", &self.auth_mechanism_preference)
            .finish()
    }
}

impl Default for SessionProperties {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: String::new(),
            schema: None,
            ssl_enabled: false,
            ssl_options: SslOptions::default(),
            endpoints: Vec::new(),
            auth_mechanism_preference: vec![
                AuthMechanism::Plain,
                AuthMechanism::Mysql41,
                AuthMechanism::Sha256Memory,
            ],
            socket_factory: Arc::new(TcpSocketFactory),
        }
    }
}

impl SessionProperties {
    pub fn builder() -> SessionPropertiesBuilder {
        SessionPropertiesBuilder::default()
    }
}

/// Validates the boundary behaviors at construction time, rather than
/// deferring them to a connect-time surprise.
#[derive(Debug, Clone, Default)]
pub struct SessionPropertiesBuilder {
    props: SessionProperties,
}

impl SessionPropertiesBuilder {
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.props.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.props.password = password.into();
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.props.schema = Some(schema.into());
        self
    }

    pub fn ssl(mut self, ssl_options: SslOptions) -> Self {
        self.props.ssl_enabled = true;
        self.props.ssl_options = ssl_options;
        self
    }

    /// Override the default `TcpSocketFactory`, e.g. with a scripted
    /// in-memory factory in tests.
    pub fn socket_factory(mut self, factory: impl SocketFactory + 'static) -> Self {
        self.props.socket_factory = Arc::new(factory);
        self
    }

    pub fn endpoint(mut self, host: impl Into<String>, port: u16) -> Result<Self> {
        if !(1..=65535).contains(&port) {
            return Err(Error::BadConfig(
                "Port must be between 0 and 65536".to_string(),
            ));
        }
        self.props.endpoints.push(Endpoint::new(host, port));
        Ok(self)
    }

    pub fn endpoint_with_priority(
        mut self,
        host: impl Into<String>,
        port: u16,
        priority: u8,
    ) -> Result<Self> {
        if !(1..=65535).contains(&port) {
            return Err(Error::BadConfig(
                "Port must be between 0 and 65536".to_string(),
            ));
        }
        if !(0..=100).contains(&priority) {
            return Err(Error::BadConfig(
                "The priorities must be between 0 and 100".to_string(),
            ));
        }
        self.props
            .endpoints
            .push(Endpoint::new(host, port).with_priority(priority));
        Ok(self)
    }

    pub fn build(self) -> Result<SessionProperties> {
        let props = self.props;

        let explicit = props
            .endpoints
            .iter()
            .filter(|e| e.priority.is_some())
            .count();
        if explicit != 0 && explicit != props.endpoints.len() {
            return Err(Error::BadConfig(
                "You must either assign no priority to any of the routers or give a priority for every router"
                    .to_string(),
            ));
        }

        Ok(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_endpoints_and_prefers_plain_first() {
        let props = SessionProperties::default();
        assert!(props.endpoints.is_empty());
        assert_eq!(props.auth_mechanism_preference[0], AuthMechanism::Plain);
    }

    #[test]
    fn rejects_port_zero() {
        let err = SessionProperties::builder().endpoint("foo", 0).unwrap_err();
        assert!(err.to_string().contains("Port must be between 0 and 65536"));
    }

    #[test]
    fn rejects_priority_out_of_range() {
        let err = SessionProperties::builder()
            .endpoint_with_priority("foo", 1, 101)
            .unwrap_err();
        assert!(err.to_string().contains("priorities must be between 0 and 100"));
    }

    #[test]
    fn rejects_mixed_priority_list() {
        let err = SessionProperties::builder()
            .endpoint("foo", 1)
            .unwrap()
            .endpoint_with_priority("bar", 2, 50)
            .unwrap()
            .build()
            .unwrap_err();
        assert!(
            err.to_string()
                .contains("either assign no priority to any of the routers")
        );
    }

    #[test]
    fn accepts_fully_prioritized_list() {
        let props = SessionProperties::builder()
            .endpoint_with_priority("foo", 1, 100)
            .unwrap()
            .endpoint_with_priority("bar", 2, 50)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(props.endpoints.len(), 2);
    }

    #[test]
    fn accepts_fully_unprioritized_list() {
        let props = SessionProperties::builder()
            .endpoint("foo", 1)
            .unwrap()
            .endpoint("bar", 2)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(props.endpoints.len(), 2);
    }
}
