//! Protocol State Machine: drives one freshly-acquired
//! [`Connection`] from `Fresh` through capability negotiation, an optional
//! TLS upgrade, and authentication, ending in `Ready`. Mirrors the reference
//! stack's pattern of a small step function consumed by a `loop { read;
//! drive; match }` rather than a hand-written table-driven dispatcher.

use bytes::Bytes;
use tracing::instrument;

use crate::auth::{AuthMechanism, Authenticator};
use crate::connection::Connection;
use crate::constant::MessageType;
use crate::error::{Error, Result};
use crate::opts::{Endpoint, SessionProperties};
use crate::protocol::control::{
    decode_auth_challenge, decode_capabilities, AuthenticateContinue, AuthenticateStart,
    Capabilities, CapabilitiesSetTls, CapabilityValue, ErrorPayload,
};
use crate::protocol::Message;

/// Everything `Ready` needs carried forward into the Session.
pub struct Negotiated {
    pub connection: Connection,
    pub capabilities: Capabilities,
}

#[instrument(skip_all, fields(ssl = props.ssl_enabled))]
pub async fn negotiate(
    mut connection: Connection,
    props: &SessionProperties,
    endpoint: &Endpoint,
) -> Result<Negotiated> {
    let mut capabilities = request_capabilities(&mut connection).await?;

    if props.ssl_enabled {
        secure(&mut connection).await?;
        connection = upgrade_tls(connection, props, endpoint).await?;
        // Post-handshake CapabilitiesGet is authoritative and replaces the
        // pre-handshake map entirely.
        capabilities = request_capabilities(&mut connection).await?;
    }

    authenticate(&mut connection, props, &capabilities).await?;

    tracing::debug!("session ready");
    Ok(Negotiated {
        connection,
        capabilities,
    })
}

#[instrument(skip_all)]
async fn request_capabilities(connection: &mut Connection) -> Result<Capabilities> {
    connection
        .send(Message::new(MessageType::ConnectionCapabilitiesGet, Bytes::new()))
        .await?;

    let reply = expect_reply(connection).await?;
    match reply.message_type() {
        Some(MessageType::Capabilities) => decode_capabilities(&reply.payload),
        Some(MessageType::Error) => {
            let err = ErrorPayload::decode(&reply.payload)?;
            connection.close().await.ok();
            Err(Error::CapabilityError(err.message))
        }
        _ => {
            connection.close().await.ok();
            Err(Error::ProtocolError(
                "unexpected reply to ConnectionCapabilitiesGet".to_string(),
            ))
        }
    }
}

#[instrument(skip_all)]
async fn secure(connection: &mut Connection) -> Result<()> {
    connection
        .send(Message::new(
            MessageType::ConnectionCapabilitiesSet,
            CapabilitiesSetTls { tls: true }.encode(),
        ))
        .await?;

    let reply = expect_reply(connection).await?;
    match reply.message_type() {
        Some(MessageType::Ok) => Ok(()),
        Some(MessageType::Error) => {
            let err = ErrorPayload::decode(&reply.payload)?;
            connection.close().await.ok();
            Err(Error::TlsError(err.message))
        }
        _ => {
            connection.close().await.ok();
            Err(Error::ProtocolError(
                "unexpected reply to ConnectionCapabilitiesSet{tls}".to_string(),
            ))
        }
    }
}

#[cfg(feature = "tls")]
#[instrument(skip_all)]
async fn upgrade_tls(connection: Connection, props: &SessionProperties, endpoint: &Endpoint) -> Result<Connection> {
    let mut builder = native_tls::TlsConnector::builder();
    if !props.ssl_options.verify_server_cert {
        builder.danger_accept_invalid_certs(true);
    }
    let connector = builder
        .build()
        .map_err(|err| Error::TlsError(err.to_string()))?;
    let connector = tokio_native_tls::TlsConnector::from(connector);

    let (stream, buffers) = connection.into_parts();
    let tls_stream = connector
        .connect(endpoint.host.as_str(), stream)
        .await
        .map_err(|err| Error::TlsError(err.to_string()))?;
    Ok(Connection::from_parts(Box::new(tls_stream), buffers))
}

#[cfg(not(feature = "tls"))]
#[instrument(skip_all)]
async fn upgrade_tls(
    _connection: Connection,
    _props: &SessionProperties,
    _endpoint: &Endpoint,
) -> Result<Connection> {
    Err(Error::TlsError(
        "TLS was requested but this build was compiled without the `tls` feature".to_string(),
    ))
}

#[instrument(skip_all)]
async fn authenticate(
    connection: &mut Connection,
    props: &SessionProperties,
    capabilities: &Capabilities,
) -> Result<()> {
    let offered = advertised_mechanisms(capabilities);

    let mechanism = match props
        .auth_mechanism_preference
        .iter()
        .find(|candidate| offered.iter().any(|name| name.as_str() == candidate.name()))
        .copied()
    {
        Some(mechanism) => mechanism,
        None => {
            connection.close().await.ok();
            return Err(Error::AuthMechanismUnsupported { offered });
        }
    };

    let authenticator: Box<dyn Authenticator> =
        mechanism.build(&props.user, &props.password, props.schema.as_deref());

    connection
        .send(Message::new(
            MessageType::AuthenticateStart,
            AuthenticateStart {
                mechanism: mechanism.name().to_string(),
                auth_data: authenticator.initial_response(),
            }
            .encode(),
        ))
        .await?;

    loop {
        let reply = expect_reply(connection).await?;
        match reply.message_type() {
            Some(MessageType::AuthenticateOk) => return Ok(()),
            Some(MessageType::AuthenticateContinueReply) => {
                let challenge = decode_auth_challenge(&reply.payload)?;
                let response = authenticator.handle_challenge(&challenge)?;
                connection
                    .send(Message::new(
                        MessageType::AuthenticateContinue,
                        AuthenticateContinue { auth_data: response }.encode(),
                    ))
                    .await?;
            }
            Some(MessageType::Error) => {
                let err = ErrorPayload::decode(&reply.payload)?;
                connection.close().await.ok();
                return Err(Error::AuthServerError {
                    code: err.code,
                    message: err.message,
                });
            }
            _ => {
                connection.close().await.ok();
                return Err(Error::ProtocolError(
                    "unexpected reply during authentication".to_string(),
                ));
            }
        }
    }
}

fn advertised_mechanisms(capabilities: &Capabilities) -> Vec<String> {
    match capabilities.get(crate::constant::CAPABILITY_AUTH_MECHANISMS) {
        Some(CapabilityValue::StrList(names)) => names.clone(),
        Some(CapabilityValue::Str(name)) => vec![name.clone()],
        _ => vec![AuthMechanism::Plain.name().to_string()],
    }
}

async fn expect_reply(connection: &mut Connection) -> Result<Message> {
    connection
        .receive()
        .await?
        .ok_or_else(|| Error::ConnectionLost(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertised_mechanisms_reads_the_strlist_capability() {
        let mut caps = Capabilities::new();
        caps.insert(
            crate::constant::CAPABILITY_AUTH_MECHANISMS.to_string(),
            CapabilityValue::StrList(vec!["PLAIN".to_string(), "MYSQL41".to_string()]),
        );
        assert_eq!(advertised_mechanisms(&caps), vec!["PLAIN", "MYSQL41"]);
    }

    #[test]
    fn missing_capability_falls_back_to_plain() {
        let caps = Capabilities::new();
        assert_eq!(advertised_mechanisms(&caps), vec!["PLAIN"]);
    }
}
