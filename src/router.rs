//! Router / Failover Controller: holds the priority-ordered endpoint list,
//! drives connection attempts through the `SocketFactory`, and remembers
//! transient unavailability across `connect` calls.

use std::sync::Arc;

use tracing::instrument;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::opts::{Endpoint, SessionProperties};
use crate::protocol::control::Capabilities;
use crate::socket::SocketFactory;
use crate::state_machine::{self, Negotiated};

/// The outcome of a successful `Router::connect`: a `Ready` connection, its
/// frozen capabilities, and the endpoint that was actually reached (feeds
/// `Session::inspect() -> {dbUser, host, port}`).
pub struct Connected {
    pub connection: Connection,
    pub capabilities: Capabilities,
    pub endpoint: Endpoint,
}

pub struct Router {
    factory: Arc<dyn SocketFactory>,
    endpoints: Vec<Endpoint>,
    /// Priority-descending indices into `endpoints`, ties broken by list order.
    order: Vec<usize>,
    unavailable: Vec<bool>,
}

impl Router {
    pub fn new(factory: Arc<dyn SocketFactory>, endpoints: Vec<Endpoint>) -> Self {
        let mut order: Vec<usize> = (0..endpoints.len()).collect();
        order.sort_by(|&a, &b| {
            let pa = endpoints[a].priority.unwrap_or(0);
            let pb = endpoints[b].priority.unwrap_or(0);
            pb.cmp(&pa).then(a.cmp(&b))
        });
        let unavailable = vec![false; endpoints.len()];
        Self {
            factory,
            endpoints,
            order,
            unavailable,
        }
    }

    #[instrument(skip_all)]
    pub async fn connect(&mut self, props: &SessionProperties) -> Result<Connected> {
        if self.endpoints.is_empty() {
            return Err(Error::NoRoutersAvailable);
        }

        for &idx in &self.order {
            if self.unavailable[idx] {
                continue;
            }
            let endpoint = self.endpoints[idx].clone();

            match self.factory.connect(&endpoint).await {
                Ok(stream) => {
                    tracing::debug!(host = %endpoint.host, port = endpoint.port, "acquired transport");
                    let connection = Connection::new(stream);
                    // Negotiating/Securing/Authenticating failures are not
                    // routing problems: propagate as-is, without marking
                    // this endpoint unavailable.
                    let Negotiated {
                        connection,
                        capabilities,
                    } = state_machine::negotiate(connection, props, &endpoint).await?;
                    return Ok(Connected {
                        connection,
                        capabilities,
                        endpoint,
                    });
                }
                Err(err) if err.is_transient() => {
                    tracing::warn!(host = %endpoint.host, port = endpoint.port, error = %err, "endpoint unavailable, trying next");
                    self.unavailable[idx] = true;
                }
                Err(err) => return Err(err),
            }
        }

        // All endpoints exhausted: clear marks so the next attempt restarts
        // from the top of the list rather than remembering this exhaustion.
        self.unavailable.iter_mut().for_each(|mark| *mark = false);
        Err(Error::NoRoutersAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_order_is_descending_with_list_order_tiebreak() {
        let endpoints = vec![
            Endpoint::new("a", 1).with_priority(50),
            Endpoint::new("b", 2).with_priority(90),
            Endpoint::new("c", 3).with_priority(90),
        ];
        let router = Router::new(Arc::new(crate::socket::TcpSocketFactory), endpoints);
        assert_eq!(router.order, vec![1, 2, 0]);
    }

    #[test]
    fn unprioritized_list_keeps_declaration_order() {
        let endpoints = vec![Endpoint::new("a", 1), Endpoint::new("b", 2), Endpoint::new("c", 3)];
        let router = Router::new(Arc::new(crate::socket::TcpSocketFactory), endpoints);
        assert_eq!(router.order, vec![0, 1, 2]);
    }
}
