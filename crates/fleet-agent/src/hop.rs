//! The agent's view of its bridge.

use std::future::Future;

use fleet_bridge::BridgeClient;
use fleet_core::TaskId;
use fleet_protocol::TransportError;

/// Sends single-hop commands towards the vehicle.
///
/// `dispatch` resolves once the command is acknowledged as forwarded, or
/// fails with `Timeout` when no acknowledgment arrives within the
/// implementation's bound.  Arrival is observed separately, via telemetry.
pub trait HopDispatcher: Send + Sync + 'static {
    fn dispatch(&self, node: String) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Tell the bridge the mission the hops belonged to has finished.
    fn mission_complete(&self, _task: TaskId) -> impl Future<Output = Result<(), TransportError>> + Send {
        async { Ok(()) }
    }
}

impl HopDispatcher for BridgeClient {
    async fn dispatch(&self, node: String) -> Result<(), TransportError> {
        self.assign_hop(&node).await.map(|_| ())
    }

    async fn mission_complete(&self, task: TaskId) -> Result<(), TransportError> {
        BridgeClient::mission_complete(self, task.as_str()).await
    }
}
