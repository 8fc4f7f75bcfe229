use std::collections::HashMap;
use std::sync::Arc;

use orbit_shared::{ChannelId, OutboundEnvelope, ProtocolError};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

/// Write half of a channel's outbound queue. The connection's writer task
/// owns the matching receiver; once that task ends the sender reports closed.
pub type ChannelSender = mpsc::UnboundedSender<String>;
pub type ChannelReceiver = mpsc::UnboundedReceiver<String>;

/// Fresh outbound queue for one channel.
pub fn channel_queue() -> (ChannelSender, ChannelReceiver) {
    mpsc::unbounded_channel()
}

/// Registry of live real-time channels and the fan-out primitive over them.
#[derive(Clone, Default)]
pub struct BroadcastHub {
    channels: Arc<RwLock<HashMap<ChannelId, ChannelSender>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, id: ChannelId, sender: ChannelSender) {
        let mut channels = self.channels.write().await;
        channels.insert(id, sender);

        info!(
            channel = %id,
            channels = channels.len(),
            "Channel registered"
        );
    }

    /// Remove a channel. Returns `false` if it was not registered.
    pub async fn unregister(&self, id: &ChannelId) -> bool {
        let mut channels = self.channels.write().await;
        let removed = channels.remove(id).is_some();

        if removed {
            info!(
                channel = %id,
                channels = channels.len(),
                "Channel unregistered"
            );
        }
        removed
    }

    /// Queue `payload` on every registered channel whose transport is still
    /// open. Closed channels are skipped. Returns the number of deliveries.
    pub async fn broadcast(&self, payload: &str) -> usize {
        let channels = self.channels.read().await;
        let mut delivered = 0;

        for (id, sender) in channels.iter() {
            if sender.is_closed() {
                debug!(channel = %id, "Skipping closed channel");
                continue;
            }
            if sender.send(payload.to_string()).is_ok() {
                delivered += 1;
            } else {
                debug!(channel = %id, "Channel closed during broadcast");
            }
        }

        debug!(delivered, registered = channels.len(), "Broadcast complete");
        delivered
    }

    pub async fn broadcast_envelope(
        &self,
        envelope: &OutboundEnvelope,
    ) -> Result<usize, ProtocolError> {
        let payload = envelope.to_json()?;
        Ok(self.broadcast(&payload).await)
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Drop entries whose transport closed without unregistering.
    pub async fn prune_closed(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, sender| !sender.is_closed());
        let pruned = before - channels.len();

        if pruned > 0 {
            info!(pruned, channels = channels.len(), "Pruned closed channels");
        }
        pruned
    }
}
