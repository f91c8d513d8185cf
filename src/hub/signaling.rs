use tracing::debug;

use crate::hub::connections::ConnectionRegistry;
use crate::models::{ConnId, ServerEvent};

/// WebRTC negotiation payload kinds we relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

/// Point-to-point relay of opaque signaling payloads.
///
/// Content-agnostic: the payload is forwarded without inspection, stamped
/// with the sender's connection id so the peer can answer. If the target
/// is not connected the message is silently dropped; signaling is
/// best-effort with no queuing and no error to the sender.
pub fn relay(
    conns: &ConnectionRegistry,
    from: ConnId,
    to: ConnId,
    kind: SignalKind,
    payload: serde_json::Value,
) {
    let event = match kind {
        SignalKind::Offer => ServerEvent::WebrtcOffer { from, payload },
        SignalKind::Answer => ServerEvent::WebrtcAnswer { from, payload },
        SignalKind::IceCandidate => ServerEvent::WebrtcIceCandidate { from, payload },
    };
    if !conns.send_to(to, event) {
        debug!("Signaling target {} offline, dropped {:?}", to, kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Connection, Identity, Role};
    use serde_json::json;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn registered(
        conns: &mut ConnectionRegistry,
        user_id: &str,
    ) -> (ConnId, UnboundedReceiver<ServerEvent>) {
        let connection = Connection::new(Identity {
            user_id: user_id.to_string(),
            role: Role::Candidate,
        });
        let conn_id = connection.conn_id;
        let (tx, rx) = unbounded_channel();
        conns.register(connection, tx);
        (conn_id, rx)
    }

    #[test]
    fn offer_reaches_only_the_target() {
        let mut conns = ConnectionRegistry::new();
        let (sender, _rx_sender) = registered(&mut conns, "u-a");
        let (target, mut rx_target) = registered(&mut conns, "u-b");
        let (_other, mut rx_other) = registered(&mut conns, "u-c");

        let payload = json!({"sdp": "v=0..."});
        relay(&conns, sender, target, SignalKind::Offer, payload.clone());

        match rx_target.try_recv().unwrap() {
            ServerEvent::WebrtcOffer { from, payload: got } => {
                assert_eq!(from, sender);
                assert_eq!(got, payload);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(rx_other.try_recv().is_err());
    }

    #[test]
    fn offline_target_is_a_silent_drop() {
        let mut conns = ConnectionRegistry::new();
        let (sender, mut rx_sender) = registered(&mut conns, "u-a");

        relay(
            &conns,
            sender,
            uuid::Uuid::new_v4(),
            SignalKind::IceCandidate,
            json!({"candidate": "..."}),
        );

        // No error event surfaces to the sender.
        assert!(rx_sender.try_recv().is_err());
    }
}
