//! Fan-out of server messages to connected sessions.
//!
//! Messages are encoded once and the shared line is queued on every
//! recipient's bounded outbound channel without waiting. A closed channel
//! means that connection is already going away; a full one means the peer
//! stopped reading and misses this line. Both are logged and skipped.

use crate::error::{Result, ServerError};
use crate::game::Hit;
use crate::sessions::{queue_line, send_message, Outbound};
use log::{debug, warn};
use shared::{EntityId, ServerMessage};
use std::sync::Arc;

/// Result of one fan-out
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    /// Recipients whose channel was closed
    pub failed: Vec<EntityId>,
    /// Recipients whose queue was full; they miss this message
    pub dropped: Vec<EntityId>,
}

/// Queues `message` on every recipient. Encoding fails only for unencodable payloads.
pub fn broadcast(recipients: &[(EntityId, Outbound)], message: &ServerMessage) -> Result<Delivery> {
    let line: Arc<str> = message.encode()?.into();
    let mut delivery = Delivery::default();

    for (id, outbound) in recipients {
        match queue_line(outbound, Arc::clone(&line)) {
            Ok(()) => delivery.delivered += 1,
            Err(ServerError::RecipientLagging(queued)) => {
                debug!("Dropping broadcast to {}: {} lines still queued", id, queued);
                delivery.dropped.push(id.clone());
            }
            Err(e) => {
                warn!("Dropping broadcast to {}: {}", id, e);
                delivery.failed.push(id.clone());
            }
        }
    }

    Ok(delivery)
}

/// Sends each hit's damage notice to the target alone.
pub fn deliver_damage(hits: &[Hit], recipients: &[(EntityId, Outbound)]) {
    for hit in hits {
        let Some((_, outbound)) = recipients.iter().find(|(id, _)| *id == hit.target_id) else {
            continue;
        };
        let message = ServerMessage::Damage { amount: hit.amount };
        if let Err(e) = send_message(outbound, &message) {
            warn!("Failed to notify {} of damage: {}", hit.target_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::{outbound_channel, Inbox, OUTBOUND_CAPACITY};

    fn recipient(name: &str) -> ((EntityId, Outbound), Inbox) {
        let (tx, rx) = outbound_channel();
        ((EntityId::from(name), tx), rx)
    }

    fn world_state() -> ServerMessage {
        ServerMessage::WorldState {
            players: vec![],
            projectiles: vec![],
        }
    }

    #[test]
    fn test_broadcast_reaches_everyone() {
        let (a, mut rx_a) = recipient("a");
        let (b, mut rx_b) = recipient("b");

        let delivery = broadcast(&[a, b], &world_state()).unwrap();

        assert_eq!(delivery.delivered, 2);
        assert!(delivery.failed.is_empty());
        let line_a = rx_a.try_recv().unwrap();
        let line_b = rx_b.try_recv().unwrap();
        assert_eq!(line_a, line_b);
        assert!(line_a.contains("\"world_state\""));
    }

    #[test]
    fn test_broadcast_skips_severed_recipient() {
        let (a, mut rx_a) = recipient("a");
        let (b, rx_b) = recipient("b");
        let (c, mut rx_c) = recipient("c");
        drop(rx_b);

        let delivery = broadcast(&[a, b, c], &world_state()).unwrap();

        assert_eq!(delivery.delivered, 2);
        assert_eq!(delivery.failed, vec![EntityId::from("b")]);
        assert!(delivery.dropped.is_empty());
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_c.try_recv().is_ok());
    }

    #[test]
    fn test_broadcast_drops_for_stalled_reader_only() {
        let (stalled, mut rx_stalled) = recipient("stalled");
        let (reader, mut rx_reader) = recipient("reader");
        let recipients = [stalled, reader];

        for _ in 0..OUTBOUND_CAPACITY {
            broadcast(&recipients, &world_state()).unwrap();
            assert!(rx_reader.try_recv().is_ok());
        }

        let delivery = broadcast(&recipients, &world_state()).unwrap();
        assert_eq!(delivery.delivered, 1);
        assert_eq!(delivery.dropped, vec![EntityId::from("stalled")]);
        assert!(delivery.failed.is_empty());
        assert!(rx_reader.try_recv().is_ok());

        let mut queued = 0;
        while rx_stalled.try_recv().is_ok() {
            queued += 1;
        }
        assert_eq!(queued, OUTBOUND_CAPACITY);
    }

    #[test]
    fn test_damage_goes_to_target_only() {
        let (shooter, mut rx_shooter) = recipient("shooter");
        let (target, mut rx_target) = recipient("target");

        let hit = Hit {
            projectile_id: EntityId::from("bullet"),
            owner_id: EntityId::from("shooter"),
            target_id: EntityId::from("target"),
            amount: 25,
            health: 75,
            respawned: false,
        };
        deliver_damage(&[hit], &[shooter, target]);

        let line = rx_target.try_recv().unwrap();
        assert_eq!(
            ServerMessage::decode(line.as_bytes()).unwrap(),
            ServerMessage::Damage { amount: 25 }
        );
        assert!(rx_target.try_recv().is_err());
        assert!(rx_shooter.try_recv().is_err());
    }

    #[test]
    fn test_damage_to_departed_target_is_ignored() {
        let (shooter, mut rx_shooter) = recipient("shooter");
        let hit = Hit {
            projectile_id: EntityId::from("bullet"),
            owner_id: EntityId::from("shooter"),
            target_id: EntityId::from("gone"),
            amount: 25,
            health: 75,
            respawned: false,
        };
        deliver_damage(&[hit], &[shooter]);
        assert!(rx_shooter.try_recv().is_err());
    }
}
