use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Connection registry for the staff notification channel.
///
/// Rooms are keyed by staff id; one staff member may hold several live
/// connections (e.g. two dashboard tabs). Delivery is at-most-once and
/// best-effort: staff without a live connection simply miss the event, and a
/// send failure only prunes the dead connection.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    rooms: Arc<DashMap<i32, Vec<RoomMember>>>,
}

#[derive(Debug)]
struct RoomMember {
    conn_id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

#[derive(Serialize)]
struct Event<'a, T> {
    event: &'a str,
    data: &'a T,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
        }
    }

    /// Join the room keyed by `staff_id`. Returns the connection id (used to
    /// leave later) and the receiving end of the connection's message queue.
    pub fn join(&self, staff_id: i32) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = Uuid::new_v4();
        self.rooms
            .entry(staff_id)
            .or_default()
            .push(RoomMember { conn_id, tx });
        (conn_id, rx)
    }

    /// Remove one connection from a room; empty rooms are dropped. Leaving a
    /// room that is already gone is a no-op.
    pub fn leave(&self, staff_id: i32, conn_id: Uuid) {
        if let Some(mut members) = self.rooms.get_mut(&staff_id) {
            members.retain(|member| member.conn_id != conn_id);
            if !members.is_empty() {
                return;
            }
        }
        self.rooms.remove_if(&staff_id, |_, members| members.is_empty());
    }

    /// Deliver `payload` to every live connection of every targeted room.
    /// Returns the number of connections the event reached.
    pub fn emit<T: Serialize>(&self, targets: &[i32], event: &str, payload: &T) -> usize {
        let encoded = match serde_json::to_string(&Event { event, data: payload }) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::warn!("Failed to encode {} event: {}", event, err);
                return 0;
            }
        };

        let mut delivered = 0;
        for staff_id in targets {
            if let Some(mut members) = self.rooms.get_mut(staff_id) {
                members.retain(|member| member.tx.send(encoded.clone()).is_ok());
                delivered += members.len();
            }
        }
        delivered
    }

    /// Deliver an event to every connected room (presence announcements).
    pub fn broadcast<T: Serialize>(&self, event: &str, payload: &T) -> usize {
        let targets: Vec<i32> = self.rooms.iter().map(|entry| *entry.key()).collect();
        self.emit(&targets, event, payload)
    }

    pub fn connected_staff(&self) -> Vec<i32> {
        self.rooms.iter().map(|entry| *entry.key()).collect()
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn emit_reaches_only_targeted_connected_rooms() {
        let hub = NotificationHub::new();
        let (_, mut rx_a) = hub.join(1);
        let (_, mut rx_b) = hub.join(2);

        // Staff 3 is targeted but not connected.
        let delivered = hub.emit(&[1, 3], "new-order", &json!({"id": 7}));
        assert_eq!(delivered, 1);

        let received: Value = serde_json::from_str(&rx_a.recv().await.unwrap()).unwrap();
        assert_eq!(received["event"], "new-order");
        assert_eq!(received["data"]["id"], 7);

        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn every_connection_of_a_room_receives_the_event() {
        let hub = NotificationHub::new();
        let (_, mut first) = hub.join(5);
        let (_, mut second) = hub.join(5);

        let delivered = hub.emit(&[5], "new-order", &json!({"id": 1}));
        assert_eq!(delivered, 2);
        assert!(first.recv().await.is_some());
        assert!(second.recv().await.is_some());
    }

    #[tokio::test]
    async fn leaving_removes_the_connection() {
        let hub = NotificationHub::new();
        let (conn_id, _rx) = hub.join(9);
        hub.leave(9, conn_id);

        assert_eq!(hub.emit(&[9], "new-order", &json!({})), 0);
        assert!(hub.connected_staff().is_empty());

        // Leaving again is a no-op.
        hub.leave(9, conn_id);
    }

    #[tokio::test]
    async fn dead_connections_are_pruned_on_emit() {
        let hub = NotificationHub::new();
        let (_, rx) = hub.join(4);
        drop(rx);

        assert_eq!(hub.emit(&[4], "new-order", &json!({})), 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_all_rooms() {
        let hub = NotificationHub::new();
        let (_, mut rx_a) = hub.join(1);
        let (_, mut rx_b) = hub.join(2);

        let delivered = hub.broadcast("user-disconnect", &json!({"staffId": 3}));
        assert_eq!(delivered, 2);

        let received: Value = serde_json::from_str(&rx_a.recv().await.unwrap()).unwrap();
        assert_eq!(received["data"]["staffId"], 3);
        assert!(rx_b.recv().await.is_some());
    }
}
