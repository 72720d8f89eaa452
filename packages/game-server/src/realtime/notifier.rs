use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use shared::models::queue::QueueEvent;

use crate::realtime::events::ServerEvent;
use crate::realtime::hub::Hub;

/// Pushes matchmaking notifications to the affected users until the queue
/// side of the channel is dropped.
pub async fn forward_queue_events(hub: Arc<Hub>, mut events: UnboundedReceiver<QueueEvent>) {
    while let Some(event) = events.recv().await {
        let (user_id, message) = match event {
            QueueEvent::Matched {
                user_id,
                opponent_id,
                game_id,
                color,
            } => (
                user_id,
                ServerEvent::MatchFound {
                    game_id,
                    opponent_id,
                    color,
                },
            ),
            QueueEvent::Expired { user_id } => (
                user_id.clone(),
                ServerEvent::QueueExpired { user_id },
            ),
        };
        let delivered = hub.send_to_user(&user_id, &message);
        debug!("Queue event for {} reached {} connection(s)", user_id, delivered);
    }
    info!("Queue event channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::hub::user_room;
    use shared::models::game::Color;
    use tokio::sync::mpsc::unbounded_channel;

    #[tokio::test]
    async fn test_events_go_to_user_room() {
        let hub = Arc::new(Hub::new());
        let (conn_tx, mut conn_rx) = unbounded_channel();
        let conn = hub.register("alice", conn_tx);
        hub.join(conn, &user_room("alice"));
        let (tx, rx) = unbounded_channel();

        tx.send(QueueEvent::Matched {
            user_id: "alice".to_string(),
            opponent_id: "bob".to_string(),
            game_id: "g1".to_string(),
            color: Color::Black,
        })
        .unwrap();
        tx.send(QueueEvent::Expired {
            user_id: "bob".to_string(),
        })
        .unwrap();
        drop(tx);
        forward_queue_events(hub, rx).await;

        assert_eq!(
            conn_rx.recv().await.unwrap(),
            ServerEvent::MatchFound {
                game_id: "g1".to_string(),
                opponent_id: "bob".to_string(),
                color: Color::Black,
            }
        );
        assert!(conn_rx.try_recv().is_err());
    }
}
