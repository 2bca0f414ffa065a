use std::sync::Arc;

use sketchboard_shared::codec::MAX_PAYLOAD_LEN;
use sketchboard_shared::{ClientMessage, Participant, ParticipantId, ServerMessage};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::rooms::{join_room, leave_room, normalize_room_id, sanitize_nickname};
use crate::state::{AppState, Peer, Room};

/// One socket's view of the hub.
pub struct Connection {
    pub id: Uuid,
    pub tx: mpsc::UnboundedSender<ServerMessage>,
    pub room: Option<(String, Arc<RwLock<Room>>)>,
}

impl Connection {
    pub fn new(tx: mpsc::UnboundedSender<ServerMessage>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tx,
            room: None,
        }
    }

    pub fn participant_id(&self) -> ParticipantId {
        ParticipantId(self.id.to_string())
    }

    fn reply(&self, message: ServerMessage) {
        if self.tx.send(message).is_err() {
            debug!(conn = %self.id, "reply dropped, writer gone");
        }
    }
}

/// Turns an in-room message into what the other peers in the room receive.
pub fn apply_client_message(sender: &ParticipantId, message: ClientMessage) -> Option<ServerMessage> {
    match message {
        ClientMessage::Draw { event, payload } => {
            if payload.is_empty() || payload.len() > MAX_PAYLOAD_LEN {
                warn!(%sender, bytes = payload.len(), "dropping oversized draw payload");
                return None;
            }
            Some(ServerMessage::Draw {
                sender: sender.clone(),
                event,
                payload,
            })
        }
        ClientMessage::Reset => Some(ServerMessage::Reset {
            sender: sender.clone(),
        }),
        ClientMessage::JoinRoom { .. } | ClientMessage::LeaveRoom => None,
    }
}

pub async fn handle_client_message(
    state: &AppState,
    connection: &mut Connection,
    message: ClientMessage,
) {
    match message {
        ClientMessage::JoinRoom { room, nickname } => {
            enter_room(state, connection, &room, &nickname).await;
        }
        ClientMessage::LeaveRoom => exit_room(state, connection).await,
        message => {
            let Some((_, room)) = &connection.room else {
                connection.reply(ServerMessage::Error {
                    message: "join a room first".to_string(),
                });
                return;
            };
            let room = room.clone();
            let sender = connection.participant_id();
            if let Some(message) = apply_client_message(&sender, message) {
                broadcast_except(&room, connection.id, message).await;
            }
        }
    }
}

pub async fn enter_room(state: &AppState, connection: &mut Connection, room: &str, nickname: &str) {
    let Some(room_id) = normalize_room_id(room) else {
        connection.reply(ServerMessage::Error {
            message: "invalid room id".to_string(),
        });
        return;
    };
    exit_room(state, connection).await;

    let participant = Participant {
        id: connection.participant_id(),
        nickname: sanitize_nickname(nickname),
    };
    let peer = Peer {
        participant: participant.clone(),
        tx: connection.tx.clone(),
    };
    let (room, others) = join_room(state, &room_id, connection.id, peer).await;
    info!(
        room = %room_id,
        conn = %connection.id,
        nickname = %participant.nickname,
        peers = others.len() + 1,
        "participant joined"
    );
    connection.reply(ServerMessage::Joined {
        participant: participant.clone(),
        participants: others,
    });
    broadcast_except(
        &room,
        connection.id,
        ServerMessage::ParticipantJoined { participant },
    )
    .await;
    connection.room = Some((room_id, room));
}

pub async fn exit_room(state: &AppState, connection: &mut Connection) {
    let Some((room_id, room)) = connection.room.take() else {
        return;
    };
    leave_room(state, &room_id, &room, connection.id).await;
    info!(room = %room_id, conn = %connection.id, "participant left");
    broadcast_except(
        &room,
        connection.id,
        ServerMessage::ParticipantLeft {
            id: connection.participant_id(),
        },
    )
    .await;
}

pub async fn broadcast_except(room: &Arc<RwLock<Room>>, sender: Uuid, message: ServerMessage) {
    let mut stale = Vec::new();
    {
        let room = room.read().await;
        for (id, peer) in room.peers.iter() {
            if *id == sender {
                continue;
            }
            if peer.tx.send(message.clone()).is_err() {
                stale.push(*id);
            }
        }
    }
    prune(room, stale).await;
}

async fn prune(room: &Arc<RwLock<Room>>, stale: Vec<Uuid>) {
    if stale.is_empty() {
        return;
    }
    let mut room = room.write().await;
    for id in stale {
        debug!(conn = %id, "pruning stale peer");
        room.peers.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchboard_shared::codec::{encode_point, line_payload_len, MAX_LINE_POINTS};
    use sketchboard_shared::{BrushState, DrawEvent, Point};

    fn connection() -> (Connection, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Connection::new(tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        messages
    }

    #[test]
    fn draw_is_forwarded_to_others_only() {
        let sender = ParticipantId("p1".into());
        let payload = encode_point(Point::new(1.0, 2.0), BrushState::default());
        let message = apply_client_message(
            &sender,
            ClientMessage::Draw {
                event: DrawEvent::Point,
                payload: payload.clone(),
            },
        );
        assert_eq!(
            message,
            Some(ServerMessage::Draw {
                sender,
                event: DrawEvent::Point,
                payload
            })
        );
    }

    #[test]
    fn oversized_payload_is_dropped() {
        let sender = ParticipantId("p1".into());
        let payload = vec![0; line_payload_len(MAX_LINE_POINTS) + 1];
        assert!(apply_client_message(
            &sender,
            ClientMessage::Draw {
                event: DrawEvent::Line,
                payload,
            },
        )
        .is_none());
        assert!(apply_client_message(
            &sender,
            ClientMessage::Draw {
                event: DrawEvent::Line,
                payload: Vec::new(),
            },
        )
        .is_none());
    }

    #[tokio::test]
    async fn join_draw_leave_flow() {
        let state = AppState::default();
        let (mut ada, mut ada_rx) = connection();
        let (mut bob, mut bob_rx) = connection();

        handle_client_message(
            &state,
            &mut ada,
            ClientMessage::JoinRoom {
                room: "lobby".into(),
                nickname: " ada ".into(),
            },
        )
        .await;
        handle_client_message(
            &state,
            &mut bob,
            ClientMessage::JoinRoom {
                room: "lobby".into(),
                nickname: String::new(),
            },
        )
        .await;

        let ada_messages = drain(&mut ada_rx);
        assert_eq!(ada_messages.len(), 2);
        let ServerMessage::ParticipantJoined { participant } = &ada_messages[1] else {
            panic!("expected participant joined");
        };
        assert_eq!(participant.nickname, "anonymous");

        let bob_messages = drain(&mut bob_rx);
        let ServerMessage::Joined {
            participant,
            participants,
        } = &bob_messages[0]
        else {
            panic!("expected joined");
        };
        assert_eq!(participant.id, bob.participant_id());
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].nickname, "ada");

        handle_client_message(&state, &mut bob, ClientMessage::Reset).await;
        assert_eq!(
            drain(&mut ada_rx),
            vec![ServerMessage::Reset {
                sender: bob.participant_id()
            }]
        );
        assert!(drain(&mut bob_rx).is_empty());

        handle_client_message(&state, &mut bob, ClientMessage::LeaveRoom).await;
        assert_eq!(
            drain(&mut ada_rx),
            vec![ServerMessage::ParticipantLeft {
                id: bob.participant_id()
            }]
        );
        exit_room(&state, &mut ada).await;
        assert!(state.rooms.read().await.is_empty());
    }

    #[tokio::test]
    async fn draw_before_join_is_rejected() {
        let state = AppState::default();
        let (mut ada, mut ada_rx) = connection();
        handle_client_message(&state, &mut ada, ClientMessage::Reset).await;
        assert!(matches!(
            drain(&mut ada_rx).as_slice(),
            [ServerMessage::Error { .. }]
        ));

        handle_client_message(
            &state,
            &mut ada,
            ClientMessage::JoinRoom {
                room: "x".repeat(65),
                nickname: "ada".into(),
            },
        )
        .await;
        assert!(matches!(
            drain(&mut ada_rx).as_slice(),
            [ServerMessage::Error { .. }]
        ));
        assert!(ada.room.is_none());
    }

    async fn join(state: &AppState, connection: &mut Connection, room: &str) {
        handle_client_message(
            state,
            connection,
            ClientMessage::JoinRoom {
                room: room.into(),
                nickname: "n".into(),
            },
        )
        .await;
    }

    #[tokio::test]
    async fn rejoin_moves_between_rooms() {
        let state = AppState::default();
        let (mut ada, _ada_rx) = connection();
        let (mut bob, mut bob_rx) = connection();
        join(&state, &mut bob, "one").await;
        join(&state, &mut ada, "one").await;
        join(&state, &mut ada, "two").await;

        let bob_messages = drain(&mut bob_rx);
        assert!(matches!(
            bob_messages.last(),
            Some(ServerMessage::ParticipantLeft { id }) if *id == ada.participant_id()
        ));
        let rooms = state.rooms.read().await;
        assert_eq!(rooms.len(), 2);
    }

    #[tokio::test]
    async fn stale_peer_is_pruned_on_broadcast() {
        let state = AppState::default();
        let (mut ada, _ada_rx) = connection();
        let (mut bob, bob_rx) = connection();
        join(&state, &mut ada, "lobby").await;
        join(&state, &mut bob, "lobby").await;
        drop(bob_rx);
        handle_client_message(&state, &mut ada, ClientMessage::Reset).await;
        let (_, room) = ada.room.as_ref().unwrap();
        assert_eq!(room.read().await.peers.len(), 1);
    }
}
