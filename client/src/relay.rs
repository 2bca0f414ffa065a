//! Client side of the fan-out hub.
//!
//! Outbound draws are fire-and-forget: a failed or impossible send is logged
//! and counted, never returned to the drawing path. Inbound hub messages are
//! turned into [`RelayEvent`]s for the owner loop to apply.

use std::collections::BTreeMap;

use sketchboard_shared::{
    codec, BrushState, ClientMessage, DrawAction, DrawEvent, Participant, ParticipantId, Point,
    ServerMessage,
};
use tracing::{debug, info, warn};

use crate::ws::{WsEvent, WsSender};

#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Connected,
    Disconnected,
    Joined {
        participant: Participant,
    },
    PointReceived {
        sender: ParticipantId,
        payload: Vec<u8>,
    },
    LineReceived {
        sender: ParticipantId,
        payload: Vec<u8>,
    },
    ParticipantJoined(Participant),
    ParticipantLeft(Participant),
    RemoteReset {
        sender: ParticipantId,
    },
    TransportFailure(String),
}

pub struct SyncRelay {
    sender: WsSender,
    room: Option<String>,
    local_id: Option<ParticipantId>,
    roster: BTreeMap<ParticipantId, Participant>,
    dropped_sends: u64,
}

impl SyncRelay {
    pub fn new(sender: WsSender) -> Self {
        Self {
            sender,
            room: None,
            local_id: None,
            roster: BTreeMap::new(),
            dropped_sends: 0,
        }
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn local_id(&self) -> Option<&ParticipantId> {
        self.local_id.as_ref()
    }

    pub fn is_joined(&self) -> bool {
        self.local_id.is_some()
    }

    /// Everyone currently in the room, including this client.
    pub fn participants(&self) -> Vec<Participant> {
        self.roster.values().cloned().collect()
    }

    pub fn dropped_sends(&self) -> u64 {
        self.dropped_sends
    }

    pub fn join_room(&mut self, room: &str, nickname: &str) {
        if self.room.is_some() {
            self.leave_room();
        }
        info!(%room, %nickname, "joining room");
        self.room = Some(room.to_string());
        self.deliver(ClientMessage::JoinRoom {
            room: room.to_string(),
            nickname: nickname.to_string(),
        });
    }

    pub fn leave_room(&mut self) {
        let Some(room) = self.room.take() else {
            return;
        };
        info!(%room, "leaving room");
        self.local_id = None;
        self.roster.clear();
        self.deliver(ClientMessage::LeaveRoom);
    }

    pub fn send_point(&mut self, point: Point, brush: BrushState) {
        self.send_draw(DrawEvent::Point, codec::encode_point(point, brush));
    }

    /// Lines longer than [`codec::MAX_LINE_POINTS`] are dropped; split them
    /// first (see `Batch::into_actions`).
    pub fn send_line(&mut self, points: &[Point], brush: BrushState) {
        if self.reject_long_line(points) {
            return;
        }
        self.send_draw(DrawEvent::Line, codec::encode_line(points, brush));
    }

    pub fn send_action(&mut self, action: &DrawAction) {
        if let DrawAction::Line { points, .. } = action {
            if self.reject_long_line(points) {
                return;
            }
        }
        self.send_draw(action.event(), codec::encode(action));
    }

    fn reject_long_line(&mut self, points: &[Point]) -> bool {
        if points.len() <= codec::MAX_LINE_POINTS {
            return false;
        }
        warn!(points = points.len(), "line exceeds wire limit, dropping");
        self.dropped_sends += 1;
        true
    }

    pub fn send_reset(&mut self) {
        if !self.is_joined() {
            debug!("not in a room, dropping reset");
            self.dropped_sends += 1;
            return;
        }
        self.deliver(ClientMessage::Reset);
    }

    fn send_draw(&mut self, event: DrawEvent, payload: Vec<u8>) {
        if !self.is_joined() {
            debug!(event = event.name(), "not in a room, dropping draw");
            self.dropped_sends += 1;
            return;
        }
        self.deliver(ClientMessage::Draw { event, payload });
    }

    fn deliver(&mut self, message: ClientMessage) {
        if let Err(error) = self.sender.send(message) {
            warn!(%error, "relay send failed");
            self.dropped_sends += 1;
        }
    }

    /// Folds one transport event into the relay and reports what the owner
    /// loop should act on.
    pub fn handle(&mut self, event: WsEvent) -> Option<RelayEvent> {
        match event {
            WsEvent::Open => Some(RelayEvent::Connected),
            WsEvent::Close => {
                self.local_id = None;
                self.roster.clear();
                Some(RelayEvent::Disconnected)
            }
            WsEvent::Error(error) => Some(RelayEvent::TransportFailure(error)),
            WsEvent::Message(message) => self.handle_message(message),
        }
    }

    fn handle_message(&mut self, message: ServerMessage) -> Option<RelayEvent> {
        match message {
            ServerMessage::Joined {
                participant,
                participants,
            } => {
                if self.room.is_none() {
                    debug!(id = %participant.id, "ignoring join reply after leaving");
                    return None;
                }
                info!(id = %participant.id, peers = participants.len(), "joined room");
                self.local_id = Some(participant.id.clone());
                self.roster = participants
                    .into_iter()
                    .map(|peer| (peer.id.clone(), peer))
                    .collect();
                self.roster
                    .insert(participant.id.clone(), participant.clone());
                Some(RelayEvent::Joined { participant })
            }
            ServerMessage::ParticipantJoined { participant } => {
                if self.is_self(&participant.id) {
                    return None;
                }
                self.roster
                    .insert(participant.id.clone(), participant.clone());
                Some(RelayEvent::ParticipantJoined(participant))
            }
            ServerMessage::ParticipantLeft { id } => {
                let participant = self.roster.remove(&id)?;
                Some(RelayEvent::ParticipantLeft(participant))
            }
            ServerMessage::Draw {
                sender,
                event,
                payload,
            } => {
                if self.is_self(&sender) {
                    return None;
                }
                Some(match event {
                    DrawEvent::Point => RelayEvent::PointReceived { sender, payload },
                    DrawEvent::Line => RelayEvent::LineReceived { sender, payload },
                })
            }
            ServerMessage::Reset { sender } => {
                if self.is_self(&sender) {
                    return None;
                }
                Some(RelayEvent::RemoteReset { sender })
            }
            ServerMessage::Error { message } => {
                warn!(%message, "hub reported an error");
                Some(RelayEvent::TransportFailure(message))
            }
        }
    }

    fn is_self(&self, id: &ParticipantId) -> bool {
        self.local_id.as_ref() == Some(id)
    }
}
