use std::collections::HashMap;
use std::sync::Arc;

use sketchboard_shared::{Participant, ServerMessage};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

pub const MAX_ROOM_ID_LEN: usize = 64;
pub const MAX_NICKNAME_LEN: usize = 32;
pub const DEFAULT_NICKNAME: &str = "anonymous";

#[derive(Clone, Default)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<String, Arc<RwLock<Room>>>>>,
}

pub struct Peer {
    pub participant: Participant,
    pub tx: mpsc::UnboundedSender<ServerMessage>,
}

/// Live connections in one room. Nothing about the drawing itself is kept.
#[derive(Default)]
pub struct Room {
    pub peers: HashMap<Uuid, Peer>,
}

impl Room {
    /// Roster ordered by nickname, then id, so every reader sees the same list.
    pub fn participants(&self) -> Vec<Participant> {
        let mut participants = self
            .peers
            .values()
            .map(|peer| peer.participant.clone())
            .collect::<Vec<_>>();
        participants.sort_by(|a, b| a.nickname.cmp(&b.nickname).then_with(|| a.id.cmp(&b.id)));
        participants
    }
}
