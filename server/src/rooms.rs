use std::sync::Arc;

use sketchboard_shared::Participant;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::{AppState, Peer, Room, DEFAULT_NICKNAME, MAX_NICKNAME_LEN, MAX_ROOM_ID_LEN};

pub fn normalize_room_id(value: &str) -> Option<String> {
    let value = value.trim();
    let len = value.chars().count();
    if len == 0 || len > MAX_ROOM_ID_LEN || value.chars().any(char::is_control) {
        return None;
    }
    Some(value.to_string())
}

pub fn sanitize_nickname(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return DEFAULT_NICKNAME.to_string();
    }
    trimmed
        .chars()
        .filter(|ch| !ch.is_control())
        .take(MAX_NICKNAME_LEN)
        .collect()
}

/// Adds `peer` to the room, creating the room on first join. Returns the
/// room and everyone who was already there.
pub async fn join_room(
    state: &AppState,
    room_id: &str,
    connection_id: Uuid,
    peer: Peer,
) -> (Arc<RwLock<Room>>, Vec<Participant>) {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .entry(room_id.to_string())
        .or_insert_with(|| {
            info!(room = %room_id, "creating room");
            Arc::new(RwLock::new(Room::default()))
        })
        .clone();
    let others = {
        let mut guard = room.write().await;
        let others = guard.participants();
        guard.peers.insert(connection_id, peer);
        others
    };
    (room, others)
}

/// Removes the connection from the room and drops the room once it is
/// empty. The rooms map lock is held throughout so a concurrent join never
/// lands in a room that is being discarded.
pub async fn leave_room(
    state: &AppState,
    room_id: &str,
    room: &Arc<RwLock<Room>>,
    connection_id: Uuid,
) -> Option<Peer> {
    let mut rooms = state.rooms.write().await;
    let (removed, empty) = {
        let mut guard = room.write().await;
        let removed = guard.peers.remove(&connection_id);
        (removed, guard.peers.is_empty())
    };
    if empty {
        if let Some(current) = rooms.get(room_id) {
            if Arc::ptr_eq(current, room) {
                rooms.remove(room_id);
                info!(room = %room_id, "room closed");
            }
        }
    }
    removed
}

pub async fn room_participants(state: &AppState, room_id: &str) -> Vec<Participant> {
    let room = state.rooms.read().await.get(room_id).cloned();
    match room {
        Some(room) => room.read().await.participants(),
        None => Vec::new(),
    }
}

/// Drops peers whose writer has gone away and rooms left with nobody in
/// them. Returns how many peers were pruned.
pub async fn prune_closed(state: &AppState) -> usize {
    let mut rooms = state.rooms.write().await;
    let mut pruned = 0;
    let mut empty = Vec::new();
    for (room_id, room) in rooms.iter() {
        let mut guard = room.write().await;
        let before = guard.peers.len();
        guard.peers.retain(|_, peer| !peer.tx.is_closed());
        pruned += before - guard.peers.len();
        if guard.peers.is_empty() {
            empty.push(room_id.clone());
        }
    }
    for room_id in empty {
        debug!(room = %room_id, "removing empty room");
        rooms.remove(&room_id);
    }
    pruned
}
