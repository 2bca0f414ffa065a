use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use sketchboard_shared::codec::MAX_PAYLOAD_LEN;
use sketchboard_shared::{decode_message, encode_message, ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::logic::{exit_room, handle_client_message, Connection};
use crate::rooms::{normalize_room_id, room_participants};
use crate::state::AppState;

/// Largest frame the hub accepts: a maximal line payload plus envelope slack.
const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/rooms/:room/participants", get(participants_handler))
        .route("/ping", get(ping_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn ping_handler() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}

pub async fn participants_handler(
    Path(room): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, StatusCode> {
    let room = normalize_room_id(&room).ok_or(StatusCode::BAD_REQUEST)?;
    let nicknames = room_participants(&state, &room)
        .await
        .into_iter()
        .map(|participant| participant.nickname)
        .collect();
    Ok(Json(nicknames))
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.max_message_size(MAX_FRAME_LEN)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let mut connection = Connection::new(tx);
    let conn = connection.id;
    info!(%conn, "socket connected");

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let payload = match encode_message(&message) {
                Ok(payload) => payload,
                Err(error) => {
                    warn!(%conn, %error, "failed to encode server message");
                    continue;
                }
            };
            if socket_sender.send(Message::Binary(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = socket_receiver.next().await {
        match message {
            Message::Binary(data) => match decode_message::<ClientMessage>(&data) {
                Ok(client_message) => {
                    handle_client_message(&state, &mut connection, client_message).await;
                }
                Err(error) => {
                    debug!(%conn, %error, bytes = data.len(), "dropping undecodable frame");
                }
            },
            Message::Close(frame) => {
                if let Some(frame) = &frame {
                    debug!(%conn, code = frame.code, reason = %frame.reason, "close frame");
                }
                break;
            }
            _ => {}
        }
    }

    exit_room(&state, &mut connection).await;
    send_task.abort();
    info!(%conn, "socket disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchboard_shared::codec::encode_point;
    use sketchboard_shared::{BrushState, DrawEvent, ParticipantId, Point};
    use tokio::net::TcpListener;
    use tokio::time::{timeout, Duration};
    use tokio_tungstenite::tungstenite::Message as WsMessage;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

    async fn spawn_hub(state: AppState) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        addr
    }

    async fn send(client: &mut Client, message: ClientMessage) {
        let payload = encode_message(&message).unwrap();
        client.send(WsMessage::Binary(payload.into())).await.unwrap();
    }

    async fn recv(client: &mut Client) -> ServerMessage {
        loop {
            let frame = timeout(Duration::from_secs(2), client.next())
                .await
                .expect("hub reply timed out")
                .expect("socket closed")
                .unwrap();
            if let WsMessage::Binary(data) = frame {
                return decode_message(&data).unwrap();
            }
        }
    }

    async fn join(client: &mut Client, nickname: &str) -> ParticipantId {
        send(
            client,
            ClientMessage::JoinRoom {
                room: "lobby".into(),
                nickname: nickname.into(),
            },
        )
        .await;
        let ServerMessage::Joined { participant, .. } = recv(client).await else {
            panic!("expected joined");
        };
        participant.id
    }

    #[tokio::test]
    async fn ping_is_no_content() {
        assert_eq!(
            ping_handler().await.into_response().status(),
            StatusCode::NO_CONTENT
        );
    }

    #[tokio::test]
    async fn participants_endpoint_rejects_bad_room() {
        let result =
            participants_handler(Path("x".repeat(65)), State(AppState::default())).await;
        assert_eq!(result.err(), Some(StatusCode::BAD_REQUEST));

        let Json(nicknames) =
            participants_handler(Path("empty".into()), State(AppState::default()))
                .await
                .unwrap();
        assert!(nicknames.is_empty());
    }

    #[tokio::test]
    async fn relays_draws_between_sockets() {
        let state = AppState::default();
        let addr = spawn_hub(state.clone()).await;
        let url = format!("ws://{addr}/ws");
        let (mut ada, _) = connect_async(&url).await.unwrap();
        let (mut bob, _) = connect_async(&url).await.unwrap();

        let ada_id = join(&mut ada, "ada").await;
        let bob_id = join(&mut bob, "bob").await;
        let ServerMessage::ParticipantJoined { participant } = recv(&mut ada).await else {
            panic!("expected participant joined");
        };
        assert_eq!(participant.id, bob_id);

        let Json(nicknames) = participants_handler(Path("lobby".into()), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(nicknames, vec!["ada".to_string(), "bob".to_string()]);

        let payload = encode_point(Point::new(3.0, 4.0), BrushState::default());
        send(
            &mut ada,
            ClientMessage::Draw {
                event: DrawEvent::Point,
                payload: payload.clone(),
            },
        )
        .await;
        assert_eq!(
            recv(&mut bob).await,
            ServerMessage::Draw {
                sender: ada_id.clone(),
                event: DrawEvent::Point,
                payload,
            }
        );

        ada.close(None).await.unwrap();
        assert_eq!(
            recv(&mut bob).await,
            ServerMessage::ParticipantLeft { id: ada_id }
        );
    }
}
