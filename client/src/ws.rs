use futures_util::{SinkExt, StreamExt};
use sketchboard_shared::{decode_message, encode_message, ClientMessage, ServerMessage};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::{SketchError, SketchResult};

#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    Open,
    Close,
    Error(String),
    Message(ServerMessage),
}

/// Non-blocking handle onto the outbound queue. The writer task owns the
/// socket, so sending never waits on the network.
#[derive(Clone, Debug)]
pub struct WsSender {
    outbound: mpsc::UnboundedSender<ClientMessage>,
}

impl WsSender {
    pub fn new(outbound: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self { outbound }
    }

    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    pub fn send(&self, message: ClientMessage) -> SketchResult<()> {
        self.outbound
            .send(message)
            .map_err(|_| SketchError::TransportFailure("socket writer has stopped".into()))
    }
}

pub struct WsConnection {
    pub sender: WsSender,
    pub events: mpsc::UnboundedReceiver<WsEvent>,
    pub reader: JoinHandle<()>,
    pub writer: JoinHandle<()>,
}

pub async fn connect_ws(url: &str) -> SketchResult<WsConnection> {
    debug!(%url, "connecting to hub");
    let (socket, _response) = connect_async(url)
        .await
        .map_err(|error| SketchError::TransportFailure(format!("connect {url}: {error}")))?;
    info!(%url, "connected to hub");

    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<WsEvent>();
    let _ = event_tx.send(WsEvent::Open);

    let writer_events = event_tx.clone();
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let payload = match encode_message(&message) {
                Ok(payload) => payload,
                Err(error) => {
                    error!(%error, "failed to encode client message");
                    continue;
                }
            };
            if let Err(error) = socket_sender.send(Message::Binary(payload.into())).await {
                warn!(%error, "socket send failed");
                let _ = writer_events.send(WsEvent::Error(error.to_string()));
                break;
            }
        }
        let _ = socket_sender.close().await;
    });

    let reader = tokio::spawn(async move {
        while let Some(frame) = socket_receiver.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(error) => {
                    warn!(%error, "socket receive failed");
                    let _ = event_tx.send(WsEvent::Error(error.to_string()));
                    break;
                }
            };
            match frame {
                Message::Binary(data) => match decode_message::<ServerMessage>(&data) {
                    Ok(message) => {
                        if event_tx.send(WsEvent::Message(message)).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(%error, bytes = data.len(), "dropping undecodable server message");
                    }
                },
                Message::Close(frame) => {
                    debug!(?frame, "hub closed the socket");
                    break;
                }
                _ => {}
            }
        }
        let _ = event_tx.send(WsEvent::Close);
    });

    Ok(WsConnection {
        sender: WsSender::new(outbound_tx),
        events: event_rx,
        reader,
        writer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchboard_shared::{Participant, ParticipantId};
    use tokio::net::TcpListener;
    use tokio::time::{timeout, Duration};

    async fn next_event(events: &mut mpsc::UnboundedReceiver<WsEvent>) -> WsEvent {
        timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("event receive timed out")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn sender_reports_closed_writer() {
        let (tx, rx) = mpsc::unbounded_channel();
        let sender = WsSender::new(tx);
        assert!(sender.is_open());
        drop(rx);
        assert!(!sender.is_open());
        assert!(matches!(
            sender.send(ClientMessage::LeaveRoom),
            Err(SketchError::TransportFailure(_))
        ));
    }

    #[tokio::test]
    async fn connect_to_missing_hub_is_transport_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let result = connect_ws(&format!("ws://{addr}/ws")).await;
        assert!(matches!(result, Err(SketchError::TransportFailure(_))));
    }

    #[tokio::test]
    async fn exchanges_binary_envelopes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let hub = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut socket = tokio_tungstenite::accept_async(stream).await.unwrap();
            let Some(Ok(Message::Binary(data))) = socket.next().await else {
                panic!("expected a binary frame");
            };
            let received = decode_message::<ClientMessage>(&data).unwrap();

            socket.send(Message::Binary(vec![0xff, 0xfe].into())).await.unwrap();
            let reply = ServerMessage::Joined {
                participant: Participant {
                    id: ParticipantId("p1".into()),
                    nickname: "ada".into(),
                },
                participants: Vec::new(),
            };
            socket
                .send(Message::Binary(encode_message(&reply).unwrap().into()))
                .await
                .unwrap();
            socket.close(None).await.unwrap();
            received
        });

        let mut connection = connect_ws(&format!("ws://{addr}/ws")).await.unwrap();
        assert_eq!(next_event(&mut connection.events).await, WsEvent::Open);
        connection
            .sender
            .send(ClientMessage::JoinRoom {
                room: "lobby".into(),
                nickname: "ada".into(),
            })
            .unwrap();

        let WsEvent::Message(ServerMessage::Joined { participant, .. }) =
            next_event(&mut connection.events).await
        else {
            panic!("expected joined");
        };
        assert_eq!(participant.nickname, "ada");
        assert_eq!(next_event(&mut connection.events).await, WsEvent::Close);

        assert_eq!(
            hub.await.unwrap(),
            ClientMessage::JoinRoom {
                room: "lobby".into(),
                nickname: "ada".into()
            }
        );
    }
}
