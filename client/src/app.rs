//! Single-owner dispatch loop.
//!
//! Pointer input, menu commands, relay traffic and the batch tick all
//! arrive on one task, so [`StrokeState`] is only ever touched from here.

use std::time::Duration;

use sketchboard_shared::{codec, ColorId, DrawAction, DrawEvent, ParticipantId, Point, ThicknessId};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::batcher::{SegmentBatcher, Throttle};
use crate::config::BoardConfig;
use crate::error::{SketchError, SketchResult};
use crate::relay::{RelayEvent, SyncRelay};
use crate::render::Surface;
use crate::state::{StrokePhase, StrokeState};
use crate::ws::{connect_ws, WsEvent, WsSender};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    /// Straight stroke from press to release with a live preview.
    Line,
    /// Dot on press, then batched polylines while the pointer moves.
    #[default]
    Freehand,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BoardInput {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    Undo,
    Redo,
    NewFile,
    SetTool(Tool),
    SetColor(ColorId),
    SetThickness(ThicknessId),
    JoinRoom { room: String, nickname: String },
    LeaveRoom,
}

pub struct Board<S: Surface> {
    state: StrokeState<S>,
    batcher: SegmentBatcher,
    throttle: Throttle,
    relay: SyncRelay,
    tool: Tool,
    last_point: Option<Point>,
    batch_interval: Duration,
}

impl<S: Surface> Board<S> {
    pub fn new(config: &BoardConfig, surface: S, sender: WsSender) -> Self {
        Self {
            state: StrokeState::new(config, surface),
            batcher: SegmentBatcher::new(),
            throttle: Throttle::new(config.throttle_interval()),
            relay: SyncRelay::new(sender),
            tool: Tool::default(),
            last_point: None,
            batch_interval: config.batch_interval(),
        }
    }

    /// Opens the hub socket and builds a board wired to it. The returned
    /// receiver is the `ws_events` side of [`run`].
    pub async fn connect(
        config: &BoardConfig,
        surface: S,
    ) -> SketchResult<(Self, mpsc::UnboundedReceiver<WsEvent>)> {
        config.validate()?;
        let connection = connect_ws(&config.server_url).await?;
        Ok((
            Self::new(config, surface, connection.sender),
            connection.events,
        ))
    }

    pub fn state(&self) -> &StrokeState<S> {
        &self.state
    }

    pub fn relay(&self) -> &SyncRelay {
        &self.relay
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn pending_segments(&self) -> usize {
        self.batcher.pending()
    }

    pub fn handle_input(&mut self, input: BoardInput) {
        let result = match input {
            BoardInput::PointerDown { x, y } => self.pointer_down(x, y),
            BoardInput::PointerMove { x, y } => self.pointer_move(x, y),
            BoardInput::PointerUp { x, y } => self.pointer_up(x, y),
            BoardInput::Undo => {
                self.flush_batch();
                self.state.undo();
                Ok(())
            }
            BoardInput::Redo => {
                self.flush_batch();
                self.state.redo();
                Ok(())
            }
            BoardInput::NewFile => {
                self.discard_freehand();
                self.state.reset();
                self.relay.send_reset();
                Ok(())
            }
            BoardInput::SetTool(tool) => {
                self.finish_freehand();
                self.state.cancel_stroke();
                self.tool = tool;
                Ok(())
            }
            BoardInput::SetColor(color) => {
                self.flush_batch();
                self.state.set_color(color);
                Ok(())
            }
            BoardInput::SetThickness(thickness) => {
                self.flush_batch();
                self.state.set_thickness(thickness);
                Ok(())
            }
            BoardInput::JoinRoom { room, nickname } => {
                self.relay.join_room(&room, &nickname);
                Ok(())
            }
            BoardInput::LeaveRoom => {
                self.relay.leave_room();
                Ok(())
            }
        };
        if let Err(error) = result {
            warn!(%error, "ignoring pointer input");
        }
    }

    pub fn handle_ws_event(&mut self, event: WsEvent) {
        if let Some(event) = self.relay.handle(event) {
            self.handle_relay_event(event);
        }
    }

    pub fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connected => info!("hub connection open"),
            RelayEvent::Disconnected => warn!("hub connection closed"),
            RelayEvent::Joined { participant } => {
                self.state.set_author(participant.id);
            }
            RelayEvent::PointReceived { sender, payload } => {
                self.apply_remote(DrawEvent::Point, sender, &payload);
            }
            RelayEvent::LineReceived { sender, payload } => {
                self.apply_remote(DrawEvent::Line, sender, &payload);
            }
            RelayEvent::ParticipantJoined(participant) => {
                info!(id = %participant.id, nickname = %participant.nickname, "participant joined");
            }
            RelayEvent::ParticipantLeft(participant) => {
                info!(id = %participant.id, nickname = %participant.nickname, "participant left");
            }
            RelayEvent::RemoteReset { sender } => {
                info!(%sender, "board reset by participant");
                self.discard_freehand();
                self.state.reset();
            }
            RelayEvent::TransportFailure(reason) => {
                warn!(%reason, "relay transport failure");
            }
        }
    }

    /// Commits whatever freehand segments queued up since the last tick,
    /// locally first, then to the room. Everything flushed during one press
    /// joins the same undo entry.
    pub fn flush_batch(&mut self) {
        let Some(batch) = self.batcher.flush() else {
            return;
        };
        for action in batch.into_actions(self.state.brush()) {
            self.state.extend_group(action.clone());
            self.relay.send_action(&action);
        }
    }

    fn pointer_down(&mut self, x: f64, y: f64) -> SketchResult<()> {
        match self.tool {
            Tool::Line => self.state.begin_stroke(x, y),
            Tool::Freehand => {
                if self.last_point.is_some() {
                    return Err(SketchError::InvalidState {
                        operation: "pointer_down",
                        phase: self.state.phase(),
                    });
                }
                let point = self.state.clamp(x, y);
                let dot = DrawAction::Point {
                    point,
                    brush: self.state.brush(),
                };
                self.state.begin_group(dot.clone());
                self.relay.send_action(&dot);
                self.last_point = Some(point);
                self.throttle.reset();
                Ok(())
            }
        }
    }

    fn pointer_move(&mut self, x: f64, y: f64) -> SketchResult<()> {
        match self.tool {
            Tool::Line => {
                if self.state.phase() == StrokePhase::Idle {
                    return Ok(());
                }
                if !self.throttle.admit() {
                    return Ok(());
                }
                self.state.update_preview(x, y)
            }
            Tool::Freehand => {
                if self.last_point.is_none() || !self.throttle.admit() {
                    return Ok(());
                }
                self.extend_freehand(x, y);
                Ok(())
            }
        }
    }

    fn pointer_up(&mut self, x: f64, y: f64) -> SketchResult<()> {
        match self.tool {
            Tool::Line => {
                if let Some(action) = self.state.commit_stroke(x, y)? {
                    self.relay.send_action(&action);
                }
                Ok(())
            }
            Tool::Freehand => {
                if self.last_point.is_none() {
                    return Ok(());
                }
                self.extend_freehand(x, y);
                self.finish_freehand();
                Ok(())
            }
        }
    }

    fn extend_freehand(&mut self, x: f64, y: f64) {
        let Some(last) = self.last_point else {
            return;
        };
        let point = self.state.clamp(x, y);
        if point == last {
            return;
        }
        self.batcher.enqueue(last, point);
        self.last_point = Some(point);
    }

    fn finish_freehand(&mut self) {
        self.flush_batch();
        self.last_point = None;
        self.state.end_group();
    }

    fn discard_freehand(&mut self) {
        self.batcher.clear();
        self.last_point = None;
    }

    fn apply_remote(&mut self, event: DrawEvent, sender: ParticipantId, payload: &[u8]) {
        match codec::decode(event, payload) {
            Ok(action) => {
                self.state.apply_remote(action, sender);
            }
            Err(error) => {
                warn!(%sender, event = event.name(), %error, "dropping malformed draw payload");
            }
        }
    }
}

/// Drives the board until the input channel closes, then flushes anything
/// still queued and hands the board back.
pub async fn run<S: Surface>(
    mut board: Board<S>,
    mut inputs: mpsc::UnboundedReceiver<BoardInput>,
    mut ws_events: mpsc::UnboundedReceiver<WsEvent>,
) -> Board<S> {
    let mut tick = tokio::time::interval(board.batch_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut relay_open = true;

    loop {
        tokio::select! {
            input = inputs.recv() => match input {
                Some(input) => board.handle_input(input),
                None => break,
            },
            event = ws_events.recv(), if relay_open => match event {
                Some(event) => board.handle_ws_event(event),
                None => {
                    debug!("relay event stream ended");
                    relay_open = false;
                }
            },
            _ = tick.tick() => board.flush_batch(),
        }
    }

    board.flush_batch();
    board
}
