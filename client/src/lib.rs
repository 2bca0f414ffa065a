mod app;
mod batcher;
mod config;
mod error;
mod geometry;
mod history;
mod net;
mod relay;
mod render;
mod state;
mod ws;

pub use app::{run, Board, BoardInput, Tool};
pub use batcher::{Batch, SegmentBatcher, Throttle};
pub use config::BoardConfig;
pub use error::{ConfigError, SketchError, SketchResult};
pub use geometry::{BrushChange, BrushSettings, CanvasBounds};
pub use history::BoundedHistory;
pub use net::{parse_participants, ParticipantsClient};
pub use relay::{RelayEvent, SyncRelay};
pub use render::{NullSurface, ShapeId, Surface};
pub use state::{HistoryEntry, Shape, StrokePhase, StrokeState, LOCAL_AUTHOR};
pub use ws::{connect_ws, WsConnection, WsEvent, WsSender};
