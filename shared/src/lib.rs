use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

pub mod brush;
pub mod codec;

pub use brush::{BrushState, ColorId, ResolvedBrush, Rgb, ThicknessId};
pub use codec::MalformedPayload;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(
    Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub nickname: String,
}

/// Unit of undo/redo and of network transmission.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawAction {
    Point { point: Point, brush: BrushState },
    Line { points: Vec<Point>, brush: BrushState },
}

impl DrawAction {
    pub fn brush(&self) -> BrushState {
        match self {
            DrawAction::Point { brush, .. } | DrawAction::Line { brush, .. } => *brush,
        }
    }

    pub fn event(&self) -> DrawEvent {
        match self {
            DrawAction::Point { .. } => DrawEvent::Point,
            DrawAction::Line { .. } => DrawEvent::Line,
        }
    }
}

/// A committed line. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    points: Vec<Point>,
    brush: BrushState,
    author: ParticipantId,
}

impl Stroke {
    /// Returns `None` for fewer than two points.
    pub fn new(points: Vec<Point>, brush: BrushState, author: ParticipantId) -> Option<Self> {
        if points.len() < codec::MIN_LINE_POINTS {
            return None;
        }
        Some(Self {
            points,
            brush,
            author,
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn brush(&self) -> BrushState {
        self.brush
    }

    pub fn author(&self) -> &ParticipantId {
        &self.author
    }

    pub fn into_action(self) -> DrawAction {
        DrawAction::Line {
            points: self.points,
            brush: self.brush,
        }
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawEvent {
    Point,
    Line,
}

impl DrawEvent {
    pub fn name(self) -> &'static str {
        match self {
            DrawEvent::Point => "DrawPoint",
            DrawEvent::Line => "DrawLine",
        }
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub enum ClientMessage {
    JoinRoom { room: String, nickname: String },
    LeaveRoom,
    Draw { event: DrawEvent, payload: Vec<u8> },
    Reset,
}

#[derive(Serialize, Deserialize, Encode, Decode, Clone, Debug, PartialEq)]
pub enum ServerMessage {
    Joined {
        participant: Participant,
        participants: Vec<Participant>,
    },
    ParticipantJoined {
        participant: Participant,
    },
    ParticipantLeft {
        id: ParticipantId,
    },
    Draw {
        sender: ParticipantId,
        event: DrawEvent,
        payload: Vec<u8>,
    },
    Reset {
        sender: ParticipantId,
    },
    Error {
        message: String,
    },
}

pub fn encode_message<T: Encode>(message: &T) -> Result<Vec<u8>, bincode::error::EncodeError> {
    bincode::encode_to_vec(message, bincode::config::standard())
}

pub fn decode_message<T: Decode<()>>(payload: &[u8]) -> Result<T, bincode::error::DecodeError> {
    bincode::decode_from_slice(payload, bincode::config::standard()).map(|(message, _)| message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroke_needs_two_points() {
        let author = ParticipantId("me".into());
        assert!(Stroke::new(vec![Point::new(1.0, 1.0)], BrushState::default(), author.clone()).is_none());

        let stroke = Stroke::new(
            vec![Point::new(1.0, 1.0), Point::new(2.0, 2.0)],
            BrushState::default(),
            author.clone(),
        )
        .unwrap();
        assert_eq!(stroke.author(), &author);
        assert_eq!(stroke.into_action().event(), DrawEvent::Line);
    }

    #[test]
    fn envelope_survives_bincode() {
        let message = ServerMessage::Draw {
            sender: ParticipantId("peer".into()),
            event: DrawEvent::Point,
            payload: codec::encode_point(Point::new(3.0, 4.0), BrushState::default()),
        };
        let bytes = encode_message(&message).unwrap();
        assert_eq!(decode_message::<ServerMessage>(&bytes).unwrap(), message);
    }

    #[test]
    fn garbage_envelope_is_an_error() {
        assert!(decode_message::<ClientMessage>(&[0xff, 0xff, 0xff]).is_err());
    }
}
