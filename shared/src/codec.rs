//! Binary payload layout for draw actions.
//!
//! All values are little-endian.
//!
//! ```text
//! point: x f64 | y f64 | thickness u8 | color u8                  (18 bytes)
//! line:  count u32 | count * (x f64, y f64) | thickness u8 | color u8
//! ```

use thiserror::Error;

use crate::brush::{BrushState, ColorId, ThicknessId};
use crate::{DrawAction, DrawEvent, Point};

const COORD_LEN: usize = 2 * std::mem::size_of::<f64>();
const BRUSH_LEN: usize = 2;
const COUNT_LEN: usize = std::mem::size_of::<u32>();

pub const POINT_PAYLOAD_LEN: usize = COORD_LEN + BRUSH_LEN;
pub const MIN_LINE_POINTS: usize = 2;
pub const MAX_LINE_POINTS: usize = 5000;
pub const MAX_PAYLOAD_LEN: usize = line_payload_len(MAX_LINE_POINTS);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MalformedPayload {
    #[error("payload is {actual} bytes, expected {expected}")]
    Length { expected: usize, actual: usize },
    #[error("payload is {actual} bytes, too short for a point count")]
    MissingCount { actual: usize },
    #[error("line declares {0} points")]
    PointCount(u32),
    #[error("unknown color id {0}")]
    UnknownColor(u8),
    #[error("unknown thickness id {0}")]
    UnknownThickness(u8),
    #[error("non-finite coordinate at point {0}")]
    NonFinite(usize),
}

pub const fn line_payload_len(count: usize) -> usize {
    COUNT_LEN + count * COORD_LEN + BRUSH_LEN
}

pub fn encode(action: &DrawAction) -> Vec<u8> {
    match action {
        DrawAction::Point { point, brush } => encode_point(*point, *brush),
        DrawAction::Line { points, brush } => encode_line(points, *brush),
    }
}

pub fn encode_point(point: Point, brush: BrushState) -> Vec<u8> {
    let mut payload = Vec::with_capacity(POINT_PAYLOAD_LEN);
    push_point(&mut payload, point);
    push_brush(&mut payload, brush);
    payload
}

/// Receivers reject more than [`MAX_LINE_POINTS`]; callers split longer
/// polylines before encoding.
pub fn encode_line(points: &[Point], brush: BrushState) -> Vec<u8> {
    debug_assert!(points.len() <= MAX_LINE_POINTS);
    let mut payload = Vec::with_capacity(line_payload_len(points.len()));
    payload.extend_from_slice(&(points.len() as u32).to_le_bytes());
    for point in points {
        push_point(&mut payload, *point);
    }
    push_brush(&mut payload, brush);
    payload
}

pub fn decode(event: DrawEvent, payload: &[u8]) -> Result<DrawAction, MalformedPayload> {
    match event {
        DrawEvent::Point => decode_point(payload),
        DrawEvent::Line => decode_line(payload),
    }
}

pub fn decode_point(payload: &[u8]) -> Result<DrawAction, MalformedPayload> {
    if payload.len() != POINT_PAYLOAD_LEN {
        return Err(MalformedPayload::Length {
            expected: POINT_PAYLOAD_LEN,
            actual: payload.len(),
        });
    }
    let point = read_point(&payload[..COORD_LEN], 0)?;
    let brush = read_brush(&payload[COORD_LEN..])?;
    Ok(DrawAction::Point { point, brush })
}

pub fn decode_line(payload: &[u8]) -> Result<DrawAction, MalformedPayload> {
    let Some(count_bytes) = payload.get(..COUNT_LEN) else {
        return Err(MalformedPayload::MissingCount {
            actual: payload.len(),
        });
    };
    let declared = u32::from_le_bytes([count_bytes[0], count_bytes[1], count_bytes[2], count_bytes[3]]);
    let count = declared as usize;
    if !(MIN_LINE_POINTS..=MAX_LINE_POINTS).contains(&count) {
        return Err(MalformedPayload::PointCount(declared));
    }
    let expected = line_payload_len(count);
    if payload.len() != expected {
        return Err(MalformedPayload::Length {
            expected,
            actual: payload.len(),
        });
    }

    let body = &payload[COUNT_LEN..expected - BRUSH_LEN];
    let points = body
        .chunks_exact(COORD_LEN)
        .enumerate()
        .map(|(index, chunk)| read_point(chunk, index))
        .collect::<Result<Vec<_>, _>>()?;
    let brush = read_brush(&payload[expected - BRUSH_LEN..])?;
    Ok(DrawAction::Line { points, brush })
}

fn push_point(payload: &mut Vec<u8>, point: Point) {
    payload.extend_from_slice(&point.x.to_le_bytes());
    payload.extend_from_slice(&point.y.to_le_bytes());
}

fn push_brush(payload: &mut Vec<u8>, brush: BrushState) {
    payload.push(brush.thickness.id());
    payload.push(brush.color.id());
}

fn read_f64(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[..8]);
    f64::from_le_bytes(raw)
}

fn read_point(chunk: &[u8], index: usize) -> Result<Point, MalformedPayload> {
    let point = Point {
        x: read_f64(&chunk[..8]),
        y: read_f64(&chunk[8..COORD_LEN]),
    };
    if !point.is_finite() {
        return Err(MalformedPayload::NonFinite(index));
    }
    Ok(point)
}

fn read_brush(trailer: &[u8]) -> Result<BrushState, MalformedPayload> {
    let thickness = ThicknessId::try_from(trailer[0])?;
    let color = ColorId::try_from(trailer[1])?;
    Ok(BrushState { color, thickness })
}
