//! Pointer input rate control.
//!
//! [`SegmentBatcher`] cuts the number of network messages: segments queue up
//! between ticks and leave as one polyline. [`Throttle`] cuts the number of
//! pointer-move handler runs: at most one per window, the rest are dropped.

use std::time::{Duration, Instant};

use sketchboard_shared::codec::MAX_LINE_POINTS;
use sketchboard_shared::{BrushState, DrawAction, Point};

#[derive(Debug, Default)]
pub struct SegmentBatcher {
    queue: Vec<(Point, Point)>,
}

/// Points drained from the batcher in draw order.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub points: Vec<Point>,
}

impl Batch {
    /// A single point becomes a dot. Longer batches become lines of at most
    /// [`MAX_LINE_POINTS`], each starting where the previous one ended so
    /// the drawn path stays connected.
    pub fn into_actions(self, brush: BrushState) -> Vec<DrawAction> {
        if let [point] = self.points.as_slice() {
            return vec![DrawAction::Point {
                point: *point,
                brush,
            }];
        }
        let mut actions = Vec::with_capacity(self.points.len() / MAX_LINE_POINTS + 1);
        let mut start = 0;
        while start + 1 < self.points.len() {
            let end = (start + MAX_LINE_POINTS).min(self.points.len());
            actions.push(DrawAction::Line {
                points: self.points[start..end].to_vec(),
                brush,
            });
            start = end - 1;
        }
        actions
    }
}

impl SegmentBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, from: Point, to: Point) {
        self.queue.push((from, to));
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drains everything queued since the last flush as one connected
    /// polyline. A point repeated where two segments join is kept once.
    /// Returns `None` when nothing was queued.
    pub fn flush(&mut self) -> Option<Batch> {
        if self.queue.is_empty() {
            return None;
        }
        let mut points = Vec::with_capacity(self.queue.len() + 1);
        for (from, to) in self.queue.drain(..) {
            for point in [from, to] {
                if points.last() != Some(&point) {
                    points.push(point);
                }
            }
        }
        Some(Batch { points })
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// Leading-edge throttle: the first call in a window fires, later calls in
/// the same window are dropped.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fired: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_fired: None,
        }
    }

    pub fn admit(&mut self) -> bool {
        self.admit_at(Instant::now())
    }

    pub fn admit_at(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_fired {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_fired = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.last_fired = None;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
