use sketchboard_shared::{BrushState, ColorId, DrawAction, ParticipantId, Point, Stroke, ThicknessId};
use tracing::debug;

use crate::config::BoardConfig;
use crate::error::{SketchError, SketchResult};
use crate::geometry::BrushSettings;
use crate::history::BoundedHistory;
use crate::render::{NullSurface, ShapeId, Surface};

/// Author recorded on local strokes before the relay assigns an id.
pub const LOCAL_AUTHOR: &str = "local";

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StrokePhase {
    Idle,
    Drawing { origin: Point },
    Previewing { origin: Point, preview: Point },
}

impl StrokePhase {
    fn origin(&self) -> Option<Point> {
        match self {
            StrokePhase::Idle => None,
            StrokePhase::Drawing { origin } | StrokePhase::Previewing { origin, .. } => {
                Some(*origin)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub action: DrawAction,
    pub author: ParticipantId,
}

/// One undo step. A freehand press-to-release is a single entry holding
/// every shape flushed while the pointer was down.
#[derive(Clone, Debug, PartialEq)]
pub struct HistoryEntry {
    pub shapes: Vec<Shape>,
}

/// Committed canvas content plus the local undo/redo stacks.
///
/// Remote strokes land on the canvas but never in the local history.
pub struct StrokeState<S: Surface = NullSurface> {
    surface: S,
    brush: BrushSettings,
    author: ParticipantId,
    phase: StrokePhase,
    shapes: Vec<Shape>,
    undo: BoundedHistory<HistoryEntry>,
    redo: BoundedHistory<HistoryEntry>,
    group_open: bool,
    next_shape: u64,
}

impl StrokeState<NullSurface> {
    pub fn headless(config: &BoardConfig) -> Self {
        Self::new(config, NullSurface)
    }
}

impl<S: Surface> StrokeState<S> {
    pub fn new(config: &BoardConfig, surface: S) -> Self {
        Self {
            surface,
            brush: BrushSettings::new(
                config.default_brush(),
                config.canvas_width,
                config.canvas_height,
            ),
            author: ParticipantId(LOCAL_AUTHOR.to_string()),
            phase: StrokePhase::Idle,
            shapes: Vec::new(),
            undo: BoundedHistory::new(config.history_capacity),
            redo: BoundedHistory::new(config.history_capacity),
            group_open: false,
            next_shape: 0,
        }
    }

    pub fn phase(&self) -> StrokePhase {
        self.phase
    }

    pub fn brush(&self) -> BrushState {
        self.brush.brush()
    }

    pub fn brush_settings(&self) -> &BrushSettings {
        &self.brush
    }

    pub fn brush_settings_mut(&mut self) -> &mut BrushSettings {
        &mut self.brush
    }

    pub fn set_color(&mut self, color: ColorId) {
        self.brush.set_color(color);
    }

    pub fn set_thickness(&mut self, thickness: ThicknessId) {
        self.brush.set_thickness(thickness);
    }

    pub fn set_author(&mut self, author: ParticipantId) {
        self.author = author;
    }

    pub fn clamp(&self, x: f64, y: f64) -> Point {
        self.brush.clamp(x, y)
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn undo_len(&self) -> usize {
        self.undo.count()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.count()
    }

    pub fn undo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.undo.iter()
    }

    pub fn redo_entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.redo.iter()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn begin_stroke(&mut self, x: f64, y: f64) -> SketchResult<()> {
        if self.phase != StrokePhase::Idle {
            return Err(SketchError::InvalidState {
                operation: "begin_stroke",
                phase: self.phase,
            });
        }
        let origin = self.clamp(x, y);
        self.phase = StrokePhase::Drawing { origin };
        Ok(())
    }

    pub fn update_preview(&mut self, x: f64, y: f64) -> SketchResult<()> {
        let Some(origin) = self.phase.origin() else {
            return Err(SketchError::InvalidState {
                operation: "update_preview",
                phase: self.phase,
            });
        };
        let point = self.clamp(x, y);
        if point == origin {
            return Ok(());
        }
        self.surface.draw_preview(origin, point, self.brush.brush());
        self.phase = StrokePhase::Previewing {
            origin,
            preview: point,
        };
        Ok(())
    }

    /// Ends the stroke in progress. Returns the committed action, or `None`
    /// when the end point equals the origin (a click without a drag).
    pub fn commit_stroke(&mut self, x: f64, y: f64) -> SketchResult<Option<DrawAction>> {
        let Some(origin) = self.phase.origin() else {
            return Err(SketchError::InvalidState {
                operation: "commit_stroke",
                phase: self.phase,
            });
        };
        let end = self.clamp(x, y);
        self.surface.clear_preview();
        self.phase = StrokePhase::Idle;

        if end == origin {
            debug!("discarding zero-length stroke");
            return Ok(None);
        }
        let Some(stroke) = Stroke::new(vec![origin, end], self.brush.brush(), self.author.clone())
        else {
            return Ok(None);
        };
        let action = stroke.into_action();
        self.commit_action(action.clone());
        Ok(Some(action))
    }

    /// Abandons the stroke in progress without committing anything.
    pub fn cancel_stroke(&mut self) {
        if self.phase == StrokePhase::Idle {
            return;
        }
        debug!(phase = ?self.phase, "cancelling stroke");
        self.surface.clear_preview();
        self.phase = StrokePhase::Idle;
    }

    /// Draws a local action and records it as its own undo entry. Any redo
    /// branch is dropped.
    pub fn commit_action(&mut self, action: DrawAction) -> ShapeId {
        self.group_open = false;
        let shape = self.draw_local(action);
        let id = shape.id;
        self.undo.push(HistoryEntry {
            shapes: vec![shape],
        });
        self.redo.clear();
        id
    }

    /// Draws a local action as the first shape of a new undo entry that
    /// later [`extend_group`](Self::extend_group) calls append to.
    pub fn begin_group(&mut self, action: DrawAction) -> ShapeId {
        let id = self.commit_action(action);
        self.group_open = true;
        id
    }

    /// Appends to the open group, or starts a new one when none is open.
    pub fn extend_group(&mut self, action: DrawAction) -> ShapeId {
        if !self.group_open {
            return self.begin_group(action);
        }
        let shape = self.draw_local(action);
        let id = shape.id;
        match self.undo.peek_mut() {
            Some(entry) => entry.shapes.push(shape),
            None => self.undo.push(HistoryEntry {
                shapes: vec![shape],
            }),
        }
        self.redo.clear();
        id
    }

    pub fn end_group(&mut self) {
        self.group_open = false;
    }

    /// Draws a stroke from another participant. Not undoable locally.
    pub fn apply_remote(&mut self, action: DrawAction, author: ParticipantId) -> ShapeId {
        let id = self.allocate_shape();
        self.draw(id, action, author);
        id
    }

    /// Returns whether another undo is possible.
    pub fn undo(&mut self) -> bool {
        self.group_open = false;
        let Some(entry) = self.undo.pop() else {
            return false;
        };
        for shape in &entry.shapes {
            self.erase(shape.id);
        }
        self.redo.push(entry);
        self.can_undo()
    }

    /// Returns whether another redo is possible.
    pub fn redo(&mut self) -> bool {
        self.group_open = false;
        let Some(entry) = self.redo.pop() else {
            return false;
        };
        for shape in &entry.shapes {
            self.draw(shape.id, shape.action.clone(), shape.author.clone());
        }
        self.undo.push(entry);
        self.can_redo()
    }

    pub fn reset(&mut self) {
        self.shapes.clear();
        self.undo.clear();
        self.redo.clear();
        self.group_open = false;
        self.phase = StrokePhase::Idle;
        self.surface.clear();
    }

    fn allocate_shape(&mut self) -> ShapeId {
        let id = ShapeId(self.next_shape);
        self.next_shape += 1;
        id
    }

    fn draw_local(&mut self, action: DrawAction) -> Shape {
        let id = self.allocate_shape();
        let shape = Shape {
            id,
            action,
            author: self.author.clone(),
        };
        self.draw(id, shape.action.clone(), shape.author.clone());
        shape
    }

    fn draw(&mut self, id: ShapeId, action: DrawAction, author: ParticipantId) {
        self.surface.draw_shape(id, &action);
        self.shapes.push(Shape { id, action, author });
    }

    fn erase(&mut self, id: ShapeId) {
        self.surface.remove_shape(id);
        self.shapes.retain(|shape| shape.id != id);
    }
}
