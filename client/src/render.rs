//! Boundary to the drawing widget.
//!
//! The toolkit implements [`Surface`]; the core only tells it what to paint
//! and what to take away. Shapes are addressed by [`ShapeId`] so undo can
//! remove a stroke even when remote strokes were painted after it.

use sketchboard_shared::{BrushState, DrawAction, Point};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u64);

pub trait Surface {
    fn draw_shape(&mut self, id: ShapeId, action: &DrawAction);
    fn remove_shape(&mut self, id: ShapeId);
    /// Replaces any previous preview segment.
    fn draw_preview(&mut self, from: Point, to: Point, brush: BrushState);
    fn clear_preview(&mut self);
    fn clear(&mut self);
}

/// Paints nothing. For headless clients and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl Surface for NullSurface {
    fn draw_shape(&mut self, _id: ShapeId, _action: &DrawAction) {}
    fn remove_shape(&mut self, _id: ShapeId) {}
    fn draw_preview(&mut self, _from: Point, _to: Point, _brush: BrushState) {}
    fn clear_preview(&mut self) {}
    fn clear(&mut self) {}
}

impl<S: Surface + ?Sized> Surface for Box<S> {
    fn draw_shape(&mut self, id: ShapeId, action: &DrawAction) {
        (**self).draw_shape(id, action);
    }

    fn remove_shape(&mut self, id: ShapeId) {
        (**self).remove_shape(id);
    }

    fn draw_preview(&mut self, from: Point, to: Point, brush: BrushState) {
        (**self).draw_preview(from, to, brush);
    }

    fn clear_preview(&mut self) {
        (**self).clear_preview();
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}
