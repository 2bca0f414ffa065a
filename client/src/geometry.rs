use sketchboard_shared::{BrushState, ColorId, Point, ThicknessId};

/// Region a brush center may occupy so the whole stroke stays on the canvas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CanvasBounds {
    pub min: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl CanvasBounds {
    pub fn new(canvas_width: f64, canvas_height: f64, half_thickness: f64) -> Self {
        Self {
            min: half_thickness,
            max_x: canvas_width - half_thickness,
            max_y: canvas_height - half_thickness,
        }
    }

    pub fn clamp(&self, x: f64, y: f64) -> Point {
        Point {
            x: clamp_axis(x, self.min, self.max_x),
            y: clamp_axis(y, self.min, self.max_y),
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min && point.x <= self.max_x && point.y >= self.min && point.y <= self.max_y
    }
}

fn clamp_axis(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrushChange {
    pub brush: BrushState,
    pub half_thickness: f64,
    pub bounds: CanvasBounds,
}

type BrushListener = Box<dyn FnMut(&BrushChange)>;

/// Current brush plus the geometry derived from it.
///
/// Setters recompute `half_thickness` and the clamp bounds before any
/// listener runs, so the next clamped point already uses the new brush.
pub struct BrushSettings {
    brush: BrushState,
    canvas_width: f64,
    canvas_height: f64,
    half_thickness: f64,
    bounds: CanvasBounds,
    listeners: Vec<BrushListener>,
}

impl BrushSettings {
    pub fn new(brush: BrushState, canvas_width: f64, canvas_height: f64) -> Self {
        let half_thickness = brush.half_thickness();
        Self {
            brush,
            canvas_width,
            canvas_height,
            half_thickness,
            bounds: CanvasBounds::new(canvas_width, canvas_height, half_thickness),
            listeners: Vec::new(),
        }
    }

    pub fn on_change(&mut self, listener: impl FnMut(&BrushChange) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn brush(&self) -> BrushState {
        self.brush
    }

    pub fn thickness(&self) -> f64 {
        self.brush.thickness.width_px()
    }

    pub fn half_thickness(&self) -> f64 {
        self.half_thickness
    }

    pub fn bounds(&self) -> CanvasBounds {
        self.bounds
    }

    pub fn clamp(&self, x: f64, y: f64) -> Point {
        self.bounds.clamp(x, y)
    }

    pub fn set_color(&mut self, color: ColorId) {
        self.brush.color = color;
        self.notify();
    }

    pub fn set_thickness(&mut self, thickness: ThicknessId) {
        self.brush.thickness = thickness;
        self.half_thickness = self.brush.half_thickness();
        self.bounds = CanvasBounds::new(self.canvas_width, self.canvas_height, self.half_thickness);
        self.notify();
    }

    fn notify(&mut self) {
        let change = BrushChange {
            brush: self.brush,
            half_thickness: self.half_thickness,
            bounds: self.bounds,
        };
        for listener in &mut self.listeners {
            listener(&change);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn settings_800_600() -> BrushSettings {
        BrushSettings::new(
            BrushState::new(ColorId::Default, ThicknessId::SemiThin),
            800.0,
            600.0,
        )
    }

    #[test]
    fn clamps_into_brush_bounds() {
        let settings = settings_800_600();
        assert_eq!(settings.half_thickness(), 2.0);
        assert_eq!(settings.clamp(1.0, 1.0), Point::new(2.0, 2.0));
        assert_eq!(settings.clamp(900.0, 900.0), Point::new(798.0, 598.0));
        assert_eq!(settings.clamp(400.0, 300.0), Point::new(400.0, 300.0));
    }

    #[test]
    fn clamp_always_lands_inside() {
        let settings = settings_800_600();
        let bounds = settings.bounds();
        let samples = [
            f64::NEG_INFINITY,
            -1e12,
            -3.0,
            0.0,
            1.999,
            2.0,
            250.5,
            597.9,
            598.0,
            799.0,
            1e12,
            f64::INFINITY,
            f64::NAN,
        ];
        for x in samples {
            for y in samples {
                let point = settings.clamp(x, y);
                assert!(bounds.contains(point), "({x}, {y}) -> {point:?}");
            }
        }
    }

    #[test]
    fn thickness_change_updates_bounds_before_listeners_run() {
        let mut settings = settings_800_600();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        settings.on_change(move |change| sink.borrow_mut().push(*change));

        settings.set_thickness(ThicknessId::Thick);
        assert_eq!(settings.clamp(0.0, 0.0), Point::new(5.0, 5.0));
        assert_eq!(settings.clamp(900.0, 900.0), Point::new(795.0, 595.0));

        settings.set_color(ColorId::Red);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].half_thickness, 5.0);
        assert_eq!(seen[0].bounds.max_x, 795.0);
        assert_eq!(seen[1].brush.color, ColorId::Red);
    }
}
