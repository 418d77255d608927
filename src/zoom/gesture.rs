//! Gesture normalization.
//!
//! Every input backend (wheel, pinch, drag, host gesture library) is reduced
//! to one `GestureEvent`: a multiplicative scale factor about an optional
//! origin plus a pan delta. Coordinates are relative to the container centre.

/// Ignore tiny touchpad jitter deltas that cause direction flapping.
pub const WHEEL_DEADZONE: f64 = 0.02;
/// Logical scroll units needed to trigger one zoom step.
pub const WHEEL_STEP_UNIT: f64 = 0.5;
/// Zoom factor per accumulated wheel step.
pub const WHEEL_ZOOM_FACTOR: f64 = 1.1;
/// Upper bound on steps produced by a single wheel event.
const MAX_WHEEL_STEPS: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    pub scale_factor: f64,
    pub pan: (f64, f64),
    pub origin: Option<(f64, f64)>,
}

impl GestureEvent {
    pub fn zoom(scale_factor: f64, origin: Option<(f64, f64)>) -> Self {
        Self {
            scale_factor,
            pan: (0.0, 0.0),
            origin,
        }
    }

    pub fn pan(dx: f64, dy: f64) -> Self {
        Self {
            scale_factor: 1.0,
            pan: (dx, dy),
            origin: None,
        }
    }

    pub fn has_zoom(&self) -> bool {
        self.scale_factor.is_finite()
            && self.scale_factor > 0.0
            && (self.scale_factor - 1.0).abs() > f64::EPSILON
    }

    pub fn has_pan(&self) -> bool {
        self.pan.0 != 0.0 || self.pan.1 != 0.0
    }
}

/// Turns raw wheel deltas into whole zoom steps.
///
/// Positive deltas (scroll down) zoom out, negative deltas zoom in.
#[derive(Debug, Clone, Default)]
pub struct WheelAccumulator {
    accum: f64,
}

impl WheelAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a zoom event once enough delta has accumulated.
    pub fn feed(&mut self, dy: f64, origin: Option<(f64, f64)>) -> Option<GestureEvent> {
        if !dy.is_finite() || dy.abs() < WHEEL_DEADZONE {
            return None;
        }
        // Direction reversal starts over instead of cancelling out.
        if self.accum != 0.0 && self.accum.signum() != dy.signum() {
            self.accum = 0.0;
        }

        let mut accum = self.accum + dy;
        let mut steps = 0i32;
        while accum.abs() >= WHEEL_STEP_UNIT && steps.abs() < MAX_WHEEL_STEPS {
            if accum > 0.0 {
                steps += 1;
                accum -= WHEEL_STEP_UNIT;
            } else {
                steps -= 1;
                accum += WHEEL_STEP_UNIT;
            }
        }
        self.accum = accum;

        if steps == 0 {
            return None;
        }
        Some(GestureEvent::zoom(WHEEL_ZOOM_FACTOR.powi(-steps), origin))
    }

    pub fn reset(&mut self) {
        self.accum = 0.0;
    }
}

/// Pinch scale is reported relative to the scale at gesture begin.
#[derive(Debug, Clone, Default)]
pub struct PinchTracker {
    start_scale: Option<f64>,
}

impl PinchTracker {
    pub fn begin(&mut self, current_scale: f64) {
        self.start_scale = Some(current_scale);
    }

    pub fn update(
        &self,
        relative: f64,
        current_scale: f64,
        origin: Option<(f64, f64)>,
    ) -> Option<GestureEvent> {
        let base = self.start_scale?;
        if !relative.is_finite() || relative <= 0.0 || current_scale <= 0.0 {
            return None;
        }
        Some(GestureEvent::zoom(base * relative / current_scale, origin))
    }

    pub fn end(&mut self) {
        self.start_scale = None;
    }

    pub fn is_active(&self) -> bool {
        self.start_scale.is_some()
    }
}

/// Drag offsets are reported relative to the pointer-down position.
#[derive(Debug, Clone, Default)]
pub struct DragTracker {
    start: Option<(f64, f64)>,
}

impl DragTracker {
    pub fn begin(&mut self, current_position: (f64, f64)) {
        self.start = Some(current_position);
    }

    pub fn update(&self, offset: (f64, f64), current_position: (f64, f64)) -> Option<GestureEvent> {
        let (sx, sy) = self.start?;
        let target = (sx + offset.0, sy + offset.1);
        Some(GestureEvent::pan(
            target.0 - current_position.0,
            target.1 - current_position.1,
        ))
    }

    pub fn end(&mut self) {
        self.start = None;
    }
}

/// Position that keeps the content point under `origin` fixed while the
/// scale changes from `old_scale` to `new_scale`.
pub fn zoom_about(
    position: (f64, f64),
    origin: (f64, f64),
    old_scale: f64,
    new_scale: f64,
) -> (f64, f64) {
    if old_scale <= 0.0 {
        return position;
    }
    let ratio = new_scale / old_scale;
    (
        origin.0 - (origin.0 - position.0) * ratio,
        origin.1 - (origin.1 - position.1) * ratio,
    )
}
