//! Zoom/pan engine for the active slide.
//!
//! - `steps` - step table and nearest-step quantization
//! - `gesture` - wheel/pinch/drag normalization into one event shape
//! - `transform` - per-slide transform state machine

pub mod gesture;
pub mod steps;
pub mod transform;

pub use gesture::{DragTracker, GestureEvent, PinchTracker, WheelAccumulator};
pub use steps::{nearest_step, step_index, StepTable};
pub use transform::{
    TransformConfig, TransformEngine, TransformEvent, TransformSnapshot, TransformState,
};
