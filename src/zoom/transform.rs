//! Per-slide zoom/pan state machine.
//!
//! The engine keeps the live scale and position in local state and publishes
//! events only when the quantized step or the threshold side changes, so
//! wheel/pinch input arriving every frame does not reach consumers every
//! frame.

use std::time::Duration;

use tracing::{debug, trace};

use crate::timer::{Debounce, SharedClock};
use crate::zoom::gesture::{zoom_about, GestureEvent};
use crate::zoom::steps::StepTable;

/// Delay before an un-zoomed slide is recentered.
pub const DEFAULT_RECENTER_DELAY: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, PartialEq)]
pub struct TransformConfig {
    pub steps: StepTable,
    /// Scale treated as "not zoomed". `None` means the first step.
    pub threshold: Option<f64>,
    pub recenter_delay: Duration,
    pub enabled: bool,
    pub enable_minimap: bool,
}

impl TransformConfig {
    /// Effective threshold, always inside the step range.
    pub fn threshold(&self) -> f64 {
        self.steps
            .clamp(self.threshold.unwrap_or_else(|| self.steps.min()))
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            steps: StepTable::default(),
            threshold: None,
            recenter_delay: DEFAULT_RECENTER_DELAY,
            enabled: true,
            enable_minimap: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    pub scale: f64,
    pub position_x: f64,
    pub position_y: f64,
}

impl TransformState {
    pub fn identity(scale: f64) -> Self {
        Self {
            scale,
            position_x: 0.0,
            position_y: 0.0,
        }
    }

    pub fn position(&self) -> (f64, f64) {
        (self.position_x, self.position_y)
    }

    pub fn is_centered(&self) -> bool {
        self.position_x == 0.0 && self.position_y == 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformEvent {
    /// The snapped step changed.
    StepChanged { step: f64, index: usize },
    /// `disable_transforms` flipped. `true` means at or below threshold.
    TransformsDisabled(bool),
    /// The debounced recenter ran.
    Recentered,
    /// State was forced back to identity on deactivation.
    Reset,
}

/// Read-only view of an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSnapshot {
    pub scale: f64,
    pub step: f64,
    pub step_index: usize,
    pub steps: Vec<f64>,
    pub position: (f64, f64),
    pub disabled: bool,
    pub disable_transforms: bool,
    pub display_minimap: bool,
    pub animated: bool,
    pub can_step_in: bool,
    pub can_step_out: bool,
}

pub struct TransformEngine {
    config: TransformConfig,
    clock: SharedClock,
    state: TransformState,
    /// Index of the last published step.
    step_index: usize,
    disable_transforms: bool,
    live: bool,
    animated: bool,
    recenter: Debounce,
    recenter_count: u32,
    events: Vec<TransformEvent>,
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine")
            .field("state", &self.state)
            .field("step_index", &self.step_index)
            .field("disable_transforms", &self.disable_transforms)
            .field("live", &self.live)
            .field("recenter_pending", &self.recenter.is_pending())
            .finish()
    }
}

impl TransformEngine {
    pub fn new(config: TransformConfig, clock: SharedClock) -> Self {
        let rest = config.threshold();
        let step_index = config.steps.index_of(rest);
        let recenter = Debounce::new(config.recenter_delay);
        Self {
            config,
            clock,
            state: TransformState::identity(rest),
            step_index,
            disable_transforms: true,
            live: false,
            animated: false,
            recenter,
            recenter_count: 0,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn state(&self) -> TransformState {
        self.state
    }

    pub fn scale(&self) -> f64 {
        self.state.scale
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold()
    }

    /// Published step value.
    pub fn step(&self) -> f64 {
        self.config.steps.get(self.step_index)
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// True while the scale is at or below the threshold. Slide navigation
    /// by swipe/keyboard is only allowed in this state.
    pub fn disable_transforms(&self) -> bool {
        self.disable_transforms
    }

    /// True when the engine ignores input (zoom disabled or slide inactive).
    pub fn disabled(&self) -> bool {
        !self.config.enabled || !self.live
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn display_minimap(&self) -> bool {
        self.config.enable_minimap && !self.disable_transforms
    }

    pub fn can_step_in(&self) -> bool {
        !self.disabled() && self.step_index < self.config.steps.last_index()
    }

    pub fn can_step_out(&self) -> bool {
        !self.disabled() && self.step_index > 0
    }

    pub fn recenter_pending(&self) -> bool {
        self.recenter.is_pending()
    }

    pub fn recenter_count(&self) -> u32 {
        self.recenter_count
    }

    pub fn take_events(&mut self) -> Vec<TransformEvent> {
        std::mem::take(&mut self.events)
    }

    /// Slide became the active one.
    pub fn activate(&mut self) {
        if !self.live {
            trace!("Transform engine activated");
            self.live = true;
        }
    }

    /// Slide stopped being active: drop any pending recenter and go back to
    /// identity so a revisit starts unzoomed.
    pub fn deactivate(&mut self) {
        let cancelled = self.recenter.cancel();
        let rest = self.threshold();
        self.state = TransformState::identity(rest);
        self.step_index = self.config.steps.index_of(rest);
        self.disable_transforms = true;
        self.animated = false;
        self.live = false;
        self.events.push(TransformEvent::Reset);
        debug!(cancelled_recenter = cancelled, "Transform engine reset on deactivation");
    }

    pub fn set_scale(&mut self, next: f64, animate: bool) {
        if self.disabled() {
            trace!(next, "Ignoring set_scale on disabled engine");
            return;
        }
        self.apply_scale(next, animate);
    }

    pub fn next_step(&mut self) {
        if self.disabled() {
            return;
        }
        let index = self.config.steps.next_index(self.state.scale);
        self.apply_scale(self.config.steps.get(index), true);
    }

    pub fn previous_step(&mut self) {
        if self.disabled() {
            return;
        }
        let index = self.config.steps.previous_index(self.state.scale);
        self.apply_scale(self.config.steps.get(index), true);
    }

    pub fn reset_step(&mut self) {
        if self.disabled() {
            return;
        }
        self.apply_scale(self.threshold(), true);
    }

    /// Slider-style direct set.
    pub fn on_step_change(&mut self, value: f64) {
        if self.disabled() {
            return;
        }
        self.apply_scale(value, false);
    }

    pub fn apply_gesture(&mut self, event: &GestureEvent) {
        if self.disabled() {
            return;
        }

        if event.has_zoom() {
            let old = self.state.scale;
            let new = self.config.steps.clamp(old * event.scale_factor);
            if let Some(origin) = event.origin {
                let (x, y) = zoom_about(self.state.position(), origin, old, new);
                self.state.position_x = x;
                self.state.position_y = y;
            }
            self.apply_scale(new, false);
        }

        // Pan only captures input while zoomed in.
        if event.has_pan() && !self.disable_transforms {
            self.state.position_x += event.pan.0;
            self.state.position_y += event.pan.1;
            self.animated = false;
        }
    }

    /// Runs the debounced recenter once its deadline has passed.
    pub fn tick(&mut self) -> bool {
        if !self.recenter.poll(self.clock.now()) {
            return false;
        }
        self.state.position_x = 0.0;
        self.state.position_y = 0.0;
        self.animated = true;
        self.recenter_count += 1;
        self.events.push(TransformEvent::Recentered);
        debug!(scale = self.state.scale, "Recentered after zoom-out");
        true
    }

    pub fn snapshot(&self) -> TransformSnapshot {
        TransformSnapshot {
            scale: self.state.scale,
            step: self.step(),
            step_index: self.step_index,
            steps: self.config.steps.as_slice().to_vec(),
            position: self.state.position(),
            disabled: self.disabled(),
            disable_transforms: self.disable_transforms,
            display_minimap: self.display_minimap(),
            animated: self.animated,
            can_step_in: self.can_step_in(),
            can_step_out: self.can_step_out(),
        }
    }

    fn apply_scale(&mut self, next: f64, animate: bool) {
        let clamped = self.config.steps.clamp(next);
        self.state.scale = clamped;
        self.animated = animate;

        let index = self.config.steps.index_of(clamped);
        if index != self.step_index {
            self.step_index = index;
            self.events.push(TransformEvent::StepChanged {
                step: self.config.steps.get(index),
                index,
            });
        }

        let below = clamped <= self.threshold();
        if below == self.disable_transforms {
            return;
        }
        self.disable_transforms = below;
        self.events.push(TransformEvent::TransformsDisabled(below));

        if below {
            self.recenter.schedule(self.clock.now());
            trace!(scale = clamped, "Scheduled recenter");
        } else if self.recenter.cancel() {
            trace!(scale = clamped, "Cancelled pending recenter");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualClock;

    fn engine(clock: &ManualClock) -> TransformEngine {
        let mut engine = TransformEngine::new(TransformConfig::default(), clock.shared());
        engine.activate();
        engine
    }

    fn step_events(events: &[TransformEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, TransformEvent::StepChanged { .. }))
            .count()
    }

    #[test]
    fn test_scale_clamping() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        for requested in [-5.0, 0.0, 0.5, 1.0, 2.2, 8.0, 15.0, f64::INFINITY, f64::NAN] {
            engine.set_scale(requested, false);
            let scale = engine.scale();
            assert!((1.0..=8.0).contains(&scale), "{requested} -> {scale}");
        }
    }

    #[test]
    fn test_continuous_input_publishes_only_step_changes() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        // 1.00 .. 1.99 in 100 tiny increments crosses the 1.0/1.5 boundary
        // and the 1.5/2.0 boundary once each.
        for i in 0..100 {
            engine.set_scale(1.0 + i as f64 * 0.01, false);
        }
        let events = engine.take_events();
        assert_eq!(step_events(&events), 2);
        assert_eq!(engine.step(), 2.0);
    }

    #[test]
    fn test_next_and_previous_step_clamp() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        assert!(!engine.can_step_out());
        engine.previous_step();
        assert_eq!(engine.scale(), 1.0);

        for _ in 0..20 {
            engine.next_step();
        }
        assert_eq!(engine.scale(), 8.0);
        assert!(!engine.can_step_in());
        assert!(engine.can_step_out());

        engine.previous_step();
        assert_eq!(engine.scale(), 6.0);
    }

    #[test]
    fn test_next_step_from_between_steps() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        engine.set_scale(2.4, false);
        assert_eq!(engine.step(), 2.0);
        engine.next_step();
        assert_eq!(engine.scale(), 3.0);
    }

    #[test]
    fn test_threshold_flag_inclusive() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        assert!(engine.disable_transforms());
        engine.set_scale(1.0001, false);
        assert!(!engine.disable_transforms());
        assert!(engine.display_minimap());
        engine.set_scale(1.0, false);
        assert!(engine.disable_transforms());
        assert!(!engine.display_minimap());
    }

    #[test]
    fn test_recenter_debounced_once() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);

        engine.set_scale(3.0, false);
        engine.apply_gesture(&GestureEvent::pan(40.0, -20.0));
        engine.set_scale(1.0, false);
        clock.advance_ms(50);
        assert!(!engine.tick());

        engine.set_scale(3.0, false);
        assert!(!engine.recenter_pending());
        engine.set_scale(1.0, false);
        clock.advance_ms(50);
        assert!(!engine.tick());

        clock.advance_ms(69);
        assert!(!engine.tick());
        clock.advance_ms(1);
        assert!(engine.tick());
        assert!(engine.state().is_centered());

        clock.advance_ms(1_000);
        assert!(!engine.tick());
        assert_eq!(engine.recenter_count(), 1);
    }

    #[test]
    fn test_no_recenter_without_zoom() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        engine.set_scale(1.0, false);
        engine.reset_step();
        clock.advance_ms(500);
        assert!(!engine.tick());
    }

    #[test]
    fn test_pan_ignored_when_not_zoomed() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        engine.apply_gesture(&GestureEvent::pan(10.0, 10.0));
        assert!(engine.state().is_centered());

        engine.set_scale(2.0, false);
        engine.apply_gesture(&GestureEvent::pan(10.0, 5.0));
        assert_eq!(engine.state().position(), (10.0, 5.0));
    }

    #[test]
    fn test_zoom_gesture_about_origin() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        engine.apply_gesture(&GestureEvent::zoom(2.0, Some((100.0, 0.0))));
        assert_eq!(engine.scale(), 2.0);
        assert_eq!(engine.state().position(), (-100.0, 0.0));
    }

    #[test]
    fn test_deactivation_resets_and_cancels() {
        let clock = ManualClock::new();
        let mut engine = engine(&clock);
        engine.set_scale(2.5, false);
        engine.apply_gesture(&GestureEvent::pan(30.0, 30.0));
        engine.set_scale(1.0, false);
        assert!(engine.recenter_pending());

        engine.deactivate();
        assert!(!engine.recenter_pending());
        assert_eq!(engine.state(), TransformState::identity(1.0));
        assert!(engine.disabled());

        clock.advance_ms(500);
        assert!(!engine.tick());
        assert_eq!(engine.recenter_count(), 0);

        // Inactive engines ignore input.
        engine.set_scale(4.0, false);
        assert_eq!(engine.scale(), 1.0);
    }

    #[test]
    fn test_disabled_when_zoom_off() {
        let clock = ManualClock::new();
        let config = TransformConfig {
            enabled: false,
            ..Default::default()
        };
        let mut engine = TransformEngine::new(config, clock.shared());
        engine.activate();
        engine.next_step();
        assert_eq!(engine.scale(), 1.0);
        assert!(engine.snapshot().disabled);
    }

    #[test]
    fn test_custom_threshold() {
        let clock = ManualClock::new();
        let config = TransformConfig {
            steps: StepTable::new(vec![0.5, 1.0, 2.0]).unwrap(),
            threshold: Some(1.0),
            ..Default::default()
        };
        let mut engine = TransformEngine::new(config, clock.shared());
        engine.activate();
        assert_eq!(engine.scale(), 1.0);
        engine.set_scale(0.5, false);
        assert!(engine.disable_transforms());
        engine.set_scale(2.0, false);
        assert!(!engine.disable_transforms());
        engine.reset_step();
        assert_eq!(engine.scale(), 1.0);
    }
}
