//! Viewer configuration.
//!
//! `Default` carries the documented defaults; `from_env` layers `IDXV_*`
//! overrides on top. Unparsable values are ignored with a warning.

use std::time::Duration;

use tracing::{debug, warn};

use crate::layout::fit::{DEFAULT_FIT_HYSTERESIS, DEFAULT_FIT_PADDING};
use crate::preload::worker::{DEFAULT_WARM_ENTRIES, DEFAULT_WORKERS};
use crate::zoom::steps::StepTable;
use crate::zoom::transform::{TransformConfig, DEFAULT_RECENTER_DELAY};

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Wrap navigation at the ends.
    pub loop_navigation: bool,
    /// Allow zoom/pan interaction.
    pub enable_zoom: bool,
    /// Mount the thumbnail strip synchronizer.
    pub enable_thumbnails: bool,
    /// Scale treated as "not zoomed". `None` means the first step.
    pub transform_threshold: Option<f64>,
    pub preload_adjacent: bool,
    pub close_on_click_outside: bool,
    pub trap_focus: bool,
    pub steps: StepTable,
    pub recenter_delay: Duration,
    pub fit_padding: f64,
    pub fit_hysteresis: f64,
    pub allow_upscale: bool,
    pub enable_minimap: bool,
    pub prefetch_workers: usize,
    pub prefetch_cache_entries: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            loop_navigation: false,
            enable_zoom: true,
            enable_thumbnails: true,
            transform_threshold: None,
            preload_adjacent: true,
            close_on_click_outside: true,
            trap_focus: true,
            steps: StepTable::default(),
            recenter_delay: DEFAULT_RECENTER_DELAY,
            fit_padding: DEFAULT_FIT_PADDING,
            fit_hysteresis: DEFAULT_FIT_HYSTERESIS,
            allow_upscale: false,
            enable_minimap: true,
            prefetch_workers: DEFAULT_WORKERS,
            prefetch_cache_entries: DEFAULT_WARM_ENTRIES,
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Applies `IDXV_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str, target: &mut bool| {
            if let Some(raw) = lookup(key) {
                match parse_bool(&raw) {
                    Some(value) => {
                        debug!(key, value, "Config override");
                        *target = value;
                    }
                    None => warn!(key, raw = %raw, "Ignoring unparsable boolean"),
                }
            }
        };
        flag("IDXV_LOOP", &mut self.loop_navigation);
        flag("IDXV_ZOOM", &mut self.enable_zoom);
        flag("IDXV_THUMBNAILS", &mut self.enable_thumbnails);
        flag("IDXV_PRELOAD", &mut self.preload_adjacent);

        if let Some(raw) = lookup("IDXV_RECENTER_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.recenter_delay = Duration::from_millis(ms),
                Err(_) => warn!(raw = %raw, "Ignoring unparsable IDXV_RECENTER_MS"),
            }
        }
        if let Some(raw) = lookup("IDXV_PREFETCH_WORKERS") {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.prefetch_workers = n,
                _ => warn!(raw = %raw, "Ignoring unparsable IDXV_PREFETCH_WORKERS"),
            }
        }
    }

    pub fn transform_config(&self) -> TransformConfig {
        TransformConfig {
            steps: self.steps.clone(),
            threshold: self.transform_threshold,
            recenter_delay: self.recenter_delay,
            enabled: self.enable_zoom,
            enable_minimap: self.enable_minimap,
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
