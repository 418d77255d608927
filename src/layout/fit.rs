//! Fit-to-container geometry for fixed-aspect content.
//!
//! `fit` is pure. `FitCalculator` caches the last result and only recomputes
//! when the container moves by more than a hysteresis margin, so sub-pixel
//! reflow from the host layout does not cause recompute storms.

use tracing::trace;

use crate::models::Size;

/// Default padding around fitted content.
pub const DEFAULT_FIT_PADDING: f64 = 16.0;
/// Container changes up to this many units in both dimensions are ignored.
pub const DEFAULT_FIT_HYSTERESIS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

impl FitResult {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Scales `natural` to fit inside `container` minus `padding` on each side,
/// preserving aspect ratio. Never upscales past 1.0 unless `allow_upscale`.
///
/// Returns `None` for empty content or when padding consumes the container.
pub fn fit(natural: Size, container: Size, padding: f64, allow_upscale: bool) -> Option<FitResult> {
    if natural.is_empty() {
        return None;
    }
    let available = Size::new(
        container.width - 2.0 * padding,
        container.height - 2.0 * padding,
    );
    if available.is_empty() {
        return None;
    }

    let mut scale = (available.width / natural.width).min(available.height / natural.height);
    if !allow_upscale {
        scale = scale.min(1.0);
    }

    Some(FitResult {
        width: natural.width * scale,
        height: natural.height * scale,
        scale,
    })
}

/// Cached `fit` with container-size hysteresis.
#[derive(Debug, Clone)]
pub struct FitCalculator {
    padding: f64,
    hysteresis: f64,
    allow_upscale: bool,
    last_natural: Option<Size>,
    last_container: Option<Size>,
    result: Option<FitResult>,
    recomputations: u64,
}

impl FitCalculator {
    pub fn new(padding: f64, hysteresis: f64, allow_upscale: bool) -> Self {
        Self {
            padding,
            hysteresis: hysteresis.max(0.0),
            allow_upscale,
            last_natural: None,
            last_container: None,
            result: None,
            recomputations: 0,
        }
    }

    pub fn set_allow_upscale(&mut self, allow: bool) {
        if self.allow_upscale != allow {
            self.allow_upscale = allow;
            self.invalidate();
        }
    }

    pub fn needs_recompute(&self, natural: Size, container: Size) -> bool {
        match (self.last_natural, self.last_container) {
            (Some(last_natural), Some(last_container)) => {
                last_natural != natural
                    || (container.width - last_container.width).abs() > self.hysteresis
                    || (container.height - last_container.height).abs() > self.hysteresis
            }
            _ => true,
        }
    }

    /// Returns the current fit, recomputing only when needed.
    pub fn observe(&mut self, natural: Size, container: Size) -> Option<FitResult> {
        if self.needs_recompute(natural, container) {
            self.result = fit(natural, container, self.padding, self.allow_upscale);
            self.last_natural = Some(natural);
            self.last_container = Some(container);
            self.recomputations += 1;
            trace!(
                width = container.width,
                height = container.height,
                "Recomputed fit"
            );
        }
        self.result
    }

    pub fn result(&self) -> Option<FitResult> {
        self.result
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }

    /// Forget the cached inputs; the next `observe` recomputes.
    pub fn invalidate(&mut self) {
        self.last_natural = None;
        self.last_container = None;
        self.result = None;
    }
}

impl Default for FitCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_FIT_PADDING, DEFAULT_FIT_HYSTERESIS, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portrait_into_landscape() {
        let result = fit(
            Size::new(1200.0, 1600.0),
            Size::new(800.0, 600.0),
            16.0,
            false,
        )
        .unwrap();
        assert!((result.scale - 0.355).abs() < 1e-9);
        assert!((result.width - 426.0).abs() < 1e-6);
        assert!((result.height - 568.0).abs() < 1e-6);
        assert!(result.width <= 768.0 && result.height <= 568.0);
        assert!((result.width / result.height - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_no_upscale_by_default() {
        let natural = Size::new(100.0, 50.0);
        let container = Size::new(1000.0, 1000.0);
        let result = fit(natural, container, 0.0, false).unwrap();
        assert_eq!(result.size(), natural);

        let upscaled = fit(natural, container, 0.0, true).unwrap();
        assert_eq!(upscaled.width, 1000.0);
        assert_eq!(upscaled.height, 500.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(fit(Size::new(0.0, 10.0), Size::new(100.0, 100.0), 0.0, false).is_none());
        assert!(fit(Size::new(10.0, 10.0), Size::new(20.0, 20.0), 10.0, false).is_none());
    }

    #[test]
    fn test_hysteresis_absorbs_small_changes() {
        let mut calc = FitCalculator::default();
        let natural = Size::new(1200.0, 1600.0);

        calc.observe(natural, Size::new(800.0, 600.0));
        assert_eq!(calc.recomputations(), 1);

        calc.observe(natural, Size::new(800.4, 600.7));
        calc.observe(natural, Size::new(810.0, 590.0));
        assert_eq!(calc.recomputations(), 1);

        calc.observe(natural, Size::new(810.5, 600.0));
        assert_eq!(calc.recomputations(), 2);
    }

    #[test]
    fn test_natural_change_recomputes() {
        let mut calc = FitCalculator::default();
        let container = Size::new(800.0, 600.0);
        calc.observe(Size::new(100.0, 100.0), container);
        calc.observe(Size::new(200.0, 100.0), container);
        assert_eq!(calc.recomputations(), 2);

        calc.invalidate();
        assert!(calc.result().is_none());
        calc.observe(Size::new(200.0, 100.0), container);
        assert_eq!(calc.recomputations(), 3);
    }
}
