// Viewer shell for idxv
// Features:
// - Open/close lifecycle over a caller-supplied slide list
// - Single index authority (NavigationController) fanned out to activation,
//   preloading, thumbnail sync and caller observers
// - One TransformEngine per slide, live only while the slide is active
// - Keyboard, swipe, wheel, pinch and drag input normalized into engine calls
// - Fit-to-container with hysteresis for the active slide
// - Fullscreen and download delegated to host seams

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info, trace, warn};

use crate::carousel::{ActivationGate, IndexChange, NavigationCause, NavigationController};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::layout::{FitCalculator, FitResult};
use crate::loader::{LoadOutcome, LoadRequest, LoadState, MediaLoader, PassthroughLoader};
use crate::models::{Size, Slide, SlideId, SlideKind, SlideList};
use crate::preload::{NoopPrefetcher, Prefetcher, Preloader};
use crate::render::{Frame, RendererSet, SlideProps, ThumbnailProps};
use crate::thumbnails::{NullStrip, ThumbnailStrip, ThumbnailSync};
use crate::timer::{SharedClock, SystemClock};
use crate::ui::download::{DownloadHandler, DownloadRequest, SaveToDirectory};
use crate::ui::focus::{Control, FocusRing};
use crate::ui::fullscreen::{FullscreenHost, UnsupportedFullscreen};
use crate::ui::keybindings::{Key, KeyMap, ViewerAction};
use crate::urls::UrlResolver;
use crate::zoom::{
    DragTracker, GestureEvent, PinchTracker, TransformEngine, TransformEvent, TransformSnapshot,
    TransformState, WheelAccumulator,
};

type IndexObserver = Box<dyn FnMut(&IndexChange)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    Index(usize),
    Id(SlideId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Content moves left: next slide.
    Left,
    /// Content moves right: previous slide.
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    /// Mapped to slide navigation while the active slide is zoomed.
    Suppressed,
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub recentered: bool,
    pub loads_applied: usize,
    pub loads_discarded: usize,
    pub prefetches_applied: usize,
}

/// Read-only state for hosts and overlay renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerSnapshot {
    pub open: bool,
    pub index: Option<usize>,
    pub slide_id: Option<SlideId>,
    pub len: usize,
    pub can_go_next: bool,
    pub can_go_prev: bool,
    pub page_count: Option<u32>,
    pub transform: Option<TransformSnapshot>,
    pub fit: Option<FitResult>,
    pub load_state: LoadState,
    pub fullscreen: bool,
    pub fullscreen_available: bool,
    pub focused_control: Option<Control>,
}

pub struct ViewerShellBuilder {
    config: ViewerConfig,
    clock: Option<SharedClock>,
    resolver: UrlResolver,
    loader: Option<Box<dyn MediaLoader>>,
    prefetcher: Option<Box<dyn Prefetcher>>,
    strip: Option<Box<dyn ThumbnailStrip>>,
    download: Option<Box<dyn DownloadHandler>>,
    fullscreen: Option<Box<dyn FullscreenHost>>,
    keymap: KeyMap,
}

impl ViewerShellBuilder {
    pub fn clock(mut self, clock: SharedClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn resolver(mut self, resolver: UrlResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn loader(mut self, loader: impl MediaLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn prefetcher(mut self, prefetcher: impl Prefetcher + 'static) -> Self {
        self.prefetcher = Some(Box::new(prefetcher));
        self
    }

    pub fn thumbnail_strip(mut self, strip: impl ThumbnailStrip + 'static) -> Self {
        self.strip = Some(Box::new(strip));
        self
    }

    /// Replaces the default save-to-downloads handler entirely.
    pub fn download_handler(mut self, handler: impl DownloadHandler + 'static) -> Self {
        self.download = Some(Box::new(handler));
        self
    }

    pub fn fullscreen_host(mut self, host: impl FullscreenHost + 'static) -> Self {
        self.fullscreen = Some(Box::new(host));
        self
    }

    pub fn keymap(mut self, keymap: KeyMap) -> Self {
        self.keymap = keymap;
        self
    }

    pub fn build(self) -> ViewerShell {
        let config = self.config;
        let prefetcher = self.prefetcher.unwrap_or_else(|| Box::new(NoopPrefetcher));
        let strip = self.strip.unwrap_or_else(|| Box::new(NullStrip));
        let fullscreen_host = self
            .fullscreen
            .unwrap_or_else(|| Box::new(UnsupportedFullscreen));
        let fullscreen_available = fullscreen_host.is_supported();

        ViewerShell {
            clock: self.clock.unwrap_or_else(SystemClock::shared),
            navigation: NavigationController::new(SlideList::empty(), config.loop_navigation),
            open: false,
            engines: HashMap::new(),
            fit: FitCalculator::new(config.fit_padding, config.fit_hysteresis, config.allow_upscale),
            container: None,
            probed: HashMap::new(),
            load_states: HashMap::new(),
            load_generation: 0,
            loader: self
                .loader
                .unwrap_or_else(|| Box::new(PassthroughLoader::default())),
            preloader: Preloader::new(config.preload_adjacent, prefetcher),
            thumbnails: ThumbnailSync::new(config.enable_thumbnails, strip),
            resolver: self.resolver,
            keymap: self.keymap,
            focus: FocusRing::new(config.trap_focus),
            fullscreen_host,
            fullscreen: false,
            fullscreen_available,
            download: self
                .download
                .unwrap_or_else(|| Box::new(SaveToDirectory::user_default())),
            wheel: WheelAccumulator::new(),
            pinch: PinchTracker::default(),
            drag: DragTracker::default(),
            observers: Vec::new(),
            transform_events: Vec::new(),
            config,
        }
    }
}

pub struct ViewerShell {
    config: ViewerConfig,
    clock: SharedClock,
    navigation: NavigationController,
    open: bool,
    /// Created on first activation, reset on deactivation.
    engines: HashMap<SlideId, TransformEngine>,
    /// Fit of the active slide only.
    fit: FitCalculator,
    container: Option<Size>,
    /// Sizes and page counts learned by the loader for slides that arrived
    /// without them.
    probed: HashMap<SlideId, (Option<Size>, Option<u32>)>,
    load_states: HashMap<SlideId, LoadState>,
    load_generation: u64,
    loader: Box<dyn MediaLoader>,
    preloader: Preloader,
    thumbnails: ThumbnailSync,
    resolver: UrlResolver,
    keymap: KeyMap,
    focus: FocusRing,
    fullscreen_host: Box<dyn FullscreenHost>,
    fullscreen: bool,
    fullscreen_available: bool,
    download: Box<dyn DownloadHandler>,
    wheel: WheelAccumulator,
    pinch: PinchTracker,
    drag: DragTracker,
    observers: Vec<IndexObserver>,
    transform_events: Vec<(SlideId, TransformEvent)>,
}

impl std::fmt::Debug for ViewerShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerShell")
            .field("open", &self.open)
            .field("index", &self.navigation.current_index())
            .field("len", &self.navigation.len())
            .field("engines", &self.engines.len())
            .field("load_generation", &self.load_generation)
            .finish()
    }
}

impl ViewerShell {
    pub fn builder(config: ViewerConfig) -> ViewerShellBuilder {
        ViewerShellBuilder {
            config,
            clock: None,
            resolver: UrlResolver::default(),
            loader: None,
            prefetcher: None,
            strip: None,
            download: None,
            fullscreen: None,
            keymap: KeyMap::default(),
        }
    }

    pub fn new(config: ViewerConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn slides(&self) -> &SlideList {
        self.navigation.slides()
    }

    pub fn current_index(&self) -> Option<usize> {
        if self.open {
            self.navigation.current_index()
        } else {
            None
        }
    }

    pub fn active_slide(&self) -> Option<&Slide> {
        if self.open {
            self.navigation.current_slide()
        } else {
            None
        }
    }

    pub fn is_active(&self, index: usize) -> bool {
        ActivationGate::is_active(index, &self.navigation, self.open)
    }

    pub fn preloader(&self) -> &Preloader {
        &self.preloader
    }

    pub fn thumbnails(&self) -> &ThumbnailSync {
        &self.thumbnails
    }

    pub fn fit_calculator(&self) -> &FitCalculator {
        &self.fit
    }

    /// Registers a listener for index changes. Observers see every change
    /// after the built-in listeners have run.
    pub fn on_index_change<F>(&mut self, observer: F)
    where
        F: FnMut(&IndexChange) + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    // ---- Lifecycle ----

    /// Registers or replaces the slide list. While open, the current slide
    /// keeps its place if still present; otherwise the index is clamped.
    pub fn set_slides(&mut self, slides: SlideList) {
        let change = self.navigation.replace(slides);

        let slides = self.navigation.slides();
        self.engines.retain(|id, _| slides.contains(id));
        self.probed.retain(|id, _| slides.contains(id));
        self.load_states.retain(|id, _| slides.contains(id));
        self.preloader.invalidate();
        debug!(len = slides.len(), open = self.open, "Slide list replaced");

        if !self.open {
            return;
        }
        match change {
            Some(change) => self.dispatch(change),
            None => match self.navigation.current_index() {
                Some(index) => {
                    // Same slide at the same position, but its neighbours may differ.
                    self.preloader.prefetch_around(
                        index,
                        self.navigation.slides(),
                        self.navigation.loop_navigation(),
                        &self.resolver,
                    );
                }
                None => {
                    info!("Slide list emptied, closing viewer");
                    self.close();
                }
            },
        }
    }

    /// Opens the viewer at `target`, or navigates there when already open.
    pub fn open(&mut self, target: OpenTarget) -> Result<Option<IndexChange>> {
        if self.navigation.is_empty() {
            return Err(ViewerError::NoActiveSlide);
        }
        let index = match target {
            OpenTarget::Index(i) => i,
            OpenTarget::Id(id) => self
                .navigation
                .slides()
                .position(&id)
                .ok_or(ViewerError::NoActiveSlide)?,
        };

        if self.open {
            let Some(change) = self
                .navigation
                .go_to_position(index, NavigationCause::Programmatic)
            else {
                return Ok(None);
            };
            self.dispatch(change.clone());
            return Ok(Some(change));
        }

        let Some(change) = self.navigation.start_at(index) else {
            return Ok(None);
        };
        self.open = true;
        info!(index = change.current, slide_id = %change.current_id, "Viewer opened");
        self.dispatch(change.clone());
        Ok(Some(change))
    }

    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        if let Some(id) = self.navigation.current_slide().map(|s| s.id.clone()) {
            self.deactivate(&id);
        }
        if self.fullscreen {
            if let Err(e) = self.fullscreen_host.exit() {
                warn!(error = %e, "Failed to leave fullscreen on close");
            }
            self.fullscreen = false;
        }
        self.open = false;
        self.preloader.invalidate();
        // Anything still loading belongs to a closed viewer.
        self.load_generation += 1;
        self.focus.clear();
        self.wheel.reset();
        self.pinch.end();
        self.drag.end();
        self.fit.invalidate();
        info!("Viewer closed");
    }

    /// Outside-click closes when configured to.
    pub fn click_outside(&mut self) -> bool {
        if !self.open || !self.config.close_on_click_outside {
            return false;
        }
        self.close();
        true
    }

    // ---- Navigation ----

    pub fn go_to_next(&mut self) -> Option<IndexChange> {
        self.ensure_open()?;
        let change = self.navigation.go_to_next(NavigationCause::Button)?;
        self.dispatch(change.clone());
        Some(change)
    }

    pub fn go_to_prev(&mut self) -> Option<IndexChange> {
        self.ensure_open()?;
        let change = self.navigation.go_to_prev(NavigationCause::Button)?;
        self.dispatch(change.clone());
        Some(change)
    }

    pub fn go_to_index(&mut self, index: isize) -> Option<IndexChange> {
        self.navigate(index, NavigationCause::Programmatic)
    }

    /// Swipe is ignored while the active slide is zoomed; the gesture pans
    /// instead.
    pub fn swipe(&mut self, direction: SwipeDirection) -> Option<IndexChange> {
        self.ensure_open()?;
        if self.is_zoomed() {
            trace!(?direction, "Swipe suppressed while zoomed");
            return None;
        }
        let change = match direction {
            SwipeDirection::Left => self.navigation.go_to_next(NavigationCause::Swipe),
            SwipeDirection::Right => self.navigation.go_to_prev(NavigationCause::Swipe),
        }?;
        self.dispatch(change.clone());
        Some(change)
    }

    pub fn thumbnail_clicked(&mut self, index: usize) -> Option<IndexChange> {
        self.ensure_open()?;
        let change = self.thumbnails.click(&mut self.navigation, index)?;
        self.dispatch(change.clone());
        Some(change)
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        if !self.open {
            return KeyOutcome::Ignored;
        }
        let Some(action) = self.keymap.action_for(key) else {
            return KeyOutcome::Ignored;
        };
        if action.is_slide_navigation() && self.is_zoomed() {
            trace!(?key, "Keyboard navigation suppressed while zoomed");
            return KeyOutcome::Suppressed;
        }
        if action.is_zoom() && !self.config.enable_zoom {
            return KeyOutcome::Ignored;
        }

        let last = self.navigation.len().saturating_sub(1) as isize;
        match action {
            ViewerAction::Prev => {
                self.keyboard_navigate(|nav| nav.go_to_prev(NavigationCause::Keyboard));
            }
            ViewerAction::Next => {
                self.keyboard_navigate(|nav| nav.go_to_next(NavigationCause::Keyboard));
            }
            ViewerAction::First => {
                self.keyboard_navigate(|nav| nav.go_to_index(0, NavigationCause::Keyboard));
            }
            ViewerAction::Last => {
                self.keyboard_navigate(|nav| nav.go_to_index(last, NavigationCause::Keyboard));
            }
            ViewerAction::Close => self.close(),
            ViewerAction::ToggleFullscreen => {
                self.toggle_fullscreen();
            }
            ViewerAction::ZoomIn => self.next_step(),
            ViewerAction::ZoomOut => self.previous_step(),
            ViewerAction::ResetZoom => self.reset_step(),
            ViewerAction::Download => {
                if let Err(e) = self.download() {
                    warn!(error = %e, "Download failed");
                }
            }
            ViewerAction::FocusNext | ViewerAction::FocusPrev => {
                let enabled = self.enabled_controls();
                let reverse = action == ViewerAction::FocusPrev;
                if !self.focus.cycle(&enabled, reverse) {
                    return KeyOutcome::Ignored;
                }
            }
            ViewerAction::ActivateFocused => match self.focus.focused() {
                Some(control) => self.press(control),
                None => return KeyOutcome::Ignored,
            },
        }
        KeyOutcome::Handled
    }

    /// Activates a shell control as if its button was clicked.
    pub fn press(&mut self, control: Control) {
        if !self.open {
            return;
        }
        debug!(%control, "Control pressed");
        match control {
            Control::Prev => {
                self.go_to_prev();
            }
            Control::Next => {
                self.go_to_next();
            }
            Control::ZoomOut => self.previous_step(),
            Control::ZoomIn => self.next_step(),
            Control::Fullscreen => {
                self.toggle_fullscreen();
            }
            Control::Download => {
                if let Err(e) = self.download() {
                    warn!(error = %e, "Download failed");
                }
            }
            Control::Close => self.close(),
        }
    }

    /// Controls that can currently receive focus, in tab order.
    pub fn enabled_controls(&self) -> Vec<Control> {
        if !self.open {
            return Vec::new();
        }
        let engine = self.active_engine();
        Control::ORDER
            .into_iter()
            .filter(|control| match control {
                Control::Prev => self.navigation.can_go_prev(),
                Control::Next => self.navigation.can_go_next(),
                Control::ZoomOut => engine.is_some_and(|e| e.can_step_out()),
                Control::ZoomIn => engine.is_some_and(|e| e.can_step_in()),
                Control::Fullscreen => self.fullscreen_available,
                Control::Download => self.active_slide().is_some(),
                Control::Close => true,
            })
            .collect()
    }

    // ---- Zoom ----

    /// True while the active slide is zoomed above its threshold.
    pub fn is_zoomed(&self) -> bool {
        self.active_engine()
            .is_some_and(|engine| !engine.disable_transforms())
    }

    pub fn set_scale(&mut self, scale: f64, animate: bool) {
        self.with_active_engine(|engine| engine.set_scale(scale, animate));
    }

    pub fn next_step(&mut self) {
        self.with_active_engine(TransformEngine::next_step);
    }

    pub fn previous_step(&mut self) {
        self.with_active_engine(TransformEngine::previous_step);
    }

    pub fn reset_step(&mut self) {
        self.with_active_engine(TransformEngine::reset_step);
    }

    /// Slider-style direct set.
    pub fn on_step_change(&mut self, value: f64) {
        self.with_active_engine(|engine| engine.on_step_change(value));
    }

    pub fn gesture(&mut self, event: GestureEvent) {
        self.with_active_engine(|engine| engine.apply_gesture(&event));
    }

    /// Raw wheel delta; positive zooms out.
    pub fn wheel(&mut self, dy: f64, origin: Option<(f64, f64)>) {
        if self.active_engine().is_none() {
            return;
        }
        if let Some(event) = self.wheel.feed(dy, origin) {
            self.gesture(event);
        }
    }

    pub fn pinch_begin(&mut self) {
        if let Some(scale) = self.active_engine().map(TransformEngine::scale) {
            self.pinch.begin(scale);
        }
    }

    /// `relative` is the pinch scale since `pinch_begin`.
    pub fn pinch_update(&mut self, relative: f64, origin: Option<(f64, f64)>) {
        let Some(scale) = self.active_engine().map(TransformEngine::scale) else {
            return;
        };
        if let Some(event) = self.pinch.update(relative, scale, origin) {
            self.gesture(event);
        }
    }

    pub fn pinch_end(&mut self) {
        self.pinch.end();
    }

    pub fn drag_begin(&mut self) {
        if let Some(state) = self.active_engine().map(TransformEngine::state) {
            self.drag.begin(state.position());
        }
    }

    /// `offset` is the pointer offset since `drag_begin`.
    pub fn drag_update(&mut self, offset: (f64, f64)) {
        let Some(state) = self.active_engine().map(TransformEngine::state) else {
            return;
        };
        if let Some(event) = self.drag.update(offset, state.position()) {
            self.gesture(event);
        }
    }

    pub fn drag_end(&mut self) {
        self.drag.end();
    }

    pub fn transform_state(&self, id: &SlideId) -> Option<TransformState> {
        self.engines.get(id).map(TransformEngine::state)
    }

    pub fn take_transform_events(&mut self) -> Vec<(SlideId, TransformEvent)> {
        std::mem::take(&mut self.transform_events)
    }

    // ---- Layout ----

    /// Container size reported by the host layout. Small changes inside the
    /// hysteresis margin reuse the previous fit.
    pub fn set_container_size(&mut self, width: f64, height: f64) -> Option<FitResult> {
        self.container = Some(Size::new(width, height));
        self.refit()
    }

    pub fn fit_result(&self) -> Option<FitResult> {
        if self.open {
            self.fit.result()
        } else {
            None
        }
    }

    // ---- Timers and async completions ----

    /// Runs due timers and applies finished loads and prefetches. Hosts call
    /// this from their event loop.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport {
            recentered: self.with_active_engine(TransformEngine::tick).unwrap_or(false),
            ..TickReport::default()
        };

        for result in self.loader.poll() {
            let active = ActivationGate::active_id(&self.navigation, self.open);
            if result.generation != self.load_generation || active != Some(&result.slide_id) {
                trace!(
                    slide_id = %result.slide_id,
                    generation = result.generation,
                    current = self.load_generation,
                    "Discarding stale load result"
                );
                report.loads_discarded += 1;
                continue;
            }
            match result.outcome {
                LoadOutcome::Loaded {
                    natural_size,
                    page_count,
                } => {
                    debug!(slide_id = %result.slide_id, "Media loaded");
                    if natural_size.is_some() || page_count.is_some() {
                        self.probed
                            .insert(result.slide_id.clone(), (natural_size, page_count));
                    }
                    self.load_states.insert(result.slide_id, LoadState::Loaded);
                    self.refit();
                }
                LoadOutcome::Failed(reason) => {
                    warn!(slide_id = %result.slide_id, %reason, "Media failed to load");
                    self.load_states
                        .insert(result.slide_id, LoadState::Failed(reason));
                }
            }
            report.loads_applied += 1;
        }

        report.prefetches_applied = self.preloader.drain_completions();
        report
    }

    pub fn load_state(&self, id: &SlideId) -> LoadState {
        self.load_states.get(id).cloned().unwrap_or_default()
    }

    /// Natural size from the descriptor, or the probed one when the
    /// descriptor had none.
    pub fn natural_size(&self, slide: &Slide) -> Option<Size> {
        slide
            .natural_size
            .or_else(|| self.probed.get(&slide.id).and_then(|(size, _)| *size))
    }

    pub fn page_count(&self, slide: &Slide) -> Option<u32> {
        slide
            .page_count
            .or_else(|| self.probed.get(&slide.id).and_then(|(_, pages)| *pages))
    }

    // ---- Host actions ----

    /// Returns the fullscreen state after the toggle. Host failures are
    /// logged, leave the state unchanged and hide the control.
    pub fn toggle_fullscreen(&mut self) -> bool {
        if !self.open {
            return self.fullscreen;
        }
        if !self.fullscreen_available {
            debug!("Fullscreen not available, ignoring toggle");
            return self.fullscreen;
        }
        let result = if self.fullscreen {
            self.fullscreen_host.exit()
        } else {
            self.fullscreen_host.enter()
        };
        match result {
            Ok(()) => {
                self.fullscreen = !self.fullscreen;
                debug!(fullscreen = self.fullscreen, "Fullscreen toggled");
            }
            Err(e) => {
                warn!(error = %e, "Fullscreen request failed, hiding control");
                self.fullscreen_available = false;
                let enabled = self.enabled_controls();
                self.focus.retain(&enabled);
            }
        }
        self.fullscreen
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Downloads the active slide through the configured handler.
    pub fn download(&self) -> Result<Option<PathBuf>> {
        let slide = self.active_slide().ok_or(ViewerError::NoActiveSlide)?;
        let request = DownloadRequest {
            slide_id: slide.id.clone(),
            kind: slide.kind,
            source: slide.source.clone(),
            url: self.resolver.url(&slide.source),
        };
        self.download
            .download(&request)
            .map_err(|e| ViewerError::Download {
                slide_id: request.slide_id.clone(),
                reason: format!("{e:#}"),
            })
    }

    // ---- Views ----

    pub fn snapshot(&self) -> ViewerSnapshot {
        let slide = self.active_slide();
        ViewerSnapshot {
            open: self.open,
            index: self.current_index(),
            slide_id: slide.map(|s| s.id.clone()),
            len: self.navigation.len(),
            can_go_next: self.open && self.navigation.can_go_next(),
            can_go_prev: self.open && self.navigation.can_go_prev(),
            page_count: slide.and_then(|s| self.page_count(s)),
            transform: self.active_engine().map(TransformEngine::snapshot),
            fit: self.fit_result(),
            load_state: slide.map(|s| self.load_state(&s.id)).unwrap_or_default(),
            fullscreen: self.fullscreen,
            fullscreen_available: self.fullscreen_available,
            focused_control: self.focus.focused(),
        }
    }

    /// Renders every slide (inactive ones as posters), the thumbnail strip
    /// and the overlay.
    pub fn render<O>(&self, renderers: &RendererSet<O>) -> Frame<O> {
        let snapshot = self.snapshot();
        let slides = self.navigation.slides();

        let rendered = slides
            .iter()
            .enumerate()
            .map(|(index, slide)| {
                let active = self.is_active(index);
                renderers.render_slide(&SlideProps {
                    slide,
                    index,
                    url: self.resolver.url(&slide.source),
                    preview_url: self.resolver.preview_url(&slide.source),
                    active,
                    fit: if active { snapshot.fit } else { None },
                    page_count: self.page_count(slide),
                    transform: if active { snapshot.transform.clone() } else { None },
                    load_state: if active {
                        snapshot.load_state.clone()
                    } else {
                        LoadState::Idle
                    },
                })
            })
            .collect();

        let thumbnails = if self.thumbnails.is_enabled() && self.open {
            slides
                .iter()
                .enumerate()
                .map(|(index, slide)| {
                    renderers.render_thumbnail(&ThumbnailProps {
                        slide,
                        index,
                        preview_url: self.resolver.preview_url(&slide.source),
                        selected: self.is_active(index),
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        Frame {
            slides: rendered,
            thumbnails,
            overlay: renderers.render_overlay(&snapshot),
        }
    }

    // ---- Internals ----

    fn ensure_open(&self) -> Option<()> {
        self.open.then_some(())
    }

    fn navigate(&mut self, index: isize, cause: NavigationCause) -> Option<IndexChange> {
        self.ensure_open()?;
        let change = self.navigation.go_to_index(index, cause)?;
        self.dispatch(change.clone());
        Some(change)
    }

    fn keyboard_navigate<F>(&mut self, step: F)
    where
        F: FnOnce(&mut NavigationController) -> Option<IndexChange>,
    {
        if let Some(change) = step(&mut self.navigation) {
            self.dispatch(change);
        }
    }

    /// Fans one index change out to every listener, in a fixed order.
    fn dispatch(&mut self, change: IndexChange) {
        if let Some(transition) = ActivationGate::transition(&change) {
            if let Some(previous) = &transition.deactivated {
                self.deactivate(previous);
            }
            self.activate(&transition.activated);
        }

        self.preloader.on_index_change(
            &change,
            self.navigation.slides(),
            self.navigation.loop_navigation(),
            &self.resolver,
        );
        self.thumbnails.on_index_change(&change);
        for observer in &mut self.observers {
            observer(&change);
        }

        let enabled = self.enabled_controls();
        self.focus.retain(&enabled);
    }

    fn activate(&mut self, id: &SlideId) {
        let Some(slide) = self
            .navigation
            .slides()
            .position(id)
            .and_then(|i| self.navigation.slides().get(i))
            .cloned()
        else {
            return;
        };

        let engine = self.engines.entry(id.clone()).or_insert_with(|| {
            trace!(slide_id = %id, "Creating transform engine");
            TransformEngine::new(self.config.transform_config(), self.clock.clone())
        });
        engine.activate();

        self.wheel.reset();
        self.pinch.end();
        self.drag.end();
        self.fit.invalidate();
        self.refit();
        self.request_load(&slide);
    }

    fn deactivate(&mut self, id: &SlideId) {
        // A load still in flight will be discarded by generation.
        if let Some(state) = self.load_states.get_mut(id) {
            if *state == LoadState::Loading {
                *state = LoadState::Idle;
            }
        }
        if let Some(engine) = self.engines.get_mut(id) {
            engine.deactivate();
            let events = engine.take_events();
            self.transform_events
                .extend(events.into_iter().map(|e| (id.clone(), e)));
        }
    }

    fn request_load(&mut self, slide: &Slide) {
        self.load_generation += 1;
        self.load_states.insert(slide.id.clone(), LoadState::Loading);
        self.loader.request(LoadRequest {
            generation: self.load_generation,
            slide_id: slide.id.clone(),
            kind: slide.kind,
            url: self.resolver.url(&slide.source),
        });
    }

    fn refit(&mut self) -> Option<FitResult> {
        let container = self.container?;
        let slide = self.active_slide()?.clone();
        let natural = self.natural_size(&slide)?;
        // Document pages never upscale past the measured container.
        let allow_upscale = self.config.allow_upscale && slide.kind != SlideKind::Document;
        self.fit.set_allow_upscale(allow_upscale);
        self.fit.observe(natural, container)
    }

    fn active_engine(&self) -> Option<&TransformEngine> {
        let id = ActivationGate::active_id(&self.navigation, self.open)?;
        self.engines.get(id)
    }

    fn with_active_engine<R, F>(&mut self, f: F) -> Option<R>
    where
        F: FnOnce(&mut TransformEngine) -> R,
    {
        let id = ActivationGate::active_id(&self.navigation, self.open)?.clone();
        let engine = self.engines.get_mut(&id)?;
        let result = f(engine);
        let events = engine.take_events();
        self.transform_events
            .extend(events.into_iter().map(|e| (id.clone(), e)));
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::LoadResult;
    use crate::preload::{PrefetchCompletion, PrefetchOutcome, PrefetchRequest};
    use crate::render::TextRenderer;
    use crate::thumbnails::ScrollAlign;
    use crate::timer::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records requests; completions are queued by the test.
    #[derive(Default, Clone)]
    struct RecordingPrefetcher(
        Rc<RefCell<Vec<PrefetchRequest>>>,
        Rc<RefCell<Vec<PrefetchCompletion>>>,
    );

    impl RecordingPrefetcher {
        fn finish(&self, request: &PrefetchRequest, outcome: PrefetchOutcome) {
            self.1.borrow_mut().push(PrefetchCompletion {
                token: request.token.clone(),
                outcome,
            });
        }
    }

    impl Prefetcher for RecordingPrefetcher {
        fn prefetch(&self, request: PrefetchRequest) {
            self.0.borrow_mut().push(request);
        }

        fn completed(&self) -> Vec<PrefetchCompletion> {
            std::mem::take(&mut *self.1.borrow_mut())
        }
    }

    #[derive(Default, Clone)]
    struct RecordingStrip(Rc<RefCell<Vec<usize>>>);

    impl ThumbnailStrip for RecordingStrip {
        fn scroll_into_view(&mut self, index: usize, _align: ScrollAlign) {
            self.0.borrow_mut().push(index);
        }
    }

    /// Loader whose results are released by the test.
    #[derive(Default, Clone)]
    struct ManualLoader {
        requests: Rc<RefCell<Vec<LoadRequest>>>,
        ready: Rc<RefCell<Vec<LoadResult>>>,
    }

    impl ManualLoader {
        fn complete(&self, index: usize, outcome: LoadOutcome) {
            let request = self.requests.borrow()[index].clone();
            self.ready.borrow_mut().push(LoadResult {
                generation: request.generation,
                slide_id: request.slide_id,
                outcome,
            });
        }
    }

    impl MediaLoader for ManualLoader {
        fn request(&self, request: LoadRequest) {
            self.requests.borrow_mut().push(request);
        }

        fn poll(&self) -> Vec<LoadResult> {
            std::mem::take(&mut *self.ready.borrow_mut())
        }
    }

    #[derive(Default)]
    struct FlakyFullscreen {
        reject: bool,
    }

    impl FullscreenHost for FlakyFullscreen {
        fn is_supported(&self) -> bool {
            true
        }

        fn enter(&mut self) -> Result<()> {
            if self.reject {
                Err(ViewerError::FullscreenRejected("not allowed".into()))
            } else {
                Ok(())
            }
        }

        fn exit(&mut self) -> Result<()> {
            Ok(())
        }
    }

    fn mixed_slides() -> SlideList {
        SlideList::new(vec![
            Slide::image("img", "img.png").with_natural_size(1200.0, 1600.0),
            Slide::document("pdf", "doc.pdf", 3).with_natural_size(595.0, 842.0),
            Slide::video("vid", "clip.mp4"),
        ])
        .unwrap()
    }

    fn images(n: usize) -> SlideList {
        SlideList::new(
            (0..n)
                .map(|i| Slide::image(format!("s{i}"), format!("s{i}.png")))
                .collect(),
        )
        .unwrap()
    }

    struct Harness {
        shell: ViewerShell,
        clock: ManualClock,
        prefetches: RecordingPrefetcher,
        strip: RecordingStrip,
        loader: ManualLoader,
    }

    fn harness(config: ViewerConfig, slides: SlideList) -> Harness {
        let clock = ManualClock::new();
        let prefetches = RecordingPrefetcher::default();
        let strip = RecordingStrip::default();
        let loader = ManualLoader::default();
        let mut shell = ViewerShell::builder(config)
            .clock(clock.shared())
            .prefetcher(prefetches.clone())
            .thumbnail_strip(strip.clone())
            .loader(loader.clone())
            .download_handler(|_: &DownloadRequest| -> anyhow::Result<Option<PathBuf>> { Ok(None) })
            .build();
        shell.set_slides(slides);
        Harness {
            shell,
            clock,
            prefetches,
            strip,
            loader,
        }
    }

    #[test]
    fn test_three_slide_scenario() {
        let mut h = harness(ViewerConfig::default(), mixed_slides());
        h.shell.open(OpenTarget::Index(0)).unwrap();
        h.shell.go_to_next();
        h.shell.go_to_next();

        assert_eq!(h.shell.current_index(), Some(2));
        assert_eq!(h.shell.active_slide().unwrap().kind, SlideKind::Video);

        let requested: Vec<usize> = h.prefetches.0.borrow().iter().map(|r| r.index).collect();
        // open@0 -> [1], next@1 -> [0, 2], next@2 -> [1]
        assert_eq!(requested, vec![1, 0, 2, 1]);
        assert!(requested.iter().all(|&i| i < 3));
        assert_eq!(requested.iter().filter(|&&i| i == 1).count(), 2);
    }

    #[test]
    fn test_deactivation_resets_zoom() {
        let mut h = harness(ViewerConfig::default(), images(3));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        h.shell.set_scale(2.5, false);
        h.shell.drag_begin();
        h.shell.drag_update((40.0, -20.0));
        assert!(h.shell.is_zoomed());

        // Buttons still navigate while zoomed.
        h.shell.go_to_next().unwrap();
        h.shell.go_to_prev().unwrap();

        let state = h.shell.transform_state(&"s0".into()).unwrap();
        assert_eq!(state, TransformState::identity(1.0));
        assert!(!h.shell.is_zoomed());

        let events = h.shell.take_transform_events();
        assert!(events
            .iter()
            .any(|(id, e)| id.as_str() == "s0" && *e == TransformEvent::Reset));
    }

    #[test]
    fn test_pending_recenter_dropped_on_navigation() {
        let mut h = harness(ViewerConfig::default(), images(2));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        h.shell.set_scale(3.0, false);
        h.shell.set_scale(1.0, false);
        h.shell.go_to_next();
        h.clock.advance_ms(500);
        assert!(!h.shell.tick().recentered);
        let engine_a = h.shell.engines.get(&SlideId::new("s0")).unwrap();
        assert_eq!(engine_a.recenter_count(), 0);
        assert!(!engine_a.recenter_pending());
    }

    #[test]
    fn test_recenter_fires_from_tick() {
        let mut h = harness(ViewerConfig::default(), images(1));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        h.shell.set_scale(3.0, false);
        h.clock.advance_ms(40);
        h.shell.set_scale(1.0, false);
        h.clock.advance_ms(50);
        h.shell.set_scale(3.0, false);
        h.shell.set_scale(1.0, false);
        h.clock.advance_ms(100);
        assert!(!h.shell.tick().recentered);
        h.clock.advance_ms(20);
        assert!(h.shell.tick().recentered);
        h.clock.advance_ms(500);
        assert!(!h.shell.tick().recentered);
    }

    #[test]
    fn test_single_navigation_scrolls_strip_once() {
        let mut h = harness(ViewerConfig::default(), images(5));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        h.strip.0.borrow_mut().clear();

        h.shell.go_to_index(3);
        h.shell.snapshot();
        h.shell.render(&RendererSet::uniform(TextRenderer));
        h.shell.tick();

        assert_eq!(*h.strip.0.borrow(), vec![3]);
    }

    #[test]
    fn test_thumbnail_click_navigates() {
        let mut h = harness(ViewerConfig::default(), images(4));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        let change = h.shell.thumbnail_clicked(2).unwrap();
        assert_eq!(change.cause, NavigationCause::Thumbnail);
        assert_eq!(h.shell.current_index(), Some(2));
        assert!(h.shell.thumbnail_clicked(2).is_none());
    }

    #[test]
    fn test_keyboard_and_swipe_suppressed_while_zoomed() {
        let mut h = harness(ViewerConfig::default(), images(3));
        h.shell.open(OpenTarget::Index(1)).unwrap();

        assert_eq!(h.shell.handle_key(Key::Char('+')), KeyOutcome::Handled);
        assert!(h.shell.is_zoomed());
        assert_eq!(h.shell.handle_key(Key::Right), KeyOutcome::Suppressed);
        assert!(h.shell.swipe(SwipeDirection::Left).is_none());
        assert_eq!(h.shell.current_index(), Some(1));

        assert_eq!(h.shell.handle_key(Key::Char('0')), KeyOutcome::Handled);
        assert!(!h.shell.is_zoomed());
        assert_eq!(h.shell.handle_key(Key::Right), KeyOutcome::Handled);
        assert_eq!(h.shell.current_index(), Some(2));
        assert!(h.shell.swipe(SwipeDirection::Right).is_some());
        assert_eq!(h.shell.current_index(), Some(1));
    }

    #[test]
    fn test_keyboard_bounds_without_loop() {
        let mut h = harness(ViewerConfig::default(), images(3));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        assert_eq!(h.shell.handle_key(Key::Left), KeyOutcome::Handled);
        assert_eq!(h.shell.current_index(), Some(0));
        h.shell.handle_key(Key::End);
        assert_eq!(h.shell.current_index(), Some(2));
        h.shell.handle_key(Key::Right);
        assert_eq!(h.shell.current_index(), Some(2));
        h.shell.handle_key(Key::Home);
        assert_eq!(h.shell.current_index(), Some(0));
    }

    #[test]
    fn test_escape_and_outside_click_close() {
        let mut h = harness(ViewerConfig::default(), images(2));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        assert_eq!(h.shell.handle_key(Key::Escape), KeyOutcome::Handled);
        assert!(!h.shell.is_open());
        assert_eq!(h.shell.handle_key(Key::Right), KeyOutcome::Ignored);

        h.shell.open(OpenTarget::Id("s1".into())).unwrap();
        assert_eq!(h.shell.current_index(), Some(1));
        assert!(h.shell.click_outside());
        assert!(!h.shell.is_open());

        let config = ViewerConfig {
            close_on_click_outside: false,
            ..ViewerConfig::default()
        };
        let mut h = harness(config, images(2));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        assert!(!h.shell.click_outside());
        assert!(h.shell.is_open());
    }

    #[test]
    fn test_open_errors_and_active_flag() {
        let mut h = harness(ViewerConfig::default(), SlideList::empty());
        assert!(matches!(
            h.shell.open(OpenTarget::Index(0)),
            Err(ViewerError::NoActiveSlide)
        ));

        let mut h = harness(ViewerConfig::default(), images(3));
        assert!(h.shell.open(OpenTarget::Id("missing".into())).is_err());
        assert!(!(0..3).any(|i| h.shell.is_active(i)));

        h.shell.open(OpenTarget::Index(9)).unwrap();
        assert_eq!(h.shell.current_index(), Some(2));
        assert_eq!((0..3).filter(|&i| h.shell.is_active(i)).count(), 1);
    }

    #[test]
    fn test_set_slides_keeps_current_id() {
        let mut h = harness(ViewerConfig::default(), images(4));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        h.shell
            .on_index_change(move |change| sink.borrow_mut().push(change.current));
        h.shell.open(OpenTarget::Index(2)).unwrap();

        let reordered = SlideList::new(vec![
            Slide::image("s2", "s2.png"),
            Slide::image("s0", "s0.png"),
        ])
        .unwrap();
        h.shell.set_slides(reordered);
        assert_eq!(h.shell.current_index(), Some(0));
        assert_eq!(h.shell.active_slide().unwrap().id.as_str(), "s2");
        assert_eq!(*seen.borrow(), vec![2, 0]);

        h.shell.set_slides(images(1));
        assert_eq!(h.shell.current_index(), Some(0));
        assert_eq!(h.shell.active_slide().unwrap().id.as_str(), "s0");

        h.shell.set_slides(SlideList::empty());
        assert!(!h.shell.is_open());
    }

    #[test]
    fn test_open_and_thumbnail_past_end_land_on_last() {
        let mut h = harness(ViewerConfig::default(), images(5));
        let change = h.shell.open(OpenTarget::Index(usize::MAX)).unwrap().unwrap();
        assert_eq!(change.current, 4);
        assert_eq!(h.shell.current_index(), Some(4));

        h.shell.go_to_index(0);
        h.shell.open(OpenTarget::Index(usize::MAX)).unwrap();
        assert_eq!(h.shell.current_index(), Some(4));

        h.shell.go_to_index(1);
        let change = h.shell.thumbnail_clicked(usize::MAX).unwrap();
        assert_eq!(change.current, 4);
        assert_eq!(*h.strip.0.borrow().last().unwrap(), 4);
    }

    #[test]
    fn test_set_slides_at_same_position_prefetches_new_neighbours() {
        let mut h = harness(ViewerConfig::default(), images(3));
        h.shell.open(OpenTarget::Index(1)).unwrap();
        h.prefetches.0.borrow_mut().clear();
        let before = h.shell.preloader().generation();

        let replaced = SlideList::new(vec![
            Slide::image("x", "x.png"),
            Slide::image("s1", "s1.png"),
            Slide::image("y", "y.png"),
        ])
        .unwrap();
        h.shell.set_slides(replaced);
        assert_eq!(h.shell.current_index(), Some(1));

        let requests = h.prefetches.0.borrow();
        let targets: Vec<(usize, &str)> = requests
            .iter()
            .map(|r| (r.index, r.token.slide_id.as_str()))
            .collect();
        assert_eq!(targets, vec![(0, "x"), (2, "y")]);
        let generation = h.shell.preloader().generation();
        assert!(generation > before);
        assert!(requests.iter().all(|r| r.token.generation == generation));
    }

    #[test]
    fn test_prefetch_completion_from_before_set_slides_is_stale() {
        let mut h = harness(ViewerConfig::default(), images(3));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        let old = h.prefetches.0.borrow()[0].clone();
        assert_eq!(old.token.slide_id.as_str(), "s1");

        h.shell.set_slides(images(3));
        h.prefetches.finish(&old, PrefetchOutcome::Warmed);
        let report = h.shell.tick();
        assert_eq!(report.prefetches_applied, 0);
        assert_eq!(h.shell.preloader().stale_count(), 1);
        assert!(!h.shell.preloader().is_warmed(&"s1".into()));

        let fresh = h.prefetches.0.borrow().last().unwrap().clone();
        assert_eq!(fresh.token.slide_id.as_str(), "s1");
        h.prefetches.finish(&fresh, PrefetchOutcome::Warmed);
        assert_eq!(h.shell.tick().prefetches_applied, 1);
        assert!(h.shell.preloader().is_warmed(&"s1".into()));
    }

    #[test]
    fn test_render_shows_reported_page_count() {
        let slides =
            SlideList::new(vec![Slide::new("doc", SlideKind::Document, "doc.pdf")]).unwrap();
        let mut h = harness(ViewerConfig::default(), slides);
        h.shell.open(OpenTarget::Index(0)).unwrap();
        h.loader.complete(
            0,
            LoadOutcome::Loaded {
                natural_size: None,
                page_count: Some(5),
            },
        );
        h.shell.tick();

        let frame = h.shell.render(&RendererSet::uniform(TextRenderer));
        assert!(frame.slides[0].contains("pages=5"));
    }

    #[test]
    fn test_fit_for_active_slide_with_hysteresis() {
        let mut h = harness(ViewerConfig::default(), mixed_slides());
        h.shell.open(OpenTarget::Index(0)).unwrap();
        let fit = h.shell.set_container_size(800.0, 600.0).unwrap();
        assert!((fit.height - 568.0).abs() < 1e-9);
        assert!((fit.width - 426.0).abs() < 1e-9);

        h.shell.set_container_size(804.5, 603.0);
        assert_eq!(h.shell.fit_calculator().recomputations(), 1);
        h.shell.set_container_size(820.0, 600.0);
        assert_eq!(h.shell.fit_calculator().recomputations(), 2);

        // Video has no natural size until the loader reports one.
        h.shell.go_to_index(2);
        assert!(h.shell.fit_result().is_none());
    }

    #[test]
    fn test_documents_never_upscale() {
        let config = ViewerConfig {
            allow_upscale: true,
            ..ViewerConfig::default()
        };
        let mut h = harness(config, mixed_slides());
        h.shell.open(OpenTarget::Index(1)).unwrap();
        let fit = h.shell.set_container_size(4000.0, 4000.0).unwrap();
        assert_eq!(fit.scale, 1.0);
    }

    #[test]
    fn test_stale_load_results_discarded() {
        let mut h = harness(ViewerConfig::default(), mixed_slides());
        h.shell.open(OpenTarget::Index(2)).unwrap();
        h.shell.go_to_index(0);

        // Video load finishes after the user moved on.
        h.loader.complete(
            0,
            LoadOutcome::Loaded {
                natural_size: Some(Size::new(1920.0, 1080.0)),
                page_count: None,
            },
        );
        let report = h.shell.tick();
        assert_eq!(report.loads_discarded, 1);
        assert_eq!(h.shell.load_state(&"vid".into()), LoadState::Idle);
        assert!(h.shell.natural_size(h.shell.slides().get(2).unwrap()).is_none());

        h.loader.complete(
            1,
            LoadOutcome::Loaded {
                natural_size: None,
                page_count: None,
            },
        );
        assert_eq!(h.shell.tick().loads_applied, 1);
        assert_eq!(h.shell.snapshot().load_state, LoadState::Loaded);
    }

    #[test]
    fn test_probed_size_feeds_fit() {
        let mut h = harness(ViewerConfig::default(), mixed_slides());
        h.shell.open(OpenTarget::Index(2)).unwrap();
        h.shell.set_container_size(800.0, 600.0);
        assert!(h.shell.fit_result().is_none());

        h.loader.complete(
            0,
            LoadOutcome::Loaded {
                natural_size: Some(Size::new(1920.0, 1080.0)),
                page_count: None,
            },
        );
        h.shell.tick();
        let fit = h.shell.fit_result().unwrap();
        assert!((fit.width - 768.0).abs() < 1e-9);
    }

    #[test]
    fn test_load_failure_is_isolated() {
        let mut h = harness(ViewerConfig::default(), images(3));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        h.loader.complete(0, LoadOutcome::Failed("corrupt".into()));
        h.shell.tick();

        assert!(h.shell.is_open());
        assert_eq!(h.shell.load_state(&"s0".into()), LoadState::Failed("corrupt".into()));
        assert_eq!(h.shell.load_state(&"s1".into()), LoadState::Idle);

        h.shell.go_to_next();
        assert_eq!(h.shell.snapshot().load_state, LoadState::Loading);
        let frame = h.shell.render(&RendererSet::uniform(TextRenderer));
        assert!(frame.slides[0].ends_with("(poster)"));
    }

    #[test]
    fn test_fullscreen_failures_are_ignored() {
        let mut h = harness(ViewerConfig::default(), images(1));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        assert!(!h.shell.toggle_fullscreen());
        assert!(!h.shell.snapshot().fullscreen_available);
        assert!(!h.shell.enabled_controls().contains(&Control::Fullscreen));

        let mut shell = ViewerShell::builder(ViewerConfig::default())
            .fullscreen_host(FlakyFullscreen { reject: true })
            .build();
        shell.set_slides(images(1));
        shell.open(OpenTarget::Index(0)).unwrap();
        assert!(!shell.toggle_fullscreen());
        assert!(!shell.snapshot().fullscreen_available);
        assert!(shell.is_open());

        let mut shell = ViewerShell::builder(ViewerConfig::default())
            .fullscreen_host(FlakyFullscreen::default())
            .build();
        shell.set_slides(images(1));
        shell.open(OpenTarget::Index(0)).unwrap();
        assert!(shell.toggle_fullscreen());
        shell.close();
        assert!(!shell.is_fullscreen());
    }

    #[test]
    fn test_custom_download_handler() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let mut shell = ViewerShell::builder(ViewerConfig::default())
            .resolver(UrlResolver::new(|p| format!("/media/{p}")))
            .download_handler(move |req: &DownloadRequest| -> anyhow::Result<Option<PathBuf>> {
                sink.borrow_mut().push(req.url.clone());
                Ok(None)
            })
            .build();
        assert!(matches!(shell.download(), Err(ViewerError::NoActiveSlide)));

        shell.set_slides(images(2));
        shell.open(OpenTarget::Index(1)).unwrap();
        assert_eq!(shell.download().unwrap(), None);
        assert_eq!(*calls.borrow(), vec!["/media/s1.png".to_string()]);

        let mut failing = ViewerShell::builder(ViewerConfig::default())
            .download_handler(|_: &DownloadRequest| -> anyhow::Result<Option<PathBuf>> {
                anyhow::bail!("offline")
            })
            .build();
        failing.set_slides(images(1));
        failing.open(OpenTarget::Index(0)).unwrap();
        assert!(matches!(failing.download(), Err(ViewerError::Download { .. })));
    }

    #[test]
    fn test_focus_trap_cycles_enabled_controls() {
        let mut h = harness(ViewerConfig::default(), images(2));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        // Enabled: Next, ZoomIn, Download, Close
        let enabled = h.shell.enabled_controls();
        assert_eq!(
            enabled,
            vec![Control::Next, Control::ZoomIn, Control::Download, Control::Close]
        );

        h.shell.handle_key(Key::Tab);
        assert_eq!(h.shell.snapshot().focused_control, Some(Control::Next));
        h.shell.handle_key(Key::BackTab);
        assert_eq!(h.shell.snapshot().focused_control, Some(Control::Close));

        h.shell.handle_key(Key::Tab);
        assert_eq!(h.shell.handle_key(Key::Enter), KeyOutcome::Handled);
        assert_eq!(h.shell.current_index(), Some(1));
        // Next is now disabled, so focus was dropped.
        assert_eq!(h.shell.snapshot().focused_control, None);
    }

    #[test]
    fn test_focus_escapes_without_trap() {
        let config = ViewerConfig {
            trap_focus: false,
            ..ViewerConfig::default()
        };
        let mut h = harness(config, images(1));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        // Enabled: ZoomIn, Download, Close
        for _ in 0..3 {
            assert_eq!(h.shell.handle_key(Key::Tab), KeyOutcome::Handled);
        }
        assert_eq!(h.shell.handle_key(Key::Tab), KeyOutcome::Ignored);
    }

    #[test]
    fn test_zoom_disabled_ignores_input() {
        let config = ViewerConfig {
            enable_zoom: false,
            ..ViewerConfig::default()
        };
        let mut h = harness(config, images(2));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        assert_eq!(h.shell.handle_key(Key::Char('+')), KeyOutcome::Ignored);
        h.shell.set_scale(4.0, false);
        h.shell.wheel(-5.0, None);
        assert_eq!(h.shell.snapshot().transform.unwrap().scale, 1.0);
        assert_eq!(h.shell.handle_key(Key::Right), KeyOutcome::Handled);
    }

    #[test]
    fn test_wheel_and_pinch_publish_steps_only() {
        let mut h = harness(ViewerConfig::default(), images(1));
        h.shell.open(OpenTarget::Index(0)).unwrap();
        h.shell.take_transform_events();

        for _ in 0..4 {
            h.shell.wheel(-0.25, Some((0.0, 0.0)));
        }
        let scale = h.shell.snapshot().transform.unwrap().scale;
        assert!((scale - 1.1 * 1.1).abs() < 1e-9);

        h.shell.pinch_begin();
        for i in 1..=20 {
            h.shell.pinch_update(1.0 + i as f64 * 0.1, None);
        }
        h.shell.pinch_end();
        let snapshot = h.shell.snapshot().transform.unwrap();
        assert!((snapshot.scale - 3.0 * 1.21).abs() < 1e-9);

        let step_changes = h
            .shell
            .take_transform_events()
            .into_iter()
            .filter(|(_, e)| matches!(e, TransformEvent::StepChanged { .. }))
            .count();
        assert!(step_changes <= snapshot.step_index + 1);
    }

    #[test]
    fn test_render_frame() {
        let mut h = harness(ViewerConfig::default(), mixed_slides());
        h.shell.open(OpenTarget::Index(1)).unwrap();
        let renderers = RendererSet::uniform(TextRenderer)
            .with_overlay(|snap: &ViewerSnapshot| format!("{}/{}", snap.index.unwrap_or(0) + 1, snap.len));
        let frame = h.shell.render(&renderers);

        assert_eq!(frame.slides.len(), 3);
        assert!(frame.slides[0].ends_with("(poster)"));
        assert!(frame.slides[1].contains("pages=3"));
        assert_eq!(h.shell.snapshot().page_count, Some(3));
        assert_eq!(frame.thumbnails, vec![" 0", ">1", " 2"]);
        assert_eq!(frame.overlay.as_deref(), Some("2/3"));
    }
}
