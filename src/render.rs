//! Per-kind slide rendering.
//!
//! The renderer table is keyed by `SlideKind` and is the viewer's only
//! extension point. Lookups are an exhaustive match, so adding a kind fails
//! to compile until every table handles it.

use std::fmt::Write as _;

use crate::layout::FitResult;
use crate::loader::LoadState;
use crate::models::{Slide, SlideKind};
use crate::ui::ViewerSnapshot;
use crate::zoom::TransformSnapshot;

/// Everything a renderer needs for one slide.
#[derive(Debug, Clone)]
pub struct SlideProps<'a> {
    pub slide: &'a Slide,
    pub index: usize,
    pub url: String,
    pub preview_url: String,
    /// Only the active slide decodes media; inactive slides get a poster.
    pub active: bool,
    pub fit: Option<FitResult>,
    /// Declared page count, or the one the loader reported.
    pub page_count: Option<u32>,
    /// Present for the active slide only.
    pub transform: Option<TransformSnapshot>,
    pub load_state: LoadState,
}

#[derive(Debug, Clone)]
pub struct ThumbnailProps<'a> {
    pub slide: &'a Slide,
    pub index: usize,
    pub preview_url: String,
    pub selected: bool,
}

pub trait SlideRenderer {
    type Output;

    fn render_slide(&self, props: &SlideProps<'_>) -> Self::Output;
    fn render_thumbnail(&self, props: &ThumbnailProps<'_>) -> Self::Output;
}

type OverlayFn<O> = Box<dyn Fn(&ViewerSnapshot) -> O>;

/// One renderer per slide kind plus an optional overlay/menu renderer.
pub struct RendererSet<O> {
    image: Box<dyn SlideRenderer<Output = O>>,
    video: Box<dyn SlideRenderer<Output = O>>,
    document: Box<dyn SlideRenderer<Output = O>>,
    overlay: Option<OverlayFn<O>>,
}

impl<O> std::fmt::Debug for RendererSet<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RendererSet")
            .field("has_overlay", &self.overlay.is_some())
            .finish()
    }
}

impl<O: 'static> RendererSet<O> {
    /// Uses the same renderer for every kind.
    pub fn uniform<R>(renderer: R) -> Self
    where
        R: SlideRenderer<Output = O> + Clone + 'static,
    {
        Self {
            image: Box::new(renderer.clone()),
            video: Box::new(renderer.clone()),
            document: Box::new(renderer),
            overlay: None,
        }
    }

    /// Replaces the renderer for one kind.
    pub fn with_renderer<R>(mut self, kind: SlideKind, renderer: R) -> Self
    where
        R: SlideRenderer<Output = O> + 'static,
    {
        let boxed: Box<dyn SlideRenderer<Output = O>> = Box::new(renderer);
        match kind {
            SlideKind::Image => self.image = boxed,
            SlideKind::Video => self.video = boxed,
            SlideKind::Document => self.document = boxed,
        }
        self
    }

    pub fn with_overlay<F>(mut self, overlay: F) -> Self
    where
        F: Fn(&ViewerSnapshot) -> O + 'static,
    {
        self.overlay = Some(Box::new(overlay));
        self
    }
}

impl<O> RendererSet<O> {
    pub fn renderer_for(&self, kind: SlideKind) -> &dyn SlideRenderer<Output = O> {
        match kind {
            SlideKind::Image => self.image.as_ref(),
            SlideKind::Video => self.video.as_ref(),
            SlideKind::Document => self.document.as_ref(),
        }
    }

    pub fn render_slide(&self, props: &SlideProps<'_>) -> O {
        self.renderer_for(props.slide.kind).render_slide(props)
    }

    pub fn render_thumbnail(&self, props: &ThumbnailProps<'_>) -> O {
        self.renderer_for(props.slide.kind).render_thumbnail(props)
    }

    pub fn render_overlay(&self, snapshot: &ViewerSnapshot) -> Option<O> {
        self.overlay.as_ref().map(|overlay| overlay(snapshot))
    }
}

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<O> {
    pub slides: Vec<O>,
    /// Empty when thumbnails are disabled.
    pub thumbnails: Vec<O>,
    pub overlay: Option<O>,
}

/// One line of text per slide. Used by the terminal host.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl SlideRenderer for TextRenderer {
    type Output = String;

    fn render_slide(&self, props: &SlideProps<'_>) -> String {
        let slide = props.slide;
        let mut line = format!("[{}] {:<8} {}", props.index, slide.kind, slide.id);
        if !props.active {
            line.push_str(" (poster)");
            return line;
        }

        if let Some(pages) = props.page_count {
            let _ = write!(line, " pages={pages}");
        }
        if let Some(fit) = props.fit {
            let _ = write!(line, " fit={:.0}x{:.0}", fit.width, fit.height);
        }
        if let Some(t) = &props.transform {
            let _ = write!(
                line,
                " scale={:.2} step={} pos=({:.0},{:.0})",
                t.scale, t.step, t.position.0, t.position.1
            );
            if !t.disable_transforms {
                line.push_str(" zoomed");
            }
        }
        match &props.load_state {
            LoadState::Idle => {}
            LoadState::Loading => line.push_str(" loading"),
            LoadState::Loaded => line.push_str(" loaded"),
            LoadState::Failed(reason) => {
                let _ = write!(line, " failed: {reason}");
            }
        }
        line
    }

    fn render_thumbnail(&self, props: &ThumbnailProps<'_>) -> String {
        let marker = if props.selected { '>' } else { ' ' };
        format!("{marker}{}", props.index)
    }
}
