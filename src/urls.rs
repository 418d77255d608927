use std::fmt;
use std::rc::Rc;

type UrlFn = Rc<dyn Fn(&str) -> String>;

/// Caller-supplied mapping from slide source references to URLs.
///
/// The preview URL falls back to the full URL when no preview mapping is set.
#[derive(Clone)]
pub struct UrlResolver {
    make_url: UrlFn,
    make_preview_url: Option<UrlFn>,
}

impl UrlResolver {
    pub fn new<F>(make_url: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        Self {
            make_url: Rc::new(make_url),
            make_preview_url: None,
        }
    }

    pub fn with_preview<F>(mut self, make_preview_url: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        self.make_preview_url = Some(Rc::new(make_preview_url));
        self
    }

    pub fn identity() -> Self {
        Self::new(str::to_owned)
    }

    pub fn url(&self, source: &str) -> String {
        (self.make_url)(source)
    }

    pub fn preview_url(&self, source: &str) -> String {
        match &self.make_preview_url {
            Some(make_preview_url) => make_preview_url(source),
            None => self.url(source),
        }
    }
}

impl Default for UrlResolver {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for UrlResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlResolver")
            .field("make_url", &"<closure>")
            .field("has_preview", &self.make_preview_url.is_some())
            .finish()
    }
}
