//! Keyboard focus across the shell's controls.

use std::fmt;

/// Focusable shell controls in tab order. Thumbnails are not part of the
/// ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Prev,
    Next,
    ZoomOut,
    ZoomIn,
    Fullscreen,
    Download,
    Close,
}

impl Control {
    pub const ORDER: [Control; 7] = [
        Control::Prev,
        Control::Next,
        Control::ZoomOut,
        Control::ZoomIn,
        Control::Fullscreen,
        Control::Download,
        Control::Close,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prev => "prev",
            Self::Next => "next",
            Self::ZoomOut => "zoom-out",
            Self::ZoomIn => "zoom-in",
            Self::Fullscreen => "fullscreen",
            Self::Download => "download",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tab cycling over the controls that are currently enabled.
#[derive(Debug, Clone, Default)]
pub struct FocusRing {
    trap: bool,
    focused: Option<Control>,
}

impl FocusRing {
    pub fn new(trap: bool) -> Self {
        Self {
            trap,
            focused: None,
        }
    }

    pub fn focused(&self) -> Option<Control> {
        self.focused
    }

    pub fn clear(&mut self) {
        self.focused = None;
    }

    /// Moves focus forward (`reverse = false`) or backward among `enabled`.
    /// Returns false when focus leaves the shell, which only happens without
    /// a trap.
    pub fn cycle(&mut self, enabled: &[Control], reverse: bool) -> bool {
        if enabled.is_empty() {
            self.focused = None;
            return false;
        }
        let last = enabled.len() - 1;
        let position = self
            .focused
            .and_then(|c| enabled.iter().position(|&e| e == c));

        let next = match (position, reverse) {
            (None, false) => Some(0),
            (None, true) => Some(last),
            (Some(i), false) if i < last => Some(i + 1),
            (Some(i), true) if i > 0 => Some(i - 1),
            (Some(_), false) => self.trap.then_some(0),
            (Some(_), true) => self.trap.then_some(last),
        };

        self.focused = next.map(|i| enabled[i]);
        self.focused.is_some()
    }

    /// Drops focus from a control that just became disabled.
    pub fn retain(&mut self, enabled: &[Control]) {
        if let Some(focused) = self.focused {
            if !enabled.contains(&focused) {
                self.focused = None;
            }
        }
    }
}
