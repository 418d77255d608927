// Keybindings for the idxv viewer shell
// Maps host-neutral keys to viewer actions
//
// Keybindings:
// - Left / h: Previous slide
// - Right / l: Next slide
// - Home / End: First / last slide
// - Escape: Close viewer
// - f: Toggle fullscreen
// - + / =: Zoom in one step
// - -: Zoom out one step
// - 0: Reset zoom
// - d: Download active slide
// - Tab / Shift+Tab: Cycle focus between controls
// - Enter / Space: Activate focused control

use std::collections::HashMap;

/// Host-neutral key. Hosts translate their native key events into this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Escape,
    Enter,
    Space,
    Tab,
    /// Shift+Tab
    BackTab,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewerAction {
    Prev,
    Next,
    First,
    Last,
    Close,
    ToggleFullscreen,
    ZoomIn,
    ZoomOut,
    ResetZoom,
    Download,
    FocusNext,
    FocusPrev,
    ActivateFocused,
}

impl ViewerAction {
    /// Slide-changing actions that a zoomed slide suppresses.
    pub fn is_slide_navigation(self) -> bool {
        matches!(self, Self::Prev | Self::Next | Self::First | Self::Last)
    }

    pub fn is_zoom(self) -> bool {
        matches!(self, Self::ZoomIn | Self::ZoomOut | Self::ResetZoom)
    }
}

/// Key to action table. Custom bindings take precedence over the defaults.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    overrides: HashMap<Key, Option<ViewerAction>>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `key` to `action`, replacing the default.
    pub fn bind(&mut self, key: Key, action: ViewerAction) -> &mut Self {
        self.overrides.insert(key, Some(action));
        self
    }

    /// Removes any binding for `key`, including the default.
    pub fn unbind(&mut self, key: Key) -> &mut Self {
        self.overrides.insert(key, None);
        self
    }

    pub fn action_for(&self, key: Key) -> Option<ViewerAction> {
        if let Some(bound) = self.overrides.get(&key) {
            return *bound;
        }
        Self::default_action(key)
    }

    fn default_action(key: Key) -> Option<ViewerAction> {
        let action = match key {
            // Arrow keys and vim-style keys
            Key::Left | Key::Char('h') => ViewerAction::Prev,
            Key::Right | Key::Char('l') => ViewerAction::Next,
            Key::Home => ViewerAction::First,
            Key::End => ViewerAction::Last,
            Key::Escape => ViewerAction::Close,
            Key::Char('f') | Key::Char('F') => ViewerAction::ToggleFullscreen,
            Key::Char('+') | Key::Char('=') => ViewerAction::ZoomIn,
            Key::Char('-') => ViewerAction::ZoomOut,
            Key::Char('0') => ViewerAction::ResetZoom,
            Key::Char('d') | Key::Char('D') => ViewerAction::Download,
            Key::Tab => ViewerAction::FocusNext,
            Key::BackTab => ViewerAction::FocusPrev,
            Key::Enter | Key::Space => ViewerAction::ActivateFocused,
            Key::Up | Key::Down | Key::Char(_) => return None,
        };
        Some(action)
    }
}
