//! Keyboard input and editor shortcuts.

use serde::{Deserialize, Serialize};

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    /// Shift key pressed.
    pub shift: bool,
    /// Control key pressed.
    pub ctrl: bool,
    /// Alt/Option key pressed.
    pub alt: bool,
    /// Meta/Command key pressed.
    pub meta: bool,
}

impl KeyModifiers {
    /// Control on most platforms, Command on macOS.
    #[must_use]
    pub const fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key press delivered to the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPress {
    /// Key name as reported by the platform (`"z"`, `"Delete"`, `"Escape"`).
    pub key: String,
    /// Active modifier keys.
    pub modifiers: KeyModifiers,
    /// Whether focus is inside a text input outside the canvas (e.g. the prompt box).
    pub in_text_input: bool,
}

impl KeyPress {
    /// A key press with no modifiers, focused on the canvas.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: KeyModifiers::default(),
            in_text_input: false,
        }
    }

    /// Set the modifiers.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark the press as happening inside a text input.
    #[must_use]
    pub fn in_text_input(mut self) -> Self {
        self.in_text_input = true;
        self
    }
}

/// Editor actions reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shortcut {
    /// Step back in history.
    Undo,
    /// Step forward in history.
    Redo,
    /// Delete the selection.
    Delete,
    /// Group the selection.
    Group,
    /// Ungroup selected groups.
    Ungroup,
    /// Cancel the current interaction or clear the selection.
    Escape,
}

impl Shortcut {
    /// Map a key press to a shortcut, ignoring text-focus rules.
    #[must_use]
    pub fn from_key(press: &KeyPress) -> Option<Self> {
        let mods = press.modifiers;
        let key = press.key.to_lowercase();
        match key.as_str() {
            "z" if mods.command() && mods.shift => Some(Self::Redo),
            "z" if mods.command() => Some(Self::Undo),
            "y" if mods.command() => Some(Self::Redo),
            "g" if mods.command() && mods.shift => Some(Self::Ungroup),
            "g" if mods.command() => Some(Self::Group),
            "delete" | "backspace" => Some(Self::Delete),
            "escape" => Some(Self::Escape),
            _ => None,
        }
    }
}
