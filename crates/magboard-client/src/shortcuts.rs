//! Keyboard shortcut registry.

use magboard_core::tools::ToolKind;

/// What a shortcut does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Tool(ToolKind),
    Undo,
    Redo,
    DeleteSelected,
    Cancel,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    pub ctrl: bool,
    pub shift: bool,
    pub action: ShortcutAction,
    pub description: &'static str,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        ctrl: bool,
        shift: bool,
        action: ShortcutAction,
        description: &'static str,
    ) -> Self {
        Self {
            key,
            ctrl,
            shift,
            action,
            description,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+Z").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }
}

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> Vec<Shortcut> {
        use ShortcutAction::*;
        vec![
            Shortcut::new("V", false, false, Tool(ToolKind::Select), "Select tool"),
            Shortcut::new("M", false, false, Tool(ToolKind::Move), "Move tool"),
            Shortcut::new("P", false, false, Tool(ToolKind::Pen), "Pen tool"),
            Shortcut::new("E", false, false, Tool(ToolKind::Eraser), "Eraser tool"),
            Shortcut::new("T", false, false, Tool(ToolKind::Text), "Text tool"),
            Shortcut::new("R", false, false, Tool(ToolKind::Rectangle), "Rectangle tool"),
            Shortcut::new("C", false, false, Tool(ToolKind::Circle), "Circle tool"),
            Shortcut::new("Z", true, false, Undo, "Undo"),
            Shortcut::new("Z", true, true, Redo, "Redo"),
            Shortcut::new("Y", true, false, Redo, "Redo"),
            Shortcut::new("Delete", false, false, DeleteSelected, "Delete selected element"),
            Shortcut::new("Backspace", false, false, DeleteSelected, "Delete selected element"),
            Shortcut::new("Escape", false, false, Cancel, "Cancel text entry"),
        ]
    }

    /// Find the action bound to a key press. Key names match case-insensitively.
    pub fn lookup(key: &str, ctrl: bool, shift: bool) -> Option<ShortcutAction> {
        Self::all()
            .into_iter()
            .find(|s| s.key.eq_ignore_ascii_case(key) && s.ctrl == ctrl && s.shift == shift)
            .map(|s| s.action)
    }

    /// One line per shortcut, for help output.
    pub fn help_text() -> String {
        Self::all()
            .iter()
            .map(|s| format!("  {:20} {}", s.format(), s.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
