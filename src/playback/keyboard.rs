/// Keys the player reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Enter,
    ArrowLeft,
    ArrowRight,
    Home,
    End,
    Other,
}

impl Key {
    /// Map a DOM-style key name (`" "`, `"Enter"`, `"ArrowLeft"`, ...).
    pub fn from_name(name: &str) -> Self {
        match name {
            " " | "Space" | "Spacebar" => Key::Space,
            "Enter" => Key::Enter,
            "ArrowLeft" | "Left" => Key::ArrowLeft,
            "ArrowRight" | "Right" => Key::ArrowRight,
            "Home" => Key::Home,
            "End" => Key::End,
            _ => Key::Other,
        }
    }
}

/// Whether the host must suppress its default handling of the key
/// (page scroll on arrows and space, form submit on enter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Handled by the player; prevent the default action
    Consumed,
    /// Not ours; let the host handle it
    Ignored,
}

impl KeyOutcome {
    pub fn prevent_default(self) -> bool {
        matches!(self, KeyOutcome::Consumed)
    }
}
