//! OS global-hotkey spec strings

use super::{Keybind, Modifier};

/// Platform-neutral token for Cmd on macOS and Ctrl elsewhere.
pub const PRIMARY_MODIFIER: &str = "CommandOrControl";

/// Fixed, non-remappable lock hotkey.
pub const LOCK_SHORTCUT: &str = "CommandOrControl+Shift+L";

/// Key token as the hotkey service expects it.
///
/// Single characters are uppercased, a literal space becomes `Space` and
/// named keys get their first letter capitalized (`f5` -> `F5`).
pub fn key_token(key: &str) -> String {
    if key == " " {
        return "Space".to_string();
    }
    let mut chars = key.chars();
    match (chars.next(), chars.clone().next()) {
        (Some(only), None) => only.to_uppercase().collect(),
        (Some(first), Some(_)) => first.to_uppercase().collect::<String>() + chars.as_str(),
        (None, _) => String::new(),
    }
}

/// Build the hotkey spec: primary modifier, then Shift, then Alt, then the key.
pub fn shortcut_spec(keybind: &Keybind) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(keybind.modifiers.len() + 1);
    // BTreeSet iteration follows Modifier's declaration order: Ctrl, Shift, Alt
    for modifier in &keybind.modifiers {
        parts.push(
            match modifier {
                Modifier::Ctrl => PRIMARY_MODIFIER,
                Modifier::Shift => "Shift",
                Modifier::Alt => "Alt",
            }
            .to_string(),
        );
    }
    parts.push(key_token(&keybind.key));
    parts.join("+")
}
