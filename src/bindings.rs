//! The input manager: parsing combo tokens and mapping them to command strings
//! (spec.md §4.7, §6 "Keycombo syntax").
use crate::keysyms::XKeySym;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use strum::EnumIter;

/// Modifier keys usable in a combo token, per spec.md §6: `Mod1`..`Mod4`, `Shift`, `Ctrl`.
#[derive(Debug, EnumIter, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modifier {
    /// `Ctrl`
    Ctrl,
    /// `Shift`
    Shift,
    /// `Mod1` (commonly Alt)
    Mod1,
    /// `Mod2`
    Mod2,
    /// `Mod3`
    Mod3,
    /// `Mod4` (commonly Super/Windows)
    Mod4,
}

impl FromStr for Modifier {
    type Err = crate::ipc::protocol::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ctrl" => Ok(Modifier::Ctrl),
            "Shift" => Ok(Modifier::Shift),
            "Mod1" => Ok(Modifier::Mod1),
            "Mod2" => Ok(Modifier::Mod2),
            "Mod3" => Ok(Modifier::Mod3),
            "Mod4" => Ok(Modifier::Mod4),
            other => Err(crate::ipc::protocol::ParseError::UnknownModifier(other.to_string())),
        }
    }
}

/// A modifier set plus a named key, serialized as `<Mod>-[<Mod>-...]<KeyName>`
/// (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombo {
    /// Held modifiers, kept sorted so equal combos hash/compare equal regardless
    /// of the order they were typed in
    pub modifiers: Vec<Modifier>,
    /// The X11 keysym name, e.g. `Return`, `h`, `1`, `minus`
    pub key: String,
}

impl KeyCombo {
    /// Resolve the textual key name to its numeric X11 keysym value, if it names
    /// a known key.
    pub fn keysym(&self) -> Option<u32> {
        XKeySym::from_str(&self.key).ok().map(|k| k.value())
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{m:?}-")?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for KeyCombo {
    type Err = crate::ipc::protocol::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.split('-').collect();
        let key = parts
            .pop()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| crate::ipc::protocol::ParseError::BadCombo(s.to_string()))?
            .to_string();

        let mut modifiers = parts
            .into_iter()
            .map(Modifier::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        modifiers.sort();
        modifiers.dedup();

        Ok(KeyCombo { modifiers, key })
    }
}

/// The mouse buttons addressable in a buttoncombo token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    /// Left button
    Left,
    /// Middle button / scroll click
    Middle,
    /// Right button
    Right,
}

impl FromStr for MouseButton {
    type Err = crate::ipc::protocol::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Left" | "Button1" => Ok(MouseButton::Left),
            "Middle" | "Button2" => Ok(MouseButton::Middle),
            "Right" | "Button3" => Ok(MouseButton::Right),
            other => Err(crate::ipc::protocol::ParseError::UnknownButton(other.to_string())),
        }
    }
}

/// A modifier set plus a mouse button, the pointer analog of [KeyCombo].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MouseCombo {
    /// Held modifiers
    pub modifiers: Vec<Modifier>,
    /// The button pressed
    pub button: MouseButton,
}

impl fmt::Display for MouseCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.modifiers {
            write!(f, "{m:?}-")?;
        }
        write!(f, "{:?}", self.button)
    }
}

impl FromStr for MouseCombo {
    type Err = crate::ipc::protocol::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.split('-').collect();
        let button = parts
            .pop()
            .ok_or_else(|| crate::ipc::protocol::ParseError::BadCombo(s.to_string()))
            .and_then(MouseButton::from_str)?;

        let mut modifiers = parts
            .into_iter()
            .map(Modifier::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        modifiers.sort();
        modifiers.dedup();

        Ok(MouseCombo { modifiers, button })
    }
}

/// User-defined key and mouse bindings: combo token -> command string
/// (spec.md §3 "Binding", §4.7 "Input manager").
///
/// `bind` installs or replaces an entry (last write wins, spec.md §8). Lookups on
/// an unrecognised combo are a silent no-op; they never reach here in practice
/// because the display gateway only grabs combos that have been bound.
#[derive(Debug, Default)]
pub struct Bindings {
    keys: HashMap<KeyCombo, String>,
    buttons: HashMap<MouseCombo, String>,
}

impl Bindings {
    /// Construct an empty binding map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace a key binding.
    pub fn bind_key(&mut self, combo: KeyCombo, command: String) {
        self.keys.insert(combo, command);
    }

    /// Install or replace a mouse binding.
    pub fn bind_button(&mut self, combo: MouseCombo, command: String) {
        self.buttons.insert(combo, command);
    }

    /// Look up the command string for a decoded key press.
    pub fn command_for_key(&self, combo: &KeyCombo) -> Option<&str> {
        self.keys.get(combo).map(String::as_str)
    }

    /// Look up the command string for a decoded button press.
    pub fn command_for_button(&self, combo: &MouseCombo) -> Option<&str> {
        self.buttons.get(combo).map(String::as_str)
    }

    /// Every currently bound key combo, used to (re)grab on the display gateway.
    pub fn key_combos(&self) -> impl Iterator<Item = &KeyCombo> {
        self.keys.keys()
    }

    /// Every currently bound mouse combo, used to (re)grab on the display gateway.
    pub fn button_combos(&self) -> impl Iterator<Item = &MouseCombo> {
        self.buttons.keys()
    }

    /// Clear all bindings, used by `reload-config`'s reset step (spec.md §4.8).
    pub fn clear(&mut self) {
        self.keys.clear();
        self.buttons.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("Mod4-Return", vec![Modifier::Mod4], "Return"; "single modifier")]
    #[test_case("Mod4-Shift-q", vec![Modifier::Mod4, Modifier::Shift], "q"; "multiple modifiers")]
    #[test_case("Shift-Mod4-q", vec![Modifier::Mod4, Modifier::Shift], "q"; "order independent")]
    #[test]
    fn parses_key_combo(s: &str, mods: Vec<Modifier>, key: &str) {
        let combo = KeyCombo::from_str(s).unwrap();
        assert_eq!(combo.modifiers, mods);
        assert_eq!(combo.key, key);
    }

    #[test]
    fn rejects_unknown_modifier() {
        assert!(KeyCombo::from_str("Hyper-q").is_err());
    }

    #[test]
    fn rejects_empty_key_name() {
        assert!(KeyCombo::from_str("Mod4-").is_err());
    }

    #[test]
    fn last_bind_wins() {
        let mut b = Bindings::new();
        let combo = KeyCombo::from_str("Mod4-q").unwrap();

        b.bind_key(combo.clone(), "close".into());
        b.bind_key(combo.clone(), "spawn foo".into());

        assert_eq!(b.command_for_key(&combo), Some("spawn foo"));
        assert_eq!(b.keys.len(), 1);
    }

    #[test]
    fn unbound_combo_is_none() {
        let b = Bindings::new();
        let combo = KeyCombo::from_str("Mod4-q").unwrap();
        assert_eq!(b.command_for_key(&combo), None);
    }

    #[test]
    fn clear_empties_both_maps() {
        let mut b = Bindings::new();
        b.bind_key(KeyCombo::from_str("Mod4-q").unwrap(), "close".into());
        b.bind_button(MouseCombo::from_str("Mod4-Left").unwrap(), "move".into());

        b.clear();

        assert_eq!(b.key_combos().count(), 0);
        assert_eq!(b.button_combos().count(), 0);
    }
}
