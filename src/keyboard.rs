//! Keyboard shortcuts for the four crop actions.
//!
//! Shortcuts are stored as combo strings (`Escape`, `KeyR`, `Control+Z`) so
//! they can be edited in the config file. A combo names either a physical key
//! code or a logical key; `Control` and `Meta` are interchangeable so the same
//! binding works on every platform.

use std::collections::HashSet;

use eframe::egui;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardShortcuts {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
    pub reset: Vec<String>,
    pub undo: Vec<String>,
}

impl Default for KeyboardShortcuts {
    fn default() -> Self {
        let strings = |keys: &[&str]| keys.iter().map(|k| k.to_string()).collect();
        Self {
            cancel: strings(&["Escape", "Esc"]),
            confirm: strings(&["Enter"]),
            reset: strings(&["KeyR", "r"]),
            // Ctrl+Z or Cmd+Z
            undo: strings(&["Control+Z", "Meta+Z"]),
        }
    }
}

impl KeyboardShortcuts {
    pub fn combos(&self, action: ShortcutAction) -> &[String] {
        match action {
            ShortcutAction::Cancel => &self.cancel,
            ShortcutAction::Confirm => &self.confirm,
            ShortcutAction::Reset => &self.reset,
            ShortcutAction::Undo => &self.undo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Cancel,
    Confirm,
    Reset,
    Undo,
}

impl ShortcutAction {
    /// Order in which a key press is checked against the bindings.
    pub const ALL: [ShortcutAction; 4] = [
        ShortcutAction::Cancel,
        ShortcutAction::Confirm,
        ShortcutAction::Reset,
        ShortcutAction::Undo,
    ];
}

impl std::fmt::Display for ShortcutAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ShortcutAction::Cancel => "Cancel",
            ShortcutAction::Confirm => "Confirm",
            ShortcutAction::Reset => "Reset",
            ShortcutAction::Undo => "Undo",
        };
        write!(f, "{}", s)
    }
}

/// A key-down or key-up, reduced to what shortcut matching needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    /// Physical code such as `KeyR`, `Digit1` or `Escape`
    pub code: String,
    /// Logical key such as `r`, `R` or `Escape`
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyPress {
    pub fn from_egui(
        key: egui::Key,
        physical_key: Option<egui::Key>,
        modifiers: egui::Modifiers,
    ) -> Self {
        let logical = key.name();
        let key_name = if is_letter(logical) && !modifiers.shift {
            logical.to_ascii_lowercase()
        } else {
            logical.to_string()
        };

        Self {
            code: key_code(physical_key.unwrap_or(key)),
            key: key_name,
            ctrl: modifiers.ctrl,
            meta: modifiers.mac_cmd,
            shift: modifiers.shift,
            alt: modifiers.alt,
        }
    }

    /// Id recorded in the pressed-key set.
    fn id(&self) -> String {
        if self.ctrl || self.meta {
            format!("Control+{}", self.code)
        } else {
            self.code.clone()
        }
    }
}

fn is_letter(name: &str) -> bool {
    name.len() == 1 && name.chars().all(|c| c.is_ascii_alphabetic())
}

fn key_code(key: egui::Key) -> String {
    let name = key.name();
    if is_letter(name) {
        format!("Key{}", name.to_ascii_uppercase())
    } else if name.len() == 1 && name.chars().all(|c| c.is_ascii_digit()) {
        format!("Digit{name}")
    } else {
        name.to_string()
    }
}

/// Callbacks fired by [`Keyboard::handle_key_down`].
pub trait KeyboardHandler {
    fn on_confirm(&mut self);
    fn on_cancel(&mut self);
    fn on_reset(&mut self);
    fn on_undo(&mut self);

    /// Sees every key-down before shortcut matching.
    fn on_key_down(&mut self, _event: &KeyPress) {}
}

pub fn is_key_combo_match(event: &KeyPress, combo: &str) -> bool {
    if combo.contains('+') {
        let mut parts = combo.split('+');
        let modifier = parts.next().unwrap_or_default();
        let key = parts.next().unwrap_or_default();

        let modifier_down = match modifier {
            "Control" | "Meta" => event.ctrl || event.meta,
            "Shift" => event.shift,
            "Alt" => event.alt,
            _ => false,
        };
        if !modifier_down {
            return false;
        }

        return event.code == key || event.key.eq_ignore_ascii_case(key);
    }

    event.code == combo || event.key == combo || event.key.eq_ignore_ascii_case(combo)
}

/// Tracks held keys and dispatches shortcut actions.
#[derive(Debug, Default)]
pub struct Keyboard {
    shortcuts: KeyboardShortcuts,
    pressed_keys: HashSet<String>,
}

impl Keyboard {
    pub fn new(shortcuts: KeyboardShortcuts) -> Self {
        Self {
            shortcuts,
            pressed_keys: HashSet::new(),
        }
    }

    pub fn shortcuts(&self) -> &KeyboardShortcuts {
        &self.shortcuts
    }

    /// Returns the action that fired, if any. Only the first matching action
    /// runs; the caller should treat the event as consumed.
    pub fn handle_key_down(
        &mut self,
        event: &KeyPress,
        handler: &mut impl KeyboardHandler,
    ) -> Option<ShortcutAction> {
        self.pressed_keys.insert(event.id());
        handler.on_key_down(event);

        let action = ShortcutAction::ALL.into_iter().find(|action| {
            self.shortcuts
                .combos(*action)
                .iter()
                .any(|combo| is_key_combo_match(event, combo))
        })?;

        log::debug!("Shortcut {action} ({})", event.code);
        match action {
            ShortcutAction::Cancel => handler.on_cancel(),
            ShortcutAction::Confirm => handler.on_confirm(),
            ShortcutAction::Reset => handler.on_reset(),
            ShortcutAction::Undo => handler.on_undo(),
        }
        Some(action)
    }

    pub fn handle_key_up(&mut self, event: &KeyPress) {
        self.pressed_keys.remove(&event.id());
    }

    /// egui reports modifiers as state rather than key events, so they are
    /// mirrored into the pressed set once per frame.
    pub fn sync_modifiers(&mut self, modifiers: egui::Modifiers) {
        for (code, down) in [("ControlLeft", modifiers.ctrl), ("MetaLeft", modifiers.mac_cmd)] {
            if down {
                self.pressed_keys.insert(code.to_string());
            } else {
                self.pressed_keys.remove(code);
            }
        }
    }

    pub fn is_key_pressed(&self, key: &str) -> bool {
        self.pressed_keys.contains(key)
    }

    pub fn is_modifier_pressed(&self) -> bool {
        ["ControlLeft", "ControlRight", "MetaLeft", "MetaRight"]
            .iter()
            .any(|k| self.is_key_pressed(k))
    }

    pub fn shortcut_descriptions(&self) -> Vec<String> {
        ShortcutAction::ALL
            .iter()
            .map(|action| {
                let keys: Vec<String> = self
                    .shortcuts
                    .combos(*action)
                    .iter()
                    .map(|c| format_key_display(c))
                    .collect();
                format!("{action}: {}", keys.join(" / "))
            })
            .collect()
    }
}

pub fn format_key_display(combo: &str) -> String {
    if combo.contains('+') {
        let mut parts = combo.split('+');
        let modifier = match parts.next().unwrap_or_default() {
            "Control" => "Ctrl",
            other => other,
        };
        let key = parts.next().unwrap_or_default().replacen("Key", "", 1);
        return format!("{modifier} + {key}");
    }

    if let Some(letter) = combo.strip_prefix("Key") {
        return letter.to_uppercase();
    }

    match combo {
        "Escape" => "ESC".to_string(),
        _ => combo.to_string(),
    }
}

/// Button tooltip such as `Undo (Ctrl+Z or Meta+Z)`.
pub fn shortcut_tooltip(action: ShortcutAction, shortcuts: &KeyboardShortcuts) -> String {
    let keys: Vec<String> = shortcuts
        .combos(action)
        .iter()
        .map(|combo| {
            if let Some((modifier, key)) = combo.split_once('+') {
                let modifier = if modifier == "Control" { "Ctrl" } else { modifier };
                let key = key.split('+').next().unwrap_or_default();
                format!("{modifier}+{}", key.replacen("Key", "", 1))
            } else if combo == "Escape" {
                "ESC".to_string()
            } else {
                combo.clone()
            }
        })
        .collect();

    format!("{action} ({})", keys.join(" or "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: &str, key: &str) -> KeyPress {
        KeyPress {
            code: code.into(),
            key: key.into(),
            ctrl: false,
            meta: false,
            shift: false,
            alt: false,
        }
    }

    #[derive(Default)]
    struct Recorder {
        fired: Vec<&'static str>,
        seen: usize,
    }

    impl KeyboardHandler for Recorder {
        fn on_confirm(&mut self) {
            self.fired.push("confirm");
        }
        fn on_cancel(&mut self) {
            self.fired.push("cancel");
        }
        fn on_reset(&mut self) {
            self.fired.push("reset");
        }
        fn on_undo(&mut self) {
            self.fired.push("undo");
        }
        fn on_key_down(&mut self, _event: &KeyPress) {
            self.seen += 1;
        }
    }

    #[test]
    fn test_single_key_matching() {
        assert!(is_key_combo_match(&press("Escape", "Escape"), "Escape"));
        assert!(is_key_combo_match(&press("KeyR", "r"), "KeyR"));
        assert!(is_key_combo_match(&press("KeyR", "R"), "r"));
        assert!(!is_key_combo_match(&press("KeyT", "t"), "r"));
    }

    #[test]
    fn test_control_and_meta_are_interchangeable() {
        let mut ctrl_z = press("KeyZ", "z");
        ctrl_z.ctrl = true;
        assert!(is_key_combo_match(&ctrl_z, "Control+Z"));
        assert!(is_key_combo_match(&ctrl_z, "Meta+Z"));

        let mut cmd_z = press("KeyZ", "z");
        cmd_z.meta = true;
        assert!(is_key_combo_match(&cmd_z, "Control+Z"));

        assert!(!is_key_combo_match(&press("KeyZ", "z"), "Control+Z"));
    }

    #[test]
    fn test_shift_and_alt_need_their_own_key() {
        let mut ctrl_a = press("KeyA", "a");
        ctrl_a.ctrl = true;
        assert!(!is_key_combo_match(&ctrl_a, "Shift+A"));
        assert!(!is_key_combo_match(&ctrl_a, "Alt+A"));

        let mut alt_a = press("KeyA", "a");
        alt_a.alt = true;
        assert!(is_key_combo_match(&alt_a, "Alt+KeyA"));
    }

    #[test]
    fn test_dispatch_each_default_shortcut() {
        let mut keyboard = Keyboard::default();
        let mut handler = Recorder::default();

        let mut undo = press("KeyZ", "z");
        undo.ctrl = true;

        let presses = [
            (press("Escape", "Escape"), ShortcutAction::Cancel),
            (press("Enter", "Enter"), ShortcutAction::Confirm),
            (press("KeyR", "r"), ShortcutAction::Reset),
            (undo, ShortcutAction::Undo),
        ];
        for (event, expected) in presses.iter() {
            assert_eq!(keyboard.handle_key_down(event, &mut handler), Some(*expected));
        }

        assert_eq!(handler.fired, vec!["cancel", "confirm", "reset", "undo"]);
        assert_eq!(handler.seen, 4);
    }

    #[test]
    fn test_unbound_key_fires_nothing() {
        let mut keyboard = Keyboard::default();
        let mut handler = Recorder::default();
        assert_eq!(keyboard.handle_key_down(&press("KeyQ", "q"), &mut handler), None);
        assert!(handler.fired.is_empty());
        assert_eq!(handler.seen, 1);
    }

    #[test]
    fn test_pressed_key_tracking() {
        let mut keyboard = Keyboard::default();
        let mut handler = Recorder::default();

        let mut ctrl_s = press("KeyS", "s");
        ctrl_s.ctrl = true;
        keyboard.handle_key_down(&ctrl_s, &mut handler);
        assert!(keyboard.is_key_pressed("Control+KeyS"));

        keyboard.handle_key_up(&ctrl_s);
        assert!(!keyboard.is_key_pressed("Control+KeyS"));

        assert!(!keyboard.is_modifier_pressed());
        keyboard.sync_modifiers(egui::Modifiers::CTRL);
        assert!(keyboard.is_modifier_pressed());
        keyboard.sync_modifiers(egui::Modifiers::NONE);
        assert!(!keyboard.is_modifier_pressed());
    }

    #[test]
    fn test_key_press_from_egui() {
        let event = KeyPress::from_egui(egui::Key::R, None, egui::Modifiers::NONE);
        assert_eq!(event.code, "KeyR");
        assert_eq!(event.key, "r");

        let event = KeyPress::from_egui(egui::Key::Num1, None, egui::Modifiers::SHIFT);
        assert_eq!(event.code, "Digit1");

        let event = KeyPress::from_egui(egui::Key::Escape, None, egui::Modifiers::NONE);
        assert_eq!(event.code, "Escape");
        assert_eq!(event.key, "Escape");
    }

    #[test]
    fn test_format_key_display() {
        assert_eq!(format_key_display("Control+Z"), "Ctrl + Z");
        assert_eq!(format_key_display("Meta+KeyZ"), "Meta + Z");
        assert_eq!(format_key_display("KeyR"), "R");
        assert_eq!(format_key_display("Escape"), "ESC");
        assert_eq!(format_key_display("Enter"), "Enter");
    }

    #[test]
    fn test_descriptions_and_tooltips() {
        let keyboard = Keyboard::default();
        assert_eq!(
            keyboard.shortcut_descriptions(),
            vec![
                "Cancel: ESC / Esc",
                "Confirm: Enter",
                "Reset: R / r",
                "Undo: Ctrl + Z / Meta + Z",
            ]
        );

        let shortcuts = KeyboardShortcuts::default();
        assert_eq!(
            shortcut_tooltip(ShortcutAction::Undo, &shortcuts),
            "Undo (Ctrl+Z or Meta+Z)"
        );
        assert_eq!(
            shortcut_tooltip(ShortcutAction::Cancel, &shortcuts),
            "Cancel (ESC or Esc)"
        );
    }
}
