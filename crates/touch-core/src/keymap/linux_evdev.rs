//! Symbolic key names to Linux evdev key codes.
//!
//! Codes are the `KEY_*` values from `linux/input-event-codes.h`.  They are
//! stable kernel ABI, identical on every architecture.
//!
//! # Names, not scancodes (for beginners)
//!
//! A caller says `"enter"` or `"ctrl"`; the kernel wants `28` or `29`.  The
//! table below holds one lowercase name per key plus a few aliases
//! (`"return"`, `"esc"`, `"ctrl"` …) that point at the same code.  Lookup is
//! case-insensitive and tolerates a `KEY_` prefix, so `"KEY_ENTER"`,
//! `"Enter"` and `"enter"` all resolve to 28.

/// `(name, code)` pairs.  Aliases repeat a code under another name.
pub const KEY_CODES: &[(&str, u16)] = &[
    // Letters
    ("a", 30),
    ("b", 48),
    ("c", 46),
    ("d", 32),
    ("e", 18),
    ("f", 33),
    ("g", 34),
    ("h", 35),
    ("i", 23),
    ("j", 36),
    ("k", 37),
    ("l", 38),
    ("m", 50),
    ("n", 49),
    ("o", 24),
    ("p", 25),
    ("q", 16),
    ("r", 19),
    ("s", 31),
    ("t", 20),
    ("u", 22),
    ("v", 47),
    ("w", 17),
    ("x", 45),
    ("y", 21),
    ("z", 44),
    // Digit row
    ("1", 2),
    ("2", 3),
    ("3", 4),
    ("4", 5),
    ("5", 6),
    ("6", 7),
    ("7", 8),
    ("8", 9),
    ("9", 10),
    ("0", 11),
    // Punctuation
    ("minus", 12),
    ("equal", 13),
    ("leftbrace", 26),
    ("rightbrace", 27),
    ("semicolon", 39),
    ("apostrophe", 40),
    ("grave", 41),
    ("backslash", 43),
    ("comma", 51),
    ("dot", 52),
    ("slash", 53),
    // Editing
    ("escape", 1),
    ("esc", 1),
    ("backspace", 14),
    ("tab", 15),
    ("enter", 28),
    ("return", 28),
    ("space", 57),
    ("capslock", 58),
    ("insert", 110),
    ("delete", 111),
    ("del", 111),
    // Navigation
    ("home", 102),
    ("up", 103),
    ("pageup", 104),
    ("left", 105),
    ("right", 106),
    ("end", 107),
    ("down", 108),
    ("pagedown", 109),
    // Modifiers
    ("leftctrl", 29),
    ("ctrl", 29),
    ("control", 29),
    ("rightctrl", 97),
    ("leftshift", 42),
    ("shift", 42),
    ("rightshift", 54),
    ("leftalt", 56),
    ("alt", 56),
    ("rightalt", 100),
    ("altgr", 100),
    ("leftmeta", 125),
    ("meta", 125),
    ("super", 125),
    ("rightmeta", 126),
    // Function keys
    ("f1", 59),
    ("f2", 60),
    ("f3", 61),
    ("f4", 62),
    ("f5", 63),
    ("f6", 64),
    ("f7", 65),
    ("f8", 66),
    ("f9", 67),
    ("f10", 68),
    ("f11", 87),
    ("f12", 88),
    // Locks and system
    ("numlock", 69),
    ("scrolllock", 70),
    ("sysrq", 99),
    ("pause", 119),
    ("compose", 127),
    // Media and device buttons
    ("mute", 113),
    ("volumedown", 114),
    ("volumeup", 115),
    ("power", 116),
    ("menu", 139),
    ("back", 158),
    ("homepage", 172),
];

/// Resolves a key name to its evdev code.
///
/// Returns `None` for names not in [`KEY_CODES`].
pub fn key_code(name: &str) -> Option<u16> {
    let lower = name.trim().to_ascii_lowercase();
    let bare = lower.strip_prefix("key_").unwrap_or(&lower);
    KEY_CODES
        .iter()
        .find(|(n, _)| *n == bare)
        .map(|&(_, code)| code)
}

/// Every distinct code in the table, ascending.
///
/// The virtual keyboard declares exactly these codes.
pub fn all_key_codes() -> Vec<u16> {
    let mut codes: Vec<u16> = KEY_CODES.iter().map(|&(_, code)| code).collect();
    codes.sort_unstable();
    codes.dedup();
    codes
}
