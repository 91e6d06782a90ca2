//! Key tables for the virtual keyboard.
//!
//! Two static mappings live here:
//!
//! - [`linux_evdev`]: symbolic key name → Linux key code, used by `key_press`
//!   for both the key and its modifiers.
//! - [`char_to_key`]: printable character → (key name, needs-shift), used only
//!   by `key_type`.  The layout is US QWERTY.

pub mod linux_evdev;

pub use linux_evdev::{all_key_codes, key_code};

/// Key name that [`char_to_key`] expects to be held for shifted characters.
pub const SHIFT_KEY: &str = "leftshift";

const LETTERS: [&str; 26] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z",
];

const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// Translates one character of text into the key that produces it.
///
/// Returns `None` for characters the US layout cannot type with a single
/// key (non-ASCII, control characters other than tab and newline).
pub fn char_to_key(c: char) -> Option<(&'static str, bool)> {
    if c.is_ascii_lowercase() {
        return Some((LETTERS[(c as u8 - b'a') as usize], false));
    }
    if c.is_ascii_uppercase() {
        return Some((LETTERS[(c as u8 - b'A') as usize], true));
    }
    if c.is_ascii_digit() {
        return Some((DIGITS[(c as u8 - b'0') as usize], false));
    }

    let mapped = match c {
        ' ' => ("space", false),
        '\n' => ("enter", false),
        '\t' => ("tab", false),

        '-' => ("minus", false),
        '=' => ("equal", false),
        '[' => ("leftbrace", false),
        ']' => ("rightbrace", false),
        '\\' => ("backslash", false),
        ';' => ("semicolon", false),
        '\'' => ("apostrophe", false),
        '`' => ("grave", false),
        ',' => ("comma", false),
        '.' => ("dot", false),
        '/' => ("slash", false),

        '!' => ("1", true),
        '@' => ("2", true),
        '#' => ("3", true),
        '$' => ("4", true),
        '%' => ("5", true),
        '^' => ("6", true),
        '&' => ("7", true),
        '*' => ("8", true),
        '(' => ("9", true),
        ')' => ("0", true),
        '_' => ("minus", true),
        '+' => ("equal", true),
        '{' => ("leftbrace", true),
        '}' => ("rightbrace", true),
        '|' => ("backslash", true),
        ':' => ("semicolon", true),
        '"' => ("apostrophe", true),
        '~' => ("grave", true),
        '<' => ("comma", true),
        '>' => ("dot", true),
        '?' => ("slash", true),

        _ => return None,
    };
    Some(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_map_with_shift_for_uppercase() {
        assert_eq!(char_to_key('q'), Some(("q", false)));
        assert_eq!(char_to_key('Q'), Some(("q", true)));
    }

    #[test]
    fn test_shifted_symbols_share_base_key() {
        assert_eq!(char_to_key('!'), Some(("1", true)));
        assert_eq!(char_to_key('?'), Some(("slash", true)));
        assert_eq!(char_to_key('/'), Some(("slash", false)));
    }

    #[test]
    fn test_whitespace_keys() {
        assert_eq!(char_to_key(' '), Some(("space", false)));
        assert_eq!(char_to_key('\n'), Some(("enter", false)));
    }

    #[test]
    fn test_unmapped_characters_return_none() {
        assert_eq!(char_to_key('é'), None);
        assert_eq!(char_to_key('\u{7}'), None);
    }

    #[test]
    fn test_every_printable_ascii_resolves_to_a_known_key() {
        // Arrange
        let printable = (0x20u8..0x7f).map(char::from);

        // Act / Assert
        for c in printable {
            let (name, _) = char_to_key(c).unwrap_or_else(|| panic!("{c:?} unmapped"));
            assert!(key_code(name).is_some(), "{name} missing from key table");
        }
        assert!(key_code(SHIFT_KEY).is_some());
    }
}
