//! Touchscreen discovery from `/proc/bus/input/devices`.
//!
//! # The listing format (for beginners)
//!
//! The kernel prints one block per input device, separated by blank lines:
//!
//! ```text
//! I: Bus=0018 Vendor=0000 Product=0000 Version=0000
//! N: Name="FT5406 memory based driver"
//! H: Handlers=event0
//! B: PROP=2
//! B: EV=b
//! B: ABS=2608000 3
//! ```
//!
//! `B:` lines are capability bitmaps printed as hex words, most significant
//! word first, with leading zero words omitted.  Each word is one C `long`,
//! so the width depends on the kernel: the `ABS` line above comes from a
//! 32-bit kernel, where `2608000` is the word holding bits 32..63.  Bit 53
//! (`ABS_MT_POSITION_X`) is bit 21 of that word.
//!
//! The width is read off the listing rather than the engine's own pointer
//! size: a 32-bit engine may run under a 64-bit kernel.  A 64-bit kernel
//! prints full words with up to 16 digits, a 32-bit one never more than 8.
//!
//! A device is a usable touchscreen when it has the `INPUT_PROP_DIRECT`
//! property (its coordinates are screen coordinates) and reports
//! `ABS_MT_POSITION_X` (it speaks the multi-touch protocol).

use touch_core::domain::events::{ABS_MT_POSITION_X, INPUT_PROP_DIRECT};

/// Where the kernel lists input devices.
pub const PROC_INPUT_DEVICES: &str = "/proc/bus/input/devices";

/// Devices whose name starts with this were created by this engine.
pub const OWN_DEVICE_PREFIX: &str = "remotetouch";

/// A capability bitmap from one `B:` line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitmap {
    /// Words, least significant first.
    words: Vec<u64>,
    word_bits: u32,
}

impl Bitmap {
    /// Parses the value of a `B:` line (e.g. `"2608000 3"`).
    pub fn parse(value: &str, word_bits: u32) -> Self {
        let words = value
            .split_whitespace()
            .rev()
            .map(|w| u64::from_str_radix(w, 16).unwrap_or(0))
            .collect();
        Self { words, word_bits }
    }

    pub fn has(&self, bit: u16) -> bool {
        if self.word_bits == 0 {
            return false;
        }
        let bit = u32::from(bit);
        let word = (bit / self.word_bits) as usize;
        let offset = bit % self.word_bits;
        self.words
            .get(word)
            .map_or(false, |w| (w >> offset) & 1 == 1)
    }
}

/// One block of the listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDeviceInfo {
    pub name: String,
    pub handlers: Vec<String>,
    pub props: Bitmap,
    pub abs: Bitmap,
}

impl InputDeviceInfo {
    /// `/dev/input/eventN` for this device, if it has an event handler.
    pub fn event_node(&self) -> Option<String> {
        self.handlers
            .iter()
            .find(|h| h.starts_with("event"))
            .map(|h| format!("/dev/input/{h}"))
    }

    pub fn is_direct_multitouch(&self) -> bool {
        self.props.has(INPUT_PROP_DIRECT) && self.abs.has(ABS_MT_POSITION_X)
    }

    /// Whether this engine created the device (never drive our own output).
    pub fn is_own_device(&self) -> bool {
        self.name
            .to_ascii_lowercase()
            .starts_with(OWN_DEVICE_PREFIX)
    }
}

/// Parses the listing using the word width of the kernel that printed it.
pub fn parse_devices(listing: &str) -> Vec<InputDeviceInfo> {
    parse_devices_with_word_bits(listing, listing_word_bits(listing))
}

/// Bitmap word width of the kernel that printed `listing`.
///
/// 64 when any `B:` word is longer than 8 hex digits, otherwise 32.  With
/// only short words the `PROP` and `ABS` bitmaps fit in one word, where both
/// widths read the same bits.
pub fn listing_word_bits(listing: &str) -> u32 {
    let wide = listing
        .lines()
        .filter_map(|line| line.trim_end().strip_prefix("B: "))
        .filter_map(|line| line.split_once('=').map(|(_, value)| value))
        .flat_map(str::split_whitespace)
        .any(|word| word.len() > 8);
    if wide {
        64
    } else {
        32
    }
}

/// Parses the listing assuming `word_bits`-wide bitmap words.
pub fn parse_devices_with_word_bits(listing: &str, word_bits: u32) -> Vec<InputDeviceInfo> {
    let mut devices = Vec::new();
    let mut current: Option<InputDeviceInfo> = None;

    for line in listing.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            devices.extend(current.take());
            continue;
        }
        let dev = current.get_or_insert_with(InputDeviceInfo::default);

        if let Some(rest) = line.strip_prefix("N: Name=") {
            dev.name = rest.trim_matches('"').to_string();
        } else if let Some(rest) = line.strip_prefix("H: Handlers=") {
            dev.handlers = rest.split_whitespace().map(str::to_string).collect();
        } else if let Some(rest) = line.strip_prefix("B: PROP=") {
            dev.props = Bitmap::parse(rest, word_bits);
        } else if let Some(rest) = line.strip_prefix("B: ABS=") {
            dev.abs = Bitmap::parse(rest, word_bits);
        }
    }
    devices.extend(current);
    devices
}

/// The first direct multi-touch device not created by this engine.
pub fn find_touchscreen(devices: &[InputDeviceInfo]) -> Option<&InputDeviceInfo> {
    devices.iter().find(|d| {
        d.is_direct_multitouch() && !d.is_own_device() && d.event_node().is_some()
    })
}
