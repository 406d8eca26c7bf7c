//! Input event identifiers and descriptor parsing
//!
//! Descriptors follow the kernel input-event names: `"KEY_Z"`,
//! `"BTN_SOUTH"`, `"ABS_RZ"`. A single character stands for a terminal
//! key, and the numeric escapes `"key:44"` / `"axis:5"` address codes the
//! name tables do not cover. Matching is case-insensitive.

use std::fmt;

use crate::ParseError;

/// Identifier of one physical control on an input device
///
/// Value equality; used as the keymap lookup key. Device scoping is
/// positional: every configured input owns its own keymap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEventId {
    /// EV_KEY code (KEY_* / BTN_*)
    Key(u16),
    /// EV_ABS code (ABS_*)
    Axis(u16),
    /// Terminal character
    Char(char),
}

impl InputEventId {
    /// Resolve a descriptor string
    pub fn parse(descriptor: &str) -> Result<Self, ParseError> {
        let mut chars = descriptor.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(InputEventId::Char(c));
        }
        if let Some(code) = descriptor.strip_prefix("key:") {
            return parse_code(code, descriptor).map(InputEventId::Key);
        }
        if let Some(code) = descriptor.strip_prefix("axis:") {
            return parse_code(code, descriptor).map(InputEventId::Axis);
        }
        if let Some(code) = lookup_code(KEY_NAMES, descriptor) {
            return Ok(InputEventId::Key(code));
        }
        if let Some(code) = lookup_code(AXIS_NAMES, descriptor) {
            return Ok(InputEventId::Axis(code));
        }
        Err(ParseError::UnknownEvent(descriptor.to_string()))
    }
}

impl fmt::Display for InputEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            InputEventId::Key(code) => match lookup_name(KEY_NAMES, code) {
                Some(name) => f.write_str(name),
                None => write!(f, "key:{code}"),
            },
            InputEventId::Axis(code) => match lookup_name(AXIS_NAMES, code) {
                Some(name) => f.write_str(name),
                None => write!(f, "axis:{code}"),
            },
            InputEventId::Char(c) => write!(f, "{c:?}"),
        }
    }
}

fn parse_code(text: &str, descriptor: &str) -> Result<u16, ParseError> {
    text.parse::<u16>()
        .map_err(|_| ParseError::UnknownEvent(descriptor.to_string()))
}

fn lookup_code(table: &[(&str, u16)], name: &str) -> Option<u16> {
    table
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, code)| code)
}

fn lookup_name(table: &'static [(&'static str, u16)], code: u16) -> Option<&'static str> {
    // Canonical names come first in the tables, so the first hit wins.
    table
        .iter()
        .find(|&&(_, c)| c == code)
        .map(|&(name, _)| name)
}

/// Kernel EV_KEY codes (input-event-codes.h). Aliases follow their
/// canonical name.
const KEY_NAMES: &[(&str, u16)] = &[
    ("KEY_ESC", 1),
    ("KEY_1", 2),
    ("KEY_2", 3),
    ("KEY_3", 4),
    ("KEY_4", 5),
    ("KEY_5", 6),
    ("KEY_6", 7),
    ("KEY_7", 8),
    ("KEY_8", 9),
    ("KEY_9", 10),
    ("KEY_0", 11),
    ("KEY_MINUS", 12),
    ("KEY_EQUAL", 13),
    ("KEY_BACKSPACE", 14),
    ("KEY_TAB", 15),
    ("KEY_Q", 16),
    ("KEY_W", 17),
    ("KEY_E", 18),
    ("KEY_R", 19),
    ("KEY_T", 20),
    ("KEY_Y", 21),
    ("KEY_U", 22),
    ("KEY_I", 23),
    ("KEY_O", 24),
    ("KEY_P", 25),
    ("KEY_LEFTBRACE", 26),
    ("KEY_RIGHTBRACE", 27),
    ("KEY_ENTER", 28),
    ("KEY_LEFTCTRL", 29),
    ("KEY_A", 30),
    ("KEY_S", 31),
    ("KEY_D", 32),
    ("KEY_F", 33),
    ("KEY_G", 34),
    ("KEY_H", 35),
    ("KEY_J", 36),
    ("KEY_K", 37),
    ("KEY_L", 38),
    ("KEY_SEMICOLON", 39),
    ("KEY_APOSTROPHE", 40),
    ("KEY_GRAVE", 41),
    ("KEY_LEFTSHIFT", 42),
    ("KEY_BACKSLASH", 43),
    ("KEY_Z", 44),
    ("KEY_X", 45),
    ("KEY_C", 46),
    ("KEY_V", 47),
    ("KEY_B", 48),
    ("KEY_N", 49),
    ("KEY_M", 50),
    ("KEY_COMMA", 51),
    ("KEY_DOT", 52),
    ("KEY_SLASH", 53),
    ("KEY_RIGHTSHIFT", 54),
    ("KEY_KPASTERISK", 55),
    ("KEY_LEFTALT", 56),
    ("KEY_SPACE", 57),
    ("KEY_CAPSLOCK", 58),
    ("KEY_F1", 59),
    ("KEY_F2", 60),
    ("KEY_F3", 61),
    ("KEY_F4", 62),
    ("KEY_F5", 63),
    ("KEY_F6", 64),
    ("KEY_F7", 65),
    ("KEY_F8", 66),
    ("KEY_F9", 67),
    ("KEY_F10", 68),
    ("KEY_NUMLOCK", 69),
    ("KEY_SCROLLLOCK", 70),
    ("KEY_KP7", 71),
    ("KEY_KP8", 72),
    ("KEY_KP9", 73),
    ("KEY_KPMINUS", 74),
    ("KEY_KP4", 75),
    ("KEY_KP5", 76),
    ("KEY_KP6", 77),
    ("KEY_KPPLUS", 78),
    ("KEY_KP1", 79),
    ("KEY_KP2", 80),
    ("KEY_KP3", 81),
    ("KEY_KP0", 82),
    ("KEY_KPDOT", 83),
    ("KEY_F11", 87),
    ("KEY_F12", 88),
    ("KEY_KPENTER", 96),
    ("KEY_RIGHTCTRL", 97),
    ("KEY_KPSLASH", 98),
    ("KEY_SYSRQ", 99),
    ("KEY_RIGHTALT", 100),
    ("KEY_HOME", 102),
    ("KEY_UP", 103),
    ("KEY_PAGEUP", 104),
    ("KEY_LEFT", 105),
    ("KEY_RIGHT", 106),
    ("KEY_END", 107),
    ("KEY_DOWN", 108),
    ("KEY_PAGEDOWN", 109),
    ("KEY_INSERT", 110),
    ("KEY_DELETE", 111),
    ("KEY_KPEQUAL", 117),
    ("KEY_LEFTMETA", 125),
    ("KEY_RIGHTMETA", 126),
    ("KEY_COMPOSE", 127),
    // Mouse buttons
    ("BTN_LEFT", 0x110),
    ("BTN_RIGHT", 0x111),
    ("BTN_MIDDLE", 0x112),
    ("BTN_SIDE", 0x113),
    ("BTN_EXTRA", 0x114),
    // Joystick buttons
    ("BTN_TRIGGER", 0x120),
    ("BTN_THUMB", 0x121),
    ("BTN_THUMB2", 0x122),
    ("BTN_TOP", 0x123),
    ("BTN_TOP2", 0x124),
    ("BTN_PINKIE", 0x125),
    ("BTN_BASE", 0x126),
    ("BTN_BASE2", 0x127),
    ("BTN_BASE3", 0x128),
    ("BTN_BASE4", 0x129),
    ("BTN_BASE5", 0x12A),
    ("BTN_BASE6", 0x12B),
    // Gamepad buttons
    ("BTN_SOUTH", 0x130),
    ("BTN_A", 0x130),
    ("BTN_EAST", 0x131),
    ("BTN_B", 0x131),
    ("BTN_C", 0x132),
    ("BTN_NORTH", 0x133),
    ("BTN_X", 0x133),
    ("BTN_WEST", 0x134),
    ("BTN_Y", 0x134),
    ("BTN_Z", 0x135),
    ("BTN_TL", 0x136),
    ("BTN_TR", 0x137),
    ("BTN_TL2", 0x138),
    ("BTN_TR2", 0x139),
    ("BTN_SELECT", 0x13A),
    ("BTN_START", 0x13B),
    ("BTN_MODE", 0x13C),
    ("BTN_THUMBL", 0x13D),
    ("BTN_THUMBR", 0x13E),
    ("BTN_DPAD_UP", 0x220),
    ("BTN_DPAD_DOWN", 0x221),
    ("BTN_DPAD_LEFT", 0x222),
    ("BTN_DPAD_RIGHT", 0x223),
];

/// Kernel EV_ABS codes
const AXIS_NAMES: &[(&str, u16)] = &[
    ("ABS_X", 0),
    ("ABS_Y", 1),
    ("ABS_Z", 2),
    ("ABS_RX", 3),
    ("ABS_RY", 4),
    ("ABS_RZ", 5),
    ("ABS_THROTTLE", 6),
    ("ABS_RUDDER", 7),
    ("ABS_WHEEL", 8),
    ("ABS_GAS", 9),
    ("ABS_BRAKE", 10),
    ("ABS_HAT0X", 16),
    ("ABS_HAT0Y", 17),
    ("ABS_HAT1X", 18),
    ("ABS_HAT1Y", 19),
    ("ABS_HAT2X", 20),
    ("ABS_HAT2Y", 21),
    ("ABS_HAT3X", 22),
    ("ABS_HAT3Y", 23),
    ("ABS_PRESSURE", 24),
    ("ABS_DISTANCE", 25),
    ("ABS_TILT_X", 26),
    ("ABS_TILT_Y", 27),
    ("ABS_TOOL_WIDTH", 28),
    ("ABS_VOLUME", 32),
    ("ABS_MISC", 40),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_key_name() {
        assert_eq!(InputEventId::parse("KEY_Z").unwrap(), InputEventId::Key(44));
    }

    #[test]
    fn parse_button_name() {
        assert_eq!(
            InputEventId::parse("BTN_SOUTH").unwrap(),
            InputEventId::Key(0x130)
        );
    }

    #[test]
    fn parse_button_alias() {
        assert_eq!(
            InputEventId::parse("BTN_A").unwrap(),
            InputEventId::parse("BTN_SOUTH").unwrap()
        );
    }

    #[test]
    fn parse_axis_name() {
        assert_eq!(
            InputEventId::parse("ABS_RZ").unwrap(),
            InputEventId::Axis(5)
        );
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(
            InputEventId::parse("key_space").unwrap(),
            InputEventId::Key(57)
        );
    }

    #[test]
    fn parse_single_char() {
        assert_eq!(InputEventId::parse("a").unwrap(), InputEventId::Char('a'));
    }

    #[test]
    fn parse_numeric_escapes() {
        assert_eq!(
            InputEventId::parse("key:705").unwrap(),
            InputEventId::Key(705)
        );
        assert_eq!(
            InputEventId::parse("axis:41").unwrap(),
            InputEventId::Axis(41)
        );
    }

    #[test]
    fn parse_unknown_fails() {
        assert!(matches!(
            InputEventId::parse("KEY_NO_SUCH_THING"),
            Err(ParseError::UnknownEvent(_))
        ));
        assert!(matches!(
            InputEventId::parse("key:not-a-number"),
            Err(ParseError::UnknownEvent(_))
        ));
    }

    #[test]
    fn display_prefers_canonical_name() {
        assert_eq!(InputEventId::Key(0x130).to_string(), "BTN_SOUTH");
        assert_eq!(InputEventId::Axis(5).to_string(), "ABS_RZ");
    }

    #[test]
    fn display_falls_back_to_numeric() {
        assert_eq!(InputEventId::Key(705).to_string(), "key:705");
        assert_eq!(InputEventId::Axis(63).to_string(), "axis:63");
    }
}
