//! Host input events routed to devices.
//!
//! Key events use USB HID usage IDs as scancodes (the numbering SDL and most
//! host toolkits share), so keyboard-matrix devices can translate them to
//! their own row/column layout.

/// USB HID keyboard usage ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scancode(pub u16);

impl Scancode {
    pub const A: Scancode = Scancode(4);
    pub const NUM_1: Scancode = Scancode(30);
    pub const NUM_0: Scancode = Scancode(39);
    pub const RETURN: Scancode = Scancode(40);
    pub const ESCAPE: Scancode = Scancode(41);
    pub const BACKSPACE: Scancode = Scancode(42);
    pub const TAB: Scancode = Scancode(43);
    pub const SPACE: Scancode = Scancode(44);
    pub const MINUS: Scancode = Scancode(45);
    pub const EQUALS: Scancode = Scancode(46);
    pub const LEFT_BRACKET: Scancode = Scancode(47);
    pub const RIGHT_BRACKET: Scancode = Scancode(48);
    pub const BACKSLASH: Scancode = Scancode(49);
    pub const SEMICOLON: Scancode = Scancode(51);
    pub const APOSTROPHE: Scancode = Scancode(52);
    pub const GRAVE: Scancode = Scancode(53);
    pub const COMMA: Scancode = Scancode(54);
    pub const PERIOD: Scancode = Scancode(55);
    pub const SLASH: Scancode = Scancode(56);
    pub const LEFT_CTRL: Scancode = Scancode(224);
    pub const LEFT_SHIFT: Scancode = Scancode(225);
    pub const RIGHT_CTRL: Scancode = Scancode(228);

    /// Scancode of letter key `c` (`a`..=`z`, case-insensitive).
    pub fn letter(c: u8) -> Option<Scancode> {
        let lower = c.to_ascii_lowercase();
        lower
            .is_ascii_lowercase()
            .then(|| Scancode(Self::A.0 + (lower - b'a') as u16))
    }

    /// Scancode of the top-row digit key `c` (`0`..=`9`).
    pub fn digit(c: u8) -> Option<Scancode> {
        match c {
            b'0' => Some(Self::NUM_0),
            b'1'..=b'9' => Some(Scancode(Self::NUM_1.0 + (c - b'1') as u16)),
            _ => None,
        }
    }
}

/// Direction of a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTransition {
    Down,
    Up,
}

/// A single key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub transition: KeyTransition,
    pub scancode: Scancode,
}

impl KeyEvent {
    pub fn down(scancode: Scancode) -> Self {
        Self {
            transition: KeyTransition::Down,
            scancode,
        }
    }

    pub fn up(scancode: Scancode) -> Self {
        Self {
            transition: KeyTransition::Up,
            scancode,
        }
    }
}

/// Host input delivered to every device's `event` hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    /// Vertical mouse wheel movement, positive away from the user.
    MouseWheel(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_scancodes() {
        assert_eq!(Scancode::letter(b'a'), Some(Scancode(4)));
        assert_eq!(Scancode::letter(b'Z'), Some(Scancode(29)));
        assert_eq!(Scancode::letter(b'1'), None);
    }

    #[test]
    fn test_digit_scancodes() {
        assert_eq!(Scancode::digit(b'1'), Some(Scancode(30)));
        assert_eq!(Scancode::digit(b'9'), Some(Scancode(38)));
        assert_eq!(Scancode::digit(b'0'), Some(Scancode::NUM_0));
        assert_eq!(Scancode::digit(b'x'), None);
    }
}
