use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::input::InputKey;

/// Translate a crossterm `KeyEvent` into an input-line key.
///
/// Returns None if the key isn't meant for the input line.
#[must_use]
pub fn translate_key_event(key: &KeyEvent) -> Option<InputKey> {
    let modified = key
        .modifiers
        .intersects(KeyModifiers::SHIFT | KeyModifiers::CONTROL | KeyModifiers::ALT);
    match key.code {
        KeyCode::Char(c) => {
            if key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
            {
                None
            } else {
                Some(InputKey::Char(c))
            }
        }
        KeyCode::Enter => Some(InputKey::Submit { modified }),
        KeyCode::Backspace => Some(InputKey::Backspace),
        KeyCode::Delete => Some(InputKey::Delete),
        KeyCode::Up => Some(InputKey::Up),
        KeyCode::Down => Some(InputKey::Down),
        KeyCode::Left => Some(InputKey::Left),
        KeyCode::Right => Some(InputKey::Right),
        KeyCode::Home => Some(InputKey::Home),
        KeyCode::End => Some(InputKey::End),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_enter_submits() {
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(
            translate_key_event(&key),
            Some(InputKey::Submit { modified: false })
        );
    }

    #[test]
    fn test_shift_enter_is_modified() {
        let key = KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT);
        assert_eq!(
            translate_key_event(&key),
            Some(InputKey::Submit { modified: true })
        );
    }

    #[test]
    fn test_shifted_chars_are_typed() {
        let key = KeyEvent::new(KeyCode::Char('A'), KeyModifiers::SHIFT);
        assert_eq!(translate_key_event(&key), Some(InputKey::Char('A')));
        let ctrl = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL);
        assert_eq!(translate_key_event(&ctrl), None);
    }
}
