//! Key bindings: arrows and vim-style hjkl.

use crate::game::Command;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Piece(Command),
    /// Start from idle, or restart after game over.
    Confirm,
    /// Abandon the round and return to the title.
    EndGame,
    ToggleMusic,
    Quit,
    None,
}

/// Map key event to game action.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Left | KeyCode::Char('h') => Action::Piece(Command::MoveLeft),
        KeyCode::Right | KeyCode::Char('l') => Action::Piece(Command::MoveRight),
        KeyCode::Down | KeyCode::Char('j') => Action::Piece(Command::SoftDrop),
        KeyCode::Up | KeyCode::Char('k') => Action::Piece(Command::Rotate),
        KeyCode::Enter | KeyCode::Char(' ') => Action::Confirm,
        KeyCode::Char('e') => Action::EndGame,
        KeyCode::Char('m') => Action::ToggleMusic,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_and_vim_keys_agree() {
        let pairs = [
            (KeyCode::Left, KeyCode::Char('h')),
            (KeyCode::Right, KeyCode::Char('l')),
            (KeyCode::Down, KeyCode::Char('j')),
            (KeyCode::Up, KeyCode::Char('k')),
        ];
        for (arrow, vim) in pairs {
            assert_eq!(key_to_action(press(arrow)), key_to_action(press(vim)));
            assert!(matches!(key_to_action(press(arrow)), Action::Piece(_)));
        }
    }

    #[test]
    fn up_rotates() {
        assert_eq!(key_to_action(press(KeyCode::Up)), Action::Piece(Command::Rotate));
    }

    #[test]
    fn lifecycle_keys() {
        assert_eq!(key_to_action(press(KeyCode::Enter)), Action::Confirm);
        assert_eq!(key_to_action(press(KeyCode::Char(' '))), Action::Confirm);
        assert_eq!(key_to_action(press(KeyCode::Char('e'))), Action::EndGame);
        assert_eq!(key_to_action(press(KeyCode::Char('m'))), Action::ToggleMusic);
        assert_eq!(key_to_action(press(KeyCode::Esc)), Action::Quit);
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }

    #[test]
    fn modified_keys_are_ignored() {
        assert_eq!(
            key_to_action(KeyEvent::new(KeyCode::Left, KeyModifiers::ALT)),
            Action::None
        );
        assert_eq!(key_to_action(press(KeyCode::Char('x'))), Action::None);
    }
}
