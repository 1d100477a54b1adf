use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_query_task().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Works in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_key(app, key),
        InputMode::Editing => handle_editing_key(app, key),
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(),
        KeyCode::Char('G') | KeyCode::End => app.scroll_chat_to_bottom(),
        KeyCode::Char('g') | KeyCode::Home => app.chat_scroll = 0,
        _ => {}
    }
}

fn handle_editing_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            // No-op while blank or while a reply is pending; the input
            // stays editable either way.
            app.submit_query();
        }
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.cursor = app.cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.cursor = (app.cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.cursor = 0;
        }
        KeyCode::End => {
            app.cursor = app.input.chars().count();
        }
        KeyCode::Up | KeyCode::PageUp => app.scroll_up(),
        KeyCode::Down | KeyCode::PageDown => app.scroll_down(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::RagClient;

    fn test_app() -> App {
        let client = RagClient::new("http://127.0.0.1:1", "test-token").unwrap();
        App::new(client, "test".to_string())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        let s = "día";
        assert_eq!(char_to_byte_index(s, 0), 0);
        assert_eq!(char_to_byte_index(s, 1), 1);
        assert_eq!(char_to_byte_index(s, 2), 3); // 'í' is two bytes
        assert_eq!(char_to_byte_index(s, 3), 4);
        assert_eq!(char_to_byte_index(s, 10), 4); // past the end clamps
    }

    #[test]
    fn test_typing_inserts_at_cursor() {
        let mut app = test_app();

        for c in "hola".chars() {
            handle_editing_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_editing_key(&mut app, press(KeyCode::Left));
        handle_editing_key(&mut app, press(KeyCode::Left));
        handle_editing_key(&mut app, press(KeyCode::Char('í')));

        assert_eq!(app.input, "hoíla");
        assert_eq!(app.cursor, 3);
    }

    #[test]
    fn test_backspace_removes_multibyte_char() {
        let mut app = test_app();
        app.input = "día".to_string();
        app.cursor = 2;

        handle_editing_key(&mut app, press(KeyCode::Backspace));

        assert_eq!(app.input, "da");
        assert_eq!(app.cursor, 1);
    }

    #[tokio::test]
    async fn test_enter_with_blank_input_does_nothing() {
        let mut app = test_app();
        app.input = "   ".to_string();
        app.cursor = 3;

        handle_editing_key(&mut app, press(KeyCode::Enter));

        assert!(app.conversation.messages().is_empty());
        assert!(app.query_task.is_none());
    }

    #[tokio::test]
    async fn test_enter_submits_once_while_pending() {
        let mut app = test_app();
        app.input = "first".to_string();
        app.cursor = 5;

        handle_editing_key(&mut app, press(KeyCode::Enter));

        assert_eq!(app.conversation.messages().len(), 1);
        assert!(app.conversation.awaiting_reply());
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);

        // A second submit while the reply is pending is rejected.
        app.input = "second".to_string();
        app.cursor = 6;
        handle_editing_key(&mut app, press(KeyCode::Enter));

        assert_eq!(app.conversation.messages().len(), 1);
        assert_eq!(app.input, "second");

        app.query_task.take().unwrap().abort();
    }
}
