use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use nala_core::{ClaudeClient, OpenAIClient, Provider};
use ratatui::layout::Rect;
use tracing::warn;

use crate::app::{App, FocusPane, InputMode};
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
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => app.scroll_chat_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    // Intro popup must be acknowledged first
    if app.show_intro {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.show_intro = false;
        }
        return Ok(());
    }

    if app.show_api_key_input {
        handle_api_key_input(app, key);
        return Ok(());
    }

    if app.show_provider_picker {
        handle_provider_picker(app, key).await;
        return Ok(());
    }

    if app.show_model_picker {
        match key.code {
            KeyCode::Esc => app.show_model_picker = false,
            KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
            KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
            KeyCode::Enter => app.select_model(),
            _ => {}
        }
        return Ok(());
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key).await,
        InputMode::Editing => handle_editing_mode(app, key),
    }

    Ok(())
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => close_api_key_input(app),
        KeyCode::Enter => {
            let entered = app.api_key_input.trim().to_string();
            if !entered.is_empty() {
                if let Some(provider) = app.api_key_target_provider {
                    app.save_api_key(provider, &entered);
                }
            }
            close_api_key_input(app);
        }
        KeyCode::Backspace => {
            if app.api_key_input_cursor > 0 {
                app.api_key_input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.api_key_input, app.api_key_input_cursor);
                app.api_key_input.remove(byte_pos);
            }
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.api_key_input, app.api_key_input_cursor);
            app.api_key_input.insert(byte_pos, c);
            app.api_key_input_cursor += 1;
        }
        KeyCode::Left => {
            app.api_key_input_cursor = app.api_key_input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.api_key_input.chars().count();
            app.api_key_input_cursor = (app.api_key_input_cursor + 1).min(char_count);
        }
        _ => {}
    }
}

fn close_api_key_input(app: &mut App) {
    app.show_api_key_input = false;
    app.api_key_input.clear();
    app.api_key_input_cursor = 0;
    app.api_key_target_provider = None;
}

async fn handle_provider_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_provider_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.provider_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.provider_picker_nav_up(),
        KeyCode::Enter => {
            let chosen = app
                .provider_picker_state
                .selected()
                .and_then(|i| Provider::all().get(i).copied());

            if let Some(provider) = chosen {
                if app.get_key_source(provider).is_none() {
                    // Ask for a key before switching
                    app.api_key_target_provider = Some(provider);
                    app.show_api_key_input = true;
                    app.api_key_input.clear();
                    app.api_key_input_cursor = 0;
                } else {
                    let first_model = match provider {
                        Provider::Ollama => match app.ollama.list_models().await {
                            Ok(models) => models.into_iter().next(),
                            Err(err) => {
                                warn!(error = %err, "could not list Ollama models");
                                None
                            }
                        },
                        _ => app.get_models_for_provider(provider).into_iter().next(),
                    };
                    app.set_provider(provider, first_model);
                }
            }
            app.show_provider_picker = false;
        }
        _ => {}
    }
}

async fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Start typing
        KeyCode::Char('i') | KeyCode::Char('/') => focus_input(app),

        KeyCode::Esc => app.focus = FocusPane::Chat,

        // Tab cycles: Chat -> Terms -> Input -> Chat
        KeyCode::Tab => match app.focus {
            FocusPane::Chat => app.focus = FocusPane::Terms,
            FocusPane::Terms => focus_input(app),
            FocusPane::Input => app.focus = FocusPane::Chat,
        },

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::Terms => app.terms_nav_down(),
            _ => app.chat_scroll = app.chat_scroll.saturating_add(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::Terms => app.terms_nav_up(),
            _ => app.chat_scroll = app.chat_scroll.saturating_sub(1),
        },

        // Half-page scroll
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half = (app.chat_height / 2).max(1);
            app.chat_scroll = app.chat_scroll.saturating_add(half);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half = (app.chat_height / 2).max(1);
            app.chat_scroll = app.chat_scroll.saturating_sub(half);
        }

        KeyCode::Char('g') => app.chat_scroll = 0,
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),

        KeyCode::Char('e') => app.export_transcript(),

        // Open model picker
        KeyCode::Char('M') => {
            let models = match app.current_provider {
                Provider::Ollama => match app.ollama.list_models().await {
                    Ok(models) => models,
                    Err(err) => {
                        app.status = Some(err.to_string());
                        Vec::new()
                    }
                },
                Provider::Claude => ClaudeClient::list_models(),
                Provider::OpenAI => OpenAIClient::list_models(),
            };
            app.available_models = models;
            if !app.available_models.is_empty() {
                // Select current model if in list, otherwise first
                let current_idx = app
                    .available_models
                    .iter()
                    .position(|m| m == &app.selected_model)
                    .unwrap_or(0);
                app.model_picker_state.select(Some(current_idx));
                app.show_model_picker = true;
            }
        }

        // Open provider picker
        KeyCode::Char('P') => {
            let current_idx = Provider::all()
                .iter()
                .position(|p| *p == app.current_provider)
                .unwrap_or(0);
            app.provider_picker_state.select(Some(current_idx));
            app.show_provider_picker = true;
        }

        _ => {}
    }
}

fn focus_input(app: &mut App) {
    app.focus = FocusPane::Input;
    app.input_mode = InputMode::Editing;
    // Cursor at end of existing text
    app.query_cursor = app.query_input.chars().count();
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Chat;
        }
        KeyCode::Enter => app.start_turn(),
        KeyCode::Backspace => {
            if app.query_cursor > 0 {
                app.query_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.query_input.chars().count();
            if app.query_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.query_cursor = app.query_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.query_input.chars().count();
            app.query_cursor = (app.query_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.query_cursor = 0;
        }
        KeyCode::End => {
            app.query_cursor = app.query_input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
            app.query_input.insert(byte_pos, c);
            app.query_cursor += 1;
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    // Single-line inputs only
    let text: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    if app.show_api_key_input {
        let trimmed = text.trim();
        let byte_pos = char_to_byte_index(&app.api_key_input, app.api_key_input_cursor);
        app.api_key_input.insert_str(byte_pos, trimmed);
        app.api_key_input_cursor += trimmed.chars().count();
    } else if app.input_mode == InputMode::Editing {
        let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
        app.query_input.insert_str(byte_pos, &text);
        app.query_cursor += text.chars().count();
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_terms = app.terms_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_add(3);
            } else if in_terms {
                app.terms_nav_down();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.chat_scroll = app.chat_scroll.saturating_sub(3);
            } else if in_terms {
                app.terms_nav_up();
            }
        }
        MouseEventKind::Down(_) => {
            if in_chat {
                app.focus = FocusPane::Chat;
                app.input_mode = InputMode::Normal;
            } else if in_terms {
                app.focus = FocusPane::Terms;
                app.input_mode = InputMode::Normal;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nala_core::{Config, Glossary};

    fn test_app() -> App {
        let mut config = Config::new();
        config.provider = Some("ollama".to_string());
        App::new(config, Glossary::builtin(true))
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[test]
    fn test_char_to_byte_index_multibyte() {
        assert_eq!(char_to_byte_index("café!", 4), 5);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[tokio::test]
    async fn test_intro_swallows_keys_until_dismissed() {
        let mut app = test_app();
        type_text(&mut app, "hi").await;
        assert!(app.query_input.is_empty());

        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(!app.show_intro);

        type_text(&mut app, "hi").await;
        assert_eq!(app.query_input, "hi");
    }

    #[tokio::test]
    async fn test_editing_respects_cursor() {
        let mut app = test_app();
        app.show_intro = false;

        type_text(&mut app, "bnd").await;
        handle_event(&mut app, key(KeyCode::Left)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Left)).await.unwrap();
        type_text(&mut app, "o").await;
        assert_eq!(app.query_input, "bond");

        handle_event(&mut app, key(KeyCode::End)).await.unwrap();
        handle_event(&mut app, key(KeyCode::Backspace)).await.unwrap();
        assert_eq!(app.query_input, "bon");
        assert_eq!(app.query_cursor, 3);
    }

    #[tokio::test]
    async fn test_tab_cycles_focus() {
        let mut app = test_app();
        app.show_intro = false;
        assert_eq!(app.focus, FocusPane::Input);

        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, FocusPane::Chat);
        assert_eq!(app.input_mode, InputMode::Normal);

        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, FocusPane::Terms);

        handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, FocusPane::Input);
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_anywhere() {
        let mut app = test_app();
        let ctrl_c = AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        handle_event(&mut app, ctrl_c).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_paste_flattens_newlines() {
        let mut app = test_app();
        app.show_intro = false;
        handle_event(&mut app, AppEvent::Paste("what is\na bond?".to_string()))
            .await
            .unwrap();
        assert_eq!(app.query_input, "what is a bond?");
        assert_eq!(app.query_cursor, 15);
    }

    #[tokio::test]
    async fn test_paste_goes_to_api_key_popup() {
        let mut app = test_app();
        app.show_intro = false;
        app.show_api_key_input = true;
        app.api_key_target_provider = Some(Provider::OpenAI);

        handle_event(&mut app, AppEvent::Paste(" sk-test-123\n".to_string()))
            .await
            .unwrap();
        assert_eq!(app.api_key_input, "sk-test-123");
        assert!(app.query_input.is_empty());

        handle_event(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert!(!app.show_api_key_input);
        assert!(app.api_key_input.is_empty());
    }

    #[tokio::test]
    async fn test_provider_picker_asks_for_missing_key() {
        let mut app = test_app();
        app.show_intro = false;
        app.claude_client = None;
        if std::env::var("ANTHROPIC_API_KEY").is_ok() {
            return;
        }

        app.input_mode = InputMode::Normal;
        handle_event(&mut app, key(KeyCode::Char('P'))).await.unwrap();
        assert!(app.show_provider_picker);

        let claude_idx = Provider::all().iter().position(|p| *p == Provider::Claude).unwrap();
        app.provider_picker_state.select(Some(claude_idx));
        handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

        assert!(!app.show_provider_picker);
        assert!(app.show_api_key_input);
        assert_eq!(app.api_key_target_provider, Some(Provider::Claude));
        assert_eq!(app.current_provider, Provider::Ollama);
    }
}
