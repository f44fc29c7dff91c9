use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{error, warn};

use crate::app::{App, InputMode, PendingSubmit, PromptKind, Screen};
use crate::tui::AppEvent;
use seimoney_core::{AgentRequest, Attachment, SendError, SendOutcome};

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
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
    }
    poll_send_task(app).await;
    Ok(())
}

/// Collect the result of a finished send, if any
pub async fn poll_send_task(app: &mut App) {
    app.sync_conversation();

    if !app.send_task.as_ref().is_some_and(|task| task.is_finished()) {
        return;
    }
    let Some(task) = app.send_task.take() else {
        return;
    };

    match task.await {
        Ok(Ok(_)) => app.pending_submit = None,
        Ok(Err(e)) => match e.downcast_ref::<SendError>() {
            // Shown inline from the conversation notice
            Some(SendError::Agent(_)) => app.pending_submit = None,
            // Nothing was recorded (unreadable attachment, busy); give the message back
            _ => {
                warn!(error = %e, "message not sent");
                app.toast = Some(e.to_string());
                app.restore_pending_submit();
            }
        },
        Err(e) => {
            error!(error = %e, "send task failed");
            app.toast = Some("Sending failed unexpectedly".to_string());
            app.restore_pending_submit();
        }
    }
    app.sync_conversation();
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Any key dismisses the status toast
    app.toast = None;

    if app.prompt.is_some() {
        handle_prompt(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    if app.show_suggestions {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => app.suggestion_nav_down(),
            KeyCode::Char('k') | KeyCode::Up => app.suggestion_nav_up(),
            KeyCode::Enter => app.apply_suggestion(),
            KeyCode::Esc | KeyCode::Char('s') => app.show_suggestions = false,
            _ => {}
        }
        return;
    }

    match key.code {
        // Quit
        KeyCode::Char('q') => app.should_quit = true,

        // Compose
        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('s') => app.toggle_suggestions(),
        KeyCode::Char('f') if !app.is_busy() => app.open_prompt(PromptKind::File),
        KeyCode::Char('F') => app.remove_file(),

        // Wallet
        KeyCode::Char('w') => app.open_prompt(PromptKind::Wallet),
        KeyCode::Char('W') if app.wallet.is_connected() => app.disconnect_wallet(),

        // Preview actions
        KeyCode::Char('o') => open_preview(app),
        KeyCode::Char('y') => share_preview(app),

        // Theme
        KeyCode::Char('t') => app.toggle_theme(),

        // Conversation visibility
        KeyCode::Char('c') if !app.view.messages.is_empty() => app.screen = Screen::Conversation,
        KeyCode::Esc => app.screen = Screen::Landing,

        // Chat scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(app.chat_height / 2);
        }
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        KeyCode::Char('g') => app.chat_scroll = 0,

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => submit_message(app),
        KeyCode::Backspace => {
            if app.input_cursor > 0 {
                app.input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.input.chars().count();
            if app.input_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.input_cursor = app.input_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.input.chars().count();
            app.input_cursor = (app.input_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.input_cursor = 0;
        }
        KeyCode::End => {
            app.input_cursor = app.input.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.input_cursor);
            app.input.insert(byte_pos, c);
            app.input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_prompt(),
        KeyCode::Enter => app.submit_prompt(),
        KeyCode::Backspace => {
            if app.prompt_cursor > 0 {
                app.prompt_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.prompt_input, app.prompt_cursor);
                app.prompt_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.prompt_cursor = app.prompt_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.prompt_input.chars().count();
            app.prompt_cursor = (app.prompt_cursor + 1).min(char_count);
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.prompt_input, app.prompt_cursor);
            app.prompt_input.insert(byte_pos, c);
            app.prompt_cursor += 1;
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    let text: String = text.chars().filter(|c| *c != '\r' && *c != '\n').collect();

    let (buffer, cursor) = if app.prompt.is_some() {
        (&mut app.prompt_input, &mut app.prompt_cursor)
    } else if app.input_mode == InputMode::Editing {
        (&mut app.input, &mut app.input_cursor)
    } else {
        return;
    };

    let byte_pos = char_to_byte_index(buffer.as_str(), *cursor);
    buffer.insert_str(byte_pos, &text);
    *cursor += text.chars().count();
}

/// Start a send in the background. Gated on a connected wallet and on nothing
/// being in flight.
fn submit_message(app: &mut App) {
    app.show_suggestions = false;

    let (thread_id, payload) = match (app.wallet.thread_id(), app.wallet.payload()) {
        (Ok(thread_id), Ok(payload)) => (thread_id, payload),
        _ => {
            app.toast = Some("Connect your wallet..".to_string());
            return;
        }
    };

    if app.input.trim().is_empty() || app.is_busy() {
        return;
    }

    app.screen = Screen::Conversation;

    let input = std::mem::take(&mut app.input);
    app.input_cursor = 0;
    app.input_mode = InputMode::Normal;
    let file = app.selected_file.take();
    app.pending_submit = Some(PendingSubmit {
        input: input.clone(),
        file: file.clone(),
    });

    let conversation = app.conversation.clone();
    app.send_task = Some(tokio::spawn(async move {
        let attachment = match file {
            Some(path) => Some(Attachment::from_path(&path).await?),
            None => None,
        };
        let request = AgentRequest::new(thread_id, input)
            .with_payload(payload.to_json())
            .with_file(attachment);
        let outcome = conversation.send_message(request).await?;
        Ok::<SendOutcome, anyhow::Error>(outcome)
    }));
}

fn open_preview(app: &mut App) {
    let Some(url) = app.view.preview.clone() else {
        app.toast = Some("No payment link yet".to_string());
        return;
    };

    match open::that(&url) {
        Ok(()) => app.toast = Some("Opened preview in browser".to_string()),
        Err(e) => {
            warn!(error = %e, %url, "failed to open preview");
            app.toast = Some(format!("Failed to open preview: {}", e));
        }
    }
}

fn share_preview(app: &mut App) {
    let Some(url) = app.view.preview.clone() else {
        app.toast = Some("No payment link yet".to_string());
        return;
    };

    match copy_to_clipboard(&url) {
        Ok(()) => app.toast = Some("Link copied to clipboard".to_string()),
        Err(e) => {
            warn!(error = %e, "failed to copy preview link");
            app.toast = Some("Failed to copy.".to_string());
        }
    }
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text.to_string())?;
    Ok(())
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);

    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_chat_down(3),
        MouseEventKind::ScrollUp => app.scroll_chat_up(3),
        _ => {}
    }
}
