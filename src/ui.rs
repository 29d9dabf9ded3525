use nala_core::{contains_markdown_table, persona, segments, ChatRole, Glossary, Provider, Segment};
use ratatui::{
    layout::{Constraint, Layout, Margin, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
    Frame,
};

use crate::app::{App, FocusPane, InputMode};

const TERMS_PANEL_WIDTH: u16 = 36;

fn term_style() -> Style {
    Style::default().fg(Color::Black).bg(Color::Yellow)
}

/// Split a line into runs, flagging the ones wrapped in `**`
fn bold_runs(text: &str) -> Vec<(String, bool)> {
    let mut runs: Vec<(String, bool)> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                if !current_text.is_empty() {
                    runs.push((std::mem::take(&mut current_text), false));
                }
                runs.push((bold_text, true));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        runs.push((current_text, false));
    }
    runs
}

/// One line of a reply, with bold runs and highlighted glossary terms
fn reply_line(text: &str, glossary: &Glossary) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();

    for (run, bold) in bold_runs(text) {
        let base = if bold {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };

        for segment in segments(&run, glossary) {
            match segment {
                Segment::Plain(plain) => spans.push(Span::styled(plain.to_string(), base)),
                Segment::Term { text, .. } => {
                    spans.push(Span::styled(text.to_string(), base.patch(term_style())))
                }
            }
        }
    }

    Line::from(spans)
}

/// Lines for an assistant reply. Tables are shown verbatim.
fn reply_lines(content: &str, glossary: &Glossary) -> Vec<Line<'static>> {
    if contains_markdown_table(content) {
        content.lines().map(|l| Line::from(l.to_string())).collect()
    } else {
        content.lines().map(|l| reply_line(l, glossary)).collect()
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_body(app, frame, body_area);
    render_footer(app, frame, footer_area);

    // Popups (in order of priority)
    if app.show_intro {
        render_intro(frame, area);
    } else if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    } else if app.show_provider_picker {
        render_provider_picker(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(format!(" {} ", persona::NAME), Style::default().fg(Color::Cyan).bold()),
        Span::styled(persona::TAGLINE, Style::default().fg(Color::White)),
        Span::raw(" "),
        Span::styled(
            format!("[{}: {}]", app.current_provider.label(), app.selected_model),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" ASK ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hint = |key: &'static str, label: &'static str| {
        vec![
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let hints: Vec<Span> = match app.input_mode {
        InputMode::Editing => [hint("Enter", "send"), hint("Esc", "stop typing")].concat(),
        InputMode::Normal => {
            let nav = match app.focus {
                FocusPane::Terms => hint("j/k", "term"),
                _ => hint("j/k", "scroll"),
            };
            [
                nav,
                hint("Tab", "focus"),
                hint("i", "ask"),
                hint("e", "export"),
                hint("P", "provider"),
                hint("M", "model"),
                hint("q", "quit"),
            ]
            .concat()
        }
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_body(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_column, terms_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(TERMS_PANEL_WIDTH.min(area.width / 2)),
    ])
    .areas(area);

    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(chat_column);

    // Store areas for mouse hit-testing
    app.chat_area = Some(chat_area);
    app.terms_area = Some(terms_area);

    // Inner size minus borders, used by scroll_chat_to_bottom
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_terms(app, frame, terms_area);
}

fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let you = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let nala = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut lines: Vec<Line<'static>> = Vec::new();

    if !app.conversation.has_interacted() {
        lines.push(Line::from(Span::styled(format!("{}:", persona::NAME), nala)));
        lines.push(Line::from(persona::GREETING));
        lines.push(Line::default());
    }

    for turn in app.conversation.exchanges() {
        match turn.role() {
            ChatRole::User => {
                lines.push(Line::from(Span::styled("You:", you)));
                for line in turn.content().lines() {
                    lines.push(Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Cyan))));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(format!("{}:", persona::NAME), nala)));
                lines.extend(reply_lines(turn.content(), &app.glossary));
            }
            ChatRole::System => continue,
        }
        lines.push(Line::default());
    }

    if let Some(pending) = &app.pending_input {
        lines.push(Line::from(Span::styled("You:", you)));
        for line in pending.lines() {
            lines.push(Line::from(Span::styled(line.to_string(), Style::default().fg(Color::Cyan))));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(format!("{}:", persona::NAME), nala)));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{} is typing{}", persona::NAME, dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    if let Some(err) = &app.last_error {
        lines.push(Line::from(Span::styled(
            format!("⚠ {}", err),
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::default());
    }

    if let Some(status) = &app.status {
        lines.push(Line::from(Span::styled(
            status.clone(),
            Style::default().fg(Color::Green).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {}: {} ", app.current_provider.label(), app.selected_model));

    let lines = chat_lines(app);
    let total_lines = u16::try_from(lines.len()).unwrap_or(u16::MAX);

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);

    if total_lines > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state =
            ScrollbarState::new(total_lines as usize).position(app.chat_scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let input_focused = app.focus == FocusPane::Input || app.input_mode == InputMode::Editing;
    let border_color = if input_focused { Color::Yellow } else { Color::DarkGray };

    let title = if app.is_loading() {
        " Waiting for reply... "
    } else {
        " Ask NALA a question "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.query_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .query_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);

    frame.render_widget(input, area);

    if app.input_mode == InputMode::Editing && !app.show_intro {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_terms(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Terms;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Terms ({}) ", app.found_terms.len()));

    if app.found_terms.is_empty() {
        let placeholder = Paragraph::new("Finance terms from NALA's latest answer show up here.")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true })
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    // Definitions wrap to the panel width minus borders and highlight symbol
    let wrap_width = area.width.saturating_sub(4).max(10) as usize;

    let items: Vec<ListItem> = app
        .found_terms
        .iter()
        .map(|found| {
            let mut lines = vec![Line::from(Span::styled(found.term.clone(), term_style().bold()))];
            lines.extend(
                wrap_words(&found.definition, wrap_width)
                    .into_iter()
                    .map(|l| Line::from(Span::raw(l))),
            );
            lines.push(Line::default());
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.terms_state);
}

/// Greedy word wrap for list items, which ratatui does not wrap itself
fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Centered popup rectangle clamped to the frame
fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_intro(frame: &mut Frame, area: Rect) {
    let popup_area = popup_rect(area, 64, 16);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Welcome to {} ", persona::NAME));

    let mut lines: Vec<Line> = Vec::new();
    for paragraph in persona::INTRO {
        lines.push(Line::from(paragraph));
        lines.push(Line::default());
    }
    lines.push(Line::from(Span::styled(
        "Got it! (Enter)",
        Style::default().fg(Color::Black).bg(Color::Cyan).bold(),
    )));

    let intro = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(intro, popup_area);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_area = popup_rect(
        area,
        40,
        u16::try_from(app.available_models.len()).unwrap_or(u16::MAX).saturating_add(2),
    );
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if model == &app.selected_model {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

fn render_provider_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let providers = Provider::all();
    let popup_area = popup_rect(area, 45, providers.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Provider ");

    let items: Vec<ListItem> = providers
        .iter()
        .map(|provider| {
            let key_source = app.get_key_source(*provider);
            let is_current = *provider == app.current_provider;

            let status = match key_source {
                Some("env") => "(env var)",
                Some("config") => "(configured)",
                Some("local") => "(local)",
                _ => "(needs key)",
            };
            let prefix = if is_current { "* " } else { "  " };

            let style = if is_current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else if key_source.is_some() {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(format!("{}{} {}", prefix, provider.display_name(), status)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.provider_picker_state);
}

/// Mask all but the last four characters of a key
fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let masked_len = len - 4;
    let last_four: String = key.chars().skip(masked_len).collect();
    format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let provider_name = app
        .api_key_target_provider
        .map(|p| p.display_name())
        .unwrap_or("Provider");

    let popup_area = popup_rect(area, 60, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Enter API Key for {} ", provider_name));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);
    if inner.height < 5 {
        return;
    }

    let instructions = Paragraph::new("Paste your API key below. Press Enter to save, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let masked = mask_key(&app.api_key_input);
    let cursor_x = masked.chars().count().min(input_area.width as usize) as u16;
    frame.render_widget(
        Paragraph::new(masked).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let char_count = format!("{} characters", app.api_key_input.chars().count());
    frame.render_widget(
        Paragraph::new(char_count).style(Style::default().fg(Color::DarkGray)),
        Rect::new(inner.x, inner.y + 4, inner.width, 1),
    );
}
