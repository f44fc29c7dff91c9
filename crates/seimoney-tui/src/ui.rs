use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, InputMode, PromptKind, Screen, FEATURES, SUGGESTED_MESSAGES};
use seimoney_core::sanitize::{self, Fragment, InlineStyle};
use seimoney_core::Sender;

/// Colors for the current theme
#[derive(Debug, Clone, Copy)]
struct Palette {
    bg: Color,
    fg: Color,
    muted: Color,
    accent: Color,
    user: Color,
    agent: Color,
    error: Color,
    bar: Color,
}

impl Palette {
    fn for_mode(dark: bool) -> Self {
        if dark {
            Self {
                bg: Color::Reset,
                fg: Color::White,
                muted: Color::DarkGray,
                accent: Color::Magenta,
                user: Color::Cyan,
                agent: Color::Yellow,
                error: Color::LightRed,
                bar: Color::DarkGray,
            }
        } else {
            Self {
                bg: Color::White,
                fg: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                user: Color::Blue,
                agent: Color::Magenta,
                error: Color::Red,
                bar: Color::Gray,
            }
        }
    }
}

/// Parse `**bold**` markdown inside an already-sanitized fragment
fn parse_markdown_fragment(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
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
                    spans.push(Span::styled(std::mem::take(&mut current_text), base));
                }
                spans.push(Span::styled(bold_text, base.add_modifier(Modifier::BOLD)));
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
        spans.push(Span::styled(current_text, base));
    }
    spans
}

fn fragment_style(style: InlineStyle, palette: &Palette) -> Style {
    let mut out = Style::default().fg(palette.fg);
    if style.bold {
        out = out.add_modifier(Modifier::BOLD);
    }
    if style.italic {
        out = out.add_modifier(Modifier::ITALIC);
    }
    if style.underline || style.link {
        out = out.add_modifier(Modifier::UNDERLINED);
    }
    if style.link {
        out = out.fg(palette.accent);
    }
    if style.code {
        out = out.fg(palette.agent);
    }
    out
}

fn fragment_spans(line: &[Fragment], palette: &Palette) -> Line<'static> {
    let spans: Vec<Span<'static>> = line
        .iter()
        .flat_map(|fragment| {
            parse_markdown_fragment(&fragment.text, fragment_style(fragment.style, palette))
        })
        .collect();
    Line::from(spans)
}

/// Agent replies are untrusted markup; only sanitized fragments reach the screen
fn agent_lines(text: &str, palette: &Palette) -> Vec<Line<'static>> {
    sanitize::render(text)
        .iter()
        .map(|line| fragment_spans(line, palette))
        .collect()
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let palette = Palette::for_mode(app.dark_mode);
    let area = frame.area();

    frame.render_widget(Block::default().style(Style::default().bg(palette.bg)), area);

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area, &palette);

    match app.screen {
        Screen::Landing => render_landing_screen(app, frame, body_area, &palette),
        Screen::Conversation => render_conversation_screen(app, frame, body_area, &palette),
    }

    render_footer(app, frame, footer_area, &palette);

    if let Some(kind) = app.prompt {
        render_prompt(app, frame, area, kind, &palette);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let wallet = match app.wallet.address() {
        Some(address) => Span::styled(
            format!(" ● {} ", address.short()),
            Style::default().fg(Color::Green),
        ),
        None => Span::styled(" ○ Wallet not connected ", Style::default().fg(palette.error)),
    };

    let title = Line::from(vec![
        Span::styled(" SeiMoney ", Style::default().fg(palette.accent).bold()),
        wallet,
        Span::styled(
            format!("{} · {} ", app.wallet_config.network.name, app.api_url),
            Style::default().fg(palette.muted),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(palette.muted),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(palette.bar));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match (app.prompt, app.input_mode) {
        (Some(_), _) => " PROMPT ",
        (None, InputMode::Editing) => " INSERT ",
        (None, InputMode::Normal) => " NORMAL ",
    };

    let hints = if let Some(toast) = &app.toast {
        Span::styled(format!(" {} ", toast), Style::default().fg(palette.accent).bold())
    } else {
        let text = match (app.prompt, app.input_mode) {
            (Some(_), _) => " Enter:confirm  Esc:cancel",
            (None, InputMode::Editing) => " Enter:send  Esc:normal mode",
            (None, InputMode::Normal) => match app.screen {
                Screen::Landing => {
                    " i:type  s:suggestions  f:attach  w:wallet  c:chat  t:theme  q:quit"
                }
                Screen::Conversation => {
                    " i:type  j/k:scroll  o:open link  y:copy link  f:attach  w:wallet  Esc:home  q:quit"
                }
            },
        };
        Span::styled(text, Style::default().fg(palette.muted))
    };

    let footer = Line::from(vec![Span::styled(mode_text, mode_style), hints]);
    frame.render_widget(Paragraph::new(footer), area);
}

fn render_landing_screen(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let [hero_area, composer_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(5),
    ])
    .areas(area);

    app.chat_area = None;

    let mut lines: Vec<Line> = vec![
        Line::default(),
        Line::from(Span::styled(
            "Payments made simple with SeiMoney",
            Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        ))
        .centered(),
        Line::from(Span::styled(
            "Ask the agent to create payment links, gate content, or run payroll on Sei.",
            Style::default().fg(palette.muted),
        ))
        .centered(),
        Line::default(),
    ];

    for (title, description) in FEATURES {
        lines.push(
            Line::from(vec![
                Span::styled(format!("{}  ", title), Style::default().fg(palette.fg).bold()),
                Span::styled(*description, Style::default().fg(palette.muted)),
            ])
            .centered(),
        );
    }

    if !app.view.messages.is_empty() {
        lines.push(Line::default());
        lines.push(
            Line::from(Span::styled(
                format!("{} messages in this session. Press c to continue.", app.view.messages.len()),
                Style::default().fg(palette.muted).italic(),
            ))
            .centered(),
        );
    }

    let hero = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
    frame.render_widget(hero, hero_area);

    render_composer(app, frame, composer_area, " Type your payment request... ", palette);
}

fn render_conversation_screen(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let [conversation_area, preview_area] = Layout::horizontal([
        Constraint::Percentage(60),
        Constraint::Percentage(40),
    ])
    .areas(area);

    let [chat_area, composer_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(5),
    ])
    .areas(conversation_area);

    // Store area for mouse hit-testing
    app.chat_area = Some(chat_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted))
        .title(" Conversation ");

    let mut lines: Vec<Line> = Vec::new();
    for msg in &app.view.messages {
        match msg.sender {
            Sender::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(palette.user).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(Line::from(Span::styled(
                        line.to_string(),
                        Style::default().fg(palette.fg),
                    )));
                }
            }
            Sender::Agent => {
                lines.push(Line::from(Span::styled(
                    "Agent:",
                    Style::default().fg(palette.agent).add_modifier(Modifier::BOLD),
                )));
                lines.extend(agent_lines(&msg.text, palette));
            }
        }
        lines.push(Line::default());
    }

    if let Some(notice) = &app.view.notice {
        lines.push(Line::from(Span::styled(
            format!("⚠ {}", notice),
            Style::default().fg(palette.error).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            "The agent did not reply. Try sending your message again.",
            Style::default().fg(palette.muted),
        )));
    }

    if app.view.is_thinking {
        lines.push(Line::from(Span::styled(
            "Agent:",
            Style::default().fg(palette.agent).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    render_composer(app, frame, composer_area, " Continue the conversation... ", palette);
    render_preview(app, frame, preview_area, palette);
}

/// Input box, attached file line, and the suggestions dropdown
fn render_composer(app: &mut App, frame: &mut Frame, area: Rect, title: &str, palette: &Palette) {
    let [input_area, file_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(2),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::Editing && app.prompt.is_none();
    let border_color = if app.is_busy() {
        palette.muted
    } else if editing {
        Color::Yellow
    } else {
        palette.accent
    };

    let block_title = if app.is_busy() { " Waiting for the agent... " } else { title };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(block_title);

    // Calculate visible portion of input with horizontal scrolling
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(palette.user))
        .block(input_block);
    frame.render_widget(input, input_area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }

    let file_line = match &app.selected_file {
        Some(path) => Line::from(vec![
            Span::styled(" 📎 ", Style::default().fg(palette.accent)),
            Span::styled(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string()),
                Style::default().fg(palette.fg),
            ),
            Span::styled("  (F to remove)", Style::default().fg(palette.muted)),
        ]),
        None => Line::from(Span::styled(
            " No file attached (f to attach)",
            Style::default().fg(palette.muted),
        )),
    };
    frame.render_widget(Paragraph::new(file_line), file_area);

    if app.show_suggestions {
        render_suggestions(app, frame, input_area, palette);
    }
}

fn render_suggestions(app: &mut App, frame: &mut Frame, anchor: Rect, palette: &Palette) {
    let height = SUGGESTED_MESSAGES.len() as u16 + 2;
    let dropdown = Rect {
        x: anchor.x,
        y: anchor.y.saturating_sub(height),
        width: anchor.width,
        height: height.min(anchor.y),
    };

    let items: Vec<ListItem> = SUGGESTED_MESSAGES
        .iter()
        .map(|s| ListItem::new(format!(" {} ", s)))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(palette.accent))
                .title(" Suggestions (Enter to use) "),
        )
        .highlight_style(
            Style::default()
                .bg(palette.accent)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_widget(Clear, dropdown);
    frame.render_stateful_widget(list, dropdown, &mut app.suggestion_state);
}

fn render_preview(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .title(" Preview ");

    let text = match &app.view.preview {
        Some(url) => Text::from(vec![
            Line::from(Span::styled(
                "Payment link ready",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(vec![
                Span::styled("URL: ", Style::default().fg(palette.muted)),
                Span::styled(
                    url.clone(),
                    Style::default().fg(palette.accent).add_modifier(Modifier::UNDERLINED),
                ),
            ]),
            Line::default(),
            Line::from(vec![
                Span::styled("[o]", Style::default().fg(palette.fg).bold()),
                Span::styled(" Open in browser   ", Style::default().fg(palette.muted)),
                Span::styled("[y]", Style::default().fg(palette.fg).bold()),
                Span::styled(" Copy link", Style::default().fg(palette.muted)),
            ]),
        ]),
        None => Text::from(vec![
            Line::default(),
            Line::from(Span::styled(
                "Your payment link will appear here",
                Style::default().fg(palette.muted).italic(),
            ))
            .centered(),
        ]),
    };

    let preview = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
    frame.render_widget(preview, area);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let [vertical] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [rect] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(vertical);
    rect
}

fn render_prompt(app: &App, frame: &mut Frame, area: Rect, kind: PromptKind, palette: &Palette) {
    let (title, hint) = match kind {
        PromptKind::Wallet => (
            " Connect wallet ",
            "Paste the 0x address of your Sei EVM wallet",
        ),
        PromptKind::File => (" Attach file ", "Path of the file to send with your next message"),
    };

    let popup = centered_rect(area, area.width.min(70), 7);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);
    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let [hint_area, input_area, error_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Length(2),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(hint, Style::default().fg(palette.muted))),
        hint_area,
    );

    let width = input_area.width as usize;
    let scroll_offset = if width == 0 {
        0
    } else {
        (app.prompt_cursor + 1).saturating_sub(width)
    };
    let visible: String = app.prompt_input.chars().skip(scroll_offset).take(width).collect();
    frame.render_widget(
        Paragraph::new(Span::styled(visible, Style::default().fg(palette.user))),
        input_area,
    );
    if width > 0 {
        frame.set_cursor_position((
            input_area.x + (app.prompt_cursor - scroll_offset) as u16,
            input_area.y,
        ));
    }

    if let Some(error) = &app.prompt_error {
        frame.render_widget(
            Paragraph::new(Span::styled(error.clone(), Style::default().fg(palette.error)))
                .wrap(Wrap { trim: true }),
            error_area,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(spans: &[Span]) -> Vec<String> {
        spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[tokio::test]
    async fn test_prompt_renders_in_a_narrow_terminal() {
        use crate::app::Settings;
        use ratatui::{backend::TestBackend, Terminal};
        use seimoney_core::Config;

        let mut app = App::new(
            Config::new(),
            Settings {
                api_url: "http://127.0.0.1:1".to_string(),
                link_domain: "seimoney.link".to_string(),
                address: None,
            },
        );
        app.open_prompt(PromptKind::Wallet);
        app.prompt_input = "0x12".to_string();
        app.prompt_cursor = 4;

        for width in [2, 3, 10] {
            let mut terminal = Terminal::new(TestBackend::new(width, 12)).unwrap();
            terminal.draw(|frame| render(&mut app, frame)).unwrap();
        }
    }

    #[test]
    fn test_markdown_bold_is_split() {
        let spans = parse_markdown_fragment("Pay **10 SEI** now", Style::default());
        assert_eq!(texts(&spans), vec!["Pay ", "10 SEI", " now"]);
        assert!(spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_unclosed_markdown_is_literal() {
        let spans = parse_markdown_fragment("a **b", Style::default());
        assert_eq!(texts(&spans), vec!["a **b"]);
    }

    #[test]
    fn test_agent_lines_drop_scripts() {
        let palette = Palette::for_mode(true);
        let lines = agent_lines("<b>Hi</b><script>evil()</script>", &palette);
        assert_eq!(lines.len(), 1);
        let rendered: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(rendered, "Hi");
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }
}
