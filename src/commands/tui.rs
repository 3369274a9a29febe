use std::io;
use std::time::Duration;

use clap::Args;
use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap,
};
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::app::Runtime;
use crate::client::ClientState;
use crate::client::composer::MAX_ROWS;
use crate::client::conversation::{ChatNode, NodeRole};
use crate::client::thread_list::ThreadRow;
use crate::errors::CliError;
use crate::logging;
use crate::markdown::render_markdown;
use crate::tui::handlers::async_ops::dispatch;
use crate::tui::handlers::{handle_event, handle_tui_msg};
use crate::tui::types::{App, Mode, TuiMsg};

const PANEL_WIDTH: u16 = 34;

#[derive(Debug, Args)]
pub struct TuiArgs {
    /// Remember the focused thread across launches
    #[arg(long = "persist-session")]
    pub persist_session: bool,
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self, CliError> {
        enable_raw_mode()
            .map_err(|e| CliError::Generic(format!("Failed to enable raw mode: {e}")))?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)
            .map_err(|e| CliError::Generic(format!("Failed to enter alternate screen: {e}")))?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, Show, LeaveAlternateScreen);
    }
}

pub async fn handle(runtime: &Runtime, args: TuiArgs) -> Result<(), CliError> {
    if runtime.output.json {
        return Err(CliError::Usage(
            "`--json` is not supported for `resumax tui`.".to_string(),
        ));
    }

    let log_path = logging::init_file(&runtime.output)?;
    let api = runtime.api_client()?;
    let session = runtime.tui_session(args.persist_session)?;
    tracing::info!(
        api_url = api.base_url(),
        scope = ?session.scope(),
        restored_thread = %session.pointer(),
        "starting tui"
    );

    let mut app = App::new(
        ClientState::new(session),
        runtime.resolved_api_url()?,
        runtime.active_profile(),
        runtime.resolved_session_id().is_some(),
    );
    app.log_path = Some(log_path);

    let guard = TerminalGuard::enter()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| CliError::Generic(format!("Failed to init terminal: {e}")))?;
    terminal
        .clear()
        .map_err(|e| CliError::Generic(format!("Failed to clear terminal: {e}")))?;
    terminal
        .hide_cursor()
        .map_err(|e| CliError::Generic(format!("Failed to hide cursor: {e}")))?;

    let (tx, mut rx) = mpsc::unbounded_channel::<TuiMsg>();
    let start = app.state.start();
    dispatch(&api, &tx, &mut app, [start]);

    loop {
        terminal
            .draw(|f| ui(f, &mut app))
            .map_err(|e| CliError::Generic(format!("Failed to draw: {e}")))?;

        if app.should_quit {
            break;
        }

        while let Ok(msg) = rx.try_recv() {
            handle_tui_msg(&api, &tx, &mut app, msg);
        }

        let poll_ms = if app.bg_tasks > 0 { 50 } else { 120 };
        if crossterm::event::poll(Duration::from_millis(poll_ms))
            .map_err(|e| CliError::Generic(format!("Event poll failed: {e}")))?
        {
            let event = crossterm::event::read()
                .map_err(|e| CliError::Generic(format!("Event read failed: {e}")))?;
            if let Err(err) = handle_event(&api, &tx, &mut app, event) {
                tracing::error!(error = %err, "key handling failed");
                app.status = format!("Error: {err}");
            }
        }
    }

    terminal
        .show_cursor()
        .map_err(|e| CliError::Generic(format!("Failed to restore cursor: {e}")))?;
    drop(guard);
    Ok(())
}

fn ui(f: &mut Frame<'_>, app: &mut App) {
    let size = f.area();

    let (panel_area, main_area) = if app.state.side_panel.is_open() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(PANEL_WIDTH), Constraint::Min(20)])
            .split(size);
        (Some(cols[0]), cols[1])
    } else {
        (None, size)
    };

    let has_files = !app.state.composer.files().is_empty();
    let input_height = app.state.composer.rows().min(MAX_ROWS) + 2;
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),                             // header
            Constraint::Min(1),                                // chat
            Constraint::Length(if has_files { 1 } else { 0 }), // attachment previews
            Constraint::Length(input_height),                  // composer
            Constraint::Length(1),                             // status
        ])
        .split(main_area);

    render_header(f, app, layout[0]);
    f.render_widget(render_chat(app, layout[1]), layout[1]);
    if has_files {
        f.render_widget(render_previews(app, layout[2].width), layout[2]);
    }
    render_input(f, app, layout[3]);
    f.render_widget(render_status(app), layout[4]);

    if let Some(area) = panel_area {
        render_side_panel(f, app, area);
    }

    match app.mode {
        Mode::Help => {
            let area = centered_rect(70, 60, size);
            f.render_widget(Clear, area);
            f.render_widget(render_help(), area);
        }
        Mode::AttachPrompt => {
            let area = centered_rect(70, 30, size);
            f.render_widget(Clear, area);
            render_text_prompt_popup(f, app, area);
        }
        Mode::Attachments => {
            let area = centered_rect(60, 50, size);
            f.render_widget(Clear, area);
            render_attachments_popup(f, app, area);
        }
        Mode::Chat | Mode::Threads => {}
    }
}

fn render_header(f: &mut Frame<'_>, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let base = Style::default().fg(Color::Black).bg(Color::White);
    let title = app
        .state
        .focused_thread()
        .map(|t| t.title.clone())
        .unwrap_or_else(|| "New conversation".to_string());
    let left = Paragraph::new(Line::from(vec![
        Span::styled(" Resumax ", base.add_modifier(Modifier::BOLD)),
        Span::raw(truncate_to_width(&title, cols[0].width.saturating_sub(10) as usize)),
    ]))
    .style(base);

    let session = if app.session_present {
        "session=yes"
    } else {
        "session=no"
    };
    let right = Paragraph::new(Line::from(format!(
        "api={}  profile={}  {session} ",
        app.api_url, app.profile
    )))
    .style(base)
    .alignment(Alignment::Right);

    f.render_widget(left, cols[0]);
    f.render_widget(right, cols[1]);
}

fn render_chat(app: &mut App, area: Rect) -> Paragraph<'static> {
    let width = area.width.saturating_sub(2).max(1) as usize;
    let height = area.height.saturating_sub(2).max(1) as usize;

    let all_lines = build_chat_lines(app, width);
    let total = all_lines.len();
    let max_scroll = total.saturating_sub(height);
    app.state.chat_mut().set_max_scroll(max_scroll);
    let scroll = app.state.chat().scroll_offset();
    let top = max_scroll.saturating_sub(scroll);
    let end = (top + height).min(total);

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("Chat (PgUp/PgDn scroll, F1 help)");
    if app.mode == Mode::Chat {
        block = block.border_style(Style::default().fg(c_accent()));
    }

    Paragraph::new(Text::from(all_lines[top..end].to_vec())).block(block)
}

fn build_chat_lines(app: &App, width: usize) -> Vec<Line<'static>> {
    let chat = app.state.chat();
    let mut out = Vec::new();

    if chat.nodes().is_empty() && chat.is_new_conversation() {
        out.push(Line::from(Span::styled(
            "Start a new conversation",
            Style::default().fg(c_accent()).add_modifier(Modifier::BOLD),
        )));
        out.push(Line::from(Span::styled(
            "Ask about your resume, attach files with Ctrl+O, and press Enter to send.",
            Style::default().fg(c_muted()),
        )));
        return out.into_iter().flat_map(|l| wrap_styled_line(l, width)).collect();
    }

    for node in chat.nodes() {
        out.extend(node_lines(node, width));
        out.push(Line::from(""));
    }
    if app.waiting > 0 {
        out.push(Line::from(Span::styled(
            "Resumax is thinking...",
            Style::default().fg(c_muted()).add_modifier(Modifier::ITALIC),
        )));
    }
    out
}

fn node_lines(node: &ChatNode, width: usize) -> Vec<Line<'static>> {
    let (tag, tag_style) = match node.role {
        NodeRole::User => ("You", Style::default().fg(c_ok()).add_modifier(Modifier::BOLD)),
        NodeRole::Bot => ("Resumax", Style::default().fg(c_accent()).add_modifier(Modifier::BOLD)),
        NodeRole::Error => ("Resumax", Style::default().fg(c_warn()).add_modifier(Modifier::BOLD)),
    };

    let mut out = vec![Line::from(Span::styled(tag, tag_style))];
    let body: Vec<Line<'static>> = match node.role {
        // User text is shown exactly as typed.
        NodeRole::User => node
            .text
            .replace("\r\n", "\n")
            .split('\n')
            .map(|l| Line::from(l.to_string()))
            .collect(),
        NodeRole::Bot => render_markdown(&node.text),
        NodeRole::Error => vec![Line::from(Span::styled(
            node.text.clone(),
            Style::default().fg(c_warn()),
        ))],
    };
    for line in body {
        out.extend(wrap_styled_line(line, width));
    }
    for name in &node.attachments {
        let kind = crate::client::composer::FileKind::from_name(name);
        out.push(Line::from(Span::styled(
            truncate_to_width(&format!("  {} {name}", kind.icon()), width),
            Style::default().fg(c_muted()),
        )));
    }
    out
}

fn render_previews(app: &App, width: u16) -> Paragraph<'static> {
    let mut spans = vec![Span::styled(" ", Style::default())];
    for preview in app.state.composer.previews() {
        spans.push(Span::raw(format!("{} ", preview.kind.icon())));
        spans.push(Span::styled(
            preview.display_name,
            Style::default().fg(c_muted()),
        ));
        spans.push(Span::raw("  "));
    }
    let line = Line::from(truncate_spans_to_width(&spans, width as usize));
    Paragraph::new(line)
}

fn render_input(f: &mut Frame<'_>, app: &App, area: Rect) {
    let composer = &app.state.composer;
    let text = composer.text();
    let rows = area.height.saturating_sub(2) as usize;
    let (cursor_row, cursor_col) = composer.cursor_position();
    let first_row = (cursor_row + 1).saturating_sub(rows);

    let lines: Vec<Line<'static>> = text
        .split('\n')
        .skip(first_row)
        .take(rows.max(1))
        .map(|l| Line::from(l.to_string()))
        .collect();

    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("Message (Enter send, Alt+Enter newline, Ctrl+O attach)");
    if app.mode == Mode::Chat {
        block = block.border_style(Style::default().fg(c_accent()));
    }
    f.render_widget(Paragraph::new(Text::from(lines)).block(block), area);

    // Borders alone can eat the whole area on very short terminals.
    if app.mode == Mode::Chat && rows > 0 {
        let row_text: String = text.split('\n').nth(cursor_row).unwrap_or_default().to_string();
        let col_width: usize = row_text.chars().take(cursor_col).map(|c| c.width().unwrap_or(0)).sum();
        let x = area
            .x
            .saturating_add(1)
            .saturating_add(col_width as u16)
            .min(area.x + area.width.saturating_sub(2));
        let y = area
            .y
            .saturating_add(1)
            .saturating_add(cursor_row.saturating_sub(first_row) as u16);
        f.set_cursor_position((x, y));
    }
}

fn render_status(app: &App) -> Paragraph<'static> {
    let mut spans = Vec::new();
    if app.bg_tasks > 0 {
        spans.push(Span::styled("● ", Style::default().fg(c_warn())));
    }
    spans.push(Span::raw(app.status.clone()));
    Paragraph::new(Line::from(spans)).style(Style::default().fg(c_muted()))
}

fn render_side_panel(f: &mut Frame<'_>, app: &App, area: Rect) {
    f.render_widget(Clear, area);
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("Threads (Enter open, d delete, n new)");
    if app.mode == Mode::Threads {
        block = block.border_style(Style::default().fg(c_accent()));
    }
    let inner = block.inner(area);
    f.render_widget(block, area);

    let highlighted = if app.mode == Mode::Threads {
        app.highlighted_thread()
    } else {
        None
    };
    let rows = app.state.threads().rows(app.state.pointer(), highlighted);
    if rows.is_empty() {
        f.render_widget(
            Paragraph::new("No threads yet.").style(Style::default().fg(c_muted())),
            inner,
        );
        return;
    }

    let width = inner.width as usize;
    let mut selected_row = None;
    let items: Vec<ListItem<'static>> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| match row {
            ThreadRow::Header(label) => ListItem::new(Line::from(Span::styled(
                label,
                Style::default().fg(c_muted()).add_modifier(Modifier::BOLD),
            ))),
            ThreadRow::Entry {
                title,
                focused,
                show_delete,
                ..
            } => {
                if show_delete {
                    selected_row = Some(idx);
                }
                let marker = if focused { "▸ " } else { "  " };
                let suffix = if show_delete { " [d]" } else { "" };
                let avail = width.saturating_sub(marker.width() + suffix.width());
                let mut spans = vec![
                    Span::raw(marker),
                    Span::raw(truncate_to_width(&title, avail)),
                ];
                if show_delete {
                    spans.push(Span::styled(suffix, Style::default().fg(c_warn())));
                }
                let style = if focused {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(spans)).style(style)
            }
        })
        .collect();

    let mut state = ListState::default().with_selected(selected_row);
    let list = List::new(items).highlight_style(Style::default().bg(c_accent()).fg(Color::Black));
    f.render_stateful_widget(list, inner, &mut state);
}

fn render_text_prompt_popup(f: &mut Frame<'_>, app: &App, area: Rect) {
    let prompt = app
        .text_prompt
        .as_ref()
        .map(|p| p.prompt.as_str())
        .unwrap_or("Input");
    let input = app
        .text_prompt
        .as_ref()
        .map(|p| p.value())
        .unwrap_or_default();
    let cursor = app.text_prompt.as_ref().map(|p| p.cursor).unwrap_or(0);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("Attach file (Enter confirm, Esc cancel)")
        .border_style(Style::default().fg(c_accent()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let prefix = "> ";
    let lines = vec![
        Line::from(Span::styled(
            prompt.to_string(),
            Style::default().fg(c_muted()).add_modifier(Modifier::DIM),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled(prefix, Style::default().fg(c_accent()).add_modifier(Modifier::BOLD)),
            Span::raw(input.clone()),
        ]),
    ];
    f.render_widget(Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false }), inner);

    let before: usize = input.chars().take(cursor).map(|c| c.width().unwrap_or(0)).sum();
    let x = inner
        .x
        .saturating_add(prefix.width() as u16)
        .saturating_add(before as u16);
    let y = inner.y.saturating_add(2);
    if x < inner.x + inner.width && y < inner.y + inner.height {
        f.set_cursor_position((x, y));
    }
}

fn render_attachments_popup(f: &mut Frame<'_>, app: &mut App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("Attachments (x remove, Esc close)")
        .border_style(Style::default().fg(c_accent()));
    let items: Vec<ListItem<'static>> = app
        .state
        .composer
        .previews()
        .into_iter()
        .map(|p| ListItem::new(format!("{} {}", p.kind.icon(), p.display_name)))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(c_accent()).fg(Color::Black));
    f.render_stateful_widget(list, area, &mut app.attachment_state);
}

fn render_help() -> Paragraph<'static> {
    let lines = vec![
        Line::from(Span::styled(
            "Resumax TUI",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Enter: send message"),
        Line::from("Alt+Enter / Shift+Enter: new line"),
        Line::from("Ctrl+O: attach a file"),
        Line::from("Ctrl+X: review or remove attachments"),
        Line::from("Ctrl+B / F3: toggle thread panel"),
        Line::from("Tab: switch focus between panel and chat"),
        Line::from("Ctrl+N: new conversation"),
        Line::from("Ctrl+R: refresh threads"),
        Line::from("PgUp/PgDn: scroll chat"),
        Line::from("Esc: quit (or close popup)"),
        Line::from(""),
        Line::from("Thread panel: Up/Down select, Enter open, d delete, n new"),
        Line::from(""),
        Line::from("If threads fail to load, set a session with `resumax config set session <id>`."),
    ];

    Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Help (Esc to close)"),
        )
        .wrap(Wrap { trim: false })
}

fn c_accent() -> Color {
    Color::Rgb(0, 200, 200)
}

fn c_ok() -> Color {
    Color::Rgb(22, 163, 74)
}

fn c_warn() -> Color {
    Color::Rgb(245, 158, 11)
}

fn c_muted() -> Color {
    Color::Rgb(100, 116, 139)
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    let vertical = popup_layout[1];
    let popup_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical);

    popup_layout[1]
}

/// Hard-wraps a styled line at `width` columns, keeping span styles.
fn wrap_styled_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    if width == 0 || line.width() <= width {
        return vec![line];
    }
    let mut out = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;
    for span in line.spans {
        let mut chunk = String::new();
        for ch in span.content.chars() {
            let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
            if used + cw > width {
                if !chunk.is_empty() {
                    current.push(Span::styled(std::mem::take(&mut chunk), span.style));
                }
                out.push(Line::from(std::mem::take(&mut current)));
                used = 0;
            }
            chunk.push(ch);
            used += cw;
        }
        if !chunk.is_empty() {
            current.push(Span::styled(chunk, span.style));
        }
    }
    if !current.is_empty() {
        out.push(Line::from(current));
    }
    out
}

fn truncate_to_width(input: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if input.width() <= max_width {
        return input.to_string();
    }

    const ELLIPSIS: &str = "…";
    let ell_w = ELLIPSIS.width();
    if max_width <= ell_w {
        return ELLIPSIS.to_string();
    }

    let mut out = String::new();
    let mut w = 0usize;
    for ch in input.chars() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if w + cw + ell_w > max_width {
            break;
        }
        out.push(ch);
        w += cw;
    }
    out.push_str(ELLIPSIS);
    out
}

fn truncate_spans_to_width(spans: &[Span<'static>], max_width: usize) -> Vec<Span<'static>> {
    let mut out = Vec::new();
    let mut used = 0usize;
    for span in spans {
        let w = span.content.as_ref().width();
        if used + w <= max_width {
            out.push(span.clone());
            used += w;
            continue;
        }
        let rest = max_width.saturating_sub(used);
        if rest > 0 {
            out.push(Span::styled(truncate_to_width(&span.content, rest), span.style));
        }
        break;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::conversation::{bot_node, user_node};
    use crate::client::session::Session;
    use crate::markdown::line_text;
    use ratatui::backend::TestBackend;

    fn app_with_draft(draft: &str) -> App {
        let mut app = App::new(
            ClientState::new(Session::in_memory()),
            "http://localhost:8000".to_string(),
            "default".to_string(),
            true,
        );
        app.state.composer.set_text(draft);
        app
    }

    fn draw(app: &mut App, width: u16, height: u16) {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
    }

    #[test]
    fn short_terminals_render_a_multiline_draft() {
        for height in 1..=12 {
            let mut app = app_with_draft("one\ntwo\nthree\nfour");
            draw(&mut app, 40, height);

            app.state.toggle_side_panel();
            app.mode = Mode::Threads;
            draw(&mut app, 80, height);
        }
    }

    #[test]
    fn chat_scroll_is_clamped_to_the_transcript() {
        let mut app = app_with_draft("");
        for i in 0..6 {
            app.state.chat_mut().push(user_node(&format!("question {i}"), &[]));
            app.state.chat_mut().push(bot_node("answer", &[]));
        }
        app.state.chat_mut().set_max_scroll(usize::MAX);
        app.state.chat_mut().scroll_up(10_000);
        draw(&mut app, 40, 20);

        let max = app.state.chat().scroll_offset();
        assert!(max < 10_000);
        app.state.chat_mut().scroll_down(5);
        assert_eq!(app.state.chat().scroll_offset(), max.saturating_sub(5));
    }

    #[test]
    fn wraps_keeping_styles() {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let line = Line::from(vec![Span::styled("abcd", bold), Span::raw("efgh")]);
        let wrapped = wrap_styled_line(line, 3);
        let texts: Vec<_> = wrapped.iter().map(line_text).collect();
        assert_eq!(texts, vec!["abc", "def", "gh"]);
        assert_eq!(wrapped[1].spans[0].style, bold);
        assert_eq!(wrapped[1].spans[1].content, "ef");
    }

    #[test]
    fn short_lines_are_untouched() {
        let wrapped = wrap_styled_line(Line::from("hi"), 10);
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn truncates_by_display_width() {
        assert_eq!(truncate_to_width("Resume Review", 20), "Resume Review");
        assert_eq!(truncate_to_width("Resume Review", 7), "Resume…");
        assert_eq!(truncate_to_width("anything", 1), "…");
    }

    #[test]
    fn error_node_uses_notice_text() {
        let node = crate::client::conversation::error_node();
        let lines = node_lines(&node, 200);
        assert_eq!(line_text(&lines[0]), "Resumax");
        assert!(line_text(&lines[1]).starts_with("Sorry"));
    }
}
