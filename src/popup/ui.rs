use super::app::PopupApp;
use super::state::PopupMode;
use crate::queue::QueueStatus;
use crate::sync::pause::QueueState;
use crate::sync::{QueueView, RenderedRow, RowToggle};
use crate::util::format::format_minutes;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Sparkline, Table, TableState, Wrap},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const PROGRESS_WIDTH: usize = 12;
const MAX_BANNER_LINES: usize = 4;

/// Main rendering function
pub fn render(app: &PopupApp, f: &mut Frame) {
    let size = f.area();
    let view = app.engine.view();

    let banner = view
        .error
        .as_deref()
        .map(|error| banner_lines(error, size.width))
        .unwrap_or_default();
    let graph_height = if show_graph(app, view) { 4 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),             // Header
            Constraint::Length(banner.len() as u16), // Error banner
            Constraint::Length(graph_height),  // Speed graph
            Constraint::Min(0),                // Queue
            Constraint::Length(1),             // Pause control
            Constraint::Length(1),             // Status bar
        ])
        .split(size);

    render_header(app, f, chunks[0]);
    if !banner.is_empty() {
        let lines: Vec<Line> = banner.into_iter().map(Line::from).collect();
        let paragraph =
            Paragraph::new(lines).style(Style::default().fg(Color::White).bg(Color::Red));
        f.render_widget(paragraph, chunks[1]);
    }
    if graph_height > 0 {
        render_graph(view, f, chunks[2]);
    }
    render_queue(app, f, chunks[3]);
    render_pause_control(app, f, chunks[4]);
    render_status_bar(app, f, chunks[5]);

    match app.state.mode {
        PopupMode::Help => render_help(f, size),
        PopupMode::ConfirmDelete => render_confirm_delete(app, f, size),
        mode if mode.is_text_input() => render_input_dialog(app, f, size),
        _ => {}
    }
}

/// Wrap the error text to the terminal width, keeping its own line breaks
fn banner_lines(error: &str, width: u16) -> Vec<String> {
    let width = (width as usize).saturating_sub(3).max(10);
    let mut lines: Vec<String> = error
        .lines()
        .flat_map(|line| textwrap::wrap(line, width))
        .map(|line| format!("   {line}"))
        .take(MAX_BANNER_LINES)
        .collect();
    if let Some(first) = lines.first_mut() {
        first.replace_range(..3, " ⚠ ");
    }
    lines
}

/// The graph needs something to show and a queue that is doing something
fn show_graph(app: &PopupApp, view: &QueueView) -> bool {
    app.enable_graph
        && view.status != QueueStatus::Idle
        && view.speedlog.iter().any(|&s| s > 0.0)
}

fn status_color(status: QueueStatus) -> Color {
    match status {
        QueueStatus::Downloading => Color::Green,
        QueueStatus::Paused => Color::Yellow,
        QueueStatus::Idle => Color::Gray,
    }
}

fn render_header(app: &PopupApp, f: &mut Frame, area: Rect) {
    let view = app.engine.view();
    let mut spans = vec![
        Span::styled(
            format!("● {}", view.status),
            Style::default()
                .fg(status_color(view.status))
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {}", view.speed)),
    ];
    if !view.sizeleft.is_empty() {
        spans.push(Span::raw(format!("  Left: {}", view.sizeleft)));
    }
    spans.push(Span::raw(format!("  ETA: {}", view.timeleft)));
    if !view.speedlimit.is_empty() {
        spans.push(Span::raw(format!("  Limit: {}", view.speedlimit)));
    }
    if view.paused_jobs > 0 {
        spans.push(Span::styled(
            format!("  Paused jobs: {}", view.paused_jobs),
            Style::default().fg(Color::Yellow),
        ));
    }

    let title = match &app.state.profile_name {
        Some(name) => format!(" SABnzbd: {name} "),
        None => " SABnzbd ".to_string(),
    };
    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(header, area);
}

fn render_graph(view: &QueueView, f: &mut Frame, area: Rect) {
    let data: Vec<u64> = view
        .speedlog
        .iter()
        .map(|s| s.max(0.0).round() as u64)
        .collect();
    let graph = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(" KB/s "))
        .data(data.iter().copied())
        .style(Style::default().fg(Color::Green));
    f.render_widget(graph, area);
}

fn render_queue(app: &PopupApp, f: &mut Frame, area: Rect) {
    let view = app.engine.view();
    let moving = app.state.mode == PopupMode::Moving;

    let border_style = if moving {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default().fg(Color::Gray)
    };
    let title = if moving {
        " Queue (moving: j/k to move, Enter to drop, Esc to cancel) ".to_string()
    } else {
        format!(" Queue ({}) ", view.rows.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(border_style);

    if view.rows.is_empty() {
        let empty = Paragraph::new("Queue is empty")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    // Columns other than the name: marker, status, progress, ETA, toggle, borders
    let fixed = 2 + 12 + (PROGRESS_WIDTH + 5) + 10 + 8 + 2 + 5;
    let name_width = (area.width as usize).saturating_sub(fixed).max(10);

    let header = Row::new(vec!["Name", "Status", "Progress", "ETA", "Action"]).style(
        Style::default()
            .fg(Color::Black)
            .bg(Color::Rgb(100, 100, 120))
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = view
        .rows
        .iter()
        .map(|row| queue_row(row, name_width))
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(10),
            Constraint::Length(12),
            Constraint::Length(PROGRESS_WIDTH as u16 + 5),
            Constraint::Length(10),
            Constraint::Length(8),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(if moving {
        Style::default()
            .bg(Color::Magenta)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .bg(Color::Rgb(60, 60, 80))
            .add_modifier(Modifier::BOLD)
    })
    .highlight_symbol("▶ ");

    let mut table_state = TableState::default().with_selected(Some(app.state.selected));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn queue_row(row: &RenderedRow, name_width: usize) -> Row<'static> {
    let status_style = if row.toggle == RowToggle::Resume {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };
    let progress = if row.show_progress {
        format!(
            "{} {:>3}%",
            format_progress_bar(row.percentage, PROGRESS_WIDTH),
            row.percentage
        )
    } else {
        String::new()
    };
    let toggle = match row.toggle {
        RowToggle::Pause => "⏸ Pause",
        RowToggle::Resume => "▶ Resume",
    };

    Row::new(vec![
        Cell::from(truncate_filename(&row.filename, name_width)),
        Cell::from(row.status.to_string()).style(status_style),
        Cell::from(progress).style(Style::default().fg(Color::Green)),
        Cell::from(row.timeleft.clone()),
        Cell::from(toggle),
    ])
}

fn render_pause_control(app: &PopupApp, f: &mut Frame, area: Rect) {
    let control = app.engine.pause_control();
    let button_style = Style::default()
        .fg(Color::Black)
        .bg(if control.state.is_paused() {
            Color::Green
        } else {
            Color::Yellow
        })
        .add_modifier(Modifier::BOLD);

    let mut spans = vec![Span::styled(format!(" {} ", control.label()), button_style)];
    match (control.state, control.selected_choice()) {
        (QueueState::Running, Some(choice)) => {
            spans.push(Span::raw(format!("  ◀ {} ▶", choice.label())));
        }
        (QueueState::Paused(duration), _) => {
            let remaining = match duration.minutes() {
                Some(m) => format!("  paused, {} left", format_minutes(m)),
                None => "  paused indefinitely".to_string(),
            };
            spans.push(Span::styled(remaining, Style::default().fg(Color::Yellow)));
        }
        _ => {}
    }
    if let Some(category) = &app.state.active_category {
        spans.push(Span::styled(
            format!("   Category: {category}"),
            Style::default().fg(Color::Cyan),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_status_bar(app: &PopupApp, f: &mut Frame, area: Rect) {
    let left = match &app.state.status_message {
        Some(message) => Span::styled(
            message.text.clone(),
            Style::default().fg(if message.is_error { Color::Red } else { Color::Green }),
        ),
        None => {
            let hint = match app.state.mode {
                PopupMode::Moving => "j/k:Move | Enter:Drop | Esc:Cancel",
                PopupMode::ConfirmDelete => "y:Delete | n:Keep",
                PopupMode::Help => "Any key:Close",
                _ if app.state.mode.is_text_input() => "Enter:Confirm | Esc:Cancel",
                _ => "Space:Pause/Resume | ←/→:Duration | p:Item | d:Delete | m:Move | ?:Help | q:Quit",
            };
            Span::styled(hint, Style::default().fg(Color::Cyan))
        }
    };
    let right = format!("v{}", env!("CARGO_PKG_VERSION"));

    let padding_width = (area.width as usize)
        .saturating_sub(left.content.width())
        .saturating_sub(right.width());
    let status_line = Line::from(vec![
        left,
        Span::raw(" ".repeat(padding_width)),
        Span::styled(right, Style::default().fg(Color::Yellow)),
    ]);
    f.render_widget(Paragraph::new(status_line), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: (area.width.saturating_sub(width)) / 2,
        y: (area.height.saturating_sub(height)) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn render_input_dialog(app: &PopupApp, f: &mut Frame, area: Rect) {
    let Some((title, prompt)) = app.state.mode.input_labels() else {
        return;
    };
    let has_error = app.state.input_error.is_some();
    let dialog_area = centered(area, 60, if has_error { 6 } else { 4 });

    let mut lines = vec![
        Line::from(prompt),
        Line::from(Span::styled(
            format!("{}█", app.state.input_buffer),
            Style::default().fg(Color::White),
        )),
    ];
    if let Some(error) = &app.state.input_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {title} "))
                .style(Style::default().bg(Color::Black)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, dialog_area);
    f.render_widget(paragraph, dialog_area);
}

fn render_confirm_delete(app: &PopupApp, f: &mut Frame, area: Rect) {
    let name = app
        .engine
        .view()
        .rows
        .get(app.state.selected)
        .map(|row| truncate_filename(&row.filename, 50))
        .unwrap_or_default();
    let dialog_area = centered(area, 60, 5);
    let paragraph = Paragraph::new(vec![
        Line::from(format!("Remove \"{name}\" from the queue?")),
        Line::from(""),
        Line::from(Span::styled(
            "y: delete   n: keep",
            Style::default().fg(Color::Yellow),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Confirm delete ")
            .border_style(Style::default().fg(Color::Red))
            .style(Style::default().bg(Color::Black)),
    );
    f.render_widget(Clear, dialog_area);
    f.render_widget(paragraph, dialog_area);
}

fn render_help(f: &mut Frame, area: Rect) {
    let keys = [
        ("j/k, ↓/↑", "Select item"),
        ("p", "Pause or resume the selected item"),
        ("d", "Delete the selected item"),
        ("m", "Move the selected item"),
        ("Space", "Pause or resume the queue"),
        ("←/→", "Choose pause duration"),
        ("s", "Set speed limit"),
        ("a", "Add a URL"),
        ("c", "Cycle category for added URLs"),
        ("Tab", "Switch profile"),
        ("r", "Refresh now"),
        ("q, Esc", "Quit"),
    ];
    let mut lines = vec![
        Line::from(Span::styled(
            "Keys",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(keys.iter().map(|(key, what)| {
        Line::from(vec![
            Span::styled(format!("  {key:<10}"), Style::default().fg(Color::Cyan)),
            Span::raw(*what),
        ])
    }));

    let dialog_area = centered(area, 56, lines.len() as u16 + 2);
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::default().bg(Color::Black)),
    );
    f.render_widget(Clear, dialog_area);
    f.render_widget(paragraph, dialog_area);
}

/// Truncate to a display width, keeping the extension where possible
fn truncate_filename(filename: &str, max_width: usize) -> String {
    if filename.width() <= max_width {
        return filename.to_string();
    }

    let take_width = |s: &str, target: usize| {
        let mut out = String::new();
        let mut width = 0;
        for ch in s.chars() {
            let w = ch.width().unwrap_or(1);
            if width + w > target {
                break;
            }
            out.push(ch);
            width += w;
        }
        out
    };

    if let Some(dot_pos) = filename.rfind('.') {
        let (name, ext) = filename.split_at(dot_pos);
        let ext_width = ext.width();
        if ext_width < 10 && ext_width + 3 < max_width {
            let target = max_width - ext_width - 3;
            return format!("{}...{}", take_width(name, target), ext);
        }
    }
    format!("{}...", take_width(filename, max_width.saturating_sub(3)))
}

fn format_progress_bar(percentage: u8, width: usize) -> String {
    let filled = (usize::from(percentage.min(100)) * width) / 100;
    let mut bar = String::with_capacity(width * 3);
    bar.extend(std::iter::repeat_n('█', filled));
    bar.extend(std::iter::repeat_n('░', width - filled));
    bar
}
