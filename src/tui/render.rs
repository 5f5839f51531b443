//! TUI rendering logic

use crate::driver::LiveFrame;
use crate::tui::app::{App, CaptureTarget, Field, PromptKind, Tab};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Block, Borders, Chart, Clear, Dataset, GraphType, Paragraph, Tabs};
use ratatui::Frame;
use wheelmode_engine::{apply_curve, normalize_key_name};

/// Render the entire application UI
pub fn render(frame: &mut Frame, app: &App, live: &LiveFrame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tab bar
            Constraint::Min(10),   // Main content
            Constraint::Length(3), // Status bar
        ])
        .split(frame.area());

    render_tabs(frame, app, chunks[0]);
    match app.tab {
        Tab::Live => render_live_view(frame, app, live, chunks[1]),
        Tab::Settings => render_settings_view(frame, app, chunks[1]),
        Tab::ActionKeys => render_action_keys_view(frame, app, chunks[1]),
    }
    render_status_bar(frame, app, chunks[2]);

    if app.show_help {
        render_help_overlay(frame);
    }
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let selected = match app.tab {
        Tab::Live => 0,
        Tab::Settings => 1,
        Tab::ActionKeys => 2,
    };

    let tabs = Tabs::new(vec!["Live", "Settings", "Action Keys"])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" Wheelmode - profile: {} ", app.profile)),
        )
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    frame.render_widget(tabs, area);
}

/// Gauge and readout on the left, response curve on the right
fn render_live_view(frame: &mut Frame, app: &App, live: &LiveFrame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_axis_panel(frame, app, live, chunks[0]);
    render_curve(frame, app, live, chunks[1]);
}

fn render_axis_panel(frame: &mut Frame, app: &App, live: &LiveFrame, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Steering ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Gauge
            Constraint::Length(1),
            Constraint::Min(1), // Readout
        ])
        .split(inner);

    let cap = live.tick.map(|t| t.cap).unwrap_or(1.0);
    let color = if live.value > 0.0 {
        Color::Green
    } else if live.value < 0.0 {
        Color::Red
    } else {
        Color::DarkGray
    };
    render_bipolar_gauge(frame, live.value, cap, rows[0], color);

    let mut lines = vec![Line::from(format!("Value:  {:>+7.3}", live.value))];
    match live.tick {
        Some(tick) => {
            lines.push(Line::from(format!("Output: {:>+7.3}", tick.output)));
            lines.push(Line::from(format!("Sample: {:>7} (0x{:04x})", tick.sample, tick.sample)));
            lines.push(Line::from(format!("Lock:   {:>6.0}%", tick.cap * 100.0)));
            let mut state = Vec::new();
            if tick.fullsteer_active {
                state.push("fullsteer");
            }
            if tick.action_active {
                state.push("action key");
            }
            let state = if state.is_empty() {
                "steering".to_string()
            } else {
                state.join(", ")
            };
            lines.push(Line::from(format!("State:  {}", state)));
        }
        None => lines.push(Line::from(Span::styled(
            "Waiting for the first tick...",
            Style::default().fg(Color::DarkGray),
        ))),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(format!(
        "Keys: {} / {}",
        binding_label(&app.settings.bindings.steer_left),
        binding_label(&app.settings.bindings.steer_right)
    )));

    frame.render_widget(Paragraph::new(lines), rows[2]);
}

/// Bipolar gauge: center = 0, `¦` marks the current lock
fn render_bipolar_gauge(frame: &mut Frame, value: f64, cap: f64, area: Rect, color: Color) {
    let width = area.width as usize;
    if width < 3 {
        return;
    }

    let center = width / 2;
    let fill_width = ((value.abs().min(1.0) * center as f64) as usize).min(center);
    let cap_offset = ((cap.clamp(0.0, 1.0) * center as f64) as usize).min(center);

    let chars: Vec<Span> = (0..width)
        .map(|i| {
            if i == center {
                Span::styled("|", Style::default().fg(Color::White))
            } else if (value >= 0.0 && i > center && i <= center + fill_width)
                || (value < 0.0 && i < center && i >= center - fill_width)
            {
                Span::styled("=", Style::default().fg(color))
            } else if cap_offset < center && (i == center + cap_offset || i == center - cap_offset)
            {
                Span::styled("¦", Style::default().fg(Color::Yellow))
            } else {
                Span::styled("-", Style::default().fg(Color::DarkGray))
            }
        })
        .collect();

    frame.render_widget(Paragraph::new(Line::from(chars)), area);
}

/// Response curve with a vertical marker at the current value
fn render_curve(frame: &mut Frame, app: &App, live: &LiveFrame, area: Rect) {
    let linearity = app.curve.linearity();
    let marker = [(live.value, -1.0), (live.value, 1.0)];
    let output = apply_curve(live.value, linearity);

    let datasets = vec![
        Dataset::default()
            .name(format!("linearity {}", linearity))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Cyan))
            .data(app.curve.points()),
        Dataset::default()
            .name(format!("{:+.2} -> {:+.2}", live.value, output))
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Yellow))
            .data(&marker),
    ];

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(" Curve "))
        .x_axis(
            Axis::default()
                .title("value")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([-1.0, 1.0])
                .labels(["-1", "0", "1"]),
        )
        .y_axis(
            Axis::default()
                .title("output")
                .style(Style::default().fg(Color::DarkGray))
                .bounds([-1.0, 1.0])
                .labels(["-1", "0", "1"]),
        );

    frame.render_widget(chart, area);
}

fn render_settings_view(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Settings ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let capturing = app.capture.as_ref().and_then(|c| match c.target {
        CaptureTarget::Field(field) => Some(field),
        CaptureTarget::ActionKey(_) => None,
    });

    let lines: Vec<Line> = Field::ALL
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let selected = i == app.field_index;
            let marker = if selected { "> " } else { "  " };
            let value = if capturing == Some(*field) {
                "<press a key>".to_string()
            } else {
                field.value(&app.settings)
            };
            let style = if selected {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(format!("{}{:<38}", marker, field.label()), style),
                Span::styled(value, style),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_action_keys_view(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(format!(
        " Action Keys ({}/{}) ",
        app.settings.action_keys.len(),
        wheelmode_engine::MAX_ACTION_KEYS
    ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.settings.action_keys.is_empty() {
        let msg = Paragraph::new("No action keys. Press Insert to add one.")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(msg, inner);
        return;
    }

    let capturing = app.capture.as_ref().and_then(|c| match c.target {
        CaptureTarget::ActionKey(idx) => Some(idx),
        CaptureTarget::Field(_) => None,
    });

    let mut lines = vec![Line::from(Span::styled(
        "   #  Key              Lock",
        Style::default().fg(Color::DarkGray),
    ))];
    lines.extend(app.settings.action_keys.iter().enumerate().map(|(i, key)| {
        let selected = i == app.action_index;
        let marker = if selected { "> " } else { "  " };
        let binding = if capturing == Some(i) {
            "<press a key>".to_string()
        } else {
            binding_label(&key.binding)
        };
        let style = if selected {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        Line::from(Span::styled(
            format!("{}{:>2}  {:<16} {:>3}%", marker, i + 1, binding, key.cap_percentage),
            style,
        ))
    }));

    frame.render_widget(Paragraph::new(lines), inner);
}

fn binding_label(binding: &str) -> String {
    normalize_key_name(binding).unwrap_or_else(|| "Not Set".to_string())
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(prompt) = &app.prompt {
        let label = match prompt.kind {
            PromptKind::NewProfile => "New profile name: ",
            PromptKind::RenameProfile => "Rename profile to: ",
        };
        let line = Line::from(vec![
            Span::styled(label, Style::default().fg(Color::Yellow)),
            Span::raw(prompt.input.as_str()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]);
        frame.render_widget(Paragraph::new(line), inner);
        return;
    }

    let js_status = match &app.device_path {
        Some(path) => Span::styled(format!("Joy: {}", path), Style::default().fg(Color::Green)),
        None => Span::styled("Joy: Active", Style::default().fg(Color::Green)),
    };

    let kb_status = if app.has_capture_keyboard() {
        Span::styled("Capture: evdev", Style::default().fg(Color::Green))
    } else {
        Span::styled("Capture: terminal", Style::default().fg(Color::Yellow))
    };

    let mut spans = vec![
        Span::raw("["),
        js_status,
        Span::raw("] ["),
        kb_status,
        Span::raw("]"),
    ];
    match &app.status_message {
        Some(msg) => {
            spans.push(Span::raw(" "));
            spans.push(Span::raw(msg.as_str()));
        }
        None => {
            spans.push(Span::raw(" | "));
            spans.push(Span::styled(
                "? help | q quit | [ ] profile",
                Style::default().fg(Color::DarkGray),
            ));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect(60, 70, frame.area());

    let help_text = vec![
        Line::from("Keyboard Shortcuts"),
        Line::from(""),
        Line::from("Tab / 1-3    Switch tabs"),
        Line::from("Up/Down      Navigate"),
        Line::from("+/-          Adjust value (PgUp/PgDn: 10)"),
        Line::from("Space        Toggle snap to center"),
        Line::from("Enter        Bind key (Esc cancels)"),
        Line::from("Backspace    Unbind (Delete outside action keys)"),
        Line::from("Ins / Del    Add / delete action key"),
        Line::from("u / j        Move action key up / down"),
        Line::from("[ / ]        Previous / next profile"),
        Line::from("n / r        New / rename profile"),
        Line::from("L            Reload profile from disk"),
        Line::from("q            Quit"),
        Line::from("?            Toggle help"),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// Helper to create a centered rectangle
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
