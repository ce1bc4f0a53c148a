//! Screen rendering

use crate::app::{App, DAG_PAGE_SIZE, InputMode, LOG_PAGE_SIZE, LogFilter, LoginField, Screen};
use ratatui::{prelude::*, widgets::*};
use shared::models::DagRunState;
use shared::models::role::{can_view_dags, format_role};
use tui_logger::{TuiLoggerLevelOutput, TuiLoggerWidget};

pub fn draw(f: &mut Frame, app: &mut App) {
    match app.screen {
        Screen::Login => draw_login(f, app),
        _ => draw_workspace(f, app),
    }
}

fn draw_workspace(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(1),    // Content + log pane
            Constraint::Length(1), // Status line
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[1]);

    match app.screen {
        Screen::Runs => draw_runs(f, app, main[0]),
        Screen::TaskInstances => draw_instances(f, app, main[0]),
        Screen::TaskLog => draw_task_log(f, app, main[0]),
        Screen::ActionLogs => draw_action_logs(f, app, main[0]),
        _ => draw_dags(f, app, main[0]),
    }

    draw_log_pane(f, app, main[1]);
    draw_status_line(f, app, chunks[2]);
}

// ========== Login ==========

fn draw_login(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 14, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // Title
            Constraint::Length(3), // Server
            Constraint::Length(3), // Username
            Constraint::Length(3), // Password
            Constraint::Length(1), // Error
            Constraint::Length(1), // Hint
        ])
        .split(area);

    let title = Paragraph::new(Span::styled(
        "Flowdeck - Airflow Operations Console",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    draw_login_field(f, app, chunks[1], LoginField::Server, " Server URL ");
    draw_login_field(f, app, chunks[2], LoginField::Username, " Username ");
    draw_login_field(f, app, chunks[3], LoginField::Password, " Password ");

    if let Some(error) = &app.login_error {
        let line = Paragraph::new(Span::styled(
            error.as_str(),
            Style::default().fg(Color::Red),
        ))
        .alignment(Alignment::Center);
        f.render_widget(line, chunks[4]);
    }

    let hint = if app.logging_in {
        "Signing in..."
    } else {
        "Enter to sign in | Tab to switch fields | Esc to quit"
    };
    let hint_line = Paragraph::new(Span::styled(hint, Style::default().fg(Color::DarkGray)))
        .alignment(Alignment::Center);
    f.render_widget(hint_line, chunks[5]);
}

fn draw_login_field(f: &mut Frame, app: &App, area: Rect, field: LoginField, title: &str) {
    let input = match field {
        LoginField::Server => &app.server_input,
        LoginField::Username => &app.username_input,
        LoginField::Password => &app.password_input,
    };
    let focused = app.login_field == field;
    let style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };

    let masked;
    let value = if field == LoginField::Password {
        masked = "*".repeat(input.value().chars().count());
        masked.as_str()
    } else {
        input.value()
    };

    let width = area.width.max(3) - 3;
    let scroll = input.visual_scroll(width as usize);
    let paragraph = Paragraph::new(value)
        .style(style)
        .scroll((0, scroll as u16))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(paragraph, area);

    if focused {
        f.set_cursor_position((
            area.x + ((input.visual_cursor().max(scroll) - scroll) as u16) + 1,
            area.y + 1,
        ));
    }
}

// ========== Workspace Chrome ==========

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let screen_name = match app.screen {
        Screen::Login => "Login".to_string(),
        Screen::Dags => "DAGs".to_string(),
        Screen::Runs => format!("Runs of {}", app.selected_dag.as_deref().unwrap_or("-")),
        Screen::TaskInstances => format!(
            "Task instances of {}",
            app.selected_run.as_deref().unwrap_or("-")
        ),
        Screen::TaskLog => "Task log".to_string(),
        Screen::ActionLogs => "Audit log".to_string(),
    };

    let mut spans = vec![
        Span::styled(
            " Flowdeck ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("| "),
        Span::styled(screen_name, Style::default().fg(Color::Yellow)),
    ];
    if app.is_loading {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            " Loading... ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let title = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(title, area);
}

fn draw_log_pane(f: &mut Frame, app: &App, area: Rect) {
    let logs = TuiLoggerWidget::default()
        .block(
            Block::default()
                .title(" Logs ")
                .border_style(
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::DIM),
                )
                .borders(Borders::ALL),
        )
        .output_separator('|')
        .output_timestamp(Some("%H:%M:%S".to_string()))
        .output_level(Some(TuiLoggerLevelOutput::Abbreviated))
        .output_target(false)
        .output_file(false)
        .output_line(false)
        .style(Style::default().fg(Color::White))
        .state(&app.logger_state);
    f.render_widget(logs, area);
}

fn draw_status_line(f: &mut Frame, app: &App, area: Rect) {
    let user = app.session.username().unwrap_or_else(|| "-".to_string());
    let role = format_role(app.session.role());
    let mut spans = vec![
        Span::styled(
            format!(" {} ({}) ", user, role),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("| "),
        Span::styled(key_hints(app.screen), Style::default().fg(Color::DarkGray)),
    ];
    if let Some(status) = &app.status {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            status.as_str(),
            Style::default().fg(Color::Yellow),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn key_hints(screen: Screen) -> &'static str {
    match screen {
        Screen::Login => "Tab fields | Enter submit | Esc quit",
        Screen::Dags => {
            "j/k move | ◄/► page | / search | a/f filters | p pause | t trigger | D delete | i info | Enter runs | A audit | o logout | q quit"
        }
        Screen::Runs => {
            "j/k move | s state | t trigger | c clear | m/M/u mark | N note | D delete | e events | i info | Enter tasks | Esc back"
        }
        Screen::TaskInstances => "j/k move | s state | v log | i info | r refresh | Esc back",
        Screen::TaskLog => "j/k scroll | [/] try | r refresh | Esc back",
        Screen::ActionLogs => "j/k move | ◄/► page | t type | d dag | r refresh | Esc back",
    }
}

// ========== DAG List ==========

fn draw_dags(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let search_style = match app.input_mode {
        InputMode::Editing => Style::default().fg(Color::Yellow),
        InputMode::Normal => Style::default().fg(Color::Gray),
    };
    let width = chunks[0].width.max(3) - 3;
    let scroll = app.search_input.visual_scroll(width as usize);
    let search = Paragraph::new(app.search_input.value())
        .style(search_style)
        .scroll((0, scroll as u16))
        .block(Block::default().borders(Borders::ALL).title(" Search (/) "));
    f.render_widget(search, chunks[0]);
    if app.input_mode == InputMode::Editing {
        f.set_cursor_position((
            chunks[0].x + ((app.search_input.visual_cursor().max(scroll) - scroll) as u16) + 1,
            chunks[0].y + 1,
        ));
    }

    if !can_view_dags(app.session.role()) {
        let notice = Paragraph::new("Your role does not allow viewing DAGs.")
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL).title(" DAGs "));
        f.render_widget(notice, chunks[1]);
        return;
    }

    let rows: Vec<Row> = app
        .dags
        .iter()
        .map(|dag| {
            let state = if dag.is_paused {
                Span::styled("paused", Style::default().fg(Color::Yellow))
            } else if dag.is_active {
                Span::styled("active", Style::default().fg(Color::Green))
            } else {
                Span::styled("inactive", Style::default().fg(Color::DarkGray))
            };
            let tags = dag
                .tags
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(",");
            Row::new(vec![
                Cell::from(state),
                Cell::from(dag.dag_id.clone()),
                Cell::from(dag.schedule_summary()),
                Cell::from(dag.owners.join(",")),
                Cell::from(tags),
            ])
        })
        .collect();

    let title = format!(
        " DAGs ({} total, page {}/{}){} ",
        app.dag_total,
        app.dag_page + 1,
        page_count(app.dag_total, DAG_PAGE_SIZE),
        dag_filter_suffix(app),
    );
    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Percentage(35),
            Constraint::Percentage(25),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ],
    )
    .header(header_row(["State", "DAG", "Schedule", "Owners", "Tags"]))
    .block(Block::default().borders(Borders::ALL).title(title))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol(">> ");
    f.render_stateful_widget(table, chunks[1], &mut app.dag_table);
}

fn dag_filter_suffix(app: &App) -> String {
    let mut parts = Vec::new();
    let search = app.search_input.value().trim();
    if !search.is_empty() {
        parts.push(format!("search '{}'", search));
    }
    if let Some(active) = app.active_filter {
        parts.push(format!("active={}", active));
    }
    if let Some(paused) = app.paused_filter {
        parts.push(format!("paused={}", paused));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join(", "))
    }
}

// ========== Runs ==========

fn draw_runs(f: &mut Frame, app: &mut App, area: Rect) {
    let editing_note = app.input_mode == InputMode::Editing;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(if editing_note { 3 } else { 0 }),
            Constraint::Min(1),
        ])
        .split(area);

    if editing_note {
        let width = chunks[0].width.max(3) - 3;
        let scroll = app.note_input.visual_scroll(width as usize);
        let note = Paragraph::new(app.note_input.value())
            .style(Style::default().fg(Color::Yellow))
            .scroll((0, scroll as u16))
            .block(Block::default().borders(Borders::ALL).title(" Note "));
        f.render_widget(note, chunks[0]);
        f.set_cursor_position((
            chunks[0].x + ((app.note_input.visual_cursor().max(scroll) - scroll) as u16) + 1,
            chunks[0].y + 1,
        ));
    }

    let rows: Vec<Row> = app
        .runs
        .iter()
        .map(|run| {
            Row::new(vec![
                Cell::from(run.dag_run_id.clone()),
                Cell::from(run_state_span(run.state)),
                Cell::from(run.run_type.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(short_ts(run.start_date.as_deref())),
                Cell::from(short_ts(run.end_date.as_deref())),
                Cell::from(run.note.clone().unwrap_or_default()),
            ])
        })
        .collect();

    let filter = match app.run_state_filter {
        Some(state) => format!(", state={}", state),
        None => String::new(),
    };
    let title = format!(" Runs ({}{}) ", app.runs.len(), filter);
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(20),
            Constraint::Length(20),
            Constraint::Percentage(20),
        ],
    )
    .header(header_row(["Run", "State", "Type", "Started", "Ended", "Note"]))
    .block(Block::default().borders(Borders::ALL).title(title))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol(">> ");
    f.render_stateful_widget(table, chunks[1], &mut app.run_table);
}

// ========== Task Instances ==========

fn draw_instances(f: &mut Frame, app: &mut App, area: Rect) {
    let rows: Vec<Row> = app
        .instances
        .iter()
        .map(|instance| {
            Row::new(vec![
                Cell::from(instance.task_id.clone()),
                Cell::from(instance_state_span(instance.state.as_deref())),
                Cell::from(instance.try_number.unwrap_or(0).to_string()),
                Cell::from(
                    instance
                        .duration
                        .map_or("-".to_string(), |d| format!("{:.1}s", d)),
                ),
                Cell::from(instance.operator.clone().unwrap_or_else(|| "-".to_string())),
                Cell::from(instance.hostname.clone().unwrap_or_else(|| "-".to_string())),
            ])
        })
        .collect();

    let filter = match app.instance_state_filter {
        Some(state) => format!(", state={}", state),
        None => String::new(),
    };
    let title = format!(" Task Instances ({}{}) ", app.instances.len(), filter);
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(30),
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Length(9),
            Constraint::Percentage(25),
            Constraint::Percentage(20),
        ],
    )
    .header(header_row(["Task", "State", "Try", "Duration", "Operator", "Host"]))
    .block(Block::default().borders(Borders::ALL).title(title))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.instance_table);
}

// ========== Task Log ==========

fn draw_task_log(f: &mut Frame, app: &App, area: Rect) {
    let title = format!(
        " Task Log {} (try {}) ",
        app.task_log_task.as_deref().unwrap_or("-"),
        app.task_log_try
    );
    let log = Paragraph::new(app.task_log.as_str())
        .wrap(Wrap { trim: false })
        .scroll((app.task_log_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(log, area);
}

// ========== Audit Log ==========

fn draw_action_logs(f: &mut Frame, app: &mut App, area: Rect) {
    let rows: Vec<Row> = app
        .action_logs
        .iter()
        .map(|log| {
            let ok = if log.success {
                Span::styled("✓", Style::default().fg(Color::Green))
            } else {
                Span::styled("✗", Style::default().fg(Color::Red))
            };
            Row::new(vec![
                Cell::from(short_ts(Some(log.timestamp.as_str()))),
                Cell::from(log.username.clone()),
                Cell::from(log.dag_id.clone()),
                Cell::from(log.action_type.to_string()),
                Cell::from(ok),
                Cell::from(log.action_details.clone().unwrap_or_default()),
            ])
        })
        .collect();

    let title = match &app.log_filter {
        LogFilter::All => format!(
            " Audit Log ({} total, page {}/{}) ",
            app.log_total,
            app.log_page + 1,
            page_count(app.log_total, LOG_PAGE_SIZE),
        ),
        filter => format!(
            " Audit Log ({}, {} entries) ",
            filter.describe(),
            app.action_logs.len()
        ),
    };
    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Length(12),
            Constraint::Percentage(20),
            Constraint::Length(19),
            Constraint::Length(3),
            Constraint::Percentage(30),
        ],
    )
    .header(header_row(["Time", "User", "DAG", "Action", "OK", "Details"]))
    .block(Block::default().borders(Borders::ALL).title(title))
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol(">> ");
    f.render_stateful_widget(table, area, &mut app.log_table);
}

// ========== Helpers ==========

fn header_row<'a, const N: usize>(cells: [&'a str; N]) -> Row<'a> {
    Row::new(cells).style(Style::default().add_modifier(Modifier::BOLD))
}

fn run_state_span(state: Option<DagRunState>) -> Span<'static> {
    match state {
        Some(DagRunState::Success) => Span::styled("success", Style::default().fg(Color::Green)),
        Some(DagRunState::Failed) => Span::styled("failed", Style::default().fg(Color::Red)),
        Some(DagRunState::Running) => Span::styled("running", Style::default().fg(Color::Cyan)),
        Some(DagRunState::Queued) => Span::styled("queued", Style::default().fg(Color::Yellow)),
        Some(DagRunState::Unknown) | None => {
            Span::styled("unknown", Style::default().fg(Color::DarkGray))
        }
    }
}

fn instance_state_span(state: Option<&str>) -> Span<'static> {
    let color = match state {
        Some("success") => Color::Green,
        Some("failed") | Some("upstream_failed") => Color::Red,
        Some("running") => Color::Cyan,
        Some("queued") | Some("scheduled") | Some("up_for_retry") => Color::Yellow,
        _ => Color::DarkGray,
    };
    Span::styled(
        state.unwrap_or("none").to_string(),
        Style::default().fg(color),
    )
}

/// Seconds precision is enough for list views
fn short_ts(value: Option<&str>) -> String {
    match value {
        Some(ts) if !ts.is_empty() => ts.chars().take(19).collect(),
        _ => "-".to_string(),
    }
}

fn page_count(total: i64, size: u32) -> i64 {
    if total <= 0 {
        1
    } else {
        (total + i64::from(size) - 1) / i64::from(size)
    }
}

fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
    let width = width.min(r.width);
    let height = height.min(r.height);
    Rect {
        x: r.x + (r.width - width) / 2,
        y: r.y + (r.height - height) / 2,
        width,
        height,
    }
}
