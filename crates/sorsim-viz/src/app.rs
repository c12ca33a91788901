//! The terminal dashboard: setup, event loop, rendering.

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};
use ratatui::{Frame, Terminal};

use crate::tail::LogTail;
use crate::view::ViewState;

/// Tail `log_path` and render until the user quits with `q` (or Esc).
pub fn run(log_path: impl AsRef<Path>, render_interval: Duration) -> Result<()> {
    let mut tail = LogTail::new(log_path);
    let mut view = ViewState::default();

    enable_raw_mode()?;
    io::stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    let result = event_loop(&mut terminal, &mut tail, &mut view, render_interval);

    disable_raw_mode()?;
    io::stdout().execute(LeaveAlternateScreen)?;
    result
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    tail: &mut LogTail,
    view: &mut ViewState,
    render_interval: Duration,
) -> Result<()> {
    loop {
        // A missing file just renders an empty dashboard until the director
        // creates it.
        if let Ok(records) = tail.poll() {
            for record in &records {
                view.apply(record);
            }
        }

        terminal.draw(|frame| render(frame, view))?;

        if event::poll(render_interval)? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    return Ok(());
                }
            }
        }
    }
}

fn render(frame: &mut Frame, view: &ViewState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .split(frame.size());

    render_header(frame, chunks[0], view);
    render_waiting_room(frame, chunks[1], view);
    render_counters(frame, chunks[2], view);
    render_events(frame, chunks[3], view);
}

fn render_header(frame: &mut Frame, area: Rect, view: &ViewState) {
    let status = if view.shutting_down {
        "SHUTTING DOWN"
    } else {
        "running"
    };
    let header = Paragraph::new(format!(
        "sim minute {}   desks: {}   status: {}   (q to quit)",
        view.sim_minute,
        view.desk_label(),
        status
    ))
    .block(Block::default().borders(Borders::ALL).title("SOR Monitor"));
    frame.render_widget(header, area);
}

fn render_waiting_room(frame: &mut Frame, area: Rect, view: &ViewState) {
    let metrics = &view.metrics;
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Waiting room"))
        .gauge_style(Style::default().fg(if view.occupancy_ratio() > 0.8 {
            Color::Red
        } else {
            Color::Cyan
        }))
        .ratio(view.occupancy_ratio().clamp(0.0, 1.0))
        .label(format!(
            "{}/{} inside   free seats {}",
            metrics.inside, metrics.capacity, metrics.wait_sem
        ));
    frame.render_widget(gauge, area);
}

fn render_counters(frame: &mut Frame, area: Rect, view: &ViewState) {
    let metrics = &view.metrics;
    let lines = vec![
        Line::from(format!(
            "queues   reg={}  triage={}  specialists={}",
            metrics.reg_queue, metrics.triage_queue, metrics.spec_queue
        )),
        Line::from(format!(
            "flow     arrived={}  registered={}  routed={}  handled={}  sentHome={}",
            view.arrivals, view.registered, view.routed, view.handled, view.sent_home_from_triage
        )),
    ];
    let counters =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Pipeline"));
    frame.render_widget(counters, area);
}

fn render_events(frame: &mut Frame, area: Rect, view: &ViewState) {
    let items: Vec<ListItem> = view
        .recent
        .iter()
        .map(|line| ListItem::new(line.clone()))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Recent events"))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD));
    frame.render_widget(list, area);
}
