//! Terminal dashboard
//!
//! Paints the speed bar chart, the lane table, one gauge per lane and a footer
//! with the last diagnostic line. Gauges clamp to 0..=100 for drawing only; the
//! label always shows the value the state holds.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use race_telemetry::{DashboardSnapshot, InputEvent, InputSource, Lane, Renderer};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{
    Bar, BarChart, BarGroup, Block, Borders, Cell, Gauge, Paragraph, Row, Table,
};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

const BANNER: &str = "Open LED Race!";

/// Renders snapshots on the real terminal
///
/// Raw mode and the alternate screen are entered on construction and
/// restored on drop.
pub struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalRenderer {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }

        match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => Ok(Self { terminal }),
            Err(e) => {
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                let _ = disable_raw_mode();
                Err(e)
            }
        }
    }
}

impl Drop for TerminalRenderer {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

impl Renderer for TerminalRenderer {
    fn draw(&mut self, snapshot: &DashboardSnapshot) -> race_telemetry::Result<()> {
        self.terminal.draw(|frame| render_dashboard(frame, snapshot))?;
        Ok(())
    }
}

/// Keyboard input; `q`, `Esc` and `Ctrl-C` quit
pub struct KeyboardInput;

impl InputSource for KeyboardInput {
    fn poll(&mut self, timeout: Duration) -> race_telemetry::Result<Option<InputEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(map_key(key))),
            _ => Ok(Some(InputEvent::Other)),
        }
    }
}

fn map_key(key: KeyEvent) -> InputEvent {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => InputEvent::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => InputEvent::Quit,
        _ => InputEvent::Other,
    }
}

fn lane_color(lane: Lane) -> Color {
    match lane {
        Lane::Red => Color::Red,
        Lane::Green => Color::Green,
        Lane::Yellow => Color::Yellow,
        Lane::Blue => Color::Blue,
    }
}

fn gauge_percent(position: i64) -> u16 {
    position.clamp(0, 100) as u16
}

/// Lay out and draw the whole dashboard
pub fn render_dashboard(frame: &mut Frame, snapshot: &DashboardSnapshot) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(15),
            Constraint::Min(7),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(29), Constraint::Min(30)])
        .split(rows[0]);

    render_speed_chart(frame, top[0], snapshot);
    render_gauges(frame, top[1], snapshot);
    render_table(frame, rows[1], snapshot);
    render_footer(frame, rows[2], snapshot);
}

fn render_speed_chart(frame: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let bars: Vec<Bar> = Lane::ALL
        .iter()
        .zip(&snapshot.lanes)
        .map(|(lane, state)| {
            let color = lane_color(*lane);
            Bar::default()
                .value(state.speed.max(0) as u64)
                .label(Line::from(lane.name()))
                .style(Style::default().fg(color))
                .value_style(Style::default().fg(Color::Black).bg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(Block::default().title("Speed").borders(Borders::ALL))
        .data(BarGroup::default().bars(&bars))
        .bar_width(5)
        .bar_gap(1)
        .label_style(Style::default().fg(Color::White));

    frame.render_widget(chart, area);
}

fn render_gauges(frame: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    for (i, (lane, state)) in Lane::ALL.iter().zip(&snapshot.lanes).enumerate() {
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title(format!("{} Gopher", lane.name()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::White)),
            )
            .gauge_style(Style::default().fg(lane_color(*lane)))
            .percent(gauge_percent(state.position))
            .label(format!("{}%", state.position));
        frame.render_widget(gauge, slots[i]);
    }

    let banner = Paragraph::new(BANNER)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(banner, slots[4]);
}

fn render_table(frame: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let header = Row::new(vec!["Gopher", "Lap", "Speed", "Position"]).style(
        Style::default()
            .fg(Color::White)
            .bg(Color::Black)
            .add_modifier(Modifier::BOLD),
    );

    let rows = Lane::ALL.iter().zip(&snapshot.lanes).map(|(lane, state)| {
        Row::new(vec![
            Cell::from(lane.name()).style(Style::default().fg(lane_color(*lane))),
            Cell::from(state.label.clone()),
            Cell::from(state.speed.to_string()),
            Cell::from(format!("{}%", state.position)),
        ])
    });

    let table = Table::new(rows, [Constraint::Percentage(25); 4])
        .header(header)
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        );

    frame.render_widget(table, area);
}

fn render_footer(frame: &mut Frame, area: Rect, snapshot: &DashboardSnapshot) {
    let updated = snapshot
        .last_update
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let stats = &snapshot.stats;

    let lines = vec![
        Line::from(format!("Last: {}", snapshot.diagnostic)),
        Line::from(format!(
            "Updated {} | datagrams {} | sentinels {} | skipped {} | discarded {} | rx errors {} | q to quit",
            updated,
            stats.datagrams,
            stats.sentinels,
            stats.skipped_segments,
            stats.discarded_records,
            stats.transport_errors
        )),
    ];

    let footer = Paragraph::new(lines).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use race_telemetry::{Decoder, SharedDashboard};
    use ratatui::backend::TestBackend;

    fn render_to_text(snapshot: &DashboardSnapshot) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 32)).unwrap();
        terminal
            .draw(|frame| render_dashboard(frame, snapshot))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_dashboard_layout() {
        let text = render_to_text(&SharedDashboard::new().snapshot());

        assert!(text.contains("Speed"));
        assert!(text.contains("Gopher"));
        assert!(text.contains("Red Gopher"));
        assert!(text.contains("Blue Gopher"));
        assert!(text.contains(BANNER));
        assert!(text.contains("never"));
    }

    #[test]
    fn test_dashboard_shows_lane_values() {
        let dashboard = SharedDashboard::new();
        dashboard.merge(&Decoder::new().decode(b"5,18,LAP1|10,1800,LAP2"));
        let text = render_to_text(&dashboard.snapshot());

        assert!(text.contains("LAP1"));
        assert!(text.contains("LAP2"));
        // Out-of-range positions are drawn full but labelled with the real value
        assert!(text.contains("200%"));
        assert!(text.contains("Last: 5,18,LAP1|10,1800,LAP2"));
    }

    #[test]
    fn test_gauge_percent_clamps() {
        assert_eq!(gauge_percent(-3), 0);
        assert_eq!(gauge_percent(55), 55);
        assert_eq!(gauge_percent(250), 100);
    }

    #[test]
    fn test_quit_keys() {
        let quit = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let plain_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::NONE);

        assert_eq!(map_key(quit), InputEvent::Quit);
        assert_eq!(map_key(esc), InputEvent::Quit);
        assert_eq!(map_key(ctrl_c), InputEvent::Quit);
        assert_eq!(map_key(plain_c), InputEvent::Other);
    }
}
