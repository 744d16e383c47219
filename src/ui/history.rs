use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::app::{App, HistorySort};
use crate::stats::WordSummary;

/// Cell texts of a history row: word, seen, success %, hinted, failed, last seen
fn row_text(summary: &WordSummary) -> [String; 6] {
    [
        summary.word.clone(),
        summary.presentations.to_string(),
        format!("{:.0}", summary.success_rate()),
        summary.hinted.to_string(),
        summary.failed.to_string(),
        summary
            .last_seen
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]
}

fn rate_color(rate: f64) -> Color {
    if rate >= 80.0 {
        Color::Green
    } else if rate >= 50.0 {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Pure presenter for a single word history row
pub fn present_row(summary: &WordSummary) -> Row<'static> {
    let failed_style = if summary.failed == 0 {
        Style::default()
    } else {
        Style::default().fg(Color::Red)
    };
    let [word, seen, rate, hinted, failed, last_seen] = row_text(summary);

    Row::new(vec![
        Cell::from(word).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(seen),
        Cell::from(rate).style(Style::default().fg(rate_color(summary.success_rate()))),
        Cell::from(hinted),
        Cell::from(failed).style(failed_style),
        Cell::from(last_seen),
    ])
}

fn indicator(active: bool, ascending: bool) -> &'static str {
    match (active, ascending) {
        (false, _) => "",
        (true, true) => "↑",
        (true, false) => "↓",
    }
}

/// Render the word history screen
pub fn render_history(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let state = &mut app.history;
    let ascending = state.sort_ascending;
    let sort_name = match state.sort_by {
        HistorySort::Word => "Word",
        HistorySort::Presentations => "Seen",
        HistorySort::SuccessRate => "Success",
        HistorySort::Failed => "Failed",
        HistorySort::LastSeen => "Last Seen",
    };
    let title = Paragraph::new(format!(
        "Word History (Sort: {} {})",
        sort_name,
        indicator(true, ascending)
    ))
    .block(Block::default().borders(Borders::ALL).title("History"))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if let Some(reason) = &state.unavailable {
        let msg = Paragraph::new(reason.clone())
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Red));
        f.render_widget(msg, chunks[1]);
    } else if state.rows.is_empty() {
        let no_data = Paragraph::new("No words practiced yet. Answer a few to build history.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let max_scroll = state.rows.len().saturating_sub(table_height);
        if state.scroll_offset > max_scroll {
            state.scroll_offset = max_scroll;
        }

        let sort_by = state.sort_by;
        let mark = |col: HistorySort| indicator(sort_by == col, ascending);
        let header = Row::new(vec![
            Cell::from(format!("Word {}", mark(HistorySort::Word))),
            Cell::from(format!("Seen {}", mark(HistorySort::Presentations))),
            Cell::from(format!("Success % {}", mark(HistorySort::SuccessRate))),
            Cell::from("Hinted"),
            Cell::from(format!("Failed {}", mark(HistorySort::Failed))),
            Cell::from(format!("Last Seen {}", mark(HistorySort::LastSeen))),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = state
            .sorted_rows()
            .into_iter()
            .skip(state.scroll_offset)
            .take(table_height)
            .map(present_row)
            .collect();

        let widths = [
            Constraint::Min(12),
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(18),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Words"))
            .column_spacing(2);
        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new(
        "(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (1-5) sort  (space) reverse  (b/esc) back",
    )
    .alignment(Alignment::Center)
    .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}
