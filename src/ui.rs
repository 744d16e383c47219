pub mod history;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Screen, Tone};
use crate::celebration::Celebration;
use crate::drill::Phase;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

pub const TROPHY: [&str; 10] = [
    "  ___________  ",
    " '._==_==_=_.' ",
    " .-\\:      /-. ",
    "| (|:.     |) |",
    " '-|:.     |-' ",
    "   \\::.    /   ",
    "    '::. .'    ",
    "      ) (      ",
    "    _.' '._    ",
    "   '-------'   ",
];

const DRILL_LEGEND: &str =
    "(enter) submit  (tab) mode  (^r) repeat  (^s) speed  (^v) voice  (^t) history  (esc) quit";
const COMPLETE_LEGEND: &str = "(tab) other mode  (^t) history  (esc) quit";

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Info => Style::default().fg(Color::Cyan),
        Tone::Success => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        Tone::Warning => Style::default().fg(Color::Yellow),
        Tone::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Complete => render_complete(self, area, buf),
            _ => render_drill(self, area, buf),
        }

        if self.celebration.is_active() {
            render_celebration_particles(&self.celebration, area, buf);
        }
    }
}

fn render_tabs(app: &App, area: Rect, buf: &mut Buffer) {
    let titles: Vec<Line> = app
        .tabs()
        .iter()
        .map(|t| {
            let mastered = t.session.mastered_count();
            let total = t.session.records().len();
            Line::from(format!(" {} {}/{} ", t.mode, mastered, total))
        })
        .collect();
    let selected = app
        .tabs()
        .iter()
        .position(|t| t.mode == app.active_mode())
        .unwrap_or(0);

    Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .title(format!(" spelldrill: {} ", app.word_list_name())),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        )
        .render(area, buf);
}

fn status_line(app: &App) -> Line<'static> {
    let dim = Style::default().add_modifier(Modifier::DIM);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let streak = app.session().streak;

    let mut spans = vec![
        Span::styled("Level ", dim),
        Span::styled(app.tier().name.clone(), bold.fg(Color::Magenta)),
        Span::styled("   Streak ", dim),
        Span::styled(streak.to_string(), bold),
    ];
    if let Some((next, remaining)) = app.next_tier() {
        spans.push(Span::styled(
            format!(" ({} more to {})", remaining, next.name),
            dim,
        ));
    }
    spans.push(Span::styled("   Speed ", dim));
    spans.push(Span::styled(app.speed().to_string(), bold));
    spans.push(Span::styled("   Voice ", dim));
    spans.push(Span::styled(app.voice_name().to_string(), bold));
    Line::from(spans)
}

fn render_drill(app: &App, area: Rect, buf: &mut Buffer) {
    let feedback_lines = app.feedback.as_ref().map_or(0, |f| f.lines.len() as u16);
    let trophy_width = TROPHY.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
    let show_trophy = app.show_trophy()
        && area.width >= trophy_width + HORIZONTAL_MARGIN * 2
        && area.height >= 18 + TROPHY.len() as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),                     // tabs
            Constraint::Length(1),                     // level / speed / voice
            Constraint::Length(1),                     // padding
            Constraint::Length(1),                     // prompt
            Constraint::Length(2),                     // hint
            Constraint::Length(3),                     // answer box
            Constraint::Length(feedback_lines.max(1)), // feedback
            Constraint::Length(if show_trophy { TROPHY.len() as u16 } else { 0 }),
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    render_tabs(app, chunks[0], buf);
    Paragraph::new(status_line(app))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let italic = Style::default().add_modifier(Modifier::ITALIC);
    let prompt = match app.presentation().map(|p| p.phase()) {
        _ if app.continue_pending() => "Press Enter for the next word",
        _ if app.awaiting_speech() => "Listen carefully...",
        Some(Phase::Confirm) => "Type the word to continue",
        Some(Phase::Hinted { .. }) => "Type the word you heard, with the help of the hint",
        Some(_) => "Type the word you heard",
        None => "",
    };
    Paragraph::new(Span::styled(prompt, italic))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    if let Some(hint) = app.presentation().and_then(|p| p.hint()) {
        Paragraph::new(Span::styled(
            hint.to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .render(chunks[4], buf);
    }

    let answer_width = (app.input.width() as u16 + 6)
        .max(24)
        .min(chunks[5].width);
    let answer_area = Rect {
        x: chunks[5].x + (chunks[5].width - answer_width) / 2,
        width: answer_width,
        ..chunks[5]
    };
    Paragraph::new(Line::from(vec![
        Span::styled(
            app.input.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "_",
            Style::default().add_modifier(Modifier::SLOW_BLINK | Modifier::DIM),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title(" answer "))
    .render(answer_area, buf);

    if let Some(feedback) = &app.feedback {
        let style = tone_style(feedback.tone);
        let lines: Vec<Line> = feedback
            .lines
            .iter()
            .map(|l| Line::from(Span::styled(l.clone(), style)))
            .collect();
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[6], buf);
    }

    if show_trophy {
        let lines: Vec<Line> = TROPHY
            .iter()
            .map(|l| Line::from(Span::styled(*l, Style::default().fg(Color::Yellow))))
            .collect();
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(chunks[7], buf);
    }

    Paragraph::new(Span::styled(DRILL_LEGEND, italic))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(chunks[9], buf);
}

fn render_complete(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_tabs(app, chunks[0], buf);

    Paragraph::new(Span::styled(
        format!("Every word is mastered in {} mode!", app.active_mode()),
        Style::default()
            .fg(Color::Green)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    let tally = app.tally();
    Paragraph::new(Span::styled(
        format!(
            "{} presentations   {} correct   {} with hint   {} missed   best streak {}",
            tally.presentations,
            tally.correct,
            tally.hinted,
            tally.failed + tally.unspoken,
            tally.best_streak
        ),
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    let lines: Vec<Line> = app
        .session()
        .summary_lines()
        .into_iter()
        .map(Line::from)
        .collect();
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" words "))
        .wrap(Wrap { trim: false })
        .render(chunks[3], buf);

    Paragraph::new(Span::styled(
        COMPLETE_LEGEND,
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);
}

/// Render celebration particles on top of the current screen
fn render_celebration_particles(celebration: &Celebration, area: Rect, buf: &mut Buffer) {
    let colors = [
        Color::Yellow,
        Color::Magenta,
        Color::Cyan,
        Color::Green,
        Color::Red,
        Color::Blue,
        Color::LightYellow,
    ];

    for particle in &celebration.particles {
        if particle.x < 0.0 || particle.y < 0.0 {
            continue;
        }
        let x = particle.x as u16;
        let y = particle.y as u16;
        if x >= area.width || y >= area.height {
            continue;
        }

        let color = colors[particle.color_index % colors.len()];
        let alpha = 1.0 - (particle.age / particle.max_age);
        let style = if particle.is_letter() {
            if alpha > 0.4 {
                Style::default().fg(color).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(color)
            }
        } else if alpha > 0.7 {
            Style::default().fg(color).add_modifier(Modifier::BOLD)
        } else if alpha > 0.3 {
            Style::default().fg(color)
        } else {
            Style::default().fg(color).add_modifier(Modifier::DIM)
        };

        if let Some(cell) = buf.cell_mut((area.x + x, area.y + y)) {
            cell.set_symbol(&particle.symbol.to_string());
            cell.set_style(style);
        }
    }
}
