use ratatui::Frame;

use crate::app::{App, Screen};
use crate::ui::history::render_history;

/// A UI view boundary: responsible for drawing one screen
pub trait View {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Drill and completion screens, drawn by the App widget
pub struct DrillView;

impl View for DrillView {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

pub struct HistoryView;

impl View for HistoryView {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_history(app, f);
    }
}

/// Helper to construct the appropriate view for the current screen
pub fn current_view(screen: Screen) -> Box<dyn View> {
    match screen {
        Screen::Drill | Screen::Complete => Box::new(DrillView),
        Screen::History => Box::new(HistoryView),
    }
}

/// Draw whatever the app is showing
pub fn draw(app: &mut App, f: &mut Frame) {
    let area = f.area();
    app.set_viewport(area.width, area.height);
    current_view(app.screen).render(app, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppSetup;
    use crate::config::Config;
    use crate::progress::FileProgressStore;
    use crate::stats::StatsDb;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use rand::{rngs::StdRng, SeedableRng};
    use ratatui::{backend::TestBackend, Terminal};
    use tempfile::tempdir;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn draws_drill_then_history() {
        let dir = tempdir().unwrap();
        let mut app = App::new(AppSetup {
            word_list: dir.path().join("birds.txt"),
            words: vec!["owl".into(), "emu".into()],
            config: Config::default(),
            voices: vec![],
            progress: Box::new(FileProgressStore::with_dir(dir.path())),
            stats: Some(StatsDb::open_in_memory().unwrap()),
            rng: StdRng::seed_from_u64(3),
        })
        .unwrap();
        app.start();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();
        assert!(screen_text(&terminal).contains("birds"));

        app.on_key(KeyEvent::new(KeyCode::Char('t'), KeyModifiers::CONTROL));
        terminal.draw(|f| draw(&mut app, f)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Word History"));
        assert!(text.contains("No words practiced yet"));
    }
}
