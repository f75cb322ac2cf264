use std::io::stdout;

use ratatui::crossterm::event::{
    KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::supports_keyboard_enhancement;
use ratatui::{DefaultTerminal, Frame};
use tracing::debug;

/// Raw-mode alternate screen for the lifetime of the value. Asks for key
/// release events where the terminal can report them.
pub struct Term {
    terminal: DefaultTerminal,
    reports_release: bool,
}

impl Term {
    pub fn init() -> anyhow::Result<Self> {
        let terminal = ratatui::try_init()?;
        let reports_release = matches!(supports_keyboard_enhancement(), Ok(true))
            && execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )
            .is_ok();
        debug!("key release events: {}", reports_release);

        // drop anything typed before we took over, e.g. the launching newline
        let _ = crate::input::poll_events();

        Ok(Self { terminal, reports_release })
    }

    pub fn reports_release(&self) -> bool {
        self.reports_release
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> anyhow::Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }
}

impl Drop for Term {
    fn drop(&mut self) {
        if self.reports_release {
            let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
        }
        ratatui::restore();
    }
}
