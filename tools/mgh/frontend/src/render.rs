use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use mgh_core::{PlayState, SessionState, SUB_POSITIONS};

use crate::mux::PanelView;

/// The LED matrix and score as the shift registers show them, plus a status
/// line from the session.
pub struct PanelWidget<'a> {
    pub view: &'a PanelView,
    pub state: &'a SessionState,
    pub reference: u8,
    pub overruns: u32,
}

impl PanelWidget<'_> {
    /// One row per sub-position, furthest first, so notes fall toward the
    /// bottom row where they are due.
    pub fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = Vec::with_capacity(SUB_POSITIONS + 3);
        for row in 0..SUB_POSITIONS {
            let leds = self.view.lanes.map(|lane| {
                if lane & (1 << row) != 0 {
                    Span::styled("0 ", Style::new().fg(Color::Red).bold())
                } else {
                    Span::raw("_ ")
                }
            });
            lines.push(Line::from(leds.to_vec()));
        }

        let digit = |d: Option<u8>| d.map_or(' ', |d| char::from(b'0' + d));
        let [ones, tens, hundreds] = self.view.digits;
        lines.push(Line::from(format!("[{}{}{}]", digit(hundreds), digit(tens), digit(ones))));

        let play = match self.state.play_state {
            PlayState::Playing => "playing",
            PlayState::Stopped => "stopped",
        };
        let mut status = format!(
            "song {} {} score {} ref {}",
            self.state.song, play, self.state.score, self.reference
        );
        if self.overruns > 0 {
            status.push_str(&format!(" ({} mux overruns)", self.overruns));
        }
        lines.push(Line::from(status));
        lines.push(Line::from("space strum, n next, p play/pause, q quit").dim());
        lines
    }
}

impl Widget for PanelWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.lines())
            .block(Block::bordered().title(" mgh "))
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgh_core::{Score, SongIndex};

    fn state() -> SessionState {
        SessionState {
            song: SongIndex::new(2, 7).unwrap(),
            play_state: PlayState::Playing,
            frame_cursor: 10,
            score: Score::new(35),
        }
    }

    fn rows(widget: PanelWidget<'_>) -> Vec<String> {
        let area = Rect::new(0, 0, 50, 14);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        buf.content
            .chunks(area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect()
    }

    #[test]
    fn due_row_is_last() {
        let view = PanelView { lanes: [0x80, 0x01, 0x00, 0x81], digits: [Some(5), Some(3), Some(0)] };
        let state = state();
        let rows = rows(PanelWidget { view: &view, state: &state, reference: 178, overruns: 0 });

        // inside the border
        let inner = |y: usize| {
            rows[y + 1]
                .trim_start_matches('│')
                .trim_end_matches(|c: char| c == ' ' || c == '│')
                .to_string()
        };
        assert!(rows[0].contains(" mgh "));
        assert_eq!(inner(0), "_ 0 _ 0");
        assert_eq!(inner(3), "_ _ _ _");
        assert_eq!(inner(7), "0 _ _ 0");
        assert_eq!(inner(8), "[035]");
        assert_eq!(inner(9), "song 2 playing score 35 ref 178");
    }

    #[test]
    fn blank_digits_and_overruns() {
        let view = PanelView { lanes: [0; 4], digits: [None, Some(0), Some(0)] };
        let state = state();
        let text: Vec<String> = PanelWidget { view: &view, state: &state, reference: 0, overruns: 3 }
            .lines()
            .iter()
            .map(|line| line.to_string())
            .collect();
        assert_eq!(text[8], "[00 ]");
        assert!(text[9].ends_with("(3 mux overruns)"));
    }

    #[test]
    fn lit_leds_stand_out() {
        let view = PanelView { lanes: [0x01, 0, 0, 0], digits: [None; 3] };
        let state = state();
        let lines = PanelWidget { view: &view, state: &state, reference: 0, overruns: 0 }.lines();
        assert_eq!(lines[0].spans[0].style.fg, Some(Color::Red));
        assert_eq!(lines[0].spans[1].style.fg, None);
    }
}
