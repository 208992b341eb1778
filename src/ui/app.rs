//! Main TUI application state and logic

use crate::config::TraceConfig;
use crate::machine::Navigation;
use crate::sequencer::{BeginError, Readiness, TraceRequest, TraceSequencer};
use crate::snapshot::StepKind;
use crate::ui::panes::{self, SourceScrollState, StatusRenderData};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Variables,
    Output,
}

impl FocusedPane {
    /// Move focus to the next pane (source -> variables -> output)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Variables,
            FocusedPane::Variables => FocusedPane::Output,
            FocusedPane::Output => FocusedPane::Source,
        }
    }
}

/// The main application state
pub struct App {
    sequencer: TraceSequencer,

    /// Request the session was started from; `r` restarts it
    request: TraceRequest,
    config: TraceConfig,

    /// Program lines shown in the source pane
    lines: Vec<String>,

    pub focused_pane: FocusedPane,

    source_scroll: SourceScrollState,
    variables_scroll: usize,
    output_scroll: usize,

    pub should_quit: bool,
    pub status_message: String,

    pub is_playing: bool,
    last_play_time: Instant,
    /// Last time space was pressed (for debouncing)
    last_space_press: Instant,
}

impl App {
    /// Create an app over a sequencer whose session was started from `request`
    pub fn new(sequencer: TraceSequencer, request: TraceRequest, config: TraceConfig) -> Self {
        let lines = sequencer.program_lines();
        let status_message = Self::readiness_message(&sequencer);
        App {
            sequencer,
            request,
            config,
            lines,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState::default(),
            variables_scroll: 0,
            output_scroll: usize::MAX,
            should_quit: false,
            status_message,
            is_playing: false,
            last_play_time: Instant::now(),
            last_space_press: Instant::now()
                .checked_sub(Duration::from_secs(1))
                .unwrap_or_else(Instant::now),
        }
    }

    fn readiness_message(sequencer: &TraceSequencer) -> String {
        if sequencer.is_ready() {
            "Ready!".to_string()
        } else {
            format!(
                "Waiting for inputs: {} (press p for a preset)",
                sequencer.missing().join(", ")
            )
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_secs(1) {
                let before = self.sequencer.position();
                self.sequencer.advance();
                if self.sequencer.position() == before {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                } else {
                    self.status_message = "Playing...".to_string();
                    self.output_scroll = usize::MAX;
                }
                self.last_play_time = Instant::now();
            }

            // Poll with a timeout so auto-play keeps ticking
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[0]);

        // Right column: Variables (top) | Output (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(columns[1]);

        let record = self.sequencer.current();
        let previous = self
            .sequencer
            .trace()
            .zip(self.sequencer.position().checked_sub(1))
            .and_then(|(trace, index)| trace.get(index));

        panes::render_source_pane(
            frame,
            columns[0],
            &self.lines,
            record.and_then(|r| r.line),
            record.is_some_and(|r| r.kind == StepKind::Error),
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        panes::render_variables_pane(
            frame,
            right_rows[0],
            record.map(|r| &r.variables),
            previous.map(|r| &r.variables),
            self.focused_pane == FocusedPane::Variables,
            &mut self.variables_scroll,
        );

        panes::render_output_pane(
            frame,
            right_rows[1],
            record.map_or("", |r| r.output.as_str()),
            record
                .and_then(|r| r.error.as_ref())
                .map(|e| e.message.as_str()),
            self.focused_pane == FocusedPane::Output,
            &mut self.output_scroll,
        );

        let status = StatusRenderData {
            message: &self.status_message,
            position: self.sequencer.position(),
            total: self.sequencer.len(),
            kind: record.map(|r| r.kind),
            is_ready: self.sequencer.is_ready(),
            is_playing: self.is_playing,
            preset: self.sequencer.preset(),
            variant: self.sequencer.variant(),
        };
        panes::render_status_bar(frame, main_chunks[1], &status);
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Left => {
                self.is_playing = false;
                let before = self.sequencer.position();
                self.sequencer.retreat();
                self.status_message = if self.sequencer.position() != before {
                    "Stepped backward".to_string()
                } else if self.sequencer.navigation() == Navigation::ForwardOnly {
                    "This algorithm only steps forward".to_string()
                } else {
                    "Already at the first step".to_string()
                };
                self.output_scroll = usize::MAX;
            }
            KeyCode::Right => {
                self.is_playing = false;
                let before = self.sequencer.position();
                self.sequencer.advance();
                self.status_message = if self.sequencer.position() != before {
                    "Stepped forward".to_string()
                } else if !self.sequencer.is_ready() {
                    Self::readiness_message(&self.sequencer)
                } else {
                    "Already at the last step".to_string()
                };
                self.output_scroll = usize::MAX;
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => {
                    // Scrolling up makes the current line move down visually
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Variables => {
                    self.variables_scroll = self.variables_scroll.saturating_sub(1);
                }
                FocusedPane::Output => {
                    self.output_scroll = self.output_scroll.saturating_sub(1);
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Variables => {
                    self.variables_scroll = self.variables_scroll.saturating_add(1);
                }
                FocusedPane::Output => {
                    self.output_scroll = self.output_scroll.saturating_add(1);
                }
            },
            KeyCode::Char(' ') => {
                // 200ms debounce against key repeat
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing && self.sequencer.is_ready();
                    if self.is_playing {
                        self.last_play_time = Instant::now()
                            .checked_sub(Duration::from_secs(1))
                            .unwrap_or_else(Instant::now);
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.sequencer.jump_to_end();
                self.status_message = "Jumped to end".to_string();
                self.output_scroll = usize::MAX;
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                self.sequencer.jump_to_start();
                self.status_message = "Jumped to start".to_string();
                self.output_scroll = usize::MAX;
            }
            KeyCode::Char('p') => self.cycle_preset(),
            KeyCode::Char('v') => self.cycle_variant(),
            KeyCode::Char('r') => self.restart(),
            _ => {}
        }
    }

    fn cycle_preset(&mut self) {
        let Some(descriptor) = self.sequencer.descriptor() else {
            self.status_message = "Presets apply to algorithms only".to_string();
            return;
        };
        let labels: Vec<&'static str> = descriptor.presets.iter().map(|p| p.label).collect();
        let Some(label) = next_choice(&labels, self.sequencer.preset()) else {
            self.status_message = "This algorithm has no presets".to_string();
            return;
        };
        self.is_playing = false;
        let result = self.sequencer.select_preset(label);
        self.apply(result, format!("Preset {}", label));
    }

    fn cycle_variant(&mut self) {
        let Some(descriptor) = self.sequencer.descriptor() else {
            self.status_message = "Variants apply to algorithms only".to_string();
            return;
        };
        let ids: Vec<&'static str> = descriptor.variants.iter().map(|v| v.id).collect();
        let Some(id) = next_choice(&ids, self.sequencer.variant()) else {
            self.status_message = "This algorithm has no variants".to_string();
            return;
        };
        self.is_playing = false;
        let result = self.sequencer.select_variant(id);
        self.apply(result, format!("Variant {}", id));
    }

    /// Discard the session and start again from the original request
    fn restart(&mut self) {
        self.is_playing = false;
        self.sequencer.reset();
        let result = self.sequencer.begin(self.request.clone(), self.config);
        self.apply(result, "Reset".to_string());
    }

    fn apply(&mut self, result: Result<Readiness, BeginError>, done: String) {
        self.status_message = match result {
            Ok(Readiness::Ready) => done,
            Ok(Readiness::NotReady { .. }) => Self::readiness_message(&self.sequencer),
            Err(err) => format!("Error: {}", err),
        };
        self.lines = self.sequencer.program_lines();
        self.output_scroll = usize::MAX;
    }
}

/// Entry after `current` in `choices`, wrapping around
fn next_choice(choices: &[&'static str], current: Option<&str>) -> Option<&'static str> {
    let position = current.and_then(|c| choices.iter().position(|&choice| choice == c));
    match position {
        Some(i) => choices.get((i + 1) % choices.len()).copied(),
        None => choices.first().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_choice_wraps() {
        let choices = ["ア", "イ", "ウ"];
        assert_eq!(next_choice(&choices, None), Some("ア"));
        assert_eq!(next_choice(&choices, Some("イ")), Some("ウ"));
        assert_eq!(next_choice(&choices, Some("ウ")), Some("ア"));
        assert_eq!(next_choice(&[], Some("ア")), None);
    }

    #[test]
    fn test_focus_cycles_through_panes() {
        let focus = FocusedPane::Source.next().next().next();
        assert_eq!(focus, FocusedPane::Source);
    }
}
