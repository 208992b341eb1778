//! Status bar rendering with keybindings and state indicators

use crate::snapshot::StepKind;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Everything the status bar shows
pub struct StatusRenderData<'a> {
    pub message: &'a str,
    pub position: usize,
    pub total: usize,
    pub kind: Option<StepKind>,
    pub is_ready: bool,
    pub is_playing: bool,
    pub preset: Option<&'a str>,
    pub variant: Option<&'a str>,
}

fn badge(text: String, bg: Color) -> Span<'static> {
    Span::styled(
        text,
        Style::default()
            .bg(bg)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
}

/// Render the status bar at the bottom.
pub fn render_status_bar(frame: &mut Frame, area: Rect, data: &StatusRenderData<'_>) {
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let step_text = if data.total == 0 {
        " Step -/- ".to_string()
    } else {
        format!(" Step {}/{} ", data.position + 1, data.total)
    };
    let is_error = data.kind == Some(StepKind::Error);
    let step_bg = if is_error {
        DEFAULT_THEME.error
    } else if !data.is_ready {
        DEFAULT_THEME.secondary
    } else {
        DEFAULT_THEME.primary
    };

    let bar = Style::default().bg(DEFAULT_THEME.current_line_bg);
    let mut left_spans = vec![
        badge(step_text, step_bg),
        Span::styled(" | ", bar.fg(DEFAULT_THEME.comment)),
    ];
    if let Some(preset) = data.preset {
        left_spans.push(Span::styled(format!("preset {} ", preset), bar.fg(DEFAULT_THEME.string)));
    }
    if let Some(variant) = data.variant {
        left_spans.push(Span::styled(
            format!("variant {} ", variant),
            bar.fg(DEFAULT_THEME.type_name),
        ));
    }
    left_spans.push(Span::styled(
        format!(" {} ", data.message),
        bar.fg(if is_error {
            DEFAULT_THEME.error
        } else {
            DEFAULT_THEME.fg
        }),
    ));

    let left_paragraph = Paragraph::new(Line::from(left_spans))
        .style(bar)
        .alignment(Alignment::Left);
    frame.render_widget(left_paragraph, layout[0]);

    let key_style = Style::default().bg(DEFAULT_THEME.comment).fg(Color::Black);
    let desc_style = bar.fg(DEFAULT_THEME.fg);
    let sep_style = bar.fg(DEFAULT_THEME.comment);

    let mut right_spans = Vec::new();
    for (i, (key, desc)) in [
        (" ←/→ ", " step "),
        (" ⎵ ", " play "),
        (" ↵ / ⌫ ", " end/start "),
        (" p/v ", " preset/variant "),
        (" r ", " reset "),
        (" q ", " quit "),
    ]
    .into_iter()
    .enumerate()
    {
        if i > 0 {
            right_spans.push(Span::styled("│", sep_style));
            right_spans.push(Span::styled(" ", desc_style));
        }
        right_spans.push(Span::styled(key, key_style));
        right_spans.push(Span::styled(desc, desc_style));
    }

    let indicator = if !data.is_ready {
        Some(badge(" WAITING ".to_string(), DEFAULT_THEME.secondary))
    } else if data.is_playing {
        Some(badge(" ▶ PLAYING ".to_string(), DEFAULT_THEME.secondary))
    } else if data.kind.is_some_and(StepKind::is_terminal) {
        Some(badge(" END ".to_string(), DEFAULT_THEME.error))
    } else if data.position == 0 {
        Some(badge(" START ".to_string(), DEFAULT_THEME.success))
    } else {
        None
    };
    if let Some(indicator) = indicator {
        right_spans.push(Span::styled("│", sep_style));
        right_spans.push(indicator);
    }

    let right_paragraph = Paragraph::new(Line::from(right_spans))
        .style(bar)
        .alignment(Alignment::Right);
    frame.render_widget(right_paragraph, layout[1]);
}
