//! Variables pane rendering
//!
//! Lists the bindings of the current record in declaration order. A binding
//! whose value differs from the previous record is highlighted. The
//! `callStack` list that recursive algorithms carry is expanded one frame per
//! row.

use crate::memory::{Environment, Value};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

fn value_style(value: &Value) -> Style {
    match value {
        Value::Unset => Style::default().fg(DEFAULT_THEME.comment),
        Value::Int(_) | Value::Real(_) | Value::Bool(_) | Value::Bits { .. } => {
            Style::default().fg(DEFAULT_THEME.number)
        }
        Value::Str(_) => Style::default().fg(DEFAULT_THEME.string),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

fn binding_line(name: &str, value: &Value, changed: bool) -> Line<'static> {
    let name_style = if changed {
        Style::default()
            .fg(DEFAULT_THEME.changed)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.fg)
    };
    Line::from(vec![
        Span::styled(name.to_string(), name_style),
        Span::styled(
            format!(": {} ", value.type_name()),
            Style::default().fg(DEFAULT_THEME.type_name),
        ),
        Span::styled("= ", Style::default().fg(DEFAULT_THEME.comment)),
        Span::styled(value.to_string(), value_style(value)),
    ])
}

fn frame_lines(frames: &[Value]) -> Vec<Line<'static>> {
    frames
        .iter()
        .enumerate()
        .rev()
        .map(|(depth, frame)| {
            let procedure = frame
                .field("procedure")
                .and_then(|p| p.as_str().map(str::to_string))
                .unwrap_or_default();
            let mut spans = vec![
                Span::styled(
                    format!("  #{} ", depth),
                    Style::default().fg(DEFAULT_THEME.comment),
                ),
                Span::styled(procedure, Style::default().fg(DEFAULT_THEME.function)),
            ];
            if let Value::Record(fields) = frame {
                for (name, value) in fields.iter().filter(|(n, _)| n.as_str() != "procedure") {
                    spans.push(Span::styled(
                        format!(" {}=", name),
                        Style::default().fg(DEFAULT_THEME.comment),
                    ));
                    spans.push(Span::styled(value.to_string(), value_style(value)));
                }
            }
            Line::from(spans)
        })
        .collect()
}

/// Render the variables pane
pub fn render_variables_pane(
    frame: &mut Frame,
    area: Rect,
    variables: Option<&Environment>,
    previous: Option<&Environment>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Variables ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let Some(variables) = variables.filter(|v| !v.is_empty()) else {
        let paragraph = Paragraph::new("(no variables)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    };

    let mut lines = Vec::new();
    for (name, value) in variables.iter() {
        let changed = previous.is_some_and(|prev| prev.get(name) != Some(value));
        match (name.as_str(), value) {
            ("callStack", Value::List(frames)) => {
                lines.push(Line::from(Span::styled(
                    format!("callStack ({} frames)", frames.len()),
                    Style::default().fg(DEFAULT_THEME.primary),
                )));
                lines.extend(frame_lines(frames));
            }
            _ => lines.push(binding_line(name, value, changed)),
        }
    }

    let total_items = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;
    if total_items > visible_height {
        *scroll_offset = (*scroll_offset).min(total_items - visible_height);
    } else {
        *scroll_offset = 0;
    }

    let items: Vec<ListItem> = lines
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .map(ListItem::new)
        .collect();

    let list = List::new(items).block(block.padding(Padding::new(1, 0, 0, 0)));
    frame.render_widget(list, area);
}
