//! Source pane rendering with syntax highlighting
//!
//! Displays either a scripting-language program or an algorithm's pseudocode,
//! with the line of the current record highlighted.
//!
//! # Highlighting
//!
//! A character tokenizer picks out comments (`#`, `//`, `/* */`), string
//! literals and keywords of both languages. Pseudocode type names end in `型`.

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn highlight_source_code(line: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut current_word = String::new();

    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    let flush = |word: &mut String, spans: &mut Vec<Span<'static>>, is_func: bool| {
        if !word.is_empty() {
            let style = get_keyword_style(word, is_func);
            spans.push(Span::styled(std::mem::take(word), style));
        }
    };

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        // Comments run to the end of the line
        if c == '#' || (c == '/' && matches!(next, Some('/' | '*'))) {
            flush(&mut current_word, &mut spans, false);
            spans.push(Span::styled(
                chars[i..].iter().collect::<String>(),
                Style::default().fg(DEFAULT_THEME.comment),
            ));
            break;
        }

        if c == '"' || c == '\'' {
            flush(&mut current_word, &mut spans, false);
            let mut end = i + 1;
            while end < chars.len() && chars[end] != c {
                if chars[end] == '\\' {
                    end += 2;
                } else {
                    end += 1;
                }
            }
            let end = (end + 1).min(chars.len());
            spans.push(Span::styled(
                chars[i..end].iter().collect::<String>(),
                Style::default().fg(DEFAULT_THEME.string),
            ));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            flush(&mut current_word, &mut spans, c == '(');
            let style = match c {
                '{' | '}' | '(' | ')' | '[' | ']' => Style::default().fg(DEFAULT_THEME.primary),
                '○' => Style::default().fg(DEFAULT_THEME.function),
                '←' => Style::default()
                    .fg(DEFAULT_THEME.keyword)
                    .add_modifier(Modifier::BOLD),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }
    flush(&mut current_word, &mut spans, false);

    Line::from(spans)
}

fn get_keyword_style(word: &str, is_function: bool) -> Style {
    match word {
        "def" | "return" | "if" | "elif" | "else" | "while" | "for" | "in" | "break"
        | "continue" | "pass" | "and" | "or" | "not" | "is" | "lambda" | "global"
        | "nonlocal" | "del" | "try" | "except" | "finally" | "raise" | "class" | "elseif"
        | "endif" | "endwhile" | "endfor" | "大域" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        "True" | "False" | "None" => Style::default().fg(DEFAULT_THEME.number),
        _ if word.ends_with('型') => Style::default().fg(DEFAULT_THEME.type_name),
        _ if word.chars().all(|c| c.is_ascii_digit()) => {
            Style::default().fg(DEFAULT_THEME.number)
        }
        _ if is_function => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

/// Scroll state for the source pane
#[derive(Debug, Default)]
pub struct SourceScrollState {
    pub offset: usize,
    /// Visual row the current line is pinned to; `None` until first render
    pub target_line_row: Option<usize>,
}

/// Render the source pane
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    lines: &[String],
    current_line: Option<usize>,
    is_error: bool,
    is_focused: bool,
    scroll_state: &mut SourceScrollState,
) {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    let block = Block::default()
        .title(" Source ")
        .borders(Borders::ALL)
        .border_style(border_style);

    let total_lines = lines.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    let target_row = scroll_state
        .target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_line_row = Some(target_row);

    // Keep the current line at the pinned row
    if let Some(line) = current_line.filter(|&l| l > 0 && l <= total_lines) {
        scroll_state.offset = (line - 1).saturating_sub(target_row);
        if total_lines > visible_height {
            scroll_state.offset = scroll_state.offset.min(total_lines - visible_height);
        } else {
            scroll_state.offset = 0;
        }
    }

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = current_line == Some(line_num);
            let line_num_str = format!("{:4} ", line_num);

            let (num_style, content_base_style) = match (is_current, is_error) {
                (true, true) => (
                    Style::default()
                        .fg(DEFAULT_THEME.error)
                        .add_modifier(Modifier::BOLD),
                    Style::default()
                        .bg(DEFAULT_THEME.error)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
                (true, false) => (
                    Style::default()
                        .fg(DEFAULT_THEME.secondary)
                        .add_modifier(Modifier::BOLD),
                    Style::default().bg(DEFAULT_THEME.current_line_bg),
                ),
                _ => (Style::default().fg(DEFAULT_THEME.comment), Style::default()),
            };

            let mut content_line = highlight_source_code(line);
            if is_current && is_error {
                for span in &mut content_line.spans {
                    span.style = content_base_style;
                }
            } else if is_current {
                for span in &mut content_line.spans {
                    span.style = span.style.patch(content_base_style);
                }
            }

            let mut final_spans = vec![Span::styled(line_num_str, num_style)];
            final_spans.extend(content_line.spans);
            Line::from(final_spans)
        })
        .collect();

    let paragraph = Paragraph::new(visible_lines).block(block);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_highlight_keeps_multibyte_text() {
        let line = highlight_source_code("　for (i を 1 から 8 まで 1 ずつ増やす) // コメント");
        assert_eq!(text(&line), "　for (i を 1 から 8 まで 1 ずつ増やす) // コメント");
    }

    #[test]
    fn test_keywords_are_bold() {
        let line = highlight_source_code("while x:");
        let first = &line.spans[0];
        assert_eq!(first.content, "while");
        assert!(first.style.add_modifier.contains(Modifier::BOLD));
    }
}
