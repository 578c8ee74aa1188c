use crate::app::App;
use crate::batcher::controller::{Mode, Report};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub mod hosts_view;
pub mod status_view;

pub fn render(frame: &mut Frame, app: &App, report: &Report) {
    let size = frame.size();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(2),
        ])
        .split(size);

    render_header(frame, layout[0], report);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(layout[1]);

    hosts_view::render(frame, columns[0], app, report);
    status_view::render(frame, columns[1], app, report);

    render_footer(frame, layout[2]);
}

pub fn format_money(amount: f64) -> String {
    let (scaled, suffix) = match amount.abs() {
        a if a >= 1e12 => (amount / 1e12, "t"),
        a if a >= 1e9 => (amount / 1e9, "b"),
        a if a >= 1e6 => (amount / 1e6, "m"),
        a if a >= 1e3 => (amount / 1e3, "k"),
        _ => (amount, ""),
    };
    format!("${scaled:.2}{suffix}")
}

fn render_header(frame: &mut Frame, area: Rect, report: &Report) {
    let mode_style = match report.mode {
        Mode::Preparing => Style::default().fg(Color::Yellow),
        Mode::Exploiting => Style::default().fg(Color::LightGreen),
    };
    let oracle = report.oracle.map(|mode| mode.label()).unwrap_or("-");

    let mut spans = vec![
        Span::styled(
            "HWGW Batcher",
            Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw("  •  Mode: "),
        Span::styled(report.mode.label(), mode_style),
        Span::raw("  •  Oracle: "),
        Span::styled(oracle, Style::default().fg(Color::Magenta)),
    ];
    let detail = match &report.target {
        Some(target) => {
            spans.push(Span::raw("  •  Target: "));
            spans.push(Span::styled(
                target.hostname.clone(),
                Style::default().fg(Color::Cyan),
            ));
            format!(
                "Money {} / {}  •  Security {:.3} (min {:.3})",
                format_money(target.money_available),
                format_money(target.money_max),
                target.security_level,
                target.min_security
            )
        }
        None => "No target selected yet.".to_string(),
    };

    let lines = vec![Line::from(spans), Line::from(vec![Span::raw(detail)])];
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let instructions = Paragraph::new(Line::from(vec![
        Span::raw("Hotkeys: "),
        Span::styled("[J/K]", Style::default().fg(Color::Yellow)),
        Span::raw(" scroll hosts  •  "),
        Span::styled("[Tab]", Style::default().fg(Color::Yellow)),
        Span::raw(" switch focus  •  "),
        Span::styled("[Q]", Style::default().fg(Color::Yellow)),
        Span::raw(" quit"),
    ]))
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(instructions, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_uses_game_suffixes() {
        assert_eq!(format_money(950.0), "$950.00");
        assert_eq!(format_money(2_500_000.0), "$2.50m");
        assert_eq!(format_money(1.25e9), "$1.25b");
    }
}
