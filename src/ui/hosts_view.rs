use crate::app::{App, FocusTarget};
use crate::batcher::controller::Report;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

pub fn render(frame: &mut Frame, area: Rect, app: &App, report: &Report) {
    let highlight = app.focus() == FocusTarget::Hosts;
    let border_style = if highlight {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let mut items: Vec<ListItem> = Vec::new();
    for host in &report.hosts {
        let (status, status_style) = if !host.rooted {
            ("locked", Style::default().fg(Color::DarkGray))
        } else if host.usable_ram > 0.0 {
            ("rooted", Style::default().fg(Color::LightGreen))
        } else {
            ("full", Style::default().fg(Color::Yellow))
        };
        let line = Line::from(vec![
            Span::styled(
                format!("{:<18}", host.hostname),
                Style::default().fg(Color::LightCyan),
            ),
            Span::styled(format!("{status:<7}"), status_style),
            Span::raw(format!(
                "usable {:>8.2} GB | used {:>8.2}/{:<8.0}",
                host.usable_ram, host.used_ram, host.max_ram
            )),
        ]);
        items.push(ListItem::new(line));
    }
    if items.is_empty() {
        items.push(ListItem::new("No hosts discovered yet."));
    }

    let title = format!("Hosts ({:.2} GB usable)", report.available_ram);
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White))
        .highlight_symbol("▶ ");

    let mut state = ListState::default();
    if !report.hosts.is_empty() {
        let selection = app.selected_host.min(report.hosts.len() - 1);
        state.select(Some(selection));
    }
    frame.render_stateful_widget(list, area, &mut state);
}
