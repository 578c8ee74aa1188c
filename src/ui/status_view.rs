use crate::app::{App, FocusTarget};
use crate::batcher::batch::Slot;
use crate::batcher::controller::Report;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

pub fn render(frame: &mut Frame, area: Rect, app: &App, report: &Report) {
    let sections = Layout::vertical([Constraint::Length(10), Constraint::Min(3)]).split(area);
    let border_style = if app.focus() == FocusTarget::Status {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };

    let stats_block = Block::default()
        .title("Controller")
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_area = stats_block.inner(sections[0]);
    frame.render_widget(stats_block, sections[0]);

    let stats = &report.stats;
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Batches", Style::default().fg(Color::Yellow)),
            Span::raw(format!(": {}", stats.batches)),
            Span::raw("    Prep ops: "),
            Span::raw(format!("{}", stats.prep_operations)),
        ]),
        Line::from(vec![
            Span::styled("Skipped", Style::default().fg(Color::LightRed)),
            Span::raw(format!(": {}", stats.skipped_cycles)),
            Span::raw("    Switches: "),
            Span::raw(format!("{}", stats.target_switches)),
            Span::raw("    Resyncs: "),
            Span::raw(format!("{}", stats.resyncs)),
        ]),
    ];

    match &report.last_batch {
        Some(batch) => {
            lines.push(Line::from(vec![
                Span::raw("Last batch: "),
                Span::styled(format!("#{}", batch.id), Style::default().fg(Color::Cyan)),
                Span::raw(format!(" on {}", batch.target)),
            ]));
            for slot in Slot::ALL {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{:>3}", slot.label()),
                        Style::default().fg(Color::LightGreen),
                    ),
                    Span::raw(format!(
                        " x{:<6} delay {:>9.3}s  lands {:>9.3}s",
                        batch.threads.get(slot),
                        batch.delays.get(slot).as_secs_f64(),
                        batch.delays.landing(slot).as_secs_f64()
                    )),
                ]));
            }
        }
        None => lines.push(Line::from("No batch dispatched yet.")),
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, stats_area);

    let log_block = Block::default().title("Event Log").borders(Borders::ALL);
    let log_area = log_block.inner(sections[1]);
    frame.render_widget(log_block, sections[1]);

    let mut items: Vec<ListItem> = report
        .messages
        .iter()
        .map(|msg| ListItem::new(msg.clone()))
        .collect();
    if items.is_empty() {
        items.push(ListItem::new("No events yet."));
    }
    frame.render_widget(List::new(items), log_area);
}
