//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, List, ListItem},
    style::{Color, Style, Modifier},
};
use super::app::DebuggerApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(60),
            Constraint::Percentage(40),
        ])
        .split(frame.area());

    // Left side: memory and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_memory(frame, left_chunks[0], app);
    draw_status(frame, left_chunks[1], app);

    // Right side: registers, output and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Min(4),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_registers(frame, right_chunks[0], app);
    draw_output(frame, right_chunks[1], app);
    draw_help(frame, right_chunks[2]);
}

/// Draw register and flag state.
fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.machine.regs;
    let value = |v: u8| Span::styled(format!("{:02x} ({:>3})", v, v), Style::default().fg(Color::White));

    let content = vec![
        Line::from(vec![Span::raw("A:   "), value(regs.a)]),
        Line::from(vec![Span::raw("B:   "), value(regs.b)]),
        Line::from(vec![
            Span::raw("PC:  "),
            Span::styled(format!("{:02x}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("   Flags: "),
            flag_span('Z', regs.flags.zero),
            flag_span('C', regs.flags.carry),
            flag_span('N', regs.flags.negative),
        ]),
        Line::from(vec![Span::raw("OUT: "), value(regs.out)]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", app.machine.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   State: "),
            if regs.halted {
                Span::styled("Halted", Style::default().fg(Color::Red))
            } else {
                Span::styled("Running", Style::default().fg(Color::Green))
            },
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw memory as rows of 16 bytes.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2);
    let start = app.mem_scroll;
    let end = (start + visible_rows).min(app.memory_rows());
    let pc = app.machine.regs.pc as usize;

    let items: Vec<ListItem> = (start..end)
        .map(|row| {
            let base = row * 16;
            let mut spans = vec![Span::styled(
                format!("{:02x}: ", base),
                Style::default().fg(Color::Cyan),
            )];

            for (addr, byte) in app.machine.mem.dump(base, 16) {
                let style = if addr == pc {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::REVERSED)
                } else if app.breakpoints.contains(&(addr as u8)) {
                    Style::default().fg(Color::Red)
                } else if byte != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!("{:02x}", byte), style));
                spans.push(Span::raw(" "));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(list, area);
}

/// Draw the values written to OUT, newest first.
fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let items: Vec<ListItem> = app.out_history
        .iter()
        .rev()
        .map(|v| ListItem::new(format!("{:02x} ({:>3})", v, v)))
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" OUT ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint"),
        Line::from("x: Reset  ↑↓: Scroll memory  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Letter when set, dash when clear.
fn flag_span(name: char, set: bool) -> Span<'static> {
    if set {
        Span::styled(name.to_string(), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("-", Style::default().fg(Color::Gray))
    }
}
