use hexa::{
    session::{HexColor, PowerUpKind, SessionState},
    stats::StatsDisplay,
    theme::{Rgb, Theme, TARGET_HIGHLIGHT, THEMES},
};
use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

use crate::{App, AppState, CellFlags, MenuItem};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

const CELL_WIDTH: u16 = 7;
const CELL_HEIGHT: u16 = 3;
const COLUMN_STEP: u16 = 8;
const ROW_STEP: u16 = 4;

/// Standard board: top, then clockwise around the ring, centre last
const FLOWER: [(u16, u16); 7] = [(8, 0), (16, 2), (16, 6), (8, 8), (0, 6), (0, 2), (8, 4)];

const PLAY_HINTS: [(&str, &str); 5] = [
    ("1-9", "pick"),
    ("←/→ enter", "cursor"),
    ("t s h", "power-ups"),
    ("r", "restart"),
    ("esc", "home"),
];

fn rgb((r, g, b): Rgb) -> Color {
    Color::Rgb(r, g, b)
}

/// Top-left corner of a cell relative to the board origin
pub fn cell_origin(index: usize, size: usize) -> (u16, u16) {
    if size == FLOWER.len() {
        return FLOWER[index];
    }
    let cols = columns(size);
    let (row, col) = ((index / cols) as u16, (index % cols) as u16);
    (col * COLUMN_STEP + (row % 2) * (COLUMN_STEP / 2), row * ROW_STEP)
}

fn columns(size: usize) -> usize {
    ((size as f64).sqrt().ceil() as usize).max(1)
}

/// Width and height the board needs
pub fn board_extent(size: usize) -> (u16, u16) {
    (0..size)
        .map(|i| cell_origin(i, size))
        .fold((0, 0), |(w, h), (x, y)| {
            (w.max(x + CELL_WIDTH), h.max(y + CELL_HEIGHT))
        })
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

pub fn draw(app: &App, f: &mut Frame) {
    match app.state {
        AppState::Home => render_home(app, f),
        AppState::Play => render_play(app, f),
        AppState::Stats => render_stats(&app.recorder.display(), f),
        AppState::Settings => render_settings(app, f),
        AppState::Help => render_help(f),
    }
}

fn render_home(app: &App, f: &mut Frame) {
    let area = centered(f.area(), 40, 14);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(MenuItem::ALL.len() as u16 + 2),
            Constraint::Min(1),
        ])
        .split(area);

    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            "⬢ H E X A ⬢",
            Style::default()
                .fg(rgb(app.theme.color(HexColor::Blue)))
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "find the cell before time runs out",
            Style::default().add_modifier(Modifier::DIM | Modifier::ITALIC),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let items: Vec<Line> = MenuItem::ALL
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if i == app.menu_selected {
                Line::from(Span::styled(
                    format!("▸ {}", item.label()),
                    Style::default()
                        .fg(rgb(app.theme.color(HexColor::Orange)))
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!("  {}", item.label()))
            }
        })
        .collect();
    let menu = Paragraph::new(items)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(menu, chunks[1]);

    let footer = Paragraph::new("↑/↓ move · enter open · q quit")
        .style(Style::default().add_modifier(Modifier::DIM))
        .alignment(Alignment::Center);
    f.render_widget(footer, chunks[2]);
}

/// A single hexagonal cell, three rows tall
struct HexCell<'a> {
    label: String,
    fill: Color,
    flags: &'a CellFlags,
    under_cursor: bool,
}

impl Widget for HexCell<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < CELL_WIDTH || area.height < CELL_HEIGHT {
            return;
        }
        // wobble left and right while shaking
        let x = match self.flags.shake {
            Some(left) if (left.as_millis() / 50) % 2 == 1 && area.x > 0 => area.x - 1,
            _ => area.x,
        };
        let y = area.y;

        let mut edge = Style::default().fg(self.fill);
        if self.flags.frozen {
            edge = edge.fg(Color::Cyan);
        }
        if self.under_cursor {
            edge = edge.add_modifier(Modifier::BOLD);
        }

        let mut face = Style::default()
            .bg(self.fill)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD);
        if self.flags.selected {
            face = face.bg(Color::White);
        }
        if self.under_cursor {
            face = face.add_modifier(Modifier::UNDERLINED);
        }

        let top = if self.under_cursor { " /▔▔▔\\ " } else { " /‾‾‾\\ " };
        buf.set_string(x, y, top, edge);
        buf.set_string(x, y + 1, "|", edge);
        buf.set_string(x + 1, y + 1, format!("{:^5}", self.label), face);
        buf.set_string(x + 6, y + 1, "|", edge);
        buf.set_string(x, y + 2, " \\___/ ", edge);
    }
}

/// Miniature of the board with the target filled in
struct PatternIndicator<'a> {
    state: &'a SessionState,
}

impl Widget for PatternIndicator<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let size = self.state.board_size();
        for (i, on) in self.state.pattern_indicator().into_iter().enumerate() {
            let (cx, cy) = cell_origin(i, size);
            let (x, y) = (area.x + cx / 4, area.y + cy / 2);
            if x >= area.right() || y >= area.bottom() {
                continue;
            }
            let (symbol, style) = if on {
                ("⬢", Style::default().fg(rgb(TARGET_HIGHLIGHT)))
            } else {
                ("⬡", Style::default().fg(Color::DarkGray))
            };
            buf.set_string(x, y, symbol, style);
        }
    }
}

fn indicator_extent(size: usize) -> (u16, u16) {
    let (w, h) = board_extent(size);
    (w / 4 + 1, h / 2 + 1)
}

fn render_play(app: &App, f: &mut Frame) {
    let Some(game) = app.game.as_ref() else {
        return;
    };
    let state = game.state();
    let size = state.board_size();
    let (board_w, board_h) = board_extent(size);
    let (ind_w, ind_h) = indicator_extent(size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1),       // time and score
            Constraint::Length(1),       // padding
            Constraint::Length(ind_h),   // pattern indicator
            Constraint::Length(1),       // padding
            Constraint::Min(board_h),    // board
            Constraint::Length(1),       // power-ups
            Constraint::Length(1),       // hints
        ])
        .split(f.area());

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let time_style = if state.time_remaining <= 5 {
        bold.fg(Color::Red)
    } else {
        bold
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled("⏱ ", time_style),
        Span::styled(state.time_remaining.max(0).to_string(), time_style),
        Span::raw("      "),
        Span::styled("★ ", bold),
        Span::styled(state.score.to_string(), bold),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(header, chunks[0]);

    f.render_widget(
        PatternIndicator { state },
        centered(chunks[2], ind_w, ind_h),
    );

    let board_area = centered(chunks[4], board_w, board_h);
    let default_flags = CellFlags::default();
    for (i, color) in state.board.iter().enumerate() {
        let (cx, cy) = cell_origin(i, size);
        let cell_area = Rect::new(board_area.x + cx, board_area.y + cy, CELL_WIDTH, CELL_HEIGHT)
            .intersection(f.area());
        let flags = app.board.flags.get(i).unwrap_or(&default_flags);
        let label = if flags.frozen {
            "❄".to_string()
        } else {
            (i + 1).to_string()
        };
        f.render_widget(
            HexCell {
                label,
                fill: rgb(app.theme.color(*color)),
                flags,
                under_cursor: i == app.board.cursor,
            },
            cell_area,
        );
    }

    f.render_widget(power_up_bar(state), chunks[5]);

    let hints = Paragraph::new(
        PLAY_HINTS
            .iter()
            .map(|(keys, what)| format!("{keys} {what}"))
            .join(" · "),
    )
    .style(Style::default().add_modifier(Modifier::DIM))
    .alignment(Alignment::Center);
    f.render_widget(hints, chunks[6]);

    if let Some(outcome) = app.last_outcome {
        let area = centered(f.area(), 34, 6);
        let summary = Paragraph::new(vec![
            Line::from(Span::styled("Game Over!", bold.fg(Color::Yellow))),
            Line::from(format!("Final Score: {}", outcome.score)),
            Line::from(Span::styled(
                "r play again · esc home",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
        f.render_widget(Clear, area);
        f.render_widget(summary, area);
    }
}

fn power_up_bar(state: &SessionState) -> Paragraph<'static> {
    let spans: Vec<Span> = PowerUpKind::ALL
        .iter()
        .flat_map(|&kind| {
            let count = state.power_ups.count(kind);
            let (key, label) = match kind {
                PowerUpKind::Time => ('t', "+10s"),
                PowerUpKind::Skip => ('s', "skip"),
                PowerUpKind::Thaw => ('h', "thaw"),
            };
            let style = if count == 0 {
                Style::default().add_modifier(Modifier::DIM | Modifier::CROSSED_OUT)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            [
                Span::styled(format!("[{key}] {label} ×{count}"), style),
                Span::raw("    "),
            ]
        })
        .collect();
    Paragraph::new(Line::from(spans)).alignment(Alignment::Center)
}

fn stat_card<'a>(title: &'a str, value: String) -> Paragraph<'a> {
    Paragraph::new(Span::styled(
        value,
        Style::default().add_modifier(Modifier::BOLD),
    ))
    .block(Block::default().borders(Borders::ALL).title(title))
    .alignment(Alignment::Center)
}

fn render_stats(display: &StatsDisplay, f: &mut Frame) {
    let area = centered(f.area(), 60, 12);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    let title = Paragraph::new(Span::styled(
        "Statistics",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center);
    f.render_widget(title, rows[0]);

    let cards = [
        ("Games Played", display.games_played.to_string()),
        ("High Score", display.high_score.to_string()),
        ("Total Score", display.total_score.to_string()),
        ("Win Rate", format!("{}%", display.win_rate_percent)),
        ("Best Time", display.best_time_formatted.clone()),
        ("Streak", display.current_streak.to_string()),
    ];
    for (row, chunk) in cards.chunks(3).zip([rows[1], rows[2]]) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3); 3])
            .split(chunk);
        for ((title, value), col) in row.iter().zip(cols.iter()) {
            f.render_widget(stat_card(title, value.clone()), *col);
        }
    }

    let footer = Paragraph::new("esc back")
        .style(Style::default().add_modifier(Modifier::DIM))
        .alignment(Alignment::Center);
    f.render_widget(footer, rows[4]);
}

fn theme_line(index: usize, selected: bool) -> Line<'static> {
    let theme = Theme::new(index);
    let mut spans = vec![Span::styled(
        format!("{} Theme {}  ", if selected { "◉" } else { "○" }, index + 1),
        if selected {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        },
    )];
    spans.extend(
        HexColor::ALL
            .iter()
            .map(|&c| Span::styled("██ ", Style::default().fg(rgb(theme.color(c))))),
    );
    Line::from(spans)
}

fn render_settings(app: &App, f: &mut Frame) {
    let area = centered(f.area(), 44, 12);
    let mut lines: Vec<Line> = (0..THEMES.len())
        .map(|i| theme_line(i, i == app.theme.index()))
        .collect();
    lines.push(Line::from(""));
    lines.push(if app.confirm_reset {
        Line::from(Span::styled(
            "press x again to erase all statistics",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from("x reset statistics")
    });
    lines.push(Line::from(Span::styled(
        "1-4 or ←/→ theme · esc back",
        Style::default().add_modifier(Modifier::DIM),
    )));

    let settings = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Settings"),
    );
    f.render_widget(settings, area);
}

fn render_help(f: &mut Frame) {
    let area = centered(f.area(), 60, 16);
    let text = vec![
        Line::from(Span::styled(
            "How to play",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("The small pattern above the board marks one cell. Pick the matching"),
        Line::from("cell on the board before the clock reaches zero."),
        Line::from(""),
        Line::from("  correct pick   +10 points, +2 seconds, new pattern"),
        Line::from("  wrong pick     -2 seconds"),
        Line::from(""),
        Line::from("  [t] +10s       adds ten seconds"),
        Line::from("  [s] skip       shows a new pattern right away"),
        Line::from("  [h] thaw       clears frozen cells"),
        Line::from(""),
        Line::from(Span::styled(
            "enter play · esc back",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];
    let help = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    f.render_widget(help, area);
}
