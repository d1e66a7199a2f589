use crate::audio::MediaEngine;
use crate::model::PlaybackState;
use crate::player::Player;
use crate::shell::Shell;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};

const APP_TITLE: &str = "Grinch";

const BG: Color = Color::Rgb(80, 80, 80);
const PANEL_BG: Color = Color::Rgb(50, 50, 50);
const SIDE_BG: Color = Color::Rgb(37, 37, 37);
const LIST_BG: Color = Color::Rgb(18, 18, 18);
const GAUGE_BG: Color = Color::Rgb(29, 29, 29);
const GAUGE_FG: Color = Color::Rgb(200, 200, 200);
const TEXT: Color = Color::White;
const MUTED: Color = Color::Rgb(170, 170, 170);
const ACCENT: Color = Color::Rgb(29, 185, 84);
const CLOSE: Color = Color::Rgb(255, 95, 86);
const MAXIMIZE: Color = Color::Rgb(39, 201, 63);
const MINIMIZE: Color = Color::Rgb(255, 189, 46);

pub fn draw(frame: &mut Frame, player: &Player, shell: &mut Shell, engine: &dyn MediaEngine) {
    frame.render_widget(Block::default().style(Style::default().bg(BG)), frame.area());

    let content_area = if shell.fullscreen {
        frame.area()
    } else {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(8)])
            .split(frame.area());
        draw_top_panel(frame, shell, vertical[0]);

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(20), Constraint::Min(20)])
            .split(vertical[1]);
        draw_side_panel(frame, player, engine, horizontal[0]);
        horizontal[1]
    };

    let content = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(content_area);

    draw_track_list(frame, player, shell, content[0]);
    draw_progress(frame, player, content[1]);
    draw_controls(frame, player, content[2]);
}

fn draw_top_panel(frame: &mut Frame, shell: &Shell, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MUTED))
        .style(Style::default().bg(PANEL_BG));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(8),
            Constraint::Min(6),
            Constraint::Length(24),
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(shell.clock(), Style::default().fg(TEXT))),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            APP_TITLE,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        chunks[1],
    );
    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("(m) _", Style::default().fg(MINIMIZE)),
            Span::raw("  "),
            Span::styled("(f) []", Style::default().fg(MAXIMIZE)),
            Span::raw("  "),
            Span::styled("(q) x", Style::default().fg(CLOSE)),
        ]))
        .alignment(Alignment::Right),
        chunks[2],
    );
}

fn draw_side_panel(frame: &mut Frame, player: &Player, engine: &dyn MediaEngine, area: Rect) {
    let output = engine
        .output_name()
        .unwrap_or_else(|| String::from("-"));
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Home ",
            Style::default().fg(Color::Black).bg(ACCENT),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " Settings ",
            Style::default().fg(Color::Black).bg(ACCENT),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!("Tracks  {}", player.catalog().len()),
            Style::default().fg(MUTED),
        )),
        Line::from(Span::styled(
            format!("State   {}", player.state().label()),
            Style::default().fg(MUTED),
        )),
        Line::from(Span::styled(output, Style::default().fg(MUTED))),
    ];

    frame.render_widget(
        Paragraph::new(lines).block(panel_block("", SIDE_BG)),
        area,
    );
}

fn draw_track_list(frame: &mut Frame, player: &Player, shell: &mut Shell, area: Rect) {
    shell.list_rect = area;

    let title = player.music_dir().display().to_string();
    if player.catalog().is_empty() {
        let placeholder = if player.is_loading() {
            "Loading tracks..."
        } else {
            "No tracks available"
        };
        frame.render_widget(
            Paragraph::new(Span::styled(placeholder, Style::default().fg(MUTED)))
                .block(panel_block(&title, LIST_BG)),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = player
        .catalog()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let marker = if player.current_index() == Some(idx) {
                if player.is_playing() { " > " } else { " = " }
            } else {
                "   "
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(ACCENT)),
                Span::styled(name.as_str(), Style::default().fg(TEXT)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(panel_block(&title, LIST_BG))
        .highlight_style(
            Style::default()
                .bg(Color::Rgb(45, 45, 45))
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, area, &mut shell.list_state);
}

fn draw_progress(frame: &mut Frame, player: &Player, area: Rect) {
    let block = panel_block("", PANEL_BG);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(8),
            Constraint::Min(4),
            Constraint::Length(8),
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            player.progress.current_label(),
            Style::default().fg(TEXT),
        )),
        chunks[0],
    );
    frame.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(GAUGE_FG).bg(GAUGE_BG))
            .ratio(player.progress.ratio())
            .label(""),
        chunks[1],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            player.progress.total_label(),
            Style::default().fg(TEXT),
        ))
        .alignment(Alignment::Right),
        chunks[2],
    );
}

fn draw_controls(frame: &mut Frame, player: &Player, area: Rect) {
    let play_pause = match player.state() {
        PlaybackState::Playing => "||",
        PlaybackState::Paused | PlaybackState::Empty => "|>",
    };
    let button = Style::default()
        .fg(Color::Black)
        .bg(ACCENT)
        .add_modifier(Modifier::BOLD);

    let line = Line::from(vec![
        Span::styled(" |<< ", button),
        Span::raw(" "),
        Span::styled(format!(" {play_pause} "), button),
        Span::raw(" "),
        Span::styled(" >>| ", button),
        Span::styled("   ", Style::default()),
        Span::styled(player.status.as_str(), Style::default().fg(TEXT)),
    ]);
    frame.render_widget(
        Paragraph::new(line).block(panel_block("", PANEL_BG)),
        area,
    );
}

fn panel_block(title: &str, bg: Color) -> Block<'_> {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(MUTED))
        .style(Style::default().bg(bg));
    if title.is_empty() {
        return block;
    }
    block.title(Span::styled(
        format!(" {title} "),
        Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullAudioEngine;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::path::Path;
    use time::UtcOffset;

    fn render(player: &Player, shell: &mut Shell) -> String {
        let engine = NullAudioEngine::new();
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).expect("terminal");
        terminal
            .draw(|frame| draw(frame, player, shell, &engine))
            .expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn empty_catalog_renders_placeholder() {
        let mut player = Player::new(Path::new("Music"));
        player.finish_loading(0);
        let mut shell = Shell::new(UtcOffset::UTC);

        let screen = render(&player, &mut shell);
        assert!(screen.contains("No tracks available"));
        assert!(screen.contains("00:00"));
    }

    #[test]
    fn fullscreen_hides_side_panel_and_widens_the_list() {
        let mut engine = NullAudioEngine::new();
        let mut player = Player::new(Path::new("Music"));
        player.push_track(String::from("first.mp3"), &mut engine);
        let mut shell = Shell::new(UtcOffset::UTC);

        let normal = render(&player, &mut shell);
        assert!(normal.contains("Settings"));
        assert!(normal.contains("first.mp3"));
        let normal_width = shell.list_rect.width;

        shell.toggle_fullscreen();
        let full = render(&player, &mut shell);
        assert!(!full.contains("Settings"));
        assert!(full.contains("first.mp3"));
        assert!(shell.list_rect.width > normal_width);
    }
}
