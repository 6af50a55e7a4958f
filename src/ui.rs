use crate::app::{FolderPrompt, TerminalShell};
use crate::controller::PlaybackController;
use crate::engine::{MediaEngine, PreparedMedia};
use crate::model::PlayerStatus;
use crate::shell::SizeHint;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::time::Duration;

const APP_TITLE_WITH_VERSION: &str = "vfeed v0.1.0  ";

const BG: Color = Color::Rgb(10, 15, 24);
const PANEL_BG: Color = Color::Rgb(19, 29, 43);
const FRAME_BG: Color = Color::Rgb(4, 6, 10);
const BORDER: Color = Color::Rgb(69, 121, 176);
const TEXT: Color = Color::Rgb(214, 228, 248);
const MUTED: Color = Color::Rgb(149, 173, 204);
const ACCENT: Color = Color::Rgb(100, 203, 184);
const ALERT: Color = Color::Rgb(249, 174, 88);
const POPUP_BG: Color = Color::Rgb(22, 33, 51);

pub fn draw<E: MediaEngine>(
    frame: &mut Frame,
    controller: &PlaybackController<E, TerminalShell>,
    prompt: Option<&FolderPrompt>,
) {
    frame.render_widget(Block::default().style(Style::default().bg(BG)), frame.area());

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let playlist = controller.playlist();
    let position = controller
        .current_index()
        .map(|index| format!("{}/{}", index + 1, playlist.len()))
        .unwrap_or_else(|| format!("-/{}", playlist.len()));

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE_WITH_VERSION,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("Video {position}"), Style::default().fg(TEXT)),
        Span::styled("  |  ", Style::default().fg(MUTED)),
        Span::styled(
            format!("End {:?}", controller.settings().end_of_media),
            Style::default().fg(ALERT),
        ),
        Span::styled("  |  ", Style::default().fg(MUTED)),
        Span::styled(
            playlist.folder.display().to_string(),
            Style::default().fg(MUTED),
        ),
    ]))
    .block(panel_block("Feed", PANEL_BG, TEXT, BORDER));
    frame.render_widget(header, vertical[0]);

    draw_video_frame(frame, controller, vertical[1]);

    let elapsed_total = controller.current_media().and_then(|media| media.duration());
    let timeline = Paragraph::new(Span::styled(
        timeline_line(controller.position(), elapsed_total, 30),
        Style::default().fg(TEXT),
    ))
    .block(panel_block("Timeline", PANEL_BG, TEXT, BORDER))
    .wrap(Wrap { trim: true });
    frame.render_widget(timeline, vertical[2]);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            "Keys: Down/wheel next, Up previous, Space pause, Enter reveal, o open, m end mode, Esc quit",
            Style::default().fg(MUTED),
        ),
        Span::styled("  |  ", Style::default().fg(MUTED)),
        Span::styled(controller.status.as_str(), Style::default().fg(TEXT)),
    ]))
    .block(panel_block("Message", PANEL_BG, TEXT, BORDER));
    frame.render_widget(footer, vertical[3]);

    if let Some(prompt) = prompt {
        draw_folder_prompt(frame, prompt);
    }
}

fn draw_video_frame<E: MediaEngine>(
    frame: &mut Frame,
    controller: &PlaybackController<E, TerminalShell>,
    area: Rect,
) {
    let shell = controller.shell();
    let Some(hint) = shell.hint() else {
        let notice = shell.notice().unwrap_or("Nothing playing");
        let text = Paragraph::new(Span::styled(notice, Style::default().fg(ALERT)))
            .alignment(Alignment::Center)
            .block(panel_block("Video", PANEL_BG, TEXT, BORDER))
            .wrap(Wrap { trim: true });
        frame.render_widget(text, area);
        return;
    };

    let video_area = fit_rect(hint, area);
    let name = controller
        .current_path()
        .and_then(|path| path.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| String::from("-"));
    let status = match controller.player_status() {
        PlayerStatus::Playing => "PLAYING",
        PlayerStatus::Paused => "PAUSED",
        PlayerStatus::Stopped => controller.state().label(),
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            name,
            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(status, Style::default().fg(ACCENT))),
        Line::from(Span::styled(
            format!("{}x{}", hint.width, hint.height),
            Style::default().fg(MUTED),
        )),
    ];
    let video = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(panel_block("Video", FRAME_BG, TEXT, BORDER))
        .wrap(Wrap { trim: true });
    frame.render_widget(video, video_area);
}

fn draw_folder_prompt(frame: &mut Frame, prompt: &FolderPrompt) {
    let popup = centered_rect(frame.area(), 62, 30);
    frame.render_widget(Clear, popup);

    let mut lines = vec![
        Line::from(Span::styled("Folder", Style::default().fg(MUTED))),
        Line::from(Span::styled(
            format!("{}_", prompt.buffer),
            Style::default().fg(TEXT),
        )),
        Line::from(""),
    ];
    if let Some(error) = &prompt.error {
        lines.push(Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(ALERT),
        )));
    }
    lines.push(Line::from(Span::styled(
        "Enter open, Esc cancel",
        Style::default().fg(MUTED),
    )));

    let body = Paragraph::new(lines)
        .block(panel_block("Open video folder", POPUP_BG, TEXT, BORDER))
        .wrap(Wrap { trim: false });
    frame.render_widget(body, popup);
}

/// Largest rect inside `area` with the hint's aspect ratio, centered.
/// Terminal cells are taken to be twice as tall as they are wide.
pub fn fit_rect(hint: SizeHint, area: Rect) -> Rect {
    if hint.width == 0 || hint.height == 0 || area.width == 0 || area.height == 0 {
        return area;
    }

    let hint_width = u64::from(hint.width);
    let hint_height = u64::from(hint.height);
    let mut height = u64::from(area.height);
    let mut width = height * 2 * hint_width / hint_height;
    if width > u64::from(area.width) {
        width = u64::from(area.width);
        height = (width * hint_height / (2 * hint_width)).max(1);
    }
    let width = width.max(1) as u16;
    let height = height as u16;

    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn panel_block(title: &str, bg: Color, text: Color, border: Color) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(text).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(bg))
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}

fn timeline_line(position: Option<f32>, total: Option<Duration>, bar_width: usize) -> String {
    let ratio = position.map(|fraction| f64::from(fraction).clamp(0.0, 1.0));
    let elapsed = match (ratio, total) {
        (Some(ratio), Some(total)) => total.mul_f64(ratio),
        _ => Duration::ZERO,
    };

    format!(
        "{} / {} {}",
        format_duration(elapsed),
        total
            .map(format_duration)
            .unwrap_or_else(|| String::from("--:--")),
        progress_bar(ratio, bar_width),
    )
}
