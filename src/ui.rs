use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use serde_json::Value;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::app::{App, InputMode, SessionState};
use crate::config::{commit_hash, environment_label};
use crate::detail::{
    DetailPanel, DetailTab, GroupPanel, PANEL_CLOSE_DELAY, Panel, PanelLoad, PanelPhase,
};
use crate::i18n::{Locale, Msg, tr};
use crate::manifest::{ManifestFormat, ManifestView};
use crate::menu::{MENU, MenuTarget};
use crate::model::{HealthStatus, SyncStatus, join_labels, or_unknown};
use crate::prefs::Theme;
use crate::toast::ToastLevel;
use crate::workload::{DialogMode, DialogState, PayloadFormat, RepoField, WorkloadDialog};

const SIDEBAR_WIDTH: u16 = 24;
const TOAST_WIDTH: u16 = 46;
const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

#[derive(Debug, Clone, Copy)]
struct Palette {
    bg: Color,
    panel: Color,
    text: Color,
    accent: Color,
    muted: Color,
    warn: Color,
    error: Color,
    selection: Color,
    key: Color,
    string: Color,
    number: Color,
    pl_a: Color,
    pl_b: Color,
    pl_c: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                bg: Color::Rgb(9, 15, 25),
                panel: Color::Rgb(16, 27, 44),
                text: Color::White,
                accent: Color::Rgb(52, 211, 153),
                muted: Color::Rgb(140, 156, 178),
                warn: Color::Rgb(251, 191, 36),
                error: Color::Rgb(248, 113, 113),
                selection: Color::Rgb(24, 36, 58),
                key: Color::Rgb(103, 232, 249),
                string: Color::Rgb(125, 211, 252),
                number: Color::Rgb(251, 146, 60),
                pl_a: Color::Rgb(17, 94, 89),
                pl_b: Color::Rgb(30, 64, 175),
                pl_c: Color::Rgb(55, 48, 163),
            },
            Theme::Light => Self {
                bg: Color::Rgb(241, 245, 249),
                panel: Color::Rgb(255, 255, 255),
                text: Color::Rgb(15, 23, 42),
                accent: Color::Rgb(5, 150, 105),
                muted: Color::Rgb(100, 116, 139),
                warn: Color::Rgb(180, 83, 9),
                error: Color::Rgb(185, 28, 28),
                selection: Color::Rgb(219, 234, 254),
                key: Color::Rgb(14, 116, 144),
                string: Color::Rgb(29, 78, 216),
                number: Color::Rgb(194, 65, 12),
                pl_a: Color::Rgb(13, 148, 136),
                pl_b: Color::Rgb(37, 99, 235),
                pl_c: Color::Rgb(79, 70, 229),
            },
        }
    }

    fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent)
        } else {
            Style::default().fg(self.muted)
        }
    }

    fn toast(&self, level: ToastLevel) -> (Color, &'static str) {
        match level {
            ToastLevel::Success => (self.accent, "󰄬"),
            ToastLevel::Error => (self.error, "󰅚"),
            ToastLevel::Warning => (self.warn, "󰀦"),
            ToastLevel::Loading => (self.pl_b, spinner_frame()),
        }
    }
}

pub fn render(frame: &mut Frame, app: &mut App) {
    let prefs = app.preferences();
    let palette = Palette::for_theme(prefs.theme);
    let locale = prefs.locale;

    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg)),
        frame.area(),
    );

    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app, &palette);
    render_body(frame, root[1], app, &palette, locale);
    render_footer(frame, root[2], app, &palette);

    if app.dialog().is_open() {
        render_dialog(frame, app.dialog(), &palette, locale);
    }
    if app.mode() == InputMode::Login {
        render_login(frame, app, &palette, locale);
    }
    if app.show_help() {
        render_help_modal(frame, app, &palette);
    }
    render_toasts(frame, app, &palette);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let locale = app.locale();
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " 󰒋 stellar-deck ", Color::White, palette.pl_a, palette.pl_b);
    push_powerline_segment(
        &mut spans,
        format!(" {} ", crate::menu::view_label(locale, app.view())),
        Color::White,
        palette.pl_b,
        palette.pl_c,
    );
    push_powerline_segment(
        &mut spans,
        format!(" 󰉖 {} ", compact_text(app.namespace(), 24)),
        Color::White,
        palette.pl_c,
        palette.bg,
    );

    let user = match app.session() {
        SessionState::Authenticated { username } => format!(" 󰀄 {username} "),
        SessionState::Checking => " 󰀄 … ".to_string(),
        SessionState::Public => " 󰀄 guest ".to_string(),
    };
    let prefs = app.preferences();
    let mut right = Vec::new();
    push_powerline_segment_rtl(&mut right, user, Color::White, palette.pl_c, palette.bg);
    push_powerline_segment_rtl(
        &mut right,
        format!(" {} {} ", theme_icon(prefs.theme), prefs.locale.code()),
        Color::White,
        palette.pl_b,
        palette.pl_c,
    );

    let right_width = spans_width(&right) as u16;
    if area.width < 42 || right_width >= area.width {
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bg)),
            area,
        );
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bg)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(right)).style(Style::default().bg(palette.bg)),
        chunks[1],
    );
}

fn render_body(frame: &mut Frame, area: Rect, app: &mut App, palette: &Palette, locale: Locale) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
        .split(area);

    render_sidebar(frame, chunks[0], app, palette, locale);

    let panel_open = app.panel().is_some();
    match app.overlay() {
        Some((title, body)) => render_overlay(frame, chunks[1], title, body, palette),
        None => render_table(frame, chunks[1], app, palette, locale, !panel_open),
    }

    if panel_open {
        render_panel(frame, chunks[1], app, palette, locale);
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App, palette: &Palette, locale: Locale) {
    let mut lines = Vec::new();
    let mut slot = 0usize;
    for group in MENU {
        lines.push(Line::from(Span::styled(
            tr(locale, group.title).to_uppercase(),
            Style::default()
                .fg(palette.muted)
                .add_modifier(Modifier::BOLD),
        )));
        for item in group.items {
            let label = tr(locale, item.label);
            let line = match item.target {
                MenuTarget::View(view) => {
                    slot += 1;
                    let active = view == app.view();
                    let style = if active {
                        Style::default()
                            .fg(palette.accent)
                            .bg(palette.selection)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(palette.text)
                    };
                    Line::from(vec![
                        Span::styled(if active { " ▌" } else { "  " }, style),
                        Span::styled(format!("{slot} {label}"), style),
                    ])
                }
                MenuTarget::CreateWorkload => Line::from(vec![
                    Span::raw("  "),
                    Span::styled("c ", Style::default().fg(palette.muted)),
                    Span::styled(label.to_string(), Style::default().fg(palette.text)),
                ]),
            };
            lines.push(line);
        }
        lines.push(Line::from(""));
    }

    let plugins = app.plugins();
    if !plugins.is_empty() {
        lines.push(Line::from(Span::styled(
            "PLUGINS",
            Style::default()
                .fg(palette.muted)
                .add_modifier(Modifier::BOLD),
        )));
        for plugin in plugins {
            let label = if plugin.description.is_empty() {
                plugin.id.clone()
            } else {
                plugin.description.clone()
            };
            lines.push(Line::from(Span::styled(
                format!("  {}", compact_text(&label, SIDEBAR_WIDTH as usize - 4)),
                Style::default().fg(palette.text),
            )));
        }
    }

    let sidebar = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(palette.border(false))
            .style(Style::default().bg(palette.panel)),
    );
    frame.render_widget(sidebar, area);
}

fn render_table(
    frame: &mut Frame,
    area: Rect,
    app: &App,
    palette: &Palette,
    locale: Locale,
    focused: bool,
) {
    let title = crate::menu::view_label(locale, app.view());
    let block = |title: String| {
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(palette.border(focused))
            .style(Style::default().bg(palette.panel))
    };

    let Some(table) = app
        .active_table()
        .filter(|table| table.last_refreshed.is_some())
    else {
        let waiting = if matches!(app.session(), SessionState::Public) {
            tr(locale, Msg::PublicNotice)
        } else {
            tr(locale, Msg::Loading)
        };
        frame.render_widget(
            Paragraph::new(waiting)
                .style(Style::default().fg(palette.muted))
                .block(block(title.to_string())),
            area,
        );
        return;
    };

    if let Some(error) = table.error.as_deref() {
        frame.render_widget(
            Paragraph::new(Text::from(error.to_string()))
                .wrap(Wrap { trim: false })
                .style(Style::default().fg(palette.error))
                .block(block(format!("{title} Error"))),
            area,
        );
        return;
    }

    let refreshed = table
        .last_refreshed
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_default();
    let title = format!("{title} ({})  󰑐 {refreshed}", table.rows.len());

    if table.rows.is_empty() {
        frame.render_widget(
            Paragraph::new(tr(locale, Msg::NoRows))
                .style(Style::default().fg(palette.muted))
                .block(block(title)),
            area,
        );
        return;
    }

    let header_row = Row::new(table.headers.iter().map(|header| {
        Cell::from(header.clone()).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(palette.accent));

    let rows = table.rows.iter().map(|row| {
        Row::new(
            row.columns
                .iter()
                .map(|column| Cell::from(column.clone()).style(Style::default().fg(palette.text))),
        )
    });

    let widget = Table::new(rows, column_constraints(table.headers.len()))
        .header(header_row)
        .block(block(title))
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(palette.selection)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("󰜴 ");

    let mut state = TableState::default();
    state.select(Some(table.selected));
    frame.render_stateful_widget(widget, area, &mut state);
}

fn render_overlay(frame: &mut Frame, area: Rect, title: &str, body: &str, palette: &Palette) {
    let paragraph = Paragraph::new(highlight_json_text(body, palette))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(format!("{title}  (Esc to close)"))
                .borders(Borders::ALL)
                .border_style(palette.border(true))
                .style(Style::default().bg(palette.panel)),
        );
    frame.render_widget(paragraph, area);
}

/// Width of the slide-in panel, shrinking while the close delay runs.
fn panel_area(area: Rect, phase: PanelPhase, now: Instant) -> Rect {
    let full = (area.width.saturating_mul(3) / 5).max(area.width.min(40));
    let width = match phase {
        PanelPhase::Open => full,
        PanelPhase::Closing { since } => {
            let elapsed = now.duration_since(since).as_millis();
            let total = PANEL_CLOSE_DELAY.as_millis().max(1);
            let remaining = total.saturating_sub(elapsed);
            ((u128::from(full) * remaining) / total) as u16
        }
    };
    Rect::new(
        area.x + area.width.saturating_sub(width),
        area.y,
        width,
        area.height,
    )
}

/// Line counts past `u16::MAX` saturate instead of wrapping.
fn max_scroll(line_count: usize, viewport: u16) -> u16 {
    u16::try_from(line_count)
        .unwrap_or(u16::MAX)
        .saturating_sub(viewport)
}

fn render_panel(frame: &mut Frame, body: Rect, app: &mut App, palette: &Palette, locale: Locale) {
    let Some(panel) = app.panel_mut() else {
        return;
    };
    let area = panel_area(body, panel.chrome().phase, Instant::now());
    panel.chrome_mut().area = Some(area);
    if area.width < 4 {
        return;
    }

    let (title, mut lines) = match &*panel {
        Panel::Detail(detail) => (panel.title(), detail_lines(detail, palette, locale)),
        Panel::Group(group) => (panel.title(), group_lines(group, palette, locale)),
    };

    let viewport = area.height.saturating_sub(2);
    let max_scroll = max_scroll(lines.len(), viewport);
    let chrome = panel.chrome_mut();
    chrome.scroll = chrome.scroll.min(max_scroll);
    let scroll = chrome.scroll;

    if lines.is_empty() {
        lines.push(Line::from(""));
    }
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(lines)
        .scroll((scroll, 0))
        .block(
            Block::default()
                .title(format!(" {title} "))
                .title_bottom(" Esc close  ]/[ tabs  m manifest  f format  S sync  D delete ")
                .borders(Borders::ALL)
                .border_style(palette.border(true))
                .style(Style::default().bg(palette.panel)),
        )
        .style(Style::default().fg(palette.text));
    frame.render_widget(paragraph, area);
}

fn status_badges(
    sync: SyncStatus,
    health: HealthStatus,
    palette: &Palette,
    locale: Locale,
) -> Line<'static> {
    let (sync_text, sync_color) = match sync {
        SyncStatus::Synced => (tr(locale, Msg::Synced), palette.accent),
        SyncStatus::OutOfSync => (tr(locale, Msg::OutOfSync), palette.warn),
    };
    let (health_text, health_color) = match health {
        HealthStatus::Healthy => (tr(locale, Msg::Healthy), palette.accent),
        HealthStatus::Degraded => (tr(locale, Msg::Degraded), palette.error),
    };
    Line::from(vec![
        Span::styled(
            format!("{}: ", tr(locale, Msg::Status)),
            Style::default().fg(palette.muted),
        ),
        Span::styled(
            sync_text,
            Style::default().fg(sync_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw("   "),
        Span::styled(
            format!("{}: ", tr(locale, Msg::Health)),
            Style::default().fg(palette.muted),
        ),
        Span::styled(
            health_text,
            Style::default().fg(health_color).add_modifier(Modifier::BOLD),
        ),
    ])
}

fn detail_lines(panel: &DetailPanel, palette: &Palette, locale: Locale) -> Vec<Line<'static>> {
    if panel.is_loading() {
        return vec![Line::from(Span::styled(
            format!("{} {}", spinner_frame(), tr(locale, Msg::Loading)),
            Style::default().fg(palette.muted),
        ))];
    }
    if let Some(error) = panel.error() {
        return vec![Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(palette.error),
        ))];
    }

    let mut lines = Vec::new();
    if let (Some(sync), Some(health)) = (panel.sync_status(), panel.health_status()) {
        lines.push(status_badges(sync, health, palette, locale));
    }
    lines.push(tab_line(
        DetailTab::ALL.iter().map(|tab| (tr(locale, tab.msg()), *tab == panel.tab)),
        palette,
    ));
    lines.push(Line::from(""));

    match panel.tab {
        DetailTab::Summary => {
            if let Some(resource) = panel.resource() {
                for row in resource.summary_rows(chrono::Utc::now()) {
                    lines.push(Line::from(vec![
                        Span::styled(
                            format!("{:<16}", row.label),
                            Style::default().fg(palette.muted),
                        ),
                        Span::styled(row.value, Style::default().fg(palette.text)),
                    ]));
                }
            }
            lines.push(Line::from(""));
            let mut header = vec![Span::styled(
                format!("{}  ", tr(locale, Msg::Manifest)),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            )];
            header.extend(
                tab_line(
                    ManifestView::ALL
                        .iter()
                        .map(|view| (tr(locale, manifest_view_msg(*view)), *view == panel.manifest_view)),
                    palette,
                )
                .spans,
            );
            header.push(Span::styled(
                format!("  [{}]", panel.manifest_format.label()),
                Style::default().fg(palette.muted),
            ));
            lines.push(Line::from(header));

            let manifest = panel.manifest_text();
            let highlighted = match (panel.manifest_view, panel.manifest_format) {
                (ManifestView::Diff, _) => Text::from(Span::styled(
                    manifest,
                    Style::default().fg(palette.muted),
                )),
                (_, ManifestFormat::Json) => highlight_json_text(&manifest, palette),
                (_, ManifestFormat::Yaml) => highlight_yaml_text(&manifest, palette),
            };
            lines.extend(highlighted.lines);
        }
        DetailTab::Events => lines.push(Line::from(Span::styled(
            tr(locale, Msg::EventsUnavailable),
            Style::default().fg(palette.muted),
        ))),
        DetailTab::Logs => lines.push(Line::from(Span::styled(
            tr(locale, Msg::LogsUnavailable),
            Style::default().fg(palette.muted),
        ))),
    }
    lines
}

fn group_lines(panel: &GroupPanel, palette: &Palette, locale: Locale) -> Vec<Line<'static>> {
    let Some(group) = panel.group() else {
        return match &panel.load {
            PanelLoad::Failed(error) => vec![Line::from(Span::styled(
                error.clone(),
                Style::default().fg(palette.error),
            ))],
            _ => vec![Line::from(Span::styled(
                format!("{} {}", spinner_frame(), tr(locale, Msg::Loading)),
                Style::default().fg(palette.muted),
            ))],
        };
    };

    let mut lines = vec![
        status_badges(group.sync_status(), group.health_status(), palette, locale),
        Line::from(vec![
            Span::styled(format!("{:<16}", "Phase"), Style::default().fg(palette.muted)),
            Span::raw(or_unknown(group.status.as_deref())),
        ]),
        Line::from(vec![
            Span::styled(format!("{:<16}", "Labels"), Style::default().fg(palette.muted)),
            Span::raw(join_labels(&group.labels)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            format!("{} ({})", tr(locale, Msg::Members), group.members.len()),
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD),
        )),
    ];

    if group.members.is_empty() {
        lines.push(Line::from(Span::styled(
            tr(locale, Msg::NoRows),
            Style::default().fg(palette.muted),
        )));
    }
    for (index, member) in group.members.iter().enumerate() {
        let selected = index == panel.selected;
        let marker = if selected { "󰜴 " } else { "  " };
        let style = if selected {
            Style::default()
                .bg(palette.selection)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let sync_color = match member.sync_status() {
            SyncStatus::Synced => palette.accent,
            SyncStatus::OutOfSync => palette.warn,
        };
        lines.push(Line::from(vec![
            Span::styled(marker, style.fg(palette.accent)),
            Span::styled(
                format!("{:<12} {:<28}", member.kind().name(), compact_text(&member.name(), 28)),
                style.fg(palette.text),
            ),
            Span::styled(member.sync_status().to_string(), style.fg(sync_color)),
        ]));
    }
    lines
}

fn manifest_view_msg(view: ManifestView) -> Msg {
    match view {
        ManifestView::Live => Msg::Live,
        ManifestView::Diff => Msg::Diff,
        ManifestView::Desired => Msg::Desired,
    }
}

fn tab_line<'a>(tabs: impl Iterator<Item = (&'a str, bool)>, palette: &Palette) -> Line<'static> {
    let mut spans = Vec::new();
    for (index, (label, active)) in tabs.enumerate() {
        if index > 0 {
            spans.push(Span::styled(" │ ", Style::default().fg(palette.muted)));
        }
        let style = if active {
            Style::default()
                .fg(palette.accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(palette.muted)
        };
        spans.push(Span::styled(label.to_string(), style));
    }
    Line::from(spans)
}

fn render_dialog(frame: &mut Frame, dialog: &WorkloadDialog, palette: &Palette, locale: Locale) {
    let area = centered_rect(72, 76, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        tab_line(
            [
                (tr(locale, Msg::Editor), dialog.mode == DialogMode::Editor),
                (tr(locale, Msg::Upload), dialog.mode == DialogMode::Upload),
                (tr(locale, Msg::Repository), dialog.mode == DialogMode::Repository),
            ]
            .into_iter(),
            palette,
        ),
        Line::from(""),
    ];

    match dialog.mode {
        DialogMode::Editor => {
            let (validity, color) = match dialog.validation_error() {
                None => (tr(locale, Msg::Valid).to_string(), palette.accent),
                Some(reason) => (format!("{}: {reason}", tr(locale, Msg::Invalid)), palette.error),
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("[{}] ", dialog.format.label()),
                    Style::default()
                        .fg(palette.accent)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(compact_text(&validity, 80), Style::default().fg(color)),
            ]));
            lines.push(Line::from(""));
            let editor = match dialog.format {
                PayloadFormat::Yaml => highlight_yaml_text(&dialog.content, palette),
                PayloadFormat::Json => highlight_json_lines(&dialog.content, palette),
            };
            lines.extend(editor.lines);
            push_cursor(&mut lines, dialog.content.ends_with('\n'), palette);
        }
        DialogMode::Upload => {
            lines.push(form_field(
                tr(locale, Msg::FilePath),
                &dialog.upload_path,
                true,
                palette,
            ));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "YAML or JSON file with metadata.name, metadata.namespace and one container port",
                Style::default().fg(palette.muted),
            )));
        }
        DialogMode::Repository => {
            for field in RepoField::ALL {
                let label = match field {
                    RepoField::RepoUrl => Msg::RepoUrl,
                    RepoField::FolderPath => Msg::FolderPath,
                    RepoField::Branch => Msg::Branch,
                    RepoField::WorkloadLabel => Msg::WorkloadLabel,
                };
                lines.push(form_field(
                    tr(locale, label),
                    dialog.repo.field(field),
                    dialog.repo.focus == field,
                    palette,
                ));
            }
        }
    }

    lines.push(Line::from(""));
    match &dialog.state {
        DialogState::Submitting => lines.push(Line::from(Span::styled(
            format!("{} {}…", spinner_frame(), tr(locale, Msg::Submitting)),
            Style::default().fg(palette.warn),
        ))),
        DialogState::Error(message) => lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(palette.error),
        ))),
        _ => {}
    }

    let hints = match dialog.mode {
        DialogMode::Editor => format!(
            " Tab YAML/JSON  F2 source  {}  Esc cancel ",
            tr(locale, Msg::Submit)
        ),
        DialogMode::Upload => format!(" F2 source  Enter/{}  Esc cancel ", tr(locale, Msg::Submit)),
        DialogMode::Repository => format!(
            " Tab next field  F2 source  Enter/{}  Esc cancel ",
            tr(locale, Msg::Submit)
        ),
    };
    let confirm_style = if dialog.can_submit() {
        palette.border(true)
    } else {
        palette.border(false)
    };

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(format!(" {} ", tr(locale, Msg::CreateWorkload)))
                .title_bottom(Line::from(hints).style(confirm_style))
                .borders(Borders::ALL)
                .border_style(palette.border(true))
                .style(Style::default().bg(palette.panel)),
        )
        .style(Style::default().fg(palette.text));
    frame.render_widget(modal, area);
}

fn form_field(label: &str, value: &str, focused: bool, palette: &Palette) -> Line<'static> {
    let value_style = if focused {
        Style::default()
            .fg(palette.text)
            .bg(palette.selection)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(palette.text)
    };
    let mut spans = vec![
        Span::styled(
            format!("{}{:<18}", if focused { "› " } else { "  " }, label),
            Style::default().fg(if focused { palette.accent } else { palette.muted }),
        ),
        Span::styled(value.to_string(), value_style),
    ];
    if focused {
        spans.push(Span::styled("▏", Style::default().fg(palette.accent)));
    }
    Line::from(spans)
}

fn push_cursor(lines: &mut Vec<Line<'static>>, new_line: bool, palette: &Palette) {
    let cursor = Span::styled("▏", Style::default().fg(palette.accent));
    match lines.last_mut() {
        Some(last) if !new_line => last.spans.push(cursor),
        _ => lines.push(Line::from(cursor)),
    }
}

fn render_login(frame: &mut Frame, app: &App, palette: &Palette, locale: Locale) {
    let area = centered_rect(50, 40, frame.area());
    frame.render_widget(Clear, area);
    let form = app.login_form();
    let masked = "•".repeat(form.password.chars().count());

    let mut lines = vec![
        Line::from(Span::styled(
            tr(locale, Msg::PublicNotice),
            Style::default().fg(palette.muted),
        )),
        Line::from(""),
        form_field(tr(locale, Msg::Username), &form.username, !form.password_focused, palette),
        form_field(tr(locale, Msg::Password), &masked, form.password_focused, palette),
        Line::from(""),
    ];
    if form.submitting {
        lines.push(Line::from(Span::styled(
            format!("{} {}", spinner_frame(), tr(locale, Msg::Loading)),
            Style::default().fg(palette.warn),
        )));
    } else if let Some(error) = form.error.as_deref() {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(palette.error),
        )));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(format!(" {} ", tr(locale, Msg::SignIn)))
                .title_bottom(" Tab switch field  Enter sign in  Ctrl+C quit ")
                .borders(Borders::ALL)
                .border_style(palette.border(true))
                .style(Style::default().bg(palette.panel)),
        )
        .style(Style::default().fg(palette.text));
    frame.render_widget(modal, area);
}

fn render_toasts(frame: &mut Frame, app: &App, palette: &Palette) {
    let screen = frame.area();
    if app.toasts().is_empty() || screen.width < TOAST_WIDTH + 2 {
        return;
    }
    let mut y = screen.y + 1;
    let x = screen.x + screen.width - TOAST_WIDTH - 1;
    for toast in app.toasts().visible() {
        let (color, icon) = palette.toast(toast.level);
        let text = format!("{icon} {}", toast.text);
        let inner_width = TOAST_WIDTH.saturating_sub(2) as usize;
        let wrapped = text.chars().count().div_ceil(inner_width.max(1));
        let height = u16::try_from(wrapped).unwrap_or(u16::MAX).clamp(1, 3) + 2;
        if y + height > screen.y + screen.height.saturating_sub(1) {
            break;
        }
        let area = Rect::new(x, y, TOAST_WIDTH, height);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(text)
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(palette.text))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color))
                        .style(Style::default().bg(palette.panel)),
                ),
            area,
        );
        y += height;
    }
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
    let mut spans = Vec::new();
    match app.mode() {
        InputMode::Command => {
            push_powerline_segment(&mut spans, " 󰘳 cmd ", Color::Black, palette.accent, palette.pl_b);
            push_powerline_segment(
                &mut spans,
                format!(" :{} ", app.input()),
                Color::White,
                palette.pl_b,
                palette.bg,
            );
            frame.render_widget(
                Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bg)),
                area,
            );
            return;
        }
        InputMode::Normal | InputMode::Dialog | InputMode::Login => {}
    }

    let pending = app.pending_confirmation_prompt();
    let status_text = pending.unwrap_or(app.status()).to_string();
    let (status_bg, status_fg) = if pending.is_some() {
        (palette.warn, Color::Black)
    } else {
        (palette.pl_b, Color::White)
    };
    let mode_label = match app.mode() {
        InputMode::Dialog => " 󰏫 edit ",
        InputMode::Login => " 󰌾 auth ",
        InputMode::Normal | InputMode::Command => " 󰘳 nrm ",
    };
    push_powerline_segment(&mut spans, mode_label, Color::White, palette.pl_a, status_bg);
    let width_hint = area.width.saturating_sub(40).max(24) as usize;
    push_powerline_segment(
        &mut spans,
        format!(
            " {} {} ",
            footer_status_icon(&status_text),
            compact_text(&status_text, width_hint)
        ),
        status_fg,
        status_bg,
        palette.bg,
    );

    let mut right = Vec::new();
    push_powerline_segment_rtl(
        &mut right,
        format!(" {} ", environment_label()),
        Color::White,
        palette.pl_c,
        palette.bg,
    );
    push_powerline_segment_rtl(
        &mut right,
        format!(" v{} {} ", env!("CARGO_PKG_VERSION"), commit_hash()),
        Color::White,
        palette.pl_a,
        palette.pl_c,
    );
    let right_width = (spans_width(&right) as u16).min(area.width.saturating_sub(28));
    if right_width == 0 || pending.is_some() {
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bg)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(palette.bg)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(right))
            .style(Style::default().bg(palette.bg))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn footer_status_icon(status_text: &str) -> &'static str {
    let status = status_text.to_ascii_lowercase();
    let has_failure = [
        "failed",
        "error",
        "timed out",
        "unreachable",
        "unavailable",
        "refused",
        "denied",
    ]
    .iter()
    .any(|needle| status.contains(needle));
    if has_failure { "󰅚" } else { "󰄬" }
}

fn render_help_modal(frame: &mut Frame, app: &App, palette: &Palette) {
    let area = centered_rect(70, 72, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "stellar-deck help  view:{}  namespace:{}",
            app.view().short_token(),
            app.namespace()
        )),
        Line::from(""),
    ];
    lines.extend(
        [
            "Views: 1 workloads  2 services  3 namespaces  4 clusters  h/l previous/next",
            "Rows: j/k move  g/G top/bottom  Ctrl+d/u page  Enter open  r refresh",
            "Panel: Esc or click outside closes  ]/[ tabs  m Live/Diff/Desired  f YAML/JSON",
            "Actions: S sync  D delete (y/n)  c create workload  t theme  L language",
            "Dialog: Tab format/next field  F2 editor/upload/repository  Ctrl+S apply",
            "",
            "Commands:",
            "  :wl :svc :ns :cl          switch view",
            "  :ns <name>                set namespace",
            "  :open <kind> <ns>/<name>  open a resource panel",
            "  :create                   open the workload dialog",
            "  :theme [dark|light]       switch theme",
            "  :lang <en|es|de>          switch language",
            "  :plugin <id>              show a plugin snapshot",
            "  :whoami  :logout  :q",
        ]
        .into_iter()
        .map(Line::from),
    );
    if !app.plugins().is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from("Plugins:"));
        for plugin in app.plugins() {
            lines.push(Line::from(format!("  {:<24} {}", plugin.id, plugin.description)));
        }
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(palette.border(true))
                .style(Style::default().bg(palette.panel)),
        )
        .style(Style::default().fg(palette.text));
    frame.render_widget(modal, area);
}

fn highlight_json_text(input: &str, palette: &Palette) -> Text<'static> {
    let pretty = serde_json::from_str::<Value>(input)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok())
        .unwrap_or_else(|| input.to_string());
    highlight_json_lines(&pretty, palette)
}

/// Highlights JSON as typed, without reformatting it.
fn highlight_json_lines(input: &str, palette: &Palette) -> Text<'static> {
    Text::from(
        input
            .lines()
            .map(|line| highlight_json_line(line, palette))
            .collect::<Vec<Line<'static>>>(),
    )
}

fn highlight_json_line(line: &str, palette: &Palette) -> Line<'static> {
    let chars = line.chars().collect::<Vec<_>>();
    let mut index = 0usize;
    let mut spans = Vec::new();

    while index < chars.len() {
        let ch = chars[index];
        if ch.is_ascii_whitespace() {
            spans.push(Span::raw(ch.to_string()));
            index += 1;
            continue;
        }

        if matches!(ch, '{' | '}' | '[' | ']' | ':' | ',') {
            spans.push(Span::styled(ch.to_string(), Style::default().fg(palette.muted)));
            index += 1;
            continue;
        }

        if ch == '"' {
            let (token, next_index) = read_json_string(&chars, index);
            let mut look_ahead = next_index;
            while look_ahead < chars.len() && chars[look_ahead].is_ascii_whitespace() {
                look_ahead += 1;
            }
            let color = if look_ahead < chars.len() && chars[look_ahead] == ':' {
                palette.key
            } else {
                palette.string
            };
            spans.push(Span::styled(token, Style::default().fg(color)));
            index = next_index;
            continue;
        }

        if ch.is_ascii_digit() || ch == '-' {
            let start = index;
            while index < chars.len()
                && (chars[index].is_ascii_digit()
                    || matches!(chars[index], '-' | '+' | '.' | 'e' | 'E'))
            {
                index += 1;
            }
            spans.push(Span::styled(
                chars[start..index].iter().collect::<String>(),
                Style::default().fg(palette.number),
            ));
            continue;
        }

        if chars[index..].starts_with(&['t', 'r', 'u', 'e'])
            || chars[index..].starts_with(&['f', 'a', 'l', 's', 'e'])
            || chars[index..].starts_with(&['n', 'u', 'l', 'l'])
        {
            let start = index;
            while index < chars.len() && chars[index].is_ascii_alphabetic() {
                index += 1;
            }
            spans.push(Span::styled(
                chars[start..index].iter().collect::<String>(),
                Style::default().fg(palette.warn),
            ));
            continue;
        }

        spans.push(Span::styled(ch.to_string(), Style::default().fg(palette.text)));
        index += 1;
    }

    Line::from(spans)
}

fn read_json_string(chars: &[char], start: usize) -> (String, usize) {
    let mut index = start;
    let mut escaped = false;
    let mut token = String::new();
    while index < chars.len() {
        let ch = chars[index];
        token.push(ch);
        if index > start {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                return (token, index + 1);
            }
        }
        index += 1;
    }
    (token, chars.len())
}

fn highlight_yaml_text(input: &str, palette: &Palette) -> Text<'static> {
    Text::from(
        input
            .lines()
            .map(|line| highlight_yaml_line(line, palette))
            .collect::<Vec<Line<'static>>>(),
    )
}

fn highlight_yaml_line(line: &str, palette: &Palette) -> Line<'static> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ' || **byte == b'\t')
        .count();
    let indent = &line[..indent_len];
    let trimmed = &line[indent_len..];

    let mut spans = vec![Span::raw(indent.to_string())];
    if trimmed.is_empty() {
        return Line::from(spans);
    }

    if trimmed.starts_with('#') {
        spans.push(Span::styled(trimmed.to_string(), Style::default().fg(palette.muted)));
        return Line::from(spans);
    }

    if let Some(rest) = trimmed.strip_prefix("- ") {
        spans.push(Span::styled("- ", Style::default().fg(palette.accent)));
        spans.extend(highlight_yaml_content(rest, palette));
        return Line::from(spans);
    }

    spans.extend(highlight_yaml_content(trimmed, palette));
    Line::from(spans)
}

fn highlight_yaml_content(content: &str, palette: &Palette) -> Vec<Span<'static>> {
    let Some((key, value)) = split_yaml_key_value(content) else {
        return vec![Span::styled(
            content.to_string(),
            Style::default().fg(palette.text),
        )];
    };

    let mut spans = vec![
        Span::styled(key.to_string(), Style::default().fg(palette.key)),
        Span::styled(":", Style::default().fg(palette.muted)),
    ];
    if value.trim().is_empty() {
        return spans;
    }
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        value.trim_start().to_string(),
        Style::default().fg(yaml_value_color(value.trim(), palette)),
    ));
    spans
}

fn split_yaml_key_value(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    Some((key, value))
}

fn yaml_value_color(value: &str, palette: &Palette) -> Color {
    if value.starts_with('"') || value.starts_with('\'') {
        palette.string
    } else if matches!(value, "true" | "false" | "null" | "~") {
        palette.warn
    } else if value.parse::<f64>().is_ok() {
        palette.number
    } else if value.starts_with('{') || value.starts_with('[') {
        palette.muted
    } else {
        palette.text
    }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn push_powerline_segment_rtl(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
}

fn theme_icon(theme: Theme) -> &'static str {
    match theme {
        Theme::Dark => "󰖔",
        Theme::Light => "󰖨",
    }
}

fn spinner_frame() -> &'static str {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    SPINNER[(millis / 150) as usize % SPINNER.len()]
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn column_constraints(columns: usize) -> Vec<Constraint> {
    if columns == 0 {
        return vec![Constraint::Percentage(100)];
    }

    let width = (100 / columns as u16).max(1);
    (0..columns)
        .map(|_| Constraint::Percentage(width))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        Palette, compact_text, highlight_yaml_line, max_scroll, panel_area, split_yaml_key_value,
    };
    use crate::detail::{PANEL_CLOSE_DELAY, PanelPhase};
    use crate::prefs::Theme;
    use ratatui::layout::Rect;
    use std::time::Instant;

    #[test]
    fn compact_text_truncates_with_ellipsis() {
        assert_eq!(compact_text("namespace", 20), "namespace");
        assert_eq!(compact_text("namespace", 5), "name…");
    }

    #[test]
    fn yaml_key_split_ignores_prose() {
        assert_eq!(split_yaml_key_value("image: nginx"), Some(("image", " nginx")));
        assert_eq!(split_yaml_key_value("not a key: value"), None);
    }

    #[test]
    fn yaml_list_items_keep_marker() {
        let palette = Palette::for_theme(Theme::Dark);
        let line = highlight_yaml_line("  - port: 80", &palette);
        let rendered = line
            .spans
            .iter()
            .map(|span| span.content.as_ref())
            .collect::<String>();
        assert_eq!(rendered, "  - port: 80");
    }

    #[test]
    fn scroll_limit_saturates_for_huge_manifests() {
        assert_eq!(max_scroll(10, 20), 0);
        assert_eq!(max_scroll(120, 20), 100);
        assert_eq!(max_scroll(70_000, 20), u16::MAX - 20);
    }

    #[test]
    fn closing_panel_shrinks_to_nothing() {
        let body = Rect::new(24, 1, 100, 30);
        let open = panel_area(body, PanelPhase::Open, Instant::now());
        assert_eq!(open.x + open.width, body.x + body.width);
        assert!(open.width >= 40);

        let since = Instant::now();
        let closed = panel_area(body, PanelPhase::Closing { since }, since + PANEL_CLOSE_DELAY);
        assert_eq!(closed.width, 0);
    }
}
