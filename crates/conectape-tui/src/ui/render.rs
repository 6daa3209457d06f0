use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use conectape_core::navigation::{NavKind, Section};
use conectape_core::screens::LoginField;

use crate::app::{App, AppState};
use crate::demo;

use super::styles;
use super::tabs::{dashboard, directory};

const LOGO: [&str; 3] = [
    "   ╔═╗╔═╗╔╗╔╔═╗╔═╗╔╦╗╔═╗╔═╗╔═╗",
    "   ║  ║ ║║║║║╣ ║   ║ ╠═╣╠═╝║╣ ",
    "   ╚═╝╚═╝╝╚╝╚═╝╚═╝ ╩ ╩ ╩╩  ╚═╝",
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    match app.navigator.kind() {
        NavKind::Unauthenticated => render_login_overlay(frame, app),
        NavKind::Initializing | NavKind::RoleChecking => render_loading_overlay(frame, app),
        NavKind::Admin | NavKind::Basic => {}
    }

    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = if app.demo {
        "  ConectaPe (demo)"
    } else {
        "  ConectaPe"
    };
    let help_hint = "[?] Ayuda";
    let title_len = title.chars().count();

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title_len as u16 + help_hint.len() as u16 + 4)
                as usize,
        )),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let active = app.navigator.active_section();

    let mut spans = vec![Span::raw(" ")];
    for (i, section) in app.navigator.sections().iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, section.label());
        if active == Some(*section) {
            spans.push(Span::styled(label, styles::tab_style(true)));
        } else {
            spans.push(Span::styled(label, styles::muted_style()));
        }
    }

    if let Some(user) = app.navigator.user() {
        let right = format!("{} ", user.phone().unwrap_or(user.uid.as_str()));
        let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
        let padding = (area.width as usize).saturating_sub(used + right.chars().count() + 1);
        spans.push(Span::raw(" ".repeat(padding)));
        spans.push(Span::styled(right, styles::muted_style()));
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.navigator.active_section() {
        Some(Section::Contacts) => directory::render_contacts(frame, app, area),
        Some(Section::Congress) => directory::render_congress(frame, app, area),
        Some(Section::Account) => dashboard::render(frame, app, area),
        None => {}
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.navigator.kind() {
        NavKind::Admin | NavKind::Basic => "[/]buscar [c]llamar [w]hatsapp [o]cerrar sesión | [q]salir",
        _ => "[Esc] salir",
    };

    let (left_text, left_style) = match app.notice {
        Some(ref notice) => (
            format!(" {}: {} ", notice.title, notice.message.replace('\n', " ")),
            styles::notice_style(notice.kind),
        ),
        None => (String::new(), styles::muted_style()),
    };
    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn logo_lines() -> Vec<Line<'static>> {
    LOGO.iter()
        .map(|l| Line::from(Span::styled(*l, styles::title_style())))
        .collect()
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 22, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");
    let key = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(k, styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ])
    };

    let mut help_text = logo_lines();
    help_text.extend([
        Line::from(Span::styled(
            format!("              versión {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navegación", styles::highlight_style())),
        key("  1-3       ", "Cambiar de sección"),
        key("  ←/→       ", "Sección anterior/siguiente"),
        key("  ↑/↓       ", "Moverse en la lista"),
        key("  Esc       ", "Cerrar aviso"),
        Line::from(""),
        Line::from(Span::styled(" Acciones", styles::highlight_style())),
        key("  /         ", "Buscar"),
        key("  c, Enter  ", "Llamar al contacto"),
        key("  w         ", "Abrir WhatsApp"),
        key("  o         ", "Cerrar sesión"),
        key("  q         ", "Salir"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Pulsa ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" o ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" para cerrar", styles::muted_style()),
        ]),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let form = &app.login;
    let error_lines = [form.phone_error(), form.password_error()]
        .iter()
        .flatten()
        .count() as u16;
    let demo_lines = u16::from(app.demo);
    let area = centered_rect_fixed(46, 12 + error_lines + demo_lines, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));

    let field_style = |focused: bool| {
        if focused && !form.is_loading() {
            styles::selected_style()
        } else {
            styles::list_item_style()
        }
    };

    let phone_focused = form.focus == LoginField::Phone;
    let cursor = if phone_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("   "),
        Span::styled("Número:     [", styles::muted_style()),
        Span::styled(format!("{:<9}{}", form.phone(), cursor), field_style(phone_focused)),
        Span::styled("]", styles::muted_style()),
    ]));
    if let Some(error) = form.phone_error() {
        lines.push(Line::from(Span::styled(format!("   {}", error), styles::error_style())));
    }

    let password_focused = form.focus == LoginField::Password;
    let cursor = if password_focused { "▌" } else { "" };
    let password: String = form.password_display().chars().take(16).collect();
    lines.push(Line::from(vec![
        Span::raw("   "),
        Span::styled("Contraseña: [", styles::muted_style()),
        Span::styled(format!("{:<16}{}", password, cursor), field_style(password_focused)),
        Span::styled("]", styles::muted_style()),
    ]));
    if let Some(error) = form.password_error() {
        lines.push(Line::from(Span::styled(format!("   {}", error), styles::error_style())));
    }

    lines.push(Line::from(""));
    if form.is_loading() {
        lines.push(Line::from(Span::styled(
            "            Ingresando...",
            styles::highlight_style(),
        )));
    } else {
        lines.push(Line::from(vec![
            Span::raw("            ["),
            Span::styled(" ▶ Ingresar ◀ ", styles::selected_style()),
            Span::raw("]"),
        ]));
    }
    let toggle = if form.show_password { "ocultar" } else { "mostrar" };
    lines.push(Line::from(Span::styled(
        format!("   [F2] {} contraseña  [Tab] campo", toggle),
        styles::muted_style(),
    )));
    if app.demo {
        lines.push(Line::from(Span::styled(
            format!("   {}", demo::login_hint()),
            styles::highlight_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_loading_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let message = match app.navigator.kind() {
        NavKind::RoleChecking => "   Verificando permisos...",
        _ => "   Cargando...",
    };
    let mut lines = logo_lines();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(message, styles::highlight_style())));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 9, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.extend([
        Line::from(""),
        Line::from(Span::styled("   ¿Seguro que quieres salir?", styles::highlight_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Pulsa ", styles::muted_style()),
            Span::styled("[S]", styles::help_key_style()),
            Span::styled(" para salir, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" para cancelar", styles::muted_style()),
        ]),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
