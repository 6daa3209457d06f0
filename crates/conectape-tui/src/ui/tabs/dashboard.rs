use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::styles;

/// Render the account section: who is signed in and with which role.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let dashboard = app.navigator.dashboard();
    let placeholder = "-";

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  📱 {}", dashboard.welcome()),
            styles::title_style(),
        )),
        Line::from(Span::styled("  Estás en el Dashboard", styles::muted_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Correo: ", styles::muted_style()),
            Span::styled(
                dashboard.email.clone().unwrap_or_else(|| placeholder.to_string()),
                styles::list_item_style(),
            ),
        ]),
        Line::from(vec![
            Span::styled("  UID:    ", styles::muted_style()),
            Span::styled(
                dashboard.uid.clone().unwrap_or_else(|| placeholder.to_string()),
                styles::list_item_style(),
            ),
        ]),
        Line::from(vec![
            Span::styled("  Rol:    ", styles::muted_style()),
            Span::styled(
                dashboard.role.map(|r| r.label()).unwrap_or(placeholder),
                styles::list_item_style(),
            ),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  [d] ", styles::help_key_style()),
            Span::styled("Ir al Directorio", styles::help_desc_style()),
        ]),
        Line::from(vec![
            Span::styled("  [o] ", styles::help_key_style()),
            Span::styled("Cerrar sesión", styles::help_desc_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Cuenta ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
