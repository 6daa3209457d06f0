use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use conectape_core::models::{CongressionalContact, Contact, Entry};
use conectape_core::screens::{DirectoryScreen, DirectorySection};
use conectape_core::utils::truncate_string;

use crate::app::{App, AppState};
use crate::ui::styles;

/// Placeholder shown for a record that could not be decoded.
const INVALID_ROW: &str = "(CONTACTO INVÁLIDO)";

/// Longest cell text before it is cut with an ellipsis.
const MAX_CELL_LEN: usize = 48;

pub fn render_contacts(frame: &mut Frame, app: &App, area: Rect) {
    let Some(screen) = app.navigator.contacts() else {
        return;
    };

    let header = ["Nombre", "Teléfono", "Cargo", "Área"];
    let widths = [
        Constraint::Percentage(40),
        Constraint::Length(11),
        Constraint::Fill(2),
        Constraint::Fill(2),
    ];
    render_list(frame, app, area, screen, &header, &widths, contact_cells);
}

pub fn render_congress(frame: &mut Frame, app: &App, area: Rect) {
    let Some(screen) = app.navigator.congress() else {
        return;
    };

    let header = ["Nombre", "Teléfono"];
    let widths = [Constraint::Fill(3), Constraint::Length(11)];
    render_list(frame, app, area, screen, &header, &widths, congress_cells);
}

fn contact_cells(entry: &Entry<Contact>) -> Vec<String> {
    match entry {
        Ok(contact) => vec![
            contact.display_name(),
            contact.local_phone(),
            contact.title.clone().unwrap_or_default(),
            contact.area.clone().unwrap_or_default(),
        ],
        Err(_) => vec![INVALID_ROW.to_string()],
    }
}

fn congress_cells(entry: &Entry<CongressionalContact>) -> Vec<String> {
    match entry {
        Ok(contact) => vec![contact.display_name(), contact.phone_label()],
        Err(_) => vec![INVALID_ROW.to_string()],
    }
}

fn render_list<T: DirectorySection>(
    frame: &mut Frame,
    app: &App,
    area: Rect,
    screen: &DirectoryScreen<T>,
    header: &[&str],
    widths: &[Constraint],
    cells: fn(&Entry<T>) -> Vec<String>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    render_search_box(frame, app, chunks[0], screen.query());

    let visible = screen.visible();
    let title = format!(" {} ({}/{}) ", screen.title(), visible.len(), screen.total());
    let block = Block::default()
        .title(title)
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if screen.is_loading() || visible.is_empty() {
        let message = if screen.is_loading() {
            "Cargando..."
        } else {
            screen.empty_message()
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(
            format!(" {}", message),
            styles::muted_style(),
        )))
        .block(block);
        frame.render_widget(paragraph, chunks[1]);
        return;
    }

    let header = Row::new(header.iter().map(|h| Cell::from(*h)))
        .style(styles::title_style())
        .height(1);

    let selected = screen.selected_index();
    let rows: Vec<Row> = visible
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let style = match (i == selected, entry.is_err()) {
                (true, _) => styles::selected_style(),
                (false, true) => styles::error_style(),
                (false, false) => styles::list_item_style(),
            };
            Row::new(
                cells(entry)
                    .into_iter()
                    .map(|text| Cell::from(truncate_string(&text, MAX_CELL_LEN))),
            )
            .style(style)
        })
        .collect();

    let table = Table::new(rows, widths.to_vec())
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(table, chunks[1], &mut state);
}

fn render_search_box(frame: &mut Frame, app: &App, area: Rect, query: &str) {
    let searching = app.state == AppState::Searching;
    let cursor = if searching { "▌" } else { "" };
    let line = if query.is_empty() && !searching {
        Line::from(Span::styled(" Buscar: [/]", styles::muted_style()))
    } else {
        Line::from(vec![
            Span::styled(" Buscar: ", styles::muted_style()),
            Span::styled(format!("{}{}", query, cursor), styles::search_style()),
        ])
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(searching));
    frame.render_widget(Paragraph::new(line).block(block), area);
}
