use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, BannerKind, Credentials, Editor, EditorField, EditorMode, LoadState};
use crate::guard::Route;
use crate::task::{format_relative, truncate};
use crate::task_list::TaskFilter;
use crate::validation::{MAX_DESCRIPTION_LEN, MAX_TITLE_LEN};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_banner(f, app, chunks[0]);
    match app.route {
        Route::SignIn | Route::SignUp => draw_auth(f, app, chunks[1]),
        Route::Dashboard => draw_dashboard(f, app, chunks[1]),
    }
    draw_help(f, app, chunks[2]);
}

fn draw_banner(f: &mut Frame, app: &App, area: Rect) {
    let line = match &app.banner {
        Some(banner) => {
            let color = match banner.kind {
                BannerKind::Info => Color::Green,
                BannerKind::Error => Color::Red,
            };
            Line::from(Span::styled(banner.message.as_str(), Style::default().fg(color)))
        }
        None => Line::from(Span::styled(
            "taskboard",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    };
    let line = if app.pending > 0 {
        let mut spans = line.spans;
        spans.push(Span::styled("  working...", Style::default().fg(Color::Yellow)));
        Line::from(spans)
    } else {
        line
    };
    f.render_widget(Paragraph::new(line), area);
}

fn draw_help(f: &mut Frame, app: &App, area: Rect) {
    let help = match app.route {
        Route::SignIn => "Tab: next field  Enter: sign in  F2: create account  Esc: quit",
        Route::SignUp => "Tab: next field  Enter: sign up  F2: have an account?  Esc: quit",
        Route::Dashboard if app.confirm_delete.is_some() => "y: delete  n: cancel",
        Route::Dashboard if app.editor.is_some() => "Tab: switch field  Enter: save  Esc: cancel",
        Route::Dashboard => {
            "n: new  e: edit  space: toggle  d: delete  f: filter  r: reload  s: sign out  q: quit"
        }
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn field_block(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        })
}

fn draw_auth(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.auth_form;
    let sign_up = app.route == Route::SignUp;
    let area = centered(area, 50, 5 + 3 * Credentials::field_count(app.route) as u16);

    let title = if sign_up { "Create account" } else { "Sign in" };
    f.render_widget(Block::default().title(title).borders(Borders::ALL), area);

    let mut constraints = vec![Constraint::Length(3); Credentials::field_count(app.route)];
    constraints.push(Constraint::Min(1));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(constraints)
        .split(area);

    let masked = "*".repeat(form.password.chars().count());
    let mut fields: Vec<(&str, &str)> = Vec::new();
    if sign_up {
        fields.push(("Name (optional)", form.name.as_str()));
    }
    fields.push(("Email", form.email.as_str()));
    fields.push(("Password", masked.as_str()));

    for (i, (label, value)) in fields.iter().enumerate() {
        f.render_widget(
            Paragraph::new(*value).block(field_block(label, form.focus == i)),
            rows[i],
        );
    }

    if let Some(error) = &form.error {
        f.render_widget(
            Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true }),
            rows[fields.len()],
        );
    }
}

fn draw_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let titles: Vec<Line> = TaskFilter::ALL
        .iter()
        .map(|filter| Line::from(format!("{} ({})", filter.label(), app.tasks.count(*filter))))
        .collect();
    let selected = TaskFilter::ALL
        .iter()
        .position(|filter| *filter == app.tasks.filter)
        .unwrap_or(0);
    f.render_widget(
        Tabs::new(titles)
            .block(Block::default().title("My tasks").borders(Borders::ALL))
            .select(selected)
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    draw_task_list(f, app, chunks[1]);

    if let Some(editor) = &app.editor {
        draw_editor(f, editor, area);
    }
    if let Some(task) = app
        .confirm_delete
        .as_deref()
        .and_then(|task_id| app.tasks.get(task_id))
    {
        let popup = centered(area, 50, 5);
        f.render_widget(Clear, popup);
        f.render_widget(
            Paragraph::new(format!("Delete \"{}\"? (y/n)", truncate(&task.title, 30)))
                .block(Block::default().title("Confirm").borders(Borders::ALL))
                .wrap(Wrap { trim: true }),
            popup,
        );
    }
}

fn draw_task_list(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL);
    let placeholder = match &app.load_state {
        LoadState::Loading | LoadState::Idle if app.tasks.is_empty() => Some(
            Paragraph::new("Loading tasks...").style(Style::default().fg(Color::Yellow)),
        ),
        LoadState::Failed(message) => Some(
            Paragraph::new(format!("{message}\nPress r to retry."))
                .style(Style::default().fg(Color::Red)),
        ),
        LoadState::Loaded if app.tasks.is_empty() => Some(Paragraph::new(
            "No tasks yet\nPress n to create your first task.",
        )),
        _ => None,
    };
    if let Some(paragraph) = placeholder {
        f.render_widget(paragraph.block(block).wrap(Wrap { trim: true }), area);
        return;
    }

    let now = Utc::now();
    let items: Vec<ListItem> = app
        .tasks
        .visible()
        .iter()
        .map(|t| {
            let (mark, title_style) = if t.completed {
                (
                    "[x] ",
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT),
                )
            } else {
                ("[ ] ", Style::default().fg(Color::White))
            };
            let mut lines = vec![Line::from(vec![
                Span::raw(mark),
                Span::styled(t.title.as_str(), title_style),
                Span::styled(
                    format!("  ({})", format_relative(t.updated_at, now)),
                    Style::default().fg(Color::DarkGray),
                ),
            ])];
            if !t.description.is_empty() {
                lines.push(Line::from(Span::styled(
                    format!("    {}", truncate(&t.description, 80)),
                    Style::default().fg(Color::Gray),
                )));
            }
            ListItem::new(lines)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(app.tasks.selected));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_editor(f: &mut Frame, editor: &Editor, area: Rect) {
    let popup = centered(area, 70, 14);
    f.render_widget(Clear, popup);
    let title = match editor.mode {
        EditorMode::Create => "New task",
        EditorMode::Edit(_) => "Edit task",
    };
    f.render_widget(Block::default().title(title).borders(Borders::ALL), popup);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(vec![
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(5),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(popup);

    let form = &editor.form;
    let title_label = format!("Title ({}/{MAX_TITLE_LEN})", form.title.chars().count());
    f.render_widget(
        Paragraph::new(form.title.as_str())
            .block(field_block(&title_label, editor.focus == EditorField::Title)),
        rows[0],
    );
    f.render_widget(field_error(form.title_error.as_ref()), rows[1]);

    let description_label = format!(
        "Description ({}/{MAX_DESCRIPTION_LEN})",
        form.description.chars().count()
    );
    f.render_widget(
        Paragraph::new(form.description.as_str())
            .wrap(Wrap { trim: false })
            .block(field_block(
                &description_label,
                editor.focus == EditorField::Description,
            )),
        rows[2],
    );
    f.render_widget(field_error(form.description_error.as_ref()), rows[3]);

    if let Some(error) = &editor.error {
        f.render_widget(
            Paragraph::new(error.as_str())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true }),
            rows[4],
        );
    }
}

fn field_error<E: ToString>(error: Option<&E>) -> Paragraph<'static> {
    let text = error.map(|e| e.to_string()).unwrap_or_default();
    Paragraph::new(text).style(Style::default().fg(Color::Red))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_fits_inside_area() {
        let area = Rect::new(0, 0, 40, 10);
        let rect = centered(area, 50, 4);
        assert_eq!(rect, Rect::new(0, 3, 40, 4));
    }
}
