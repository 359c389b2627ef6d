use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::api::Role;
use crate::route::Route;

use super::{Field, RosterApp};

pub(super) fn render(app: &RosterApp, frame: &mut Frame<'_>) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(app, frame, header);
    match app.route() {
        Route::List => render_list(app, frame, body),
        Route::Add | Route::Edit(_) => render_form(app, frame, body),
    }
    render_footer(app, frame, footer);

    if app.is_confirming_delete() {
        render_confirm(app, frame);
    }
}

/// The line under the list title.
pub(super) fn subtitle(count: Option<u64>) -> String {
    match count {
        None | Some(0) => "You have no team members yet.".to_string(),
        Some(1) => "You have 1 team member.".to_string(),
        Some(n) => format!("You have {n} team members."),
    }
}

fn render_header(app: &RosterApp, frame: &mut Frame<'_>, area: Rect) {
    let (title, subtitle) = match app.route() {
        Route::List => (
            "Team members",
            subtitle(app.members.data().map(|page| page.count)),
        ),
        Route::Add => ("Add a team member", "Set email, location, and role.".to_string()),
        Route::Edit(_) => (
            "Edit team member",
            "Edit contact info, location, and role.".to_string(),
        ),
    };

    let mut heading = vec![Span::styled(title, Style::new().bold())];
    if !app.is_online() {
        heading.push(Span::styled("  [offline]", Style::new().fg(Color::Yellow)));
    }

    let header = Paragraph::new(vec![Line::from(heading), Line::from(subtitle)])
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_list(app: &RosterApp, frame: &mut Frame<'_>, area: Rect) {
    let members = &app.members;
    if members.is_loading() {
        frame.render_widget(centered_text("Loading team members..."), area);
        return;
    }
    if members.data().is_none() && members.is_error() {
        frame.render_widget(
            centered_text("Failed to load team members").style(Style::new().fg(Color::Red)),
            area,
        );
        return;
    }

    let [list_area, pager] = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(area);

    let items: Vec<ListItem<'_>> = app
        .visible_members()
        .iter()
        .map(|member| {
            ListItem::new(vec![
                Line::from(Span::styled(member.display_name(), Style::new().bold())),
                Line::from(format!("{}  {}", member.email, member.formatted_phone()))
                    .style(Style::new().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let title = if members.is_fetching() {
        "Members (refreshing)"
    } else {
        "Members"
    };
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::new().add_modifier(Modifier::REVERSED));
    let mut state = ListState::default().with_selected(Some(app.selected()));
    frame.render_stateful_widget(list, list_area, &mut state);

    let pages = Paragraph::new(format!("Page {} of {}", app.page(), app.page_count())).centered();
    frame.render_widget(pages, pager);
}

fn render_form(app: &RosterApp, frame: &mut Frame<'_>, area: Rect) {
    if let Route::Edit(id) = app.route() {
        if !app.form().is_loaded() {
            let text = if app.member.is_error() {
                centered_text(format!("Failed to load team member: {id}")).style(Style::new().fg(Color::Red))
            } else {
                centered_text("Loading team member...")
            };
            frame.render_widget(text, area);
            return;
        }
    }

    let form = app.form();
    let mut lines = Vec::new();
    if let Some(notice) = app.notice() {
        lines.push(Line::from(notice.to_string()).style(Style::new().fg(Color::Red)));
        lines.push(Line::default());
    }

    lines.push(Line::from("Info").bold());
    for field in Field::ALL {
        let focused = form.focus() == field;
        if field == Field::Role {
            lines.push(Line::default());
            lines.push(Line::from("Role").bold());
            for role in [Role::Regular, Role::Admin] {
                let mark = if form.role() == role { "(•)" } else { "( )" };
                let line = Line::from(format!("{mark} {}", role.description()));
                lines.push(if focused { line.reversed() } else { line });
            }
        } else {
            let cursor = if focused { "_" } else { "" };
            let line = Line::from(vec![
                Span::styled(format!("{:<11}", field.label()), Style::new().fg(Color::Cyan)),
                Span::raw(format!("{}{cursor}", form.value(field))),
            ]);
            lines.push(if focused { line.bold() } else { line });
        }
        if let Some(error) = form.error(field) {
            lines.push(Line::from(format!("  {error}")).style(Style::new().fg(Color::Red)));
        }
    }

    if app.save.is_loading() {
        lines.push(Line::default());
        lines.push(Line::from("Saving...").italic());
    } else if app.removal.is_loading() {
        lines.push(Line::default());
        lines.push(Line::from("Deleting...").italic());
    }

    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_footer(app: &RosterApp, frame: &mut Frame<'_>, area: Rect) {
    let help = match app.route() {
        Route::List => "↑/↓ select  ←/→ page  enter edit  a add  r refresh  q quit",
        Route::Add => "tab next  space role  enter save  esc back",
        Route::Edit(_) => "tab next  space role  enter save  ctrl-d delete  esc back",
    };
    let text = if app.status.is_empty() {
        help.to_string()
    } else {
        format!("{}  |  {help}", app.status)
    };
    frame.render_widget(Paragraph::new(text).style(Style::new().fg(Color::DarkGray)), area);
}

fn render_confirm(app: &RosterApp, frame: &mut Frame<'_>) {
    let area = centered(frame.area(), 50, 7);
    let input = app.form().input();
    let text = vec![
        Line::from(vec![
            Span::raw("Are you sure you want to delete the user: "),
            Span::styled(format!("{} {}", input.first_name, input.last_name), Style::new().bold()),
            Span::raw("?"),
        ]),
        Line::default(),
        Line::from("[n] Cancel    [y] Delete"),
    ];
    let dialog = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Confirm Delete"));
    frame.render_widget(Clear, area);
    frame.render_widget(dialog, area);
}

fn centered_text<'a>(text: impl Into<ratatui::text::Text<'a>>) -> Paragraph<'a> {
    Paragraph::new(text).centered().block(Block::default().borders(Borders::ALL))
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtitle() {
        assert_eq!(subtitle(None), "You have no team members yet.");
        assert_eq!(subtitle(Some(0)), "You have no team members yet.");
        assert_eq!(subtitle(Some(1)), "You have 1 team member.");
        assert_eq!(subtitle(Some(12)), "You have 12 team members.");
    }

    #[test]
    fn test_centered_fits_inside() {
        let outer = Rect::new(0, 0, 80, 24);
        let inner = centered(outer, 50, 7);
        assert_eq!((inner.width, inner.height), (50, 7));
        assert_eq!(inner.x, 15);
    }
}
