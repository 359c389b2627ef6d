//! The roster console: a member list with add, edit and delete screens.

mod form;
mod view;

use std::io;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, info};

use crate::api::{Page, PageArgs, TeamMember, TeamMemberUpdate};
use crate::application::Application;
use crate::command::{Action, Command};
use crate::query::{Connectivity, LifecycleEvent, LifecycleListeners, MutationResult, QueryResult, TagSet};
use crate::roster::{RosterApi, TEAM_MEMBERS};
use crate::route::Route;
use crate::subscription::Subscription;
use crate::subscription::terminal::TerminalEvents;
use crate::validate::validate;

pub use form::{Field, MemberForm};

/// Everything [`RosterApp`] needs from the outside.
#[derive(Debug, Clone)]
pub struct Flags {
    pub roster: RosterApi,
    pub lifecycle: LifecycleListeners,
    /// Reachability probe of the backend; `None` disables the offline marker.
    pub connectivity: Option<Connectivity>,
    pub page_size: u32,
    pub start: Route,
}

#[derive(Debug)]
pub enum Message {
    Terminal(Event),
    TerminalError(io::Error),
    Members(QueryResult<Page<TeamMember>>),
    Member(QueryResult<TeamMember>),
    Saved(MutationResult<TeamMember>),
    Deleted(MutationResult<()>),
    Lifecycle(LifecycleEvent),
    Navigate(Route),
    Quit,
}

pub struct RosterApp {
    roster: RosterApi,
    lifecycle: LifecycleListeners,
    connectivity: Option<Connectivity>,
    page_size: u32,
    route: Route,

    page: u32,
    selected: usize,
    members: QueryResult<Page<TeamMember>>,

    member: QueryResult<TeamMember>,
    form: MemberForm,
    save: MutationResult<TeamMember>,
    removal: MutationResult<()>,
    notice: Option<String>,
    confirm_delete: bool,

    online: bool,
    status: String,
}

impl RosterApp {
    #[must_use]
    pub const fn route(&self) -> &Route {
        &self.route
    }

    /// Current 1-based list page.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn selected(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub const fn form(&self) -> &MemberForm {
        &self.form
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub const fn is_online(&self) -> bool {
        self.online
    }

    #[must_use]
    pub const fn is_confirming_delete(&self) -> bool {
        self.confirm_delete
    }

    /// A save or delete is in flight.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.save.is_loading() || self.removal.is_loading()
    }

    fn page_args(&self) -> PageArgs {
        PageArgs::for_page(self.page, self.page_size)
    }

    fn page_count(&self) -> u32 {
        self.members.data().map_or(1, |page| {
            u32::try_from(page.page_count(self.page_size)).unwrap_or(u32::MAX)
        })
    }

    fn visible_members(&self) -> &[TeamMember] {
        self.members.data().map_or(&[], |page| page.results.as_slice())
    }

    fn navigate(&mut self, route: Route) {
        info!(from = %self.route, to = %route, "navigate");
        match &route {
            Route::List => {}
            Route::Add => {
                self.form = MemberForm::new();
            }
            Route::Edit(_) => {
                self.form = MemberForm::new();
                self.member = QueryResult::default();
            }
        }
        self.save = MutationResult::default();
        self.removal = MutationResult::default();
        self.notice = None;
        self.confirm_delete = false;
        self.route = route;
    }

    fn on_members(&mut self, result: QueryResult<Page<TeamMember>>) {
        self.members = result;
        let pages = self.page_count();
        if self.members.data().is_some() && self.page > pages {
            debug!(page = self.page, pages, "page out of range");
            self.page = pages;
            self.selected = 0;
        }
        self.selected = self.selected.min(self.visible_members().len().saturating_sub(1));
    }

    fn on_member(&mut self, result: QueryResult<TeamMember>) {
        if !self.form.is_loaded() {
            if let Some(member) = result.data() {
                self.form = MemberForm::from_member(member);
            }
        }
        self.member = result;
    }

    fn on_saved(&mut self, result: MutationResult<TeamMember>) -> Command<Message> {
        self.save = result;
        if let Some(member) = self.save.data() {
            self.status = format!("Saved {}", member.display_name());
            return Command::message(Message::Navigate(Route::List));
        }
        if let Some(errors) = self.save.field_errors() {
            self.form.set_errors(errors);
        }
        self.notice = Some("Error: Unable to save team member!".to_string());
        Command::none()
    }

    fn on_deleted(&mut self, result: MutationResult<()>) -> Command<Message> {
        self.removal = result;
        self.confirm_delete = false;
        if self.removal.is_success() {
            self.status = "Team member deleted".to_string();
            return Command::message(Message::Navigate(Route::List));
        }
        self.notice = Some("Error: Unable to delete team member!".to_string());
        Command::none()
    }

    fn on_lifecycle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::ConnectionLost => self.online = false,
            LifecycleEvent::Reconnected => self.online = true,
            LifecycleEvent::FocusGained | LifecycleEvent::FocusLost => {}
        }
        self.lifecycle.handle(event);
    }

    fn submit(&mut self) -> Command<Message> {
        if self.is_busy() {
            return Command::none();
        }
        let input = self.form.input().clone();
        if let Err(err) = validate(&input) {
            self.form.set_errors(err.0);
            return Command::none();
        }
        self.form.clear_errors();
        self.notice = None;

        match &self.route {
            Route::Add => {
                self.save = MutationResult::loading();
                self.roster
                    .add_team_member()
                    .trigger(input)
                    .map(Message::Saved)
            }
            Route::Edit(id) => {
                let update = TeamMemberUpdate { id: id.clone(), input };
                self.save = MutationResult::loading();
                self.roster
                    .update_team_member()
                    .trigger(update)
                    .map(Message::Saved)
            }
            Route::List => Command::none(),
        }
    }

    fn on_list_key(&mut self, key: KeyEvent) -> Command<Message> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Command::message(Message::Quit),
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
                Command::none()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let last = self.visible_members().len().saturating_sub(1);
                self.selected = (self.selected + 1).min(last);
                Command::none()
            }
            KeyCode::Left | KeyCode::Char('h') if self.page > 1 => {
                self.page -= 1;
                self.selected = 0;
                Command::none()
            }
            KeyCode::Right | KeyCode::Char('l') if self.page < self.page_count() => {
                self.page += 1;
                self.selected = 0;
                Command::none()
            }
            KeyCode::Enter => self
                .visible_members()
                .get(self.selected)
                .map_or_else(Command::none, |member| {
                    Command::message(Message::Navigate(Route::Edit(member.id.clone())))
                }),
            KeyCode::Char('a') => Command::message(Message::Navigate(Route::Add)),
            KeyCode::Char('r') => {
                self.status = "Refreshing...".to_string();
                self.roster.queries().invalidate(TagSet::from([TEAM_MEMBERS]))
            }
            _ => Command::none(),
        }
    }

    fn on_confirm_key(&mut self, key: KeyEvent) -> Command<Message> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                let Route::Edit(id) = &self.route else {
                    return Command::none();
                };
                if self.removal.is_loading() {
                    return Command::none();
                }
                let id = id.clone();
                self.removal = MutationResult::loading();
                self.roster
                    .delete_team_member()
                    .trigger(id)
                    .map(Message::Deleted)
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.confirm_delete = false;
                Command::none()
            }
            _ => Command::none(),
        }
    }

    fn on_form_key(&mut self, key: KeyEvent) -> Command<Message> {
        if self.confirm_delete {
            return self.on_confirm_key(key);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => Command::message(Message::Navigate(Route::List)),
            KeyCode::Char('d') if ctrl => {
                if matches!(self.route, Route::Edit(_)) && self.form.is_loaded() && !self.is_busy() {
                    self.confirm_delete = true;
                }
                Command::none()
            }
            KeyCode::Tab | KeyCode::Down => {
                self.form.focus_next();
                Command::none()
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.form.focus_prev();
                Command::none()
            }
            KeyCode::Left | KeyCode::Right if self.form.focus() == Field::Role => {
                self.form.toggle_role();
                Command::none()
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.form.backspace();
                Command::none()
            }
            KeyCode::Char(c) if !ctrl => {
                self.form.insert(c);
                Command::none()
            }
            _ => Command::none(),
        }
    }

    fn on_terminal(&mut self, event: Event) -> Command<Message> {
        if let Some(lifecycle) = LifecycleEvent::from_terminal(&event) {
            return Command::message(Message::Lifecycle(lifecycle));
        }
        let Event::Key(key) = event else {
            return Command::none();
        };
        if key.kind != KeyEventKind::Press {
            return Command::none();
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Command::message(Message::Quit);
        }

        match self.route {
            Route::List => self.on_list_key(key),
            Route::Add | Route::Edit(_) => self.on_form_key(key),
        }
    }
}

impl Application for RosterApp {
    type Message = Message;
    type Flags = Flags;

    fn new(flags: Flags) -> (Self, Command<Message>) {
        let app = Self {
            roster: flags.roster,
            lifecycle: flags.lifecycle,
            connectivity: flags.connectivity,
            page_size: flags.page_size.max(1),
            route: flags.start,
            page: 1,
            selected: 0,
            members: QueryResult::default(),
            member: QueryResult::default(),
            form: MemberForm::new(),
            save: MutationResult::default(),
            removal: MutationResult::default(),
            notice: None,
            confirm_delete: false,
            online: true,
            status: String::new(),
        };
        (app, Command::none())
    }

    fn update(&mut self, msg: Message) -> Command<Message> {
        match msg {
            Message::Terminal(event) => self.on_terminal(event),
            Message::TerminalError(err) => {
                self.status = format!("Terminal error: {err}");
                Command::none()
            }
            Message::Members(result) => {
                if self.route == Route::List {
                    self.on_members(result);
                }
                Command::none()
            }
            Message::Member(result) => {
                if matches!(self.route, Route::Edit(_)) {
                    self.on_member(result);
                }
                Command::none()
            }
            Message::Saved(result) => self.on_saved(result),
            Message::Deleted(result) => self.on_deleted(result),
            Message::Lifecycle(event) => {
                self.on_lifecycle(event);
                Command::none()
            }
            Message::Navigate(route) => {
                self.navigate(route);
                Command::none()
            }
            Message::Quit => Command::effect(Action::Quit),
        }
    }

    fn view(&self, frame: &mut ratatui::Frame<'_>) {
        view::render(self, frame);
    }

    fn subscriptions(&self) -> Vec<Subscription<Message>> {
        let mut subscriptions = vec![Subscription::new(TerminalEvents::new()).map(|result| match result {
            Ok(event) => Message::Terminal(event),
            Err(e) => Message::TerminalError(e),
        })];

        if let Some(connectivity) = &self.connectivity {
            subscriptions.push(Subscription::new(connectivity.clone()).map(Message::Lifecycle));
        }

        match &self.route {
            Route::List => subscriptions.push(
                Subscription::new(self.roster.team_members(self.page_args())).map(Message::Members),
            ),
            Route::Edit(id) => subscriptions
                .push(Subscription::new(self.roster.team_member(id)).map(Message::Member)),
            Route::Add => {}
        }

        subscriptions
    }
}
