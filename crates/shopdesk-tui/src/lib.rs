// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap};
use shopdesk_app::{
    AppCommand, AppMode, AppState, ColumnSpec, Completion, CrudFormController, EntityKind,
    FetchStatus, FieldSpec, FormError, FormState, LineItemField, Notification, RemoteRequest,
    ResourceStore, ResourceTableView, Session, SortDirection, TextSpan,
};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Side effects the UI hands off so the event loop never blocks on the
/// network.
pub trait AppRuntime {
    /// Runs `request` elsewhere and sends [`InternalEvent::Completed`] back
    /// on `tx` when it finishes.
    fn dispatch(&mut self, request: RemoteRequest, tx: &Sender<InternalEvent>);

    /// Starts uploading `path` as `entity`'s media and answers with
    /// [`InternalEvent::MediaUploaded`].
    fn upload_media(
        &mut self,
        entity: EntityKind,
        path: PathBuf,
        tx: &Sender<InternalEvent>,
    ) -> Result<()>;
}

#[derive(Debug)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Completed(Completion),
    MediaUploaded {
        entity: EntityKind,
        result: Result<String, String>,
    },
}

/// UI-only state layered over the session: cursors, prompts, status timers.
#[derive(Debug)]
pub struct ViewData {
    session: Session,
    selected_col: usize,
    search_input: String,
    form_focus: usize,
    upload_input: Option<String>,
    status_token: u64,
}

impl ViewData {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            selected_col: 0,
            search_input: String::new(),
            form_focus: 0,
            upload_input: None,
            status_token: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormSlot {
    Field(&'static FieldSpec),
    LineItem { index: usize, field: LineItemField },
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, session: Session, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(session);
    let (internal_tx, internal_rx) = mpsc::channel();
    ensure_loaded(state, runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, runtime, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if has_event {
            match event::read().context("read event") {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    result = Err(error);
                    break;
                }
            }
        }
    }

    if let Err(error) = view_data.session.teardown() {
        warn!(%error, "session teardown failed");
    }
    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Completed(completion) => {
                apply_completion(state, runtime, view_data, tx, completion);
            }
            InternalEvent::MediaUploaded { entity, result } => {
                apply_upload(state, view_data, tx, entity, result);
            }
        }
    }
}

fn apply_completion<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    completion: Completion,
) {
    let effects = view_data.session.complete(completion);
    for notification in &effects.notifications {
        match notification {
            Notification::Success(notice) => info!(%notice, "remote change applied"),
            Notification::Error(reason) => warn!(%reason, "remote request failed"),
        }
        emit_status(state, view_data, tx, notification.message());
    }
    for request in effects.next {
        debug!(entity = %request.entity, ticket = request.ticket.id, "releasing queued mutation");
        runtime.dispatch(request, tx);
    }
    if state.mode == AppMode::Form && !view_data.session.view(state.active_tab).form().is_open() {
        view_data.upload_input = None;
        state.dispatch(AppCommand::ExitToNav);
    }
}

fn apply_upload(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    entity: EntityKind,
    result: Result<String, String>,
) {
    let status = match result {
        Ok(url) => match view_data.session.view_mut(entity).form_mut().set_media_url(url) {
            Ok(()) => "media uploaded".to_owned(),
            Err(error) => format!("media uploaded but not attached: {error}"),
        },
        Err(error) => format!("media upload failed: {error}"),
    };
    emit_status(state, view_data, tx, status);
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn ensure_loaded<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    if view_data.session.store(state.active_tab).status() == &FetchStatus::Idle {
        reload(state, runtime, view_data, tx);
    }
}

fn reload<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    match view_data.session.request_load(state.active_tab) {
        Ok(request) => runtime.dispatch(request, tx),
        Err(error) => emit_status(state, view_data, tx, error.to_string()),
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
    {
        return true;
    }

    match state.mode {
        AppMode::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                state.dispatch(AppCommand::ExitToNav);
            }
            false
        }
        AppMode::Search => {
            handle_search_key(state, view_data, internal_tx, key);
            false
        }
        AppMode::Form => {
            handle_form_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Nav => handle_nav_key(state, runtime, view_data, internal_tx, key),
    }
}

fn handle_nav_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let entity = state.active_tab;
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => switch_tab(state, runtime, view_data, tx, AppCommand::NextTab),
        KeyCode::BackTab => switch_tab(state, runtime, view_data, tx, AppCommand::PrevTab),
        KeyCode::Char('j') | KeyCode::Down => {
            let (view, store) = view_data.session.parts_mut(entity);
            view.move_selection(store, 1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let (view, store) = view_data.session.parts_mut(entity);
            view.move_selection(store, -1);
        }
        KeyCode::Char('h') | KeyCode::Left => {
            view_data.selected_col = view_data.selected_col.saturating_sub(1);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            let last = entity.descriptor().columns.len().saturating_sub(1);
            view_data.selected_col = (view_data.selected_col + 1).min(last);
        }
        KeyCode::Char('n') | KeyCode::PageDown => {
            let (view, store) = view_data.session.parts_mut(entity);
            view.next_page(store);
        }
        KeyCode::Char('p') | KeyCode::PageUp => {
            let (view, store) = view_data.session.parts_mut(entity);
            view.prev_page(store);
        }
        KeyCode::Char('/') => open_search(state, view_data, tx),
        KeyCode::Esc => {
            let view = view_data.session.view_mut(entity);
            if view.filter().is_active() {
                view.clear_search();
                emit_status(state, view_data, tx, "search cleared");
            }
        }
        KeyCode::Char('s') => sort_current_column(state, view_data, tx),
        KeyCode::Char('a') => {
            let opened = view_data.session.view_mut(entity).open_create();
            match opened {
                Ok(()) => enter_form(state, view_data),
                Err(error) => emit_status(state, view_data, tx, error.to_string()),
            }
        }
        KeyCode::Char('e') | KeyCode::Enter => open_edit_form(state, view_data, tx),
        KeyCode::Char('d') => delete_selected(state, runtime, view_data, tx),
        KeyCode::Char('r') => reload(state, runtime, view_data, tx),
        KeyCode::Char('+') => resize_page(state, view_data, tx, 1),
        KeyCode::Char('-') => resize_page(state, view_data, tx, -1),
        KeyCode::Char('?') => {
            state.dispatch(AppCommand::OpenHelp);
        }
        _ => {}
    }
    false
}

fn switch_tab<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    command: AppCommand,
) {
    if state.dispatch(command).is_empty() {
        return;
    }
    view_data.selected_col = 0;
    ensure_loaded(state, runtime, view_data, tx);
}

fn current_column(view_data: &ViewData, entity: EntityKind) -> Option<&'static ColumnSpec> {
    entity.descriptor().columns.get(view_data.selected_col)
}

fn open_search(state: &mut AppState, view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    let entity = state.active_tab;
    let Some(column) = current_column(view_data, entity) else {
        return;
    };
    if !column.searchable {
        emit_status(state, view_data, tx, format!("{} is not searchable", column.title));
        return;
    }
    view_data.search_input = view_data
        .session
        .view(entity)
        .filter()
        .query_for(column.key)
        .unwrap_or_default()
        .to_owned();
    state.dispatch(AppCommand::OpenSearch);
}

fn handle_search_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let entity = state.active_tab;
    let Some(column) = current_column(view_data, entity) else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    match key.code {
        KeyCode::Esc => {
            view_data.search_input.clear();
            view_data.session.view_mut(entity).clear_search();
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, tx, "search cleared");
        }
        KeyCode::Enter => {
            if view_data.search_input.is_empty() {
                view_data.session.view_mut(entity).clear_search();
            }
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            view_data.search_input.pop();
            apply_search(state, view_data, tx, column);
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.search_input.push(ch);
            apply_search(state, view_data, tx, column);
        }
        _ => {}
    }
}

fn apply_search(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    column: &ColumnSpec,
) {
    let input = view_data.search_input.clone();
    let applied = view_data.session.view_mut(state.active_tab).search(column.key, &input);
    if let Err(error) = applied {
        emit_status(state, view_data, tx, error.to_string());
    }
}

fn sort_current_column(state: &mut AppState, view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    let entity = state.active_tab;
    let Some(column) = current_column(view_data, entity) else {
        return;
    };
    let status = match view_data.session.view_mut(entity).cycle_sort(column.key) {
        Ok(Some(sort)) => {
            let direction = match sort.direction {
                SortDirection::Asc => "ascending",
                SortDirection::Desc => "descending",
            };
            format!("sorted by {} {direction}", column.title)
        }
        Ok(None) => "sort cleared".to_owned(),
        Err(error) => error.to_string(),
    };
    emit_status(state, view_data, tx, status);
}

fn resize_page(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let (view, store) = view_data.session.parts_mut(state.active_tab);
    let size = view.page_size().saturating_add_signed(delta);
    let status = match view.set_page_size(store, size) {
        Ok(()) => format!("{size} rows per page"),
        Err(error) => error.to_string(),
    };
    emit_status(state, view_data, tx, status);
}

fn selected_id(view_data: &ViewData, entity: EntityKind) -> Option<shopdesk_app::RecordId> {
    let view = view_data.session.view(entity);
    view.selected_record(view_data.session.store(entity))
        .map(|record| record.id.clone())
}

fn open_edit_form(state: &mut AppState, view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    let entity = state.active_tab;
    let Some(id) = selected_id(view_data, entity) else {
        emit_status(state, view_data, tx, format!("no {} selected", entity.singular()));
        return;
    };
    let (view, store) = view_data.session.parts_mut(entity);
    match view.edit(store, &id) {
        Ok(()) => enter_form(state, view_data),
        Err(error) => emit_status(state, view_data, tx, error.to_string()),
    }
}

fn enter_form(state: &mut AppState, view_data: &mut ViewData) {
    view_data.form_focus = 0;
    view_data.upload_input = None;
    state.dispatch(AppCommand::OpenForm);
}

fn delete_selected<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let entity = state.active_tab;
    let Some(id) = selected_id(view_data, entity) else {
        emit_status(state, view_data, tx, format!("no {} selected", entity.singular()));
        return;
    };
    match view_data.session.request_delete(entity, id) {
        Some(request) => runtime.dispatch(request, tx),
        None => emit_status(
            state,
            view_data,
            tx,
            format!("delete queued behind another {} change", entity.singular()),
        ),
    }
}

fn form_slots(form: &CrudFormController) -> Vec<FormSlot> {
    let mut slots = form
        .descriptor()
        .fields
        .iter()
        .map(FormSlot::Field)
        .collect::<Vec<_>>();
    if let Some(draft) = form.draft() {
        for index in 0..draft.line_items.len() {
            slots.extend(
                LineItemField::ALL
                    .into_iter()
                    .map(|field| FormSlot::LineItem { index, field }),
            );
        }
    }
    slots
}

fn slot_value(form: &CrudFormController, slot: FormSlot) -> String {
    let Some(draft) = form.draft() else {
        return String::new();
    };
    match slot {
        FormSlot::Field(spec) => draft.field(spec.key).to_owned(),
        FormSlot::LineItem { index, field } => draft
            .line_items
            .get(index)
            .map(|item| item.get(field).to_owned())
            .unwrap_or_default(),
    }
}

fn write_slot(form: &mut CrudFormController, slot: FormSlot, value: String) -> Result<(), FormError> {
    match slot {
        FormSlot::Field(spec) => form.set_field(spec.key, value),
        FormSlot::LineItem { index, field } => form.set_line_item_field(index, field, value),
    }
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if view_data.upload_input.is_some() {
        handle_upload_key(state, runtime, view_data, tx, key);
        return;
    }

    let entity = state.active_tab;
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            view_data.session.view_mut(entity).form_mut().cancel();
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, tx, "edit canceled");
        }
        KeyCode::Char('s') if ctrl => submit_form(state, runtime, view_data, tx),
        KeyCode::Enter => submit_form(state, runtime, view_data, tx),
        KeyCode::Char('n') if ctrl => add_line_item(state, view_data, tx),
        KeyCode::Char('x') if ctrl => remove_line_item(state, view_data, tx),
        KeyCode::Char('u') if ctrl => {
            if entity.descriptor().media_field().is_some() {
                view_data.upload_input = Some(String::new());
            } else {
                emit_status(state, view_data, tx, FormError::NoMediaField.to_string());
            }
        }
        KeyCode::Tab | KeyCode::Down => move_focus(view_data, entity, 1),
        KeyCode::BackTab | KeyCode::Up => move_focus(view_data, entity, -1),
        KeyCode::Backspace => edit_focused(state, view_data, tx, |value| {
            value.pop();
        }),
        KeyCode::Char(ch) if !ctrl => edit_focused(state, view_data, tx, |value| value.push(ch)),
        _ => {}
    }
}

fn move_focus(view_data: &mut ViewData, entity: EntityKind, delta: isize) {
    let len = form_slots(view_data.session.view(entity).form()).len();
    if len == 0 {
        return;
    }
    let next = (view_data.form_focus as isize + delta).rem_euclid(len as isize);
    view_data.form_focus = next as usize;
}

fn edit_focused(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    edit: impl FnOnce(&mut String),
) {
    let form = view_data.session.view_mut(state.active_tab).form_mut();
    let Some(slot) = form_slots(form).get(view_data.form_focus).copied() else {
        return;
    };
    let mut value = slot_value(form, slot);
    edit(&mut value);
    if let Err(error) = write_slot(form, slot, value) {
        emit_status(state, view_data, tx, error.to_string());
    }
}

fn submit_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let entity = state.active_tab;
    match view_data.session.request_submit(entity) {
        Ok(Some(request)) => {
            emit_status(state, view_data, tx, format!("saving {}", entity.singular()));
            runtime.dispatch(request, tx);
        }
        Ok(None) => emit_status(
            state,
            view_data,
            tx,
            format!("save queued behind another {} change", entity.singular()),
        ),
        Err(FormError::Invalid(errors)) => {
            let form = view_data.session.view(entity).form();
            if let Some(first) = form_slots(form).iter().position(|slot| {
                matches!(slot, FormSlot::Field(spec) if errors.get(spec.key).is_some())
            }) {
                view_data.form_focus = first;
            }
            emit_status(state, view_data, tx, FormError::Invalid(errors).to_string());
        }
        Err(error) => emit_status(state, view_data, tx, error.to_string()),
    }
}

fn add_line_item(state: &mut AppState, view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    let form = view_data.session.view_mut(state.active_tab).form_mut();
    match form.add_line_item() {
        Ok(index) => {
            let target = FormSlot::LineItem {
                index,
                field: LineItemField::ProductId,
            };
            if let Some(position) = form_slots(form).iter().position(|slot| *slot == target) {
                view_data.form_focus = position;
            }
        }
        Err(error) => emit_status(state, view_data, tx, error.to_string()),
    }
}

fn remove_line_item(state: &mut AppState, view_data: &mut ViewData, tx: &Sender<InternalEvent>) {
    let form = view_data.session.view_mut(state.active_tab).form_mut();
    let focused = form_slots(form).get(view_data.form_focus).copied();
    let Some(FormSlot::LineItem { index, .. }) = focused else {
        emit_status(state, view_data, tx, "move to a line item to remove it");
        return;
    };
    match form.remove_line_item(index) {
        Ok(_) => {
            let len = form_slots(form).len();
            view_data.form_focus = view_data.form_focus.min(len.saturating_sub(1));
            emit_status(state, view_data, tx, format!("line item {} removed", index + 1));
        }
        Err(error) => emit_status(state, view_data, tx, error.to_string()),
    }
}

fn handle_upload_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(input) = view_data.upload_input.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => view_data.upload_input = None,
        KeyCode::Backspace => {
            input.pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.push(ch),
        KeyCode::Enter => {
            let path = input.trim().to_owned();
            if path.is_empty() {
                return;
            }
            view_data.upload_input = None;
            let status = match runtime.upload_media(state.active_tab, PathBuf::from(&path), tx) {
                Ok(()) => format!("uploading {path}"),
                Err(error) => format!("{error:#}"),
            };
            emit_status(state, view_data, tx, status);
        }
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = EntityKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tab_titles = EntityKind::ALL
        .iter()
        .map(|tab| tab_title(*tab, view_data.session.store(*tab)))
        .collect::<Vec<String>>();
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title("shopdesk").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    render_table(frame, layout[1], state, view_data);

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status_widget, layout[2]);

    if state.mode == AppMode::Form {
        let form = view_data.session.view(state.active_tab).form();
        let area = centered_rect(70, 80, frame.area());
        frame.render_widget(Clear, area);
        let body = Paragraph::new(form_lines(
            form,
            view_data.form_focus,
            view_data.upload_input.as_deref(),
        ))
        .wrap(Wrap { trim: false })
        .block(Block::default().title(form_title(form)).borders(Borders::ALL));
        frame.render_widget(body, area);
    }

    if state.mode == AppMode::Help {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn tab_title(entity: EntityKind, store: &ResourceStore) -> String {
    match store.status() {
        FetchStatus::Idle => entity.label().to_owned(),
        FetchStatus::Loading => format!("{} ...", entity.label()),
        FetchStatus::Succeeded => format!("{} ({})", entity.label(), store.len()),
        FetchStatus::Failed(_) => format!("{} !", entity.label()),
    }
}

fn empty_table_text(entity: EntityKind, status: &FetchStatus) -> String {
    match status {
        FetchStatus::Idle | FetchStatus::Loading => format!("loading {entity}..."),
        FetchStatus::Failed(reason) => {
            format!("could not load {entity}: {reason} -- press r to retry")
        }
        FetchStatus::Succeeded => format!("no {entity} yet -- press a to add one"),
    }
}

fn header_label(view: &ResourceTableView, column: &ColumnSpec) -> String {
    let mut label = column.title.to_owned();
    if let Some(sort) = view.sort()
        && sort.column == column.key
    {
        label.push(' ');
        label.push_str(sort.direction.marker());
    }
    if view.filter().query_for(column.key).is_some() {
        label.push_str(" /");
    }
    label
}

fn table_title(view: &ResourceTableView, store: &ResourceStore) -> String {
    let mut title = format!(
        "{} | page {}/{} | {} rows",
        view.entity().label(),
        view.page() + 1,
        view.page_count(store),
        view.rows(store).len()
    );
    let filter = view.filter();
    if filter.is_active()
        && let Some(column) = &filter.column
    {
        title.push_str(&format!(" | {column} ~ {:?}", filter.search_text));
    }
    title
}

fn highlight_spans(spans: Vec<TextSpan>) -> Vec<Span<'static>> {
    spans
        .into_iter()
        .map(|span| {
            if span.highlighted {
                Span::styled(
                    span.text,
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
                )
            } else {
                Span::raw(span.text)
            }
        })
        .collect()
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let entity = state.active_tab;
    let view = view_data.session.view(entity);
    let store = view_data.session.store(entity);

    if store.is_empty() {
        let style = match store.status() {
            FetchStatus::Failed(_) => Style::default().fg(Color::Red),
            _ => Style::default(),
        };
        let empty = Paragraph::new(empty_table_text(entity, store.status()))
            .style(style)
            .block(Block::default().borders(Borders::ALL).title(entity.label()));
        frame.render_widget(empty, area);
        return;
    }

    let descriptor = view.descriptor();
    let header = Row::new(descriptor.columns.iter().map(|column| {
        Cell::from(header_label(view, column)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows = view
        .page_rows(store)
        .into_iter()
        .enumerate()
        .map(|(row_index, record)| {
            let selected_row = row_index == view.selected();
            let cells = descriptor
                .columns
                .iter()
                .enumerate()
                .map(|(column_index, column)| {
                    let mut style = Style::default();
                    if selected_row {
                        style = style.bg(Color::DarkGray);
                    }
                    if selected_row && column_index == view_data.selected_col {
                        style = Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD);
                    }
                    Cell::from(Line::from(highlight_spans(view.cell(record, column)))).style(style)
                })
                .collect::<Vec<_>>();
            Row::new(cells)
        })
        .collect::<Vec<_>>();

    let widths = vec![Constraint::Min(8); descriptor.columns.len().max(1)];
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(view, store))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn form_title(form: &CrudFormController) -> String {
    let singular = form.descriptor().kind.singular();
    match form.state() {
        FormState::Closed => singular.to_owned(),
        FormState::Creating => format!("new {singular}"),
        FormState::Editing(record) => format!("edit {singular} {}", record.id),
    }
}

fn value_span(value: String, focused: bool) -> Span<'static> {
    if focused {
        Span::styled(
            format!("{value}_"),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        )
    } else {
        Span::raw(value)
    }
}

fn form_lines(
    form: &CrudFormController,
    focus: usize,
    upload_input: Option<&str>,
) -> Vec<Line<'static>> {
    let error_style = Style::default().fg(Color::Red);
    let mut lines = Vec::new();
    let mut line_items_started = false;

    for (position, slot) in form_slots(form).into_iter().enumerate() {
        let focused = position == focus;
        let marker = if focused { "> " } else { "  " };
        match slot {
            FormSlot::Field(spec) => {
                let required = if spec.required { "*" } else { "" };
                let mut spans = vec![
                    Span::raw(format!("{marker}{}{required}: ", spec.label)),
                    value_span(slot_value(form, slot), focused),
                ];
                if let Some(error) = form.errors().get(spec.key) {
                    spans.push(Span::styled(format!("  {error}"), error_style));
                }
                lines.push(Line::from(spans));
            }
            FormSlot::LineItem { index, field } => {
                if !line_items_started {
                    lines.push(Line::from(""));
                    lines.push(Line::from("line items"));
                    line_items_started = true;
                }
                lines.push(Line::from(vec![
                    Span::raw(format!("{marker}#{} {}: ", index + 1, field.label())),
                    value_span(slot_value(form, slot), focused),
                ]));
            }
        }
    }

    if form.descriptor().line_items && !line_items_started {
        lines.push(Line::from(""));
        lines.push(Line::from("line items: none (ctrl+n adds one)"));
    }
    if let Some(input) = upload_input {
        lines.push(Line::from(""));
        lines.push(Line::from(format!("upload file: {input}_")));
    }
    if form.is_pending() {
        lines.push(Line::styled("saving...", Style::default().fg(Color::Yellow)));
    }
    if let Some(error) = form.last_error() {
        lines.push(Line::styled(format!("save failed: {error}"), error_style));
    }
    lines
}

const fn mode_label(mode: AppMode) -> &'static str {
    match mode {
        AppMode::Nav => "NAV",
        AppMode::Search => "SEARCH",
        AppMode::Form => "FORM",
        AppMode::Help => "HELP",
    }
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let hints = match state.mode {
        AppMode::Help => return String::new(),
        AppMode::Nav => {
            "j/k/h/l n/p | / search s sort | a add e edit d del r reload | +/- rows | ? help | q quit"
                .to_owned()
        }
        AppMode::Search => {
            let title = current_column(view_data, state.active_tab)
                .map(|column| column.title)
                .unwrap_or_default();
            format!("/{title}: {}_ | enter keep | esc clear", view_data.search_input)
        }
        AppMode::Form => {
            "tab field | enter/ctrl+s save | ctrl+n/ctrl+x line item | ctrl+u upload | esc cancel"
                .to_owned()
        }
    };
    let mode = mode_label(state.mode);
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q/ctrl+c quit\n\
nav: j/k row | h/l column | n/p page | +/- rows per page | tab/shift+tab switch tab\n\
nav: / search column | esc clear search | s sort asc/desc/off | r reload | q quit\n\
edit: a add | e/enter edit | d delete\n\
form: tab/shift+tab field | type to edit | enter or ctrl+s save | esc cancel\n\
form: ctrl+n add line item | ctrl+x remove focused line item | ctrl+u upload media\n\
help: esc or ? close"
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
