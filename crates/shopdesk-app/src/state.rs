// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::model::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Search,
    Form,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_tab: EntityKind,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            active_tab: EntityKind::Orders,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextTab,
    PrevTab,
    SetActiveTab(EntityKind),
    OpenSearch,
    OpenForm,
    OpenHelp,
    ExitToNav,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    TabChanged(EntityKind),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextTab => self.rotate_tab(1),
            AppCommand::PrevTab => self.rotate_tab(-1),
            AppCommand::SetActiveTab(tab) => {
                if self.active_tab == tab {
                    return Vec::new();
                }
                self.active_tab = tab;
                vec![AppEvent::TabChanged(tab)]
            }
            AppCommand::OpenSearch => self.enter(AppMode::Search),
            AppCommand::OpenForm => self.enter(AppMode::Form),
            AppCommand::OpenHelp => self.enter(AppMode::Help),
            AppCommand::ExitToNav => self.enter(AppMode::Nav),
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn enter(&mut self, mode: AppMode) -> Vec<AppEvent> {
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<AppEvent> {
        // Tabs are fixed while a form or search prompt owns the keyboard.
        if self.mode != AppMode::Nav {
            return Vec::new();
        }
        let tabs = EntityKind::ALL;
        let current = tabs
            .iter()
            .position(|tab| *tab == self.active_tab)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_tab = tabs[next];
        vec![AppEvent::TabChanged(self.active_tab)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppMode, AppState};
    use crate::EntityKind;

    #[test]
    fn tab_rotation_wraps() {
        let mut state = AppState {
            active_tab: EntityKind::Products,
            ..AppState::default()
        };

        let events = state.dispatch(AppCommand::NextTab);
        assert_eq!(state.active_tab, EntityKind::Orders);
        assert_eq!(events, vec![AppEvent::TabChanged(EntityKind::Orders)]);

        state.dispatch(AppCommand::PrevTab);
        assert_eq!(state.active_tab, EntityKind::Products);
    }

    #[test]
    fn tabs_hold_still_outside_nav() {
        let mut state = AppState::default();
        state.dispatch(AppCommand::OpenForm);
        assert!(state.dispatch(AppCommand::NextTab).is_empty());
        assert_eq!(state.active_tab, EntityKind::Orders);
    }

    #[test]
    fn set_active_tab_is_quiet_when_unchanged() {
        let mut state = AppState::default();
        assert!(state.dispatch(AppCommand::SetActiveTab(EntityKind::Orders)).is_empty());
        assert_eq!(
            state.dispatch(AppCommand::SetActiveTab(EntityKind::Products)),
            vec![AppEvent::TabChanged(EntityKind::Products)]
        );
    }

    #[test]
    fn status_set_and_clear() {
        let mut state = AppState::default();
        let events = state.dispatch(AppCommand::SetStatus("order added".to_owned()));
        assert_eq!(state.status_line.as_deref(), Some("order added"));
        assert_eq!(events, vec![AppEvent::StatusUpdated("order added".to_owned())]);

        state.dispatch(AppCommand::ClearStatus);
        assert_eq!(state.status_line, None);
    }

    #[test]
    fn mode_transitions() {
        let mut state = AppState::default();

        state.dispatch(AppCommand::OpenSearch);
        assert_eq!(state.mode, AppMode::Search);

        state.dispatch(AppCommand::OpenForm);
        assert_eq!(state.mode, AppMode::Form);

        state.dispatch(AppCommand::OpenHelp);
        assert_eq!(state.mode, AppMode::Help);

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
    }
}
