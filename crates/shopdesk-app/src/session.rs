// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::forms::{FormError, SubmitRequest};
use crate::ids::RecordId;
use crate::model::{EntityKind, Record};
use crate::remote::{RemoteResource, Resources};
use crate::store::{ResourceStore, Stores};
use crate::table::{ResourceTableView, TableError};

/// Identity of one issued request. Completions from an older generation
/// belong to torn-down views and are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub id: u64,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    List,
    Submit(SubmitRequest),
    Delete(RecordId),
}

impl RequestKind {
    const fn is_mutation(&self) -> bool {
        !matches!(self, Self::List)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub ticket: Ticket,
    pub entity: EntityKind,
    pub kind: RequestKind,
}

impl RemoteRequest {
    /// Runs the network call. Blocking; callers decide which thread.
    pub fn execute(self, client: &dyn RemoteResource) -> Completion {
        let outcome = match self.kind {
            RequestKind::List => Outcome::Listed(client.list()),
            RequestKind::Submit(request) => {
                let result = request.execute(client);
                Outcome::Saved { request, result }
            }
            RequestKind::Delete(id) => {
                let result = client.delete(&id);
                Outcome::Deleted { id, result }
            }
        };
        Completion {
            ticket: self.ticket,
            entity: self.entity,
            outcome,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Listed(Result<Vec<Record>, RemoteError>),
    Saved {
        request: SubmitRequest,
        result: Result<Record, RemoteError>,
    },
    Deleted {
        id: RecordId,
        result: Result<(), RemoteError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub ticket: Ticket,
    pub entity: EntityKind,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Self::Success(message) | Self::Error(message) => message,
        }
    }
}

/// What a completion asks of its caller: messages to show and requests that
/// were waiting their turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Effects {
    pub notifications: Vec<Notification>,
    pub next: Vec<RemoteRequest>,
}

impl Effects {
    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    fn merge(&mut self, other: Self) {
        self.notifications.extend(other.notifications);
        self.next.extend(other.next);
    }
}

/// One mutation in flight per entity, the rest wait in order.
#[derive(Debug, Default)]
struct Lane {
    in_flight: Option<u64>,
    queued: VecDeque<RemoteRequest>,
}

/// The stores and both table views, plus request bookkeeping.
#[derive(Debug)]
pub struct Session {
    stores: Stores,
    views: BTreeMap<EntityKind, ResourceTableView>,
    lanes: BTreeMap<EntityKind, Lane>,
    page_size: usize,
    generation: u64,
    next_id: u64,
}

impl Session {
    pub fn new(page_size: usize) -> Result<Self, TableError> {
        Ok(Self {
            stores: Stores::default(),
            views: Self::fresh_views(page_size)?,
            lanes: BTreeMap::new(),
            page_size,
            generation: 0,
            next_id: 0,
        })
    }

    fn fresh_views(page_size: usize) -> Result<BTreeMap<EntityKind, ResourceTableView>, TableError> {
        EntityKind::ALL
            .into_iter()
            .map(|entity| {
                ResourceTableView::new(entity)
                    .with_page_size(page_size)
                    .map(|view| (entity, view))
            })
            .collect()
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn store(&self, entity: EntityKind) -> &ResourceStore {
        self.stores.get(entity)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self, entity: EntityKind) -> &ResourceTableView {
        &self.views[&entity]
    }

    /// A view together with the store it reads.
    pub fn parts_mut(&mut self, entity: EntityKind) -> (&mut ResourceTableView, &mut ResourceStore) {
        let view = self
            .views
            .entry(entity)
            .or_insert_with(|| ResourceTableView::new(entity));
        (view, self.stores.get_mut(entity))
    }

    pub fn view_mut(&mut self, entity: EntityKind) -> &mut ResourceTableView {
        self.parts_mut(entity).0
    }

    pub fn pending_mutations(&self, entity: EntityKind) -> usize {
        self.lanes.get(&entity).map_or(0, |lane| {
            usize::from(lane.in_flight.is_some()) + lane.queued.len()
        })
    }

    fn ticket(&mut self) -> Ticket {
        self.next_id += 1;
        Ticket {
            id: self.next_id,
            generation: self.generation,
        }
    }

    pub fn request_load(&mut self, entity: EntityKind) -> Result<RemoteRequest, TableError> {
        self.stores.get_mut(entity).begin_load()?;
        Ok(RemoteRequest {
            ticket: self.ticket(),
            entity,
            kind: RequestKind::List,
        })
    }

    /// Validates the open form. `Ok(None)` means the save was queued behind
    /// another mutation of the same entity.
    pub fn request_submit(&mut self, entity: EntityKind) -> Result<Option<RemoteRequest>, FormError> {
        let request = self.view_mut(entity).form_mut().begin_submit()?;
        let request = RemoteRequest {
            ticket: self.ticket(),
            entity,
            kind: RequestKind::Submit(request),
        };
        Ok(self.enqueue(request))
    }

    pub fn request_delete(&mut self, entity: EntityKind, id: RecordId) -> Option<RemoteRequest> {
        let request = RemoteRequest {
            ticket: self.ticket(),
            entity,
            kind: RequestKind::Delete(id),
        };
        self.enqueue(request)
    }

    fn enqueue(&mut self, request: RemoteRequest) -> Option<RemoteRequest> {
        let lane = self.lanes.entry(request.entity).or_default();
        if lane.in_flight.is_some() {
            debug!(entity = %request.entity, ticket = request.ticket.id, "mutation queued");
            lane.queued.push_back(request);
            return None;
        }
        lane.in_flight = Some(request.ticket.id);
        Some(request)
    }

    fn release(&mut self, entity: EntityKind, effects: &mut Effects) {
        let lane = self.lanes.entry(entity).or_default();
        lane.in_flight = None;
        if let Some(next) = lane.queued.pop_front() {
            lane.in_flight = Some(next.ticket.id);
            effects.next.push(next);
        }
    }

    /// Applies a finished request to the stores and views.
    pub fn complete(&mut self, completion: Completion) -> Effects {
        let mut effects = Effects::default();
        if completion.ticket.generation != self.generation {
            debug!(
                entity = %completion.entity,
                ticket = completion.ticket.id,
                "dropping completion from a torn-down view"
            );
            return effects;
        }

        let entity = completion.entity;
        match completion.outcome {
            Outcome::Listed(result) => {
                let (view, store) = self.parts_mut(entity);
                let applied = match result {
                    Ok(records) => store.load_succeeded(records),
                    Err(error) => {
                        effects.notify(Notification::Error(error.to_string()));
                        store.load_failed(error.to_string())
                    }
                };
                if let Err(error) = applied {
                    warn!(%entity, %error, "load completion ignored");
                }
                view.clamp(store);
            }
            Outcome::Saved { request, result } => {
                let (view, store) = self.parts_mut(entity);
                let notification = match view.form_mut().finish_submit(&request, result, store) {
                    Ok(outcome) => Notification::Success(outcome.notice(entity)),
                    Err(error) => Notification::Error(error.to_string()),
                };
                view.clamp(store);
                effects.notify(notification);
                self.release(entity, &mut effects);
            }
            Outcome::Deleted { id, result } => {
                let (view, store) = self.parts_mut(entity);
                let notification = match result
                    .map_err(TableError::from)
                    .and_then(|()| view.apply_delete(store, &id))
                {
                    Ok(notice) => Notification::Success(notice),
                    Err(error) => Notification::Error(error.to_string()),
                };
                effects.notify(notification);
                self.release(entity, &mut effects);
            }
        }
        effects
    }

    /// Abandons every outstanding request. Late completions become no-ops and
    /// the views start over.
    pub fn teardown(&mut self) -> Result<(), TableError> {
        self.generation += 1;
        self.lanes.clear();
        self.views = Self::fresh_views(self.page_size)?;
        for entity in EntityKind::ALL {
            let store = self.stores.get_mut(entity);
            if store.status().is_loading() {
                store.load_failed("request abandoned")?;
            }
        }
        debug!(generation = self.generation, "session torn down");
        Ok(())
    }

    /// Runs `request` and everything it releases, blocking.
    pub fn drive(&mut self, request: RemoteRequest, resources: &Resources) -> Effects {
        let mut effects = Effects::default();
        let mut pending = VecDeque::from([request]);
        while let Some(request) = pending.pop_front() {
            let client = resources.get(request.entity).clone();
            let mut step = self.complete(request.execute(client.as_ref()));
            pending.extend(step.next.drain(..));
            effects.merge(step);
        }
        effects
    }
}

#[cfg(test)]
mod tests {
    use super::{Notification, RequestKind, Session};
    use crate::test_support::{FakeResource, valid_order};
    use crate::{EntityKind, FetchStatus, Record, RecordId, Resources};
    use std::sync::Arc;

    fn resources(orders: FakeResource) -> Resources {
        Resources::new(Arc::new(orders), Arc::new(FakeResource::new(EntityKind::Products)))
    }

    fn open_valid_order(session: &mut Session) {
        let form = session.view_mut(EntityKind::Orders).form_mut();
        form.open_create().expect("opens");
        for (key, value) in valid_order() {
            form.set_field(key, value).expect("known field");
        }
    }

    #[test]
    fn load_then_complete_fills_the_store() {
        let mut session = Session::new(4).expect("valid page size");
        let resources = resources(
            FakeResource::new(EntityKind::Orders).with_records(vec![Record::new("o1")]),
        );

        let request = session.request_load(EntityKind::Orders).expect("idle");
        assert_eq!(session.store(EntityKind::Orders).status(), &FetchStatus::Loading);
        assert!(session.request_load(EntityKind::Orders).is_err());

        let effects = session.drive(request, &resources);
        assert!(effects.notifications.is_empty());
        assert_eq!(session.store(EntityKind::Orders).len(), 1);
        assert_eq!(session.store(EntityKind::Orders).status(), &FetchStatus::Succeeded);
    }

    #[test]
    fn failed_load_becomes_fetch_status_and_notification() {
        let mut session = Session::new(4).expect("valid page size");
        let resources = resources(FakeResource::new(EntityKind::Orders).failing());
        let request = session.request_load(EntityKind::Orders).expect("idle");
        let effects = session.drive(request, &resources);

        assert!(matches!(
            session.store(EntityKind::Orders).status(),
            FetchStatus::Failed(_)
        ));
        assert!(matches!(effects.notifications[..], [Notification::Error(_)]));
    }

    #[test]
    fn completions_after_teardown_are_dropped() {
        let mut session = Session::new(4).expect("valid page size");
        let client = FakeResource::new(EntityKind::Orders).with_records(vec![Record::new("o1")]);

        let request = session.request_load(EntityKind::Orders).expect("idle");
        session.teardown().expect("teardown");
        let effects = session.complete(request.execute(&client));

        assert_eq!(effects, Default::default());
        assert!(session.store(EntityKind::Orders).is_empty());
        assert!(matches!(
            session.store(EntityKind::Orders).status(),
            FetchStatus::Failed(_)
        ));
        assert!(session.request_load(EntityKind::Orders).is_ok());
    }

    #[test]
    fn mutations_of_one_entity_run_one_at_a_time() {
        let mut session = Session::new(4).expect("valid page size");
        let resources = resources(FakeResource::new(EntityKind::Orders));
        session.parts_mut(EntityKind::Orders).1.added(Record::new("a"));

        open_valid_order(&mut session);
        let first = session
            .request_submit(EntityKind::Orders)
            .expect("valid draft")
            .expect("lane is free");
        let queued = session.request_delete(EntityKind::Orders, RecordId::new("a"));
        assert!(queued.is_none());
        assert_eq!(session.pending_mutations(EntityKind::Orders), 2);

        let client = resources.get(EntityKind::Orders).clone();
        let effects = session.complete(first.execute(client.as_ref()));
        assert_eq!(
            effects.notifications,
            vec![Notification::Success("order added".to_owned())]
        );
        assert_eq!(effects.next.len(), 1);
        assert!(matches!(effects.next[0].kind, RequestKind::Delete(_)));

        let next = effects.next.into_iter().next().expect("released delete");
        let effects = session.drive(next, &resources);
        assert_eq!(
            effects.notifications,
            vec![Notification::Success("order deleted".to_owned())]
        );
        assert_eq!(session.pending_mutations(EntityKind::Orders), 0);
        assert_eq!(session.store(EntityKind::Orders).len(), 1);
    }

    #[test]
    fn failed_save_keeps_form_open_and_reports() {
        let mut session = Session::new(4).expect("valid page size");
        let resources = resources(FakeResource::new(EntityKind::Orders).failing());
        open_valid_order(&mut session);

        let request = session
            .request_submit(EntityKind::Orders)
            .expect("valid draft")
            .expect("lane is free");
        let effects = session.drive(request, &resources);

        assert!(matches!(effects.notifications[..], [Notification::Error(_)]));
        assert!(session.view(EntityKind::Orders).form().is_open());
        assert!(session.store(EntityKind::Orders).is_empty());
    }

    #[test]
    fn invalid_draft_issues_no_request() {
        let mut session = Session::new(4).expect("valid page size");
        session
            .view_mut(EntityKind::Products)
            .form_mut()
            .open_create()
            .expect("opens");
        assert!(session.request_submit(EntityKind::Products).is_err());
        assert_eq!(session.pending_mutations(EntityKind::Products), 0);
    }
}
