//! Person list view-state controller.
//!
//! # Responsibility
//! - Keep the displayed list, loading flag, error message and search term
//!   consistent with the store.
//! - Run store work on the blocking pool and publish state via `watch`.
//!
//! # Invariants
//! - At most one live subscription per controller.
//! - A snapshot is published only while its subscription generation is
//!   current; the check and the publish happen under one lock.
//! - A failed operation keeps the last known-good list.
//! - After shutdown no state change is published.

use crate::model::person::{Person, PersonId};
use crate::repo::person_repo::{PersonRepository, RepoError, RepoResult, SalaryStats};
use crate::service::person_service::PersonService;
use log::{debug, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Observable state for a person list screen.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonListState {
    /// Latest full snapshot of the active query.
    pub persons: Vec<Person>,
    /// `true` between (re)issuing a query and its first snapshot.
    pub is_loading: bool,
    /// Human-readable message of the last failure, until cleared.
    pub error: Option<String>,
    pub search_term: String,
}

/// Drives a [`PersonListState`] from live queries.
///
/// Work runs on the runtime captured at construction, so every method may
/// be called from threads outside that runtime.
pub struct PersonListController<R>
where
    R: PersonRepository + Clone + 'static,
{
    shared: Arc<Shared<R>>,
}

struct Shared<R: PersonRepository> {
    service: PersonService<R>,
    runtime: Handle,
    state: watch::Sender<PersonListState>,
    active: Mutex<ActiveQuery>,
}

#[derive(Default)]
struct ActiveQuery {
    generation: u64,
    task: Option<JoinHandle<()>>,
    shut_down: bool,
}

impl<R> PersonListController<R>
where
    R: PersonRepository + Clone + 'static,
{
    /// Creates the controller on the current runtime and subscribes to the
    /// full list.
    ///
    /// # Panics
    /// - When called outside a Tokio runtime; use [`Self::with_runtime`].
    pub fn new(service: PersonService<R>) -> Self {
        Self::with_runtime(service, Handle::current())
    }

    /// Creates the controller on `runtime` and subscribes to the full list.
    pub fn with_runtime(service: PersonService<R>, runtime: Handle) -> Self {
        let (state, _) = watch::channel(PersonListState::default());
        let controller = Self {
            shared: Arc::new(Shared {
                service,
                runtime,
                state,
                active: Mutex::new(ActiveQuery::default()),
            }),
        };
        controller.set_search_term(String::new());
        controller
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<PersonListState> {
        self.shared.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PersonListState {
        self.shared.state.borrow().clone()
    }

    /// Stores `term` and re-issues the list query.
    ///
    /// A blank term subscribes to the full list, anything else to a search.
    /// The previous subscription is cancelled before the new one starts.
    pub fn set_search_term(&self, term: impl Into<String>) {
        let term = term.into();
        let mut active = self.shared.active.lock();
        if active.shut_down {
            return;
        }

        active.generation += 1;
        if let Some(task) = active.task.take() {
            task.abort();
        }
        self.shared.state.send_modify(|state| {
            state.search_term = term.clone();
            state.is_loading = true;
        });

        let generation = active.generation;
        debug!("event=list_subscribe module=viewstate status=start generation={generation}");
        active.task = Some(self.shared.runtime.spawn(run_subscription(
            Arc::clone(&self.shared),
            generation,
            term,
        )));
    }

    pub fn clear_error(&self) {
        self.shared.publish_unless_shut_down(|state| state.error = None);
    }

    pub fn insert(&self, person: Person) -> JoinHandle<()> {
        self.spawn_mutation("inserting person", move |service| {
            service.insert(&person).map(|_| ())
        })
    }

    /// Replaces the row with `person.id`; a missing ID is a silent no-op.
    pub fn update(&self, person: Person) -> JoinHandle<()> {
        self.spawn_mutation("updating person", move |service| {
            let changed = service.update(&person)?;
            if changed == 0 {
                debug!(
                    "event=person_update module=viewstate status=noop id={}",
                    person.id
                );
            }
            Ok(())
        })
    }

    pub fn delete(&self, person: &Person) -> JoinHandle<()> {
        self.delete_by_id(person.id)
    }

    pub fn delete_by_id(&self, id: PersonId) -> JoinHandle<()> {
        self.spawn_mutation("deleting person", move |service| {
            service.delete_by_id(id).map(|_| ())
        })
    }

    pub fn delete_all(&self) -> JoinHandle<()> {
        self.spawn_mutation("deleting all persons", |service| {
            service.delete_all().map(|_| ())
        })
    }

    /// Reads one person; failures land in the error state and yield `None`.
    pub async fn get_by_id(&self, id: PersonId) -> Option<Person> {
        self.read("loading person", move |service| service.get_by_id(id))
            .await
            .flatten()
    }

    pub async fn count(&self) -> Option<u64> {
        self.read("counting persons", |service| service.count())
            .await
    }

    pub async fn salary_stats(&self) -> Option<SalaryStats> {
        self.read("loading salary statistics", |service| service.salary_stats())
            .await
    }

    /// Cancels the live subscription and freezes the state.
    pub fn shutdown(&self) {
        let mut active = self.shared.active.lock();
        if active.shut_down {
            return;
        }
        active.shut_down = true;
        active.generation += 1;
        if let Some(task) = active.task.take() {
            task.abort();
        }
        debug!("event=list_shutdown module=viewstate status=ok");
    }

    fn spawn_mutation<F>(&self, action: &'static str, op: F) -> JoinHandle<()>
    where
        F: FnOnce(&PersonService<R>) -> RepoResult<()> + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.shared.runtime.spawn(async move {
            let service = shared.service.clone();
            match run_blocking(&shared.runtime, move || op(&service)).await {
                Ok(()) => {
                    shared.publish_unless_shut_down(|state| state.error = None);
                }
                Err(err) => {
                    warn!("event=person_mutation module=viewstate status=error action=\"{action}\" error={err}");
                    shared.publish_unless_shut_down(|state| {
                        state.error = Some(format!("Error {action}: {err}"));
                    });
                }
            }
        })
    }

    async fn read<T, F>(&self, action: &'static str, op: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&PersonService<R>) -> RepoResult<T> + Send + 'static,
    {
        let service = self.shared.service.clone();
        match run_blocking(&self.shared.runtime, move || op(&service)).await {
            Ok(value) => {
                if self.shared.active.lock().shut_down {
                    return None;
                }
                Some(value)
            }
            Err(err) => {
                warn!("event=person_read module=viewstate status=error action=\"{action}\" error={err}");
                self.shared.publish_unless_shut_down(|state| {
                    state.error = Some(format!("Error {action}: {err}"));
                });
                None
            }
        }
    }
}

impl<R> Drop for PersonListController<R>
where
    R: PersonRepository + Clone + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<R: PersonRepository> Shared<R> {
    fn publish_if_current<F>(&self, generation: u64, apply: F) -> bool
    where
        F: FnOnce(&mut PersonListState),
    {
        let active = self.active.lock();
        if active.shut_down || active.generation != generation {
            return false;
        }
        self.state.send_modify(apply);
        true
    }

    fn publish_unless_shut_down<F>(&self, apply: F)
    where
        F: FnOnce(&mut PersonListState),
    {
        let active = self.active.lock();
        if active.shut_down {
            return;
        }
        self.state.send_modify(apply);
    }
}

async fn run_subscription<R>(shared: Arc<Shared<R>>, generation: u64, term: String)
where
    R: PersonRepository + Clone + 'static,
{
    let searching = !term.trim().is_empty();
    let action = if searching {
        "searching persons"
    } else {
        "loading persons"
    };

    let service = shared.service.clone();
    let started = run_blocking(&shared.runtime, move || {
        if searching {
            service.observe_search(&term)
        } else {
            service.observe_all()
        }
    })
    .await;

    let mut live = match started {
        Ok(live) => live,
        Err(err) => {
            report_subscription_error(&shared, generation, action, &err);
            return;
        }
    };

    while let Some(snapshot) = live.next().await {
        match snapshot {
            Ok(persons) => {
                let rows = persons.len();
                if shared.publish_if_current(generation, |state| {
                    state.persons = persons;
                    state.is_loading = false;
                }) {
                    debug!("event=list_publish module=viewstate status=ok generation={generation} rows={rows}");
                } else {
                    return;
                }
            }
            Err(err) => report_subscription_error(&shared, generation, action, &err),
        }
    }
    debug!("event=list_subscribe module=viewstate status=ended generation={generation}");
}

fn report_subscription_error<R: PersonRepository>(
    shared: &Shared<R>,
    generation: u64,
    action: &str,
    err: &RepoError,
) {
    warn!("event=list_subscribe module=viewstate status=error generation={generation} error={err}");
    shared.publish_if_current(generation, |state| {
        state.error = Some(format!("Error {action}: {err}"));
        state.is_loading = false;
    });
}

async fn run_blocking<T, F>(runtime: &Handle, op: F) -> RepoResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> RepoResult<T> + Send + 'static,
{
    runtime
        .spawn_blocking(op)
        .await
        .map_err(|err| RepoError::Worker(err.to_string()))?
}
