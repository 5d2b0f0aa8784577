//! Live query subscriptions.
//!
//! # Responsibility
//! - Re-run a list query after every store change and yield the full result.
//!
//! # Invariants
//! - The first `next()` yields the current snapshot without waiting.
//! - Writes that land between two polls coalesce into one fresh snapshot.
//! - Queries run on the blocking pool, never on the polling task.
//! - Dropping the subscription is the unsubscribe.

use crate::model::person::Person;
use crate::repo::person_repo::{PersonQuery, PersonRepository, RepoError, RepoResult};
use log::debug;
use tokio::sync::watch;

/// Subscription yielding full snapshots of one [`PersonQuery`].
pub struct LiveQuery<R> {
    repo: R,
    query: PersonQuery,
    changes: watch::Receiver<u64>,
    primed: bool,
}

impl<R> LiveQuery<R>
where
    R: PersonRepository + Clone + 'static,
{
    pub(crate) fn start(repo: R, query: PersonQuery) -> RepoResult<Self> {
        let changes = repo.subscribe_changes()?;
        Ok(Self {
            repo,
            query,
            changes,
            primed: false,
        })
    }

    pub fn query(&self) -> &PersonQuery {
        &self.query
    }

    /// Waits for the next snapshot.
    ///
    /// Returns `None` once the store has been closed.
    pub async fn next(&mut self) -> Option<RepoResult<Vec<Person>>> {
        if self.primed {
            if self.changes.changed().await.is_err() {
                debug!("event=live_query_end module=repo status=ok reason=store_closed");
                return None;
            }
        } else {
            self.primed = true;
            let _ = self.changes.borrow_and_update();
        }

        let generation = *self.changes.borrow();
        let snapshot = self.load().await;
        if let Ok(persons) = &snapshot {
            debug!(
                "event=live_query_emit module=repo status=ok generation={} rows={}",
                generation,
                persons.len()
            );
        }
        Some(snapshot)
    }

    async fn load(&self) -> RepoResult<Vec<Person>> {
        let repo = self.repo.clone();
        let query = self.query.clone();
        tokio::task::spawn_blocking(move || repo.list(&query))
            .await
            .map_err(|err| RepoError::Worker(err.to_string()))?
    }
}
