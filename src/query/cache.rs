//! Cache entries and their bookkeeping.
//!
//! This is the synchronous half of the query layer: it never awaits. The
//! `QueryClient` takes the lock, consults or updates entries, and releases it
//! before any network I/O.

use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::Arc;

use super::key::{Invalidate, QueryKey};
use crate::http::ApiError;
use crate::models::{Page, Project, Task, User};

/// A fetch that any number of waiters can await.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<QueryValue, ApiError>>>;

/// Cached payload. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Projects(Arc<Page<Project>>),
    Project(Arc<Project>),
    Tasks(Arc<Page<Task>>),
    Task(Arc<Task>),
    Users(Arc<Vec<User>>),
    Profile(Arc<User>),
}

struct InFlight {
    id: u64,
    fetch: SharedFetch,
}

#[derive(Default)]
struct Entry {
    value: Option<QueryValue>,
    stale: bool,
    in_flight: Option<InFlight>,
}

/// Observable state of one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryState {
    pub value: Option<QueryValue>,
    pub stale: bool,
    pub fetching: bool,
}

pub(crate) enum Lookup {
    /// Cached and not stale
    Fresh(QueryValue),
    /// A fetch is already running; join it
    Pending(SharedFetch),
    /// Nothing usable; start a fetch, after the superseded one if it is still running
    Miss(Option<SharedFetch>),
}

/// Key invalidated by a pattern, and whether it held data worth refetching.
pub(crate) struct Invalidated {
    pub key: QueryKey,
    pub had_value: bool,
}

#[derive(Default)]
pub(crate) struct Cache {
    entries: HashMap<QueryKey, Entry>,
    /// Detached fetches whose request may still be on the wire. The next
    /// fetch for the key waits for them, so a key never has two requests
    /// outstanding.
    superseded: HashMap<QueryKey, SharedFetch>,
}

impl Cache {
    pub fn lookup(&self, key: &QueryKey) -> Lookup {
        if let Some(entry) = self.entries.get(key) {
            if let Some(ref in_flight) = entry.in_flight {
                return Lookup::Pending(in_flight.fetch.clone());
            }
            match entry.value {
                Some(ref value) if !entry.stale => return Lookup::Fresh(value.clone()),
                _ => {}
            }
        }
        let predecessor = self
            .superseded
            .get(key)
            .filter(|fetch| fetch.peek().is_none())
            .cloned();
        Lookup::Miss(predecessor)
    }

    /// Record `fetch` as the single in-flight fetch for `key`.
    ///
    /// `fetch` must already be chained after any predecessor handed out by
    /// `lookup`; the predecessor is forgotten here.
    pub fn begin(&mut self, key: QueryKey, id: u64, fetch: SharedFetch) {
        self.superseded.remove(&key);
        self.entries.entry(key).or_default().in_flight = Some(InFlight { id, fetch });
    }

    fn supersede(
        superseded: &mut HashMap<QueryKey, SharedFetch>,
        key: &QueryKey,
        in_flight: Option<InFlight>,
    ) {
        match in_flight {
            Some(in_flight) if in_flight.fetch.peek().is_none() => {
                superseded.insert(key.clone(), in_flight.fetch);
            }
            _ => {}
        }
    }

    /// Apply the outcome of fetch `id`.
    ///
    /// Returns false when the fetch was superseded (the key was invalidated or
    /// the cache reset while it ran); its result is then ignored. A failed
    /// fetch leaves the previous value and freshness untouched.
    pub fn settle(&mut self, key: &QueryKey, id: u64, result: &Result<QueryValue, ApiError>) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        if entry.in_flight.as_ref().map(|f| f.id) != Some(id) {
            return false;
        }
        entry.in_flight = None;
        match result {
            Ok(value) => {
                entry.value = Some(value.clone());
                entry.stale = false;
                true
            }
            Err(_) => false,
        }
    }

    /// Mark every key matched by any of `patterns` stale and detach its
    /// in-flight fetch.
    pub fn invalidate(&mut self, patterns: &[Invalidate]) -> Vec<Invalidated> {
        let superseded = &mut self.superseded;
        self.entries
            .iter_mut()
            .filter(|(key, _)| patterns.iter().any(|p| p.matches(key)))
            .map(|(key, entry)| {
                entry.stale = true;
                Self::supersede(superseded, key, entry.in_flight.take());
                Invalidated {
                    key: key.clone(),
                    had_value: entry.value.is_some(),
                }
            })
            .collect()
    }

    pub fn state(&self, key: &QueryKey) -> Option<EntryState> {
        self.entries.get(key).map(|entry| EntryState {
            value: entry.value.clone(),
            stale: entry.stale,
            fetching: entry.in_flight.is_some(),
        })
    }

    pub fn snapshot(&self) -> HashMap<QueryKey, EntryState> {
        self.entries
            .keys()
            .filter_map(|key| self.state(key).map(|state| (key.clone(), state)))
            .collect()
    }

    /// Drop every entry. Running fetches are kept only as predecessors.
    pub fn clear(&mut self) {
        for (key, entry) in self.entries.drain() {
            Self::supersede(&mut self.superseded, &key, entry.in_flight);
        }
    }
}
