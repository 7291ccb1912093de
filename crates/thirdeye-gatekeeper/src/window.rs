//! Per-actor sliding windows
//!
//! Entries older than the TTL are dropped lazily on access and eagerly by
//! [`ActorWindows::evict_expired`]. The number of tracked actors is capped;
//! past the cap the least recently seen actor is dropped.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct ActorEntry<T> {
    events: VecDeque<(Instant, T)>,
    last_seen: Instant,
}

/// Timestamped events per actor within a fixed window
#[derive(Debug)]
pub struct ActorWindows<T> {
    entries: HashMap<String, ActorEntry<T>>,
    ttl: Duration,
    max_actors: usize,
}

impl<T> ActorWindows<T> {
    /// Create an empty set of windows
    pub fn new(ttl: Duration, max_actors: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_actors: max_actors.max(1),
        }
    }

    /// Window length
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn prune(&mut self, actor: &str, now: Instant) -> Option<&VecDeque<(Instant, T)>> {
        let ttl = self.ttl;
        let entry = self.entries.get_mut(actor)?;
        while let Some((at, _)) = entry.events.front() {
            if now.saturating_duration_since(*at) < ttl {
                break;
            }
            entry.events.pop_front();
        }
        Some(&entry.events)
    }

    /// Live events for an actor, oldest first
    pub fn events(&mut self, actor: &str, now: Instant) -> impl Iterator<Item = &T> {
        self.prune(actor, now)
            .into_iter()
            .flat_map(|events| events.iter().map(|(_, v)| v))
    }

    /// Number of live events for an actor
    pub fn count(&mut self, actor: &str, now: Instant) -> usize {
        self.events(actor, now).count()
    }

    /// Time until the actor's oldest live event leaves the window
    pub fn time_until_slot(&mut self, actor: &str, now: Instant) -> Option<Duration> {
        let ttl = self.ttl;
        self.prune(actor, now)
            .and_then(|events| events.front())
            .map(|(at, _)| ttl.saturating_sub(now.saturating_duration_since(*at)))
    }

    /// Append an event for an actor
    pub fn record(&mut self, actor: &str, value: T, now: Instant) {
        if !self.entries.contains_key(actor) && self.entries.len() >= self.max_actors {
            self.evict_least_recent();
        }
        let entry = self.entries.entry(actor.to_string()).or_insert_with(|| ActorEntry {
            events: VecDeque::new(),
            last_seen: now,
        });
        entry.last_seen = now;
        entry.events.push_back((now, value));
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_seen)
            .map(|(actor, _)| actor.clone());
        if let Some(actor) = oldest {
            self.entries.remove(&actor);
        }
    }

    /// Drop expired events and actors left with none; returns events dropped
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let mut dropped = 0;
        let ttl = self.ttl;
        self.entries.retain(|_, entry| {
            let before = entry.events.len();
            entry
                .events
                .retain(|(at, _)| now.saturating_duration_since(*at) < ttl);
            dropped += before - entry.events.len();
            !entry.events.is_empty()
        });
        dropped
    }

    /// Drop all of an actor's events; returns whether it was tracked
    pub fn forget(&mut self, actor: &str) -> bool {
        self.entries.remove(actor).is_some()
    }

    /// Whether the actor has any live event
    pub fn contains(&mut self, actor: &str, now: Instant) -> bool {
        self.count(actor, now) > 0
    }

    /// Number of actors currently tracked
    pub fn tracked_actors(&self) -> usize {
        self.entries.len()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
