//! Bookkeeping for external fetches.
//!
//! Each fetch kind has at most one outstanding request. Issuing a new ticket
//! supersedes the previous one, and a response is applied only when it
//! carries the latest ticket for its kind.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// State of one externally fetched snapshot.
///
/// Derivations treat everything except `Ready` as "no data".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "data", rename_all = "lowercase")]
pub enum DataState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for DataState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> DataState<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    Occupancy,
    Arrivals,
    Hotspots,
    Simulation,
}

/// Proof of which request a response belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub kind: FetchKind,
    /// Selection the request was made for, e.g. a traffic volume id
    pub key: String,
    pub seq: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RequestGate {
    next_seq: u64,
    latest: HashMap<FetchKind, Ticket>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for `kind`, superseding any outstanding one.
    pub fn issue(&mut self, kind: FetchKind, key: impl Into<String>) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            kind,
            key: key.into(),
            seq: self.next_seq,
        };
        self.latest.insert(kind, ticket.clone());
        ticket
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.latest.get(&ticket.kind) == Some(ticket)
    }

    /// Accept a response. Each ticket is accepted at most once.
    pub fn accept(&mut self, ticket: &Ticket) -> bool {
        if self.is_current(ticket) {
            self.latest.remove(&ticket.kind);
            true
        } else {
            false
        }
    }

    /// Drop the outstanding request of `kind`, if any.
    pub fn invalidate(&mut self, kind: FetchKind) {
        self.latest.remove(&kind);
    }
}
