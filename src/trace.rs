//! Congestion-window and drop tracing.
//!
//! Components report observations to the [`Tracer`] owned by the network;
//! nothing is recorded for a source until someone subscribes to it. Each
//! observation matching at least one subscription is appended once to the
//! record log, then handed to the matching listeners in registration order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::net::LinkId;
use crate::sim::SimTime;

/// Handle returned by [`Tracer::subscribe`]; pass it to [`Tracer::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceSource {
    /// Congestion-window changes of one TCP connection.
    Cwnd(u64),
    /// Drop-tail drops on one link's queue.
    QueueDrop(LinkId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    /// New congestion window, rounded down to whole segments.
    CwndSample { conn_id: u64, cwnd: u64 },
    /// A packet rejected by a full queue. `pkt_id` is the packet uid.
    Drop {
        link_from: usize,
        link_to: usize,
        pkt_id: u64,
        size_bytes: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub t_ns: u64,
    #[serde(flatten)]
    pub event: TraceEvent,
}

impl TraceRecord {
    pub fn time(&self) -> SimTime {
        SimTime(self.t_ns)
    }

    pub fn is_cwnd(&self) -> bool {
        matches!(self.event, TraceEvent::CwndSample { .. })
    }

    pub fn is_drop(&self) -> bool {
        matches!(self.event, TraceEvent::Drop { .. })
    }

    /// The integer carried by the record: cwnd segments, or dropped bytes.
    pub fn value(&self) -> u64 {
        match self.event {
            TraceEvent::CwndSample { cwnd, .. } => cwnd,
            TraceEvent::Drop { size_bytes, .. } => size_bytes as u64,
        }
    }
}

/// Cwnd records print as `<time_seconds> \t <cwnd>`, drops as the one-line
/// report `<time_seconds> dropped a packet (<size> bytes) with seq_no:<uid>`.
impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.time().as_secs_f64();
        match &self.event {
            TraceEvent::CwndSample { cwnd, .. } => write!(f, "{secs} \t {cwnd}"),
            TraceEvent::Drop {
                pkt_id, size_bytes, ..
            } => write!(
                f,
                "{secs:10.4} dropped a packet ({size_bytes:4} bytes) with seq_no:{pkt_id}"
            ),
        }
    }
}

pub type TraceListener = Box<dyn FnMut(&TraceRecord) + Send>;

struct Subscription {
    id: ListenerId,
    source: TraceSource,
    listener: Option<TraceListener>,
}

#[derive(Default)]
pub struct Tracer {
    next_id: u64,
    subs: Vec<Subscription>,
    records: Vec<TraceRecord>,
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("subscriptions", &self.subs.len())
            .field("records", &self.records.len())
            .finish()
    }
}

impl Tracer {
    /// Record events from `source` without a callback.
    pub fn subscribe(&mut self, source: TraceSource) -> ListenerId {
        self.register(source, None)
    }

    /// Record events from `source` and call `listener` for each one.
    pub fn subscribe_with<F>(&mut self, source: TraceSource, listener: F) -> ListenerId
    where
        F: FnMut(&TraceRecord) + Send + 'static,
    {
        self.register(source, Some(Box::new(listener)))
    }

    fn register(&mut self, source: TraceSource, listener: Option<TraceListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.subs.push(Subscription {
            id,
            source,
            listener,
        });
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.subs.len();
        self.subs.retain(|s| s.id != id);
        self.subs.len() != before
    }

    pub fn is_watched(&self, source: TraceSource) -> bool {
        self.subs.iter().any(|s| s.source == source)
    }

    pub fn emit(&mut self, source: TraceSource, now: SimTime, event: TraceEvent) {
        if !self.is_watched(source) {
            return;
        }
        self.records.push(TraceRecord {
            t_ns: now.0,
            event,
        });
        let Some(record) = self.records.last() else {
            return;
        };
        for sub in self.subs.iter_mut().filter(|s| s.source == source) {
            if let Some(listener) = sub.listener.as_mut() {
                listener(record);
            }
        }
    }

    /// All records so far, in emission order.
    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Move the records out, leaving an empty log (subscriptions stay).
    pub fn take_records(&mut self) -> Vec<TraceRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn cwnd_samples(&self, conn_id: u64) -> impl Iterator<Item = &TraceRecord> + '_ {
        self.records.iter().filter(move |r| {
            matches!(r.event, TraceEvent::CwndSample { conn_id: c, .. } if c == conn_id)
        })
    }

    pub fn drops(&self) -> impl Iterator<Item = &TraceRecord> + '_ {
        self.records.iter().filter(|r| r.is_drop())
    }
}
