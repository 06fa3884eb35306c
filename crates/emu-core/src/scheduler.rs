//! Deterministic virtual-clock event scheduler.
//!
//! All timed hardware mutation runs on one strand: the owner of the
//! scheduler pops due events in (time, insertion) order and invokes their
//! callbacks one at a time. Requests from other threads never touch the
//! queue directly; they go through a locked hand-off queue that is drained
//! onto the strand before every dispatch step.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use crate::Ticks;

/// Callback invoked when an event fires.
///
/// Receives the scheduler's owner, the opaque userdata given at scheduling
/// time, and how many ticks late the event is being delivered.
pub type EventCallback<S> = fn(&mut S, u64, i64);

/// Which execution context a scheduling request comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FromThread {
    /// The emulation strand itself.
    Cpu,
    /// Any other thread (UI, debugger, host I/O).
    NonCpu,
    /// Unknown origin. The `&mut` API is only reachable from the strand,
    /// so this is treated as [`FromThread::Cpu`].
    Any,
}

/// Handle to a registered event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventType(usize);

struct Registration<S> {
    name: &'static str,
    callback: EventCallback<S>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Event {
    time: Ticks,
    fifo_order: u64,
    event_type: EventType,
    userdata: u64,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.time, self.fifo_order).cmp(&(other.time, other.fifo_order))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A request queued from outside the strand. Its delay is measured from
/// the moment it is moved onto the strand.
#[derive(Debug, Clone, Copy)]
struct PendingEvent {
    delay: Ticks,
    event_type: EventType,
    userdata: u64,
}

type HandoffQueue = Arc<Mutex<VecDeque<PendingEvent>>>;

/// An event popped from the queue, ready to be delivered.
pub struct DueEvent<S> {
    pub name: &'static str,
    pub callback: EventCallback<S>,
    pub userdata: u64,
    pub cycles_late: i64,
}

impl<S> DueEvent<S> {
    /// Deliver the event to its owner.
    pub fn fire(self, owner: &mut S) {
        (self.callback)(owner, self.userdata, self.cycles_late);
    }
}

/// Virtual clock and event queue.
///
/// `S` is the type that owns the scheduler and is handed to every callback.
pub struct CoreTiming<S> {
    registrations: Vec<Registration<S>>,
    queue: BinaryHeap<Reverse<Event>>,
    fifo_order: u64,
    now: Ticks,
    handoff: HandoffQueue,
}

impl<S> CoreTiming<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            queue: BinaryHeap::new(),
            fifo_order: 0,
            now: Ticks::ZERO,
            handoff: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Register a named event type.
    ///
    /// Registering a name twice replaces the callback and returns the
    /// original handle, so a subsystem can be initialised again after a
    /// shutdown without leaking event types.
    pub fn register_event(&mut self, name: &'static str, callback: EventCallback<S>) -> EventType {
        if let Some(index) = self.registrations.iter().position(|r| r.name == name) {
            self.registrations[index].callback = callback;
            return EventType(index);
        }
        self.registrations.push(Registration { name, callback });
        EventType(self.registrations.len() - 1)
    }

    /// Name of a registered event type.
    #[must_use]
    pub fn event_name(&self, event_type: EventType) -> &'static str {
        self.registrations[event_type.0].name
    }

    /// Schedule `event_type` to fire `delay` ticks from now.
    pub fn schedule_event(
        &mut self,
        delay: Ticks,
        event_type: EventType,
        userdata: u64,
        from: FromThread,
    ) {
        match from {
            FromThread::Cpu | FromThread::Any => self.push(delay, event_type, userdata),
            FromThread::NonCpu => push_handoff(
                &self.handoff,
                PendingEvent {
                    delay,
                    event_type,
                    userdata,
                },
            ),
        }
    }

    /// A handle other threads can use to queue events onto this strand.
    #[must_use]
    pub fn remote(&self) -> RemoteScheduler {
        RemoteScheduler {
            handoff: Arc::clone(&self.handoff),
        }
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Ticks {
        self.now
    }

    /// Number of events not yet delivered, including those still waiting in
    /// the hand-off queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len() + lock(&self.handoff).len()
    }

    /// Move hand-off requests onto the strand.
    pub fn move_events(&mut self) {
        let drained: Vec<PendingEvent> = lock(&self.handoff).drain(..).collect();
        for pending in drained {
            self.push(pending.delay, pending.event_type, pending.userdata);
        }
    }

    /// Pop the next event due at or before `until`, advancing the clock to
    /// its timestamp. Returns `None` once nothing else is due, leaving the
    /// clock untouched.
    pub fn pop_due(&mut self, until: Ticks) -> Option<DueEvent<S>> {
        self.move_events();
        let Reverse(next) = self.queue.peek().copied()?;
        if next.time > until {
            return None;
        }
        self.queue.pop();
        let cycles_late = self.now.get().saturating_sub(next.time.get()) as i64;
        if next.time > self.now {
            self.now = next.time;
        }
        let registration = &self.registrations[next.event_type.0];
        Some(DueEvent {
            name: registration.name,
            callback: registration.callback,
            userdata: next.userdata,
            cycles_late,
        })
    }

    /// Move the clock forward to `target` once all due events have run.
    pub fn advance_to(&mut self, target: Ticks) {
        if target > self.now {
            self.now = target;
        }
    }

    fn push(&mut self, delay: Ticks, event_type: EventType, userdata: u64) {
        let event = Event {
            time: self.now + delay,
            fifo_order: self.fifo_order,
            event_type,
            userdata,
        };
        self.fifo_order += 1;
        self.queue.push(Reverse(event));
    }
}

impl<S> Default for CoreTiming<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, thread-safe handle that can only queue events from outside
/// the strand.
#[derive(Clone)]
pub struct RemoteScheduler {
    handoff: HandoffQueue,
}

impl RemoteScheduler {
    /// Queue `event_type` to fire `delay` ticks after the strand picks it up.
    pub fn schedule_event(&self, delay: Ticks, event_type: EventType, userdata: u64) {
        push_handoff(
            &self.handoff,
            PendingEvent {
                delay,
                event_type,
                userdata,
            },
        );
    }
}

fn push_handoff(handoff: &HandoffQueue, pending: PendingEvent) {
    lock(handoff).push_back(pending);
}

// A panic on another thread while holding the lock leaves the queue itself
// intact, so keep using it.
fn lock(handoff: &HandoffQueue) -> std::sync::MutexGuard<'_, VecDeque<PendingEvent>> {
    handoff.lock().unwrap_or_else(PoisonError::into_inner)
}
