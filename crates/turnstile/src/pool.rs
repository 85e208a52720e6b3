//! The synchronization core: a bounded ticket pool shared by vendor and
//! customer workers.
//!
//! All pool state lives behind one mutex and every operation applies
//! fully inside a single critical section. Producers never block: a full
//! pool reports `Deferred` and the vendor retries on its own timer.
//! Consumers park on the non-empty condition and are woken by
//! `add_tickets`, by their cancellation token, or by `reset`.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::activity::{ActivityLog, EventCategory};
use crate::ticket::{CustomerId, Ticket, VendorId};

/// Outcome of a vendor batch submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Tickets were created and appended; the count may be capped by the
    /// remaining lifetime allowance and by free capacity.
    Added(u64),
    /// No room right now, but the lifetime limit is not exhausted. Retry
    /// later; nothing changed.
    Deferred,
    /// The lifetime issuance limit is exhausted. Terminal: the vendor
    /// should stop submitting.
    Exhausted,
}

/// Outcome of a customer removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(Ticket),
    /// The worker was cancelled, or the pool was reset or latched defunct
    /// while waiting.
    Cancelled,
}

/// Advisory counters for status display. Not for control decisions.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSnapshot {
    pub available: usize,
    pub total_issued: u64,
    pub issuance_limit: u64,
    pub max_capacity: usize,
}

/// Edge-trigger latches: each limit condition is logged once per
/// transition into it. Mutated only inside the critical section, so the
/// check and the log cannot race. Capacity clears when a removal frees
/// space; the other two clear only on reset.
#[derive(Debug, Default)]
struct Reported {
    exhausted: bool,
    capacity_full: bool,
    sold_out: bool,
}

#[derive(Debug)]
struct PoolState {
    available: VecDeque<Ticket>,
    total_issued: u64,
    /// Bumped by `reset`. A parked consumer observing a bump returns
    /// `Cancelled` rather than a ticket from the new lifetime.
    epoch: u64,
    reported: Reported,
    /// Latched on invariant violation or lock poisoning. A defunct pool
    /// refuses all further operations.
    defunct: bool,
}

/// The bounded, synchronized shared inventory.
pub struct TicketPool {
    state: Mutex<PoolState>,
    nonempty: Notify,
    max_capacity: usize,
    issuance_limit: u64,
    log: ActivityLog,
}

impl TicketPool {
    /// # Panics
    ///
    /// Panics if either bound is zero. Bounds come from the validated
    /// configuration.
    pub fn new(max_capacity: usize, issuance_limit: u64, log: ActivityLog) -> Self {
        assert!(max_capacity > 0, "max_capacity must be positive");
        assert!(issuance_limit > 0, "issuance_limit must be positive");
        Self {
            state: Mutex::new(PoolState {
                available: VecDeque::new(),
                total_issued: 0,
                epoch: 0,
                reported: Reported::default(),
                defunct: false,
            }),
            nonempty: Notify::new(),
            max_capacity,
            issuance_limit,
            log,
        }
    }

    /// A poisoned lock means a panic happened mid-mutation; the counters
    /// cannot be trusted, so the pool latches defunct instead of
    /// propagating the panic.
    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                let mut guard = poisoned.into_inner();
                if !guard.defunct {
                    guard.defunct = true;
                    tracing::error!("ticket pool lock poisoned, refusing further operations");
                }
                guard
            }
        }
    }

    /// Invariants hold at every point where no caller is inside the
    /// critical section. A breach can only come from a bug in this
    /// module; latch defunct rather than keep running on corrupt
    /// counters.
    fn check_invariants(&self, state: &mut PoolState) {
        let ok = state.available.len() <= self.max_capacity
            && state.total_issued <= self.issuance_limit
            && (state.available.len() as u64) <= state.total_issued;
        debug_assert!(ok, "ticket pool invariant violated");
        if !ok && !state.defunct {
            state.defunct = true;
            tracing::error!(
                available = state.available.len(),
                total_issued = state.total_issued,
                "ticket pool invariant violated, refusing further operations"
            );
        }
    }

    /// Submit a vendor batch. Never blocks.
    ///
    /// Creates `min(requested, remaining allowance, free capacity)`
    /// tickets with strictly increasing sequence numbers and wakes parked
    /// consumers. `Exhausted` is terminal for the caller; `Deferred`
    /// means retry after the release interval.
    pub fn add_tickets(&self, requested: u32, vendor: VendorId) -> AddOutcome {
        debug_assert!(requested > 0, "requested batch must be positive");

        let outcome;
        let mut event = None;
        {
            let mut state = self.lock_state();
            if state.defunct {
                return AddOutcome::Exhausted;
            }

            if state.total_issued >= self.issuance_limit {
                if !state.reported.exhausted {
                    state.reported.exhausted = true;
                    event = Some((
                        EventCategory::System,
                        None,
                        format!("Total ticket limit reached ({} tickets)", self.issuance_limit),
                    ));
                }
                outcome = AddOutcome::Exhausted;
            } else if state.available.len() >= self.max_capacity {
                if !state.reported.capacity_full {
                    state.reported.capacity_full = true;
                    event = Some((
                        EventCategory::System,
                        None,
                        format!("Maximum capacity reached ({} tickets)", self.max_capacity),
                    ));
                }
                outcome = AddOutcome::Deferred;
            } else {
                let room = (self.max_capacity - state.available.len()) as u64;
                let allowance = self.issuance_limit - state.total_issued;
                let created = u64::from(requested).min(allowance).min(room);
                for offset in 0..created {
                    let id = state.total_issued + offset + 1;
                    state.available.push_back(Ticket::new(id));
                }
                state.total_issued += created;
                state.reported.capacity_full = false;
                self.check_invariants(&mut state);
                event = Some((
                    EventCategory::Vendor,
                    Some(vendor.0),
                    format!("{vendor} added {created} tickets."),
                ));
                outcome = AddOutcome::Added(created);
            }
        }

        if let Some((category, actor, message)) = event {
            self.log.record(category, actor, message);
        }
        if matches!(outcome, AddOutcome::Added(_)) {
            self.nonempty.notify_waiters();
        }
        outcome
    }

    /// Remove the oldest available ticket, parking while the pool is
    /// empty.
    ///
    /// Returns `Cancelled` without further blocking if `cancel` fires
    /// while waiting, or if the pool is reset (or latched defunct) while
    /// waiting. Re-checks the condition on every wake.
    pub async fn remove_ticket(
        &self,
        customer: CustomerId,
        cancel: &CancellationToken,
    ) -> RemoveOutcome {
        let entry_epoch = self.lock_state().epoch;

        let notified = self.nonempty.notified();
        tokio::pin!(notified);

        loop {
            // Register interest before re-checking so a notify landing
            // between the check and the await is not lost.
            notified.as_mut().enable();

            {
                let mut state = self.lock_state();
                if state.defunct || state.epoch != entry_epoch {
                    return RemoveOutcome::Cancelled;
                }
                if let Some(ticket) = state.available.pop_front() {
                    state.reported.capacity_full = false;
                    let sold_out = state.available.is_empty()
                        && state.total_issued >= self.issuance_limit
                        && !state.reported.sold_out;
                    if sold_out {
                        state.reported.sold_out = true;
                    }
                    self.check_invariants(&mut state);
                    drop(state);

                    self.log.record(
                        EventCategory::Customer,
                        Some(customer.0),
                        format!("{customer} purchased {ticket}."),
                    );
                    if sold_out {
                        self.log
                            .record(EventCategory::System, None, "All tickets have been sold");
                    }
                    return RemoveOutcome::Removed(ticket);
                }
            }

            tokio::select! {
                _ = notified.as_mut() => {
                    notified.set(self.nonempty.notified());
                }
                _ = cancel.cancelled() => return RemoveOutcome::Cancelled,
            }
        }
    }

    /// Clear the pool and zero the lifetime counter, starting a new pool
    /// lifetime. Parked consumers are released with `Cancelled`.
    ///
    /// Only for use between sessions, never while workers are actively
    /// running against this pool.
    pub fn reset(&self) {
        {
            let mut state = self.lock_state();
            if state.defunct {
                return;
            }
            state.available.clear();
            state.total_issued = 0;
            state.epoch += 1;
            state.reported = Reported::default();
        }
        self.log
            .record(EventCategory::System, None, "System has been reset");
        self.nonempty.notify_waiters();
    }

    /// Current available count. Advisory only.
    pub fn len(&self) -> usize {
        self.lock_state().available.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advisory counters for status display.
    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.lock_state();
        PoolSnapshot {
            available: state.available.len(),
            total_issued: state.total_issued,
            issuance_limit: self.issuance_limit,
            max_capacity: self.max_capacity,
        }
    }
}
