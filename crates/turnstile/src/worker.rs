//! Vendor and customer workers.
//!
//! One tokio task per configured worker, all sharing one pool. Vendors
//! poll on their release interval and retire permanently when the
//! lifetime limit is reached; customers park inside `remove_ticket`
//! until inventory appears. Both observe cancellation while sleeping as
//! well as between iterations.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::activity::{ActivityLog, EventCategory};
use crate::pool::{AddOutcome, RemoveOutcome, TicketPool};
use crate::ticket::{CustomerId, VendorId};

/// Producer configuration. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Vendor {
    id: VendorId,
    batch_size: u32,
    release_interval: Duration,
}

impl Vendor {
    pub fn new(id: VendorId, batch_size: u32, release_interval: Duration) -> Self {
        Self {
            id,
            batch_size,
            release_interval,
        }
    }

    pub fn id(&self) -> VendorId {
        self.id
    }

    /// Run the release loop on its own task until cancelled or the
    /// pool's lifetime limit is reached.
    pub fn spawn(
        self,
        pool: Arc<TicketPool>,
        log: ActivityLog,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(pool, log, cancel))
    }

    async fn run(self, pool: Arc<TicketPool>, log: ActivityLog, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match pool.add_tickets(self.batch_size, self.id) {
                AddOutcome::Exhausted => {
                    log.record(
                        EventCategory::Vendor,
                        Some(self.id.0),
                        format!("{} retired: total ticket limit reached.", self.id),
                    );
                    return;
                }
                AddOutcome::Added(_) | AddOutcome::Deferred => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.release_interval) => {}
            }
        }
        log.record(
            EventCategory::Vendor,
            Some(self.id.0),
            format!("{} stopped.", self.id),
        );
    }
}

/// Consumer configuration. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Customer {
    id: CustomerId,
    retrieval_interval: Duration,
}

impl Customer {
    pub fn new(id: CustomerId, retrieval_interval: Duration) -> Self {
        Self {
            id,
            retrieval_interval,
        }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    /// Run the purchase loop on its own task until cancelled.
    pub fn spawn(
        self,
        pool: Arc<TicketPool>,
        log: ActivityLog,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(pool, log, cancel))
    }

    async fn run(self, pool: Arc<TicketPool>, log: ActivityLog, cancel: CancellationToken) {
        loop {
            match pool.remove_ticket(self.id, &cancel).await {
                // The purchase event is emitted by the pool; the sleep
                // throttles consumption independent of the blocking wait.
                RemoveOutcome::Removed(_) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.retrieval_interval) => {}
                    }
                }
                RemoveOutcome::Cancelled => break,
            }
        }
        log.record(
            EventCategory::Customer,
            Some(self.id.0),
            format!("{} stopped.", self.id),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool(max_capacity: usize, issuance_limit: u64) -> Arc<TicketPool> {
        Arc::new(TicketPool::new(
            max_capacity,
            issuance_limit,
            ActivityLog::in_memory(),
        ))
    }

    #[tokio::test]
    async fn vendor_retires_at_exhaustion() {
        let pool = test_pool(10, 7);
        let log = ActivityLog::in_memory();
        let cancel = CancellationToken::new();

        let vendor = Vendor::new(VendorId(1), 5, Duration::from_millis(1));
        let handle = vendor.spawn(Arc::clone(&pool), log.clone(), cancel.clone());

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("vendor did not retire")
            .unwrap();

        assert_eq!(pool.snapshot().total_issued, 7);
        let retired = log.recent_by_category(EventCategory::Vendor);
        assert!(retired.iter().any(|e| e.message.contains("retired")));
    }

    #[tokio::test]
    async fn vendor_stops_on_cancel_while_sleeping() {
        let pool = test_pool(2, 100);
        let log = ActivityLog::in_memory();
        let cancel = CancellationToken::new();

        let vendor = Vendor::new(VendorId(1), 2, Duration::from_secs(600));
        let handle = vendor.spawn(Arc::clone(&pool), log.clone(), cancel.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("vendor did not observe cancellation")
            .unwrap();

        let events = log.recent_by_category(EventCategory::Vendor);
        assert!(events.iter().any(|e| e.message == "Vendor-1 stopped."));
    }

    #[tokio::test]
    async fn customer_purchases_then_stops_on_cancel() {
        let pool = test_pool(5, 5);
        let log = ActivityLog::in_memory();
        let cancel = CancellationToken::new();

        assert_eq!(pool.add_tickets(1, VendorId(1)), AddOutcome::Added(1));

        let customer = Customer::new(CustomerId(1), Duration::from_millis(1));
        let handle = customer.spawn(Arc::clone(&pool), log.clone(), cancel.clone());

        // Let the customer take the only ticket and park on emptiness.
        tokio::time::timeout(Duration::from_secs(2), async {
            while !pool.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("customer never purchased");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("customer did not observe cancellation")
            .unwrap();

        let events = log.recent_by_category(EventCategory::Customer);
        assert!(events.iter().any(|e| e.message == "Customer-1 stopped."));
    }

    #[tokio::test]
    async fn parked_customer_stops_promptly_on_cancel() {
        let pool = test_pool(5, 5);
        let log = ActivityLog::in_memory();
        let cancel = CancellationToken::new();

        let customer = Customer::new(CustomerId(2), Duration::from_millis(1));
        let handle = customer.spawn(Arc::clone(&pool), log, cancel.clone());

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("parked customer stayed parked after cancel")
            .unwrap();
    }
}
