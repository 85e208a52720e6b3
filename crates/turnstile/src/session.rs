//! Session lifecycle: one pool, one cancellation token, one worker set.
//!
//! The session owns every worker handle, replacing ambient process-wide
//! worker lists with an explicit start/stop lifecycle.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::activity::{ActivityLog, EventCategory};
use crate::config::SimulationConfig;
use crate::pool::TicketPool;
use crate::ticket::{CustomerId, VendorId};
use crate::worker::{Customer, Vendor};

/// A running simulation: the worker set operating one shared pool.
pub struct Session {
    id: Uuid,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    log: ActivityLog,
}

impl Session {
    /// Spawn one vendor task and one customer task per configured count.
    pub fn start(config: &SimulationConfig, pool: Arc<TicketPool>, log: ActivityLog) -> Self {
        let cancel = CancellationToken::new();
        let mut workers =
            Vec::with_capacity((config.vendor_count + config.customer_count) as usize);

        for n in 1..=config.vendor_count {
            let vendor = Vendor::new(
                VendorId(n),
                config.tickets_per_release,
                Duration::from_secs(config.ticket_release_interval_secs),
            );
            workers.push(vendor.spawn(Arc::clone(&pool), log.clone(), cancel.clone()));
        }
        for n in 1..=config.customer_count {
            let customer = Customer::new(
                CustomerId(n),
                Duration::from_secs(config.customer_retrieval_interval_secs),
            );
            workers.push(customer.spawn(Arc::clone(&pool), log.clone(), cancel.clone()));
        }

        let id = Uuid::new_v4();
        log.record(
            EventCategory::System,
            None,
            format!(
                "Ticketing session {id} started with {} vendors and {} customers.",
                config.vendor_count, config.customer_count
            ),
        );

        Self {
            id,
            cancel,
            workers,
            log,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Cancel every worker and wait for all of them to exit. A worker
    /// parked in `remove_ticket` wakes on the token rather than staying
    /// parked.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        for result in join_all(std::mem::take(&mut self.workers)).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "worker task failed during shutdown");
            }
        }
        self.log.record(
            EventCategory::System,
            None,
            format!(
                "Ticketing session {} stopped. All vendor and customer workers have been cancelled.",
                self.id
            ),
        );
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Workers must never outlive their session, even if `stop` was
        // skipped. Cancelling is idempotent.
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::AddOutcome;

    fn fast_config() -> SimulationConfig {
        SimulationConfig {
            total_tickets: 10,
            max_ticket_capacity: 4,
            tickets_per_release: 2,
            ticket_release_interval_secs: 1,
            customer_retrieval_interval_secs: 1,
            vendor_count: 2,
            customer_count: 2,
        }
    }

    #[tokio::test]
    async fn session_runs_and_stops_cleanly() {
        let config = fast_config();
        let log = ActivityLog::in_memory();
        let pool = Arc::new(TicketPool::new(
            config.max_ticket_capacity as usize,
            u64::from(config.total_tickets),
            log.clone(),
        ));

        let session = Session::start(&config, Arc::clone(&pool), log.clone());

        // The first vendor iteration runs before any sleep, so tickets
        // are issued almost immediately.
        tokio::time::timeout(Duration::from_secs(2), async {
            while pool.snapshot().total_issued == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("no tickets issued after session start");

        tokio::time::timeout(Duration::from_secs(5), session.stop())
            .await
            .expect("session stop did not join all workers");

        // Pool remains inspectable after stop.
        let snapshot = pool.snapshot();
        assert!(snapshot.total_issued <= u64::from(config.total_tickets));
        assert!(snapshot.available <= config.max_ticket_capacity as usize);

        let system = log.recent_by_category(EventCategory::System);
        assert!(system.iter().any(|e| e.message.contains("started with 2 vendors")));
        assert!(system.iter().any(|e| e.message.contains("stopped")));
    }

    #[tokio::test]
    async fn stop_releases_parked_customers() {
        // No vendors ever fill the pool: all customers park immediately.
        let config = SimulationConfig {
            vendor_count: 1,
            customer_count: 3,
            ..fast_config()
        };
        let log = ActivityLog::in_memory();
        let pool = Arc::new(TicketPool::new(1, 1, log.clone()));

        // Exhaust the single-ticket lifetime up front so vendors retire
        // and customers park on emptiness.
        assert_eq!(pool.add_tickets(1, VendorId(9)), AddOutcome::Added(1));
        let cancel = CancellationToken::new();
        pool.remove_ticket(CustomerId(9), &cancel).await;

        let session = Session::start(&config, Arc::clone(&pool), log);
        tokio::time::sleep(Duration::from_millis(50)).await;

        tokio::time::timeout(Duration::from_secs(2), session.stop())
            .await
            .expect("parked customers kept the session from stopping");
    }
}
