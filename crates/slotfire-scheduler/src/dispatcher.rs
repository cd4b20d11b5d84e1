use std::sync::Arc;

use slotfire_client::ReservationClient;
use slotfire_core::{NameIndex, ReservationJob, TargetId, TicketInventory};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::ReservationScheduler;
use crate::offset::{ClockOffset, WallClock};
use crate::sync::ClockSyncService;
use crate::types::{Outcome, RetryPolicy};

/// Final per-target result of a dispatch run, ordered by target id.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<(TargetId, Outcome)>,
}

impl DispatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Succeeded { .. }))
            .count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded() == self.outcomes.len()
    }

    pub fn get(&self, target_id: TargetId) -> Option<Outcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == target_id)
            .map(|(_, o)| *o)
    }
}

/// Runs one [`ReservationScheduler`] per job alongside a single
/// [`ClockSyncService`], and waits for every scheduler to finish.
pub struct Dispatcher {
    client: Arc<dyn ReservationClient>,
    offset: ClockOffset,
    wall: Arc<dyn WallClock>,
    policy: RetryPolicy,
    names: Arc<NameIndex>,
    inventory: Arc<TicketInventory>,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn ReservationClient>,
        offset: ClockOffset,
        wall: Arc<dyn WallClock>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            client,
            offset,
            wall,
            policy,
            names: Arc::new(NameIndex::default()),
            inventory: Arc::new(TicketInventory::default()),
        }
    }

    /// Catalog lookups used to build each scheduler's log label.
    pub fn with_labels(mut self, names: Arc<NameIndex>, inventory: Arc<TicketInventory>) -> Self {
        self.names = names;
        self.inventory = inventory;
        self
    }

    /// Spawn the clock sync and all schedulers, then wait for the schedulers.
    ///
    /// `cancel` stops everything; otherwise this returns once every scheduler
    /// has reached a terminal outcome. The clock sync task is stopped before
    /// returning.
    pub async fn run(
        self,
        sync: ClockSyncService,
        jobs: Vec<ReservationJob>,
        cancel: CancellationToken,
    ) -> DispatchReport {
        let sync_cancel = cancel.child_token();
        let sync_task = tokio::spawn(sync.run(sync_cancel.clone()));

        let mut set = JoinSet::new();
        for job in jobs {
            let label = self.names.label(&job, &self.inventory);
            let scheduler = ReservationScheduler::new(
                job,
                Arc::clone(&self.client),
                self.offset.clone(),
                Arc::clone(&self.wall),
                self.policy.clone(),
            )
            .with_label(label);
            let target_id = scheduler.job().target_id;
            let cancel = cancel.clone();
            set.spawn(async move { (target_id, scheduler.run(cancel).await) });
        }
        info!(count = set.len(), "reservation schedulers dispatched");

        let mut report = DispatchReport::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((target_id, outcome)) => {
                    info!(%target_id, ?outcome, "scheduler finished");
                    report.outcomes.push((target_id, outcome));
                }
                Err(e) => error!(error = %e, "scheduler task aborted"),
            }
        }

        sync_cancel.cancel();
        if let Err(e) = sync_task.await {
            error!(error = %e, "clock sync task aborted");
        }

        report.outcomes.sort_by_key(|(id, _)| *id);
        info!(
            total = report.outcomes.len(),
            succeeded = report.succeeded(),
            "dispatch complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{MockClient, PausedWallClock, Reply, ScriptedClock};

    const T: i64 = 1_700_000_000;

    fn job(id: i64, open_at: i64) -> ReservationJob {
        ReservationJob {
            target_id: TargetId(id),
            ticket_id: format!("ticket-{id}"),
            token: "XYZ".to_string(),
            open_at,
        }
    }

    fn sync_with(source: Arc<ScriptedClock>, offset: &ClockOffset) -> ClockSyncService {
        ClockSyncService::new(source, offset.clone(), Duration::from_secs(3600))
    }

    #[tokio::test(start_paused = true)]
    async fn all_targets_succeed() {
        let wall = PausedWallClock::starting_at(T * 1000);
        let offset = ClockOffset::new();
        let client = MockClient::new(wall.clone(), offset.clone(), |_, _| Reply::Code(0));

        let dispatcher =
            Dispatcher::new(client.clone(), offset.clone(), wall, RetryPolicy::default());
        let report = dispatcher
            .run(
                sync_with(Arc::new(ScriptedClock::new(vec![])), &offset),
                vec![job(7, T + 30), job(3, T + 10)],
                CancellationToken::new(),
            )
            .await;

        assert!(report.all_succeeded());
        assert_eq!(
            report.outcomes,
            vec![
                (TargetId(3), Outcome::Succeeded { attempts: 1 }),
                (TargetId(7), Outcome::Succeeded { attempts: 1 }),
            ]
        );
        assert!(client.calls().iter().all(|c| c.at_ms >= (T + 10) * 1000));
    }

    #[tokio::test(start_paused = true)]
    async fn no_jobs_returns_immediately() {
        let wall = PausedWallClock::starting_at(T * 1000);
        let offset = ClockOffset::new();
        let client = MockClient::new(wall.clone(), offset.clone(), |_, _| Reply::Code(0));
        let report = Dispatcher::new(client, offset.clone(), wall, RetryPolicy::default())
            .run(
                sync_with(Arc::new(ScriptedClock::new(vec![])), &offset),
                Vec::new(),
                CancellationToken::new(),
            )
            .await;
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_every_scheduler() {
        let wall = PausedWallClock::starting_at(T * 1000);
        let offset = ClockOffset::new();
        let client = MockClient::new(wall.clone(), offset.clone(), |_, _| Reply::Code(1));
        let policy = RetryPolicy {
            retry_delay: Duration::from_millis(100),
            ..RetryPolicy::default()
        };

        let cancel = CancellationToken::new();
        let dispatcher = Dispatcher::new(client.clone(), offset.clone(), wall, policy);
        let task = tokio::spawn(dispatcher.run(
            sync_with(Arc::new(ScriptedClock::new(vec![])), &offset),
            vec![job(1, T), job(2, T + 3600)],
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_secs(5)).await;
        cancel.cancel();
        let report = task.await.unwrap();

        match report.get(TargetId(1)) {
            Some(Outcome::Cancelled { attempts }) => assert!(attempts > 1),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(report.get(TargetId(2)), Some(Outcome::Cancelled { attempts: 0 }));
        assert_eq!(report.succeeded(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn refreshed_offset_moves_the_firing_time() {
        // Target opens two hours out. After the first hourly sync the local
        // clock turns out to be 30 minutes behind, so the request goes out
        // after 90 minutes of local time.
        let wall = PausedWallClock::starting_at(T * 1000);
        let offset = ClockOffset::new();
        let client = MockClient::new(wall.clone(), offset.clone(), |_, _| Reply::Code(0));
        let source = Arc::new(ScriptedClock::new(vec![Ok(chrono::Duration::minutes(30))]));

        let start = tokio::time::Instant::now();
        let report = Dispatcher::new(client.clone(), offset.clone(), wall, RetryPolicy::default())
            .run(
                sync_with(source.clone(), &offset),
                vec![job(1, T + 7200)],
                CancellationToken::new(),
            )
            .await;

        assert!(report.all_succeeded());
        assert_eq!(source.calls(), 1);
        assert_eq!(offset.millis(), 30 * 60 * 1000);

        let local = start.elapsed();
        assert!(local >= Duration::from_secs(5400) && local < Duration::from_secs(5401));
        assert!(client.calls()[0].at_ms >= (T + 7200) * 1000);
    }
}
