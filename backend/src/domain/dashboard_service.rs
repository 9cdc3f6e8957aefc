//! Live dashboard panels.
//!
//! Each panel owns one live query and one consumer task. The task takes the
//! newest snapshot, recomputes the full daily series, and publishes it on a
//! latest-value channel. If a newer snapshot arrives while a series is being
//! computed, the stale result is dropped instead of published. Closing or
//! dropping a panel aborts its task, which drops the subscription and
//! releases the live query.

use anyhow::{anyhow, Result};
use chrono::{FixedOffset, NaiveDate};
use shared::{PanelState, RecordKind, UserProfile};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::{month_start, Clock};
use super::daily_buckets::DailyBucketAggregator;
use super::record_parser::parse_records;
use crate::storage::subscription::{Snapshot, Subscription};
use crate::storage::traits::{AuthProvider, LiveQuery, RecordQuery};

/// Compute the panel state for one snapshot
pub fn compute_panel_state(
    snapshot: &Snapshot,
    aggregator: &DailyBucketAggregator,
    reference_date: NaiveDate,
    offset: FixedOffset,
) -> PanelState {
    let series = parse_records(&snapshot.documents)
        .and_then(|records| aggregator.aggregate(&records, reference_date, offset));
    match series {
        Ok(series) => PanelState::Ready {
            generation: snapshot.generation,
            series,
        },
        Err(e) => PanelState::Failed {
            generation: snapshot.generation,
            message: e.to_string(),
        },
    }
}

/// Compute the state for the subscription's newest snapshot.
///
/// Returns `None` when a newer snapshot arrived while computing; that result
/// is stale and must not be published.
pub fn compute_latest(
    subscription: &mut Subscription,
    aggregator: &DailyBucketAggregator,
    clock: &dyn Clock,
) -> Option<PanelState> {
    let snapshot = subscription.latest();
    let state = compute_panel_state(&snapshot, aggregator, clock.today(), clock.offset());
    if subscription.has_newer() {
        debug!(
            collection = subscription.collection(),
            generation = snapshot.generation,
            "series superseded before publishing"
        );
        return None;
    }
    Some(state)
}

async fn run_panel(
    mut subscription: Subscription,
    aggregator: DailyBucketAggregator,
    clock: Arc<dyn Clock>,
    kind: RecordKind,
    publisher: watch::Sender<PanelState>,
) {
    loop {
        let Some(state) = compute_latest(&mut subscription, &aggregator, clock.as_ref()) else {
            tokio::task::yield_now().await;
            continue;
        };

        match &state {
            PanelState::Ready { generation, series } => {
                info!(%kind, generation, total = %series.total(), "published series")
            }
            PanelState::Failed { generation, message } => {
                warn!(%kind, generation, "snapshot rejected: {}", message)
            }
            PanelState::Pending => {}
        }

        if publisher.send(state).is_err() {
            debug!(%kind, "panel has no viewers, stopping");
            break;
        }
        if let Err(e) = subscription.changed().await {
            debug!(%kind, "live query ended: {}", e);
            break;
        }
    }
}

/// A running panel. Dropping it stops the consumer and releases the query.
pub struct PanelHandle {
    kind: RecordKind,
    opened_on: NaiveDate,
    state: watch::Receiver<PanelState>,
    task: Option<JoinHandle<()>>,
}

impl PanelHandle {
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Reference date the panel's month filter was built from
    pub fn opened_on(&self) -> NaiveDate {
        self.opened_on
    }

    /// Most recently published state
    pub fn current(&self) -> PanelState {
        self.state.borrow().clone()
    }

    /// Wait for the next published state
    pub async fn changed(&mut self) -> Result<PanelState> {
        let kind = self.kind;
        self.state
            .changed()
            .await
            .map_err(|_| anyhow!("{} panel stopped", kind))?;
        Ok(self.state.borrow_and_update().clone())
    }

    /// Wait until the first snapshot has been processed
    pub async fn wait_ready(&mut self) -> Result<PanelState> {
        let kind = self.kind;
        let state = self
            .state
            .wait_for(|state| !state.is_pending())
            .await
            .map_err(|_| anyhow!("{} panel stopped", kind))?;
        Ok(state.clone())
    }

    /// Wait until a state computed from at least `generation` is published
    pub async fn wait_for_generation(&mut self, generation: u64) -> Result<PanelState> {
        let kind = self.kind;
        let state = self
            .state
            .wait_for(|state| state.generation().map_or(false, |g| g >= generation))
            .await
            .map_err(|_| anyhow!("{} panel stopped", kind))?;
        Ok(state.clone())
    }

    /// Stop the consumer and wait until the live query is released
    pub async fn close(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        debug!(kind = %self.kind, "panel closed");
    }
}

impl Drop for PanelHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Both panels for one signed-in user
pub struct Dashboard {
    pub user: UserProfile,
    pub earnings: PanelHandle,
    pub spending: PanelHandle,
}

impl Dashboard {
    pub fn greeting(&self) -> String {
        format!("Welcome {}", self.user.display_name)
    }

    pub fn panel(&self, kind: RecordKind) -> &PanelHandle {
        match kind {
            RecordKind::Income => &self.earnings,
            RecordKind::Spending => &self.spending,
        }
    }

    pub fn panel_mut(&mut self, kind: RecordKind) -> &mut PanelHandle {
        match kind {
            RecordKind::Income => &mut self.earnings,
            RecordKind::Spending => &mut self.spending,
        }
    }

    /// Wait until both panels have processed their first snapshot
    pub async fn wait_ready(&mut self) -> Result<()> {
        self.earnings.wait_ready().await?;
        self.spending.wait_ready().await?;
        Ok(())
    }

    pub async fn close(self) {
        let Dashboard { user, earnings, spending } = self;
        earnings.close().await;
        spending.close().await;
        info!(user = %user.id, "dashboard closed");
    }
}

/// Opens live panels over a [`LiveQuery`] store
#[derive(Clone)]
pub struct DashboardService {
    live: Arc<dyn LiveQuery>,
    clock: Arc<dyn Clock>,
    aggregator: DailyBucketAggregator,
}

impl DashboardService {
    pub fn new(live: Arc<dyn LiveQuery>, clock: Arc<dyn Clock>, aggregator: DailyBucketAggregator) -> Self {
        Self { live, clock, aggregator }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Query for a panel: records since the start of `today`'s month, newest first
    pub fn panel_query(&self, today: NaiveDate) -> RecordQuery {
        RecordQuery::after(month_start(today, self.clock.offset()))
    }

    /// Subscribe to one of the user's collections and start its consumer.
    /// Must be called from within a tokio runtime.
    pub fn open_panel(&self, user_id: &str, kind: RecordKind) -> Result<PanelHandle> {
        let collection = kind.collection_path(user_id);
        let today = self.clock.today();
        let query = self.panel_query(today);
        info!(
            %collection,
            after = ?query.date_after,
            window = self.aggregator.window_days(),
            "opening panel"
        );

        let subscription = self.live.subscribe(&collection, query)?;
        let (publisher, state) = watch::channel(PanelState::Pending);
        let task = tokio::spawn(run_panel(
            subscription,
            self.aggregator,
            Arc::clone(&self.clock),
            kind,
            publisher,
        ));

        Ok(PanelHandle {
            kind,
            opened_on: today,
            state,
            task: Some(task),
        })
    }

    pub fn open(&self, user: &UserProfile) -> Result<Dashboard> {
        Ok(Dashboard {
            user: user.clone(),
            earnings: self.open_panel(&user.id, RecordKind::Income)?,
            spending: self.open_panel(&user.id, RecordKind::Spending)?,
        })
    }

    /// Reopen any panel whose reference date is no longer today, so the
    /// window and the month filter move on at midnight without waiting for
    /// a write. Returns whether anything was reopened.
    pub async fn refresh_if_day_changed(&self, dashboard: &mut Dashboard) -> Result<bool> {
        let today = self.clock.today();
        let mut reopened = false;
        for kind in RecordKind::ALL {
            let panel = dashboard.panel(kind);
            if panel.opened_on() == today {
                continue;
            }
            info!(kind = %panel.kind(), from = %panel.opened_on(), to = %today, "day changed, reopening panel");
            let fresh = self.open_panel(&dashboard.user.id, kind)?;
            let stale = std::mem::replace(dashboard.panel_mut(kind), fresh);
            stale.close().await;
            reopened = true;
        }
        Ok(reopened)
    }

    /// Open the dashboard only when someone is signed in
    pub fn open_for_current_user(&self, auth: &dyn AuthProvider) -> Result<Option<Dashboard>> {
        match auth.current_user() {
            Some(user) => self.open(&user).map(Some),
            None => {
                info!("Nobody signed in, dashboard not rendered");
                Ok(None)
            }
        }
    }
}
