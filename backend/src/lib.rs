//! # Easy Budget
//!
//! Personal finance dashboard: the signed-in user's current balance and
//! this month's daily earnings and spending, kept live from a document store.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (CLI, SVG charts)
//!     ↓
//! Domain Layer (daily buckets, balance, live panels)
//!     ↓
//! Storage Layer (document store, live queries, auth, CSV data directory)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod logging;
pub mod storage;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::config::DashboardConfig;
use crate::domain::{BalanceService, DailyBucketAggregator, DashboardService, SystemClock};
use crate::io::SvgChartRenderer;
use crate::storage::csv::CsvDataDirectory;
use crate::storage::{LocalAuthProvider, MemoryDocumentStore};

/// Everything the binary needs, wired together
#[derive(Clone)]
pub struct AppState {
    pub config: DashboardConfig,
    pub store: Arc<MemoryDocumentStore>,
    pub data: CsvDataDirectory,
    pub auth: Arc<LocalAuthProvider>,
    pub balance_service: BalanceService,
    pub dashboard_service: DashboardService,
    pub renderer: SvgChartRenderer,
}

/// Open the data directory, load it into the store and build the services
pub fn initialize_backend(config: DashboardConfig) -> Result<AppState> {
    let aggregator = DailyBucketAggregator::new(config.window_days)?;
    let clock = Arc::new(SystemClock::new(config.offset()?));

    let data_directory = config.data_directory()?;
    info!("Setting up data directory {}", data_directory.display());
    let data = CsvDataDirectory::open(&data_directory)?;
    let profile = config.profile();
    data.ensure_user(&profile)?;

    info!("Loading documents");
    let store = Arc::new(MemoryDocumentStore::new());
    data.sync_into(&store)?;

    info!("Setting up services");
    let auth = Arc::new(LocalAuthProvider::new(profile));
    let balance_service = BalanceService::new(store.clone());
    let dashboard_service = DashboardService::new(store.clone(), clock, aggregator);

    Ok(AppState {
        config,
        store,
        data,
        auth,
        balance_service,
        dashboard_service,
        renderer: SvgChartRenderer::default(),
    })
}
