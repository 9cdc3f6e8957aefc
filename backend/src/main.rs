use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use shared::{PanelState, RecordKind};
use tracing::{error, info, warn};

use easy_budget::config::DashboardConfig;
use easy_budget::domain::{format_currency, Dashboard};
use easy_budget::io::cli::{parse_amount_arg, parse_date_arg};
use easy_budget::io::{Cli, Command};
use easy_budget::logging::{init_logging, DEFAULT_FILTER};
use easy_budget::storage::csv::CsvDataDirectory;
use easy_budget::storage::AuthProvider;
use easy_budget::{initialize_backend, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(DEFAULT_FILTER)?;

    let cli = Cli::parse();
    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir.clone() {
        config.data_directory = Some(dir);
    }

    match cli.command {
        Command::Show => show(config).await,
        Command::Watch => watch(config).await,
        Command::Add { kind, amount, date } => add(&config, kind.into(), &amount, date.as_deref()),
    }
}

fn add(config: &DashboardConfig, kind: RecordKind, amount: &str, date: Option<&str>) -> Result<()> {
    let amount = parse_amount_arg(amount)?;
    let offset = config.offset()?;
    let timestamp = parse_date_arg(date)?.unwrap_or_else(|| Utc::now().with_timezone(&offset));

    let data = CsvDataDirectory::open(config.data_directory()?)?;
    let profile = config.profile();
    data.ensure_user(&profile)?;
    let id = data.add_record(&profile.id, kind, timestamp, amount)?;

    println!("Recorded {} of {} ({})", kind, format_currency(amount), id);
    Ok(())
}

async fn open_dashboard(state: &AppState) -> Result<Dashboard> {
    state.auth.sign_in().await?;
    let mut dashboard = state
        .dashboard_service
        .open_for_current_user(state.auth.as_ref())?
        .ok_or_else(|| anyhow!("no signed-in user after sign-in"))?;
    dashboard.wait_ready().await?;
    Ok(dashboard)
}

async fn print_balance(state: &AppState, user_id: &str) -> Result<()> {
    if let Some(balance) = state.balance_service.formatted_balance(user_id).await? {
        println!("Your Current Balance: {}", balance);
    }
    Ok(())
}

fn render_panel(state: &AppState, kind: RecordKind, panel: &PanelState) -> Result<()> {
    match panel {
        PanelState::Ready { series, .. } => {
            let chart = state.renderer.render_panel(kind, series)?;
            let path = chart.write_to(&state.config.chart_output_directory()?, kind.collection_name())?;
            println!(
                "{} {} (chart: {})",
                kind.headline(),
                format_currency(series.total()),
                path.display()
            );
        }
        PanelState::Failed { message, .. } => {
            println!("{} unavailable: {}", kind.chart_label(), message);
        }
        PanelState::Pending => {}
    }
    Ok(())
}

async fn render_dashboard(state: &AppState, dashboard: &Dashboard) -> Result<()> {
    println!("{}", dashboard.greeting());
    print_balance(state, &dashboard.user.id).await?;
    for kind in RecordKind::ALL {
        render_panel(state, kind, &dashboard.panel(kind).current())?;
    }
    Ok(())
}

async fn show(config: DashboardConfig) -> Result<()> {
    let state = initialize_backend(config)?;
    let dashboard = open_dashboard(&state).await?;
    render_dashboard(&state, &dashboard).await?;

    dashboard.close().await;
    state.auth.sign_out().await?;
    Ok(())
}

async fn watch(config: DashboardConfig) -> Result<()> {
    let state = initialize_backend(config)?;
    let mut dashboard = open_dashboard(&state).await?;
    render_dashboard(&state, &dashboard).await?;

    let mut refresh = tokio::time::interval(state.config.refresh_interval());
    refresh.tick().await;
    info!(
        "Watching {} every {:?}, Ctrl-C to stop",
        state.data.connection().base_directory().display(),
        state.config.refresh_interval()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            _ = refresh.tick() => {
                match state.data.sync_into(&state.store) {
                    Ok(0) => {}
                    Ok(_) => print_balance(&state, &dashboard.user.id).await?,
                    Err(e) => warn!("Refresh from data directory failed: {:#}", e),
                }
                // new panels publish on their own; the branches below redraw them
                if state.dashboard_service.refresh_if_day_changed(&mut dashboard).await? {
                    info!("New day, panels reopened");
                }
            }
            changed = dashboard.earnings.changed() => {
                if let Err(e) = render_panel(&state, RecordKind::Income, &changed?) {
                    error!("Rendering earnings failed: {:#}", e);
                }
            }
            changed = dashboard.spending.changed() => {
                if let Err(e) = render_panel(&state, RecordKind::Spending, &changed?) {
                    error!("Rendering spending failed: {:#}", e);
                }
            }
        }
    }

    dashboard.close().await;
    state.auth.sign_out().await?;
    Ok(())
}
