//! Dashboard Controller
//!
//! Owns the token list and portfolio total of the persisted wallet. Balances
//! are refreshed on demand and on a fixed interval while the dashboard is
//! active.
//!
//! Refreshes may overlap. Each one takes a sequence number when it starts and
//! a response is only applied if no newer refresh has already been applied,
//! so a slow response never overwrites a fresher one. Responses that arrive
//! after `teardown` are dropped, even if the dashboard has been re-entered
//! in the meantime.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

use crate::api::BalanceSource;
use crate::display::format_address;
use crate::error::{WalletError, WalletResult};
use crate::navigation::Route;
use crate::portfolio::aggregate;
use crate::storage::{KeyValueStore, WalletSessionStore};
use crate::types::{TokenBalance, WalletRecord};
use crate::{log_debug, log_info, log_warn};

/// Result of entering the dashboard
pub enum Activation<S> {
    Ready(Arc<DashboardController<S>>),
    /// No persisted wallet; go here instead
    Redirect(Route),
}

/// What happened to a refresh response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    Applied { tokens: usize },
    /// A newer refresh was already applied
    Stale,
    /// The dashboard was torn down while the request was in flight
    Discarded,
}

/// Render-ready snapshot of the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub address: String,
    pub short_address: String,
    pub watch_only: bool,
    pub tokens: Vec<TokenBalance>,
    pub portfolio_value: String,
    pub loading: bool,
    pub mock: bool,
    pub last_error: Option<WalletError>,
}

struct DashboardState {
    tokens: Vec<TokenBalance>,
    portfolio_value: String,
    in_flight: usize,
    applied_seq: u64,
    last_error: Option<WalletError>,
}

pub struct DashboardController<S> {
    record: WalletRecord,
    store: WalletSessionStore<S>,
    live: Arc<dyn BalanceSource>,
    mock: Arc<dyn BalanceSource>,
    refresh_interval: Duration,
    use_mock: AtomicBool,
    active: AtomicBool,
    /// Bumped on every teardown; refreshes from an older epoch are discarded
    epoch: AtomicU64,
    next_seq: AtomicU64,
    state: Mutex<DashboardState>,
    timer: Mutex<Option<AbortHandle>>,
    updates: watch::Sender<u64>,
}

impl<S: KeyValueStore + 'static> DashboardController<S> {
    /// Enter the dashboard. Without a persisted wallet this redirects to
    /// setup and nothing is fetched.
    pub fn activate(
        store: WalletSessionStore<S>,
        live: Arc<dyn BalanceSource>,
        mock: Arc<dyn BalanceSource>,
        refresh_interval: Duration,
    ) -> Activation<S> {
        let Some(record) = store.load() else {
            log_info!("dashboard", "No wallet session, redirecting to setup");
            return Activation::Redirect(Route::Setup);
        };

        log_info!(
            "dashboard",
            "Dashboard activated",
            address = record.address,
            source = live.name()
        );

        Activation::Ready(Arc::new(Self {
            record,
            store,
            live,
            mock,
            refresh_interval,
            use_mock: AtomicBool::new(false),
            active: AtomicBool::new(true),
            epoch: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            state: Mutex::new(DashboardState {
                tokens: Vec::new(),
                portfolio_value: aggregate(&[]),
                in_flight: 0,
                applied_seq: 0,
                last_error: None,
            }),
            timer: Mutex::new(None),
            updates: watch::channel(0).0,
        }))
    }

    pub fn record(&self) -> &WalletRecord {
        &self.record
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_mock(&self) -> bool {
        self.use_mock.load(Ordering::SeqCst)
    }

    /// Ticks once per applied or failed refresh
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    /// Fetch balances from the current source and apply them if still fresh.
    ///
    /// On failure the previous token list is kept, the error is recorded on
    /// the view and returned.
    pub async fn refresh(&self) -> WalletResult<RefreshOutcome> {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let source = if self.is_mock() { &self.mock } else { &self.live };
        log_debug!("dashboard", "Refreshing balances", seq = seq, source = source.name());

        let guard = InFlight::enter(&self.state);
        let result = source.fetch_balances(&self.record.address).await;
        drop(guard);

        if !self.is_active() || self.epoch.load(Ordering::SeqCst) != epoch {
            log_debug!("dashboard", "Dropping response after teardown", seq = seq);
            return Ok(RefreshOutcome::Discarded);
        }

        let mut state = self.lock_state();
        let outcome = match result {
            Ok(_) if seq <= state.applied_seq => {
                log_debug!(
                    "dashboard",
                    "Dropping stale response",
                    seq = seq,
                    applied = state.applied_seq
                );
                Ok(RefreshOutcome::Stale)
            }
            Ok(tokens) => {
                state.portfolio_value = aggregate(&tokens);
                state.applied_seq = seq;
                state.last_error = None;
                let count = tokens.len();
                state.tokens = tokens;
                log_info!(
                    "dashboard",
                    "Balances updated",
                    tokens = count,
                    total = state.portfolio_value
                );
                Ok(RefreshOutcome::Applied { tokens: count })
            }
            Err(e) => {
                log_warn!("dashboard", "Balance refresh failed", seq = seq, error = e);
                state.last_error = Some(e.clone());
                Err(e)
            }
        };
        drop(state);

        if !matches!(outcome, Ok(RefreshOutcome::Stale)) {
            self.updates.send_modify(|count| *count += 1);
        }
        outcome
    }

    /// Refresh now and then every `refresh_interval` until teardown or until
    /// the handle is stopped or dropped. Replaces any timer already running.
    pub fn start_auto_refresh(self: &Arc<Self>) -> RefreshHandle {
        self.active.store(true, Ordering::SeqCst);
        let this = Arc::clone(self);
        let period = self.refresh_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !this.is_active() {
                    break;
                }
                // Failures are logged and recorded on the view
                let _ = this.refresh().await;
            }
        });

        if let Some(previous) = lock(&self.timer).replace(task.abort_handle()) {
            previous.abort();
        }
        RefreshHandle { task }
    }

    /// Switch to demo data for the rest of this session and refresh
    pub async fn enable_mock_data(&self) -> WalletResult<RefreshOutcome> {
        if !self.use_mock.swap(true, Ordering::SeqCst) {
            log_info!("dashboard", "Switched to demo data");
        }
        self.refresh().await
    }

    /// Stop the timer and drop every response still in flight. Called when
    /// leaving the dashboard.
    pub fn teardown(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(timer) = lock(&self.timer).take() {
            timer.abort();
        }
        if self.active.swap(false, Ordering::SeqCst) {
            log_debug!("dashboard", "Dashboard torn down");
        }
    }

    /// Forget the persisted wallet and go back home
    pub fn logout(&self) -> WalletResult<Route> {
        self.teardown();
        self.store.clear()?;
        log_info!("dashboard", "Logged out", address = self.record.address);
        Ok(Route::Home)
    }

    pub fn view(&self) -> DashboardView {
        let state = self.lock_state();
        DashboardView {
            address: self.record.address.clone(),
            short_address: format_address(&self.record.address),
            watch_only: self.record.is_watch_only(),
            tokens: state.tokens.clone(),
            portfolio_value: state.portfolio_value.clone(),
            loading: state.in_flight > 0,
            mock: self.is_mock(),
            last_error: state.last_error.clone(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, DashboardState> {
        lock(&self.state)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a request as in flight; cleared on drop even if the future is cancelled
struct InFlight<'a> {
    state: &'a Mutex<DashboardState>,
}

impl<'a> InFlight<'a> {
    fn enter(state: &'a Mutex<DashboardState>) -> Self {
        lock(state).in_flight += 1;
        Self { state }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

/// Periodic refresh task. Stops when stopped or dropped.
pub struct RefreshHandle {
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn stop(self) {}

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
