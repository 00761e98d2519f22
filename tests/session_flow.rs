use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use chainfusion::api::{BalanceSource, MockBalanceSource};
use chainfusion::controller::{
    Activation, DashboardController, RefreshOutcome, SetupStep, WalletSetupController,
};
use chainfusion::navigation::{resolve, Route};
use chainfusion::storage::{FileStore, KeyValueStore, MemoryStore, WalletSessionStore};
use chainfusion::wallet::EvmKeyProvider;
use chainfusion::{ErrorCode, TokenBalance, WalletError, WalletKind, WalletResult};

const WATCHED: &str = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";
const ELEVEN_WORDS: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";

type SharedStore = WalletSessionStore<Arc<MemoryStore>>;

fn shared_store() -> SharedStore {
    WalletSessionStore::new(Arc::new(MemoryStore::new()))
}

fn token(symbol: &str, usd_value: f64) -> TokenBalance {
    TokenBalance {
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        balance: "1".to_string(),
        balance_raw: String::new(),
        contract_address: String::new(),
        usd_price: Some(usd_value),
        usd_price_change: None,
        usd_value: Some(usd_value),
        icon_url: None,
    }
}

/// Returns a fixed list until told to fail
struct ScriptedSource {
    tokens: Vec<TokenBalance>,
    failing: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(tokens: Vec<TokenBalance>) -> Arc<Self> {
        Arc::new(Self {
            tokens,
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceSource for ScriptedSource {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_balances(&self, _address: &str) -> WalletResult<Vec<TokenBalance>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(WalletError::fetch_failed("Failed to fetch balances"));
        }
        Ok(self.tokens.clone())
    }
}

/// Each call blocks until its sender delivers a token list
struct GatedSource {
    gates: Mutex<VecDeque<oneshot::Receiver<Vec<TokenBalance>>>>,
    calls: AtomicUsize,
}

impl GatedSource {
    fn new(count: usize) -> (Arc<Self>, Vec<oneshot::Sender<Vec<TokenBalance>>>) {
        let mut senders = Vec::new();
        let mut receivers = VecDeque::new();
        for _ in 0..count {
            let (tx, rx) = oneshot::channel();
            senders.push(tx);
            receivers.push_back(rx);
        }
        let source = Arc::new(Self {
            gates: Mutex::new(receivers),
            calls: AtomicUsize::new(0),
        });
        (source, senders)
    }

    async fn wait_for_calls(&self, count: usize) {
        while self.calls.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl BalanceSource for GatedSource {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn fetch_balances(&self, _address: &str) -> WalletResult<Vec<TokenBalance>> {
        let gate = self
            .gates
            .lock()
            .expect("gate lock")
            .pop_front()
            .expect("a gate per call");
        self.calls.fetch_add(1, Ordering::SeqCst);
        gate.await.map_err(|_| WalletError::fetch_failed("gate dropped"))
    }
}

fn activate<S: KeyValueStore + 'static>(
    store: WalletSessionStore<S>,
    live: Arc<dyn BalanceSource>,
) -> Arc<DashboardController<S>> {
    match DashboardController::activate(
        store,
        live,
        Arc::new(MockBalanceSource::with_seed(1)),
        Duration::from_secs(60),
    ) {
        Activation::Ready(dashboard) => dashboard,
        Activation::Redirect(route) => panic!("unexpected redirect to {:?}", route),
    }
}

fn watch_only_session() -> SharedStore {
    let store = shared_store();
    let mut setup = WalletSetupController::new(EvmKeyProvider::new(), store.clone());
    setup.choose_view().unwrap();
    setup.set_address_input(WATCHED);
    setup.view_address().unwrap();
    setup.confirm().unwrap();
    store
}

#[tokio::test]
async fn generated_wallet_is_persisted_and_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let store = WalletSessionStore::new(Arc::new(FileStore::new(dir.path())));

    let mut setup = WalletSetupController::new(EvmKeyProvider::new(), store.clone());
    setup.choose_create().unwrap();
    setup.generate().unwrap();
    let confirmed = setup.confirm().unwrap();

    let persisted = store.load().expect("record persisted");
    assert_eq!(persisted, confirmed);
    assert_eq!(persisted.kind(), WalletKind::Generated);
    assert!(persisted.mnemonic.as_deref().is_some_and(|m| !m.is_empty()));
    assert!(persisted.private_key.as_deref().is_some_and(|k| !k.is_empty()));
    assert!(!persisted.address.is_empty());

    // A fresh store over the same directory sees the session; no setup needed
    let reopened = WalletSessionStore::new(FileStore::new(dir.path()));
    assert_eq!(resolve(Route::Dashboard, &reopened), Route::Dashboard);
    let dashboard = activate(reopened, ScriptedSource::new(vec![]));
    assert_eq!(dashboard.record().address, confirmed.address);
}

#[test]
fn eleven_word_phrase_stays_on_import() {
    let store = shared_store();
    let mut setup = WalletSetupController::new(EvmKeyProvider::new(), store.clone());
    setup.choose_import().unwrap();
    setup.set_mnemonic_input(ELEVEN_WORDS);

    let err = setup.import_mnemonic().unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidMnemonicFormat);
    assert_eq!(setup.step(), SetupStep::Import);
    assert_eq!(setup.error().map(|e| e.code), Some(ErrorCode::InvalidMnemonicFormat));
    assert!(!store.exists());
}

#[test]
fn address_without_prefix_stays_on_view() {
    let store = shared_store();
    let mut setup = WalletSetupController::new(EvmKeyProvider::new(), store.clone());
    setup.choose_view().unwrap();
    setup.set_address_input(WATCHED.trim_start_matches("0x"));

    let err = setup.view_address().unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidAddress);
    assert_eq!(setup.step(), SetupStep::View);
    assert!(!store.exists());
}

#[test]
fn dashboard_without_session_redirects_without_fetching() {
    let live = ScriptedSource::new(vec![token("ETH", 1.0)]);
    let activation = DashboardController::activate(
        shared_store(),
        live.clone(),
        Arc::new(MockBalanceSource::new()),
        Duration::from_secs(60),
    );

    assert!(matches!(activation, Activation::Redirect(Route::Setup)));
    assert_eq!(live.calls(), 0);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_tokens() {
    let live = ScriptedSource::new(vec![token("ETH", 100.0), token("USDC", 0.5)]);
    let dashboard = activate(watch_only_session(), live.clone());

    dashboard.refresh().await.unwrap();
    let before = dashboard.view();
    assert_eq!(before.portfolio_value, "100.50");

    live.failing.store(true, Ordering::SeqCst);
    let err = dashboard.refresh().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::FetchFailed);

    let after = dashboard.view();
    assert_eq!(after.tokens, before.tokens);
    assert_eq!(after.portfolio_value, before.portfolio_value);
    assert!(!after.loading);
}

#[tokio::test]
async fn older_response_never_overwrites_newer() {
    let (live, mut gates) = GatedSource::new(2);
    let dashboard = activate(watch_only_session(), live.clone());

    let first = tokio::spawn({
        let dashboard = Arc::clone(&dashboard);
        async move { dashboard.refresh().await }
    });
    live.wait_for_calls(1).await;
    assert!(dashboard.view().loading);

    let second = tokio::spawn({
        let dashboard = Arc::clone(&dashboard);
        async move { dashboard.refresh().await }
    });
    live.wait_for_calls(2).await;

    let second_gate = gates.pop().unwrap();
    let first_gate = gates.pop().unwrap();

    second_gate.send(vec![token("NEW", 2.0)]).unwrap();
    let outcome = second.await.unwrap().unwrap();
    assert_eq!(outcome, RefreshOutcome::Applied { tokens: 1 });
    assert!(dashboard.view().loading);

    first_gate.send(vec![token("OLD", 1.0), token("OLDER", 1.0)]).unwrap();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome, RefreshOutcome::Stale);

    let view = dashboard.view();
    assert_eq!(view.tokens.len(), 1);
    assert_eq!(view.tokens[0].symbol, "NEW");
    assert_eq!(view.portfolio_value, "2.00");
    assert!(!view.loading);
}

#[tokio::test]
async fn response_after_teardown_is_dropped() {
    let (live, mut gates) = GatedSource::new(1);
    let dashboard = activate(watch_only_session(), live.clone());

    let pending = tokio::spawn({
        let dashboard = Arc::clone(&dashboard);
        async move { dashboard.refresh().await }
    });
    live.wait_for_calls(1).await;

    dashboard.teardown();
    gates.pop().unwrap().send(vec![token("ETH", 5.0)]).unwrap();

    assert_eq!(pending.await.unwrap().unwrap(), RefreshOutcome::Discarded);
    assert!(dashboard.view().tokens.is_empty());
    assert_eq!(dashboard.view().portfolio_value, "0.00");
}

#[tokio::test]
async fn auto_refresh_runs_until_stopped() {
    let live = ScriptedSource::new(vec![token("ETH", 1.0)]);
    let dashboard = match DashboardController::activate(
        watch_only_session(),
        live.clone(),
        Arc::new(MockBalanceSource::new()),
        Duration::from_millis(20),
    ) {
        Activation::Ready(dashboard) => dashboard,
        Activation::Redirect(route) => panic!("unexpected redirect to {:?}", route),
    };

    let handle = dashboard.start_auto_refresh();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(live.calls() >= 2, "expected repeated refreshes, got {}", live.calls());
    assert_eq!(dashboard.view().portfolio_value, "1.00");

    handle.stop();
    tokio::task::yield_now().await;
    let calls = live.calls();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(live.calls(), calls);
}

#[tokio::test]
async fn demo_data_replaces_live_source_for_the_session() {
    let live = ScriptedSource::new(vec![token("ETH", 1.0)]);
    let dashboard = activate(watch_only_session(), live.clone());

    dashboard.enable_mock_data().await.unwrap();
    dashboard.refresh().await.unwrap();

    let view = dashboard.view();
    assert!(view.mock);
    assert_eq!(view.tokens[0].symbol, "BNB");
    assert_eq!(live.calls(), 0);
}

#[tokio::test]
async fn logout_returns_home_and_requires_setup_again() {
    let store = watch_only_session();
    let dashboard = activate(store.clone(), ScriptedSource::new(vec![]));

    assert_eq!(dashboard.logout().unwrap(), Route::Home);
    assert!(!store.exists());
    assert_eq!(resolve(Route::Dashboard, &store), Route::Setup);

    // Clearing again is harmless
    store.clear().unwrap();
    assert!(!store.exists());
}

#[test]
fn corrupt_session_reads_as_absent() {
    let backend = Arc::new(MemoryStore::new());
    backend
        .set(chainfusion::storage::WALLET_STORAGE_KEY, "{not json")
        .unwrap();
    let store = WalletSessionStore::new(backend);

    assert!(store.load().is_none());
    assert_eq!(resolve(Route::Dashboard, &store), Route::Setup);
}

#[tokio::test]
async fn response_from_before_teardown_is_dropped_after_reentry() {
    let (live, mut gates) = GatedSource::new(2);
    let dashboard = activate(watch_only_session(), live.clone());

    let pending = tokio::spawn({
        let dashboard = Arc::clone(&dashboard);
        async move { dashboard.refresh().await }
    });
    live.wait_for_calls(1).await;

    dashboard.teardown();
    let _timer = dashboard.start_auto_refresh();
    assert!(dashboard.is_active());
    live.wait_for_calls(2).await;

    let stale_gate = gates.remove(0);
    stale_gate.send(vec![token("FROM_BEFORE_TEARDOWN", 9.0)]).unwrap();
    assert_eq!(pending.await.unwrap().unwrap(), RefreshOutcome::Discarded);
    assert!(dashboard.view().tokens.is_empty());

    // The refresh started after re-entry still lands
    let mut updates = dashboard.subscribe();
    gates.remove(0).send(vec![token("CURRENT", 1.0)]).unwrap();
    updates.changed().await.unwrap();
    let view = dashboard.view();
    assert_eq!(view.tokens.len(), 1);
    assert_eq!(view.tokens[0].symbol, "CURRENT");
}

#[tokio::test]
async fn teardown_stops_the_timer_before_reentry() {
    let live = ScriptedSource::new(vec![token("ETH", 1.0)]);
    let dashboard = match DashboardController::activate(
        watch_only_session(),
        live.clone(),
        Arc::new(MockBalanceSource::new()),
        Duration::from_millis(50),
    ) {
        Activation::Ready(dashboard) => dashboard,
        Activation::Redirect(route) => panic!("unexpected redirect to {:?}", route),
    };

    let first = dashboard.start_auto_refresh();
    tokio::time::sleep(Duration::from_millis(10)).await;
    dashboard.teardown();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(first.is_finished());

    let before = live.calls();
    let _second = dashboard.start_auto_refresh();
    tokio::time::sleep(Duration::from_millis(260)).await;

    // One timer: an immediate tick plus about five more
    let calls = live.calls() - before;
    assert!((2..=8).contains(&calls), "expected a single timer, got {} calls", calls);
}

#[tokio::test]
async fn restarting_auto_refresh_replaces_the_running_timer() {
    let live = ScriptedSource::new(vec![token("ETH", 1.0)]);
    let dashboard = match DashboardController::activate(
        watch_only_session(),
        live.clone(),
        Arc::new(MockBalanceSource::new()),
        Duration::from_millis(50),
    ) {
        Activation::Ready(dashboard) => dashboard,
        Activation::Redirect(route) => panic!("unexpected redirect to {:?}", route),
    };

    let first = dashboard.start_auto_refresh();
    let _second = dashboard.start_auto_refresh();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(first.is_finished());
}
