use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chainfusion::api::{BalanceSource, MockBalanceSource, MoralisBalanceFetcher};
use chainfusion::config::{AppConfig, DEFAULT_CHAIN, DEFAULT_MORALIS_BASE_URL, DEFAULT_REFRESH_INTERVAL};
use chainfusion::controller::{
    Activation, ConfirmationView, DashboardController, DashboardView, WalletSetupController,
};
use chainfusion::display::{format_address, mask_mnemonic, mask_private_key};
use chainfusion::navigation::{resolve, Route};
use chainfusion::storage::{FileStore, WalletSessionStore};
use chainfusion::utils::logging::enable_debug;
use chainfusion::wallet::EvmKeyProvider;
use chainfusion::{log_debug, WalletError};

type SessionStore = WalletSessionStore<Arc<FileStore>>;

#[derive(Parser, Debug)]
#[command(name = "chainfusion", version, about = "Single-wallet EVM portfolio viewer")]
struct Cli {
    /// Directory holding the persisted wallet
    #[arg(long, env = "CHAINFUSION_HOME", global = true)]
    home: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, env = "MORALIS_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[arg(long, env = "MORALIS_BASE_URL", default_value = DEFAULT_MORALIS_BASE_URL, global = true)]
    base_url: String,

    /// Hex chain id, e.g. 0x1 or 0x38
    #[arg(long, env = "CHAINFUSION_CHAIN", default_value = DEFAULT_CHAIN, global = true)]
    chain: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new wallet and save it
    Create {
        /// Print the private key and recovery phrase unmasked
        #[arg(long)]
        reveal: bool,
    },
    /// Import a wallet from a recovery phrase or private key
    Import {
        #[arg(long, conflicts_with = "private_key", required_unless_present = "private_key")]
        mnemonic: Option<String>,
        #[arg(long)]
        private_key: Option<String>,
        #[arg(long)]
        reveal: bool,
    },
    /// Watch an address without any keys
    View { address: String },
    /// Show the saved wallet
    Show {
        #[arg(long)]
        reveal: bool,
    },
    /// Fetch token balances of the saved wallet
    Balances {
        /// Use demo data instead of the balance API
        #[arg(long)]
        mock: bool,
        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
        /// Seconds between refreshes with --watch [default: 60]
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Forget the saved wallet
    Logout,
}

#[derive(Serialize)]
struct WalletSummary {
    address: String,
    short_address: String,
    kind: chainfusion::WalletKind,
    private_key: Option<String>,
    mnemonic: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        enable_debug();
    }

    if let Err(e) = run(cli).await {
        // Wallet errors carry a user-facing message; show only that
        match e.downcast_ref::<WalletError>() {
            Some(wallet_error) => eprintln!("Error: {}", wallet_error.message),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;
    log_debug!("cli", "Using storage directory", dir = config.storage_dir.display());
    let store = WalletSessionStore::new(Arc::new(FileStore::new(config.storage_dir.clone())));

    match cli.command {
        Command::Create { reveal } => {
            let mut setup = WalletSetupController::new(EvmKeyProvider::new(), store);
            setup.choose_create()?;
            setup.generate()?;
            finish_setup(&mut setup, reveal, cli.json)
        }
        Command::Import {
            mnemonic,
            private_key,
            reveal,
        } => {
            let mut setup = WalletSetupController::new(EvmKeyProvider::new(), store);
            setup.choose_import()?;
            match (mnemonic, private_key) {
                (Some(phrase), _) => {
                    setup.set_mnemonic_input(&phrase);
                    setup.import_mnemonic()?;
                }
                (None, Some(key)) => {
                    setup.set_private_key_input(&key);
                    setup.import_private_key()?;
                }
                (None, None) => bail!("Provide --mnemonic or --private-key"),
            }
            finish_setup(&mut setup, reveal, cli.json)
        }
        Command::View { address } => {
            let mut setup = WalletSetupController::new(EvmKeyProvider::new(), store);
            setup.choose_view()?;
            setup.set_address_input(&address);
            setup.view_address()?;
            finish_setup(&mut setup, false, cli.json)
        }
        Command::Show { reveal } => show(&store, reveal, cli.json),
        Command::Balances { mock, watch, .. } => {
            balances(&config, store, mock, watch, cli.json).await
        }
        Command::Logout => logout(store, cli.json),
    }
}

fn build_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::default();
    if let Some(home) = &cli.home {
        config.storage_dir = home.clone();
    }
    config.moralis_api_key = cli.api_key.clone();
    config.moralis_base_url = cli.base_url.clone();
    config.chain = cli.chain.clone();
    if let Command::Balances {
        interval: Some(secs),
        ..
    } = &cli.command
    {
        config.refresh_interval = Duration::from_secs(*secs);
    }
    config.validate()?;
    Ok(config)
}

fn finish_setup(
    setup: &mut WalletSetupController<EvmKeyProvider, Arc<FileStore>>,
    reveal: bool,
    json: bool,
) -> Result<()> {
    if reveal {
        setup.toggle_reveal()?;
    }
    let view = setup
        .confirmation_view()
        .context("setup did not reach confirmation")?;
    setup.confirm()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_confirmation(&view);
    }
    Ok(())
}

fn print_confirmation(view: &ConfirmationView) {
    println!("Wallet {} successfully", view.outcome);
    println!("Address:     {}", view.address);
    if let Some(key) = &view.private_key {
        println!("Private key: {}", key);
    }
    if let Some(phrase) = &view.mnemonic {
        println!("Recovery:    {}", phrase);
    }
    if !view.revealed && (view.private_key.is_some() || view.mnemonic.is_some()) {
        println!("(run `chainfusion show --reveal` to display secrets)");
    }
}

fn show(store: &SessionStore, reveal: bool, json: bool) -> Result<()> {
    let record = store
        .load()
        .ok_or_else(|| WalletError::session_missing("No wallet saved. Run `chainfusion create` first."))?;

    let summary = WalletSummary {
        address: record.address.clone(),
        short_address: format_address(&record.address),
        kind: record.kind(),
        private_key: record.private_key.as_ref().map(|key| {
            if reveal {
                key.clone()
            } else {
                mask_private_key(key)
            }
        }),
        mnemonic: record.mnemonic.as_ref().map(|phrase| {
            if reveal {
                phrase.clone()
            } else {
                mask_mnemonic(phrase)
            }
        }),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Address:     {}", summary.address);
        println!("Kind:        {:?}", summary.kind);
        if let Some(key) = &summary.private_key {
            println!("Private key: {}", key);
        }
        if let Some(phrase) = &summary.mnemonic {
            println!("Recovery:    {}", phrase);
        }
    }
    Ok(())
}

async fn balances(
    config: &AppConfig,
    store: SessionStore,
    mock: bool,
    watch: bool,
    json: bool,
) -> Result<()> {
    if resolve(Route::Dashboard, &store) != Route::Dashboard {
        return Err(WalletError::session_missing(
            "No wallet saved. Run `chainfusion create` first.",
        )
        .into());
    }

    let live: Arc<dyn BalanceSource> = Arc::new(MoralisBalanceFetcher::from_config(config)?);
    let demo: Arc<dyn BalanceSource> = Arc::new(MockBalanceSource::new());

    let dashboard = match DashboardController::activate(store, live, demo, config.refresh_interval) {
        Activation::Ready(dashboard) => dashboard,
        Activation::Redirect(route) => bail!("No wallet session, go to {:?}", route),
    };

    if !watch {
        if mock {
            dashboard.enable_mock_data().await?;
        } else {
            dashboard.refresh().await?;
        }
        print_dashboard(&dashboard.view(), json)?;
        return Ok(());
    }

    if mock {
        dashboard.enable_mock_data().await?;
    }
    // Print once per completed refresh
    let mut updates = dashboard.subscribe();
    let handle = dashboard.start_auto_refresh();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print_dashboard(&dashboard.view(), json)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    dashboard.teardown();
    handle.stop();
    Ok(())
}

fn print_dashboard(view: &DashboardView, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    let source = if view.mock { " (demo data)" } else { "" };
    println!("{}{}", view.short_address, source);
    println!("Portfolio value: ${}", view.portfolio_value);
    if let Some(error) = &view.last_error {
        println!("Last refresh failed: {}", error.message);
    }
    for token in &view.tokens {
        let value = token
            .usd_value
            .map(|v| format!("${:.2}", v))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:<8} {:>24} {:>14}", token.symbol, token.balance, value);
    }
    Ok(())
}

fn logout(store: SessionStore, json: bool) -> Result<()> {
    // Logging out goes through the dashboard so it is torn down first
    let demo: Arc<dyn BalanceSource> = Arc::new(MockBalanceSource::new());
    let existed = match DashboardController::activate(store, demo.clone(), demo, DEFAULT_REFRESH_INTERVAL) {
        Activation::Ready(dashboard) => {
            dashboard.logout()?;
            true
        }
        Activation::Redirect(_) => false,
    };

    if json {
        println!("{}", serde_json::json!({ "loggedOut": existed }));
    } else if existed {
        println!("Wallet removed");
    } else {
        println!("No wallet saved");
    }
    Ok(())
}
