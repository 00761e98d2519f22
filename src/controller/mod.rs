//! Screen controllers: the wallet setup flow and the dashboard.

pub mod dashboard;
pub mod setup;

pub use dashboard::{Activation, DashboardController, DashboardView, RefreshHandle, RefreshOutcome};
pub use setup::{ConfirmationView, SetupStep, SetupView, WalletSetupController};
