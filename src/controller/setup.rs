//! Wallet Setup Flow
//!
//! State machine behind the setup screens:
//!
//! ```text
//! Options ──► Create ─┐
//!    ▲    ──► Import ─┼──► Confirmation ──► (saved, hand off to dashboard)
//!    │    ──► View  ──┘          │
//!    └───────── back / start over ┘
//! ```
//!
//! Only `confirm` has a durable side effect. Errors are kept on the step
//! that raised them; secret input is cleared after every attempt.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::display::{mask_mnemonic, mask_private_key};
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::storage::{KeyValueStore, WalletSessionStore};
use crate::types::{WalletKind, WalletRecord};
use crate::wallet::{is_valid_mnemonic_format, normalize_address, KeyMaterialProvider};
use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetupStep {
    Options,
    Create,
    Import,
    View,
    Confirmation,
}

/// What the confirmation screen shows. Secrets are masked unless revealed.
#[derive(Clone, Serialize)]
pub struct ConfirmationView {
    pub address: String,
    pub kind: WalletKind,
    /// "created" for generated wallets, "imported" otherwise
    pub outcome: &'static str,
    pub private_key: Option<String>,
    pub mnemonic: Option<String>,
    pub revealed: bool,
}

/// Render-ready snapshot of the setup flow
#[derive(Clone, Serialize)]
pub struct SetupView {
    pub step: SetupStep,
    pub address_input: String,
    pub error: Option<WalletError>,
    pub confirmation: Option<ConfirmationView>,
}

pub struct WalletSetupController<P, S> {
    provider: P,
    store: WalletSessionStore<S>,
    step: SetupStep,
    address_input: String,
    mnemonic_input: Zeroizing<String>,
    private_key_input: Zeroizing<String>,
    error: Option<WalletError>,
    candidate: Option<WalletRecord>,
    reveal_secrets: bool,
}

impl<P: KeyMaterialProvider, S: KeyValueStore> WalletSetupController<P, S> {
    pub fn new(provider: P, store: WalletSessionStore<S>) -> Self {
        Self {
            provider,
            store,
            step: SetupStep::Options,
            address_input: String::new(),
            mnemonic_input: Zeroizing::new(String::new()),
            private_key_input: Zeroizing::new(String::new()),
            error: None,
            candidate: None,
            reveal_secrets: false,
        }
    }

    pub fn step(&self) -> SetupStep {
        self.step
    }

    pub fn error(&self) -> Option<&WalletError> {
        self.error.as_ref()
    }

    pub fn candidate(&self) -> Option<&WalletRecord> {
        self.candidate.as_ref()
    }

    pub fn address_input(&self) -> &str {
        &self.address_input
    }

    pub fn store(&self) -> &WalletSessionStore<S> {
        &self.store
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    pub fn choose_create(&mut self) -> WalletResult<()> {
        self.leave_options(SetupStep::Create)
    }

    pub fn choose_import(&mut self) -> WalletResult<()> {
        self.leave_options(SetupStep::Import)
    }

    pub fn choose_view(&mut self) -> WalletResult<()> {
        self.leave_options(SetupStep::View)
    }

    /// Cancel the current step and return to the options screen
    pub fn back(&mut self) -> WalletResult<()> {
        match self.step {
            SetupStep::Options => Err(WalletError::invalid_transition(
                "Already at the setup options",
            )),
            SetupStep::Confirmation => self.start_over(),
            SetupStep::Create | SetupStep::Import | SetupStep::View => {
                self.reset_to_options();
                Ok(())
            }
        }
    }

    /// Discard the candidate wallet without saving it
    pub fn start_over(&mut self) -> WalletResult<()> {
        self.expect_step(SetupStep::Confirmation)?;
        self.candidate = None;
        self.reset_to_options();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Input
    // ---------------------------------------------------------------------

    pub fn set_address_input(&mut self, address: &str) {
        self.address_input = address.to_string();
    }

    pub fn set_mnemonic_input(&mut self, phrase: &str) {
        self.mnemonic_input = Zeroizing::new(phrase.to_string());
    }

    pub fn set_private_key_input(&mut self, private_key: &str) {
        self.private_key_input = Zeroizing::new(private_key.to_string());
    }

    // ---------------------------------------------------------------------
    // Transitions to Confirmation
    // ---------------------------------------------------------------------

    /// Create → Confirmation with a freshly generated wallet
    pub fn generate(&mut self) -> WalletResult<()> {
        self.expect_step(SetupStep::Create)?;
        self.error = None;

        if let Err(e) = self.provider.ensure_secure_randomness() {
            return self.fail(reclassify(
                e,
                ErrorCode::UnsupportedEnvironment,
                "Your platform doesn't support secure wallet generation",
            ));
        }

        let material = match self.provider.generate() {
            Ok(material) => material,
            Err(e) => {
                return self.fail(reclassify(
                    e,
                    ErrorCode::GenerationFailed,
                    "Failed to create wallet. Please try again.",
                ))
            }
        };

        if material.mnemonic.is_none() {
            return self.fail(
                WalletError::generation_failed("Failed to create wallet. Please try again.")
                    .with_details("provider returned no recovery phrase"),
            );
        }

        self.enter_confirmation(material.to_record());
        Ok(())
    }

    /// Import → Confirmation from the recovery phrase input
    pub fn import_mnemonic(&mut self) -> WalletResult<()> {
        self.expect_step(SetupStep::Import)?;
        self.error = None;

        // Secret input never survives an attempt
        let phrase = Zeroizing::new(std::mem::take(&mut *self.mnemonic_input));

        if !is_valid_mnemonic_format(&phrase) {
            let words = phrase.split_whitespace().count();
            return self.fail(
                WalletError::invalid_mnemonic_format("Invalid mnemonic phrase format")
                    .with_details(format!("{} words", words)),
            );
        }

        let material = match self.provider.from_mnemonic(&phrase) {
            Ok(material) => material,
            Err(e) => {
                return self.fail(
                    WalletError::invalid_mnemonic(
                        "Invalid mnemonic phrase. Please check and try again.",
                    )
                    .with_details(e.message.clone()),
                )
            }
        };

        self.enter_confirmation(material.without_mnemonic().to_record());
        Ok(())
    }

    /// Import → Confirmation from the raw private key input
    pub fn import_private_key(&mut self) -> WalletResult<()> {
        self.expect_step(SetupStep::Import)?;
        self.error = None;

        let private_key = Zeroizing::new(std::mem::take(&mut *self.private_key_input));

        let material = match self.provider.from_private_key(&private_key) {
            Ok(material) => material,
            Err(e) => {
                return self.fail(
                    WalletError::invalid_private_key(
                        "Invalid private key. Please check and try again.",
                    )
                    .with_details(e.message.clone()),
                )
            }
        };

        self.enter_confirmation(material.without_mnemonic().to_record());
        Ok(())
    }

    /// View → Confirmation with a watch-only wallet
    pub fn view_address(&mut self) -> WalletResult<()> {
        self.expect_step(SetupStep::View)?;
        self.error = None;

        match normalize_address(self.address_input.trim()) {
            Some(address) => {
                self.enter_confirmation(WalletRecord::watch_only(address));
                Ok(())
            }
            None => self.fail(WalletError::invalid_address(
                "Invalid address. Please check and try again.",
            )),
        }
    }

    // ---------------------------------------------------------------------
    // Confirmation
    // ---------------------------------------------------------------------

    /// Show or hide the private key and recovery phrase
    pub fn toggle_reveal(&mut self) -> WalletResult<bool> {
        self.expect_step(SetupStep::Confirmation)?;
        self.reveal_secrets = !self.reveal_secrets;
        Ok(self.reveal_secrets)
    }

    pub fn confirmation_view(&self) -> Option<ConfirmationView> {
        if self.step != SetupStep::Confirmation {
            return None;
        }
        let record = self.candidate.as_ref()?;
        let revealed = self.reveal_secrets;

        Some(ConfirmationView {
            address: record.address.clone(),
            kind: record.kind(),
            outcome: if record.has_mnemonic() { "created" } else { "imported" },
            private_key: record.private_key.as_ref().map(|key| {
                if revealed {
                    key.clone()
                } else {
                    mask_private_key(key)
                }
            }),
            mnemonic: record.mnemonic.as_ref().map(|phrase| {
                if revealed {
                    phrase.clone()
                } else {
                    mask_mnemonic(phrase)
                }
            }),
            revealed,
        })
    }

    /// Persist the candidate and finish the flow.
    ///
    /// On success the controller is back at `Options` with no state left and
    /// the saved record is returned for the dashboard. On failure the flow
    /// stays on the confirmation step with the candidate intact.
    pub fn confirm(&mut self) -> WalletResult<WalletRecord> {
        self.expect_step(SetupStep::Confirmation)?;
        let record = self
            .candidate
            .clone()
            .ok_or_else(|| WalletError::invalid_transition("No wallet to confirm"))?;

        if let Err(e) = self.store.save(&record) {
            self.fail::<()>(e.clone())?;
        }

        log_info!("setup", "Wallet setup complete", address = record.address);
        self.candidate = None;
        self.reset_to_options();
        Ok(record)
    }

    pub fn view(&self) -> SetupView {
        SetupView {
            step: self.step,
            address_input: self.address_input.clone(),
            error: self.error.clone(),
            confirmation: self.confirmation_view(),
        }
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn expect_step(&self, expected: SetupStep) -> WalletResult<()> {
        if self.step == expected {
            Ok(())
        } else {
            Err(WalletError::invalid_transition(format!(
                "Expected {:?} step, currently at {:?}",
                expected, self.step
            )))
        }
    }

    fn leave_options(&mut self, next: SetupStep) -> WalletResult<()> {
        self.expect_step(SetupStep::Options)?;
        self.error = None;
        self.step = next;
        Ok(())
    }

    fn enter_confirmation(&mut self, record: WalletRecord) {
        log_info!("setup", "Wallet ready for confirmation", address = record.address);
        self.candidate = Some(record);
        self.reveal_secrets = false;
        self.error = None;
        self.step = SetupStep::Confirmation;
    }

    fn reset_to_options(&mut self) {
        self.step = SetupStep::Options;
        self.error = None;
        self.reveal_secrets = false;
        self.address_input.clear();
        self.mnemonic_input = Zeroizing::new(String::new());
        self.private_key_input = Zeroizing::new(String::new());
    }

    fn fail<T>(&mut self, error: WalletError) -> WalletResult<T> {
        log_warn!(
            "setup",
            "Setup step failed",
            step = format!("{:?}", self.step),
            code = format!("{:?}", error.code)
        );
        self.error = Some(error.clone());
        Err(error)
    }
}

/// Keep an environment failure as-is, fold anything else into `code`
fn reclassify(error: WalletError, code: ErrorCode, message: &str) -> WalletError {
    if error.code == ErrorCode::UnsupportedEnvironment {
        return error;
    }
    WalletError::new(code, message).with_details(error.message.clone())
}
