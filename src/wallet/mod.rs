//! Wallet Module
//!
//! Handles key material creation and restoration, plus the address and
//! recovery phrase validators used by the setup flow.

mod keygen;
mod validation;

pub use keygen::*;
pub use validation::*;
