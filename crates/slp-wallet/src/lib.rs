//! SLP wallet layer.
//!
//! Token coin selection, the pre-broadcast conservation check, Post Office
//! postage, and the wiring that lets a wallet drive the validation engine
//! and persist its verdicts. Storage stays behind the [`WalletView`] trait;
//! [`MemoryWallet`] is an in-memory implementation.

mod error;
pub use error::WalletError;

pub mod checker;
pub mod coin_chooser;
pub mod config;
pub mod memory;
pub mod post_office;
pub mod types;
pub mod validation;
pub mod wallet_view;

pub use checker::{check_tx_slp, SlpCheckError};
pub use coin_chooser::{select_coins, CoinSelection};
pub use config::{PostOfficeConfig, SelectionConfig};
pub use memory::MemoryWallet;
pub use post_office::{build_postage_send, HostRate, PostOfficeClient, PostageOffer, PostageQuote, Stamp};
pub use types::{CoinValue, SpendableTokenCoin, TokenBalance, TokenInfo};
pub use validation::SlpWallet;
pub use wallet_view::WalletView;
