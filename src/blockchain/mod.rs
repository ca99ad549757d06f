// Blockchain module
//
// This module contains the core ledger implementation including:
// - Canonical encoding shared by hashing and signing
// - Block structure and the proof-of-work chain
// - Wallets and signatures
// - Transactions and the ledger that replays them

pub mod block;
pub mod chain;
pub mod codec;
pub mod crypto;
pub mod ledger;
pub mod pow;
pub mod transaction;

// Re-export main components for easier access
pub use block::{Block, BlockData};
pub use chain::{Blockchain, ChainError};
pub use crypto::{Address, Wallet};
pub use ledger::{Cryptocurrency, LedgerError};
pub use transaction::Transaction;
