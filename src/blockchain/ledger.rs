use std::collections::BTreeMap;

use log::{debug, info, warn};
use thiserror::Error;

use crate::config::LedgerConfig;

use super::block::{Block, BlockData};
use super::chain::{Blockchain, ChainError};
use super::crypto::{Address, CryptoError, Wallet};
use super::transaction::{validate_amount, Transaction, TransactionError};

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Chain error: {0}")]
    ChainError(#[from] ChainError),

    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),

    #[error("Invalid signature on transaction {transaction} of block {block}")]
    InvalidSignature { block: usize, transaction: usize },

    #[error("Malformed sender key on transaction {transaction} of block {block}: {source}")]
    MalformedSender {
        block: usize,
        transaction: usize,
        #[source]
        source: TransactionError,
    },

    #[error("Invalid reward address: {0}")]
    InvalidRewardAddress(String),
}

impl From<CryptoError> for LedgerError {
    fn from(err: CryptoError) -> Self {
        LedgerError::TransactionError(TransactionError::CryptoError(err))
    }
}

/// A currency on top of a proof-of-work blockchain
///
/// Owns the chain and the pool of transactions waiting for the next block. It
/// has no interior locking: callers sharing one instance between threads must
/// serialise access themselves.
#[derive(Debug, Clone)]
pub struct Cryptocurrency {
    /// The chain of committed blocks
    blockchain: Blockchain<BlockData>,

    /// Transactions to be included in the next block
    pending_transactions: Vec<Transaction>,

    config: LedgerConfig,
}

impl Cryptocurrency {
    /// Creates a ledger whose genesis block holds no transactions
    #[cfg(test)]
    pub fn new() -> Result<Self, LedgerError> {
        Self::with_config(LedgerConfig::default())
    }

    /// Creates a ledger with the given difficulty and mining reward
    ///
    /// A difficulty no hash can meet is rejected before the genesis block is mined.
    pub fn with_config(config: LedgerConfig) -> Result<Self, LedgerError> {
        let blockchain = Blockchain::with_difficulty(BlockData::default(), config.difficulty)?;

        Ok(Cryptocurrency {
            blockchain,
            pending_transactions: Vec::new(),
            config,
        })
    }

    /// Signs a transfer from `wallet` and queues it for the next block
    ///
    /// The sender's balance is not checked: overspending is accepted and shows up
    /// as a negative balance on replay.
    pub fn submit_transaction(
        &mut self,
        wallet: &Wallet,
        to: Address,
        amount: f64,
    ) -> Result<&Transaction, LedgerError> {
        let transaction = Transaction::new_signed(wallet, to, amount)?;

        debug!(
            "Queued transaction of {} from {} to {}",
            transaction.amount, transaction.from, transaction.to
        );

        self.pending_transactions.push(transaction);
        Ok(&self.pending_transactions[self.pending_transactions.len() - 1])
    }

    /// Same as [`Cryptocurrency::submit_transaction`], signing with a base58 private key
    ///
    /// Nothing is queued when the key does not decode.
    pub fn submit_signed_transaction(
        &mut self,
        private_key: &str,
        to: Address,
        amount: f64,
    ) -> Result<&Transaction, LedgerError> {
        let wallet = Wallet::from_private_key(private_key)?;
        self.submit_transaction(&wallet, to, amount)
    }

    /// Mines the pending transactions into a new block
    ///
    /// # Arguments
    ///
    /// * `reward_address` - Receiver of the coinbase transaction
    ///
    /// # Returns
    ///
    /// The newly mined block
    pub fn mint_block(&mut self, reward_address: Address) -> Result<&Block<BlockData>, LedgerError> {
        if reward_address.is_network() || reward_address.as_str().is_empty() {
            return Err(LedgerError::InvalidRewardAddress(reward_address.0));
        }
        let reward = validate_amount(self.config.mining_reward)?;

        let mut transactions = self.pending_transactions.clone();
        transactions.push(Transaction::new_coinbase(reward_address, reward));

        let count = transactions.len();
        let block = self.blockchain.append(BlockData { transactions })?;
        self.pending_transactions.clear();

        info!("Committed {} transactions in block {}", count, block.index);

        Ok(block)
    }

    /// Checks hashes, links, proof of work and transaction signatures from `start_index` on
    ///
    /// Coinbase transactions are not signature-checked.
    pub fn verify(&self, start_index: usize) -> Result<(), LedgerError> {
        self.blockchain.verify(start_index)?;

        for (index, block) in self.blockchain.blocks().iter().enumerate().skip(start_index) {
            for (position, transaction) in block.data.transactions.iter().enumerate() {
                if transaction.is_coinbase() {
                    continue;
                }

                match transaction.verify_signature() {
                    Ok(true) => {}
                    Ok(false) => {
                        return Err(LedgerError::InvalidSignature {
                            block: index,
                            transaction: position,
                        })
                    }
                    Err(source) => {
                        return Err(LedgerError::MalformedSender {
                            block: index,
                            transaction: position,
                            source,
                        })
                    }
                }
            }
        }

        Ok(())
    }

    /// Validates the ledger
    ///
    /// # Returns
    ///
    /// true if the chain and every signature from `start_index` on are valid
    pub fn validate(&self, start_index: usize) -> bool {
        match self.verify(start_index) {
            Ok(()) => true,
            Err(err) => {
                warn!("Ledger validation failed: {}", err);
                false
            }
        }
    }

    /// Replays every committed transaction to compute the balance of `address`
    pub fn balance(&self, address: &Address) -> f64 {
        self.committed_transactions().fold(0.0, |mut balance, transaction| {
            if &transaction.from == address {
                balance -= transaction.amount;
            }
            if &transaction.to == address {
                balance += transaction.amount;
            }
            balance
        })
    }

    /// Replays the chain once and returns the balance of every address seen
    ///
    /// `network` is included; its balance is the negated total of issued rewards.
    pub fn balances(&self) -> BTreeMap<Address, f64> {
        let mut balances = BTreeMap::new();
        for transaction in self.committed_transactions() {
            *balances.entry(transaction.from.clone()).or_insert(0.0) -= transaction.amount;
            *balances.entry(transaction.to.clone()).or_insert(0.0) += transaction.amount;
        }
        balances
    }

    fn committed_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.blockchain
            .blocks()
            .iter()
            .flat_map(|block| block.data.transactions.iter())
    }

    /// Gets the entire blockchain
    pub fn blocks(&self) -> &[Block<BlockData>] {
        self.blockchain.blocks()
    }

    /// Gets the underlying proof-of-work chain
    pub fn blockchain(&self) -> &Blockchain<BlockData> {
        &self.blockchain
    }

    /// Gets all pending transactions
    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    /// Gets the difficulty and reward this ledger was created with
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    #[cfg(test)]
    fn blocks_mut(&mut self) -> &mut Vec<Block<BlockData>> {
        self.blockchain.blocks_mut()
    }
}
