use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::block::{Block, GENESIS_PREVIOUS_HASH};
use super::codec::{self, CodecError};
use super::pow::{search_nonce, LeadingZeros, ProofOfWork, MAX_DIFFICULTY};

/// Errors that can occur during blockchain operations
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Block {index} does not link to the hash of its predecessor")]
    BrokenLink { index: usize },

    #[error("Block at position {index} claims index {found}")]
    IndexMismatch { index: usize, found: u64 },

    #[error("Block {index} hash {hash} does not meet the proof-of-work target")]
    InsufficientWork { index: usize, hash: String },

    #[error("Difficulty {0} is unreachable: a SHA-256 hex digest has only 64 digits")]
    DifficultyOutOfRange(usize),

    #[error("Encoding error: {0}")]
    EncodingError(#[from] CodecError),
}

/// Append-only, hash-linked sequence of blocks sealed by proof of work
#[derive(Debug, Clone)]
pub struct Blockchain<P> {
    /// The chain of blocks
    blocks: Vec<Block<P>>,

    /// Mining difficulty (number of leading zero hex digits required in hash)
    difficulty: LeadingZeros,
}

impl<P: Serialize> Blockchain<P> {
    /// Creates a new blockchain holding a mined genesis block
    #[cfg(test)]
    pub fn new(genesis_data: P) -> Result<Self, ChainError> {
        Self::with_difficulty(genesis_data, LeadingZeros::default().0)
    }

    /// Creates a new blockchain whose blocks need `difficulty` leading zero hex digits
    ///
    /// Fails without mining anything when `difficulty` exceeds [`MAX_DIFFICULTY`].
    pub fn with_difficulty(genesis_data: P, difficulty: usize) -> Result<Self, ChainError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(ChainError::DifficultyOutOfRange(difficulty));
        }

        let mut blockchain = Blockchain {
            blocks: Vec::new(),
            difficulty: LeadingZeros(difficulty),
        };

        blockchain.append(genesis_data)?;

        Ok(blockchain)
    }

    /// Hash of a block's canonical encoding
    pub fn hash_block(block: &Block<P>) -> Result<String, ChainError> {
        Ok(block.calculate_hash()?)
    }

    /// Mines `data` into a new block and appends it
    ///
    /// # Returns
    ///
    /// The appended block, whose hash meets the proof-of-work target
    pub fn append(&mut self, data: P) -> Result<&Block<P>, ChainError> {
        let previous_hash = match self.blocks.last() {
            Some(last) => Self::hash_block(last)?,
            None => GENESIS_PREVIOUS_HASH.to_string(),
        };

        let mut block = Block::new(self.blocks.len() as u64, data, previous_hash);
        let (nonce, hash) = self.proof_of_work(&block)?;
        block.nonce = nonce;

        info!("Mined block {} with nonce {} and hash {}", block.index, nonce, hash);

        self.blocks.push(block);
        Ok(&self.blocks[self.blocks.len() - 1])
    }

    /// Searches the nonce for `block`
    ///
    /// The block is converted to its canonical tree once; each attempt only swaps
    /// the nonce in that tree, which encodes to the same bytes as the full block.
    fn proof_of_work(&self, block: &Block<P>) -> Result<(u64, String), ChainError> {
        let mut candidate = codec::to_canonical_value(block)?;

        let found = search_nonce(&self.difficulty, |nonce| {
            if let Value::Object(fields) = &mut candidate {
                fields.insert("nonce".to_string(), Value::from(nonce));
            }
            codec::encode_value(&candidate).map(|bytes| codec::sha256_hex(&bytes))
        })?;

        Ok(found)
    }

    /// Checks the chain from `start_index` to the tip
    ///
    /// Every checked block must sit at the position its index claims, link to the
    /// hash of its predecessor, and meet the proof-of-work target. Starting at 0
    /// additionally checks the genesis block's proof of work.
    pub fn verify(&self, start_index: usize) -> Result<(), ChainError> {
        for index in start_index..self.blocks.len() {
            let block = &self.blocks[index];

            if block.index != index as u64 {
                return Err(ChainError::IndexMismatch {
                    index,
                    found: block.index,
                });
            }

            if index > 0 && block.previous_hash != Self::hash_block(&self.blocks[index - 1])? {
                return Err(ChainError::BrokenLink { index });
            }

            let hash = Self::hash_block(block)?;
            if !self.difficulty.is_satisfied_by(&hash) {
                return Err(ChainError::InsufficientWork { index, hash });
            }
        }

        Ok(())
    }

    /// Validates the blockchain
    ///
    /// # Returns
    ///
    /// true if every block from `start_index` on checks out, false otherwise
    pub fn validate(&self, start_index: usize) -> bool {
        match self.verify(start_index) {
            Ok(()) => true,
            Err(err) => {
                warn!("Blockchain validation failed: {}", err);
                false
            }
        }
    }
}

impl<P> Blockchain<P> {
    /// Gets the entire blockchain
    pub fn blocks(&self) -> &[Block<P>] {
        &self.blocks
    }

    /// Gets the last block in the chain
    pub fn last_block(&self) -> &Block<P> {
        // Constructors always mine a genesis block
        &self.blocks[self.blocks.len() - 1]
    }

    /// Number of blocks, genesis included, so never zero
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Leading zero hex digits required of every block hash
    pub fn difficulty(&self) -> usize {
        self.difficulty.0
    }

    #[cfg(test)]
    pub(crate) fn blocks_mut(&mut self) -> &mut Vec<Block<P>> {
        &mut self.blocks
    }
}
