use std::str::FromStr;

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::blockchain::{
    Address, Block, BlockData, Blockchain, ChainError, Cryptocurrency, LedgerError, Transaction,
    Wallet,
};

/// Shared ledger state
///
/// Handlers wait for the lock asynchronously, so a request parked behind a mining
/// run never holds up its worker thread.
pub type LedgerData = web::Data<RwLock<Cryptocurrency>>;

fn error_response(status: StatusCode, message: String) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "error": message }))
}

/// A block as exposed over the API, with its derived hash
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BlockView {
    /// Index of the block in the chain
    pub index: u64,

    /// Timestamp when the block was sealed
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    pub timestamp: DateTime<Utc>,

    /// Transactions committed by the block
    pub transactions: Vec<Transaction>,

    /// Hash of the previous block
    pub previous_hash: String,

    /// Proof of work (nonce)
    pub nonce: u64,

    /// Hash of this block
    pub hash: String,
}

impl BlockView {
    fn from_block(block: &Block<BlockData>) -> Result<Self, ChainError> {
        Ok(BlockView {
            index: block.index,
            timestamp: block.timestamp,
            transactions: block.data.transactions.clone(),
            previous_hash: block.previous_hash.clone(),
            nonce: block.nonce,
            hash: Blockchain::hash_block(block)?,
        })
    }
}

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// Leading zero hex digits required of every block hash
    pub difficulty: usize,

    /// The blocks in the chain
    pub chain: Vec<BlockView>,

    /// Whether the chain is valid
    pub is_valid: bool,
}

/// Request for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionRequest {
    /// The recipient's address
    pub recipient: String,

    /// The amount to transfer
    pub amount: f64,

    /// The sender's private key in base58; the sender address is derived from it
    pub private_key: String,
}

/// Response for the transaction endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// The message
    pub message: String,

    /// The index of the block that will include this transaction
    pub block_index: u64,

    /// The signed transaction
    pub transaction: Transaction,
}

/// Request for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineRequest {
    /// The miner's address
    pub miner_address: String,
}

/// Response for the mine endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct MineResponse {
    /// The message
    pub message: String,

    /// The newly mined block
    pub block: BlockView,
}

/// Response for the validate endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    /// Whether the chain and all signatures are valid
    pub valid: bool,

    /// Whether hash links and proof of work hold from the genesis block on
    pub chain_valid: bool,

    /// The first problem found, if any
    pub error: Option<String>,
}

/// Get the full blockchain
///
/// Returns the entire blockchain and its validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Blockchain retrieved successfully", body = ChainResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_chain(ledger: LedgerData) -> impl Responder {
    let ledger = ledger.read().await;
    let blockchain = ledger.blockchain();

    let chain: Result<Vec<BlockView>, ChainError> =
        ledger.blocks().iter().map(BlockView::from_block).collect();

    match chain {
        Ok(chain) => HttpResponse::Ok().json(ChainResponse {
            length: blockchain.len(),
            difficulty: blockchain.difficulty(),
            chain,
            is_valid: ledger.validate(1),
        }),
        Err(err) => {
            error!("Failed to hash chain: {}", err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to hash chain: {}", err),
            )
        }
    }
}

/// Get all pending transactions
///
/// Returns all transactions waiting to be included in a block
#[utoipa::path(
    get,
    path = "/api/v1/transactions/pending",
    responses(
        (status = 200, description = "Pending transactions retrieved successfully", body = Vec<Transaction>)
    )
)]
pub async fn get_pending_transactions(ledger: LedgerData) -> impl Responder {
    let transactions = ledger.read().await.pending_transactions().to_vec();
    HttpResponse::Ok().json(transactions)
}

/// Create a new transaction
///
/// Signs a transfer with the given private key and adds it to the pending transactions.
/// The sender's balance is not checked.
#[utoipa::path(
    post,
    path = "/api/v1/transactions/new",
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction created successfully", body = TransactionResponse),
        (status = 400, description = "Invalid transaction data")
    )
)]
pub async fn new_transaction(
    ledger: LedgerData,
    transaction_req: web::Json<TransactionRequest>,
) -> impl Responder {
    let recipient = match Address::from_str(&transaction_req.recipient) {
        Ok(address) => address,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid recipient: {}", err),
            );
        }
    };

    let mut ledger = ledger.write().await;
    let block_index = ledger.blockchain().last_block().index + 1;

    match ledger.submit_signed_transaction(
        &transaction_req.private_key,
        recipient,
        transaction_req.amount,
    ) {
        Ok(transaction) => HttpResponse::Created().json(TransactionResponse {
            message: "Transaction will be added to Block".to_string(),
            block_index,
            transaction: transaction.clone(),
        }),
        Err(err) => error_response(
            StatusCode::BAD_REQUEST,
            format!("Failed to add transaction: {}", err),
        ),
    }
}

/// Mine a new block
///
/// Creates a new block with all pending transactions plus the mining reward
#[utoipa::path(
    post,
    path = "/api/v1/mine",
    request_body = MineRequest,
    responses(
        (status = 200, description = "Block mined successfully", body = MineResponse),
        (status = 400, description = "Invalid mining request"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mine_block(ledger: LedgerData, mine_req: web::Json<MineRequest>) -> impl Responder {
    let miner_address = match Address::from_str(&mine_req.miner_address) {
        Ok(address) => address,
        Err(err) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid miner address: {}", err),
            );
        }
    };

    // The nonce search is CPU-bound; run it on the blocking pool holding the write lock
    let mut ledger = ledger.into_inner().write_owned().await;
    let mined = web::block(move || {
        let block = ledger.mint_block(miner_address)?;
        Ok::<_, LedgerError>(BlockView::from_block(block)?)
    })
    .await;

    match mined {
        Ok(Ok(block)) => {
            info!("Mined block {} via API", block.index);
            HttpResponse::Ok().json(MineResponse {
                message: "New Block Mined".to_string(),
                block,
            })
        }
        Ok(Err(err)) => error_response(
            StatusCode::BAD_REQUEST,
            format!("Failed to mine block: {}", err),
        ),
        Err(err) => {
            error!("Mining task failed: {}", err);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Mining task failed: {}", err),
            )
        }
    }
}

/// Check if the blockchain is valid
///
/// Validates hash links, proof of work and transaction signatures
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Blockchain validation status", body = ValidationResponse)
    )
)]
pub async fn validate_chain(ledger: LedgerData) -> impl Responder {
    let ledger = ledger.read().await;
    let chain_valid = ledger.blockchain().validate(0);

    let response = match ledger.verify(1) {
        Ok(()) => ValidationResponse {
            valid: true,
            chain_valid,
            error: None,
        },
        Err(err) => ValidationResponse {
            valid: false,
            chain_valid,
            error: Some(err.to_string()),
        },
    };

    HttpResponse::Ok().json(response)
}

/// Response for the create wallet endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    /// The wallet's address
    pub address: String,

    /// The wallet's private key (base58 encoded)
    pub private_key: String,
}

/// Create a new wallet
///
/// Creates a new wallet with a random keypair
///
/// The private key is not kept by the node and must be stored by the caller
#[utoipa::path(
    post,
    path = "/api/v1/wallet/new",
    responses(
        (status = 201, description = "Wallet created successfully", body = WalletResponse)
    )
)]
pub async fn create_wallet() -> impl Responder {
    let wallet = Wallet::new();

    HttpResponse::Created().json(WalletResponse {
        address: wallet.address().0.clone(),
        private_key: wallet.export_private_key(),
    })
}

/// Response for the balance and accounts endpoints
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    /// The address of the account
    pub address: String,

    /// The balance replayed from the chain
    pub balance: f64,
}

/// Get wallet balance
///
/// Replays the chain to compute the balance of an address
#[utoipa::path(
    get,
    path = "/api/v1/wallet/balance/{address}",
    responses(
        (status = 200, description = "Wallet balance retrieved successfully", body = AccountResponse)
    )
)]
pub async fn get_wallet_balance(ledger: LedgerData, address: web::Path<String>) -> impl Responder {
    let address = Address(address.into_inner());
    let balance = ledger.read().await.balance(&address);

    HttpResponse::Ok().json(AccountResponse {
        address: address.0,
        balance,
    })
}

/// Get all accounts
///
/// Returns the replayed balance of every address that appears on the chain
#[utoipa::path(
    get,
    path = "/api/v1/accounts",
    responses(
        (status = 200, description = "Accounts retrieved successfully", body = Vec<AccountResponse>)
    )
)]
pub async fn get_all_accounts(ledger: LedgerData) -> impl Responder {
    let accounts: Vec<AccountResponse> = ledger
        .read()
        .await
        .balances()
        .into_iter()
        .map(|(address, balance)| AccountResponse {
            address: address.0,
            balance,
        })
        .collect();

    HttpResponse::Ok().json(accounts)
}
