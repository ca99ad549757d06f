use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use log::{info, warn};
use tokio::sync::RwLock;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api;
mod blockchain;
mod config;

use blockchain::{Cryptocurrency, LedgerError, Wallet};
use config::{LedgerConfig, ServerConfig};

// Mint the first block to a fresh wallet so the node starts with spendable coins
fn bootstrap_ledger(ledger: &mut Cryptocurrency) -> Result<Wallet, LedgerError> {
    let wallet = Wallet::new();
    info!("Created bootstrap wallet with address: {}", wallet.address());
    info!("Bootstrap wallet private key: {}", wallet.export_private_key());

    let block = ledger.mint_block(wallet.address().clone())?;
    info!("Minted block {} to bootstrap wallet", block.index);
    info!(
        "Bootstrap wallet balance: {}",
        ledger.balance(wallet.address())
    );

    if !ledger.validate(1) {
        warn!("Blockchain failed validation right after bootstrap");
    }

    Ok(wallet)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::get_chain,
        api::handlers::get_pending_transactions,
        api::handlers::new_transaction,
        api::handlers::mine_block,
        api::handlers::validate_chain,
        api::handlers::create_wallet,
        api::handlers::get_wallet_balance,
        api::handlers::get_all_accounts
    ),
    components(
        schemas(
            blockchain::Transaction,
            blockchain::crypto::Address,
            blockchain::crypto::DigitalSignature,
            api::handlers::BlockView,
            api::handlers::ChainResponse,
            api::handlers::TransactionRequest,
            api::handlers::TransactionResponse,
            api::handlers::MineRequest,
            api::handlers::MineResponse,
            api::handlers::ValidationResponse,
            api::handlers::WalletResponse,
            api::handlers::AccountResponse
        )
    ),
    tags(
        (name = "ledger", description = "Proof-of-work ledger API endpoints")
    ),
    info(
        title = "Ledger API",
        version = "0.1.0",
        description = "A minimal single-node proof-of-work ledger",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
struct ApiDoc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let ledger_config = LedgerConfig::from_env().context("Invalid ledger configuration")?;
    let server_config = ServerConfig::from_env().context("Invalid server configuration")?;
    let mut ledger = Cryptocurrency::with_config(ledger_config)?;
    info!(
        "Ledger difficulty {} with mining reward {}",
        ledger.config().difficulty,
        ledger.config().mining_reward
    );
    bootstrap_ledger(&mut ledger)?;

    let ledger = web::Data::new(RwLock::new(ledger));

    info!(
        "Starting HTTP server at http://{}:{}",
        server_config.host, server_config.port
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let openapi = ApiDoc::openapi();

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(ledger.clone())
            .configure(api::configure_routes)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi),
            )
    })
    .bind((server_config.host.as_str(), server_config.port))?
    .run()
    .await?;

    Ok(())
}
