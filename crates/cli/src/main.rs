//! Fakestore CLI - browse the catalog and manage the local cart.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! fakestore products --category electronics --limit 5
//! fakestore categories
//! fakestore product 3
//! fakestore search jacket
//!
//! # Manage the cart
//! fakestore cart add 3
//! fakestore cart update 3 2
//! fakestore cart remove 3
//! fakestore cart show
//! fakestore cart checkout --payment card
//! fakestore cart clear
//! ```
//!
//! The cart is saved under `CART_STORAGE_DIR` after every change, so it
//! survives between invocations.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fakestore_core::ProductId;
use fakestore_storefront::cart::CartStore;
use fakestore_storefront::catalog::CatalogClient;
use fakestore_storefront::config::StorefrontConfig;
use fakestore_storefront::error::AppError;
use fakestore_storefront::storage::FileStorage;

mod commands;

use commands::cart::PaymentMethod;

#[derive(Parser)]
#[command(name = "fakestore")]
#[command(author, version, about = "Fakestore catalog and cart")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only list products in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Show at most this many products
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// List product categories
    Categories,
    /// Show a single product
    Product {
        /// Product id
        id: ProductId,
    },
    /// Search product titles
    Search {
        /// Text to look for in titles (case-insensitive)
        query: String,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and totals
    Show,
    /// Add one unit of a product
    Add {
        /// Product id
        id: ProductId,
    },
    /// Remove a product line
    Remove {
        /// Product id
        id: ProductId,
    },
    /// Set the quantity of a product line (0 or less removes it)
    Update {
        /// Product id
        id: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Place the order and empty the cart
    Checkout {
        /// Payment method
        #[arg(short, long, value_enum, default_value_t = PaymentMethod::Cod)]
        payment: PaymentMethod,
    },
    /// Remove every line
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration is needed before tracing so Sentry can be wired in
    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "fakestore=info,fakestore_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(err) => Err(AppError::from(err)),
    };

    if let Err(e) = result {
        e.report();
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), AppError> {
    let currency = config.currency;

    match cli.command {
        Commands::Products { category, limit } => {
            let client = CatalogClient::new(&config.catalog)?;
            commands::catalog::products(&client, currency, category.as_deref(), limit).await?;
        }
        Commands::Categories => {
            let client = CatalogClient::new(&config.catalog)?;
            commands::catalog::categories(&client).await?;
        }
        Commands::Product { id } => {
            let client = CatalogClient::new(&config.catalog)?;
            commands::catalog::product(&client, currency, &id).await?;
        }
        Commands::Search { query } => {
            let client = CatalogClient::new(&config.catalog)?;
            commands::catalog::search(&client, currency, &query).await?;
        }
        Commands::Cart { action } => {
            let mut store = CartStore::load(FileStorage::new(&config.storage_dir));
            match action {
                CartAction::Show => commands::cart::show(&store, currency),
                CartAction::Add { id } => {
                    let client = CatalogClient::new(&config.catalog)?;
                    commands::cart::add(&mut store, &client, &id).await?;
                }
                CartAction::Remove { id } => commands::cart::remove(&mut store, &id)?,
                CartAction::Update { id, quantity } => {
                    commands::cart::update(&mut store, &id, quantity)?;
                }
                CartAction::Checkout { payment } => {
                    commands::cart::checkout(&mut store, currency, payment)?;
                }
                CartAction::Clear => commands::cart::clear(&mut store)?,
            }
        }
    }
    Ok(())
}
