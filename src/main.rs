//! Polymarket Trading Bot CLI
//!
//! Market discovery, limit orders, positions and wallet setup for Polymarket.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use polybot::format;
use polybot::strategies::{NoBiasConfig, NoBiasStrategy, Strategy};
use polybot::trading::DEFAULT_TICK_SIZE;
use polybot::{
    generate_wallet, ClobClient, Config, DataClient, GammaClient, HttpRpc, OrderApi,
    OrderManager, Side, TokioSleeper, TradeLedger, WalletManager,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polybot")]
#[command(about = "Polymarket programmatic trading bot")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Market discovery and info
    #[command(subcommand)]
    Markets(MarketsCommand),

    /// Order management
    #[command(subcommand)]
    Trade(TradeCommand),

    /// Wallet status, balances and approvals
    #[command(subcommand)]
    Wallet(WalletCommand),

    /// Position tracking
    #[command(subcommand)]
    Positions(PositionsCommand),

    /// Local trade ledger
    #[command(subcommand)]
    Ledger(LedgerCommand),

    /// Run a strategy over active markets
    #[command(subcommand)]
    Strategy(StrategyCommand),

    /// Verify configuration, API connectivity and credentials
    Check,
}

#[derive(Subcommand)]
enum MarketsCommand {
    /// List active markets
    List {
        #[arg(short, long, default_value = "10")]
        limit: u32,

        #[arg(short, long, default_value = "0")]
        offset: u32,
    },

    /// Search markets by text
    Search {
        query: String,

        #[arg(short, long, default_value = "10")]
        limit: u32,
    },

    /// Show detailed info for a market
    Detail { condition_id: String },

    /// Show the order book for a token
    Orderbook { token_id: String },

    /// Show buy/sell prices and midpoint for a token
    Price { token_id: String },

    /// List events
    Events {
        #[arg(short, long, default_value = "10")]
        limit: u32,

        #[arg(short, long, default_value = "0")]
        offset: u32,
    },

    /// Show one event and its markets
    Event { event_id: String },
}

#[derive(Args)]
struct OrderArgs {
    /// Token ID
    token_id: String,

    /// Number of shares
    size: Decimal,

    /// Limit price (0.01-0.99)
    #[arg(short, long)]
    price: Decimal,

    /// Market tick size
    #[arg(long, default_value = DEFAULT_TICK_SIZE)]
    tick_size: String,

    /// Market is a neg-risk market
    #[arg(long)]
    neg_risk: bool,
}

#[derive(Subcommand)]
enum TradeCommand {
    /// Place a buy limit order
    Buy(OrderArgs),

    /// Place a sell limit order
    Sell(OrderArgs),

    /// List open orders
    Orders {
        /// Filter by market (condition ID)
        #[arg(long)]
        market: Option<String>,

        /// Filter by token ID
        #[arg(long)]
        asset: Option<String>,
    },

    /// Cancel an open order
    Cancel { order_id: String },

    /// Cancel every open order
    CancelAll,
}

#[derive(Subcommand)]
enum WalletCommand {
    /// Show wallet status and balances
    Status,

    /// Show wallet balances
    Balance,

    /// Set up USDC and conditional token approvals for the exchanges
    Approve {
        /// Only show which approvals are in place
        #[arg(long)]
        check: bool,
    },

    /// Generate a fresh wallet
    Generate,
}

#[derive(Subcommand)]
enum PositionsCommand {
    /// List current positions
    List,

    /// Show trade history
    History {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum LedgerCommand {
    /// Show orders recorded by this bot
    Show {
        /// Only the most recent N rows
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum StrategyCommand {
    /// Buy NO where it trades below the historical NO resolution rate
    NoBias {
        /// Markets to scan
        #[arg(long, default_value = "100")]
        markets: u32,

        /// Minimum edge percentage
        #[arg(short, long, default_value = "10")]
        min_edge: Decimal,

        /// Shares per order
        #[arg(short, long, default_value = "10")]
        size: Decimal,

        /// Maximum number of signals to show or trade
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Place orders for the signals shown
        #[arg(long)]
        execute: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "polybot=debug" } else { "polybot=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match cli.command {
        Commands::Markets(cmd) => markets(&Config::from_env()?, cmd).await?,
        Commands::Trade(cmd) => trade(&Config::from_env()?, cmd).await?,
        Commands::Wallet(WalletCommand::Generate) => wallet_generate(),
        Commands::Wallet(cmd) => wallet(&Config::from_env()?, cmd).await?,
        Commands::Positions(cmd) => positions(&Config::from_env()?, cmd).await?,
        Commands::Ledger(cmd) => ledger(&Config::from_env()?, cmd)?,
        Commands::Strategy(cmd) => strategy(&Config::from_env()?, cmd).await?,
        Commands::Check => check().await?,
    }

    Ok(())
}

fn order_manager(config: &Config) -> Result<OrderManager<ClobClient>> {
    Ok(OrderManager::new(
        ClobClient::new(config)?,
        TradeLedger::new(&config.trade_log_path),
        config.max_order_size_usdc,
    ))
}

fn wallet_manager(config: &Config) -> Result<WalletManager<HttpRpc>> {
    let rpc = Arc::new(HttpRpc::new(&config.rpc_url)?);
    Ok(WalletManager::new(config, rpc, Arc::new(TokioSleeper))?)
}

async fn markets(config: &Config, cmd: MarketsCommand) -> Result<()> {
    let gamma = GammaClient::new(config)?;

    match cmd {
        MarketsCommand::List { limit, offset } => {
            let markets = gamma.markets(limit, offset, true, false).await?;
            if markets.is_empty() {
                println!("No markets found.");
            } else {
                print!("{}", format::markets_table(&markets));
            }
        }
        MarketsCommand::Search { query, limit } => {
            let markets = gamma.search(&query, limit).await?;
            if markets.is_empty() {
                println!("No markets found.");
            } else {
                print!("{}", format::markets_table(&markets));
            }
        }
        MarketsCommand::Detail { condition_id } => {
            let market = gamma.market(&condition_id).await?;
            print!("{}", format::market_detail(&market));
        }
        MarketsCommand::Orderbook { token_id } => {
            let clob = ClobClient::new(config)?;
            let book = clob.order_book(&token_id).await?;
            print!("{}", format::orderbook_table(&book));
        }
        MarketsCommand::Price { token_id } => {
            let clob = ClobClient::new(config)?;
            let buy = clob.price(&token_id, Side::Buy).await?;
            let sell = clob.price(&token_id, Side::Sell).await?;
            let mid = clob.midpoint(&token_id).await?;
            println!("Token {}", format::truncate(&token_id, 16));
            println!("  Buy:      {:.4}", buy);
            println!("  Sell:     {:.4}", sell);
            println!("  Midpoint: {:.4}", mid);
        }
        MarketsCommand::Events { limit, offset } => {
            let events = gamma.events(limit, offset).await?;
            if events.is_empty() {
                println!("No events found.");
            }
            for event in events {
                println!("{} [{}] {} market(s)", event.title, event.id, event.markets.len());
                if !event.slug.is_empty() {
                    println!("  https://polymarket.com/event/{}", event.slug);
                }
            }
        }
        MarketsCommand::Event { event_id } => {
            let event = gamma.event(&event_id).await?;
            println!("{} [{}]", event.title, event.id);
            if event.markets.is_empty() {
                println!("No markets in this event.");
            } else {
                print!("{}", format::markets_table(&event.markets));
            }
        }
    }
    Ok(())
}

async fn trade(config: &Config, cmd: TradeCommand) -> Result<()> {
    let orders = order_manager(config)?;

    match cmd {
        TradeCommand::Buy(args) => {
            let resp = orders
                .buy(&args.token_id, args.price, args.size, &args.tick_size, args.neg_risk.then_some(true))
                .await?;
            println!("Order placed! ID: {}", resp.display_id());
            println!("  Status: {}", resp.status);
        }
        TradeCommand::Sell(args) => {
            let resp = orders
                .sell(&args.token_id, args.price, args.size, &args.tick_size, args.neg_risk.then_some(true))
                .await?;
            println!("Sell order placed! ID: {}", resp.display_id());
            println!("  Status: {}", resp.status);
        }
        TradeCommand::Orders { market, asset } => {
            let open = orders.open_orders(market.as_deref(), asset.as_deref()).await?;
            if open.is_empty() {
                println!("No open orders.");
            } else {
                print!("{}", format::open_orders_table(&open));
            }
        }
        TradeCommand::Cancel { order_id } => {
            if orders.cancel(&order_id).await? {
                println!("Order {} cancelled.", order_id);
            } else {
                println!("Order {} was not cancelled.", order_id);
            }
        }
        TradeCommand::CancelAll => {
            orders.cancel_all().await?;
            println!("All open orders cancelled.");
        }
    }
    Ok(())
}

fn wallet_generate() {
    let wallet = generate_wallet();
    println!("New wallet generated. Store the private key somewhere safe; it is shown once.\n");
    println!("  Address:     {}", wallet.address);
    println!("  Private key: {}\n", wallet.private_key);
    println!("Add to .env:\n{}", wallet.env_lines());
}

async fn wallet(config: &Config, cmd: WalletCommand) -> Result<()> {
    let manager = wallet_manager(config)?;

    match cmd {
        WalletCommand::Status => {
            let status = manager.status().await?;
            print!("{}", format::wallet_status(&status));
        }
        WalletCommand::Balance => {
            println!("  POL:  {:.6}", manager.pol_balance().await?);
            println!("  USDC: {:.6}", manager.usdc_balance().await?);
        }
        WalletCommand::Approve { check: true } => {
            let state = manager.approval_state().await?;
            print!("{}", format::approval_state_table(&state));
        }
        WalletCommand::Approve { check: false } => {
            let sent = manager.ensure_approvals().await?;
            if sent.is_empty() {
                println!("All approvals already in place.");
            }
            for approval in &sent {
                println!("  {} {} approved: {}", approval.spender, approval.asset, approval.tx_hash);
            }

            // The CLOB caches allowances; make it re-read them
            match ClobClient::new(config)?.update_balance_allowance().await {
                Ok(()) => info!("CLOB allowance cache refreshed"),
                Err(e) => warn!("Failed to refresh CLOB allowance cache: {}", e),
            }
        }
        WalletCommand::Generate => wallet_generate(),
    }
    Ok(())
}

async fn positions(config: &Config, cmd: PositionsCommand) -> Result<()> {
    let data = DataClient::new(config)?;

    match cmd {
        PositionsCommand::List => {
            let positions = data.positions(&config.wallet_address).await?;
            if positions.is_empty() {
                println!("No open positions.");
            } else {
                print!("{}", format::positions_table(&positions));
            }
        }
        PositionsCommand::History { limit } => {
            let trades = data.trades(&config.wallet_address, limit).await?;
            if trades.is_empty() {
                println!("No trade history.");
            } else {
                print!("{}", format::trades_table(&trades));
            }
        }
    }
    Ok(())
}

fn ledger(config: &Config, cmd: LedgerCommand) -> Result<()> {
    let LedgerCommand::Show { limit } = cmd;
    let ledger = TradeLedger::new(&config.trade_log_path);
    let records = ledger.read_all()?;

    if records.is_empty() {
        println!("No trades recorded in {}.", ledger.path().display());
        return Ok(());
    }

    let skip = limit.map(|n| records.len().saturating_sub(n)).unwrap_or(0);
    print!("{}", format::ledger_table(&records[skip..]));
    Ok(())
}

async fn strategy(config: &Config, cmd: StrategyCommand) -> Result<()> {
    let StrategyCommand::NoBias {
        markets,
        min_edge,
        size,
        limit,
        execute,
    } = cmd;

    let strategy = NoBiasStrategy::new(NoBiasConfig {
        min_edge: min_edge / dec!(100),
        order_size: size,
        ..Default::default()
    });

    println!("\n{}", "=".repeat(70));
    println!("  NO BIAS - Minimum edge: {:.1}% | {}", min_edge,
        if execute { "LIVE ORDERS" } else { "scan only" });
    println!("{}\n", "=".repeat(70));

    let gamma = GammaClient::new(config)?;
    let active = gamma.markets(markets, 0, true, false).await?;
    let mut signals = strategy.scan(&active);
    signals.truncate(limit);

    if signals.is_empty() {
        println!("No NO bias opportunities found.");
        return Ok(());
    }
    print!("{}", format::signals_table(&signals));

    if !execute {
        return Ok(());
    }

    let orders = order_manager(config)?;
    for (market, signal) in &signals {
        println!("{}", signal.recommendation);
        match strategy.execute(&orders, market, signal).await {
            Ok(resp) => println!("  Order placed! ID: {} ({})", resp.display_id(), resp.status),
            Err(e) => println!("  Skipped: {}", e),
        }
    }
    Ok(())
}

async fn check() -> Result<()> {
    println!("Checking connectivity...\n");

    let config = match Config::from_env() {
        Ok(config) => {
            println!(
                "{}",
                format::check_line("Config loaded", &Ok(format!("wallet {}", config.wallet_address)))
            );
            config
        }
        Err(e) => {
            println!("{}", format::check_line("Config", &Err(e.to_string())));
            return Err(e.into());
        }
    };

    let gamma = async {
        let markets = GammaClient::new(&config)?.markets(1, 0, true, false).await?;
        Ok::<_, polybot::Error>(format!("fetched {} market(s)", markets.len()))
    }
    .await;
    println!("{}", format::check_line("Gamma API", &gamma.map_err(|e| e.to_string())));

    let rpc = async {
        let status = wallet_manager(&config)?.status().await?;
        Ok::<_, anyhow::Error>(format!(
            "POL: {:.6}, USDC: {:.6}",
            status.pol_balance, status.usdc_balance
        ))
    }
    .await;
    println!("{}", format::check_line("RPC/Wallet", &rpc.map_err(|e| e.to_string())));

    let clob = async {
        ClobClient::new(&config)?.credentials().await?;
        Ok::<_, polybot::Error>("L2 auth derived".to_string())
    }
    .await;
    println!("{}", format::check_line("CLOB API", &clob.map_err(|e| e.to_string())));

    println!("\nDone.");
    Ok(())
}
