//! paystream-inspect - offline inspection of a market pair
//!
//! Decodes two saved market account dumps with fixed USD prices and prints
//! the market views, cross-market health and optionally one trader.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use paystream_market::market::{build_pair_view, MarketView, PairView, ProtocolRates, ViewContext};
use paystream_market::oracle::FixedFeedClient;
use paystream_market::{MarketConfig, MarketPairLoader, MemoryAccountSource, Pubkey, Settings};

#[derive(Parser, Debug)]
#[command(name = "paystream-inspect")]
#[command(about = "Decode Paystream market accounts and report positions and health")]
struct Args {
    /// Path to the settings file
    #[arg(short, long, default_value = "paystream.toml")]
    settings: String,

    /// Market name or base58 account address
    #[arg(short, long)]
    market: String,

    /// Raw bytes of the lending market account
    #[arg(long)]
    lending_account: String,

    /// Raw bytes of the collateral market account
    #[arg(long)]
    collateral_account: String,

    /// USD price of one lending-mint token, in price precision units
    #[arg(long)]
    mint_price: u64,

    /// USD price of one collateral-mint token, in price precision units
    #[arg(long)]
    collateral_price: u64,

    /// Protocol borrow APY, in rate precision units
    #[arg(long, requires = "supply_rate")]
    borrow_rate: Option<u64>,

    /// Protocol deposit APY, in rate precision units
    #[arg(long, requires = "borrow_rate")]
    supply_rate: Option<u64>,

    /// Only report this trader
    #[arg(short, long)]
    trader: Option<Pubkey>,

    /// Clock override, unix seconds
    #[arg(long)]
    now: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let settings = Settings::load(&args.settings)
        .with_context(|| format!("loading settings from {}", args.settings))?;
    let config = select_market(&settings, &args.market)?.clone();
    info!(market = %config.market, name = %config.name, "inspecting market");

    let accounts = MemoryAccountSource::new();
    accounts
        .insert(config.market, read_dump(&args.lending_account).await?)
        .await;
    accounts
        .insert(config.collateral_market, read_dump(&args.collateral_account).await?)
        .await;

    let loader = MarketPairLoader::new(
        Arc::new(accounts),
        Arc::new(FixedFeedClient::from_price(args.mint_price)?),
        Arc::new(FixedFeedClient::from_price(args.collateral_price)?),
    );
    let pair = loader.load(&config, &settings.precision).await?;

    let protocol_rates = match (args.borrow_rate, args.supply_rate) {
        (Some(borrow_rate), Some(supply_rate)) => Some(ProtocolRates {
            borrow_rate,
            supply_rate,
        }),
        _ => None,
    };
    let now = match args.now {
        Some(now) => now,
        None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
    };
    let ctx = ViewContext {
        config: &config,
        precision: &settings.precision,
        now,
        protocol_rates,
    };

    // The partner market's own protocol rates are not known offline
    let view = build_pair_view(&pair.lending, &pair.collateral, &pair.prices, &ctx, None)?;

    match args.trader {
        Some(identity) => print_trader(&view, &identity)?,
        None => {
            print_market("lending", &view.lending);
            print_market("collateral", &view.collateral);
            print_health(&view);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn select_market<'a>(settings: &'a Settings, selector: &str) -> Result<&'a MarketConfig> {
    if let Some(config) = settings.market_by_name(selector) {
        return Ok(config);
    }
    let address: Pubkey = selector
        .parse()
        .map_err(|_| anyhow!("no market named {}", selector))?;
    settings
        .market(&address)
        .ok_or_else(|| anyhow!("market {} is not configured", address))
}

async fn read_dump(path: &str) -> Result<Vec<u8>> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading account dump {}", path))?;
    if bytes.is_empty() {
        warn!(path, "account dump is empty");
    }
    Ok(bytes)
}

fn print_market(label: &str, view: &MarketView) {
    let stats = &view.stats;
    println!("=== {} market {} ({}) ===", label, view.lending_market, view.status);
    println!("  digest:           {}", view.digest);
    println!("  total matches:    {}", view.total_matches);
    println!(
        "  traders:          {} ({} active)",
        stats.trader_count, stats.active_trader_count
    );
    println!("  total supply:     ${}", stats.total_supply.usd);
    println!("  in p2p:           ${}", stats.total_in_p2p.usd);
    println!("  lend unmatched:   ${}", stats.lend_unmatched.usd);
    println!("  borrowed p2p:     ${}", stats.total_borrowed_p2p.usd);
    println!("  borrow unmatched: ${}", stats.borrow_unmatched.usd);
    println!("  utilization:      {} bps", stats.utilization_bps);
    if let Some(rate) = view.mid_rate {
        println!("  p2p rate:         {}", rate);
    }

    if !view.recent_activity.is_empty() {
        println!("  recent activity:");
        for m in &view.recent_activity {
            println!(
                "    #{} {} -> {} {} ({}d)",
                m.id, m.lender, m.borrower, m.amount.amount, m.duration_days
            );
        }
    }
    println!();
}

fn print_health(view: &PairView) {
    println!("=== health ===");
    for (label, health) in [
        ("lending", &view.lending_health),
        ("collateral", &view.collateral_health),
    ] {
        for (identity, h) in health {
            let ratio =
                |ltv: Option<u64>| ltv.map_or_else(|| "n/a".to_string(), |ltv| ltv.to_string());
            println!(
                "  [{}] {} borrowed={} collateral={} ltv={} collateral_ltv={} healthy={}",
                label,
                identity,
                h.borrowed,
                h.collateral,
                ratio(h.ltv),
                ratio(h.collateral_ltv),
                h.is_healthy()
            );
            if let Some(liquidation) = h.liquidation {
                println!(
                    "      liquidate: repay {} seize {}",
                    liquidation.debt_repaid, liquidation.collateral_seized
                );
            }
        }
    }
}

fn print_trader(view: &PairView, identity: &Pubkey) -> Result<()> {
    let lending = view.lending.trader(identity);
    let collateral = view.collateral.trader(identity);
    if lending.is_none() && collateral.is_none() {
        return Err(anyhow!("trader {} not found in either market", identity));
    }

    for (label, position) in [("lending", lending), ("collateral", collateral)] {
        let Some(p) = position else { continue };
        println!("=== {} market position of {} ===", label, identity);
        println!("  role:           {:?}", p.role);
        println!("  p2p enabled:    {}", p.is_p2p_enabled);
        println!("  on vault lends: {} (${})", p.on_vault_lends.amount, p.on_vault_lends.usd);
        println!("  p2p lends:      {} (${})", p.p2p_lends.amount, p.p2p_lends.usd);
        println!("  collateral:     {} (${})", p.collateral.amount, p.collateral.usd);
        println!("  borrow pending: {} (${})", p.borrow_pending.amount, p.borrow_pending.usd);
        println!("  p2p borrowed:   {} (${})", p.p2p_borrowed.amount, p.p2p_borrowed.usd);
        println!("  max borrow:     {}", p.max_borrow);
    }

    for (label, health) in [
        ("lending", view.lending_health.get(identity)),
        ("collateral", view.collateral_health.get(identity)),
    ] {
        if let Some(h) = health {
            println!(
                "  [{}] ltv={:?} exceeds_ltv={} exceeds_threshold={}",
                label, h.ltv, h.exceeds_ltv, h.exceeds_liquidation_threshold
            );
        }
    }

    Ok(())
}
