//! Benchmarks for market account decoding and view building.
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run one group
//! cargo bench -- decode_snapshot
//! ```
//!
//! Results are saved to `target/criterion/` with HTML reports.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use paystream_market::allocator::{NodePool, RawSlot};
use paystream_market::config::{MarketConfig, MarketStatus};
use paystream_market::market::{
    build_market_view, decode_market_snapshot, encode_market_account, MarketPriceData, ViewContext,
};
use paystream_market::types::{MatchIdKey, MatchRecord, Pubkey, TraderKey, TraderRecord};
use paystream_market::Precision;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ============================================================================
// HELPER FUNCTIONS - Deterministic account generation
// ============================================================================

/// Build an account with every trader and match slot live, except that
/// every `free_every`-th slot is chained onto the free list.
fn generate_account(
    num_traders: usize,
    num_matches: usize,
    free_every: usize,
    seed: u64,
) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let trader_slots: Vec<RawSlot<TraderKey, TraderRecord>> = (0..num_traders)
        .map(|_| {
            RawSlot::new(
                0,
                TraderKey::new(Pubkey::new(rng.gen())),
                TraderRecord {
                    on_vault_lends: rng.gen_range(0..1_000_000_000),
                    in_p2p_lends: rng.gen_range(0..1_000_000_000),
                    in_p2p_borrows: rng.gen_range(0..1_000_000_000),
                    collateral_amount: rng.gen_range(0..1_000_000_000),
                    flags: 1,
                    ..Default::default()
                },
            )
        })
        .collect();

    let match_slots: Vec<RawSlot<MatchIdKey, MatchRecord>> = (0..num_matches)
        .map(|i| {
            RawSlot::new(
                0,
                MatchIdKey { match_id: i as u64 + 1 },
                MatchRecord {
                    lender_index: rng.gen_range(1..=num_traders as u64),
                    borrower_index: rng.gen_range(1..=num_traders as u64),
                    amount_in_p2p: rng.gen_range(1..1_000_000_000),
                    original_amount: 1_000_000_000,
                    match_timestamp: 1_700_000_000 + i as u64,
                    last_interest_payment_timestamp: 1_700_000_000 + i as u64,
                    total_interest_paid: 0,
                },
            )
        })
        .collect();

    let traders = with_free_chain(trader_slots, free_every);
    let matches = with_free_chain(match_slots, free_every);
    encode_market_account(num_matches as u64, &traders, &matches, num_traders, num_matches)
        .expect("fixture encodes")
}

/// Link every `free_every`-th slot into a free list ending at the bump index.
fn with_free_chain<K, V>(
    mut slots: Vec<RawSlot<K, V>>,
    free_every: usize,
) -> NodePool<K, V> {
    let bump_index = slots.len() as u32 + 1;
    let mut head = bump_index;
    for index in (0..slots.len()).step_by(free_every).rev() {
        slots[index].registers[0] = head;
        head = index as u32 + 1;
    }
    NodePool::from_parts(head, slots)
}

fn config(num_traders: usize, num_matches: usize) -> MarketConfig {
    MarketConfig {
        name: "bench".to_string(),
        market: Pubkey::new([1; 32]),
        collateral_market: Pubkey::new([2; 32]),
        mint: Pubkey::new([3; 32]),
        collateral_mint: Pubkey::new([4; 32]),
        market_id: 1,
        collateral_market_id: 2,
        mint_decimals: 6,
        collateral_decimals: 9,
        ltv_ratio: 8_000,
        liquidation_threshold: 8_500,
        collateral_ltv_ratio: None,
        collateral_liquidation_threshold: None,
        status: MarketStatus::Active,
        oracle: None,
        oracle_source: 2,
        collateral_oracle: None,
        collateral_oracle_source: 2,
        num_trader_slots: num_traders,
        num_match_slots: num_matches,
        p2p_alpha: 5_000,
    }
}

// ============================================================================
// BENCHMARK: Snapshot decoding
// ============================================================================

fn bench_decode_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_snapshot");

    for &(traders, matches) in &[(32usize, 128usize), (256, 1024), (1024, 4096)] {
        let account = generate_account(traders, matches, 7, 42);
        group.throughput(Throughput::Bytes(account.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", traders, matches)),
            &account,
            |b, account| {
                b.iter(|| black_box(decode_market_snapshot(account, traders, matches).unwrap()))
            },
        );
    }

    group.finish();
}

// ============================================================================
// BENCHMARK: View building
// ============================================================================

fn bench_market_view(c: &mut Criterion) {
    let mut group = c.benchmark_group("market_view");
    let precision = Precision::default();
    let prices = MarketPriceData::from_usd_prices(1_000_000, 150_000_000, &precision).unwrap();

    for &(traders, matches) in &[(32usize, 128usize), (256, 1024)] {
        let account = generate_account(traders, matches, 7, 42);
        let snapshot = decode_market_snapshot(&account, traders, matches).unwrap();
        let config = config(traders, matches);
        let ctx = ViewContext {
            config: &config,
            precision: &precision,
            now: 1_800_000_000,
            protocol_rates: None,
        };

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", traders, matches)),
            &snapshot,
            |b, snapshot| b.iter(|| black_box(build_market_view(snapshot, &prices, &ctx).unwrap())),
        );
    }

    group.finish();
}

// ============================================================================
// CRITERION ENTRY POINT
// ============================================================================

criterion_group!(benches, bench_decode_snapshot, bench_market_view);

criterion_main!(benches);
