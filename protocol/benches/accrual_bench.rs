//! Benchmarks for the accrual arithmetic.
//!
//! Every balance read and every settlement goes through these functions, so
//! they sit on the hot path of every ledger call.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use rebase_protocol::accrual::{accrued_interest, displayed_balance};
use rebase_protocol::config::{DEFAULT_INTEREST_RATE, PRECISION_FACTOR};
use rebase_protocol::storage::HolderAccount;

fn bench_displayed_balance(c: &mut Criterion) {
    let principal = 1_000_000 * PRECISION_FACTOR;
    c.bench_function("displayed_balance_one_year", |b| {
        b.iter(|| {
            displayed_balance(
                black_box(principal),
                black_box(DEFAULT_INTEREST_RATE),
                black_box(0),
                black_box(31_536_000),
            )
        })
    });
}

fn bench_accrued_interest(c: &mut Criterion) {
    c.bench_function("accrued_interest_one_hour", |b| {
        b.iter(|| {
            accrued_interest(
                black_box(100_000),
                black_box(DEFAULT_INTEREST_RATE),
                black_box(0),
                black_box(3_600),
            )
        })
    });
}

fn bench_settle(c: &mut Criterion) {
    let account = HolderAccount {
        principal: 42 * PRECISION_FACTOR,
        locked_rate: DEFAULT_INTEREST_RATE,
        last_settled: 1_700_000_000,
    };
    c.bench_function("settle_account", |b| {
        b.iter(|| black_box(account).settled(black_box(1_700_086_400)))
    });
}

criterion_group!(
    benches,
    bench_displayed_balance,
    bench_accrued_interest,
    bench_settle
);
criterion_main!(benches);
