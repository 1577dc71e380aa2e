use criterion::{Criterion, criterion_group, criterion_main};

use betting_exchange_engine::order::Order;
use betting_exchange_engine::order_book::OrderBook;
use betting_exchange_engine::price::Price;

/// Books `depth` offer levels (ascending price) on outcome 0, `stake`
/// cents each, so a single large taking order has to walk every level.
fn setup_walked_book(depth: i64, stake: u64) -> OrderBook {
    let mut order_book = OrderBook::new(2).unwrap();
    for level in 1..=depth {
        let price = Price::from_x100(100 + level);
        let offer = Order::new_real(stake, price, 0, false);
        assert!(order_book.match_or_put(offer, false).is_empty());
    }
    order_book
}

/// Books resting lay liquidity on outcomes 1..outcomes so that a taker on
/// outcome 0 can synthesise a virtual matching order every iteration.
fn setup_crossmatch_book(outcomes: usize, stake: u64) -> OrderBook {
    let mut order_book = OrderBook::new(outcomes).unwrap();
    for outcome_index in 1..outcomes {
        let offer = Order::new_real(stake, Price::from_x100(500), outcome_index, false);
        assert!(order_book.match_or_put(offer, true).is_empty());
    }
    order_book
}

fn bench_match_or_put(c: &mut Criterion) {
    let depth = 200;
    let stake = 100;

    c.bench_function("walk book of 200 offer levels", |b| {
        b.iter_batched(
            || setup_walked_book(depth, stake),
            |mut order_book| {
                let taker = Order::new_real(depth as u64 * stake, Price::from_x100(100_000), 0, true);
                order_book.match_or_put(taker, false)
            },
            criterion::BatchSize::SmallInput,
        )
    });

    c.bench_function("rest a non-crossing order", |b| {
        b.iter_batched(
            || setup_walked_book(depth, stake),
            |mut order_book| {
                let resting = Order::new_real(stake, Price::from_x100(1), 0, true);
                order_book.match_or_put(resting, false)
            },
            criterion::BatchSize::SmallInput,
        )
    });

    c.bench_function("crossmatch synthesis across 4 outcomes", |b| {
        b.iter_batched(
            || setup_crossmatch_book(4, 100_000),
            |mut order_book| {
                let taker = Order::new_real(5_000, Price::from_x100(500), 0, false);
                order_book.match_or_put(taker, true)
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_match_or_put);
criterion_main!(benches);
