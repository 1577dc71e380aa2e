//! Demo CLI driving [`crate::order_book::OrderBook`] purely in-process.
//!
//! `spec.md` §1 puts any network/RPC surface out of scope, so unlike the
//! teacher's `axum`-backed server this binary never listens on a socket:
//! every subcommand builds (optionally seeds) a book and prints the
//! result of one call. That also matches the teacher's own `cli.rs`,
//! which built a fresh `OrderBook` per invocation rather than sharing
//! state across processes.
//!
//! Malformed CLI input (a bad `--rest` seed, too few outcomes) is a
//! recoverable error reported through [`EngineError`] (`spec.md` §7's
//! "no-op" / input-validation class); anything that would indicate the
//! matching core itself is broken still panics inside `order_book.rs`.

use clap::{Args, Parser, Subcommand, builder::PossibleValuesParser};

use crate::errors::EngineError;
use crate::order::Order;
use crate::order_book::OrderBook;
use crate::price::Price;
use crate::simulate::{SimConfig, run_simulation};

#[derive(Parser)]
#[command(name = "engine-cli")]
#[command(
    author = "Andrew Odiit",
    version = "0.1",
    about = "A demo of the betting-exchange matching engine core"
)]
pub struct Cli {
    /// Maximum tracing level emitted to stderr (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Place a single resting order and print the book afterwards.
    Add(AddArgs),
    /// Submit a single taking order and print the resulting matches.
    Match(MatchArgs),
    /// Print a snapshot of a book built from `--rest` seed orders.
    Book(BookArgs),
    /// Run a bounded, in-process noisy order-flow generator.
    Simulate {
        #[arg(long, default_value_t = 2)]
        outcomes: usize,
        #[arg(long, default_value_t = 1000)]
        iterations: u64,
        /// Enable virtual-liquidity synthesis across sibling outcomes.
        #[arg(long)]
        cross_matching: bool,
        #[arg(long, default_value_t = 500.0)]
        mean_stake: f64,
    },
}

/// Seed orders to rest on the book before the subcommand's own order is
/// submitted, each formatted `outcome:back|lay:price:stake`, e.g.
/// `0:lay:1.80:100`. Seeds are submitted with `cross_matching = false` and
/// must not match each other.
#[derive(Args, Clone, Default)]
pub struct RestSeeds {
    #[arg(long = "rest", value_name = "outcome:back|lay:price:stake")]
    pub rest: Vec<String>,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(long, default_value_t = 2)]
    pub outcomes: usize,
    #[command(flatten)]
    pub seed: RestSeeds,
    pub outcome_index: usize,
    #[arg(value_parser = PossibleValuesParser::new(["back", "lay"]))]
    pub side: String,
    pub price: f64,
    pub stake: u64,
}

#[derive(Args)]
pub struct MatchArgs {
    #[arg(long, default_value_t = 2)]
    pub outcomes: usize,
    #[command(flatten)]
    pub seed: RestSeeds,
    pub outcome_index: usize,
    #[arg(value_parser = PossibleValuesParser::new(["back", "lay"]))]
    pub side: String,
    pub price: f64,
    pub stake: u64,
    /// Enable virtual-liquidity synthesis across sibling outcomes.
    #[arg(long)]
    pub cross_matching: bool,
}

#[derive(Args)]
pub struct BookArgs {
    #[arg(long, default_value_t = 2)]
    pub outcomes: usize,
    #[command(flatten)]
    pub seed: RestSeeds,
}

fn for_outcome(side: &str) -> bool {
    side == "back"
}

/// Parses one `--rest` entry of the form `outcome:back|lay:price:stake`.
fn parse_seed(spec: &str) -> Result<(usize, bool, f64, u64), EngineError> {
    let parts: Vec<&str> = spec.split(':').collect();
    let [outcome_s, side_s, price_s, stake_s] = parts[..] else {
        return Err(EngineError::InvalidPrice(format!(
            "malformed --rest seed {spec:?}, expected outcome:back|lay:price:stake"
        )));
    };
    let outcome_index: usize = outcome_s
        .parse()
        .map_err(|_| EngineError::InvalidPrice(format!("bad outcome index in {spec:?}")))?;
    let price: f64 = price_s
        .parse()
        .map_err(|_| EngineError::InvalidPrice(format!("bad price in {spec:?}")))?;
    let stake: u64 = stake_s
        .parse()
        .map_err(|_| EngineError::InvalidPrice(format!("bad stake in {spec:?}")))?;
    if stake == 0 {
        return Err(EngineError::NonPositiveStake);
    }
    if side_s != "back" && side_s != "lay" {
        return Err(EngineError::InvalidPrice(format!(
            "bad side in {spec:?}, expected back or lay"
        )));
    }
    Ok((outcome_index, for_outcome(side_s), price, stake))
}

fn validate_outcome_index(outcomes: usize, outcome_index: usize) -> Result<(), EngineError> {
    if outcome_index >= outcomes {
        return Err(EngineError::OutcomeOutOfRange {
            index: outcome_index,
            outcomes,
        });
    }
    Ok(())
}

fn seeded_book(outcomes: usize, seed: &RestSeeds) -> Result<OrderBook, EngineError> {
    let mut order_book = OrderBook::new(outcomes)?;
    for spec in &seed.rest {
        let (outcome_index, for_outcome, price, stake) = parse_seed(spec)?;
        validate_outcome_index(outcomes, outcome_index)?;
        let order = Order::new_real(stake, Price::from_f64_round(price), outcome_index, for_outcome);
        let matches = order_book.match_or_put(order, false);
        assert!(
            matches.is_empty(),
            "--rest seed {spec:?} unexpectedly matched existing liquidity"
        );
    }
    Ok(order_book)
}

fn print_book(order_book: &OrderBook) {
    println!("====== order book ({} outcomes) ======", order_book.outcomes());
    for i in 0..order_book.outcomes() {
        println!("outcome {i}:");
        println!("  bids (best/highest first):");
        for queue in order_book.bids(i).values().rev() {
            for order in queue.iter() {
                println!("    {order}");
            }
        }
        println!("  offers (best/lowest first):");
        for queue in order_book.offers(i).values() {
            for order in queue.iter() {
                println!("    {order}");
            }
        }
    }
    println!("=======================================");
}

pub fn dispatch(command: Commands) {
    if let Err(e) = try_dispatch(command) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn try_dispatch(command: Commands) -> Result<(), EngineError> {
    match command {
        Commands::Add(args) => {
            validate_outcome_index(args.outcomes, args.outcome_index)?;
            if args.stake == 0 {
                return Err(EngineError::NonPositiveStake);
            }
            let mut order_book = seeded_book(args.outcomes, &args.seed)?;
            let order = Order::new_real(
                args.stake,
                Price::from_f64_round(args.price),
                args.outcome_index,
                for_outcome(&args.side),
            );
            let matches = order_book.match_or_put(order, false);
            println!("{} immediate match(es):", matches.len());
            for m in &matches {
                println!("  {m:?}");
            }
            print_book(&order_book);
        }
        Commands::Match(args) => {
            validate_outcome_index(args.outcomes, args.outcome_index)?;
            if args.stake == 0 {
                return Err(EngineError::NonPositiveStake);
            }
            let mut order_book = seeded_book(args.outcomes, &args.seed)?;
            let order = Order::new_real(
                args.stake,
                Price::from_f64_round(args.price),
                args.outcome_index,
                for_outcome(&args.side),
            );
            let matches = order_book.match_or_put(order, args.cross_matching);
            if matches.is_empty() {
                println!("no matches; order rests");
            } else {
                println!("{} match(es):", matches.len());
                for m in &matches {
                    println!("  {m:?}");
                }
            }
            print_book(&order_book);
        }
        Commands::Book(args) => {
            print_book(&seeded_book(args.outcomes, &args.seed)?);
        }
        Commands::Simulate {
            outcomes,
            iterations,
            cross_matching,
            mean_stake,
        } => {
            if outcomes < 2 {
                return Err(EngineError::InvalidOutcomeCount(outcomes));
            }
            let (order_book, report) = run_simulation(SimConfig {
                outcomes,
                iterations,
                cross_matching,
                mean_stake,
            });
            println!(
                "submitted {} orders, {} matches, {} cents total matched stake",
                report.orders_submitted, report.matches_produced, report.total_matched_stake
            );
            print_book(&order_book);
        }
    }
    Ok(())
}
