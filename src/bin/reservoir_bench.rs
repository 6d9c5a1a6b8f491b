//! Sequential sampling vs. the parallel reduction over the same amount of data.
//!
//! Usage:
//!
//! - `reservoir_bench [threads] [per_thread] [capacity]`: every partition
//!   holds `per_thread` values.
//! - `reservoir_bench random [threads] [capacity]`: each partition's length
//!   is drawn from `[MIN_PER_THREAD, MAX_PER_THREAD]`.

use std::time::Instant;

use parallel_reservoir::parallel::{DataFeeder, Feed, ParallelSampler, RandomDataFeeder};
use parallel_reservoir::random::ThreadRngSource;
use parallel_reservoir::{Reservoir, SamplerConfig};

const THREADS: usize = 16;
const PER_THREAD: u64 = 1_000_000;
const CAPACITY: usize = 1000;

const RANDOM_THREADS: usize = 10;
const RANDOM_CAPACITY: usize = 100;
const MIN_PER_THREAD: u64 = 100_000;
const MAX_PER_THREAD: u64 = 10_000_000;

#[derive(Debug, Clone, Copy)]
enum Mode {
    Fixed {
        threads: usize,
        per_thread: u64,
        capacity: usize,
    },
    RandomLengths {
        threads: usize,
        capacity: usize,
    },
}

impl Mode {
    fn capacity(&self) -> usize {
        match *self {
            Mode::Fixed { capacity, .. } | Mode::RandomLengths { capacity, .. } => capacity,
        }
    }

    fn feeders(&self) -> parallel_reservoir::Result<Vec<RandomDataFeeder>> {
        match *self {
            Mode::Fixed {
                threads, per_thread, ..
            } => Ok((0..threads)
                .map(|i| RandomDataFeeder::new(per_thread, i as u64 + 1))
                .collect()),
            Mode::RandomLengths { threads, .. } => (0..threads)
                .map(|i| RandomDataFeeder::with_random_length(MIN_PER_THREAD, MAX_PER_THREAD, i as u64 + 1))
                .collect(),
        }
    }
}

fn arg_or<T: std::str::FromStr>(args: &[String], idx: usize, default: T) -> Result<T, String> {
    match args.get(idx) {
        Some(raw) => raw.parse().map_err(|_| format!("cannot parse argument {idx}: {raw:?}")),
        None => Ok(default),
    }
}

fn parse_args(args: &[String]) -> Result<Mode, String> {
    match args.first().map(String::as_str) {
        Some("random") => {
            let rest = &args[1..];
            Ok(Mode::RandomLengths {
                threads: arg_or(rest, 0, RANDOM_THREADS)?,
                capacity: arg_or(rest, 1, RANDOM_CAPACITY)?,
            })
        }
        _ => Ok(Mode::Fixed {
            threads: arg_or(args, 0, THREADS)?,
            per_thread: arg_or(args, 1, PER_THREAD)?,
            capacity: arg_or(args, 2, CAPACITY)?,
        }),
    }
}

fn sequential(total: u64, capacity: usize) -> parallel_reservoir::Result<()> {
    println!("expected total = {total}");

    let mut rng = ThreadRngSource::default();
    let mut feeder = RandomDataFeeder::new(total, 0);
    let mut reservoir = Reservoir::with_capacity(capacity);

    let start = Instant::now();
    loop {
        match feeder.next_item() {
            Ok(Feed::Item(x)) => {
                reservoir.try_sample(x, &mut rng);
            }
            Ok(_) => break,
            Err(source) => {
                return Err(parallel_reservoir::Error::FeederFailure {
                    partition: 0,
                    source,
                })
            }
        }
    }
    let result = reservoir.into_result();
    println!("SEQUENTIAL sampling took {} ms", start.elapsed().as_millis());
    println!("actual total = {}, samples kept = {}", result.total(), result.len());
    Ok(())
}

fn parallel(mut feeders: Vec<RandomDataFeeder>, capacity: usize) -> parallel_reservoir::Result<()> {
    let expected: u64 = feeders.iter().map(RandomDataFeeder::total).sum();
    println!("expected total = {expected}");

    let sampler = ParallelSampler::new(SamplerConfig::new(capacity));
    let start = Instant::now();
    let result = sampler.run(&mut feeders)?;
    println!("PARALLEL sampling took {} ms", start.elapsed().as_millis());
    println!("actual total = {}, samples kept = {}", result.total(), result.len());
    Ok(())
}

fn run(mode: Mode) -> Result<(), String> {
    let feeders = mode.feeders().map_err(|e| e.to_string())?;
    let total = feeders.iter().map(RandomDataFeeder::total).sum();

    sequential(total, mode.capacity()).map_err(|e| format!("sequential run failed: {e}"))?;
    println!("\n-------------------------\n");
    parallel(feeders, mode.capacity()).map_err(|e| format!("parallel run failed: {e}"))
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match parse_args(&args) {
        Ok(mode) => mode,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("usage: reservoir_bench [threads] [per_thread] [capacity]");
            eprintln!("       reservoir_bench random [threads] [capacity]");
            std::process::exit(2);
        }
    };

    if let Err(msg) = run(mode) {
        eprintln!("{msg}");
        std::process::exit(1);
    }
}
