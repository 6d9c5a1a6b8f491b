use std::thread;
use std::time::Duration;

use parallel_reservoir::error::FeederError;
use parallel_reservoir::parallel::{
    CancelToken, DataFeeder, Feed, IterFeeder, ParallelSampler, RandomDataFeeder, TryIterFeeder,
};
use parallel_reservoir::{run_parallel_sample, Error, SamplerConfig, Scheduling};

fn range_feeders(lengths: &[u32]) -> Vec<IterFeeder<std::ops::Range<u32>>> {
    let mut start = 0;
    lengths
        .iter()
        .map(|&len| {
            let feeder = IterFeeder::new(start..start + len);
            start += len;
            feeder
        })
        .collect()
}

struct NeverReady;

impl DataFeeder<u32> for NeverReady {
    fn next_item(&mut self) -> Result<Feed<u32>, FeederError> {
        Ok(Feed::Pending)
    }
}

struct Exploding;

impl DataFeeder<u32> for Exploding {
    fn next_item(&mut self) -> Result<Feed<u32>, FeederError> {
        panic!("feeder exploded");
    }
}

#[test]
fn threaded_and_sequential_agree_on_total() {
    let lengths = [0, 1, 9, 10, 11, 500, 7_000, 3];
    let expected: u64 = lengths.iter().map(|&l| l as u64).sum();

    for scheduling in [Scheduling::Threaded, Scheduling::Sequential] {
        for _ in 0..5 {
            let mut feeders = range_feeders(&lengths);
            let sampler = ParallelSampler::new(SamplerConfig::new(10).with_scheduling(scheduling));
            let result = sampler.run(&mut feeders).unwrap();
            assert_eq!(result.total(), expected, "{scheduling:?}");
            assert_eq!(result.len(), 10);
            assert!(result.samples().iter().all(|&v| (v as u64) < expected));
        }
    }
}

#[test]
fn many_partitions_reduce_to_one() {
    let lengths: Vec<u32> = (0..64).map(|i| (i * 37) % 200).collect();
    let expected: u64 = lengths.iter().map(|&l| l as u64).sum();
    let mut feeders = range_feeders(&lengths);
    let result = run_parallel_sample(&mut feeders, 25).unwrap();
    assert_eq!(result.total(), expected);
    assert_eq!(result.len(), 25);

    let mut seen = result.into_samples();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 25);
}

#[test]
fn small_stream_returns_fewer_than_capacity() {
    let mut feeders = range_feeders(&[2, 0, 3]);
    let result = run_parallel_sample(&mut feeders, 10).unwrap();
    assert_eq!(result.total(), 5);
    let mut samples = result.into_samples();
    samples.sort_unstable();
    assert_eq!(samples, vec![0, 1, 2, 3, 4]);
}

#[test]
fn partitions_shorter_than_capacity_fill_it() {
    for scheduling in [Scheduling::Threaded, Scheduling::Sequential] {
        for seed in 0..20 {
            let mut feeders = range_feeders(&[3, 9, 2, 1, 7]);
            let config = SamplerConfig::new(10)
                .with_seed(seed)
                .with_scheduling(scheduling);
            let result = ParallelSampler::new(config).run(&mut feeders).unwrap();
            assert_eq!(result.total(), 22);
            let mut seen = result.into_samples();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), 10, "{scheduling:?} seed {seed}");
            assert!(seen.iter().all(|&v| v < 22));
        }
    }
}

#[test]
fn zero_capacity_counts_everything() {
    let mut feeders = range_feeders(&[5, 6]);
    let result = run_parallel_sample(&mut feeders, 0).unwrap();
    assert_eq!(result.total(), 11);
    assert!(result.is_empty());
}

#[test]
fn single_partition() {
    let mut feeders = range_feeders(&[42]);
    let result = run_parallel_sample(&mut feeders, 5).unwrap();
    assert_eq!(result.total(), 42);
    assert_eq!(result.len(), 5);
}

#[test]
fn heterogeneous_feeders() {
    let mut feeders: Vec<Box<dyn DataFeeder<i32> + Send>> = vec![
        Box::new(RandomDataFeeder::new(1_000, 1)),
        Box::new(IterFeeder::new(0..250)),
        Box::new(TryIterFeeder::new((0..10).map(Ok::<i32, std::io::Error>))),
    ];
    let result = run_parallel_sample(&mut feeders, 20).unwrap();
    assert_eq!(result.total(), 1_260);
    assert_eq!(result.len(), 20);
}

#[test]
fn feeder_failure_aborts_run() {
    for scheduling in [Scheduling::Threaded, Scheduling::Sequential] {
        let records = (0..100u32)
            .map(|i| if i == 50 { Err("corrupt record".to_string()) } else { Ok(i) })
            .collect::<Vec<_>>();
        let mut feeders: Vec<Box<dyn DataFeeder<u32> + Send>> = vec![
            Box::new(IterFeeder::new(0..200_000u32)),
            Box::new(IterFeeder::new(0..10u32)),
            Box::new(TryIterFeeder::new(records)),
            Box::new(IterFeeder::new(0..200_000u32)),
        ];
        let sampler = ParallelSampler::new(SamplerConfig::new(8).with_scheduling(scheduling));
        match sampler.run(&mut feeders) {
            Err(Error::FeederFailure { partition, source }) => {
                assert_eq!(partition, 2);
                assert_eq!(source.to_string(), "corrupt record");
            }
            other => panic!("unexpected outcome under {scheduling:?}: {other:?}"),
        }
    }
}

#[test]
fn external_cancel_interrupts_run() {
    let mut feeders = vec![NeverReady, NeverReady, NeverReady];
    let cancel = CancelToken::new();
    let sampler = ParallelSampler::new(SamplerConfig::new(4));

    let outcome = thread::scope(|s| {
        let runner = s.spawn(|| sampler.run_with_cancel(&mut feeders, &cancel));
        thread::sleep(Duration::from_millis(50));
        cancel.cancel();
        runner.join().unwrap()
    });

    let err = outcome.unwrap_err();
    assert!(err.is_interrupted(), "unexpected error: {err}");
}

#[test]
fn panicking_feeder_is_reported() {
    let mut feeders: Vec<Box<dyn DataFeeder<u32> + Send>> = vec![
        Box::new(IterFeeder::new(0..1_000_000u32)),
        Box::new(Exploding),
    ];
    let err = run_parallel_sample(&mut feeders, 3).unwrap_err();
    match err {
        Error::Panicked { role } => assert_eq!(role, "worker 1"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn seeded_sequential_runs_repeat() {
    let config = SamplerConfig::new(6)
        .with_seed(2024)
        .with_scheduling(Scheduling::Sequential);
    let sampler = ParallelSampler::new(config);
    let first = sampler.run(&mut range_feeders(&[100, 40, 70])).unwrap();
    let second = sampler.run(&mut range_feeders(&[100, 40, 70])).unwrap();
    assert_eq!(first, second);
}

#[test]
fn reduced_sample_is_uniform() {
    let lengths = [10, 30, 50, 110];
    let n = 200usize;
    let k = 10;
    let trials = 2_000;
    let mut counts = vec![0usize; n];

    for t in 0..trials {
        let config = SamplerConfig::new(k)
            .with_seed(t)
            .with_scheduling(Scheduling::Sequential);
        let result = ParallelSampler::new(config)
            .run(&mut range_feeders(&lengths))
            .unwrap();
        for &v in result.samples() {
            counts[v as usize] += 1;
        }
    }

    let expected = trials as f64 * k as f64 / n as f64;
    let chi2: f64 = counts
        .iter()
        .map(|&c| {
            let diff = c as f64 - expected;
            diff * diff / expected
        })
        .sum();

    // df = 199
    assert!(chi2 < 300.0, "chi2 too large: {chi2:.2}");
}
