use std::env;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use getopts::Options;
use metrics_percentile::{multi_percentiles, Calculator, CalculatorBuilder};
use rand::Rng;
use tracing::{debug, error, info};

const SAMPLE_LOOP: usize = 1024;

fn main() {
    tracing_subscriber::fmt().with_ansi(true).with_level(true).init();

    let args: Vec<String> = env::args().collect();
    let program = &args[0];
    let opts = opts();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(f) => {
            error!("Failed to parse command line args: {}", f);
            return;
        }
    };

    if matches.opt_present("help") {
        print_usage(program, &opts);
        return;
    }

    info!("percentile-crusher");

    let duration = matches
        .opt_str("duration")
        .unwrap_or_else(|| "60".to_owned())
        .parse()
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(60));
    let producers: usize =
        matches.opt_str("producers").unwrap_or_else(|| "1".to_owned()).parse().unwrap_or(1);
    let max_ms: u64 =
        matches.opt_str("max-ms").unwrap_or_else(|| "1000".to_owned()).parse().unwrap_or(1000);

    info!("duration: {:?}", duration);
    info!("producers: {}", producers);
    info!("max value: {}ms", max_ms);

    let builder = CalculatorBuilder::new().with_max_value(Duration::from_millis(max_ms));
    let layout = match builder.layout() {
        Ok(layout) => layout,
        Err(e) => {
            error!("Invalid calculator configuration: {}", e);
            return;
        }
    };

    // One shard per producer, merged by the reporter.
    let shards: Arc<Vec<Calculator>> =
        Arc::new((0..producers.max(1)).map(|_| Calculator::with_layout(layout)).collect());
    let done = Arc::new(AtomicBool::new(false));
    let accepted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for id in 0..shards.len() {
        let shards = shards.clone();
        let done = done.clone();
        let accepted = accepted.clone();
        let rejected = rejected.clone();

        handles.push(thread::spawn(move || {
            let shard = &shards[id];
            let mut rng = rand::rng();
            // Some samples overshoot the range on purpose.
            let upper = max_ms + max_ms / 10 + 1;

            while !done.load(Ordering::Relaxed) {
                let mut ok = 0;
                let mut dropped = 0;
                for _ in 0..SAMPLE_LOOP {
                    let value = Duration::from_micros(rng.random_range(0..upper * 1000));
                    match shard.add(value) {
                        Ok(()) => ok += 1,
                        Err(_) => dropped += 1,
                    }
                }
                accepted.fetch_add(ok, Ordering::Relaxed);
                rejected.fetch_add(dropped, Ordering::Relaxed);
            }
            debug!("producer {} finished", id);
        }));
    }

    let start = Instant::now();
    let mut last_accepted = 0;
    while start.elapsed() < duration {
        thread::sleep(Duration::from_secs(1));

        let refs: Vec<&Calculator> = shards.iter().collect();
        match multi_percentiles(&[0.5, 0.99, 0.999], &refs) {
            Ok(results) => {
                let current = accepted.load(Ordering::Relaxed);
                info!(
                    "rate: {} samples/s, p50: {:?}, p99: {:?}, p999: {:?}",
                    current - last_accepted,
                    results[0],
                    results[1],
                    results[2]
                );
                last_accepted = current;
            }
            Err(e) => error!("Failed to merge shards: {}", e),
        }
    }

    done.store(true, Ordering::Relaxed);
    for handle in handles {
        if handle.join().is_err() {
            error!("producer thread panicked");
        }
    }

    let total: u64 = shards.iter().map(Calculator::count).sum();
    info!(
        "accepted: {}, rejected: {}, recorded: {}",
        accepted.load(Ordering::Relaxed),
        rejected.load(Ordering::Relaxed),
        total
    );
}

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn opts() -> Options {
    let mut opts = Options::new();

    opts.optopt("d", "duration", "number of seconds to run the crusher test", "INTEGER");
    opts.optopt("p", "producers", "number of producers", "INTEGER");
    opts.optopt("m", "max-ms", "maximum tracked value in milliseconds", "INTEGER");
    opts.optflag("h", "help", "print this help menu");

    opts
}
