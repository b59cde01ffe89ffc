use std::{
    collections::BTreeMap,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use chrono::NaiveDate;
use clap::Parser;
use hdrhistogram::Histogram;
use tracing_subscriber::EnvFilter;

use docgate::{
    AdmissionOptions, CancellationToken, Capacity, Document, Gateway, PollInterval,
    SubmissionError, SubmissionExecutor, WindowDuration,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "docgate-stress",
    about = "Load test harness for the docgate admission controller"
)]
struct Args {
    /// Concurrent submitting tasks.
    #[arg(long, default_value_t = 50)]
    tasks: usize,

    #[arg(long, default_value_t = 3)]
    capacity: u64,

    #[arg(long, default_value_t = 2_000)]
    window_ms: u64,

    /// Replenisher poll interval. Defaults to a tenth of the window.
    #[arg(long)]
    poll_ms: Option<u64>,

    #[arg(long, default_value_t = 10)]
    duration_s: u64,

    /// Simulated remote latency per submission.
    #[arg(long, default_value_t = 20)]
    work_ms: u64,

    /// Share of submissions the simulated remote rejects.
    #[arg(long, default_value_t = 0.1)]
    reject_ratio: f64,
}

#[derive(Default)]
struct Counts {
    accepted: AtomicU64,
    rejected: AtomicU64,
    cancelled: AtomicU64,
}

/// Stands in for the remote registry: sleeps, then accepts or rejects.
struct SimulatedExecutor {
    work: Duration,
    reject_ratio: f64,
}

impl SubmissionExecutor for SimulatedExecutor {
    fn execute(
        &self,
        _token: &str,
        _document: &Document,
    ) -> impl Future<Output = Result<(), SubmissionError>> + Send {
        let work = self.work;
        let reject = rand::random::<f64>() < self.reject_ratio;

        async move {
            tokio::time::sleep(work).await;

            if reject {
                return Err(SubmissionError::RemoteRejected {
                    status_code: 500,
                    body: "simulated rejection".to_string(),
                });
            }

            Ok(())
        }
    }
}

fn build_options(args: &Args) -> AdmissionOptions {
    AdmissionOptions {
        poll_interval: args
            .poll_ms
            .map(|ms| PollInterval::try_from(Duration::from_millis(ms)).unwrap()),
        ..AdmissionOptions::new(
            WindowDuration::try_from(Duration::from_millis(args.window_ms)).unwrap(),
            Capacity::try_from(args.capacity).unwrap(),
        )
    }
}

fn document(task: usize, i: u64) -> Document {
    let date = chrono_date();

    Document {
        participant_inn: "7700000000".to_string(),
        doc_id: format!("stress-{task}-{i}"),
        doc_status: "NEW".to_string(),
        doc_type: "LP_INTRODUCE_GOODS".to_string(),
        import_request: false,
        owner_inn: "7700000000".to_string(),
        producer_inn: "7700000000".to_string(),
        production_date: date,
        production_type: "OWN_PRODUCTION".to_string(),
        products: Vec::new(),
        reg_date: date,
        reg_number: format!("{task}/{i}"),
    }
}

fn chrono_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

fn print_results(
    args: &Args,
    elapsed: Duration,
    hist: &Histogram<u64>,
    per_window: &BTreeMap<u64, u64>,
    counts: &Counts,
) {
    println!(
        "tasks={} capacity={} window_ms={} poll_ms={:?} work_ms={} reject_ratio={}",
        args.tasks, args.capacity, args.window_ms, args.poll_ms, args.work_ms, args.reject_ratio
    );

    let granted: u64 = per_window.values().sum();
    println!(
        "elapsed_s={:.3} granted={} grants_per_s={:.2}",
        elapsed.as_secs_f64(),
        granted,
        granted as f64 / elapsed.as_secs_f64()
    );
    println!(
        "accepted={} rejected={} cancelled={}",
        counts.accepted.load(Ordering::Relaxed),
        counts.rejected.load(Ordering::Relaxed),
        counts.cancelled.load(Ordering::Relaxed)
    );

    let busiest = per_window.values().copied().max().unwrap_or(0);
    let over = per_window
        .values()
        .filter(|&&granted| granted > args.capacity)
        .count();
    println!(
        "windows={} max_grants_per_window={} windows_over_capacity={}",
        per_window.len(),
        busiest,
        over
    );

    if !hist.is_empty() {
        println!(
            "wait_ms p50={} p95={} p99={} max={}",
            hist.value_at_quantile(0.50),
            hist.value_at_quantile(0.95),
            hist.value_at_quantile(0.99),
            hist.max()
        );
    } else {
        println!("no wait samples collected");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let gateway = Arc::new(
        Gateway::with_executor(
            build_options(&args),
            SimulatedExecutor {
                work: Duration::from_millis(args.work_ms),
                reject_ratio: args.reject_ratio,
            },
        )
        .unwrap(),
    );

    let stop = CancellationToken::new();
    let counts = Arc::new(Counts::default());
    let started = Instant::now();

    let mut handles = Vec::with_capacity(args.tasks);
    for task in 0..args.tasks {
        let gateway = Arc::clone(&gateway);
        let stop = stop.clone();
        let counts = Arc::clone(&counts);

        handles.push(tokio::spawn(async move {
            let mut hist = Histogram::<u64>::new_with_bounds(1, 3_600_000, 3).unwrap();
            let mut per_window: BTreeMap<u64, u64> = BTreeMap::new();
            let mut i = 0_u64;

            loop {
                let t0 = Instant::now();

                let slot = match gateway.admission().acquire_with_cancel(&stop).await {
                    Ok(slot) => slot,
                    Err(err) => {
                        tracing::debug!(task, error = %err, "task stopping");
                        counts.cancelled.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                };

                let _ = hist.record((t0.elapsed().as_millis() as u64).max(1));
                *per_window.entry(slot.epoch()).or_default() += 1;

                i = i.wrapping_add(1);
                let result = gateway.executor().execute("stress", &document(task, i)).await;
                slot.release();

                match result {
                    Ok(()) => counts.accepted.fetch_add(1, Ordering::Relaxed),
                    Err(_) => counts.rejected.fetch_add(1, Ordering::Relaxed),
                };
            }

            (hist, per_window)
        }));
    }

    tokio::time::sleep(Duration::from_secs(args.duration_s)).await;
    stop.cancel();

    let mut merged = Histogram::<u64>::new_with_bounds(1, 3_600_000, 3).unwrap();
    let mut per_window: BTreeMap<u64, u64> = BTreeMap::new();
    for handle in handles {
        let (hist, windows) = handle.await.unwrap();
        merged.add(&hist).unwrap();
        for (epoch, granted) in windows {
            *per_window.entry(epoch).or_default() += granted;
        }
    }

    let elapsed = started.elapsed();
    gateway.shutdown();

    tracing::info!(stats = ?gateway.admission().stats(), "stress run finished");
    print_results(&args, elapsed, &merged, &per_window, &counts);
}
