use std::time::Instant;

use tracing_subscriber::EnvFilter;

use rust_perceptron::{Dataset, Perceptron, Topology};

fn make_batch(len: usize) -> rust_perceptron::Result<Dataset> {
    let mut xs = Vec::with_capacity(len * 8);
    let mut ys = Vec::with_capacity(len * 2);
    for i in 0..len {
        let row: Vec<f64> = (0..8).map(|j| ((i * 7 + j * 3) % 11) as f64 / 11.0).collect();
        let sum: f64 = row.iter().sum();
        ys.extend_from_slice(&[(sum / 8.0).sin(), row[0] - row[7]]);
        xs.extend_from_slice(&row);
    }
    Dataset::from_flat(xs, ys, 8, 2)
}

fn main() -> rust_perceptron::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let batch = make_batch(2048)?;
    let topology = Topology::new(8, 2, 32, 2);
    let rounds = 20;

    for workers in [1, 2, 4, 0] {
        let mut net = Perceptron::new(topology);
        net.enable_parallel_training(workers)?;

        let start = Instant::now();
        let mut last = 0.0;
        for _ in 0..rounds {
            last = net.train(&batch)?;
        }
        println!(
            "workers={:<2} rounds={rounds} sse={last:.6} elapsed={:.2?}",
            net.worker_count().max(1),
            start.elapsed()
        );
    }
    Ok(())
}
