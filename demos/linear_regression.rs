use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use rust_perceptron::{Dataset, FitConfig, Perceptron, PerceptronConfig, Topology, WeightInit};

fn main() -> rust_perceptron::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Task: learn y = (x0 - x1) / 2 on [0, 1]^2.
    let mut rng = StdRng::seed_from_u64(1);
    let dist = Uniform::new(0.0_f64, 1.0_f64);
    let mut xs = Vec::with_capacity(2 * 64);
    let mut ys = Vec::with_capacity(64);
    for _ in 0..64 {
        let x0 = dist.sample(&mut rng);
        let x1 = dist.sample(&mut rng);
        xs.extend_from_slice(&[x0, x1]);
        ys.push(0.5 * (x0 - x1));
    }
    let train = Dataset::from_flat(xs, ys, 2, 1)?;

    let config = PerceptronConfig {
        init: WeightInit::Jittered {
            seed: 7,
            scale: 0.05,
        },
        ..PerceptronConfig::default()
    };
    let mut net = Perceptron::with_config(Topology::new(2, 1, 4, 2), config);

    let report = net.fit(
        &train,
        FitConfig {
            rounds: 500,
            target_error: Some(1e-3),
            log_every: 50,
        },
    )?;
    println!(
        "rounds={} initial_sse={:.6} final_sse={:.6} converged={}",
        report.rounds, report.initial_error, report.final_error, report.converged
    );

    for x in [[0.2, 0.8], [0.5, 0.5], [0.9, 0.1]] {
        let y = net.evaluate(&x)?;
        let want = 0.5 * (x[0] - x[1]);
        println!("f({:.1}, {:.1}) = {:+.4} (want {want:+.4})", x[0], x[1], y[0]);
    }
    Ok(())
}
