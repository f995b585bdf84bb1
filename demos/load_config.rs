use rust_perceptron::{Dataset, Perceptron, PerceptronConfig, Topology};

const CONFIG: &str = r#"{
  "activation": { "kind": "tanh" },
  "init": { "kind": "jittered", "seed": 11, "scale": 0.02 },
  "learning": { "initial_rate": 0.05 },
  "default_workers": 2
}"#;

fn main() -> rust_perceptron::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // A path on the command line overrides the built-in configuration.
    let config = match std::env::args().nth(1) {
        Some(path) => PerceptronConfig::from_json_file(path)?,
        None => PerceptronConfig::from_json_str(CONFIG)?,
    };
    println!("{}", config.to_json_string_pretty()?);

    let mut net = Perceptron::try_new(Topology::new(1, 1, 3, 1), config)?;
    net.enable_parallel_training(0)?;

    let xs: Vec<f64> = (0..16).map(|i| i as f64 / 16.0).collect();
    let ys: Vec<f64> = xs.iter().map(|x| x * x).collect();
    let batch = Dataset::from_flat(xs, ys, 1, 1)?;

    for round in 0..100 {
        let sse = net.train(&batch)?;
        if round % 20 == 0 {
            println!("round {round:>3}: sse={sse:.6}");
        }
    }
    Ok(())
}
