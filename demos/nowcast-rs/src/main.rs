mod parameters;
mod summary;

use std::io;

use backcast::Simulator;
use parameters::Parameters;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let params: Parameters = match serde_json::from_reader(io::stdin()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: failed to parse parameters from stdin: {e}");
            std::process::exit(1);
        }
    };

    let simulator = match Simulator::new(params.to_config()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let output = match simulator.simulate(&params.deaths) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut wtr = csv::Writer::from_writer(io::stdout());
    wtr.write_record(["date", "mean", "median", "q2.5", "q25", "q75", "q97.5"])
        .unwrap();
    for row in summary::summarize(&output.ensemble) {
        wtr.write_record([
            row.date.to_string(),
            format!("{:.2}", row.mean),
            format!("{:.1}", row.median),
            format!("{:.1}", row.q2_5),
            format!("{:.1}", row.q25),
            format!("{:.1}", row.q75),
            format!("{:.1}", row.q97_5),
        ])
        .unwrap();
    }
    wtr.flush().unwrap();
}
