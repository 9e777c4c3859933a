use anyhow::Result;
use campus_utility_analytics::{analytics::AnalyticsEngine, config, simulation, telemetry};
use config::Config;
use simulation::TelemetrySimulator;
use telemetry::init_tracing;
use tracing::{info, warn};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cfg = Config::load()?;

    let mut simulator = TelemetrySimulator::from_config(&cfg.simulator);
    let corpus = simulator.generate_historical(cfg.simulator.historical_days);
    info!(
        days = cfg.simulator.historical_days,
        records = corpus.len(),
        "historical corpus generated"
    );

    let engine = AnalyticsEngine::fit_all(&corpus, &cfg)?;

    match engine.detector().evaluate(&corpus) {
        Ok(metrics) => info!(
            precision = metrics.precision,
            recall = metrics.recall,
            f1 = metrics.f1,
            "anomaly detector validated against simulator labels"
        ),
        Err(e) => warn!(error = %e, "skipping detector validation"),
    }

    let snapshot = engine.snapshot(&mut simulator, cfg.simulator.realtime_hours);
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    info!("snapshot complete");
    Ok(())
}
