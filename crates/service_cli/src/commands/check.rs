//! Check command: environment and configuration diagnostics.

use tracing::info;
use wealth_core::types::AssetClass;

use crate::commands::demo::demo_model;
use crate::config::CliConfig;
use crate::Result;

/// Prints the effective configuration and verifies the engine end to end.
pub fn run(config: &CliConfig, config_path: &str) -> Result<()> {
    info!("Checking system configuration...");

    println!("System");
    println!("  Logical CPUs:     {}", num_cpus::get());
    println!("  Physical CPUs:    {}", num_cpus::get_physical());
    println!("  Rayon threads:    {}", rayon::current_num_threads());
    println!();

    let sim = &config.simulation;
    println!("Configuration ({config_path})");
    println!("  Log level:        {}", config.log_level);
    match sim.num_clients {
        Some(cap) => println!("  Clients:          first {cap} per batch"),
        None => println!("  Clients:          all in batch"),
    }
    println!("  Scenarios:        {}", sim.num_scenarios);
    println!("  Periods:          {} ({} per year)", sim.num_periods, sim.periods_per_year);
    println!("  Seed:             {}", sim.random_seed);
    println!("  Confidence:       {:?}", sim.confidence_levels);
    println!("  Rebalance:        {:?}", sim.rebalance);
    println!("  Risk-free rate:   {:.2}%", config.report.risk_free_rate * 100.0);
    println!(
        "  Stress presets:   {}",
        config
            .report
            .stress_presets
            .iter()
            .map(|p| p.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    let model = demo_model(sim.periods_per_year)?;
    let classes: Vec<&str> = model
        .universe()
        .classes()
        .iter()
        .map(AssetClass::name)
        .collect();
    println!("Engine");
    println!(
        "  Sample model:     {} assets [{}], {} factors",
        model.universe().len(),
        classes.join(", "),
        model.factor_model().n_factors()
    );
    println!("  Status:           OK");

    info!("Check complete");
    Ok(())
}
