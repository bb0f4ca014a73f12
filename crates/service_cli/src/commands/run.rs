//! Run command implementation
//!
//! Simulates every client in a batch file and writes one risk report each.

use std::path::Path;
use std::sync::Arc;
use tracing::info;
use wealth_core::types::{ClientProfile, Goal};
use wealth_models::sampler::ReturnModel;
use wealth_risk::report::{RiskAnalyser, RiskReport};
use wealth_simulation::engine::PathSimulator;
use wealth_simulation::state::InitialPortfolio;

use crate::config::CliConfig;
use crate::input::BatchInput;
use crate::{CliError, Result};

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Box-drawn summary table
    Table,
    /// Pretty-printed JSON reports
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(CliError::InvalidArgument(format!(
                "Unknown format: {other}. Supported: table, json"
            ))),
        }
    }
}

/// Simulates `clients` and builds their risk reports in batch order.
pub fn simulate_and_analyse(
    config: &CliConfig,
    model: Arc<ReturnModel>,
    clients: &[(ClientProfile, InitialPortfolio)],
) -> Result<Vec<RiskReport>> {
    let simulator = PathSimulator::new(config.simulation.clone(), Arc::clone(&model))?;
    let outcomes = simulator.simulate_batch(clients)?;

    let base = RiskAnalyser::new(config.simulation.confidence_levels.clone())
        .with_risk_free_rate(config.report.risk_free_rate)
        .with_model(&model)
        .with_stresses(config.report.stress_presets.iter().map(|p| p.scenario()));

    outcomes
        .iter()
        .zip(clients)
        .map(|(outcome, (client, _))| {
            let goals: Vec<Goal> = if config.report.goals {
                client.goals.clone()
            } else {
                Vec::new()
            };
            Ok(base.clone().with_goals(goals).analyse(outcome)?)
        })
        .collect()
}

/// Run the run command
pub fn run(config: &CliConfig, input: &str, output: Option<&str>, format: &str) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    info!("Starting batch run...");
    info!("  Input: {}", input);
    info!("  Scenarios: {}", config.simulation.num_scenarios);
    info!("  Periods: {}", config.simulation.num_periods);
    info!("  Seed: {}", config.simulation.random_seed);

    let batch = BatchInput::load(Path::new(input))?;
    let model = batch.market.build_model(config.simulation.periods_per_year)?;
    let reports = simulate_and_analyse(config, model, &batch.client_pairs())?;

    if let Some(path) = output {
        let file = std::fs::File::create(path).map_err(|e| CliError::io(path, e))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), &reports)?;
        info!("Reports written to {}", path);
    }

    match format {
        OutputFormat::Table => print_table(&reports),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    info!("Batch run complete");
    Ok(())
}

/// Prints a per-client summary table followed by stress and goal details.
pub fn print_table(reports: &[RiskReport]) {
    println!("\n┌────────────┬──────────────┬──────────────┬──────────────┬──────────────┬─────────┬───────┐");
    println!("│ Client     │ Initial      │ Mean final   │ VaR          │ CVaR         │ Max DD  │ ESG   │");
    println!("├────────────┼──────────────┼──────────────┼──────────────┼──────────────┼─────────┼───────┤");
    for r in reports {
        let (var, cvar) = r
            .var
            .first()
            .map_or((f64::NAN, f64::NAN), |v| (v.historical_var, v.cvar));
        let esg = r
            .esg_rating
            .map_or_else(|| "-".to_string(), |rating| rating.to_string());
        println!(
            "│ {:<10} │ {:>12.0} │ {:>12.0} │ {:>12.0} │ {:>12.0} │ {:>6.1}% │ {:<5} │",
            r.client_id.as_str(),
            r.initial_value,
            r.final_value.mean,
            var,
            cvar,
            r.drawdown.worst_max_drawdown * 100.0,
            esg,
        );
    }
    println!("└────────────┴──────────────┴──────────────┴──────────────┴──────────────┴─────────┴───────┘");

    for r in reports {
        println!("\n{} ({} paths, {} excluded)", r.client_id, r.num_paths, r.excluded_count());
        for v in &r.var {
            println!(
                "  VaR {:>4.1}%: historical {:>12.0}  normal {:>12.0}  cornish-fisher {:>12.0}",
                v.confidence_level * 100.0,
                v.historical_var,
                v.normal_var,
                v.cornish_fisher_var
            );
        }
        match r.performance.mean_sharpe_ratio {
            Some(sharpe) => println!(
                "  Return {:>6.2}% p.a.  vol {:>6.2}%  Sharpe {:>5.2}",
                r.performance.mean_annualised_return * 100.0,
                r.performance.mean_annualised_volatility * 100.0,
                sharpe
            ),
            None => println!(
                "  Return {:>6.2}% p.a.  vol {:>6.2}%",
                r.performance.mean_annualised_return * 100.0,
                r.performance.mean_annualised_volatility * 100.0
            ),
        }
        println!(
            "  Costs {:.0}  fees {:.0}  tax {:.0}  shortfall {:.1}%  fallbacks {:.2}",
            r.frictions.mean_costs,
            r.frictions.mean_fees,
            r.frictions.mean_taxes,
            r.frictions.shortfall_frequency * 100.0,
            r.frictions.mean_fallbacks
        );
        for s in &r.stress {
            println!(
                "  Stress {:<18} mean loss {:>12.0} ({:>5.1}%)",
                s.scenario,
                s.mean_loss,
                s.mean_loss_fraction * 100.0
            );
        }
        for g in &r.goals {
            println!(
                "  Goal {:<12} P(reach {:.0} by period {}) = {:.1}%",
                g.goal_id,
                g.target_amount,
                g.evaluated_period,
                g.probability * 100.0
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wealth_core::math::Matrix;
    use wealth_core::types::{Asset, AssetClass, Universe};
    use wealth_models::factor::{FactorModel, PsdPolicy};
    use wealth_models::regime::RegimeSwitching;

    fn model() -> Arc<ReturnModel> {
        let universe = Arc::new(
            Universe::new(vec![
                Asset::new("EQ", AssetClass::Equity, 0.08, 0.15).with_exposures(vec![1.0, 0.0]),
                Asset::new("BOND", AssetClass::FixedIncome, 0.03, 0.05)
                    .with_exposures(vec![0.0, 1.0]),
            ])
            .unwrap(),
        );
        let factors = FactorModel::from_universe(
            &universe,
            vec!["equity".into(), "rates".into()],
            Matrix::from_rows(vec![vec![0.0225, 0.00075], vec![0.00075, 0.0025]]).unwrap(),
            PsdPolicy::Reject,
        )
        .unwrap();
        Arc::new(ReturnModel::new(universe, factors, RegimeSwitching::calm(), 12).unwrap())
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!(matches!(
            "csv".parse::<OutputFormat>(),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_one_report_per_client_in_order() {
        let mut config = CliConfig::default();
        config.simulation.num_scenarios = 20;
        let clients = vec![
            (
                ClientProfile::new("A", 500_000.0, 3.0).with_goal(Goal::new("G", 400_000.0, 12)),
                InitialPortfolio::from_weights(500_000.0, [("EQ", 0.3), ("BOND", 0.7)]),
            ),
            (
                ClientProfile::new("B", 2_000_000.0, 8.0),
                InitialPortfolio::from_weights(2_000_000.0, [("EQ", 0.8), ("BOND", 0.2)]),
            ),
        ];
        let reports = simulate_and_analyse(&config, model(), &clients).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].client_id.as_str(), "A");
        assert_eq!(reports[1].client_id.as_str(), "B");
        assert_eq!(reports[0].goals.len(), 1);
        assert!(reports[1].goals.is_empty());
        assert_eq!(reports[0].stress.len(), 4);
        assert_eq!(reports[0].var.len(), 2);
    }
}
