//! Lot-level capital-gains tax.
//!
//! Sales consume lots highest-cost-first (HIFO). Realised gains accumulate
//! through the tax year as short- or long-term according to the holding
//! period, and are settled at year end after netting against the loss
//! carryforward. A net loss becomes the new carryforward, stored as a
//! non-positive number.

use serde::{Deserialize, Serialize};

/// Quantity bought at one price on one period.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxLot {
    /// Units held
    pub quantity: f64,
    /// Cost basis per unit
    pub cost_per_unit: f64,
    /// Period of acquisition
    pub acquired_period: usize,
}

impl TaxLot {
    /// Total cost basis of the lot.
    #[inline]
    pub fn cost_basis(&self) -> f64 {
        self.quantity * self.cost_per_unit
    }
}

/// Realised gains split by holding period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RealisedGains {
    /// Gains on lots held shorter than the long-term threshold
    pub short_term: f64,
    /// Gains on lots held at least the long-term threshold
    pub long_term: f64,
}

impl RealisedGains {
    /// Net realised gain.
    #[inline]
    pub fn total(&self) -> f64 {
        self.short_term + self.long_term
    }
}

impl std::ops::AddAssign for RealisedGains {
    fn add_assign(&mut self, rhs: Self) {
        self.short_term += rhs.short_term;
        self.long_term += rhs.long_term;
    }
}

/// Tax owed at a year-end settlement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxSettlement {
    /// Tax payable from cash
    pub tax: f64,
    /// Carryforward after settlement (≤ 0)
    pub carryforward: f64,
}

/// Capital-gains tax rules.
///
/// # Examples
///
/// ```
/// use wealth_simulation::tax::{RealisedGains, TaxPolicy};
///
/// let policy = TaxPolicy::default();
/// let gains = RealisedGains { short_term: 10_000.0, long_term: 20_000.0 };
/// // 5,000 of carried-forward losses offset short-term gains first
/// let settlement = policy.settle(gains, -5_000.0);
/// assert!((settlement.tax - (5_000.0 * 0.37 + 20_000.0 * 0.20)).abs() < 1e-9);
/// assert_eq!(settlement.carryforward, 0.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxPolicy {
    /// Whether gains are taxed at all
    pub enabled: bool,
    /// Rate on short-term gains
    pub short_term_rate: f64,
    /// Rate on long-term gains
    pub long_term_rate: f64,
    /// Holding period (in periods) from which gains are long-term; one year when unset
    pub long_term_periods: Option<usize>,
    /// Realise sufficiently large losses before year end
    pub harvest_losses: bool,
    /// Minimum loss, as a fraction of the lot's cost, for harvesting
    pub harvest_threshold: f64,
}

impl Default for TaxPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            short_term_rate: 0.37,
            long_term_rate: 0.20,
            long_term_periods: None,
            harvest_losses: false,
            harvest_threshold: 0.05,
        }
    }
}

impl TaxPolicy {
    /// No capital-gains tax.
    pub fn exempt() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Enables tax-loss harvesting at `threshold`.
    pub fn with_harvesting(mut self, threshold: f64) -> Self {
        self.harvest_losses = true;
        self.harvest_threshold = threshold;
        self
    }

    /// Long-term holding threshold in periods.
    #[inline]
    pub fn long_term_threshold(&self, periods_per_year: usize) -> usize {
        self.long_term_periods.unwrap_or(periods_per_year)
    }

    /// Nets `realised` against `carryforward` and computes the tax due.
    ///
    /// Losses offset gains of the same term first, then the other term;
    /// the carryforward is applied to short-term gains before long-term.
    pub fn settle(&self, realised: RealisedGains, carryforward: f64) -> TaxSettlement {
        let mut short = realised.short_term;
        let mut long = realised.long_term;
        if short < 0.0 && long > 0.0 {
            let offset = (-short).min(long);
            long -= offset;
            short += offset;
        } else if long < 0.0 && short > 0.0 {
            let offset = (-long).min(short);
            short -= offset;
            long += offset;
        }

        let mut loss = -carryforward.min(0.0);
        let applied = loss.min(short.max(0.0));
        short -= applied;
        loss -= applied;
        let applied = loss.min(long.max(0.0));
        long -= applied;
        loss -= applied;

        let net_loss = short.min(0.0) + long.min(0.0);
        let tax = if self.enabled {
            short.max(0.0) * self.short_term_rate + long.max(0.0) * self.long_term_rate
        } else {
            0.0
        };
        TaxSettlement {
            tax,
            carryforward: -loss + net_loss,
        }
    }

    /// Validates rates.
    pub fn validate(&self) -> Result<(), String> {
        for (name, rate) in [
            ("short_term_rate", self.short_term_rate),
            ("long_term_rate", self.long_term_rate),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return Err(format!("{name} must lie in [0, 1)"));
            }
        }
        if !(0.0..1.0).contains(&self.harvest_threshold) {
            return Err("harvest_threshold must lie in [0, 1)".into());
        }
        if self.long_term_periods == Some(0) {
            return Err("long_term_periods must be positive".into());
        }
        Ok(())
    }
}

/// Sells `quantity` units from `lots` at `price`, highest cost first.
///
/// Lots are consumed in place; emptied lots are removed. Returns the
/// realised gains. Selling more than is held sells everything.
pub fn sell_hifo(
    lots: &mut Vec<TaxLot>,
    quantity: f64,
    price: f64,
    period: usize,
    long_term_periods: usize,
) -> RealisedGains {
    lots.sort_by(|a, b| b.cost_per_unit.total_cmp(&a.cost_per_unit));
    let mut remaining = quantity.max(0.0);
    let mut gains = RealisedGains::default();
    for lot in lots.iter_mut() {
        if remaining <= 0.0 {
            break;
        }
        let sold = remaining.min(lot.quantity);
        let gain = sold * (price - lot.cost_per_unit);
        if period.saturating_sub(lot.acquired_period) >= long_term_periods {
            gains.long_term += gain;
        } else {
            gains.short_term += gain;
        }
        lot.quantity -= sold;
        remaining -= sold;
    }
    lots.retain(|lot| lot.quantity > 1e-12);
    gains
}

/// Realises every lot whose unrealised loss exceeds `threshold` of its cost
/// and re-establishes it at `price`.
///
/// The position keeps its quantity; only the cost basis and acquisition
/// period of harvested lots change.
pub fn harvest_losses(
    lots: &mut [TaxLot],
    price: f64,
    period: usize,
    long_term_periods: usize,
    threshold: f64,
) -> RealisedGains {
    let mut gains = RealisedGains::default();
    for lot in lots.iter_mut() {
        if lot.cost_per_unit <= 0.0 {
            continue;
        }
        let loss_fraction = 1.0 - price / lot.cost_per_unit;
        if loss_fraction > threshold {
            let gain = lot.quantity * (price - lot.cost_per_unit);
            if period.saturating_sub(lot.acquired_period) >= long_term_periods {
                gains.long_term += gain;
            } else {
                gains.short_term += gain;
            }
            lot.cost_per_unit = price;
            lot.acquired_period = period;
        }
    }
    gains
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lots() -> Vec<TaxLot> {
        vec![
            TaxLot {
                quantity: 100.0,
                cost_per_unit: 10.0,
                acquired_period: 0,
            },
            TaxLot {
                quantity: 100.0,
                cost_per_unit: 14.0,
                acquired_period: 10,
            },
            TaxLot {
                quantity: 100.0,
                cost_per_unit: 12.0,
                acquired_period: 5,
            },
        ]
    }

    #[test]
    fn test_hifo_sells_highest_cost_first() {
        let mut lots = lots();
        let gains = sell_hifo(&mut lots, 150.0, 13.0, 14, 12);
        // 100 @ 14 (short-term, held 4) and 50 @ 12 (short-term, held 9)
        assert_relative_eq!(gains.short_term, 100.0 * -1.0 + 50.0 * 1.0);
        assert_eq!(gains.long_term, 0.0);
        assert_eq!(lots.len(), 2);
        let remaining: f64 = lots.iter().map(|l| l.quantity).sum();
        assert_relative_eq!(remaining, 150.0);
    }

    #[test]
    fn test_long_term_classification() {
        let mut lots = lots();
        let gains = sell_hifo(&mut lots, 300.0, 15.0, 12, 12);
        assert_relative_eq!(gains.long_term, 100.0 * 5.0);
        assert_relative_eq!(gains.short_term, 100.0 * 1.0 + 100.0 * 3.0);
        assert!(lots.is_empty());
    }

    #[test]
    fn test_settle_creates_carryforward() {
        let policy = TaxPolicy::default();
        let s = policy.settle(
            RealisedGains {
                short_term: -30_000.0,
                long_term: 10_000.0,
            },
            -5_000.0,
        );
        assert_eq!(s.tax, 0.0);
        assert_relative_eq!(s.carryforward, -25_000.0);
    }

    #[test]
    fn test_settle_consumes_carryforward() {
        let policy = TaxPolicy::default();
        let s = policy.settle(
            RealisedGains {
                short_term: 0.0,
                long_term: 10_000.0,
            },
            -25_000.0,
        );
        assert_eq!(s.tax, 0.0);
        assert_relative_eq!(s.carryforward, -15_000.0);
        assert!(s.carryforward <= 0.0);
    }

    #[test]
    fn test_exempt_policy_still_tracks_losses() {
        let s = TaxPolicy::exempt().settle(
            RealisedGains {
                short_term: -1_000.0,
                long_term: 0.0,
            },
            0.0,
        );
        assert_eq!(s.tax, 0.0);
        assert_relative_eq!(s.carryforward, -1_000.0);
    }

    #[test]
    fn test_harvest_resets_basis() {
        let mut lots = lots();
        let gains = harvest_losses(&mut lots, 11.0, 12, 12, 0.05);
        // lots at 14 and 12 are more than 5% under water; the 10 lot is in profit
        assert_relative_eq!(gains.short_term, 100.0 * -3.0 + 100.0 * -1.0);
        assert!(lots.iter().all(|l| l.cost_per_unit <= 11.0));
        assert_eq!(lots.iter().filter(|l| l.acquired_period == 12).count(), 2);
    }
}
