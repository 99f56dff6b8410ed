//! Quadratic fuel-cost curves and their piecewise-linear approximation.
//!
//! A thermal unit's hourly cost is modelled as `a·P² + b·P + c`. Linear
//! solvers cannot price a curve directly, so the rated range `[0, Pmax]` is
//! cut into equal-width blocks, each priced at the curve's slope at the
//! block midpoint. The unit's minimum output `Pmin` is then poured into the
//! blocks from the cheapest upward, so the lower blocks become must-run.
//!
//! ```
//! use dispatch_core::cost::{QuadraticCost, SingleSegmentCost};
//! use dispatch_core::units::Megawatts;
//!
//! let cost = QuadraticCost::new(0.01, 5.0, 0.0);
//! let blocks = cost.linearize(Megawatts(100.0), Megawatts(20.0), 2, SingleSegmentCost::default());
//!
//! assert_eq!(blocks.len(), 2);
//! assert!((blocks[0].p_min_pu.value() - 0.4).abs() < 1e-12);
//! assert!((blocks[1].marginal_cost.value() - 6.5).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};

use crate::units::{CostPerMwh, Megawatts, PerUnit};

/// Convex cost curve `a·P² + b·P + c` (currency/h with P in MW)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuadraticCost {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// Pricing rule for a generator linearized into a single block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SingleSegmentCost {
    /// Price the block at `b`, ignoring the quadratic term
    #[default]
    LinearTerm,
    /// Price the block at the curve's slope at `Pmax / 2`
    Midpoint,
}

/// One linear capacity block of a generator
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBlock {
    /// 1-based position of the block within its generator
    pub segment: usize,
    pub p_nom: Megawatts,
    pub p_min_pu: PerUnit,
    pub marginal_cost: CostPerMwh,
}

impl CostBlock {
    /// Must-run output of this block
    pub fn p_min(&self) -> Megawatts {
        self.p_nom * self.p_min_pu.value()
    }
}

impl QuadraticCost {
    pub fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Hourly cost at output `p`
    pub fn evaluate(&self, p: Megawatts) -> f64 {
        let p = p.value();
        self.a * p * p + self.b * p + self.c
    }

    /// Slope of the curve at output `p`
    pub fn marginal_cost(&self, p: Megawatts) -> CostPerMwh {
        CostPerMwh(2.0 * self.a * p.value() + self.b)
    }

    /// Split `[0, pmax]` into `segments` blocks and distribute `pmin` across them.
    ///
    /// A NaN `pmax` yields no blocks. `segments` is expected to have gone
    /// through [`normalize_segments`]; a zero is treated as one.
    pub fn linearize(
        &self,
        pmax: Megawatts,
        pmin: Megawatts,
        segments: usize,
        single: SingleSegmentCost,
    ) -> Vec<CostBlock> {
        if pmax.is_nan() {
            return Vec::new();
        }

        let segments = segments.max(1);
        if segments == 1 {
            return vec![self.single_block(pmax, pmin, single)];
        }

        let step = pmax / segments as f64;
        let mut remaining = pmin.value();
        let mut blocks = Vec::with_capacity(segments);

        for i in 0..segments {
            let block_min = step.value().min(remaining).max(0.0);
            remaining -= block_min;

            let p_min_pu = if step.value() > 0.0 {
                block_min / step.value()
            } else {
                0.0
            };
            let midpoint = step * (i as f64 + 0.5);

            blocks.push(CostBlock {
                segment: i + 1,
                p_nom: step,
                p_min_pu: PerUnit(p_min_pu),
                marginal_cost: self.marginal_cost(midpoint),
            });
        }

        blocks
    }

    fn single_block(&self, pmax: Megawatts, pmin: Megawatts, rule: SingleSegmentCost) -> CostBlock {
        let fraction = if pmax.value() > 0.0 {
            (pmin / pmax).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let marginal_cost = match rule {
            SingleSegmentCost::LinearTerm => CostPerMwh(self.b),
            SingleSegmentCost::Midpoint => self.marginal_cost(pmax / 2.0),
        };

        CostBlock {
            segment: 1,
            p_nom: pmax,
            p_min_pu: PerUnit(fraction),
            marginal_cost,
        }
    }
}

/// Turn a raw segment-count cell into a usable block count.
///
/// NaN, infinite and sub-one values become 1; fractional counts truncate.
pub fn normalize_segments(raw: f64) -> usize {
    if !raw.is_finite() || raw < 1.0 {
        return 1;
    }
    raw.trunc() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn linearize(a: f64, b: f64, pmax: f64, pmin: f64, segments: usize) -> Vec<CostBlock> {
        QuadraticCost::new(a, b, 0.0).linearize(
            Megawatts(pmax),
            Megawatts(pmin),
            segments,
            SingleSegmentCost::LinearTerm,
        )
    }

    #[test]
    fn two_blocks_split_minimum_into_first_block() {
        let blocks = linearize(0.01, 5.0, 100.0, 20.0, 2);

        assert_eq!(blocks.len(), 2);
        assert!((blocks[0].p_nom.value() - 50.0).abs() < TOL);
        assert!((blocks[0].p_min_pu.value() - 0.4).abs() < TOL);
        assert!((blocks[0].marginal_cost.value() - 5.5).abs() < TOL);

        assert!((blocks[1].p_nom.value() - 50.0).abs() < TOL);
        assert!(blocks[1].p_min_pu.value().abs() < TOL);
        assert!((blocks[1].marginal_cost.value() - 6.5).abs() < TOL);
    }

    #[test]
    fn minimum_spills_over_several_blocks() {
        let blocks = linearize(0.02, 10.0, 120.0, 70.0, 4);

        let fractions: Vec<f64> = blocks.iter().map(|b| b.p_min_pu.value()).collect();
        assert!((fractions[0] - 1.0).abs() < TOL);
        assert!((fractions[1] - 1.0).abs() < TOL);
        assert!((fractions[2] - 10.0 / 30.0).abs() < TOL);
        assert!(fractions[3].abs() < TOL);

        let capacity: Megawatts = blocks.iter().map(|b| b.p_nom).sum();
        let floor: Megawatts = blocks.iter().map(|b| b.p_min()).sum();
        assert!((capacity.value() - 120.0).abs() < TOL);
        assert!((floor.value() - 70.0).abs() < TOL);
    }

    #[test]
    fn minimum_above_rating_saturates_every_block() {
        let blocks = linearize(0.0, 8.0, 60.0, 90.0, 3);

        assert!(blocks.iter().all(|b| (b.p_min_pu.value() - 1.0).abs() < TOL));
        let floor: Megawatts = blocks.iter().map(|b| b.p_min()).sum();
        assert!((floor.value() - 60.0).abs() < TOL);
    }

    #[test]
    fn marginal_costs_rise_for_convex_curves() {
        let blocks = linearize(0.05, 3.0, 200.0, 0.0, 5);

        for pair in blocks.windows(2) {
            assert!(pair[1].marginal_cost >= pair[0].marginal_cost);
        }
        let segments: Vec<usize> = blocks.iter().map(|b| b.segment).collect();
        assert_eq!(segments, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn single_segment_uses_linear_term_by_default() {
        let blocks = linearize(0.01, 5.0, 100.0, 20.0, 1);

        assert_eq!(blocks.len(), 1);
        assert!((blocks[0].p_nom.value() - 100.0).abs() < TOL);
        assert!((blocks[0].p_min_pu.value() - 0.2).abs() < TOL);
        assert!((blocks[0].marginal_cost.value() - 5.0).abs() < TOL);
    }

    #[test]
    fn single_segment_midpoint_policy_prices_quadratic_term() {
        let blocks = QuadraticCost::new(0.01, 5.0, 0.0).linearize(
            Megawatts(100.0),
            Megawatts(0.0),
            1,
            SingleSegmentCost::Midpoint,
        );

        assert!((blocks[0].marginal_cost.value() - 6.0).abs() < TOL);
    }

    #[test]
    fn zero_rating_guards_division() {
        let single = linearize(0.01, 5.0, 0.0, 10.0, 1);
        assert_eq!(single[0].p_min_pu, PerUnit::ZERO);

        let split = linearize(0.01, 5.0, 0.0, 10.0, 3);
        assert_eq!(split.len(), 3);
        assert!(split.iter().all(|b| b.p_min_pu == PerUnit::ZERO));
    }

    #[test]
    fn nan_rating_produces_no_blocks() {
        assert!(linearize(0.01, 5.0, f64::NAN, 10.0, 2).is_empty());
    }

    #[test]
    fn zero_segments_behave_like_one() {
        let blocks = linearize(0.0, 5.0, 40.0, 0.0, 0);
        assert_eq!(blocks.len(), 1);
        assert!((blocks[0].p_nom.value() - 40.0).abs() < TOL);
    }

    #[test]
    fn normalize_segments_handles_bad_counts() {
        assert_eq!(normalize_segments(f64::NAN), 1);
        assert_eq!(normalize_segments(f64::INFINITY), 1);
        assert_eq!(normalize_segments(0.0), 1);
        assert_eq!(normalize_segments(-3.0), 1);
        assert_eq!(normalize_segments(3.7), 3);
        assert_eq!(normalize_segments(1500.0), 1500);
    }

    #[test]
    fn large_segment_counts_are_honoured() {
        let blocks = linearize(0.01, 5.0, 3000.0, 0.0, 1500);

        assert_eq!(blocks.len(), 1500);
        assert_eq!(blocks.last().map(|b| b.segment), Some(1500));
        let total: f64 = blocks.iter().map(|b| b.p_nom.value()).sum();
        assert!((total - 3000.0).abs() < 1e-6);
    }

    #[test]
    fn evaluate_includes_constant_term() {
        let cost = QuadraticCost::new(0.01, 5.0, 100.0);
        assert!((cost.evaluate(Megawatts(100.0)) - 700.0).abs() < TOL);
        assert!((cost.marginal_cost(Megawatts(50.0)).value() - 6.0).abs() < TOL);
    }
}
