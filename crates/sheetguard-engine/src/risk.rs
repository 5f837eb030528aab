//! LOW / MEDIUM / HIGH risk tiers for a sheet or the whole workbook.
//!
//! A scope with a cycle is HIGH whenever `overrides.cycle_always_high` is on
//! (the default). Otherwise one of two strategies decides: weighted scoring
//! when the scope's config carries both `thresholds` and `weights`, or the
//! boolean rules fallback.

use std::fmt;

use serde::Serialize;

use crate::config::ConfigTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskScope {
    Sheet,
    Workbook,
}

impl RiskScope {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskScope::Sheet => "sheet",
            RiskScope::Workbook => "workbook",
        }
    }
}

/// Signal counts for one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalCounts {
    pub has_cycles: bool,
    pub top_risk_cells: usize,
    pub volatile: usize,
    pub symbolic: usize,
    pub constants: usize,
    pub orphans: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierAssessment {
    pub tier: RiskTier,
    /// Empty when no signal contributed.
    pub reason: String,
}

impl TierAssessment {
    fn new(tier: RiskTier, reason: impl Into<String>) -> Self {
        Self {
            tier,
            reason: reason.into(),
        }
    }
}

pub trait TierStrategy {
    fn score(&self, signals: &SignalCounts) -> TierAssessment;
}

/// Threshold used when a configured threshold is missing or zero.
pub const UNREACHABLE_THRESHOLD: f64 = 999_999.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Weights {
    pub cycles: f64,
    pub top_risk_cells: f64,
    pub volatile_hits: f64,
    pub hardcoded_constants: f64,
    pub orphan_formulas: f64,
    pub symbolic_refs_per_100: f64,
}

impl Weights {
    fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            cycles: tree.f64_or_zero("cycles"),
            top_risk_cells: tree.f64_or_zero("top_risk_cells"),
            volatile_hits: tree.f64_or_zero("volatile_hits"),
            hardcoded_constants: tree.f64_or_zero("hardcoded_constants"),
            orphan_formulas: tree.f64_or_zero("orphan_formulas"),
            symbolic_refs_per_100: tree.f64_or_zero("symbolic_refs_per_100"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScoring {
    pub weights: Weights,
    pub high: f64,
    pub medium: f64,
}

impl WeightedScoring {
    fn contributions(&self, s: &SignalCounts) -> [(&'static str, f64); 6] {
        let w = &self.weights;
        [
            ("circular dependency", w.cycles * if s.has_cycles { 1.0 } else { 0.0 }),
            ("high-impact drivers", w.top_risk_cells * s.top_risk_cells as f64),
            ("volatile functions", w.volatile_hits * s.volatile as f64),
            ("embedded multipliers", w.hardcoded_constants * s.constants as f64),
            ("orphan formulas", w.orphan_formulas * s.orphans as f64),
            ("symbolic references", w.symbolic_refs_per_100 * (s.symbolic as f64 / 100.0)),
        ]
    }
}

impl TierStrategy for WeightedScoring {
    fn score(&self, signals: &SignalCounts) -> TierAssessment {
        let contributions = self.contributions(signals);
        let score: f64 = contributions.iter().map(|(_, v)| v).sum();

        let tier = if score >= self.high {
            RiskTier::High
        } else if score >= self.medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        };

        let mut ranked: Vec<(&str, f64)> =
            contributions.into_iter().filter(|(_, v)| *v > 0.0).collect();
        // stable: equal contributions keep declaration order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let reason = ranked
            .iter()
            .take(3)
            .map(|(label, _)| *label)
            .collect::<Vec<_>>()
            .join("; ");
        TierAssessment::new(tier, reason)
    }
}

/// Boolean fallback: cycles make HIGH, any enabled signal makes MEDIUM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanRules {
    pub cycles_make_high: bool,
    pub top_risk_counts_as_medium: bool,
    pub volatile_counts_as_medium: bool,
    pub symbolic_counts_as_medium: bool,
    pub constants_counts_as_medium: bool,
    pub orphans_counts_as_medium: bool,
}

impl Default for BooleanRules {
    fn default() -> Self {
        Self {
            cycles_make_high: true,
            top_risk_counts_as_medium: true,
            volatile_counts_as_medium: true,
            symbolic_counts_as_medium: true,
            constants_counts_as_medium: true,
            orphans_counts_as_medium: true,
        }
    }
}

impl BooleanRules {
    fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            cycles_make_high: tree.bool_or("cycles_make_high", true),
            top_risk_counts_as_medium: tree.bool_or("top_risk_counts_as_medium", true),
            volatile_counts_as_medium: tree.bool_or("volatile_counts_as_medium", true),
            symbolic_counts_as_medium: tree.bool_or("symbolic_counts_as_medium", true),
            constants_counts_as_medium: tree.bool_or("constants_counts_as_medium", true),
            orphans_counts_as_medium: tree.bool_or("orphans_counts_as_medium", true),
        }
    }
}

impl TierStrategy for BooleanRules {
    fn score(&self, s: &SignalCounts) -> TierAssessment {
        let medium = (self.top_risk_counts_as_medium && s.top_risk_cells > 0)
            || (self.volatile_counts_as_medium && s.volatile > 0)
            || (self.symbolic_counts_as_medium && s.symbolic > 0)
            || (self.constants_counts_as_medium && s.constants > 0)
            || (self.orphans_counts_as_medium && s.orphans > 0);
        let tier = if self.cycles_make_high && s.has_cycles {
            RiskTier::High
        } else if medium {
            RiskTier::Medium
        } else {
            RiskTier::Low
        };

        let mut bits = Vec::new();
        if s.has_cycles {
            bits.push("circular dependency".to_string());
        }
        if s.top_risk_cells > 0 {
            bits.push(format!("{} high-impact cell(s)", s.top_risk_cells));
        }
        if s.volatile > 0 {
            bits.push(format!("{} volatile hit(s)", s.volatile));
        }
        if s.symbolic > 0 {
            bits.push(format!("{} symbolic ref(s)", s.symbolic));
        }
        if s.constants > 0 {
            bits.push(format!("{} embedded constant(s)", s.constants));
        }
        if s.orphans > 0 {
            bits.push(format!("{} orphan formula(s)", s.orphans));
        }
        TierAssessment::new(tier, bits.join("; "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScopeStrategy {
    Weighted(WeightedScoring),
    Rules(BooleanRules),
}

impl ScopeStrategy {
    /// `scope` is the `sheet` or `workbook` block of `risk_scoring`.
    fn from_tree(scope: &ConfigTree) -> Self {
        if scope.is_object("thresholds") && scope.is_object("weights") {
            ScopeStrategy::Weighted(WeightedScoring {
                weights: Weights::from_tree(&scope.subtree("weights")),
                high: scope.f64_or("thresholds.high", UNREACHABLE_THRESHOLD),
                medium: scope.f64_or("thresholds.medium", UNREACHABLE_THRESHOLD),
            })
        } else {
            ScopeStrategy::Rules(BooleanRules::from_tree(scope))
        }
    }

    pub fn as_strategy(&self) -> &dyn TierStrategy {
        match self {
            ScopeStrategy::Weighted(w) => w,
            ScopeStrategy::Rules(r) => r,
        }
    }
}

impl Default for ScopeStrategy {
    fn default() -> Self {
        ScopeStrategy::Rules(BooleanRules::default())
    }
}

pub const CYCLE_OVERRIDE_REASON: &str = "circular dependency detected";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScoringConfig {
    pub cycle_always_high: bool,
    pub sheet: ScopeStrategy,
    pub workbook: ScopeStrategy,
}

impl RiskScoringConfig {
    /// Build from the `app.reporting.risk_scoring` subtree.
    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            cycle_always_high: tree.bool_or("overrides.cycle_always_high", true),
            sheet: ScopeStrategy::from_tree(&tree.subtree(RiskScope::Sheet.as_str())),
            workbook: ScopeStrategy::from_tree(&tree.subtree(RiskScope::Workbook.as_str())),
        }
    }

    pub fn strategy(&self, scope: RiskScope) -> &ScopeStrategy {
        match scope {
            RiskScope::Sheet => &self.sheet,
            RiskScope::Workbook => &self.workbook,
        }
    }

    pub fn assess(&self, scope: RiskScope, signals: &SignalCounts) -> TierAssessment {
        if self.cycle_always_high && signals.has_cycles {
            return TierAssessment::new(RiskTier::High, CYCLE_OVERRIDE_REASON);
        }
        self.strategy(scope).as_strategy().score(signals)
    }
}

impl Default for RiskScoringConfig {
    fn default() -> Self {
        Self::from_tree(&ConfigTree::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scoring(v: serde_json::Value) -> RiskScoringConfig {
        RiskScoringConfig::from_tree(&ConfigTree::new(v))
    }

    #[test]
    fn cycle_override_wins_over_everything() {
        let cfg = scoring(json!({
            "sheet": {"thresholds": {"high": 1000, "medium": 500}, "weights": {"volatile_hits": 1}}
        }));
        let s = SignalCounts {
            has_cycles: true,
            volatile: 3,
            ..Default::default()
        };
        let out = cfg.assess(RiskScope::Sheet, &s);
        assert_eq!(out.tier, RiskTier::High);
        assert_eq!(out.reason, CYCLE_OVERRIDE_REASON);
    }

    #[test]
    fn rules_fallback_lists_every_signal_in_order() {
        let s = SignalCounts {
            top_risk_cells: 2,
            volatile: 1,
            symbolic: 4,
            constants: 3,
            orphans: 5,
            ..Default::default()
        };
        let out = RiskScoringConfig::default().assess(RiskScope::Workbook, &s);
        assert_eq!(out.tier, RiskTier::Medium);
        assert_eq!(
            out.reason,
            "2 high-impact cell(s); 1 volatile hit(s); 4 symbolic ref(s); 3 embedded constant(s); 5 orphan formula(s)"
        );
    }

    #[test]
    fn rules_toggles_can_silence_signals() {
        let cfg = scoring(json!({"sheet": {"symbolic_counts_as_medium": false}}));
        let s = SignalCounts {
            symbolic: 10,
            ..Default::default()
        };
        let out = cfg.assess(RiskScope::Sheet, &s);
        assert_eq!(out.tier, RiskTier::Low);
        assert_eq!(out.reason, "10 symbolic ref(s)");
        assert_eq!(cfg.assess(RiskScope::Workbook, &s).tier, RiskTier::Medium);
    }

    #[test]
    fn cycles_without_override_follow_the_rules() {
        let cfg = scoring(json!({
            "overrides": {"cycle_always_high": false},
            "sheet": {"cycles_make_high": false}
        }));
        let s = SignalCounts {
            has_cycles: true,
            ..Default::default()
        };
        let out = cfg.assess(RiskScope::Sheet, &s);
        assert_eq!(out.tier, RiskTier::Low);
        assert_eq!(out.reason, "circular dependency");
    }

    #[test]
    fn weighted_score_picks_top_three_contributors() {
        let cfg = scoring(json!({
            "workbook": {
                "thresholds": {"high": 10, "medium": 4},
                "weights": {
                    "top_risk_cells": 1,
                    "volatile_hits": 2,
                    "hardcoded_constants": 0.5,
                    "orphan_formulas": 1,
                    "symbolic_refs_per_100": 1
                }
            }
        }));
        let s = SignalCounts {
            top_risk_cells: 2,
            volatile: 1,
            constants: 2,
            orphans: 2,
            symbolic: 50,
            ..Default::default()
        };
        // 2 + 2 + 1 + 2 + 0.5 = 7.5
        let out = cfg.assess(RiskScope::Workbook, &s);
        assert_eq!(out.tier, RiskTier::Medium);
        assert_eq!(
            out.reason,
            "high-impact drivers; volatile functions; orphan formulas"
        );
    }

    #[test]
    fn weighted_missing_thresholds_are_unreachable() {
        let cfg = scoring(json!({
            "sheet": {"thresholds": {}, "weights": {"volatile_hits": 1000}}
        }));
        let s = SignalCounts {
            volatile: 1,
            ..Default::default()
        };
        let out = cfg.assess(RiskScope::Sheet, &s);
        assert_eq!(out.tier, RiskTier::Low);
        assert_eq!(out.reason, "volatile functions");
        assert!(matches!(cfg.sheet, ScopeStrategy::Weighted(_)));

        let quiet = cfg.assess(RiskScope::Sheet, &SignalCounts::default());
        assert_eq!(quiet.tier, RiskTier::Low);
        assert_eq!(quiet.reason, "");
    }
}
