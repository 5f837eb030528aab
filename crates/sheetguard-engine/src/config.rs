//! Scan configuration.
//!
//! Settings arrive as a loosely-typed tree (usually parsed from YAML) and are
//! read through dotted paths with explicit defaults. A missing key, a value of
//! the wrong type, or no config at all yields the documented default; nothing
//! in here fails. Each detector owns a small config struct that is built once
//! from the tree and passed down explicitly.

use serde_json::Value;

use crate::cycles::CycleConfig;
use crate::detectors::constants::ConstantsConfig;
use crate::detectors::drift::DriftConfig;
use crate::detectors::orphans::OrphanConfig;
use crate::impact::ImpactConfig;
use crate::risk::RiskScoringConfig;

/// Nested configuration values addressed by dotted paths (`app.graph.cycle_limit`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: Value,
}

impl ConfigTree {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Look up a dotted path. Every intermediate segment must be an object.
    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return None;
        }
        path.split('.')
            .try_fold(&self.root, |cur, key| cur.as_object()?.get(key))
    }

    /// Subtree at `path`, or an empty tree.
    pub fn subtree(&self, path: &str) -> ConfigTree {
        ConfigTree::new(self.get(path).cloned().unwrap_or(Value::Null))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some_and(|v| !v.is_null())
    }

    pub fn is_object(&self, path: &str) -> bool {
        self.get(path).is_some_and(Value::is_object)
    }

    pub fn bool_or(&self, path: &str, default: bool) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Non-negative integer at `path`. Zero, negatives and non-numbers fall
    /// back to `default`, so an accidental `0` never disables a cap.
    pub fn usize_or(&self, path: &str, default: usize) -> usize {
        let value = match self.get(path) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 1.0).map(|f| f as u64)),
            _ => None,
        };
        match value {
            Some(v) if v > 0 => usize::try_from(v).unwrap_or(usize::MAX),
            _ => default,
        }
    }

    /// Float at `path`; zero and non-numbers fall back to `default`.
    pub fn f64_or(&self, path: &str, default: f64) -> f64 {
        match self.get(path).and_then(Value::as_f64) {
            Some(v) if v != 0.0 && v.is_finite() => v,
            _ => default,
        }
    }

    /// Float at `path` where zero is a legitimate value.
    pub fn f64_or_zero(&self, path: &str) -> f64 {
        self.get(path)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    /// List of scalars at `path`, rendered as strings (`1`, `0.5`, `SUM`).
    pub fn string_list(&self, path: &str) -> Vec<String> {
        let Some(Value::Array(items)) = self.get(path) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .collect()
    }
}

impl From<Value> for ConfigTree {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}

/// Formula-count cap for trial runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialConfig {
    pub enabled_default: bool,
    pub formula_limit: usize,
}

impl TrialConfig {
    pub const DEFAULT_FORMULA_LIMIT: usize = 100;

    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            enabled_default: tree.bool_or("app.trial.enabled_default", false),
            formula_limit: tree
                .usize_or("app.trial.formula_limit", Self::DEFAULT_FORMULA_LIMIT)
                .max(1),
        }
    }

    /// Trial mode is on when either the caller asks for it or config defaults it on.
    pub fn is_enabled(&self, requested: bool) -> bool {
        requested || self.enabled_default
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self::from_tree(&ConfigTree::default())
    }
}

/// Everything a scan needs, resolved once.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub trial: TrialConfig,
    pub constants: ConstantsConfig,
    pub drift: DriftConfig,
    pub orphans: OrphanConfig,
    pub cycles: CycleConfig,
    pub impact: ImpactConfig,
    pub risk: RiskScoringConfig,
}

impl ScanConfig {
    pub fn from_tree(tree: &ConfigTree) -> Self {
        Self {
            trial: TrialConfig::from_tree(tree),
            constants: ConstantsConfig::from_tree(&tree.subtree("app.detectors.hardcoded_constants")),
            drift: DriftConfig::from_tree(&tree.subtree("app.detectors.formula_drift")),
            orphans: OrphanConfig::from_tree(&tree.subtree("app.detectors.orphan_calculations")),
            cycles: CycleConfig::from_tree(tree),
            impact: ImpactConfig::from_tree(tree),
            risk: RiskScoringConfig::from_tree(&tree.subtree("app.reporting.risk_scoring")),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from_tree(&ConfigTree::default())
    }
}
