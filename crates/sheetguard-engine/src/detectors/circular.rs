//! Circular-reference findings derived from the cycle search.

use serde::Serialize;
use sheetguard_common::NodeKey;

use crate::cycles::Cycle;
use crate::risk::RiskTier;

pub const CIRCULAR_RULE_ID: &str = "CIRCULAR_REFERENCE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleShape {
    SelfReference,
    MultiCellCycle,
}

impl CycleShape {
    pub fn explanation(self) -> &'static str {
        match self {
            CycleShape::SelfReference => "Formula references itself directly (self-loop).",
            CycleShape::MultiCellCycle => "Cells form a dependency loop (multi-node cycle).",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircularItem {
    pub cycle_type: CycleShape,
    pub cells: Vec<NodeKey>,
    pub explanation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircularFindings {
    pub rule_id: &'static str,
    pub severity: RiskTier,
    pub cycle_count: usize,
    pub items: Vec<CircularItem>,
}

impl CircularFindings {
    /// Distinct cells taking part in any cycle, sorted.
    pub fn cells(&self) -> Vec<&str> {
        let mut cells: Vec<&str> = self
            .items
            .iter()
            .flat_map(|i| i.cells.iter().map(String::as_str))
            .collect();
        cells.sort_unstable();
        cells.dedup();
        cells
    }
}

/// Label each detected cycle. Error entries from a failed search are skipped;
/// the shape label is presentation only and does not change how cycles count.
pub fn circular_reference_findings(cycles: &[Cycle]) -> CircularFindings {
    let items: Vec<CircularItem> = cycles
        .iter()
        .filter(|c| c.is_cycle())
        .map(|c| {
            let shape = if c.cells.len() == 1 {
                CycleShape::SelfReference
            } else {
                CycleShape::MultiCellCycle
            };
            CircularItem {
                cycle_type: shape,
                cells: c.cells.clone(),
                explanation: shape.explanation(),
            }
        })
        .collect();

    CircularFindings {
        rule_id: CIRCULAR_RULE_ID,
        severity: if items.is_empty() {
            RiskTier::Low
        } else {
            RiskTier::High
        },
        cycle_count: items.len(),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_self_and_multi_cell_cycles() {
        let cycles = vec![
            Cycle::new(vec!["S!A1".into()]),
            Cycle::new(vec!["S!B1".into(), "S!C1".into()]),
            Cycle::error("search failed"),
        ];
        let findings = circular_reference_findings(&cycles);
        assert_eq!(findings.severity, RiskTier::High);
        assert_eq!(findings.cycle_count, 2);
        assert_eq!(findings.items[0].cycle_type, CycleShape::SelfReference);
        assert_eq!(findings.items[1].cycle_type, CycleShape::MultiCellCycle);
        assert_eq!(findings.cells(), vec!["S!A1", "S!B1", "S!C1"]);

        let json = serde_json::to_value(&findings).unwrap();
        assert_eq!(json["rule_id"], "CIRCULAR_REFERENCE");
        assert_eq!(json["severity"], "HIGH");
        assert_eq!(json["items"][0]["cycle_type"], "self_reference");
    }

    #[test]
    fn no_cycles_is_low() {
        let findings = circular_reference_findings(&[]);
        assert_eq!(findings.severity, RiskTier::Low);
        assert!(findings.items.is_empty());
    }
}
