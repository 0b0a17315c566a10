//! Trigger Registry: operation kind -> rules to evaluate

use crate::calls::OperationKind;
use crate::invariants::{InvariantDefinition, CATALOGUE};
use std::collections::{BTreeMap, BTreeSet};

/// Static binding of operation kinds to catalogue rules
///
/// Built once from the catalogue; never mutated afterwards.
#[derive(Debug)]
pub struct TriggerRegistry {
    definitions: Vec<&'static InvariantDefinition>,
    by_kind: BTreeMap<OperationKind, Vec<usize>>,
}

impl TriggerRegistry {
    /// Registry over the full catalogue
    pub fn standard() -> Self {
        Self::from_definitions(CATALOGUE.iter().collect())
    }

    /// Registry over the catalogue minus the rules named in `disabled`
    pub fn without(disabled: &[String]) -> Self {
        for name in disabled {
            if !CATALOGUE.iter().any(|d| d.name == name) {
                log::warn!("disabled rule '{}' is not in the catalogue", name);
            }
        }
        Self::from_definitions(
            CATALOGUE
                .iter()
                .filter(|d| !disabled.iter().any(|n| n == d.name))
                .collect(),
        )
    }

    fn from_definitions(definitions: Vec<&'static InvariantDefinition>) -> Self {
        let mut by_kind: BTreeMap<OperationKind, Vec<usize>> = BTreeMap::new();
        for (i, def) in definitions.iter().enumerate() {
            for kind in def.triggers {
                by_kind.entry(*kind).or_default().push(i);
            }
        }
        Self { definitions, by_kind }
    }

    pub fn definitions(&self) -> &[&'static InvariantDefinition] {
        &self.definitions
    }

    /// Rules triggered by one operation kind, in catalogue order
    pub fn for_kind(&self, kind: OperationKind) -> Vec<&'static InvariantDefinition> {
        self.by_kind
            .get(&kind)
            .map(|ids| ids.iter().map(|i| self.definitions[*i]).collect())
            .unwrap_or_default()
    }

    /// Deduplicated union of the rules triggered by `kinds`, in catalogue order
    pub fn triggered_by(&self, kinds: &BTreeSet<OperationKind>) -> Vec<&'static InvariantDefinition> {
        let ids: BTreeSet<usize> = kinds
            .iter()
            .filter_map(|k| self.by_kind.get(k))
            .flatten()
            .copied()
            .collect();
        ids.into_iter().map(|i| self.definitions[i]).collect()
    }
}

impl Default for TriggerRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
