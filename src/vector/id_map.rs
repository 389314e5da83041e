//! Bidirectional mapping between caller-supplied string IDs and dense engine labels.
//!
//! Labels start at 0 and only ever grow. `next_label` is persisted with the map so a
//! reloaded store never hands out a label that is already in the index.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, VectorStoreError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdMap {
    label_to_id: HashMap<u64, String>,
    id_to_label: HashMap<String, u64>,
    next_label: u64,
}

/// On-disk form of [`IdMap`]: both directions plus the label counter.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdMapSidecar {
    pub label_to_id: Vec<(u64, String)>,
    pub id_to_label: Vec<(String, u64)>,
    pub next_label: u64,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next label to `id`.
    ///
    /// Fails with [`VectorStoreError::DuplicateId`] if `id` is already mapped; the
    /// map is left untouched in that case.
    pub fn assign_label(&mut self, id: &str) -> Result<u64> {
        if let Some(&label) = self.id_to_label.get(id) {
            return Err(VectorStoreError::DuplicateId {
                id: id.to_string(),
                label,
            });
        }
        let label = self.next_label;
        self.label_to_id.insert(label, id.to_string());
        self.id_to_label.insert(id.to_string(), label);
        self.next_label += 1;
        Ok(label)
    }

    /// Undo the most recent [`assign_label`](Self::assign_label). Only the newest label
    /// can be rolled back; it never reached the index, so handing it out again is safe.
    pub fn rollback(&mut self, label: u64) -> bool {
        if label + 1 != self.next_label {
            return false;
        }
        match self.label_to_id.remove(&label) {
            Some(id) => {
                self.id_to_label.remove(&id);
                self.next_label = label;
                true
            }
            None => false,
        }
    }

    pub fn resolve(&self, label: u64) -> Option<&str> {
        self.label_to_id.get(&label).map(String::as_str)
    }

    pub fn label_of(&self, id: &str) -> Option<u64> {
        self.id_to_label.get(id).copied()
    }

    pub fn next_label(&self) -> u64 {
        self.next_label
    }

    pub fn len(&self) -> usize {
        self.label_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.label_to_id.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = u64> + '_ {
        self.label_to_id.keys().copied()
    }

    /// Snapshot both directions, sorted by label so the sidecar is stable across saves.
    pub fn serialize(&self) -> IdMapSidecar {
        let mut label_to_id: Vec<(u64, String)> = self
            .label_to_id
            .iter()
            .map(|(label, id)| (*label, id.clone()))
            .collect();
        label_to_id.sort_by_key(|(label, _)| *label);
        let id_to_label = label_to_id
            .iter()
            .map(|(label, id)| (id.clone(), *label))
            .collect();
        IdMapSidecar {
            label_to_id,
            id_to_label,
            next_label: self.next_label,
        }
    }

    /// Rebuild a map from its sidecar, rejecting anything that breaks the inverse
    /// relationship or would let `next_label` collide with an existing label.
    pub fn deserialize(sidecar: IdMapSidecar) -> std::result::Result<Self, String> {
        let mut map = IdMap {
            next_label: sidecar.next_label,
            ..Default::default()
        };

        for (label, id) in sidecar.label_to_id {
            if label >= sidecar.next_label {
                return Err(format!(
                    "label {label} is not below nextLabel {}",
                    sidecar.next_label
                ));
            }
            if map.label_to_id.insert(label, id.clone()).is_some() {
                return Err(format!("label {label} appears twice"));
            }
            if map.id_to_label.insert(id.clone(), label).is_some() {
                return Err(format!("id {id:?} appears twice"));
            }
        }

        if sidecar.id_to_label.len() != map.id_to_label.len() {
            return Err(format!(
                "idToLabel has {} entries, labelToId has {}",
                sidecar.id_to_label.len(),
                map.id_to_label.len()
            ));
        }
        for (id, label) in &sidecar.id_to_label {
            if map.id_to_label.get(id) != Some(label) {
                return Err(format!("idToLabel entry ({id:?}, {label}) has no inverse"));
            }
        }

        Ok(map)
    }
}
