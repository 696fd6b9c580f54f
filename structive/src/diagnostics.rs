//! Change ledger.
//!
//! Opt-in record of every enqueued ref, for "why did this render?"
//! queries in tests and tooling.

use serde_json::json;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct ChangeRecord {
    pub version: u64,
    pub revision: u64,
    pub pattern: Rc<str>,
    pub indexes: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct DiagnosticsLedger {
    enabled: bool,
    entries: Vec<ChangeRecord>,
}

impl DiagnosticsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&mut self, version: u64, revision: u64, pattern: Rc<str>, indexes: Vec<usize>) {
        if self.enabled {
            self.entries.push(ChangeRecord {
                version,
                revision,
                pattern,
                indexes,
            });
        }
    }

    pub fn entries(&self) -> &[ChangeRecord] {
        &self.entries
    }

    pub fn entries_for_version(&self, version: u64) -> Vec<&ChangeRecord> {
        self.entries
            .iter()
            .filter(|e| e.version == version)
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.entries
                .iter()
                .map(|e| {
                    json!({
                        "version": e.version,
                        "revision": e.revision,
                        "pattern": e.pattern.as_ref(),
                        "indexes": e.indexes,
                    })
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_only_when_enabled() {
        let mut ledger = DiagnosticsLedger::new();
        ledger.record(1, 1, Rc::from("a"), vec![]);
        assert!(ledger.entries().is_empty());

        ledger.enable();
        ledger.record(1, 1, Rc::from("a"), vec![]);
        ledger.record(2, 1, Rc::from("b"), vec![0]);
        assert_eq!(ledger.entries().len(), 2);
        assert_eq!(ledger.entries_for_version(2).len(), 1);
        assert_eq!(ledger.to_json()[1]["pattern"], "b");
    }
}
