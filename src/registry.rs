//! Catalog of synchronizable QuickBooks Online modules
//!
//! The registry is an ordered list of [`ModuleDescriptor`]s. Its order is the
//! display order used everywhere a per-module table is produced. A
//! [`Selection`] is validated against a registry and "select all" is always
//! recomputed from it, so adding a descriptor makes it selectable without
//! touching callers.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// One synchronizable record type
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ModuleDescriptor {
    /// Stable identifier used in remote calls and persisted state
    pub key: String,
    /// Display name
    pub label: String,
}

impl ModuleDescriptor {
    /// Create a descriptor
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
        }
    }
}

const QBO_MODULES: &[(&str, &str)] = &[
    ("account", "Account"),
    ("customer", "Customer"),
    ("vendor", "Vendor"),
    ("item", "Item"),
    ("class", "Class"),
    ("taxrate", "TaxRate"),
    ("companycurrency", "Currency"),
    ("term", "Term"),
    ("invoice", "Invoice"),
    ("bill", "Bill"),
    ("payment", "ReceivePayment"),
    ("billpayment", "BillPayment"),
    ("vendorcredit", "VendorCredit"),
    ("creditmemo", "CreditMemo"),
    ("journalentry", "JournalEntry"),
    ("transfer", "Transfer"),
    ("deposit", "Deposit"),
    ("estimate", "Estimate"),
    ("purchaseorder", "PurchaseOrder"),
    ("salesreceipt", "SalesReceipt"),
];

/// Ordered, immutable module catalog
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    /// Build a registry from descriptors, keeping the first occurrence of a repeated key
    pub fn new(modules: impl IntoIterator<Item = ModuleDescriptor>) -> Self {
        let mut seen = HashSet::new();
        let modules = modules
            .into_iter()
            .filter(|m| seen.insert(m.key.clone()))
            .collect();
        Self { modules }
    }

    /// The QuickBooks Online catalog
    pub fn qbo() -> Self {
        Self::new(
            QBO_MODULES
                .iter()
                .map(|(key, label)| ModuleDescriptor::new(*key, *label)),
        )
    }

    /// Descriptors in display order
    pub fn list(&self) -> &[ModuleDescriptor] {
        &self.modules
    }

    /// Set of known keys
    pub fn keys(&self) -> HashSet<&str> {
        self.modules.iter().map(|m| m.key.as_str()).collect()
    }

    /// Look up a descriptor by key
    pub fn get(&self, key: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.key == key)
    }

    /// Whether `key` is part of this registry
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Descriptor for `key`, or [`Error::UnknownModule`]
    pub fn require(&self, key: &str) -> Result<&ModuleDescriptor> {
        self.get(key).ok_or_else(|| Error::UnknownModule {
            module: key.to_string(),
        })
    }

    /// Number of modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether the registry has no modules
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::qbo()
    }
}

/// Ordered set of module keys chosen for a batch
///
/// Insertion order is processing order. Duplicates are dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(transparent)]
pub struct Selection(Vec<String>);

impl Selection {
    /// Empty selection
    pub fn new() -> Self {
        Self::default()
    }

    /// Every module of the registry, in registry order
    pub fn all(registry: &ModuleRegistry) -> Self {
        Self(registry.list().iter().map(|m| m.key.clone()).collect())
    }

    /// Add a key if not already present; returns whether it was added
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.0.push(key);
        true
    }

    /// Remove a key; returns whether it was present
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|k| k != key);
        self.0.len() != before
    }

    /// Flip membership of a key; returns whether it is selected afterwards
    pub fn toggle(&mut self, key: &str) -> bool {
        if self.remove(key) {
            false
        } else {
            self.0.push(key.to_string());
            true
        }
    }

    /// Whether a key is selected
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    /// Whether every registry module is selected
    pub fn is_all_selected(&self, registry: &ModuleRegistry) -> bool {
        !registry.is_empty() && registry.list().iter().all(|m| self.contains(&m.key))
    }

    /// Selected keys in processing order
    pub fn keys(&self) -> &[String] {
        &self.0
    }

    /// Number of selected keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is selected
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject empty selections and keys the registry does not know
    pub fn validate(&self, registry: &ModuleRegistry) -> Result<()> {
        if self.is_empty() {
            return Err(Error::Validation {
                message: "select at least one module to sync".to_string(),
            });
        }
        if let Some(unknown) = self.0.iter().find(|k| !registry.contains(k)) {
            return Err(Error::Validation {
                message: format!("unknown module '{unknown}' in selection"),
            });
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut selection = Selection::new();
        for key in iter {
            selection.insert(key);
        }
        selection
    }
}

impl<'de> Deserialize<'de> for Selection {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let keys = Vec::<String>::deserialize(deserializer)?;
        Ok(keys.into_iter().collect())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qbo_registry_has_twenty_modules_in_display_order() {
        let registry = ModuleRegistry::qbo();

        assert_eq!(registry.len(), 20);
        assert_eq!(registry.list()[0].key, "account");
        assert_eq!(registry.list()[19].key, "salesreceipt");
        assert_eq!(registry.get("payment").unwrap().label, "ReceivePayment");
        assert_eq!(registry.get("companycurrency").unwrap().label, "Currency");
    }

    #[test]
    fn registry_drops_repeated_keys() {
        let registry = ModuleRegistry::new(vec![
            ModuleDescriptor::new("invoice", "Invoice"),
            ModuleDescriptor::new("invoice", "Invoice again"),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("invoice").unwrap().label, "Invoice");
    }

    #[test]
    fn require_reports_unknown_module() {
        let registry = ModuleRegistry::qbo();
        assert!(registry.require("vendor").is_ok());
        assert!(matches!(
            registry.require("payroll"),
            Err(Error::UnknownModule { module }) if module == "payroll"
        ));
    }

    #[test]
    fn select_all_follows_registry_growth() {
        let mut modules = ModuleRegistry::qbo().list().to_vec();
        let before = Selection::all(&ModuleRegistry::new(modules.clone()));
        assert_eq!(before.len(), 20);

        modules.push(ModuleDescriptor::new("timeactivity", "TimeActivity"));
        let grown = ModuleRegistry::new(modules);
        let after = Selection::all(&grown);

        assert_eq!(after.len(), 21);
        assert!(after.contains("timeactivity"), "new module must be selected");
        assert!(after.is_all_selected(&grown));
        assert!(
            !before.is_all_selected(&grown),
            "an old select-all no longer covers the grown registry"
        );
    }

    #[test]
    fn selection_keeps_caller_order_and_drops_duplicates() {
        let selection: Selection = ["invoice", "account", "invoice", "bill"]
            .into_iter()
            .collect();
        assert_eq!(selection.keys(), ["invoice", "account", "bill"]);
    }

    #[test]
    fn toggle_flips_membership() {
        let mut selection = Selection::new();
        assert!(selection.toggle("vendor"));
        assert!(selection.contains("vendor"));
        assert!(!selection.toggle("vendor"));
        assert!(selection.is_empty());
    }

    #[test]
    fn validate_rejects_empty_and_unknown() {
        let registry = ModuleRegistry::qbo();

        assert!(matches!(
            Selection::new().validate(&registry),
            Err(Error::Validation { .. })
        ));

        let unknown: Selection = ["invoice", "payroll"].into_iter().collect();
        match unknown.validate(&registry) {
            Err(Error::Validation { message }) => assert!(message.contains("payroll")),
            other => panic!("expected validation failure, got {other:?}"),
        }

        let ok: Selection = ["invoice"].into_iter().collect();
        assert!(ok.validate(&registry).is_ok());
    }

    #[test]
    fn selection_deserializes_from_json_array_without_duplicates() {
        let selection: Selection =
            serde_json::from_str(r#"["bill","bill","vendor"]"#).unwrap();
        assert_eq!(selection.keys(), ["bill", "vendor"]);
    }
}
