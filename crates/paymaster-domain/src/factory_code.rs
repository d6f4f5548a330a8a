use std::collections::BTreeMap;

/// Factory-to-short-code table for order ID prefixes.
///
/// A factory's code must stay stable across every ID ever issued for it. A
/// factory missing from the table falls back to its raw key uppercased, which
/// is stable by construction.
#[derive(Debug, Clone, Default)]
pub struct FactoryCodeTable {
    codes: BTreeMap<String, String>,
}

impl FactoryCodeTable {
    pub fn new(codes: BTreeMap<String, String>) -> Self {
        Self { codes }
    }

    /// Order ID prefix for a factory.
    pub fn prefix(&self, factory_key: &str) -> String {
        self.codes
            .get(factory_key)
            .cloned()
            .unwrap_or_else(|| factory_key.to_uppercase())
    }
}
