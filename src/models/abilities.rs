use std::collections::BTreeSet;

use crate::api::message::{NS_CONSUMPTIONX, NS_ELECTRICITY, NS_TOGGLE, NS_TOGGLEX};

/// Namespaces a device advertises via `Appliance.System.Ability`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abilities {
    namespaces: BTreeSet<String>,
}

impl Abilities {
    pub fn from_payload(payload: &serde_json::Value) -> Self {
        let namespaces = payload
            .get("ability")
            .and_then(|v| v.as_object())
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default();
        Self { namespaces }
    }

    pub fn supports(&self, namespace: &str) -> bool {
        self.namespaces.contains(namespace)
    }

    /// Namespace used to switch a relay, preferring the multi-channel one.
    pub fn toggle_namespace(&self) -> Option<&'static str> {
        if self.supports(NS_TOGGLEX) {
            Some(NS_TOGGLEX)
        } else if self.supports(NS_TOGGLE) {
            Some(NS_TOGGLE)
        } else {
            None
        }
    }

    pub fn has_electricity(&self) -> bool {
        self.supports(NS_ELECTRICITY)
    }

    pub fn has_consumption(&self) -> bool {
        self.supports(NS_CONSUMPTIONX)
    }
}

impl<S: Into<String>> FromIterator<S> for Abilities {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            namespaces: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_ability_payload() {
        let payload = json!({"ability": {
            "Appliance.Config.Key": {},
            "Appliance.System.All": {},
            "Appliance.Control.ToggleX": {},
            "Appliance.Control.Toggle": {},
            "Appliance.Control.Electricity": {},
            "Appliance.Control.ConsumptionX": {}
        }});
        let abilities = Abilities::from_payload(&payload);
        assert_eq!(abilities.toggle_namespace(), Some(NS_TOGGLEX));
        assert!(abilities.has_electricity());
        assert!(abilities.has_consumption());
    }

    #[test]
    fn test_legacy_toggle_only() {
        let abilities: Abilities = ["Appliance.Control.Toggle"].into_iter().collect();
        assert_eq!(abilities.toggle_namespace(), Some(NS_TOGGLE));
        assert!(!abilities.has_electricity());
    }

    #[test]
    fn test_no_relay() {
        let abilities = Abilities::from_payload(&json!({}));
        assert_eq!(abilities.toggle_namespace(), None);
    }
}
