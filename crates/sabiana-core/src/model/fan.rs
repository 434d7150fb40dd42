use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fan value the cloud uses for automatic speed.
pub const FAN_AUTO: &str = "auto";

/// Translation between the cloud's fan values (`V1`, `V2`, ...) and the
/// labels shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FanMap(BTreeMap<String, String>);

impl Default for FanMap {
    fn default() -> Self {
        Self(BTreeMap::from([
            (FAN_AUTO.to_owned(), "auto".to_owned()),
            ("V1".to_owned(), "low".to_owned()),
            ("V2".to_owned(), "medium".to_owned()),
            ("V3".to_owned(), "high".to_owned()),
        ]))
    }
}

impl FanMap {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    /// User label for a cloud value. Unmapped values show lowercased.
    pub fn label(&self, api: &str) -> String {
        self.0
            .get(api)
            .cloned()
            .unwrap_or_else(|| api.to_lowercase())
    }

    /// Cloud value for a user label, `auto` when nothing matches.
    pub fn api_value(&self, label: &str) -> String {
        self.try_api_value(label)
            .unwrap_or_else(|| FAN_AUTO.to_owned())
    }

    /// Cloud value for a user label. A raw cloud value is accepted too.
    pub fn try_api_value(&self, label: &str) -> Option<String> {
        self.0
            .iter()
            .find(|(_, l)| l.eq_ignore_ascii_case(label))
            .map(|(api, _)| api.clone())
            .or_else(|| {
                self.0
                    .keys()
                    .find(|api| api.eq_ignore_ascii_case(label))
                    .cloned()
            })
    }

    /// Labels in cloud-value order.
    pub fn labels(&self) -> Vec<&str> {
        self.0.values().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
