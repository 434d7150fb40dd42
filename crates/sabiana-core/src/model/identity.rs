use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Composite key of one controllable unit: `(groupId, address)`.
///
/// Both halves are opaque identifiers assigned by the cloud. The textual
/// form is `group:address`, split on the first colon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIdentity {
    pub group_id: String,
    pub address: String,
}

impl DeviceIdentity {
    pub fn new(group_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group_id, self.address)
    }
}

impl FromStr for DeviceIdentity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((group, address)) if !group.is_empty() && !address.is_empty() => {
                Ok(Self::new(group, address))
            }
            _ => Err(CoreError::Validation {
                message: format!("expected <group>:<address>, got '{s}'"),
            }),
        }
    }
}
