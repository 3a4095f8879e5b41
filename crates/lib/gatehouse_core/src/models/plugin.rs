//! Plugin enrollment models.

use serde::{Deserialize, Serialize};

/// Well-known name of the review plugin.
pub const PLUGIN_REVIEW_NAME: &str = "review";

/// A connection enrolled in a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConnection {
    pub id: String,
    pub name: String,
}

/// A plugin and the connections it is active for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plugin {
    pub id: String,
    pub org_id: String,
    pub name: String,
    pub connections: Vec<PluginConnection>,
}

impl Plugin {
    /// Membership is by connection name.
    pub fn has_connection(&self, name: &str) -> bool {
        self.connections.iter().any(|c| c.name == name)
    }
}
