use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WgPeerInfo {
    // PublicKey
    pub public_key: String,

    // AllowedIPs
    #[serde(default)]
    pub allowed_ips: String,

    // Endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    // PersistentKeepalive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistent_keepalive: Option<String>,
}

impl WgPeerInfo {
    pub fn new(public_key: impl Into<String>, allowed_ips: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            allowed_ips: allowed_ips.into(),
            ..Default::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_keepalive(mut self, keepalive: impl Into<String>) -> Self {
        self.persistent_keepalive = Some(keepalive.into());
        self
    }
}
