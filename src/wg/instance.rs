use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The local side of the tunnel. Values are kept verbatim, nothing here
/// checks CIDR or base64 syntax.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WgInterfaceInfo {
    // Address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    // ListenPort
    #[serde(rename = "listenport", default, skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<String>,

    // PrivateKey
    #[serde(rename = "privatekey", default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    // `# PublicKey = ...` comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// Any other property of the section under its lowercased key
    /// (`mtu`, `dns`, `postup`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl WgInterfaceInfo {
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.listen_port.is_none()
            && self.private_key.is_none()
            && self.public_key.is_none()
            && self.extra.is_empty()
    }
}
