//! Parse WireGuard configuration text into interface and peer records,
//! merge peer sets and prune them against an inventory.

pub mod error;
pub mod filters;
pub mod wg;

pub use error::Error;
pub use filters::{Filter, filter_peers, merge_peers, parse_config, parse_peers};
pub use wg::{
    Key, PeerMap,
    config::{Diagnostic, WgConfig},
    instance::WgInterfaceInfo,
    peer::WgPeerInfo,
};
