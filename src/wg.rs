use base64::prelude::*;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{MapAccess, Visitor},
};
use std::{fmt, str::FromStr};

use peer::WgPeerInfo;

pub mod config;
pub mod instance;
pub mod peer;

/// Number of public key characters used as a peer name when no comment names it.
pub const KEY_PREFIX_LEN: usize = 12;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("base64 decode error: {0}")]
    Decode(#[from] base64::DecodeSliceError),

    #[error("expected 32 key bytes, got {0}")]
    Length(usize),
}

/// A raw WireGuard key. Records keep keys as text; this type only checks
/// that a value really is a 32 byte standard base64 key.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key([u8; 32]);

impl AsRef<[u8]> for Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut inner = [0u8; 32];
        let len = BASE64_STANDARD.decode_slice(s.trim(), &mut inner)?;
        if len != inner.len() {
            return Err(KeyError::Length(len));
        }

        Ok(Key(inner))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64_STANDARD.encode(self.0))
    }
}

/// Name a peer after its public key.
pub fn key_prefix(public_key: &str) -> String {
    public_key.chars().take(KEY_PREFIX_LEN).collect()
}

/// Peers keyed by name.
///
/// Iteration follows insertion order. Inserting a name that is already
/// present replaces its record in place, new names are appended.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PeerMap(Vec<(String, WgPeerInfo)>);

impl PeerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&WgPeerInfo> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the record previously stored under `name`, if any.
    pub fn insert(&mut self, name: impl Into<String>, peer: WgPeerInfo) -> Option<WgPeerInfo> {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, peer)),
            None => {
                self.0.push((name, peer));
                None
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WgPeerInfo)> {
        self.0.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }
}

impl Extend<(String, WgPeerInfo)> for PeerMap {
    fn extend<T: IntoIterator<Item = (String, WgPeerInfo)>>(&mut self, iter: T) {
        for (name, peer) in iter {
            self.insert(name, peer);
        }
    }
}

impl FromIterator<(String, WgPeerInfo)> for PeerMap {
    fn from_iter<T: IntoIterator<Item = (String, WgPeerInfo)>>(iter: T) -> Self {
        let mut map = PeerMap::new();
        map.extend(iter);
        map
    }
}

impl IntoIterator for PeerMap {
    type Item = (String, WgPeerInfo);
    type IntoIter = std::vec::IntoIter<(String, WgPeerInfo)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for PeerMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for PeerMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PeerMapVisitor;

        impl<'de> Visitor<'de> for PeerMapVisitor {
            type Value = PeerMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of peer names to peers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<PeerMap, A::Error> {
                let mut map = PeerMap::new();
                while let Some((name, peer)) = access.next_entry::<String, WgPeerInfo>()? {
                    map.insert(name, peer);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(PeerMapVisitor)
    }
}
