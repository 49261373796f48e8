use std::{fmt, str::FromStr};

use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::Error,
    wg::{PeerMap, config::WgConfig},
};

pub fn parse_config(text: &str) -> WgConfig {
    WgConfig::parse_config(text)
}

pub fn parse_peers(text: &str) -> PeerMap {
    WgConfig::parse_config(text).peers
}

/// Union of both sets; on a name clash the incoming peer wins.
pub fn merge_peers(existing: Option<&PeerMap>, incoming: Option<&PeerMap>) -> PeerMap {
    let mut merged = existing.cloned().unwrap_or_default();

    if let Some(incoming) = incoming {
        for (name, peer) in incoming.iter() {
            if merged.insert(name, peer.clone()).is_some() {
                log::debug!("peer {name} replaced by incoming entry");
            }
        }
    }

    merged
}

/// Keep the peers whose names are in `allowed`.
///
/// An absent or empty list means no filtering at all: missing inventory
/// data must never wipe the peer set.
pub fn filter_peers<S: AsRef<str>>(peers: Option<&PeerMap>, allowed: Option<&[S]>) -> PeerMap {
    let Some(peers) = peers else {
        return PeerMap::new();
    };

    let allowed = match allowed {
        Some(allowed) if !allowed.is_empty() => allowed,
        _ => return peers.clone(),
    };

    peers
        .iter()
        .filter(|(name, _)| {
            let keep = allowed.iter().any(|a| a.as_ref() == *name);
            if !keep {
                log::debug!("peer {name} not in inventory, pruned");
            }
            keep
        })
        .map(|(name, peer)| (name.to_string(), peer.clone()))
        .collect()
}

/// The operations as registered with the templating side, by fixed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    ParseConfig,
    ParsePeers,
    MergePeers,
    FilterByInventory,
}

impl Filter {
    pub const ALL: [Filter; 4] = [
        Filter::ParseConfig,
        Filter::ParsePeers,
        Filter::MergePeers,
        Filter::FilterByInventory,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Filter::ParseConfig => "parse_wireguard_config",
            Filter::ParsePeers => "parse_wireguard_peers",
            Filter::MergePeers => "merge_wireguard_peers",
            Filter::FilterByInventory => "filter_peers_by_inventory",
        }
    }

    /// Call the filter with JSON arguments. Missing and `null` arguments
    /// count as empty.
    pub fn apply(&self, args: &[Value]) -> Result<Value, Error> {
        let out = match self {
            Filter::ParseConfig => serde_json::to_value(parse_config(&self.text_arg(args, 0)?))?,
            Filter::ParsePeers => serde_json::to_value(parse_peers(&self.text_arg(args, 0)?))?,
            Filter::MergePeers => {
                let existing = self.decode_arg::<PeerMap>(args, 0)?;
                let incoming = self.decode_arg::<PeerMap>(args, 1)?;
                serde_json::to_value(merge_peers(existing.as_ref(), incoming.as_ref()))?
            }
            Filter::FilterByInventory => {
                let peers = self.decode_arg::<PeerMap>(args, 0)?;
                let hosts = self.decode_arg::<Vec<String>>(args, 1)?;
                serde_json::to_value(filter_peers(peers.as_ref(), hosts.as_deref()))?
            }
        };

        Ok(out)
    }

    fn text_arg(&self, args: &[Value], index: usize) -> Result<String, Error> {
        match arg(args, index) {
            None => Ok(String::new()),
            Some(Value::String(text)) => Ok(text.clone()),
            Some(other) => Err(self.argument_error(index, format!("expected a string, got {other}"))),
        }
    }

    fn decode_arg<T>(&self, args: &[Value], index: usize) -> Result<Option<T>, Error>
    where
        T: for<'de> Deserialize<'de>,
    {
        arg(args, index)
            .map(|value| T::deserialize(value).map_err(|err| self.argument_error(index, err.to_string())))
            .transpose()
    }

    fn argument_error(&self, index: usize, reason: String) -> Error {
        Error::ArgumentError {
            filter: *self,
            index,
            reason,
        }
    }
}

fn arg(args: &[Value], index: usize) -> Option<&Value> {
    args.get(index).filter(|value| !value.is_null())
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::ALL
            .into_iter()
            .find(|filter| filter.name() == s)
            .ok_or_else(|| Error::UnknownFilter(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::{
        error::Error,
        wg::{PeerMap, peer::WgPeerInfo},
    };

    use super::{Filter, filter_peers, merge_peers, parse_peers};

    fn peers<const N: usize>(entries: [(&str, &str, &str); N]) -> PeerMap {
        entries
            .into_iter()
            .map(|(name, key, ips)| (name.to_string(), WgPeerInfo::new(key, ips)))
            .collect()
    }

    #[test]
    fn test_parse_peers() {
        assert!(parse_peers("").is_empty());
        assert!(parse_peers("   \n  \n  ").is_empty());
        assert!(parse_peers("[Interface]\nAddress = 10.0.0.20/24\nPrivateKey = test_private_key\n").is_empty());

        let parsed = parse_peers("[Peer]\n# test-worker-1\nPublicKey = key1\nAllowedIPs = 10.0.0.3/32\n");
        assert_eq!(parsed, peers([("test-worker-1", "key1", "10.0.0.3/32")]));
    }

    #[test]
    fn test_merge_peers() {
        let empty = PeerMap::new();
        let one = peers([("test-worker-1", "key1", "10.0.0.3/32")]);

        assert_eq!(merge_peers(Some(&empty), Some(&empty)), empty);
        assert_eq!(merge_peers(Some(&empty), Some(&one)), one);
        assert_eq!(merge_peers(Some(&one), Some(&empty)), one);
        assert_eq!(merge_peers(None, None), empty);
        assert_eq!(merge_peers(None, Some(&one)), one);
    }

    #[test]
    fn test_merge_peers_non_overlapping() {
        let existing = peers([
            ("test-worker-1", "key1", "10.0.0.3/32"),
            ("test-worker-2", "key2", "10.0.0.4/32"),
        ]);
        let incoming = peers([("test-worker-3", "key3", "10.0.0.21/32")]);

        assert_eq!(
            merge_peers(Some(&existing), Some(&incoming)),
            peers([
                ("test-worker-1", "key1", "10.0.0.3/32"),
                ("test-worker-2", "key2", "10.0.0.4/32"),
                ("test-worker-3", "key3", "10.0.0.21/32"),
            ])
        );
    }

    #[test]
    fn test_merge_peers_incoming_wins() {
        let existing = peers([
            ("test-worker-1", "old_key", "10.0.0.3/32"),
            ("test-worker-2", "key2", "10.0.0.4/32"),
        ]);
        let incoming = peers([("test-worker-1", "new_key", "10.0.0.3/32")]);

        let merged = merge_peers(Some(&existing), Some(&incoming));
        assert_eq!(
            merged,
            peers([
                ("test-worker-1", "new_key", "10.0.0.3/32"),
                ("test-worker-2", "key2", "10.0.0.4/32"),
            ])
        );

        // inputs untouched
        assert_eq!(existing.get("test-worker-1").map(|p| p.public_key.as_str()), Some("old_key"));
        assert_eq!(incoming.len(), 1);
    }

    #[test]
    fn test_filter_peers() {
        let all = peers([
            ("test-worker-1", "key1", "10.0.0.3/32"),
            ("test-worker-2", "key2", "10.0.0.4/32"),
            ("test-worker-3", "key3", "10.0.0.21/32"),
        ]);

        assert_eq!(filter_peers::<&str>(Some(&PeerMap::new()), Some(&[] as &[&str])), PeerMap::new());
        assert_eq!(filter_peers::<&str>(Some(&all), Some(&[] as &[&str])), all);
        assert_eq!(filter_peers::<&str>(Some(&all), None), all);
        assert_eq!(filter_peers(None, Some(["test-worker-1"].as_slice())), PeerMap::new());

        assert_eq!(
            filter_peers(Some(&all), Some(["test-worker-2", "test-worker-1"].as_slice())),
            peers([
                ("test-worker-1", "key1", "10.0.0.3/32"),
                ("test-worker-2", "key2", "10.0.0.4/32"),
            ])
        );
        assert_eq!(filter_peers(Some(&all), Some(["other-host"].as_slice())), PeerMap::new());
        assert_eq!(filter_peers(Some(&all), Some(["test-worker"].as_slice())), PeerMap::new());
    }

    #[test]
    fn test_filter_names() {
        for filter in Filter::ALL {
            assert_eq!(filter.name().parse::<Filter>().unwrap(), filter);
        }

        assert_eq!(Filter::MergePeers.to_string(), "merge_wireguard_peers");
        assert!(matches!(
            "parse_ini".parse::<Filter>(),
            Err(Error::UnknownFilter(name)) if name == "parse_ini"
        ));
    }

    #[test]
    fn test_apply_parse_config() {
        let text = "[Interface]\nPrivateKey = priv\n# PublicKey = pub\n\n[Peer]\n# worker-1\nPublicKey = K2\nAllowedIPs = 10.0.0.3/32\n";

        assert_eq!(
            Filter::ParseConfig.apply(&[json!(text)]).unwrap(),
            json!({
                "interface": { "privatekey": "priv", "public_key": "pub" },
                "peers": { "worker-1": { "public_key": "K2", "allowed_ips": "10.0.0.3/32" } },
            })
        );
        assert_eq!(
            Filter::ParsePeers.apply(&[json!(text)]).unwrap(),
            json!({ "worker-1": { "public_key": "K2", "allowed_ips": "10.0.0.3/32" } })
        );
        assert_eq!(Filter::ParsePeers.apply(&[Value::Null]).unwrap(), json!({}));
        assert_eq!(
            Filter::ParseConfig.apply(&[]).unwrap(),
            json!({ "interface": {}, "peers": {} })
        );
    }

    #[test]
    fn test_apply_merge_and_filter() {
        let existing = json!({ "a": { "public_key": "k1", "allowed_ips": "10.0.0.3/32" } });
        let incoming = json!({
            "a": { "public_key": "k2", "allowed_ips": "10.0.0.3/32", "endpoint": "h:1" },
            "b": { "public_key": "k3", "allowed_ips": "10.0.0.4/32" },
        });

        let merged = Filter::MergePeers.apply(&[existing, incoming]).unwrap();
        assert_eq!(
            merged,
            json!({
                "a": { "public_key": "k2", "allowed_ips": "10.0.0.3/32", "endpoint": "h:1" },
                "b": { "public_key": "k3", "allowed_ips": "10.0.0.4/32" },
            })
        );

        assert_eq!(Filter::MergePeers.apply(&[Value::Null, Value::Null]).unwrap(), json!({}));

        assert_eq!(
            Filter::FilterByInventory.apply(&[merged.clone(), json!(["b"])]).unwrap(),
            json!({ "b": { "public_key": "k3", "allowed_ips": "10.0.0.4/32" } })
        );
        assert_eq!(Filter::FilterByInventory.apply(&[merged.clone(), json!([])]).unwrap(), merged);
        assert_eq!(Filter::FilterByInventory.apply(&[Value::Null, json!(["b"])]).unwrap(), json!({}));
    }

    #[test]
    fn test_apply_rejects_wrong_shapes() {
        assert!(matches!(
            Filter::ParseConfig.apply(&[json!(42)]),
            Err(Error::ArgumentError { filter: Filter::ParseConfig, index: 0, .. })
        ));
        assert!(matches!(
            Filter::FilterByInventory.apply(&[json!({}), json!("b")]),
            Err(Error::ArgumentError { index: 1, .. })
        ));
        assert!(matches!(
            Filter::MergePeers.apply(&[json!([1, 2])]),
            Err(Error::ArgumentError { index: 0, .. })
        ));
    }
}
