use serde::{Deserialize, Serialize};

use super::{Key, PeerMap, instance::WgInterfaceInfo, key_prefix, peer::WgPeerInfo};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WgConfig {
    pub interface: WgInterfaceInfo,
    pub peers: PeerMap,
}

/// Input irregularity the lenient parser absorbed. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Diagnostic {
    #[error("line {line}: peer section has no PublicKey, dropped")]
    PeerWithoutPublicKey { line: usize },

    #[error("line {line}: property outside of any section, ignored")]
    PropertyOutsideSection { line: usize },

    #[error("line {line}: unrecognized line, ignored")]
    UnrecognizedLine { line: usize },

    #[error("line {line}: unknown section {header}")]
    UnknownSection { line: usize, header: String },

    #[error("line {line}: malformed key: {reason}")]
    MalformedKey { line: usize, reason: String },
}

impl Diagnostic {
    pub fn line(&self) -> usize {
        match self {
            Diagnostic::PeerWithoutPublicKey { line }
            | Diagnostic::PropertyOutsideSection { line }
            | Diagnostic::UnrecognizedLine { line }
            | Diagnostic::UnknownSection { line, .. }
            | Diagnostic::MalformedKey { line, .. } => *line,
        }
    }
}

impl WgConfig {
    /// Lenient parse: never fails, anything it can't use is skipped.
    pub fn parse_config(input: &str) -> Self {
        Self::parse_with_diagnostics(input).0
    }

    /// Same result as [`WgConfig::parse_config`], plus one diagnostic for
    /// every line or section that was skipped on the way.
    pub fn parse_with_diagnostics(input: &str) -> (Self, Vec<Diagnostic>) {
        let mut parser = Parser::default();

        for (idx, raw) in input.lines().enumerate() {
            parser.feed(idx + 1, raw);
        }

        parser.finish()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Comment(&'a str),
    Section(&'a str),
    Property(PropKind, String, &'a str),
    Other,
}

impl<'a> Line<'a> {
    fn classify(raw: &'a str) -> Self {
        let line = raw.trim();

        if line.is_empty() {
            Line::Blank
        } else if let Some(text) = line.strip_prefix('#') {
            Line::Comment(text.trim())
        } else if line.starts_with('[') {
            Line::Section(line)
        } else if let Some((key, value)) = line.split_once('=') {
            let key = key.trim().to_lowercase();
            Line::Property(PropKind::from(key.as_str()), key, value.trim())
        } else {
            Line::Other
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Interface,
    Peer,
    Unknown,
}

impl SectionKind {
    fn from_header(header: &str) -> Self {
        if header.contains("[Peer]") {
            SectionKind::Peer
        } else if header.contains("[Interface]") {
            SectionKind::Interface
        } else {
            SectionKind::Unknown
        }
    }
}

/// Recognized property names, matched on the lowercased key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropKind {
    PublicKey,
    AllowedIPs,
    Endpoint,
    PersistentKeepalive,
    PrivateKey,
    Address,
    ListenPort,
    Unknown,
}

impl From<&str> for PropKind {
    fn from(key: &str) -> Self {
        match key {
            "publickey" => PropKind::PublicKey,
            "allowedips" => PropKind::AllowedIPs,
            "endpoint" => PropKind::Endpoint,
            "persistentkeepalive" => PropKind::PersistentKeepalive,
            "privatekey" => PropKind::PrivateKey,
            "address" => PropKind::Address,
            "listenport" => PropKind::ListenPort,
            _ => PropKind::Unknown,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct PeerBuilder {
    // line of the [Peer] header
    line: usize,
    public_key: Option<String>,
    allowed_ips: Option<String>,
    endpoint: Option<String>,
    persistent_keepalive: Option<String>,
}

impl PeerBuilder {
    fn new(line: usize) -> Self {
        Self {
            line,
            ..Default::default()
        }
    }

    fn set(&mut self, kind: PropKind, key: &str, value: &str) {
        let slot = match kind {
            PropKind::PublicKey => &mut self.public_key,
            PropKind::AllowedIPs => &mut self.allowed_ips,
            PropKind::Endpoint => &mut self.endpoint,
            PropKind::PersistentKeepalive => &mut self.persistent_keepalive,
            _ => {
                log::trace!("peer property {key} ignored");
                return;
            }
        };

        *slot = Some(value.to_string());
    }

    /// `None` unless a non-empty public key was seen.
    fn build(&self, comment: &str) -> Option<(String, WgPeerInfo)> {
        let public_key = self.public_key.as_deref().filter(|k| !k.is_empty())?;

        let name = if comment.is_empty() {
            key_prefix(public_key)
        } else {
            comment.to_string()
        };

        let peer = WgPeerInfo {
            public_key: public_key.to_string(),
            allowed_ips: self.allowed_ips.clone().unwrap_or_default(),
            endpoint: self.endpoint.clone(),
            persistent_keepalive: self.persistent_keepalive.clone(),
        };

        Some((name, peer))
    }
}

#[derive(Debug, Default)]
enum Section {
    #[default]
    None,
    Interface,
    Peer(PeerBuilder),
}

#[derive(Debug, Default)]
struct Parser {
    section: Section,
    // last comment since the section header, empty when none
    comment: String,
    interface: WgInterfaceInfo,
    peers: PeerMap,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    fn feed(&mut self, line: usize, raw: &str) {
        let classified = Line::classify(raw);
        log::trace!("line {line}: {classified:?}");

        match classified {
            Line::Blank => {}
            Line::Comment(text) => self.comment(line, text),
            Line::Section(header) => self.section(line, header),
            Line::Property(kind, key, value) => self.property(line, kind, &key, value),
            Line::Other => self
                .diagnostics
                .push(Diagnostic::UnrecognizedLine { line }),
        }
    }

    fn comment(&mut self, line: usize, text: &str) {
        if matches!(self.section, Section::Interface) {
            if let Some(public_key) = public_key_comment(text) {
                self.check_key(line, public_key);
                self.interface.public_key = Some(public_key.to_string());
                return;
            }
        }

        self.comment = text.to_string();
    }

    fn section(&mut self, line: usize, header: &str) {
        match SectionKind::from_header(header) {
            SectionKind::Peer => {
                self.close();
                self.section = Section::Peer(PeerBuilder::new(line));
                self.comment.clear();
            }
            SectionKind::Interface => {
                self.close();
                self.section = Section::Interface;
                self.comment.clear();
            }
            SectionKind::Unknown => {
                self.diagnostics.push(Diagnostic::UnknownSection {
                    line,
                    header: header.to_string(),
                });

                // the peer is emitted as it stands but its section stays open
                let built = match &self.section {
                    Section::Peer(builder) => builder.build(&self.comment),
                    _ => None,
                };
                if let Some((name, peer)) = built {
                    self.emit(name, peer);
                }
            }
        }
    }

    fn property(&mut self, line: usize, kind: PropKind, key: &str, value: &str) {
        match &mut self.section {
            Section::None => self
                .diagnostics
                .push(Diagnostic::PropertyOutsideSection { line }),

            Section::Interface => match kind {
                PropKind::Address => self.interface.address = Some(value.to_string()),
                PropKind::ListenPort => self.interface.listen_port = Some(value.to_string()),
                PropKind::PrivateKey => self.interface.private_key = Some(value.to_string()),
                // a literal PublicKey line is kept as an ordinary property
                _ => {
                    self.interface
                        .extra
                        .insert(key.to_string(), value.to_string());
                }
            },

            Section::Peer(builder) => {
                builder.set(kind, key, value);
                if kind == PropKind::PublicKey && !value.is_empty() {
                    self.check_key(line, value);
                }
            }
        }
    }

    fn close(&mut self) {
        if let Section::Peer(builder) = std::mem::take(&mut self.section) {
            match builder.build(&self.comment) {
                Some((name, peer)) => self.emit(name, peer),
                None => {
                    log::debug!("peer section at line {} dropped, no public key", builder.line);
                    self.diagnostics
                        .push(Diagnostic::PeerWithoutPublicKey { line: builder.line });
                }
            }
        }
    }

    fn emit(&mut self, name: String, peer: WgPeerInfo) {
        log::debug!("peer {name}: {}", peer.public_key);
        if self.peers.insert(name, peer).is_some() {
            log::debug!("peer name repeated, earlier entry replaced");
        }
    }

    fn check_key(&mut self, line: usize, value: &str) {
        if let Err(err) = value.parse::<Key>() {
            self.diagnostics.push(Diagnostic::MalformedKey {
                line,
                reason: err.to_string(),
            });
        }
    }

    fn finish(mut self) -> (WgConfig, Vec<Diagnostic>) {
        self.close();

        let config = WgConfig {
            interface: self.interface,
            peers: self.peers,
        };

        (config, self.diagnostics)
    }
}

/// Value of a `PublicKey = <value>` comment, key matched case-insensitively.
fn public_key_comment(text: &str) -> Option<&str> {
    let (key, value) = text.split_once('=')?;
    key.trim()
        .eq_ignore_ascii_case("publickey")
        .then(|| value.trim())
}
