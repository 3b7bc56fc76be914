//! Per-kind transport capabilities
//!
//! Every driver exposes a different subset of transport security knobs. The
//! policy builder consults this table instead of special casing engines.

use crate::target::Kind;

/// Whether the engine talks over a network transport at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Network,
    /// File based engine, the trust mode is a no-op
    Local,
}

/// Where verification anchors come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorSource {
    /// Root bundle file, or the system roots when none is given
    Files,
    /// Driver managed wallet, required for verification
    Wallet,
}

/// How a client certificate is presented to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientIdentitySupport {
    /// Separate certificate and key PEM files
    SeparateFiles,
    /// One PEM file holding both certificate and key
    CombinedFile,
    /// Only through the wallet
    Wallet,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustProfile {
    pub name: &'static str,
    pub transport: Transport,
    pub anchors: AnchorSource,
    pub client_identity: ClientIdentitySupport,
}

impl TrustProfile {
    /// Profile for engines without overrides
    pub const GENERIC: Self = Self {
        name: "generic",
        transport: Transport::Network,
        anchors: AnchorSource::Files,
        client_identity: ClientIdentitySupport::SeparateFiles,
    };

    /// Look up the profile for a kind, falling back to [`TrustProfile::GENERIC`]
    #[must_use]
    pub fn for_kind(kind: Kind) -> Self {
        OVERRIDES
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(Self::GENERIC, |(_, profile)| *profile)
    }
}

const OVERRIDES: [(Kind, TrustProfile); 4] = [
    (
        Kind::SqlServer,
        TrustProfile {
            name: "sqlserver",
            transport: Transport::Network,
            anchors: AnchorSource::Files,
            client_identity: ClientIdentitySupport::Unsupported,
        },
    ),
    (
        Kind::Oracle,
        TrustProfile {
            name: "oracle",
            transport: Transport::Network,
            anchors: AnchorSource::Wallet,
            client_identity: ClientIdentitySupport::Wallet,
        },
    ),
    (
        Kind::Sqlite,
        TrustProfile {
            name: "sqlite",
            transport: Transport::Local,
            anchors: AnchorSource::Files,
            client_identity: ClientIdentitySupport::Unsupported,
        },
    ),
    (
        Kind::MongoDb,
        TrustProfile {
            name: "mongodb",
            transport: Transport::Network,
            anchors: AnchorSource::Files,
            client_identity: ClientIdentitySupport::CombinedFile,
        },
    ),
];
