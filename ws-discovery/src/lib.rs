//! WS-Discovery for the ONVIF bridge
//!
//! Makes the bridge visible to NVRs that search the local network: a Hello on
//! start, a ProbeMatch for every matching Probe, a Bye on shutdown.
//! Unparseable or foreign datagrams are dropped without a reply.

mod error;
pub mod matching;
pub mod message;
mod responder;

pub use error::DiscoveryError;
pub use matching::{probe_matches, MatchBy};
pub use message::{
    Announcement, AnnouncementKind, AppSequence, DeviceType, Endpoint, Probe, ProbeMatch,
};
pub use responder::{
    DiscoverySettings, Responder, ResponderState, DISCOVERY_PORT, MULTICAST_GROUP,
};
