//! Probe matching
//!
//! A probe matches when its type list and its scope list each either are empty
//! or share at least one entry with what the device advertises.

use crate::message::{Endpoint, Probe};

pub const MATCH_BY_RFC3986: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery/rfc3986";
pub const MATCH_BY_STRCMP0: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery/strcmp0";

/// Scope matching rule named by a probe's `MatchBy` attribute
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MatchBy {
    /// Segment-wise prefix with case-insensitive scheme and authority
    #[default]
    Rfc3986,
    /// Exact string comparison
    Strcmp0,
    /// A rule this responder does not implement; never matches
    Unsupported(String),
}

impl MatchBy {
    /// Rule for a `MatchBy` value, `None` meaning the default
    pub fn from_uri(uri: Option<&str>) -> Self {
        match uri.map(str::trim) {
            None | Some("") | Some(MATCH_BY_RFC3986) => MatchBy::Rfc3986,
            Some(MATCH_BY_STRCMP0) => MatchBy::Strcmp0,
            Some(other) => MatchBy::Unsupported(other.to_string()),
        }
    }

    pub fn uri(&self) -> &str {
        match self {
            MatchBy::Rfc3986 => MATCH_BY_RFC3986,
            MatchBy::Strcmp0 => MATCH_BY_STRCMP0,
            MatchBy::Unsupported(uri) => uri,
        }
    }
}

/// Does `requested` select `advertised` under `rule`?
pub fn scope_matches(requested: &str, advertised: &str, rule: &MatchBy) -> bool {
    match rule {
        MatchBy::Strcmp0 => requested == advertised,
        MatchBy::Rfc3986 => rfc3986_matches(requested, advertised),
        MatchBy::Unsupported(_) => false,
    }
}

fn rfc3986_matches(requested: &str, advertised: &str) -> bool {
    let (Some(req), Some(adv)) = (split_uri(requested), split_uri(advertised)) else {
        return requested == advertised;
    };

    if !req.scheme.eq_ignore_ascii_case(adv.scheme)
        || !req.authority.eq_ignore_ascii_case(adv.authority)
    {
        return false;
    }

    let req_segments = segments(req.path);
    let adv_segments = segments(adv.path);
    if req_segments
        .iter()
        .chain(adv_segments.iter())
        .any(|s| *s == "." || *s == "..")
    {
        return false;
    }

    req_segments.len() <= adv_segments.len()
        && req_segments
            .iter()
            .zip(adv_segments.iter())
            .all(|(r, a)| r == a)
}

struct UriParts<'a> {
    scheme: &'a str,
    authority: &'a str,
    path: &'a str,
}

fn split_uri(uri: &str) -> Option<UriParts<'_>> {
    let (scheme, rest) = uri.split_once("://")?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    Some(UriParts {
        scheme,
        authority,
        path,
    })
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Types compare by local name, so `dn:NetworkVideoTransmitter` and a
/// differently-prefixed spelling of the same type both match
pub fn types_match(requested: &[String], advertised: &[&str]) -> bool {
    requested.is_empty()
        || requested
            .iter()
            .any(|r| advertised.iter().any(|a| local_name(r) == local_name(a)))
}

fn local_name(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname)
}

pub fn scopes_match(requested: &[String], advertised: &[String], rule: &MatchBy) -> bool {
    requested.is_empty()
        || requested
            .iter()
            .any(|r| advertised.iter().any(|a| scope_matches(r, a, rule)))
}

/// Whether `endpoint` should answer `probe`
pub fn probe_matches(probe: &Probe, endpoint: &Endpoint) -> bool {
    let advertised_types: Vec<&str> = endpoint.types.iter().map(|t| t.qname()).collect();
    types_match(&probe.types, &advertised_types)
        && scopes_match(&probe.scopes, &endpoint.scopes, &probe.match_by)
}
