//! WS-Discovery (2005/04) messages
//!
//! Outgoing messages are rendered through the SOAP envelope writer; incoming
//! datagrams go through the same envelope parser the HTTP services use.

use config_manager::DeviceConfig;
use onvif_soap::{ns, xml_escape, EnvelopeBuilder, SoapMessage, SoapVersion};
use uuid::Uuid;

use crate::error::DiscoveryError;
use crate::matching::MatchBy;

/// `wsa:To` of multicast messages
pub const DISCOVERY_URN: &str = "urn:schemas-xmlsoap-org:ws:2005:04:discovery";

/// `wsa:To` of unicast replies
pub const ANONYMOUS_ROLE: &str = "http://schemas.xmlsoap.org/ws/2004/08/addressing/role/anonymous";

pub const ACTION_HELLO: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery/Hello";
pub const ACTION_BYE: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery/Bye";
pub const ACTION_PROBE: &str = "http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe";
pub const ACTION_PROBE_MATCHES: &str =
    "http://schemas.xmlsoap.org/ws/2005/04/discovery/ProbeMatches";

/// A discoverable type, written as a prefixed QName
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceType {
    pub prefix: &'static str,
    pub namespace: &'static str,
    qname: &'static str,
}

impl DeviceType {
    pub fn qname(&self) -> &'static str {
        self.qname
    }
}

pub const NETWORK_VIDEO_TRANSMITTER: DeviceType = DeviceType {
    prefix: "dn",
    namespace: ns::DN,
    qname: "dn:NetworkVideoTransmitter",
};

pub const DEVICE: DeviceType = DeviceType {
    prefix: "tds",
    namespace: ns::TDS,
    qname: "tds:Device",
};

/// What the responder announces about the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// `urn:uuid:` endpoint reference, stable across restarts
    pub address: String,
    pub types: Vec<DeviceType>,
    pub scopes: Vec<String>,
    pub xaddrs: Vec<String>,
    pub metadata_version: u32,
}

impl Endpoint {
    pub fn from_device(device: &DeviceConfig) -> Self {
        Self {
            address: device.descriptor.endpoint_reference(),
            types: vec![NETWORK_VIDEO_TRANSMITTER, DEVICE],
            scopes: device.scopes().iter().map(|s| s.item.clone()).collect(),
            xaddrs: vec![device.device_service_url()],
            metadata_version: 1,
        }
    }

    fn types_text(&self) -> String {
        self.types
            .iter()
            .map(|t| t.qname())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// EndpointReference, Types, Scopes, XAddrs and MetadataVersion
    fn body_fields(&self) -> String {
        format!(
            r#"      <a:EndpointReference><a:Address>{}</a:Address></a:EndpointReference>
      <d:Types>{}</d:Types>
      <d:Scopes>{}</d:Scopes>
      <d:XAddrs>{}</d:XAddrs>
      <d:MetadataVersion>{}</d:MetadataVersion>"#,
            xml_escape(&self.address),
            self.types_text(),
            xml_escape(&self.scopes.join(" ")),
            xml_escape(&self.xaddrs.join(" ")),
            self.metadata_version
        )
    }
}

/// `d:AppSequence` header block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppSequence {
    pub instance_id: u64,
    pub message_number: u64,
}

impl AppSequence {
    fn to_xml(self) -> String {
        format!(
            r#"    <d:AppSequence InstanceId="{}" MessageNumber="{}"/>"#,
            self.instance_id, self.message_number
        )
    }

    fn from_message(msg: &SoapMessage) -> Option<Self> {
        let param = msg.header.params.param("AppSequence")?;
        Some(Self {
            instance_id: param.attribute("InstanceId")?.parse().ok()?,
            message_number: param.attribute("MessageNumber")?.parse().ok()?,
        })
    }
}

/// Fresh `urn:uuid:` message id
pub fn new_message_id() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}

fn builder(version: SoapVersion) -> EnvelopeBuilder {
    EnvelopeBuilder::new(version)
        .namespace("a", ns::WSA_2004)
        .namespace("d", ns::WSD)
        .namespace("dn", ns::DN)
        .namespace("tds", ns::TDS)
}

fn header(
    action: &str,
    to: &str,
    message_id: &str,
    relates_to: Option<&str>,
    sequence: Option<AppSequence>,
) -> String {
    let mut lines = vec![
        format!("    <a:MessageID>{}</a:MessageID>", xml_escape(message_id)),
        format!("    <a:Action>{}</a:Action>", action),
        format!("    <a:To>{}</a:To>", to),
    ];
    if let Some(relates_to) = relates_to {
        lines.push(format!(
            "    <a:RelatesTo>{}</a:RelatesTo>",
            xml_escape(relates_to)
        ));
    }
    if let Some(sequence) = sequence {
        lines.push(sequence.to_xml());
    }
    lines.join("\n")
}

/// Multicast announcement of arrival
pub fn hello(endpoint: &Endpoint, sequence: AppSequence) -> String {
    builder(SoapVersion::Soap12)
        .header(header(
            ACTION_HELLO,
            DISCOVERY_URN,
            &new_message_id(),
            None,
            Some(sequence),
        ))
        .body(&format!(
            "    <d:Hello>\n{}\n    </d:Hello>",
            endpoint.body_fields()
        ))
}

/// Multicast announcement of departure
pub fn bye(endpoint: &Endpoint, sequence: AppSequence) -> String {
    builder(SoapVersion::Soap12)
        .header(header(
            ACTION_BYE,
            DISCOVERY_URN,
            &new_message_id(),
            None,
            Some(sequence),
        ))
        .body(&format!(
            r#"    <d:Bye>
      <a:EndpointReference><a:Address>{}</a:Address></a:EndpointReference>
    </d:Bye>"#,
            xml_escape(&endpoint.address)
        ))
}

/// Unicast answer to `probe`, in the probe's envelope version
pub fn probe_match(endpoint: &Endpoint, probe: &Probe, sequence: AppSequence) -> String {
    builder(probe.version)
        .header(header(
            ACTION_PROBE_MATCHES,
            ANONYMOUS_ROLE,
            &new_message_id(),
            Some(&probe.message_id),
            Some(sequence),
        ))
        .body(&format!(
            "    <d:ProbeMatches>\n      <d:ProbeMatch>\n{}\n      </d:ProbeMatch>\n    </d:ProbeMatches>",
            endpoint.body_fields()
        ))
}

/// A received `Probe`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub version: SoapVersion,
    pub message_id: String,
    /// Requested types as written, e.g. `dn:NetworkVideoTransmitter`
    pub types: Vec<String>,
    pub scopes: Vec<String>,
    pub match_by: MatchBy,
}

impl Probe {
    pub fn new(types: &[&str], scopes: &[&str]) -> Self {
        Self {
            version: SoapVersion::Soap12,
            message_id: new_message_id(),
            types: types.iter().map(|t| t.to_string()).collect(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            match_by: MatchBy::default(),
        }
    }

    /// A Probe datagram; anything else is an error the caller drops
    pub fn parse(datagram: &[u8]) -> Result<Self, DiscoveryError> {
        let msg = onvif_soap::parse(datagram)?;
        expect_action(&msg, "Probe")?;

        let message_id = msg
            .header
            .message_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or(DiscoveryError::MissingElement("MessageID"))?;

        let scopes = msg.body.params.param("Scopes");
        Ok(Self {
            version: msg.version,
            message_id,
            types: split_list(msg.body.params.get("Types")),
            scopes: split_list(scopes.map(|p| p.text.as_str())),
            match_by: MatchBy::from_uri(scopes.and_then(|p| p.attribute("MatchBy"))),
        })
    }

    /// Render as a client would send it
    pub fn to_xml(&self) -> String {
        let match_by = match self.match_by {
            MatchBy::Rfc3986 => String::new(),
            ref rule => format!(r#" MatchBy="{}""#, xml_escape(rule.uri())),
        };
        builder(self.version)
            .header(header(
                ACTION_PROBE,
                DISCOVERY_URN,
                &self.message_id,
                None,
                None,
            ))
            .body(&format!(
                r#"    <d:Probe>
      <d:Types>{}</d:Types>
      <d:Scopes{}>{}</d:Scopes>
    </d:Probe>"#,
                xml_escape(&self.types.join(" ")),
                match_by,
                xml_escape(&self.scopes.join(" "))
            ))
    }
}

/// A received `ProbeMatches` with a single match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMatch {
    pub version: SoapVersion,
    pub relates_to: String,
    pub address: String,
    pub types: Vec<String>,
    pub scopes: Vec<String>,
    pub xaddrs: Vec<String>,
    pub sequence: Option<AppSequence>,
}

impl ProbeMatch {
    pub fn parse(datagram: &[u8]) -> Result<Self, DiscoveryError> {
        let msg = onvif_soap::parse(datagram)?;
        expect_action(&msg, "ProbeMatches")?;

        Ok(Self {
            version: msg.version,
            relates_to: msg
                .header
                .relates_to
                .clone()
                .ok_or(DiscoveryError::MissingElement("RelatesTo"))?,
            address: msg
                .body
                .params
                .find("EndpointReference", "Address")
                .map(|p| p.text.clone())
                .ok_or(DiscoveryError::MissingElement("EndpointReference"))?,
            types: split_list(msg.body.params.get("Types")),
            scopes: split_list(msg.body.params.get("Scopes")),
            xaddrs: split_list(msg.body.params.get("XAddrs")),
            sequence: AppSequence::from_message(&msg),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementKind {
    Hello,
    Bye,
}

/// A received `Hello` or `Bye`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub kind: AnnouncementKind,
    pub address: String,
    pub xaddrs: Vec<String>,
    pub sequence: Option<AppSequence>,
}

impl Announcement {
    pub fn parse(datagram: &[u8]) -> Result<Self, DiscoveryError> {
        let msg = onvif_soap::parse(datagram)?;
        let kind = match (msg.action(), msg.body.namespace.as_deref()) {
            ("Hello", Some(ns::WSD)) => AnnouncementKind::Hello,
            ("Bye", Some(ns::WSD)) => AnnouncementKind::Bye,
            (found, _) => {
                return Err(DiscoveryError::UnexpectedMessage {
                    expected: "Hello or Bye",
                    found: found.to_string(),
                })
            }
        };

        Ok(Self {
            kind,
            address: msg
                .body
                .params
                .find("EndpointReference", "Address")
                .map(|p| p.text.clone())
                .ok_or(DiscoveryError::MissingElement("EndpointReference"))?,
            xaddrs: split_list(msg.body.params.get("XAddrs")),
            sequence: AppSequence::from_message(&msg),
        })
    }
}

fn expect_action(msg: &SoapMessage, expected: &'static str) -> Result<(), DiscoveryError> {
    if msg.action() == expected && msg.body.namespace.as_deref() == Some(ns::WSD) {
        return Ok(());
    }
    Err(DiscoveryError::UnexpectedMessage {
        expected,
        found: msg.action().to_string(),
    })
}

fn split_list(text: Option<&str>) -> Vec<String> {
    text.map(|t| t.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint {
            address: "urn:uuid:5f5a1c2e-0000-4000-8000-000000000001".to_string(),
            types: vec![NETWORK_VIDEO_TRANSMITTER, DEVICE],
            scopes: vec![
                "onvif://www.onvif.org/type/video_encoder".to_string(),
                "onvif://www.onvif.org/name/Front_Door".to_string(),
            ],
            xaddrs: vec!["http://192.168.1.20:8080/onvif/device_service".to_string()],
            metadata_version: 1,
        }
    }

    const SEQ: AppSequence = AppSequence {
        instance_id: 1700000000,
        message_number: 3,
    };

    #[test]
    fn test_parse_onvif_device_manager_probe() {
        let xml = br#"<?xml version="1.0" encoding="utf-8"?>
<Envelope xmlns:dn="http://www.onvif.org/ver10/network/wsdl" xmlns="http://www.w3.org/2003/05/soap-envelope">
  <Header>
    <wsa:MessageID xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing">uuid:7d6ad7f3-5f9f-4dc0-9a1d-3b6e6c0e2b10</wsa:MessageID>
    <wsa:To xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing">urn:schemas-xmlsoap-org:ws:2005:04:discovery</wsa:To>
    <wsa:Action xmlns:wsa="http://schemas.xmlsoap.org/ws/2004/08/addressing">http://schemas.xmlsoap.org/ws/2005/04/discovery/Probe</wsa:Action>
  </Header>
  <Body>
    <Probe xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns="http://schemas.xmlsoap.org/ws/2005/04/discovery">
      <Types>dn:NetworkVideoTransmitter</Types>
      <Scopes />
    </Probe>
  </Body>
</Envelope>"#;

        let probe = Probe::parse(xml).unwrap();
        assert_eq!(probe.version, SoapVersion::Soap12);
        assert_eq!(probe.message_id, "uuid:7d6ad7f3-5f9f-4dc0-9a1d-3b6e6c0e2b10");
        assert_eq!(probe.types, vec!["dn:NetworkVideoTransmitter"]);
        assert!(probe.scopes.is_empty());
        assert_eq!(probe.match_by, MatchBy::Rfc3986);
    }

    #[test]
    fn test_probe_without_message_id_is_rejected() {
        let xml = format!(
            r#"<s:Envelope xmlns:s="{}" xmlns:d="{}"><s:Body><d:Probe/></s:Body></s:Envelope>"#,
            ns::SOAP12,
            ns::WSD
        );
        assert!(matches!(
            Probe::parse(xml.as_bytes()),
            Err(DiscoveryError::MissingElement("MessageID"))
        ));
    }

    #[test]
    fn test_non_probe_is_rejected() {
        let hello = hello(&endpoint(), SEQ);
        assert!(matches!(
            Probe::parse(hello.as_bytes()),
            Err(DiscoveryError::UnexpectedMessage { .. })
        ));
        assert!(Probe::parse(b"\x00\x01 not xml").is_err());
    }

    #[test]
    fn test_probe_scopes_and_match_by() {
        let mut probe = Probe::new(&[], &["onvif://www.onvif.org/name/Front_Door"]);
        probe.match_by = MatchBy::Strcmp0;
        probe.version = SoapVersion::Soap11;

        let parsed = Probe::parse(probe.to_xml().as_bytes()).unwrap();
        assert_eq!(parsed, probe);
    }

    #[test]
    fn test_probe_match_echoes_message_id() {
        let probe = Probe::new(&["dn:NetworkVideoTransmitter"], &[]);
        let xml = probe_match(&endpoint(), &probe, SEQ);
        assert!(xml.contains(ACTION_PROBE_MATCHES));
        assert!(xml.contains(ANONYMOUS_ROLE));

        let parsed = ProbeMatch::parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.relates_to, probe.message_id);
        assert_eq!(parsed.address, endpoint().address);
        assert_eq!(
            parsed.types,
            vec!["dn:NetworkVideoTransmitter", "tds:Device"]
        );
        assert_eq!(parsed.scopes, endpoint().scopes);
        assert_eq!(parsed.xaddrs, endpoint().xaddrs);
        assert_eq!(parsed.sequence, Some(SEQ));
    }

    #[test]
    fn test_probe_match_uses_probe_version() {
        let mut probe = Probe::new(&[], &[]);
        probe.version = SoapVersion::Soap11;
        let xml = probe_match(&endpoint(), &probe, SEQ);
        assert_eq!(
            ProbeMatch::parse(xml.as_bytes()).unwrap().version,
            SoapVersion::Soap11
        );
    }

    #[test]
    fn test_hello_and_bye() {
        let xml = hello(&endpoint(), SEQ);
        assert!(xml.contains(ACTION_HELLO));
        assert!(xml.contains(DISCOVERY_URN));
        let hello = Announcement::parse(xml.as_bytes()).unwrap();
        assert_eq!(hello.kind, AnnouncementKind::Hello);
        assert_eq!(hello.address, endpoint().address);
        assert_eq!(hello.xaddrs, endpoint().xaddrs);
        assert_eq!(hello.sequence, Some(SEQ));

        let xml = bye(&endpoint(), SEQ);
        let bye = Announcement::parse(xml.as_bytes()).unwrap();
        assert_eq!(bye.kind, AnnouncementKind::Bye);
        assert_eq!(bye.address, endpoint().address);
        assert!(bye.xaddrs.is_empty());
    }

    #[test]
    fn test_fresh_message_ids() {
        let a = new_message_id();
        assert!(a.starts_with("urn:uuid:"));
        assert_ne!(a, new_message_id());
    }
}
