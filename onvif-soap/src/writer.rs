//! Response envelope writer

use quick_xml::escape::escape;

use crate::envelope::SoapVersion;
use crate::fault::SoapFault;
use crate::ns;

/// Escape a string for XML text or attribute content
pub fn xml_escape(s: &str) -> String {
    escape(s).to_string()
}

/// Assembles an `s:Envelope` around caller-supplied header and body XML
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    version: SoapVersion,
    namespaces: Vec<(&'static str, &'static str)>,
    header: Option<String>,
}

impl EnvelopeBuilder {
    pub fn new(version: SoapVersion) -> Self {
        Self {
            version,
            namespaces: Vec::new(),
            header: None,
        }
    }

    /// Builder with every ONVIF prefix the service templates use
    pub fn onvif(version: SoapVersion) -> Self {
        Self::new(version)
            .namespace("tds", ns::TDS)
            .namespace("trt", ns::TRT)
            .namespace("tev", ns::TEV)
            .namespace("tt", ns::TT)
            .namespace("ter", ns::TER)
            .namespace("wsnt", ns::WSNT)
            .namespace("wstop", ns::WSTOP)
            .namespace("wsa", ns::WSA)
    }

    pub fn namespace(mut self, prefix: &'static str, uri: &'static str) -> Self {
        self.namespaces.push((prefix, uri));
        self
    }

    pub fn header(mut self, xml: impl Into<String>) -> Self {
        self.header = Some(xml.into());
        self
    }

    pub fn body(self, xml: &str) -> String {
        let mut out = String::with_capacity(xml.len() + 512);
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        out.push('\n');
        out.push_str(r#"<s:Envelope xmlns:s=""#);
        out.push_str(self.version.namespace());
        out.push('"');
        for (prefix, uri) in &self.namespaces {
            out.push_str(&format!(r#" xmlns:{}="{}""#, prefix, uri));
        }
        out.push_str(">\n");

        if let Some(header) = &self.header {
            out.push_str("  <s:Header>\n");
            out.push_str(header);
            out.push_str("\n  </s:Header>\n");
        }

        out.push_str("  <s:Body>\n");
        out.push_str(xml);
        out.push_str("\n  </s:Body>\n</s:Envelope>");
        out
    }
}

/// Wrap a response body in an envelope of the given version
pub fn wrap(version: SoapVersion, body: &str) -> String {
    EnvelopeBuilder::onvif(version).body(body)
}

/// Render a fault in the given envelope version
pub fn wrap_fault(version: SoapVersion, fault: &SoapFault) -> String {
    let code = fault.code().qname(version);
    let subcode = fault.kind.subcode();
    let reason = xml_escape(&fault.reason);

    let body = match version {
        SoapVersion::Soap11 => {
            let faultcode = match subcode {
                Some(sub) => format!("{}.{}", code, sub.trim_start_matches("ter:")),
                None => code.to_string(),
            };
            let detail = fault
                .detail
                .map(|d| format!("\n      <detail>{}</detail>", d))
                .unwrap_or_default();
            format!(
                r#"    <s:Fault>
      <faultcode>{}</faultcode>
      <faultstring>{}</faultstring>{}
    </s:Fault>"#,
                faultcode, reason, detail
            )
        }
        SoapVersion::Soap12 => {
            let nested = fault
                .detail
                .map(|d| {
                    format!(
                        "\n          <s:Subcode>\n            <s:Value>{}</s:Value>\n          </s:Subcode>",
                        d
                    )
                })
                .unwrap_or_default();
            let subcode = subcode
                .map(|sub| {
                    format!(
                        "\n        <s:Subcode>\n          <s:Value>{}</s:Value>{}\n        </s:Subcode>",
                        sub, nested
                    )
                })
                .unwrap_or_default();
            format!(
                r#"    <s:Fault>
      <s:Code>
        <s:Value>{}</s:Value>{}
      </s:Code>
      <s:Reason>
        <s:Text xml:lang="en">{}</s:Text>
      </s:Reason>
    </s:Fault>"#,
                code, subcode, reason
            )
        }
    };

    EnvelopeBuilder::new(version)
        .namespace("ter", ns::TER)
        .body(&body)
}
