//! Inbound envelope parsing
//!
//! One pass over the document with a namespace-aware reader. Leaf elements
//! under `Header` and under the action element are collected as [`Param`]s,
//! keyed by local name and tagged with their parent's local name so that
//! `UsernameToken/Created` and `Timestamp/Created` stay distinguishable.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use ws_security::{PasswordType, UsernameToken};

use crate::error::ParseError;
use crate::ns;

/// SOAP envelope version, identified by the `Envelope` namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoapVersion {
    Soap11,
    #[default]
    Soap12,
}

impl SoapVersion {
    pub fn namespace(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => ns::SOAP11,
            SoapVersion::Soap12 => ns::SOAP12,
        }
    }

    pub fn from_namespace(uri: &str) -> Option<Self> {
        match uri {
            ns::SOAP11 => Some(SoapVersion::Soap11),
            ns::SOAP12 => Some(SoapVersion::Soap12),
            _ => None,
        }
    }

    /// HTTP content type that goes with this envelope version
    pub fn content_type(self) -> &'static str {
        match self {
            SoapVersion::Soap11 => "text/xml; charset=utf-8",
            SoapVersion::Soap12 => "application/soap+xml; charset=utf-8",
        }
    }
}

/// A leaf element with its text and attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Local name of the element
    pub name: String,
    /// Local name of the enclosing element
    pub parent: String,
    /// Unescaped, trimmed text content
    pub text: String,
    /// Non-namespace attributes as (local name, value)
    pub attributes: Vec<(String, String)>,
}

impl Param {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Leaf elements in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<Param>);

impl Params {
    /// Text of the first leaf with this local name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.param(name).map(|p| p.text.as_str())
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.0.iter().find(|p| p.name == name)
    }

    /// First leaf named `name` directly inside an element named `parent`
    pub fn find(&self, parent: &str, name: &str) -> Option<&Param> {
        self.0.iter().find(|p| p.parent == parent && p.name == name)
    }

    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Param> + 'a {
        self.0.iter().filter(move |p| p.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Addressing and security blocks from `Header`
#[derive(Debug, Clone, Default)]
pub struct Header {
    pub message_id: Option<String>,
    pub relates_to: Option<String>,
    pub action: Option<String>,
    pub to: Option<String>,
    /// `ReplyTo/Address`
    pub reply_to: Option<String>,
    /// A `Security` block was present, with or without a token
    pub security_present: bool,
    pub username_token: Option<UsernameToken>,
    pub params: Params,
}

/// The action element and its parameters
#[derive(Debug, Clone)]
pub struct Body {
    /// Local name of the single child of `Body`
    pub action: String,
    /// Namespace URI of the action element, if bound
    pub namespace: Option<String>,
    pub params: Params,
}

/// A parsed SOAP envelope
#[derive(Debug, Clone)]
pub struct SoapMessage {
    pub version: SoapVersion,
    pub header: Header,
    pub body: Body,
}

impl SoapMessage {
    pub fn action(&self) -> &str {
        &self.body.action
    }

    /// Body parameter text by local name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.body.params.get(name)
    }
}

/// Open element on the parse stack
struct Frame {
    name: String,
    text: String,
    attributes: Vec<(String, String)>,
    children: usize,
}

#[derive(Default)]
struct Collector {
    version: Option<SoapVersion>,
    stack: Vec<Frame>,
    root_closed: bool,
    body_seen: bool,
    security_present: bool,
    token_present: bool,
    action: Option<(String, Option<String>)>,
    header_params: Vec<Param>,
    body_params: Vec<Param>,
}

impl Collector {
    /// Section (`Header` / `Body`) the top of the stack sits in
    fn section(&self) -> Option<&str> {
        self.stack.get(1).map(|f| f.name.as_str())
    }

    fn open(&mut self, ns: Option<String>, e: &BytesStart<'_>) -> Result<(), ParseError> {
        let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
        let depth = self.stack.len();

        match depth {
            0 => {
                if self.root_closed {
                    return Err(ParseError::MultipleRoots);
                }
                if name != "Envelope" {
                    return Err(ParseError::NotAnEnvelope(name));
                }
                let uri = ns.unwrap_or_default();
                let version = SoapVersion::from_namespace(&uri)
                    .ok_or(ParseError::UnknownEnvelopeNamespace(uri))?;
                self.version = Some(version);
            }
            1 if name == "Body" => {
                if self.body_seen {
                    return Err(ParseError::DuplicateBody);
                }
                self.body_seen = true;
            }
            2 if self.section() == Some("Body") => {
                if self.action.is_some() {
                    return Err(ParseError::MultipleActions);
                }
                self.action = Some((name.clone(), ns));
            }
            _ if self.section() == Some("Header") => match name.as_str() {
                "Security" => self.security_present = true,
                "UsernameToken" => self.token_present = true,
                _ => {}
            },
            _ => {}
        }

        if let Some(parent) = self.stack.last_mut() {
            parent.children += 1;
        }

        let attributes = e
            .attributes()
            .flatten()
            .filter(|attr| attr.key.as_namespace_binding().is_none())
            .filter_map(|attr| {
                let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                attr.unescape_value().ok().map(|v| (key, v.into_owned()))
            })
            .collect();

        self.stack.push(Frame {
            name,
            text: String::new(),
            attributes,
            children: 0,
        });
        Ok(())
    }

    fn close(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let depth = self.stack.len();

        if depth == 0 {
            self.root_closed = true;
            return;
        }

        // Only leaves below Header / below the action element are parameters
        if frame.children > 0 || depth < 2 {
            return;
        }
        let in_body = self.section() == Some("Body");
        if in_body && depth == 2 {
            return;
        }

        let param = Param {
            name: frame.name,
            parent: self
                .stack
                .last()
                .map(|f| f.name.clone())
                .unwrap_or_default(),
            text: frame.text.trim().to_string(),
            attributes: frame.attributes,
        };

        match self.section() {
            Some("Header") => self.header_params.push(param),
            Some("Body") => self.body_params.push(param),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) -> Result<(), ParseError> {
        match self.stack.last_mut() {
            Some(frame) => frame.text.push_str(text),
            None if !text.trim().is_empty() => {
                return Err(ParseError::Xml("text outside of root element".into()))
            }
            None => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<SoapMessage, ParseError> {
        if let Some(frame) = self.stack.last() {
            return Err(ParseError::Unclosed(frame.name.clone()));
        }
        let version = self.version.ok_or(ParseError::Empty)?;
        if !self.body_seen {
            return Err(ParseError::MissingBody);
        }
        let (action, namespace) = self.action.ok_or(ParseError::EmptyBody)?;

        let header_params = Params(self.header_params);
        let token = self.token_present.then(|| username_token(&header_params));

        let header = Header {
            message_id: header_params.get("MessageID").map(str::to_string),
            relates_to: header_params.get("RelatesTo").map(str::to_string),
            action: header_params.get("Action").map(str::to_string),
            to: header_params.get("To").map(str::to_string),
            reply_to: header_params
                .find("ReplyTo", "Address")
                .map(|p| p.text.clone()),
            security_present: self.security_present,
            username_token: token,
            params: header_params,
        };

        Ok(SoapMessage {
            version,
            header,
            body: Body {
                action,
                namespace,
                params: Params(self.body_params),
            },
        })
    }
}

fn username_token(header: &Params) -> UsernameToken {
    let field = |name: &str| header.find("UsernameToken", name);
    let password = field("Password");

    UsernameToken {
        username: field("Username").map(|p| p.text.clone()).unwrap_or_default(),
        password: password.map(|p| p.text.clone()).unwrap_or_default(),
        password_type: PasswordType::from_type_uri(password.and_then(|p| p.attribute("Type"))),
        nonce: field("Nonce").map(|p| p.text.clone()),
        created: field("Created").map(|p| p.text.clone()),
    }
}

fn resolved(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

/// Parse a SOAP envelope
pub fn parse(bytes: &[u8]) -> Result<SoapMessage, ParseError> {
    let xml = std::str::from_utf8(bytes).map_err(|_| ParseError::Encoding)?;
    let xml = xml.trim_start_matches('\u{feff}');

    let mut reader = NsReader::from_str(xml);
    let mut collector = Collector::default();

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| ParseError::Xml(e.to_string()))?;
        let ns = resolved(ns);

        match event {
            Event::Start(e) => collector.open(ns, &e)?,
            Event::Empty(e) => {
                collector.open(ns, &e)?;
                collector.close();
            }
            Event::End(_) => collector.close(),
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                collector.text(&text)?;
            }
            Event::CData(c) => {
                let bytes = c.into_inner();
                collector.text(&String::from_utf8_lossy(&bytes))?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    collector.finish()
}
