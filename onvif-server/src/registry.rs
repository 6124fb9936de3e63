//! Service registry and dispatcher
//!
//! Requests are routed twice: by HTTP path to a registered service, then by
//! the action element's local name to an entry in that service's
//! [`OperationTable`]. The advertised operation set of each service is taken
//! from its table, so capability answers can never name an unimplemented
//! operation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use config_manager::DeviceConfig;
use onvif_soap::{ns, wrap, wrap_fault, SoapFault, SoapMessage, SoapVersion};
use tracing::{debug, warn};
use ws_security::{Authenticator, WsSecurityError};

/// The three services this device exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ServiceKind {
    Device,
    Media,
    Events,
}

impl ServiceKind {
    pub fn namespace(self) -> &'static str {
        match self {
            ServiceKind::Device => ns::TDS,
            ServiceKind::Media => ns::TRT,
            ServiceKind::Events => ns::TEV,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ServiceKind::Device => "Device",
            ServiceKind::Media => "Media",
            ServiceKind::Events => "Events",
        }
    }

    /// Map a `tt:CapabilityCategory` value to a service
    pub fn from_category(category: &str) -> Option<Self> {
        match category {
            "Device" => Some(ServiceKind::Device),
            "Media" => Some(ServiceKind::Media),
            "Events" => Some(ServiceKind::Events),
            _ => None,
        }
    }
}

/// Whether an operation may run before the client authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    PreAuth,
    Authenticated,
}

/// Uniform handler signature: response body XML or a fault
pub type Handler = fn(&OperationContext<'_>) -> Result<String, SoapFault>;

#[derive(Clone, Copy)]
pub struct Operation {
    pub access: Access,
    pub handler: Handler,
}

/// Action name to handler mapping for one service
#[derive(Clone, Default)]
pub struct OperationTable {
    operations: BTreeMap<&'static str, Operation>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation that requires authentication when it is enforced
    pub fn op(self, action: &'static str, handler: Handler) -> Self {
        self.with_access(action, Access::Authenticated, handler)
    }

    /// Register an operation that is always reachable without a token
    pub fn pre_auth(self, action: &'static str, handler: Handler) -> Self {
        self.with_access(action, Access::PreAuth, handler)
    }

    fn with_access(mut self, action: &'static str, access: Access, handler: Handler) -> Self {
        self.operations.insert(action, Operation { access, handler });
        self
    }

    pub fn get(&self, action: &str) -> Option<&Operation> {
        self.operations.get(action)
    }

    pub fn contains(&self, action: &str) -> bool {
        self.operations.contains_key(action)
    }

    /// Registered action names in sorted order
    pub fn actions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.operations.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// What a registered service advertises
#[derive(Debug, Clone)]
pub struct ServiceCapability {
    pub kind: ServiceKind,
    pub namespace: &'static str,
    /// HTTP path the service is mounted at
    pub path: &'static str,
    /// Absolute service address
    pub xaddr: String,
    /// (major, minor)
    pub version: (u32, u32),
    /// Exactly the actions in the service's operation table
    pub operations: Vec<&'static str>,
}

impl ServiceCapability {
    pub fn supports(&self, action: &str) -> bool {
        self.operations.iter().any(|op| *op == action)
    }
}

struct RegisteredService {
    capability: ServiceCapability,
    table: OperationTable,
}

/// Everything a handler may look at
pub struct OperationContext<'a> {
    pub device: &'a DeviceConfig,
    pub request: &'a SoapMessage,
    pub registry: &'a ServiceRegistry,
    /// Request time, fixed once per request
    pub now: DateTime<Utc>,
}

impl OperationContext<'_> {
    /// Body parameter text by local name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.param(name)
    }
}

/// Serialized response and the envelope version it was written in
#[derive(Debug, Clone)]
pub struct SoapResponse {
    pub version: SoapVersion,
    pub xml: String,
    pub is_fault: bool,
}

impl SoapResponse {
    fn ok(version: SoapVersion, body: &str) -> Self {
        Self {
            version,
            xml: wrap(version, body),
            is_fault: false,
        }
    }

    fn fault(version: SoapVersion, fault: &SoapFault) -> Self {
        Self {
            version,
            xml: wrap_fault(version, fault),
            is_fault: true,
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.version.content_type()
    }
}

/// Registered services plus the shared device snapshot and auth policy
pub struct ServiceRegistry {
    device: Arc<DeviceConfig>,
    auth: Option<Authenticator>,
    services: Vec<RegisteredService>,
}

impl ServiceRegistry {
    pub fn new(device: Arc<DeviceConfig>, auth: Option<Authenticator>) -> Self {
        Self {
            device,
            auth,
            services: Vec::new(),
        }
    }

    /// Mount `table` at `path`. A later registration for the same path
    /// replaces the earlier one.
    pub fn register_service(
        &mut self,
        path: &'static str,
        kind: ServiceKind,
        table: OperationTable,
    ) -> &ServiceCapability {
        let capability = ServiceCapability {
            kind,
            namespace: kind.namespace(),
            path,
            xaddr: self.device.service_url(path),
            version: (2, 0),
            operations: table.actions().collect(),
        };

        self.services.retain(|s| s.capability.path != path);
        self.services.push(RegisteredService { capability, table });

        let last = self.services.len() - 1;
        &self.services[last].capability
    }

    pub fn device(&self) -> &DeviceConfig {
        &self.device
    }

    pub fn auth(&self) -> Option<&Authenticator> {
        self.auth.as_ref()
    }

    /// Capabilities of every registered service, in registration order
    pub fn capabilities(&self) -> impl Iterator<Item = &ServiceCapability> {
        self.services.iter().map(|s| &s.capability)
    }

    pub fn capability(&self, kind: ServiceKind) -> Option<&ServiceCapability> {
        self.capabilities().find(|c| c.kind == kind)
    }

    fn resolve(&self, path: &str) -> Option<&RegisteredService> {
        self.services.iter().find(|s| {
            let base = s.capability.path;
            path == base
                || path
                    .strip_prefix(base)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Whether `path` belongs to a registered service
    pub fn is_service_path(&self, path: &str) -> bool {
        self.resolve(path).is_some()
    }

    /// Dispatch one request. `None` means no service is mounted at `path`,
    /// which the transport reports as 404.
    pub fn handle_request(&self, path: &str, body: &[u8]) -> Option<SoapResponse> {
        let service = self.resolve(path)?;
        let kind = service.capability.kind;

        let request = match onvif_soap::parse(body) {
            Ok(request) => request,
            Err(e) => {
                debug!("{} service: malformed request: {}", kind.name(), e);
                return Some(SoapResponse::fault(guess_version(body), &e.into()));
            }
        };
        let version = request.version;
        let action = request.action();

        let Some(operation) = service.table.get(action) else {
            warn!("{} service: unsupported action {}", kind.name(), action);
            return Some(SoapResponse::fault(
                version,
                &SoapFault::action_not_supported(action),
            ));
        };

        if let Err(fault) = self.authorize(&request, operation.access) {
            warn!("{} service: {} rejected: {}", kind.name(), action, fault.reason);
            return Some(SoapResponse::fault(version, &fault));
        }

        debug!("{} service: {}", kind.name(), action);

        let ctx = OperationContext {
            device: &self.device,
            request: &request,
            registry: self,
            now: Utc::now(),
        };

        Some(match (operation.handler)(&ctx) {
            Ok(body) => SoapResponse::ok(version, &body),
            Err(fault) => {
                warn!("{} service: {} failed: {}", kind.name(), action, fault.reason);
                SoapResponse::fault(version, &fault)
            }
        })
    }

    /// Authentication gate
    ///
    /// A token is verified whenever credentials are configured. A missing
    /// token only matters when authentication is required and the operation
    /// is not pre-auth.
    fn authorize(&self, request: &SoapMessage, access: Access) -> Result<(), SoapFault> {
        let Some(auth) = &self.auth else {
            return Ok(());
        };

        let verdict = match &request.header.username_token {
            Some(token) => auth.validate(token),
            None if auth.is_required() && access == Access::Authenticated => {
                Err(WsSecurityError::MissingToken)
            }
            None => Ok(()),
        };
        verdict.map_err(|e| SoapFault::not_authorized(format!("Sender not authorized: {}", e)))
    }
}

/// Envelope version for faults about unparseable requests
fn guess_version(body: &[u8]) -> SoapVersion {
    let contains = |needle: &str| {
        body.windows(needle.len())
            .any(|window| window == needle.as_bytes())
    };
    if contains(ns::SOAP11) && !contains(ns::SOAP12) {
        SoapVersion::Soap11
    } else {
        SoapVersion::Soap12
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_manager::BridgeConfig;
    use ws_security::Credentials;

    fn device() -> Arc<DeviceConfig> {
        let mut config = BridgeConfig::default();
        config.stream.url = "rtsp://10.0.0.5/live".to_string();
        config.network.advertise_ip = Some("10.0.0.2".parse().unwrap());
        Arc::new(DeviceConfig::from_config(&config).unwrap())
    }

    fn echo(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
        Ok(format!("<tds:{}Response/>", ctx.request.action()))
    }

    fn reject(_: &OperationContext<'_>) -> Result<String, SoapFault> {
        Err(SoapFault::invalid_arg("nope").with_detail("ter:NoProfile"))
    }

    fn registry(auth: Option<Authenticator>) -> ServiceRegistry {
        let mut registry = ServiceRegistry::new(device(), auth);
        registry.register_service(
            "/onvif/device_service",
            ServiceKind::Device,
            OperationTable::new()
                .pre_auth("GetSystemDateAndTime", echo)
                .op("GetUsers", echo)
                .op("Reject", reject),
        );
        registry
    }

    fn envelope(version: &str, header: &str, action: &str) -> String {
        format!(
            r#"<s:Envelope xmlns:s="{}"><s:Header>{}</s:Header><s:Body><{} xmlns="http://www.onvif.org/ver10/device/wsdl"/></s:Body></s:Envelope>"#,
            version, header, action
        )
    }

    #[test]
    fn test_capability_mirrors_table() {
        let registry = registry(None);
        let cap = registry.capability(ServiceKind::Device).unwrap();
        assert_eq!(cap.operations, vec!["GetSystemDateAndTime", "GetUsers", "Reject"]);
        assert_eq!(cap.xaddr, "http://10.0.0.2:8080/onvif/device_service");
        assert!(cap.supports("GetUsers"));
        assert!(!cap.supports("GetFoo"));
    }

    #[test]
    fn test_path_routing() {
        let registry = registry(None);
        assert!(registry.is_service_path("/onvif/device_service"));
        assert!(registry.is_service_path("/onvif/device_service/sub"));
        assert!(!registry.is_service_path("/onvif/device_service_x"));
        assert!(!registry.is_service_path("/onvif/media_service"));
        assert!(registry.handle_request("/nope", b"").is_none());
    }

    #[test]
    fn test_version_echo() {
        let registry = registry(None);
        let body = envelope(ns::SOAP11, "", "GetUsers");
        let resp = registry.handle_request("/onvif/device_service", body.as_bytes()).unwrap();
        assert_eq!(resp.version, SoapVersion::Soap11);
        assert!(!resp.is_fault);
        assert!(resp.xml.contains("GetUsersResponse"));
        assert!(resp.xml.contains(ns::SOAP11));
    }

    #[test]
    fn test_unknown_action_fault() {
        let registry = registry(None);
        let body = envelope(ns::SOAP12, "", "GetFoo");
        let resp = registry.handle_request("/onvif/device_service", body.as_bytes()).unwrap();
        assert!(resp.is_fault);
        assert!(resp.xml.contains("ter:ActionNotSupported"));
        assert!(resp.xml.contains("GetFoo"));
    }

    #[test]
    fn test_malformed_fault_keeps_version() {
        let registry = registry(None);
        let body = format!(r#"<s:Envelope xmlns:s="{}"><s:Body>"#, ns::SOAP11);
        let resp = registry.handle_request("/onvif/device_service", body.as_bytes()).unwrap();
        assert!(resp.is_fault);
        assert_eq!(resp.version, SoapVersion::Soap11);
        assert!(resp.xml.contains("s:Client.WellFormed"));

        let resp = registry.handle_request("/onvif/device_service", b"garbage").unwrap();
        assert_eq!(resp.version, SoapVersion::Soap12);
        assert!(resp.xml.contains("ter:WellFormed"));
    }

    #[test]
    fn test_handler_fault() {
        let registry = registry(None);
        let body = envelope(ns::SOAP12, "", "Reject");
        let resp = registry.handle_request("/onvif/device_service", body.as_bytes()).unwrap();
        assert!(resp.is_fault);
        assert!(resp.xml.contains("ter:InvalidArgVal"));
        assert!(resp.xml.contains("ter:NoProfile"));
    }

    #[test]
    fn test_auth_gate() {
        let auth = Authenticator::new(Credentials {
            username: "admin".to_string(),
            password: "secret".to_string(),
        })
        .required(true);
        let registry = registry(Some(auth));

        // pre-auth operation without a token
        let body = envelope(ns::SOAP12, "", "GetSystemDateAndTime");
        let resp = registry.handle_request("/onvif/device_service", body.as_bytes()).unwrap();
        assert!(!resp.is_fault);

        // protected operation without a token
        let body = envelope(ns::SOAP12, "", "GetUsers");
        let resp = registry.handle_request("/onvif/device_service", body.as_bytes()).unwrap();
        assert!(resp.is_fault);
        assert!(resp.xml.contains("ter:NotAuthorized"));
        assert!(resp.xml.contains("Sender not authorized: Missing UsernameToken"));

        // a bad token is rejected even for pre-auth operations
        let header = r#"<Security xmlns="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd"><UsernameToken><Username>admin</Username><Password>wrong</Password></UsernameToken></Security>"#;
        let body = envelope(ns::SOAP12, header, "GetSystemDateAndTime");
        let resp = registry.handle_request("/onvif/device_service", body.as_bytes()).unwrap();
        assert!(resp.is_fault);
        assert!(resp.xml.contains("ter:NotAuthorized"));
    }

    #[test]
    fn test_no_credentials_ignores_tokens() {
        let registry = registry(None);
        let header = r#"<Security xmlns="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd"><UsernameToken><Username>x</Username><Password>y</Password></UsernameToken></Security>"#;
        let body = envelope(ns::SOAP12, header, "GetUsers");
        let resp = registry.handle_request("/onvif/device_service", body.as_bytes()).unwrap();
        assert!(!resp.is_fault);
    }
}
