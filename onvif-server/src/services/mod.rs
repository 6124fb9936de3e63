//! Device, Media and Events services

pub mod device;
pub mod events;
pub mod media;

use std::sync::Arc;

use config_manager::{DeviceConfig, DEVICE_SERVICE_PATH, EVENTS_SERVICE_PATH, MEDIA_SERVICE_PATH};
use ws_security::Authenticator;

use crate::registry::{ServiceKind, ServiceRegistry};

/// Registry with all three services mounted at their standard paths
pub fn default_registry(config: Arc<DeviceConfig>, auth: Option<Authenticator>) -> ServiceRegistry {
    let mut registry = ServiceRegistry::new(config, auth);
    registry.register_service(DEVICE_SERVICE_PATH, ServiceKind::Device, device::operations());
    registry.register_service(MEDIA_SERVICE_PATH, ServiceKind::Media, media::operations());
    registry.register_service(EVENTS_SERVICE_PATH, ServiceKind::Events, events::operations());
    registry
}
