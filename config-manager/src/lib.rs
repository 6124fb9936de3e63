mod auth;
mod config;
mod device;
mod error;
mod paths;

pub use auth::{generate_random_password, AuthConfig, DEFAULT_MAX_TOKEN_AGE_SECS};
pub use config::{
    BridgeConfig, ConfigOverrides, DeviceSection, DiscoverySection, NetworkSection, StreamSection,
};
pub use device::{
    detect_local_ip, mask_url, DeviceConfig, DeviceDescriptor, MediaProfile, Resolution, Scope,
    VideoCodec, VideoEncoderConfig, DEVICE_SERVICE_PATH, EVENTS_SERVICE_PATH, MEDIA_SERVICE_PATH,
};
pub use error::ConfigError;
pub use paths::{bridge_config_path, config_dir, ensure_dir, write_secure};
