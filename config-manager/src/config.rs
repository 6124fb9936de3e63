use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthConfig;
use crate::device::VideoCodec;
use crate::error::ConfigError;
use crate::paths;

/// `[device]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeviceSection {
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub firmware_version: String,
    /// Derived from the endpoint UUID when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// Defaults to the model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_id: Option<String>,
    /// Derived from manufacturer/model/serial when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_uuid: Option<Uuid>,
    pub hostname: String,
    pub location: String,
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            name: "ONVIF Camera".to_string(),
            manufacturer: "Generic".to_string(),
            model: "RTSP-Bridge".to_string(),
            firmware_version: "1.0.0".to_string(),
            serial_number: None,
            hardware_id: None,
            endpoint_uuid: None,
            hostname: "onvif-bridge".to_string(),
            location: String::new(),
        }
    }
}

/// `[network]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkSection {
    /// Address the HTTP listener binds to
    pub bind: IpAddr,
    pub http_port: u16,
    /// Address put into XAddrs and service URLs; detected when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertise_ip: Option<IpAddr>,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: 8080,
            advertise_ip: None,
        }
    }
}

/// `[stream]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StreamSection {
    /// RTSP URL returned verbatim from GetStreamUri
    pub url: String,
    pub codec: VideoCodec,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub bitrate_kbps: u32,
    pub gov_length: u32,
    pub h264_profile: String,
    pub profile_token: String,
    pub source_token: String,
    pub encoder_token: String,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            codec: VideoCodec::H264,
            width: 1280,
            height: 720,
            fps: 15,
            bitrate_kbps: 2048,
            gov_length: 30,
            h264_profile: "Main".to_string(),
            profile_token: "MainProfile".to_string(),
            source_token: "VideoSource_1".to_string(),
            encoder_token: "VideoEncoder_1".to_string(),
        }
    }
}

/// `[discovery]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiscoverySection {
    pub enabled: bool,
    /// Periodic Hello while listening, disabled when unset or 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hello_interval_secs: Option<u64>,
    /// Interface address used for the multicast join
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<Ipv4Addr>,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            enabled: true,
            hello_interval_secs: None,
            interface: None,
        }
    }
}

/// Values layered over the file, typically from flags or environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rtsp_url: Option<String>,
    pub http_port: Option<u16>,
    pub server_ip: Option<IpAddr>,
    pub camera_name: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub hardware_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub bitrate_kbps: Option<u32>,
    pub discovery: Option<bool>,
}

/// Complete bridge configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BridgeConfig {
    pub device: DeviceSection,
    pub network: NetworkSection,
    pub stream: StreamSection,
    pub auth: AuthConfig,
    pub discovery: DiscoverySection,
}

impl BridgeConfig {
    /// Config written by `onvif-bridge init`: fresh credentials and endpoint UUID
    pub fn generate_default() -> Self {
        let mut config = Self::default();
        config.device.endpoint_uuid = Some(Uuid::new_v4());
        config.stream.url = "rtsp://127.0.0.1:8554/stream".to_string();
        config.auth = AuthConfig::generate_default();
        config
    }

    /// Check if config exists at default location
    pub fn exists() -> bool {
        paths::bridge_config_path()
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    /// Get default config path
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        paths::bridge_config_path()
    }

    /// Load config from default XDG location
    pub fn load() -> Result<Self, ConfigError> {
        let path = paths::bridge_config_path()?;
        Self::load_from(&path)
    }

    /// Load config from specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load an explicit path, or the default location if a file exists there,
    /// or fall back to defaults so overrides alone can configure the bridge
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from(path),
            None if Self::exists() => Self::load(),
            None => Ok(Self::default()),
        }
    }

    /// Save config to specific path.
    /// Uses restrictive file permissions (0600 on Unix) since this contains credentials.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            paths::ensure_dir(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        paths::write_secure(path, &content)?;
        Ok(())
    }

    /// Layer overrides over the loaded values
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        set(&mut self.stream.url, overrides.rtsp_url);
        set(&mut self.network.http_port, overrides.http_port);
        set(&mut self.device.name, overrides.camera_name);
        set(&mut self.device.manufacturer, overrides.manufacturer);
        set(&mut self.device.model, overrides.model);
        set(&mut self.auth.username, overrides.username);
        set(&mut self.auth.password, overrides.password);
        set(&mut self.stream.width, overrides.width);
        set(&mut self.stream.height, overrides.height);
        set(&mut self.stream.fps, overrides.fps);
        set(&mut self.stream.bitrate_kbps, overrides.bitrate_kbps);
        set(&mut self.discovery.enabled, overrides.discovery);

        if overrides.server_ip.is_some() {
            self.network.advertise_ip = overrides.server_ip;
        }
        if overrides.serial_number.is_some() {
            self.device.serial_number = overrides.serial_number;
        }
        if overrides.hardware_id.is_some() {
            self.device.hardware_id = overrides.hardware_id;
        }
    }

    /// Check every field, reporting all problems at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let stream = &self.stream;

        if stream.url.is_empty() {
            errors.push("stream.url is required".to_string());
        } else if !(stream.url.starts_with("rtsp://") || stream.url.starts_with("rtsps://")) {
            errors.push("stream.url must start with rtsp:// or rtsps://".to_string());
        }

        for (field, value) in [
            ("stream.width", stream.width),
            ("stream.height", stream.height),
            ("stream.fps", stream.fps),
            ("stream.bitrate_kbps", stream.bitrate_kbps),
        ] {
            if value == 0 {
                errors.push(format!("{} must be greater than 0", field));
            }
        }

        if self.network.http_port == 0 {
            errors.push("network.http_port must be between 1 and 65535".to_string());
        }

        for (field, value) in [
            ("stream.profile_token", &stream.profile_token),
            ("stream.source_token", &stream.source_token),
            ("stream.encoder_token", &stream.encoder_token),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{} must not be empty", field));
            }
        }

        if self.auth.required && self.auth.credentials().is_none() {
            errors.push("auth.required needs auth.username and auth.password".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}
