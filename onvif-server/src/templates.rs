//! ONVIF SOAP XML response templates
//!
//! All XML bodies are centralized here to keep the services readable. Each
//! function returns the content of `s:Body`; the registry wraps it in an
//! envelope of the request's version. Prefixes `tds`, `trt`, `tev`, `tt`,
//! `wsnt`, `wstop` and `wsa` are declared on that envelope.

use chrono::{DateTime, Datelike, SecondsFormat, Timelike, Utc};
use config_manager::{DeviceDescriptor, MediaProfile, Scope, VideoEncoderConfig};
use onvif_soap::xml_escape;

use crate::registry::ServiceCapability;

/// xs:dateTime in UTC with a `Z` suffix
pub fn xs_datetime(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Response without content, e.g. `<tev:SetSynchronizationPointResponse/>`
pub fn empty_response(prefix: &str, action: &str) -> String {
    format!("    <{}:{}Response/>", prefix, action)
}

// Device service

/// GetDeviceInformation response
pub fn device_information(d: &DeviceDescriptor) -> String {
    format!(
        r#"    <tds:GetDeviceInformationResponse>
      <tds:Manufacturer>{}</tds:Manufacturer>
      <tds:Model>{}</tds:Model>
      <tds:FirmwareVersion>{}</tds:FirmwareVersion>
      <tds:SerialNumber>{}</tds:SerialNumber>
      <tds:HardwareId>{}</tds:HardwareId>
    </tds:GetDeviceInformationResponse>"#,
        xml_escape(&d.manufacturer),
        xml_escape(&d.model),
        xml_escape(&d.firmware_version),
        xml_escape(&d.serial_number),
        xml_escape(&d.hardware_id)
    )
}

/// Device section of GetCapabilities
pub fn device_capabilities(xaddr: &str) -> String {
    format!(
        r#"        <tt:Device>
          <tt:XAddr>{}</tt:XAddr>
          <tt:Network>
            <tt:IPFilter>false</tt:IPFilter>
            <tt:ZeroConfiguration>false</tt:ZeroConfiguration>
            <tt:IPVersion6>false</tt:IPVersion6>
            <tt:DynDNS>false</tt:DynDNS>
          </tt:Network>
          <tt:System>
            <tt:DiscoveryResolve>false</tt:DiscoveryResolve>
            <tt:DiscoveryBye>true</tt:DiscoveryBye>
            <tt:RemoteDiscovery>false</tt:RemoteDiscovery>
            <tt:SystemBackup>false</tt:SystemBackup>
            <tt:SystemLogging>false</tt:SystemLogging>
            <tt:FirmwareUpgrade>false</tt:FirmwareUpgrade>
            <tt:SupportedVersions>
              <tt:Major>2</tt:Major>
              <tt:Minor>0</tt:Minor>
            </tt:SupportedVersions>
          </tt:System>
          <tt:IO>
            <tt:InputConnectors>0</tt:InputConnectors>
            <tt:RelayOutputs>0</tt:RelayOutputs>
          </tt:IO>
          <tt:Security>
            <tt:TLS1.1>false</tt:TLS1.1>
            <tt:TLS1.2>false</tt:TLS1.2>
            <tt:OnboardKeyGeneration>false</tt:OnboardKeyGeneration>
            <tt:AccessPolicyConfig>false</tt:AccessPolicyConfig>
            <tt:X.509Token>false</tt:X.509Token>
            <tt:SAMLToken>false</tt:SAMLToken>
            <tt:KerberosToken>false</tt:KerberosToken>
            <tt:RELToken>false</tt:RELToken>
          </tt:Security>
        </tt:Device>"#,
        xml_escape(xaddr)
    )
}

/// Media section of GetCapabilities
pub fn media_capabilities(xaddr: &str) -> String {
    format!(
        r#"        <tt:Media>
          <tt:XAddr>{}</tt:XAddr>
          <tt:StreamingCapabilities>
            <tt:RTPMulticast>false</tt:RTPMulticast>
            <tt:RTP_TCP>true</tt:RTP_TCP>
            <tt:RTP_RTSP_TCP>true</tt:RTP_RTSP_TCP>
          </tt:StreamingCapabilities>
        </tt:Media>"#,
        xml_escape(xaddr)
    )
}

/// Events section of GetCapabilities
pub fn events_capabilities(xaddr: &str, pull_point: bool) -> String {
    format!(
        r#"        <tt:Events>
          <tt:XAddr>{}</tt:XAddr>
          <tt:WSSubscriptionPolicySupport>false</tt:WSSubscriptionPolicySupport>
          <tt:WSPullPointSupport>{}</tt:WSPullPointSupport>
          <tt:WSPausableSubscriptionManagerInterfaceSupport>false</tt:WSPausableSubscriptionManagerInterfaceSupport>
        </tt:Events>"#,
        xml_escape(xaddr),
        flag(pull_point)
    )
}

/// GetCapabilities response around pre-rendered sections
pub fn capabilities(sections: &[String]) -> String {
    format!(
        r#"    <tds:GetCapabilitiesResponse>
      <tds:Capabilities>
{}
      </tds:Capabilities>
    </tds:GetCapabilitiesResponse>"#,
        sections.join("\n")
    )
}

/// One `tds:Service` entry of GetServices
pub fn service_entry(cap: &ServiceCapability) -> String {
    format!(
        r#"      <tds:Service>
        <tds:Namespace>{}</tds:Namespace>
        <tds:XAddr>{}</tds:XAddr>
        <tds:Version><tt:Major>{}</tt:Major><tt:Minor>{}</tt:Minor></tds:Version>
      </tds:Service>"#,
        cap.namespace,
        xml_escape(&cap.xaddr),
        cap.version.0,
        cap.version.1
    )
}

/// GetServices response wrapper
pub fn services(entries: &[String]) -> String {
    format!(
        "    <tds:GetServicesResponse>\n{}\n    </tds:GetServicesResponse>",
        entries.join("\n")
    )
}

/// Device GetServiceCapabilities response
pub fn device_service_capabilities(username_token: bool) -> String {
    format!(
        r#"    <tds:GetServiceCapabilitiesResponse>
      <tds:Capabilities>
        <tds:Network IPFilter="false" ZeroConfiguration="false" IPVersion6="false" DynDNS="false" Dot11Configuration="false" Dot1XConfigurations="0" HostnameFromDHCP="false" NTP="0" DHCPv6="false"/>
        <tds:Security TLS1.0="false" TLS1.1="false" TLS1.2="false" OnboardKeyGeneration="false" AccessPolicyConfig="false" DefaultAccessPolicy="false" Dot1X="false" RemoteUserHandling="false" X.509Token="false" SAMLToken="false" KerberosToken="false" UsernameToken="{}" HttpDigest="false" RELToken="false"/>
        <tds:System DiscoveryResolve="false" DiscoveryBye="true" RemoteDiscovery="false" SystemBackup="false" SystemLogging="false" FirmwareUpgrade="false" HttpFirmwareUpgrade="false" HttpSystemBackup="false" HttpSystemLogging="false" HttpSupportInformation="false"/>
      </tds:Capabilities>
    </tds:GetServiceCapabilitiesResponse>"#,
        flag(username_token)
    )
}

fn date_time(tag: &str, t: DateTime<Utc>) -> String {
    format!(
        r#"        <tt:{tag}>
          <tt:Time>
            <tt:Hour>{}</tt:Hour>
            <tt:Minute>{}</tt:Minute>
            <tt:Second>{}</tt:Second>
          </tt:Time>
          <tt:Date>
            <tt:Year>{}</tt:Year>
            <tt:Month>{}</tt:Month>
            <tt:Day>{}</tt:Day>
          </tt:Date>
        </tt:{tag}>"#,
        t.hour(),
        t.minute(),
        t.second(),
        t.year(),
        t.month(),
        t.day(),
    )
}

/// GetSystemDateAndTime response; the device clock runs in UTC
pub fn system_date_and_time(now: DateTime<Utc>) -> String {
    format!(
        r#"    <tds:GetSystemDateAndTimeResponse>
      <tds:SystemDateAndTime>
        <tt:DateTimeType>NTP</tt:DateTimeType>
        <tt:DaylightSavings>false</tt:DaylightSavings>
        <tt:TimeZone>
          <tt:TZ>UTC0</tt:TZ>
        </tt:TimeZone>
{}
{}
      </tds:SystemDateAndTime>
    </tds:GetSystemDateAndTimeResponse>"#,
        date_time("UTCDateTime", now),
        date_time("LocalDateTime", now)
    )
}

/// GetScopes response
pub fn scopes(scopes: &[Scope]) -> String {
    let entries: Vec<String> = scopes
        .iter()
        .map(|s| {
            format!(
                r#"      <tds:Scopes>
        <tt:ScopeDef>{}</tt:ScopeDef>
        <tt:ScopeItem>{}</tt:ScopeItem>
      </tds:Scopes>"#,
                s.definition(),
                xml_escape(&s.item)
            )
        })
        .collect();
    format!(
        "    <tds:GetScopesResponse>\n{}\n    </tds:GetScopesResponse>",
        entries.join("\n")
    )
}

/// GetHostname response
pub fn hostname(name: &str) -> String {
    format!(
        r#"    <tds:GetHostnameResponse>
      <tds:HostnameInformation>
        <tt:FromDHCP>false</tt:FromDHCP>
        <tt:Name>{}</tt:Name>
      </tds:HostnameInformation>
    </tds:GetHostnameResponse>"#,
        xml_escape(name)
    )
}

/// GetNetworkInterfaces response with a single static interface
pub fn network_interfaces(address: &str) -> String {
    format!(
        r#"    <tds:GetNetworkInterfacesResponse>
      <tds:NetworkInterfaces token="eth0">
        <tt:Enabled>true</tt:Enabled>
        <tt:Info>
          <tt:Name>eth0</tt:Name>
          <tt:HwAddress>00:00:00:00:00:00</tt:HwAddress>
          <tt:MTU>1500</tt:MTU>
        </tt:Info>
        <tt:IPv4>
          <tt:Enabled>true</tt:Enabled>
          <tt:Config>
            <tt:Manual>
              <tt:Address>{}</tt:Address>
              <tt:PrefixLength>24</tt:PrefixLength>
            </tt:Manual>
            <tt:DHCP>false</tt:DHCP>
          </tt:Config>
        </tt:IPv4>
      </tds:NetworkInterfaces>
    </tds:GetNetworkInterfacesResponse>"#,
        xml_escape(address)
    )
}

/// GetDNS response
pub fn dns() -> &'static str {
    r#"    <tds:GetDNSResponse>
      <tds:DNSInformation>
        <tt:FromDHCP>false</tt:FromDHCP>
      </tds:DNSInformation>
    </tds:GetDNSResponse>"#
}

/// GetNTP response
pub fn ntp() -> &'static str {
    r#"    <tds:GetNTPResponse>
      <tds:NTPInformation>
        <tt:FromDHCP>false</tt:FromDHCP>
      </tds:NTPInformation>
    </tds:GetNTPResponse>"#
}

/// GetUsers response
pub fn users(username: Option<&str>) -> String {
    match username {
        Some(name) => format!(
            r#"    <tds:GetUsersResponse>
      <tds:User>
        <tt:Username>{}</tt:Username>
        <tt:UserLevel>Administrator</tt:UserLevel>
      </tds:User>
    </tds:GetUsersResponse>"#,
            xml_escape(name)
        ),
        None => empty_response("tds", "GetUsers"),
    }
}

/// GetWsdlUrl response
pub fn wsdl_url(url: &str) -> String {
    format!(
        "    <tds:GetWsdlUrlResponse>\n      <tds:WsdlUrl>{}</tds:WsdlUrl>\n    </tds:GetWsdlUrlResponse>",
        xml_escape(url)
    )
}

/// GetEndpointReference response
pub fn endpoint_reference(guid: &str) -> String {
    format!(
        "    <tds:GetEndpointReferenceResponse>\n      <tds:GUID>{}</tds:GUID>\n    </tds:GetEndpointReferenceResponse>",
        xml_escape(guid)
    )
}

// Media service

/// `tt:VideoSourceConfiguration` content under the given element name
pub fn video_source_configuration(element: &str, profile: &MediaProfile) -> String {
    let res = profile.resolution();
    format!(
        r#"<{element} token="{token}">
        <tt:Name>VideoSourceConfig</tt:Name>
        <tt:UseCount>1</tt:UseCount>
        <tt:SourceToken>{token}</tt:SourceToken>
        <tt:Bounds x="0" y="0" width="{}" height="{}"/>
      </{element}>"#,
        res.width,
        res.height,
        token = xml_escape(&profile.source_token),
    )
}

/// `tt:VideoEncoderConfiguration` content under the given element name
pub fn video_encoder_configuration(element: &str, encoder: &VideoEncoderConfig) -> String {
    let h264 = if encoder.codec == config_manager::VideoCodec::H264 {
        format!(
            r#"
        <tt:H264>
          <tt:GovLength>{}</tt:GovLength>
          <tt:H264Profile>{}</tt:H264Profile>
        </tt:H264>"#,
            encoder.gov_length,
            xml_escape(&encoder.h264_profile)
        )
    } else {
        String::new()
    };

    format!(
        r#"<{element} token="{}">
        <tt:Name>VideoEncoderConfig</tt:Name>
        <tt:UseCount>1</tt:UseCount>
        <tt:Encoding>{}</tt:Encoding>
        <tt:Resolution>
          <tt:Width>{}</tt:Width>
          <tt:Height>{}</tt:Height>
        </tt:Resolution>
        <tt:Quality>5</tt:Quality>
        <tt:RateControl>
          <tt:FrameRateLimit>{}</tt:FrameRateLimit>
          <tt:EncodingInterval>1</tt:EncodingInterval>
          <tt:BitrateLimit>{}</tt:BitrateLimit>
        </tt:RateControl>{}
        <tt:Multicast>
          <tt:Address>
            <tt:Type>IPv4</tt:Type>
            <tt:IPv4Address>0.0.0.0</tt:IPv4Address>
          </tt:Address>
          <tt:Port>0</tt:Port>
          <tt:TTL>0</tt:TTL>
          <tt:AutoStart>false</tt:AutoStart>
        </tt:Multicast>
        <tt:SessionTimeout>PT60S</tt:SessionTimeout>
      </{element}>"#,
        xml_escape(&encoder.token),
        encoder.codec.as_str(),
        encoder.resolution.width,
        encoder.resolution.height,
        encoder.fps,
        encoder.bitrate_kbps,
        h264,
    )
}

/// A `trt:Profiles` / `trt:Profile` element
pub fn profile(element: &str, profile: &MediaProfile) -> String {
    format!(
        r#"      <{element} token="{}" fixed="true">
        <tt:Name>{}</tt:Name>
        {}
        {}
      </{element}>"#,
        xml_escape(&profile.token),
        xml_escape(&profile.name),
        video_source_configuration("tt:VideoSourceConfiguration", profile),
        video_encoder_configuration("tt:VideoEncoderConfiguration", &profile.encoder),
    )
}

/// GetProfiles response: always a list, here of one
pub fn profiles(p: &MediaProfile) -> String {
    format!(
        "    <trt:GetProfilesResponse>\n{}\n    </trt:GetProfilesResponse>",
        profile("trt:Profiles", p)
    )
}

/// GetProfile response
pub fn single_profile(p: &MediaProfile) -> String {
    format!(
        "    <trt:GetProfileResponse>\n{}\n    </trt:GetProfileResponse>",
        profile("trt:Profile", p)
    )
}

/// GetVideoSources response
pub fn video_sources(profile: &MediaProfile) -> String {
    let res = profile.resolution();
    format!(
        r#"    <trt:GetVideoSourcesResponse>
      <trt:VideoSources token="{}">
        <tt:Framerate>{}</tt:Framerate>
        <tt:Resolution>
          <tt:Width>{}</tt:Width>
          <tt:Height>{}</tt:Height>
        </tt:Resolution>
      </trt:VideoSources>
    </trt:GetVideoSourcesResponse>"#,
        xml_escape(&profile.source_token),
        profile.encoder.fps,
        res.width,
        res.height
    )
}

/// Response whose only content is one configuration element
pub fn configuration_response(action: &str, content: &str) -> String {
    format!(
        "    <trt:{action}Response>\n      {}\n    </trt:{action}Response>",
        content
    )
}

/// GetVideoSourceConfigurationOptions response
pub fn video_source_configuration_options(profile: &MediaProfile) -> String {
    let res = profile.resolution();
    format!(
        r#"    <trt:GetVideoSourceConfigurationOptionsResponse>
      <trt:Options>
        <tt:BoundsRange>
          <tt:XRange><tt:Min>0</tt:Min><tt:Max>0</tt:Max></tt:XRange>
          <tt:YRange><tt:Min>0</tt:Min><tt:Max>0</tt:Max></tt:YRange>
          <tt:WidthRange><tt:Min>{w}</tt:Min><tt:Max>{w}</tt:Max></tt:WidthRange>
          <tt:HeightRange><tt:Min>{h}</tt:Min><tt:Max>{h}</tt:Max></tt:HeightRange>
        </tt:BoundsRange>
        <tt:VideoSourceTokensAvailable>{}</tt:VideoSourceTokensAvailable>
      </trt:Options>
    </trt:GetVideoSourceConfigurationOptionsResponse>"#,
        xml_escape(&profile.source_token),
        w = res.width,
        h = res.height,
    )
}

/// GetVideoEncoderConfigurationOptions response
pub fn video_encoder_configuration_options(encoder: &VideoEncoderConfig) -> String {
    let res = encoder.resolution;
    let codec = match encoder.codec {
        config_manager::VideoCodec::H264 => format!(
            r#"
        <tt:H264>
          <tt:ResolutionsAvailable><tt:Width>{}</tt:Width><tt:Height>{}</tt:Height></tt:ResolutionsAvailable>
          <tt:GovLengthRange><tt:Min>{gov}</tt:Min><tt:Max>{gov}</tt:Max></tt:GovLengthRange>
          <tt:FrameRateRange><tt:Min>1</tt:Min><tt:Max>{}</tt:Max></tt:FrameRateRange>
          <tt:EncodingIntervalRange><tt:Min>1</tt:Min><tt:Max>1</tt:Max></tt:EncodingIntervalRange>
          <tt:H264ProfilesSupported>{}</tt:H264ProfilesSupported>
        </tt:H264>"#,
            res.width,
            res.height,
            encoder.fps,
            xml_escape(&encoder.h264_profile),
            gov = encoder.gov_length,
        ),
        _ => String::new(),
    };
    format!(
        r#"    <trt:GetVideoEncoderConfigurationOptionsResponse>
      <trt:Options>
        <tt:QualityRange><tt:Min>1</tt:Min><tt:Max>10</tt:Max></tt:QualityRange>{}
      </trt:Options>
    </trt:GetVideoEncoderConfigurationOptionsResponse>"#,
        codec
    )
}

/// GetStreamUri response; the URI is returned exactly as configured
pub fn stream_uri(uri: &str) -> String {
    format!(
        r#"    <trt:GetStreamUriResponse>
      <trt:MediaUri>
        <tt:Uri>{}</tt:Uri>
        <tt:InvalidAfterConnect>false</tt:InvalidAfterConnect>
        <tt:InvalidAfterReboot>false</tt:InvalidAfterReboot>
        <tt:Timeout>PT60S</tt:Timeout>
      </trt:MediaUri>
    </trt:GetStreamUriResponse>"#,
        xml_escape(uri)
    )
}

/// Media GetServiceCapabilities response
pub fn media_service_capabilities(snapshot: bool) -> String {
    format!(
        r#"    <trt:GetServiceCapabilitiesResponse>
      <trt:Capabilities SnapshotUri="{}" Rotation="false" VideoSourceMode="false" OSD="false">
        <trt:ProfileCapabilities MaximumNumberOfProfiles="1"/>
        <trt:StreamingCapabilities RTPMulticast="false" RTP_TCP="true" RTP_RTSP_TCP="true" NonAggregateControl="false" NoRTSPStreaming="false"/>
      </trt:Capabilities>
    </trt:GetServiceCapabilitiesResponse>"#,
        flag(snapshot)
    )
}

// Events service

/// Events GetServiceCapabilities response
pub fn events_service_capabilities(pull_point: bool) -> String {
    format!(
        r#"    <tev:GetServiceCapabilitiesResponse>
      <tev:Capabilities WSSubscriptionPolicySupport="false" WSPullPointSupport="{}" WSPausableSubscriptionManagerInterfaceSupport="false" MaxNotificationProducers="0" MaxPullPoints="1" PersistentNotificationStorage="false"/>
    </tev:GetServiceCapabilitiesResponse>"#,
        flag(pull_point)
    )
}

/// GetEventProperties response with an empty topic set
pub fn event_properties() -> &'static str {
    r#"    <tev:GetEventPropertiesResponse>
      <tev:TopicNamespaceLocation>http://www.onvif.org/onvif/ver10/topics/topicns.xml</tev:TopicNamespaceLocation>
      <wsnt:FixedTopicSet>true</wsnt:FixedTopicSet>
      <wstop:TopicSet/>
      <wsnt:TopicExpressionDialect>http://www.onvif.org/ver10/tev/topicExpression/ConcreteSet</wsnt:TopicExpressionDialect>
      <wsnt:TopicExpressionDialect>http://docs.oasis-open.org/wsn/t-1/TopicExpression/Concrete</wsnt:TopicExpressionDialect>
      <tev:MessageContentFilterDialect>http://www.onvif.org/ver10/tev/messageContentFilter/ItemFilter</tev:MessageContentFilterDialect>
      <tev:MessageContentSchemaLocation>http://www.onvif.org/onvif/ver10/schema/onvif.xsd</tev:MessageContentSchemaLocation>
    </tev:GetEventPropertiesResponse>"#
}

/// CreatePullPointSubscription response
pub fn create_pull_point_subscription(
    address: &str,
    now: DateTime<Utc>,
    termination: DateTime<Utc>,
) -> String {
    format!(
        r#"    <tev:CreatePullPointSubscriptionResponse>
      <tev:SubscriptionReference>
        <wsa:Address>{}</wsa:Address>
      </tev:SubscriptionReference>
      <wsnt:CurrentTime>{}</wsnt:CurrentTime>
      <wsnt:TerminationTime>{}</wsnt:TerminationTime>
    </tev:CreatePullPointSubscriptionResponse>"#,
        xml_escape(address),
        xs_datetime(now),
        xs_datetime(termination)
    )
}

/// PullMessages response without notifications
pub fn pull_messages(now: DateTime<Utc>, termination: DateTime<Utc>) -> String {
    format!(
        r#"    <tev:PullMessagesResponse>
      <tev:CurrentTime>{}</tev:CurrentTime>
      <tev:TerminationTime>{}</tev:TerminationTime>
    </tev:PullMessagesResponse>"#,
        xs_datetime(now),
        xs_datetime(termination)
    )
}

/// Renew response
pub fn renew(now: DateTime<Utc>, termination: DateTime<Utc>) -> String {
    format!(
        r#"    <wsnt:RenewResponse>
      <wsnt:TerminationTime>{}</wsnt:TerminationTime>
      <wsnt:CurrentTime>{}</wsnt:CurrentTime>
    </wsnt:RenewResponse>"#,
        xs_datetime(termination),
        xs_datetime(now)
    )
}
