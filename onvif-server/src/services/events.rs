//! Events service (`tev`)
//!
//! A pull-point surface that never produces notifications. Subscriptions are
//! not tracked: every pull point lives at the same address and every request
//! gets a fresh termination time.

use chrono::{DateTime, Duration, Utc};
use onvif_soap::SoapFault;

use crate::registry::{OperationContext, OperationTable, ServiceKind};
use crate::templates;

/// Subscription lifetime when the client does not ask for one
const DEFAULT_TERMINATION_SECS: i64 = 3600;

/// Longest relative termination a client may ask for
const MAX_DURATION_SECS: f64 = 100.0 * 365.0 * 86_400.0;

/// Path under the events service that subscription references point to
pub const PULL_POINT_SUFFIX: &str = "/pullpoint";

pub fn operations() -> OperationTable {
    OperationTable::new()
        .pre_auth("GetServiceCapabilities", get_service_capabilities)
        .op("GetEventProperties", get_event_properties)
        .op("CreatePullPointSubscription", create_pull_point_subscription)
        .op("PullMessages", pull_messages)
        .op("Renew", renew)
        .op("Unsubscribe", unsubscribe)
        .op("SetSynchronizationPoint", set_synchronization_point)
}

fn pull_point_supported(ctx: &OperationContext<'_>) -> bool {
    ctx.registry
        .capability(ServiceKind::Events)
        .is_some_and(|c| c.supports("CreatePullPointSubscription"))
}

fn get_service_capabilities(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::events_service_capabilities(pull_point_supported(
        ctx,
    )))
}

fn get_event_properties(_: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::event_properties().to_string())
}

fn create_pull_point_subscription(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    let termination = termination_time(ctx.param("InitialTerminationTime"), ctx.now)?;
    let address = format!(
        "{}{}",
        ctx.device.events_service_url(),
        PULL_POINT_SUFFIX
    );
    Ok(templates::create_pull_point_subscription(
        &address,
        ctx.now,
        termination,
    ))
}

fn pull_messages(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::pull_messages(
        ctx.now,
        ctx.now + Duration::seconds(DEFAULT_TERMINATION_SECS),
    ))
}

fn renew(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    let termination = termination_time(ctx.param("TerminationTime"), ctx.now)?;
    Ok(templates::renew(ctx.now, termination))
}

fn unsubscribe(_: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::empty_response("wsnt", "Unsubscribe"))
}

fn set_synchronization_point(_: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::empty_response("tev", "SetSynchronizationPoint"))
}

/// Resolve a requested termination time: an `xs:duration` relative to `now`,
/// an absolute `xs:dateTime`, or the default when absent
pub fn termination_time(
    requested: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, SoapFault> {
    let Some(value) = requested.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(now + Duration::seconds(DEFAULT_TERMINATION_SECS));
    };

    if value.starts_with('P') {
        return parse_duration(value)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| invalid_termination(value));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| invalid_termination(value))
}

fn invalid_termination(value: &str) -> SoapFault {
    SoapFault::invalid_arg(format!("Invalid termination time: {}", value))
}

/// Parse `PnYnMnDTnHnMnS`. Years and months are taken as 365 and 30 days.
/// Anything longer than a century is rejected.
fn parse_duration(value: &str) -> Option<Duration> {
    let rest = value.strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }

    let mut total = Duration::zero();
    let mut in_time = false;
    let mut number = String::new();
    let mut seen_component = false;

    for c in rest.chars() {
        match c {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' | '.' => number.push(c),
            unit => {
                if number.is_empty() {
                    return None;
                }
                let n: f64 = number.parse().ok()?;
                number.clear();
                let secs = match (unit, in_time) {
                    ('Y', false) => n * 365.0 * 86_400.0,
                    ('M', false) => n * 30.0 * 86_400.0,
                    ('W', false) => n * 7.0 * 86_400.0,
                    ('D', false) => n * 86_400.0,
                    ('H', true) => n * 3_600.0,
                    ('M', true) => n * 60.0,
                    ('S', true) => n,
                    _ => return None,
                };
                if !secs.is_finite() || secs > MAX_DURATION_SECS {
                    return None;
                }
                let delta = Duration::milliseconds((secs * 1000.0).round() as i64);
                total = total.checked_add(&delta)?;
                seen_component = true;
            }
        }
    }

    if !number.is_empty() || !seen_component {
        return None;
    }
    if total.num_seconds() as f64 > MAX_DURATION_SECS {
        return None;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::TimeZone;
    use config_manager::{BridgeConfig, DeviceConfig};
    use onvif_soap::{ns, FaultKind};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_default_termination() {
        assert_eq!(
            termination_time(None, now()).unwrap(),
            now() + Duration::hours(1)
        );
        assert_eq!(
            termination_time(Some("  "), now()).unwrap(),
            now() + Duration::hours(1)
        );
    }

    #[test]
    fn test_duration_termination() {
        assert_eq!(
            termination_time(Some("PT60S"), now()).unwrap(),
            now() + Duration::seconds(60)
        );
        assert_eq!(
            termination_time(Some("PT1H"), now()).unwrap(),
            now() + Duration::hours(1)
        );
        assert_eq!(
            termination_time(Some("P1DT2H"), now()).unwrap(),
            now() + Duration::hours(26)
        );
        assert_eq!(
            termination_time(Some("PT1M30.5S"), now()).unwrap(),
            now() + Duration::milliseconds(90_500)
        );
    }

    #[test]
    fn test_absolute_termination() {
        assert_eq!(
            termination_time(Some("2024-01-01T05:00:00Z"), now()).unwrap(),
            now() + Duration::hours(5)
        );
    }

    #[test]
    fn test_invalid_termination() {
        for bad in ["P", "PT", "P1H", "PT5", "tomorrow", "P1X"] {
            assert!(termination_time(Some(bad), now()).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_huge_duration_is_rejected() {
        for huge in [
            "PT9000000000000S",
            "P99999999999999999999Y1D",
            "P36500DT1H",
            "P60000Y60000Y",
        ] {
            let err = termination_time(Some(huge), now()).unwrap_err();
            assert_eq!(err.kind, FaultKind::InvalidArgument, "{}", huge);
        }
        assert!(termination_time(Some("P36500D"), now()).is_ok());
    }

    #[test]
    fn test_huge_duration_through_dispatcher() {
        let mut config = BridgeConfig::default();
        config.stream.url = "rtsp://10.0.0.5/live".to_string();
        config.network.advertise_ip = Some("10.0.0.2".parse().unwrap());
        let device = Arc::new(DeviceConfig::from_config(&config).unwrap());
        let registry = crate::services::default_registry(device, None);

        let body = format!(
            r#"<s:Envelope xmlns:s="{}"><s:Body><tev:CreatePullPointSubscription xmlns:tev="{}"><tev:InitialTerminationTime>PT9000000000000S</tev:InitialTerminationTime></tev:CreatePullPointSubscription></s:Body></s:Envelope>"#,
            ns::SOAP12,
            ns::TEV
        );
        let response = registry
            .handle_request("/onvif/events_service", body.as_bytes())
            .unwrap();
        assert!(response.is_fault);
        assert!(response.xml.contains("ter:InvalidArgVal"));
        assert!(response.xml.contains("PT9000000000000S"));
    }
}
