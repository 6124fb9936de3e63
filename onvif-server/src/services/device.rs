//! Device service (`tds`)
//!
//! Identity, capability and system queries, all answered from the immutable
//! device snapshot plus the request time.

use onvif_soap::SoapFault;

use crate::registry::{OperationContext, OperationTable, ServiceKind};
use crate::templates;

pub fn operations() -> OperationTable {
    OperationTable::new()
        .pre_auth("GetDeviceInformation", get_device_information)
        .pre_auth("GetCapabilities", get_capabilities)
        .pre_auth("GetServices", get_services)
        .pre_auth("GetServiceCapabilities", get_service_capabilities)
        .pre_auth("GetSystemDateAndTime", get_system_date_and_time)
        .pre_auth("GetScopes", get_scopes)
        .pre_auth("GetHostname", get_hostname)
        .pre_auth("GetWsdlUrl", get_wsdl_url)
        .pre_auth("GetEndpointReference", get_endpoint_reference)
        .op("GetNetworkInterfaces", get_network_interfaces)
        .op("GetDNS", get_dns)
        .op("GetNTP", get_ntp)
        .op("GetUsers", get_users)
}

fn get_device_information(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::device_information(&ctx.device.descriptor))
}

/// Sections for the requested categories; no category or `All` means every
/// registered service
fn get_capabilities(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    let requested: Vec<&str> = ctx
        .request
        .body
        .params
        .all("Category")
        .map(|p| p.text.as_str())
        .collect();

    let mut kinds = Vec::new();
    if requested.is_empty() || requested.contains(&"All") {
        kinds.extend(ctx.registry.capabilities().map(|c| c.kind));
    } else {
        for category in requested {
            let kind = ServiceKind::from_category(category)
                .filter(|k| ctx.registry.capability(*k).is_some())
                .ok_or_else(|| no_such_service(category))?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
    }

    let sections: Vec<String> = kinds
        .into_iter()
        .filter_map(|kind| ctx.registry.capability(kind))
        .map(|cap| match cap.kind {
            ServiceKind::Device => templates::device_capabilities(&cap.xaddr),
            ServiceKind::Media => templates::media_capabilities(&cap.xaddr),
            ServiceKind::Events => templates::events_capabilities(
                &cap.xaddr,
                cap.supports("CreatePullPointSubscription"),
            ),
        })
        .collect();

    Ok(templates::capabilities(&sections))
}

fn no_such_service(category: &str) -> SoapFault {
    SoapFault::invalid_arg(format!(
        "NoSuchService: capability category {} is not available",
        category
    ))
    .with_detail("ter:NoSuchService")
}

fn get_services(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    let entries: Vec<String> = ctx
        .registry
        .capabilities()
        .map(templates::service_entry)
        .collect();
    Ok(templates::services(&entries))
}

fn get_service_capabilities(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::device_service_capabilities(
        ctx.registry.auth().is_some(),
    ))
}

fn get_system_date_and_time(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::system_date_and_time(ctx.now))
}

fn get_scopes(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::scopes(ctx.device.scopes()))
}

fn get_hostname(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::hostname(&ctx.device.hostname))
}

fn get_wsdl_url(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::wsdl_url(&format!(
        "{}?wsdl",
        ctx.device.device_service_url()
    )))
}

fn get_endpoint_reference(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::endpoint_reference(
        &ctx.device.descriptor.endpoint_reference(),
    ))
}

fn get_network_interfaces(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::network_interfaces(
        &ctx.device.advertise_ip.to_string(),
    ))
}

fn get_dns(_: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::dns().to_string())
}

fn get_ntp(_: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::ntp().to_string())
}

fn get_users(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::users(ctx.registry.auth().map(|a| a.username())))
}
