//! Media service (`trt`)
//!
//! One profile, one video source, one encoder. Every token a client can send
//! back is checked against the single configured value.

use onvif_soap::SoapFault;

use crate::registry::{OperationContext, OperationTable, ServiceKind};
use crate::templates;

pub fn operations() -> OperationTable {
    OperationTable::new()
        .pre_auth("GetServiceCapabilities", get_service_capabilities)
        .op("GetProfiles", get_profiles)
        .op("GetProfile", get_profile)
        .op("GetStreamUri", get_stream_uri)
        .op("GetVideoSources", get_video_sources)
        .op("GetVideoSourceConfigurations", get_video_source_configurations)
        .op("GetVideoSourceConfiguration", get_video_source_configuration)
        .op(
            "GetVideoSourceConfigurationOptions",
            get_video_source_configuration_options,
        )
        .op(
            "GetCompatibleVideoSourceConfigurations",
            get_compatible_video_source_configurations,
        )
        .op("GetVideoEncoderConfigurations", get_video_encoder_configurations)
        .op("GetVideoEncoderConfiguration", get_video_encoder_configuration)
        .op(
            "GetVideoEncoderConfigurationOptions",
            get_video_encoder_configuration_options,
        )
        .op(
            "GetCompatibleVideoEncoderConfigurations",
            get_compatible_video_encoder_configurations,
        )
        .op("GetAudioSources", get_audio_sources)
        .op("GetAudioSourceConfigurations", get_audio_source_configurations)
        .op("GetAudioEncoderConfigurations", get_audio_encoder_configurations)
}

/// `ProfileToken` must name the configured profile
fn check_profile_token(ctx: &OperationContext<'_>) -> Result<(), SoapFault> {
    let expected = ctx.device.profile.token.as_str();
    match ctx.param("ProfileToken") {
        Some(token) if token == expected => Ok(()),
        Some(token) => Err(SoapFault::invalid_arg(format!(
            "Profile token {} does not exist",
            token
        ))
        .with_detail("ter:NoProfile")),
        None => Err(SoapFault::invalid_arg("ProfileToken is required").with_detail("ter:NoProfile")),
    }
}

/// `ConfigurationToken` must equal `expected`
fn check_configuration_token(ctx: &OperationContext<'_>, expected: &str) -> Result<(), SoapFault> {
    match ctx.param("ConfigurationToken") {
        Some(token) if token == expected => Ok(()),
        Some(token) => Err(SoapFault::invalid_arg(format!(
            "Configuration token {} does not exist",
            token
        ))
        .with_detail("ter:NoConfig")),
        None => Err(SoapFault::invalid_arg("ConfigurationToken is required")
            .with_detail("ter:NoConfig")),
    }
}

fn get_service_capabilities(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    let snapshot = ctx
        .registry
        .capability(ServiceKind::Media)
        .is_some_and(|c| c.supports("GetSnapshotUri"));
    Ok(templates::media_service_capabilities(snapshot))
}

fn get_profiles(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::profiles(&ctx.device.profile))
}

fn get_profile(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    check_profile_token(ctx)?;
    Ok(templates::single_profile(&ctx.device.profile))
}

/// The configured URL is handed back untouched
fn get_stream_uri(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    check_profile_token(ctx)?;
    Ok(templates::stream_uri(&ctx.device.stream_uri))
}

fn get_video_sources(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::video_sources(&ctx.device.profile))
}

fn get_video_source_configurations(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::configuration_response(
        "GetVideoSourceConfigurations",
        &templates::video_source_configuration("trt:Configurations", &ctx.device.profile),
    ))
}

fn get_video_source_configuration(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    check_configuration_token(ctx, &ctx.device.profile.source_token)?;
    Ok(templates::configuration_response(
        "GetVideoSourceConfiguration",
        &templates::video_source_configuration("trt:Configuration", &ctx.device.profile),
    ))
}

fn get_video_source_configuration_options(
    ctx: &OperationContext<'_>,
) -> Result<String, SoapFault> {
    Ok(templates::video_source_configuration_options(
        &ctx.device.profile,
    ))
}

fn get_compatible_video_source_configurations(
    ctx: &OperationContext<'_>,
) -> Result<String, SoapFault> {
    check_profile_token(ctx)?;
    Ok(templates::configuration_response(
        "GetCompatibleVideoSourceConfigurations",
        &templates::video_source_configuration("trt:Configurations", &ctx.device.profile),
    ))
}

fn get_video_encoder_configurations(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::configuration_response(
        "GetVideoEncoderConfigurations",
        &templates::video_encoder_configuration(
            "trt:Configurations",
            &ctx.device.profile.encoder,
        ),
    ))
}

fn get_video_encoder_configuration(ctx: &OperationContext<'_>) -> Result<String, SoapFault> {
    check_configuration_token(ctx, &ctx.device.profile.encoder.token)?;
    Ok(templates::configuration_response(
        "GetVideoEncoderConfiguration",
        &templates::video_encoder_configuration(
            "trt:Configuration",
            &ctx.device.profile.encoder,
        ),
    ))
}

fn get_video_encoder_configuration_options(
    ctx: &OperationContext<'_>,
) -> Result<String, SoapFault> {
    Ok(templates::video_encoder_configuration_options(
        &ctx.device.profile.encoder,
    ))
}

fn get_compatible_video_encoder_configurations(
    ctx: &OperationContext<'_>,
) -> Result<String, SoapFault> {
    check_profile_token(ctx)?;
    Ok(templates::configuration_response(
        "GetCompatibleVideoEncoderConfigurations",
        &templates::video_encoder_configuration(
            "trt:Configurations",
            &ctx.device.profile.encoder,
        ),
    ))
}

fn get_audio_sources(_: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::empty_response("trt", "GetAudioSources"))
}

fn get_audio_source_configurations(_: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::empty_response("trt", "GetAudioSourceConfigurations"))
}

fn get_audio_encoder_configurations(_: &OperationContext<'_>) -> Result<String, SoapFault> {
    Ok(templates::empty_response("trt", "GetAudioEncoderConfigurations"))
}
