use pushpix_bridge::MessageFromBackend;

/// Answers a host's [`pushpix_bridge::MessageToBackend::ConfigurationRequest`]
/// with the configuration the backend was started with, so the host can read
/// the deadline budget, enrichment keys and attachment directory in effect.
pub async fn handle_config_request(context: super::AppContextHandle) {
    let config = context.state.read().await.config.clone();
    log::debug!(
        "Reporting configuration (deadline {} ms)",
        config.host.deadline_ms
    );
    context
        .send(MessageFromBackend::ConfigurationResponse(config))
        .await;
}
