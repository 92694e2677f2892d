use pushpix_bridge::{
    MessageFromBackend,
    notification::{EnrichedContent, NotificationRequest, RequestId},
};

/// Handles an incoming notification (see
/// [`pushpix_bridge::MessageToBackend::NotificationReceived`]).
///
/// Starts an enrichment session whose content handler forwards the final
/// content to the host. The session is kept until it has delivered, so that a
/// later deadline signal can still reach it. Notifications whose ID is still
/// pending or among the recent deliveries are ignored.
pub async fn handle_notification_received(
    context: super::AppContextHandle,
    request: NotificationRequest,
) {
    let request_id = request.identifier;
    let tx = context.tx.clone();
    let runtime = tokio::runtime::Handle::current();
    let handler = move |content: EnrichedContent| {
        runtime.spawn(async move {
            let message = MessageFromBackend::ContentDelivered {
                request_id,
                content,
            };
            if let Err(error) = tx.send(message).await {
                log::error!("Failed to deliver content of {request_id} to host: {error}");
            }
        });
    };

    let mut state = context.state.write().await;
    state.prune_delivered();
    if state.is_known(&request_id) {
        log::warn!("Ignoring duplicate notification {request_id}");
        return;
    }

    let session = state.enricher.begin(request, handler);
    if session.is_delivered() {
        state.remember_delivered(session.request_id());
    } else {
        state.sessions.insert(session.request_id(), session);
    }
}

/// Handles the deadline signal of a request (see
/// [`pushpix_bridge::MessageToBackend::ServiceTimeWillExpire`]).
pub async fn handle_time_will_expire(context: super::AppContextHandle, request_id: RequestId) {
    let session = {
        let mut state = context.state.write().await;
        state.prune_delivered();
        state.sessions.remove(&request_id)
    };

    match session {
        Some(session) => {
            session.time_will_expire();
        }
        None => log::debug!("No pending enrichment for {request_id}, nothing to expire"),
    }
}
