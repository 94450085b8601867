use scribe_bridge::CoreEvent;

/// Handles an incoming configuration request (see
/// [`scribe_bridge::CoreCommand::ConfigurationRequest`]).
pub async fn handle_config_request(context: super::AppContextHandle) {
    let config = {
        let state = context.state.read().await;
        state.config.clone()
    };
    context.send(CoreEvent::ConfigurationResponse(config)).await;
}
