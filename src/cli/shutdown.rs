use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Cancels the token once the process receives Ctrl-C.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Failed to listen for Ctrl-C {e:?}");
                return;
            }
            debug!("Received Ctrl-C");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => {},
    };
}
