//! Serve command - HTTP or HTTPS server with optional change watching.

use tokio_util::sync::CancellationToken;

use crate::cli::ServeArgs;
use crate::config::Settings;

/// Run the serve command until Ctrl+C.
pub async fn run(args: ServeArgs, mut settings: Settings) -> anyhow::Result<()> {
    args.apply(&mut settings);

    crate::logging::init_with_config(&settings.logging);

    let ct = CancellationToken::new();
    crate::server::cancel_on_ctrl_c(ct.clone());

    crate::server::serve(settings, ct).await
}
