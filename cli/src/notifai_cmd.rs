//! `pincho notifai`

use clap::Args;
use pincho_client::CancelScope;
use pincho_client::CancellationToken;
use pincho_client::NotifAiOptions;
use pincho_client::PinchoClient;

use crate::GlobalArgs;
use crate::exit_code::CliError;
use crate::exit_code::Endpoint;
use crate::output;
use crate::read_stdin;
use crate::settings::ResolvedSettings;

/// Turn free-form text into a notification with AI.
///
/// The text must be 5 to 2500 characters.
#[derive(Debug, Args)]
pub struct NotifAiArgs {
    /// Free-form text describing what happened.
    #[arg(required_unless_present = "stdin", conflicts_with = "stdin")]
    pub text: Option<String>,

    /// Notification type.
    #[arg(long = "type", value_name = "TYPE")]
    pub notification_type: Option<String>,

    /// Read the text from stdin.
    #[arg(long)]
    pub stdin: bool,

    /// Print the API response as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run_notifai(
    args: NotifAiArgs,
    global: &GlobalArgs,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let settings = ResolvedSettings::load(&global.overrides())?;

    let text = if args.stdin {
        read_stdin().await?
    } else {
        args.text.unwrap_or_default()
    };
    let options = NotifAiOptions {
        text,
        notification_type: settings.notification_type(args.notification_type),
    };
    tracing::debug!(text_len = options.text.len(), "sending notifai request");

    let api_error = |err: pincho_client::PinchoError| CliError::from_api(&err, Endpoint::NotifAi);
    let client = PinchoClient::with_config(settings.client_config()).map_err(api_error)?;
    // The timeout bounds the whole call, retries and backoff included.
    let scope = CancelScope::new(cancel).with_timeout(settings.timeout);
    let result = client
        .notifai_with_cancel(options, &scope)
        .await
        .map_err(api_error)?;

    if args.json {
        println!("{}", output::to_json(&result)?);
    } else {
        print!("{}", output::render_notifai(&result));
    }
    Ok(())
}
