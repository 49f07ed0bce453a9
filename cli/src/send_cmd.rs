//! `pincho send`

use clap::Args;
use pincho_client::CancelScope;
use pincho_client::CancellationToken;
use pincho_client::PinchoClient;
use pincho_client::SendOptions;
use tracing::debug;

use crate::GlobalArgs;
use crate::exit_code::CliError;
use crate::exit_code::Endpoint;
use crate::output;
use crate::read_stdin;
use crate::settings::ResolvedSettings;

/// Send a push notification.
///
/// The title is required and the message is optional. Tags are normalized to
/// lowercase (at most 10, 50 characters each).
#[derive(Debug, Args)]
pub struct SendArgs {
    /// Notification title.
    pub title: String,

    /// Notification body.
    #[arg(conflicts_with = "stdin")]
    pub message: Option<String>,

    /// Notification type (e.g. alert, info, success).
    #[arg(long = "type", value_name = "TYPE")]
    pub notification_type: Option<String>,

    /// Tag for categorization. Repeatable or comma separated.
    #[arg(long = "tag", value_name = "TAG", value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Image to display with the notification.
    #[arg(long, value_name = "URL")]
    pub image_url: Option<String>,

    /// URL opened when the notification is tapped.
    #[arg(long, value_name = "URL")]
    pub action_url: Option<String>,

    /// Read the message body from stdin.
    #[arg(long)]
    pub stdin: bool,

    /// Encrypt the body with AES-128-CBC (must match the type's password in the app).
    #[arg(long, value_name = "PASSWORD")]
    pub encryption_password: Option<String>,

    /// Print the API response as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run_send(
    args: SendArgs,
    global: &GlobalArgs,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let settings = ResolvedSettings::load(&global.overrides())?;
    debug!(?settings, "resolved settings");

    let message = if args.stdin {
        read_stdin().await?
    } else {
        args.message.unwrap_or_default()
    };

    let options = SendOptions {
        title: args.title,
        message,
        notification_type: settings.notification_type(args.notification_type),
        tags: settings.merged_tags(&args.tags),
        image_url: args.image_url,
        action_url: args.action_url,
        encryption_password: args.encryption_password,
    };
    debug!(
        message_len = options.message.len(),
        tags = ?options.tags,
        encrypted = options.encryption_password.is_some(),
        "sending notification"
    );

    let api_error = |err: pincho_client::PinchoError| CliError::from_api(&err, Endpoint::Send);
    let client = PinchoClient::with_config(settings.client_config()).map_err(api_error)?;
    // The timeout bounds the whole call, retries and backoff included.
    let scope = CancelScope::new(cancel).with_timeout(settings.timeout);
    let result = client
        .send_with_cancel(options, &scope)
        .await
        .map_err(api_error)?;

    if args.json {
        println!("{}", output::to_json(&result)?);
    } else {
        print!("{}", output::render_send(&result));
    }
    Ok(())
}
