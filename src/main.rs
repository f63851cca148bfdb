//! Lambda entry point.
//!
//! Reads [`NotifierConfig`] from the environment once at cold start, then
//! serves SNS events until the runtime shuts the container down.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use pipeline_alerts::config::NotifierConfig;
use pipeline_alerts::handle_sns_event;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer as _;

/// Log output format, from `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LogFormat {
    /// One JSON object per event, for CloudWatch Logs Insights.
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").as_deref() {
            Ok("pretty") => Self::Pretty,
            Ok("json") | Err(_) => Self::Json,
            Ok(other) => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to json");
                Self::Json
            }
        }
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,pipeline_alerts=debug".into());

    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .without_time()
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_ansi(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing(LogFormat::from_env());

    let config = NotifierConfig::from_env()?;
    tracing::info!(
        version = pipeline_alerts::VERSION,
        source = %config.source,
        mailer = ?config.mailer,
        parameter = %config.parameter,
        "Notifier configured"
    );
    let notifier = config.build_notifier();
    let notifier = &notifier;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<serde_json::Value>| {
        handle_sns_event(event, notifier)
    }))
    .await
}
