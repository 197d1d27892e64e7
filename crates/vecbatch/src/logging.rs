use tracing::Subscriber;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt};

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init(app_name: &str, json: bool) -> anyhow::Result<()> {
  tracing_subscriber::registry()
    .with(build_loglevel_filter_layer(format!("info,{app_name}=debug,vecbatch_worker=debug")))
    .with(build_logger(json))
    .try_init()?;
  Ok(())
}

pub fn build_logger<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
  S: Subscriber + for<'a> LookupSpan<'a>,
{
  if json {
    Box::new(
      tracing_subscriber::fmt::layer()
        .json()
        .with_timer(tracing_subscriber::fmt::time::time()),
    )
  } else {
    Box::new(
      tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_timer(tracing_subscriber::fmt::time::time()),
    )
  }
}

pub fn build_loglevel_filter_layer<S: Into<String>>(default_log: S) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_log.into()))
}
