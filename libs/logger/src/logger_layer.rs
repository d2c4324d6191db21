use tracing_subscriber::{
  fmt::{self, format::FmtSpan, time::UtcTime},
  layer::SubscriberExt,
  EnvFilter, Layer, Registry,
};

use crate::config::{LoggerConfig, LoggerConfigFormat};

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
  #[error("invalid log filter: {0}")]
  InvalidFilter(#[from] tracing_subscriber::filter::ParseError),
  #[error("failed to install the global logger: {0}")]
  AlreadyInstalled(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn build_logger(
  config: &LoggerConfig,
) -> Result<Box<dyn Layer<Registry> + Send + Sync>, tracing_subscriber::filter::ParseError> {
  let timer = UtcTime::rfc_3339();
  let filter = EnvFilter::try_new(&config.filter)?;
  let performance_spans = match config.print_performance_info {
    true => FmtSpan::CLOSE,
    false => FmtSpan::NONE,
  };

  Ok(match config.format {
    LoggerConfigFormat::Json => fmt::Layer::<Registry>::default()
      .json()
      .with_timer(timer)
      .with_span_events(performance_spans)
      .with_writer(std::io::stderr)
      .with_filter(filter)
      .boxed(),
    LoggerConfigFormat::Pretty => fmt::Layer::<Registry>::default()
      .pretty()
      .with_timer(timer)
      .with_span_events(performance_spans)
      .with_writer(std::io::stderr)
      .with_filter(filter)
      .boxed(),
    LoggerConfigFormat::Compact => fmt::Layer::<Registry>::default()
      .compact()
      .with_timer(timer)
      .with_span_events(performance_spans)
      .with_writer(std::io::stderr)
      .with_filter(filter)
      .boxed(),
  })
}

/// Installs the layer described by `config` as the global subscriber.
pub fn init_logger(config: &LoggerConfig) -> Result<(), LoggerError> {
  let layer = build_logger(config)?;
  let subscriber = Registry::default().with(layer);
  tracing::subscriber::set_global_default(subscriber)?;

  Ok(())
}
