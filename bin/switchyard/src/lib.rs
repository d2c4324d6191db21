use std::sync::Arc;

use futures::{stream::FuturesOrdered, StreamExt};
use switchyard_common::{
  execute::RequestExecutionContext,
  graphql::{GraphQLError, GraphQLResponse, RawParams},
};
use switchyard_config::{load_config, LoggerConfig};
use switchyard_engine::executor::Executor;
use switchyard_logger::{build_logger, init_logger};
use tokio::{
  io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
  task::{JoinError, JoinHandle},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, Registry};

/// Requests executing at once; further input is read as earlier responses are written.
pub const MAX_IN_FLIGHT_REQUESTS: usize = 256;

pub async fn run_services(config_file_path: &str) -> anyhow::Result<()> {
  // config warnings are emitted before the configured logger exists
  let bootstrap_logger = Registry::default().with(build_logger(&LoggerConfig::default())?);
  let config = tracing::subscriber::with_default(bootstrap_logger, || {
    load_config(config_file_path, |key| std::env::var(key).ok())
  })?;

  init_logger(&config.logger)?;
  info!("configuration loaded from {}", config_file_path);

  let executor = Arc::new(Executor::from_config(&config).await?);
  debug!(
    plugins = executor.plugin_manager().plugins().len(),
    "executor ready"
  );

  let shutdown = CancellationToken::new();
  let signal_token = shutdown.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      info!("shutdown requested, cancelling in-flight requests");
      signal_token.cancel();
    }
  });

  let stdin = tokio::io::BufReader::new(tokio::io::stdin());
  serve(
    executor,
    stdin,
    tokio::io::stdout(),
    shutdown,
    MAX_IN_FLIGHT_REQUESTS,
  )
  .await?;

  info!("input closed, exiting");
  Ok(())
}

/// Executes one request per input line and writes one response per output line, in input order.
///
/// Up to `max_in_flight` requests run concurrently. Cancelling `shutdown` stops reading and
/// cancels every request that is still running.
pub async fn serve<R, W>(
  executor: Arc<Executor>,
  input: R,
  mut output: W,
  shutdown: CancellationToken,
  max_in_flight: usize,
) -> std::io::Result<()>
where
  R: AsyncBufRead + Unpin,
  W: AsyncWrite + Unpin,
{
  let mut lines = input.lines();
  let mut pending = FuturesOrdered::new();
  let mut reading = true;
  let max_in_flight = max_in_flight.max(1);

  loop {
    tokio::select! {
      line = lines.next_line(),
        if reading && !shutdown.is_cancelled() && pending.len() < max_in_flight => match line? {
        Some(line) if line.trim().is_empty() => {}
        Some(line) => pending.push_back(spawn_request(executor.clone(), line, shutdown.child_token())),
        None => reading = false,
      },
      _ = shutdown.cancelled(), if reading => reading = false,
      Some(result) = pending.next() => write_response(&mut output, into_response(result)).await?,
      else => break,
    }
  }

  output.flush().await
}

fn spawn_request(
  executor: Arc<Executor>,
  line: String,
  cancellation: CancellationToken,
) -> JoinHandle<GraphQLResponse> {
  tokio::spawn(async move {
    let params = match RawParams::from_json(&line) {
      Ok(params) => params,
      Err(e) => {
        debug!("failed to parse request: {}", e);
        return GraphQLError::new(&format!("invalid request: {}", e))
          .with_code("BAD_REQUEST")
          .into();
      }
    };

    let ctx = Arc::new(RequestExecutionContext::with_cancellation(cancellation));
    executor.execute_with_context(ctx, params).await
  })
}

fn into_response(result: Result<GraphQLResponse, JoinError>) -> GraphQLResponse {
  result.unwrap_or_else(|e| {
    error!("request task failed: {}", e);
    GraphQLResponse::new_error("internal error")
  })
}

async fn write_response<W: AsyncWrite + Unpin>(
  output: &mut W,
  response: GraphQLResponse,
) -> std::io::Result<()> {
  let mut line = serde_json::to_vec(&response).map_err(std::io::Error::other)?;
  line.push(b'\n');
  output.write_all(&line).await
}
