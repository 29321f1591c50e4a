//! fetchscope CLI - perform one intercepted request and log its span

use clap::Parser;
use fetchscope::{InterceptorConfig, RequestInit};
use reqwest::Method;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fetchscope")]
#[command(about = "Send an HTTP request and log the captured span")]
#[command(version)]
struct Cli {
    /// Request URL
    url: String,

    /// HTTP method (default: GET)
    #[arg(short = 'X', long)]
    method: Option<String>,

    /// Request header as 'Name: value', repeatable
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short, long)]
    data: Option<String>,

    /// Interceptor config file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not capture the request body
    #[arg(long)]
    no_request_body: bool,

    /// Do not capture the response body
    #[arg(long)]
    no_response_body: bool,

    /// Do not capture headers
    #[arg(long)]
    no_headers: bool,

    /// Override the maximum captured body size in bytes
    #[arg(long)]
    max_body_size: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fetchscope::init_tracing();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let init = build_init(&cli)?;

    let provider = fetchscope::telemetry::init_tracer_provider();
    let handle = fetchscope::install(config);

    let result = fetchscope::fetch(cli.url.as_str(), init).await;
    handle.restore();

    let outcome = match result {
        Ok(response) => {
            println!("{} {}", response.status().as_u16(), response.status_text());
            let body = response.text().await?;
            println!("{}", body);
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("request failed")),
    };

    if let Err(e) = provider.shutdown() {
        tracing::warn!(error = %e, "Failed to shut down tracer provider");
    }

    outcome
}

fn build_config(cli: &Cli) -> anyhow::Result<InterceptorConfig> {
    let mut config = match &cli.config {
        Some(path) => InterceptorConfig::load(path)?,
        None => InterceptorConfig::default(),
    };

    if cli.no_request_body {
        config.capture_request_body = false;
    }
    if cli.no_response_body {
        config.capture_response_body = false;
    }
    if cli.no_headers {
        config.capture_headers = false;
    }
    if let Some(max) = cli.max_body_size {
        config.max_body_size = max;
    }
    config.validate()?;

    Ok(config)
}

fn build_init(cli: &Cli) -> anyhow::Result<RequestInit> {
    let mut init = RequestInit::new();

    if let Some(method) = &cli.method {
        let method = Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| anyhow::anyhow!("Invalid HTTP method: {}", method))?;
        init = init.method(method);
    }

    for header in &cli.headers {
        let (name, value) = parse_header(header)?;
        init = init.header(name, value);
    }

    if let Some(data) = &cli.data {
        init = init.body(data.as_str());
    }

    Ok(init)
}

fn parse_header(raw: &str) -> anyhow::Result<(String, String)> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => anyhow::bail!("Header must be 'Name: value', got: {}", raw),
    }
}
