use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Result, WrapErr, bail};
use log::{debug, info, warn};

use ytranscript::config::Config;
use ytranscript::resolver::Resolver;
use ytranscript::server::{self, AppState};
use ytranscript::youtube::InnerTubeSource;

mod cli;

use cli::{Cli, Command, OutputFormat};

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytranscript.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytranscript")
        .join("logs")
}

fn build_after_help() -> String {
    let log_path = log_dir().join("ytranscript.log");
    let config_path = ytranscript::config::config_path();

    format!(
        "\nConfig is read from: {}\nLogs are written to: {}",
        config_path.display(),
        log_path.display()
    )
}

fn build_resolver(config: &Config) -> Result<Resolver> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs()))
        .build()
        .wrap_err("building HTTP client")?;

    let source = Arc::new(InnerTubeSource::new(client));
    Ok(Resolver::with_languages(source, config.languages().as_slice()))
}

async fn run_serve(config: &Config, host: Option<String>, port: Option<u16>, verbose: bool) -> Result<()> {
    let host = host.unwrap_or_else(|| config.host().to_string());
    let port = port.unwrap_or(config.port());
    let state = AppState {
        resolver: build_resolver(config)?,
        timeout: Duration::from_secs(config.request_timeout_secs()),
    };

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .wrap_err_with(|| format!("binding to {host}:{port}"))?;

    if verbose {
        eprintln!("Listening on http://{}{}", listener.local_addr()?, server::TRANSCRIPT_PATH);
    }

    server::serve(listener, state).await
}

async fn run_fetch(config: &Config, url: Option<String>, format: OutputFormat, verbose: bool) -> Result<()> {
    let resolver = build_resolver(config)?;

    // Collect URLs: from arg or stdin
    let urls = if let Some(url) = url {
        vec![url]
    } else {
        let stdin = io::stdin();
        stdin.lock().lines().collect::<Result<Vec<_>, _>>()?
    };

    if urls.iter().all(|u| u.trim().is_empty()) {
        bail!("no URL provided\n\nUsage: ytranscript fetch <URL>\n       echo <URL> | ytranscript fetch");
    }

    for url in urls.iter().map(|u| u.trim()).filter(|u| !u.is_empty()) {
        let result = resolver.resolve(url).await;

        if verbose {
            match result.error_type() {
                None => eprintln!("Resolved: {url}"),
                Some(kind) => eprintln!("Failed ({kind}): {url}"),
            }
        }

        let rendered = match format {
            OutputFormat::Json => ytranscript::output::render_json(&result),
            OutputFormat::Text => ytranscript::output::render_plain(&result),
        };
        println!("{rendered}");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let after_help = build_after_help();
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_else(|e| {
        warn!("Ignoring invalid config: {e}");
        Config::default()
    });
    debug!("Effective languages: {:?}", config.languages());

    if cli.verbose {
        let config_path = ytranscript::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
    }

    match cli.command {
        Command::Serve { host, port } => run_serve(&config, host, port, cli.verbose).await,
        Command::Fetch { url, format } => run_fetch(&config, url, format, cli.verbose).await,
    }
}
