//! Latlab CLI

use std::path::PathBuf;
use std::process;

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use latlab::config::Config;
use latlab::network::NetworkHandler;
use latlab::params::ContentKind;
use latlab::payload;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "serve" => serve(&args[2..]),
        "sample" => sample(&args[2..]),
        command => {
            eprintln!("Unknown command: {command}");
            eprintln!("Run 'latlab' for usage information.");
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    eprintln!("Latlab v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("Usage: latlab <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  serve [--config <path>] [--port <port>]   Start the simulation server");
    eprintln!("  sample <css|js|image> [size_kb]           Print a synthesized payload summary");
}

fn serve(args: &[String]) -> anyhow::Result<()> {
    let mut config_path: Option<PathBuf> = None;
    let mut port: Option<u16> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => {
                let value = iter.next().context("--config requires a path")?;
                config_path = Some(PathBuf::from(value));
            }
            "--port" => {
                let value = iter.next().context("--port requires a value")?;
                port = Some(value.parse().with_context(|| format!("Invalid port: {value}"))?);
            }
            other => bail!("Unknown option: {other}"),
        }
    }

    let mut config = match config_path {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Loading {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(port) = port {
        config.server.port = port;
        config.validate()?;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("latlab={}", config.server.log_level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(NetworkHandler::new(config).run())?;
    Ok(())
}

fn sample(args: &[String]) -> anyhow::Result<()> {
    let Some(kind_arg) = args.first() else {
        bail!("Usage: latlab sample <css|js|image> [size_kb]");
    };

    let kind = ContentKind::from_segment(kind_arg)
        .with_context(|| format!("Unknown content kind: {kind_arg}"))?;

    let size_kb = match args.get(1) {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("Invalid size: {raw}"))?,
        None => 0,
    };
    let size_kb = if size_kb == 0 { kind.default_size_kb() } else { size_kb };

    let body = payload::synthesize(kind, None, size_kb).into_bytes();

    println!("Kind:         {kind:?}");
    println!("Content-Type: {}", kind.content_type());
    println!("Requested:    {size_kb}KB ({} bytes)", size_kb as usize * payload::KB);
    println!("Generated:    {} bytes", body.len());

    if kind != ContentKind::Image {
        let first_line = body.split(|&b| b == b'\n').next().unwrap_or_default();
        println!("Header:       {}", String::from_utf8_lossy(first_line));
    }

    Ok(())
}
