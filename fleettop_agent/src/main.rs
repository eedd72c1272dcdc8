//! Entry point for the fleettop agent. Parses args, dials the hub and runs
//! the interactive input loop.

use std::time::Duration;

use sysinfo::System;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tracing::info;

pub(crate) struct ParsedArgs {
    host: String,
    port: u16,
    id: Option<String>,
}

pub(crate) fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "fleettop_agent".into());
    let mut host = "127.0.0.1".to_string();
    let mut port = 8080u16;
    let mut id: Option<String> = None;
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Err(format!(
                    "Usage: {prog} [--host HOST] [--port PORT] [--id IDENTIFIER]\n"
                ));
            }
            "--host" => {
                host = it.next().ok_or("--host needs a value")?;
            }
            "--port" | "-p" => {
                let v = it.next().ok_or("--port needs a value")?;
                port = v.parse().map_err(|_| format!("invalid port: {v}"))?;
            }
            "--id" => {
                id = it.next();
            }
            _ if arg.starts_with("--host=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    host = v.to_string();
                }
            }
            _ if arg.starts_with("--port=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    port = v.parse().map_err(|_| format!("invalid port: {v}"))?;
                }
            }
            _ if arg.starts_with("--id=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    id = Some(v.to_string());
                }
            }
            _ => {
                return Err(format!(
                    "Unexpected argument '{arg}'. Usage: {prog} [--host HOST] [--port PORT] [--id IDENTIFIER]"
                ));
            }
        }
    }
    Ok(ParsedArgs { host, port, id })
}

/// Arbitrary but stable for the process lifetime.
fn default_id() -> String {
    let host = System::host_name().unwrap_or_else(|| "agent".into());
    format!("{host}-{}", std::process::id())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleettop_agent=info".into()),
        )
        .init();

    let parsed = match parse_args(std::env::args()) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };
    let client_id = parsed.id.unwrap_or_else(default_id);

    let stream = TcpStream::connect((parsed.host.as_str(), parsed.port)).await?;
    info!(host = %parsed.host, port = parsed.port, %client_id, "connected to hub");

    let handle = fleettop_agent::start(stream, &client_id).await?;

    // Interactive loop: `/interval <ms>` adjusts the local cadence. When
    // stdin closes (daemonized run) the tasks keep reporting on their own.
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = stdin.next_line().await {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("/interval ") {
            match rest.trim().parse::<i64>() {
                Ok(ms) if ms > 0 => {
                    handle
                        .set_interval(Duration::from_millis(ms as u64))
                        .await?;
                    println!("interval set to {ms}ms");
                }
                _ => println!("interval must be a positive integer (milliseconds)"),
            }
        } else if !trimmed.is_empty() {
            println!("commands: /interval <ms>");
        }
    }

    std::future::pending::<()>().await;
    Ok(())
}
