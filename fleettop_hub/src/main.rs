//! Entry point for the fleettop hub. Parses args and runs the accept loop.

use tokio::net::TcpListener;
use tracing::info;

const DEFAULT_PORT: u16 = 8080;

#[derive(Debug)]
pub(crate) struct ParsedArgs {
    port: u16,
}

pub(crate) fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "fleettop_hub".into());
    let mut port = DEFAULT_PORT;
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Err(format!("Usage: {prog} [--port PORT]\n"));
            }
            "--port" | "-p" => {
                let v = it.next().ok_or("--port needs a value")?;
                port = v.parse().map_err(|_| format!("invalid port: {v}"))?;
            }
            _ if arg.starts_with("--port=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    port = v.parse().map_err(|_| format!("invalid port: {v}"))?;
                }
            }
            _ => {
                return Err(format!(
                    "Unexpected argument '{arg}'. Usage: {prog} [--port PORT]"
                ));
            }
        }
    }
    Ok(ParsedArgs { port })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fleettop_hub=info".into()),
        )
        .init();

    let parsed = match parse_args(std::env::args()) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let listener = TcpListener::bind(("0.0.0.0", parsed.port)).await?;
    info!(port = parsed.port, "hub listening");

    fleettop_hub::serve(listener).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_default_port() {
        let parsed = parse_args(vec!["hub".into()]).unwrap();
        assert_eq!(parsed.port, DEFAULT_PORT);
    }

    #[test]
    fn args_port_forms() {
        let parsed = parse_args(vec!["hub".into(), "--port".into(), "9001".into()]).unwrap();
        assert_eq!(parsed.port, 9001);
        let parsed = parse_args(vec!["hub".into(), "-p".into(), "9002".into()]).unwrap();
        assert_eq!(parsed.port, 9002);
        let parsed = parse_args(vec!["hub".into(), "--port=9003".into()]).unwrap();
        assert_eq!(parsed.port, 9003);
    }

    #[test]
    fn args_reject_garbage() {
        assert!(parse_args(vec!["hub".into(), "--port".into(), "nope".into()]).is_err());
        assert!(parse_args(vec!["hub".into(), "--port".into()]).is_err());
        assert!(parse_args(vec!["hub".into(), "stray".into()]).is_err());
    }

    #[test]
    fn help_returns_usage() {
        let err = parse_args(vec!["hub".into(), "--help".into()]).unwrap_err();
        assert!(err.contains("Usage:"));
        assert!(err.contains("--port"));
    }
}
