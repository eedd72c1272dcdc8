//! Entry point for the fleettop TUI. Parses args and runs the App.

use std::process::ExitCode;

use fleettop::app::App;

pub(crate) struct ParsedArgs {
    host: String,
    port: u16,
}

pub(crate) fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "fleettop".into());
    let mut host = "127.0.0.1".to_string();
    let mut port = 8080u16;
    let mut positional: Option<String> = None;
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                return Err(format!("Usage: {prog} [--host HOST] [--port PORT] [HOST:PORT]\n"));
            }
            "--host" => {
                host = it.next().ok_or("--host needs a value")?;
            }
            "--port" | "-p" => {
                let v = it.next().ok_or("--port needs a value")?;
                port = v.parse().map_err(|_| format!("invalid port: {v}"))?;
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
            _ if positional.is_none() && !arg.starts_with('-') => {
                positional = Some(arg);
            }
            _ => {
                return Err(format!(
                    "Unexpected argument '{arg}'. Usage: {prog} [--host HOST] [--port PORT] [HOST:PORT]"
                ));
            }
        }
    }
    if let Some(addr) = positional {
        match addr.rsplit_once(':') {
            Some((h, p)) => {
                host = h.to_string();
                port = p.parse().map_err(|_| format!("invalid port in '{addr}'"))?;
            }
            None => return Err(format!("expected HOST:PORT, got '{addr}'")),
        }
    }
    Ok(ParsedArgs { host, port })
}

#[tokio::main]
async fn main() -> ExitCode {
    let parsed = match parse_args(std::env::args()) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::SUCCESS;
        }
    };

    let mut app = App::new();
    match app.run(&parsed.host, parsed.port).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("could not connect to hub at {}:{}: {error}", parsed.host, parsed.port);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_defaults() {
        let parsed = parse_args(vec!["fleettop".into()]).unwrap();
        assert_eq!(parsed.host, "127.0.0.1");
        assert_eq!(parsed.port, 8080);
    }

    #[test]
    fn args_flags_and_positional() {
        let parsed = parse_args(vec![
            "fleettop".into(),
            "--host".into(),
            "hub.local".into(),
            "--port=9090".into(),
        ])
        .unwrap();
        assert_eq!(parsed.host, "hub.local");
        assert_eq!(parsed.port, 9090);

        let parsed = parse_args(vec!["fleettop".into(), "10.1.2.3:7000".into()]).unwrap();
        assert_eq!(parsed.host, "10.1.2.3");
        assert_eq!(parsed.port, 7000);
    }

    #[test]
    fn args_reject_bad_port() {
        assert!(parse_args(vec!["fleettop".into(), "--port".into(), "x".into()]).is_err());
        assert!(parse_args(vec!["fleettop".into(), "hostonly".into()]).is_err());
    }
}
