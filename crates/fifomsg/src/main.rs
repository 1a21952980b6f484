mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "fifomsg", version, about = "Named pipe messaging CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "fifomsg",
            "send",
            "/tmp/test.fifo",
            "--id",
            "NAMEDPIPE",
            "--data",
            "hello",
            "--count",
            "60",
            "--numbered",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.id, "NAMEDPIPE");
                assert_eq!(args.count, 60);
                assert!(args.numbered);
            }
            other => panic!("expected send, got {other:?}"),
        }
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "fifomsg",
            "send",
            "/tmp/test.fifo",
            "--json",
            "{\"x\":1}",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn listen_defaults_and_repeated_ids() {
        let cli = Cli::try_parse_from(["fifomsg", "listen", "/tmp/test.fifo"])
            .expect("listen args should parse");
        match cli.command {
            Command::Listen(args) => assert!(args.ids.is_empty()),
            other => panic!("expected listen, got {other:?}"),
        }

        let cli = Cli::try_parse_from([
            "fifomsg",
            "listen",
            "/tmp/test.fifo",
            "--id",
            "a",
            "--id",
            "b",
            "--duration",
            "3s",
        ])
        .expect("listen args should parse");
        match cli.command {
            Command::Listen(args) => {
                assert_eq!(args.ids, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(args.duration.as_deref(), Some("3s"));
            }
            other => panic!("expected listen, got {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["fifomsg", "doctor", "--format", "json", "--log-level", "warn"])
            .expect("global flags should parse");
        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.command, Command::Doctor(_)));
    }
}
