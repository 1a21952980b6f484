use std::fs;
use std::time::Duration;

use fifomsg_pipe::{NamedPipe, PipeAccess};
use tracing::{debug, info};

use crate::cmd::SendArgs;
use crate::exit::{pipe_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_send_summary, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let interval = args.interval.as_deref().map(parse_duration).transpose()?;
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be greater than zero"));
    }
    let payload = resolve_payload(&args)?;

    let mut pipe =
        NamedPipe::open(&args.path, PipeAccess::Write).map_err(|err| pipe_error("open failed", err))?;

    let mut bytes_written = 0usize;
    for index in 0..args.count {
        if index > 0 {
            if let Some(interval) = interval {
                std::thread::sleep(interval);
            }
        }

        let message = numbered_payload(&payload, args.numbered.then_some(index));
        bytes_written += pipe
            .send(&args.id, &message)
            .map_err(|err| pipe_error("send failed", err))?;
        debug!(identifier = %args.id, index, size = message.len(), "sent message");
    }

    info!(
        path = ?args.path,
        identifier = %args.id,
        messages = args.count,
        bytes_written,
        "send complete"
    );
    print_send_summary(&args.id, args.count, bytes_written, &args.path, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(json) = &args.json {
        serde_json::from_str::<serde_json::Value>(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return Ok(json.as_bytes().to_vec());
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}

fn numbered_payload(payload: &[u8], index: Option<usize>) -> Vec<u8> {
    let mut message = payload.to_vec();
    if let Some(index) = index {
        message.extend_from_slice(format!(" {index}").as_bytes());
    }
    message
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
