use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fifomsg_pipe::{NamedPipe, PipeAccess};
use tracing::info;

use crate::cmd::send::parse_duration;
use crate::cmd::ListenArgs;
use crate::exit::{pipe_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::{print_message, OutputFormat};

const WAKE_INTERVAL: Duration = Duration::from_millis(100);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let deadline = args
        .duration
        .as_deref()
        .map(parse_duration)
        .transpose()?
        .map(|d| Instant::now() + d);
    let ids = if args.ids.is_empty() {
        vec![fifomsg_frame::DEFAULT_IDENTIFIER.to_string()]
    } else {
        args.ids.clone()
    };

    let mut pipe =
        NamedPipe::open(&args.path, PipeAccess::Read).map_err(|err| pipe_error("open failed", err))?;

    let (tx, rx) = mpsc::channel::<(String, Vec<u8>)>();
    for id in &ids {
        let tx = tx.clone();
        let tag = id.clone();
        pipe.register_handler(id.as_str(), move |content: &[u8]| {
            let _ = tx.send((tag.clone(), content.to_vec()));
        })
        .map_err(|err| pipe_error("register failed", err))?;
    }
    drop(tx);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    pipe.start_listening()
        .map_err(|err| pipe_error("listen failed", err))?;
    info!(path = ?args.path, identifiers = ?ids, "listening");

    let mut printed = 0usize;
    let mut code = SUCCESS;

    while running.load(Ordering::SeqCst) {
        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            if args.count.is_some() {
                code = TIMEOUT;
            }
            break;
        }

        match rx.recv_timeout(WAKE_INTERVAL) {
            Ok((identifier, content)) => {
                print_message(&identifier, &content, &args.path, format);
                printed = printed.saturating_add(1);
            }
            Err(RecvTimeoutError::Timeout) => {
                if !pipe.is_listening() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    pipe.stop().map_err(|err| pipe_error("listener failed", err))?;

    info!(received = printed, "listen finished");
    Ok(code)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
