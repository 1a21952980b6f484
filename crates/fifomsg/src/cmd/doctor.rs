use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
    #[cfg_attr(unix, allow(dead_code))]
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        platform_transport_check(),
        temp_fifo_check(),
        frame_roundtrip_check(),
        compiled_features_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput { checks, overall };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("fifomsg doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<22} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn check(name: &str, status: CheckStatus, detail: impl Into<String>) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        status,
        detail: detail.into(),
    }
}

fn platform_transport_check() -> CheckResult {
    if cfg!(unix) {
        check("platform_transport", CheckStatus::Pass, "POSIX named pipes available")
    } else {
        check(
            "platform_transport",
            CheckStatus::Fail,
            "named pipe transport requires a Unix platform",
        )
    }
}

#[cfg(unix)]
fn scratch_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "fifomsg-doctor-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    ))
}

fn temp_fifo_check() -> CheckResult {
    #[cfg(unix)]
    {
        use fifomsg_transport::NamedFifo;

        let dir = scratch_dir();
        let _ = std::fs::create_dir_all(&dir);
        let fifo = NamedFifo::new(dir.join("doctor.fifo"));
        let result = fifo.ensure();
        let _ = fifo.remove();
        let _ = std::fs::remove_dir_all(&dir);

        match result {
            Ok(()) => check(
                "temp_fifo_create",
                CheckStatus::Pass,
                format!("mkfifo in {} succeeded", std::env::temp_dir().display()),
            ),
            Err(err) => check(
                "temp_fifo_create",
                CheckStatus::Fail,
                format!("mkfifo in temp dir failed: {err}"),
            ),
        }
    }

    #[cfg(not(unix))]
    {
        check(
            "temp_fifo_create",
            CheckStatus::Skip,
            "fifo creation not available on this platform",
        )
    }
}

fn frame_roundtrip_check() -> CheckResult {
    #[cfg(unix)]
    {
        let dir = scratch_dir();
        let _ = std::fs::create_dir_all(&dir);
        let result = frame_roundtrip(&dir.join("roundtrip.fifo"));
        let _ = std::fs::remove_dir_all(&dir);

        match result {
            Ok(()) => check(
                "frame_roundtrip",
                CheckStatus::Pass,
                "escaped frame written and reassembled",
            ),
            Err(detail) => check("frame_roundtrip", CheckStatus::Fail, detail),
        }
    }

    #[cfg(not(unix))]
    {
        check(
            "frame_roundtrip",
            CheckStatus::Skip,
            "fifo transport not available on this platform",
        )
    }
}

#[cfg(unix)]
fn frame_roundtrip(path: &std::path::Path) -> Result<(), String> {
    use std::time::{Duration, Instant};

    use fifomsg_frame::{FrameReader, FrameWriter};
    use fifomsg_transport::NamedFifo;

    const PROBE: &[u8] = b"doctor NAMEDPIPE:START: probe :END:";

    let mut writer = FrameWriter::new(NamedFifo::open(path).map_err(|e| e.to_string())?);
    let mut reader = FrameReader::new(NamedFifo::open(path).map_err(|e| e.to_string())?);
    writer
        .send(fifomsg_frame::DEFAULT_IDENTIFIER, PROBE)
        .map_err(|e| e.to_string())?;

    let deadline = Instant::now() + Duration::from_secs(1);
    loop {
        if let Some(msg) = reader.next_frame() {
            return if msg.content.as_ref() == PROBE {
                Ok(())
            } else {
                Err("reassembled payload differs from probe".to_string())
            };
        }
        if Instant::now() >= deadline {
            return Err("no frame read back within 1s".to_string());
        }
        reader
            .fill_timeout(Duration::from_millis(50))
            .map_err(|e| e.to_string())?;
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = vec!["cli"];
    if cfg!(feature = "async") {
        features.push("async");
    }

    check("compiled_features", CheckStatus::Info, features.join(", "))
}
