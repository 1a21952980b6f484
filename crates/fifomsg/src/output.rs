use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    identifier: &'a str,
    payload_size: usize,
    payload: String,
    path: String,
    timestamp: String,
}

#[derive(Serialize)]
struct SendOutput<'a> {
    identifier: &'a str,
    messages: usize,
    bytes_written: usize,
    path: String,
}

pub fn print_message(identifier: &str, content: &[u8], path: &std::path::Path, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                identifier,
                payload_size: content.len(),
                payload: payload_preview(content),
                path: path.display().to_string(),
                timestamp: now_unix_seconds(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["IDENTIFIER", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    identifier.to_string(),
                    content.len().to_string(),
                    payload_preview(content),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "id={} size={} payload={}",
                identifier,
                content.len(),
                payload_preview(content)
            );
        }
        OutputFormat::Raw => {
            print_raw(content);
            print_raw(b"\n");
        }
    }
}

pub fn print_send_summary(
    identifier: &str,
    messages: usize,
    bytes_written: usize,
    path: &std::path::Path,
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = SendOutput {
                identifier,
                messages,
                bytes_written,
                path: path.display().to_string(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["IDENTIFIER", "MESSAGES", "BYTES", "PATH"])
                .add_row(vec![
                    identifier.to_string(),
                    messages.to_string(),
                    bytes_written.to_string(),
                    path.display().to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sent {messages} message(s) as {identifier} ({bytes_written} bytes) to {}",
                path.display()
            );
        }
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_payload_preview() {
        assert_eq!(payload_preview(b"text"), "text");
        assert_eq!(payload_preview(&[0xff, 0xfe, 0x00]), "<binary 3 bytes>");
    }

    #[test]
    fn message_output_serializes() {
        let out = MessageOutput {
            identifier: "NAMEDPIPE",
            payload_size: 3,
            payload: "abc".to_string(),
            path: "/tmp/x.fifo".to_string(),
            timestamp: "0".to_string(),
        };
        let json = serde_json::to_string(&out).expect("message output should serialize");
        assert!(json.contains("\"identifier\":\"NAMEDPIPE\""));
        assert!(json.contains("\"payload_size\":3"));
    }
}
