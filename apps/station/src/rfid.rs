//! # RFID Monitor
//!
//! A serial reader prints one line per card: `RFID:<uid>`. The monitor
//! reads the device on its own thread and logs the card's owner in.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    RFID Monitor Loop                                    │
//! │                                                                         │
//! │  open /dev/ttyUSB0 @ 9600 ──► read line ──► "RFID:04A1B2" ──► login     │
//! │        ▲                       │   ▲                                    │
//! │        │                       │   └── read timeout: keep waiting       │
//! │        │                       ▼                                        │
//! │   sleep retry_secs ◄──── error / EOF                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The port is opened raw with a fixed read timeout. The loop never gives
//! up; a missing reader just logs every few seconds.

use std::io::{self, BufRead, BufReader, ErrorKind};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, error, info, warn};

use crate::config::RfidSettings;
use tagger_sync::{LoginOutcome, SessionTracker};

const LINE_PREFIX: &str = "RFID:";

/// Extracts the tag from a reader line, if it is one.
pub fn parse_rfid_line(line: &str) -> Option<&str> {
    let tag = line.trim().strip_prefix(LINE_PREFIX)?.trim();
    (!tag.is_empty()).then_some(tag)
}

/// Reads lines until EOF, calling `on_tag` for every tag line.
///
/// A read timeout is not an error: bytes received so far stay buffered and
/// the read is retried. Bytes that are not UTF-8 are replaced rather than
/// failing the read.
pub fn pump<R: BufRead>(mut reader: R, mut on_tag: impl FnMut(&str)) -> io::Result<()> {
    let mut buf = Vec::new();
    loop {
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => {
                if !buf.is_empty() {
                    dispatch_line(&buf, &mut on_tag);
                }
                return Ok(());
            }
            Ok(_) => {
                dispatch_line(&buf, &mut on_tag);
                buf.clear();
            }
            Err(e) if is_idle(&e) => continue,
            Err(e) => return Err(e),
        }
    }
}

fn dispatch_line(buf: &[u8], on_tag: &mut impl FnMut(&str)) {
    let line = String::from_utf8_lossy(buf);
    match parse_rfid_line(&line) {
        Some(tag) => on_tag(tag),
        None => debug!(line = %line.trim(), "Ignoring reader line"),
    }
}

/// Timeouts mean "no card presented yet".
fn is_idle(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

/// Starts the monitor thread.
///
/// `runtime` is the handle the session calls are driven on.
pub fn spawn_monitor(settings: RfidSettings, session: SessionTracker, runtime: Handle) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("tagger-rfid".to_string())
        .spawn(move || monitor_loop(settings, session, runtime))
}

fn monitor_loop(settings: RfidSettings, session: SessionTracker, runtime: Handle) {
    let retry = Duration::from_secs(settings.retry_secs.max(1));
    let read_timeout = Duration::from_millis(settings.read_timeout_ms.max(1));
    info!(device = %settings.device, baud = settings.baud_rate, "RFID monitor started");

    loop {
        let result = serialport::new(&settings.device, settings.baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(io::Error::from)
            .and_then(|port| {
                info!(device = %settings.device, "RFID reader opened");
                pump(BufReader::new(port), |tag| handle_tag(&session, &runtime, tag))
            });

        match result {
            Ok(()) => warn!(device = %settings.device, "RFID reader closed"),
            Err(e) => error!(device = %settings.device, error = %e, "RFID reader failed"),
        }
        thread::sleep(retry);
    }
}

fn handle_tag(session: &SessionTracker, runtime: &Handle, tag: &str) {
    match runtime.block_on(session.login_by_tag(tag)) {
        Ok(LoginOutcome::LoggedIn(user)) => info!(user_id = user.id, user = %user.name, "RFID login"),
        Ok(LoginOutcome::NotRecognized) => warn!(tag = %tag, "RFID tag not recognized"),
        Err(e) => error!(tag = %tag, error = %e, "RFID login failed"),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn test_parse_rfid_line() {
        assert_eq!(parse_rfid_line("RFID:04A1B2\r\n"), Some("04A1B2"));
        assert_eq!(parse_rfid_line("  RFID: 04A1B2 "), Some("04A1B2"));
        assert_eq!(parse_rfid_line("RFID:"), None);
        assert_eq!(parse_rfid_line("READY"), None);
        assert_eq!(parse_rfid_line(""), None);
    }

    #[test]
    fn test_pump_collects_tags() {
        let input = b"boot\nRFID:AAA\n\xff\xfe\nRFID:BBB\r\nRFID:\n".to_vec();
        let mut tags = Vec::new();

        pump(Cursor::new(input), |tag| tags.push(tag.to_string())).unwrap();

        assert_eq!(tags, vec!["AAA", "BBB"]);
    }

    /// Hands out one scripted chunk or error per read, like a serial port
    /// with a read timeout.
    struct ScriptedPort {
        script: Vec<io::Result<&'static [u8]>>,
    }

    impl Read for ScriptedPort {
        fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
            if self.script.is_empty() {
                return Ok(0);
            }
            let chunk = self.script.remove(0)?;
            out[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    fn chunk(bytes: &'static [u8]) -> io::Result<&'static [u8]> {
        Ok(bytes)
    }

    fn fail(kind: ErrorKind) -> io::Result<&'static [u8]> {
        Err(io::Error::from(kind))
    }

    #[test]
    fn test_pump_waits_through_read_timeouts() {
        let port = ScriptedPort {
            script: vec![
                fail(ErrorKind::TimedOut),
                chunk(b"RFI"),
                fail(ErrorKind::TimedOut),
                chunk(b"D:AAA\n"),
                fail(ErrorKind::WouldBlock),
                chunk(b"RFID:BBB\n"),
            ],
        };
        let mut tags = Vec::new();

        pump(BufReader::new(port), |tag| tags.push(tag.to_string())).unwrap();

        assert_eq!(tags, vec!["AAA", "BBB"]);
    }

    #[test]
    fn test_pump_stops_on_hard_error() {
        let port = ScriptedPort {
            script: vec![chunk(b"RFID:AAA\n"), fail(ErrorKind::BrokenPipe)],
        };
        let mut tags = Vec::new();

        let result = pump(BufReader::new(port), |tag| tags.push(tag.to_string()));

        assert_eq!(result.unwrap_err().kind(), ErrorKind::BrokenPipe);
        assert_eq!(tags, vec!["AAA"]);
    }

    #[test]
    fn test_pump_last_line_without_newline() {
        let mut tags = Vec::new();
        pump(Cursor::new(b"RFID:CCC".to_vec()), |tag| tags.push(tag.to_string())).unwrap();
        assert_eq!(tags, vec!["CCC"]);
    }
}
