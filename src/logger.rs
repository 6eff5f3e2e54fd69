//! Session logger: verbosity switch and HTTP request/response tracing.
//!
//! Traces go to stderr or to a file named by `CF_TRACE`. Credentials are
//! masked before anything is written.

use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

use chrono::Utc;
use parking_lot::Mutex;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::is_truthy;
use crate::error::{Error, Result};

/// Replacement text for masked secrets
pub const PRIVATE_DATA_PLACEHOLDER: &str = "[PRIVATE DATA HIDDEN]";

enum TraceSink {
    Disabled,
    Stderr,
    File(Mutex<File>),
}

pub struct Logger {
    debug: bool,
    trace: TraceSink,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("debug", &self.debug)
            .field("tracing", &self.is_tracing())
            .finish()
    }
}

impl Logger {
    /// Create a logger.
    ///
    /// `trace` follows `CF_TRACE` semantics: empty, `false` or `0` disables
    /// tracing, `true` or `1` traces to stderr, anything else is a file path.
    pub fn new(debug: bool, trace: Option<&str>) -> Result<Self> {
        let trace = match trace.map(str::trim) {
            None | Some("") => TraceSink::Disabled,
            Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => TraceSink::Disabled,
            Some(v) if is_truthy(v) => TraceSink::Stderr,
            Some(path) => TraceSink::File(Mutex::new(open_trace_file(Path::new(path))?)),
        };

        Ok(Self { debug, trace })
    }

    /// Logger with verbosity and tracing both off.
    pub fn disabled() -> Self {
        Self {
            debug: false,
            trace: TraceSink::Disabled,
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn is_tracing(&self) -> bool {
        !matches!(self.trace, TraceSink::Disabled)
    }

    /// Record a session progress step; promoted to `info` in debug mode.
    pub fn step(&self, message: impl Display) {
        if self.debug {
            info!("{}", message);
        } else {
            debug!("{}", message);
        }
    }

    pub fn trace_request(&self, method: &str, url: &str, body: Option<&[u8]>) {
        debug!("=== API Request ===");
        debug!("{} {}", method, url);

        if !self.is_tracing() {
            return;
        }

        let mut block = format!(
            "REQUEST: [{}]\n{} {}\nAuthorization: {}\n",
            Utc::now().to_rfc3339(),
            method,
            url,
            PRIVATE_DATA_PLACEHOLDER
        );
        if let Some(body) = body {
            block.push('\n');
            block.push_str(&sanitize(&String::from_utf8_lossy(body)));
            block.push('\n');
        }
        self.write(&block);
    }

    pub fn trace_response(&self, url: &str, status: u16, body: &str) {
        debug!("=== API Response ===");
        debug!("Status: {} ({})", status, url);

        if !self.is_tracing() {
            return;
        }

        let block = format!(
            "RESPONSE: [{}]\nHTTP {}\n\n{}\n",
            Utc::now().to_rfc3339(),
            status,
            sanitize(body)
        );
        self.write(&block);
    }

    fn write(&self, block: &str) {
        match &self.trace {
            TraceSink::Disabled => {}
            TraceSink::Stderr => eprintln!("{}", block),
            TraceSink::File(file) => {
                let mut file = file.lock();
                if let Err(e) = writeln!(file, "{}", block) {
                    warn!("Failed to write trace output: {}", e);
                }
            }
        }
    }
}

fn open_trace_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            Error::Configuration(format!(
                "cannot open trace file {}: {}",
                path.display(),
                e
            ))
        })
}

fn secret_regexes() -> Option<&'static (Regex, Regex)> {
    static RE: OnceLock<std::result::Result<(Regex, Regex), regex::Error>> = OnceLock::new();
    RE.get_or_init(|| {
        let json = Regex::new(r#""(access_token|refresh_token|password|client_secret)"\s*:\s*"[^"]*""#)?;
        let form = Regex::new(r"(^|&)(access_token|refresh_token|password|client_secret)=[^&]*")?;
        Ok((json, form))
    })
    .as_ref()
    .ok()
}

/// Mask credential values in JSON or form-encoded bodies.
///
/// If the patterns are unavailable the whole body is masked.
pub fn sanitize(body: &str) -> String {
    let Some((json, form)) = secret_regexes() else {
        return PRIVATE_DATA_PLACEHOLDER.to_string();
    };
    let masked = json.replace_all(body, |caps: &regex::Captures| {
        format!("\"{}\":\"{}\"", &caps[1], PRIVATE_DATA_PLACEHOLDER)
    });
    form.replace_all(&masked, |caps: &regex::Captures| {
        format!("{}{}={}", &caps[1], &caps[2], PRIVATE_DATA_PLACEHOLDER)
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_json() {
        let body = r#"{"access_token":"abc","token_type":"bearer","refresh_token": "def"}"#;
        let out = sanitize(body);
        assert!(!out.contains("abc"));
        assert!(!out.contains("def"));
        assert!(out.contains("\"token_type\":\"bearer\""));
        assert!(out.contains(PRIVATE_DATA_PLACEHOLDER));
    }

    #[test]
    fn test_sanitize_form() {
        let body = "grant_type=password&username=admin&password=s3cret&scope=";
        let out = sanitize(body);
        assert_eq!(
            out,
            format!(
                "grant_type=password&username=admin&password={}&scope=",
                PRIVATE_DATA_PLACEHOLDER
            )
        );
    }

    #[test]
    fn test_debug_format() {
        let logger = Logger::new(true, None).unwrap();
        assert_eq!(
            format!("{:?}", logger),
            "Logger { debug: true, tracing: false }"
        );
    }

    #[test]
    fn test_trace_modes() {
        assert!(!Logger::new(false, None).unwrap().is_tracing());
        assert!(!Logger::new(false, Some("false")).unwrap().is_tracing());
        assert!(Logger::new(false, Some("true")).unwrap().is_tracing());
    }

    #[test]
    fn test_trace_to_file() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("trace.log");
        let logger = Logger::new(true, Some(path.to_str().unwrap())).unwrap();
        assert!(logger.is_debug());

        logger.trace_request(
            "POST",
            "https://login.example.com/oauth/token",
            Some(b"grant_type=password&username=u&password=hunter2"),
        );
        logger.trace_response("https://login.example.com/oauth/token", 200, r#"{"access_token":"tok"}"#);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("REQUEST:"));
        assert!(written.contains("RESPONSE:"));
        assert!(written.contains("POST https://login.example.com/oauth/token"));
        assert!(!written.contains("hunter2"));
        assert!(!written.contains("\"tok\""));
    }

    #[test]
    fn test_unopenable_trace_file_is_config_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("missing-dir").join("trace.log");
        let err = Logger::new(false, Some(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
