use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Logger struct for handling structured logging
pub struct Logger {
    request_id: String,
}

impl Logger {
    /// Create a new Logger instance
    ///
    /// # Arguments
    ///
    /// * `request_id` - A unique identifier for the current request
    pub fn new(request_id: String) -> Self {
        Self { request_id }
    }

    /// Log an info message
    pub fn info(&self, message: &str, data: Option<Value>) {
        self.log("INFO", message, data);
    }

    /// Log a warning message
    pub fn warn(&self, message: &str, data: Option<Value>) {
        self.log("WARN", message, data);
    }

    /// Log an error message
    pub fn error(&self, message: &str, data: Option<Value>) {
        self.log("ERROR", message, data);
    }

    /// Builds the JSON record for one log line.
    pub(crate) fn record(&self, level: &str, message: &str, data: Option<Value>) -> Value {
        json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "request_id": self.request_id,
            "message": message,
            "data": data
        })
    }

    fn log(&self, level: &str, message: &str, data: Option<Value>) {
        emit(level, &self.record(level, message, data).to_string());
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        fn emit(level: &str, line: &str) {
            match level {
                "WARN" => worker::console_warn!("{}", line),
                "ERROR" => worker::console_error!("{}", line),
                _ => worker::console_log!("{}", line),
            }
        }
    } else {
        fn emit(_level: &str, line: &str) {
            eprintln!("{}", line);
        }
    }
}

/// Short SHA-256 fingerprint used in place of secrets such as session URLs.
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(&digest[..6])
}

/// Macro to create a JSON object for additional log data
///
/// Usage: log_data!("key1" => "value1", "key2" => 42)
#[macro_export]
macro_rules! log_data {
    ($($key:expr => $value:expr),*) => {
        Some(serde_json::json!({ $($key: $value),* }))
    };
}
