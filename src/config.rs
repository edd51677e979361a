//! Server configuration record reader.
//!
//! Configuration is a `code` record inside a bank (`Config/<name>.txt`) made
//! of `key=value` lines. Values stay raw strings; numeric accessors parse on
//! demand. The record is read once at startup and never reloaded.

use std::collections::HashMap;

use crate::bank::Bank;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    values: HashMap<String, String>,
    /// Property names in record order, for consumers that walk the table.
    properties: Vec<String>,
}

impl ServerConfig {
    /// Reads `Config/<name>.txt` out of the given bank.
    pub fn load(bank: &Bank, name: &str) -> AppResult<Self> {
        let record = bank.get(&format!("Config/{name}.txt"))?;
        let mut values = HashMap::new();
        let mut properties = Vec::new();
        for line in record.lines() {
            // Lines without exactly one '=' are skipped, same as the bank
            // header scan.
            let pieces: Vec<&str> = line.split('=').collect();
            if pieces.len() == 2 {
                values.insert(pieces[0].to_string(), pieces[1].to_string());
                properties.push(pieces[0].to_string());
            }
        }
        Ok(Self { values, properties })
    }

    pub fn get(&self, name: &str) -> AppResult<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::format(format!("Property value {name} does not exist.")))
    }

    pub fn get_int(&self, name: &str) -> AppResult<u64> {
        let raw = self.get(name)?;
        raw.parse()
            .map_err(|_| AppError::format(format!("Property value {name} is not a number.")))
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Properties in record order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(move |key| (key.as_str(), self.values[key].as_str()))
    }

    // Typed accessors for the server's own properties.

    /// Name of the data bank the server operates on.
    pub fn db(&self) -> AppResult<&str> {
        self.get("db")
    }

    /// Shared secret required on every mutating request.
    pub fn passcode(&self) -> AppResult<&str> {
        self.get("passcode")
    }

    /// Autosave interval in minutes; zero disables the timer.
    pub fn autosave_minutes(&self) -> AppResult<u64> {
        self.get_int("timeout")
    }

    /// Default file served when no route matches.
    pub fn index(&self) -> AppResult<&str> {
        self.get("index")
    }

    /// TLS is on only for the literal value `on`.
    pub fn secure(&self) -> bool {
        self.values.get("secure").map(|v| v == "on").unwrap_or(false)
    }

    /// Name of the key/cert record pair, required in secure mode.
    pub fn certificate(&self) -> AppResult<&str> {
        self.get("certificate")
    }

    /// Connection ceiling, enforced in secure mode.
    pub fn max_connections(&self) -> AppResult<u64> {
        self.get_int("max-connections")
    }

    pub fn port(&self) -> AppResult<u16> {
        let port = self.get_int("port")?;
        u16::try_from(port).map_err(|_| AppError::format("Property value port is not a number."))
    }
}
