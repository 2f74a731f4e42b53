use anyhow::{Context, Result};

use crate::logging::LogLevel;

/// Number of values seeded into the first segment
pub const BUFFER_LENGTH: u32 = 5;

/// Seed segment plus the two segments the testbench derives from it
pub const SEGMENT_COUNT: usize = 3;

/// Slots in the buffer table; only identifier 0 is used
pub const TABLE_SLOTS: usize = 1;

/// How the accessors treat identifiers and offsets they cannot honour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundsPolicy {
    /// Reject the access, log it, and return a defined value
    Checked,
    /// Trust the simulator to stay inside the buffer
    Unchecked,
}

/// Which VHPIDIRECT access style the reference testbench exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestbenchMode {
    /// Byte-wise through read_char/write_char (`extfnc`)
    ExtFunction,
    /// Through the address from get_string_ptr (`extacc`)
    ExtAccess,
}

/// Host options; defaults are the compiled-in constants
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub length: u32,
    pub table_slots: usize,
    pub bounds: BoundsPolicy,
    pub testbench_mode: TestbenchMode,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            length: BUFFER_LENGTH,
            table_slots: TABLE_SLOTS,
            bounds: BoundsPolicy::Checked,
            testbench_mode: TestbenchMode::ExtFunction,
            log_level: LogLevel::Warning,
            log_file: None,
        }
    }
}

impl Options {
    /// Total bytes in the shared buffer
    pub fn buffer_size(&self) -> usize {
        self.length as usize * SEGMENT_COUNT
    }
}

/// Parse a log level given by name or number
pub fn parse_log_level(s: &str) -> Result<LogLevel> {
    match s.to_lowercase().as_str() {
        "nothing" | "off" | "none" => Ok(LogLevel::Nothing),
        "user" => Ok(LogLevel::User),
        "error" => Ok(LogLevel::Error),
        "warning" | "warn" => Ok(LogLevel::Warning),
        "info" => Ok(LogLevel::Info),
        "debug" => Ok(LogLevel::Debug),
        "all" | "trace" => Ok(LogLevel::All),
        other => {
            let level: i32 = other.parse().context("Invalid log level")?;
            if !(0..=6).contains(&level) {
                anyhow::bail!("Log level out of range (0 to 6)");
            }
            Ok(LogLevel::from_i32(level))
        }
    }
}

pub fn parse_bounds_policy(s: &str) -> Result<BoundsPolicy> {
    match s.to_lowercase().as_str() {
        "checked" => Ok(BoundsPolicy::Checked),
        "unchecked" => Ok(BoundsPolicy::Unchecked),
        _ => anyhow::bail!(
            "Invalid bounds policy: {}. Valid options: checked, unchecked",
            s
        ),
    }
}

pub fn parse_testbench_mode(s: &str) -> Result<TestbenchMode> {
    match s.to_lowercase().as_str() {
        "extfnc" | "function" => Ok(TestbenchMode::ExtFunction),
        "extacc" | "access" => Ok(TestbenchMode::ExtAccess),
        _ => anyhow::bail!("Invalid testbench mode: {}. Valid options: extfnc, extacc", s),
    }
}
