//! Ingestion options.
//!
//! Defaults match the EDC portal exports. Environment variables (optionally
//! from a `.env` file) override the defaults, CLI flags override both.
//!
//! | Variable        | Field       | Default       |
//! |-----------------|-------------|---------------|
//! | `EDC_DELIMITER` | `delimiter` | `;`           |
//! | `EDC_ENCODING`  | `encoding`  | auto-detected |
//! | `EDC_QUIET`     | `quiet`     | `false`       |
//! | `EDC_ALLOCATION_LAYOUT` | `layout` | `interleaved` |

use serde::{Deserialize, Serialize};

use crate::transform::allocation::AllocationLayout;

/// Field delimiter of the EDC exports.
pub const DEFAULT_DELIMITER: char = ';';

/// Options for reading and reshaping export files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestOptions {
    /// Field delimiter
    pub delimiter: char,

    /// Force an encoding instead of detecting it
    pub encoding: Option<String>,

    /// Do not echo pipeline logs to stderr.
    ///
    /// Applied once by the CLI; library calls never change the echo.
    pub quiet: bool,

    /// Slot layout of the allocation export
    #[serde(default)]
    pub layout: AllocationLayout,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            encoding: None,
            quiet: false,
            layout: AllocationLayout::default(),
        }
    }
}

impl IngestOptions {
    /// Defaults overridden by `EDC_*` environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(delimiter) = lookup("EDC_DELIMITER").and_then(|v| single_char(&v)) {
            options.delimiter = delimiter;
        }
        if let Some(encoding) = lookup("EDC_ENCODING").filter(|v| !v.trim().is_empty()) {
            options.encoding = Some(encoding.trim().to_string());
        }
        if let Some(quiet) = lookup("EDC_QUIET") {
            options.quiet = matches!(quiet.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(layout) = lookup("EDC_ALLOCATION_LAYOUT").and_then(|v| AllocationLayout::from_name(&v)) {
            options.layout = layout;
        }

        options
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_layout(mut self, layout: AllocationLayout) -> Self {
        self.layout = layout;
        self
    }
}

fn single_char(value: &str) -> Option<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}
