//! Compiler-wide constants
//!
//! Single source of truth for literal keywords, reserved names, and defaults.

/// Keywords of the generated source language
pub mod literals {
    /// Rendering of the null sentinel
    pub const NULL: &str = "None";
    /// Rendering of boolean true
    pub const TRUE: &str = "True";
    /// Rendering of boolean false
    pub const FALSE: &str = "False";
    /// Prefix of a line comment
    pub const COMMENT: &str = "#";
}

/// Names with special meaning during synthesis
pub mod names {
    /// Parameter whose value is resolved against the root directory
    pub const FILEPATH_PARAMETER: &str = "filepath";
    /// Relative root prefixed onto file paths that lack one
    pub const DATASET_ROOT: &str = "dataset";
    /// Suffix of the temporary capture variable in structured-call mode
    pub const CAPTURE_SUFFIX: &str = "result";
    /// Store key holding the document record
    pub const DOCUMENT_KEY: &str = "__document__";
    /// Prefix of the store keys holding node records
    pub const NODE_KEY_PREFIX: &str = "node:";
}

/// Diagnostics emitted in place of generated code
pub mod diagnostics {
    /// The single artifact produced for a cyclic graph
    pub const CYCLE: &str = "# Error: cycle detected in pipeline graph; no code generated";
}

/// Default values for compiler configuration
pub mod defaults {
    /// Import boilerplate emitted once at the top of a document
    pub const HEADER: &[&str] = &["import pandas as pd"];
    /// Substring in execution output that marks a failed run
    pub const ERROR_MARKER: &str = "Traceback (most recent call last)";
    /// Timeout for remote schema library requests
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    /// Number of undo snapshots kept by a session
    pub const HISTORY_DEPTH: usize = 100;
    /// First ordinal handed out by a fresh document
    pub const FIRST_ORDINAL: u32 = 1;
    /// Type label used when a port or parameter declares none
    pub const TYPE_LABEL: &str = "any";
}

/// File names used for persistence
pub mod paths {
    /// Configuration file inside the config directory
    pub const CONFIG_FILE: &str = "pipeline-config.json";
}
