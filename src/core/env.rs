//! Environment settings for operations and pipelines

use serde::{Deserialize, Serialize};

/// Description used when a step or pipeline is given none
pub const DEFAULT_DESCRIPTION: &str = "No Description";

/// Settings bound to a single operation invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvSettings {
    /// Report the exit code of a failed child process instead of 1
    #[serde(default)]
    pub use_shell: bool,

    /// Log the formatted failure message as soon as it happens
    #[serde(default)]
    pub use_debug: bool,

    /// Forward the input payload itself instead of the return value
    #[serde(default)]
    pub use_loopback: bool,

    /// Human-readable label, embedded in failure messages
    #[serde(default = "default_description")]
    pub description: String,
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self {
            use_shell: false,
            use_debug: false,
            use_loopback: false,
            description: default_description(),
        }
    }
}

impl EnvSettings {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: normalize_description(description.into()),
            ..Self::default()
        }
    }

    pub fn with_shell(mut self, use_shell: bool) -> Self {
        self.use_shell = use_shell;
        self
    }

    pub fn with_debug(mut self, use_debug: bool) -> Self {
        self.use_debug = use_debug;
        self
    }

    pub fn with_loopback(mut self, use_loopback: bool) -> Self {
        self.use_loopback = use_loopback;
        self
    }
}

/// Pipeline-level settings, fixed once the pipeline is constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineEnv {
    #[serde(default)]
    pub use_shell: bool,

    /// Collect a trace of every run
    #[serde(default)]
    pub use_debug: bool,

    /// Also collect the traces of nested pipelines (implies `use_debug`)
    #[serde(default)]
    pub use_nesting_debug: bool,

    #[serde(default = "default_description")]
    pub description: String,
}

impl Default for PipelineEnv {
    fn default() -> Self {
        Self {
            use_shell: false,
            use_debug: false,
            use_nesting_debug: false,
            description: default_description(),
        }
    }
}

impl PipelineEnv {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: normalize_description(description.into()),
            ..Self::default()
        }
    }

    pub fn with_shell(mut self, use_shell: bool) -> Self {
        self.use_shell = use_shell;
        self
    }

    pub fn with_debug(mut self, use_debug: bool) -> Self {
        self.use_debug = use_debug;
        self
    }

    /// Turning nesting debug on turns debug on as well
    pub fn with_nesting_debug(mut self, use_nesting_debug: bool) -> Self {
        self.use_nesting_debug = use_nesting_debug;
        if use_nesting_debug {
            self.use_debug = true;
        }
        self
    }

    /// Apply the implication rules and the description placeholder
    pub(crate) fn normalized(mut self) -> Self {
        if self.use_nesting_debug {
            self.use_debug = true;
        }
        self.description = normalize_description(self.description);
        self
    }

    /// Settings for a step of this pipeline
    pub fn step_settings(&self, description: &str, overrides: &EnvOverrides) -> EnvSettings {
        EnvSettings {
            use_shell: overrides.use_shell.unwrap_or(self.use_shell),
            use_debug: overrides.use_debug.unwrap_or(self.use_debug),
            use_loopback: overrides.use_loopback.unwrap_or(false),
            description: normalize_description(description.to_string()),
        }
    }
}

/// Per-step overrides of the pipeline environment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_shell: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_debug: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_loopback: Option<bool>,
}

impl EnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shell(mut self, use_shell: bool) -> Self {
        self.use_shell = Some(use_shell);
        self
    }

    pub fn debug(mut self, use_debug: bool) -> Self {
        self.use_debug = Some(use_debug);
        self
    }

    pub fn loopback(mut self, use_loopback: bool) -> Self {
        self.use_loopback = Some(use_loopback);
        self
    }
}

fn default_description() -> String {
    DEFAULT_DESCRIPTION.to_string()
}

fn normalize_description(description: String) -> String {
    if description.trim().is_empty() {
        default_description()
    } else {
        description
    }
}
