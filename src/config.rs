//! Run configuration with environment variable support.
//!
//! Configuration is resolved once by the embedding harness and passed
//! explicitly into the lifecycle router at suite start; there is no global
//! configuration state.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WEB_WITNESS_ENV` | Environment preset (`test`, `preprod`, `prod`) | `test` |
//! | `WEB_WITNESS_BASE_URL` | Target base URL | preset's URL |
//! | `WEB_WITNESS_BROWSER` | Browser name | `chrome` |
//! | `WEB_WITNESS_HEADLESS` | Headless execution flag | `false` |
//! | `WEB_WITNESS_IMPLICIT_WAIT` | Implicit wait in seconds | `5` |
//! | `WEB_WITNESS_PAGE_LOAD_TIMEOUT` | Page load timeout in seconds | `60` |
//! | `WEB_WITNESS_RESULTS_DIR` | Results directory for artifacts | `./target/witness-results` |
//! | `WEB_WITNESS_REPORT_DIR` | Published report of the previous run | `./target/witness-report` |
//! | `WEB_WITNESS_VIDEO_FPS` | Screen recording frame rate | `15` |

use std::env;

// ============================================================================
// Default Values
// ============================================================================

/// Default browser name
pub const DEFAULT_BROWSER: &str = "chrome";

/// Default implicit wait (seconds)
pub const DEFAULT_IMPLICIT_WAIT: u64 = 5;

/// Default page load timeout (seconds)
pub const DEFAULT_PAGE_LOAD_TIMEOUT: u64 = 60;

/// Default results directory
pub const DEFAULT_RESULTS_DIR: &str = "./target/witness-results";

/// Default previous-report directory
pub const DEFAULT_REPORT_DIR: &str = "./target/witness-report";

/// Default video frame rate
pub const DEFAULT_VIDEO_FPS: u32 = 15;

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the environment preset
pub const ENV_ENVIRONMENT: &str = "WEB_WITNESS_ENV";

/// Environment variable for the target base URL
pub const ENV_BASE_URL: &str = "WEB_WITNESS_BASE_URL";

/// Environment variable for the browser name
pub const ENV_BROWSER: &str = "WEB_WITNESS_BROWSER";

/// Environment variable for the headless flag
pub const ENV_HEADLESS: &str = "WEB_WITNESS_HEADLESS";

/// Environment variable for the implicit wait
pub const ENV_IMPLICIT_WAIT: &str = "WEB_WITNESS_IMPLICIT_WAIT";

/// Environment variable for the page load timeout
pub const ENV_PAGE_LOAD_TIMEOUT: &str = "WEB_WITNESS_PAGE_LOAD_TIMEOUT";

/// Environment variable for the results directory
pub const ENV_RESULTS_DIR: &str = "WEB_WITNESS_RESULTS_DIR";

/// Environment variable for the previous-report directory
pub const ENV_REPORT_DIR: &str = "WEB_WITNESS_REPORT_DIR";

/// Environment variable for the video frame rate
pub const ENV_VIDEO_FPS: &str = "WEB_WITNESS_VIDEO_FPS";

/// Target environment preset, each with its own base URL default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Test environment (default)
    #[default]
    Test,

    /// Pre-production / staging
    PreProd,

    /// Production
    Prod,
}

impl Environment {
    /// Parse a preset name; unknown names fall back to `Test`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "prod" | "production" => Environment::Prod,
            "preprod" | "pre-prod" | "staging" => Environment::PreProd,
            _ => Environment::Test,
        }
    }

    /// Name written into the environment snapshot
    pub fn display_name(&self) -> &'static str {
        match self {
            Environment::Test => "TEST",
            Environment::PreProd => "PRE-PRODUCTION",
            Environment::Prod => "PRODUCTION",
        }
    }

    /// Default base URL for this preset
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Environment::Test => "https://test.example.com/",
            Environment::PreProd => "https://preprod.example.com/",
            Environment::Prod => "https://www.example.com/",
        }
    }
}

/// Target environment and browser settings
#[derive(Debug, Clone)]
pub struct TargetSettings {
    /// Which environment preset the run targets
    pub environment: Environment,

    /// Base URL the suite opens
    pub base_url: String,

    /// Browser name (chrome, firefox, edge)
    pub browser: String,

    /// Whether the browser runs headless (no display surface, so no
    /// video recording)
    pub headless: bool,

    /// Implicit element wait (seconds)
    pub implicit_wait_secs: u64,

    /// Page load timeout (seconds)
    pub page_load_timeout_secs: u64,
}

/// Artifact capture settings
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Results directory the artifact store writes into
    pub results_dir: String,

    /// Location of the previously published report (history source)
    pub report_dir: String,

    /// Screen recording frame rate
    pub video_fps: u32,
}

/// Resolved run configuration, passed into the router at suite start
#[derive(Debug, Clone)]
pub struct Config {
    /// Target environment and browser
    pub target: TargetSettings,

    /// Artifact capture settings
    pub capture: CaptureSettings,
}

impl Config {
    /// Create configuration from environment variables, falling back to
    /// defaults
    pub fn from_env() -> Self {
        Self {
            target: TargetSettings::from_env(),
            capture: CaptureSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            target: TargetSettings::defaults(),
            capture: CaptureSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl TargetSettings {
    /// Create target settings from environment variables
    pub fn from_env() -> Self {
        let environment = env::var(ENV_ENVIRONMENT)
            .map(|s| Environment::parse(&s))
            .unwrap_or_default();

        Self {
            environment,
            base_url: env::var(ENV_BASE_URL)
                .unwrap_or_else(|_| environment.default_base_url().to_string()),
            browser: env::var(ENV_BROWSER).unwrap_or_else(|_| DEFAULT_BROWSER.to_string()),
            headless: env::var(ENV_HEADLESS)
                .ok()
                .map(|s| parse_headless(&s))
                .unwrap_or(false),
            implicit_wait_secs: env::var(ENV_IMPLICIT_WAIT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_IMPLICIT_WAIT),
            page_load_timeout_secs: env::var(ENV_PAGE_LOAD_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PAGE_LOAD_TIMEOUT),
        }
    }

    /// Create target settings with defaults
    pub fn defaults() -> Self {
        Self {
            environment: Environment::Test,
            base_url: Environment::Test.default_base_url().to_string(),
            browser: DEFAULT_BROWSER.to_string(),
            headless: false,
            implicit_wait_secs: DEFAULT_IMPLICIT_WAIT,
            page_load_timeout_secs: DEFAULT_PAGE_LOAD_TIMEOUT,
        }
    }
}

impl CaptureSettings {
    /// Create capture settings from environment variables
    pub fn from_env() -> Self {
        Self {
            results_dir: env::var(ENV_RESULTS_DIR)
                .unwrap_or_else(|_| DEFAULT_RESULTS_DIR.to_string()),
            report_dir: env::var(ENV_REPORT_DIR)
                .unwrap_or_else(|_| DEFAULT_REPORT_DIR.to_string()),
            video_fps: env::var(ENV_VIDEO_FPS)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_VIDEO_FPS),
        }
    }

    /// Create capture settings with defaults
    pub fn defaults() -> Self {
        Self {
            results_dir: DEFAULT_RESULTS_DIR.to_string(),
            report_dir: DEFAULT_REPORT_DIR.to_string(),
            video_fps: DEFAULT_VIDEO_FPS,
        }
    }
}

/// Parse a headless flag value.
///
/// An unparseable value means headless detection failed; non-headless is the
/// safer default (attempt recording rather than silently skip it).
fn parse_headless(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes")
}
