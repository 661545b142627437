pub mod cargo_env {
    pub const CARGO_PKG_NAME: &'static str = env!("CARGO_PKG_NAME");
}

pub mod common {
    /// Prefix of environment variables merged over the configuration file.
    pub const ENV_PREFIX: &'static str = "WARDEN";
    /// Suite name the outer runner reports when no suite file names one.
    pub const DEFAULT_SUITE_NAME: &'static str = "Default suite";
    pub const LATEST_VERSION: &'static str = "latest";
    pub const DESKTOP: &'static str = "desktop";
    pub const MOBILE: &'static str = "mobile";
}

/// Keys that suite parameters may use to override configuration values.
pub mod parameter {
    pub const HEALTH_CHECK_CLASS: &'static str = "health_check_class";
    pub const HEALTH_CHECK_METHODS: &'static str = "health_check_methods";
}

/// Keys naming files whose properties are merged over the loaded configuration,
/// in this order.
pub mod capabilities {
    pub const CUSTOM_CAPABILITIES: &'static str = "custom_capabilities";
    pub const EXTRA_CAPABILITIES: &'static str = "extra_capabilities";
    pub const OVERLAYS: [&'static str; 2] = [CUSTOM_CAPABILITIES, EXTRA_CAPABILITIES];
}
