//! Compile-time WiFi credentials.
//!
//! The build script loads them from a `.env` file so credentials stay
//! out of source control.

/// Network SSID; empty when unset at build time.
pub const WIFI_SSID: &str = match option_env!("ATMO_WIFI_SSID") {
    Some(ssid) => ssid,
    None => "",
};

/// Network passphrase; empty when unset at build time.
pub const WIFI_PASSWORD: &str = match option_env!("ATMO_WIFI_PASSWORD") {
    Some(password) => password,
    None => "",
};
