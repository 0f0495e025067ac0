//! Forwards WiFi credentials from a `.env` file (or the ambient
//! environment) into rustc's env so `option_env!` can pick them up.

fn main() {
    let _ = dotenvy::dotenv();
    for key in ["ATMO_WIFI_SSID", "ATMO_WIFI_PASSWORD"] {
        if let Ok(value) = std::env::var(key) {
            println!("cargo:rustc-env={key}={value}");
        }
        println!("cargo:rerun-if-env-changed={key}");
    }
    println!("cargo:rerun-if-changed=.env");
}
