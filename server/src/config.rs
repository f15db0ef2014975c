use std::path::PathBuf;

pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_PARCELS_PATH: &str = "data/tax_data.geojson";
pub const DEFAULT_CLIENT_DIST: &str = "client/dist";

pub fn server_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn parcels_path() -> PathBuf {
    std::env::var("TAXMAP_PARCELS_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PARCELS_PATH))
}

/// Optional: when unset the GeoJSON is served as-is, assuming the ratio was
/// computed upstream.
pub fn tax_roll_path() -> Option<PathBuf> {
    std::env::var("TAXMAP_TAX_ROLL_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}

pub fn client_dist() -> PathBuf {
    std::env::var("TAXMAP_CLIENT_DIST")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CLIENT_DIST))
}
