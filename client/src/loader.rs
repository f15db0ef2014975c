use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

use taxmap_shared::{ColorScale, FeatureCollection, MapSource};

use crate::parcel::{ClientParcelMap, from_collection};

/// Dataset load lifecycle. There is no retry: a failed load leaves the map
/// empty until the page reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    Failed,
}

async fn fetch_collection(path: &str) -> Result<FeatureCollection, String> {
    let resp = gloo_net::http::Request::get(path)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    resp.json::<FeatureCollection>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

/// Fetch, decode, and publish the parcel dataset. Any fetch or decode
/// failure is logged and terminal for this page load, with no partial
/// rendering, no retry.
pub fn load(
    source: MapSource,
    parcels: RwSignal<ClientParcelMap>,
    scale: RwSignal<Option<ColorScale>>,
    status: RwSignal<LoadStatus>,
) {
    status.set(LoadStatus::Loading);

    spawn_local(async move {
        match fetch_collection(&source.data_path).await {
            Ok(collection) => {
                let (map, bound_scale) = from_collection(&collection, &source);
                parcels.set(map);
                scale.set(Some(bound_scale));
                status.set(LoadStatus::Ready);
            }
            Err(e) => {
                web_sys::console::error_1(
                    &format!("Error fetching parcel data from {}: {e}", source.data_path).into(),
                );
                status.set(LoadStatus::Failed);
            }
        }
    });
}
