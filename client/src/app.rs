use leptos::prelude::*;
use wasm_bindgen::JsCast;

use std::cell::RefCell;

use taxmap_shared::{ColorScale, DetailMessage, MapSource};

use crate::canvas::MapCanvas;
use crate::colors::hex_css;
use crate::drawer::{Drawer, DrawerTab, DrawerToggle};
use crate::favicon;
use crate::loader::{self, LoadStatus};
use crate::parcel::ClientParcelMap;
use crate::viewport::Viewport;

pub(crate) const DRAWER_WIDTH: f64 = 320.0;

pub(crate) fn canvas_dimensions() -> (f64, f64) {
    let Some(window) = web_sys::window() else {
        return (1200.0, 800.0);
    };
    let w = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(1200.0);
    let h = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    (w, h)
}

struct KeydownBinding {
    window: web_sys::Window,
    _handler: wasm_bindgen::closure::Closure<dyn Fn(web_sys::KeyboardEvent)>,
}

thread_local! {
    static KEYDOWN_BINDING: RefCell<Option<KeydownBinding>> = const { RefCell::new(None) };
}

/// Newtype wrappers give same-shaped signals distinct types for Leptos
/// context (two bare `RwSignal<Option<String>>`s would overwrite each other).
#[derive(Clone, Copy)]
pub(crate) struct Hovered(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct Selected(pub RwSignal<Option<String>>);
#[derive(Clone, Copy)]
pub(crate) struct DrawerOpen(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct ShowGraticule(pub RwSignal<bool>);
#[derive(Clone, Copy)]
pub(crate) struct ActiveTab(pub RwSignal<DrawerTab>);
/// The detail-message channel from renderer to drawer.
#[derive(Clone, Copy)]
pub(crate) struct DetailInbox(pub RwSignal<Option<DetailMessage>>);
/// What the details pane currently shows.
#[derive(Clone, Copy)]
pub(crate) struct DetailHtml(pub RwSignal<Option<String>>);
/// Color scale bound to the loaded dataset (legend, tooltip).
#[derive(Clone, Copy)]
pub(crate) struct BoundScale(pub RwSignal<Option<ColorScale>>);
#[derive(Clone, Copy)]
pub(crate) struct Status(pub RwSignal<LoadStatus>);

use gloo_storage::Storage;

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct Settings {
    drawer_open: bool,
    show_graticule: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            drawer_open: false,
            show_graticule: true,
        }
    }
}

/// Root application component. Provides global reactive signals via context.
#[component]
pub fn App() -> impl IntoView {
    let source = StoredValue::new(MapSource::default());

    let parcels: RwSignal<ClientParcelMap> = RwSignal::new(Default::default());
    let viewport: RwSignal<Viewport> = RwSignal::new(Viewport::default());
    let hovered: RwSignal<Option<String>> = RwSignal::new(None);
    let selected: RwSignal<Option<String>> = RwSignal::new(None);
    let mouse_pos: RwSignal<(f64, f64)> = RwSignal::new((0.0, 0.0));
    let status: RwSignal<LoadStatus> = RwSignal::new(LoadStatus::Loading);
    let detail_inbox: RwSignal<Option<DetailMessage>> = RwSignal::new(None);
    let detail_html: RwSignal<Option<String>> = RwSignal::new(None);
    let active_tab: RwSignal<DrawerTab> = RwSignal::new(DrawerTab::Legend);
    let scale: RwSignal<Option<ColorScale>> = RwSignal::new(None);

    let saved: Settings = gloo_storage::LocalStorage::get("taxmap_settings").unwrap_or_default();
    let drawer_open: RwSignal<bool> = RwSignal::new(saved.drawer_open);
    let show_graticule: RwSignal<bool> = RwSignal::new(saved.show_graticule);

    provide_context(parcels);
    provide_context(viewport);
    provide_context(mouse_pos);
    provide_context(Hovered(hovered));
    provide_context(Selected(selected));
    provide_context(DrawerOpen(drawer_open));
    provide_context(ShowGraticule(show_graticule));
    provide_context(ActiveTab(active_tab));
    provide_context(DetailInbox(detail_inbox));
    provide_context(DetailHtml(detail_html));
    provide_context(BoundScale(scale));
    provide_context(Status(status));

    // Persist settings to localStorage on any change
    Effect::new(move || {
        let settings = Settings {
            drawer_open: drawer_open.get(),
            show_graticule: show_graticule.get(),
        };
        let _ = gloo_storage::LocalStorage::set("taxmap_settings", &settings);
    });

    // Favicon follows the system color scheme
    Effect::new(move || {
        favicon::install();
    });

    // Fetch the dataset once on mount
    Effect::new(move || {
        loader::load(source.get_value(), parcels, scale, status);
    });

    // Global keyboard shortcuts
    Effect::new(move || {
        use wasm_bindgen::prelude::*;

        let Some(window) = web_sys::window() else {
            return;
        };

        KEYDOWN_BINDING.with(|slot| {
            if let Some(old) = slot.borrow_mut().take() {
                let _ = old.window.remove_event_listener_with_callback(
                    "keydown",
                    old._handler.as_ref().unchecked_ref(),
                );
            }
        });

        let handler =
            Closure::<dyn Fn(web_sys::KeyboardEvent)>::new(move |e: web_sys::KeyboardEvent| {
                let key = e.key();
                let target_tag = e
                    .target()
                    .and_then(|t| t.dyn_into::<web_sys::HtmlElement>().ok())
                    .map(|el| el.tag_name())
                    .unwrap_or_default();
                if target_tag == "INPUT" || target_tag == "TEXTAREA" {
                    return;
                }

                match key.as_str() {
                    "Escape" => {
                        selected.set(None);
                        hovered.set(None);
                    }
                    "d" => {
                        drawer_open.update(|v| *v = !*v);
                    }
                    "g" => {
                        show_graticule.update(|v| *v = !*v);
                    }
                    "r" | "0" => {
                        let map = parcels.get_untracked();
                        if map.is_empty() {
                            return;
                        }
                        let (mut min_x, mut min_y, mut max_x, mut max_y) =
                            (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
                        for cp in map.values() {
                            min_x = min_x.min(cp.wx);
                            min_y = min_y.min(cp.wy);
                            max_x = max_x.max(cp.wx);
                            max_y = max_y.max(cp.wy);
                        }
                        let (cw, ch) = canvas_dimensions();
                        viewport.update(|vp| vp.fit_bounds(min_x, min_y, max_x, max_y, cw, ch));
                    }
                    "ArrowLeft" => {
                        e.prevent_default();
                        viewport.update(|vp| vp.pan(50.0, 0.0));
                    }
                    "ArrowRight" => {
                        e.prevent_default();
                        viewport.update(|vp| vp.pan(-50.0, 0.0));
                    }
                    "ArrowUp" => {
                        e.prevent_default();
                        viewport.update(|vp| vp.pan(0.0, 50.0));
                    }
                    "ArrowDown" => {
                        e.prevent_default();
                        viewport.update(|vp| vp.pan(0.0, -50.0));
                    }
                    "+" | "=" => {
                        e.prevent_default();
                        let (cw, ch) = canvas_dimensions();
                        viewport.update(|vp| vp.zoom_at(-120.0, cw / 2.0, ch / 2.0));
                    }
                    "-" => {
                        e.prevent_default();
                        let (cw, ch) = canvas_dimensions();
                        viewport.update(|vp| vp.zoom_at(120.0, cw / 2.0, ch / 2.0));
                    }
                    _ => {}
                }
            });

        if window
            .add_event_listener_with_callback("keydown", handler.as_ref().unchecked_ref())
            .is_ok()
        {
            KEYDOWN_BINDING.with(|slot| {
                *slot.borrow_mut() = Some(KeydownBinding {
                    window: window.clone(),
                    _handler: handler,
                });
            });
        }
    });

    view! {
        <div style="width: 100%; height: 100%; position: relative;">
            <div style="width: 100%; height: 100%; position: relative; overflow: hidden; background: #0c0e17;">
                <MapCanvas />
                <StatusBadge />
            </div>
            <div
                style=format!("position: absolute; top: 0; right: 0; bottom: 0; width: {DRAWER_WIDTH}px; transition: transform 0.2s ease;")
                style:transform=move || if drawer_open.get() { "translateX(0)" } else { "translateX(100%)" }
                style:pointer-events=move || if drawer_open.get() { "auto" } else { "none" }
            >
                <div style="pointer-events: auto;">
                    <DrawerToggle />
                </div>
                <Drawer />
            </div>
        </div>
        <Tooltip />
    }
}

/// Small corner badge for the load lifecycle. Failures stay up: the map is
/// empty for the rest of this page load and the console has the details.
#[component]
fn StatusBadge() -> impl IntoView {
    let Status(status) = expect_context();

    view! {
        {move || match status.get() {
            LoadStatus::Ready => ().into_any(),
            LoadStatus::Loading => view! {
                <div style="position: absolute; top: 14px; left: 14px; z-index: 5; padding: 5px 10px; background: #13161f; border: 1px solid #282c3e; border-radius: 6px; font-size: 0.7rem; color: #9a9590; font-family: 'JetBrains Mono', monospace;">
                    "Loading parcel data\u{2026}"
                </div>
            }
            .into_any(),
            LoadStatus::Failed => view! {
                <div style="position: absolute; top: 14px; left: 14px; z-index: 5; padding: 5px 10px; background: #13161f; border: 1px solid rgba(220,64,53,0.5); border-radius: 6px; font-size: 0.7rem; color: #dc4035; font-family: 'JetBrains Mono', monospace;">
                    "Parcel data failed to load"
                </div>
            }
            .into_any(),
        }}
    }
}

/// Tooltip that follows the cursor while hovering a marker.
#[component]
fn Tooltip() -> impl IntoView {
    let Hovered(hovered) = expect_context();
    let parcels: RwSignal<ClientParcelMap> = expect_context();
    let mouse_pos: RwSignal<(f64, f64)> = expect_context();

    let tooltip_info = Memo::new(move |_| {
        let ain = hovered.get()?;
        parcels.with(|map| {
            let cp = map.get(&ain)?;
            let ratio = cp
                .parcel
                .ratio
                .map(|r| format!("{:.2}%", r * 100.0))
                .unwrap_or_else(|| taxmap_shared::PLACEHOLDER.to_string());
            Some((ain.clone(), ratio, cp.color))
        })
    });

    view! {
        {move || {
            let Some((ain, ratio, (r, g, b))) = tooltip_info.get() else {
                return view! { <div style="display:none;" /> }.into_any();
            };
            let (x, y) = mouse_pos.get();
            view! {
                <div
                    style:left=format!("{}px", x + 16.0)
                    style:top=format!("{}px", y - 8.0)
                    style="position: fixed; pointer-events: none; z-index: 100; background: #161921; border: 1px solid #282c3e; border-radius: 6px; overflow: hidden; box-shadow: 0 4px 16px rgba(0,0,0,0.5); display: flex; flex-direction: row;"
                >
                    <div style=format!("width: 3px; flex-shrink: 0; background: {};", hex_css(r, g, b)) />
                    <div style="padding: 6px 10px;">
                        <div style="font-size: 0.72rem; color: #e2e0d8; font-family: 'JetBrains Mono', monospace;">
                            {ain}
                        </div>
                        <div style="font-size: 0.65rem; color: #9a9590; font-family: 'JetBrains Mono', monospace; margin-top: 2px;">
                            "rate " {ratio}
                        </div>
                    </div>
                </div>
            }
            .into_any()
        }}
    }
}
