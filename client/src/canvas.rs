use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use taxmap_shared::{DetailMessage, detail_html};

use crate::app::{DetailInbox, DrawerOpen, Hovered, Selected, ShowGraticule, canvas_dimensions};
use crate::parcel::{ClientParcelMap, MARKER_RADIUS, MARKER_STROKE_WEIGHT};
use crate::render_loop::RenderScheduler;
use crate::spatial::SpatialIndex;
use crate::viewport::Viewport;

const BACKGROUND: &str = "#0c0e17";
const GRATICULE_CSS: &str = "rgba(255,255,255,0.06)";
const HOVER_RING_CSS: &str = "rgba(255,255,255,0.85)";
const SELECTED_RING_CSS: &str = "rgba(245,197,66,0.95)";
/// Extra screen pixels around a marker that still count as a hit.
const HIT_SLACK_PX: f64 = 3.0;
/// Pointer travel below this is a click, not a drag.
const CLICK_SLOP_PX: f64 = 5.0;

/// Canvas map renderer: one circle marker per parcel, pan/zoom viewport,
/// spatial hit-testing for hover and click.
#[component]
pub fn MapCanvas() -> impl IntoView {
    let parcels: RwSignal<ClientParcelMap> = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();
    let Hovered(hovered) = expect_context();
    let Selected(selected) = expect_context();
    let DetailInbox(detail_inbox) = expect_context();
    let DrawerOpen(drawer_open) = expect_context();
    let ShowGraticule(show_graticule) = expect_context();
    let mouse_pos: RwSignal<(f64, f64)> = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    // Track drag state
    let is_dragging = Rc::new(Cell::new(false));
    let drag_start_x = Rc::new(Cell::new(0.0f64));
    let drag_start_y = Rc::new(Cell::new(0.0f64));
    let last_x = Rc::new(Cell::new(0.0f64));
    let last_y = Rc::new(Cell::new(0.0f64));

    // Track pinch state
    let pinch_dist = Rc::new(Cell::new(0.0f64));

    // Spatial index for hover/click hit-testing
    let spatial: Rc<RefCell<SpatialIndex>> = Rc::new(RefCell::new(SpatialIndex::empty()));
    let spatial_for_move = spatial.clone();
    let spatial_for_click = spatial.clone();

    // Fit bounds once, on first data load
    let fitted = Rc::new(Cell::new(false));

    let scheduler = RenderScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;

        let Some(parent) = canvas.parent_element() else {
            return;
        };
        let css_w = parent.client_width() as f64;
        let css_h = parent.client_height() as f64;
        if css_w <= 0.0 || css_h <= 0.0 {
            return;
        }

        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0)
            .max(1.0);
        let px_w = (css_w * dpr) as u32;
        let px_h = (css_h * dpr) as u32;
        if canvas.width() != px_w {
            canvas.set_width(px_w);
        }
        if canvas.height() != px_h {
            canvas.set_height(px_h);
        }

        let Some(ctx) = canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
        else {
            return;
        };
        // Draw in CSS pixel coordinates regardless of DPR.
        ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();

        let vp = viewport.get_untracked();
        ctx.set_fill_style_str(BACKGROUND);
        ctx.fill_rect(0.0, 0.0, css_w, css_h);

        if show_graticule.get_untracked() {
            draw_graticule(&ctx, &vp, css_w, css_h);
        }

        let hovered_ain = hovered.get_untracked();
        let selected_ain = selected.get_untracked();

        parcels.with_untracked(|map| {
            for cp in map.values() {
                let (sx, sy) = vp.world_to_screen(cp.wx, cp.wy);
                if sx < -MARKER_RADIUS
                    || sy < -MARKER_RADIUS
                    || sx > css_w + MARKER_RADIUS
                    || sy > css_h + MARKER_RADIUS
                {
                    continue;
                }
                ctx.begin_path();
                ctx.arc(sx, sy, MARKER_RADIUS, 0.0, std::f64::consts::TAU)
                    .ok();
                ctx.set_fill_style_str(&cp.css.fill);
                ctx.fill();
                ctx.set_line_width(MARKER_STROKE_WEIGHT);
                ctx.set_stroke_style_str(&cp.css.stroke);
                ctx.stroke();
            }

            // Highlight rings on top of the marker field.
            for (ain, ring_css, ring_width, ring_grow) in [
                (&hovered_ain, HOVER_RING_CSS, 1.5, 3.0),
                (&selected_ain, SELECTED_RING_CSS, 2.0, 4.0),
            ] {
                let Some(ain) = ain.as_ref() else {
                    continue;
                };
                let Some(cp) = map.get(ain) else {
                    continue;
                };
                let (sx, sy) = vp.world_to_screen(cp.wx, cp.wy);
                ctx.begin_path();
                ctx.arc(sx, sy, MARKER_RADIUS + ring_grow, 0.0, std::f64::consts::TAU)
                    .ok();
                ctx.set_line_width(ring_width);
                ctx.set_stroke_style_str(ring_css);
                ctx.stroke();
            }
        });
    });

    // Rebuild the spatial index whenever the parcel map changes, and fit
    // the viewport to the dataset the first time data arrives.
    let sched_data = scheduler.clone();
    let spatial_data = spatial.clone();
    let fitted_data = fitted.clone();
    Effect::new(move || {
        parcels.with(|map| {
            *spatial_data.borrow_mut() = SpatialIndex::build(
                map.values().map(|cp| (cp.parcel.ain.as_str(), cp.wx, cp.wy)),
            );
            if !map.is_empty() && !fitted_data.get() {
                fitted_data.set(true);
                if let Some((min_x, min_y, max_x, max_y)) = spatial_data.borrow().world_bounds() {
                    let (cw, ch) = canvas_dimensions();
                    viewport.update(|vp| vp.fit_bounds(min_x, min_y, max_x, max_y, cw, ch));
                }
            }
        });
        sched_data.mark_dirty();
    });

    // Until data arrives, show the default city view.
    let sched_init = scheduler.clone();
    Effect::new(move || {
        let (cw, ch) = canvas_dimensions();
        viewport.update_untracked(|vp| vp.center_default(cw, ch));
        sched_init.mark_dirty();
    });

    // Repaint on viewport, highlight, or setting changes.
    let sched_vp = scheduler.clone();
    Effect::new(move || {
        viewport.track();
        hovered.track();
        selected.track();
        show_graticule.track();
        sched_vp.mark_dirty();
    });

    // --- Input handlers ---

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let delta = e.delta_y();
        let x = e.offset_x() as f64;
        let y = e.offset_y() as f64;
        viewport.update(|vp| vp.zoom_at(delta, x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        move |e: PointerEvent| {
            is_dragging.set(true);
            hovered.set(None);
            drag_start_x.set(e.client_x() as f64);
            drag_start_y.set(e.client_y() as f64);
            last_x.set(e.client_x() as f64);
            last_y.set(e.client_y() as f64);

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_x = last_x.clone();
        let last_y = last_y.clone();
        let spatial = spatial_for_move;
        move |e: PointerEvent| {
            if is_dragging.get() {
                let dx = e.client_x() as f64 - last_x.get();
                let dy = e.client_y() as f64 - last_y.get();
                last_x.set(e.client_x() as f64);
                last_y.set(e.client_y() as f64);
                viewport.update(|vp| vp.pan(dx, dy));
            } else {
                let local = canvas_local(canvas_ref, &e);
                let vp = viewport.get_untracked();
                let (wx, wy) = vp.screen_to_world(local.0, local.1);
                let tolerance = (MARKER_RADIUS + HIT_SLACK_PX) / vp.scale;
                let hit = spatial.borrow().find_nearest(wx, wy, tolerance);
                if hit != hovered.get_untracked() {
                    hovered.set(hit);
                }
                if hovered.get_untracked().is_some() {
                    mouse_pos.set((e.client_x() as f64, e.client_y() as f64));
                }
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    // Click: resolve the parcel under the cursor, select it, and broadcast
    // its formatted details to the drawer.
    let on_click = {
        let drag_start_x = drag_start_x.clone();
        let drag_start_y = drag_start_y.clone();
        let spatial = spatial_for_click;
        move |e: MouseEvent| {
            let dx = (e.client_x() as f64 - drag_start_x.get()).abs();
            let dy = (e.client_y() as f64 - drag_start_y.get()).abs();
            if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
                return;
            }

            let local = canvas_local(canvas_ref, &e);
            let vp = viewport.get_untracked();
            let (wx, wy) = vp.screen_to_world(local.0, local.1);
            let tolerance = (MARKER_RADIUS + HIT_SLACK_PX) / vp.scale;
            let hit = spatial.borrow().find_nearest(wx, wy, tolerance);

            let Some(ain) = hit else {
                if selected.get_untracked().is_some() {
                    selected.set(None);
                }
                return;
            };

            let content = parcels.with_untracked(|map| {
                map.get(&ain).map(|cp| detail_html(&cp.parcel))
            });
            selected.set(Some(ain));
            if let Some(content) = content {
                detail_inbox.set(Some(DetailMessage::property_details(content)));
                if !drawer_open.get_untracked() {
                    drawer_open.set(true);
                }
            }
        }
    };

    let on_pointer_leave = move |_: PointerEvent| {
        if hovered.get_untracked().is_some() {
            hovered.set(None);
        }
    };

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                pinch_dist.set((dx * dx + dy * dy).sqrt());
            }
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                let new_dist = (dx * dx + dy * dy).sqrt();
                let old_dist = pinch_dist.get();

                if old_dist > 0.0 {
                    let mid_x = (t0.client_x() + t1.client_x()) as f64 / 2.0;
                    let mid_y = (t0.client_y() + t1.client_y()) as f64 / 2.0;
                    let delta = -(new_dist - old_dist) * 2.0;
                    viewport.update(|vp| vp.zoom_at(delta, mid_x, mid_y));
                }

                pinch_dist.set(new_dist);
            }
        }
    };

    view! {
        <div
            style="position: relative; width: 100%; height: 100%; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
            on:touchstart=on_touch_start
            on:touchmove=on_touch_move
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />
        </div>
    }
}

/// Event position in canvas-local CSS pixels. `PointerEvent` derefs to
/// `MouseEvent`, so both handler kinds share this.
fn canvas_local(canvas_ref: NodeRef<leptos::html::Canvas>, e: &MouseEvent) -> (f64, f64) {
    canvas_ref
        .get_untracked()
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (
                e.client_x() as f64 - rect.left(),
                e.client_y() as f64 - rect.top(),
            )
        })
        .unwrap_or((e.offset_x() as f64, e.offset_y() as f64))
}

/// Faint lon/lat grid. Step picked so lines sit at least ~70px apart.
fn draw_graticule(ctx: &CanvasRenderingContext2d, vp: &Viewport, css_w: f64, css_h: f64) {
    const STEPS: &[f64] = &[
        5.0, 2.0, 1.0, 0.5, 0.2, 0.1, 0.05, 0.02, 0.01, 0.005, 0.002, 0.001,
    ];
    let step = STEPS
        .iter()
        .copied()
        .find(|s| s * vp.scale >= 70.0)
        .unwrap_or(*STEPS.last().unwrap_or(&0.001));

    let (min_wx, min_wy) = vp.screen_to_world(0.0, 0.0);
    let (max_wx, max_wy) = vp.screen_to_world(css_w, css_h);

    ctx.set_stroke_style_str(GRATICULE_CSS);
    ctx.set_line_width(1.0);
    ctx.begin_path();

    let mut wx = (min_wx / step).floor() * step;
    while wx <= max_wx {
        let (sx, _) = vp.world_to_screen(wx, 0.0);
        ctx.move_to(sx, 0.0);
        ctx.line_to(sx, css_h);
        wx += step;
    }
    let mut wy = (min_wy / step).floor() * step;
    while wy <= max_wy {
        let (_, sy) = vp.world_to_screen(0.0, wy);
        ctx.move_to(0.0, sy);
        ctx.line_to(css_w, sy);
        wy += step;
    }
    ctx.stroke();
}
