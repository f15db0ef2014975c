use std::cell::RefCell;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{MediaQueryList, MediaQueryListEvent};

const LIGHT_ICON: &str = "/static/favicon-light.png";
const DARK_ICON: &str = "/static/favicon-dark.png";
const COLOR_SCHEME_QUERY: &str = "(prefers-color-scheme: dark)";

struct SchemeBinding {
    mql: MediaQueryList,
    _handler: Closure<dyn Fn(MediaQueryListEvent)>,
}

thread_local! {
    static SCHEME_BINDING: RefCell<Option<SchemeBinding>> = const { RefCell::new(None) };
}

fn apply(dark: bool) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return;
    };
    // No favicon link in the document is fine; nothing to swap.
    let Some(link) = document
        .get_element_by_id("favicon")
        .and_then(|el| el.dyn_into::<web_sys::HtmlLinkElement>().ok())
    else {
        return;
    };
    link.set_href(if dark { DARK_ICON } else { LIGHT_ICON });
}

/// Match the favicon to the system color scheme: once now, and again on
/// every scheme change. Stateless; nothing is persisted.
pub fn install() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Ok(Some(mql)) = window.match_media(COLOR_SCHEME_QUERY) else {
        return;
    };

    apply(mql.matches());

    SCHEME_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old.mql.remove_event_listener_with_callback(
                "change",
                old._handler.as_ref().unchecked_ref(),
            );
        }
    });

    let handler = Closure::<dyn Fn(MediaQueryListEvent)>::new(move |e: MediaQueryListEvent| {
        apply(e.matches());
    });

    if mql
        .add_event_listener_with_callback("change", handler.as_ref().unchecked_ref())
        .is_ok()
    {
        SCHEME_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(SchemeBinding {
                mql,
                _handler: handler,
            });
        });
    }
}
