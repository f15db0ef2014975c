use leptos::prelude::*;

use taxmap_shared::DetailMessage;

use crate::app::{ActiveTab, BoundScale, DetailHtml, DetailInbox, DrawerOpen};
use crate::colors::hex_css;

/// Drawer tabs. `Legend` doubles as the idle state; once a detail message
/// lands the drawer shows `Details` and never transitions back on its own;
/// content persists until the next click or a page reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerTab {
    Legend,
    Details,
}

/// Apply one incoming message to the panel state. Messages whose kind is
/// not `propertyDetails` leave the state untouched (last-write-wins for the
/// ones that match).
pub fn apply_message(
    tab: DrawerTab,
    detail: Option<String>,
    msg: &DetailMessage,
) -> (DrawerTab, Option<String>) {
    if msg.is_property_details() {
        (DrawerTab::Details, Some(msg.content.clone()))
    } else {
        (tab, detail)
    }
}

/// Detail drawer: tab bar plus the legend and property-details panes.
#[component]
pub fn Drawer() -> impl IntoView {
    let ActiveTab(active_tab) = expect_context();
    let DetailInbox(inbox) = expect_context();
    let DetailHtml(detail_html) = expect_context();

    // The updater: consume each broadcast message exactly once.
    Effect::new(move || {
        let Some(msg) = inbox.get() else {
            return;
        };
        let (tab, html) = apply_message(
            active_tab.get_untracked(),
            detail_html.get_untracked(),
            &msg,
        );
        active_tab.set(tab);
        detail_html.set(html);
    });

    view! {
        <div style="width: 100%; min-width: 100%; height: 100%; background: #13161f; border-left: 1px solid #282c3e; display: flex; flex-direction: column; z-index: 10; box-shadow: -4px 0 20px rgba(0,0,0,0.4);">
            <div style="display: flex; border-bottom: 1px solid #282c3e;">
                <TabButton tab=DrawerTab::Legend label="Legend" />
                <TabButton tab=DrawerTab::Details label="Property Details" />
            </div>
            <div class="scrollbar-thin" style="flex: 1; overflow-y: auto; padding: 12px 14px;">
                {move || match active_tab.get() {
                    DrawerTab::Legend => view! { <LegendPanel /> }.into_any(),
                    DrawerTab::Details => view! { <DetailPanel /> }.into_any(),
                }}
            </div>
        </div>
    }
}

#[component]
fn TabButton(tab: DrawerTab, label: &'static str) -> impl IntoView {
    let ActiveTab(active_tab) = expect_context();

    view! {
        <button
            style="flex: 1; padding: 10px 8px; background: none; border: none; border-bottom: 2px solid transparent; cursor: pointer; font-family: 'JetBrains Mono', monospace; font-size: 0.72rem; letter-spacing: 0.04em; text-transform: uppercase; color: #5a5860; transition: color 0.15s, border-color 0.15s;"
            style:color=move || if active_tab.get() == tab { "#f5c542" } else { "#5a5860" }
            style:border-bottom-color=move || if active_tab.get() == tab { "#f5c542" } else { "transparent" }
            on:click=move |_| active_tab.set(tab)
        >
            {label}
        </button>
    }
}

/// The drawer pane the renderer's click handler writes into.
#[component]
fn DetailPanel() -> impl IntoView {
    let DetailHtml(detail_html) = expect_context();

    view! {
        {move || match detail_html.get() {
            Some(html) => view! {
                <div
                    id="property-details-drawer"
                    style="font-size: 0.8rem; color: #e2e0d8; font-family: 'JetBrains Mono', monospace; line-height: 1.7;"
                    inner_html=html
                />
            }
            .into_any(),
            None => view! {
                <div style="font-size: 0.75rem; color: #5a5860; font-family: 'Inter', system-ui, sans-serif; padding-top: 8px;">
                    "Click a parcel on the map to see its details."
                </div>
            }
            .into_any(),
        }}
    }
}

/// Color-scale legend for the current dataset.
#[component]
fn LegendPanel() -> impl IntoView {
    let BoundScale(scale) = expect_context();

    view! {
        <div style="font-family: 'JetBrains Mono', monospace;">
            <div style="font-size: 0.68rem; color: #9a9590; text-transform: uppercase; letter-spacing: 0.06em; margin-bottom: 8px;">
                "Effective tax rate"
            </div>
            {move || {
                let Some(scale) = scale.get() else {
                    return view! {
                        <div style="font-size: 0.72rem; color: #5a5860;">"Waiting for data\u{2026}"</div>
                    }
                    .into_any();
                };
                let entries = scale.legend();
                view! {
                    <div style="display: flex; flex-direction: column; gap: 4px;">
                        {entries
                            .into_iter()
                            .map(|(label, (r, g, b))| view! {
                                <div style="display: flex; align-items: center; gap: 8px;">
                                    <span style=format!(
                                        "width: 12px; height: 12px; border-radius: 3px; border: 1px solid #282c3e; background: {};",
                                        hex_css(r, g, b)
                                    ) />
                                    <span style="font-size: 0.72rem; color: #e2e0d8;">{label}</span>
                                </div>
                            })
                            .collect::<Vec<_>>()}
                        <div style="display: flex; align-items: center; gap: 8px; margin-top: 6px; padding-top: 6px; border-top: 1px solid rgba(40,44,62,0.5);">
                            <span style="width: 12px; height: 12px; border-radius: 3px; border: 1px solid #282c3e; background: #676767;" />
                            <span style="font-size: 0.72rem; color: #9a9590;">"no ratio data"</span>
                        </div>
                    </div>
                }
                .into_any()
            }}
        </div>
    }
}

/// Toggle button attached to the drawer's left edge.
#[component]
pub fn DrawerToggle() -> impl IntoView {
    let DrawerOpen(drawer_open) = expect_context();

    view! {
        <button
            title=move || if drawer_open.get() { "Hide panel" } else { "Show panel" }
            style="position: absolute; top: 16px; left: -44px; z-index: 11; width: 32px; height: 32px; background: #13161f; border: 1px solid #282c3e; border-radius: 6px; cursor: pointer; display: flex; align-items: center; justify-content: center; color: #5a5860; font-family: 'JetBrains Mono', monospace; font-size: 1.1rem; line-height: 1;"
            on:click=move |_| drawer_open.update(|v| *v = !*v)
        >
            {move || if drawer_open.get() { "\u{00BB}" } else { "\u{00AB}" }}
        </button>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(content: &str) -> DetailMessage {
        DetailMessage::property_details(content.to_string())
    }

    #[test]
    fn first_message_moves_idle_to_showing_detail() {
        let (tab, html) = apply_message(DrawerTab::Legend, None, &details("<p>one</p>"));
        assert_eq!(tab, DrawerTab::Details);
        assert_eq!(html.as_deref(), Some("<p>one</p>"));
    }

    #[test]
    fn second_message_overwrites_the_first() {
        let (tab, html) = apply_message(DrawerTab::Legend, None, &details("<p>one</p>"));
        let (tab, html) = apply_message(tab, html, &details("<p>two</p>"));
        assert_eq!(tab, DrawerTab::Details);
        assert_eq!(html.as_deref(), Some("<p>two</p>"));
    }

    #[test]
    fn foreign_message_kinds_are_ignored() {
        let foreign = DetailMessage {
            kind: "somethingElse".into(),
            content: "<p>nope</p>".into(),
        };
        let (tab, html) = apply_message(DrawerTab::Legend, None, &foreign);
        assert_eq!(tab, DrawerTab::Legend);
        assert_eq!(html, None);

        // And an already-showing panel keeps its content.
        let (tab, html) = apply_message(DrawerTab::Details, Some("<p>kept</p>".into()), &foreign);
        assert_eq!(tab, DrawerTab::Details);
        assert_eq!(html.as_deref(), Some("<p>kept</p>"));
    }

    #[test]
    fn no_transition_back_to_idle_is_defined() {
        let (tab, html) = apply_message(DrawerTab::Details, Some("<p>kept</p>".into()), &details("<p>next</p>"));
        assert_eq!(tab, DrawerTab::Details);
        assert!(html.is_some());
    }
}
