//! Pricing Page

use std::rc::Rc;

use leptos::prelude::*;
use leptos_router::hooks::use_query_map;

use entitlement_client::{ApiConfig, BillingApi};
use entitlement_core::{
    CheckoutLauncher, CheckoutReturn, EntitlementError, EntitlementReconciler, EntitlementState,
    LauncherConfig, ReconcileConfig, Trigger,
};

use crate::browser::{BrowserSession, TimeoutDelay, ToastNotifier, WindowNavigator};
use crate::components::Toast;

type PageReconciler = EntitlementReconciler<BrowserSession, Rc<BillingApi>, TimeoutDelay>;
type PageLauncher = CheckoutLauncher<BrowserSession, Rc<BillingApi>, WindowNavigator>;

/// Billing API base, baked in at build time
fn api_config() -> ApiConfig {
    ApiConfig::new(option_env!("ENTITLEMENT_API_URL").unwrap_or("http://localhost:8000"))
}

#[component]
pub fn PricingPage() -> impl IntoView {
    let (plan, set_plan) = signal(EntitlementState::Idle);
    let (toast, set_toast) = signal(None::<String>);
    let (error, set_error) = signal(None::<String>);
    let (launching, set_launching) = signal(false);

    let wiring = BillingApi::from_config(&api_config()).and_then(|api| {
        let api = Rc::new(api);
        let reconciler = EntitlementReconciler::new(
            BrowserSession,
            Rc::clone(&api),
            TimeoutDelay,
            ReconcileConfig::default(),
        )?
        .with_notifier(ToastNotifier { toast: set_toast });
        let launcher =
            CheckoutLauncher::new(BrowserSession, api, WindowNavigator, LauncherConfig::default());
        Ok((Rc::new(reconciler), Rc::new(launcher)))
    });

    let (reconciler, launcher): (Rc<PageReconciler>, Rc<PageLauncher>) = match wiring {
        Ok(pair) => pair,
        Err(e) => {
            return view! { <div class="pricing error">{e.user_message()}</div> }.into_any();
        }
    };

    reconciler.subscribe(move |state| set_plan.set(state));

    let reconciler = StoredValue::new_local(reconciler);
    let launcher = StoredValue::new_local(launcher);

    // Mount trigger
    {
        let r = reconciler.get_value();
        leptos::task::spawn_local(async move {
            let _ = r.abortable(r.on_mount()).await;
        });
    }

    // Redirect trigger. The query memo only changes on a real navigation, so
    // every run after the first opens a fresh latch; re-renders never re-run it.
    let query = use_query_map();
    Effect::new(move |previous: Option<()>| {
        let signal = query.with(|q| {
            CheckoutReturn::from_flags(q.get("success").as_deref(), q.get("canceled").as_deref())
        });
        let Some(r) = reconciler.try_get_value() else {
            return;
        };
        if previous.is_some() {
            r.begin_navigation();
        }
        if signal.is_none() {
            return;
        }
        leptos::task::spawn_local(async move {
            let _ = r.abortable(r.on_return(signal)).await;
        });
    });

    on_cleanup(move || {
        reconciler.try_with_value(|r| r.teardown());
    });

    let retry = move |_| {
        let r = reconciler.get_value();
        leptos::task::spawn_local(async move {
            let _ = r.abortable(r.reconcile(Trigger::Manual)).await;
        });
    };

    let upgrade = move |_| {
        if launching.get_untracked() {
            return;
        }
        set_launching.set(true);
        set_error.set(None);

        let l = launcher.get_value();
        leptos::task::spawn_local(async move {
            match l.start_checkout().await {
                // Browser is leaving the page
                Ok(_) => {}
                Err(e @ EntitlementError::Unauthenticated) => {
                    set_toast.set(Some(e.user_message().into()));
                    if let Err(e) = l.redirect_to_login() {
                        set_error.set(Some(e.user_message().into()));
                    }
                }
                Err(e) => set_error.set(Some(e.user_message().into())),
            }
            set_launching.set(false);
        });
    };

    view! {
        <div class="pricing">
            <Toast message=toast dismiss=set_toast />

            <h1>"Pricing"</h1>

            <div class="plans">
                <div class="plan">
                    <h2>"Free"</h2>
                    <div class="price">"$0"<span>"/month"</span></div>
                    <ul>
                        <li>"5 queries/day"</li>
                        <li>"Query history"</li>
                    </ul>
                </div>

                <div class="plan featured">
                    <h2>"Pro"</h2>
                    <div class="price">"$9"<span>"/month"</span></div>
                    <ul>
                        <li>"Unlimited queries"</li>
                        <li>"Priority support"</li>
                    </ul>

                    {move || match plan.get() {
                        EntitlementState::Idle | EntitlementState::Loading => view! {
                            <p class="plan-status">"Checking plan…"</p>
                        }
                        .into_any(),
                        EntitlementState::Pro => view! {
                            <p class="plan-status pro">"You're on Pro ✅"</p>
                        }
                        .into_any(),
                        EntitlementState::Free => view! {
                            <button
                                class="btn btn-primary"
                                on:click=upgrade
                                disabled=move || launching.get()
                            >
                                {move || if launching.get() { "Redirecting…" } else { "Upgrade to Pro" }}
                            </button>
                        }
                        .into_any(),
                        EntitlementState::Inconclusive => view! {
                            <p class="plan-status">"Couldn't confirm your plan."</p>
                            <button class="btn" on:click=retry>"Check again"</button>
                        }
                        .into_any(),
                    }}

                    <Show when=move || error.with(Option::is_some)>
                        <p class="error">{move || error.get().unwrap_or_default()}</p>
                    </Show>
                </div>
            </div>
        </div>
    }
    .into_any()
}
