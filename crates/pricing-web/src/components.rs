//! UI Components

use leptos::prelude::*;

/// Transient banner; renders nothing while `message` is `None`
#[component]
pub fn Toast(message: ReadSignal<Option<String>>, dismiss: WriteSignal<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || message.with(Option::is_some)>
            <div class="toast" role="status" on:click=move |_| dismiss.set(None)>
                {move || message.get().unwrap_or_default()}
            </div>
        </Show>
    }
}
