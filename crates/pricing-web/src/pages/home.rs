//! Home Page

use leptos::prelude::*;

#[component]
pub fn HomePage() -> impl IntoView {
    view! {
        <div class="home">
            <header class="hero">
                <h1>"plan-sync"</h1>
                <p class="tagline">"Upgrade once, see it everywhere"</p>
                <div class="cta">
                    <a href="/pricing" class="btn btn-primary">"View Plans"</a>
                    <a href="/login" class="btn">"Sign In"</a>
                </div>
            </header>

            <section class="features">
                <div class="feature">
                    <h3>"💳 Hosted checkout"</h3>
                    <p>"Payment details never touch this app."</p>
                </div>
                <div class="feature">
                    <h3>"🔁 Webhook aware"</h3>
                    <p>"Your plan updates as soon as the payment is confirmed."</p>
                </div>
            </section>
        </div>
    }
}
