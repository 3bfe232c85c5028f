//! plan-sync Web Frontend
//!
//! Leptos-based WASM pricing page. Launches hosted checkout and reconciles
//! the paid-plan flag once the payment provider redirects back.

mod app;
mod browser;
mod components;
mod pages;

pub use app::App;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    leptos::mount::mount_to_body(App);
}
