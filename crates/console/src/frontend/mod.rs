//! Leptos frontend of the console (wasm32 only).

pub mod app;
pub mod context;

use wasm_bindgen::prelude::*;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    leptos::mount_to_body(app::App);
}
