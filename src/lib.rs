// ==================== Imports ====================
use wasm_bindgen::prelude::*;

#[macro_use]
pub mod browser;
pub mod engine;
pub mod game;
pub mod motion;
pub mod settings;
pub mod sound;

use engine::GameLoop;
use game::Showcase;
use settings::Settings;

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - reads settings (file, then `?stage=`)
/// - opens the window and loads the stage's media
/// - runs the loop until Escape or the page goes away
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();

    // loading is async (fetch, image decode, font load, audio decode), so the
    // whole program runs as one local task
    browser::spawn_local(async move {
        let settings = Settings::load().await;
        let game = Showcase::new(settings);
        if let Err(err) = GameLoop::start(game).await {
            error!("{:#}", err);
        }
    });

    Ok(())
}
