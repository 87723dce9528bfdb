//! # Trimode WASM Application
//!
//! Runs the trimode engine against a `<canvas>` element in the browser.
//!
//! ## Usage
//!
//! Build for WASM:
//! ```bash
//! wasm-pack build --target web trimode-app
//! ```
//!
//! Then import in JavaScript:
//! ```javascript
//! import init, { TriangleApp } from './pkg/trimode_app.js';
//!
//! await init();
//! const app = await TriangleApp.create('main-canvas');
//!
//! function frame() {
//!     app.frame();
//!     requestAnimationFrame(frame);
//! }
//! frame();
//!
//! toggleButton.onclick = () => app.toggleMode();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod canvas;
pub mod webgl;

use std::{cell::RefCell, rc::Rc};

use js_sys::Promise;
use trimode_renderer::{Engine, EngineConfig, EngineError};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

pub use canvas::{BrowserHost, CanvasSurface};
pub use webgl::WebGl2Context;

/// Initialize the WASM module.
#[wasm_bindgen(start)]
pub fn init_wasm() {
    console_error_panic_hook::set_once();
    tracing::info!("Trimode WASM initialized");
}

fn to_js(err: &EngineError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Holds the engine between calls. Empty while a rebuild is in flight.
type EngineSlot = Rc<RefCell<Option<Engine<BrowserHost>>>>;

fn take_engine(slot: &EngineSlot) -> Result<Engine<BrowserHost>, JsValue> {
    slot.take()
        .ok_or_else(|| JsValue::from_str("A backend switch is already in progress"))
}

/// The triangle application for WASM.
#[wasm_bindgen]
pub struct TriangleApp {
    engine: EngineSlot,
}

#[wasm_bindgen]
impl TriangleApp {
    /// Attach to the canvas with the given element ID and build the first
    /// backend.
    ///
    /// `config` is an optional JSON engine configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the canvas is not found, the config is malformed,
    /// or no backend can be built.
    #[allow(clippy::needless_pass_by_value)]
    pub async fn create(canvas_id: String, config: Option<String>) -> Result<TriangleApp, JsValue> {
        let config = match config {
            Some(json) => EngineConfig::from_json(&json)
                .map_err(|e| JsValue::from_str(&format!("Config parse error: {e}")))?,
            None => EngineConfig::default(),
        };
        let host = BrowserHost::new(&canvas_id).map_err(|e| JsValue::from_str(&e.to_string()))?;

        let mut engine = Engine::new(host, config);
        engine.init_engine().await.map_err(|e| to_js(&e))?;

        Ok(Self {
            engine: Rc::new(RefCell::new(Some(engine))),
        })
    }

    /// Run one frame. Call from `requestAnimationFrame`.
    ///
    /// Returns whether a frame was drawn.
    pub fn frame(&self) -> bool {
        self.engine
            .try_borrow_mut()
            .ok()
            .and_then(|mut slot| slot.as_mut().map(Engine::frame))
            .unwrap_or(false)
    }

    /// Switch to the next rendering mode. Resolves to the new mode's name.
    #[wasm_bindgen(js_name = toggleMode)]
    pub fn toggle_mode(&self) -> Promise {
        let slot = Rc::clone(&self.engine);
        future_to_promise(async move {
            let mut engine = take_engine(&slot)?;
            let result = engine.toggle_mode().await;
            slot.replace(Some(engine));
            result
                .map(|mode| JsValue::from_str(mode.as_str()))
                .map_err(|e| to_js(&e))
        })
    }

    /// Flip a backend option (`highPerformance`, `desynchronized`,
    /// `antialias`) and rebuild. Resolves to the option's new value.
    #[wasm_bindgen(js_name = toggleOption)]
    pub fn toggle_option(&self, name: String) -> Promise {
        let slot = Rc::clone(&self.engine);
        future_to_promise(async move {
            let mut engine = take_engine(&slot)?;
            let result = engine.toggle_option(&name).await;
            slot.replace(Some(engine));
            result.map(JsValue::from_bool).map_err(|e| to_js(&e))
        })
    }

    /// Whether the accelerated path is unsupported and a fallback is in use.
    #[wasm_bindgen(js_name = isFallback)]
    pub fn is_fallback(&self) -> bool {
        self.engine
            .borrow()
            .as_ref()
            .is_some_and(Engine::fallback_active)
    }

    /// Name of the current mode.
    pub fn mode(&self) -> Option<String> {
        self.engine
            .borrow()
            .as_ref()
            .map(|engine| engine.mode().to_string())
    }

    /// Engine status as JSON.
    #[wasm_bindgen(js_name = statusJson)]
    pub fn status_json(&self) -> String {
        self.engine
            .borrow()
            .as_ref()
            .and_then(|engine| serde_json::to_string(&engine.status()).ok())
            .unwrap_or_default()
    }

    /// Release the active backend.
    pub fn dispose(&self) {
        if let Some(engine) = self.engine.borrow_mut().as_mut() {
            engine.shutdown();
        }
    }
}
