//! The JavaScript face of the crate: a `ToastManager` class mirroring the page API.

use crate::manager::{Content, ToastManager};
use crate::web::WebHost;
use crate::{Config, Severity};
use wasm_bindgen::prelude::*;
use web_sys::Element;

#[wasm_bindgen(js_name = ToastManager)]
pub struct JsToastManager {
    manager: ToastManager<WebHost>,
}

#[wasm_bindgen(js_class = ToastManager)]
impl JsToastManager {
    /// `config` is an optional JSON document, see [`Config`].
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<String>) -> Result<JsToastManager, JsValue> {
        let config = match config {
            Some(json) => Config::from_json(&json)?,
            None => Config::default(),
        };
        let manager = ToastManager::with_config(WebHost::new()?, config)?;
        Ok(Self { manager })
    }

    /// Unknown `kind` values are shown as info.
    pub fn show(
        &self,
        message: &str,
        kind: Option<String>,
        duration: Option<u32>,
    ) -> Result<Element, JsValue> {
        self.display(Content::from(message), kind, duration)
    }

    /// Like `show`, but `markup` is inserted as HTML. Never pass untrusted input.
    #[wasm_bindgen(js_name = showMarkup)]
    pub fn show_markup(
        &self,
        markup: &str,
        kind: Option<String>,
        duration: Option<u32>,
    ) -> Result<Element, JsValue> {
        self.display(Content::Markup(markup.to_string()), kind, duration)
    }

    pub fn success(&self, message: &str, duration: Option<u32>) -> Result<Element, JsValue> {
        self.severity(message, Severity::Success, duration)
    }

    pub fn error(&self, message: &str, duration: Option<u32>) -> Result<Element, JsValue> {
        self.severity(message, Severity::Error, duration)
    }

    pub fn warning(&self, message: &str, duration: Option<u32>) -> Result<Element, JsValue> {
        self.severity(message, Severity::Warning, duration)
    }

    pub fn info(&self, message: &str, duration: Option<u32>) -> Result<Element, JsValue> {
        self.severity(message, Severity::Info, duration)
    }

    /// Dismisses a toast element previously returned by this manager.
    pub fn dismiss(&self, toast: &Element) -> bool {
        self.manager.dismiss_node(toast)
    }

    pub fn clear(&self) {
        self.manager.clear()
    }

    #[wasm_bindgen(getter)]
    pub fn count(&self) -> usize {
        self.manager.len()
    }
}

impl JsToastManager {
    fn display(
        &self,
        content: Content,
        kind: Option<String>,
        duration: Option<u32>,
    ) -> Result<Element, JsValue> {
        let (severity, duration) = resolve(self.manager.config(), kind.as_deref(), duration);
        Ok(self.manager.show_content(content, severity, duration)?.node)
    }

    fn severity(
        &self,
        message: &str,
        severity: Severity,
        duration: Option<u32>,
    ) -> Result<Element, JsValue> {
        let duration = helper_duration(self.manager.config(), severity, duration);
        Ok(self.manager.show(message, severity, duration)?.node)
    }
}

/// Severity and lifetime for a `show` call: unknown or missing kinds are info, a
/// missing duration is the configured default.
fn resolve(config: &Config, kind: Option<&str>, duration: Option<u32>) -> (Severity, u32) {
    let severity = kind.map_or(Severity::Info, Severity::parse_lenient);
    (severity, duration.unwrap_or(config.duration_ms))
}

fn helper_duration(config: &Config, severity: Severity, duration: Option<u32>) -> u32 {
    duration.unwrap_or_else(|| config.durations.get(severity))
}

/// Routes `log` output to the browser console. `level` defaults to `info`.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) {
    let level = level
        .as_deref()
        .and_then(|level| level.parse::<log::Level>().ok())
        .unwrap_or(log::Level::Info);
    wasm_logger::init(wasm_logger::Config::new(level));
}
