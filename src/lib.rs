//! Transient, auto-dismissing toast notifications for web pages.
//!
//! ```ignore
//! use toasts::{ToastManager, WebHost};
//!
//! let toasts = ToastManager::new(WebHost::new()?)?;
//! toasts.success("Saved")?;
//! ```

mod bindings;
mod config;
mod error;
pub mod headless;
pub mod host;
mod manager;
mod severity;
pub mod web;

pub use bindings::{init_logging, JsToastManager};
pub use config::{Config, Durations};
pub use error::{Error, Result};
pub use headless::HeadlessHost;
pub use host::Host;
pub use manager::{Content, ToastHandle, ToastId, ToastManager};
pub use severity::Severity;
pub use web::WebHost;
