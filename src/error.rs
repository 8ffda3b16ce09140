use thiserror::Error;
use wasm_bindgen::JsValue;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("global window does not exist")]
    NoWindow,
    #[error("window has no document")]
    NoDocument,
    #[error("document has no body")]
    NoBody,
    /// A DOM call threw; holds the debug rendering of the thrown value.
    #[error("dom operation failed: {0}")]
    Dom(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
}

impl From<JsValue> for Error {
    fn from(value: JsValue) -> Self {
        Error::Dom(format!("{:?}", value))
    }
}

impl From<Error> for JsValue {
    fn from(error: Error) -> Self {
        JsValue::from_str(&error.to_string())
    }
}
