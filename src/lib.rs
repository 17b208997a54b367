//! A key/value structured logger that writes one JSON object per line.
//!
//! Every call to [`Log::log`] takes a flat list of alternating keys and values, adds the call site
//! and a timestamp, and writes the result as a single line to the configured output.
//!
//! ```rust
//! use json_kv_logger::{kv, Log};
//!
//! let logger = json_kv_logger::builder()
//!     .with_writer(std::io::stdout)
//!     .build()?;
//!
//! logger.log(&kv!["event", "start", "id", 42])?;
//! // {"caller":"src/main.rs:9","event":"start","id":42,"time":"24-01-02 10:00:00.000"}
//! # Ok::<(), json_kv_logger::Error>(())
//! ```
//!
//! Keys that are not strings are rendered as their JSON text, a `null` key becomes `"NULL"`, and
//! a key without a value gets the value `"(MISSING)"`.

mod builder;
pub mod caller;
mod error;
mod logger;
mod record;
pub mod timer;


use std::sync::Arc;

pub use builder::LoggerBuilder;
pub use caller::FormatCaller;
pub use error::Error;
pub use logger::Logger;
pub use record::{MISSING_VALUE, NULL_KEY};
pub use serde_json::Value;

/// Something that emits structured records.
pub trait Log {
    /// Emits one record made of the alternating keys and values in `keyvals`.
    ///
    /// Implementations track their caller, so the call site recorded is the one that invoked
    /// this method.
    ///
    /// # Errors
    ///
    /// Returns an error if the record could not be encoded or written. What to do about it is up
    /// to the caller.
    #[track_caller]
    fn log(&self, keyvals: &[Value]) -> Result<(), Error>;
}

impl<L: Log + ?Sized> Log for &L {
    #[track_caller]
    fn log(&self, keyvals: &[Value]) -> Result<(), Error> {
        (**self).log(keyvals)
    }
}

impl<L: Log + ?Sized> Log for Box<L> {
    #[track_caller]
    fn log(&self, keyvals: &[Value]) -> Result<(), Error> {
        (**self).log(keyvals)
    }
}

impl<L: Log + ?Sized> Log for Arc<L> {
    #[track_caller]
    fn log(&self, keyvals: &[Value]) -> Result<(), Error> {
        (**self).log(keyvals)
    }
}

/// Returns a new [`LoggerBuilder`] with the default configuration.
///
/// This is shorthand for [`LoggerBuilder::default()`].
pub fn builder() -> LoggerBuilder {
    LoggerBuilder::default()
}

/// Builds the list of alternating keys and values taken by [`Log::log`].
///
/// Each element is converted with [`Value::from`], so strings, numbers, booleans, options and
/// vectors of those can be mixed freely. Anything else can be passed as a [`Value`], for example
/// through [`serde_json::json!`] or [`serde_json::to_value`].
///
/// ```rust
/// use json_kv_logger::kv;
///
/// let pairs = kv!["event", "start", "id", 42, "tags", serde_json::json!(["a", "b"])];
/// assert_eq!(pairs.len(), 6);
/// ```
#[macro_export]
macro_rules! kv {
    ($($value:expr),* $(,)?) => {
        [$($crate::Value::from($value)),*]
    };
}
