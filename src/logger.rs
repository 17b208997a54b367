use std::{
    borrow::Cow,
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    io::{self, Write as _},
    panic::Location,
    sync::{Arc, Mutex, PoisonError},
};

use serde::ser::Error as _;
use serde_json::{Map, Value};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime, MakeWriter};

use crate::{builder::LoggerBuilder, caller::FormatCaller, record::collect_pairs, Error, Log};

/// Logger that writes one JSON object per [`Log::log`] call to a configured output.
///
/// Loggers are created with a [`LoggerBuilder`], which makes sure every record carries the
/// call site and a timestamp. Cloning a logger, or deriving one with [`Logger::with`], shares the
/// output and its write lock, so records from all of them are never interleaved.
pub struct Logger<W = fn() -> io::Sink> {
    sink: Arc<Sink<W>>,
    log_internal_errors: bool,
    caller_key: Cow<'static, str>,
    time_key: Cow<'static, str>,
    schema: BTreeMap<Cow<'static, str>, JsonValue>,
}

struct Sink<W> {
    make_writer: W,
    write_lock: Mutex<()>,
}

#[allow(clippy::type_complexity)]
#[derive(Clone)]
enum JsonValue {
    Serde(Value),
    Producer(Arc<dyn Fn(&Location<'_>) -> Result<Value, fmt::Error> + Send + Sync>),
}

impl JsonValue {
    fn resolve(&self, key: &str, location: &Location<'_>) -> Result<Value, serde_json::Error> {
        match self {
            JsonValue::Serde(value) => Ok(value.clone()),
            JsonValue::Producer(fun) => fun(location).map_err(|_| {
                serde_json::Error::custom(format_args!("unable to format the `{key}` field"))
            }),
        }
    }
}

impl<W> Sink<W>
where
    W: for<'writer> MakeWriter<'writer>,
{
    fn write(&self, line: &[u8]) -> io::Result<()> {
        // The lock guards no data, so a panic while holding it leaves nothing to repair.
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut writer = self.make_writer.make_writer();
        writer.write_all(line)?;
        writer.flush()
    }
}

impl Logger {
    /// Returns a new [`LoggerBuilder`] with the default configuration.
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }
}

impl<W> Logger<W>
where
    W: for<'writer> MakeWriter<'writer>,
{
    /// Creates a logger that stamps records with `caller` and `timer`. Only the builder calls
    /// this, after validating its configuration.
    pub(crate) fn new<C, T>(
        make_writer: W,
        caller_key: Cow<'static, str>,
        caller: C,
        time_key: Cow<'static, str>,
        timer: T,
    ) -> Self
    where
        C: FormatCaller + Send + Sync + 'static,
        T: FormatTime + Send + Sync + 'static,
    {
        let mut schema = BTreeMap::new();
        schema.insert(
            caller_key.clone(),
            JsonValue::Producer(Arc::new(move |location: &Location<'_>| {
                let mut site = String::with_capacity(64);
                caller.format_caller(location, &mut Writer::new(&mut site))?;
                Ok(Value::from(site))
            })),
        );
        schema.insert(
            time_key.clone(),
            JsonValue::Producer(Arc::new(move |_: &Location<'_>| {
                let mut timestamp = String::with_capacity(32);
                timer.format_time(&mut Writer::new(&mut timestamp))?;
                Ok(Value::from(timestamp))
            })),
        );

        Self {
            sink: Arc::new(Sink {
                make_writer,
                write_lock: Mutex::new(()),
            }),
            log_internal_errors: false,
            caller_key,
            time_key,
            schema,
        }
    }

    /// Emits a record as if [`Log::log`] was called from `location`.
    ///
    /// [`Log::log`] captures its own call site. This is for wrappers that want to report a
    /// different one, for example a location they received from their own caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encode`] if the record cannot be encoded, including when the caller or
    /// the timer fails to format, and [`Error::Write`] if the output fails. Nothing is retried
    /// and nothing is written for a record that failed to encode.
    pub fn log_at(&self, location: &Location<'_>, keyvals: &[Value]) -> Result<(), Error> {
        thread_local! {
            static BUF: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
        }

        BUF.with(|buf| {
            let borrow = buf.try_borrow_mut();
            let mut a;
            let mut b;
            let buf = if let Ok(buf) = borrow {
                a = buf;
                &mut *a
            } else {
                b = Vec::new();
                &mut b
            };

            let res = match self.format_record(location, keyvals, buf) {
                Ok(()) => self.sink.write(buf).map_err(|e| {
                    if self.log_internal_errors {
                        eprintln!(
                            "[json-kv-logger] Unable to write a record to the Writer for this \
                             Logger! Error: {e}",
                        );
                    }
                    Error::Write(e)
                }),
                Err(e) => {
                    if self.log_internal_errors {
                        eprintln!(
                            "[json-kv-logger] Unable to format a record logged at {location}. \
                             Error: {e}",
                        );
                    }
                    Err(Error::Encode(e))
                },
            };

            buf.clear();
            res
        })
    }

    fn format_record(
        &self,
        location: &Location<'_>,
        keyvals: &[Value],
        buf: &mut Vec<u8>,
    ) -> Result<(), serde_json::Error> {
        let mut output = Map::new();
        for (key, value) in &self.schema {
            output.insert(key.to_string(), value.resolve(key, location)?);
        }
        // Pairs passed to the call take precedence over bound fields.
        output.extend(collect_pairs(keyvals));

        serde_json::to_writer(&mut *buf, &output)?;
        buf.push(b'\n');
        Ok(())
    }
}

impl<W> Logger<W> {
    /// Returns a logger that adds `keyvals` to every record it emits.
    ///
    /// The new logger shares the output with `self`. Keys follow the same rules as in
    /// [`Log::log`], and pairs passed to a call still override the bound ones. Pairs that use the
    /// caller or time key are ignored, those fields always come from their formatters.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use json_kv_logger::{kv, Log};
    ///
    /// let logger = json_kv_logger::builder().build().unwrap();
    /// let request = logger.with(&kv!["request_id", 7]);
    /// request.log(&kv!["event", "accepted"]).unwrap();
    /// ```
    #[must_use]
    pub fn with(&self, keyvals: &[Value]) -> Self {
        let mut logger = self.clone();
        for (key, value) in collect_pairs(keyvals) {
            logger.add_static_field(key, value);
        }
        logger
    }

    /// Borrows the [writer] for this logger.
    ///
    /// [writer]: MakeWriter
    pub fn writer(&self) -> &W {
        &self.sink.make_writer
    }

    /// Sets whether to also report failed records on stderr. Defaults to false.
    ///
    /// Failures are always returned from [`Log::log`]; this only adds a line on stderr for
    /// callers that ignore the result.
    pub fn log_internal_errors(&mut self, log_internal_errors: bool) -> &mut Self {
        self.log_internal_errors = log_internal_errors;
        self
    }

    fn is_injected(&self, key: &str) -> bool {
        key == self.caller_key || key == self.time_key
    }

    /// Adds a field with a fixed value to every record.
    ///
    /// Returns `false` and changes nothing if `key` is the caller or time key.
    ///
    /// # Examples
    ///
    /// Print hostname in each log:
    ///
    /// ```rust
    /// let mut logger = json_kv_logger::builder().build().unwrap();
    /// logger.add_static_field("hostname", serde_json::json!(get_hostname()));
    /// # fn get_hostname() -> &'static str { "localhost" }
    /// ```
    pub fn add_static_field(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if self.is_injected(&key) {
            return false;
        }
        self.schema.insert(Cow::Owned(key), JsonValue::Serde(value));
        true
    }

    /// Removes a field that was bound to this logger. Returns whether a field was removed.
    ///
    /// The caller and time fields cannot be removed; asking for them returns `false`.
    ///
    /// # Examples
    ///
    /// Add a field and then remove it:
    ///
    /// ```rust
    /// let mut logger = json_kv_logger::builder().build().unwrap();
    /// logger.add_static_field("deleteMe", serde_json::json!("accident"));
    /// assert!(logger.remove_field("deleteMe"));
    /// assert!(!logger.remove_field("time"));
    /// ```
    pub fn remove_field(&mut self, key: impl AsRef<str>) -> bool {
        let key = key.as_ref();
        if self.is_injected(key) {
            return false;
        }
        self.schema.remove(key).is_some()
    }
}

impl<W> Clone for Logger<W> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            log_internal_errors: self.log_internal_errors,
            caller_key: self.caller_key.clone(),
            time_key: self.time_key.clone(),
            schema: self.schema.clone(),
        }
    }
}

impl<W> fmt::Debug for Logger<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("caller_key", &self.caller_key)
            .field("time_key", &self.time_key)
            .field("fields", &self.schema.keys().collect::<Vec<_>>())
            .field("log_internal_errors", &self.log_internal_errors)
            .finish_non_exhaustive()
    }
}

impl<W> Log for Logger<W>
where
    W: for<'writer> MakeWriter<'writer>,
{
    #[track_caller]
    fn log(&self, keyvals: &[Value]) -> Result<(), Error> {
        self.log_at(Location::caller(), keyvals)
    }
}
