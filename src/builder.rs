use std::{borrow::Cow, io};

use tracing_subscriber::fmt::{time::FormatTime, MakeWriter, TestWriter};

use crate::{
    caller::{FileLine, FormatCaller},
    logger::Logger,
    timer::{short_utc, ShortUtcTime},
    Error,
};

/// Configures and builds a [`Logger`].
///
/// Every part has a default:
///
/// - records are discarded (`std::io::sink`),
/// - the timestamp is UTC formatted as `YY-MM-DD HH:MM:SS.mmm`, under the `time` key,
/// - the call site is formatted as `file:line`, under the `caller` key.
///
/// Removing the timer or the caller makes [`LoggerBuilder::build`] fail with
/// [`Error::InvalidConfig`].
pub struct LoggerBuilder<W = fn() -> io::Sink, T = ShortUtcTime, C = FileLine> {
    make_writer: W,
    timer: Option<T>,
    caller: Option<C>,

    time_key: Cow<'static, str>,
    caller_key: Cow<'static, str>,

    log_internal_errors: bool,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            make_writer: io::sink,
            timer: Some(short_utc()),
            caller: Some(FileLine),
            time_key: Cow::Borrowed("time"),
            caller_key: Cow::Borrowed("caller"),
            log_internal_errors: false,
        }
    }
}

impl<W, T, C> LoggerBuilder<W, T, C>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
    T: FormatTime + Send + Sync + 'static,
    C: FormatCaller + Send + Sync + 'static,
{
    /// Validates the configuration and builds the [`Logger`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the timer or the caller was removed, if one of the
    /// injected keys is empty, or if both injected keys are the same.
    pub fn build(self) -> Result<Logger<W>, Error> {
        let Some(caller) = self.caller else {
            return Err(Error::InvalidConfig("caller must not be empty"));
        };
        let Some(timer) = self.timer else {
            return Err(Error::InvalidConfig("timestamp formatter must not be empty"));
        };
        if self.caller_key.is_empty() {
            return Err(Error::InvalidConfig("caller key must not be empty"));
        }
        if self.time_key.is_empty() {
            return Err(Error::InvalidConfig("time key must not be empty"));
        }
        if self.caller_key == self.time_key {
            return Err(Error::InvalidConfig("caller and time keys must differ"));
        }

        let mut logger = Logger::new(
            self.make_writer,
            self.caller_key,
            caller,
            self.time_key,
            timer,
        );
        logger.log_internal_errors(self.log_internal_errors);

        Ok(logger)
    }
}

impl<W, T, C> LoggerBuilder<W, T, C> {
    /// Sets the [`MakeWriter`] that the [`Logger`] being built will use to write records.
    ///
    /// # Examples
    ///
    /// Using `stdout` rather than discarding records:
    ///
    /// ```rust
    /// let logger = json_kv_logger::builder()
    ///     .with_writer(std::io::stdout)
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn with_writer<W2>(self, make_writer: W2) -> LoggerBuilder<W2, T, C>
    where
        W2: for<'writer> MakeWriter<'writer> + 'static,
    {
        LoggerBuilder {
            make_writer,
            timer: self.timer,
            caller: self.caller,
            time_key: self.time_key,
            caller_key: self.caller_key,
            log_internal_errors: self.log_internal_errors,
        }
    }

    /// Borrows the [writer] for this builder.
    ///
    /// [writer]: MakeWriter
    pub fn writer(&self) -> &W {
        &self.make_writer
    }

    /// Mutably borrows the [writer] for this builder.
    ///
    /// [writer]: MakeWriter
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.make_writer
    }

    /// Configures the logger to support [`libtest`'s output capturing][capturing] when used in
    /// unit tests.
    ///
    /// See [`TestWriter`] for additional details.
    ///
    /// [capturing]:
    /// https://doc.rust-lang.org/book/ch11-02-running-tests.html#showing-function-output
    pub fn with_test_writer(self) -> LoggerBuilder<TestWriter, T, C> {
        LoggerBuilder {
            make_writer: TestWriter::default(),
            timer: self.timer,
            caller: self.caller,
            time_key: self.time_key,
            caller_key: self.caller_key,
            log_internal_errors: self.log_internal_errors,
        }
    }

    /// Updates the [`MakeWriter`] by applying a function to the existing [`MakeWriter`].
    ///
    /// # Examples
    ///
    /// Also send every record to stderr:
    ///
    /// ```rust
    /// use tracing_subscriber::fmt::writer::MakeWriterExt;
    ///
    /// let logger = json_kv_logger::builder()
    ///     .map_writer(|w| w.and(std::io::stderr))
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn map_writer<W2>(self, f: impl FnOnce(W) -> W2) -> LoggerBuilder<W2, T, C>
    where
        W2: for<'writer> MakeWriter<'writer> + 'static,
    {
        LoggerBuilder {
            make_writer: f(self.make_writer),
            timer: self.timer,
            caller: self.caller,
            time_key: self.time_key,
            caller_key: self.caller_key,
            log_internal_errors: self.log_internal_errors,
        }
    }

    /// Sets whether to also report failed records on stderr. Defaults to false.
    pub fn log_internal_errors(self, log_internal_errors: bool) -> Self {
        Self {
            log_internal_errors,
            ..self
        }
    }

    /// Use the given [`timer`] for record timestamps.
    ///
    /// See the [`time` module] for the provided timer implementations.
    ///
    /// [`timer`]: FormatTime
    /// [`time` module]: mod@tracing_subscriber::fmt::time
    pub fn with_timer<T2>(self, timer: T2) -> LoggerBuilder<W, T2, C> {
        LoggerBuilder {
            make_writer: self.make_writer,
            timer: Some(timer),
            caller: self.caller,
            time_key: self.time_key,
            caller_key: self.caller_key,
            log_internal_errors: self.log_internal_errors,
        }
    }

    /// Removes the timer. A builder without a timer refuses to build.
    pub fn without_time(self) -> LoggerBuilder<W, (), C> {
        LoggerBuilder {
            make_writer: self.make_writer,
            timer: None,
            caller: self.caller,
            time_key: self.time_key,
            caller_key: self.caller_key,
            log_internal_errors: self.log_internal_errors,
        }
    }

    /// Use the given [`FormatCaller`] to render the call site of records.
    pub fn with_caller<C2>(self, caller: C2) -> LoggerBuilder<W, T, C2> {
        LoggerBuilder {
            make_writer: self.make_writer,
            timer: self.timer,
            caller: Some(caller),
            time_key: self.time_key,
            caller_key: self.caller_key,
            log_internal_errors: self.log_internal_errors,
        }
    }

    /// Removes the caller. A builder without a caller refuses to build.
    pub fn without_caller(self) -> LoggerBuilder<W, T, ()> {
        LoggerBuilder {
            make_writer: self.make_writer,
            timer: self.timer,
            caller: None,
            time_key: self.time_key,
            caller_key: self.caller_key,
            log_internal_errors: self.log_internal_errors,
        }
    }

    /// Sets the key of the timestamp field. Defaults to `time`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let logger = json_kv_logger::builder().with_time_key("ts").build().unwrap();
    /// ```
    pub fn with_time_key(self, key: impl Into<Cow<'static, str>>) -> Self {
        Self {
            time_key: key.into(),
            ..self
        }
    }

    /// Sets the key of the call site field. Defaults to `caller`.
    pub fn with_caller_key(self, key: impl Into<Cow<'static, str>>) -> Self {
        Self {
            caller_key: key.into(),
            ..self
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::LoggerBuilder;
    use crate::{
        caller::ShortFileLine,
        kv,
        tests::{MockCaller, MockMakeWriter, MockTime},
        Error,
        Log,
    };

    fn builder() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    fn parse_as_json(buffer: &MockMakeWriter) -> serde_json::Value {
        let buf = String::from_utf8(buffer.buf().to_vec()).unwrap();
        let json = buf
            .lines()
            .last()
            .expect("expected at least one line to be written!");
        match serde_json::from_str(json) {
            Ok(v) => v,
            Err(e) => panic!(
                "assertion failed: JSON shouldn't be malformed\n  error: {}\n  json: {}",
                e, json
            ),
        }
    }

    #[test]
    fn default_builds() {
        builder().build().unwrap();
    }

    #[test]
    fn custom_parts_build() {
        builder()
            .with_writer(MockMakeWriter::default())
            .with_timer(MockTime)
            .with_caller(ShortFileLine)
            .with_time_key("ts")
            .log_internal_errors(true)
            .build()
            .unwrap();
    }

    #[test]
    fn missing_timer_is_invalid() {
        let err = builder().without_time().build().unwrap_err();
        assert!(err.is_invalid_config());
        assert_eq!(
            err.to_string(),
            "invalid config: timestamp formatter must not be empty"
        );
    }

    #[test]
    fn missing_caller_is_invalid() {
        let err = builder().without_caller().build().unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConfig("caller must not be empty")
        ));
    }

    #[test]
    fn timer_can_be_restored() {
        builder().without_time().with_timer(MockTime).build().unwrap();
    }

    #[test]
    fn bad_keys_are_invalid() {
        assert!(builder()
            .with_time_key("")
            .build()
            .unwrap_err()
            .is_invalid_config());
        assert!(builder()
            .with_caller_key("")
            .build()
            .unwrap_err()
            .is_invalid_config());
        assert!(builder()
            .with_time_key("caller")
            .build()
            .unwrap_err()
            .is_invalid_config());
    }

    #[test]
    fn renamed_keys() {
        let make_writer = MockMakeWriter::default();
        let logger = builder()
            .with_writer(make_writer.clone())
            .with_timer(MockTime)
            .with_caller(MockCaller)
            .with_time_key("ts")
            .with_caller_key(String::from("site"))
            .build()
            .unwrap();

        logger.log(&kv!["event", "renamed"]).unwrap();

        assert_eq!(
            parse_as_json(&make_writer),
            json!({"event": "renamed", "ts": "fake time", "site": "fake caller"})
        );
    }

    #[test]
    fn short_file_line_caller() {
        let make_writer = MockMakeWriter::default();
        let logger = builder()
            .with_writer(make_writer.clone())
            .with_caller(ShortFileLine)
            .build()
            .unwrap();

        let (res, line) = (logger.log(&kv!["event", "short"]), line!());
        res.unwrap();

        assert_eq!(
            parse_as_json(&make_writer)["caller"],
            format!("builder.rs:{line}")
        );
    }

    #[test]
    fn default_timestamps_do_not_decrease() {
        let make_writer = MockMakeWriter::default();
        let logger = builder().with_writer(make_writer.clone()).build().unwrap();

        logger.log(&kv!["n", 1]).unwrap();
        let first = parse_as_json(&make_writer)["time"].as_str().unwrap().to_owned();
        logger.log(&kv!["n", 2]).unwrap();
        let second = parse_as_json(&make_writer)["time"].as_str().unwrap().to_owned();

        assert!(!first.is_empty());
        assert!(first <= second, "{first} > {second}");
    }

    #[test]
    fn test_writer_builds() {
        let logger = builder().with_test_writer().build().unwrap();
        logger.log(&kv!["event", "captured"]).unwrap();
    }
}
