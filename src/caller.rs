//! Formatting of the call site injected into every record.
//!
//! The call site itself is captured with `#[track_caller]` on the logging entry points, so the
//! [`Location`] handed to a [`FormatCaller`] already points at the application's call to
//! [`Log::log`](crate::Log::log) rather than at a frame inside this crate.

use std::{fmt, panic::Location, path::Path};

use tracing_subscriber::fmt::format::Writer;

/// A type that can render the call site of a log record.
///
/// This is the call-site counterpart of
/// [`FormatTime`](tracing_subscriber::fmt::time::FormatTime) and it is evaluated once per record.
pub trait FormatCaller {
    /// Writes the call site described by `location` into `w`.
    fn format_caller(&self, location: &Location<'_>, w: &mut Writer<'_>) -> fmt::Result;
}

/// Formats the call site as `path/to/file.rs:line`, with the path as the compiler reports it.
///
/// This is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileLine;

impl FormatCaller for FileLine {
    fn format_caller(&self, location: &Location<'_>, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}:{}", location.file(), location.line())
    }
}

/// Formats the call site as `file.rs:line`, dropping every directory component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShortFileLine;

impl FormatCaller for ShortFileLine {
    fn format_caller(&self, location: &Location<'_>, w: &mut Writer<'_>) -> fmt::Result {
        let file = location.file();
        let file = Path::new(file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(file);
        write!(w, "{}:{}", file, location.line())
    }
}

/// Writes nothing. This is the placeholder left by
/// [`LoggerBuilder::without_caller`](crate::LoggerBuilder::without_caller), which refuses to build.
impl FormatCaller for () {
    fn format_caller(&self, _: &Location<'_>, _: &mut Writer<'_>) -> fmt::Result {
        Ok(())
    }
}

impl FormatCaller for fn(&Location<'_>, &mut Writer<'_>) -> fmt::Result {
    fn format_caller(&self, location: &Location<'_>, w: &mut Writer<'_>) -> fmt::Result {
        (*self)(location, w)
    }
}

impl<C: FormatCaller + ?Sized> FormatCaller for &C {
    fn format_caller(&self, location: &Location<'_>, w: &mut Writer<'_>) -> fmt::Result {
        (**self).format_caller(location, w)
    }
}

impl<C: FormatCaller + ?Sized> FormatCaller for Box<C> {
    fn format_caller(&self, location: &Location<'_>, w: &mut Writer<'_>) -> fmt::Result {
        (**self).format_caller(location, w)
    }
}

#[cfg(test)]
mod tests {
    use std::panic::Location;

    use tracing_subscriber::fmt::format::Writer;

    use super::{FileLine, FormatCaller, ShortFileLine};

    fn render(caller: impl FormatCaller, location: &Location<'_>) -> String {
        let mut out = String::new();
        caller
            .format_caller(location, &mut Writer::new(&mut out))
            .unwrap();
        out
    }

    #[test]
    fn file_line_keeps_path() {
        let location = Location::caller();
        let expected = format!("{}:{}", location.file(), location.line());
        assert_eq!(render(FileLine, location), expected);
        assert!(expected.contains("caller.rs"));
    }

    #[test]
    fn short_file_line_drops_directories() {
        let location = Location::caller();
        assert_eq!(
            render(ShortFileLine, location),
            format!("caller.rs:{}", location.line())
        );
    }

    #[test]
    fn function_pointer_caller() {
        let upper: fn(&Location<'_>, &mut Writer<'_>) -> std::fmt::Result =
            |location, w| write!(w, "line {}", location.line());
        let location = Location::caller();
        assert_eq!(render(upper, location), format!("line {}", location.line()));
    }
}
