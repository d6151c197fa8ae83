use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

const STEP_PREFIX: &str = "-----> ";
const INDENT: &str = "       ";
const WARNING_PREFIX: &str = "       **WARNING** ";
const ERROR_PREFIX: &str = "       **ERROR** ";
const DEBUG_PREFIX: &str = "       DEBUG: ";

/// Buildpack output in the format the staging log expects.
///
/// A single `Logger` is created by the entry point and handed to every component by reference.
/// Failures to write output are ignored so that a closed stream never fails a build.
pub struct Logger {
    stream: Mutex<Box<dyn WriteColor + Send>>,
    debug: bool,
}

impl Logger {
    pub fn new(stream: impl WriteColor + Send + 'static) -> Self {
        Self {
            stream: Mutex::new(Box::new(stream)),
            debug: false,
        }
    }

    /// A logger writing to stdout. Colours are always emitted since the output is streamed to the
    /// user through the platform and never attached to a terminal directly.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(StandardStream::stdout(ColorChoice::Always))
    }

    /// A logger writing to an in-memory buffer, without colours.
    ///
    /// ```
    /// use cnb_shim_support::log::Logger;
    ///
    /// let (logger, output) = Logger::in_memory();
    /// logger.begin_step("Installing node 6.9.4");
    ///
    /// assert_eq!(output.contents(), "-----> Installing node 6.9.4\n");
    /// ```
    #[must_use]
    pub fn in_memory() -> (Self, CapturedOutput) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let logger = Self::new(SharedBuffer(Arc::clone(&buffer)));

        (logger, CapturedOutput(buffer))
    }

    #[must_use]
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn begin_step(&self, message: impl AsRef<str>) {
        self.write(STEP_PREFIX, message.as_ref(), ColorSpec::new().set_bold(true));
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.write(INDENT, message.as_ref(), &ColorSpec::new());
    }

    pub fn warning(&self, message: impl AsRef<str>) {
        self.write(
            WARNING_PREFIX,
            message.as_ref(),
            ColorSpec::new().set_fg(Some(Color::Yellow)),
        );
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.write(
            ERROR_PREFIX,
            message.as_ref(),
            ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true),
        );
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        if self.debug {
            self.write(DEBUG_PREFIX, message.as_ref(), &ColorSpec::new());
        }
    }

    fn write(&self, prefix: &str, message: &str, spec: &ColorSpec) {
        let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = write_styled_message(&mut **stream, prefix, message, spec);
    }
}

// Styles each line of text separately, so that when buildpack output is streamed to the
// user (and prefixes like `remote:` added) the line colour doesn't leak into the prefixes.
fn write_styled_message<W: WriteColor + ?Sized>(
    stream: &mut W,
    prefix: &str,
    message: &str,
    spec: &ColorSpec,
) -> io::Result<()> {
    for (index, line) in message.split('\n').enumerate() {
        let lead = if index == 0 { prefix } else { INDENT };

        stream.set_color(spec)?;
        write!(stream, "{lead}{line}")?;
        stream.reset()?;
        writeln!(stream)?;
    }

    stream.flush()
}

/// Output written by a logger created with [`Logger::in_memory`].
#[derive(Clone)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    #[must_use]
    pub fn contents(&self) -> String {
        let buffer = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteColor for SharedBuffer {
    fn supports_color(&self) -> bool {
        false
    }

    fn set_color(&mut self, _spec: &ColorSpec) -> io::Result<()> {
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_lines_are_indented() {
        let (logger, output) = Logger::in_memory();
        logger.begin_step("Installing lifecycle\nfrom manifest");
        logger.info("Downloaded [https://example.com/a.tgz]\nto [/tmp/a.tgz]");

        assert_eq!(
            output.contents(),
            "-----> Installing lifecycle\n       from manifest\n       Downloaded [https://example.com/a.tgz]\n       to [/tmp/a.tgz]\n"
        );
    }

    #[test]
    fn warnings_and_errors_are_labelled() {
        let (logger, output) = Logger::in_memory();
        logger.warning("DEPENDENCY MISSING IN MANIFEST:");
        logger.error("md5 mismatch");

        assert_eq!(
            output.contents(),
            "       **WARNING** DEPENDENCY MISSING IN MANIFEST:\n       **ERROR** md5 mismatch\n"
        );
    }

    #[test]
    fn debug_output_is_only_written_when_enabled() {
        let (logger, output) = Logger::in_memory();
        logger.debug("hidden");
        assert_eq!(output.contents(), "");

        let (logger, output) = Logger::in_memory();
        let logger = logger.with_debug(true);
        logger.debug("shown");
        assert_eq!(output.contents(), "       DEBUG: shown\n");
    }
}
