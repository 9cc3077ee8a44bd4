/// Process-wide tracing setup. Every event is printed to stdout as
/// `<timestamp> [<LEVEL>] <message>`.
use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Event formatter producing `2026-10-18 10:21:33,512 [INFO] message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now().format(TIMESTAMP_FORMAT);
        write!(writer, "{} [{}] ", now, event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .with_ansi(false)
        .event_format(BracketedLevelFormat)
        .init();
}


#[cfg(test)]
mod tests {
    use super::capture;

    #[test]
    fn test_line_has_timestamp_level_and_message() {
        let (logs, _guard) = capture::install();
        tracing::info!("Executing: ccache --show-stats");

        let output = logs.contents();
        let line = output.lines().next().unwrap();
        let (timestamp, rest) = line.split_at(23);
        let (seconds, millis) = timestamp.split_at(19);
        assert!(chrono::NaiveDateTime::parse_from_str(seconds, "%Y-%m-%d %H:%M:%S").is_ok());
        assert!(millis.starts_with(','));
        assert!(millis[1..].bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(rest, " [INFO] Executing: ccache --show-stats");
    }

    #[test]
    fn test_error_level_is_bracketed() {
        let (logs, _guard) = capture::install();
        tracing::error!("clearing ccache cache not possible");
        assert!(logs
            .contents()
            .contains(" [ERROR] clearing ccache cache not possible\n"));
    }

    #[test]
    fn test_structured_fields_follow_message() {
        let (logs, _guard) = capture::install();
        tracing::warn!(limit_secs = 5, "killing timed out command");
        assert!(logs
            .contents()
            .contains("[WARN] killing timed out command limit_secs=5\n"));
    }

    #[test]
    fn test_output_has_no_escape_sequences() {
        let (logs, _guard) = capture::install();
        tracing::info!(pid = 42, bytes = 7, "child process started");
        let output = logs.contents();
        assert!(!output.contains('\x1b'), "styled output: {output:?}");
        assert!(output.ends_with(" [INFO] child process started pid=42 bytes=7\n"));
    }
}
