//! Log formatting stamped with the logical tick.

use std::cell::Cell;
use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::types::Tick;

thread_local! {
    static SIM_TICK: Cell<Option<Tick>> = const { Cell::new(None) };
}

/// Publish the dispatcher's current tick to log lines emitted on this
/// thread. `None` clears it.
pub fn set_sim_tick(tick: Option<Tick>) {
    SIM_TICK.with(|t| t.set(tick));
}

/// The tick last published on this thread, if any.
pub fn sim_tick() -> Option<Tick> {
    SIM_TICK.with(|t| t.get())
}

/// Right-aligned tick stamp: `[tick    12]`, or `[tick     -]` off the
/// dispatcher thread.
pub struct FmtTick(pub Option<Tick>);

impl fmt::Display for FmtTick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(t) => write!(f, "[tick {t:>5}]"),
            None => write!(f, "[tick {:>5}]", "-"),
        }
    }
}

/// ANSI color for a level tag.
fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

/// Event formatter: `[tick    12]  INFO dispatch worker=3 burst=Some(2)`.
///
/// The logical tick replaces the wall-clock timestamp, so two runs with the
/// same seed log identical lines.
pub struct SimFormat;

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let level = *event.metadata().level();
        let mut line = Line::default();
        event.record(&mut line);

        write!(writer, "{} ", FmtTick(sim_tick()))?;
        if writer.has_ansi_escapes() {
            write!(writer, "{}{level:>5}\x1b[0m ", level_color(level))?;
        } else {
            write!(writer, "{level:>5} ")?;
        }
        writeln!(writer, "{}{}", line.message, line.fields)
    }
}

/// Message text plus ` key=value` pairs, in the order they were recorded.
///
/// Numeric and boolean fields fall through to `record_debug`, whose output
/// for them is the plain value.
#[derive(Default)]
struct Line {
    message: String,
    fields: String,
}

impl Visit for Line {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={value:?}", field.name());
        }
    }
}
