//! Source of "today" for due-date buckets and completion stamps.

use time::{Date, OffsetDateTime, UtcOffset};

/// Supplies the current calendar date.
pub trait Clock: Send + Sync {
    /// Today's date.
    fn today(&self) -> Date;
}

/// Wall clock read at a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    /// Clock at the machine's local offset, or UTC when it cannot be determined.
    ///
    /// The offset can only be read while the process has a single thread, so
    /// call this before starting an async runtime.
    #[must_use]
    pub fn local() -> Self {
        Self::at_offset(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
    }

    /// Clock at an explicit offset.
    #[must_use]
    pub const fn at_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// Offset the calendar date is computed at.
    #[must_use]
    pub const fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::at_offset(UtcOffset::UTC)
    }
}

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.offset).date()
    }
}

/// Clock pinned to one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}
