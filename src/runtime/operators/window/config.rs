use serde::{Deserialize, Serialize};

use crate::common::error::Result;
use crate::common::key::{DEFAULT_START_COLUMN, DEFAULT_STOP_COLUMN, DEFAULT_TIME_COLUMN};
use crate::interval::{Duration, Window};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    pub every: Duration,
    pub period: Duration,
    pub offset: Duration,
    pub time_column: String,
    pub start_column: String,
    pub stop_column: String,
    pub create_empty: bool,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            every: Duration::ZERO,
            period: Duration::ZERO,
            offset: Duration::ZERO,
            time_column: DEFAULT_TIME_COLUMN.to_string(),
            start_column: DEFAULT_START_COLUMN.to_string(),
            stop_column: DEFAULT_STOP_COLUMN.to_string(),
            create_empty: false,
        }
    }
}

impl WindowSpec {
    pub fn new(every: Duration) -> Self {
        Self {
            every,
            ..Default::default()
        }
    }

    pub fn infinite() -> Self {
        Self::new(Duration::INFINITE)
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_create_empty(mut self, create_empty: bool) -> Self {
        self.create_empty = create_empty;
        self
    }

    pub fn is_infinite(&self) -> bool {
        self.every.is_infinite()
    }

    pub fn has_default_columns(&self) -> bool {
        self.time_column == DEFAULT_TIME_COLUMN
            && self.start_column == DEFAULT_START_COLUMN
            && self.stop_column == DEFAULT_STOP_COLUMN
    }

    /// Builds the window, defaulting `every` and `period` from each other.
    pub fn window(&self) -> Result<Window> {
        let every = if self.every.is_zero() { self.period } else { self.every };
        Window::new(every, self.period, self.offset)
    }
}
