//! Single-flight guard for submission surfaces

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Admits at most one outstanding operation; later callers get `Error::Busy`
#[derive(Debug)]
pub(crate) struct SingleFlight {
    busy: AtomicBool,
    label: &'static str,
}

/// Held for the duration of the admitted operation
#[derive(Debug)]
pub(crate) struct FlightPermit<'a> {
    flight: &'a SingleFlight,
}

impl SingleFlight {
    pub fn new(label: &'static str) -> Self {
        Self {
            busy: AtomicBool::new(false),
            label,
        }
    }

    pub fn try_acquire(&self) -> Result<FlightPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy(self.label))?;
        Ok(FlightPermit { flight: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.flight.busy.store(false, Ordering::Release);
    }
}
