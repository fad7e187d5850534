//! Test doubles for the tool cache: a settable clock and a scripted probe.

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::clock::Clock;
use crate::manager::{ProbeError, ToolProbe};

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = TimeDelta::from_std(by).unwrap_or(TimeDelta::MAX);
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
enum ProbeAnswer {
    Installed(String),
    Failing(String),
}

/// Probe with a fixed answer per tool; unknown tools are unavailable.
#[derive(Debug, Default)]
pub struct StaticProbe {
    answers: HashMap<String, ProbeAnswer>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StaticProbe {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tool(mut self, name: &str, version: &str) -> Self {
        self.answers
            .insert(name.to_string(), ProbeAnswer::Installed(version.to_string()));
        self
    }

    #[must_use]
    pub fn with_tools(mut self, names: &[&str]) -> Self {
        for name in names {
            self = self.with_tool(name, "1.0.0");
        }
        self
    }

    #[must_use]
    pub fn with_failure(mut self, name: &str, reason: &str) -> Self {
        self.answers
            .insert(name.to_string(), ProbeAnswer::Failing(reason.to_string()));
        self
    }

    /// How many times `is_available` was asked about `name`.
    #[must_use]
    pub fn availability_calls(&self, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .copied()
            .unwrap_or(0)
    }

    /// Total `is_available` calls across all tools.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

impl ToolProbe for StaticProbe {
    fn is_available(&self, name: &str) -> Result<bool, ProbeError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default() += 1;
        match self.answers.get(name) {
            Some(ProbeAnswer::Installed(_)) => Ok(true),
            Some(ProbeAnswer::Failing(reason)) => Err(ProbeError::new(name, reason.clone())),
            None => Ok(false),
        }
    }

    fn version(&self, name: &str) -> Result<String, ProbeError> {
        match self.answers.get(name) {
            Some(ProbeAnswer::Installed(version)) => Ok(version.clone()),
            Some(ProbeAnswer::Failing(reason)) => Err(ProbeError::new(name, reason.clone())),
            None => Err(ProbeError::new(name, "not installed")),
        }
    }
}
