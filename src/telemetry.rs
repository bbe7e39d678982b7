// AstraGuard - Telemetry samples and series
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Telemetry samples and series.
//!
//! A [`TelemetrySeries`] is an ordered, contiguously indexed sequence of
//! [`TelemetrySample`]s. Series are immutable: every mutation in the crate
//! works on a copy and produces a new series.

use crate::error::{AstraError, Result};
use crate::limits::{BATTERY_RANGE, CPU_LOAD_RANGE, SIGNAL_RANGE, TEMPERATURE_RANGE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;

/// Number of telemetry channels used as detector features.
pub const CHANNEL_COUNT: usize = 4;

/// A telemetry channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Battery,
    Temperature,
    Signal,
    CpuLoad,
}

impl Channel {
    /// All channels in feature order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Battery,
        Channel::Temperature,
        Channel::Signal,
        Channel::CpuLoad,
    ];

    /// Column name used in CSV and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Battery => "battery",
            Channel::Temperature => "temperature",
            Channel::Signal => "signal",
            Channel::CpuLoad => "cpu_load",
        }
    }

    /// Valid `(min, max)` domain of the channel.
    pub fn domain(&self) -> (f64, f64) {
        match self {
            Channel::Battery => BATTERY_RANGE,
            Channel::Temperature => TEMPERATURE_RANGE,
            Channel::Signal => SIGNAL_RANGE,
            Channel::CpuLoad => CPU_LOAD_RANGE,
        }
    }

    /// Clamp a value into the channel domain.
    pub fn clamp(&self, value: f64) -> f64 {
        let (min, max) = self.domain();
        value.clamp(min, max)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One time step of vehicle telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Step index.
    pub t: usize,
    /// Battery charge (percent).
    pub battery: f64,
    /// Temperature (°C).
    pub temperature: f64,
    /// Link signal quality (percent).
    pub signal: f64,
    /// CPU load (percent).
    pub cpu_load: f64,
}

impl TelemetrySample {
    /// Create a sample with every channel clamped to its domain.
    pub fn new(t: usize, battery: f64, temperature: f64, signal: f64, cpu_load: f64) -> Self {
        Self {
            t,
            battery,
            temperature,
            signal,
            cpu_load,
        }
        .clamped()
    }

    /// Read a channel.
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Battery => self.battery,
            Channel::Temperature => self.temperature,
            Channel::Signal => self.signal,
            Channel::CpuLoad => self.cpu_load,
        }
    }

    /// Return a copy with `channel` shifted by `delta`, clamped.
    pub fn shifted(mut self, channel: Channel, delta: f64) -> Self {
        let value = channel.clamp(self.get(channel) + delta);
        match channel {
            Channel::Battery => self.battery = value,
            Channel::Temperature => self.temperature = value,
            Channel::Signal => self.signal = value,
            Channel::CpuLoad => self.cpu_load = value,
        }
        self
    }

    /// Return a copy with every channel clamped to its domain.
    pub fn clamped(self) -> Self {
        Self {
            t: self.t,
            battery: Channel::Battery.clamp(self.battery),
            temperature: Channel::Temperature.clamp(self.temperature),
            signal: Channel::Signal.clamp(self.signal),
            cpu_load: Channel::CpuLoad.clamp(self.cpu_load),
        }
    }

    /// Channel values in feature order.
    pub fn features(&self) -> [f64; CHANNEL_COUNT] {
        [self.battery, self.temperature, self.signal, self.cpu_load]
    }

    /// True when every channel is inside its domain.
    pub fn is_within_domain(&self) -> bool {
        Channel::ALL.iter().all(|c| {
            let (min, max) = c.domain();
            let v = self.get(*c);
            v >= min && v <= max
        })
    }
}

/// An immutable, contiguously indexed telemetry time series.
///
/// Deserialization goes through [`TelemetrySeries::from_samples`], so decoded
/// series hold the same invariants as constructed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SeriesRecord")]
pub struct TelemetrySeries {
    samples: Vec<TelemetrySample>,
}

/// Unchecked wire form of a series.
#[derive(Deserialize)]
struct SeriesRecord {
    samples: Vec<TelemetrySample>,
}

impl TryFrom<SeriesRecord> for TelemetrySeries {
    type Error = AstraError;

    fn try_from(record: SeriesRecord) -> Result<Self> {
        Self::from_samples(record.samples)
    }
}

impl TelemetrySeries {
    /// Build a series from samples.
    ///
    /// Samples must be indexed `0..n` in order and hold finite values; every
    /// channel is clamped.
    pub fn from_samples(samples: Vec<TelemetrySample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(AstraError::invalid("telemetry series must not be empty"));
        }
        if let Some(s) = samples
            .iter()
            .find(|s| s.features().iter().any(|v| !v.is_finite()))
        {
            return Err(AstraError::invalid(format!(
                "telemetry at t={} has a non-finite value",
                s.t
            )));
        }
        if let Some((i, s)) = samples.iter().enumerate().find(|(i, s)| s.t != *i) {
            return Err(AstraError::invalid(format!(
                "telemetry step index is not contiguous: expected t={i}, found t={}",
                s.t
            )));
        }
        Ok(Self {
            samples: samples.into_iter().map(TelemetrySample::clamped).collect(),
        })
    }

    /// Crate-internal constructor for samples already known to be valid.
    pub(crate) fn from_valid(samples: Vec<TelemetrySample>) -> Self {
        debug_assert!(samples.iter().enumerate().all(|(i, s)| s.t == i));
        Self { samples }
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples in step order.
    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    /// Sample at step `t`.
    pub fn get(&self, t: usize) -> Option<&TelemetrySample> {
        self.samples.get(t)
    }

    /// Iterate over samples.
    pub fn iter(&self) -> std::slice::Iter<'_, TelemetrySample> {
        self.samples.iter()
    }

    /// A single channel as a time-indexed sequence.
    pub fn channel(&self, channel: Channel) -> Vec<f64> {
        self.samples.iter().map(|s| s.get(channel)).collect()
    }

    /// Step indices.
    pub fn steps(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.t).collect()
    }

    /// Feature rows (one per step) in [`Channel::ALL`] order.
    pub fn feature_rows(&self) -> Vec<[f64; CHANNEL_COUNT]> {
        self.samples.iter().map(TelemetrySample::features).collect()
    }

    /// Consume the series, returning its samples.
    pub fn into_samples(self) -> Vec<TelemetrySample> {
        self.samples
    }

    /// Write the series as CSV (`t,battery,temperature,signal,cpu_load`).
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for sample in &self.samples {
            wtr.serialize(sample)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Export to a CSV file.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }

    /// Read a series from CSV.
    ///
    /// Columns may appear in any order; extra columns are ignored. A missing
    /// channel column is a [`AstraError::DimensionMismatch`].
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();

        let column = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| AstraError::DimensionMismatch {
                    channel: name.to_string(),
                })
        };

        let t_col = column("t")?;
        let mut channel_cols = [0usize; CHANNEL_COUNT];
        for (slot, channel) in channel_cols.iter_mut().zip(Channel::ALL) {
            *slot = column(channel.name())?;
        }

        let mut samples = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            // Header is line 1.
            let line = row + 2;

            let t: usize = csv_field(&record, t_col, "t", line)?
                .trim()
                .parse()
                .map_err(|_| AstraError::Format {
                    line,
                    message: "invalid step index".to_string(),
                })?;

            let mut values = [0.0_f64; CHANNEL_COUNT];
            for ((value, col), channel) in values.iter_mut().zip(channel_cols).zip(Channel::ALL) {
                *value = csv_field(&record, col, channel.name(), line)?
                    .trim()
                    .parse()
                    .map_err(|_| AstraError::Format {
                        line,
                        message: format!("invalid value for '{}'", channel.name()),
                    })?;
                if !value.is_finite() {
                    return Err(AstraError::Format {
                        line,
                        message: format!("non-finite value for '{}'", channel.name()),
                    });
                }
            }

            samples.push(TelemetrySample::new(
                t, values[0], values[1], values[2], values[3],
            ));
        }

        Self::from_samples(samples)
    }

    /// Import from a CSV file.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::read_csv(std::io::BufReader::new(file))
    }
}

fn csv_field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> Result<&'r str> {
    record.get(idx).ok_or_else(|| AstraError::Format {
        line,
        message: format!("missing value for '{name}'"),
    })
}

impl<'a> IntoIterator for &'a TelemetrySeries {
    type Item = &'a TelemetrySample;
    type IntoIter = std::slice::Iter<'a, TelemetrySample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
