//! Domain constants.
//!
//! Channel domains, diagnosis thresholds, mitigation deltas and damage
//! coefficients. These values are part of the mission model contract and are
//! referenced from here only.

/// Lower/upper bound for `battery` (percent).
pub const BATTERY_RANGE: (f64, f64) = (0.0, 100.0);
/// Plausible bound for `temperature` (°C).
pub const TEMPERATURE_RANGE: (f64, f64) = (-40.0, 150.0);
/// Lower/upper bound for `signal` (percent).
pub const SIGNAL_RANGE: (f64, f64) = (0.0, 100.0);
/// Lower/upper bound for `cpu_load` (percent).
pub const CPU_LOAD_RANGE: (f64, f64) = (0.0, 100.0);

// Diagnosis thresholds, checked in this order.

/// Above this temperature the vehicle is diagnosed as overheating.
pub const THERMAL_TEMPERATURE_C: f64 = 50.0;
/// Below this battery level the vehicle is diagnosed with a power fault.
pub const POWER_BATTERY_PCT: f64 = 35.0;
/// Below this signal level the vehicle is diagnosed with a comm fault.
pub const COMM_SIGNAL_PCT: f64 = 40.0;
/// Above this CPU load the vehicle is diagnosed as overloaded.
pub const CPU_OVERLOAD_PCT: f64 = 85.0;

// Mitigation deltas applied once per step while mitigating.

/// Cooling never drives temperature below this floor.
pub const COOLING_FLOOR_C: f64 = 20.0;
pub const THERMAL_TEMPERATURE_DELTA: f64 = -3.0;
pub const THERMAL_CPU_DELTA: f64 = -8.0;
pub const THERMAL_BATTERY_DELTA: f64 = -0.3;
pub const POWER_CPU_DELTA: f64 = -10.0;
pub const POWER_BATTERY_DELTA: f64 = 0.6;
pub const COMM_SIGNAL_DELTA: f64 = 12.0;
pub const COMM_CPU_DELTA: f64 = 2.0;
pub const COMM_BATTERY_DELTA: f64 = -0.2;
pub const CPU_CPU_DELTA: f64 = -15.0;
pub const CPU_BATTERY_DELTA: f64 = -0.2;

// Damage model: coefficient * distance past the safe limit.

pub const DAMAGE_BATTERY_FLOOR: f64 = 40.0;
pub const DAMAGE_BATTERY_WEIGHT: f64 = 0.6;
pub const DAMAGE_TEMPERATURE_CEILING: f64 = 45.0;
pub const DAMAGE_TEMPERATURE_WEIGHT: f64 = 1.2;
pub const DAMAGE_SIGNAL_FLOOR: f64 = 50.0;
pub const DAMAGE_SIGNAL_WEIGHT: f64 = 0.7;
pub const DAMAGE_CPU_CEILING: f64 = 80.0;
pub const DAMAGE_CPU_WEIGHT: f64 = 0.4;

/// Survival score is this budget minus total damage, floored at zero.
pub const SURVIVAL_BUDGET: f64 = 1000.0;

/// Default flag threshold is this quantile of the classified series' scores.
pub const DEFAULT_FLAG_QUANTILE: f64 = 0.96;
