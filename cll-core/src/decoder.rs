//! Conversion of raw frames into physical units.
//!
//! Every slot is timed relative to the end of the throttle pulse, which
//! includes a fixed latency. One of the two temperature slots carries that
//! latency alone (the offset); the smaller of the two is taken as the
//! offset and the larger as the active sensor. Each value is then
//! `(ticks - offset) / reference` scaled by a per-slot factor.

use crate::types::{FrameSlot, RawFrame};

/// Volts per unit.
pub const VOLTAGE_SCALE: f32 = 20.0;
/// Volts per unit.
pub const RIPPLE_SCALE: f32 = 4.0;
/// Amps per unit.
pub const CURRENT_SCALE: f32 = 50.0;
/// Milliseconds of throttle pulse per unit.
pub const THROTTLE_SCALE: f32 = 1.0;
/// Fraction of full output per unit.
pub const OUTPUT_POWER_SCALE: f32 = 0.2502;
/// Electrical RPM per unit.
pub const RPM_SCALE: f32 = 20_416.7;
/// Volts per unit.
pub const BEC_VOLTAGE_SCALE: f32 = 4.0;
/// Amps per unit.
pub const BEC_CURRENT_SCALE: f32 = 4.0;
/// Degrees Celsius per unit for the linear sensor.
pub const LINEAR_TEMP_SCALE: f32 = 30.0;

/// Values above this mean the NTC reading is off the curve.
const NTC_MAX_VALUE: f32 = 3.9;
const NTC_FLOOR_C: f32 = -40.0;
const NTC_ADC_SCALE: f32 = 63.8125;
const NTC_ADC_FULL: f32 = 255.0;
const NTC_R_SERIES: f32 = 10_200.0;
const NTC_R_NOMINAL: f32 = 10_000.0;
const NTC_BETA: f32 = 3455.0;
const NTC_T_NOMINAL_K: f32 = 298.0;
const KELVIN_OFFSET: f32 = 273.0;

/// Decoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// The frame has no reference pulse.
    NotReady,
}

/// Temperature sensor fitted to the ESC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TemperatureSensor {
    Linear,
    Ntc,
}

/// Decoded telemetry of one ESC.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Telemetry {
    /// Battery voltage in volts.
    pub voltage: f32,
    /// Battery ripple voltage in volts.
    pub ripple_voltage: f32,
    /// Motor current in amps.
    pub current: f32,
    /// Throttle pulse seen by the ESC in milliseconds.
    pub throttle: f32,
    /// Output power as a fraction of full.
    pub output_power: f32,
    /// Electrical RPM.
    pub rpm: f32,
    /// BEC voltage in volts.
    pub bec_voltage: f32,
    /// BEC current in amps.
    pub bec_current: f32,
    /// ESC temperature in degrees Celsius.
    pub temperature: f32,
}

/// Which temperature slot holds the offset and which sensor is active.
#[must_use]
pub fn temperature_source(frame: &RawFrame) -> (u16, TemperatureSensor) {
    let linear = frame[FrameSlot::LinearTemp];
    let ntc = frame[FrameSlot::NtcTemp];
    if linear < ntc {
        (linear, TemperatureSensor::Ntc)
    } else {
        (ntc, TemperatureSensor::Linear)
    }
}

/// Decode a raw frame. Pure: the same frame always yields the same result.
pub fn decode(frame: &RawFrame) -> Result<Telemetry, DecodeError> {
    if !frame.has_reference() {
        return Err(DecodeError::NotReady);
    }

    let (offset, sensor) = temperature_source(frame);
    let reference = f32::from(frame.reference());
    let value = |slot: FrameSlot| (f32::from(frame[slot]) - f32::from(offset)) / reference;

    let temperature = match sensor {
        TemperatureSensor::Linear => value(FrameSlot::LinearTemp) * LINEAR_TEMP_SCALE,
        TemperatureSensor::Ntc => ntc_celsius(value(FrameSlot::NtcTemp)),
    };

    Ok(Telemetry {
        voltage: value(FrameSlot::Voltage) * VOLTAGE_SCALE,
        ripple_voltage: value(FrameSlot::RippleVoltage) * RIPPLE_SCALE,
        current: value(FrameSlot::Current) * CURRENT_SCALE,
        throttle: value(FrameSlot::Throttle) * THROTTLE_SCALE,
        output_power: value(FrameSlot::OutputPower) * OUTPUT_POWER_SCALE,
        rpm: value(FrameSlot::Rpm) * RPM_SCALE,
        bec_voltage: value(FrameSlot::BecVoltage) * BEC_VOLTAGE_SCALE,
        bec_current: value(FrameSlot::BecCurrent) * BEC_CURRENT_SCALE,
        temperature,
    })
}

/// Beta-model thermistor curve behind the ESC's 8-bit ADC.
fn ntc_celsius(value: f32) -> f32 {
    if value > NTC_MAX_VALUE {
        return NTC_FLOOR_C;
    }
    let adc = value * NTC_ADC_SCALE;
    let resistance = adc * NTC_R_SERIES / (NTC_ADC_FULL - adc);
    1.0 / (libm::logf(resistance / NTC_R_NOMINAL) / NTC_BETA + 1.0 / NTC_T_NOMINAL_K) - KELVIN_OFFSET
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::types::FRAME_LEN;

    fn frame_with(values: &[(FrameSlot, u16)]) -> RawFrame {
        let mut ticks = [0u16; FRAME_LEN];
        ticks[0] = 1000;
        for &(slot, t) in values {
            ticks[slot.index()] = t;
        }
        RawFrame::new(ticks)
    }

    fn approx(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn test_rejects_frame_without_reference() {
        assert_eq!(decode(&RawFrame::EMPTY), Err(DecodeError::NotReady));
    }

    #[test]
    fn test_scaled_channels() {
        let frame = frame_with(&[
            (FrameSlot::Voltage, 1500),
            (FrameSlot::RippleVoltage, 600),
            (FrameSlot::Current, 1100),
            (FrameSlot::Throttle, 1700),
            (FrameSlot::OutputPower, 1500),
            (FrameSlot::Rpm, 1000),
            (FrameSlot::BecVoltage, 1750),
            (FrameSlot::BecCurrent, 750),
            (FrameSlot::LinearTemp, 500),
            (FrameSlot::NtcTemp, 1500),
        ]);
        let t = decode(&frame).unwrap();

        assert!(approx(t.voltage, 20.0, 1e-4));
        assert!(approx(t.ripple_voltage, 0.4, 1e-4));
        assert!(approx(t.current, 30.0, 1e-4));
        assert!(approx(t.throttle, 1.2, 1e-4));
        assert!(approx(t.output_power, 0.2502, 1e-5));
        assert!(approx(t.rpm, 10_208.35, 0.01));
        assert!(approx(t.bec_voltage, 5.0, 1e-4));
        assert!(approx(t.bec_current, 1.0, 1e-4));
    }

    #[test]
    fn test_smaller_temperature_slot_is_offset() {
        // Linear slot carries the offset, NTC slot is active
        let ntc = frame_with(&[(FrameSlot::LinearTemp, 100), (FrameSlot::NtcTemp, 300)]);
        assert_eq!(temperature_source(&ntc), (100, TemperatureSensor::Ntc));

        // Swapped: linear sensor active
        let linear = frame_with(&[(FrameSlot::LinearTemp, 300), (FrameSlot::NtcTemp, 100)]);
        assert_eq!(temperature_source(&linear), (100, TemperatureSensor::Linear));
        let t = decode(&linear).unwrap();
        assert!(approx(t.temperature, 0.2 * 30.0, 1e-4));
    }

    #[test]
    fn test_equal_temperature_slots() {
        let frame = frame_with(&[(FrameSlot::LinearTemp, 400), (FrameSlot::NtcTemp, 400)]);
        assert_eq!(temperature_source(&frame), (400, TemperatureSensor::Linear));
        assert_eq!(decode(&frame).unwrap().temperature, 0.0);
    }

    #[test]
    fn test_ntc_curve() {
        let frame = frame_with(&[(FrameSlot::LinearTemp, 500), (FrameSlot::NtcTemp, 1500)]);
        assert!(approx(decode(&frame).unwrap().temperature, 55.53, 0.05));

        let frame = frame_with(&[(FrameSlot::LinearTemp, 500), (FrameSlot::NtcTemp, 2500)]);
        assert!(approx(decode(&frame).unwrap().temperature, 24.44, 0.05));
    }

    #[test]
    fn test_ntc_off_curve_reads_floor() {
        let frame = frame_with(&[(FrameSlot::LinearTemp, 500), (FrameSlot::NtcTemp, 4500)]);
        assert_eq!(decode(&frame).unwrap().temperature, -40.0);
    }

    #[test]
    fn test_slot_below_offset_goes_negative() {
        let frame = frame_with(&[
            (FrameSlot::Current, 300),
            (FrameSlot::LinearTemp, 500),
            (FrameSlot::NtcTemp, 1500),
        ]);
        assert!(approx(decode(&frame).unwrap().current, -10.0, 1e-4));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let frame = frame_with(&[
            (FrameSlot::Voltage, 1234),
            (FrameSlot::Rpm, 4321),
            (FrameSlot::LinearTemp, 600),
            (FrameSlot::NtcTemp, 1900),
        ]);
        assert_eq!(decode(&frame), decode(&frame));
    }
}
