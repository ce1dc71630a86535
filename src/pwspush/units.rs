// Pwspush - Push personal weather station readings to Weather Underground
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

//! Unit conversions applied to readings before they are sent.
//!
//! Readings travel as decimal strings since that's what ends up in the query
//! string. The string level functions here return an empty string when their
//! input can't be parsed as a number. Callers treat an empty value as "not
//! available" and leave the parameter out of the request entirely.

/// inHg per hPa, 29.92 inHg / 1013.25 hPa
const INHG_PER_HPA: f64 = 0.02952874414014;

// Magnus formula coefficients
const MAGNUS_B: f64 = 17.62;
const MAGNUS_C: f64 = 243.12;

/// Temperature, in degrees celsius
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(transparent)]
pub struct TemperatureCelsius(f64);

impl From<TemperatureFahrenheit> for TemperatureCelsius {
    fn from(f: TemperatureFahrenheit) -> Self {
        TemperatureCelsius((f.0 - 32.0) * 5.0 / 9.0)
    }
}

impl From<f64> for TemperatureCelsius {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl From<TemperatureCelsius> for f64 {
    fn from(v: TemperatureCelsius) -> Self {
        v.0
    }
}

/// Temperature, in degrees fahrenheit
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(transparent)]
pub struct TemperatureFahrenheit(f64);

impl From<TemperatureCelsius> for TemperatureFahrenheit {
    fn from(c: TemperatureCelsius) -> Self {
        TemperatureFahrenheit(c.0 * 9.0 / 5.0 + 32.0)
    }
}

impl From<f64> for TemperatureFahrenheit {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl From<TemperatureFahrenheit> for f64 {
    fn from(v: TemperatureFahrenheit) -> Self {
        v.0
    }
}

/// Barometric pressure, in hectopascals (millibar)
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(transparent)]
pub struct PressureHectopascals(f64);

impl From<f64> for PressureHectopascals {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl From<PressureHectopascals> for f64 {
    fn from(v: PressureHectopascals) -> Self {
        v.0
    }
}

/// Barometric pressure, in inches of mercury
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(transparent)]
pub struct PressureInchesMercury(f64);

impl From<PressureHectopascals> for PressureInchesMercury {
    fn from(p: PressureHectopascals) -> Self {
        PressureInchesMercury(p.0 * INHG_PER_HPA)
    }
}

impl From<PressureInchesMercury> for f64 {
    fn from(v: PressureInchesMercury) -> Self {
        v.0
    }
}

/// Relative humidity, nominally from 0 to 100
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(transparent)]
pub struct Humidity(f64);

impl From<f64> for Humidity {
    fn from(v: f64) -> Self {
        Self(v)
    }
}

impl From<Humidity> for f64 {
    fn from(v: Humidity) -> Self {
        v.0
    }
}

/// Estimate the dewpoint from temperature and relative humidity using the
/// Magnus approximation.
///
/// No range checks are done on humidity: values above 100 produce a dewpoint
/// above the temperature instead of an error.
pub fn dewpoint(temperature: TemperatureCelsius, humidity: Humidity) -> TemperatureCelsius {
    let t = temperature.0;
    let k = (humidity.0.log10() - 2.0) / 0.4343 + (MAGNUS_B * t) / (MAGNUS_C + t);
    TemperatureCelsius(MAGNUS_C * k / (MAGNUS_B - k))
}

/// Parse a decimal reading, `None` if it isn't a finite number.
///
/// Values are parsed at single precision since that's all the precision any
/// station sensor reports and it keeps results stable across conversions.
pub(crate) fn parse_decimal(v: &str) -> Option<f64> {
    v.parse::<f32>().ok().filter(|f| f.is_finite()).map(f64::from)
}

fn format_decimal(v: f64) -> String {
    format!("{:.2}", v)
}

/// Convert a celsius reading to fahrenheit, formatted to two decimal places.
pub fn celsius_to_fahrenheit(c: &str) -> String {
    parse_decimal(c)
        .map(|v| TemperatureFahrenheit::from(TemperatureCelsius(v)))
        .map(|f| format_decimal(f.into()))
        .unwrap_or_default()
}

/// Convert a fahrenheit reading to celsius, formatted to two decimal places.
pub fn fahrenheit_to_celsius(f: &str) -> String {
    parse_decimal(f)
        .map(|v| TemperatureCelsius::from(TemperatureFahrenheit(v)))
        .map(|c| format_decimal(c.into()))
        .unwrap_or_default()
}

/// Convert a hectopascal reading to inches of mercury, formatted to two decimal places.
pub fn hpa_to_inhg(p: &str) -> String {
    parse_decimal(p)
        .map(|v| PressureInchesMercury::from(PressureHectopascals(v)))
        .map(|p| format_decimal(p.into()))
        .unwrap_or_default()
}

/// Dewpoint in celsius from a celsius temperature and relative humidity.
pub fn dewpoint_celsius(t: &str, h: &str) -> String {
    match (parse_decimal(t), parse_decimal(h)) {
        (Some(t), Some(h)) => {
            let d: f64 = dewpoint(TemperatureCelsius(t), Humidity(h)).into();
            // Humidity at or below zero has no dewpoint
            if d.is_finite() {
                format_decimal(d)
            } else {
                String::new()
            }
        }
        _ => String::new(),
    }
}

/// Dewpoint in fahrenheit from a fahrenheit temperature and relative humidity.
///
/// Intermediate values are rounded to two decimal places at each step, the
/// same as if each conversion were applied to a reading on its own.
pub fn dewpoint_fahrenheit(t: &str, h: &str) -> String {
    celsius_to_fahrenheit(&dewpoint_celsius(&fahrenheit_to_celsius(t), h))
}

#[cfg(test)]
mod test {
    use super::{
        celsius_to_fahrenheit, dewpoint, dewpoint_celsius, dewpoint_fahrenheit, fahrenheit_to_celsius, hpa_to_inhg,
        parse_decimal, Humidity, TemperatureCelsius,
    };

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert_eq!("32.00", celsius_to_fahrenheit("0"));
        assert_eq!("212.00", celsius_to_fahrenheit("100"));
        assert_eq!("-40.00", celsius_to_fahrenheit("-40"));
        assert_eq!("70.70", celsius_to_fahrenheit("21.5"));
    }

    #[test]
    fn test_fahrenheit_to_celsius() {
        assert_eq!("100.00", fahrenheit_to_celsius("212"));
        assert_eq!("0.00", fahrenheit_to_celsius("32.00"));
    }

    #[test]
    fn test_hpa_to_inhg() {
        assert_eq!("29.92", hpa_to_inhg("1013.25"));
        assert_eq!("29.53", hpa_to_inhg("1000"));
    }

    #[test]
    fn test_dewpoint_celsius_humidity_out_of_range() {
        // log10(200) = 0.30103 over the saturation term, 44.8178... by the closed form
        assert_eq!("44.82", dewpoint_celsius("32", "200"));
    }

    #[test]
    fn test_dewpoint_celsius_saturated() {
        assert_eq!("20.00", dewpoint_celsius("20", "100"));
    }

    #[test]
    fn test_dewpoint_celsius_no_humidity() {
        assert_eq!("", dewpoint_celsius("20", "0"));
        assert_eq!("", dewpoint_celsius("20", "-5"));
        assert_eq!("", dewpoint_fahrenheit("68", "0"));
    }

    #[test]
    fn test_dewpoint_fahrenheit() {
        // 32.00f -> 0.00c -> -9.20c dewpoint -> 15.44f
        assert_eq!("15.44", dewpoint_fahrenheit("32.00", "50"));
        assert_eq!("68.00", dewpoint_fahrenheit("68", "100"));
    }

    #[test]
    fn test_dewpoint_typed() {
        let d: f64 = dewpoint(TemperatureCelsius::from(0.0), Humidity::from(50.0)).into();
        assert!((d - -9.2019).abs() < 0.0001, "unexpected dewpoint {}", d);
    }

    #[test]
    fn test_unparseable_is_empty() {
        assert_eq!("", celsius_to_fahrenheit("abc"));
        assert_eq!("", fahrenheit_to_celsius(""));
        assert_eq!("", hpa_to_inhg("1013,25"));
        assert_eq!("", dewpoint_celsius("20", "wet"));
        assert_eq!("", dewpoint_celsius("hot", "50"));
        assert_eq!("", dewpoint_fahrenheit("abc", "50"));
    }

    #[test]
    fn test_parse_decimal_rejects_non_finite() {
        assert_eq!(None, parse_decimal("inf"));
        assert_eq!(None, parse_decimal("NaN"));
        assert_eq!(Some(21.5), parse_decimal("21.5"));
        assert_eq!(Some(-3.0), parse_decimal("-3"));
    }
}
