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

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Current readings of a station, parameter name to value.
///
/// Values are decimal numbers or API category codes, already formatted the way
/// they should appear in the request.
pub type ReadingSet = HashMap<String, String>;

/// Parameters accepted by the update API plus celsius and hectopascal aliases
/// that get converted before being sent.
///
/// See https://support.weather.com/s/article/PWS-Upload-Protocol
pub const API_PARAMETERS: &[&str] = &[
    "winddir",
    "windspeedmph",
    "windgustmph",
    "windgustdir",
    "windspdmph_avg2m",
    "winddir_avg2m",
    "windgustmph_10m",
    "windgustdir_10m",
    "humidity",
    "dewptf",
    "tempf",
    "rainin",
    "dailyrainin",
    "baromin",
    "weather",
    "clouds",
    "soiltempf",
    "soilmoisture",
    "leafwetness",
    "solarradiation",
    "visibility",
    "indoortempf",
    "indoorhumidity",
    // pollution
    "AqNO",
    "AqNO2T",
    "AqNO2",
    "AqNO2Y",
    "AqNOX",
    "AqNOY",
    "AqNO3",
    "AqSO4",
    "AqSO2",
    "AqSO2T",
    "AqCO",
    "AqCOT",
    "AqEC",
    "AqOC",
    "AqBC",
    "AqUV",
    "AqPM2.5",
    "AqPM10",
    "AqOZONE",
    // aliases
    "tempc",
    "indoortempc",
    "barohpa",
];

static ALLOWED_PARAMETERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| API_PARAMETERS.iter().copied().collect());

/// Return true if `key` is a parameter the update API (or one of our aliases) accepts.
pub fn is_allowed(key: &str) -> bool {
    ALLOWED_PARAMETERS.contains(key)
}

/// Return the first parameter of the reading set that isn't allowed, if any.
pub fn first_invalid(readings: &ReadingSet) -> Option<&str> {
    readings.keys().map(String::as_str).find(|k| !is_allowed(k))
}

/// Return true if every parameter of the reading set is allowed. A single unknown
/// parameter makes the whole set invalid.
pub fn is_valid(readings: &ReadingSet) -> bool {
    first_invalid(readings).is_none()
}
