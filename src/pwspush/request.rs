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

use crate::params::ReadingSet;
use crate::units::{celsius_to_fahrenheit, dewpoint_fahrenheit, hpa_to_inhg};
use chrono::{NaiveDateTime, Timelike, Utc};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Debug, Formatter};

/// Base of every update request, parameters are appended as the query string.
pub const UPDATE_URL: &str = "http://weatherstation.wunderground.com/weatherstation/updateweatherstation.php?";

/// Layout of the `dateutc` parameter, also the layout of dates provided by callers.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACTION: &str = "updateraw";

/// Parameters accepted in celsius or hectopascals: the parameter they are sent
/// as and their value in the units the API expects.
fn convert_alias(key: &str, value: &str) -> Option<(&'static str, String)> {
    match key {
        "tempc" => Some(("tempf", celsius_to_fahrenheit(value))),
        "indoortempc" => Some(("indoortempf", celsius_to_fahrenheit(value))),
        "barohpa" => Some(("baromin", hpa_to_inhg(value))),
        _ => None,
    }
}

fn is_alias(key: &str) -> bool {
    matches!(key, "tempc" | "indoortempc" | "barohpa")
}

/// Credentials and settings of a station that are part of every update.
#[derive(Clone)]
pub struct Identity {
    pub(crate) id: String,
    pub(crate) password: String,
    pub(crate) software_type: String,
    pub(crate) calculate_dewpoint: bool,
}

impl Identity {
    pub fn new<S>(id: S, password: S, software_type: S, calculate_dewpoint: bool) -> Self
    where
        S: Into<String>,
    {
        Self {
            id: id.into(),
            password: password.into(),
            software_type: software_type.into(),
            calculate_dewpoint,
        }
    }
}

impl Debug for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("password", &"<redacted>")
            .field("software_type", &self.software_type)
            .field("calculate_dewpoint", &self.calculate_dewpoint)
            .finish()
    }
}

/// Error parsing a date provided for an update
#[derive(Debug)]
pub enum DateFormatError {
    Parse(chrono::ParseError),
    Layout,
}

impl fmt::Display for DateFormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DateFormatError::Parse(ref e) => write!(f, "{}", e),
            DateFormatError::Layout => write!(f, "date must be exactly YYYY-MM-DD HH:MM:SS"),
        }
    }
}

impl Error for DateFormatError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DateFormatError::Parse(ref e) => Some(e),
            DateFormatError::Layout => None,
        }
    }
}

/// Use the provided date or the current UTC time if no date (or an empty date)
/// was provided.
///
/// Provided dates are assumed to already be UTC and must match `DATE_FORMAT`
/// exactly: zero padded fields, a single space between date and time, and no
/// leap seconds.
pub fn resolve_date(date: Option<&str>) -> Result<String, DateFormatError> {
    let d = match date.filter(|d| !d.is_empty()) {
        Some(d) => d,
        None => return Ok(Utc::now().format(DATE_FORMAT).to_string()),
    };

    let parsed = NaiveDateTime::parse_from_str(d, DATE_FORMAT).map_err(DateFormatError::Parse)?;
    // Leap seconds are represented as nanoseconds past one billion
    if parsed.nanosecond() >= 1_000_000_000 {
        return Err(DateFormatError::Layout);
    }

    // The parser accepts unpadded fields and extra whitespace, only take dates
    // that are already in their canonical form.
    let formatted = parsed.format(DATE_FORMAT).to_string();
    if formatted != d {
        return Err(DateFormatError::Layout);
    }

    Ok(formatted)
}

/// All parameters of a single update sent to the API.
#[derive(Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    params: BTreeMap<String, String>,
}

impl UpdateRequest {
    /// Build the parameters for an update from station identity, readings, and
    /// a date already in `DATE_FORMAT`.
    ///
    /// Celsius and hectopascal aliases are converted to the units the API expects.
    /// A reading that is empty (or can't be converted) is left out. If both a
    /// parameter and an alias for it are present, the parameter wins.
    pub fn new(identity: &Identity, readings: &ReadingSet, date: &str) -> Self {
        let mut params = BTreeMap::new();
        params.insert("ID".to_owned(), identity.id.clone());
        params.insert("PASSWORD".to_owned(), identity.password.clone());
        params.insert("dateutc".to_owned(), date.to_owned());

        for (k, v) in readings.iter().filter(|(k, _)| !is_alias(k)) {
            if !v.is_empty() {
                params.insert(k.clone(), v.clone());
            }
        }

        for (k, v) in readings {
            if let Some((name, converted)) = convert_alias(k, v) {
                if !converted.is_empty() && !params.contains_key(name) {
                    params.insert(name.to_owned(), converted);
                }
            }
        }

        // Derived from whatever temperature ends up being sent so that celsius
        // readings are covered too. Replaces any dewpoint from the readings.
        if identity.calculate_dewpoint {
            if let (Some(t), Some(h)) = (params.get("tempf"), params.get("humidity")) {
                let dewpoint = dewpoint_fahrenheit(t, h);
                if !dewpoint.is_empty() {
                    params.insert("dewptf".to_owned(), dewpoint);
                }
            }
        }

        params.insert("softwaretype".to_owned(), identity.software_type.clone());
        params.insert("action".to_owned(), ACTION.to_owned());

        tracing::debug!(
            message = "built update request",
            id = %identity.id,
            num_params = params.len(),
            dateutc = %date,
        );

        Self { params }
    }

    /// Value of a single parameter of the request, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// True if the request has a parameter named `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Number of parameters, including identity and fixed parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True if the request has no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Encoded form of the request: the update endpoint followed by all parameters
    /// as a query string, ordered by name.
    pub fn url(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.params.iter())
            .finish();

        format!("{}{}", UPDATE_URL, query)
    }
}

impl Debug for UpdateRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.params.iter() {
            if k == "PASSWORD" {
                map.entry(k, &"<redacted>");
            } else {
                map.entry(k, v);
            }
        }

        map.finish()
    }
}

#[cfg(test)]
mod test {
    use super::{resolve_date, DateFormatError, Identity, UpdateRequest, DATE_FORMAT, UPDATE_URL};
    use crate::params::ReadingSet;
    use chrono::{NaiveDateTime, Utc};

    const DATE: &str = "2022-03-14 15:09:26";

    fn identity(calculate_dewpoint: bool) -> Identity {
        Identity::new("KMABOSTO1", "hunter2", "pwspush-test", calculate_dewpoint)
    }

    fn readings(pairs: &[(&str, &str)]) -> ReadingSet {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_identity_and_fixed_params() {
        let req = UpdateRequest::new(&identity(false), &ReadingSet::new(), DATE);

        assert_eq!(Some("KMABOSTO1"), req.get("ID"));
        assert_eq!(Some("hunter2"), req.get("PASSWORD"));
        assert_eq!(Some(DATE), req.get("dateutc"));
        assert_eq!(Some("pwspush-test"), req.get("softwaretype"));
        assert_eq!(Some("updateraw"), req.get("action"));
        assert_eq!(5, req.len());
    }

    #[test]
    fn test_passthrough_unchanged() {
        let r = readings(&[("tempf", "70.1"), ("winddir", "230"), ("AqPM2.5", "12"), ("weather", "+RA")]);
        let req = UpdateRequest::new(&identity(false), &r, DATE);

        assert_eq!(Some("70.1"), req.get("tempf"));
        assert_eq!(Some("230"), req.get("winddir"));
        assert_eq!(Some("12"), req.get("AqPM2.5"));
        assert_eq!(Some("+RA"), req.get("weather"));
    }

    #[test]
    fn test_celsius_alias_converted() {
        let r = readings(&[("tempc", "0"), ("indoortempc", "21.5")]);
        let req = UpdateRequest::new(&identity(false), &r, DATE);

        assert_eq!(Some("32.00"), req.get("tempf"));
        assert_eq!(Some("70.70"), req.get("indoortempf"));
        assert!(!req.contains("tempc"));
        assert!(!req.contains("indoortempc"));
    }

    #[test]
    fn test_pressure_alias_converted() {
        let r = readings(&[("barohpa", "1013.25")]);
        let req = UpdateRequest::new(&identity(false), &r, DATE);

        assert_eq!(Some("29.92"), req.get("baromin"));
        assert!(!req.contains("barohpa"));
    }

    #[test]
    fn test_unparseable_alias_omitted() {
        let r = readings(&[("tempc", "abc"), ("humidity", "50")]);
        let req = UpdateRequest::new(&identity(true), &r, DATE);

        assert!(!req.contains("tempf"));
        assert!(!req.contains("tempc"));
        assert!(!req.contains("dewptf"));
        assert_eq!(Some("50"), req.get("humidity"));
    }

    #[test]
    fn test_empty_value_omitted() {
        let r = readings(&[("rainin", ""), ("humidity", "50")]);
        let req = UpdateRequest::new(&identity(false), &r, DATE);

        assert!(!req.contains("rainin"));
        assert_eq!(Some("50"), req.get("humidity"));
    }

    #[test]
    fn test_native_parameter_wins_over_alias() {
        let r = readings(&[("tempc", "0"), ("tempf", "40.0")]);
        let req = UpdateRequest::new(&identity(false), &r, DATE);

        assert_eq!(Some("40.0"), req.get("tempf"));
    }

    #[test]
    fn test_dewpoint_from_converted_celsius() {
        let r = readings(&[("tempc", "0"), ("humidity", "50")]);
        let req = UpdateRequest::new(&identity(true), &r, DATE);

        assert_eq!(Some("32.00"), req.get("tempf"));
        assert_eq!(Some("15.44"), req.get("dewptf"));
    }

    #[test]
    fn test_dewpoint_overwrites_reading() {
        let r = readings(&[("tempf", "32.00"), ("humidity", "50"), ("dewptf", "99")]);
        let req = UpdateRequest::new(&identity(true), &r, DATE);

        assert_eq!(Some("15.44"), req.get("dewptf"));
    }

    #[test]
    fn test_dewpoint_disabled() {
        let r = readings(&[("tempf", "32.00"), ("humidity", "50")]);
        let req = UpdateRequest::new(&identity(false), &r, DATE);

        assert!(!req.contains("dewptf"));
    }

    #[test]
    fn test_dewpoint_requires_humidity() {
        let r = readings(&[("tempf", "32.00"), ("dewptf", "20.1")]);
        let req = UpdateRequest::new(&identity(true), &r, DATE);

        assert_eq!(Some("20.1"), req.get("dewptf"));
    }

    #[test]
    fn test_dewpoint_failure_keeps_reading() {
        let r = readings(&[("tempf", "32.00"), ("humidity", "damp"), ("dewptf", "20.1")]);
        let req = UpdateRequest::new(&identity(true), &r, DATE);

        assert_eq!(Some("20.1"), req.get("dewptf"));
    }

    #[test]
    fn test_url_encoding() {
        let r = readings(&[("tempf", "70.1"), ("weather", "+RA")]);
        let req = UpdateRequest::new(&identity(false), &r, DATE);

        assert_eq!(
            format!(
                "{}ID=KMABOSTO1&PASSWORD=hunter2&action=updateraw&dateutc=2022-03-14+15%3A09%3A26&softwaretype=pwspush-test&tempf=70.1&weather=%2BRA",
                UPDATE_URL
            ),
            req.url()
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let req = UpdateRequest::new(&identity(false), &ReadingSet::new(), DATE);

        assert!(!format!("{:?}", req).contains("hunter2"));
        assert!(!format!("{:?}", identity(false)).contains("hunter2"));
    }

    #[test]
    fn test_resolve_date_provided() {
        assert_eq!(DATE, resolve_date(Some(DATE)).unwrap());
    }

    #[test]
    fn test_resolve_date_invalid() {
        assert!(resolve_date(Some("not-a-date")).is_err());
        assert!(resolve_date(Some("2022-03-14T15:09:26")).is_err());
        assert!(resolve_date(Some("2022-03-14 15:09:26Z")).is_err());
        assert!(resolve_date(Some("2022-13-14 15:09:26")).is_err());
    }

    #[test]
    fn test_resolve_date_not_strict_layout() {
        for date in [
            "2022-3-14 15:09:26",
            "2022-03-14 9:09:26",
            "2022-03-1415:09:26",
            "2022-03-14  15:09:26",
            "+2022-03-14 15:09:26",
            "2022-03-14 23:59:60",
        ] {
            match resolve_date(Some(date)) {
                Err(DateFormatError::Layout) => {}
                other => panic!("expected layout error for {:?}, got {:?}", date, other),
            }
        }
    }

    #[test]
    fn test_resolve_date_unparseable() {
        assert!(matches!(resolve_date(Some("not-a-date")), Err(DateFormatError::Parse(_))));
    }

    #[test]
    fn test_resolve_date_now() {
        let before = Utc::now().naive_utc() - chrono::Duration::seconds(1);
        let resolved = resolve_date(None).unwrap();
        let after = Utc::now().naive_utc();

        let parsed = NaiveDateTime::parse_from_str(&resolved, DATE_FORMAT).unwrap();
        assert!(parsed >= before && parsed <= after, "{} not near now", resolved);
        assert!(resolve_date(Some("")).is_ok());
    }
}
