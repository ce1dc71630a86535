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

//! Push personal weather station readings to the Weather Underground update API.
//!
//! ## Features
//!
//! `pwspush` keeps the latest readings of a personal weather station (PWS) and sends
//! them to the [Weather Underground PWS upload protocol]. Readings can be replaced
//! and pushed concurrently from different threads or tasks: a push always sends a
//! complete set of readings from a single update.
//!
//! * Readings are validated against the parameters the API accepts. An update with
//!   any unknown parameter is rejected as a whole.
//! * `tempc`, `indoortempc`, and `barohpa` may be used for temperatures in celsius and
//!   pressure in hectopascals. They are converted to `tempf`, `indoortempf`, and
//!   `baromin` before being sent.
//! * The dewpoint (`dewptf`) can optionally be computed from temperature and humidity.
//! * Readings that can't be converted are left out of the update instead of failing it.
//!
//! [Weather Underground PWS upload protocol]: https://support.weather.com/s/article/PWS-Upload-Protocol
//!
//! ## Library
//!
//! ```rust,no_run
//! use pwspush::station::Station;
//! use pwspush::transport::HyperTransport;
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), pwspush::station::StationError> {
//! let station = Station::new("KMABOSTO1", "password", "my-station/1.0", true);
//! let transport = HyperTransport::new(Duration::from_secs(10));
//!
//! let mut readings = HashMap::new();
//! readings.insert("tempc".to_owned(), "21.5".to_owned());
//! readings.insert("humidity".to_owned(), "40".to_owned());
//!
//! station.update_weather(readings)?;
//! station.push_update(&transport, None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Build
//!
//! `pwspush` is a Rust program and must be built from source using a [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Run
//!
//! The `pwspush` binary reads readings from a JSON file at an interval and pushes them.
//! Some other process (reading the sensors of your station) is expected to keep this
//! file up to date. An optional `date` (UTC, `YYYY-MM-DD HH:MM:SS`) is sent as the time
//! of the readings, otherwise the current time is used.
//!
//! ```json
//! {
//!   "date": "2022-03-14 15:09:26",
//!   "readings": {
//!     "tempc": "21.5",
//!     "humidity": "40",
//!     "barohpa": "1013.25",
//!     "winddir": "230"
//!   }
//! }
//! ```
//!
//! ```text
//! PWSPUSH_PASSWORD=secret ./pwspush --station-id KMABOSTO1 --readings /var/lib/pws/readings.json --calculate-dewpoint
//! ```
//!
//! ### Prometheus
//!
//! Prometheus metrics about updates and pushes are exposed on port `9783` at `/metrics`.
//!
//! * `pwspush_updates_total` - Total number of attempts to replace readings.
//! * `pwspush_pushes_total` - Total number of attempts to push readings.
//! * `pwspush_errors_total` - Total errors by type while updating or pushing.
//! * `pwspush_last_push_timestamp` - UNIX timestamp of the last successful push.
//!

pub mod http;
pub mod metrics;
pub mod params;
pub mod request;
pub mod station;
pub mod transport;
pub mod units;
