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

use crate::params::{self, ReadingSet};
use crate::request::{resolve_date, DateFormatError, Identity, UpdateRequest};
use crate::transport::{Transport, TransportError};
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Potential kinds of errors that can be encountered updating or pushing readings
#[derive(PartialEq, Eq, Debug, Hash, Clone, Copy)]
pub enum StationErrorKind {
    InvalidParameter,
    DateFormat,
    Upload,
}

impl StationErrorKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            StationErrorKind::InvalidParameter => "invalid_parameter",
            StationErrorKind::DateFormat => "date_format",
            StationErrorKind::Upload => "upload",
        }
    }
}

/// Error updating the readings of a station or pushing them to the API
#[derive(Debug)]
pub enum StationError {
    InvalidParameter(String),
    DateFormat(String, DateFormatError),
    Upload(TransportError),
}

impl StationError {
    pub fn kind(&self) -> StationErrorKind {
        match self {
            StationError::InvalidParameter(_) => StationErrorKind::InvalidParameter,
            StationError::DateFormat(_, _) => StationErrorKind::DateFormat,
            StationError::Upload(_) => StationErrorKind::Upload,
        }
    }
}

impl fmt::Display for StationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StationError::InvalidParameter(key) => write!(f, "invalid parameter: {}", key),
            StationError::DateFormat(date, ref e) => write!(f, "invalid date '{}': {}", date, e),
            StationError::Upload(ref e) => write!(f, "unable to upload readings: {}", e),
        }
    }
}

impl Error for StationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StationError::InvalidParameter(_) => None,
            StationError::DateFormat(_, ref e) => Some(e),
            StationError::Upload(ref e) => Some(e),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    readings: Arc<ReadingSet>,
    last_update: Option<DateTime<Utc>>,
    last_push: Option<DateTime<Utc>>,
}

/// A personal weather station and its most recent readings.
///
/// Readings are replaced by calls to `update_weather` and sent to the API by
/// calls to `push_update`. Both may be called concurrently from any number of
/// threads or tasks. A push always sends a complete set of readings installed
/// by a single update. No lock is held while a push waits on the network.
pub struct Station {
    identity: Identity,
    state: RwLock<State>,
}

impl Station {
    /// Create a new station with no readings.
    ///
    /// `software_type` is reported to the API with each update. If `calculate_dewpoint`
    /// is set, a dewpoint is computed from temperature and humidity readings and sent
    /// in place of any dewpoint reading.
    pub fn new<S>(id: S, password: S, software_type: S, calculate_dewpoint: bool) -> Self
    where
        S: Into<String>,
    {
        let station = Self {
            identity: Identity::new(id, password, software_type, calculate_dewpoint),
            state: RwLock::new(State::default()),
        };

        tracing::debug!(message = "created station", station = %station);
        station
    }

    // State is only ever replaced field by field, never left half written, so a
    // panic in another thread while holding the lock doesn't make it unusable.
    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn software_type(&self) -> &str {
        &self.identity.software_type
    }

    pub fn calculate_dewpoint(&self) -> bool {
        self.identity.calculate_dewpoint
    }

    /// Readings that will be sent by the next push.
    pub fn readings(&self) -> Arc<ReadingSet> {
        self.read_state().readings.clone()
    }

    /// Time readings were last replaced, `None` if they never have been.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.read_state().last_update
    }

    /// Time readings were last successfully pushed, `None` if they never have been.
    pub fn last_push(&self) -> Option<DateTime<Utc>> {
        self.read_state().last_push
    }

    /// Replace all readings of the station with `readings`.
    ///
    /// An error is returned and current readings are left as-is if any of the
    /// parameters aren't accepted by the API. Readings are never merged: any
    /// parameter not present in `readings` won't be sent by the next push.
    pub fn update_weather(&self, readings: ReadingSet) -> Result<(), StationError> {
        if let Some(key) = params::first_invalid(&readings) {
            return Err(StationError::InvalidParameter(key.to_owned()));
        }

        let num_readings = readings.len();
        let mut state = self.write_state();
        state.readings = Arc::new(readings);
        state.last_update = Some(Utc::now());
        drop(state);

        tracing::debug!(message = "updated station readings", id = %self.identity.id, num_readings = num_readings);
        Ok(())
    }

    /// Build the request the next push would send using current readings.
    ///
    /// `date` must be in the layout `YYYY-MM-DD HH:MM:SS` and UTC. If `None` or empty,
    /// the current time is used.
    pub fn build_request(&self, date: Option<&str>) -> Result<UpdateRequest, StationError> {
        let resolved =
            resolve_date(date).map_err(|e| StationError::DateFormat(date.unwrap_or_default().to_owned(), e))?;

        let readings = self.readings();
        Ok(UpdateRequest::new(&self.identity, &readings, &resolved))
    }

    /// Send current readings to the API using `transport`, returning the status
    /// of the response.
    ///
    /// An error is returned without sending anything if `date` can't be parsed
    /// (see `build_request`). An error is returned if the transport fails, in which
    /// case the time of the last push is not updated. Failed pushes aren't retried.
    pub async fn push_update<T>(&self, transport: &T, date: Option<&str>) -> Result<String, StationError>
    where
        T: Transport,
    {
        let request = self.build_request(date)?;
        let status = transport.get(&request.url()).await.map_err(StationError::Upload)?;

        self.write_state().last_push = Some(Utc::now());
        tracing::debug!(message = "pushed station readings", id = %self.identity.id, status = %status);
        Ok(status)
    }
}

fn display_time(t: Option<DateTime<Utc>>) -> String {
    t.map(|t| t.to_string()).unwrap_or_else(|| "never".to_owned())
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        write!(
            f,
            "Station Details - id: {}, Last Weather Update: {},  Last Push: {}",
            self.identity.id,
            display_time(state.last_update),
            display_time(state.last_push),
        )
    }
}

impl Debug for Station {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.read_state();
        f.debug_struct("Station")
            .field("identity", &self.identity)
            .field("readings", &state.readings)
            .field("last_update", &state.last_update)
            .field("last_push", &state.last_push)
            .finish()
    }
}
