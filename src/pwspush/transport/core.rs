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

use std::error::Error;
use std::fmt::{self, Formatter};
use std::future::Future;

/// Potential kinds of errors that can be encountered sending an update
#[derive(PartialEq, Eq, Debug, Hash, Clone, Copy)]
pub enum TransportErrorKind {
    Request,
    Connection,
    Status,
    Timeout,
}

impl TransportErrorKind {
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportErrorKind::Request => "request",
            TransportErrorKind::Connection => "connection",
            TransportErrorKind::Status => "status",
            TransportErrorKind::Timeout => "timeout",
        }
    }
}

/// Error sending an update request to the API
#[derive(Debug)]
pub enum TransportError {
    Status(String),
    KindMsg(TransportErrorKind, &'static str),
    KindMsgCause(TransportErrorKind, &'static str, Box<dyn Error + Send + Sync>),
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            TransportError::Status(_) => TransportErrorKind::Status,
            TransportError::KindMsg(kind, _) => *kind,
            TransportError::KindMsgCause(kind, _, _) => *kind,
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status(status) => write!(f, "unexpected response status: {}", status),
            TransportError::KindMsg(_, msg) => msg.fmt(f),
            TransportError::KindMsgCause(_, msg, ref e) => write!(f, "{}: {}", msg, e),
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TransportError::KindMsgCause(_, _, ref e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Abstraction around sending an encoded update to the API to allow for easier testing.
///
/// Implementations perform a `GET` of the complete URL and return the status of
/// the response (e.g. `200 OK`) on success. The response body is never examined.
/// Timeouts, if any, are up to the implementation.
pub trait Transport {
    fn get(&self, url: &str) -> impl Future<Output = Result<String, TransportError>> + Send;
}
