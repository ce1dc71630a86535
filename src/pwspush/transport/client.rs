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

use crate::transport::core::{Transport, TransportError, TransportErrorKind};
use hyper::client::HttpConnector;
use hyper::{Body, Client, Uri};
use std::time::Duration;

/// Send updates using a Hyper HTTP client.
///
/// Only the status of the response is checked, anything other than a 2xx status
/// is treated as a failed update.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl HyperTransport {
    /// Create a new transport that gives up on a request after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }
}

impl Transport for HyperTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        let uri = url.parse::<Uri>().map_err(|e| {
            TransportError::KindMsgCause(TransportErrorKind::Request, "unable to parse update URL", Box::new(e))
        })?;

        let res = tokio::time::timeout(self.timeout, self.client.get(uri))
            .await
            .map_err(|_| TransportError::KindMsg(TransportErrorKind::Timeout, "timeout waiting for update response"))?
            .map_err(|e| {
                TransportError::KindMsgCause(
                    TransportErrorKind::Connection,
                    "unable to send update request",
                    Box::new(e),
                )
            })?;

        let status = res.status();
        tracing::debug!(message = "received update response", status = %status);

        if status.is_success() {
            Ok(status.to_string())
        } else {
            Err(TransportError::Status(status.to_string()))
        }
    }
}
