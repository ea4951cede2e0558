use crate::domain::constants::LISTING_ROUTE;
use crate::domain::errors::TransportError;
use crate::domain::models::{ListingResponse, RemoveRequest, RemoveResponse};
use reqwest::StatusCode;
use std::time::Duration;

/// Result of a removal request, as reported by the tracking server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed { archived: Vec<String>, missing: Vec<String> },
    Rejected { errors: Vec<String> },
}

/// Client side of the listing protocol.
pub trait ListingApi {
    fn fetch(&self) -> Result<ListingResponse, TransportError>;
    fn remove(&self, names: &[String]) -> Result<RemoveOutcome, TransportError>;
}

pub struct ListingClient {
    url: reqwest::Url,
    http: reqwest::blocking::Client,
}

impl ListingClient {
    pub fn new(base: &reqwest::Url, timeout: Duration) -> Result<Self, TransportError> {
        let url = base
            .join(LISTING_ROUTE)
            .map_err(|e| TransportError::Connect {
                host: base.to_string(),
                detail: e.to_string(),
            })?;
        let http = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, http })
    }
}

impl ListingApi for ListingClient {
    fn fetch(&self) -> Result<ListingResponse, TransportError> {
        tracing::debug!(url = %self.url, "fetching listing");
        let resp = self.http.get(self.url.clone()).send()?;
        if resp.status() != StatusCode::OK {
            return Err(TransportError::UnexpectedStatus(resp.status().as_u16()));
        }
        Ok(resp.json()?)
    }

    fn remove(&self, names: &[String]) -> Result<RemoveOutcome, TransportError> {
        let body = RemoveRequest {
            remove: names.to_vec(),
        };
        let resp = self.http.post(self.url.clone()).json(&body).send()?;
        match resp.status() {
            StatusCode::OK => {
                let parsed: RemoveResponse = resp.json()?;
                Ok(RemoveOutcome::Removed {
                    archived: parsed.archived,
                    missing: parsed.missing,
                })
            }
            StatusCode::BAD_REQUEST => {
                let parsed: RemoveResponse = resp.json()?;
                Ok(RemoveOutcome::Rejected {
                    errors: parsed.errors,
                })
            }
            other => Err(TransportError::UnexpectedStatus(other.as_u16())),
        }
    }
}
