//! Reservation API client implementation

use crate::auth::TokenSource;
use crate::error;
use crate::types::{
    AssignmentResource, CapacityCommitmentResource, CreateAssignmentBody, CreateCommitmentBody,
    CreateReservationBody, ListAssignmentsResponse, ListCapacityCommitmentsResponse,
    ListReservationsResponse, ReservationResource,
};
use bq_reservations_core::service::ServiceResult;
use bq_reservations_core::{
    Assignment, Commitment, JobType, Page, Plan, Reservation, ReservationService, Scope,
};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::future::Future;

/// Production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://bigqueryreservation.googleapis.com/v1";

/// REST client for the BigQuery Reservation API v1
///
/// Cloning is cheap and shares the connection pool and token cache.
#[derive(Clone, Debug)]
pub struct RestReservationClient {
    http: Client,
    base_url: String,
    tokens: TokenSource,
}

impl RestReservationClient {
    /// Client against the production endpoint.
    #[must_use]
    pub fn new(tokens: TokenSource) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, tokens)
    }

    /// Client against a custom endpoint (emulators, tests).
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>, tokens: TokenSource) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Configured endpoint.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> ServiceResult<Response> {
        let token = self.tokens.token(&self.http).await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| error::from_transport(&e))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let err = error::from_response(status, &body);
        tracing::debug!(status = status.as_u16(), error = %err, "Reservation API call failed");
        Err(err)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> ServiceResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| error::from_decode(&e))
    }

    fn list_request(&self, path: &str, page_token: Option<&str>) -> RequestBuilder {
        let request = self.http.get(self.url(path));
        match page_token {
            Some(token) => request.query(&[("pageToken", token)]),
            None => request,
        }
    }

    async fn delete(&self, name: &str) -> ServiceResult<()> {
        self.send(self.http.request(Method::DELETE, self.url(name)))
            .await
            .map(|_| ())
    }
}

impl ReservationService for RestReservationClient {
    fn list_commitments(
        &self,
        scope: &Scope,
        page_token: Option<&str>,
    ) -> impl Future<Output = ServiceResult<Page<Commitment>>> + Send {
        let request = self.list_request(
            &format!("{}/capacityCommitments", scope.parent()),
            page_token,
        );
        async move {
            let wire: ListCapacityCommitmentsResponse = self.call(request).await?;
            Ok(wire.into())
        }
    }

    fn list_reservations(
        &self,
        scope: &Scope,
        page_token: Option<&str>,
    ) -> impl Future<Output = ServiceResult<Page<Reservation>>> + Send {
        let request = self.list_request(&format!("{}/reservations", scope.parent()), page_token);
        async move {
            let wire: ListReservationsResponse = self.call(request).await?;
            Ok(wire.into())
        }
    }

    fn list_assignments(
        &self,
        reservation_name: &str,
        page_token: Option<&str>,
    ) -> impl Future<Output = ServiceResult<Page<Assignment>>> + Send {
        let request = self.list_request(&format!("{reservation_name}/assignments"), page_token);
        async move {
            let wire: ListAssignmentsResponse = self.call(request).await?;
            Ok(wire.into())
        }
    }

    fn create_commitment(
        &self,
        scope: &Scope,
        plan: &Plan,
        slot_count: u64,
    ) -> impl Future<Output = ServiceResult<Commitment>> + Send {
        let request = self
            .http
            .post(self.url(&format!("{}/capacityCommitments", scope.parent())))
            .json(&CreateCommitmentBody {
                plan: plan.as_str(),
                slot_count,
            });
        async move {
            let wire: CapacityCommitmentResource = self.call(request).await?;
            Ok(wire.into())
        }
    }

    fn create_reservation(
        &self,
        scope: &Scope,
        reservation_id: &str,
        slot_capacity: u64,
    ) -> impl Future<Output = ServiceResult<Reservation>> + Send {
        let request = self
            .http
            .post(self.url(&format!("{}/reservations", scope.parent())))
            .query(&[("reservationId", reservation_id)])
            .json(&CreateReservationBody {
                slot_capacity,
                ignore_idle_slots: false,
            });
        async move {
            let wire: ReservationResource = self.call(request).await?;
            Ok(wire.into())
        }
    }

    fn create_assignment(
        &self,
        reservation_name: &str,
        job_type: &JobType,
        assignee: &str,
    ) -> impl Future<Output = ServiceResult<Assignment>> + Send {
        let request = self
            .http
            .post(self.url(&format!("{reservation_name}/assignments")))
            .json(&CreateAssignmentBody {
                job_type: job_type.as_str(),
                assignee,
            });
        async move {
            let wire: AssignmentResource = self.call(request).await?;
            Ok(wire.into())
        }
    }

    fn delete_assignment(&self, name: &str) -> impl Future<Output = ServiceResult<()>> + Send {
        self.delete(name)
    }

    fn delete_reservation(&self, name: &str) -> impl Future<Output = ServiceResult<()>> + Send {
        self.delete(name)
    }

    fn delete_commitment(&self, name: &str) -> impl Future<Output = ServiceResult<()>> + Send {
        self.delete(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = RestReservationClient::with_base_url(
            "http://localhost:9000/v1/",
            TokenSource::fixed("t"),
        );
        assert_eq!(client.base_url(), "http://localhost:9000/v1");
        assert_eq!(
            client.url("projects/p/locations/EU/reservations"),
            "http://localhost:9000/v1/projects/p/locations/EU/reservations"
        );
    }

    #[test]
    fn default_endpoint() {
        let client = RestReservationClient::new(TokenSource::fixed("t"));
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }
}
