//! Wire types for the Reservation API v1 JSON surface.
//!
//! Field names are camelCase on the wire. `int64` fields follow the Google
//! JSON mapping and may arrive either as numbers or as decimal strings.

use bq_reservations_core::{Assignment, Commitment, JobType, Page, Plan, Reservation};
use serde::{Deserialize, Deserializer, Serialize};

fn int64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Int64 {
        Number(u64),
        Text(String),
    }

    match Int64::deserialize(deserializer)? {
        Int64::Number(n) => Ok(n),
        Int64::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// `CapacityCommitment` resource.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityCommitmentResource {
    /// Full resource name.
    #[serde(default)]
    pub name: String,
    /// Plan name, e.g. `FLEX`.
    #[serde(default)]
    pub plan: Option<String>,
    /// Purchased slots.
    #[serde(default, deserialize_with = "int64")]
    pub slot_count: u64,
}

impl From<CapacityCommitmentResource> for Commitment {
    fn from(wire: CapacityCommitmentResource) -> Self {
        Self {
            name: wire.name,
            plan: wire.plan.as_deref().map(Plan::from_api).unwrap_or_default(),
            slot_count: wire.slot_count,
        }
    }
}

/// `Reservation` resource.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResource {
    /// Full resource name.
    #[serde(default)]
    pub name: String,
    /// Baseline slots.
    #[serde(default, deserialize_with = "int64")]
    pub slot_capacity: u64,
    /// Whether idle slots from other reservations are ignored.
    #[serde(default)]
    pub ignore_idle_slots: bool,
}

impl From<ReservationResource> for Reservation {
    fn from(wire: ReservationResource) -> Self {
        Self {
            name: wire.name,
            slot_capacity: wire.slot_capacity,
            ignore_idle_slots: wire.ignore_idle_slots,
        }
    }
}

/// `Assignment` resource.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResource {
    /// Full resource name.
    #[serde(default)]
    pub name: String,
    /// Job type, e.g. `QUERY`.
    #[serde(default)]
    pub job_type: Option<String>,
    /// Assignee path, e.g. `projects/my-project`.
    #[serde(default)]
    pub assignee: String,
}

impl From<AssignmentResource> for Assignment {
    fn from(wire: AssignmentResource) -> Self {
        Self {
            name: wire.name,
            job_type: wire.job_type.as_deref().map(JobType::from_api).unwrap_or_default(),
            assignee: wire.assignee,
        }
    }
}

/// Response of `capacityCommitments.list`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCapacityCommitmentsResponse {
    /// One page of commitments.
    #[serde(default)]
    pub capacity_commitments: Vec<CapacityCommitmentResource>,
    /// Token for the next page, absent or empty on the last one.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Response of `reservations.list`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReservationsResponse {
    /// One page of reservations.
    #[serde(default)]
    pub reservations: Vec<ReservationResource>,
    /// Token for the next page, absent or empty on the last one.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Response of `assignments.list`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListAssignmentsResponse {
    /// One page of assignments.
    #[serde(default)]
    pub assignments: Vec<AssignmentResource>,
    /// Token for the next page, absent or empty on the last one.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

fn page<W, T: From<W>>(items: Vec<W>, next_page_token: Option<String>) -> Page<T> {
    Page::new(
        items.into_iter().map(T::from).collect(),
        next_page_token.filter(|token| !token.is_empty()),
    )
}

impl From<ListCapacityCommitmentsResponse> for Page<Commitment> {
    fn from(wire: ListCapacityCommitmentsResponse) -> Self {
        page(wire.capacity_commitments, wire.next_page_token)
    }
}

impl From<ListReservationsResponse> for Page<Reservation> {
    fn from(wire: ListReservationsResponse) -> Self {
        page(wire.reservations, wire.next_page_token)
    }
}

impl From<ListAssignmentsResponse> for Page<Assignment> {
    fn from(wire: ListAssignmentsResponse) -> Self {
        page(wire.assignments, wire.next_page_token)
    }
}

/// Body of `capacityCommitments.create`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommitmentBody<'a> {
    /// Plan name.
    pub plan: &'a str,
    /// Slots to purchase.
    pub slot_count: u64,
}

/// Body of `reservations.create`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationBody {
    /// Baseline slots.
    pub slot_capacity: u64,
    /// Always `false`: the reservation may borrow idle slots.
    pub ignore_idle_slots: bool,
}

/// Body of `assignments.create`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentBody<'a> {
    /// Job type name.
    pub job_type: &'a str,
    /// Assignee path.
    pub assignee: &'a str,
}
