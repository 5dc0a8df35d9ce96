//! Scope and resource types.
//!
//! Resources are identified by hierarchical path names assigned (or
//! qualified) by the server. Nothing here is persisted locally.

use std::fmt;

/// Location used when a request does not name one.
pub const DEFAULT_LOCATION: &str = "EU";

/// Slot count used when a request does not name one.
pub const DEFAULT_SLOTS: u64 = 100;

/// A `(project, location)` pair addressing where reservation resources live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope {
    project: String,
    location: String,
}

impl Scope {
    /// Create a scope for `project` in `location`.
    #[must_use]
    pub fn new(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: location.into(),
        }
    }

    /// Project id.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Location (region or multi-region), e.g. `EU`.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Parent path for commitments and reservations:
    /// `projects/{project}/locations/{location}`.
    #[must_use]
    pub fn parent(&self) -> String {
        format!("projects/{}/locations/{}", self.project, self.location)
    }

    /// Assignee path for binding this scope's project to a reservation.
    #[must_use]
    pub fn assignee(&self) -> String {
        format!("projects/{}", self.project)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parent())
    }
}

/// Commitment billing plan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Plan {
    /// Per-second billed, cancellable after 60 seconds.
    #[default]
    Flex,
    /// Monthly commitment.
    Monthly,
    /// Annual commitment.
    Annual,
    /// Any plan this crate does not model explicitly.
    Other(String),
}

impl Plan {
    /// Wire name, e.g. `FLEX`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Flex => "FLEX",
            Self::Monthly => "MONTHLY",
            Self::Annual => "ANNUAL",
            Self::Other(plan) => plan,
        }
    }

    /// Parse a wire name. Unknown names are kept verbatim.
    #[must_use]
    pub fn from_api(value: &str) -> Self {
        match value {
            "FLEX" => Self::Flex,
            "MONTHLY" => Self::Monthly,
            "ANNUAL" => Self::Annual,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of job an assignment routes to its reservation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum JobType {
    /// Interactive and batch queries.
    #[default]
    Query,
    /// Load, export and copy jobs.
    Pipeline,
    /// BigQuery ML jobs using external services.
    MlExternal,
    /// Any job type this crate does not model explicitly.
    Other(String),
}

impl JobType {
    /// Wire name, e.g. `QUERY`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Query => "QUERY",
            Self::Pipeline => "PIPELINE",
            Self::MlExternal => "ML_EXTERNAL",
            Self::Other(job_type) => job_type,
        }
    }

    /// Parse a wire name. Unknown names are kept verbatim.
    #[must_use]
    pub fn from_api(value: &str) -> Self {
        match value {
            "QUERY" => Self::Query,
            "PIPELINE" => Self::Pipeline,
            "ML_EXTERNAL" => Self::MlExternal,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A purchased block of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    /// Full resource name, assigned by the server.
    pub name: String,
    /// Billing plan.
    pub plan: Plan,
    /// Number of slots purchased.
    pub slot_count: u64,
}

/// A named allocation of slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    /// Full resource name: `{scope.parent}/reservations/{id}`.
    pub name: String,
    /// Baseline slot capacity.
    pub slot_capacity: u64,
    /// Whether idle slots from other reservations may be borrowed. Always
    /// created as `false`.
    pub ignore_idle_slots: bool,
}

impl Reservation {
    /// Client-chosen id (last path segment of [`Reservation::name`]).
    #[must_use]
    pub fn id(&self) -> &str {
        last_segment(&self.name)
    }
}

/// Binding of a reservation to a consumer for one job type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Full resource name: `{reservation}/assignments/{id}`.
    pub name: String,
    /// Job type routed to the reservation.
    pub job_type: JobType,
    /// Consumer path, e.g. `projects/my-project`.
    pub assignee: String,
}

impl Assignment {
    /// Name of the owning reservation, derived from the assignment path.
    #[must_use]
    pub fn reservation_name(&self) -> Option<&str> {
        self.name
            .rsplit_once("/assignments/")
            .map(|(parent, _)| parent)
    }
}

/// Resource kinds, used in logs and rollback reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Capacity commitment.
    Commitment,
    /// Reservation.
    Reservation,
    /// Assignment.
    Assignment,
}

impl ResourceKind {
    /// Lowercase label, e.g. `commitment`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Commitment => "commitment",
            Self::Reservation => "reservation",
            Self::Assignment => "assignment",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in server order.
    pub items: Vec<T>,
    /// Token for the next page; `None` on the last page.
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// Page followed by another page.
    #[must_use]
    pub const fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }

    /// Final page.
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
