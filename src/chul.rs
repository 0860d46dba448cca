//! Community health units: the units themselves, the communities they
//! serve, their workers, contacts and approval records.
//!
//! Labels (`Display`) are built from the record alone. Link and approval
//! records therefore show the ids of the records they join, e.g.
//! `<approver id>: <approval status id>: <subject id>`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqliteConnection;
use std::fmt;

use crate::codes;
use crate::config::CodesConfig;
use crate::error::{RegistryResult, ValidationError};
use crate::schema::{record, today, Record};
use crate::validate;

/// Minimum number of digits in a worker's national id number.
pub const MIN_ID_NUMBER_DIGITS: usize = 7;

/// Checks shared by every approval record.
pub(crate) fn check_approval(
    approver: &str,
    approval_status: &str,
    comment: &str,
) -> Result<(), ValidationError> {
    validate::reference("approver", approver)?;
    validate::reference("approval_status", approval_status)?;
    validate::not_blank("comment", comment)
}

record! {
    /// Operational state of a unit, e.g. fully-functional or semi-functional.
    pub struct Status in "statuses" {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
    }
}

impl Record for Status {
    const LABEL: &'static str = "status";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 50)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    /// A body or person that approves units, workers and facilities.
    pub struct Approver in "approvers" {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
        pub abbreviation: String,
    }
}

impl Record for Approver {
    const LABEL: &'static str = "approver";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 150)?;
        validate::text("abbreviation", &self.abbreviation, 50)
    }
}

impl fmt::Display for Approver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct ApprovalStatus in "approval_statuses" {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
    }
}

impl Record for ApprovalStatus {
    const LABEL: &'static str = "approval status";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    /// An area within a ward.
    pub struct Community in "communities" {
        pub name: String,
        #[serde(default)]
        pub code: Option<i64>,
        pub ward: String,
    }
}

#[async_trait]
impl Record for Community {
    const LABEL: &'static str = "community";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)?;
        validate::reference("ward", &self.ward)
    }

    async fn assign_code(
        &mut self,
        conn: &mut SqliteConnection,
        _codes: &CodesConfig,
    ) -> RegistryResult<()> {
        codes::fill_sequence(conn, "communities", &mut self.code).await
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    /// A service delivery structure covering roughly 5,000 people, tied to a
    /// facility and located in a community.
    pub struct CommunityHealthUnit in "community_health_units" {
        pub name: String,
        #[serde(default)]
        pub code: Option<i64>,
        pub facility: String,
        pub status: String,
        pub community: String,
        #[serde(default)]
        pub households_monitored: u32,
        #[serde(default = "today")]
        pub date_established: NaiveDate,
    }
}

#[async_trait]
impl Record for CommunityHealthUnit {
    const LABEL: &'static str = "community health unit";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)?;
        validate::reference("facility", &self.facility)?;
        validate::reference("status", &self.status)?;
        validate::reference("community", &self.community)
    }

    async fn assign_code(
        &mut self,
        conn: &mut SqliteConnection,
        _codes: &CodesConfig,
    ) -> RegistryResult<()> {
        codes::fill_sequence(conn, "community_health_units", &mut self.code).await
    }
}

impl fmt::Display for CommunityHealthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct CommunityHealthUnitContact in "community_health_unit_contacts" {
        pub health_unit: String,
        pub contact: String,
    }
}

impl Record for CommunityHealthUnitContact {
    const LABEL: &'static str = "community health unit contact";

    fn validate(&self) -> Result<(), ValidationError> {
        validate::reference("health_unit", &self.health_unit)?;
        validate::reference("contact", &self.contact)
    }
}

impl fmt::Display for CommunityHealthUnitContact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.health_unit, self.contact)
    }
}

record! {
    pub struct CommunityHealthUnitApproval in "community_health_unit_approvals" {
        pub approver: String,
        pub approval_status: String,
        pub comment: String,
        #[serde(default = "today")]
        pub approval_date: NaiveDate,
        pub health_unit: String,
    }
}

impl Record for CommunityHealthUnitApproval {
    const LABEL: &'static str = "community health unit approval";

    fn validate(&self) -> Result<(), ValidationError> {
        check_approval(&self.approver, &self.approval_status, &self.comment)?;
        validate::reference("health_unit", &self.health_unit)
    }
}

impl fmt::Display for CommunityHealthUnitApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.approver, self.approval_status, self.health_unit)
    }
}

record! {
    /// A person in charge of a community health area. Whether the worker is
    /// still serving is carried by `active`.
    pub struct CommunityHealthWorker in "community_health_workers" {
        pub first_name: String,
        pub last_name: String,
        pub surname: String,
        pub id_number: u32,
        pub health_unit: String,
    }
}

impl CommunityHealthWorker {
    pub fn validate_id_number(&self) -> Result<(), ValidationError> {
        validate::min_digits(
            "id_number",
            self.id_number,
            MIN_ID_NUMBER_DIGITS,
            "The id number given is too small.",
        )
    }
}

impl Record for CommunityHealthWorker {
    const LABEL: &'static str = "community health worker";
    const SEARCH_FIELD: Option<&'static str> = Some("first_name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("first_name", &self.first_name, 50)?;
        validate::text("last_name", &self.last_name, 50)?;
        validate::text("surname", &self.surname, 50)?;
        self.validate_id_number()?;
        validate::reference("health_unit", &self.health_unit)
    }
}

impl fmt::Display for CommunityHealthWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id_number)
    }
}

record! {
    pub struct CommunityHealthWorkerContact in "community_health_worker_contacts" {
        pub health_worker: String,
        pub contact: String,
    }
}

impl Record for CommunityHealthWorkerContact {
    const LABEL: &'static str = "community health worker contact";

    fn validate(&self) -> Result<(), ValidationError> {
        validate::reference("health_worker", &self.health_worker)?;
        validate::reference("contact", &self.contact)
    }
}

impl fmt::Display for CommunityHealthWorkerContact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.health_worker, self.contact)
    }
}

record! {
    pub struct CommunityHealthWorkerApproval in "community_health_worker_approvals" {
        pub approver: String,
        pub approval_status: String,
        pub comment: String,
        #[serde(default = "today")]
        pub approval_date: NaiveDate,
        pub health_worker: String,
    }
}

impl Record for CommunityHealthWorkerApproval {
    const LABEL: &'static str = "community health worker approval";

    fn validate(&self) -> Result<(), ValidationError> {
        check_approval(&self.approver, &self.approval_status, &self.comment)?;
        validate::reference("health_worker", &self.health_worker)
    }
}

impl fmt::Display for CommunityHealthWorkerApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.approver, self.approval_status, self.health_worker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Base;

    fn worker(id_number: u32) -> CommunityHealthWorker {
        CommunityHealthWorker {
            base: Base::default(),
            first_name: "Achieng".to_string(),
            last_name: "Otieno".to_string(),
            surname: "Atieno".to_string(),
            id_number,
            health_unit: "unit-1".to_string(),
        }
    }

    #[test]
    fn test_short_id_number_is_rejected() {
        let err = worker(123_456).validate().unwrap_err();
        assert_eq!(err.field, "id_number");
        assert_eq!(err.message, "The id number given is too small.");
    }

    #[test]
    fn test_seven_digit_id_number_is_accepted() {
        assert!(worker(1_234_567).validate().is_ok());
        assert_eq!(worker(1_234_567).to_string(), "1234567");
    }

    #[test]
    fn test_approval_requires_comment() {
        let approval = CommunityHealthWorkerApproval {
            base: Base::default(),
            approver: "a".to_string(),
            approval_status: "s".to_string(),
            comment: " ".to_string(),
            approval_date: today(),
            health_worker: "w".to_string(),
        };
        assert_eq!(approval.validate().unwrap_err().field, "comment");
        assert_eq!(approval.to_string(), "a: s: w");
    }

    #[test]
    fn test_unit_defaults_from_json() {
        let unit: CommunityHealthUnit = serde_json::from_value(serde_json::json!({
            "name": "Kibera Unit",
            "facility": "f",
            "status": "s",
            "community": "c"
        }))
        .unwrap();
        assert_eq!(unit.households_monitored, 0);
        assert_eq!(unit.date_established, today());
        assert!(unit.code.is_none());
        assert!(unit.base.active);
    }
}
