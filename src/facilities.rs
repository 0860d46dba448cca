//! Facilities and everything attached to them: ownership, services and
//! their options, ratings, GIS coordinates, practitioners and approvals.
//!
//! Labels (`Display`) are built from the record alone. Link and approval
//! records therefore show the ids of the records they join, e.g.
//! `<approver id>: <approval status id>: <subject id>`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqliteConnection;
use std::fmt;

use crate::chul::check_approval;
use crate::codes;
use crate::config::CodesConfig;
use crate::error::{RegistryResult, ValidationError};
use crate::schema::{record, today, Record};
use crate::validate;

/// Longest code an owner, service or facility may carry.
pub const CODE_MAX_LEN: usize = 100;

/// Allowed values of [`Choice::option_type`].
pub const OPTION_TYPES: &[&str] = &["BOOLEAN", "INTEGER", "DECIMAL", "TEXT"];

record! {
    pub struct Owner in "owners" {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub code: Option<String>,
    }
}

#[async_trait]
impl Record for Owner {
    const LABEL: &'static str = "owner";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)?;
        validate::max_len_opt("code", self.code.as_deref(), CODE_MAX_LEN)
    }

    async fn assign_code(
        &mut self,
        conn: &mut SqliteConnection,
        _codes: &CodesConfig,
    ) -> RegistryResult<()> {
        if codes::is_unset(&self.code) {
            self.code = Some(codes::prefixed(conn, "owners", "OWNER", CODE_MAX_LEN).await?);
        }
        Ok(())
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct ServiceCategory in "service_categories" {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
    }
}

impl Record for ServiceCategory {
    const LABEL: &'static str = "service category";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct Service in "services" {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default)]
        pub code: Option<String>,
        #[serde(default)]
        pub category: Option<String>,
    }
}

#[async_trait]
impl Record for Service {
    const LABEL: &'static str = "service";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 255)?;
        validate::max_len_opt("code", self.code.as_deref(), CODE_MAX_LEN)
    }

    async fn assign_code(
        &mut self,
        conn: &mut SqliteConnection,
        _codes: &CodesConfig,
    ) -> RegistryResult<()> {
        if codes::is_unset(&self.code) {
            self.code = Some(codes::prefixed(conn, "services", &self.name, CODE_MAX_LEN).await?);
        }
        Ok(())
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    /// A possible answer for a service, e.g. a level or a yes/no flag.
    pub struct Choice in "options" {
        pub value: String,
        pub display_text: String,
        pub option_type: String,
    }
}

impl Record for Choice {
    const LABEL: &'static str = "option";
    const SEARCH_FIELD: Option<&'static str> = Some("display_text");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("value", &self.value, 255)?;
        validate::text("display_text", &self.display_text, 255)?;
        validate::one_of("option_type", &self.option_type, OPTION_TYPES)
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.option_type, self.display_text)
    }
}

record! {
    pub struct ServiceOption in "service_options" {
        pub service: String,
        pub option: String,
    }
}

impl Record for ServiceOption {
    const LABEL: &'static str = "service option";

    fn validate(&self) -> Result<(), ValidationError> {
        validate::reference("service", &self.service)?;
        validate::reference("option", &self.option)
    }
}

impl fmt::Display for ServiceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.service, self.option)
    }
}

record! {
    pub struct Gis in "gis" {
        pub latitude: String,
        pub longitude: String,
        #[serde(default)]
        pub is_classified: bool,
    }
}

impl Record for Gis {
    const LABEL: &'static str = "GIS record";

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("latitude", &self.latitude, 255)?;
        validate::text("longitude", &self.longitude, 255)?;
        validate::coordinate("latitude", &self.latitude, 90.0)?;
        validate::coordinate("longitude", &self.longitude, 180.0)
    }
}

impl fmt::Display for Gis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

record! {
    pub struct FacilityStatus in "facility_statuses" {
        pub name: String,
    }
}

impl Record for FacilityStatus {
    const LABEL: &'static str = "facility status";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)
    }
}

impl fmt::Display for FacilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct FacilityType in "facility_types" {
        pub name: String,
    }
}

impl Record for FacilityType {
    const LABEL: &'static str = "facility type";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)
    }
}

impl fmt::Display for FacilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct Facility in "facilities" {
        pub name: String,
        #[serde(default)]
        pub code: Option<String>,
        /// At most one facility per GIS record.
        #[serde(default)]
        pub gis: Option<String>,
        pub description: String,
        pub facility_type: String,
        #[serde(default)]
        pub number_of_beds: u32,
        #[serde(default)]
        pub number_of_cots: u32,
        #[serde(default)]
        pub open_whole_day: bool,
        #[serde(default)]
        pub open_whole_week: bool,
        pub status: String,
        pub sub_county: String,
        pub owner: String,
    }
}

#[async_trait]
impl Record for Facility {
    const LABEL: &'static str = "facility";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)?;
        validate::max_len_opt("code", self.code.as_deref(), CODE_MAX_LEN)?;
        validate::not_blank("description", &self.description)?;
        validate::reference("facility_type", &self.facility_type)?;
        validate::reference("status", &self.status)?;
        validate::reference("sub_county", &self.sub_county)?;
        validate::reference("owner", &self.owner)
    }

    async fn assign_code(
        &mut self,
        conn: &mut SqliteConnection,
        codes: &CodesConfig,
    ) -> RegistryResult<()> {
        if codes::is_unset(&self.code) {
            self.code = Some(codes::random_facility_code(conn, codes).await?);
        }
        Ok(())
    }
}

impl fmt::Display for Facility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    /// A service offered at a facility, optionally with the selected option.
    pub struct FacilityService in "facility_services" {
        pub facility: String,
        pub service: String,
        #[serde(default)]
        pub selected_option: Option<String>,
    }
}

impl Record for FacilityService {
    const LABEL: &'static str = "facility service";

    fn validate(&self) -> Result<(), ValidationError> {
        validate::reference("facility", &self.facility)?;
        validate::reference("service", &self.service)
    }
}

impl fmt::Display for FacilityService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.facility, self.service)
    }
}

record! {
    pub struct ServiceRating in "service_ratings" {
        pub facility_service: String,
        #[serde(default)]
        pub cleanliness: bool,
        #[serde(default)]
        pub attitude: bool,
        #[serde(default)]
        pub will_return: bool,
        pub occasion: String,
        #[serde(default)]
        pub comment: Option<String>,
    }
}

impl Record for ServiceRating {
    const LABEL: &'static str = "service rating";

    fn validate(&self) -> Result<(), ValidationError> {
        validate::reference("facility_service", &self.facility_service)?;
        validate::text("occasion", &self.occasion, 100)
    }
}

impl fmt::Display for ServiceRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.facility_service, self.occasion)
    }
}

record! {
    pub struct FacilityApproval in "facility_approvals" {
        pub approver: String,
        pub approval_status: String,
        pub comment: String,
        #[serde(default = "today")]
        pub approval_date: NaiveDate,
        pub facility: String,
    }
}

impl Record for FacilityApproval {
    const LABEL: &'static str = "facility approval";

    fn validate(&self) -> Result<(), ValidationError> {
        check_approval(&self.approver, &self.approval_status, &self.comment)?;
        validate::reference("facility", &self.facility)
    }
}

impl fmt::Display for FacilityApproval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.approver, self.approval_status, self.facility)
    }
}

record! {
    pub struct PracticeType in "practice_types" {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
    }
}

impl Record for PracticeType {
    const LABEL: &'static str = "practice type";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)
    }
}

impl fmt::Display for PracticeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct Speciality in "specialities" {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
        pub practice_type: String,
    }
}

impl Record for Speciality {
    const LABEL: &'static str = "speciality";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)?;
        validate::reference("practice_type", &self.practice_type)
    }
}

impl fmt::Display for Speciality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct Qualification in "qualifications" {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
    }
}

impl Record for Qualification {
    const LABEL: &'static str = "qualification";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)
    }
}

impl fmt::Display for Qualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct Practitioner in "practitioners" {
        pub name: String,
        pub registration_number: String,
        pub practice_type: String,
    }
}

impl Record for Practitioner {
    const LABEL: &'static str = "practitioner";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 200)?;
        validate::text("registration_number", &self.registration_number, 100)?;
        validate::reference("practice_type", &self.practice_type)
    }
}

impl fmt::Display for Practitioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct PractitionerQualification in "practitioner_qualifications" {
        pub practitioner: String,
        pub qualification: String,
    }
}

impl Record for PractitionerQualification {
    const LABEL: &'static str = "practitioner qualification";

    fn validate(&self) -> Result<(), ValidationError> {
        validate::reference("practitioner", &self.practitioner)?;
        validate::reference("qualification", &self.qualification)
    }
}

impl fmt::Display for PractitionerQualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.practitioner, self.qualification)
    }
}

record! {
    pub struct PractitionerContact in "practitioner_contacts" {
        pub practitioner: String,
        pub contact: String,
    }
}

impl Record for PractitionerContact {
    const LABEL: &'static str = "practitioner contact";

    fn validate(&self) -> Result<(), ValidationError> {
        validate::reference("practitioner", &self.practitioner)?;
        validate::reference("contact", &self.contact)
    }
}

impl fmt::Display for PractitionerContact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.practitioner, self.contact)
    }
}

record! {
    pub struct PractitionerFacility in "practitioner_facilities" {
        pub practitioner: String,
        pub facility: String,
    }
}

impl Record for PractitionerFacility {
    const LABEL: &'static str = "practitioner facility";

    fn validate(&self) -> Result<(), ValidationError> {
        validate::reference("practitioner", &self.practitioner)?;
        validate::reference("facility", &self.facility)
    }
}

impl fmt::Display for PractitionerFacility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.practitioner, self.facility)
    }
}
