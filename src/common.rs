//! Administrative geography (county → sub-county → ward) and contacts.

use async_trait::async_trait;
use sqlx::SqliteConnection;
use std::fmt;

use crate::codes;
use crate::config::CodesConfig;
use crate::error::{RegistryResult, ValidationError};
use crate::schema::{record, Record};
use crate::validate;

record! {
    pub struct County in "counties" {
        pub name: String,
        #[serde(default)]
        pub code: Option<i64>,
    }
}

#[async_trait]
impl Record for County {
    const LABEL: &'static str = "county";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)
    }

    async fn assign_code(
        &mut self,
        conn: &mut SqliteConnection,
        _codes: &CodesConfig,
    ) -> RegistryResult<()> {
        codes::fill_sequence(conn, "counties", &mut self.code).await
    }
}

impl fmt::Display for County {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct SubCounty in "sub_counties" {
        pub name: String,
        #[serde(default)]
        pub code: Option<i64>,
        pub county: String,
    }
}

#[async_trait]
impl Record for SubCounty {
    const LABEL: &'static str = "sub-county";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)?;
        validate::reference("county", &self.county)
    }

    async fn assign_code(
        &mut self,
        conn: &mut SqliteConnection,
        _codes: &CodesConfig,
    ) -> RegistryResult<()> {
        codes::fill_sequence(conn, "sub_counties", &mut self.code).await
    }
}

impl fmt::Display for SubCounty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct Ward in "wards" {
        pub name: String,
        #[serde(default)]
        pub code: Option<i64>,
        pub sub_county: String,
    }
}

#[async_trait]
impl Record for Ward {
    const LABEL: &'static str = "ward";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)?;
        validate::reference("sub_county", &self.sub_county)
    }

    async fn assign_code(
        &mut self,
        conn: &mut SqliteConnection,
        _codes: &CodesConfig,
    ) -> RegistryResult<()> {
        codes::fill_sequence(conn, "wards", &mut self.code).await
    }
}

impl fmt::Display for Ward {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    /// Kind of contact, e.g. email, mobile or fax.
    pub struct ContactType in "contact_types" {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
    }
}

impl Record for ContactType {
    const LABEL: &'static str = "contact type";
    const SEARCH_FIELD: Option<&'static str> = Some("name");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("name", &self.name, 100)
    }
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

record! {
    pub struct Contact in "contacts" {
        pub contact: String,
        pub contact_type: String,
    }
}

impl Record for Contact {
    const LABEL: &'static str = "contact";
    const SEARCH_FIELD: Option<&'static str> = Some("contact");

    fn validate(&self) -> Result<(), ValidationError> {
        validate::text("contact", &self.contact, 100)?;
        validate::reference("contact_type", &self.contact_type)
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.contact_type, self.contact)
    }
}
