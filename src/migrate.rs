use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Columns every table starts with (see [`crate::schema::Base`]).
const BASE_COLUMNS_DDL: &str = r#"
            id TEXT PRIMARY KEY,
            created INTEGER NOT NULL,
            updated INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            deleted INTEGER NOT NULL DEFAULT 0"#;

/// Entity tables in dependency order, with their specific columns.
pub const TABLES: &[(&str, &str)] = &[
    // common
    (
        "counties",
        r#"
            name TEXT NOT NULL UNIQUE,
            code INTEGER UNIQUE"#,
    ),
    (
        "sub_counties",
        r#"
            name TEXT NOT NULL,
            code INTEGER UNIQUE,
            county TEXT NOT NULL REFERENCES counties(id)"#,
    ),
    (
        "wards",
        r#"
            name TEXT NOT NULL,
            code INTEGER UNIQUE,
            sub_county TEXT NOT NULL REFERENCES sub_counties(id)"#,
    ),
    (
        "contact_types",
        r#"
            name TEXT NOT NULL UNIQUE,
            description TEXT"#,
    ),
    (
        "contacts",
        r#"
            contact TEXT NOT NULL,
            contact_type TEXT NOT NULL REFERENCES contact_types(id),
            UNIQUE(contact, contact_type)"#,
    ),
    // facilities
    (
        "owners",
        r#"
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            code TEXT NOT NULL UNIQUE"#,
    ),
    (
        "service_categories",
        r#"
            name TEXT NOT NULL UNIQUE,
            description TEXT"#,
    ),
    (
        "services",
        r#"
            name TEXT NOT NULL,
            description TEXT,
            code TEXT NOT NULL UNIQUE,
            category TEXT REFERENCES service_categories(id)"#,
    ),
    (
        "options",
        r#"
            value TEXT NOT NULL,
            display_text TEXT NOT NULL,
            option_type TEXT NOT NULL"#,
    ),
    (
        "service_options",
        r#"
            service TEXT NOT NULL REFERENCES services(id),
            option TEXT NOT NULL REFERENCES options(id),
            UNIQUE(service, option)"#,
    ),
    (
        "gis",
        r#"
            latitude TEXT NOT NULL,
            longitude TEXT NOT NULL,
            is_classified INTEGER NOT NULL DEFAULT 0"#,
    ),
    (
        "facility_statuses",
        r#"
            name TEXT NOT NULL"#,
    ),
    (
        "facility_types",
        r#"
            name TEXT NOT NULL"#,
    ),
    (
        "facilities",
        r#"
            name TEXT NOT NULL UNIQUE,
            code TEXT NOT NULL UNIQUE,
            gis TEXT UNIQUE REFERENCES gis(id),
            description TEXT NOT NULL,
            facility_type TEXT NOT NULL REFERENCES facility_types(id),
            number_of_beds INTEGER NOT NULL DEFAULT 0 CHECK (number_of_beds >= 0),
            number_of_cots INTEGER NOT NULL DEFAULT 0 CHECK (number_of_cots >= 0),
            open_whole_day INTEGER NOT NULL DEFAULT 0,
            open_whole_week INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL REFERENCES facility_statuses(id),
            sub_county TEXT NOT NULL REFERENCES sub_counties(id),
            owner TEXT NOT NULL REFERENCES owners(id)"#,
    ),
    (
        "facility_services",
        r#"
            facility TEXT NOT NULL REFERENCES facilities(id),
            service TEXT NOT NULL REFERENCES services(id),
            selected_option TEXT REFERENCES options(id),
            UNIQUE(facility, service)"#,
    ),
    (
        "service_ratings",
        r#"
            facility_service TEXT NOT NULL REFERENCES facility_services(id),
            cleanliness INTEGER NOT NULL DEFAULT 0,
            attitude INTEGER NOT NULL DEFAULT 0,
            will_return INTEGER NOT NULL DEFAULT 0,
            occasion TEXT NOT NULL,
            comment TEXT"#,
    ),
    (
        "practice_types",
        r#"
            name TEXT NOT NULL UNIQUE,
            description TEXT"#,
    ),
    (
        "specialities",
        r#"
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            practice_type TEXT NOT NULL REFERENCES practice_types(id)"#,
    ),
    (
        "qualifications",
        r#"
            name TEXT NOT NULL UNIQUE,
            description TEXT"#,
    ),
    (
        "practitioners",
        r#"
            name TEXT NOT NULL,
            registration_number TEXT NOT NULL UNIQUE,
            practice_type TEXT NOT NULL REFERENCES practice_types(id)"#,
    ),
    (
        "practitioner_qualifications",
        r#"
            practitioner TEXT NOT NULL REFERENCES practitioners(id),
            qualification TEXT NOT NULL REFERENCES qualifications(id),
            UNIQUE(practitioner, qualification)"#,
    ),
    (
        "practitioner_contacts",
        r#"
            practitioner TEXT NOT NULL REFERENCES practitioners(id),
            contact TEXT NOT NULL REFERENCES contacts(id),
            UNIQUE(practitioner, contact)"#,
    ),
    (
        "practitioner_facilities",
        r#"
            practitioner TEXT NOT NULL REFERENCES practitioners(id),
            facility TEXT NOT NULL REFERENCES facilities(id),
            UNIQUE(practitioner, facility)"#,
    ),
    // chul
    (
        "statuses",
        r#"
            name TEXT NOT NULL,
            description TEXT"#,
    ),
    (
        "approvers",
        r#"
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            abbreviation TEXT NOT NULL"#,
    ),
    (
        "approval_statuses",
        r#"
            name TEXT NOT NULL,
            description TEXT"#,
    ),
    (
        "communities",
        r#"
            name TEXT NOT NULL,
            code INTEGER UNIQUE,
            ward TEXT NOT NULL REFERENCES wards(id)"#,
    ),
    (
        "community_health_units",
        r#"
            name TEXT NOT NULL,
            code INTEGER UNIQUE,
            facility TEXT NOT NULL REFERENCES facilities(id),
            status TEXT NOT NULL REFERENCES statuses(id),
            community TEXT NOT NULL REFERENCES communities(id),
            households_monitored INTEGER NOT NULL DEFAULT 0 CHECK (households_monitored >= 0),
            date_established TEXT NOT NULL"#,
    ),
    (
        "community_health_unit_contacts",
        r#"
            health_unit TEXT NOT NULL REFERENCES community_health_units(id),
            contact TEXT NOT NULL REFERENCES contacts(id),
            UNIQUE(health_unit, contact)"#,
    ),
    (
        "community_health_unit_approvals",
        r#"
            approver TEXT NOT NULL REFERENCES approvers(id),
            approval_status TEXT NOT NULL REFERENCES approval_statuses(id),
            comment TEXT NOT NULL,
            approval_date TEXT NOT NULL,
            health_unit TEXT NOT NULL REFERENCES community_health_units(id)"#,
    ),
    (
        "community_health_workers",
        r#"
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            surname TEXT NOT NULL,
            id_number INTEGER NOT NULL UNIQUE CHECK (id_number >= 0),
            health_unit TEXT NOT NULL REFERENCES community_health_units(id),
            UNIQUE(id_number, health_unit)"#,
    ),
    (
        "community_health_worker_contacts",
        r#"
            health_worker TEXT NOT NULL REFERENCES community_health_workers(id),
            contact TEXT NOT NULL REFERENCES contacts(id),
            UNIQUE(health_worker, contact)"#,
    ),
    (
        "community_health_worker_approvals",
        r#"
            approver TEXT NOT NULL REFERENCES approvers(id),
            approval_status TEXT NOT NULL REFERENCES approval_statuses(id),
            comment TEXT NOT NULL,
            approval_date TEXT NOT NULL,
            health_worker TEXT NOT NULL REFERENCES community_health_workers(id)"#,
    ),
    (
        "facility_approvals",
        r#"
            approver TEXT NOT NULL REFERENCES approvers(id),
            approval_status TEXT NOT NULL REFERENCES approval_statuses(id),
            comment TEXT NOT NULL,
            approval_date TEXT NOT NULL,
            facility TEXT NOT NULL REFERENCES facilities(id)"#,
    ),
];

/// Creates every table and index. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Per-entity counters for sequence codes
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS code_sequences (
            name TEXT PRIMARY KEY,
            last_value INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for (table, columns) in TABLES {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} ({},{}\n        )",
            table, BASE_COLUMNS_DDL, columns
        );
        sqlx::query(&ddl).execute(pool).await?;

        // Listings are ordered and windowed by creation time
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_created ON {table}(created DESC)"
        ))
        .execute(pool)
        .await?;
    }

    tracing::info!(tables = TABLES.len(), "schema up to date");
    Ok(())
}

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}
