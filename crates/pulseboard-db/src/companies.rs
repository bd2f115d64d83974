//! Database operations for `companies`, `company_mappings`, `users`, and
//! `user_companies`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use pulseboard_core::{CompaniesFile, Platform};
use pulseboard_engine::Mapping;

use crate::DbError;

/// A row from the `companies` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyRow {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// All active companies, ordered by name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_companies(pool: &PgPool) -> Result<Vec<CompanyRow>, DbError> {
    let rows = sqlx::query_as::<_, CompanyRow>(
        "SELECT id, name, slug, is_active, notes, created_at \
         FROM companies WHERE is_active ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Ids of all active companies, for run scoping.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_company_ids(pool: &PgPool) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM companies WHERE is_active ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Look up a company by slug.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_company_by_slug(
    pool: &PgPool,
    slug: &str,
) -> Result<Option<CompanyRow>, DbError> {
    let row = sqlx::query_as::<_, CompanyRow>(
        "SELECT id, name, slug, is_active, notes, created_at \
         FROM companies WHERE slug = $1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// The provider mappings configured for one company.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::Decode`]
/// if a stored platform code is unknown.
pub async fn list_mappings(pool: &PgPool, company_id: i64) -> Result<Vec<Mapping>, DbError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT platform, account_ref FROM company_mappings \
         WHERE company_id = $1 ORDER BY platform",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(platform, account_ref)| {
            let platform: Platform = platform.parse().map_err(|e| DbError::Decode {
                context: format!("company_mappings.platform for company {company_id}"),
                reason: format!("{e}"),
            })?;
            Ok(Mapping {
                platform,
                account_ref,
            })
        })
        .collect()
}

/// Companies visible to a user.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn companies_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT uc.company_id FROM user_companies uc \
         JOIN companies c ON c.id = uc.company_id \
         WHERE uc.user_id = $1 AND c.is_active \
         ORDER BY uc.company_id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

/// Upsert one company and its mappings from the seed file shape.
///
/// Returns the company id. Conflicts on `slug` update the name and notes;
/// mappings are replaced per platform.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
async fn upsert_company(
    pool: &PgPool,
    config: &pulseboard_core::CompanyConfig,
) -> Result<i64, DbError> {
    let company_id: i64 = sqlx::query_scalar(
        "INSERT INTO companies (name, slug, notes) VALUES ($1, $2, $3) \
         ON CONFLICT (slug) DO UPDATE SET \
             name = EXCLUDED.name, notes = EXCLUDED.notes, updated_at = NOW() \
         RETURNING id",
    )
    .bind(&config.name)
    .bind(config.slug())
    .bind(&config.notes)
    .fetch_one(pool)
    .await?;

    for (platform, account_ref) in config.mappings() {
        sqlx::query(
            "INSERT INTO company_mappings (company_id, platform, account_ref) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (company_id, platform) DO UPDATE SET \
                 account_ref = EXCLUDED.account_ref",
        )
        .bind(company_id)
        .bind(platform.as_str())
        .bind(account_ref)
        .execute(pool)
        .await?;
    }

    Ok(company_id)
}

/// Seed all companies from the validated configuration file.
///
/// Returns `(companies, mappings)` counts.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any upsert fails.
pub async fn seed_companies(
    pool: &PgPool,
    file: &CompaniesFile,
) -> Result<(usize, usize), DbError> {
    let mut mapping_count = 0;
    for company in &file.companies {
        upsert_company(pool, company).await?;
        mapping_count += company.mappings().len();
    }
    Ok((file.companies.len(), mapping_count))
}

/// Upsert a user by email and replace their company access list.
///
/// Returns the user id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn upsert_user_with_companies(
    pool: &PgPool,
    email: &str,
    company_ids: &[i64],
) -> Result<i64, DbError> {
    let user_id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email) VALUES ($1) \
         ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email \
         RETURNING id",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;

    sqlx::query("DELETE FROM user_companies WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    for company_id in company_ids {
        sqlx::query(
            "INSERT INTO user_companies (user_id, company_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(company_id)
        .execute(pool)
        .await?;
    }

    Ok(user_id)
}
