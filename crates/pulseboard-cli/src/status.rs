//! The `status` subcommand: per-platform sync health at a glance.

use chrono::Utc;
use sqlx::PgPool;

use pulseboard_engine::classify;

/// Print one line per (company, platform) status record.
pub(crate) async fn run_status(pool: &PgPool, company_slug: Option<&str>) -> anyhow::Result<()> {
    let scope = match company_slug {
        Some(slug) => {
            let company = pulseboard_db::get_company_by_slug(pool, slug)
                .await?
                .ok_or_else(|| anyhow::anyhow!("company '{slug}' not found"))?;
            Some(vec![company.id])
        }
        None => None,
    };

    let records = pulseboard_db::status::list_status(pool, scope.as_deref()).await?;
    if records.is_empty() {
        println!("no sync status recorded yet");
        return Ok(());
    }

    let now = Utc::now();
    for record in &records {
        let display = classify(record, now);
        let last_success = record
            .last_success_at
            .map_or_else(|| "never".to_string(), |at| at.to_rfc3339());
        println!(
            "company {} {:>4}: {:?} (failures: {}, last success: {}{})",
            record.company_id,
            record.platform.as_str(),
            display,
            record.consecutive_failures,
            last_success,
            record
                .last_error
                .as_deref()
                .map(|e| format!(", last error: {e}"))
                .unwrap_or_default()
        );
    }
    Ok(())
}
