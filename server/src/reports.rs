//! Admin activity report and finance summary

use serde::Serialize;
use sqlx::PgPool;

/// Activity counts over a look-back window
#[derive(Debug, Serialize, sqlx::FromRow, PartialEq, Eq)]
pub struct ActivityReport {
    pub registrations: i64,
    pub kyc_submitted: i64,
    pub kyc_approved: i64,
    pub profile_unlocks: i64,
    pub favorites_added: i64,
    pub disputes_opened: i64,
    pub period_days: i64,
}

/// Money movement over a look-back window, in minor units
#[derive(Debug, Serialize, sqlx::FromRow, PartialEq, Eq)]
pub struct FinanceSummary {
    pub escrow_held: i64,
    pub escrow_released: i64,
    pub escrow_refunded: i64,
    pub commission_earned: i64,
    pub referral_payouts: i64,
    pub total_transactions: i64,
    pub period_days: i64,
}

pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn activity(&self, days: i64) -> Result<ActivityReport, sqlx::Error> {
        sqlx::query_as::<_, ActivityReport>(
            r#"
            WITH since AS (SELECT NOW() - make_interval(days => $1::int) AS t)
            SELECT
                (SELECT COUNT(*) FROM users, since WHERE created_at >= since.t) AS registrations,
                (SELECT COUNT(*) FROM kyc_documents, since
                    WHERE status = 'submitted' AND updated_at >= since.t) AS kyc_submitted,
                (SELECT COUNT(*) FROM kyc_documents, since
                    WHERE status = 'approved' AND reviewed_at >= since.t) AS kyc_approved,
                (SELECT COUNT(*) FROM marketplace_unlocks, since WHERE created_at >= since.t) AS profile_unlocks,
                (SELECT COUNT(*) FROM favorites, since WHERE created_at >= since.t) AS favorites_added,
                (SELECT COUNT(*) FROM disputes, since WHERE created_at >= since.t) AS disputes_opened,
                $1::bigint AS period_days
            "#,
        )
        .bind(days)
        .fetch_one(&self.pool)
        .await
    }

    /// Totals are taken from posted ledger rows; debits are reported as
    /// positive amounts.
    pub async fn finance(&self, days: i64) -> Result<FinanceSummary, sqlx::Error> {
        sqlx::query_as::<_, FinanceSummary>(
            r#"
            SELECT
                COALESCE(SUM(-amount) FILTER (WHERE type = 'escrow_hold'), 0)::bigint AS escrow_held,
                COALESCE(SUM(amount) FILTER (WHERE type = 'escrow_release'), 0)::bigint AS escrow_released,
                COALESCE(SUM(amount) FILTER (WHERE type = 'escrow_refund'), 0)::bigint AS escrow_refunded,
                COALESCE(SUM(-amount) FILTER (WHERE type = 'commission'), 0)::bigint AS commission_earned,
                COALESCE(SUM(amount) FILTER (WHERE type = 'referral_bonus'), 0)::bigint AS referral_payouts,
                COUNT(*) AS total_transactions,
                $1::bigint AS period_days
            FROM wallet_transactions
            WHERE status = 'posted'
              AND created_at >= NOW() - make_interval(days => $1::int)
            "#,
        )
        .bind(days)
        .fetch_one(&self.pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finance_summary_field_names() {
        let summary = FinanceSummary {
            escrow_held: 100,
            escrow_released: 90,
            escrow_refunded: 0,
            commission_earned: 10,
            referral_payouts: 0,
            total_transactions: 3,
            period_days: 30,
        };
        let json = serde_json::to_value(&summary).unwrap();
        for key in [
            "escrow_held",
            "escrow_released",
            "escrow_refunded",
            "commission_earned",
            "referral_payouts",
            "total_transactions",
            "period_days",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
