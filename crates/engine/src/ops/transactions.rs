//! Transaction queries: filtered listing and the grouped summary report.

use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, Statement, prelude::*};
use uuid::Uuid;

use crate::{
    CategorySummary, ResultEngine, Transaction, TransactionKind, TransactionListFilter,
    transactions,
};

use super::Engine;

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 100;

impl Engine {
    /// Lists an owner's transactions, newest first.
    pub async fn list_transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::OccurredAt);

        if let Some(account_id) = filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id.to_string()));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(transactions::Column::CategoryId.eq(category_id.to_string()));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::OccurredAt.lte(to));
        }

        let limit = filter
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        let models = query.limit(limit).all(&self.database).await?;

        models.into_iter().map(Transaction::try_from).collect()
    }

    /// Income/expense totals per category over a closed date range.
    pub async fn transaction_summary(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultEngine<Vec<CategorySummary>> {
        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT category_id, kind, COALESCE(SUM(amount_minor), 0) AS total \
             FROM transactions \
             WHERE user_id = ? AND occurred_at >= ? AND occurred_at <= ? \
             GROUP BY category_id, kind \
             ORDER BY total DESC",
            vec![user_id.into(), from.into(), to.into()],
        );

        let rows = self.database.query_all(stmt).await?;
        let mut totals = Vec::with_capacity(rows.len());
        for row in rows {
            let category_id: String = row.try_get("", "category_id")?;
            let kind: String = row.try_get("", "kind")?;
            let total: i64 = row.try_get("", "total")?;
            let Ok(category_id) = Uuid::parse_str(&category_id) else {
                continue;
            };
            totals.push(CategorySummary {
                category_id,
                kind: TransactionKind::try_from(kind.as_str())?,
                total_minor: total,
            });
        }
        Ok(totals)
    }
}
