use crate::entities::{
    payment_entity as payments, subscription_entity as subscriptions, PaymentStatus,
};
use crate::error::AppResult;
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;

#[derive(Clone)]
pub struct CustomerHistoryService {
    pool: Arc<DatabaseConnection>,
}

impl CustomerHistoryService {
    pub fn new(pool: Arc<DatabaseConnection>) -> Self {
        Self { pool }
    }

    /// A user is a new customer iff they have no paid payment AND no
    /// subscription record of any status.
    pub async fn is_new_customer(&self, user_id: i64) -> AppResult<bool> {
        is_new_customer_on(self.pool.as_ref(), user_id).await
    }
}

/// Two independent existence checks, not a join: payments and subscriptions
/// are separate histories and either one disqualifies.
pub(crate) async fn is_new_customer_on<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
) -> AppResult<bool> {
    let paid_payments = payments::Entity::find()
        .filter(payments::Column::UserId.eq(user_id))
        .filter(payments::Column::Status.eq(PaymentStatus::Paid))
        .count(db)
        .await?;
    if paid_payments > 0 {
        return Ok(false);
    }

    let subscription_records = subscriptions::Entity::find()
        .filter(subscriptions::Column::UserId.eq(user_id))
        .count(db)
        .await?;

    Ok(subscription_records == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    #[tokio::test]
    async fn new_customer_when_both_histories_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(0)], vec![count_row(0)]])
            .into_connection();

        let service = CustomerHistoryService::new(Arc::new(db));
        assert!(service.is_new_customer(7).await.unwrap());
    }

    #[tokio::test]
    async fn paid_payment_disqualifies() {
        // the subscription check is never reached
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(2)]])
            .into_connection();

        let service = CustomerHistoryService::new(Arc::new(db));
        assert!(!service.is_new_customer(7).await.unwrap());
    }

    #[tokio::test]
    async fn subscription_record_disqualifies() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(0)], vec![count_row(1)]])
            .into_connection();

        let service = CustomerHistoryService::new(Arc::new(db));
        assert!(!service.is_new_customer(7).await.unwrap());
    }
}
