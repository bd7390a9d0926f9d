//! Service catalog and billing records

use chrono::{DateTime, Duration, Utc};
use kernel::id::{TransactionId, UserId, UserServiceId};
use serde::Serialize;

pub const USER_SERVICE_ACTIVE: &str = "active";
pub const TRANSACTION_OPEN: &str = "open";

/// Purchasable service. Prices are in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserService {
    pub id: UserServiceId,
    pub user_id: UserId,
    pub service_id: i64,
    pub status: String,
    pub progress: i32,
    pub created_at: DateTime<Utc>,
}

/// Open invoice line for a booked service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub amount_cents: i64,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub status: String,
    pub description: String,
}

/// A service booked for a user together with its invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAssignment {
    pub user_service: UserService,
    pub transaction: Transaction,
}

impl ServiceAssignment {
    pub fn new(user_id: UserId, service: &Service, payment_days: i64, now: DateTime<Utc>) -> Self {
        Self {
            user_service: UserService {
                id: UserServiceId::new(),
                user_id,
                service_id: service.id,
                status: USER_SERVICE_ACTIVE.to_string(),
                progress: 0,
                created_at: now,
            },
            transaction: Transaction {
                id: TransactionId::new(),
                user_id,
                amount_cents: service.price_cents,
                issued_at: now,
                due_at: now + Duration::days(payment_days),
                status: TRANSACTION_OPEN.to_string(),
                description: format!("Service: {}", service.name),
            },
        }
    }
}
