use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Order lines

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_lines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineEntity {
    pub id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::order_lines)]
pub struct CreateOrderLineEntity {
    pub product_id: i32,
    pub quantity: i32,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub user_id: i32,
    pub branch_id: i32,
    pub receive_type: String,
    pub address: Option<String>,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateOrderEntity {
    pub user_id: i32,
    pub branch_id: i32,
    pub receive_type: String,
    pub address: Option<String>,
    pub message: String,
    pub status: String,
}

// Line <-> order links

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::order_line_links)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineLinkEntity {
    pub order_id: i32,
    pub line_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_line_links)]
pub struct CreateOrderLineLinkEntity {
    pub order_id: i32,
    pub line_id: i32,
}

// Domain enums. Stored as text in the DB, camelCase on the wire.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ReceiveType {
    CashOnDelivery,
    CardOnDelivery,
    PickupAtBranch,
    CardAtBranch,
}

impl ReceiveType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReceiveType::CashOnDelivery => "CASH_ON_DELIVERY",
            ReceiveType::CardOnDelivery => "CARD_ON_DELIVERY",
            ReceiveType::PickupAtBranch => "PICKUP_AT_BRANCH",
            ReceiveType::CardAtBranch => "CARD_AT_BRANCH",
        }
    }

    /// Delivery variants require a delivery address; pickup variants must not
    /// carry one.
    pub fn is_delivery(self) -> bool {
        matches!(self, ReceiveType::CashOnDelivery | ReceiveType::CardOnDelivery)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Pending,
    InProcess,
    Ready,
    OnTheWay,
    Received,
    Deleted,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::InProcess => "IN_PROCESS",
            OrderStatus::Ready => "READY",
            OrderStatus::OnTheWay => "ON_THE_WAY",
            OrderStatus::Received => "RECEIVED",
            OrderStatus::Deleted => "DELETED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_variants_require_address() {
        assert!(ReceiveType::CashOnDelivery.is_delivery());
        assert!(ReceiveType::CardOnDelivery.is_delivery());
        assert!(!ReceiveType::PickupAtBranch.is_delivery());
        assert!(!ReceiveType::CardAtBranch.is_delivery());
    }

    #[test]
    fn status_names_are_camel_case_on_the_wire() {
        let status: OrderStatus = serde_json::from_str("\"onTheWay\"").unwrap();
        assert_eq!(status, OrderStatus::OnTheWay);
        assert_eq!(status.as_str(), "ON_THE_WAY");

        let receive: ReceiveType = serde_json::from_str("\"cashOnDelivery\"").unwrap();
        assert_eq!(receive, ReceiveType::CashOnDelivery);
    }

    #[test]
    fn unknown_status_is_rejected_at_the_boundary() {
        assert!(serde_json::from_str::<OrderStatus>("\"shipped\"").is_err());
    }
}
