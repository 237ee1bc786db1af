use std::collections::HashMap;

use anyhow::Context;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::core::app_error::AppError;
use crate::models::{
    CreateOrderEntity, CreateOrderLineEntity, CreateOrderLineLinkEntity, OrderEntity,
    OrderLineEntity, OrderStatus, ReceiveType,
};
use crate::schema::{order_line_links, order_lines, orders};

pub struct NewEnvelope {
    pub user_id: i32,
    pub branch_id: i32,
    pub receive_type: ReceiveType,
    pub address: Option<String>,
    pub message: String,
    pub lines: Vec<CreateOrderLineEntity>,
}

pub enum TransitionOutcome {
    /// Status written in place (or the deleted marker set).
    Updated(OrderEntity),
    /// Target was `received`: the envelope is gone, links cascaded away.
    Closed(OrderEntity),
}

/// Delivery variants require an address; pickup variants have theirs stripped.
pub fn normalize_address(
    receive_type: ReceiveType,
    address: Option<String>,
) -> Result<Option<String>, AppError> {
    if !receive_type.is_delivery() {
        return Ok(None);
    }
    match address {
        Some(address) if !address.trim().is_empty() => Ok(Some(address)),
        _ => Err(AppError::BadRequest(
            "A delivery address is required for delivery orders".into(),
        )),
    }
}

/// Create the envelope, its lines and the link rows in one transaction.
/// Lines are bulk-inserted first; the envelope id is wired to them through
/// the link table afterwards. Partial failure rolls everything back.
pub async fn create_envelope(
    conn: &mut AsyncPgConnection,
    envelope: NewEnvelope,
) -> Result<(OrderEntity, Vec<OrderLineEntity>), AppError> {
    let address = normalize_address(envelope.receive_type, envelope.address)?;

    conn.transaction(move |conn| {
        Box::pin(async move {
            let lines: Vec<OrderLineEntity> = diesel::insert_into(order_lines::table)
                .values(&envelope.lines)
                .returning(OrderLineEntity::as_returning())
                .get_results(conn)
                .await
                .context("Failed to create order lines")?;

            let order = diesel::insert_into(orders::table)
                .values(CreateOrderEntity {
                    user_id: envelope.user_id,
                    branch_id: envelope.branch_id,
                    receive_type: envelope.receive_type.as_str().into(),
                    address,
                    message: envelope.message,
                    status: OrderStatus::Pending.as_str().into(),
                })
                .returning(OrderEntity::as_returning())
                .get_result(conn)
                .await
                .context("Failed to create order")?;

            let links: Vec<CreateOrderLineLinkEntity> = lines
                .iter()
                .map(|line| CreateOrderLineLinkEntity {
                    order_id: order.id,
                    line_id: line.id,
                })
                .collect();

            diesel::insert_into(order_line_links::table)
                .values(&links)
                .execute(conn)
                .await
                .context("Failed to link order lines")?;

            Ok::<(OrderEntity, Vec<OrderLineEntity>), AppError>((order, lines))
        })
    })
    .await
}

/// Apply a staff transition. Any member of the status enum is an acceptable
/// target; `received` deletes the envelope instead of writing a status, and
/// `deleted` is the soft-delete override available at any non-terminal state.
pub async fn transition(
    conn: &mut AsyncPgConnection,
    order_id: i32,
    target: OrderStatus,
) -> Result<TransitionOutcome, AppError> {
    match target {
        OrderStatus::Received => {
            let order = diesel::delete(orders::table.find(order_id))
                .returning(OrderEntity::as_returning())
                .get_result(conn)
                .await
                .map_err(|_| AppError::NotFound)?;
            Ok(TransitionOutcome::Closed(order))
        }
        OrderStatus::Deleted => {
            let order = diesel::update(orders::table.find(order_id))
                .filter(orders::deleted_at.is_null())
                .set((
                    orders::deleted_at.eq(diesel::dsl::now),
                    orders::status.eq(OrderStatus::Deleted.as_str()),
                ))
                .returning(OrderEntity::as_returning())
                .get_result(conn)
                .await
                .map_err(|_| AppError::NotFound)?;
            Ok(TransitionOutcome::Updated(order))
        }
        _ => {
            let order = diesel::update(orders::table.find(order_id))
                .filter(orders::deleted_at.is_null())
                .set((
                    orders::status.eq(target.as_str()),
                    orders::updated_at.eq(diesel::dsl::now),
                ))
                .returning(OrderEntity::as_returning())
                .get_result(conn)
                .await
                .map_err(|_| AppError::NotFound)?;
            Ok(TransitionOutcome::Updated(order))
        }
    }
}

/// All envelopes still on the board (received ones no longer exist, deleted
/// ones are filtered out), optionally scoped to one branch.
pub async fn list_open(
    conn: &mut AsyncPgConnection,
    branch_id: Option<i32>,
) -> Result<Vec<OrderEntity>, AppError> {
    let mut query = orders::table
        .filter(orders::deleted_at.is_null())
        .order_by(orders::updated_at.desc())
        .into_boxed();

    if let Some(branch_id) = branch_id {
        query = query.filter(orders::branch_id.eq(branch_id));
    }

    let open = query
        .get_results(conn)
        .await
        .context("Failed to list open orders")?;
    Ok(open)
}

pub async fn find_open(
    conn: &mut AsyncPgConnection,
    order_id: i32,
) -> Result<OrderEntity, AppError> {
    orders::table
        .find(order_id)
        .filter(orders::deleted_at.is_null())
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)
}

/// Lines for a set of envelopes, resolved through the link table and grouped
/// by envelope id.
pub async fn lines_by_order(
    conn: &mut AsyncPgConnection,
    order_ids: &[i32],
) -> Result<HashMap<i32, Vec<OrderLineEntity>>, AppError> {
    let rows: Vec<(i32, OrderLineEntity)> = order_line_links::table
        .inner_join(order_lines::table)
        .filter(order_line_links::order_id.eq_any(order_ids))
        .select((order_line_links::order_id, OrderLineEntity::as_select()))
        .load(conn)
        .await
        .context("Failed to load order lines")?;

    let mut group: HashMap<i32, Vec<OrderLineEntity>> = HashMap::new();
    for (order_id, line) in rows {
        group.entry(order_id).or_default().push(line);
    }
    Ok(group)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_without_address_is_rejected() {
        let result = normalize_address(ReceiveType::CashOnDelivery, None);
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let result = normalize_address(ReceiveType::CardOnDelivery, Some("   ".into()));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn delivery_with_address_passes_through() {
        let result = normalize_address(ReceiveType::CashOnDelivery, Some("12 High St".into()));
        assert_eq!(result.unwrap(), Some("12 High St".to_string()));
    }

    #[test]
    fn pickup_strips_the_address() {
        let result = normalize_address(ReceiveType::PickupAtBranch, Some("12 High St".into()));
        assert_eq!(result.unwrap(), None);

        let result = normalize_address(ReceiveType::CardAtBranch, None);
        assert_eq!(result.unwrap(), None);
    }
}
