use std::collections::HashMap;
use std::str::FromStr;

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    ListResult, OrderItemView, OrderStatus, OrderView, Settlement, SettlementItem,
    SettlementOutcome, StatusUpdate,
};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, orders, products, users, variations};

use super::models::{NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Take `item.quantity` off the product and, when the line names a size or
/// color, off the matching variation. Products deleted since checkout are
/// skipped.
fn decrement_stock(
    conn: &mut PgConnection,
    product_id: Uuid,
    item: &SettlementItem,
) -> Result<(), DomainError> {
    let updated = diesel::update(products::table.find(product_id))
        .set((
            products::stock.eq(products::stock - item.quantity),
            products::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;
    if updated == 0 {
        log::warn!(
            "Product {} no longer exists; stock left untouched for '{}'",
            product_id,
            item.name
        );
        return Ok(());
    }

    if item.size.is_none() && item.color.is_none() {
        return Ok(());
    }

    let mut query = variations::table
        .filter(variations::product_id.eq(product_id))
        .select(variations::id)
        .into_boxed();
    query = match &item.size {
        Some(size) => query.filter(variations::size.eq(size)),
        None => query.filter(variations::size.is_null()),
    };
    query = match &item.color {
        Some(color) => query.filter(variations::color.eq(color)),
        None => query.filter(variations::color.is_null()),
    };

    match query.first::<Uuid>(conn).optional()? {
        Some(variation_id) => {
            diesel::update(variations::table.find(variation_id))
                .set(variations::stock.eq(variations::stock - item.quantity))
                .execute(conn)?;
        }
        None => log::warn!(
            "No variation {}/{} for product {}; only product stock decremented",
            item.size.as_deref().unwrap_or("-"),
            item.color.as_deref().unwrap_or("-"),
            product_id
        ),
    }
    Ok(())
}

fn item_view(row: OrderItemRow) -> OrderItemView {
    OrderItemView {
        id: row.id,
        product_id: row.product_id,
        name: row.name,
        unit_price: row.unit_price,
        quantity: row.quantity,
        size: row.size,
        color: row.color,
        is_freight: row.is_freight,
    }
}

fn order_view(
    row: OrderRow,
    owner_email: Option<String>,
    items: Vec<OrderItemView>,
) -> Result<OrderView, DomainError> {
    Ok(OrderView {
        status: OrderStatus::from_str(&row.status)?,
        id: row.id,
        payment_session_id: row.payment_session_id,
        provider: row.provider,
        user_id: row.user_id,
        contact_email: owner_email.or(row.customer_email),
        total: row.total,
        tracking_code: row.tracking_code,
        shipping_address: row.shipping_address,
        created_at: row.created_at,
        items,
    })
}

/// Attach items and owner e-mails to a batch of order rows.
fn load_views(
    conn: &mut PgConnection,
    rows: Vec<(OrderRow, Option<String>)>,
) -> Result<Vec<OrderView>, DomainError> {
    let ids: Vec<Uuid> = rows.iter().map(|(o, _)| o.id).collect();
    let mut items_by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for item in order_items::table
        .filter(order_items::order_id.eq_any(&ids))
        .select(OrderItemRow::as_select())
        .order(order_items::id)
        .load(conn)?
    {
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(item_view(item));
    }

    rows.into_iter()
        .map(|(order, email)| {
            let items = items_by_order.remove(&order.id).unwrap_or_default();
            order_view(order, email, items)
        })
        .collect()
}

fn hydrate(
    conn: &mut PgConnection,
    order: Option<OrderRow>,
) -> Result<Option<OrderView>, DomainError> {
    let Some(order) = order else {
        return Ok(None);
    };

    let owner_email = match order.user_id {
        Some(user_id) => users::table
            .find(user_id)
            .select(users::email)
            .first::<String>(conn)
            .optional()?,
        None => None,
    };

    Ok(load_views(conn, vec![(order, owner_email)])?.pop())
}

fn find_by_id_in(conn: &mut PgConnection, id: Uuid) -> Result<Option<OrderView>, DomainError> {
    let order = orders::table
        .find(id)
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?;
    hydrate(conn, order)
}

impl OrderRepository for DieselOrderRepository {
    fn settle(&self, settlement: &Settlement) -> Result<SettlementOutcome, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Claim the payment session. The unique index turns a concurrent
            //    duplicate into a no-op instead of a second order.
            let order_id = Uuid::new_v4();
            let inserted = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    payment_session_id: &settlement.payment_session_id,
                    provider: settlement.provider.as_str(),
                    user_id: settlement.user_id,
                    customer_email: settlement.customer_email.as_deref(),
                    total: settlement.total(),
                    status: OrderStatus::Paid.as_str(),
                    shipping_address: &settlement.shipping_address,
                })
                .on_conflict(orders::payment_session_id)
                .do_nothing()
                .returning(orders::id)
                .get_result::<Uuid>(conn)
                .optional()?;

            let Some(order_id) = inserted else {
                let existing = orders::table
                    .filter(orders::payment_session_id.eq(&settlement.payment_session_id))
                    .select(orders::id)
                    .first::<Uuid>(conn)?;
                return Ok(SettlementOutcome::AlreadySettled { order_id: existing });
            };

            // 2. Snapshot the purchased lines.
            let new_items: Vec<NewOrderItemRow<'_>> = settlement
                .items
                .iter()
                .map(|i| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: i.product_id,
                    name: &i.name,
                    unit_price: &i.unit_price,
                    quantity: i.quantity,
                    size: i.size.as_deref(),
                    color: i.color.as_deref(),
                    is_freight: i.is_freight,
                })
                .collect();
            if !new_items.is_empty() {
                diesel::insert_into(order_items::table)
                    .values(&new_items)
                    .execute(conn)?;
            }

            // 3. Decrement stock for real products only.
            for item in settlement.items.iter().filter(|i| i.affects_stock()) {
                if let Some(product_id) = item.product_id {
                    decrement_stock(conn, product_id, item)?;
                }
            }

            Ok(SettlementOutcome::Created { order_id })
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        find_by_id_in(&mut conn, id)
    }

    fn find_by_session_id(&self, session_id: &str) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        let order = orders::table
            .filter(orders::payment_session_id.eq(session_id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        hydrate(&mut conn, order)
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1).saturating_mul(limit);
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows = orders::table
                .left_join(users::table)
                .select((OrderRow::as_select(), users::email.nullable()))
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load::<(OrderRow, Option<String>)>(conn)?;

            Ok(ListResult {
                items: load_views(conn, rows)?,
                total,
            })
        })
    }

    fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = orders::table
            .left_join(users::table)
            .filter(orders::user_id.eq(user_id))
            .select((OrderRow::as_select(), users::email.nullable()))
            .order(orders::created_at.desc())
            .load::<(OrderRow, Option<String>)>(&mut conn)?;

        load_views(&mut conn, rows)
    }

    fn update_status(
        &self,
        id: Uuid,
        update: &StatusUpdate,
    ) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let target = orders::table.find(id);
            let mut updated = 0;
            if let Some(status) = update.status {
                updated = diesel::update(target)
                    .set((
                        orders::status.eq(status.as_str()),
                        orders::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;
            }
            if let Some(code) = &update.tracking_code {
                let code = (!code.is_empty()).then_some(code.as_str());
                updated = diesel::update(target)
                    .set((
                        orders::tracking_code.eq(code),
                        orders::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;
            }
            if updated == 0 {
                return Ok(None);
            }
            find_by_id_in(conn, id)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselOrderRepository;
    use crate::domain::order::{
        OrderStatus, PaymentProvider, Settlement, SettlementItem, SettlementOutcome, StatusUpdate,
    };
    use crate::domain::ports::OrderRepository;
    use crate::infrastructure::test_db::{insert_product, insert_variation, setup_db};
    use crate::schema::{order_items, orders, products, variations};

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).expect("valid decimal")
    }

    fn product_line(product_id: Uuid, size: Option<&str>, color: Option<&str>) -> SettlementItem {
        SettlementItem {
            product_id: Some(product_id),
            name: "Vestido Floral".to_string(),
            unit_price: dec("100.00"),
            quantity: 1,
            size: size.map(str::to_string),
            color: color.map(str::to_string),
            is_freight: false,
        }
    }

    fn freight_line(price: &str) -> SettlementItem {
        SettlementItem {
            product_id: None,
            name: "Frete PAC".to_string(),
            unit_price: dec(price),
            quantity: 1,
            size: None,
            color: None,
            is_freight: true,
        }
    }

    fn settlement(session: &str, items: Vec<SettlementItem>) -> Settlement {
        Settlement {
            payment_session_id: session.to_string(),
            provider: PaymentProvider::Stripe,
            user_id: None,
            customer_email: Some("cliente@example.com".to_string()),
            shipping_address: "Rua das Flores, 123 - Curitiba/PR".to_string(),
            items,
            reported_total: None,
        }
    }

    fn product_stock(conn: &mut PgConnection, id: Uuid) -> i32 {
        products::table
            .find(id)
            .select(products::stock)
            .first(conn)
            .expect("product query failed")
    }

    fn variation_stock(conn: &mut PgConnection, id: Uuid) -> i32 {
        variations::table
            .find(id)
            .select(variations::stock)
            .first(conn)
            .expect("variation query failed")
    }

    #[tokio::test]
    async fn settles_order_and_decrements_product_and_variation() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("Failed to get connection");
        let p1 = insert_product(&mut conn, "Vestido Floral", 10);
        let azul_m = insert_variation(&mut conn, p1, Some("M"), Some("Azul"), 4);
        let rosa_m = insert_variation(&mut conn, p1, Some("M"), Some("Rosa"), 4);
        let repo = DieselOrderRepository::new(pool.clone());

        let outcome = repo
            .settle(&settlement(
                "cs_test_1",
                vec![product_line(p1, Some("M"), Some("Azul"))],
            ))
            .expect("settle failed");

        let SettlementOutcome::Created { order_id } = outcome else {
            panic!("expected a new order, got {outcome:?}");
        };
        let order = repo.find_by_id(order_id).unwrap().expect("order should exist");
        assert_eq!(order.total, dec("100.00"));
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].size.as_deref(), Some("M"));
        assert_eq!(order.items[0].color.as_deref(), Some("Azul"));
        assert_eq!(product_stock(&mut conn, p1), 9);
        assert_eq!(variation_stock(&mut conn, azul_m), 3);
        assert_eq!(variation_stock(&mut conn, rosa_m), 4);
    }

    #[tokio::test]
    async fn duplicate_delivery_creates_one_order_and_decrements_once() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("Failed to get connection");
        let p1 = insert_product(&mut conn, "Body Manga Longa", 5);
        let repo = DieselOrderRepository::new(pool.clone());
        let event = settlement("cs_dup", vec![product_line(p1, None, None)]);

        let first = repo.settle(&event).expect("first settle failed");
        let second = repo.settle(&event).expect("second settle failed");

        assert!(matches!(first, SettlementOutcome::Created { .. }));
        assert_eq!(
            second,
            SettlementOutcome::AlreadySettled {
                order_id: first.order_id()
            }
        );
        let count: i64 = orders::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 1);
        assert_eq!(product_stock(&mut conn, p1), 4);
    }

    #[tokio::test]
    async fn freight_only_cart_records_order_without_touching_stock() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("Failed to get connection");
        let p1 = insert_product(&mut conn, "Macacão", 7);
        let repo = DieselOrderRepository::new(pool.clone());

        let outcome = repo
            .settle(&settlement("cs_freight", vec![freight_line("25.90")]))
            .expect("freight-only settle failed");

        let order = repo.find_by_id(outcome.order_id()).unwrap().unwrap();
        assert_eq!(order.items.len(), 1);
        assert!(order.items[0].is_freight);
        assert_eq!(order.items[0].product_id, None);
        assert_eq!(order.total, dec("25.90"));
        assert_eq!(product_stock(&mut conn, p1), 7);
    }

    #[tokio::test]
    async fn total_is_sum_of_lines_including_freight() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("Failed to get connection");
        let p1 = insert_product(&mut conn, "Conjunto", 10);
        let p2 = insert_product(&mut conn, "Tiara", 10);
        let repo = DieselOrderRepository::new(pool.clone());
        let mut two = product_line(p1, None, None);
        two.quantity = 2;
        let mut tiara = product_line(p2, None, None);
        tiara.unit_price = dec("15.50");

        let outcome = repo
            .settle(&settlement(
                "cs_total",
                vec![two, tiara, freight_line("19.90")],
            ))
            .unwrap();

        let order = repo.find_by_id(outcome.order_id()).unwrap().unwrap();
        assert_eq!(order.total, dec("235.40"));
        assert_eq!(product_stock(&mut conn, p1), 8);
        assert_eq!(product_stock(&mut conn, p2), 9);
    }

    #[tokio::test]
    async fn missing_product_is_skipped_without_failing() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool.clone());

        let outcome = repo
            .settle(&settlement(
                "cs_gone",
                vec![product_line(Uuid::new_v4(), Some("P"), None)],
            ))
            .expect("settle should tolerate deleted products");

        let order = repo.find_by_id(outcome.order_id()).unwrap().unwrap();
        assert_eq!(order.items.len(), 1);
    }

    #[tokio::test]
    async fn failure_mid_settlement_rolls_everything_back() {
        let (_container, pool) = setup_db().await;
        let mut conn = pool.get().expect("Failed to get connection");
        let p1 = insert_product(&mut conn, "Saia", 3);
        let p2 = insert_product(&mut conn, "Blusa", 3);
        let blusa_g = insert_variation(&mut conn, p2, Some("G"), None, 2);
        // Any write to the variation stock fails, i.e. the last step.
        diesel::sql_query(
            "CREATE FUNCTION reject_variation_update() RETURNS trigger AS $$
             BEGIN RAISE EXCEPTION 'simulated write failure'; END;
             $$ LANGUAGE plpgsql",
        )
        .execute(&mut conn)
        .unwrap();
        diesel::sql_query(
            "CREATE TRIGGER reject_variation_update BEFORE UPDATE ON variations
             FOR EACH ROW EXECUTE FUNCTION reject_variation_update()",
        )
        .execute(&mut conn)
        .unwrap();
        let repo = DieselOrderRepository::new(pool.clone());

        let result = repo.settle(&settlement(
            "cs_atomic",
            vec![product_line(p1, None, None), product_line(p2, Some("G"), None)],
        ));

        assert!(result.is_err());
        let order_count: i64 = orders::table.count().get_result(&mut conn).unwrap();
        let item_count: i64 = order_items::table.count().get_result(&mut conn).unwrap();
        assert_eq!(order_count, 0);
        assert_eq!(item_count, 0);
        assert_eq!(product_stock(&mut conn, p1), 3);
        assert_eq!(product_stock(&mut conn, p2), 3);
        assert_eq!(variation_stock(&mut conn, blusa_g), 2);
    }

    #[tokio::test]
    async fn find_by_session_id_and_update_status() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);
        repo.settle(&settlement("cs_status", vec![freight_line("10.00")]))
            .unwrap();

        let order = repo
            .find_by_session_id("cs_status")
            .unwrap()
            .expect("order should be found by session");
        assert_eq!(order.contact_email.as_deref(), Some("cliente@example.com"));

        let updated = repo
            .update_status(
                order.id,
                &StatusUpdate {
                    status: Some(OrderStatus::Shipped),
                    tracking_code: Some("BR123".to_string()),
                },
            )
            .unwrap()
            .expect("order should exist");
        assert_eq!(updated.status, OrderStatus::Shipped);
        assert_eq!(updated.tracking_code.as_deref(), Some("BR123"));

        let missing = repo
            .update_status(
                Uuid::new_v4(),
                &StatusUpdate {
                    status: Some(OrderStatus::Delivered),
                    tracking_code: None,
                },
            )
            .unwrap();
        assert!(missing.is_none());
        assert!(repo.find_by_session_id("cs_unknown").unwrap().is_none());
    }

    #[tokio::test]
    async fn list_paginates_correctly() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);

        for n in 0..5 {
            repo.settle(&settlement(&format!("cs_page_{n}"), vec![freight_line("1.00")]))
                .expect("settle failed");
        }

        let page1 = repo.list(1, 3).expect("list page 1 failed");
        assert_eq!(page1.total, 5);
        assert_eq!(page1.items.len(), 3);
        assert!(page1.items.iter().all(|o| o.items.len() == 1));

        let page2 = repo.list(2, 3).expect("list page 2 failed");
        assert_eq!(page2.total, 5);
        assert_eq!(page2.items.len(), 2);
    }

    #[tokio::test]
    async fn list_past_the_last_page_is_empty() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);
        repo.settle(&settlement("cs_far_page", vec![freight_line("1.00")]))
            .expect("settle failed");

        let far = repo.list(i64::MAX, 100).expect("list far page failed");

        assert_eq!(far.total, 1);
        assert!(far.items.is_empty());
    }
}
