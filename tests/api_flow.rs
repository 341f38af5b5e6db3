mod common;

use axum::http::StatusCode;
use common::{spawn_app, TestApp};
use serde_json::{json, Value};

async fn create_dish(app: &TestApp, admin: &str, name: &str, price: f64) -> Value {
    let (status, body) = app
        .post(
            "/api/menu",
            Some(admin),
            json!({
                "name": name,
                "description": "house special",
                "price": price,
                "category": "pizza",
                "prices": { "large": price + 4.0 },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create dish failed: {body}");
    body
}

#[tokio::test]
async fn test_menu_writes_are_admin_only() {
    let app = spawn_app();
    let customer = app.register_customer("alice", "a@x.com", "pw1").await;
    let admin = app.admin_token().await;

    let dish = json!({ "name": "Margherita", "price": 9.5, "category": "pizza" });
    let (status, _) = app.post("/api/menu", None, dish.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.post("/api/menu", Some(&customer), dish.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app.post("/api/menu", Some(&admin), dish.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["preparation_time"], 15);
    assert_eq!(created["is_available"], true);

    let (status, body) = app.post("/api/menu", Some(&admin), dish).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Menu item with this name already exists");

    let (status, _) = app
        .post(
            "/api/menu",
            Some(&admin),
            json!({ "name": "Free", "price": 0.0, "category": "pizza" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_menu_public_reads_and_admin_edits() {
    let app = spawn_app();
    let admin = app.admin_token().await;
    let dish = create_dish(&app, &admin, "Calzone", 12.0).await;
    let id = dish["id"].as_str().unwrap();

    let (status, list) = app.get("/api/menu", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (_, categories) = app.get("/api/menu/categories", None).await;
    assert_eq!(categories, json!(["pizza"]));

    let (status, updated) = app
        .put(
            &format!("/api/menu/{id}"),
            Some(&admin),
            json!({ "is_available": false }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_available"], false);
    assert_eq!(updated["price"], 12.0);

    let (_, available) = app.get("/api/menu?available_only=true", None).await;
    assert!(available.as_array().unwrap().is_empty());

    let (status, _) = app.delete(&format!("/api/menu/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&format!("/api/menu/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guest_order_priced_server_side() {
    let app = spawn_app();
    let admin = app.admin_token().await;
    let dish = create_dish(&app, &admin, "Margherita", 10.0).await;
    let id = dish["id"].as_str().unwrap();

    let (status, order) = app
        .post(
            "/api/orders/guest",
            None,
            json!({
                "items": [
                    { "menu_item_id": id, "quantity": 2 },
                    { "menu_item_id": id, "quantity": 1, "size": "large", "unit_price": 0.01 },
                ],
                "customer_info": {
                    "name": "Guest",
                    "phone": "555-0100",
                    "address": "1 Main St",
                },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "guest order failed: {order}");
    assert_eq!(order["user_id"], Value::Null);
    assert_eq!(order["total_amount"], 34.0);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "unpaid");

    let (status, body) = app
        .post(
            "/api/orders/guest",
            None,
            json!({
                "items": [{ "menu_item_id": "ghost", "quantity": 1 }],
                "customer_info": { "name": "G", "phone": "1", "address": "x" },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");

    let (status, _) = app
        .post(
            "/api/orders/guest",
            None,
            json!({
                "items": [],
                "customer_info": { "name": "G", "phone": "1", "address": "x" },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_customer_orders_are_owned_by_token() {
    let app = spawn_app();
    let admin = app.admin_token().await;
    let alice = app.register_customer("alice", "a@x.com", "pw1").await;
    let bob = app.register_customer("bob", "b@x.com", "pw2").await;
    let dish = create_dish(&app, &admin, "Margherita", 10.0).await;
    let id = dish["id"].as_str().unwrap();
    let alice_id = app.state.jwt.verify_token(&alice).unwrap().user_id;

    let (status, order) = app
        .post(
            "/api/orders",
            Some(&alice),
            json!({
                "items": [{ "menu_item_id": id, "quantity": 1 }],
                "user_id": "someone-else",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["user_id"], alice_id.as_str());
    let order_uri = format!("/api/orders/{}", order["id"].as_str().unwrap());

    let (status, _) = app.get(&order_uri, Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&order_uri, Some(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, bobs) = app.get("/api/orders", Some(&bob)).await;
    assert!(bobs.as_array().unwrap().is_empty());
    let (_, all) = app.get("/api/orders", Some(&admin)).await;
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, _) = app
        .put(&order_uri, Some(&alice), json!({ "status": "delivered" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .put(
            &order_uri,
            Some(&admin),
            json!({ "status": "delivered", "payment_status": "paid" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "delivered");

    let (_, stats) = app.get("/api/orders/stats", Some(&admin)).await;
    assert_eq!(stats, json!({ "total_orders": 1, "pending_orders": 0 }));

    let (_, dashboard) = app.get("/api/admin/dashboard", Some(&admin)).await;
    assert_eq!(dashboard["total_revenue"], 10.0);

    let (status, _) = app.delete(&order_uri, Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.get(&order_uri, Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reservation_lifecycle() {
    let app = spawn_app();
    let admin = app.admin_token().await;
    let customer = app.register_customer("alice", "a@x.com", "pw1").await;

    let (status, reservation) = app
        .post(
            "/api/reservations",
            None,
            json!({
                "customer_name": "Ada",
                "customer_phone": "555-0101",
                "customer_email": "Ada@X.com",
                "date": "2026-12-24",
                "time": "7:30",
                "guests": 4,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{reservation}");
    assert_eq!(reservation["status"], "pending");
    assert_eq!(reservation["time"], "07:30");
    assert_eq!(reservation["customer_email"], "ada@x.com");

    let (status, _) = app
        .post(
            "/api/reservations",
            None,
            json!({
                "customer_name": "Ada",
                "customer_phone": "555-0101",
                "customer_email": "ada@x.com",
                "date": "2026-12-24",
                "time": "19:30",
                "guests": 40,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/api/reservations", Some(&customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/reservations/{}", reservation["id"].as_str().unwrap());
    let (status, confirmed) = app
        .put(&uri, Some(&admin), json!({ "status": "confirmed" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (_, listed) = app.get("/api/reservations?status=confirmed", Some(&admin)).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (_, stats) = app.get("/api/reservations/stats", Some(&admin)).await;
    assert_eq!(
        stats,
        json!({ "total_reservations": 1, "confirmed_reservations": 1 })
    );

    let (_, dashboard) = app.get("/api/admin/dashboard", Some(&admin)).await;
    assert_eq!(dashboard["new_bookings"], 1);

    let (status, _) = app.delete(&uri, Some(&admin)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.delete(&uri, Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reservation_lookup_and_update_validation() {
    let app = spawn_app();
    let admin = app.admin_token().await;
    let customer = app.register_customer("alice", "a@x.com", "pw1").await;

    let (_, reservation) = app
        .post(
            "/api/reservations",
            None,
            json!({
                "customer_name": "Ada",
                "customer_phone": "555-0101",
                "customer_email": "ada@x.com",
                "date": "2026-12-24",
                "time": "19:30",
                "guests": 2,
            }),
        )
        .await;
    let uri = format!("/api/reservations/{}", reservation["id"].as_str().unwrap());

    let (status, fetched) = app.get(&uri, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, reservation);

    let (status, _) = app.get(&uri, Some(&customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.get("/api/reservations/missing", Some(&admin)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Reservation not found");

    let (status, _) = app
        .put(&uri, Some(&admin), json!({ "customer_name": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app
        .put(&uri, Some(&admin), json!({ "customer_phone": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .put(&uri, Some(&admin), json!({ "customer_name": " Ada L. " }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["customer_name"], "Ada L.");
    assert_eq!(updated["customer_phone"], "555-0101");
}

#[tokio::test]
async fn test_admin_analytics() {
    let app = spawn_app();
    let admin = app.admin_token().await;
    let customer = app.register_customer("alice", "a@x.com", "pw1").await;
    let dish = create_dish(&app, &admin, "Margherita", 10.0).await;
    let id = dish["id"].as_str().unwrap();

    let (status, _) = app.get("/api/admin/analytics", Some(&customer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, empty) = app.get("/api/admin/analytics", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty, json!({ "orders_by_status": {}, "revenue_by_day": {} }));

    let mut order_ids = Vec::new();
    for quantity in [1, 2] {
        let (_, order) = app
            .post(
                "/api/orders",
                Some(&customer),
                json!({ "items": [{ "menu_item_id": id, "quantity": quantity }] }),
            )
            .await;
        order_ids.push(order["id"].as_str().unwrap().to_string());
    }
    let (status, _) = app
        .put(
            &format!("/api/orders/{}", order_ids[1]),
            Some(&admin),
            json!({ "status": "delivered", "payment_status": "paid" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, analytics) = app.get("/api/admin/analytics", Some(&admin)).await;
    assert_eq!(
        analytics["orders_by_status"],
        json!({ "delivered": 1, "pending": 1 })
    );
    let revenue = analytics["revenue_by_day"].as_object().unwrap();
    assert_eq!(revenue.len(), 1);
    let (day, amount) = revenue.iter().next().unwrap();
    assert_eq!(day.len(), "YYYY-MM-DD".len());
    assert_eq!(amount, &json!(20.0));
}

#[tokio::test]
async fn test_collection_paths_accept_trailing_slash() {
    let app = spawn_app();
    let admin = app.admin_token().await;
    create_dish(&app, &admin, "Calzone", 12.0).await;

    let (status, list) = app.get("/api/menu/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (status, categories) = app.get("/api/menu/categories/list", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(categories, json!(["pizza"]));

    let (status, _) = app
        .post(
            "/api/menu/",
            Some(&admin),
            json!({ "name": "Marinara", "price": 8.0, "category": "pizza" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, orders) = app.get("/api/orders/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(orders.as_array().unwrap().is_empty());

    let (status, _) = app
        .post(
            "/api/reservations/",
            None,
            json!({
                "customer_name": "Ada",
                "customer_phone": "555-0101",
                "customer_email": "ada@x.com",
                "date": "2026-12-24",
                "time": "19:30",
                "guests": 2,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, listed) = app.get("/api/reservations/", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}
