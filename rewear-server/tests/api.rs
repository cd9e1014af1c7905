//! End-to-end router tests over the in-memory store

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use rewear_server::{build_router, AppState, MarketplaceStore, MemoryStore, ServerConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("rewear_server=debug")
            .with_test_writer()
            .try_init();

        let store = Arc::new(MemoryStore::default());
        let state = AppState::new(store.clone());
        let router = build_router(state, &ServerConfig::default());
        Self { router, store }
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        caller: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(id) = caller {
            builder = builder.header("x-user-id", id);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn sign_in(&self, id: &str) -> Value {
        let (status, body) = self
            .send(
                "PUT",
                "/api/auth/user",
                Some(id),
                Some(json!({ "email": format!("{id}@example.com"), "firstName": id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }

    async fn make_admin(&self, id: &str) {
        self.sign_in(id).await;
        self.store.set_admin(id, true).await.unwrap();
    }

    async fn list_item(&self, owner: &str, title: &str, point_value: i32) -> i64 {
        let (status, body) = self
            .send(
                "POST",
                "/api/items",
                Some(owner),
                Some(json!({
                    "title": title,
                    "description": "Barely worn",
                    "category": "tops",
                    "size": "M",
                    "condition": "good",
                    "brand": "Northwind",
                    "pointValue": point_value,
                    "tags": ["cotton"],
                    "images": ["https://img.example/1.jpg"]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    async fn approve(&self, admin: &str, item_id: i64) -> (StatusCode, Value) {
        self.send(
            "PATCH",
            &format!("/api/admin/items/{item_id}/status"),
            Some(admin),
            Some(json!({ "status": "approved" })),
        )
        .await
    }

    async fn request_swap(
        &self,
        requester: &str,
        item_id: i64,
        swap_type: &str,
    ) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/swaps",
            Some(requester),
            Some(json!({ "itemId": item_id, "swapType": swap_type, "message": "Interested!" })),
        )
        .await
    }

    async fn set_swap_status(
        &self,
        caller: &str,
        swap_id: i64,
        status: &str,
    ) -> (StatusCode, Value) {
        self.send(
            "PATCH",
            &format!("/api/swaps/{swap_id}/status"),
            Some(caller),
            Some(json!({ "status": status })),
        )
        .await
    }

    async fn points(&self, id: &str) -> i64 {
        let (_, body) = self.send("GET", "/api/auth/user", Some(id), None).await;
        body["points"].as_i64().unwrap()
    }
}

/// owner lists an approved item; buyer signs in
async fn marketplace(point_value: i32) -> (TestApp, i64) {
    let app = TestApp::new();
    app.make_admin("admin").await;
    app.sign_in("owner").await;
    app.sign_in("buyer").await;
    let item_id = app.list_item("owner", "Linen Shirt", point_value).await;
    let (status, _) = app.approve("admin", item_id).await;
    assert_eq!(status, StatusCode::OK);
    (app, item_id)
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn current_user_requires_identity_and_sync() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/api/auth/user", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = app.send("GET", "/api/auth/user", Some("ghost"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let user = app.sign_in("ada").await;
    assert_eq!(user["points"], 100);
    assert_eq!(user["isAdmin"], false);

    let (status, body) = app.send("GET", "/api/auth/user", Some("ada"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "ada@example.com");
}

#[tokio::test]
async fn new_items_start_pending_and_hidden() {
    let app = TestApp::new();
    app.sign_in("owner").await;
    let item_id = app.list_item("owner", "Striped Tee", 20).await;

    let (_, item) = app.send("GET", &format!("/api/items/{item_id}"), None, None).await;
    assert_eq!(item["status"], "pending");
    assert_eq!(item["isAvailable"], true);
    assert_eq!(item["user"]["id"], "owner");

    let (status, listed) = app.send("GET", "/api/items", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 0);

    let (_, mine) = app
        .send("GET", "/api/users/owner/items", Some("owner"), None)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invalid_items_are_rejected() {
    let app = TestApp::new();
    app.sign_in("owner").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/items",
            Some("owner"),
            Some(json!({
                "title": "Socks",
                "category": "accessories",
                "size": "S",
                "condition": "new",
                "pointValue": 0
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, _) = app
        .send("POST", "/api/items", Some("owner"), Some(json!({ "title": "Socks" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("GET", "/api/items/abc", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("GET", "/api/items/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approval_pays_bonus_exactly_once() {
    let (app, item_id) = marketplace(30).await;
    assert_eq!(app.points("owner").await, 110);

    let (status, body) = app.approve("admin", item_id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["status"], "approved");
    assert_eq!(app.points("owner").await, 110);

    for status in ["rejected", "approved"] {
        let (code, _) = app
            .send(
                "PATCH",
                &format!("/api/admin/items/{item_id}/status"),
                Some("admin"),
                Some(json!({ "status": status })),
            )
            .await;
        assert_eq!(code, StatusCode::OK);
    }
    assert_eq!(app.points("owner").await, 110);

    let (_, ledger) = app
        .send("GET", "/api/users/owner/transactions", Some("owner"), None)
        .await;
    let ledger = ledger.as_array().unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0]["type"], "bonus");
    assert_eq!(ledger[0]["amount"], 10);
    assert_eq!(ledger[0]["description"], "Bonus for listing Linen Shirt");
}

#[tokio::test]
async fn approved_filter_returns_only_approved() {
    let (app, approved_id) = marketplace(30).await;
    app.list_item("owner", "Pending Pants", 15).await;

    let (_, listed) = app.send("GET", "/api/items?status=approved", None, None).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], approved_id);
    assert!(listed.iter().all(|i| i["status"] == "approved"));

    let (_, pending) = app.send("GET", "/api/items?status=pending", None, None).await;
    assert_eq!(pending.as_array().unwrap().len(), 1);

    let (status, _) = app.send("GET", "/api/items?status=lost", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_is_case_insensitive_over_title_description_brand() {
    let (app, _) = marketplace(30).await;

    for term in ["linen", "LINEN", "barely", "northWIND"] {
        let (_, hits) = app
            .send("GET", &format!("/api/items?search={term}"), None, None)
            .await;
        assert_eq!(hits.as_array().unwrap().len(), 1, "term {term}");
    }

    let (_, misses) = app.send("GET", "/api/items?search=wool", None, None).await;
    assert!(misses.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn limit_is_clamped() {
    let (app, _) = marketplace(10).await;
    let second = app.list_item("owner", "Second", 10).await;
    app.approve("admin", second).await;

    let (_, one) = app.send("GET", "/api/items?limit=1", None, None).await;
    assert_eq!(one.as_array().unwrap().len(), 1);
    assert_eq!(one[0]["id"], second);

    let (_, zero) = app.send("GET", "/api/items?limit=0", None, None).await;
    assert_eq!(zero.as_array().unwrap().len(), 1);

    let (_, huge) = app.send("GET", "/api/items?limit=100000", None, None).await;
    assert_eq!(huge.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn featured_shows_newest_approved() {
    let (app, item_id) = marketplace(10).await;
    app.list_item("owner", "Not yet", 10).await;

    let (_, featured) = app.send("GET", "/api/items/featured", None, None).await;
    let featured = featured.as_array().unwrap();
    assert_eq!(featured.len(), 1);
    assert_eq!(featured[0]["id"], item_id);
}

#[tokio::test]
async fn points_swap_completion_settles() {
    let (app, item_id) = marketplace(50).await;
    assert_eq!(app.points("buyer").await, 100);
    assert_eq!(app.points("owner").await, 110);

    let (status, swap) = app.request_swap("buyer", item_id, "points").await;
    assert_eq!(status, StatusCode::CREATED, "{swap}");
    assert_eq!(swap["status"], "pending");
    assert_eq!(swap["ownerId"], "owner");
    let swap_id = swap["id"].as_i64().unwrap();

    let (status, _) = app.set_swap_status("owner", swap_id, "accepted").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.set_swap_status("owner", swap_id, "completed").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Swap status updated");
    assert_eq!(body["swap"]["status"], "completed");
    assert_eq!(body["swap"]["item"]["isAvailable"], false);

    assert_eq!(app.points("buyer").await, 50);
    assert_eq!(app.points("owner").await, 160);

    let (_, spent) = app
        .send("GET", "/api/users/buyer/transactions", Some("buyer"), None)
        .await;
    let (_, earned) = app
        .send("GET", "/api/users/owner/transactions", Some("owner"), None)
        .await;
    assert_eq!(spent[0]["amount"], -50);
    assert_eq!(spent[0]["type"], "spent");
    assert_eq!(spent[0]["description"], "Redeemed Linen Shirt");
    assert_eq!(spent[0]["relatedItemId"], item_id);
    assert_eq!(earned[0]["amount"], 50);
    assert_eq!(earned[0]["type"], "earned");
    assert_eq!(earned[0]["description"], "Earned from Linen Shirt");

    let (_, item) = app.send("GET", &format!("/api/items/{item_id}"), None, None).await;
    assert_eq!(item["isAvailable"], false);
}

#[tokio::test]
async fn completed_swap_cannot_complete_again() {
    let (app, item_id) = marketplace(40).await;
    let (_, swap) = app.request_swap("buyer", item_id, "points").await;
    let swap_id = swap["id"].as_i64().unwrap();

    app.set_swap_status("owner", swap_id, "accepted").await;
    app.set_swap_status("owner", swap_id, "completed").await;

    let (status, body) = app.set_swap_status("owner", swap_id, "completed").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    let (status, _) = app.set_swap_status("buyer", swap_id, "rejected").await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(app.points("buyer").await, 60);
    assert_eq!(app.points("owner").await, 150);
}

#[tokio::test]
async fn swaps_skip_no_steps() {
    let (app, item_id) = marketplace(40).await;
    let (_, swap) = app.request_swap("buyer", item_id, "points").await;
    let swap_id = swap["id"].as_i64().unwrap();

    let (status, _) = app.set_swap_status("owner", swap_id, "completed").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.set_swap_status("owner", swap_id, "shipped").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.points("buyer").await, 100);
}

#[tokio::test]
async fn direct_swap_moves_no_points() {
    let (app, item_id) = marketplace(40).await;
    let (_, swap) = app.request_swap("buyer", item_id, "direct").await;
    let swap_id = swap["id"].as_i64().unwrap();

    app.set_swap_status("owner", swap_id, "accepted").await;
    let (status, body) = app.set_swap_status("owner", swap_id, "completed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["swap"]["item"]["isAvailable"], false);

    assert_eq!(app.points("buyer").await, 100);
    assert_eq!(app.points("owner").await, 110);

    let (_, ledger) = app
        .send("GET", "/api/users/buyer/transactions", Some("buyer"), None)
        .await;
    assert!(ledger.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn requester_can_only_withdraw() {
    let (app, item_id) = marketplace(40).await;
    let (_, swap) = app.request_swap("buyer", item_id, "direct").await;
    let swap_id = swap["id"].as_i64().unwrap();

    let (status, body) = app.set_swap_status("buyer", swap_id, "accepted").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    app.set_swap_status("owner", swap_id, "accepted").await;
    let (status, _) = app.set_swap_status("buyer", swap_id, "completed").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, item) = app.send("GET", &format!("/api/items/{item_id}"), None, None).await;
    assert_eq!(item["isAvailable"], true);

    let (status, body) = app.set_swap_status("buyer", swap_id, "rejected").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["swap"]["status"], "rejected");
}

#[tokio::test]
async fn item_rejected_after_acceptance_cannot_settle() {
    let (app, item_id) = marketplace(40).await;
    let (_, swap) = app.request_swap("buyer", item_id, "points").await;
    let swap_id = swap["id"].as_i64().unwrap();
    app.set_swap_status("owner", swap_id, "accepted").await;

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/api/admin/items/{item_id}/status"),
            Some("admin"),
            Some(json!({ "status": "rejected" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.set_swap_status("owner", swap_id, "completed").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
    assert_eq!(app.points("buyer").await, 100);
    assert_eq!(app.points("owner").await, 110);
}

#[tokio::test]
async fn sold_item_cannot_be_sold_again() {
    let (app, item_id) = marketplace(30).await;
    app.sign_in("rival").await;

    let (_, first) = app.request_swap("buyer", item_id, "points").await;
    let (_, second) = app.request_swap("rival", item_id, "points").await;
    let first = first["id"].as_i64().unwrap();
    let second = second["id"].as_i64().unwrap();
    app.set_swap_status("owner", first, "accepted").await;
    app.set_swap_status("owner", second, "accepted").await;

    let (status, _) = app.set_swap_status("owner", first, "completed").await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.set_swap_status("owner", second, "completed").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");

    assert_eq!(app.points("rival").await, 100);
    assert_eq!(app.points("buyer").await, 70);
    assert_eq!(app.points("owner").await, 140);
}

#[tokio::test]
async fn swap_requests_are_checked() {
    let (app, item_id) = marketplace(40).await;

    let (status, _) = app.request_swap("owner", item_id, "direct").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/api/swaps",
            Some("buyer"),
            Some(json!({ "itemId": item_id, "swapType": "direct", "ownerId": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.request_swap("buyer", item_id, "barter").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let pending = app.list_item("owner", "Unreviewed", 5).await;
    let (status, _) = app.request_swap("buyer", pending, "direct").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let pricey = app.list_item("owner", "Designer Gown", 5_000).await;
    app.approve("admin", pricey).await;
    let (status, body) = app.request_swap("buyer", pricey, "points").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("insufficient points"));

    let (status, _) = app.request_swap("buyer", 9_999, "direct").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send("POST", "/api/swaps", None, Some(json!({ "itemId": item_id, "swapType": "direct" })))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn swap_list_filters_by_direction() {
    let (app, item_id) = marketplace(40).await;
    app.request_swap("buyer", item_id, "direct").await;

    let (_, requested) = app
        .send("GET", "/api/swaps?type=requested", Some("buyer"), None)
        .await;
    assert_eq!(requested.as_array().unwrap().len(), 1);
    assert_eq!(requested[0]["requester"]["id"], "buyer");
    assert_eq!(requested[0]["owner"]["id"], "owner");
    assert_eq!(requested[0]["item"]["user"]["id"], "owner");

    let (_, received) = app
        .send("GET", "/api/swaps?type=received", Some("buyer"), None)
        .await;
    assert!(received.as_array().unwrap().is_empty());

    let (_, both) = app.send("GET", "/api/swaps", Some("owner"), None).await;
    assert_eq!(both.as_array().unwrap().len(), 1);

    let (_, unrelated) = app.send("GET", "/api/swaps", Some("admin"), None).await;
    assert!(unrelated.as_array().unwrap().is_empty());

    let (status, _) = app
        .send("GET", "/api/swaps?type=sideways", Some("buyer"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn outsiders_cannot_touch_swaps() {
    let (app, item_id) = marketplace(40).await;
    app.sign_in("stranger").await;
    let (_, swap) = app.request_swap("buyer", item_id, "points").await;
    let swap_id = swap["id"].as_i64().unwrap();

    let (status, _) = app
        .send("GET", &format!("/api/swaps/{swap_id}"), Some("stranger"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.set_swap_status("stranger", swap_id, "accepted").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send("GET", &format!("/api/swaps/{swap_id}"), Some("admin"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");

    let (status, _) = app.set_swap_status("admin", swap_id, "rejected").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn self_scoped_endpoints_reject_other_users() {
    let (app, _) = marketplace(40).await;

    let (status, body) = app
        .send("GET", "/api/users/owner/items", Some("buyer"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, _) = app
        .send("GET", "/api/users/owner/transactions", Some("buyer"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("GET", "/api/users/owner/items", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_endpoints_reject_non_admins() {
    let (app, item_id) = marketplace(40).await;

    for (method, uri) in [
        ("GET", "/api/admin/items/pending".to_string()),
        ("GET", "/api/admin/stats".to_string()),
    ] {
        let (status, _) = app.send(method, &uri, Some("buyer"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }

    let (status, _) = app.approve("buyer", item_id).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // never-synced callers are not admins either
    let (status, _) = app.send("GET", "/api/admin/stats", Some("ghost"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_moderation_and_stats() {
    let (app, _) = marketplace(40).await;
    let pending = app.list_item("owner", "Needs review", 12).await;

    let (status, queue) = app
        .send("GET", "/api/admin/items/pending", Some("admin"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(queue.as_array().unwrap().len(), 1);
    assert_eq!(queue[0]["id"], pending);

    let (status, body) = app
        .send(
            "PATCH",
            &format!("/api/admin/items/{pending}/status"),
            Some("admin"),
            Some(json!({ "status": "rejected" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["status"], "rejected");
    assert_eq!(app.points("owner").await, 110);

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/api/admin/items/{pending}/status"),
            Some("admin"),
            Some(json!({ "status": "archived" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, stats) = app.send("GET", "/api/admin/stats", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({ "totalUsers": 3, "totalItems": 2, "totalSwaps": 0, "pendingItems": 0 })
    );
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let app = TestApp::new();
    app.sign_in("owner").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/items")
        .header("x-user-id", "owner")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
