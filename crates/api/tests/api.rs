use std::sync::Arc;
use std::time::Duration;

use content_rest_api::config::AppConfig;
use content_rest_api::state::AppState;
use content_rest_core::auth::{create_user, Registration};
use content_rest_core::document::{ContentDefinition, FieldDefinition, FieldKind};
use content_rest_core::events::{LivePoller, SubscriberRegistry};
use content_rest_core::permission::{ADMINISTRATOR, PERMISSIONS_TYPE};
use content_rest_core::{ContentItem, DocumentStore, MemoryStore, Store};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::watch;

struct TestServer {
    base: String,
    client: reqwest::Client,
    store: Arc<MemoryStore>,
    _shutdown: watch::Sender<bool>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .post(
                "/api/auth/login",
                json!({"usernameOrEmail": username, "password": password}),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }
}

fn definition(name: &str, fields: &[(&str, FieldKind)], bag: Option<&[&str]>) -> ContentDefinition {
    ContentDefinition {
        name: name.into(),
        fields: fields
            .iter()
            .map(|(name, kind)| FieldDefinition {
                name: (*name).into(),
                kind: *kind,
            })
            .collect(),
        bag: bag.map(|types| types.iter().map(|t| t.to_string()).collect()),
    }
}

async fn grant(store: &MemoryStore, id: &str, roles: &str, content_types: &str, methods: &[&str]) {
    let item = ContentItem::from_raw(json!({
        "ContentItemId": id,
        "ContentType": PERMISSIONS_TYPE,
        "DisplayText": id,
        PERMISSIONS_TYPE: {
            "Roles": {"Text": roles},
            "ContentTypes": {"Text": content_types},
            "RestMethods": {"Values": methods}
        }
    }))
    .unwrap();
    store.insert(&item).await.unwrap();
}

async fn spawn() -> TestServer {
    let store = Arc::new(MemoryStore::new());
    for def in [
        definition(
            "Pet",
            &[
                ("Name", FieldKind::Text),
                ("Age", FieldKind::Numeric),
                ("Owner", FieldKind::ContentPicker),
            ],
            None,
        ),
        definition("Recipe", &[("Name", FieldKind::Text)], Some(&["Step"])),
        definition("Step", &[("Text", FieldKind::Text)], None),
        definition("Order", &[("Total", FieldKind::Numeric)], None),
    ] {
        store.save_definition(&def).await.unwrap();
    }
    grant(&store, "perm-pets", "Anonymous", "Pet,Recipe", &["GET", "POST", "PUT", "DELETE"]).await;
    grant(&store, "perm-orders", "Customer", "Order", &["GET"]).await;

    let config = AppConfig {
        live_heartbeat: Duration::from_millis(200),
        ..AppConfig::default()
    };
    let registry = Arc::new(SubscriberRegistry::new(16));
    let dyn_store: Arc<dyn Store> = store.clone();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(LivePoller::new(dyn_store.clone(), registry.clone(), Duration::from_millis(50)).run(shutdown_rx));

    let app = content_rest_api::build_app(AppState::new(dyn_store, config, registry));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://{addr}"),
        client: reqwest::Client::new(),
        store,
        _shutdown: shutdown_tx,
    }
}

#[tokio::test]
async fn health_and_ping() {
    let server = spawn().await;
    let health: Value = server.get("/health").await.json().await.unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["subscribers"], 0);
    assert_eq!(server.get("/v1/ping").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn create_read_update_delete() {
    let server = spawn().await;

    let response = server.post("/api/Pet", json!({"title": "Rex", "name": "Rex", "age": 3})).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();
    assert_eq!(created["title"], "Rex");
    let id = created["id"].as_str().unwrap().to_string();

    let item: Value = server.get(&format!("/api/Pet/{id}")).await.json().await.unwrap();
    assert_eq!(item["id"], json!(id));
    assert_eq!(item["name"], "Rex");

    let response = server
        .client
        .put(server.url(&format!("/api/Pet/{id}")))
        .json(&json!({"title": "Rex II"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let item: Value = server.get(&format!("/api/Pet/{id}")).await.json().await.unwrap();
    assert_eq!(item["title"], "Rex II");
    assert_eq!(item["name"], "Rex");

    let response = server
        .client
        .delete(server.url(&format!("/api/Pet/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"success": true, "id": id}));

    let response = server.get(&format!("/api/Pet/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.text().await.unwrap(), "null");
}

#[tokio::test]
async fn update_of_wrong_type_is_not_found() {
    let server = spawn().await;
    let created: Value = server
        .post("/api/Pet", json!({"name": "Rex"}))
        .await
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap();

    let response = server
        .client
        .put(server.url(&format!("/api/Recipe/{id}")))
        .json(&json!({"name": "Cake"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["statusCode"], 404);
}

#[tokio::test]
async fn list_filters_sorts_and_pages() {
    let server = spawn().await;
    for (name, age) in [("Ada", 1), ("Bo", 2), ("Cy", 3), ("Di", 2)] {
        let response = server.post("/api/Pet", json!({"title": name, "age": age})).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let titles = |items: Value| -> Vec<String> {
        items
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["title"].as_str().unwrap().to_string())
            .collect()
    };

    let all: Value = server.get("/api/Pet").await.json().await.unwrap();
    assert_eq!(titles(all), ["Ada", "Bo", "Cy", "Di"]);

    let filtered: Value = server.get("/api/Pet?where=age>1").await.json().await.unwrap();
    assert_eq!(titles(filtered), ["Bo", "Cy", "Di"]);

    let sorted: Value = server.get("/api/Pet?orderby=-age,title").await.json().await.unwrap();
    assert_eq!(titles(sorted), ["Cy", "Bo", "Di", "Ada"]);

    let page: Value = server.get("/api/Pet?limit=2&offset=3").await.json().await.unwrap();
    assert_eq!(titles(page), ["Di"]);

    // A malformed clause returns everything.
    let open: Value = server.get("/api/Pet?where=age>").await.json().await.unwrap();
    assert_eq!(open.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn unknown_fields_and_empty_bodies_are_rejected() {
    let server = spawn().await;

    let response = server.post("/api/Pet", json!({"name": "Rex", "colour": "red"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["invalidFields"], json!(["colour"]));
    assert!(body["error"]["validFields"]
        .as_array()
        .unwrap()
        .contains(&json!("name")));

    let response = server.post("/api/Pet", json!({})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server
        .client
        .post(server.url("/api/Pet"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let pets: Value = server.get("/api/Pet").await.json().await.unwrap();
    assert!(pets.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn references_populate_only_on_expand() {
    let server = spawn().await;
    let owner: Value = server
        .post("/api/Pet", json!({"title": "Mum", "name": "Mum"}))
        .await
        .json()
        .await
        .unwrap();
    let owner_id = owner["id"].as_str().unwrap();
    let pup: Value = server
        .post("/api/Pet", json!({"title": "Pup", "ownerId": owner_id}))
        .await
        .json()
        .await
        .unwrap();
    let pup_id = pup["id"].as_str().unwrap();

    let plain: Value = server.get(&format!("/api/Pet/{pup_id}")).await.json().await.unwrap();
    assert_eq!(plain["ownerId"], json!(owner_id));
    assert!(plain.get("owner").is_none());

    let expanded: Value = server
        .get(&format!("/api/expand/Pet/{pup_id}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(expanded["owner"]["id"], json!(owner_id));
    assert_eq!(expanded["owner"]["name"], "Mum");
    assert!(expanded.get("ownerId").is_none());
}

#[tokio::test]
async fn bag_items_round_trip() {
    let server = spawn().await;
    let response = server
        .post(
            "/api/Recipe",
            json!({"title": "Cake", "items": [{"contentType": "Step", "text": "mix"}]}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = response.json::<Value>().await.unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let recipe: Value = server
        .get(&format!("/api/expand/Recipe/{id}"))
        .await
        .json()
        .await
        .unwrap();
    let items = recipe["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["contentType"], "Step");
    assert_eq!(items[0]["text"], "mix");

    let raw: Value = server.get(&format!("/api/raw/Recipe/{id}")).await.json().await.unwrap();
    assert_eq!(raw["ContentType"], "Recipe");
    assert_eq!(raw["BagPart"]["ContentItems"][0]["Step"]["Text"], json!({"Text": "mix"}));
}

#[tokio::test]
async fn permissions_follow_roles() {
    let server = spawn().await;

    let response = server.get("/api/Order").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        "User does not have permission to GET Order"
    );

    // No grant at all denies everyone.
    assert_eq!(server.get("/api/Invoice").await.status(), StatusCode::FORBIDDEN);

    let response = server
        .post("/api/auth/register", json!({"username": "ann", "password": "hunter22"}))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let token = server.login("ann", "hunter22").await;

    let response = server
        .client
        .get(server.url("/api/Order"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .client
        .post(server.url("/api/Order"))
        .bearer_auth(&token)
        .json(&json!({"total": 5}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_and_current_user() {
    let server = spawn().await;
    server
        .post(
            "/api/auth/register",
            json!({"username": "bob", "password": "pw123456", "email": "bob@example.com"}),
        )
        .await;

    let response = server
        .post("/api/auth/login", json!({"usernameOrEmail": "bob", "password": "nope"}))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let token = server.login("bob@example.com", "pw123456").await;
    let me: Value = server
        .client
        .get(server.url("/api/auth/login"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], "bob");
    assert_eq!(me["roles"], json!(["Customer"]));

    assert_eq!(server.get("/api/auth/login").await.status(), StatusCode::UNAUTHORIZED);
    let response = server
        .client
        .get(server.url("/api/Pet"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server
        .post("/api/auth/register", json!({"username": "bob", "password": "other"}))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn system_routes_need_admin_or_grant() {
    let server = spawn().await;
    assert_eq!(
        server.get("/api/system/content-types").await.status(),
        StatusCode::FORBIDDEN
    );

    let registration = Registration {
        username: "root".into(),
        password: "s3cret".into(),
        ..Default::default()
    };
    create_user(server.store.as_ref(), &registration, vec![ADMINISTRATOR.into()])
        .await
        .unwrap();
    let token = server.login("root", "s3cret").await;

    let types: Value = server
        .client
        .get(server.url("/api/system/content-types"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        types,
        json!(["Order", "Pet", "Recipe", "RestPermissions", "Step"])
    );

    let roles: Value = server
        .client
        .get(server.url("/api/system/roles"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(roles, json!(["Administrator", "Anonymous"]));
}

async fn read_until(response: &mut reqwest::Response, buffer: &mut String, needle: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !buffer.contains(needle) {
            let chunk = response.chunk().await.unwrap().expect("stream ended");
            buffer.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {needle:?} in {buffer:?}"));
}

#[tokio::test]
async fn live_updates_stream_initial_then_new() {
    let server = spawn().await;
    server.post("/api/Pet", json!({"title": "Old", "name": "Old"})).await;

    let mut stream = server.get("/api/sse/Pet?where=name=Fresh").await;
    assert_eq!(stream.status(), StatusCode::OK);
    assert!(stream.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let mut received = String::new();
    read_until(&mut stream, &mut received, "initial").await;
    read_until(&mut stream, &mut received, "[]").await;

    server.post("/api/Pet", json!({"title": "Other", "name": "Other"})).await;
    server.post("/api/Pet", json!({"title": "Fresh", "name": "Fresh"})).await;
    read_until(&mut stream, &mut received, "\"title\":\"Fresh\"").await;
    assert!(received.replace(": ", ":").contains("event:new"));
    assert!(!received.contains("\"title\":\"Other\""));

    read_until(&mut stream, &mut received, "heartbeat").await;
}

#[tokio::test]
async fn live_stream_checks_permissions() {
    let server = spawn().await;
    assert_eq!(server.get("/api/sse/Order").await.status(), StatusCode::FORBIDDEN);
}
