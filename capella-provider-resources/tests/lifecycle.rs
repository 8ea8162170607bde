use httpmock::prelude::*;
use httpmock::Method::PATCH;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use capella_provider_common::config::{AppConfig, PollSettings};
use capella_provider_resources::api::{Client, EndpointCfg, Payload};
use capella_provider_resources::error::ProviderError;
use capella_provider_resources::provider::request::State;
use capella_provider_resources::provider::Provider;

const TOKEN: &str = "secret-token";
const PROJECTS: &str = "/v4/organizations/o/projects";
const LOG_STREAMING: &str = "/v4/organizations/o/projects/p/clusters/c/appservices/a/logStreaming";
const QUERY_SERVICE: &str = "/v4/organizations/o/projects/p/clusters/c/queryService";

fn fast_polling() -> PollSettings {
    PollSettings {
        interval_ms: 10,
        timeout_secs: 5,
        initial_delay_ms: Some(0),
        max_interval_ms: None,
    }
}

fn config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.provider.host = server.base_url();
    config.provider.authentication_token = TOKEN.to_string();
    config.client.request_timeout_secs = 5;
    config.client.retry_timeout_secs = 1;
    config.client.retry_wait_ms = 300;
    config.polling.log_streaming = fast_polling();
    config.polling.cluster = fast_polling();
    config.polling.index_build = fast_polling();
    config
}

fn provider(server: &MockServer) -> Provider {
    Provider::new(config(server)).unwrap()
}

fn state(value: Value) -> State {
    State::new(value)
}

#[tokio::test]
async fn gateway_timeouts_are_retried_until_the_window_closes() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/v4/organizations/o");
        then.status(504).body("upstream timed out");
    });
    let config = config(&server);
    let client = Client::new(&config.client).unwrap();
    let cfg = EndpointCfg::new(format!("{}/v4/organizations/o", server.base_url()), Method::GET, StatusCode::OK);

    let err = client
        .execute_with_retry(&CancellationToken::new(), &cfg, &Payload::Empty, TOKEN, &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::RetryTimeout(_)), "{err}");
    assert!(mock.hits() >= 2);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v4/organizations/o")
            .header("Authorization", format!("Bearer {TOKEN}"));
        then.status(404).json_body(json!({
            "code": 404,
            "hint": "",
            "httpStatusCode": 404,
            "message": "organization not found",
        }));
    });
    let config = config(&server);
    let client = Client::new(&config.client).unwrap();
    let cfg = EndpointCfg::new(format!("{}/v4/organizations/o", server.base_url()), Method::GET, StatusCode::OK);

    let err = client
        .execute_with_retry(&CancellationToken::new(), &cfg, &Payload::Empty, TOKEN, &[])
        .await
        .unwrap_err();

    mock.assert();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn javascript_source_is_sent_untouched() {
    let server = MockServer::start();
    let source = "function (doc) { return doc.type == \"user\"; }";
    let mock = server.mock(|when, then| {
        when.method(PUT)
            .path("/v4/functions/f1")
            .header("Content-Type", "application/javascript")
            .body(source);
        then.status(200);
    });
    let config = config(&server);
    let client = Client::new(&config.client).unwrap();
    let cfg = EndpointCfg::new(format!("{}/v4/functions/f1", server.base_url()), Method::PUT, StatusCode::OK);

    client
        .execute(
            &cfg,
            &Payload::Json(Value::String(source.to_string())),
            TOKEN,
            &[("Content-Type", "application/javascript")],
        )
        .await
        .unwrap();

    mock.assert();
}

#[tokio::test]
async fn read_of_deleted_project_removes_state() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path(format!("{PROJECTS}/p1"));
        then.status(404).json_body(json!({"code": 4025, "httpStatusCode": 404, "message": "gone"}));
    });

    let resp = provider(&server)
        .read(
            "couchbase-capella_project",
            state(json!({"id": "p1", "organization_id": "o", "name": "demo"})),
            CancellationToken::new(),
        )
        .await;

    mock.assert();
    assert!(resp.state.is_null());
    assert!(resp.diagnostics.is_empty());
}

#[tokio::test]
async fn project_update_sends_if_match_and_records_etag() {
    let server = MockServer::start();
    let put = server.mock(|when, then| {
        when.method(PUT)
            .path(format!("{PROJECTS}/p1"))
            .header("If-Match", "5")
            .json_body(json!({"name": "renamed", "description": "after"}));
        then.status(204);
    });
    let get = server.mock(|when, then| {
        when.method(GET).path(format!("{PROJECTS}/p1"));
        then.status(200)
            .header("ETag", "6")
            .json_body(json!({"id": "p1", "name": "renamed", "description": "after"}));
    });

    let resp = provider(&server)
        .update(
            "couchbase-capella_project",
            state(json!({
                "id": "p1",
                "organization_id": "o",
                "name": "renamed",
                "description": "after",
                "if_match": "5",
            })),
            state(json!({"id": "p1", "organization_id": "o", "name": "demo"})),
            CancellationToken::new(),
        )
        .await;

    put.assert();
    get.assert();
    assert!(!resp.diagnostics.has_error(), "{:?}", resp.diagnostics);
    assert_eq!(resp.state.attribute("etag"), Some(&json!("6")));
    assert_eq!(resp.state.attribute("if_match"), Some(&json!("5")));
}

#[tokio::test]
async fn user_role_change_is_sent_as_patch() {
    let server = MockServer::start();
    let path = "/v4/organizations/o/users/u1";
    let patch = server.mock(|when, then| {
        when.method(PATCH).path(path).json_body(json!([
            {"op": "add", "path": "/organizationRoles", "value": ["projectCreator"]},
            {"op": "add", "path": "/resources/p1", "value": {"id": "p1", "type": "project", "roles": ["projectViewer"]}},
        ]));
        then.status(200);
    });
    let get = server.mock(|when, then| {
        when.method(GET).path(path);
        then.status(200).json_body(json!({
            "id": "u1",
            "email": "dev@example.com",
            "organizationId": "o",
            "organizationRoles": ["organizationMember", "projectCreator"],
            "resources": [{"id": "p1", "type": "project", "roles": ["projectViewer"]}],
        }));
    });

    let resp = provider(&server)
        .update(
            "couchbase-capella_user",
            state(json!({
                "id": "u1",
                "organization_id": "o",
                "email": "dev@example.com",
                "organization_roles": ["organizationMember", "projectCreator"],
                "resources": [{"id": "p1", "roles": ["projectViewer"]}],
            })),
            state(json!({
                "id": "u1",
                "organization_id": "o",
                "email": "dev@example.com",
                "organization_roles": ["organizationMember"],
            })),
            CancellationToken::new(),
        )
        .await;

    patch.assert();
    get.assert();
    assert!(!resp.diagnostics.has_error(), "{:?}", resp.diagnostics);
    assert_eq!(
        resp.state.attribute("organization_roles"),
        Some(&json!(["organizationMember", "projectCreator"])),
    );
}

#[tokio::test]
async fn log_streaming_create_waits_until_enabled() {
    let server = MockServer::start();
    let post = server.mock(|when, then| {
        when.method(POST).path(LOG_STREAMING).json_body(json!({
            "outputType": "datadog",
            "credentials": {"url": "https://dd", "apiKey": "k"},
        }));
        then.status(202);
    });
    let get = server.mock(|when, then| {
        when.method(GET).path(LOG_STREAMING);
        then.status(200).json_body(json!({
            "outputType": "datadog",
            "configState": "enabled",
            "streamingState": "enabled",
        }));
    });
    let credentials = json!({"datadog": {"api_key": "k", "url": "https://dd"}});

    let resp = provider(&server)
        .create(
            "couchbase-capella_app_service_log_streaming",
            state(json!({
                "organization_id": "o",
                "project_id": "p",
                "cluster_id": "c",
                "app_service_id": "a",
                "output_type": "datadog",
                "credentials": credentials,
            })),
            CancellationToken::new(),
        )
        .await;

    post.assert();
    assert!(get.hits() >= 2);
    assert!(!resp.diagnostics.has_error(), "{:?}", resp.diagnostics);
    assert_eq!(resp.state.attribute("config_state"), Some(&json!("enabled")));
    assert_eq!(resp.state.attribute("credentials").and_then(|c| c.get("datadog")), credentials.get("datadog"));
}

#[tokio::test]
async fn disabled_log_streaming_is_removed_on_read() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(LOG_STREAMING);
        then.status(200).json_body(json!({"outputType": "loki", "configState": "disabled"}));
    });

    let resp = provider(&server)
        .read(
            "couchbase-capella_app_service_log_streaming",
            state(json!({
                "organization_id": "o",
                "project_id": "p",
                "cluster_id": "c",
                "app_service_id": "a",
                "output_type": "loki",
            })),
            CancellationToken::new(),
        )
        .await;

    assert!(resp.state.is_null());
    assert!(resp.diagnostics.is_empty());
}

#[tokio::test]
async fn log_streaming_settling_elsewhere_fails() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(LOG_STREAMING);
        then.status(202);
    });
    server.mock(|when, then| {
        when.method(GET).path(LOG_STREAMING);
        then.status(200).json_body(json!({"outputType": "sumologic", "configState": "errored"}));
    });

    let resp = provider(&server)
        .create(
            "couchbase-capella_app_service_log_streaming",
            state(json!({
                "organization_id": "o",
                "project_id": "p",
                "cluster_id": "c",
                "app_service_id": "a",
                "output_type": "sumologic",
                "credentials": {"sumologic": {"url": "https://sumo"}},
            })),
            CancellationToken::new(),
        )
        .await;

    assert!(resp.diagnostics.has_error());
    assert!(resp.state.is_null());
}

#[tokio::test]
async fn index_build_in_progress_keeps_plan_in_state() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{QUERY_SERVICE}/indexes"))
            .json_body(json!({"definition": "CREATE INDEX `idx` ON `b`.`s`.`c`(age) "}));
        then.status(500).json_body(json!({
            "code": 11000,
            "httpStatusCode": 500,
            "message": "Build Already In Progress for keyspace b.s.c",
        }));
    });
    let plan = json!({
        "organization_id": "o",
        "project_id": "p",
        "cluster_id": "c",
        "bucket_name": "b",
        "scope_name": "s",
        "collection_name": "c",
        "index_name": "idx",
        "index_keys": ["age"],
    });

    let resp = provider(&server)
        .create("couchbase-capella_query_indexes", state(plan), CancellationToken::new())
        .await;

    mock.assert();
    assert!(resp.diagnostics.has_error());
    assert_eq!(resp.state.attribute("index_name"), Some(&json!("idx")));
}

#[tokio::test]
async fn deferred_build_waits_for_every_index() {
    let server = MockServer::start();
    let ddl = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{QUERY_SERVICE}/indexes"))
            .json_body(json!({"definition": "BUILD INDEX ON `b`.`s`.`c`(idx1,idx2)"}));
        then.status(200).json_body(json!({}));
    });
    let status = |index: &'static str| {
        server.mock(move |when, then| {
            when.method(GET)
                .path(format!("{QUERY_SERVICE}/indexBuildStatus/{index}"))
                .query_param("bucket", "b")
                .query_param("scope", "s")
                .query_param("collection", "c");
            then.status(200).json_body(json!({"status": "Ready"}));
        })
    };
    let (first, second) = (status("idx1"), status("idx2"));

    let resp = provider(&server)
        .create(
            "couchbase-capella_query_indexes",
            state(json!({
                "organization_id": "o",
                "project_id": "p",
                "cluster_id": "c",
                "bucket_name": "b",
                "scope_name": "s",
                "collection_name": "c",
                "build_indexes": ["idx1", "idx2"],
            })),
            CancellationToken::new(),
        )
        .await;

    ddl.assert();
    first.assert();
    second.assert();
    assert!(!resp.diagnostics.has_error(), "{:?}", resp.diagnostics);
}

#[tokio::test]
async fn rejected_statement_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(format!("{QUERY_SERVICE}/indexes"));
        then.status(200).json_body(json!({"errors": [{"msg": "syntax error near WHERE"}]}));
    });

    let resp = provider(&server)
        .delete(
            "couchbase-capella_query_indexes",
            state(json!({
                "organization_id": "o",
                "project_id": "p",
                "cluster_id": "c",
                "bucket_name": "b",
                "scope_name": "s",
                "collection_name": "c",
                "index_name": "idx",
            })),
            CancellationToken::new(),
        )
        .await;

    let detail = resp.diagnostics.iter().map(|d| d.detail.clone()).collect::<Vec<_>>().join("\n");
    assert!(detail.contains("syntax error near WHERE"), "{detail}");
}

#[tokio::test]
async fn imported_index_is_read_in_full() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{QUERY_SERVICE}/indexes/idx"))
            .query_param("bucket", "b")
            .query_param("scope", "s")
            .query_param("collection", "c");
        then.status(200).json_body(json!({
            "indexName": "idx",
            "isPrimary": false,
            "secExprs": ["`age`"],
            "where": "age > 21",
            "numReplica": 1,
        }));
    });

    let resp = provider(&server)
        .import_state(
            "couchbase-capella_query_indexes",
            "index_name=idx,collection_name=c,scope_name=s,bucket_name=b,cluster_id=c,project_id=p,organization_id=o",
            CancellationToken::new(),
        )
        .await;

    mock.assert();
    assert!(!resp.diagnostics.has_error(), "{:?}", resp.diagnostics);
    assert_eq!(resp.state.attribute("organization_id"), Some(&json!("o")));
    assert_eq!(resp.state.attribute("index_keys"), Some(&json!(["`age`"])));
    assert_eq!(resp.state.attribute("where"), Some(&json!("age > 21")));
}

#[tokio::test]
async fn projects_data_source_walks_every_page() {
    let server = MockServer::start();
    let first = server.mock(|when, then| {
        when.method(GET).path(PROJECTS).query_param("page", "1").query_param("sortBy", "id");
        then.status(200).json_body(json!({
            "data": [{"id": "p1", "name": "one"}],
            "cursor": {"pages": {"page": 1, "next": 2, "last": 2, "perPage": 1, "totalItems": 2}},
        }));
    });
    let second = server.mock(|when, then| {
        when.method(GET).path(PROJECTS).query_param("page", "2");
        then.status(200).json_body(json!({
            "data": [{"id": "p2", "name": "two"}],
            "cursor": {"pages": {"page": 2, "previous": 1, "last": 2, "perPage": 1, "totalItems": 2}},
        }));
    });

    let resp = provider(&server)
        .read_data_source("couchbase-capella_projects", state(json!({"organization_id": "o"})), CancellationToken::new())
        .await;

    first.assert();
    second.assert();
    assert!(!resp.diagnostics.has_error(), "{:?}", resp.diagnostics);
    let ids: Vec<&str> = resp
        .state
        .attribute("data")
        .and_then(Value::as_array)
        .map(|data| data.iter().filter_map(|p| p["id"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(ids, vec!["p1", "p2"]);
}

#[tokio::test]
async fn cluster_delete_waits_until_gone() {
    let server = MockServer::start();
    let path = "/v4/organizations/o/projects/p/clusters/cl1";
    let delete = server.mock(|when, then| {
        when.method(DELETE).path(path);
        then.status(202);
    });
    let get = server.mock(|when, then| {
        when.method(GET).path(path);
        then.status(404).json_body(json!({"code": 4025, "httpStatusCode": 404, "message": "not found"}));
    });

    let resp = provider(&server)
        .delete(
            "couchbase-capella_cluster",
            state(json!({
                "id": "cl1",
                "organization_id": "o",
                "project_id": "p",
                "name": "demo",
            })),
            CancellationToken::new(),
        )
        .await;

    delete.assert();
    get.assert();
    assert!(!resp.diagnostics.has_error(), "{:?}", resp.diagnostics);
    assert!(resp.state.is_null());
}

#[tokio::test]
async fn api_key_can_be_rotated_right_after_create() {
    let server = MockServer::start();
    let create = server.mock(|when, then| {
        when.method(POST).path("/v4/organizations/o/apikeys");
        then.status(201).json_body(json!({"id": "k1", "token": "first-token"}));
    });
    let get = server.mock(|when, then| {
        when.method(GET).path("/v4/organizations/o/apikeys/k1");
        then.status(200).json_body(json!({
            "id": "k1",
            "name": "ci",
            "description": "",
            "allowedCIDRs": ["0.0.0.0/0"],
            "expiry": 180,
            "organizationRoles": ["organizationMember"],
            "resources": [{"id": "p1", "type": "project", "roles": ["projectViewer"]}],
        }));
    });
    let rotate = server.mock(|when, then| {
        when.method(POST).path("/v4/organizations/o/apikeys/k1/rotate");
        then.status(200).json_body(json!({"secretKey": "s2"}));
    });
    let config = json!({
        "organization_id": "o",
        "name": "ci",
        "organization_roles": ["organizationMember"],
        "resources": [{"id": "p1", "roles": ["projectViewer"]}],
    });
    let provider = provider(&server);

    let created = provider
        .create("couchbase-capella_apikey", state(config.clone()), CancellationToken::new())
        .await;
    assert!(!created.diagnostics.has_error(), "{:?}", created.diagnostics);
    assert_eq!(created.state.attribute("token"), Some(&json!("first-token")));

    let mut plan = config;
    plan["rotate"] = json!(1);
    let rotated = provider
        .update("couchbase-capella_apikey", state(plan), created.state, CancellationToken::new())
        .await;

    create.assert();
    rotate.assert();
    assert_eq!(get.hits(), 2);
    assert!(!rotated.diagnostics.has_error(), "{:?}", rotated.diagnostics);
    assert_eq!(rotated.state.attribute("rotate"), Some(&json!(1)));
    assert_eq!(rotated.state.attribute("secret"), Some(&json!("s2")));
    assert_eq!(rotated.state.attribute("token"), Some(&json!("azE6czI=")));
}

#[tokio::test]
async fn deleting_a_missing_user_succeeds() {
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
        when.method(DELETE).path("/v4/organizations/o/users/u1");
        then.status(404).json_body(json!({"code": 4001, "httpStatusCode": 404, "message": "user not found"}));
    });

    let resp = provider(&server)
        .delete(
            "couchbase-capella_user",
            state(json!({
                "id": "u1",
                "organization_id": "o",
                "email": "dev@example.com",
                "organization_roles": ["organizationMember"],
            })),
            CancellationToken::new(),
        )
        .await;

    delete.assert();
    assert!(!resp.diagnostics.has_error(), "{:?}", resp.diagnostics);
    assert!(resp.state.is_null());
}

#[tokio::test]
async fn deleting_missing_log_streaming_skips_the_wait() {
    let server = MockServer::start();
    let delete = server.mock(|when, then| {
        when.method(DELETE).path(LOG_STREAMING);
        then.status(404).json_body(json!({"code": 404, "httpStatusCode": 404, "message": "not found"}));
    });
    let get = server.mock(|when, then| {
        when.method(GET).path(LOG_STREAMING);
        then.status(200).json_body(json!({"outputType": "loki", "configState": "enabled"}));
    });

    let resp = provider(&server)
        .delete(
            "couchbase-capella_app_service_log_streaming",
            state(json!({
                "organization_id": "o",
                "project_id": "p",
                "cluster_id": "c",
                "app_service_id": "a",
                "output_type": "loki",
            })),
            CancellationToken::new(),
        )
        .await;

    delete.assert();
    assert_eq!(get.hits(), 0);
    assert!(!resp.diagnostics.has_error(), "{:?}", resp.diagnostics);
    assert!(resp.state.is_null());
}
