// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use serde_json::{Map, Value, json};
use shopdesk_api::{MediaUploader, ResourceClient, connect};
use shopdesk_app::{EntityKind, Operation, RecordId, RemoteCause, RemoteResource};
use std::io::{Read, Write};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Method, Response, Server};

fn json_header() -> Header {
    Header::from_bytes("Content-Type", "application/json").expect("valid content type header")
}

fn mock_server() -> Result<(Server, String)> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());
    Ok((server, addr))
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn unreachable_server_reports_transport_failure() {
    let client = ResourceClient::new("http://127.0.0.1:1/api", EntityKind::Orders, Duration::from_millis(50))
        .expect("client should initialize");

    let error = client.list().expect_err("nothing listens on port 1");
    assert_eq!(error.operation, Operation::List);
    assert_eq!(error.entity, EntityKind::Orders);
    assert!(matches!(error.cause, RemoteCause::Transport { .. }));
    assert!(error.to_string().starts_with("list orders failed"));
}

#[test]
fn list_reads_records_from_the_collection_path() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Get);
        assert_eq!(request.url(), "/api/orders");
        let body = r#"[
            {"_id": "o1", "customer_id": "C1", "total_price": 20,
             "products": [{"product_id": "p1", "quantity": 2, "price": 10}]},
            {"_id": "o2", "customer_id": "C2", "status": null}
        ]"#;
        let response = Response::from_string(body)
            .with_status_code(200)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = ResourceClient::new(&addr, EntityKind::Orders, Duration::from_secs(1))?;
    let records = client.list()?;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, RecordId::new("o1"));
    assert_eq!(records[0].line_item_summary(), "p1 x2 @ 10");
    assert_eq!(records[1].text("status"), None);

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn create_posts_the_full_body() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.url(), "/api/orders");
        let mut raw = String::new();
        request
            .as_reader()
            .read_to_string(&mut raw)
            .expect("readable body");
        let mut body: Value = serde_json::from_str(&raw).expect("json body");
        assert_eq!(body["products"][0]["product_id"], "p9");
        body["_id"] = json!("new-id");
        let response = Response::from_string(body.to_string())
            .with_status_code(201)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = ResourceClient::new(&addr, EntityKind::Orders, Duration::from_secs(1))?;
    let record = client.create(&fields(json!({
        "customer_id": "C1",
        "status": "pending",
        "products": [{"product_id": "p9", "quantity": "1", "price": "3"}],
    })))?;
    assert_eq!(record.id.as_str(), "new-id");
    assert_eq!(record.text("status").as_deref(), Some("pending"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn create_without_id_in_response_is_a_decode_error() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        let response = Response::from_string(r#"{"title":"Mug"}"#)
            .with_status_code(201)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = ResourceClient::new(&addr, EntityKind::Products, Duration::from_secs(1))?;
    let error = client
        .create(&fields(json!({"title": "Mug"})))
        .expect_err("no id");
    assert!(matches!(error.cause, RemoteCause::Decode(_)));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn update_puts_to_the_record_path_and_fills_missing_id() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Put);
        assert_eq!(request.url(), "/api/products/p%201");
        let response = Response::from_string(r#"{"title":"Mug","price":"4"}"#)
            .with_status_code(200)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = ResourceClient::new(&addr, EntityKind::Products, Duration::from_secs(1))?;
    let record = client.update(&RecordId::new("p 1"), &fields(json!({"title": "Mug"})))?;
    assert_eq!(record.id.as_str(), "p 1");
    assert_eq!(record.text("price").as_deref(), Some("4"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn delete_surfaces_server_message() -> Result<()> {
    let (server, addr) = mock_server()?;
    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Delete);
        assert_eq!(request.url(), "/api/orders/o1");
        let response = Response::from_string(r#"{"message":"order is locked"}"#)
            .with_status_code(409)
            .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let client = ResourceClient::new(&addr, EntityKind::Orders, Duration::from_secs(1))?;
    let error = client
        .delete(&RecordId::new("o1"))
        .expect_err("conflict");
    assert_eq!(error.operation, Operation::Delete);
    assert_eq!(
        error.cause,
        RemoteCause::Status {
            status: 409,
            message: "order is locked".to_owned(),
        }
    );

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn connect_builds_clients_for_both_entities() -> Result<()> {
    let resources = connect("http://localhost:9/api/", Duration::from_secs(1))?;
    assert_eq!(resources.orders.entity(), EntityKind::Orders);
    assert_eq!(resources.products.entity(), EntityKind::Products);
    assert!(connect("not a url", Duration::from_secs(1)).is_err());
    Ok(())
}

#[test]
fn media_upload_sends_preset_and_returns_secure_url() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/v1_1/demo/upload", server.server_addr());
    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.method(), &Method::Post);
        let mut raw = Vec::new();
        request
            .as_reader()
            .read_to_end(&mut raw)
            .expect("readable body");
        let raw = String::from_utf8_lossy(&raw);
        assert!(raw.contains("name=\"upload_preset\""));
        assert!(raw.contains("demo-preset"));
        assert!(raw.contains("fake png bytes"));
        let response = Response::from_string(
            r#"{"secure_url":"https://res.example.com/demo/mug.png","bytes":14}"#,
        )
        .with_status_code(200)
        .with_header(json_header());
        request.respond(response).expect("response should succeed");
    });

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("mug.png");
    std::fs::File::create(&path)?.write_all(b"fake png bytes")?;

    let uploader = MediaUploader::new(&addr, "demo-preset", Duration::from_secs(1))?;
    let url = uploader.upload(&path)?;
    assert_eq!(url, "https://res.example.com/demo/mug.png");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn media_upload_requires_preset_and_readable_file() -> Result<()> {
    assert!(MediaUploader::new("https://upload.example.com", " ", Duration::from_secs(1)).is_err());
    let uploader = MediaUploader::new("https://upload.example.com", "p", Duration::from_secs(1))?;
    let error = uploader
        .upload(std::path::Path::new("/definitely/not/here.png"))
        .expect_err("missing file");
    assert!(error.to_string().contains("not/here.png"));
    Ok(())
}
