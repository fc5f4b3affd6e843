// SPDX-License-Identifier: Apache-2.0

mod support;

use nccid_query::QueryOptions;
use nccid_server::{
    build_router, AppState, DashboardService, DatasetStore, Reloader, ViewCache, ViewCacheConfig,
};
use nccid_store::{Loader, RemoteSourceConfig, SourceLocation};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn send(addr: SocketAddr, method: &str, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    stream
        .write_all(request.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    response
}

#[tokio::test]
async fn integration_server_loads_local_index_then_serves() {
    let tmp = tempdir().expect("tempdir");
    std::fs::create_dir_all(tmp.path().join("etl")).expect("mkdir");
    std::fs::write(
        tmp.path().join("latest.csv"),
        "archive,path\nimages,etl/images.csv\npatient_clean,etl/patient_clean.csv\n",
    )
    .expect("write index");
    std::fs::write(
        tmp.path().join("etl/patient_clean.csv"),
        support::patient_table(40, 55, 5),
    )
    .expect("write table");

    let location = SourceLocation::parse(&format!(
        "local:{}",
        tmp.path().join("latest.csv").display()
    ))
    .expect("location");
    let store = Arc::new(DatasetStore::new());
    let cache = Arc::new(ViewCache::default());
    let reloader = Arc::new(Reloader::new(
        Arc::new(Loader::from_remote_config(RemoteSourceConfig::default())),
        location,
        Arc::clone(&store),
        Arc::clone(&cache),
        Duration::from_secs(30),
    ));
    let service = Arc::new(DashboardService::new(
        store,
        cache,
        reloader,
        ViewCacheConfig::default(),
        QueryOptions::default(),
    ));
    let app = build_router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve app");
    });

    let response = send(addr, "GET", "/v1/views/gender").await;
    assert!(response.starts_with("HTTP/1.1 503"), "{response}");

    let response = send(addr, "POST", "/v1/admin/refresh").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.contains("\"records\":100"));

    let response = send(addr, "GET", "/v1/views/gender").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{response}");
    assert!(response.contains("x-dataset-version: 1"));
    assert!(response.contains("40 (40.0%)"));

    let response = send(addr, "GET", "/v1/dataset").await;
    assert!(response.contains("patient_clean.csv"), "{response}");
}
