#![allow(clippy::unwrap_used)]

use std::time::Duration;

use anyhow::Context as _;
use bytes::Bytes;
use speedr_http::{ErrorClass, HttpClient, Phase, TimedClient, TransactionRequest};
use speedr_testserver::{PATH_DOWN, PATH_TRACE, PATH_UP, TestServer, TestServerOptions};

#[tokio::test]
async fn download_records_ordered_phases_and_drains_body() -> anyhow::Result<()> {
    let server = TestServer::start_with(TestServerOptions {
        download_delay: Duration::from_millis(20),
        ..TestServerOptions::default()
    })
    .await
    .context("start test server")?;

    let client = TimedClient::new()?;
    let url = format!("{}?bytes=4096", server.url(PATH_DOWN));
    let tx = client.execute(TransactionRequest::get(url)).await?;

    server.shutdown().await;

    assert_eq!(tx.status, 200);
    assert_eq!(tx.body_bytes, 4096);

    // 127.0.0.1 is an address literal: no DNS. Plain http: no TLS.
    assert_eq!(tx.dns_lookup_at, None);
    assert_eq!(tx.tls_handshake_at, None);

    let connect = tx.tcp_connect_at.context("tcp connect timestamp")?;
    assert!(tx.started <= connect);
    assert!(connect <= tx.first_byte_at);
    assert!(tx.first_byte_at <= tx.completed_at);

    // The server slept 20ms before answering and reported it.
    assert!(
        tx.server_processing_ms >= 20.0,
        "server_processing_ms={}",
        tx.server_processing_ms
    );
    assert!(tx.time_to_first_byte() >= Duration::from_millis(20));
    Ok(())
}

#[tokio::test]
async fn hostname_targets_record_dns_phase() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;
    let port = server.addr().port();

    let client = TimedClient::new()?;
    let url = format!("http://localhost:{port}{PATH_DOWN}?bytes=10");
    let tx = client.execute(TransactionRequest::get(url)).await;

    server.shutdown().await;

    // `localhost` may resolve to ::1 first on some hosts; the server only listens on 127.0.0.1,
    // and the client falls through to the next address.
    let tx = tx?;
    let dns = tx.dns_lookup_at.context("dns timestamp")?;
    let connect = tx.tcp_connect_at.context("tcp connect timestamp")?;
    assert!(tx.started <= dns && dns <= connect);
    Ok(())
}

#[tokio::test]
async fn upload_sends_exact_body() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let client = TimedClient::new()?;
    let body = Bytes::from(vec![0u8; 11_000]);
    let tx = client
        .execute(TransactionRequest::post(server.url(PATH_UP), body))
        .await?;

    let received = server.stats().upload_bytes_total();
    server.shutdown().await;

    assert_eq!(tx.status, 200);
    assert_eq!(received, 11_000);
    assert!(tx.server_processing_ms >= 0.0);
    Ok(())
}

#[tokio::test]
async fn missing_server_timing_is_a_protocol_error() -> anyhow::Result<()> {
    let server = TestServer::start_with(TestServerOptions {
        omit_server_timing: true,
        ..TestServerOptions::default()
    })
    .await
    .context("start test server")?;

    let client = TimedClient::new()?;
    let url = format!("{}?bytes=100", server.url(PATH_DOWN));
    let res = client.execute(TransactionRequest::get(url)).await;

    server.shutdown().await;

    let err = res.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Protocol);
    assert!(matches!(err, speedr_http::Error::ServerTiming(_)));
    Ok(())
}

#[tokio::test]
async fn server_errors_are_protocol_errors() -> anyhow::Result<()> {
    let server = TestServer::start_with(TestServerOptions {
        fail_every: Some(1),
        ..TestServerOptions::default()
    })
    .await
    .context("start test server")?;

    let client = TimedClient::new()?;
    let url = format!("{}?bytes=100", server.url(PATH_DOWN));
    let res = client.execute(TransactionRequest::get(url)).await;

    server.shutdown().await;

    match res {
        Err(speedr_http::Error::Status(500)) => Ok(()),
        other => anyhow::bail!("expected status 500 error, got {other:?}"),
    }
}

#[tokio::test]
async fn each_transaction_uses_its_own_connection() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let client = TimedClient::new()?;
    let url = format!("{}?bytes=1", server.url(PATH_DOWN));
    let a = client.execute(TransactionRequest::get(url.clone())).await?;
    let b = client.execute(TransactionRequest::get(url)).await?;

    server.shutdown().await;

    // Both transactions paid for a TCP connect.
    assert!(a.tcp_connect_at.is_some());
    assert!(b.tcp_connect_at.is_some());
    assert!(a.completed_at <= b.started);
    Ok(())
}

#[tokio::test]
async fn slow_body_hits_deadline() -> anyhow::Result<()> {
    let server = TestServer::start_with(TestServerOptions {
        download_delay: Duration::from_millis(500),
        ..TestServerOptions::default()
    })
    .await
    .context("start test server")?;

    let client = TimedClient::new()?;
    let url = format!("{}?bytes=1", server.url(PATH_DOWN));
    let res = client
        .execute(TransactionRequest::get(url).with_timeout(Some(Duration::from_millis(100))))
        .await;

    server.shutdown().await;

    let err = res.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Transport);
    assert_eq!(err.phase(), Some(Phase::FirstByte));
    Ok(())
}

#[tokio::test]
async fn metadata_client_reads_trace() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let res = HttpClient::default().get(&server.url(PATH_TRACE)).await?;
    server.shutdown().await;

    assert!(res.is_success());
    let body = res.body_utf8().context("utf8 body")?;
    assert!(body.lines().any(|l| l == "colo=TST"));
    Ok(())
}
