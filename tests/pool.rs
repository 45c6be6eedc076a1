//! Pool behaviour against a scripted server.

mod support;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use myco::{Error, MySqlConnectOptions, MySqlPoolOptions, MySqlSslMode, RetryOptions};
use support::{ok, prepare_ok, serve, MockSession};

fn options(addr: SocketAddr) -> MySqlConnectOptions {
    MySqlConnectOptions::new()
        .host("127.0.0.1")
        .port(addr.port())
        .username("root")
        .ssl_mode(MySqlSslMode::Disabled)
}

/// A compliant server that answers every command until the client quits.
async fn generic_session(mut s: MockSession) -> std::io::Result<()> {
    s.accept_login().await?;

    loop {
        let (_, packet) = s.read_packet().await?;

        match packet.first() {
            // COM_QUIT
            Some(0x01) => return Ok(()),

            // COM_QUERY and COM_PING get a bare OK
            Some(0x03) | Some(0x0e) => s.reply(&ok(0, 0, 2)).await?,

            // COM_STMT_PREPARE: one parameter per `?` in the text
            Some(0x16) => {
                let params = packet[1..].iter().filter(|b| **b == b'?').count() as u16;

                s.reply(&prepare_ok(1, params, 0)).await?;

                if params > 0 {
                    for _ in 0..params {
                        let def = support::column_def("?", 0xfd, 63, 0);
                        s.reply(&def).await?;
                    }
                    s.reply(&support::eof(0)).await?;
                }
            }

            // COM_STMT_EXECUTE
            Some(0x17) => s.reply(&ok(1, 0, 2)).await?,

            // COM_STMT_CLOSE has no response
            Some(0x19) => {}

            other => panic!("mock server got unexpected command {other:?}"),
        }
    }
}

#[tokio::test]
async fn pool_bounds_concurrent_sessions() {
    let opened = Arc::new(AtomicUsize::new(0));
    let opened_in_handler = Arc::clone(&opened);

    let addr = serve(move |s| {
        opened_in_handler.fetch_add(1, Ordering::SeqCst);
        generic_session(s)
    })
    .await;

    let pool = MySqlPoolOptions::new()
        .max_connections(2)
        .connect_with(options(addr))
        .await
        .unwrap();

    let concurrent = Arc::new(AtomicUsize::new(0));
    let max_observed = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();

    for _ in 0..5 {
        let pool = pool.clone();
        let concurrent = Arc::clone(&concurrent);
        let max_observed = Arc::clone(&max_observed);

        tasks.push(tokio::spawn(async move {
            pool.with_connection(move |conn| {
                let concurrent = Arc::clone(&concurrent);
                let max_observed = Arc::clone(&max_observed);

                Box::pin(async move {
                    let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                    max_observed.fetch_max(now, Ordering::SeqCst);

                    conn.ping().await?;
                    tokio::time::sleep(Duration::from_millis(150)).await;

                    concurrent.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .await
        }));
    }

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert!(
        max_observed.load(Ordering::SeqCst) <= 2,
        "observed {} concurrent borrows",
        max_observed.load(Ordering::SeqCst)
    );

    // every session the pool ever opened respected the bound
    assert!(opened.load(Ordering::SeqCst) <= 2);

    let status = pool.status();
    assert!(status.idle + status.active <= 2);
    assert_eq!(status.active, 0);
    assert_eq!(status.pending, 0);

    pool.close().await;
}

#[tokio::test]
async fn with_connection_retries_eligible_errors() {
    let addr = serve(generic_session).await;

    let pool = MySqlPoolOptions::new()
        .max_connections(2)
        .retry(
            RetryOptions::default()
                .max_attempts(2)
                .delay(Duration::from_millis(10))
                .retry_if(|_| true),
        )
        .connect_with(options(addr))
        .await
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_body = Arc::clone(&calls);

    let value = pool
        .with_connection(move |_conn| {
            let calls = Arc::clone(&calls_in_body);

            Box::pin(async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(Error::Timeout);
                }

                Ok(42)
            })
        })
        .await
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    pool.close().await;
}

#[tokio::test]
async fn with_connection_does_not_retry_ineligible_errors() {
    let addr = serve(generic_session).await;

    let pool = MySqlPoolOptions::new()
        .retry(RetryOptions::default().max_attempts(3).delay(Duration::from_millis(1)))
        .connect_with(options(addr))
        .await
        .unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_body = Arc::clone(&calls);

    // NestedTransaction is not a transport error; the default predicate
    // would retry it, but the custom-predicate-less pool must not
    let result: Result<(), Error> = pool
        .with_connection(move |_conn| {
            let calls = Arc::clone(&calls_in_body);

            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::NestedTransaction)
            })
        })
        .await;

    assert!(matches!(result, Err(Error::NestedTransaction)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    pool.close().await;
}

#[tokio::test]
async fn pool_transactional_commits() {
    let addr = serve(generic_session).await;

    let pool = MySqlPoolOptions::new()
        .connect_with(options(addr))
        .await
        .unwrap();

    let affected = pool
        .transactional(|conn| {
            Box::pin(async move {
                let result = conn.execute("UPDATE t SET v = 1").await?;
                Ok(result.affected_rows())
            })
        })
        .await
        .unwrap();

    assert_eq!(affected, 0); // the mock replies OK with 0 affected rows

    pool.close().await;
}

#[tokio::test]
async fn closed_pool_refuses_acquisitions() {
    let addr = serve(generic_session).await;

    let pool = MySqlPoolOptions::new()
        .connect_with(options(addr))
        .await
        .unwrap();

    pool.close().await;

    assert!(pool.is_closed());
    assert!(matches!(pool.acquire().await, Err(Error::PoolClosed)));
    assert!(matches!(
        pool.execute("SELECT 1").await,
        Err(Error::PoolClosed)
    ));

    let status = pool.status();
    assert_eq!(status.idle, 0);
    assert_eq!(status.active, 0);
}

#[tokio::test]
async fn acquisition_times_out_when_full() {
    let addr = serve(generic_session).await;

    let pool = MySqlPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_millis(120))
        .connect_with(options(addr))
        .await
        .unwrap();

    let held = pool.acquire().await.unwrap();

    let denied = pool.acquire().await;
    assert!(matches!(denied, Err(Error::PoolTimedOut)));

    drop(held);

    // capacity is back after release
    let granted = pool.acquire().await;
    assert!(granted.is_ok());

    drop(granted);
    pool.close().await;
}
