use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_postgres::{Client, Config, NoTls, SimpleQueryMessage};
use ulid::Ulid;

use foodslot::engine::{CalendarPolicy, Engine, Granularity, WalStore};
use foodslot::wire;

// ── Test infrastructure ──────────────────────────────────────

async fn start_test_server(granularity: Granularity) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let dir = std::env::temp_dir().join(format!("foodslot_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let store = Arc::new(WalStore::open(&dir.join("reservations.wal")).unwrap());
    let engine = Arc::new(Engine::new(store, CalendarPolicy::default(), granularity));

    tokio::spawn(async move {
        loop {
            let (socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => break,
            };
            let engine = engine.clone();
            tokio::spawn(async move {
                let _ = wire::process_connection(socket, engine).await;
            });
        }
    });

    addr
}

async fn connect(addr: SocketAddr) -> Client {
    let mut config = Config::new();
    config
        .host(addr.ip().to_string())
        .port(addr.port())
        .dbname("foodslot")
        .user("foodslot");

    let (client, connection) = config.connect(NoTls).await.unwrap();
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
}

async fn save(client: &Client, vendor: &str, date: &str) -> Result<(), tokio_postgres::Error> {
    client
        .batch_execute(&format!(
            "INSERT INTO reservations (vendor, date) VALUES ('{vendor}', '{date}')"
        ))
        .await
}

/// Error code and message of a failed statement.
fn db_error(err: tokio_postgres::Error) -> (String, String) {
    let db = err.as_db_error().expect("expected a database error");
    (db.code().code().to_string(), db.message().to_string())
}

fn data_rows(messages: Vec<SimpleQueryMessage>) -> Vec<tokio_postgres::SimpleQueryRow> {
    messages
        .into_iter()
        .filter_map(|m| match m {
            SimpleQueryMessage::Row(row) => Some(row),
            _ => None,
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn day_mode_scenario_over_wire() {
    let addr = start_test_server(Granularity::DayLevel).await;
    let client = connect(addr).await;

    save(&client, "FT1", "2021-02-01").await.unwrap();

    let (code, message) = db_error(save(&client, "FT1", "2021-02-01").await.unwrap_err());
    assert_eq!(code, "P0001");
    assert!(message.contains("already_reserved"), "{message}");

    save(&client, "FT1", "2021-02-02").await.unwrap();
    save(&client, "FT1", "2021-02-03").await.unwrap();
    let (code, message) = db_error(save(&client, "FT1", "2021-02-04").await.unwrap_err());
    assert_eq!(code, "P0001");
    assert!(message.contains("weekly_quota_exceeded"), "{message}");

    let (_, message) = db_error(save(&client, "FT2", "2021-02-06").await.unwrap_err());
    assert!(message.contains("weekend_not_bookable"), "{message}");
}

#[tokio::test]
async fn schedule_lists_seven_days() {
    let addr = start_test_server(Granularity::DayLevel).await;
    let client = connect(addr).await;

    let empty = data_rows(client.simple_query("SELECT * FROM schedule").await.unwrap());
    assert_eq!(empty.len(), 7);
    assert!(empty.iter().all(|r| r.get(1) == Some("[]")));

    save(&client, "FT1", "2021-02-01").await.unwrap();
    save(&client, "FT2", "2021-02-01").await.unwrap();
    save(&client, "FT1", "2021-02-05").await.unwrap();

    let rows = data_rows(client.simple_query("SELECT * FROM schedule").await.unwrap());
    let days: Vec<_> = rows.iter().map(|r| r.get(0).unwrap().to_string()).collect();
    assert_eq!(days, ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
    assert_eq!(rows[0].get(1), Some(r#"["FT1","FT2"]"#));
    assert_eq!(rows[4].get(1), Some(r#"["FT1"]"#));
}

#[tokio::test]
async fn shift_mode_rows_and_delete() {
    let addr = start_test_server(Granularity::ShiftLevel).await;
    let client = connect(addr).await;

    save(&client, "FT1", "2021-02-02 10:00").await.unwrap();
    save(&client, "FT1", "2021-02-02 14:00").await.unwrap();
    let (_, message) = db_error(save(&client, "FT1", "2021-02-02 11:00").await.unwrap_err());
    assert!(message.contains("already_reserved"), "{message}");

    let rows = data_rows(
        client
            .simple_query("SELECT * FROM reservations WHERE vendor = 'FT1'")
            .await
            .unwrap(),
    );
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("date"), Some("2021-02-02 10:00:00"));
    assert_eq!(rows[0].get("day"), Some("Tue"));
    assert_eq!(rows[0].get("shift"), Some("am"));
    assert_eq!(rows[1].get("shift"), Some("pm"));

    client
        .batch_execute("DELETE FROM reservations WHERE vendor = 'FT1' AND date = '2021-02-02 10:00'")
        .await
        .unwrap();
    let err = client
        .batch_execute("DELETE FROM reservations WHERE vendor = 'FT1' AND date = '2021-02-02 10:00'")
        .await
        .unwrap_err();
    assert_eq!(db_error(err).0, "P0002");

    save(&client, "FT1", "2021-02-02 11:00").await.unwrap();
}

#[tokio::test]
async fn extended_protocol_with_parameters() {
    let addr = start_test_server(Granularity::DayLevel).await;
    let client = connect(addr).await;

    client
        .execute(
            "INSERT INTO reservations (food_truck, date) VALUES ($1, $2)",
            &[&"FT7", &"2021-02-03"],
        )
        .await
        .unwrap();

    let rows = client
        .query("SELECT * FROM reservations WHERE vendor = $1", &[&"FT7"])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    let vendor: String = rows[0].get("vendor");
    let date: String = rows[0].get("date");
    assert_eq!(vendor, "FT7");
    assert_eq!(date, "2021-02-03 00:00:00");
}

#[tokio::test]
async fn bad_sql_is_syntax_error() {
    let addr = start_test_server(Granularity::DayLevel).await;
    let client = connect(addr).await;

    let err = client
        .batch_execute("INSERT INTO reservations (vendor, date) VALUES ('FT1', 'tomorrow')")
        .await
        .unwrap_err();
    assert_eq!(db_error(err).0, "42601");

    let err = client.batch_execute("SELECT * FROM trucks").await.unwrap_err();
    assert_eq!(db_error(err).0, "42601");
}

#[tokio::test]
async fn concurrent_clients_respect_capacity() {
    let addr = start_test_server(Granularity::DayLevel).await;

    let mut handles = Vec::new();
    for i in 0..20 {
        handles.push(tokio::spawn(async move {
            let client = connect(addr).await;
            save(&client, &format!("FT{i}"), "2021-02-05").await.is_ok()
        }));
    }
    let mut accepted = 0;
    for h in handles {
        if h.await.unwrap() {
            accepted += 1;
        }
    }
    // Friday holds seven.
    assert_eq!(accepted, 7);
}
