mod common;

use common::{
    Customer, Event, Invoice, MockDb, customers, expect_err, factory, invoices, run,
    unwrap_outcome,
};
use sqlweave::prelude::*;
use sqlweave::{ExecutionError, Operation, ResultSet};

fn batching() -> DriverCapabilities {
    DriverCapabilities::default()
}

fn one_at_a_time() -> DriverCapabilities {
    DriverCapabilities::default().batched_queries(false)
}

#[test]
fn includes_ride_along_with_the_next_read_in_one_round_trip() {
    let db = MockDb::new();
    db.push_reader(vec![
        invoices(&[(1, 42, 10.5), (2, 42, 99.0)]),
        ResultSet::scalar("n", Value::BigInt(2)),
        customers(&[(42, "Ada")]),
    ]);
    let factory = factory(&db, DialectKind::Sqlite, batching());

    run(|cx| async move {
        let mut session = factory.session();
        let all_invoices = session
            .include()
            .many::<Invoice>(SqlQuery::from_values(
                "SELECT * FROM Invoices WHERE CustomerId = @p0",
                [42_i64],
            ))
            .unwrap();
        let invoice_count = session
            .include()
            .scalar::<i64>(SqlQuery::new("SELECT COUNT(*) FROM Invoices"))
            .unwrap();
        assert_eq!(session.pending_count(), 2);
        assert!(!all_invoices.is_resolved());

        let customer = unwrap_outcome(session.single::<Customer>(&cx, 42_i64).await);
        assert_eq!(customer, Some(Customer { id: 42, name: "Ada".into() }));
        assert_eq!(session.pending_count(), 0);

        let all_invoices = all_invoices.take().unwrap();
        assert_eq!(all_invoices.len(), 2);
        assert_eq!(all_invoices[1].total, 99.0);
        assert_eq!(invoice_count.take().unwrap(), 2);
        unwrap_outcome(session.close(&cx).await);
    });

    let readers: Vec<_> = db
        .events()
        .into_iter()
        .filter(|e| matches!(e, Event::Reader(_)))
        .collect();
    assert_eq!(readers.len(), 1);
    let command = readers[0].command().unwrap();
    assert_eq!(
        command.text,
        "SELECT * FROM Invoices WHERE CustomerId = @p0;\n\
         SELECT COUNT(*) FROM Invoices;\n\
         SELECT \"Id\", \"Name\" FROM \"Customers\" WHERE \"Id\" = @p1"
    );
    let names: Vec<_> = command.parameters.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, ["p0", "p1"]);
    assert_eq!(command.parameters[1].value, Value::BigInt(42));
}

#[test]
fn without_batching_every_read_is_its_own_round_trip() {
    let db = MockDb::new();
    db.push_reader(vec![invoices(&[(1, 42, 10.5)])]);
    db.push_reader(vec![ResultSet::scalar("n", Value::BigInt(1))]);
    db.push_reader(vec![customers(&[(42, "Ada")])]);
    let factory = factory(&db, DialectKind::Sqlite, one_at_a_time());

    run(|cx| async move {
        let mut session = factory.session();
        let all_invoices = session
            .include()
            .many::<Invoice>(SqlQuery::new("SELECT * FROM Invoices"))
            .unwrap();
        let invoice_count = session
            .include()
            .scalar::<i64>(SqlQuery::new("SELECT COUNT(*) FROM Invoices"))
            .unwrap();
        let customer = unwrap_outcome(session.single::<Customer>(&cx, 42_i64).await);

        assert_eq!(customer.map(|c| c.name), Some("Ada".to_string()));
        assert_eq!(all_invoices.take().unwrap().len(), 1);
        assert_eq!(invoice_count.take().unwrap(), 1);
    });

    assert_eq!(db.count(|e| matches!(e, Event::Reader(_))), 3);
    let texts: Vec<_> = db.commands().into_iter().map(|c| c.text).collect();
    assert_eq!(texts[0], "SELECT * FROM Invoices");
    assert_eq!(texts[1], "SELECT COUNT(*) FROM Invoices");
    // One connection serves the whole queue.
    assert_eq!(db.count(|e| matches!(e, Event::Open)), 1);
}

#[test]
fn a_single_pending_read_is_not_combined() {
    let db = MockDb::new();
    db.push_reader(vec![customers(&[(1, "Ada"), (2, "Grace")])]);
    let factory = factory(&db, DialectKind::Sqlite, batching());

    run(|cx| async move {
        let mut session = factory.session();
        let all: Vec<Customer> =
            unwrap_outcome(session.fetch(&cx, SqlQuery::new("SELECT * FROM Customers")).await);
        assert_eq!(all.len(), 2);
    });

    assert_eq!(db.commands()[0].text, "SELECT * FROM Customers");
}

#[test]
fn paged_reads_count_and_page_together() {
    let db = MockDb::new();
    db.push_reader(vec![
        ResultSet::scalar("n", Value::BigInt(25)),
        customers(&[(11, "K"), (12, "L")]),
    ]);
    let factory = factory(&db, DialectKind::Sqlite, batching());

    run(|cx| async move {
        let mut session = factory.session();
        let page = unwrap_outcome(
            session
                .paged::<Customer>(
                    &cx,
                    SqlQuery::new("SELECT Id, Name FROM Customers ORDER BY Name"),
                    PagingOptions::for_page(2, 10).unwrap(),
                )
                .await,
        );
        assert_eq!(page.page(), 2);
        assert_eq!(page.results_per_page(), 10);
        assert_eq!(page.total_results(), 25);
        assert_eq!(page.total_pages(), 3);
        assert!(page.more_results_available());
        assert_eq!(page.results().len(), 2);
    });

    let commands = db.commands();
    assert_eq!(commands.len(), 1);
    assert!(
        commands[0]
            .text
            .starts_with("SELECT COUNT(*) FROM Customers;\n"),
        "{}",
        commands[0].text
    );
}

#[test]
fn paged_rejects_paging_none_before_any_io() {
    let db = MockDb::new();
    let factory = factory(&db, DialectKind::MsSql2012, batching());

    run(|cx| async move {
        let mut session = factory.session();
        let err = expect_err(
            session
                .paged::<Customer>(&cx, SqlQuery::new("SELECT * FROM Customers"), PagingOptions::NONE)
                .await,
        );
        assert!(matches!(err, Error::Usage(UsageError::PagingOptionsNone)));
    });

    assert!(db.events().is_empty());
}

#[test]
fn projection_and_scalar_reads() {
    let db = MockDb::new();
    db.push_reader(vec![ResultSet::new(
        ["Name", "Orders"],
        vec![
            vec![Value::from("Ada"), Value::Int(3)],
            vec![Value::from("Grace"), Value::Int(0)],
        ],
    )]);
    db.push_reader(vec![ResultSet::scalar("total", Value::Double(109.5))]);
    let factory = factory(&db, DialectKind::Postgres, batching());

    run(|cx| async move {
        let mut session = factory.session();
        let rows = unwrap_outcome(
            session
                .projection(&cx, SqlQuery::new("SELECT Name, COUNT(*) AS Orders FROM Orders GROUP BY Name"))
                .await,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Name"), Some(&Value::from("Ada")));
        assert_eq!(rows[1].get_as::<i32>("Orders").unwrap(), 0);

        let total: f64 = unwrap_outcome(
            session
                .execute_scalar(&cx, SqlQuery::new("SELECT SUM(Total) FROM Invoices"))
                .await,
        );
        assert_eq!(total, 109.5);
    });
}

#[test]
fn single_by_identifier_returns_none_for_no_rows() {
    let db = MockDb::new();
    db.push_reader(vec![customers(&[])]);
    let factory = factory(&db, DialectKind::Oracle, batching());

    run(|cx| async move {
        let mut session = factory.open_read_only_session(ConnectionScope::PerTransaction);
        let missing = unwrap_outcome(session.single::<Customer>(&cx, 7_i64).await);
        assert_eq!(missing, None);
    });

    assert_eq!(
        db.commands()[0].text,
        "SELECT \"Id\", \"Name\" FROM \"Customers\" WHERE \"Id\" = :p0"
    );
}

#[test]
fn session_built_queries_use_the_configured_timeout() {
    let db = MockDb::new();
    let factory = factory(&db, DialectKind::Sqlite, batching())
        .with_config(SessionConfig::default().with_command_timeout(90));

    run(|cx| async move {
        let mut session = factory.session();
        let _ = unwrap_outcome(session.single::<Customer>(&cx, 1_i64).await);
        let _: Vec<Customer> = unwrap_outcome(
            session
                .fetch(&cx, SqlQuery::new("SELECT * FROM Customers").with_timeout(5))
                .await,
        );
    });

    let commands = db.commands();
    assert_eq!(commands[0].timeout, Some(90));
    assert_eq!(commands[1].timeout, Some(5));
}

#[test]
fn timeout_is_omitted_when_the_driver_cannot_set_one() {
    let db = MockDb::new();
    let factory = factory(
        &db,
        DialectKind::Sqlite,
        DriverCapabilities::default().command_timeout(false),
    );

    run(|cx| async move {
        let mut session = factory.session();
        let _ = unwrap_outcome(session.single::<Customer>(&cx, 1_i64).await);
    });

    assert_eq!(db.commands()[0].timeout, None);
}

#[test]
fn per_transaction_scope_closes_after_each_operation() {
    let db = MockDb::new();
    let factory = factory(&db, DialectKind::Sqlite, batching());

    run(|cx| async move {
        let mut session = factory.open_session(ConnectionScope::PerTransaction);
        assert_eq!(session.state(), SessionState::Created);
        let _ = unwrap_outcome(session.single::<Customer>(&cx, 1_i64).await);
        assert!(!session.is_connection_open());
        let _ = unwrap_outcome(session.single::<Customer>(&cx, 2_i64).await);
        assert_eq!(session.state(), SessionState::Active);
        unwrap_outcome(session.close(&cx).await);
    });

    assert_eq!(db.count(|e| matches!(e, Event::Open)), 2);
    assert_eq!(db.count(|e| matches!(e, Event::Close)), 2);
}

#[test]
fn per_session_scope_keeps_the_connection_until_close() {
    let db = MockDb::new();
    let factory = factory(&db, DialectKind::Sqlite, batching());

    run(|cx| async move {
        let mut session = factory.open_session(ConnectionScope::PerSession);
        let _ = unwrap_outcome(session.single::<Customer>(&cx, 1_i64).await);
        let _ = unwrap_outcome(session.single::<Customer>(&cx, 2_i64).await);
        assert!(session.is_connection_open());
        unwrap_outcome(session.close(&cx).await);
        assert!(!session.is_connection_open());
    });

    let events = db.events();
    assert_eq!(events.first(), Some(&Event::Open));
    assert_eq!(events.last(), Some(&Event::Close));
    assert_eq!(db.count(|e| matches!(e, Event::Open)), 1);
}

#[test]
fn a_closed_session_rejects_every_operation() {
    let db = MockDb::new();
    let factory = factory(&db, DialectKind::Sqlite, batching());

    run(|cx| async move {
        let mut session = factory.session();
        unwrap_outcome(session.close(&cx).await);
        // Closing again is allowed.
        unwrap_outcome(session.close(&cx).await);
        assert_eq!(session.state(), SessionState::Disposed);

        let err = expect_err(session.single::<Customer>(&cx, 1_i64).await);
        assert!(matches!(err, Error::Usage(UsageError::SessionDisposed)));
        let err = expect_err(session.execute(&cx, SqlQuery::new("DELETE FROM Customers")).await);
        assert!(matches!(err, Error::Usage(UsageError::SessionDisposed)));
        assert!(matches!(
            session.include().all::<Customer>(),
            Err(Error::Usage(UsageError::SessionDisposed))
        ));
        let err = expect_err(session.begin_transaction(&cx, None).await);
        assert!(matches!(err, Error::Usage(UsageError::SessionDisposed)));
        let mut customer = Customer::default();
        let err = expect_err(session.insert(&cx, &mut customer).await);
        assert!(matches!(err, Error::Usage(UsageError::SessionDisposed)));
    });

    assert!(db.commands().is_empty());
}

#[test]
fn driver_failures_carry_operation_and_sql() {
    let db = MockDb::new();
    let factory = factory(&db, DialectKind::Sqlite, batching());

    run(|cx| async move {
        let mut session = factory.session();
        db.fail_next_command("no such table: Customers");
        let err = expect_err(
            session
                .fetch::<Customer>(&cx, SqlQuery::new("SELECT * FROM Customers"))
                .await,
        );
        match err {
            Error::Execution(ExecutionError {
                operation: Operation::ExecuteReader,
                command_text,
                source,
            }) => {
                assert_eq!(command_text, "SELECT * FROM Customers");
                assert_eq!(source.to_string(), "no such table: Customers");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The queue is empty even after a failure.
        assert_eq!(session.pending_count(), 0);
        assert!(!session.is_connection_open());
    });
}

#[test]
fn a_batch_with_missing_result_sets_is_an_error() {
    let db = MockDb::new();
    db.push_reader(vec![customers(&[(42, "Ada")])]);
    db.push_reader(vec![]);
    let factory = factory(&db, DialectKind::Sqlite, batching());

    run(|cx| async move {
        let mut session = factory.session();
        session
            .include()
            .many::<Invoice>(SqlQuery::from_values(
                "SELECT * FROM Invoices WHERE CustomerId = @p0",
                [42_i64],
            ))
            .unwrap();
        let err = expect_err(session.single::<Customer>(&cx, 42_i64).await);
        match err {
            Error::Execution(ExecutionError {
                operation: Operation::Read,
                source,
                ..
            }) => assert_eq!(
                source.to_string(),
                "expected 2 result sets, the batch returned 1"
            ),
            other => panic!("unexpected error: {other}"),
        }

        // A reader with no result set at all fails on the first handle.
        session
            .include()
            .scalar::<i64>(SqlQuery::new("SELECT COUNT(*) FROM Invoices"))
            .unwrap();
        let err = expect_err(session.single::<Customer>(&cx, 42_i64).await);
        assert!(err.is_execution(), "{err}");
        assert!(err.to_string().contains("the batch returned 0"), "{err}");
    });
}
