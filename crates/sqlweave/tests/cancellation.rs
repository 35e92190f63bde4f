mod common;

use common::{Customer, Event, MockDb, factory, run};
use sqlweave::prelude::*;

fn sqlite(db: &MockDb) -> SessionFactory<impl Fn() -> common::MockConnection> {
    factory(db, DialectKind::Sqlite, DriverCapabilities::default())
}

#[test]
fn a_cancelled_context_stops_before_opening_the_connection() {
    let db = MockDb::new();
    let factory = sqlite(&db);

    run(|cx| async move {
        cx.set_cancel_requested(true);
        let mut session = factory.open_session(ConnectionScope::PerTransaction);
        let outcome = session.single::<Customer>(&cx, 1_i64).await;
        assert!(matches!(outcome, Outcome::Cancelled(_)));
        assert_eq!(session.pending_count(), 0);
        assert!(!session.is_connection_open());
    });

    assert!(db.events().is_empty());
}

#[test]
fn cancellation_after_open_releases_the_connection() {
    let db = MockDb::new();
    let factory = sqlite(&db);
    let script = db.clone();

    run(|cx| async move {
        let mut session = factory.open_session(ConnectionScope::PerTransaction);
        script.cancel_on_open();
        let mut customer = Customer { id: 0, name: "Ada".into() };
        let outcome = session.insert(&cx, &mut customer).await;
        assert!(matches!(outcome, Outcome::Cancelled(_)));
        assert_eq!(customer.id, 0);
        assert!(!session.is_connection_open());
    });

    assert_eq!(db.events(), [Event::Open, Event::Close]);
    assert!(db.commands().is_empty());
}

#[test]
fn cancellation_is_not_reported_as_an_error() {
    let db = MockDb::new();
    let factory = sqlite(&db);
    let script = db.clone();

    run(|cx| async move {
        let mut session = factory.open_session(ConnectionScope::PerSession);
        script.cancel_on_open();
        let outcome = session.begin_transaction(&cx, None).await;
        assert!(!matches!(outcome, Outcome::Err(_)));
        assert!(matches!(outcome, Outcome::Cancelled(_)));
        assert!(!session.in_transaction());
    });

    assert_eq!(db.count(|e| matches!(e, Event::Begin(_))), 0);
}
