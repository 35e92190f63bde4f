//! A scripted in-memory connection for session tests.
#![allow(dead_code)]

use asupersync::runtime::RuntimeBuilder;
use sqlweave::prelude::*;
use sqlweave::{BoxError, BufferedReader, Command, ResultSet};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

/// What the session asked the connection to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Open,
    Close,
    Begin(Option<IsolationLevel>),
    Commit,
    Rollback,
    NonQuery(Command),
    Scalar(Command),
    Reader(Command),
}

impl Event {
    pub fn command(&self) -> Option<&Command> {
        match self {
            Event::NonQuery(c) | Event::Scalar(c) | Event::Reader(c) => Some(c),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    events: Vec<Event>,
    readers: VecDeque<Vec<ResultSet>>,
    scalars: VecDeque<Value>,
    rows: VecDeque<u64>,
    failures: VecDeque<String>,
    command_failures: VecDeque<String>,
    cancel_on_open: bool,
}

/// Shared state behind every connection a test hands out.
#[derive(Debug, Clone, Default)]
pub struct MockDb {
    script: Arc<Mutex<Script>>,
}

impl MockDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().expect("mock script lock")
    }

    pub fn connect(&self) -> MockConnection {
        MockConnection {
            db: self.clone(),
            open: false,
        }
    }

    /// Result sets returned by the next `execute_reader`.
    pub fn push_reader(&self, sets: Vec<ResultSet>) {
        self.script().readers.push_back(sets);
    }

    /// Value returned by the next `execute_scalar`.
    pub fn push_scalar(&self, value: impl Into<Value>) {
        self.script().scalars.push_back(value.into());
    }

    /// Row count returned by the next `execute_non_query` (default 1).
    pub fn push_rows(&self, rows: u64) {
        self.script().rows.push_back(rows);
    }

    /// Make the next call of any kind fail with `message`.
    pub fn fail_next(&self, message: &str) {
        self.script().failures.push_back(message.to_string());
    }

    /// Make the next executed command fail with `message`.
    pub fn fail_next_command(&self, message: &str) {
        self.script().command_failures.push_back(message.to_string());
    }

    /// Request cancellation of the caller's context when the next connection
    /// opens.
    pub fn cancel_on_open(&self) {
        self.script().cancel_on_open = true;
    }

    pub fn events(&self) -> Vec<Event> {
        self.script().events.clone()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.events().iter().filter_map(|e| e.command().cloned()).collect()
    }

    pub fn count(&self, wanted: fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| wanted(e)).count()
    }

    pub fn clear(&self) {
        self.script().events.clear();
    }

    fn record(&self, event: Event) -> std::result::Result<(), BoxError> {
        let mut script = self.script();
        let failure = if event.command().is_some() && !script.command_failures.is_empty() {
            script.command_failures.pop_front()
        } else {
            script.failures.pop_front()
        };
        script.events.push(event);
        match failure {
            Some(message) => Err(message.into()),
            None => Ok(()),
        }
    }
}

/// A connection that records every call and replays scripted results.
#[derive(Debug)]
pub struct MockConnection {
    db: MockDb,
    open: bool,
}

fn ready<T: Send>(
    result: std::result::Result<T, BoxError>,
) -> impl Future<Output = Outcome<T, BoxError>> + Send {
    let outcome = match result {
        Ok(value) => Outcome::Ok(value),
        Err(e) => Outcome::Err(e),
    };
    async move { outcome }
}

impl Connection for MockConnection {
    type Reader = BufferedReader;

    fn open(&mut self, cx: &Cx) -> impl Future<Output = Outcome<(), BoxError>> + Send {
        if std::mem::take(&mut self.db.script().cancel_on_open) {
            cx.set_cancel_requested(true);
        }
        self.open = true;
        ready(self.db.record(Event::Open))
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.db.script().events.push(Event::Close);
        }
    }

    fn begin_transaction(
        &mut self,
        _cx: &Cx,
        isolation: Option<IsolationLevel>,
    ) -> impl Future<Output = Outcome<(), BoxError>> + Send {
        ready(self.db.record(Event::Begin(isolation)))
    }

    fn commit(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), BoxError>> + Send {
        ready(self.db.record(Event::Commit))
    }

    fn rollback(&mut self, _cx: &Cx) -> impl Future<Output = Outcome<(), BoxError>> + Send {
        ready(self.db.record(Event::Rollback))
    }

    fn execute_non_query(
        &mut self,
        _cx: &Cx,
        command: &Command,
    ) -> impl Future<Output = Outcome<u64, BoxError>> + Send {
        let result = self
            .db
            .record(Event::NonQuery(command.clone()))
            .map(|()| self.db.script().rows.pop_front().unwrap_or(1));
        ready(result)
    }

    fn execute_scalar(
        &mut self,
        _cx: &Cx,
        command: &Command,
    ) -> impl Future<Output = Outcome<Value, BoxError>> + Send {
        let result = self
            .db
            .record(Event::Scalar(command.clone()))
            .map(|()| self.db.script().scalars.pop_front().unwrap_or(Value::Null));
        ready(result)
    }

    fn execute_reader(
        &mut self,
        _cx: &Cx,
        command: &Command,
    ) -> impl Future<Output = Outcome<BufferedReader, BoxError>> + Send {
        let result = self.db.record(Event::Reader(command.clone())).map(|()| {
            BufferedReader::new(self.db.script().readers.pop_front().unwrap_or_default())
        });
        ready(result)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "Customers")]
pub struct Customer {
    #[column(name = "Id")]
    pub id: i64,
    #[column(name = "Name")]
    pub name: String,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "Invoices")]
pub struct Invoice {
    #[column(name = "Id")]
    pub id: i64,
    #[column(name = "CustomerId")]
    pub customer_id: i64,
    #[column(name = "Total")]
    pub total: f64,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[entity(table = "Countries")]
pub struct Country {
    #[column(identifier, strategy = "assigned", name = "Code")]
    pub code: String,
    #[column(name = "Name")]
    pub name: String,
}

pub fn customers(rows: &[(i64, &str)]) -> ResultSet {
    ResultSet::new(
        ["Id", "Name"],
        rows.iter()
            .map(|(id, name)| vec![Value::BigInt(*id), Value::from(*name)])
            .collect(),
    )
}

pub fn invoices(rows: &[(i64, i64, f64)]) -> ResultSet {
    ResultSet::new(
        ["Id", "CustomerId", "Total"],
        rows.iter()
            .map(|(id, customer, total)| {
                vec![Value::BigInt(*id), Value::BigInt(*customer), Value::Double(*total)]
            })
            .collect(),
    )
}

pub fn factory(
    db: &MockDb,
    kind: DialectKind,
    capabilities: DriverCapabilities,
) -> SessionFactory<impl Fn() -> MockConnection + use<>> {
    let db = db.clone();
    SessionFactory::new(kind, capabilities, move || db.connect())
}

pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

pub fn expect_err<T>(outcome: Outcome<T, Error>) -> Error {
    match outcome {
        Outcome::Ok(_) => panic!("expected an error, got a value"),
        Outcome::Err(e) => e,
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

pub fn run<F: Future<Output = ()>>(test: impl FnOnce(Cx) -> F) {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();
    rt.block_on(test(cx));
}
