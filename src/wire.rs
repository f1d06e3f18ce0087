use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::Sink;
use futures::stream;
use pgwire::api::auth::StartupHandler;
use pgwire::api::auth::noop::NoopStartupHandler;
use pgwire::api::copy::CopyHandler;
use pgwire::api::portal::{Format, Portal};
use pgwire::api::query::{ExtendedQueryHandler, SimpleQueryHandler};
use pgwire::api::results::{
    DataRowEncoder, DescribePortalResponse, DescribeStatementResponse, FieldFormat, FieldInfo,
    QueryResponse, Response, Tag,
};
use pgwire::api::stmt::{QueryParser, StoredStatement};
use pgwire::api::store::PortalStore;
use pgwire::api::{ClientInfo, ClientPortalStore, NoopHandler, PgWireServerHandlers, Type};
use pgwire::error::{ErrorInfo, PgWireError, PgWireResult};
use pgwire::messages::PgWireBackendMessage;
use tokio::net::TcpStream;

use crate::engine::{Engine, EngineError, Schedule};
use crate::limits::MAX_QUERY_LEN;
use crate::model::*;
use crate::observability::{QUERIES_TOTAL, QUERY_DURATION_SECONDS, command_label};
use crate::sql::{self, Command, SqlError};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct FoodslotHandler {
    engine: Arc<Engine>,
    query_parser: Arc<FoodslotQueryParser>,
}

impl FoodslotHandler {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            query_parser: Arc::new(FoodslotQueryParser),
        }
    }

    async fn run(&self, query: &str) -> PgWireResult<Response> {
        if query.len() > MAX_QUERY_LEN {
            return Err(sql_err(SqlError::Unsupported(format!(
                "query longer than {MAX_QUERY_LEN} bytes"
            ))));
        }
        let cmd = sql::parse_sql(query).map_err(sql_err)?;
        let label = command_label(&cmd);
        let started = Instant::now();
        let result = self.execute_command(cmd).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(QUERIES_TOTAL, "command" => label, "status" => status).increment(1);
        metrics::histogram!(QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(&self, cmd: Command) -> PgWireResult<Response> {
        match cmd {
            Command::InsertReservation { vendor, instant } => {
                self.engine.save(&vendor, instant).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("INSERT").with_rows(1)))
            }
            Command::DeleteReservation { vendor, instant } => {
                self.engine.delete(&vendor, instant).await.map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("DELETE").with_rows(1)))
            }
            Command::SelectReservations { vendor } => {
                let reservations = match vendor {
                    Some(vendor) => self.engine.reservations_of(&vendor).await,
                    None => self.engine.reservations().await,
                }
                .map_err(engine_err)?;
                let granularity = self.engine.granularity();

                let schema = Arc::new(reservations_schema());
                let rows: Vec<PgWireResult<_>> = reservations
                    .into_iter()
                    .map(|r| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&r.id.to_string())?;
                        encoder.encode_field(&r.vendor)?;
                        encoder.encode_field(&r.instant.format(DATE_FORMAT).to_string())?;
                        encoder.encode_field(&weekday_label(r.weekday()).to_string())?;
                        encoder.encode_field(&granularity.shift_of(r.instant).label().to_string())?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }
            Command::SelectSchedule => {
                let schedule = self.engine.list().await.map_err(engine_err)?;
                let schema = Arc::new(schedule_schema());
                let rows = schedule_rows(&schedule, &schema)?;
                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }
        }
    }
}

fn schedule_rows(
    schedule: &Schedule,
    schema: &Arc<Vec<FieldInfo>>,
) -> PgWireResult<Vec<PgWireResult<pgwire::messages::data::DataRow>>> {
    let mut rows = Vec::with_capacity(7);
    for (day, vendors) in schedule.iter() {
        let json = serde_json::to_string(vendors)
            .map_err(|e| PgWireError::ApiError(Box::new(e)))?;
        let mut encoder = DataRowEncoder::new(schema.clone());
        encoder.encode_field(&day.to_string())?;
        encoder.encode_field(&json)?;
        rows.push(Ok(encoder.take_row()));
    }
    Ok(rows)
}

fn text_field(name: &str) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, Type::VARCHAR, FieldFormat::Text)
}

fn reservations_schema() -> Vec<FieldInfo> {
    ["id", "vendor", "date", "day", "shift"]
        .into_iter()
        .map(text_field)
        .collect()
}

fn schedule_schema() -> Vec<FieldInfo> {
    vec![text_field("day"), text_field("vendors")]
}

/// Result columns a statement will produce, for Describe. Matched on
/// keywords since the statement may still hold `$n` placeholders.
fn result_schema(sql: &str) -> Vec<FieldInfo> {
    let upper = sql.to_uppercase();
    if !upper.trim_start().starts_with("SELECT") {
        vec![]
    } else if upper.contains("SCHEDULE") {
        schedule_schema()
    } else if upper.contains("RESERVATIONS") {
        reservations_schema()
    } else {
        vec![]
    }
}

#[async_trait]
impl SimpleQueryHandler for FoodslotHandler {
    async fn do_query<C>(&self, _client: &mut C, query: &str) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(vec![self.run(query).await?])
    }
}

impl NoopStartupHandler for FoodslotHandler {}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct FoodslotQueryParser;

#[async_trait]
impl QueryParser for FoodslotQueryParser {
    type Statement = String;

    async fn parse_sql<C>(
        &self,
        _client: &C,
        sql: &str,
        _types: &[Option<Type>],
    ) -> PgWireResult<String>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        Ok(sql.to_string())
    }

    fn get_parameter_types(&self, stmt: &String) -> PgWireResult<Vec<Type>> {
        Ok(vec![Type::VARCHAR; count_params(stmt)])
    }

    fn get_result_schema(
        &self,
        stmt: &String,
        _column_format: Option<&Format>,
    ) -> PgWireResult<Vec<FieldInfo>> {
        Ok(result_schema(stmt))
    }
}

#[async_trait]
impl ExtendedQueryHandler for FoodslotHandler {
    type Statement = String;
    type QueryParser = FoodslotQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        _client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let sql = substitute_params(&portal.statement.statement, &portal.parameters);
        self.run(&sql).await
    }

    async fn do_describe_statement<C>(
        &self,
        _client: &mut C,
        target: &StoredStatement<Self::Statement>,
    ) -> PgWireResult<DescribeStatementResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let param_types = vec![Type::VARCHAR; count_params(&target.statement)];
        Ok(DescribeStatementResponse::new(
            param_types,
            result_schema(&target.statement),
        ))
    }

    async fn do_describe_portal<C>(
        &self,
        _client: &mut C,
        target: &Portal<Self::Statement>,
    ) -> PgWireResult<DescribePortalResponse>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        Ok(DescribePortalResponse::new(result_schema(
            &target.statement.statement,
        )))
    }
}

/// Highest `$N` placeholder in the SQL string.
fn count_params(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    let mut max = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        i += 1;
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if let Ok(n) = sql[start..i].parse::<usize>() {
            max = max.max(n);
        }
    }
    max
}

/// Substitute `$1, $2, ...` with bound parameter values as quoted text.
/// Highest index first so `$1` never clobbers the prefix of `$10`.
fn substitute_params<B: AsRef<[u8]>>(sql: &str, params: &[Option<B>]) -> String {
    let bytes = sql.as_bytes();
    let mut result = String::with_capacity(sql.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        let dollar = i;
        i += 1;
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let param = sql[start..i]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| params.get(idx));
        // Unknown placeholders stay as written.
        let Some(param) = param else { continue };
        result.push_str(&sql[copied..dollar]);
        match param {
            Some(value) => {
                let text = String::from_utf8_lossy(value.as_ref());
                result.push('\'');
                result.push_str(&text.replace('\'', "''"));
                result.push('\'');
            }
            None => result.push_str("NULL"),
        }
        copied = i;
    }
    result.push_str(&sql[copied..]);
    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct FoodslotFactory {
    handler: Arc<FoodslotHandler>,
    noop: Arc<NoopHandler>,
}

impl FoodslotFactory {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            handler: Arc::new(FoodslotHandler::new(engine)),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for FoodslotFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection until it closes.
pub async fn process_connection(socket: TcpStream, engine: Arc<Engine>) -> std::io::Result<()> {
    let factory = Arc::new(FoodslotFactory::new(engine));
    pgwire::tokio::process_socket(socket, None, factory).await
}

// ── Error mapping ────────────────────────────────────────────────

fn user_error(code: &str, message: String) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        message,
    )))
}

fn engine_err(e: EngineError) -> PgWireError {
    let code = match &e {
        EngineError::Rejected(_) => "P0001",
        EngineError::NotFound { .. } => "P0002",
        EngineError::InvalidVendor => "22023",
        EngineError::LimitExceeded(_) => "54000",
        EngineError::Store(_) => "58030",
    };
    user_error(code, e.to_string())
}

fn sql_err(e: SqlError) -> PgWireError {
    user_error("42601", e.to_string())
}
