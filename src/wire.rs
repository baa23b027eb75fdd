use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream;
use futures::Sink;
use pgwire::api::auth::cleartext::CleartextPasswordAuthStartupHandler;
use pgwire::api::auth::{DefaultServerParameterProvider, StartupHandler};
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
use pgwire::tokio::TlsAcceptor;
use tokio::net::TcpStream;

use crate::auth::LidoAuthSource;
use crate::engine::{Engine, EngineError};
use crate::model::*;
use crate::observability;
use crate::sql::{self, Command, SqlError};

pub struct LidoHandler {
    engine: Arc<Engine>,
    managers: Arc<HashSet<String>>,
    query_parser: Arc<LidoQueryParser>,
}

impl LidoHandler {
    pub fn new(engine: Arc<Engine>, managers: Arc<HashSet<String>>) -> Self {
        Self {
            engine,
            managers,
            query_parser: Arc::new(LidoQueryParser),
        }
    }

    /// The authenticated login name is the actor; membership in the manager set grants staff rights.
    fn resolve_actor<C: ClientInfo>(&self, client: &C) -> PgWireResult<Actor> {
        let user = client
            .metadata()
            .get("user")
            .filter(|u| !u.is_empty())
            .cloned()
            .ok_or_else(|| user_error("28000", "no user in startup message".into()))?;
        if self.managers.contains(&user) {
            Ok(Actor::manager(user.as_str()))
        } else {
            Ok(Actor::customer(user.as_str()))
        }
    }

    async fn run(&self, actor: &Actor, query: &str) -> PgWireResult<Response> {
        let started = Instant::now();
        let parsed = sql::parse_sql(query);
        let label = match &parsed {
            Ok(cmd) => observability::command_label(cmd),
            Err(_) => "unparsed",
        };
        let result = match parsed {
            Ok(cmd) => self.execute_command(actor, cmd).await,
            Err(e) => Err(sql_err(e)),
        };
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(observability::QUERIES_TOTAL, "command" => label, "status" => status)
            .increment(1);
        metrics::histogram!(observability::QUERY_DURATION_SECONDS, "command" => label)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn execute_command(&self, actor: &Actor, cmd: Command) -> PgWireResult<Response> {
        match cmd {
            Command::InsertReservation(request) => {
                let created = self
                    .engine
                    .create_reservation(actor, request)
                    .await
                    .map_err(engine_err)?;
                self.reservation_rows(vec![created])
            }
            Command::SelectReservations => {
                let all = self.engine.list_reservations(actor).await;
                self.reservation_rows(all)
            }
            Command::SelectReservation { id } => {
                let one = self
                    .engine
                    .get_reservation(id, actor)
                    .await
                    .map_err(engine_err)?;
                self.reservation_rows(vec![one])
            }
            Command::DeleteReservation { id } => {
                self.engine
                    .delete_reservation(id, actor)
                    .await
                    .map_err(engine_err)?;
                Ok(Response::Execution(Tag::new("DELETE").with_rows(1)))
            }
            Command::SelectFreeUmbrellas {
                start_date,
                end_date,
            } => {
                let free = self
                    .engine
                    .free_umbrellas(start_date, end_date)
                    .await
                    .map_err(engine_err)?;

                let schema = Arc::new(free_umbrellas_schema());
                let rows: Vec<PgWireResult<_>> = free
                    .into_iter()
                    .map(|umbrella_id| {
                        let mut encoder = DataRowEncoder::new(schema.clone());
                        encoder.encode_field(&(umbrella_id as i32))?;
                        Ok(encoder.take_row())
                    })
                    .collect();

                Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
            }
        }
    }

    fn reservation_rows(&self, reservations: Vec<Reservation>) -> PgWireResult<Response> {
        let schema = Arc::new(reservation_schema());
        let rows: Vec<PgWireResult<_>> = reservations
            .into_iter()
            .map(|r| {
                let price = self.engine.price_of(&r);
                let mut encoder = DataRowEncoder::new(schema.clone());
                encoder.encode_field(&r.id.to_string())?;
                encoder.encode_field(&r.customer.to_string())?;
                encoder.encode_field(&(r.number_of_seats as i32))?;
                encoder.encode_field(&r.start_date().to_string())?;
                encoder.encode_field(&r.end_date().to_string())?;
                encoder.encode_field(&(r.umbrella_id as i32))?;
                encoder.encode_field(&price.to_string())?;
                Ok(encoder.take_row())
            })
            .collect();
        Ok(Response::Query(QueryResponse::new(schema, stream::iter(rows))))
    }
}

fn text_field(name: &str, ty: Type) -> FieldInfo {
    FieldInfo::new(name.into(), None, None, ty, FieldFormat::Text)
}

fn reservation_schema() -> Vec<FieldInfo> {
    vec![
        text_field("id", Type::VARCHAR),
        text_field("customer", Type::VARCHAR),
        text_field("number_of_seats", Type::INT4),
        text_field("start_date", Type::DATE),
        text_field("end_date", Type::DATE),
        text_field("umbrella_id", Type::INT4),
        text_field("price", Type::NUMERIC),
    ]
}

fn free_umbrellas_schema() -> Vec<FieldInfo> {
    vec![text_field("umbrella_id", Type::INT4)]
}

/// Result columns a statement will produce, judged from its text before parameters are bound.
fn result_schema(sql: &str) -> Vec<FieldInfo> {
    let upper = sql.to_uppercase();
    if upper.contains("FREE_UMBRELLAS") {
        free_umbrellas_schema()
    } else if upper.contains("RESERVATIONS") && (upper.contains("SELECT") || upper.contains("INSERT")) {
        reservation_schema()
    } else {
        vec![]
    }
}

#[async_trait]
impl SimpleQueryHandler for LidoHandler {
    async fn do_query<C>(
        &self,
        client: &mut C,
        query: &str,
    ) -> PgWireResult<Vec<Response>>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let actor = self.resolve_actor(client)?;
        Ok(vec![self.run(&actor, query).await?])
    }
}

// ── Extended Query Protocol ──────────────────────────────────────

#[derive(Debug)]
pub struct LidoQueryParser;

#[async_trait]
impl QueryParser for LidoQueryParser {
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
impl ExtendedQueryHandler for LidoHandler {
    type Statement = String;
    type QueryParser = LidoQueryParser;

    fn query_parser(&self) -> Arc<Self::QueryParser> {
        self.query_parser.clone()
    }

    async fn do_query<C>(
        &self,
        client: &mut C,
        portal: &Portal<Self::Statement>,
        _max_rows: usize,
    ) -> PgWireResult<Response>
    where
        C: ClientInfo + ClientPortalStore + Sink<PgWireBackendMessage> + Unpin + Send + Sync,
        C::PortalStore: PortalStore<Statement = Self::Statement>,
        C::Error: Debug,
        PgWireError: From<C::Error>,
    {
        let actor = self.resolve_actor(client)?;
        let sql = substitute_params(portal);
        self.run(&actor, &sql).await
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

/// Count the highest $N parameter placeholder in the SQL string.
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

/// Substitute $1, $2, ... placeholders with bound parameter values (text format).
/// Every value becomes a quoted literal; numeric columns accept quoted integers.
/// Highest index first so `$1` never clobbers the prefix of `$10`.
fn substitute_params(portal: &Portal<String>) -> String {
    let params: Vec<Option<String>> = portal
        .parameters
        .iter()
        .map(|p| p.as_ref().map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
        .collect();
    substitute_text(&portal.statement.statement, &params)
}

fn substitute_text(sql: &str, params: &[Option<String>]) -> String {
    let mut result = sql.to_string();
    for (i, param) in params.iter().enumerate().rev() {
        let placeholder = format!("${}", i + 1);
        let value = match param {
            Some(text) => format!("'{}'", text.replace('\'', "''")),
            None => "NULL".to_string(),
        };
        result = result.replace(&placeholder, &value);
    }
    result
}

// ── Factory ──────────────────────────────────────────────────────

pub struct LidoFactory {
    handler: Arc<LidoHandler>,
    auth_handler:
        Arc<CleartextPasswordAuthStartupHandler<LidoAuthSource, DefaultServerParameterProvider>>,
    noop: Arc<NoopHandler>,
}

impl LidoFactory {
    pub fn new(engine: Arc<Engine>, managers: Arc<HashSet<String>>, password: String) -> Self {
        let auth_source = LidoAuthSource::new(password);
        let param_provider = DefaultServerParameterProvider::default();
        Self {
            handler: Arc::new(LidoHandler::new(engine, managers)),
            auth_handler: Arc::new(CleartextPasswordAuthStartupHandler::new(
                auth_source,
                param_provider,
            )),
            noop: Arc::new(NoopHandler),
        }
    }
}

impl PgWireServerHandlers for LidoFactory {
    fn simple_query_handler(&self) -> Arc<impl SimpleQueryHandler> {
        self.handler.clone()
    }

    fn extended_query_handler(&self) -> Arc<impl ExtendedQueryHandler> {
        self.handler.clone()
    }

    fn startup_handler(&self) -> Arc<impl StartupHandler> {
        self.auth_handler.clone()
    }

    fn copy_handler(&self) -> Arc<impl CopyHandler> {
        self.noop.clone()
    }
}

/// Serve one client connection until it closes.
pub async fn process_connection(
    socket: TcpStream,
    factory: Arc<LidoFactory>,
    tls: Option<TlsAcceptor>,
) -> std::io::Result<()> {
    pgwire::tokio::process_socket(socket, tls, factory).await
}

// ── Errors ───────────────────────────────────────────────────────

fn user_error(code: &str, message: String) -> PgWireError {
    PgWireError::UserError(Box::new(ErrorInfo::new(
        "ERROR".into(),
        code.into(),
        message,
    )))
}

pub fn engine_sqlstate(e: &EngineError) -> &'static str {
    match e {
        EngineError::Invalid(_) => "23514",
        EngineError::InvalidDateOrder { .. } => "22008",
        EngineError::OverlapConflict { .. } => "23P01",
        EngineError::NotFound(_) => "02000",
        EngineError::Forbidden(_) => "42501",
        EngineError::LimitExceeded(_) => "54000",
    }
}

fn engine_err(e: EngineError) -> PgWireError {
    user_error(engine_sqlstate(&e), e.to_string())
}

fn sql_err(e: SqlError) -> PgWireError {
    let code = match e {
        SqlError::BadDate(_) => "22007",
        _ => "42601",
    };
    user_error(code, e.to_string())
}
