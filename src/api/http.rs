use crate::api::types::*;
use crate::config::{HttpServerConfig, TraversalConfig};
use crate::db::Db;
use crate::error::{FamtreeError, Result};
use crate::family::{
    self, ComprehensiveFamilyTree, FamilyStatistics, FamilyTreeNode, Generation, HouseSummary,
    HouseView, PersonWithRelationships, RelationshipsTable,
};
use crate::people::{
    store, Person, PersonGraph, PersonId, PersonInput, PersonRepository, SqliteRepository,
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

type ApiResult<T> = std::result::Result<Json<DataResponse<T>>, FamtreeError>;

fn data<T>(data: T) -> Json<DataResponse<T>> {
    Json(DataResponse { data })
}

impl IntoResponse for FamtreeError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            FamtreeError::PersonNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            FamtreeError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            _ => {
                log::error!("Request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// HTTP server for the genealogy API
pub struct HttpServer {
    state: AppState,
    config: HttpServerConfig,
}

impl HttpServer {
    pub fn new(db: Db, traversal: TraversalConfig, config: HttpServerConfig) -> Self {
        Self {
            state: AppState { db, traversal },
            config,
        }
    }

    /// Bind the configured address and serve until the process exits
    pub async fn run(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.bind_address, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            FamtreeError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to bind to {}: {}. Set http_server.port in config.toml or PORT to use another port.",
                    addr, e
                ),
            ))
        })?;

        log::info!("Starting famtree HTTP server on http://{}", addr);
        log::info!("API root: http://{}/api/v1", addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }

    /// Build the axum router with CORS and request tracing
    pub fn router(&self) -> Router {
        let origin = if self.config.allowed_origins.is_empty() {
            AllowOrigin::from(Any)
        } else {
            let origins: Vec<HeaderValue> = self
                .config
                .allowed_origins
                .iter()
                .filter_map(|o| match o.parse() {
                    Ok(origin) => Some(origin),
                    Err(_) => {
                        log::warn!("Ignoring unparseable allowed origin: {}", o);
                        None
                    }
                })
                .collect();
            AllowOrigin::list(origins)
        };
        let cors = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any);

        let api = Router::new()
            .route("/relationships-table", get(handle_relationships_table))
            .route("/persons", get(handle_list_persons).post(handle_create_person))
            .route("/persons/search", get(handle_search_persons))
            .route(
                "/persons/:id",
                get(handle_get_person)
                    .put(handle_update_person)
                    .delete(handle_delete_person),
            )
            .route("/persons/:id/family-tree", get(handle_person_tree))
            .route("/persons/:id/relationships", get(handle_person_relationships))
            .route("/family-tree", get(handle_comprehensive))
            .route("/family-tree/relationships-table", get(handle_relationships_table))
            .route("/family-tree/house/:house", get(handle_house_summary))
            .route("/houses", get(handle_houses))
            .route("/houses/:house", get(handle_house))
            .route("/generations", get(handle_generations))
            .route("/statistics", get(handle_statistics));

        Router::new()
            .route("/health", get(handle_health))
            .nest("/api/v1", api)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }
}

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    db: Db,
    traversal: TraversalConfig,
}

impl AppState {
    /// Run a read-only family query on a blocking worker with its own connection
    async fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SqliteRepository<'_>, TraversalConfig) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let traversal = self.traversal;
        self.db
            .with_connection(move |conn| f(&SqliteRepository::new(conn), traversal))
            .await
    }
}

fn parse_id(raw: &str) -> Result<PersonId> {
    raw.parse()
        .map_err(|_| FamtreeError::InvalidInput("Invalid ID".to_string()))
}

fn parse_input(body: &[u8]) -> Result<PersonInput> {
    serde_json::from_slice(body)
        .map_err(|e| FamtreeError::InvalidInput(format!("Invalid JSON: {}", e)))
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "famtree",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn handle_create_person(
    State(state): State<AppState>,
    body: Bytes,
) -> std::result::Result<(StatusCode, Json<DataResponse<Person>>), FamtreeError> {
    let input = parse_input(&body)?;
    let person = state
        .db
        .with_connection(move |conn| store::create_person(conn, &input))
        .await?;
    Ok((StatusCode::CREATED, data(person)))
}

async fn handle_list_persons(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<PeopleListing> {
    let wants_table = query.wants_table();
    let listing = state
        .read(move |repo, _| {
            if wants_table {
                let graph = PersonGraph::load(repo)?;
                Ok(PeopleListing::Table(family::relationships_table(&graph)?))
            } else {
                Ok(PeopleListing::People(store::list_people(repo.connection())?))
            }
        })
        .await?;
    Ok(data(listing))
}

async fn handle_search_persons(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<PeopleListing> {
    let wants_table = query.wants_table();
    let q = query.q.unwrap_or_default();
    let listing = state
        .read(move |repo, _| {
            // The table rendering always covers the whole population
            if wants_table {
                let graph = PersonGraph::load(repo)?;
                Ok(PeopleListing::Table(family::relationships_table(&graph)?))
            } else {
                Ok(PeopleListing::People(store::search_people(repo.connection(), &q)?))
            }
        })
        .await?;
    Ok(data(listing))
}

async fn handle_get_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Person> {
    let id = parse_id(&id)?;
    let person = state.read(move |repo, _| repo.get(id)).await?;
    Ok(data(person))
}

async fn handle_update_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Person> {
    let id = parse_id(&id)?;
    let input = parse_input(&body)?;
    let person = state
        .db
        .with_connection(move |conn| store::update_person(conn, id, &input))
        .await?;
    Ok(data(person))
}

async fn handle_delete_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MessageResponse> {
    let id = parse_id(&id)?;
    state
        .db
        .with_connection(move |conn| store::delete_person(conn, id))
        .await?;
    Ok(data(MessageResponse {
        message: "Person deleted successfully".to_string(),
    }))
}

async fn handle_person_tree(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FamilyTreeNode> {
    let id = parse_id(&id)?;
    let tree = state
        .read(move |repo, traversal| {
            family::build_tree(repo, id, traversal.max_tree_depth, traversal.max_tree_nodes)
        })
        .await?;
    log::debug!("Family tree of person {}: {} nodes", id, tree.size());
    Ok(data(tree))
}

async fn handle_person_relationships(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<PersonWithRelationships> {
    let id = parse_id(&id)?;
    let relations = state.read(move |repo, _| family::resolve_all(repo, id)).await?;
    Ok(data(relations))
}

async fn handle_comprehensive(State(state): State<AppState>) -> ApiResult<ComprehensiveFamilyTree> {
    let tree = state
        .read(|repo, traversal| {
            let graph = PersonGraph::load(repo)?;
            family::comprehensive(&graph, traversal.generation_depth)
        })
        .await?;
    Ok(data(tree))
}

async fn handle_relationships_table(State(state): State<AppState>) -> ApiResult<RelationshipsTable> {
    let table = state
        .read(|repo, _| family::relationships_table(&PersonGraph::load(repo)?))
        .await?;
    Ok(data(table))
}

async fn handle_house_summary(
    State(state): State<AppState>,
    Path(house): Path<String>,
) -> ApiResult<HouseSummary> {
    if house.trim().is_empty() {
        return Err(FamtreeError::InvalidInput("House name is required".to_string()));
    }
    let summary = state
        .read(move |repo, traversal| {
            let graph = PersonGraph::load(repo)?;
            family::house_summary(&graph, &house, traversal.generation_depth)
        })
        .await?;
    Ok(data(summary))
}

async fn handle_houses(State(state): State<AppState>) -> ApiResult<Vec<HouseView>> {
    let houses = state
        .read(|repo, _| family::all_houses(&PersonGraph::load(repo)?))
        .await?;
    Ok(data(houses))
}

async fn handle_house(
    State(state): State<AppState>,
    Path(house): Path<String>,
) -> ApiResult<HouseView> {
    let view = state.read(move |repo, _| family::by_house(repo, &house)).await?;
    Ok(data(view))
}

async fn handle_generations(State(state): State<AppState>) -> ApiResult<Vec<Generation>> {
    let generations = state
        .read(|repo, traversal| {
            family::classify(&PersonGraph::load(repo)?, traversal.generation_depth)
        })
        .await?;
    Ok(data(generations))
}

async fn handle_statistics(State(state): State<AppState>) -> ApiResult<FamilyStatistics> {
    let stats = state
        .read(|repo, traversal| {
            family::aggregate(&PersonGraph::load(repo)?, traversal.generation_depth)
        })
        .await?;
    Ok(data(stats))
}
