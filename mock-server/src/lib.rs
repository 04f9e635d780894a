use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

pub type FieldMap = Map<String, Value>;

/// Base of the links handed out for rendered passes.
pub const PASS_URL_BASE: &str = "http://wallet.mock/p";

pub const PASS_CONTENT_TYPE: &str = "application/vnd.apple.pkpass";

#[derive(Clone, Debug)]
pub struct StoredPass {
    pub id: u64,
    pub template_id: u64,
    pub revision: u64,
    pub fields: FieldMap,
}

impl StoredPass {
    fn url(&self) -> String {
        format!("{PASS_URL_BASE}/{}?rev={}", self.id, self.revision)
    }

    fn to_json(&self) -> Value {
        json!({
            "id": self.id.to_string(),
            "templateId": self.template_id.to_string(),
            "url": self.url(),
            "passFields": self.fields,
        })
    }

    /// Stand-in for the rendered pass archive.
    fn render(&self) -> Vec<u8> {
        let mut bytes = b"PK\x03\x04".to_vec();
        bytes.extend_from_slice(self.to_json().to_string().as_bytes());
        bytes
    }
}

#[derive(Clone, Debug)]
pub struct StoredTemplate {
    pub id: u64,
    pub external_id: Option<String>,
    pub payload: TemplatePayload,
}

impl StoredTemplate {
    fn header(&self) -> Value {
        let mut header = json!({
            "id": self.id.to_string(),
            "name": self.payload.name,
            "description": self.payload.description,
            "type": self.payload.template_type,
        });
        if let Some(external_id) = &self.external_id {
            header["externalId"] = json!(external_id);
        }
        header
    }
}

/// Body of template create/update requests.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TemplatePayload {
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub headers: FieldMap,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub template_type: Option<String>,
}

/// Every request body is a form with a single `json` field.
#[derive(Deserialize)]
pub struct JsonForm {
    pub json: String,
}

#[derive(Deserialize)]
struct AuthQuery {
    api_key: Option<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    passes: HashMap<u64, StoredPass>,
    templates: HashMap<u64, StoredTemplate>,
    external_ids: HashMap<String, u64>,
}

impl Store {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_template(&mut self, external_id: Option<String>, payload: TemplatePayload) -> Result<u64, StatusCode> {
        if let Some(external_id) = &external_id {
            if self.external_ids.contains_key(external_id) {
                return Err(StatusCode::CONFLICT);
            }
        }
        let id = self.allocate_id();
        if let Some(external_id) = &external_id {
            self.external_ids.insert(external_id.clone(), id);
        }
        self.templates.insert(
            id,
            StoredTemplate {
                id,
                external_id,
                payload,
            },
        );
        Ok(id)
    }

    fn resolve(&self, external_id: &str) -> Result<u64, StatusCode> {
        self.external_ids.get(external_id).copied().ok_or(StatusCode::NOT_FOUND)
    }

    fn remove_template(&mut self, id: u64) -> Result<(), StatusCode> {
        let removed = self.templates.remove(&id).ok_or(StatusCode::NOT_FOUND)?;
        if let Some(external_id) = removed.external_id {
            self.external_ids.remove(&external_id);
        }
        Ok(())
    }
}

pub type Db = Arc<RwLock<Store>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    api_key: Option<Arc<str>>,
}

/// Router without authentication.
pub fn app() -> Router {
    app_with_api_key(None)
}

/// Router that rejects requests whose `api_key` query parameter does not
/// match `api_key` (when one is set) with 401.
pub fn app_with_api_key(api_key: Option<String>) -> Router {
    let state = AppState {
        db: Db::default(),
        api_key: api_key.map(Arc::from),
    };
    Router::new()
        .route("/pass/{id}", post(create_pass).get(get_pass).put(update_pass))
        .route("/pass/{id}/download", get(download_pass))
        .route("/template/", post(create_template))
        .route("/template/headers", get(list_template_headers))
        .route(
            "/template/{id}",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route(
            "/template/id/{external_id}",
            get(get_template_by_external_id)
                .post(create_template_with_external_id)
                .put(update_template_by_external_id)
                .delete(delete_template_by_external_id),
        )
        .route("/template/duplicate/{id}", post(duplicate_template))
        .route("/template/duplicate/id/{external_id}", post(duplicate_template_by_external_id))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_api_key(listener: TcpListener, api_key: Option<String>) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_api_key(api_key)).await
}

async fn require_api_key(
    State(state): State<AppState>,
    Query(auth): Query<AuthQuery>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(expected) = &state.api_key {
        if auth.api_key.as_deref() != Some(expected.as_ref()) {
            return Err(StatusCode::UNAUTHORIZED);
        }
    }
    Ok(next.run(request).await)
}

fn decode<T: DeserializeOwned>(form: &JsonForm) -> Result<T, StatusCode> {
    serde_json::from_str(&form.json).map_err(|_| StatusCode::BAD_REQUEST)
}

// --- passes ---

async fn create_pass(
    State(state): State<AppState>,
    Path(template_id): Path<u64>,
    Form(form): Form<JsonForm>,
) -> Result<Json<Value>, StatusCode> {
    let fields: FieldMap = decode(&form)?;
    let mut store = state.db.write().await;
    if !store.templates.contains_key(&template_id) {
        return Err(StatusCode::NOT_FOUND);
    }
    let id = store.allocate_id();
    let pass = StoredPass {
        id,
        template_id,
        revision: 1,
        fields,
    };
    info!(pass_id = id, template_id, "pass created");
    let body = json!({
        "id": id.to_string(),
        "url": pass.url(),
        "passFields": pass.fields,
    });
    store.passes.insert(id, pass);
    Ok(Json(body))
}

async fn get_pass(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
    let store = state.db.read().await;
    store
        .passes
        .get(&id)
        .map(|pass| Json(pass.to_json()))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_pass(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Form(form): Form<JsonForm>,
) -> Result<Json<Value>, StatusCode> {
    let fields: FieldMap = decode(&form)?;
    let mut store = state.db.write().await;
    let pass = store.passes.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    pass.fields = fields;
    pass.revision += 1;
    info!(pass_id = id, revision = pass.revision, "pass updated");
    Ok(Json(json!({ "url": pass.url() })))
}

async fn download_pass(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Response, StatusCode> {
    let store = state.db.read().await;
    let pass = store.passes.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(([(header::CONTENT_TYPE, PASS_CONTENT_TYPE)], pass.render()).into_response())
}

// --- templates ---

async fn create_template(State(state): State<AppState>, Form(form): Form<JsonForm>) -> Result<Json<Value>, StatusCode> {
    let payload: TemplatePayload = decode(&form)?;
    let id = state.db.write().await.insert_template(None, payload)?;
    info!(template_id = id, "template created");
    Ok(Json(json!({ "templateId": id.to_string() })))
}

async fn create_template_with_external_id(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    Form(form): Form<JsonForm>,
) -> Result<Json<Value>, StatusCode> {
    let payload: TemplatePayload = decode(&form)?;
    let id = state.db.write().await.insert_template(Some(external_id.clone()), payload)?;
    info!(template_id = id, external_id = %external_id, "template created");
    Ok(Json(json!({ "templateId": id.to_string() })))
}

async fn template_json(state: &AppState, id: u64) -> Result<Json<Value>, StatusCode> {
    let store = state.db.read().await;
    let template = store.templates.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({
        "templateHeader": template.header(),
        "fieldsModel": template.payload.fields,
    })))
}

async fn get_template(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
    template_json(&state, id).await
}

async fn get_template_by_external_id(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let id = state.db.read().await.resolve(&external_id)?;
    template_json(&state, id).await
}

async fn replace_template(state: &AppState, id: u64, form: &JsonForm) -> Result<Json<Value>, StatusCode> {
    let payload: TemplatePayload = decode(form)?;
    let mut store = state.db.write().await;
    let template = store.templates.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    template.payload = payload;
    info!(template_id = id, "template updated");
    Ok(Json(json!({})))
}

async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Form(form): Form<JsonForm>,
) -> Result<Json<Value>, StatusCode> {
    replace_template(&state, id, &form).await
}

async fn update_template_by_external_id(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    Form(form): Form<JsonForm>,
) -> Result<Json<Value>, StatusCode> {
    let id = state.db.read().await.resolve(&external_id)?;
    replace_template(&state, id, &form).await
}

async fn duplicate(state: &AppState, id: u64) -> Result<Json<Value>, StatusCode> {
    let mut store = state.db.write().await;
    let payload = store.templates.get(&id).ok_or(StatusCode::NOT_FOUND)?.payload.clone();
    let copy = store.insert_template(None, payload)?;
    info!(template_id = copy, source = id, "template duplicated");
    Ok(Json(json!({ "templateId": copy.to_string() })))
}

async fn duplicate_template(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
    duplicate(&state, id).await
}

async fn duplicate_template_by_external_id(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let id = state.db.read().await.resolve(&external_id)?;
    duplicate(&state, id).await
}

async fn delete_template(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
    state.db.write().await.remove_template(id)?;
    info!(template_id = id, "template deleted");
    Ok(Json(json!({})))
}

async fn delete_template_by_external_id(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let mut store = state.db.write().await;
    let id = store.resolve(&external_id)?;
    store.remove_template(id)?;
    info!(template_id = id, external_id = %external_id, "template deleted");
    Ok(Json(json!({})))
}

async fn list_template_headers(State(state): State<AppState>) -> Json<Value> {
    let store = state.db.read().await;
    let mut templates: Vec<&StoredTemplate> = store.templates.values().collect();
    templates.sort_by_key(|t| t.id);
    let headers: Vec<Value> = templates.iter().map(|t| t.header()).collect();
    Json(json!({ "templateHeaders": headers }))
}
