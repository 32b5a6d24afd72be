// Condo Expenses - REST API
// Axum router mapping the expense/category endpoints onto the data-access layer

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::db;
use crate::error::{AppError, AppResult, FieldErrors};
use crate::models::{Category, Expense, ExpenseFilter};
use crate::summary::{self, ExpenseSummary, HomeSummary};
use crate::validation::{
    validate_category, validate_expense_changes, validate_new_expense, CategoryPayload,
    ExpensePayload, UpdateMode,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
    page_size: usize,
    /// Fixed "today" for the home snapshot and default dates; `None` uses the
    /// local clock
    today: Option<NaiveDate>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            page_size: DEFAULT_PAGE_SIZE,
            today: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("database lock poisoned")))
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }
}

/// Build the API router (mounted under `/api` by the server binary)
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/", get(health_check))
        .route("/expenses/", get(list_expenses).post(create_expense))
        .route("/expenses/summary/", get(expense_summary))
        .route(
            "/expenses/:id/",
            get(retrieve_expense)
                .put(replace_expense)
                .patch(patch_expense)
                .delete(delete_expense),
        )
        .route("/categories/", get(list_categories).post(create_category))
        .route(
            "/categories/:id/",
            get(retrieve_category)
                .put(update_category)
                .patch(update_category)
                .delete(delete_category),
        )
        .route("/home-summary/", get(home_summary))
        .route("/homepage-summary/", get(home_summary))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Request helpers
// ============================================================================

/// Unwrap a JSON body, turning a malformed body into a 400 with `detail`
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Path ids that are not integers cannot name an existing row
fn parse_id(raw: &str, not_found: fn(&str) -> AppError) -> AppResult<i64> {
    raw.parse::<i64>().map_err(|_| not_found(raw))
}

fn parse_param<T: FromStr>(
    name: &str,
    raw: Option<&str>,
    errors: &mut FieldErrors,
) -> Option<T> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(name, "A valid integer is required.");
            None
        }
    }
}

/// Query parameters shared by the listing and the summary
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    year: Option<String>,
    month: Option<String>,
    category: Option<String>,
}

impl FilterParams {
    fn to_filter(&self, errors: &mut FieldErrors) -> ExpenseFilter {
        let month: Option<u32> = parse_param("month", self.month.as_deref(), errors);
        if let Some(m) = month {
            if !(1..=12).contains(&m) {
                errors.add("month", "Ensure this value is between 1 and 12.");
            }
        }

        ExpenseFilter {
            year: parse_param("year", self.year.as_deref(), errors),
            month,
            category: parse_param("category", self.category.as_deref(), errors),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    page_size: Option<String>,
    #[serde(flatten)]
    filter: FilterParams,
}

/// One page of the expense listing
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub results: Vec<T>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health/ - Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /expenses/ - Paginated listing, newest first
async fn list_expenses(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<Page<Expense>>> {
    let mut errors = FieldErrors::new();
    let filter = params.filter.to_filter(&mut errors);
    let page: usize = parse_param("page", params.page.as_deref(), &mut errors).unwrap_or(1);
    let page_size: usize = parse_param("page_size", params.page_size.as_deref(), &mut errors)
        .unwrap_or(state.page_size)
        .clamp(1, MAX_PAGE_SIZE);
    errors.into_result(())?;

    // Page 0 and pages whose offset overflows are never addressable
    let offset = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(page_size))
        .ok_or_else(|| AppError::invalid_page(page))?;

    let conn = state.conn()?;
    let count = db::count_expenses(&conn, &filter)?;
    if page > 1 && offset >= count {
        return Err(AppError::invalid_page(page));
    }

    let results = db::list_expenses(&conn, &filter, Some(page_size), offset)?;

    Ok(Json(Page {
        count,
        next: (offset.saturating_add(page_size) < count).then(|| page + 1),
        previous: (page > 1).then_some(page - 1),
        results,
    }))
}

/// POST /expenses/ - Create an expense
async fn create_expense(
    State(state): State<AppState>,
    payload: Result<Json<ExpensePayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let payload = json_body(payload)?;
    let conn = state.conn()?;

    let new_expense = validate_new_expense(&payload, state.today(), |id| {
        db::category_exists(&conn, id)
    })?;
    let expense = db::insert_expense(&conn, &new_expense)?;

    info!(id = expense.id, amount = %expense.amount, date = %expense.date, "expense created");
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /expenses/:id/ - Retrieve one expense
async fn retrieve_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Expense>> {
    let id = parse_id(&id, |raw| AppError::expense_not_found(raw))?;
    let conn = state.conn()?;

    db::get_expense(&conn, id)?
        .map(Json)
        .ok_or_else(|| AppError::expense_not_found(id))
}

async fn update_expense_with(
    state: AppState,
    raw_id: String,
    payload: Result<Json<ExpensePayload>, JsonRejection>,
    mode: UpdateMode,
) -> AppResult<Json<Expense>> {
    let id = parse_id(&raw_id, |raw| AppError::expense_not_found(raw))?;
    let payload = json_body(payload)?;
    let conn = state.conn()?;

    if db::get_expense(&conn, id)?.is_none() {
        return Err(AppError::expense_not_found(id));
    }

    let changes = validate_expense_changes(&payload, mode, |category| {
        db::category_exists(&conn, category)
    })?;
    let expense = db::update_expense(&conn, id, &changes)?
        .ok_or_else(|| AppError::expense_not_found(id))?;

    info!(id, ?mode, "expense updated");
    Ok(Json(expense))
}

/// PUT /expenses/:id/ - Full update
async fn replace_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ExpensePayload>, JsonRejection>,
) -> AppResult<Json<Expense>> {
    update_expense_with(state, id, payload, UpdateMode::Full).await
}

/// PATCH /expenses/:id/ - Partial update
async fn patch_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ExpensePayload>, JsonRejection>,
) -> AppResult<Json<Expense>> {
    update_expense_with(state, id, payload, UpdateMode::Partial).await
}

/// DELETE /expenses/:id/ - Delete an expense
async fn delete_expense(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, |raw| AppError::expense_not_found(raw))?;
    let conn = state.conn()?;

    if !db::delete_expense(&conn, id)? {
        return Err(AppError::expense_not_found(id));
    }

    info!(id, "expense deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /expenses/summary/ - Monthly, per-category and stacked totals
async fn expense_summary(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> AppResult<Json<ExpenseSummary>> {
    let mut errors = FieldErrors::new();
    let filter = params.to_filter(&mut errors);
    errors.into_result(())?;

    let conn = state.conn()?;
    let summary = summary::build_summary(&*conn, &filter)?;

    Ok(Json(summary))
}

/// GET /home-summary/ - Dashboard snapshot for the current month
async fn home_summary(State(state): State<AppState>) -> AppResult<Json<HomeSummary>> {
    let conn = state.conn()?;
    let home = summary::home_snapshot(&*conn, state.today())?;

    Ok(Json(home))
}

/// GET /categories/ - All categories by name
async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let conn = state.conn()?;
    Ok(Json(db::list_categories(&conn)?))
}

/// POST /categories/ - Create a category
async fn create_category(
    State(state): State<AppState>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let payload = json_body(payload)?;
    let conn = state.conn()?;

    let name = validate_category(&payload, |name| {
        Ok(db::find_category_by_name(&conn, name)?.is_some())
    })?;
    let category = db::insert_category(&conn, &name)?;

    info!(id = category.id, name = %category.name, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /categories/:id/ - Retrieve one category
async fn retrieve_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Category>> {
    let id = parse_id(&id, |raw| AppError::category_not_found(raw))?;
    let conn = state.conn()?;

    db::get_category(&conn, id)?
        .map(Json)
        .ok_or_else(|| AppError::category_not_found(id))
}

/// PUT/PATCH /categories/:id/ - Rename a category
async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> AppResult<Json<Category>> {
    let id = parse_id(&id, |raw| AppError::category_not_found(raw))?;
    let payload = json_body(payload)?;
    let conn = state.conn()?;

    if db::get_category(&conn, id)?.is_none() {
        return Err(AppError::category_not_found(id));
    }

    let name = validate_category(&payload, |name| {
        Ok(db::find_category_by_name(&conn, name)?.is_some_and(|other| other.id != id))
    })?;
    let category = db::update_category(&conn, id, &name)?
        .ok_or_else(|| AppError::category_not_found(id))?;

    info!(id, name = %category.name, "category renamed");
    Ok(Json(category))
}

/// DELETE /categories/:id/ - Delete a category, keeping its expenses
async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, |raw| AppError::category_not_found(raw))?;
    let conn = state.conn()?;

    if !db::delete_category(&conn, id)? {
        return Err(AppError::category_not_found(id));
    }

    info!(id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}
