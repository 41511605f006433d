//! API Routes
//!
//! HTTP endpoint definitions. Each endpoint unpacks the request, hands the
//! authenticated caller to its handler and wraps the result in a status.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::resources::{
    Collection, DebitCardResource, DebitCardTransactionResource, LoanDetailResource, LoanResource,
};
use crate::domain::{DebitCardId, DebitCardTransactionId, LoanId};
use crate::error::{AppError, AppResult};
use crate::handlers::{DebitCardHandler, DebitCardTransactionHandler, LoanHandler};
use crate::policy::Caller;
use crate::state::AppState;

// =========================================================================
// Request types
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct DebitCardTransactionQuery {
    #[serde(default)]
    pub debit_card_id: Option<String>,
}

/// Body as untyped JSON; field rules live in the validation layer
fn json_body(payload: Result<Json<Value>, JsonRejection>) -> AppResult<Value> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> AppResult<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

fn path_id(id: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    id.map(|Path(id)| id)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/debit-cards", get(list_debit_cards).post(create_debit_card))
        .route(
            "/debit-cards/:id",
            get(show_debit_card)
                .put(update_debit_card)
                .delete(delete_debit_card),
        )
        .route(
            "/debit-card-transactions",
            get(list_debit_card_transactions).post(create_debit_card_transaction),
        )
        .route(
            "/debit-card-transactions/:id",
            get(show_debit_card_transaction),
        )
        .route("/loans", get(list_loans))
        .route("/loans/:id", get(show_loan))
}

// =========================================================================
// Debit cards
// =========================================================================

/// GET /debit-cards
async fn list_debit_cards(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> AppResult<Json<Vec<DebitCardResource>>> {
    let handler = DebitCardHandler::new(state.store);
    Ok(Json(handler.list(&caller).await?))
}

/// POST /debit-cards
async fn create_debit_card(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DebitCardResource>)> {
    let payload = json_body(payload)?;
    let handler = DebitCardHandler::new(state.store);

    let card = handler.create(&caller, &payload).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

/// GET /debit-cards/:id
async fn show_debit_card(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<DebitCardResource>> {
    let id = DebitCardId(path_id(id)?);
    let handler = DebitCardHandler::new(state.store);

    Ok(Json(handler.show(&caller, id).await?))
}

/// PUT /debit-cards/:id
async fn update_debit_card(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<DebitCardResource>> {
    let id = DebitCardId(path_id(id)?);
    let payload = json_body(payload)?;
    let handler = DebitCardHandler::new(state.store);

    Ok(Json(handler.update(&caller, id, &payload).await?))
}

/// DELETE /debit-cards/:id
async fn delete_debit_card(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let id = DebitCardId(path_id(id)?);
    let handler = DebitCardHandler::new(state.store);

    handler.delete(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Debit card transactions
// =========================================================================

/// GET /debit-card-transactions
async fn list_debit_card_transactions(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<DebitCardTransactionQuery>, QueryRejection>,
) -> AppResult<Json<Collection<DebitCardTransactionResource>>> {
    let query = query_params(query)?;
    let handler = DebitCardTransactionHandler::new(state.store);

    let transactions = handler
        .list(&caller, query.debit_card_id.as_deref())
        .await?;
    Ok(Json(Collection::new(transactions)))
}

/// POST /debit-card-transactions
async fn create_debit_card_transaction(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DebitCardTransactionResource>)> {
    let payload = json_body(payload)?;
    let handler = DebitCardTransactionHandler::new(state.store);

    let transaction = handler.create(&caller, &payload).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET /debit-card-transactions/:id
async fn show_debit_card_transaction(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<DebitCardTransactionResource>> {
    let id = DebitCardTransactionId(path_id(id)?);
    let handler = DebitCardTransactionHandler::new(state.store);

    Ok(Json(handler.show(&caller, id).await?))
}

// =========================================================================
// Loans
// =========================================================================

/// GET /loans
async fn list_loans(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> AppResult<Json<Collection<LoanResource>>> {
    let handler = LoanHandler::new(state.store);
    Ok(Json(Collection::new(handler.list(&caller).await?)))
}

/// GET /loans/:id
async fn show_loan(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<LoanDetailResource>> {
    let id = LoanId(path_id(id)?);
    let handler = LoanHandler::new(state.store);

    Ok(Json(handler.show(&caller, id).await?))
}
