//! Customer routes: request validation and result-to-status mapping.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Map, Value};

use custdb::domain::customer::{Customer, CustomerId, LookupField};
use custdb::gateway::GatewayError;

use crate::error::{ApiError, ApiResult, MISSING_BODY};
use crate::state::AppState;

pub const QUERY_REQUIRED: &str = "query string is required";
pub const SINGLE_PAIR_ONLY: &str = "only a single name/value pair is supported";
pub const FIELD_NOT_ALLOWED: &str = "name must be one of the following (id, email, password)";

/// `GET /customers`
pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    state
        .gateway
        .list()
        .await
        .map(Json)
        .map_err(ApiError::internal)
}

/// `GET /customers/find?field=value`
///
/// Matches are filtered from a full listing, so concurrent writes between the
/// listing and the filter are not observed.
pub async fn find_customers(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<Vec<Customer>>> {
    let (field, value) = parse_lookup(pairs)?;
    let matches = state
        .gateway
        .list()
        .await
        .map_err(ApiError::internal)?
        .into_iter()
        .filter(|customer| customer.matches(field, &value))
        .collect::<Vec<_>>();
    if matches.is_empty() {
        return Err(ApiError::NoMatch);
    }
    Ok(Json(matches))
}

/// `GET /customers/:id`
pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    state
        .gateway
        .find_by_id(&id)
        .await
        .map(Json)
        .map_err(ApiError::not_found)
}

/// `POST /customers`
///
/// Responds with the submitted fields plus the storage identity under `_id`.
pub async fn create_customer(
    State(state): State<AppState>,
    body: Option<Json<Value>>,
) -> ApiResult<(StatusCode, Json<Map<String, Value>>)> {
    let customer = Customer::from_fields(required_body(body)?);
    let storage_id = state
        .gateway
        .insert(customer.clone())
        .await
        .map_err(ApiError::bad_request)?;
    Ok((StatusCode::CREATED, Json(customer.with_storage_id(storage_id))))
}

/// `PUT /customers/:id`
///
/// The path id wins over any `id` in the body, and `_id` is never written.
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Option<Json<Value>>,
) -> ApiResult<Json<Value>> {
    let mut customer = Customer::from_fields(required_body(body)?);
    customer.set_id(CustomerId::coerce(&id));
    let message = state
        .gateway
        .update(customer)
        .await
        .map_err(ApiError::bad_request)?;
    Ok(Json(json!({ "message": message })))
}

/// `DELETE /customers/:id`
pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    match state.gateway.delete_by_id(&id).await {
        Ok(message) => Ok(Json(json!({ "message": message }))),
        Err(error @ GatewayError::Inconsistent(_)) => Err(ApiError::internal(error)),
        Err(error) => Err(ApiError::not_found(error)),
    }
}

/// `GET /reset`
pub async fn reset_customers(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let message = state
        .gateway
        .reset()
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(json!({ "message": message })))
}

/// Exactly one whitelisted `name=value` pair.
pub fn parse_lookup(pairs: Vec<(String, String)>) -> ApiResult<(LookupField, String)> {
    let mut pairs = pairs.into_iter();
    let Some((name, value)) = pairs.next() else {
        return Err(ApiError::InvalidQuery(QUERY_REQUIRED));
    };
    // A repeated key (`?id=1&id=2`) counts as a second pair. It is rejected
    // here, where an array-valued lookup would just match nothing.
    if pairs.next().is_some() {
        return Err(ApiError::InvalidQuery(SINGLE_PAIR_ONLY));
    }
    let field = name
        .parse::<LookupField>()
        .map_err(|_| ApiError::InvalidQuery(FIELD_NOT_ALLOWED))?;
    Ok((field, value))
}

/// A JSON object with at least one field.
pub fn required_body(body: Option<Json<Value>>) -> ApiResult<Map<String, Value>> {
    match body {
        Some(Json(Value::Object(fields))) if !fields.is_empty() => Ok(fields),
        _ => Err(ApiError::BadRequest(MISSING_BODY.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_lookup() {
        assert_eq!(
            parse_lookup(pairs(&[("email", "maryj@abc.com")])),
            Ok((LookupField::Email, "maryj@abc.com".to_owned()))
        );
        assert_eq!(
            parse_lookup(pairs(&[])),
            Err(ApiError::InvalidQuery(QUERY_REQUIRED))
        );
        assert_eq!(
            parse_lookup(pairs(&[("id", "1"), ("email", "x")])),
            Err(ApiError::InvalidQuery(SINGLE_PAIR_ONLY))
        );
        assert_eq!(
            parse_lookup(pairs(&[("id", "1"), ("id", "2")])),
            Err(ApiError::InvalidQuery(SINGLE_PAIR_ONLY))
        );
        assert_eq!(
            parse_lookup(pairs(&[("id", "1"), ("id", "1")])),
            Err(ApiError::InvalidQuery(SINGLE_PAIR_ONLY))
        );
        assert_eq!(
            parse_lookup(pairs(&[("name", "Mary Jackson")])),
            Err(ApiError::InvalidQuery(FIELD_NOT_ALLOWED))
        );
        assert_eq!(
            parse_lookup(pairs(&[("ID", "1")])),
            Err(ApiError::InvalidQuery(FIELD_NOT_ALLOWED))
        );
    }

    #[test]
    fn test_required_body() {
        let missing = Err(ApiError::BadRequest(MISSING_BODY.to_owned()));
        assert_eq!(required_body(None), missing);
        assert_eq!(required_body(Some(Json(json!({})))), missing);
        assert_eq!(required_body(Some(Json(json!([1, 2])))), missing);
        assert_eq!(required_body(Some(Json(json!("name")))), missing);
        let fields = required_body(Some(Json(json!({"name": "A"})))).unwrap();
        assert_eq!(fields.get("name"), Some(&json!("A")));
    }
}
