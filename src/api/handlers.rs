use std::{fmt::Display, str::FromStr};

use axum::{extract::State, http::StatusCode, Json};
use serde::{de, Deserialize, Deserializer};
use tracing::info;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};

use super::{
    dto::{LocationDto, NewLocationDto, NewReadingDto, ReadingDto, UpdateLocationDto},
    errors::AppError,
    extract::{JsonBody, PathParam, QueryParams},
    AppState,
};
use crate::{
    db::{self, models::NewReading, readings::PgReadingStore},
    readings::TimeFrameQuery,
    timeframe::{TimeFrame, TimeFrameParser},
    validation::{validate_location_name, validate_reading, Validator},
};

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct LocationSearchParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub id: Option<i64>,
    pub name: Option<String>,
}

/// `?id=` counts as an absent parameter; anything else must parse.
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(de::Error::custom),
    }
}

/// Either `?period=24h` or `?digits=24&unit=h`. `period` wins when both are
/// given.
#[derive(Debug, Default, Deserialize)]
pub struct TimeFrameParams {
    pub period: Option<String>,
    pub digits: Option<String>,
    pub unit: Option<String>,
}

impl TimeFrameParams {
    pub fn resolve(&self, parser: &TimeFrameParser) -> TimeFrame {
        let digits = self.digits.as_deref().filter(|s| !s.is_empty());
        let unit = self.unit.as_deref().filter(|s| !s.is_empty());
        match (self.period.as_deref(), digits, unit) {
            (Some(period), _, _) => parser.parse(period),
            (None, None, None) => parser.parse(""),
            (None, digits, unit) => parser.parse_parts(digits, unit),
        }
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// List every location.
#[utoipa::path(
    get,
    path = "/api/location",
    responses(
        (status = 200, description = "All locations", body = Vec<LocationDto>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 500, description = "Internal server error"),
    ),
    security(("api_key" = [])),
    tag = "locations"
)]
pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<LocationDto>>, AppError> {
    let rows = db::locations::list(&state.pool).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Find locations by id and/or a case-insensitive name fragment.
#[utoipa::path(
    get,
    path = "/api/location/search",
    params(
        ("id"   = Option<i64>,    Query, description = "Location ID"),
        ("name" = Option<String>, Query, description = "Part of the location name"),
    ),
    responses(
        (status = 200, description = "Matching locations", body = Vec<LocationDto>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 500, description = "Internal server error"),
    ),
    security(("api_key" = [])),
    tag = "locations"
)]
pub async fn search_locations(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<LocationSearchParams>,
) -> Result<Json<Vec<LocationDto>>, AppError> {
    let name = params.name.as_deref().filter(|s| !s.is_empty());
    let rows = db::locations::search(&state.pool, params.id, name).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Fetch a single location.
#[utoipa::path(
    get,
    path = "/api/location/{id}",
    params(("id" = i64, Path, description = "Location ID")),
    responses(
        (status = 200, description = "The location", body = LocationDto),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No such location"),
        (status = 500, description = "Internal server error"),
    ),
    security(("api_key" = [])),
    tag = "locations"
)]
pub async fn get_location(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<LocationDto>, AppError> {
    let location = db::locations::get(&state.pool, id)
        .await?
        .ok_or_else(|| location_not_found(id))?;
    Ok(Json(location.into()))
}

/// Create one or more locations. Either all are created or none.
#[utoipa::path(
    post,
    path = "/api/location/new",
    request_body = Vec<NewLocationDto>,
    responses(
        (status = 201, description = "Created locations", body = Vec<LocationDto>),
        (status = 400, description = "Empty request body"),
        (status = 401, description = "Missing or invalid admin API key"),
        (status = 409, description = "A location with that name already exists"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error"),
    ),
    security(("api_key" = [])),
    tag = "locations"
)]
pub async fn create_locations(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Vec<NewLocationDto>>,
) -> Result<(StatusCode, Json<Vec<LocationDto>>), AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest(
            "body must contain at least one location".into(),
        ));
    }

    let mut v = Validator::new();
    for (i, item) in body.iter().enumerate() {
        v.item(i, |v| validate_location_name(v, &item.name));
    }
    v.into_result()?;

    let names: Vec<String> = body.into_iter().map(|l| l.name).collect();
    let created = db::locations::insert_many(&state.pool, &names)
        .await
        .map_err(duplicate_name)?;

    info!(count = created.len(), "Locations created");
    Ok((
        StatusCode::CREATED,
        Json(created.into_iter().map(Into::into).collect()),
    ))
}

/// Rename a location.
#[utoipa::path(
    patch,
    path = "/api/location/{id}",
    params(("id" = i64, Path, description = "Location ID")),
    request_body = UpdateLocationDto,
    responses(
        (status = 200, description = "Updated location", body = LocationDto),
        (status = 401, description = "Missing or invalid admin API key"),
        (status = 404, description = "No such location"),
        (status = 409, description = "A location with that name already exists"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error"),
    ),
    security(("api_key" = [])),
    tag = "locations"
)]
pub async fn update_location(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<UpdateLocationDto>,
) -> Result<Json<LocationDto>, AppError> {
    let current = db::locations::get(&state.pool, id)
        .await?
        .ok_or_else(|| location_not_found(id))?;

    let name = body.name.unwrap_or(current.name);
    let mut v = Validator::new();
    validate_location_name(&mut v, &name);
    v.into_result()?;

    let updated = db::locations::update_name(&state.pool, id, &name)
        .await
        .map_err(duplicate_name)?
        .ok_or_else(|| location_not_found(id))?;

    info!(location_id = id, "Location updated");
    Ok(Json(updated.into()))
}

/// Delete a location that has no co2 data.
#[utoipa::path(
    delete,
    path = "/api/location/{id}",
    params(("id" = i64, Path, description = "Location ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Missing or invalid admin API key"),
        (status = 404, description = "No such location"),
        (status = 409, description = "Location still has co2 data"),
        (status = 500, description = "Internal server error"),
    ),
    security(("api_key" = [])),
    tag = "locations"
)]
pub async fn delete_location(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<StatusCode, AppError> {
    let deleted = db::locations::delete(&state.pool, id)
        .await
        .map_err(|e| {
            if db::is_foreign_key_violation(&e) {
                AppError::Conflict(format!("location {id} still has co2 data"))
            } else {
                e.into()
            }
        })?;

    if !deleted {
        return Err(location_not_found(id));
    }

    info!(location_id = id, "Location deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// CO2 data
// ---------------------------------------------------------------------------

/// Fetch the co2 data of a location recorded within a time frame, newest
/// first. The time frame is `now - period`, where `period` is a count
/// followed by `m`, `h` or `d`. Malformed periods fall back to 6 hours;
/// periods above the configured maximum are capped to it.
#[utoipa::path(
    get,
    path = "/api/co2data/{id}/search",
    params(
        ("id"     = i64,            Path,  description = "Location ID"),
        ("period" = Option<String>, Query, description = "Time frame such as 90m, 24h or 3d"),
        ("digits" = Option<String>, Query, description = "Time frame count, used when period is absent (default 6)"),
        ("unit"   = Option<String>, Query, description = "Time frame unit m, h or d, used when period is absent (default m)"),
    ),
    responses(
        (status = 200, description = "CO2 data in the time frame", body = Vec<ReadingDto>),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "No such location"),
        (status = 500, description = "Internal server error"),
    ),
    security(("api_key" = [])),
    tag = "co2data"
)]
pub async fn get_readings_by_time_frame(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    QueryParams(params): QueryParams<TimeFrameParams>,
) -> Result<Json<Vec<ReadingDto>>, AppError> {
    if db::locations::get(&state.pool, id).await?.is_none() {
        return Err(location_not_found(id));
    }

    let time_frame = params.resolve(&state.time_frames);
    let query = TimeFrameQuery::new(PgReadingStore::new(state.pool.clone()));
    let rows = query.fetch_window(id, time_frame.duration).await?;

    info!(
        location_id = id,
        window_secs = time_frame.duration.as_secs(),
        clamped = time_frame.is_clamped(),
        defaulted = time_frame.is_defaulted(),
        count = rows.len(),
        "Served co2 data by time frame"
    );
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

/// Fetch the most recent co2 data of a location.
#[utoipa::path(
    get,
    path = "/api/co2data/{id}/latest",
    params(("id" = i64, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Latest co2 data", body = ReadingDto),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Location has no co2 data"),
        (status = 500, description = "Internal server error"),
    ),
    security(("api_key" = [])),
    tag = "co2data"
)]
pub async fn get_latest_reading(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<ReadingDto>, AppError> {
    let query = TimeFrameQuery::new(PgReadingStore::new(state.pool.clone()));
    let reading = query.fetch_latest(id).await?;
    Ok(Json(reading.into()))
}

/// Record one or more readings. Either all are stored or none.
#[utoipa::path(
    post,
    path = "/api/co2data/new",
    request_body = Vec<NewReadingDto>,
    responses(
        (status = 201, description = "Stored co2 data", body = Vec<ReadingDto>),
        (status = 400, description = "Empty body or unknown location"),
        (status = 401, description = "Missing or invalid admin API key"),
        (status = 422, description = "Validation failed"),
        (status = 500, description = "Internal server error"),
    ),
    security(("api_key" = [])),
    tag = "co2data"
)]
pub async fn create_readings(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Vec<NewReadingDto>>,
) -> Result<(StatusCode, Json<Vec<ReadingDto>>), AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest(
            "body must contain at least one co2 data entry".into(),
        ));
    }

    let mut v = Validator::new();
    for (i, r) in body.iter().enumerate() {
        v.item(i, |v| validate_reading(v, r.location_id, r.co2, r.temperature, r.humidity));
    }
    v.into_result()?;

    let readings: Vec<NewReading> = body.into_iter().map(Into::into).collect();
    let created = db::readings::insert_many(&state.pool, &readings)
        .await
        .map_err(|e| {
            if db::is_foreign_key_violation(&e) {
                AppError::BadRequest("location does not exist".into())
            } else {
                e.into()
            }
        })?;

    info!(count = created.len(), "CO2 data created");
    Ok((
        StatusCode::CREATED,
        Json(created.into_iter().map(Into::into).collect()),
    ))
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Returns `200 OK` with `{"status":"ok"}` when the server is running.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
    ),
    tag = "system"
)]
pub async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Answers every request that matches no route.
pub async fn route_not_found() -> AppError {
    AppError::NotFound("route not found".into())
}

fn location_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("location {id} not found"))
}

fn duplicate_name(e: sqlx::Error) -> AppError {
    if db::is_unique_violation(&e) {
        AppError::Conflict("a location with that name already exists".into())
    } else {
        e.into()
    }
}

// ---------------------------------------------------------------------------
// OpenAPI spec
// ---------------------------------------------------------------------------

struct ApiKeyScheme;

impl Modify for ApiKeyScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-KEY"))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        list_locations,
        search_locations,
        get_location,
        create_locations,
        update_location,
        delete_location,
        get_readings_by_time_frame,
        get_latest_reading,
        create_readings,
        health,
    ),
    components(schemas(
        LocationDto,
        NewLocationDto,
        UpdateLocationDto,
        ReadingDto,
        NewReadingDto,
    )),
    modifiers(&ApiKeyScheme),
    tags(
        (name = "locations", description = "Location endpoints"),
        (name = "co2data",   description = "CO2 data endpoints"),
        (name = "system",    description = "System endpoints"),
    ),
    info(
        title = "CO2 Monitor API",
        version = "0.1.0",
        description = "REST API for CO2, temperature and humidity readings"
    )
)]
pub struct ApiDoc;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
