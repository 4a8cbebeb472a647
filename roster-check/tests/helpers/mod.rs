//! Test Helper Utilities
//!
//! Local stand-ins for the Google Sheets, xivapi and OAuth token endpoints.

#![allow(dead_code)]

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde_json::json;
use std::collections::HashMap;

/// Access token the fake Sheets API accepts
pub const GOOD_TOKEN: &str = "ya29.test-token";

/// Authorization code the fake token endpoint accepts
pub const GOOD_CODE: &str = "4/test-code";

/// Refresh token the fake token endpoint accepts
pub const GOOD_REFRESH: &str = "1//test-refresh";

/// Bind a router to an ephemeral port and return its base URL
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind ephemeral port");
    let addr = listener.local_addr().expect("Should have local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server failed");
    });
    format!("http://{}", addr)
}

/// Fake Sheets API serving `rows` for any spreadsheet/range
pub fn sheets_router(rows: Vec<Vec<&'static str>>) -> Router {
    Router::new().route(
        "/v4/spreadsheets/:id/values/:range",
        get(move |Path((_id, range)): Path<(String, String)>, headers: HeaderMap| {
            let rows = rows.clone();
            async move {
                let authorized = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v == format!("Bearer {}", GOOD_TOKEN))
                    .unwrap_or(false);
                if !authorized {
                    return StatusCode::UNAUTHORIZED.into_response();
                }
                if rows.is_empty() {
                    return Json(json!({ "range": range, "majorDimension": "ROWS" }))
                        .into_response();
                }
                Json(json!({ "range": range, "majorDimension": "ROWS", "values": rows }))
                    .into_response()
            }
        }),
    )
}

/// Fake xivapi serving `members` as `(id, name, rank)` for any free company
pub fn xivapi_router(members: Vec<(u64, &'static str, &'static str)>) -> Router {
    Router::new().route(
        "/freecompany/:id",
        get(
            move |Path(_id): Path<String>, Query(query): Query<HashMap<String, String>>| {
                let members = members.clone();
                async move {
                    if query.get("data").map(String::as_str) != Some("FCM") {
                        return Json(json!({ "FreeCompany": { "Name": "FullMetal Alliance" } }))
                            .into_response();
                    }
                    let list: Vec<_> = members
                        .iter()
                        .map(|(id, name, rank)| {
                            json!({
                                "ID": id,
                                "Name": name,
                                "Rank": rank,
                                "Server": "Balmung",
                                "Avatar": "https://img2.finalfantasyxiv.com/f/avatar.jpg"
                            })
                        })
                        .collect();
                    Json(json!({
                        "FreeCompany": { "Name": "FullMetal Alliance" },
                        "FreeCompanyMembers": list
                    }))
                    .into_response()
                }
            },
        ),
    )
}

/// Fake OAuth token endpoint
pub fn token_router() -> Router {
    Router::new().route("/token", post(token_handler))
}

async fn token_handler(Form(params): Form<HashMap<String, String>>) -> Response {
    let grant_type = params.get("grant_type").map(String::as_str);
    match grant_type {
        Some("authorization_code") if params.get("code").map(String::as_str) == Some(GOOD_CODE) => {
            Json(json!({
                "access_token": "access-from-code",
                "refresh_token": GOOD_REFRESH,
                "expires_in": 3599,
                "scope": "https://www.googleapis.com/auth/spreadsheets.readonly",
                "token_type": "Bearer"
            }))
            .into_response()
        }
        Some("refresh_token")
            if params.get("refresh_token").map(String::as_str) == Some(GOOD_REFRESH) =>
        {
            Json(json!({
                "access_token": "access-from-refresh",
                "expires_in": 3599,
                "token_type": "Bearer"
            }))
            .into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response(),
    }
}
