/// Integration tests for the staff-only admin endpoints
///
/// These tests need a PostgreSQL database at DATABASE_URL and are skipped
/// when it is not set.

mod common;

use axum::http::{Method, StatusCode};
use common::{ids, sample_recipe, TestContext};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_admin_forbidden_for_regular_user() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let (status, _) = ctx.send(Method::GET, "/v1/admin/users/", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.send_as(None, Method::GET, "/v1/admin/users/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_lists_every_owner() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };
    let mine = ctx.create_recipe(sample_recipe("Mine")).await;
    let (_, staff_token) = ctx.create_staff().await;

    let (status, body) = ctx
        .send_as(Some(&staff_token), Method::GET, "/v1/admin/recipes/", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&body).contains(&mine["id"].as_i64().unwrap()));

    let (status, users) = ctx
        .send_as(Some(&staff_token), Method::GET, "/v1/admin/users/", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ids(&users).contains(&ctx.user.id));
    assert!(users[0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_admin_creates_and_deactivates_user() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };
    let (_, staff_token) = ctx.create_staff().await;

    let (status, created) = ctx
        .send_as(
            Some(&staff_token),
            Method::POST,
            "/v1/admin/users/",
            Some(json!({
                "email": format!("made-{}@example.com", Uuid::new_v4()),
                "password": "testpass123",
                "is_superuser": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["is_staff"], true);
    assert_eq!(created["is_superuser"], true);

    let (status, updated) = ctx
        .send_as(
            Some(&staff_token),
            Method::PATCH,
            &format!("/v1/admin/users/{}/", ctx.user.id),
            Some(json!({"is_active": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_active"], false);

    let (status, _) = ctx.send(Method::GET, "/v1/users/me/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .send_as(Some(&staff_token), Method::GET, "/v1/admin/users/0/", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_superuser_without_staff_flag_is_forbidden() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };
    let (_, staff_token) = ctx.create_staff().await;
    let (demoted, demoted_token) = ctx.create_staff().await;

    let (status, body) = ctx
        .send_as(
            Some(&staff_token),
            Method::PATCH,
            &format!("/v1/admin/users/{}/", demoted.id),
            Some(json!({"is_staff": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_staff"], false);
    assert_eq!(body["is_superuser"], true);

    let (status, _) = ctx
        .send_as(Some(&demoted_token), Method::GET, "/v1/admin/users/", None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Regular endpoints still work
    let (status, _) = ctx
        .send_as(Some(&demoted_token), Method::GET, "/v1/recipes/", None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
