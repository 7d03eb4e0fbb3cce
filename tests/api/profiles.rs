use sqlx::PgPool;

use alumni::domain::ProfileRecord;
use alumni::profile_store::upsert_profile;

use crate::helpers::{TestApp, TestStore};

#[tokio::test]
async fn a_malformed_user_id_returns_a_400() {
    // Arrange
    let app = TestApp::spawn(TestStore::default()).await;
    let test_cases = ["abc", "0", "-5", "1.5"];

    for invalid_id in test_cases {
        // Act
        let response = app.get_profile_api(invalid_id).await;

        // Assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the user ID was `{invalid_id}`"
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Invalid user ID");
    }
}

#[sqlx::test]
#[ignore = "requires a running Postgres instance"]
async fn an_unknown_user_id_returns_a_404(db_pool: PgPool) {
    // Arrange
    let app = TestApp::spawn_with(TestStore::default(), &db_pool).await;

    // Act
    let response = app.get_profile_api("4242").await;

    // Assert
    assert_eq!(response.status().as_u16(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Profile not found");
}

#[sqlx::test]
#[ignore = "requires a running Postgres instance"]
async fn a_stored_profile_is_returned_in_full(db_pool: PgPool) {
    // Arrange
    let app = TestApp::spawn_with(TestStore::default(), &db_pool).await;
    let profile = ProfileRecord {
        user_id: 7,
        full_name: Some("Ursula Le Guin".to_string()),
        email_id: Some("ursula@x.com".to_string()),
        city: Some("Portland".to_string()),
        receive_email_reminders: true,
        ..ProfileRecord::default()
    };
    upsert_profile(&profile, &db_pool).await.unwrap();

    // Act
    let response = app.get_profile_api("7").await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["full_name"], "Ursula Le Guin");
    assert_eq!(body["city"], "Portland");
    assert_eq!(body["receive_email_reminders"], true);
}

#[sqlx::test]
#[ignore = "requires a running Postgres instance"]
async fn the_directory_lists_every_profile(db_pool: PgPool) {
    // Arrange
    let app = TestApp::spawn_with(TestStore::default(), &db_pool).await;
    for (user_id, city) in [(1, "Pune"), (2, "Oslo")] {
        let profile = ProfileRecord {
            user_id,
            full_name: Some(format!("Member {user_id}")),
            city: Some(city.to_string()),
            ..ProfileRecord::default()
        };
        upsert_profile(&profile, &db_pool).await.unwrap();
    }

    // Act
    let response = app.get_profile_api("all").await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(body.len(), 2);
    assert!(body.iter().all(|entry| entry.get("latest_photo").is_some()));
    assert!(body.iter().all(|entry| entry.get("email_id").is_none()));
}
