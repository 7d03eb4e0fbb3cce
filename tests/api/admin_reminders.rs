use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{birthday_not_today, birthday_today, member, test_config, TestApp, TestStore};

fn birthday_store() -> TestStore {
    let mut celebrant = member(1, "a@x.com");
    celebrant.birthday = birthday_today();
    TestStore {
        profiles: vec![celebrant, member(2, "b@x.com")],
        ..TestStore::default()
    }
}

#[tokio::test]
async fn a_birthday_today_is_announced_to_the_other_members() {
    // Arrange
    let app = TestApp::spawn(birthday_store()).await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .and(header("X-Postmark-Server-Token", "my-secret-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.trigger_reminders().await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["report"]["sent"], 1);
    assert_eq!(body["report"]["failed"], 0);
    assert!(body["message"].as_str().unwrap().contains("1 sent"));

    let emails = app.sent_emails().await;
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0]["Bcc"], "b@x.com");
    assert_eq!(emails[0]["Subject"], "Event Reminder: Member 1");
    assert!(emails[0]["TextBody"].as_str().unwrap().contains("Birthday on"));
}

#[tokio::test]
async fn no_email_is_sent_when_nothing_occurs_today() {
    // Arrange
    let mut someone = member(1, "a@x.com");
    someone.birthday = birthday_not_today();
    let store = TestStore {
        profiles: vec![someone, member(2, "b@x.com")],
        ..TestStore::default()
    };
    let app = TestApp::spawn(store).await;
    Mock::given(path("/email"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.trigger_reminders().await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["report"]["processed"], 0);
    assert_eq!(body["report"]["sent"], 0);
}

#[tokio::test]
async fn a_rejected_email_is_reported_as_failed_without_failing_the_request() {
    // Arrange
    let app = TestApp::spawn(birthday_store()).await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    let response = app.trigger_reminders().await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["report"]["sent"], 0);
    assert_eq!(body["report"]["failed"], 1);
}

#[tokio::test]
async fn an_unreachable_store_returns_a_500_with_a_json_error() {
    // Arrange
    let store = TestStore {
        unreachable: true,
        ..TestStore::default()
    };
    let app = TestApp::spawn(store).await;

    // Act
    let response = app.trigger_reminders().await;

    // Assert
    assert_eq!(response.status().as_u16(), 500);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Failed to process reminders");
}

#[tokio::test]
async fn a_second_trigger_on_the_same_day_does_not_resend() {
    // Arrange
    let app = TestApp::spawn(birthday_store()).await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    let first = app.trigger_reminders().await;
    let second = app.trigger_reminders().await;

    // Assert
    assert_eq!(first.status().as_u16(), 200);
    assert_eq!(second.status().as_u16(), 200);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["report"]["sent"], 0);
}

#[tokio::test]
async fn a_mail_transport_that_fails_verification_is_refused() {
    // Arrange
    let email_server = wiremock::MockServer::start().await;
    Mock::given(path("/server"))
        .and(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&email_server)
        .await;
    let config = test_config(Some(email_server.uri()));

    // Act
    let transport = alumni::startup::get_verified_transport(&config).await;

    // Assert
    assert!(transport.is_err());
}

#[tokio::test]
async fn a_trigger_during_a_running_cycle_is_refused_with_a_503() {
    // Arrange
    let app = TestApp::spawn(birthday_store()).await;
    Mock::given(path("/email"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(2)))
        .expect(1)
        .mount(&app.email_server)
        .await;

    // Act
    let (first, second) = tokio::join!(app.trigger_reminders(), async {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        app.trigger_reminders().await
    });

    // Assert
    assert_eq!(first.status().as_u16(), 200);
    assert_eq!(second.status().as_u16(), 503);
    let body: serde_json::Value = second.json().await.unwrap();
    assert_eq!(body["error"], "A reminder cycle is already running");
}
