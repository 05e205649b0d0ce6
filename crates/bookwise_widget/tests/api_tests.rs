
use bookwise_common::error::SlotbookError;
use bookwise_common::models::{BookingId, BookingRequest, WireSlot};
use bookwise_common::services::BookingApi;
use bookwise_config::ApiConfig;
use bookwise_widget::service::HttpBookingApi;
use fixtures::{booking_json, call_type_json, date, slots_json, test_page, HOST_ZONE};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn setup() -> (MockServer, HttpBookingApi) {
    let server = MockServer::start().await;
    // trailing slash must not produce `//book`
    let api = HttpBookingApi::new(reqwest::Client::new(), format!("{}/api/", server.uri()));
    (server, api)
}

fn booking_request() -> BookingRequest {
    BookingRequest {
        start_datetime: "2024-01-10T20:00:00".to_string(),
        timezone: "Asia/Tokyo".to_string(),
        name: "Grace Visitor".to_string(),
        email: "grace@example.com".to_string(),
        phone: None,
        notes: Some("Looking forward to it".to_string()),
    }
}

#[tokio::test]
async fn test_fetch_call_type() {
    let (server, api) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/book/ada/intro"))
        .respond_with(ResponseTemplate::new(200).set_body_json(call_type_json(HOST_ZONE, 24, 60)))
        .expect(1)
        .mount(&server)
        .await;

    let call_type = api.fetch_call_type(&test_page()).await.unwrap();

    assert_eq!(call_type.host_timezone, HOST_ZONE);
    assert_eq!(call_type.duration_minutes, 30);
    assert_eq!(call_type.settings.min_notice_hours, Some(24));
    assert_eq!(call_type.settings.max_days_ahead, Some(60));
}

#[tokio::test]
async fn test_shared_client_fetches_call_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/ada/intro"))
        .respond_with(ResponseTemplate::new(200).set_body_json(call_type_json("Europe/Zurich", 0, 0)))
        .expect(1)
        .mount(&server)
        .await;

    let api = HttpBookingApi::with_shared_client(server.uri());
    let call_type = api.fetch_call_type(&test_page()).await.unwrap();

    assert_eq!(call_type.host_timezone, "Europe/Zurich");
    assert_eq!(call_type.settings.effective_max_days_ahead(60), 60);
}

#[tokio::test]
async fn test_fetch_slots_sends_range_and_decodes_mixed_slots() {
    let (server, api) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/book/ada/intro/slots"))
        .and(query_param("start_date", "2024-01-09"))
        .and(query_param("end_date", "2024-02-13"))
        .respond_with(ResponseTemplate::new(200).set_body_json(slots_json()))
        .expect(1)
        .mount(&server)
        .await;

    let response = api
        .fetch_slots(&test_page(), date("2024-01-09"), date("2024-02-13"))
        .await
        .unwrap();

    assert_eq!(response.days.len(), 2);
    assert_eq!(response.days[0].slots[0], WireSlot::Bare("09:00".to_string()));
    let times: Vec<_> = response.days[1]
        .slots
        .iter()
        .cloned()
        .filter_map(WireSlot::into_time)
        .collect();
    assert_eq!(times, ["10:00"]);
}

#[tokio::test]
async fn test_create_booking_posts_host_local_payload() {
    let (server, api) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/book/ada/intro"))
        .and(body_json(json!({
            "start_datetime": "2024-01-10T20:00:00",
            "timezone": "Asia/Tokyo",
            "name": "Grace Visitor",
            "email": "grace@example.com",
            "notes": "Looking forward to it"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(booking_json(42)))
        .expect(1)
        .mount(&server)
        .await;

    let result = api
        .create_booking(&test_page(), booking_request())
        .await
        .unwrap();

    assert_eq!(result.id, Some(BookingId::Number(42)));
    assert_eq!(
        result.meeting_link.as_deref(),
        Some("https://meet.example.com/42")
    );
    assert_eq!(result.extra.get("status"), Some(&json!("confirmed")));
}

#[tokio::test]
async fn test_status_codes_map_to_error_kinds() {
    let cases = [
        (404, json!({ "detail": "Booking page not found" })),
        (403, json!({ "detail": "Booking is disabled" })),
        (409, json!({ "error": { "message": "Slot no longer available" } })),
        (500, json!({ "message": "internal" })),
    ];

    for (status, body) in cases {
        let (server, api) = setup().await;
        Mock::given(method("POST"))
            .and(path("/api/book/ada/intro"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;

        let err = api
            .create_booking(&test_page(), booking_request())
            .await
            .unwrap_err();

        match status {
            404 => assert_eq!(
                err,
                SlotbookError::ResourceNotFound("Booking page not found".to_string())
            ),
            403 => assert_eq!(
                err,
                SlotbookError::BookingDisabled("Booking is disabled".to_string())
            ),
            409 => assert_eq!(
                err,
                SlotbookError::SlotConflict("Slot no longer available".to_string())
            ),
            _ => {
                assert_eq!(
                    err,
                    SlotbookError::Status {
                        status: 500,
                        message: "internal".to_string()
                    }
                );
                assert!(err.is_retryable());
            }
        }
    }
}

#[tokio::test]
async fn test_undecodable_body_is_parse_error() {
    let (server, api) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/book/ada/intro/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = api
        .fetch_slots(&test_page(), date("2024-01-09"), date("2024-01-09"))
        .await
        .unwrap_err();

    assert!(matches!(err, SlotbookError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let server = MockServer::builder().start().await;
    let uri = server.uri();
    drop(server);
    let api = HttpBookingApi::new(reqwest::Client::new(), uri);

    let err = api.fetch_call_type(&test_page()).await.unwrap_err();

    assert!(matches!(err, SlotbookError::Network(_)));
    assert!(err.is_retryable());
}

#[test]
fn test_from_config_requires_base_url() {
    let config = ApiConfig {
        base_url: "  ".to_string(),
        timeout_secs: Some(5),
        user_agent: None,
    };
    assert!(matches!(
        HttpBookingApi::from_config(&config),
        Err(SlotbookError::Config(_))
    ));

    let config = ApiConfig {
        base_url: "http://localhost:8000/api".to_string(),
        timeout_secs: None,
        user_agent: Some("bookwise-tests".to_string()),
    };
    assert!(HttpBookingApi::from_config(&config).is_ok());
}
