
use bookwise_common::error::SlotbookError;
use bookwise_config::{AppConfig, WidgetConfig};
use bookwise_widget::models::ContactFields;
use bookwise_widget::service::mock::MockBookingApi;
use bookwise_widget::{
    BookingError, BookingStep, HttpBookingApi, SchedulingWidget, SubmitOutcome, WidgetPhase,
};
use fixtures::{booking_json, call_type_json, date, slots_json, test_page, HOST_ZONE, VISITOR_ZONE};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn http_widget(server: &MockServer) -> SchedulingWidget<HttpBookingApi> {
    let api = HttpBookingApi::new(reqwest::Client::new(), server.uri());
    SchedulingWidget::new(
        Arc::new(api),
        test_page(),
        VISITOR_ZONE,
        WidgetConfig::default(),
    )
}

async fn mount_call_type(server: &MockServer, status: u16, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/book/ada/intro"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_booking_flow_over_http() {
    let server = MockServer::start().await;
    mount_call_type(&server, 200, call_type_json(HOST_ZONE, 24, 60)).await;
    // window starts 2024-01-09; the first range spans 35 days
    Mock::given(method("GET"))
        .and(path("/book/ada/intro/slots"))
        .and(query_param("start_date", "2024-01-09"))
        .and(query_param("end_date", "2024-02-13"))
        .respond_with(ResponseTemplate::new(200).set_body_json(slots_json()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/book/ada/intro"))
        .and(body_partial_json(json!({
            "start_datetime": "2024-01-10T20:00:00",
            "timezone": VISITOR_ZONE
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(booking_json(7)))
        .expect(1)
        .mount(&server)
        .await;

    let mut widget = http_widget(&server).await;
    let phase = widget.mount_on(date("2024-01-08")).await.unwrap().clone();
    assert_eq!(phase, WidgetPhase::Ready);

    let machine = widget.machine_mut().unwrap();
    // 2024-01-10 09:00 in New York is 23:00 the same day in Tokyo
    assert_eq!(machine.step(), BookingStep::SelectingTime);
    assert_eq!(machine.selected_visitor_date(), Some(date("2024-01-10")));

    machine.select_date(date("2024-01-11")).unwrap();
    let slot = machine.time_options()[0].clone();
    assert_eq!(slot.visitor_time_display, "10:00");
    machine.select_slot(&slot).unwrap();
    machine
        .set_contact(ContactFields {
            name: "Grace Visitor".to_string(),
            email: "grace@example.com".to_string(),
            ..ContactFields::default()
        })
        .unwrap();

    assert_eq!(machine.submit().await.unwrap(), SubmitOutcome::Confirmed);
    assert_eq!(
        machine
            .result()
            .and_then(|r| r.meeting_link.as_deref()),
        Some("https://meet.example.com/7")
    );
}

#[tokio::test]
async fn test_terminal_metadata_states() {
    let cases = [
        (404, WidgetPhase::NotFound),
        (403, WidgetPhase::Unavailable),
    ];
    for (status, expected) in cases {
        let server = MockServer::start().await;
        mount_call_type(&server, status, json!({ "detail": "nope" })).await;

        let mut widget = http_widget(&server).await;
        let phase = widget.mount_on(date("2024-01-08")).await.unwrap().clone();

        assert_eq!(phase, expected);
        assert!(phase.is_terminal());
        assert!(widget.machine().is_none());
        // terminal: mounting again makes no further request
        widget.mount_on(date("2024-01-08")).await.unwrap();
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_failed_mount_can_be_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/book/ada/intro"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_call_type(&server, 200, call_type_json(HOST_ZONE, 0, 7)).await;
    Mock::given(method("GET"))
        .and(path("/book/ada/intro/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "days": [] })))
        .mount(&server)
        .await;

    let mut widget = http_widget(&server).await;
    let phase = widget.mount_on(date("2024-01-08")).await.unwrap().clone();
    assert!(matches!(phase, WidgetPhase::Failed(_)));
    assert!(!phase.is_terminal());

    let phase = widget.mount_on(date("2024-01-08")).await.unwrap().clone();
    assert_eq!(phase, WidgetPhase::Ready);
    let window = widget.machine().unwrap().window();
    assert_eq!(window.min_date, date("2024-01-08"));
    assert_eq!(window.max_date, date("2024-01-15"));
}

#[tokio::test]
async fn test_initial_range_is_clamped_to_window() {
    let api = Arc::new(MockBookingApi::for_host(HOST_ZONE));
    let config = WidgetConfig {
        default_max_days_ahead: 10,
        ..WidgetConfig::default()
    };
    let mut widget = SchedulingWidget::new(Arc::clone(&api), test_page(), VISITOR_ZONE, config);

    widget.mount_on(date("2024-01-08")).await.unwrap();

    assert_eq!(
        api.slot_fetches(),
        [(date("2024-01-08"), date("2024-01-18"))]
    );
}

#[tokio::test]
async fn test_invalid_visitor_zone_fails_without_requests() {
    let api = Arc::new(MockBookingApi::for_host(HOST_ZONE));
    let mut widget = SchedulingWidget::new(
        Arc::clone(&api),
        test_page(),
        "Local/Time",
        WidgetConfig::default(),
    );

    let phase = widget.mount().await.unwrap().clone();

    assert!(matches!(phase, WidgetPhase::Failed(_)));
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn test_metadata_failure_maps_to_phase() {
    let api = Arc::new(MockBookingApi::for_host(HOST_ZONE));
    api.fail_call_type(SlotbookError::BookingDisabled("paused".to_string()));
    let mut widget = SchedulingWidget::new(api, test_page(), VISITOR_ZONE, WidgetConfig::default());

    let phase = widget.mount_on(date("2024-01-08")).await.unwrap().clone();
    assert_eq!(phase, WidgetPhase::Unavailable);
}

#[tokio::test]
async fn test_unmount_discards_widget() {
    let api = Arc::new(
        MockBookingApi::for_host(HOST_ZONE).with_day(date("2024-01-10"), &["09:00"]),
    );
    let mut widget = SchedulingWidget::new(api, test_page(), VISITOR_ZONE, WidgetConfig::default());
    widget.mount_on(date("2024-01-08")).await.unwrap();

    widget.unmount();

    assert_eq!(widget.phase(), &WidgetPhase::Unmounted);
    let machine = widget.machine_mut().unwrap();
    assert_eq!(
        machine.select_date(date("2024-01-10")),
        Err(BookingError::Unmounted)
    );
    assert!(matches!(
        widget.mount_on(date("2024-01-08")).await,
        Err(BookingError::Unmounted)
    ));
}

#[test]
fn test_from_config_requires_visitor_zone() {
    let config: AppConfig = serde_json::from_value(json!({
        "api": { "base_url": "http://localhost:8000/api" }
    }))
    .unwrap();
    assert!(matches!(
        SchedulingWidget::from_config(&config, test_page()),
        Err(SlotbookError::Config(_))
    ));

    let mut config = config;
    config.widget.visitor_time_zone = Some(VISITOR_ZONE.to_string());
    assert!(SchedulingWidget::from_config(&config, test_page()).is_ok());
}
