//! Integration tests for the OpenWeatherMap adapter against a mock server.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use krishi::KrishiError;
use krishi::providers::{OpenWeatherClient, WeatherProvider};

fn current_body() -> serde_json::Value {
    json!({
        "cod": 200,
        "name": "Pune",
        "main": {"temp": 29.4, "humidity": 48},
        "weather": [{"description": "scattered clouds", "icon": "03d"}],
        "wind": {"speed": 2.5}
    })
}

#[tokio::test]
async fn current_weather_parses_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("q", "Pune"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenWeatherClient::with_base_url("test-key", server.uri());
    let weather = client.current("Pune").await.unwrap();

    assert_eq!(weather.city_name, "Pune");
    assert_eq!(weather.temperature, 29.4);
    assert_eq!(weather.humidity, 48.0);
    assert_eq!(weather.condition, "scattered clouds");
    assert!((weather.wind_speed_kmh - 9.0).abs() < 1e-9);
}

#[tokio::test]
async fn unknown_city_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"cod": "404", "message": "city not found"})),
        )
        .mount(&server)
        .await;

    let client = OpenWeatherClient::with_base_url("test-key", server.uri());
    let err = client.current("Nowhereville").await.unwrap_err();

    assert!(matches!(err, KrishiError::NotFound(m) if m.contains("Nowhereville")));
}

/// Some responses report failure in the body's `cod` with HTTP 200.
#[tokio::test]
async fn cod_in_body_is_checked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"cod": "404", "message": "city not found"})),
        )
        .mount(&server)
        .await;

    let client = OpenWeatherClient::with_base_url("test-key", server.uri());
    let err = client.current("Nowhereville").await.unwrap_err();
    assert!(matches!(err, KrishiError::NotFound(_)));
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .mount(&server)
        .await;

    let client = OpenWeatherClient::with_base_url("test-key", server.uri());
    let err = client.current("Pune").await.unwrap_err();

    assert!(err.is_rate_limit());
    assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(7)));
}

#[tokio::test]
async fn rejected_key_is_misconfigured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = OpenWeatherClient::with_base_url("bad-key", server.uri());
    let err = client.current("Pune").await.unwrap_err();
    assert!(matches!(err, KrishiError::Misconfigured { upstream: "openweather", .. }));
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = OpenWeatherClient::with_base_url("test-key", server.uri());
    let err = client.forecast("Pune").await.unwrap_err();
    assert!(matches!(err, KrishiError::Unavailable(_)));
}

#[tokio::test]
async fn malformed_body_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = OpenWeatherClient::with_base_url("test-key", server.uri());
    let err = client.current("Pune").await.unwrap_err();
    assert!(matches!(err, KrishiError::Unavailable(_)));
}

/// Three-hourly samples are grouped into days in the city's timezone.
#[tokio::test]
async fn forecast_groups_samples_by_local_date() {
    let server = MockServer::start().await;
    // 2025-10-30T00:00:00Z is a Thursday; at +05:30 the 21:00Z sample falls on Friday.
    let base = 1_761_782_400_i64;
    let entry = |hours: i64, min: f64, max: f64, description: &str| {
        json!({
            "dt": base + hours * 3600,
            "main": {"temp_min": min, "temp_max": max},
            "weather": [{"description": description, "icon": "01d"}]
        })
    };
    Mock::given(method("GET"))
        .and(path("/data/2.5/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cod": "200",
            "city": {"timezone": 19800},
            "list": [
                entry(3, 21.0, 27.0, "clear sky"),
                entry(9, 24.6, 32.4, "clear sky"),
                entry(15, 19.2, 22.0, "light rain"),
                entry(21, 18.4, 23.0, "light rain"),
            ]
        })))
        .mount(&server)
        .await;

    let client = OpenWeatherClient::with_base_url("test-key", server.uri());
    let forecast = client.forecast("Pune").await.unwrap();

    assert_eq!(forecast.len(), 2);
    let thursday = &forecast.days()[0];
    assert_eq!(thursday.day_name, "Thursday");
    assert_eq!(thursday.min_temp, 19.0);
    assert_eq!(thursday.max_temp, 32.0);
    assert_eq!(thursday.condition, "Clear Sky");

    let friday = &forecast.days()[1];
    assert_eq!(friday.day_name, "Friday");
    assert_eq!(friday.min_temp, 18.0);
    assert_eq!(friday.condition, "Light Rain");
}
