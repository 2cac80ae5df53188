use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use cultural_atlas::binder::Dashboard;
use cultural_atlas::config::AppConfig;
use cultural_atlas::data::load_data;
use cultural_atlas::error::LoadError;
use cultural_atlas::server::{router, AppState};
use serde_json::Value;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const ATTENDANCE: &str = "\
province,department,category,4 to 5 years,6 to 11 years,12 to 14 years,15 to 17 years,avg attendance rate
Buenos Aires,La Plata,Theater,50,95,90,80,78.75
Buenos Aires,Tandil,Theater,70,97,92,84,85.75
Cordoba,Capital,Library,65,96,91,79,82.75
Cordoba,Capital,,40,90,85,70,71.25
";

fn feature(lon: f64, lat: f64, province: &str, department: &str, category: &str) -> String {
    format!(
        r#"{{"type":"Feature","geometry":{{"type":"Point","coordinates":[{lon},{lat}]}},
            "properties":{{"latitude":{lat},"longitude":{lon},"province":"{province}","departme_1":"{department}","category":"{category}"}}}}"#
    )
}

fn venues() -> String {
    let features = [
        feature(-57.95, -34.92, "Buenos Aires", "La Plata", "Theater"),
        feature(-57.96, -34.93, "Buenos Aires", "La Plata", "Theater"),
        feature(-59.13, -37.32, "Buenos Aires", "Tandil", "Theater"),
        feature(-64.18, -31.42, "Cordoba", "Capital", "Theater"),
    ];
    format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(","))
}

fn write_fixtures(venues: &str) -> (TempDir, AppConfig) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("attendance.csv"), ATTENDANCE).unwrap();
    fs::write(dir.path().join("venues.geojson"), venues).unwrap();

    let config = AppConfig::from_toml(&format!(
        r#"
        [input]
        attendance_csv = {attendance:?}
        venues = {venues:?}

        [columns.venues]
        department = "departme_1"

        [output]
        artifact_dir = {artifacts:?}
        "#,
        attendance = dir.path().join("attendance.csv").display().to_string(),
        venues = dir.path().join("venues.geojson").display().to_string(),
        artifacts = dir.path().join("artifacts").display().to_string(),
    ))
    .unwrap();
    (dir, config)
}

fn app(config: &AppConfig) -> Router {
    let datasets = load_data(config).unwrap();
    router(Arc::new(AppState::new(Dashboard::new(datasets, config), &config.server)))
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn json(app: &Router, uri: &str) -> Value {
    let response = get(app, uri).await;
    assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn new_session(app: &Router) -> String {
    let response = get(app, "/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    location.strip_prefix("/session/").unwrap().to_string()
}

fn card(snapshot: &Value, category: &str) -> u64 {
    snapshot["cards"].as_array().unwrap().iter()
        .find(|c| c["category"] == category)
        .and_then(|c| c["count"].as_u64())
        .unwrap()
}

#[tokio::test]
async fn test_total_country_then_province() {
    let (_dir, config) = write_fixtures(&venues());
    let app = app(&config);
    let id = new_session(&app).await;

    let snapshot = json(&app, &format!("/api/session/{id}")).await;
    assert_eq!(snapshot["province"], "Total Country");
    assert_eq!(snapshot["department_options"], serde_json::json!(["Total Province"]));
    assert_eq!(snapshot["province_options"], serde_json::json!(["Total Country", "Buenos Aires", "Cordoba"]));
    assert_eq!(card(&snapshot, "Theater"), 4);
    assert_eq!(card(&snapshot, "Library"), 0);
    assert_eq!(snapshot["cards"].as_array().unwrap().len(), 2);

    let response = get(&app, &format!("/session/{id}/input?province=Buenos%20Aires&department=Total%20Province")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let snapshot = json(&app, &format!("/api/session/{id}")).await;
    assert_eq!(snapshot["province"], "Buenos Aires");
    assert_eq!(snapshot["department"], "Total Province");
    assert_eq!(card(&snapshot, "Theater"), 3);
    assert_eq!(snapshot["department_options"], serde_json::json!(["Total Province", "La Plata", "Tandil"]));
    assert_eq!(snapshot["attendance"][0]["band"], "4 to 5 years");
    assert_eq!(snapshot["attendance"][0]["mean"], 60.0);
}

#[tokio::test]
async fn test_department_selection_narrows_outputs() {
    let (_dir, config) = write_fixtures(&venues());
    let app = app(&config);
    let id = new_session(&app).await;

    get(&app, &format!("/session/{id}/input?province=Buenos%20Aires")).await;
    get(&app, &format!("/session/{id}/input?province=Buenos%20Aires&department=Tandil")).await;

    let snapshot = json(&app, &format!("/api/session/{id}")).await;
    assert_eq!(snapshot["department"], "Tandil");
    assert_eq!(card(&snapshot, "Theater"), 1);
    assert_eq!(snapshot["venue_count"], 1);

    let response = get(&app, &format!("/session/{id}/bar_chart.svg")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&body).contains("70.0%"));
}

#[tokio::test]
async fn test_province_without_venues() {
    let (_dir, config) = write_fixtures(&venues());
    let app = app(&config);
    let id = new_session(&app).await;

    get(&app, &format!("/session/{id}/input?province=Chubut")).await;

    let snapshot = json(&app, &format!("/api/session/{id}")).await;
    assert_eq!(snapshot["department_options"], serde_json::json!(["No Departments Found"]));
    assert_eq!(snapshot["department"], "No Departments Found");
    assert_eq!(card(&snapshot, "Theater"), 0);
    assert!(snapshot["attendance"][0]["mean"].is_null());
}

#[tokio::test]
async fn test_sessions_render_to_distinct_artifacts() {
    let (dir, config) = write_fixtures(&venues());
    let app = app(&config);
    let a = new_session(&app).await;
    let b = new_session(&app).await;
    assert_ne!(a, b);

    get(&app, &format!("/session/{a}/input?province=Cordoba")).await;
    get(&app, &format!("/session/{b}")).await;

    let map_a = fs::read_to_string(dir.path().join("artifacts").join(&a).join("map.svg")).unwrap();
    let map_b = fs::read_to_string(dir.path().join("artifacts").join(&b).join("map.svg")).unwrap();
    assert_ne!(map_a, map_b);
}

#[tokio::test]
async fn test_page_and_hover() {
    let (_dir, config) = write_fixtures(&venues());
    let app = app(&config);
    let id = new_session(&app).await;

    let response = get(&app, &format!("/session/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(body.to_vec()).unwrap();
    assert!(html.contains("Cultural Spaces by Category"));
    assert!(html.contains(r#"<select id="department" name="department""#));

    let hit = json(&app, &format!("/api/session/{id}/venue?lat=-37.3&lon=-59.1&radius=1")).await;
    assert_eq!(hit["category"], "Theater");
    assert_eq!(hit["department"], "Tandil");

    let miss = json(&app, &format!("/api/session/{id}/venue?lat=-50&lon=-70&radius=1")).await;
    assert!(miss.is_null());
}

#[tokio::test]
async fn test_hover_rejects_non_finite_coordinates() {
    let (_dir, config) = write_fixtures(&venues());
    let app = app(&config);
    let id = new_session(&app).await;

    for query in ["lat=NaN&lon=NaN", "lat=-37.3&lon=inf", "lat=-37.3&lon=-59.1&radius=NaN", "lat=-37.3&lon=-59.1&radius=-1"] {
        let response = get(&app, &format!("/api/session/{id}/venue?{query}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
    }

    // The session keeps serving afterwards.
    let hit = json(&app, &format!("/api/session/{id}/venue?lat=-37.3&lon=-59.1&radius=1")).await;
    assert_eq!(hit["department"], "Tandil");
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let (_dir, config) = write_fixtures(&venues());
    let app = app(&config);

    assert_eq!(get(&app, "/session/not-a-session").await.status(), StatusCode::NOT_FOUND);
    let unknown = "0123456789abcdef0123456789abcdef";
    assert_eq!(get(&app, &format!("/api/session/{unknown}")).await.status(), StatusCode::NOT_FOUND);
}

#[test]
fn test_missing_venue_columns_abort_loading() {
    let venues = venues().replace("\"departme_1\"", "\"dept\"").replace("\"latitude\"", "\"lat\"");
    let (_dir, config) = write_fixtures(&venues);

    let err = load_data(&config).unwrap_err();
    assert!(matches!(err, LoadError::MissingColumns { .. }));
    assert_eq!(
        err.to_string(),
        "The venue dataset is missing the following required columns: latitude, departme_1"
    );
}
