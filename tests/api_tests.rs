use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use reelmatch::api::{create_router, AppState};

fn create_test_server() -> TestServer {
    let state = AppState::default();
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

fn watched(title: &str, tmdb_id: u64, genres: &[&str], keywords: &[&str]) -> Value {
    json!({
        "content": {
            "title": title,
            "tmdb_id": tmdb_id,
            "genres": genres,
            "keywords": keywords,
            "directors": "Michael Mann",
            "cast": ["Al Pacino", "Robert De Niro"]
        },
        "user_rating": 8.0
    })
}

fn history() -> Vec<Value> {
    vec![
        watched("Heat", 949, &["Action", "Crime"], &["heist", "los angeles"]),
        watched("Collateral", 1538, &["Action", "Thriller"], &["hitman", "los angeles"]),
    ]
}

async fn build_profile(server: &TestServer, users: &[&str], history: Vec<Value>) -> Value {
    let response = server
        .post("/api/v1/profiles")
        .json(&json!({
            "users": users,
            "media_type": "movie",
            "history": history
        }))
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_score_matching_content() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/score")
        .json(&json!({
            "media_type": "movie",
            "profile": {
                "genres": {"action": 10.0, "drama": 4.0},
                "keywords": {"heist": 6.0}
            },
            "content": {
                "title": "Thief",
                "genres": ["Action", "Drama"],
                "keywords": ["heist"]
            }
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let score = body["score"].as_f64().unwrap();
    assert!(score > 0.0 && score <= 1.0);
    assert!(body["breakdown"]["genre_score"].as_f64().unwrap() > 0.0);
    assert!(body["breakdown"]["keyword_score"].as_f64().unwrap() > 0.0);
    assert_eq!(body["breakdown"]["details"]["genres"][0]["value"], "Action");
    assert_eq!(body["breakdown"]["details"]["genres"][0]["kind"], "exact");
}

#[tokio::test]
async fn test_score_negative_preference_lowers_score() {
    let server = create_test_server();
    let request = |drama: f64| {
        json!({
            "media_type": "movie",
            "profile": {"genres": {"action": 10.0, "drama": drama}},
            "content": {"title": "Mixed", "genres": ["Action", "Drama"]}
        })
    };

    let liked: Value = server.post("/api/v1/score").json(&request(5.0)).await.json();
    let disliked: Value = server.post("/api/v1/score").json(&request(-5.0)).await.json();

    assert!(disliked["score"].as_f64().unwrap() < liked["score"].as_f64().unwrap());
    assert_eq!(disliked["breakdown"]["details"]["genres"][1]["kind"], "negative");
}

#[tokio::test]
async fn test_score_empty_content_is_zero() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/score")
        .json(&json!({
            "media_type": "tv",
            "profile": {"genres": {"comedy": 3.0}},
            "content": {"title": "Nothing Known", "language": "N/A"}
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["score"], 0.0);
}

#[tokio::test]
async fn test_profile_build_then_reuse() {
    let server = create_test_server();

    let first = build_profile(&server, &["Bob", "alice"], history()).await;
    assert_eq!(first["key"], "alice_bob");
    assert_eq!(first["rebuilt"], true);
    assert_eq!(first["watched_count"], 2);
    assert!(first["profile"]["genres"]["action"].as_f64().unwrap() > 0.0);
    assert!(first["profile"]["directors"]["Michael Mann"].as_f64().unwrap() > 0.0);

    // Same group in a different order and case, same history size
    let second = build_profile(&server, &["ALICE", "bob"], history()).await;
    assert_eq!(second["rebuilt"], false);
    assert_eq!(second["profile"], first["profile"]);

    let mut longer = history();
    longer.push(watched("Thief", 11524, &["Crime"], &["safecracker"]));
    let third = build_profile(&server, &["alice", "bob"], longer).await;
    assert_eq!(third["rebuilt"], true);
    assert_eq!(third["watched_count"], 3);
}

#[tokio::test]
async fn test_profile_skips_malformed_history_event() {
    let server = create_test_server();

    let history = vec![
        watched("Heat", 949, &["Action", "Crime"], &["heist"]),
        json!({
            "content": {
                "title": "Broken",
                "tmdb_id": 2,
                "genres": ["Drama"],
                "cast": ["Al Pacino", 7]
            }
        }),
    ];
    let body = build_profile(&server, &["alice"], history).await;

    assert_eq!(body["rebuilt"], true);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["watched_count"], 1);
    assert!(body["profile"]["genres"]["action"].as_f64().unwrap() > 0.0);
    assert!(body["profile"]["genres"].get("drama").is_none());
    assert_eq!(body["profile"]["tmdb_ids"], json!([949]));
}

#[tokio::test]
async fn test_profile_invalid_users() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/profiles")
        .json(&json!({
            "users": ["", "!!!"],
            "media_type": "movie",
            "history": []
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_get_profile() {
    let server = create_test_server();

    let response = server.get("/api/v1/profiles/movie/alice").await;
    response.assert_status(StatusCode::NOT_FOUND);

    build_profile(&server, &["alice"], history()).await;

    let response = server.get("/api/v1/profiles/movie/alice").await;
    response.assert_status_ok();
    let snapshot: Value = response.json();
    assert_eq!(snapshot["watched_count"], 2);
    assert!(snapshot["version"].as_u64().is_some());
    assert_eq!(snapshot["profile"]["tmdb_ids"], json!([949, 1538]));

    // Profiles are kept per media type
    let response = server.get("/api/v1/profiles/tv/alice").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommendations_require_profile() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({
            "users": ["nobody"],
            "media_type": "movie",
            "candidates": []
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_recommendations_ranked_and_filtered() {
    let server = create_test_server();
    build_profile(&server, &["alice"], history()).await;

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({
            "users": ["alice"],
            "media_type": "movie",
            "candidates": [
                {"title": "Heat", "tmdb_id": 949, "genres": ["Action"],
                 "rating": 8.3, "vote_count": 7000},
                {"title": "Paddington", "tmdb_id": 116149, "genres": ["Family"],
                 "rating": 7.2, "vote_count": 3000},
                {"title": "Ronin", "tmdb_id": 8195, "genres": ["Action", "Thriller"],
                 "keywords": ["heist"], "rating": 7.0, "vote_count": 2500},
                {"title": "Obscure Heist", "tmdb_id": 99999, "genres": ["Action"],
                 "keywords": ["heist"], "rating": 6.0, "vote_count": 3}
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["excluded_watched"], 1);
    assert_eq!(body["below_quality"], 1);
    assert_eq!(body["excluded_genre"], 0);

    let picks = body["recommendations"].as_array().unwrap();
    assert_eq!(picks.len(), 2);
    assert_eq!(picks[0]["content"]["title"], "Ronin");
    assert_eq!(picks[1]["content"]["title"], "Paddington");
    assert!(picks[0]["score"].as_f64().unwrap() > picks[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn test_recommendations_skip_malformed_candidate() {
    let server = create_test_server();
    build_profile(&server, &["alice"], history()).await;

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({
            "users": ["alice"],
            "media_type": "movie",
            "candidates": [
                {"title": "Ronin", "tmdb_id": 8195, "genres": ["Action"],
                 "rating": 7.0, "vote_count": 2500},
                {"title": "Wrong Year", "tmdb_id": 8196, "genres": ["Action"],
                 "year": "1998", "rating": 7.0, "vote_count": 2500}
            ]
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["malformed"], 1);

    let picks = body["recommendations"].as_array().unwrap();
    assert_eq!(picks.len(), 1);
    assert_eq!(picks[0]["content"]["title"], "Ronin");
    assert!(picks[0]["score"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_recommendations_respect_limit() {
    let server = create_test_server();
    build_profile(&server, &["alice"], history()).await;

    let candidates: Vec<Value> = (0..10)
        .map(|i| {
            json!({
                "title": format!("Action {i}"),
                "tmdb_id": 50_000 + i,
                "genres": ["Action"],
                "rating": 7.0,
                "vote_count": 500
            })
        })
        .collect();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({
            "users": ["alice"],
            "media_type": "movie",
            "candidates": candidates,
            "limit": 4,
            "randomize": true
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 4);
}
