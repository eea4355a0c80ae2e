mod common;

use actix_web::http::StatusCode;
use actix_web::{App, test};
use serde_json::Value;

use common::{bearer, register, seed_catalog, send, setup};
use crypto_tracker::routes::configure_app;

fn coin_ids(watchlist: &Value) -> Vec<String> {
    watchlist["coins"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["coinId"].as_str().unwrap().to_string())
        .collect()
}

#[actix_web::test]
async fn test_get_watchlist_creates_empty_one() {
    let (state, _) = setup().await;
    let app = test::init_service(App::new().configure(configure_app(state))).await;
    let session = register(&app, "alice").await;

    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri("/api/watchlist")
            .insert_header(bearer(&session.access_token))
            .to_request();
        let (status, body) = send(&app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"].as_i64(), Some(session.user_id));
        assert!(coin_ids(&body["data"]).is_empty());
    }
}

#[actix_web::test]
async fn test_add_coin_twice_is_idempotent() {
    let (state, market) = setup().await;
    seed_catalog(&state, &market).await;
    let app = test::init_service(App::new().configure(configure_app(state))).await;
    let session = register(&app, "bob").await;

    let req = test::TestRequest::post()
        .uri("/api/watchlist/bitcoin")
        .insert_header(bearer(&session.access_token))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Coin added to watchlist");
    assert_eq!(coin_ids(&body["data"]), vec!["bitcoin"]);

    let req = test::TestRequest::post()
        .uri("/api/watchlist/bitcoin")
        .insert_header(bearer(&session.access_token))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Coin already in watchlist");
    assert_eq!(coin_ids(&body["data"]), vec!["bitcoin"]);
}

#[actix_web::test]
async fn test_coins_keep_insertion_order() {
    let (state, market) = setup().await;
    seed_catalog(&state, &market).await;
    let app = test::init_service(App::new().configure(configure_app(state))).await;
    let session = register(&app, "carol").await;

    for coin in ["solana", "bitcoin", "ripple"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/watchlist/{}", coin))
            .insert_header(bearer(&session.access_token))
            .to_request();
        send(&app, req).await;
    }

    let req = test::TestRequest::get()
        .uri("/api/watchlist")
        .insert_header(bearer(&session.access_token))
        .to_request();
    let (_, body) = send(&app, req).await;
    assert_eq!(coin_ids(&body["data"]), vec!["solana", "bitcoin", "ripple"]);
}

#[actix_web::test]
async fn test_add_unknown_coin_is_404() {
    let (state, _) = setup().await;
    let app = test::init_service(App::new().configure(configure_app(state))).await;
    let session = register(&app, "dave").await;

    let req = test::TestRequest::post()
        .uri("/api/watchlist/dogecoin")
        .insert_header(bearer(&session.access_token))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Cryptocurrency not found");
}

#[actix_web::test]
async fn test_remove_coin() {
    let (state, market) = setup().await;
    seed_catalog(&state, &market).await;
    let app = test::init_service(App::new().configure(configure_app(state))).await;
    let session = register(&app, "erin").await;

    // Pas encore de watchlist
    let req = test::TestRequest::delete()
        .uri("/api/watchlist/bitcoin")
        .insert_header(bearer(&session.access_token))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Watchlist not found");

    for coin in ["bitcoin", "ethereum"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/watchlist/{}", coin))
            .insert_header(bearer(&session.access_token))
            .to_request();
        send(&app, req).await;
    }

    let req = test::TestRequest::delete()
        .uri("/api/watchlist/bitcoin")
        .insert_header(bearer(&session.access_token))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Coin removed from watchlist");
    assert_eq!(coin_ids(&body["data"]), vec!["ethereum"]);
}

#[actix_web::test]
async fn test_remove_coin_not_in_watchlist_succeeds() {
    let (state, market) = setup().await;
    seed_catalog(&state, &market).await;
    let app = test::init_service(App::new().configure(configure_app(state))).await;
    let session = register(&app, "frank").await;

    let req = test::TestRequest::post()
        .uri("/api/watchlist/ethereum")
        .insert_header(bearer(&session.access_token))
        .to_request();
    send(&app, req).await;

    let req = test::TestRequest::delete()
        .uri("/api/watchlist/tether")
        .insert_header(bearer(&session.access_token))
        .to_request();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(coin_ids(&body["data"]), vec!["ethereum"]);
}

#[actix_web::test]
async fn test_watchlists_are_per_user() {
    let (state, market) = setup().await;
    seed_catalog(&state, &market).await;
    let app = test::init_service(App::new().configure(configure_app(state))).await;
    let first = register(&app, "grace").await;
    let second = register(&app, "heidi").await;

    let req = test::TestRequest::post()
        .uri("/api/watchlist/bitcoin")
        .insert_header(bearer(&first.access_token))
        .to_request();
    send(&app, req).await;

    let req = test::TestRequest::get()
        .uri("/api/watchlist")
        .insert_header(bearer(&second.access_token))
        .to_request();
    let (_, body) = send(&app, req).await;
    assert!(coin_ids(&body["data"]).is_empty());
}
