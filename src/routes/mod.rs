//! HTTP routes

pub mod admin;
pub mod api;
pub mod auth;
pub mod bookings;
pub mod rooms;
pub mod views;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

use crate::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(rooms::index))
        .route("/rooms/search", get(rooms::search))
        .route("/rooms/:id/book", get(rooms::book_form).post(rooms::book))
        .route("/dashboard", get(bookings::dashboard))
        .route("/bookings/:id/cancel", post(bookings::cancel))
        .route("/bookings/:id/reschedule", post(bookings::reschedule))
        .route("/api/rooms/:id/quote", get(api::quote))
        .route("/health", get(api::health))
        .route("/admin", get(admin::dashboard))
        .route("/admin/users", get(admin::users))
        .route("/admin/rooms", post(admin::add_room))
        .route("/admin/rooms/:id", post(admin::edit_room))
        .route("/admin/rooms/:id/amenities", post(admin::attach_amenity))
        .route("/admin/rooms/:id/photos", post(admin::add_photo))
        .route("/admin/amenities", post(admin::add_amenity))
        .route("/admin/bookings/:id/confirm", post(admin::confirm_booking))
        .route("/admin/bookings/:id/cancel", post(admin::cancel_booking))
        .nest_service("/static", static_files)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::booking::{services, RoomInput};
    use crate::cache::AppCache;
    use crate::config::Config;
    use crate::db::InMemoryRepository;
    use crate::models::RoomType;

    use super::auth::{USER_ID_HEADER, USER_ROLE_HEADER};

    async fn test_state() -> (AppState, Uuid) {
        let repo = Arc::new(InMemoryRepository::new());
        let cache = AppCache::new();
        let room = services::add_room(
            repo.as_ref(),
            &cache,
            RoomInput {
                room_number: "101".to_string(),
                room_type: RoomType::Double,
                price: dec!(100),
                description: Some("Sea view".to_string()),
            },
        )
        .await
        .unwrap();

        let config = Config {
            database_url: "postgres://unused".to_string(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            database_max_connections: 1,
            currency: "USD".to_string(),
            static_dir: "static".to_string(),
        };

        let state = AppState {
            repo,
            cache,
            config: Arc::new(config),
        };
        (state, room.id)
    }

    fn book_request(room_id: Uuid, user_id: Uuid, start: &str, end: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/rooms/{}/book", room_id))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(USER_ID_HEADER, user_id.to_string())
            .body(Body::from(format!("start_date={}&end_date={}", start, end)))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_lists_rooms() {
        let (state, _) = test_state().await;
        let response = router(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("101"));
        assert!(body.contains("available"));
    }

    #[tokio::test]
    async fn test_booking_requires_user() {
        let (state, room_id) = test_state().await;
        let request = Request::builder()
            .method("POST")
            .uri(format!("/rooms/{}/book", room_id))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("start_date=2030-01-01&end_date=2030-01-03"))
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_book_then_overlap_conflicts() {
        let (state, room_id) = test_state().await;
        let app = router(state);

        let first = app
            .clone()
            .oneshot(book_request(room_id, Uuid::new_v4(), "2030-01-01", "2030-01-03"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::SEE_OTHER);
        assert_eq!(first.headers()[header::LOCATION], "/dashboard");

        let second = app
            .clone()
            .oneshot(book_request(room_id, Uuid::new_v4(), "2030-01-02", "2030-01-04"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        // Back-to-back stays share no night
        let adjacent = app
            .oneshot(book_request(room_id, Uuid::new_v4(), "2030-01-03", "2030-01-05"))
            .await
            .unwrap();
        assert_eq!(adjacent.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_search_marks_each_room_with_todays_status() {
        let (state, room_id) = test_state().await;
        services::add_room(
            state.repo.as_ref(),
            &state.cache,
            RoomInput {
                room_number: "202".to_string(),
                room_type: RoomType::Single,
                price: dec!(80),
                description: None,
            },
        )
        .await
        .unwrap();
        let app = router(state);

        let today = chrono::Utc::now().date_naive();
        let tomorrow = today.succ_opt().unwrap();
        let booked = app
            .clone()
            .oneshot(book_request(
                room_id,
                Uuid::new_v4(),
                &today.to_string(),
                &tomorrow.to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(booked.status(), StatusCode::SEE_OTHER);

        let response = app
            .clone()
            .oneshot(
                Request::get("/rooms/search?start_date=2031-01-01&end_date=2031-01-03")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("<td>101<br>"));
        assert!(body.contains("<td>202<br>"));
        assert!(body.contains("status-occupied"));
        assert!(body.contains("status-available"));

        // Tonight's range leaves out the booked room
        let uri = format!("/rooms/search?start_date={}&end_date={}", today, tomorrow);
        let response = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_text(response).await;
        assert!(body.contains("<td>202<br>"));
        assert!(!body.contains("<td>101<br>"));
    }

    #[tokio::test]
    async fn test_book_rejects_reversed_dates() {
        let (state, room_id) = test_state().await;
        let response = router(state)
            .oneshot(book_request(room_id, Uuid::new_v4(), "2030-01-05", "2030-01-01"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_quote_json() {
        let (state, room_id) = test_state().await;
        let uri = format!(
            "/api/rooms/{}/quote?start_date=2030-01-01&end_date=2030-01-03",
            room_id
        );
        let response = router(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["nights"], 2);
        assert_eq!(json["available"], true);
        assert!(json["total"]["amount"].as_str().unwrap().starts_with("200"));
        assert_eq!(json["total"]["currency"], "USD");
    }

    #[tokio::test]
    async fn test_quote_invalid_range_is_json_error() {
        let (state, room_id) = test_state().await;
        let uri = format!(
            "/api/rooms/{}/quote?start_date=2030-01-03&end_date=2030-01-03",
            room_id
        );
        let response = router(state)
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["error_type"], "invalid_range");
    }

    #[tokio::test]
    async fn test_admin_gate() {
        let (state, _) = test_state().await;
        let app = router(state);

        let guest = Request::get("/admin")
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            app.clone().oneshot(guest).await.unwrap().status(),
            StatusCode::FORBIDDEN
        );

        let admin = Request::get("/admin")
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header(USER_ROLE_HEADER, "admin")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.oneshot(admin).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_adds_room() {
        let (state, _) = test_state().await;
        let repo = state.repo.clone();
        let request = Request::builder()
            .method("POST")
            .uri("/admin/rooms")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header(USER_ROLE_HEADER, "admin")
            .body(Body::from("room_number=202&room_type=single&price=80&description="))
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let rooms = repo.list_rooms().await.unwrap();
        assert_eq!(rooms.len(), 2);
        assert!(rooms.iter().any(|r| r.room_number == "202"));
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _) = test_state().await;
        let response = router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
