use axum::{routing::get, Json, Router};
use coach::knowledge::{StarterTopic, STARTER_TOPICS};

async fn list_topics() -> Json<&'static [StarterTopic]> {
    Json(STARTER_TOPICS)
}

pub fn routes() -> Router {
    Router::new().route("/api/topics", get(list_topics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_list_topics() {
        let response = routes()
            .oneshot(
                Request::builder()
                    .uri("/api/topics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let topics: Value = serde_json::from_slice(&body).unwrap();
        let topics = topics.as_array().unwrap();
        assert_eq!(topics.len(), 6);
        assert_eq!(topics[0]["label"], "What is durability?");
        assert!(topics.iter().all(|t| t["prompt"].is_string() && t["icon"].is_string()));
    }
}
