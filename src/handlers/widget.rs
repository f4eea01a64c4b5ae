use axum::{
    http::{HeaderValue, header},
    response::IntoResponse,
};

/// The embeddable player script
pub const WIDGET_JS: &str = include_str!("../../assets/widget.js");

pub async fn widget_script() -> impl IntoResponse {
    (
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/javascript; charset=utf-8"),
            ),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=300"),
            ),
        ],
        WIDGET_JS,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_calls_playback() {
        assert!(WIDGET_JS.contains("/api/playback"));
        assert!(WIDGET_JS.contains("data-project"));
        assert!(WIDGET_JS.contains("localStorage"));
        assert!(WIDGET_JS.contains("utm_source"));
    }
}
