use axum::{body::Bytes, Json};
use base64ct::{Base64, Encoding};

#[utoipa::path(
    post,
    path = "/v1/misc/base64encode",
    request_body(content = String, description = "Arbitrary bytes", content_type = "text/plain"),
    responses (
        (status = 200, description = "Standard base64 of the request body", body = String),
    ),
    tag = "misc",
)]
pub async fn base64_encode(body: Bytes) -> Json<String> {
    Json(Base64::encode_string(&body))
}
