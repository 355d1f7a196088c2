//! OpenAPI document.

use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers::upload::UploadResponse;

#[derive(OpenApi)]
#[openapi(
    paths(crate::handlers::upload::upload_receipt),
    components(schemas(UploadResponse, ErrorResponse)),
    tags(
        (name = "upload", description = "Receipt upload gatekeeping")
    )
)]
pub struct ApiDoc;
