use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Poultry Farm API",
        version = "0.1.0",
        description = r#"
# Poultry Farm API

Feed inventory and consumption tracking for a poultry operation.

## Feed consumption

Recording consumption deducts stock from the batches that expire soonest,
spilling into the next batch when one runs out. A recording either commits in
full (record, per-batch deductions and batch updates) or changes nothing.

## Authentication

Every `/api/v1` endpoint requires a JWT bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Errors

Failures return a JSON body with `error`, `message`, `request_id` and `timestamp`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    paths(
        crate::handlers::health::health_check,

        crate::handlers::feed::stock_summary,
        crate::handlers::feed::stock_for_type,
        crate::handlers::feed::receive_batch,
        crate::handlers::feed::record_consumption,
        crate::handlers::feed::list_consumption,
        crate::handlers::feed::get_consumption,

        crate::handlers::flocks::list_flocks,
        crate::handlers::flocks::get_flock,
        crate::handlers::flocks::create_flock,
    ),
    components(
        schemas(
            crate::ResponseMeta,

            // Feed types
            crate::services::feed_ledger::FeedStockSummary,
            crate::handlers::feed::FeedBatchResponse,
            crate::handlers::feed::FeedTypeStockResponse,
            crate::handlers::feed::ReceiveBatchRequest,
            crate::handlers::feed::RecordConsumptionRequest,
            crate::handlers::feed::ConsumptionResponse,
            crate::handlers::feed::DeductionResponse,
            crate::handlers::feed::ConsumptionDetailResponse,

            // Flock types
            crate::handlers::flocks::FlockResponse,
            crate::handlers::flocks::CreateFlockRequest,

            crate::handlers::health::HealthResponse,
            crate::handlers::health::ComponentStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "feed", description = "Feed inventory and consumption"),
        (name = "flocks", description = "Flock registry"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
