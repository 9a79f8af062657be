use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Database Metrics (MongoDB)
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_operations_total",
        "Total number of database operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    // Business Metrics
    pub static ref USERS_REGISTERED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "users_registered_total",
        "Total number of registered users",
        &["role"]
    )
    .unwrap();

    pub static ref ENROLLMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "enrollments_total",
        "Total number of course enrollments",
        &["status"]
    )
    .unwrap();

    pub static ref LESSONS_COMPLETED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lessons_completed_total",
        "Total number of lesson completions recorded",
        &["source"]
    )
    .unwrap();

    pub static ref EXERCISE_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "exercise_attempts_total",
        "Total number of exercise attempts submitted",
        &["type"]
    )
    .unwrap();

    pub static ref QUIZ_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_attempts_total",
        "Total number of quiz attempts submitted",
        &["result"]
    )
    .unwrap();

    pub static ref COURSE_IMAGES_UPLOADED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "course_images_uploaded_total",
        "Total number of course images written to the upload directory",
        &["status"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track database operation with metrics
pub async fn track_db_operation<F, T>(
    operation: &str,
    collection: &str,
    future: F,
) -> Result<T, anyhow::Error>
where
    F: std::future::Future<Output = Result<T, anyhow::Error>>,
{
    let result = future.await;
    let status = if result.is_ok() { "success" } else { "error" };

    DB_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();

    result
}
