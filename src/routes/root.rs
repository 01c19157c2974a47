/// GET /
pub async fn hello() -> &'static str {
    "hello world"
}
