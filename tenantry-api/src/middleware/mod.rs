/// Middleware modules for the API server
///
/// - `request`: request id, languages and envelope rendering
/// - `security`: security response headers

pub mod request;
pub mod security;
