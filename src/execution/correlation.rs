use uuid::Uuid;

/// Fresh identifier for one controller instance.
///
/// Random v4 UUIDs need no shared counter and stay unique across the
/// process lifetime.
pub fn new_correlation_id() -> String {
    format!("query-{}", Uuid::new_v4())
}
