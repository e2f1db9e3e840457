//! ID generation utilities.

use uuid::Uuid;

/// Generates a new request identifier.
///
/// UUID v7 carries a timestamp prefix, so identifiers sort in creation
/// order in logs.
#[must_use]
pub fn generate_request_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_is_v7() {
        let id = generate_request_id();
        assert_eq!(id.get_version_num(), 7);
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}
