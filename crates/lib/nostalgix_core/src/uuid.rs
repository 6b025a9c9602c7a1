// Helpers for generating identifiers.
//
// Refresh-token rows are append-only audit records, so they get UUIDv7
// (timestamp-sortable) ids generated app-side. User and customer ids carry
// no ordering meaning and use random v4 ids.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}

/// Generate a new random UUIDv4.
pub fn uuidv4() -> Uuid {
    Uuid::new_v4()
}
