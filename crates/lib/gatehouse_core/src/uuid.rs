// Helper for generating UUIDv7 (timestamp-sortable UUIDs)
//
// Status history rows are ordered by creation; ids are generated app-side
// so they sort the same way.

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
