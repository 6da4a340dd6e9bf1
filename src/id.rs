use uuid::Uuid;

/// Time-ordered ids so freshly inserted rows cluster in the primary index.
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}
