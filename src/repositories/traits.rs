//! Repository traits shared by the SQLite stores

/// Insert side of a store: persists `CreateDTO` and returns the stored record,
/// with the id and timestamps the repository assigned.
pub trait Create<Entity, CreateDTO> {
    async fn create(&self, data: &CreateDTO) -> Result<Entity, sqlx::Error>;
}

/// Lookup by primary key. A missing row is `Ok(None)`, not an error.
pub trait Read<Entity, Id: ?Sized> {
    async fn read(&self, id: &Id) -> Result<Option<Entity>, sqlx::Error>;
}
