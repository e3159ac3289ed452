//! Profile repositories - Farmer and consumer profile stores
//!
//! Farmers and consumers live in separate tables. `ProfileRepository` picks
//! the right store from the role once, so callers never branch on it.

use super::{Create, Read};
use crate::dtos::CreateProfileDTO;
use crate::entities::{Profile, Role};
use sqlx::{Error, SqlitePool};
use tracing::{debug, instrument};

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    name: String,
    location: Option<String>,
    profile_photo: Option<String>,
}

impl ProfileRow {
    fn into_profile(self, role: Role) -> Profile {
        Profile {
            user_id: self.user_id,
            role,
            name: self.name,
            location: self.location,
            profile_photo: self.profile_photo,
        }
    }
}

fn profile_from_dto(data: &CreateProfileDTO, role: Role) -> Profile {
    Profile {
        user_id: data.user_id.clone(),
        role,
        name: data.name.clone(),
        location: data.location.clone(),
        profile_photo: data.profile_photo.clone(),
    }
}

// FARMER REPOSITORY
pub struct FarmerRepository {
    connection_pool: SqlitePool,
}

impl FarmerRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }
}

impl Create<Profile, CreateProfileDTO> for FarmerRepository {
    #[instrument(skip(self, data), fields(user_id = %data.user_id))]
    async fn create(&self, data: &CreateProfileDTO) -> Result<Profile, Error> {
        sqlx::query(
            "INSERT INTO farmers (farmer_id, name, location, profile_photo) VALUES (?, ?, ?, ?)",
        )
        .bind(&data.user_id)
        .bind(&data.name)
        .bind(&data.location)
        .bind(&data.profile_photo)
        .execute(&self.connection_pool)
        .await?;

        debug!("Farmer profile created");
        Ok(profile_from_dto(data, Role::Farmer))
    }
}

impl Read<Profile, str> for FarmerRepository {
    #[instrument(skip(self))]
    async fn read(&self, id: &str) -> Result<Option<Profile>, Error> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT farmer_id AS user_id, name, location, profile_photo
            FROM farmers
            WHERE farmer_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(row.map(|r| r.into_profile(Role::Farmer)))
    }
}

// CONSUMER REPOSITORY
pub struct ConsumerRepository {
    connection_pool: SqlitePool,
}

impl ConsumerRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self { connection_pool }
    }
}

impl Create<Profile, CreateProfileDTO> for ConsumerRepository {
    #[instrument(skip(self, data), fields(user_id = %data.user_id))]
    async fn create(&self, data: &CreateProfileDTO) -> Result<Profile, Error> {
        sqlx::query(
            "INSERT INTO consumers (consumer_id, name, location, profile_photo) VALUES (?, ?, ?, ?)",
        )
        .bind(&data.user_id)
        .bind(&data.name)
        .bind(&data.location)
        .bind(&data.profile_photo)
        .execute(&self.connection_pool)
        .await?;

        debug!("Consumer profile created");
        Ok(profile_from_dto(data, Role::Consumer))
    }
}

impl Read<Profile, str> for ConsumerRepository {
    #[instrument(skip(self))]
    async fn read(&self, id: &str) -> Result<Option<Profile>, Error> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT consumer_id AS user_id, name, location, profile_photo
            FROM consumers
            WHERE consumer_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(row.map(|r| r.into_profile(Role::Consumer)))
    }
}

// PROFILE REPOSITORY
pub struct ProfileRepository {
    pub farmers: FarmerRepository,
    pub consumers: ConsumerRepository,
}

impl ProfileRepository {
    pub fn new(connection_pool: SqlitePool) -> Self {
        Self {
            farmers: FarmerRepository::new(connection_pool.clone()),
            consumers: ConsumerRepository::new(connection_pool),
        }
    }

    /// Looks a user up in the store matching `role`
    pub async fn find(&self, role: Role, user_id: &str) -> Result<Option<Profile>, Error> {
        match role {
            Role::Farmer => self.farmers.read(user_id).await,
            Role::Consumer => self.consumers.read(user_id).await,
        }
    }

    pub async fn create(&self, role: Role, data: &CreateProfileDTO) -> Result<Profile, Error> {
        match role {
            Role::Farmer => self.farmers.create(data).await,
            Role::Consumer => self.consumers.create(data).await,
        }
    }
}
