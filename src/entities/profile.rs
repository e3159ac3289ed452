//! Profile entity - Public profile of a farmer or consumer

use super::enums::Role;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: String,
    pub role: Role,
    pub name: String,
    pub location: Option<String>,
    pub profile_photo: Option<String>,
}
