use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct FollowRequest {
    pub user_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct FollowToggled {
    pub followed: bool,
}

#[derive(Serialize, Deserialize, Debug, FromRow, PartialEq, Eq)]
pub struct Connection {
    pub id: Uuid,
    pub username: String,
}
