use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "room_participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub participant_ref: Uuid,
    pub room_id: Uuid,
    pub name: String,
    pub player_id: Uuid,
    pub is_host: bool,
    pub pending_guess: Option<String>,
    pub joined_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
