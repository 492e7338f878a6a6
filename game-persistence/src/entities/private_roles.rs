use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "private_roles")]
pub struct Model {
    /// `{room_id}:{participant_ref}`, one row per participant
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub room_id: Uuid,
    pub participant_ref: Uuid,
    pub role: String,
    pub word: String,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
