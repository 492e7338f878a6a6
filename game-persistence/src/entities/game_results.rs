use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "game_results")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub room_id: Uuid,
    pub game_number: i32,
    pub winner: String,
    /// Full `GameResultRecord`, as JSON
    #[sea_orm(column_type = "Text")]
    pub results_json: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
