use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "train")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub cargo_num: i32,
    pub places_in_cargo: i32,
    pub train_type_id: i32,
}

impl Model {
    /// Total seats across all cargos, widened so huge trains can't overflow
    pub fn capacity(&self) -> i64 {
        self.cargo_num as i64 * self.places_in_cargo as i64
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::train_type::Entity",
        from = "Column::TrainTypeId",
        to = "super::train_type::Column::Id"
    )]
    TrainType,
    #[sea_orm(has_many = "super::journey::Entity")]
    Journeys,
}

impl Related<super::train_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TrainType.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
