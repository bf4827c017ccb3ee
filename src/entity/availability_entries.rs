use sea_orm::entity::prelude::*;

/// One published day of a doctor's schedule; `slots` is a JSON array of `HH:MM` labels.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "availability_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: Date,
    #[sea_orm(column_type = "JsonBinary")]
    pub slots: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::doctor_profiles::Entity",
        from = "Column::DoctorId",
        to = "super::doctor_profiles::Column::Id",
        on_delete = "Cascade"
    )]
    DoctorProfiles,
}

impl Related<super::doctor_profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DoctorProfiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
