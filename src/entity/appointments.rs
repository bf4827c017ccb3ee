use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "appointments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: Date,
    pub time: String,
    pub duration_minutes: Option<i32>,
    pub status: String,
    pub notes: Option<String>,
    pub symptoms: Option<String>,
    pub signs: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
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
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::PatientId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::doctor_profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DoctorProfiles.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
