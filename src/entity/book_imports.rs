use sea_orm::entity::prelude::*;

/// An import receipt; `total_quantity` is the sum of its detail lines.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "book_imports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub staff_id: Uuid,
    pub import_date: DateTimeWithTimeZone,
    pub total_quantity: i32,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::StaffId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(has_many = "super::book_import_details::Entity")]
    BookImportDetails,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::book_import_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookImportDetails.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
