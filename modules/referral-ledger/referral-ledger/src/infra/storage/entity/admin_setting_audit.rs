use sea_orm::entity::prelude::*;
use time::OffsetDateTime;
use uuid::Uuid;

/// Append-only. `admin_id` is a weak reference: audits outlive their admin.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "admin_setting_audits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub admin_id: Option<Uuid>,
    pub namespace: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
