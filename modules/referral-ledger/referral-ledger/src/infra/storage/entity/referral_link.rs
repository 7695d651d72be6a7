use sea_orm::entity::prelude::*;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "referral_links")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub referral_account_id: Uuid,
    #[sea_orm(unique)]
    pub invite_code: String,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::referral_account::Entity",
        from = "Column::ReferralAccountId",
        to = "super::referral_account::Column::Id"
    )]
    ReferralAccount,
}

impl ActiveModelBehavior for ActiveModel {}

impl Related<super::referral_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReferralAccount.def()
    }
}
