use sea_orm::entity::prelude::*;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[sea_orm(unique)]
    pub referral_code: String,
    pub referred_by: Option<Uuid>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::referral_account::Entity")]
    ReferralAccount,
    #[sea_orm(has_one = "super::reward_balance::Entity")]
    RewardBalance,
}

impl ActiveModelBehavior for ActiveModel {}

impl Related<super::referral_account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ReferralAccount.def()
    }
}

impl Related<super::reward_balance::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RewardBalance.def()
    }
}
