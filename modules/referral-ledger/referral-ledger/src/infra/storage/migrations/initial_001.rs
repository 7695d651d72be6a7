//! Referral graph, reward ledger and settings audit tables.
//!
//! Unique indexes carry the column name so backend error messages identify
//! which token or identity collided.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        create_users(manager).await?;
        create_referral_accounts(manager).await?;
        create_referral_links(manager).await?;
        create_rewards(manager).await?;
        create_admin_tables(manager).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        drop_table(manager, AdminSettingAudits::Table).await?;
        drop_table(manager, AdminSettings::Table).await?;
        drop_table(manager, AdminUsers::Table).await?;
        drop_table(manager, RewardLedgerEntries::Table).await?;
        drop_table(manager, RewardWalletBalances::Table).await?;
        drop_table(manager, ReferralLinks::Table).await?;
        drop_table(manager, ReferralAccounts::Table).await?;
        drop_table(manager, Users::Table).await
    }
}

async fn drop_table<T>(manager: &SchemaManager<'_>, table: T) -> Result<(), DbErr>
where
    T: IntoIden + 'static,
{
    manager
        .drop_table(Table::drop().table(table).if_exists().to_owned())
        .await
}

async fn create_unique_index<T, C>(
    manager: &SchemaManager<'_>,
    name: &str,
    table: T,
    column: C,
) -> Result<(), DbErr>
where
    T: IntoIden + 'static,
    C: IntoIden + 'static,
{
    manager
        .create_index(
            Index::create()
                .name(name)
                .table(table)
                .col(column)
                .unique()
                .if_not_exists()
                .to_owned(),
        )
        .await
}

async fn create_users(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(Users::Table)
                .if_not_exists()
                .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Users::TelegramId).big_integer().not_null())
                .col(ColumnDef::new(Users::Username).string())
                .col(ColumnDef::new(Users::FirstName).string())
                .col(ColumnDef::new(Users::LastName).string())
                .col(ColumnDef::new(Users::ReferralCode).string().not_null())
                .col(ColumnDef::new(Users::ReferredBy).uuid())
                .col(
                    ColumnDef::new(Users::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(Users::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_users_referred_by")
                        .from(Users::Table, Users::ReferredBy)
                        .to(Users::Table, Users::Id),
                )
                .to_owned(),
        )
        .await?;

    create_unique_index(manager, "ux_users_telegram_id", Users::Table, Users::TelegramId).await?;
    create_unique_index(
        manager,
        "ux_users_referral_code",
        Users::Table,
        Users::ReferralCode,
    )
    .await?;
    manager
        .create_index(
            Index::create()
                .name("ix_users_referred_by")
                .table(Users::Table)
                .col(Users::ReferredBy)
                .if_not_exists()
                .to_owned(),
        )
        .await
}

async fn create_referral_accounts(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(ReferralAccounts::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(ReferralAccounts::Id)
                        .uuid()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(ReferralAccounts::UserId).uuid().not_null())
                .col(
                    ColumnDef::new(ReferralAccounts::ReferralCode)
                        .string()
                        .not_null(),
                )
                .col(ColumnDef::new(ReferralAccounts::RewardsWalletId).uuid())
                .col(ColumnDef::new(ReferralAccounts::LastLinkUpdateAt).timestamp_with_time_zone())
                .col(
                    ColumnDef::new(ReferralAccounts::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(ReferralAccounts::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_referral_accounts_user")
                        .from(ReferralAccounts::Table, ReferralAccounts::UserId)
                        .to(Users::Table, Users::Id),
                )
                .to_owned(),
        )
        .await?;

    create_unique_index(
        manager,
        "ux_referral_accounts_user_id",
        ReferralAccounts::Table,
        ReferralAccounts::UserId,
    )
    .await?;
    create_unique_index(
        manager,
        "ux_referral_accounts_referral_code",
        ReferralAccounts::Table,
        ReferralAccounts::ReferralCode,
    )
    .await
}

async fn create_referral_links(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(ReferralLinks::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(ReferralLinks::Id)
                        .uuid()
                        .not_null()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(ReferralLinks::ReferralAccountId)
                        .uuid()
                        .not_null(),
                )
                .col(ColumnDef::new(ReferralLinks::InviteCode).string().not_null())
                .col(
                    ColumnDef::new(ReferralLinks::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .col(
                    ColumnDef::new(ReferralLinks::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_referral_links_account")
                        .from(ReferralLinks::Table, ReferralLinks::ReferralAccountId)
                        .to(ReferralAccounts::Table, ReferralAccounts::Id),
                )
                .to_owned(),
        )
        .await?;

    create_unique_index(
        manager,
        "ux_referral_links_invite_code",
        ReferralLinks::Table,
        ReferralLinks::InviteCode,
    )
    .await?;
    manager
        .create_index(
            Index::create()
                .name("ix_referral_links_account")
                .table(ReferralLinks::Table)
                .col(ReferralLinks::ReferralAccountId)
                .if_not_exists()
                .to_owned(),
        )
        .await
}

async fn create_rewards(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(RewardWalletBalances::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(RewardWalletBalances::UserId)
                        .uuid()
                        .not_null()
                        .primary_key(),
                )
                .col(
                    ColumnDef::new(RewardWalletBalances::TotalPaid)
                        .string()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(RewardWalletBalances::TotalUnpaid)
                        .string()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(RewardWalletBalances::Version)
                        .big_integer()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(RewardWalletBalances::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_reward_wallet_balances_user")
                        .from(RewardWalletBalances::Table, RewardWalletBalances::UserId)
                        .to(Users::Table, Users::Id),
                )
                .to_owned(),
        )
        .await?;

    manager
        .create_table(
            Table::create()
                .table(RewardLedgerEntries::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(RewardLedgerEntries::Id)
                        .uuid()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(RewardLedgerEntries::UserId).uuid().not_null())
                .col(ColumnDef::new(RewardLedgerEntries::Kind).string().not_null())
                .col(ColumnDef::new(RewardLedgerEntries::Amount).string().not_null())
                .col(ColumnDef::new(RewardLedgerEntries::AdminId).uuid())
                .col(ColumnDef::new(RewardLedgerEntries::Note).text())
                .col(
                    ColumnDef::new(RewardLedgerEntries::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_reward_ledger_entries_user")
                        .from(RewardLedgerEntries::Table, RewardLedgerEntries::UserId)
                        .to(Users::Table, Users::Id),
                )
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .name("ix_reward_ledger_entries_user_created")
                .table(RewardLedgerEntries::Table)
                .col(RewardLedgerEntries::UserId)
                .col(RewardLedgerEntries::CreatedAt)
                .if_not_exists()
                .to_owned(),
        )
        .await
}

async fn create_admin_tables(manager: &SchemaManager<'_>) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(AdminUsers::Table)
                .if_not_exists()
                .col(ColumnDef::new(AdminUsers::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(AdminUsers::TelegramId).big_integer().not_null())
                .col(ColumnDef::new(AdminUsers::Role).string().not_null())
                .col(
                    ColumnDef::new(AdminUsers::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .to_owned(),
        )
        .await?;
    create_unique_index(
        manager,
        "ux_admin_users_telegram_id",
        AdminUsers::Table,
        AdminUsers::TelegramId,
    )
    .await?;

    manager
        .create_table(
            Table::create()
                .table(AdminSettings::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(AdminSettings::Namespace)
                        .string()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(AdminSettings::Settings).text().not_null())
                .col(ColumnDef::new(AdminSettings::Version).big_integer().not_null())
                .col(
                    ColumnDef::new(AdminSettings::CreatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .col(
                    ColumnDef::new(AdminSettings::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .to_owned(),
        )
        .await?;

    // No foreign key on admin_id: audits outlive the admin who made them.
    manager
        .create_table(
            Table::create()
                .table(AdminSettingAudits::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(AdminSettingAudits::Id)
                        .uuid()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(AdminSettingAudits::AdminId).uuid())
                .col(ColumnDef::new(AdminSettingAudits::Namespace).string().not_null())
                .col(ColumnDef::new(AdminSettingAudits::OldValue).text())
                .col(ColumnDef::new(AdminSettingAudits::NewValue).text())
                .col(
                    ColumnDef::new(AdminSettingAudits::UpdatedAt)
                        .timestamp_with_time_zone()
                        .not_null(),
                )
                .to_owned(),
        )
        .await?;

    manager
        .create_index(
            Index::create()
                .name("ix_admin_setting_audits_namespace_updated")
                .table(AdminSettingAudits::Table)
                .col(AdminSettingAudits::Namespace)
                .col(AdminSettingAudits::UpdatedAt)
                .if_not_exists()
                .to_owned(),
        )
        .await
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    TelegramId,
    Username,
    FirstName,
    LastName,
    ReferralCode,
    ReferredBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReferralAccounts {
    Table,
    Id,
    UserId,
    ReferralCode,
    RewardsWalletId,
    LastLinkUpdateAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ReferralLinks {
    Table,
    Id,
    ReferralAccountId,
    InviteCode,
    IsActive,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RewardWalletBalances {
    Table,
    UserId,
    TotalPaid,
    TotalUnpaid,
    Version,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RewardLedgerEntries {
    Table,
    Id,
    UserId,
    Kind,
    Amount,
    AdminId,
    Note,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AdminUsers {
    Table,
    Id,
    TelegramId,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AdminSettings {
    Table,
    Namespace,
    Settings,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum AdminSettingAudits {
    Table,
    Id,
    AdminId,
    Namespace,
    OldValue,
    NewValue,
    UpdatedAt,
}
