//! Operator subcommands. Each one runs a single client call and yields a JSON view.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use referral_ledger_sdk::{
    AdminId, AdminRole, LinkPolicy, NewUser, ReferralLedgerClient, ReferralSource, TelegramId,
    User, UserProfile,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::render;

#[derive(Subcommand)]
pub enum UsersCommand {
    /// Register a platform user
    Create {
        #[arg(long)]
        telegram_id: TelegramId,
        #[command(flatten)]
        profile: ProfileArgs,
        /// Referrer's referral code
        #[arg(long, conflicts_with = "invite_code")]
        referral_code: Option<String>,
        /// Invite code of a referral link
        #[arg(long)]
        invite_code: Option<String>,
    },
    /// Show a user
    Show {
        #[arg(long)]
        telegram_id: TelegramId,
    },
    /// Replace a user's display fields
    UpdateProfile {
        #[arg(long)]
        telegram_id: TelegramId,
        #[command(flatten)]
        profile: ProfileArgs,
    },
    /// Attribute an existing user to a referrer
    ClaimReferrer {
        #[arg(long)]
        telegram_id: TelegramId,
        #[arg(long, conflicts_with = "invite_code", required_unless_present = "invite_code")]
        referral_code: Option<String>,
        #[arg(long)]
        invite_code: Option<String>,
    },
    /// Find the owner of a referral code
    FindByCode { code: String },
    /// Direct referees, oldest first
    Referrals {
        #[arg(long)]
        telegram_id: TelegramId,
    },
}

#[derive(Args)]
pub struct ProfileArgs {
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
}

impl From<ProfileArgs> for UserProfile {
    fn from(args: ProfileArgs) -> Self {
        Self {
            username: args.username,
            first_name: args.first_name,
            last_name: args.last_name,
        }
    }
}

#[derive(Subcommand)]
pub enum LinksCommand {
    /// Show (creating on first use) the user's referral account
    Account {
        #[arg(long)]
        telegram_id: TelegramId,
    },
    /// Issue a new invite link
    Issue {
        #[arg(long)]
        telegram_id: TelegramId,
        /// `additive` or `exclusive`; defaults to the configured policy
        #[arg(long)]
        policy: Option<LinkPolicy>,
    },
    /// Deactivate an invite link
    Deactivate {
        #[arg(long)]
        id: Uuid,
    },
    /// Resolve an invite code to its referral account
    Resolve { invite_code: String },
    /// Every link of the user's referral account
    List {
        #[arg(long)]
        telegram_id: TelegramId,
    },
    /// Point the account's rewards at a wallet, or clear it
    SetWallet {
        #[arg(long)]
        telegram_id: TelegramId,
        #[arg(long)]
        wallet_id: Option<Uuid>,
    },
}

#[derive(Subcommand)]
pub enum RewardsCommand {
    Balance {
        #[arg(long)]
        telegram_id: TelegramId,
    },
    /// Accrue into the unpaid bucket
    Credit {
        #[arg(long)]
        telegram_id: TelegramId,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        note: Option<String>,
    },
    /// Move from unpaid to paid
    Settle {
        #[arg(long)]
        telegram_id: TelegramId,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        admin: Option<AdminId>,
    },
    /// Claw back unpaid rewards (`super_admin` only)
    Reverse {
        #[arg(long)]
        admin: AdminId,
        #[arg(long)]
        telegram_id: TelegramId,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        reason: String,
    },
    /// Journal rows, newest first
    Entries {
        #[arg(long)]
        telegram_id: TelegramId,
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    Get {
        namespace: String,
    },
    /// Replace a namespace with a JSON document
    Put {
        namespace: String,
        /// JSON document
        #[arg(long)]
        value: String,
        #[arg(long)]
        admin: Option<AdminId>,
    },
    /// Known namespaces, sorted
    Namespaces,
    /// Audit trail, newest first
    Audit {
        #[arg(long)]
        namespace: Option<String>,
        #[arg(long)]
        limit: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum AdminsCommand {
    /// Create the first operator without an acting admin
    Bootstrap {
        #[arg(long)]
        telegram_id: TelegramId,
        #[arg(long, default_value = "super_admin")]
        role: AdminRole,
    },
    Create {
        #[arg(long)]
        admin: AdminId,
        #[arg(long)]
        telegram_id: TelegramId,
        #[arg(long)]
        role: AdminRole,
    },
    SetRole {
        #[arg(long)]
        admin: AdminId,
        #[arg(long)]
        target: AdminId,
        #[arg(long)]
        role: AdminRole,
    },
    Show {
        #[arg(long)]
        id: AdminId,
    },
    /// Exit status reflects whether the admin holds `role`
    Authorize {
        #[arg(long)]
        id: AdminId,
        #[arg(long)]
        role: AdminRole,
    },
}

fn source(referral_code: Option<String>, invite_code: Option<String>) -> Option<ReferralSource> {
    referral_code
        .map(ReferralSource::ReferralCode)
        .or_else(|| invite_code.map(ReferralSource::InviteLink))
}

async fn user_by_telegram_id(client: &dyn ReferralLedgerClient, telegram_id: TelegramId) -> Result<User> {
    client
        .find_user_by_telegram_id(telegram_id)
        .await?
        .with_context(|| format!("no user with telegram id {telegram_id}"))
}

pub async fn users(client: &dyn ReferralLedgerClient, command: UsersCommand) -> Result<Value> {
    match command {
        UsersCommand::Create {
            telegram_id,
            profile,
            referral_code,
            invite_code,
        } => {
            let new_user = NewUser {
                telegram_id,
                profile: profile.into(),
                referrer: source(referral_code, invite_code),
            };
            Ok(render::user(&client.create_user(new_user).await?))
        }
        UsersCommand::Show { telegram_id } => {
            Ok(render::user(&user_by_telegram_id(client, telegram_id).await?))
        }
        UsersCommand::FindByCode { code } => {
            let user = client
                .find_user_by_referral_code(&code)
                .await?
                .with_context(|| format!("no user owns referral code '{code}'"))?;
            Ok(render::user(&user))
        }
        UsersCommand::UpdateProfile {
            telegram_id,
            profile,
        } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            Ok(render::user(&client.update_profile(user.id, profile.into()).await?))
        }
        UsersCommand::ClaimReferrer {
            telegram_id,
            referral_code,
            invite_code,
        } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            let source = source(referral_code, invite_code)
                .context("either --referral-code or --invite-code is required")?;
            Ok(render::user(&client.claim_referrer(user.id, source).await?))
        }
        UsersCommand::Referrals { telegram_id } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            let referees = client.list_referrals(user.id).await?;
            Ok(render::list(&referees, render::user))
        }
    }
}

pub async fn links(client: &dyn ReferralLedgerClient, command: LinksCommand) -> Result<Value> {
    match command {
        LinksCommand::Account { telegram_id } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            Ok(render::account(&client.ensure_referral_account(user.id).await?))
        }
        LinksCommand::Issue {
            telegram_id,
            policy,
        } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            let account = client.ensure_referral_account(user.id).await?;
            Ok(render::link(&client.issue_link(account.id, policy).await?))
        }
        LinksCommand::Deactivate { id } => Ok(render::link(&client.deactivate_link(id).await?)),
        LinksCommand::Resolve { invite_code } => {
            Ok(render::account(&client.resolve_link(&invite_code).await?))
        }
        LinksCommand::List { telegram_id } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            let Some(account) = client.find_referral_account_by_user(user.id).await? else {
                return Ok(Value::Array(Vec::new()));
            };
            Ok(render::list(&client.list_links(account.id).await?, render::link))
        }
        LinksCommand::SetWallet {
            telegram_id,
            wallet_id,
        } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            let account = client.ensure_referral_account(user.id).await?;
            Ok(render::account(
                &client.set_rewards_wallet(account.id, wallet_id).await?,
            ))
        }
    }
}

pub async fn rewards(client: &dyn ReferralLedgerClient, command: RewardsCommand) -> Result<Value> {
    match command {
        RewardsCommand::Balance { telegram_id } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            Ok(render::balance(&client.get_balance(user.id).await?))
        }
        RewardsCommand::Credit {
            telegram_id,
            amount,
            note,
        } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            Ok(render::balance(&client.credit(user.id, amount, note).await?))
        }
        RewardsCommand::Settle {
            telegram_id,
            amount,
            admin,
        } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            Ok(render::balance(&client.settle(user.id, amount, admin).await?))
        }
        RewardsCommand::Reverse {
            admin,
            telegram_id,
            amount,
            reason,
        } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            Ok(render::balance(
                &client.reverse(admin, user.id, amount, reason).await?,
            ))
        }
        RewardsCommand::Entries { telegram_id, limit } => {
            let user = user_by_telegram_id(client, telegram_id).await?;
            let entries = client.list_ledger_entries(user.id, limit).await?;
            Ok(render::list(&entries, render::entry))
        }
    }
}

pub async fn settings(client: &dyn ReferralLedgerClient, command: SettingsCommand) -> Result<Value> {
    match command {
        SettingsCommand::Get { namespace } => Ok(client.get_settings(&namespace).await?),
        SettingsCommand::Put {
            namespace,
            value,
            admin,
        } => {
            let value: Value = serde_json::from_str(&value).context("--value is not valid JSON")?;
            client.put_settings(&namespace, value.clone(), admin).await?;
            Ok(json!({ "namespace": namespace, "settings": value }))
        }
        SettingsCommand::Namespaces => Ok(json!(client.list_namespaces().await?)),
        SettingsCommand::Audit { namespace, limit } => {
            let records = client.list_audit(namespace.as_deref(), limit).await?;
            Ok(render::list(&records, render::audit))
        }
    }
}

pub async fn admins(client: &dyn ReferralLedgerClient, command: AdminsCommand) -> Result<Value> {
    match command {
        AdminsCommand::Bootstrap { telegram_id, role } => Ok(render::admin(
            &client.create_admin(None, telegram_id, role).await?,
        )),
        AdminsCommand::Create {
            admin,
            telegram_id,
            role,
        } => Ok(render::admin(
            &client.create_admin(Some(admin), telegram_id, role).await?,
        )),
        AdminsCommand::SetRole {
            admin,
            target,
            role,
        } => Ok(render::admin(
            &client.set_admin_role(admin, target, role).await?,
        )),
        AdminsCommand::Show { id } => Ok(render::admin(&client.get_admin(id).await?)),
        AdminsCommand::Authorize { id, role } => {
            let allowed = client.authorize(id, role).await?;
            if !allowed {
                anyhow::bail!("admin {id} does not hold role {role}");
            }
            Ok(json!({ "admin_id": id, "role": role.as_str(), "authorized": true }))
        }
    }
}
