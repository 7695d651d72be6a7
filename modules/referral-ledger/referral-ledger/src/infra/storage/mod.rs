//! Infrastructure storage layer - database persistence.
//!
//! This module contains ALL `SeaORM`-specific code and database operations:
//! - `entity/` - `SeaORM` entity definitions, one per table
//! - `mapper.rs` - Conversions between `SeaORM` models and SDK contract types
//! - `migrations/` - Database schema migrations
//!
//! Money columns are stored as canonical decimal strings and settings blobs as
//! JSON text, so every backend round-trips them exactly.

pub mod entity;
pub mod mapper;
pub mod migrations;

mod admins_sea_repo;
mod db;
mod referrals_sea_repo;
mod rewards_sea_repo;
mod settings_sea_repo;
mod users_sea_repo;

pub use admins_sea_repo::OrmAdminsRepository;
pub use referrals_sea_repo::OrmReferralsRepository;
pub use rewards_sea_repo::OrmRewardsRepository;
pub use settings_sea_repo::OrmSettingsRepository;
pub use users_sea_repo::OrmUsersRepository;
