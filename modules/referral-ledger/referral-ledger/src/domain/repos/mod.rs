mod admins_repo;
mod referrals_repo;
mod rewards_repo;
mod settings_repo;
mod users_repo;

pub use admins_repo::AdminsRepository;
pub use referrals_repo::ReferralsRepository;
pub use rewards_repo::{RewardsRepository, VersionedBalance};
pub use settings_repo::{SettingsRepository, VersionedSettings};
pub use users_repo::UsersRepository;
