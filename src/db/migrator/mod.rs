use sea_orm_migration::prelude::*;

mod m20260127_add_users;
mod m20260128_add_auth_tokens;
mod m20260129_add_password_reset_otps;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260127_add_users::Migration),
            Box::new(m20260128_add_auth_tokens::Migration),
            Box::new(m20260129_add_password_reset_otps::Migration),
        ]
    }
}
