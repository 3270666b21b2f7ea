//! Console commands service.
//!
//! Resolves the index scope (pool / sandbox / access-token / user) and
//! hands the pattern to the DAO; the command filter passes through
//! untouched.

use rv_core::{IndexRoots, Record};
use rv_search::{CommandFilter, CommandsDao};

use crate::error::ServiceError;

pub struct CommandsService {
    dao: CommandsDao,
    roots: IndexRoots,
}

impl CommandsService {
    pub fn new(dao: CommandsDao, roots: IndexRoots) -> Self {
        Self { dao, roots }
    }

    pub async fn by_pool(
        &self,
        pool_id: i64,
        filter: &CommandFilter,
    ) -> Result<Vec<Record>, ServiceError> {
        Ok(self
            .dao
            .find_all(&self.roots.commands_by_pool(pool_id), filter)
            .await?)
    }

    pub async fn by_sandbox(
        &self,
        sandbox_id: &str,
        filter: &CommandFilter,
    ) -> Result<Vec<Record>, ServiceError> {
        Ok(self
            .dao
            .find_all(&self.roots.commands_by_sandbox(sandbox_id), filter)
            .await?)
    }

    pub async fn by_access_token(
        &self,
        access_token: &str,
        filter: &CommandFilter,
    ) -> Result<Vec<Record>, ServiceError> {
        Ok(self
            .dao
            .find_all(&self.roots.commands_by_access_token(access_token), filter)
            .await?)
    }

    pub async fn by_access_token_and_user(
        &self,
        access_token: &str,
        user_id: i64,
        filter: &CommandFilter,
    ) -> Result<Vec<Record>, ServiceError> {
        let index = self.roots.commands_by_access_token_and_user(access_token, user_id);
        Ok(self.dao.find_all(&index, filter).await?)
    }

    pub async fn by_sandbox_in_range(
        &self,
        sandbox_id: &str,
        from: i64,
        to: i64,
        filter: &CommandFilter,
    ) -> Result<Vec<Record>, ServiceError> {
        let index = self.roots.commands_by_sandbox(sandbox_id);
        Ok(self.dao.find_in_time_range(&index, from, to, filter).await?)
    }

    pub async fn by_user_in_range(
        &self,
        access_token: &str,
        user_id: i64,
        from: i64,
        to: i64,
        filter: &CommandFilter,
    ) -> Result<Vec<Record>, ServiceError> {
        let index = self.roots.commands_by_access_token_and_user(access_token, user_id);
        Ok(self.dao.find_in_time_range(&index, from, to, filter).await?)
    }

    pub async fn delete_by_pool(&self, pool_id: i64) -> Result<(), ServiceError> {
        Ok(self.dao.delete(&self.roots.commands_by_pool(pool_id)).await?)
    }

    pub async fn delete_by_sandbox(&self, sandbox_id: &str) -> Result<(), ServiceError> {
        Ok(self
            .dao
            .delete(&self.roots.commands_by_sandbox(sandbox_id))
            .await?)
    }

    pub async fn delete_by_access_token(&self, access_token: &str) -> Result<(), ServiceError> {
        Ok(self
            .dao
            .delete(&self.roots.commands_by_access_token(access_token))
            .await?)
    }

    pub async fn delete_by_access_token_and_user(
        &self,
        access_token: &str,
        user_id: i64,
    ) -> Result<(), ServiceError> {
        let index = self.roots.commands_by_access_token_and_user(access_token, user_id);
        Ok(self.dao.delete(&index).await?)
    }
}
