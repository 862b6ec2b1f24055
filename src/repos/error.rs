/**
 * Responsibility
 * - What a repo reports upward; callers decide whether it is fatal
 */
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("db error: {0}")]
    Db(#[from] sqlx::Error),
}
