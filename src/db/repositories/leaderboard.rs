use sqlx::PgPool;
use tracing::instrument;

use crate::constants::RANKED_ROLE;
use crate::db::DbResult;
use crate::db::prelude::{RankedUser, UserId};

/// Ranks every account with the ranked role by xp, then streak. `RANK()` gives tied rows the
/// same number and skips the following ones (1, 1, 3).
///
/// `$1` is the ranked role.
const RANKED_USERS_CTE: &str = r#"
    ranked_users AS (
        SELECT
            u.uuid AS user_id,
            u.username AS display_name,
            u.avatar_filename AS avatar,
            s.xp,
            s.level,
            s.streak,
            RANK() OVER (ORDER BY s.xp DESC, s.streak DESC) AS rank
        FROM users u
        JOIN user_stats s ON s.user_id = u.uuid
        WHERE u.role = $1
    )
"#;

#[instrument(skip(pool, user_id), fields(%user_id))]
pub async fn user_rank(pool: &PgPool, user_id: &UserId) -> DbResult<Option<i64>> {
    let rank = sqlx::query_scalar::<_, i64>(&format!(
        "WITH {RANKED_USERS_CTE} SELECT rank FROM ranked_users WHERE user_id = $2"
    ))
    .bind(RANKED_ROLE)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(rank)
}

#[instrument(skip(pool))]
pub async fn top_ranked(pool: &PgPool, limit: i64) -> DbResult<Vec<RankedUser>> {
    let rows = sqlx::query_as::<_, RankedUser>(&format!(
        r#"
        WITH {RANKED_USERS_CTE}
        SELECT
            user_id,
            display_name,
            avatar,
            xp,
            level,
            streak,
            rank
        FROM ranked_users
        ORDER BY rank ASC, display_name ASC
        LIMIT $2
        "#
    ))
    .bind(RANKED_ROLE)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    tracing::debug!(count = rows.len(), "fetched ranked users");
    Ok(rows)
}
