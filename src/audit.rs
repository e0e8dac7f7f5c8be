use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use uuid::Uuid;

use crate::{entity::audit_logs::ActiveModel as AuditLogActive, error::AppResult};

/// Append one audit row for an order state transition. Runs on the caller's
/// connection so workflow audit rows commit (or roll back) with the
/// transaction they describe.
pub async fn log_audit<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    action: &str,
    old_value: Option<String>,
    new_value: Option<String>,
    changed_by: &str,
) -> AppResult<()> {
    AuditLogActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        action: Set(action.to_string()),
        old_value: Set(old_value),
        new_value: Set(new_value),
        changed_by: Set(Some(changed_by.to_string())),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;

    Ok(())
}
