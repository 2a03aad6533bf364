use uuid::Uuid;

use crate::database::models::ProductCategory;
use crate::database::session::Session;
use crate::error::DispatchError;

pub const SUBCATEGORIES_FIELD: &str = "Subcategories";

/// Fail on `field` naming the first id that is not an existing category
pub async fn ensure_categories_exist(
    session: &Session,
    field: &str,
    ids: &[Uuid],
) -> Result<(), DispatchError> {
    for id in ids {
        if session.find::<ProductCategory>(*id).await?.is_none() {
            return Err(DispatchError::validation(
                field,
                format!("ProductCategory with ID '{}' not found.", id),
            ));
        }
    }
    Ok(())
}

/// Guard for a category's subcategory list: it must not contain the
/// category itself and every listed id must exist.
///
/// Only direct self-reference is rejected; longer cycles are not detected.
pub async fn validate_subcategories(
    session: &Session,
    current_id: Uuid,
    subcategories: &[Uuid],
) -> Result<(), DispatchError> {
    if subcategories.contains(&current_id) {
        return Err(DispatchError::validation(
            SUBCATEGORIES_FIELD,
            format!(
                "Subcategories cannot contain Id of current product category '{}'.",
                current_id
            ),
        ));
    }

    if !subcategories.is_empty() {
        ensure_categories_exist(session, SUBCATEGORIES_FIELD, subcategories).await?;
    }
    Ok(())
}
