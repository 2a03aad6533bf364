use uuid::Uuid;

use crate::database::entity::Entity;
use crate::database::models::Product;
use crate::database::session::Session;
use crate::error::DispatchError;

/// Refuse a delete while any `R` row still references the target.
/// Reports on `field`, naming the relationship and the id.
pub async fn ensure_not_referenced<R, F>(
    session: &Session,
    field: &str,
    target: &str,
    id: Uuid,
    references: F,
) -> Result<(), DispatchError>
where
    R: Entity,
    F: Fn(&R) -> bool + Send,
{
    let count = session.count::<R, _>(references).await?;
    if count > 0 {
        tracing::warn!(
            "Refusing to delete {} {}: referenced by {} row(s) in '{}'",
            target,
            id,
            count,
            R::COLLECTION
        );
        return Err(DispatchError::validation(
            field,
            format!(
                "Cannot delete {} '{}', it is referenced by {} row(s) in '{}'.",
                target,
                id,
                count,
                R::COLLECTION
            ),
        ));
    }
    Ok(())
}

pub async fn ensure_author_not_referenced(session: &Session, author_id: Uuid) -> Result<(), DispatchError> {
    ensure_not_referenced::<Product, _>(session, "AuthorId", "Author", author_id, move |p| {
        p.author_id() == Some(author_id)
    })
    .await
}

pub async fn ensure_category_not_referenced(
    session: &Session,
    category_id: Uuid,
) -> Result<(), DispatchError> {
    ensure_not_referenced::<Product, _>(
        session,
        "ProductCategoryIds",
        "ProductCategory",
        category_id,
        move |p| p.product_category_ids().contains(&category_id),
    )
    .await
}
