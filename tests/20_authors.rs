mod common;

use anyhow::Result;
use uuid::Uuid;

use devbook_api_rust::handlers::bookstore::{
    DeleteAuthor, DeleteProduct, GetAuthor, GetAuthors, GetBook, PatchAuthor, UpdateAuthor, UpdateBook,
};
use devbook_api_rust::types::Outcome;

#[tokio::test]
async fn create_then_get_author() -> Result<()> {
    let ctx = common::context()?;
    let author = common::create_author(&ctx, "Ursula").await?;

    let loaded = ctx.send(GetAuthor { id: author.id }).await?;
    assert_eq!(loaded, Some(author));
    Ok(())
}

#[tokio::test]
async fn patch_changes_only_supplied_fields() -> Result<()> {
    let ctx = common::context()?;
    let author = common::create_author(&ctx, "Ursula").await?;

    let outcome = ctx
        .send(PatchAuthor {
            id: author.id,
            name: Some("Ursula K.".to_string()),
            description: None,
        })
        .await?;
    assert_eq!(outcome, Outcome::Success);

    let loaded = ctx.send(GetAuthor { id: author.id }).await?.expect("author exists");
    assert_eq!(loaded.name, "Ursula K.");
    assert_eq!(loaded.description, author.description);
    Ok(())
}

#[tokio::test]
async fn update_overwrites_omitted_fields() -> Result<()> {
    let ctx = common::context()?;
    let author = common::create_author(&ctx, "Ursula").await?;
    assert!(author.description.is_some());

    ctx.send(UpdateAuthor {
        id: author.id,
        name: "Ursula".to_string(),
        description: None,
    })
    .await?;

    let loaded = ctx.send(GetAuthor { id: author.id }).await?.expect("author exists");
    assert_eq!(loaded.description, None);
    Ok(())
}

#[tokio::test]
async fn update_of_unknown_author_is_not_found() -> Result<()> {
    let ctx = common::context()?;

    let outcome = ctx
        .send(UpdateAuthor {
            id: Uuid::new_v4(),
            name: "Nobody".to_string(),
            description: None,
        })
        .await?;
    assert_eq!(outcome, Outcome::NotFound);
    Ok(())
}

#[tokio::test]
async fn deleting_unknown_author_succeeds() -> Result<()> {
    let ctx = common::context()?;
    ctx.send(DeleteAuthor { id: Uuid::new_v4() }).await?;
    Ok(())
}

#[tokio::test]
async fn referenced_author_cannot_be_deleted_until_book_is_gone() -> Result<()> {
    let ctx = common::context()?;
    let author = common::create_author(&ctx, "Ursula").await?;
    let book = common::create_book(&ctx, "The Dispossessed", author.id, vec![]).await?;

    let refused = ctx.send(DeleteAuthor { id: author.id }).await;
    let message = common::field_message(refused, "AuthorId");
    assert!(message.contains(&author.id.to_string()));
    assert!(message.contains("1 row(s) in 'products'"));
    assert!(ctx.send(GetAuthor { id: author.id }).await?.is_some());

    ctx.send(DeleteProduct { id: book.id }).await?;
    ctx.send(DeleteAuthor { id: author.id }).await?;
    assert!(ctx.send(GetAuthor { id: author.id }).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn author_can_be_deleted_once_book_reference_is_cleared() -> Result<()> {
    let ctx = common::context()?;
    let author = common::create_author(&ctx, "Ursula").await?;
    let book = common::create_book(&ctx, "The Lathe of Heaven", author.id, vec![]).await?;

    assert!(ctx.send(DeleteAuthor { id: author.id }).await.is_err());

    let outcome = ctx
        .send(UpdateBook {
            id: book.id,
            name: book.name.clone(),
            author_id: None,
            retail_price: book.retail_price,
            price: book.price,
            discount_amount: book.discount_amount,
            description: None,
            cover_image_url: None,
            product_category_ids: vec![],
        })
        .await?;
    assert_eq!(outcome, Outcome::Success);

    let loaded = ctx.send(GetBook { id: book.id }).await?.expect("book exists");
    assert_eq!(loaded.author_id, None);

    ctx.send(DeleteAuthor { id: author.id }).await?;
    assert!(ctx.send(GetAuthor { id: author.id }).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn authors_are_listed_by_name_and_paged() -> Result<()> {
    let ctx = common::context()?;
    for name in ["Carol", "Alice", "Dave", "Bob"] {
        common::create_author(&ctx, name).await?;
    }

    let all = ctx.send(GetAuthors::default()).await?;
    let names: Vec<_> = all.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob", "Carol", "Dave"]);

    let page = ctx
        .send(GetAuthors {
            page_size: Some(2),
            offset: Some(1),
        })
        .await?;
    let names: Vec<_> = page.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Bob", "Carol"]);

    let clamped = ctx
        .send(GetAuthors {
            page_size: Some(-5),
            offset: Some(-3),
        })
        .await?;
    assert_eq!(clamped.len(), 4);
    Ok(())
}
