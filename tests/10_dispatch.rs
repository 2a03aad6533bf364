mod common;

use std::sync::Arc;

use anyhow::Result;
use rust_decimal::Decimal;
use uuid::Uuid;

use devbook_api_rust::database::{MemoryStorage, SessionError};
use devbook_api_rust::handlers::bookstore::{CreateAuthor, GetAuthors};
use devbook_api_rust::handlers::{self, register_all};
use devbook_api_rust::pipeline::{RegistryError, Stage};
use devbook_api_rust::types::RequestKind;
use devbook_api_rust::{Dispatcher, DispatchError};

#[tokio::test]
async fn duplicate_registration_fails_at_startup() -> Result<()> {
    let mut builder = Dispatcher::builder();
    register_all(&mut builder)?;

    let second = register_all(&mut builder);
    assert!(matches!(second, Err(RegistryError::DuplicateHandler { .. })));
    Ok(())
}

#[tokio::test]
async fn unregistered_request_is_reported() -> Result<()> {
    let dispatcher = Dispatcher::builder().build(Arc::new(MemoryStorage::new()));
    let mut ctx = dispatcher.context(None);

    let result = dispatcher.execute_query(GetAuthors::default(), &mut ctx).await;
    assert!(matches!(result, Err(DispatchError::HandlerNotRegistered("GetAuthors"))));
    Ok(())
}

#[tokio::test]
async fn validation_reports_every_failing_field() -> Result<()> {
    let ctx = common::context()?;

    let mut book = common::new_book("", Uuid::nil(), vec![]);
    book.price = Decimal::ZERO;
    book.discount_amount = Decimal::new(-1, 0);

    let fields = common::failed_fields(ctx.send(book).await);
    assert_eq!(fields, vec!["AuthorId", "DiscountAmount", "Name", "Price"]);
    Ok(())
}

#[tokio::test]
async fn validation_messages_follow_rule_wording() -> Result<()> {
    let ctx = common::context()?;

    let result = ctx
        .send(CreateAuthor {
            name: "   ".to_string(),
            description: None,
        })
        .await;
    assert_eq!(common::field_message(result, "Name"), "'Name' must not be empty.");
    Ok(())
}

#[tokio::test]
async fn validation_failure_never_reaches_storage() -> Result<()> {
    let ctx = common::context()?;

    let _ = ctx
        .send(CreateAuthor {
            name: String::new(),
            description: None,
        })
        .await;
    assert_eq!(ctx.storage().row_count("authors").await, 0);
    Ok(())
}

#[tokio::test]
async fn commands_and_queries_run_their_stages() -> Result<()> {
    let ctx = common::context()?;
    let dispatcher = ctx.dispatcher();

    let mut command_ctx = dispatcher.context(None);
    dispatcher
        .execute_command(
            CreateAuthor {
                name: "Ada".to_string(),
                description: None,
            },
            &mut command_ctx,
        )
        .await?;
    assert_eq!(
        command_ctx.stages_executed(),
        vec![Stage::Validation, Stage::UnitOfWork, Stage::Handler, Stage::Commit]
    );

    let mut query_ctx = dispatcher.context(None);
    dispatcher.execute_query(GetAuthors::default(), &mut query_ctx).await?;
    assert_eq!(
        query_ctx.stages_executed(),
        vec![Stage::Validation, Stage::UnitOfWork, Stage::Handler]
    );
    Ok(())
}

#[tokio::test]
async fn session_is_untracked_after_query() -> Result<()> {
    let ctx = common::context()?;
    let dispatcher = ctx.dispatcher();

    let mut request_ctx = dispatcher.context(None);
    dispatcher.execute_query(GetAuthors::default(), &mut request_ctx).await?;

    assert!(!request_ctx.session().is_tracking());
    let commit = request_ctx.session_mut().commit().await;
    assert!(matches!(commit, Err(SessionError::NoTracking)));
    Ok(())
}

#[tokio::test]
async fn application_dispatcher_builds() -> Result<()> {
    let dispatcher = handlers::dispatcher(Arc::new(MemoryStorage::new()))?;
    let registered = dispatcher.handlers().registered();

    assert!(registered.contains(&("CreateBook", RequestKind::Command)));
    assert!(registered.contains(&("ListWorkTasks", RequestKind::Query)));
    Ok(())
}
