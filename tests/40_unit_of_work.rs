mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use uuid::Uuid;

use devbook_api_rust::database::models::Author;
use devbook_api_rust::database::{ChangeSet, MemoryStorage, Record, Storage, StorageError};
use devbook_api_rust::handlers::bookstore::{CreateAuthor, GetAuthors};
use devbook_api_rust::handlers::{self, register_all};
use devbook_api_rust::pipeline::Handler;
use devbook_api_rust::types::Cancellation;
use devbook_api_rust::{command, Dispatcher, DispatchError, RequestContext};

/// Engine that reads from memory but refuses every commit
struct FailingStorage {
    inner: MemoryStorage,
    attempts: AtomicUsize,
}

#[async_trait]
impl Storage for FailingStorage {
    async fn load(&self, collection: &str, id: Uuid) -> Result<Option<Record>, StorageError> {
        self.inner.load(collection, id).await
    }

    async fn scan(&self, collection: &str) -> Result<Vec<Record>, StorageError> {
        self.inner.scan(collection).await
    }

    async fn apply(&self, _changes: ChangeSet) -> Result<usize, StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::CommitFailed("disk full".to_string()))
    }
}

/// Stages an author, then fails
struct AddThenFail {
    name: String,
}
command!(AddThenFail => ());

struct AddThenFailHandler;

#[async_trait]
impl Handler<AddThenFail> for AddThenFailHandler {
    async fn handle(&self, request: AddThenFail, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        ctx.session_mut().add(&Author {
            id: Uuid::new_v4(),
            name: request.name,
            description: None,
        })?;
        Err(DispatchError::invalid_operation("handler gave up"))
    }
}

fn author(name: &str) -> CreateAuthor {
    CreateAuthor {
        name: name.to_string(),
        description: None,
    }
}

#[tokio::test]
async fn failing_commit_persists_nothing() -> Result<()> {
    let storage = Arc::new(FailingStorage {
        inner: MemoryStorage::new(),
        attempts: AtomicUsize::new(0),
    });
    let dispatcher = handlers::dispatcher(storage.clone())?;
    let mut ctx = dispatcher.context(None);

    let result = dispatcher.execute_command(author("Ada"), &mut ctx).await;
    let err = result.expect_err("commit must fail");
    assert!(matches!(err, DispatchError::Storage(StorageError::CommitFailed(_))));
    assert_eq!(err.status_code(), 500);
    assert!(!err.to_json()["message"].as_str().unwrap_or_default().contains("disk"));

    assert_eq!(storage.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(storage.inner.row_count("authors").await, 0);
    assert!(!ctx.session().has_changes());
    Ok(())
}

#[tokio::test]
async fn handler_error_leaves_storage_untouched() -> Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    let mut builder = Dispatcher::builder();
    register_all(&mut builder)?;
    builder.handler::<AddThenFail, _>(AddThenFailHandler)?;
    let dispatcher = builder.build(storage.clone());

    let mut ctx = dispatcher.context(None);
    let result = dispatcher
        .execute_void(AddThenFail { name: "Ghost".to_string() }, &mut ctx)
        .await;

    assert!(matches!(result, Err(DispatchError::InvalidOperation(_))));
    assert_eq!(storage.row_count("authors").await, 0);
    assert!(!ctx.session().has_changes());
    Ok(())
}

#[tokio::test]
async fn cancelled_request_commits_nothing() -> Result<()> {
    let ctx = common::context()?;
    let dispatcher = ctx.dispatcher();

    let (handle, cancellation) = Cancellation::new();
    let mut request_ctx = dispatcher.context_with_cancellation(None, cancellation);
    handle.cancel();

    let result = dispatcher.execute_command(author("Ada"), &mut request_ctx).await;
    let err = result.expect_err("cancelled request must fail");
    assert!(matches!(err, DispatchError::Cancelled));
    assert_eq!(err.status_code(), 499);
    assert_eq!(ctx.storage().row_count("authors").await, 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_commands_each_commit_once() -> Result<()> {
    let ctx = common::context()?;

    let requests = (0..20).map(|i| ctx.send(author(&format!("Author {:02}", i))));
    let results = join_all(requests).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(ctx.storage().row_count("authors").await, 20);

    let listed = ctx.send(GetAuthors::default()).await?;
    assert_eq!(listed.len(), 20);
    assert_eq!(listed[0].name, "Author 00");
    Ok(())
}

#[tokio::test]
async fn each_request_gets_its_own_session() -> Result<()> {
    let ctx = common::context()?;
    let dispatcher = ctx.dispatcher();

    let mut first = dispatcher.context(None);
    dispatcher.execute_command(author("Ada"), &mut first).await?;

    let mut second = dispatcher.context(None);
    assert_ne!(first.request_id, second.request_id);
    assert!(!second.session().has_changes());

    let listed = dispatcher.execute_query(GetAuthors::default(), &mut second).await?;
    assert_eq!(listed.len(), 1);
    Ok(())
}
