mod common;

use anyhow::Result;
use chrono::{NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use devbook_api_rust::auth::Principal;
use devbook_api_rust::handlers::time_tracking::{
    CreateProject, CreateWorkTask, GetProject, GetProjects, ListWorkTasks, PatchProject, PatchWorkTask,
    StartWorkTask,
};
use devbook_api_rust::types::Outcome;
use devbook_api_rust::DispatchError;

fn time(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

fn project(name: &str) -> CreateProject {
    CreateProject {
        name: name.to_string(),
        details: None,
        hourly_rate: Some(80),
        currency: Some("EUR".to_string()),
        hex_color: None,
    }
}

#[tokio::test]
async fn tenants_never_see_each_others_projects() -> Result<()> {
    let ctx = common::context()?;
    let alice = ctx.create_test_tenant("alice");
    let bob = ctx.create_test_tenant("bob");

    let alice_project = ctx.send_as(&alice, project("Website")).await?;
    ctx.send_as(&bob, project("Backend")).await?;

    let listed = ctx.send_as(&alice, GetProjects::default()).await?;
    let ids: Vec<Uuid> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![alice_project]);

    assert!(ctx.send_as(&bob, GetProject { id: alice_project }).await?.is_none());
    assert_eq!(ctx.storage().row_count("projects").await, 2);
    Ok(())
}

#[tokio::test]
async fn patch_of_foreign_project_is_not_found() -> Result<()> {
    let ctx = common::context()?;
    let alice = ctx.create_test_tenant("alice");
    let bob = ctx.create_test_tenant("bob");
    let id = ctx.send_as(&alice, project("Website")).await?;

    let outcome = ctx
        .send_as(
            &bob,
            PatchProject {
                id,
                name: Some("Hijacked".to_string()),
                details: None,
                hourly_rate: None,
                currency: None,
                hex_color: None,
            },
        )
        .await?;
    assert_eq!(outcome, Outcome::NotFound);

    let loaded = ctx.send_as(&alice, GetProject { id }).await?.expect("project exists");
    assert_eq!(loaded.name, "Website");
    assert_eq!(loaded.hourly_rate, Some(80));
    Ok(())
}

#[tokio::test]
async fn anonymous_caller_is_denied_tenant_data() -> Result<()> {
    let ctx = common::context()?;

    let result = ctx.send(project("Website")).await;
    assert!(matches!(result, Err(DispatchError::AccessDenied(_))));

    let listed = ctx.send(GetProjects::default()).await;
    assert!(matches!(listed, Err(DispatchError::AccessDenied(_))));
    assert_eq!(ctx.storage().row_count("projects").await, 0);
    Ok(())
}

#[tokio::test]
async fn principal_without_owner_claim_is_a_configuration_error() -> Result<()> {
    let ctx = common::context()?;
    let dispatcher = ctx.dispatcher();
    let mut request_ctx = dispatcher.context(Some(Principal::authenticated("service")));

    let result = dispatcher.execute_query(GetProjects::default(), &mut request_ctx).await;
    let err = result.expect_err("must fail without owner claim");
    assert!(matches!(err, DispatchError::Configuration(_)));
    assert_eq!(err.status_code(), 500);
    Ok(())
}

#[tokio::test]
async fn only_one_running_task_per_owner() -> Result<()> {
    let ctx = common::context()?;
    let alice = ctx.create_test_tenant("alice");
    let bob = ctx.create_test_tenant("bob");
    let start = || StartWorkTask {
        description: Some("Focus".to_string()),
        date: Utc::now(),
        start: time(9, 0),
    };

    ctx.send_as(&alice, start()).await?;

    let second = ctx.send_as(&alice, start()).await;
    assert_eq!(
        common::field_message(second, "Description"),
        "Cannot start task, there is already a running task."
    );

    ctx.send_as(&bob, start()).await?;
    assert_eq!(ctx.storage().row_count("work_tasks").await, 2);
    Ok(())
}

#[tokio::test]
async fn work_task_project_must_belong_to_owner() -> Result<()> {
    let ctx = common::context()?;
    let alice = ctx.create_test_tenant("alice");
    let bob = ctx.create_test_tenant("bob");
    let bobs_project = ctx.send_as(&bob, project("Backend")).await?;

    let result = ctx
        .send_as(
            &alice,
            CreateWorkTask {
                project_id: Some(bobs_project),
                description: None,
                details: None,
                date: Utc::now(),
                start: time(9, 0),
                end: time(10, 0),
            },
        )
        .await;
    assert_eq!(
        common::field_message(result, "ProjectId"),
        format!("Project with id '{}' not found.", bobs_project)
    );
    Ok(())
}

#[tokio::test]
async fn patch_cannot_move_end_before_start() -> Result<()> {
    let ctx = common::context()?;
    let alice = ctx.create_test_tenant("alice");

    let task = ctx
        .send_as(
            &alice,
            CreateWorkTask {
                project_id: None,
                description: Some("Review".to_string()),
                details: None,
                date: Utc::now(),
                start: time(13, 0),
                end: time(14, 0),
            },
        )
        .await?;

    let result = ctx
        .send_as(
            &alice,
            PatchWorkTask {
                id: task.id,
                project_id: None,
                description: None,
                details: None,
                date: None,
                start: None,
                end: Some(time(12, 0)),
            },
        )
        .await;
    assert_eq!(common::failed_fields(result), vec!["End"]);
    Ok(())
}

#[tokio::test]
async fn work_tasks_are_grouped_by_day_newest_first() -> Result<()> {
    let ctx = common::context()?;
    let alice = ctx.create_test_tenant("alice");
    let project_id = ctx.send_as(&alice, project("Website")).await?;

    let monday = Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap();
    let tuesday = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();

    for (date, start, end) in [(monday, 9, 10), (tuesday, 9, 11), (monday, 13, 15)] {
        ctx.send_as(
            &alice,
            CreateWorkTask {
                project_id: Some(project_id),
                description: None,
                details: None,
                date,
                start: time(start, 0),
                end: time(end, 0),
            },
        )
        .await?;
    }
    let running = ctx
        .send_as(
            &alice,
            StartWorkTask {
                description: Some("Ongoing".to_string()),
                date: tuesday,
                start: time(14, 0),
            },
        )
        .await?;

    let list = ctx.send_as(&alice, ListWorkTasks::default()).await?;

    let days: Vec<_> = list.days.iter().map(|d| d.date).collect();
    assert_eq!(days, vec![tuesday.date_naive(), monday.date_naive()]);
    assert_eq!(list.days[0].tasks.len(), 2);
    assert_eq!(list.days[1].tasks.len(), 2);

    let active = list.active_work_task.expect("a task is running");
    assert_eq!(active.id, running);
    assert!(active.project.is_none());

    let resolved = &list.days[1].tasks[0];
    assert_eq!(resolved.project.as_ref().map(|p| p.id), Some(project_id));
    Ok(())
}
