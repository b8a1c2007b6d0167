use crate::support::context::test_context;

#[tokio::test]
async fn reconcile_adopts_an_unmanaged_table_by_introspection() {
    let ctx = test_context!();

    ctx.ctx
        .db()
        .exec(
            "CREATE TABLE widgets (pkid INTEGER PRIMARY KEY AUTOINCREMENT, id TEXT NOT NULL UNIQUE, title TEXT NOT NULL)",
            &[],
        )
        .await
        .expect("to create a raw table outside the schema manager");

    let settings = moonbase_core::config::RecoverySettings::default();
    moonbase_core::recovery::reconcile(ctx.ctx.db(), ctx.ctx.registry(), &settings)
        .await
        .expect("reconcile to succeed");

    let collection = ctx
        .ctx
        .registry()
        .get("widgets")
        .await
        .expect("widgets to be registered after reconciliation");
    assert!(collection.column("title").is_some());
    assert!(collection.column("pkid").is_none());
}

#[tokio::test]
async fn reconcile_registers_a_table_missing_pkid_as_is() {
    let ctx = test_context!();

    ctx.ctx
        .db()
        .exec("CREATE TABLE plain (id INTEGER PRIMARY KEY)", &[])
        .await
        .expect("to create a table with no pkid column");

    let settings = moonbase_core::config::RecoverySettings::default();
    moonbase_core::recovery::reconcile(ctx.ctx.db(), ctx.ctx.registry(), &settings)
        .await
        .expect("reconcile to succeed");

    assert!(ctx.ctx.registry().get("plain").await.is_some());
}

#[tokio::test]
async fn reconcile_drops_orphans_when_configured_to() {
    let ctx = test_context!();

    ctx.ctx
        .db()
        .exec("CREATE TABLE plain (id INTEGER PRIMARY KEY)", &[])
        .await
        .expect("to create a table with no pkid column");

    let settings = moonbase_core::config::RecoverySettings {
        drop_orphans: true,
        ..moonbase_core::config::RecoverySettings::default()
    };
    moonbase_core::recovery::reconcile(ctx.ctx.db(), ctx.ctx.registry(), &settings)
        .await
        .expect("reconcile to succeed");

    assert!(ctx.ctx.registry().get("plain").await.is_none());
}
