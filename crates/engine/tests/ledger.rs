use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};

use engine::{DateRange, Engine, EngineError, ExpenseNew, MoneyCents, Month, aggregate};
use migration::MigratorTrait;
use uuid::Uuid;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    engine.create_user("alice", "password").await.unwrap();
    engine.create_user("bob", "hunter2").await.unwrap();
    (engine, db)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn october() -> Month {
    Month::of(date(2026, 10, 18))
}

fn row(budget_id: Uuid, description: &str, cents: i64, on: NaiveDate) -> ExpenseNew {
    ExpenseNew {
        description: description.to_string(),
        amount: MoneyCents::new(cents),
        budget_id,
        date: on,
        receipt_url: None,
    }
}

#[tokio::test]
async fn authenticate_checks_password_hash() {
    let (engine, _db) = engine_with_db().await;

    engine.authenticate("alice", "password").await.unwrap();
    assert!(matches!(
        engine.authenticate("alice", "wrong").await,
        Err(EngineError::Unauthorized(_))
    ));
    assert!(matches!(
        engine.authenticate("nobody", "password").await,
        Err(EngineError::Unauthorized(_))
    ));
    assert!(matches!(
        engine.create_user("alice", "again").await,
        Err(EngineError::ExistingKey(_))
    ));
}

#[tokio::test]
async fn budgets_are_created_updated_and_listed_per_user() {
    let (engine, _db) = engine_with_db().await;

    let groceries = engine
        .insert_budget("alice", " Groceries ", MoneyCents::new(50_000))
        .await
        .unwrap();
    assert_eq!(groceries.name, "Groceries");
    engine
        .insert_budget("bob", "Fuel", MoneyCents::new(10_000))
        .await
        .unwrap();

    let updated = engine
        .update_budget_amount("alice", groceries.id, MoneyCents::new(60_000))
        .await
        .unwrap();
    assert_eq!(updated.amount, MoneyCents::new(60_000));

    let budgets = engine.list_budgets("alice").await.unwrap();
    assert_eq!(budgets.len(), 1);
    assert_eq!(budgets[0].amount, MoneyCents::new(60_000));

    // Another user's budget behaves like a missing one.
    assert!(matches!(
        engine
            .update_budget_amount("bob", groceries.id, MoneyCents::new(1))
            .await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn budget_validation_never_reaches_the_store() {
    let (engine, _db) = engine_with_db().await;

    assert!(matches!(
        engine.insert_budget("alice", "  ", MoneyCents::new(100)).await,
        Err(EngineError::InvalidName(_))
    ));
    assert!(matches!(
        engine.insert_budget("alice", "Rent", MoneyCents::ZERO).await,
        Err(EngineError::InvalidAmount(_))
    ));
    let rent = engine
        .insert_budget("alice", "Rent", MoneyCents::new(100_000))
        .await
        .unwrap();
    assert!(matches!(
        engine
            .update_budget_amount("alice", rent.id, MoneyCents::new(-5))
            .await,
        Err(EngineError::InvalidAmount(_))
    ));
    assert!(engine.list_budgets("alice").await.unwrap().len() == 1);
}

#[tokio::test]
async fn amounts_above_the_ceiling_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let too_much = MoneyCents::new(MoneyCents::MAX_AMOUNT.cents() + 1);

    assert!(matches!(
        engine.insert_budget("alice", "A", MoneyCents::new(i64::MAX)).await,
        Err(EngineError::InvalidAmount(_))
    ));
    let a = engine
        .insert_budget("alice", "A", MoneyCents::MAX_AMOUNT)
        .await
        .unwrap();
    let b = engine
        .insert_budget("alice", "B", MoneyCents::MAX_AMOUNT)
        .await
        .unwrap();
    assert!(matches!(
        engine.update_budget_amount("alice", a.id, too_much).await,
        Err(EngineError::InvalidAmount(_))
    ));
    assert!(matches!(
        engine
            .insert_expenses("alice", vec![row(a.id, "yacht", too_much.cents(), date(2026, 10, 2))])
            .await,
        Err(EngineError::InvalidAmount(_))
    ));

    engine
        .insert_expenses(
            "alice",
            vec![
                row(a.id, "yacht", MoneyCents::MAX_AMOUNT.cents(), date(2026, 10, 2)),
                row(b.id, "island", MoneyCents::MAX_AMOUNT.cents(), date(2026, 10, 3)),
            ],
        )
        .await
        .unwrap();

    let budgets = engine.list_budgets("alice").await.unwrap();
    let expenses = engine.list_expenses("alice", october().range()).await.unwrap();
    let doubled = MoneyCents::new(2 * MoneyCents::MAX_AMOUNT.cents());
    assert_eq!(aggregate::total_budget(&budgets), doubled);
    assert_eq!(aggregate::total_spent(&budgets, &expenses), doubled);
    assert!(
        aggregate::summarize(&budgets, &expenses)
            .iter()
            .all(|summary| summary.remaining == MoneyCents::ZERO)
    );
}

#[tokio::test]
async fn list_expenses_is_scoped_to_the_month_window() {
    let (engine, _db) = engine_with_db().await;
    let groceries = engine
        .insert_budget("alice", "Groceries", MoneyCents::new(50_000))
        .await
        .unwrap();

    engine
        .insert_expenses(
            "alice",
            vec![
                row(groceries.id, "milk", 2_000, date(2026, 10, 1)),
                row(groceries.id, "bread", 350, date(2026, 10, 31)),
                row(groceries.id, "old", 9_999, date(2026, 9, 30)),
                row(groceries.id, "next", 9_999, date(2026, 11, 1)),
            ],
        )
        .await
        .unwrap();

    let expenses = engine
        .list_expenses("alice", october().range())
        .await
        .unwrap();
    assert_eq!(expenses.len(), 2);
    assert_eq!(expenses[0].description, "bread");
    assert_eq!(expenses[1].description, "milk");
    assert_eq!(
        aggregate::spent_for_budget(groceries.id, &expenses),
        MoneyCents::new(2_350)
    );

    let wide = DateRange::new(date(2026, 9, 1), date(2026, 11, 30)).unwrap();
    assert_eq!(engine.list_expenses("alice", wide).await.unwrap().len(), 4);
    assert!(
        engine
            .list_expenses("bob", october().range())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn insert_expenses_rejects_vanished_budget_atomically() {
    let (engine, _db) = engine_with_db().await;
    let groceries = engine
        .insert_budget("alice", "Groceries", MoneyCents::new(50_000))
        .await
        .unwrap();

    let err = engine
        .insert_expenses(
            "alice",
            vec![
                row(groceries.id, "milk", 2_000, date(2026, 10, 2)),
                row(Uuid::new_v4(), "ghost", 100, date(2026, 10, 2)),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Constraint(_)));

    // Re-fetching after a failed write returns the pre-failure state.
    let expenses = engine
        .list_expenses("alice", october().range())
        .await
        .unwrap();
    assert!(expenses.is_empty());
}

#[tokio::test]
async fn insert_expenses_validates_rows() {
    let (engine, _db) = engine_with_db().await;
    let groceries = engine
        .insert_budget("alice", "Groceries", MoneyCents::new(50_000))
        .await
        .unwrap();

    assert!(matches!(
        engine
            .insert_expenses("alice", vec![row(groceries.id, "milk", 0, date(2026, 10, 2))])
            .await,
        Err(EngineError::InvalidAmount(_))
    ));
    assert!(matches!(
        engine
            .insert_expenses("alice", vec![row(groceries.id, "  ", 10, date(2026, 10, 2))])
            .await,
        Err(EngineError::InvalidName(_))
    ));
    // Bob cannot attribute spend to Alice's budget.
    assert!(matches!(
        engine
            .insert_expenses("bob", vec![row(groceries.id, "milk", 10, date(2026, 10, 2))])
            .await,
        Err(EngineError::Constraint(_))
    ));
}

#[tokio::test]
async fn delete_expense_missing_id_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    let groceries = engine
        .insert_budget("alice", "Groceries", MoneyCents::new(50_000))
        .await
        .unwrap();
    let inserted = engine
        .insert_expenses(
            "alice",
            vec![row(groceries.id, "milk", 2_000, date(2026, 10, 2))],
        )
        .await
        .unwrap();

    assert!(matches!(
        engine.delete_expense("alice", Uuid::new_v4()).await,
        Err(EngineError::KeyNotFound(_))
    ));
    assert!(matches!(
        engine.delete_expense("bob", inserted[0].id).await,
        Err(EngineError::KeyNotFound(_))
    ));

    engine.delete_expense("alice", inserted[0].id).await.unwrap();
    assert!(matches!(
        engine.delete_expense("alice", inserted[0].id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn delete_budget_removes_its_expenses() {
    let (engine, _db) = engine_with_db().await;
    let groceries = engine
        .insert_budget("alice", "Groceries", MoneyCents::new(50_000))
        .await
        .unwrap();
    let fuel = engine
        .insert_budget("alice", "Fuel", MoneyCents::new(10_000))
        .await
        .unwrap();
    engine
        .insert_expenses(
            "alice",
            vec![
                row(groceries.id, "milk", 2_000, date(2026, 10, 2)),
                row(fuel.id, "diesel", 4_000, date(2026, 10, 3)),
            ],
        )
        .await
        .unwrap();

    engine.delete_budget("alice", groceries.id).await.unwrap();

    let budgets = engine.list_budgets("alice").await.unwrap();
    assert_eq!(budgets.len(), 1);
    let expenses = engine
        .list_expenses("alice", october().range())
        .await
        .unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].budget_id, fuel.id);

    assert!(matches!(
        engine.delete_budget("alice", groceries.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}
