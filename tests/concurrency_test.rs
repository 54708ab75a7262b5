mod common;

use std::sync::Arc;

use anyhow::Result;
use cardbank::application::{AppError, IdentityGenerator, LedgerService};
use cardbank::storage::CardStore;
use common::{funded_card, test_service};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_deposits_lose_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);
    let card = service.create().await?;

    const N: i64 = 40;
    const AMOUNT: i64 = 25;

    let mut handles = Vec::new();
    for _ in 0..N {
        let service = Arc::clone(&service);
        let card_number = card.card_number.clone();
        handles.push(tokio::spawn(async move {
            service.deposit(&card_number, AMOUNT).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    assert_eq!(service.get_balance(&card.card_number).await?, N * AMOUNT);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_opposing_transfers_conserve_total() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);
    let a = funded_card(&service, 1000).await?;
    let b = funded_card(&service, 1000).await?;

    let mut handles = Vec::new();
    for i in 0..40 {
        let service = Arc::clone(&service);
        let (from, to) = if i % 2 == 0 {
            (a.card_number.clone(), b.card_number.clone())
        } else {
            (b.card_number.clone(), a.card_number.clone())
        };
        handles.push(tokio::spawn(async move {
            service.transfer(&from, &to, 30).await
        }));
    }
    for handle in handles {
        match handle.await? {
            Ok(()) | Err(AppError::InsufficientFunds { .. }) => {}
            Err(other) => return Err(other.into()),
        }
    }

    let balance_a = service.get_balance(&a.card_number).await?;
    let balance_b = service.get_balance(&b.card_number).await?;
    assert!(balance_a >= 0 && balance_b >= 0);
    assert_eq!(balance_a + balance_b, 2000);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_drain_never_goes_negative() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);
    let source = funded_card(&service, 100).await?;
    let sink = service.create().await?;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let service = Arc::clone(&service);
        let from = source.card_number.clone();
        let to = sink.card_number.clone();
        handles.push(tokio::spawn(async move {
            service.transfer(&from, &to, 30).await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => succeeded += 1,
            Err(AppError::InsufficientFunds { .. }) => {}
            Err(other) => return Err(other.into()),
        }
    }

    assert_eq!(succeeded, 3);
    assert_eq!(service.get_balance(&source.card_number).await?, 10);
    assert_eq!(service.get_balance(&sink.card_number).await?, 90);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_are_unique() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for _ in 0..20 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move { service.create().await }));
    }

    let mut numbers = std::collections::HashSet::new();
    for handle in handles {
        let card = handle.await??;
        assert!(numbers.insert(card.card_number));
    }
    assert_eq!(service.card_count().await?, 20);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_issuers_with_identical_draws_get_distinct_cards() -> Result<()> {
    let temp_dir = tempfile::TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let url = format!("sqlite:{}?mode=rwc", db_path.to_str().unwrap());

    // Both issuers draw the same sequence, so the first draws collide either
    // at the availability check or at insert time
    let first = LedgerService::with_generator(
        CardStore::init(&url).await?,
        IdentityGenerator::with_seed(7),
    );
    let second = LedgerService::with_generator(
        CardStore::connect(&url).await?,
        IdentityGenerator::with_seed(7),
    );

    let (a, b) = tokio::join!(first.create(), second.create());
    let (a, b) = (a?, b?);

    assert_ne!(a.card_number, b.card_number);
    assert_ne!(a.account_number, b.account_number);
    assert_eq!(first.card_count().await?, 2);
    Ok(())
}
