//! Async usage examples

#[path = "memory.rs"]
mod memory;

use esox_connpool::{ConnectionPool, PoolConfig};
use memory::MemoryConnection;
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    println!("=== EsoxSolutions.ConnectionPool - Async Examples ===\n");

    // Example 1: Async borrow
    async_borrow().await;

    // Example 2: Async with timeout
    async_with_timeout().await;

    // Example 3: Concurrent access
    concurrent_access().await;
}

async fn async_borrow() {
    println!("1. Async Borrow:");
    let pool = ConnectionPool::new(MemoryConnection::open, PoolConfig::default()).unwrap();

    {
        let conn = pool.borrow_async().await.unwrap();
        println!("   Got connection asynchronously: {}", conn.get().unwrap().describe());
    }

    println!();
}

async fn async_with_timeout() {
    println!("2. Async with Timeout:");

    let config = PoolConfig::new()
        .with_pool_size(1)
        .with_connection_timeout(Duration::from_millis(100));
    let pool = ConnectionPool::new(MemoryConnection::open, config).unwrap();

    let _conn = pool.borrow().unwrap();
    match pool.borrow_async().await {
        Ok(_) => println!("   Got connection"),
        Err(e) => println!("   Error: {e}"),
    }

    println!();
}

async fn concurrent_access() {
    println!("3. Concurrent Access:");
    let pool = ConnectionPool::new(MemoryConnection::open, PoolConfig::new().with_pool_size(3)).unwrap();

    let mut tasks = Vec::new();
    for worker in 0..6 {
        let pool = pool.clone();
        tasks.push(tokio::spawn(async move {
            let conn = pool.borrow_async().await.unwrap();
            let id = conn.get().unwrap().id;
            sleep(Duration::from_millis(20)).await;
            println!("   Worker {worker} used connection #{id}");
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let metrics = pool.get_metrics();
    println!("   Created {} connections for {} borrows", metrics.connections_created, metrics.total_borrowed);
    pool.shutdown();
}
