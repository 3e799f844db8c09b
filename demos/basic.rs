//! Basic usage examples for ConnectionPool

#[path = "memory.rs"]
mod memory;

use esox_connpool::{ConnectionDefaults, ConnectionPool, PoolConfig, TxIsolation};
use memory::MemoryConnection;
use std::thread;
use std::time::Duration;

fn main() {
    println!("=== EsoxSolutions.ConnectionPool - Basic Examples ===\n");

    // Example 1: Borrow and return
    simple_pool();

    // Example 2: Provisioning defaults
    configured_pool();

    // Example 3: Timeouts and resizing
    timeouts_and_resizing();

    // Example 4: Idle eviction
    idle_eviction();

    // Example 5: Metrics and shutdown
    metrics_and_shutdown();
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let pool = ConnectionPool::new(MemoryConnection::open, PoolConfig::default()).unwrap();

    {
        let conn = pool.borrow().unwrap();
        println!("   Got connection {}", conn.get().unwrap().describe());
        // Connection automatically returned when dropped
    }

    println!("   Idle after return: {}\n", pool.idle_count());
}

fn configured_pool() {
    println!("2. Configured Pool:");

    let defaults = ConnectionDefaults {
        auto_commit: false,
        isolation: TxIsolation::Serializable,
        read_only: Some(false),
        catalog: Some("orders".to_string()),
    };
    let config = PoolConfig::new().with_pool_size(5).with_defaults(defaults);
    let pool = ConnectionPool::builder(MemoryConnection::open)
        .name("orders")
        .config(config)
        .build()
        .unwrap();

    let conn = pool.borrow().unwrap();
    println!("   Provisioned {}\n", conn.get().unwrap().describe());
}

fn timeouts_and_resizing() {
    println!("3. Timeouts and Resizing:");
    let config = PoolConfig::new()
        .with_pool_size(1)
        .with_connection_timeout(Duration::from_millis(50));
    let pool = ConnectionPool::new(MemoryConnection::open, config).unwrap();

    let _first = pool.borrow().unwrap();
    match pool.borrow() {
        Ok(_) => println!("   Unexpectedly got a second connection"),
        Err(e) => println!("   Second borrow: {e}"),
    }

    let size = pool.resize(2);
    println!("   Resized to {size}");
    let _second = pool.borrow().unwrap();
    println!("   Second borrow after resize: Success\n");
}

fn idle_eviction() {
    println!("4. Idle Eviction:");
    let config = PoolConfig::new()
        .with_pool_size(4)
        .with_idle(1, 2, Duration::from_millis(10));
    let pool = ConnectionPool::new(MemoryConnection::open, config).unwrap();

    let borrowed: Vec<_> = (0..3).map(|_| pool.borrow().unwrap()).collect();
    drop(borrowed);
    thread::sleep(Duration::from_millis(20));

    let removed = pool.run_eviction();
    println!("   Evicted {removed}, {} left idle\n", pool.idle_count());
}

fn metrics_and_shutdown() {
    println!("5. Metrics and Shutdown:");
    let pool = ConnectionPool::new(MemoryConnection::open, PoolConfig::new().with_pool_size(5)).unwrap();
    pool.init().unwrap();

    {
        let _conn1 = pool.borrow().unwrap();
        let _conn2 = pool.borrow().unwrap();
        let metrics = pool.get_metrics();
        println!("   Utilization: {:.1}%", metrics.utilization * 100.0);
        println!("   Borrowed: {}, Idle: {}", metrics.borrowed_connections, metrics.idle_connections);
    }

    let metrics = pool.get_metrics().export();
    println!("\n   Metrics:");
    let mut keys: Vec<_> = metrics.keys().collect();
    keys.sort();
    for key in keys {
        println!("     {}: {}", key, metrics[key]);
    }

    pool.shutdown();
    println!("   Borrow after shutdown: {}", pool.borrow().unwrap_err());
}
