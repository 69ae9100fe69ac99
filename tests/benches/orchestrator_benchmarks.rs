//! # Module Orchestrator Benchmarks
//!
//! Hot-path costs paid on every request:
//!
//! | Component | Operation | Target |
//! |-----------|-----------|--------|
//! | orch-05 Router | route over default rules | < 10µs |
//! | orch-01 Security | sanitize 1KB input | < 50µs |
//! | orch-01 Security | rate-limit check | < 1µs |
//! | orch-01 Security | audit append at capacity | < 5µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use orch_01_security::{
    AuditEvent, AuditLog, AuditSeverity, FixedWindowLimiter, InputSanitizer, PolicyKey, RateLimit,
};
use orch_05_task_router::{RouterConfig, TaskRouter};
use shared_types::ProcessingContext;
use std::time::Duration;

// ============================================================================
// ORCH-05: Task Router
// ============================================================================

fn bench_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("orch-05-task-router");
    group.measurement_time(Duration::from_secs(5));

    let router = TaskRouter::from_config(&RouterConfig::default()).expect("default rules compile");
    let ctx = ProcessingContext::new("acme", "alice").with_location("/leads/42");

    let inputs = [
        ("keyword_hit", "please update the lead profile"),
        ("late_rule", "open the next training lesson"),
        ("fallback", "nothing in here matches any rule at all"),
    ];
    for (name, input) in inputs {
        group.bench_function(name, |b| {
            b.iter(|| black_box(router.route_or_fallback(black_box(input), Some(&ctx))))
        });
    }

    group.finish();
}

// ============================================================================
// ORCH-01: Security Engine
// ============================================================================

fn bench_sanitization(c: &mut Criterion) {
    let mut group = c.benchmark_group("orch-01-sanitize");
    let sanitizer = InputSanitizer::default();

    for size in [64usize, 1_024, 10_000] {
        let input: String = "<b>Hello</b> <script>x()</script>& world "
            .chars()
            .cycle()
            .take(size)
            .collect();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("sanitize", size), &input, |b, input| {
            b.iter(|| black_box(sanitizer.sanitize(black_box(input))))
        });
    }

    group.finish();
}

fn bench_security_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("orch-01-security");

    let limiter = FixedWindowLimiter::new();
    let limit = RateLimit::new(u32::MAX, 60_000);
    let key = PolicyKey::new("acme", "alice");
    group.bench_function("rate_limit_check", |b| {
        b.iter(|| black_box(limiter.check(black_box(&key), limit, 1_000)))
    });

    let audit = AuditLog::new(10_000);
    for seq in 0..10_000u64 {
        audit.append(AuditEvent::new("warmup", AuditSeverity::Low).into_entry(seq));
    }
    group.bench_function("audit_append_at_capacity", |b| {
        b.iter(|| {
            let entry = AuditEvent::new("module_interaction", AuditSeverity::Low)
                .actor("acme", "alice")
                .into_entry(1_000);
            black_box(audit.append(entry))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_routing,
    bench_sanitization,
    bench_security_operations,
);

criterion_main!(benches);
