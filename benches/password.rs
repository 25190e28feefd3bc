//! Argon2id 凭据哈希性能基准测试

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use linkpulse::utils::password::{CredentialHasher, is_argon2_hash};

fn bench_hash_by_cost(c: &mut Criterion) {
    let mut group = c.benchmark_group("password/hash");
    group.sample_size(10);

    // (memory_kib, iterations)
    for (memory_kib, iterations) in [(1024, 1), (19456, 2)] {
        let hasher = CredentialHasher::new(memory_kib, iterations, 1).expect("valid params");
        group.bench_with_input(
            BenchmarkId::new("m_t", format!("{}_{}", memory_kib, iterations)),
            &hasher,
            |b, hasher| {
                b.iter(|| {
                    let _ = hasher.hash("test_password_123");
                });
            },
        );
    }

    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let hasher = CredentialHasher::default();
    let password = "correct_password_456";
    let hash = hasher.hash(password).expect("hash should succeed");

    let mut group = c.benchmark_group("password/verify");
    group.sample_size(10);

    group.bench_function("correct", |b| {
        b.iter(|| {
            assert!(hasher.verify(password, &hash).expect("verify should succeed"));
        });
    });

    group.bench_function("wrong", |b| {
        b.iter(|| {
            assert!(!hasher.verify("wrong_password", &hash).expect("verify should succeed"));
        });
    });

    group.finish();
}

fn bench_is_argon2_hash(c: &mut Criterion) {
    c.bench_function("password/is_argon2_hash", |b| {
        b.iter(|| {
            assert!(is_argon2_hash("$argon2id$v=19$m=19456,t=2,p=1$salt$hash"));
        });
    });
}

criterion_group!(benches, bench_hash_by_cost, bench_verify, bench_is_argon2_hash);
criterion_main!(benches);
