use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use chrono::{Duration, Utc};
use tamv_auth::{Capability, Principal, Role, RoleSet, authorize};
use tamv_core::{TenantId, UserId};
use tamv_infra::store::{InMemoryTenantStore, TenantAccessor};
use tamv_records::{NewTask, Task};

fn seed(store: &InMemoryTenantStore, tenants: &[TenantId], per_tenant: usize) -> Vec<Task> {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let mut first_tenant = Vec::new();
    for (i, tenant) in tenants.iter().enumerate() {
        let ctx = context(*tenant, Capability::Write);
        let tasks = TenantAccessor::<Task>::new(&ctx, store);
        for n in 0..per_tenant {
            let task = Task::create(
                NewTask {
                    title: format!("task {n}"),
                    description: None,
                },
                UserId::new(),
                Utc::now(),
            )
            .unwrap();
            rt.block_on(tasks.create(&task)).unwrap();
            if i == 0 {
                first_tenant.push(task);
            }
        }
    }
    first_tenant
}

fn context(tenant: TenantId, capability: Capability) -> tamv_auth::AuthorizedContext {
    let principal = Principal::new(UserId::new(), tenant, RoleSet::from(Role::User), Utc::now() + Duration::hours(1));
    authorize(&principal, capability).unwrap()
}

fn bench_tenant_reads(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let mut group = c.benchmark_group("tenant_store");

    for tenant_count in [1usize, 10, 100] {
        let store = InMemoryTenantStore::new();
        let tenants: Vec<TenantId> = (0..tenant_count).map(|_| TenantId::new()).collect();
        let owned = seed(&store, &tenants, 100);
        let ctx = context(tenants[0], Capability::Read);
        let tasks = TenantAccessor::<Task>::new(&ctx, &store);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("get", tenant_count), &owned[50], |b, task| {
            b.iter(|| rt.block_on(tasks.get(black_box(task.id))).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("list_100", tenant_count), &(), |b, _| {
            b.iter(|| rt.block_on(tasks.list()).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tenant_reads);
criterion_main!(benches);
