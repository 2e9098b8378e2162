//! Benchmarks for culture-change fan-out.
//!
//! Run with: cargo bench -p lokal-runtime --bench broadcast_bench

use std::any::Any;
use std::cell::RefCell;
use std::hint::black_box;
use std::rc::Rc;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lokal_core::{Culture, ResourceProvider, ResourceValue};
use lokal_providers::EmbeddedResourceProvider;
use lokal_runtime::{
    CultureContext, LocBinding, LocalizedTarget, PropertyError, PropertyToken, TargetProperty,
};

struct Sink {
    text: RefCell<String>,
}

impl LocalizedTarget for Sink {
    fn set_native(&self, _token: &PropertyToken, value: &ResourceValue) -> Result<(), PropertyError> {
        *self.text.borrow_mut() = value.to_string();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn provider(keys: usize) -> Arc<dyn ResourceProvider> {
    let provider = EmbeddedResourceProvider::new("bench");
    provider.set_default_assembly(Some("App"));
    for (culture, prefix) in [(Culture::invariant(), "en"), (Culture::parse("de").unwrap(), "de")] {
        let rows = (0..keys).map(|i| (format!("k{i}"), format!("{prefix}-{i}")));
        provider.add_resource("App", "Resources", culture, rows);
    }
    Arc::new(provider)
}

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("culture/broadcast");
    for bindings in [10usize, 100, 1_000] {
        let ctx = CultureContext::new();
        ctx.set_default_provider(provider(bindings));
        let targets: Vec<Rc<dyn LocalizedTarget>> = (0..bindings)
            .map(|_| {
                let target: Rc<dyn LocalizedTarget> = Rc::new(Sink {
                    text: RefCell::new(String::new()),
                });
                target
            })
            .collect();
        for (i, target) in targets.iter().enumerate() {
            let binding = LocBinding::new(&ctx, &format!("k{i}")).unwrap();
            binding.bind(target, TargetProperty::native("Text"));
        }

        let cultures = [Culture::parse("de").unwrap(), Culture::invariant()];
        let mut flip = 0usize;
        group.bench_with_input(BenchmarkId::from_parameter(bindings), &bindings, |b, _| {
            b.iter(|| {
                flip ^= 1;
                black_box(ctx.set_culture(cultures[flip].clone()))
            });
        });
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let ctx = CultureContext::with_culture(Culture::parse("de-AT").unwrap());
    ctx.set_default_provider(provider(100));
    let binding = LocBinding::new(&ctx, "k42").unwrap();
    c.bench_function("binding/resolve_with_fallback", |b| {
        b.iter(|| black_box(binding.value()));
    });
}

criterion_group!(benches, bench_broadcast, bench_resolve);
criterion_main!(benches);
