//! Benchmarks for rendering and pipeline reduction.

use brickflow::prelude::*;
use brickflow::testing::TestEngine;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;
use std::collections::BTreeMap;

fn render_benchmark(c: &mut Criterion) {
    let renderer = ExpressionRenderer::new();
    let context = Context::new().with_input(json!({
        "user": {"name": "Ada", "tags": ["a", "b", "c"]},
    }));
    let config: BTreeMap<String, Expression> = BTreeMap::from([
        ("name".to_string(), Expression::var("@input.user.name")),
        ("tag".to_string(), Expression::var("@input.user.tags[1]")),
        ("missing".to_string(), Expression::var("@input.user.email?")),
        (
            "greeting".to_string(),
            Expression::nunjucks("Hello {{ @input.user.name }}"),
        ),
    ]);
    let options = RenderOptions::default();

    c.bench_function("render_config", |b| {
        b.iter(|| black_box(renderer.render_config(black_box(&config), &context, options)))
    });
}

fn reduction_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let harness = TestEngine::new();
    let steps: Vec<BrickConfig> = (0..20)
        .map(|i| {
            let key = OutputKey::parse(format!("step{i}")).expect("output key");
            let message = if i == 0 {
                Expression::var("@input.seed")
            } else {
                Expression::var(format!("@step{}.message", i - 1))
            };
            harness.echo_step(message).with_output_key(key)
        })
        .collect();
    let pipeline = Pipeline::new(steps);

    c.bench_function("reduce_20_steps", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let out = harness
                    .engine
                    .run(
                        &pipeline,
                        Context::new().with_input(json!({"seed": 1})),
                        RunOptions::new(),
                    )
                    .await
                    .expect("pipeline");
                black_box(out)
            })
        })
    });
}

criterion_group!(benches, render_benchmark, reduction_benchmark);
criterion_main!(benches);
