use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use practicegen_core::ItemRegistry;

fn mcq() -> Value {
    json!({
        "type": "mcq_v1.basic",
        "mode": "reception",
        "skills": ["reading"],
        "conceptIds": [123],
        "prompt": "Где метро?",
        "choices": [
            {"id": "A", "text": "Там"},
            {"id": "B", "text": "Здесь"},
            {"id": "C", "text": "Вчера"}
        ],
        "correctChoiceId": "B"
    })
}

fn cloze(blanks: usize) -> Value {
    let mut parts = Vec::new();
    for i in 0..blanks {
        parts.push(json!({"type": "text", "value": "Я иду "}));
        parts.push(json!({
            "type": "blank",
            "id": format!("b{i}"),
            "accepted": ["домой", "Домой"],
            "conceptId": 100 + i as u64
        }));
    }
    json!({
        "type": "cloze_v1.free_fill",
        "mode": "production",
        "skills": ["writing"],
        "conceptIds": [100],
        "parts": parts
    })
}

fn bench_create(c: &mut Criterion) {
    let registry = ItemRegistry::with_builtins();
    let mut group = c.benchmark_group("create");

    let raw = mcq();
    group.bench_function("mcq", |b| b.iter(|| registry.create(black_box(&raw))));

    let raw = cloze(8);
    group.bench_function("cloze/8_blanks", |b| {
        b.iter(|| registry.create(black_box(&raw)))
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let registry = ItemRegistry::with_builtins();
    let mut group = c.benchmark_group("evaluate");

    let item = registry.create(&mcq()).unwrap();
    let submission = json!({"choiceId": "B"});
    group.bench_function("mcq", |b| {
        b.iter(|| registry.evaluate(black_box(&item), black_box(&submission)))
    });

    for blanks in [1usize, 8, 64] {
        let item = registry.create(&cloze(blanks)).unwrap();
        let responses: serde_json::Map<String, Value> = (0..blanks)
            .map(|i| (format!("b{i}"), json!(if i % 2 == 0 { "домой" } else { "дом" })))
            .collect();
        let submission = json!({ "responses": responses });
        group.bench_function(format!("cloze/{blanks}_blanks"), |b| {
            b.iter(|| registry.evaluate(black_box(&item), black_box(&submission)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_create, bench_evaluate);
criterion_main!(benches);
