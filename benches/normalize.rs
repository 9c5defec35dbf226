use cdp_docs_client::normalize;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn bench_normalize(c: &mut Criterion) {
    let full = json!({
        "title": "Creating segments in Zeotap",
        "snippet": {"text": "Segments group <strong>users</strong> by shared traits ... build rules", "type": "guide"},
        "steps": ["1. Open Audiences", "2. Add a rule", "3. Save the segment"],
        "link": "https://docs.zeotap.com/segments",
        "score": 4.1,
        "metadata": {"relevance": "High", "documentType": "Guide", "headers": ["Segments", "Rules", "Activation"]},
        "suggestions": ["View step-by-step guide", "See related examples", "Check prerequisites"],
        "related_topics": ["Identity resolution", "Audience export", "Consent"]
    });
    let partial = json!({"title": "T", "metadata": {"relevance": "Low"}});
    let text = json!("Segment sources collect events from your apps.");

    c.bench_function("normalize_full", |b| b.iter(|| normalize(black_box(&full))));
    c.bench_function("normalize_partial", |b| b.iter(|| normalize(black_box(&partial))));
    c.bench_function("normalize_string", |b| b.iter(|| normalize(black_box(&text))));
}

criterion_group!(benches, bench_normalize);
criterion_main!(benches);
